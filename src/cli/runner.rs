use clap::Parser;
use serde::Serialize;

use crate::logging::{LogConfig, init_logging};
use crate::runtime::{SessionConfig, ViewerSession, load_config};
use crate::transforms::list_transforms;
use crate::workflow::{load_recipe, run_recipe, save_report};

use super::types::{Cli, Commands, ImageSummary, OpsCommand};

fn print_json(value: &impl Serialize) -> Result<(), String> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|error| error.to_string())?
    );
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose))?;
    let config = match &cli.config {
        Some(path) => load_config(path).map_err(|error| error.to_string())?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Commands::Info { input } => {
            let mut session = ViewerSession::new(config);
            session.open_file(&input).map_err(|error| error.to_string())?;
            let file = session.file_info().map_err(|error| error.to_string())?;
            let range = session
                .current()
                .map_err(|error| error.to_string())?
                .min_max();
            print_json(&ImageSummary {
                file,
                min: range.map(|(min, _)| min),
                max: range.map(|(_, max)| max),
            })?;
        }
        Commands::Run {
            input,
            recipe,
            report,
            snapshot,
        } => {
            let recipe = load_recipe(&recipe).map_err(|error| error.to_string())?;
            let mut session = ViewerSession::new(config);
            session.open_file(&input).map_err(|error| error.to_string())?;
            let run_report = run_recipe(&recipe, &mut session).map_err(|error| error.to_string())?;
            if let Some(report_path) = report {
                save_report(report_path, &run_report).map_err(|error| error.to_string())?;
            }
            if let Some(snapshot_path) = snapshot {
                session
                    .export_current_slice(&snapshot_path)
                    .map_err(|error| error.to_string())?;
            }
            print_json(&run_report)?;
            if !run_report.completed {
                return Err(format!(
                    "recipe stopped after {} failed step(s)",
                    run_report.failures()
                ));
            }
        }
        Commands::Ops { command } => match command {
            OpsCommand::List => print_json(&list_transforms())?,
        },
    }

    Ok(())
}
