use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::runtime::FileInfo;

#[derive(Debug, Parser)]
#[command(
    name = "tardis",
    version,
    about = "Versioned modification pipeline for volumetric medical images"
)]
pub(super) struct Cli {
    /// Raise log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(super) verbose: u8,

    /// Session configuration file (JSON or YAML).
    #[arg(long, global = true)]
    pub(super) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Prints shape, spacing, affine and intensity range of an image.
    Info { input: PathBuf },
    /// Applies a recipe of viewer actions to an image headlessly.
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        recipe: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
        /// Writes the final plane under the cursor as PNG.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    Ops {
        #[command(subcommand)]
        command: OpsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub(super) enum OpsCommand {
    List,
}

#[derive(Debug, Serialize)]
pub(super) struct ImageSummary {
    #[serde(flatten)]
    pub(super) file: FileInfo,
    pub(super) min: Option<f32>,
    pub(super) max: Option<f32>,
}
