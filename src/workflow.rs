mod error;
mod execute;
mod io;
mod recipe;
mod report;


pub use error::{Result, ScriptError};
pub use execute::run_recipe;
pub use io::{load_recipe, save_report};
pub use recipe::{RecipeStep, SessionRecipe};
pub use report::{RecipeReport, StepReport, StepStatus};
