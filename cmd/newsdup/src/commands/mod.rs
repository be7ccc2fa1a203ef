//! CLI commands module.

mod assign;
mod classify;
mod clusters;
mod evaluate;
mod import;
mod related;
mod util;

pub use assign::AssignCommand;
pub use classify::ClassifyCommand;
pub use clusters::ClustersCommand;
pub use evaluate::EvaluateCommand;
pub use import::ImportCommand;
pub use related::RelatedCommand;

pub(crate) use util::*;
