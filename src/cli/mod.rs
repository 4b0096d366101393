//! CLI command implementations

pub mod error;
pub mod harvest;
pub mod rename;
pub mod taxa;

pub use error::CliError;
pub use harvest::{Cli, Commands, HarvestArgs, OutputFormat};
pub use rename::RenameArgs;
pub use taxa::ResolveTaxaArgs;
