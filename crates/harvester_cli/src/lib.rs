//! Command-line front end for the catalog harvester.
pub mod cli;
pub mod config;

pub use cli::{Cli, RendererChoice};
pub use config::{load_settings, ExitStatus};
