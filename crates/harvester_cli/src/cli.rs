use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use harvester_engine::RendererKind;

/// Harvest images and metadata from a catalog into a resumable local dataset.
#[derive(Debug, Clone, Parser, PartialEq, Eq)]
#[command(name = "catalog-harvester", version, about)]
pub struct Cli {
    /// RON file with harvest settings; missing fields take their defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Catalog index page to enumerate.
    #[arg(long)]
    pub start_url: Option<String>,

    /// Origin that relative detail links are resolved against.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory holding the record store and the asset directory.
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Backend that loads catalog pages.
    #[arg(long, value_enum)]
    pub renderer: Option<RendererChoice>,

    /// Disable the randomized politeness delays.
    #[arg(long)]
    pub no_pacing: bool,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererChoice {
    /// Headless Chromium through Playwright.
    Browser,
    /// Plain HTTP, no script execution.
    Http,
}

impl From<RendererChoice> for RendererKind {
    fn from(choice: RendererChoice) -> Self {
        match choice {
            RendererChoice::Browser => RendererKind::Browser,
            RendererChoice::Http => RendererKind::Http,
        }
    }
}
