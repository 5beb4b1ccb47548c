use std::fs;
use std::process::ExitCode;

use anyhow::Context;
use engine_logging::engine_info;
use harvester_engine::{HarvestSettings, PacingSettings};

use crate::Cli;

/// Process exit contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Completed,
    FatalAborted,
    ConfigError,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Completed => ExitCode::SUCCESS,
            ExitStatus::FatalAborted => ExitCode::from(1),
            ExitStatus::ConfigError => ExitCode::from(2),
        }
    }
}

/// Settings from the optional config file with command-line overrides applied.
pub fn load_settings(cli: &Cli) -> anyhow::Result<HarvestSettings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let settings: HarvestSettings = ron::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            engine_info!("Loaded settings from {}", path.display());
            settings
        }
        None => HarvestSettings::default(),
    };

    if let Some(start_url) = &cli.start_url {
        settings.start_url = start_url.clone();
    }
    if let Some(base_url) = &cli.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        settings.data_dir = data_dir.clone();
    }
    if let Some(renderer) = cli.renderer {
        settings.renderer = renderer.into();
    }
    if cli.no_pacing {
        settings.pacing = PacingSettings::disabled();
    }

    settings.start_url().context("validating start url")?;
    settings.base_url().context("validating base url")?;
    Ok(settings)
}
