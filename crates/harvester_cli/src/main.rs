use std::process::ExitCode;

use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn, LogDestination};
use harvester_cli::{load_settings, Cli, ExitStatus};
use harvester_engine::{
    write_run_summary, BrowserLauncher, HarvestSettings, Harvester, HttpLauncher, Launcher,
    RandomPacer, RendererKind, ReqwestFetcher, RunReport,
};
use log::LevelFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            engine_error!("Invalid configuration: {:#}", err);
            return ExitStatus::ConfigError.into();
        }
    };

    engine_info!(
        "Starting catalog harvest of {} ({:?} renderer)",
        settings.start_url,
        settings.renderer
    );
    let summary_path = settings.summary_path();
    let report = match settings.renderer {
        RendererKind::Browser => {
            let launcher = BrowserLauncher::new(&settings);
            harvest(settings, launcher).await
        }
        RendererKind::Http => {
            let launcher = HttpLauncher::new(&settings);
            harvest(settings, launcher).await
        }
    };

    if let Some(path) = summary_path {
        match write_run_summary(&path, &report.summary) {
            Ok(path) => engine_info!("Run summary written to {}", path.display()),
            Err(err) => engine_warn!("Could not write run summary to {}: {}", path.display(), err),
        }
    }
    engine_info!("Harvester finished its run.");

    if report.is_complete() {
        ExitStatus::Completed.into()
    } else {
        ExitStatus::FatalAborted.into()
    }
}

async fn harvest<L: Launcher>(settings: HarvestSettings, launcher: L) -> RunReport {
    let fetcher = ReqwestFetcher::new(settings.fetch_settings());
    let pacer = RandomPacer::new(settings.pacing);
    Harvester::new(settings, launcher, fetcher, pacer).run().await
}
