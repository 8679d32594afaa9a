use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;

mod alert;
mod auth;
mod classifier;
mod config;
mod error;
mod logging;
mod monitor;
mod notifier;
mod scanner;

use config::MonitorConfig;
use monitor::{Monitor, RunStage};
use notifier::SmtpNotifier;
use scanner::WebHdfsClient;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file (`.toml` files are read as TOML)
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = MonitorConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    logging::init_logging(&config.logfile)?;
    tracing::debug!(stage = ?RunStage::Init, config = %args.config.display(), "Starting HDFS file age check");
    tracing::debug!(
        stage = ?RunStage::Configured,
        directories = config.directories.len(),
        threshold_hours = config.file_age_hours,
        "Configuration loaded"
    );

    let source = WebHdfsClient::new(&config.webhdfs).inspect_err(fail)?;
    let notifier = SmtpNotifier::new(&config.mail);

    let outcome = Monitor::new(&config, &source, &notifier)
        .run()
        .inspect_err(fail)?;

    if !outcome.is_clean() {
        tracing::error!(stage = ?RunStage::Failed, "Check finished with failures");
        bail!(
            "{} director(ies) could not be scanned, {} alert(s) could not be delivered",
            outcome.report.failures.len(),
            outcome.delivery.failed.len()
        );
    }

    let subject = outcome.alert.as_ref().map_or("none", |alert| alert.subject.as_str());
    tracing::info!(
        stage = ?RunStage::Done,
        subject,
        "Check complete: {} stale file(s), alert sent to {} recipient(s)",
        outcome.report.stale.len(),
        outcome.delivery.delivered.len()
    );
    Ok(())
}

fn fail(error: &error::CheckError) {
    tracing::error!(stage = ?RunStage::Failed, "{}", error);
}
