use rayon::prelude::*;

use crate::alert::{self, AlertMessage, DirectoryFailure, StaleFile, StaleFileReport};
use crate::classifier::{Classifier, Verdict};
use crate::config::{FailureMode, MonitorConfig, MonitoredDirectory};
use crate::error::{CheckError, Result};
use crate::notifier::{self, DeliverySummary, Notifier};
use crate::scanner::ListingSource;

/// Linear run lifecycle. Any stage can fall through to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Init,
    Configured,
    Scanning,
    Classified,
    Composed,
    Notified,
    Done,
    Failed,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: StaleFileReport,
    /// `None` when an empty report was suppressed.
    pub alert: Option<AlertMessage>,
    pub delivery: DeliverySummary,
}

impl RunOutcome {
    pub fn is_clean(&self) -> bool {
        self.report.failures.is_empty() && self.delivery.failed.is_empty()
    }
}

pub struct Monitor<'a> {
    config: &'a MonitorConfig,
    source: &'a dyn ListingSource,
    notifier: &'a dyn Notifier,
}

impl<'a> Monitor<'a> {
    pub fn new(
        config: &'a MonitorConfig,
        source: &'a dyn ListingSource,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            config,
            source,
            notifier,
        }
    }

    pub fn run(&self) -> Result<RunOutcome> {
        let classifier = Classifier::at_now(self.config.threshold_secs(), self.config.timestamp_unit);
        self.run_with(&classifier)
    }

    pub fn run_with(&self, classifier: &Classifier) -> Result<RunOutcome> {
        enter(RunStage::Scanning);
        let report = self.scan_all(classifier)?;
        enter(RunStage::Classified);
        tracing::info!(
            "{} stale file(s) found in {} directories, {} failed to scan",
            report.stale.len(),
            self.config.directories.len(),
            report.failures.len()
        );

        let alert = alert::compose_alert(&report, self.config.file_age_hours, self.config.empty_report);
        enter(RunStage::Composed);

        let delivery = match &alert {
            Some(message) => notifier::send_alert(
                self.notifier,
                message,
                &self.config.mail.from,
                &self.config.mail.recipients,
                self.config.on_error,
            )?,
            None => {
                tracing::info!("No stale files found, alert suppressed");
                DeliverySummary::default()
            }
        };
        enter(RunStage::Notified);

        Ok(RunOutcome {
            report,
            alert,
            delivery,
        })
    }

    /// Scans every configured directory, sequentially or on a pool of
    /// `max_concurrency` threads. Results are folded in configuration order.
    pub fn scan_all(&self, classifier: &Classifier) -> Result<StaleFileReport> {
        let hours = self.config.file_age_hours;
        let mut report = StaleFileReport::default();

        if self.config.max_concurrency <= 1 {
            for directory in &self.config.directories {
                let outcome = scan_directory(self.source, directory, classifier, hours);
                self.record(&mut report, directory, outcome)?;
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.max_concurrency)
                .build()
                .map_err(|e| CheckError::WorkerPool(e.to_string()))?;
            let (config, source) = (self.config, self.source);
            let outcomes: Vec<Result<Vec<StaleFile>>> = pool.install(|| {
                config
                    .directories
                    .par_iter()
                    .map(|directory| scan_directory(source, directory, classifier, hours))
                    .collect()
            });
            for (directory, outcome) in self.config.directories.iter().zip(outcomes) {
                self.record(&mut report, directory, outcome)?;
            }
        }

        report.sort();
        Ok(report)
    }

    fn record(
        &self,
        report: &mut StaleFileReport,
        directory: &MonitoredDirectory,
        outcome: Result<Vec<StaleFile>>,
    ) -> Result<()> {
        match outcome {
            Ok(stale) => {
                report.stale.extend(stale);
                Ok(())
            }
            Err(e) if self.config.on_error == FailureMode::Abort => Err(e),
            Err(e) => {
                tracing::error!(label = %directory.label, "Could not scan {}: {}", directory.path, e);
                report.failures.push(DirectoryFailure {
                    directory: directory.path.clone(),
                    cause: e.to_string(),
                });
                Ok(())
            }
        }
    }
}

fn enter(stage: RunStage) {
    tracing::debug!(stage = ?stage, "Run stage");
}

/// Lists one directory and keeps the entries the classifier calls stale.
/// Every entry is classified before anything is logged, so a directory that
/// fails on a bad timestamp leaves no stale lines behind.
fn scan_directory(
    source: &dyn ListingSource,
    directory: &MonitoredDirectory,
    classifier: &Classifier,
    hours: u64,
) -> Result<Vec<StaleFile>> {
    let entries = source.list(&directory.path)?;
    let verdicts = entries
        .iter()
        .map(|entry| classifier.classify(&directory.blacklist, entry))
        .collect::<Result<Vec<Verdict>>>()?;

    let mut stale = Vec::new();
    for (entry, verdict) in entries.into_iter().zip(verdicts) {
        match verdict {
            Verdict::Stale { age_secs } => {
                let file = StaleFile {
                    directory: directory.path.clone(),
                    name: entry.name,
                    age_secs,
                };
                tracing::info!(
                    age_hours = file.age_secs / 3600,
                    "File {} has not been written to in over {} Hours",
                    file.path(),
                    hours
                );
                stale.push(file);
            }
            Verdict::Blacklisted => {
                tracing::debug!(kind = ?entry.kind, "Skipping blacklisted {}/{}", directory.path, entry.name);
            }
            Verdict::Fresh => {}
        }
    }
    Ok(stale)
}
