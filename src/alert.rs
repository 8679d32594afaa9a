use crate::config::EmptyReportPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleFile {
    pub directory: String,
    pub name: String,
    pub age_secs: i64,
}

impl StaleFile {
    pub fn path(&self) -> String {
        if self.directory.ends_with('/') {
            format!("{}{}", self.directory, self.name)
        } else {
            format!("{}/{}", self.directory, self.name)
        }
    }
}

/// A directory that could not be scanned, kept so the alert can name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFailure {
    pub directory: String,
    pub cause: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleFileReport {
    pub stale: Vec<StaleFile>,
    pub failures: Vec<DirectoryFailure>,
}

impl StaleFileReport {
    pub fn is_empty(&self) -> bool {
        self.stale.is_empty() && self.failures.is_empty()
    }

    /// Orders by directory, then entry name, whatever order the scans finished in.
    pub fn sort(&mut self) {
        self.stale
            .sort_by(|a, b| (&a.directory, &a.name).cmp(&(&b.directory, &b.name)));
        self.failures.sort_by(|a, b| a.directory.cmp(&b.directory));
    }

    pub fn stale_paths(&self) -> Vec<String> {
        self.stale.iter().map(StaleFile::path).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

pub fn alert_subject(hours: u64) -> String {
    format!("ALERT: HDFS files over {} Hours Old, PLEASE INVESTIGATE", hours)
}

pub fn all_clear_subject(hours: u64) -> String {
    format!("OK: No HDFS files over {} Hours Old", hours)
}

/// Header line, a blank line, then one path per line.
pub fn compose_body(paths: &[String], hours: u64) -> String {
    let mut body = format!(
        "The following files in HDFS are over {} hours old, please investigate:\n\n",
        hours
    );
    for path in paths {
        body.push_str(path);
        body.push('\n');
    }
    body
}

/// Builds the alert, or `None` when the policy suppresses an empty report.
pub fn compose_alert(
    report: &StaleFileReport,
    hours: u64,
    policy: EmptyReportPolicy,
) -> Option<AlertMessage> {
    let subject = match (report.is_empty(), policy) {
        (true, EmptyReportPolicy::Suppress) => return None,
        (true, EmptyReportPolicy::AllClear) => all_clear_subject(hours),
        _ => alert_subject(hours),
    };

    let mut body = compose_body(&report.stale_paths(), hours);
    if !report.failures.is_empty() {
        body.push_str("\nThe following directories could not be scanned:\n\n");
        for failure in &report.failures {
            body.push_str(&format!("{}: {}\n", failure.directory, failure.cause));
        }
    }
    Some(AlertMessage { subject, body })
}
