use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CheckError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "hdfs_dir_age_check.json";
pub const DEFAULT_NEGOTIATE_TOKEN_ENV: &str = "HDFS_NEGOTIATE_TOKEN";

/// What to do when a directory listing or a single delivery fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop the run at the first failure. Nothing is sent.
    Abort,
    /// Record the failure, keep going, and report it in the alert.
    #[default]
    Continue,
}

/// What to do when no stale files were found and nothing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReportPolicy {
    #[default]
    Send,
    Suppress,
    AllClear,
}

/// Unit of `modificationTime` in listing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    #[default]
    Milliseconds,
    Seconds,
}

/// How listing requests authenticate against WebHDFS/HttpFS.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    /// SPNEGO token obtained out of band and exported in `token_env`.
    Negotiate {
        #[serde(default = "default_token_env")]
        token_env: String,
    },
    /// Simple (pseudo) authentication, `user.name=` query parameter.
    Pseudo { user: String },
    /// Hadoop delegation token, `delegation=` query parameter.
    Delegation { token: String },
}

fn default_token_env() -> String {
    DEFAULT_NEGOTIATE_TOKEN_ENV.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredDirectory {
    pub label: String,
    pub path: String,
    pub blacklist: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebHdfsEndpoint {
    pub host: String,
    pub port: u16,
    pub use_https: bool,
    pub timeout: Option<Duration>,
    pub auth: AuthConfig,
}

impl WebHdfsEndpoint {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{}://{}:{}/webhdfs/v1", scheme, self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub from: String,
    pub recipients: Vec<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub file_age_hours: u64,
    pub directories: Vec<MonitoredDirectory>,
    pub webhdfs: WebHdfsEndpoint,
    pub mail: MailSettings,
    pub logfile: PathBuf,
    pub max_concurrency: usize,
    pub on_error: FailureMode,
    pub empty_report: EmptyReportPolicy,
    pub timestamp_unit: TimestampUnit,
}

// Hand-edited JSON configs carry numbers as strings ("24", "14000"), accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

impl IntOrString {
    fn to_i64(&self, key: &str) -> Result<i64> {
        match self {
            IntOrString::Int(n) => Ok(*n),
            IntOrString::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| CheckError::config(format!("`{}` is not an integer: {:?}", key, s))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDirectory {
    name: String,
    folders_files_blacklist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    file_age_hours: IntOrString,
    directories_to_monitor: BTreeMap<String, Vec<RawDirectory>>,
    httpfs_or_webhdfs_host: String,
    httpfs_or_webhdfs_port: IntOrString,
    emails_to_send_alert_to: Vec<String>,
    source_email_address: String,
    logfile: PathBuf,

    #[serde(default = "default_smtp_host")]
    smtp_host: String,
    #[serde(default = "default_smtp_port")]
    smtp_port: u16,
    #[serde(default)]
    use_https: bool,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default = "default_max_concurrency")]
    max_concurrency: usize,
    #[serde(default)]
    on_error: FailureMode,
    #[serde(default)]
    empty_report: EmptyReportPolicy,
    #[serde(default)]
    timestamp_unit: TimestampUnit,
    #[serde(default)]
    auth: AuthConfig,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_max_concurrency() -> usize {
    1
}

impl MonitorConfig {
    /// Loads a config file. `.toml` files are read as TOML, anything else as JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CheckError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(content)
            .map_err(|e| CheckError::config(format!("Failed to parse config file: {}", e)))?;
        raw.validate()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| CheckError::config(format!("Failed to parse config file: {}", e)))?;
        raw.validate()
    }

    pub fn threshold_secs(&self) -> i64 {
        // Bounded in validate(), cannot overflow.
        self.file_age_hours as i64 * 3600
    }
}

impl RawConfig {
    fn validate(self) -> Result<MonitorConfig> {
        let hours = self.file_age_hours.to_i64("file_age_hours")?;
        if hours < 0 || hours.checked_mul(3600).is_none() {
            return Err(CheckError::config(format!(
                "`file_age_hours` must be a non-negative hour count, got {}",
                hours
            )));
        }

        let port = self.httpfs_or_webhdfs_port.to_i64("httpfs_or_webhdfs_port")?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                CheckError::config(format!("`httpfs_or_webhdfs_port` out of range: {}", port))
            })?;

        if self.httpfs_or_webhdfs_host.trim().is_empty() {
            return Err(CheckError::config("`httpfs_or_webhdfs_host` is empty"));
        }

        let mut directories = Vec::new();
        for (label, entries) in self.directories_to_monitor {
            for entry in entries {
                directories.push(MonitoredDirectory {
                    path: normalize_directory(&label, &entry.name)?,
                    label: label.clone(),
                    blacklist: entry.folders_files_blacklist.into_iter().collect(),
                });
            }
        }
        if directories.is_empty() {
            return Err(CheckError::config("`directories_to_monitor` names no directories"));
        }

        if self.emails_to_send_alert_to.is_empty() {
            return Err(CheckError::config("`emails_to_send_alert_to` is empty"));
        }
        check_address("source_email_address", &self.source_email_address)?;
        for recipient in &self.emails_to_send_alert_to {
            check_address("emails_to_send_alert_to", recipient)?;
        }

        if self.max_concurrency == 0 {
            return Err(CheckError::config("`max_concurrency` must be at least 1"));
        }

        Ok(MonitorConfig {
            file_age_hours: hours as u64,
            directories,
            webhdfs: WebHdfsEndpoint {
                host: self.httpfs_or_webhdfs_host,
                port,
                use_https: self.use_https,
                timeout: self.request_timeout_secs.map(Duration::from_secs),
                auth: self.auth,
            },
            mail: MailSettings {
                from: self.source_email_address,
                recipients: self.emails_to_send_alert_to,
                smtp_host: self.smtp_host,
                smtp_port: self.smtp_port,
            },
            logfile: self.logfile,
            max_concurrency: self.max_concurrency,
            on_error: self.on_error,
            empty_report: self.empty_report,
            timestamp_unit: self.timestamp_unit,
        })
    }
}

fn normalize_directory(label: &str, name: &str) -> Result<String> {
    if !name.starts_with('/') {
        return Err(CheckError::config(format!(
            "directory `{}` in `{}` is not an absolute path",
            name, label
        )));
    }
    let trimmed = name.trim_end_matches('/');
    Ok(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
}

fn check_address(key: &str, address: &str) -> Result<()> {
    address
        .parse::<lettre::Address>()
        .map(|_| ())
        .map_err(|e| CheckError::config(format!("`{}` has invalid address {:?}: {}", key, address, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "file_age_hours": "24",
        "directories_to_monitor": {
            "landing": [
                { "name": "/data/landing/", "folders_files_blacklist": ["_SUCCESS", "archive"] }
            ],
            "logs": [
                { "name": "/logs", "folders_files_blacklist": [] }
            ]
        },
        "httpfs_or_webhdfs_host": "namenode.example.com",
        "httpfs_or_webhdfs_port": "14000",
        "emails_to_send_alert_to": ["ops@example.com", "oncall@example.com"],
        "source_email_address": "hdfs-monitor@example.com",
        "logfile": "/tmp/hdfs_file_age_check.log"
    }"#;

    #[test]
    fn test_loads_reference_shape_with_defaults() {
        let config = MonitorConfig::from_json_str(SAMPLE).unwrap();

        assert_eq!(config.file_age_hours, 24);
        assert_eq!(config.threshold_secs(), 86_400);
        assert_eq!(config.webhdfs.port, 14000);
        assert_eq!(
            config.webhdfs.base_url(),
            "http://namenode.example.com:14000/webhdfs/v1"
        );
        assert_eq!(config.webhdfs.timeout, None);
        assert_eq!(config.webhdfs.auth, AuthConfig::None);
        assert_eq!(config.mail.smtp_host, "localhost");
        assert_eq!(config.mail.smtp_port, 25);
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.on_error, FailureMode::Continue);
        assert_eq!(config.empty_report, EmptyReportPolicy::Send);
        assert_eq!(config.timestamp_unit, TimestampUnit::Milliseconds);

        let paths: Vec<&str> = config.directories.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["/data/landing", "/logs"]);
        assert!(config.directories[0].blacklist.contains("_SUCCESS"));
        assert!(config.directories[1].blacklist.is_empty());
    }

    #[test]
    fn test_missing_key_is_fatal() {
        for key in [
            "file_age_hours",
            "directories_to_monitor",
            "httpfs_or_webhdfs_host",
            "httpfs_or_webhdfs_port",
            "emails_to_send_alert_to",
            "source_email_address",
            "logfile",
        ] {
            let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
            value.as_object_mut().unwrap().remove(key);

            let err = MonitorConfig::from_json_str(&value.to_string()).unwrap_err();
            assert!(matches!(err, CheckError::Config(_)), "{}", key);
            assert!(err.to_string().contains(key), "{}: {}", key, err);
        }
    }

    #[test]
    fn test_missing_directory_field_is_fatal() {
        for key in ["name", "folders_files_blacklist"] {
            let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
            value["directories_to_monitor"]["logs"][0]
                .as_object_mut()
                .unwrap()
                .remove(key);

            let err = MonitorConfig::from_json_str(&value.to_string()).unwrap_err();
            assert!(matches!(err, CheckError::Config(_)), "{}", key);
            assert!(err.to_string().contains(key), "{}: {}", key, err);
        }
    }

    #[test]
    fn test_rejects_relative_directory() {
        let content = SAMPLE.replace("\"/logs\"", "\"logs\"");
        let err = MonitorConfig::from_json_str(&content).unwrap_err();
        assert!(err.to_string().contains("not an absolute path"));
    }

    #[test]
    fn test_rejects_invalid_recipient() {
        let content = SAMPLE.replace("oncall@example.com", "not-an-address");
        assert!(matches!(
            MonitorConfig::from_json_str(&content),
            Err(CheckError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_port_and_hours() {
        let content = SAMPLE.replace("\"14000\"", "\"70000\"");
        assert!(MonitorConfig::from_json_str(&content).is_err());

        let content = SAMPLE.replace("\"24\"", "\"-1\"");
        assert!(MonitorConfig::from_json_str(&content).is_err());

        let content = SAMPLE.replace("\"24\"", "\"a day\"");
        assert!(MonitorConfig::from_json_str(&content).is_err());
    }

    #[test]
    fn test_optional_settings() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.insert("file_age_hours".into(), serde_json::json!(6));
        obj.insert("httpfs_or_webhdfs_port".into(), serde_json::json!(9870));
        obj.insert("max_concurrency".into(), serde_json::json!(4));
        obj.insert("on_error".into(), serde_json::json!("abort"));
        obj.insert("empty_report".into(), serde_json::json!("all_clear"));
        obj.insert("timestamp_unit".into(), serde_json::json!("seconds"));
        obj.insert("request_timeout_secs".into(), serde_json::json!(30));
        obj.insert("use_https".into(), serde_json::json!(true));
        obj.insert(
            "auth".into(),
            serde_json::json!({ "method": "pseudo", "user": "hdfs" }),
        );

        let config = MonitorConfig::from_json_str(&value.to_string()).unwrap();
        assert_eq!(config.file_age_hours, 6);
        assert_eq!(config.webhdfs.port, 9870);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.on_error, FailureMode::Abort);
        assert_eq!(config.empty_report, EmptyReportPolicy::AllClear);
        assert_eq!(config.timestamp_unit, TimestampUnit::Seconds);
        assert_eq!(config.webhdfs.timeout, Some(Duration::from_secs(30)));
        assert!(config.webhdfs.base_url().starts_with("https://"));
        assert_eq!(
            config.webhdfs.auth,
            AuthConfig::Pseudo { user: "hdfs".into() }
        );
    }

    #[test]
    fn test_negotiate_defaults_token_env() {
        let content = SAMPLE.replacen(
            "\"logfile\"",
            "\"auth\": { \"method\": \"negotiate\" }, \"logfile\"",
            1,
        );
        let config = MonitorConfig::from_json_str(&content).unwrap();
        assert_eq!(
            config.webhdfs.auth,
            AuthConfig::Negotiate { token_env: DEFAULT_NEGOTIATE_TOKEN_ENV.into() }
        );
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
file_age_hours = 12
httpfs_or_webhdfs_host = "namenode"
httpfs_or_webhdfs_port = 50070
emails_to_send_alert_to = ["ops@example.com"]
source_email_address = "monitor@example.com"
logfile = "/var/log/hdfs_age.log"
on_error = "abort"

[[directories_to_monitor.staging]]
name = "/staging"
folders_files_blacklist = ["tmp"]
"#
        )
        .unwrap();

        let config = MonitorConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.file_age_hours, 12);
        assert_eq!(config.directories.len(), 1);
        assert_eq!(config.directories[0].label, "staging");
        assert_eq!(config.on_error, FailureMode::Abort);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MonitorConfig::load_from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));
    }
}
