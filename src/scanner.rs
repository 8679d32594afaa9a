use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::auth::{self, Authenticator};
use crate::config::WebHdfsEndpoint;
use crate::error::{CheckError, Result};

/// One child of a listed directory, as reported by LISTSTATUS.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub name: String,
    /// Left unparsed; the classifier decides what counts as a timestamp.
    pub modification_time: Value,
    /// `FILE`, `DIRECTORY` or `SYMLINK` when the server reports it.
    pub kind: Option<String>,
}

/// Anything that can list the immediate children of a remote directory.
pub trait ListingSource: Sync {
    fn list(&self, directory: &str) -> Result<Vec<RemoteEntry>>;
}

pub struct WebHdfsClient {
    client: Client,
    base_url: Url,
    auth: Box<dyn Authenticator>,
}

impl WebHdfsClient {
    pub fn new(endpoint: &WebHdfsEndpoint) -> Result<Self> {
        let auth = auth::from_config(&endpoint.auth)?;
        let base_url = Url::parse(&endpoint.base_url()).map_err(|e| {
            CheckError::config(format!("Invalid WebHDFS endpoint {}: {}", endpoint.base_url(), e))
        })?;
        // No timeout unless configured, hung calls are the scheduler's problem.
        // The cookie store carries `hadoop.auth` between requests so a
        // SPNEGO token is only presented once per run.
        let client = Client::builder()
            .timeout(endpoint.timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| CheckError::transport(base_url.as_str(), e))?;

        tracing::debug!(base_url = %base_url, auth = auth.describe(), "WebHDFS client ready");
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// `{base}/{segments...}?op=LISTSTATUS`, each path segment percent-encoded.
    pub fn listing_url(&self, directory: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CheckError::config(format!("WebHDFS endpoint {} cannot take a path", self.base_url))
            })?;
            let mut pushed = false;
            for segment in directory.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
                pushed = true;
            }
            if !pushed {
                segments.push("");
            }
        }
        url.query_pairs_mut().append_pair("op", "LISTSTATUS");
        Ok(url)
    }
}

impl ListingSource for WebHdfsClient {
    fn list(&self, directory: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.listing_url(directory)?;
        tracing::debug!(url = %url, "Listing directory");

        let response = self
            .auth
            .authorize(self.client.get(url.clone()))
            .send()
            .map_err(|e| CheckError::transport(url.as_str(), e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| CheckError::transport(url.as_str(), e))?;

        if !status.is_success() {
            return Err(CheckError::transport(url.as_str(), describe_failure(status, &body)));
        }
        parse_listing(url.as_str(), &body)
    }
}

#[derive(Debug, Deserialize)]
struct FileStatuses {
    #[serde(rename = "FileStatus")]
    file_status: Vec<FileStatus>,
}

#[derive(Debug, Deserialize)]
struct FileStatus {
    #[serde(rename = "pathSuffix")]
    path_suffix: String,
    #[serde(rename = "modificationTime")]
    modification_time: Value,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionBody {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    #[serde(default)]
    exception: String,
    #[serde(default)]
    message: String,
}

/// Parses a LISTSTATUS body: an object whose values each hold a `FileStatus` array.
pub fn parse_listing(url: &str, body: &str) -> Result<Vec<RemoteEntry>> {
    let document: BTreeMap<String, FileStatuses> =
        serde_json::from_str(body).map_err(|e| CheckError::parse(url, e))?;

    Ok(document
        .into_values()
        .flat_map(|statuses| statuses.file_status)
        .map(|status| RemoteEntry {
            name: status.path_suffix,
            modification_time: status.modification_time,
            kind: status.kind,
        })
        .collect())
}

fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<RemoteExceptionBody>(body) {
        Ok(parsed) => format!(
            "HTTP {}: {}: {}",
            status, parsed.remote_exception.exception, parsed.remote_exception.message
        ),
        Err(_) => format!("HTTP {}", status),
    }
}
