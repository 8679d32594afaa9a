//! Error types shared by every stage of a check run.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Error, Debug)]
pub enum CheckError {
    /// Missing or malformed configuration. Always fatal, raised before any scan.
    #[error("Config error: {0}")]
    Config(String),

    /// The listing call failed (network, HTTP status, authentication).
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The listing response was not the JSON shape LISTSTATUS returns.
    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    /// A modification time that is not an integer-like value.
    #[error("Invalid timestamp for {entry}: {raw}")]
    InvalidTimestamp { entry: String, raw: String },

    /// The mail relay was unreachable or rejected the message.
    #[error("Delivery to {recipient} failed: {message}")]
    Delivery { recipient: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl CheckError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn delivery(recipient: impl Into<String>, message: impl ToString) -> Self {
        Self::Delivery {
            recipient: recipient.into(),
            message: message.to_string(),
        }
    }
}
