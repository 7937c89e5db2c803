use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure or a non-success status from the server.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} did not return UTF-8 text: {source}")]
    Decode {
        url: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid selector: {reason}")]
    Selector { reason: String },

    #[error("listing anchor #{index} has no href attribute")]
    MissingHref { index: usize },

    #[error("{url} has no `file` query parameter")]
    MissingFileParam { url: String },

    /// The name would place the file outside the output directory.
    #[error("refusing to write {name:?}: not a plain file name")]
    UnsafeFileName { name: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("download pool closed: {0}")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    #[error("{} download(s) failed: {}", .0.len(), join_messages(.0))]
    Batch(Vec<Error>),
}

impl Error {
    pub(crate) fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Http {
            url: url.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
