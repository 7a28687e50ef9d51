//! Error types for the arrivals pipeline.
//!
//! Only [`RecordError`] is recovered locally (the offending record is logged
//! and skipped). Everything else surfaces from `fetch()` as an [`Error`].

use thiserror::Error;

/// A single upstream call failed. This is the trigger for credential rotation.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("credential cannot be sent as header {header}")]
    InvalidCredential { header: String },
    #[error("request body for {url} could not be serialized")]
    InvalidBody { url: String },
}

/// The top-level payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One record's time field could not be parsed.
#[derive(Debug, Error)]
#[error("unparseable time {value:?}: {source}")]
pub struct RecordError {
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("all {attempts} credentials failed, last error: {last}")]
    Auth {
        attempts: usize,
        #[source]
        last: FetchError,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] FetchError),
    #[error("decode failure: {0}")]
    Decode(#[from] DecodeError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<prost::DecodeError> for Error {
    fn from(err: prost::DecodeError) -> Self {
        Error::Decode(err.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.into())
    }
}
