use std::io;

use thiserror::Error;

/// IP proxy errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// Signature table violates the sorted, non-overlapping layout.
    #[error(transparent)]
    Signature(#[from] ip_proxy_common::SignatureError),
    /// Configuration could not be parsed.
    #[error(transparent)]
    Config(#[from] serde_json::Error),
    /// IO error while reading configuration.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The interception layer rejected a disposition command.
    #[error("packet disposition failed: {0}")]
    Disposition(String),
    /// Teardown response could not be sent.
    #[error("connection termination failed: {0}")]
    Termination(String),
    /// Time restriction window is malformed.
    #[error("time restriction window is invalid: {0}")]
    InvalidWindow(String),
}
