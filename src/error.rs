//! Error type shared by split, stitch and the batch layer.
//!
//! [`ProcessError`] carries the four failure categories every operation can
//! report. [`ErrorKind`] is the serializable category alone, used in batch
//! reports where the full error (with its `io::Error` chain) is flattened to
//! a message.

use crate::imaging::BackendError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Failed to decode {input}: {message}")]
    Decode { input: String, message: String },
    #[error("IO error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    #[error("Unsupported conversion: {0}")]
    UnsupportedConversion(String),
}

/// Failure category of a [`ProcessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    DecodeFailure,
    IoFailure,
    UnsupportedConversion,
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            ProcessError::Decode { .. } => ErrorKind::DecodeFailure,
            ProcessError::Io { .. } => ErrorKind::IoFailure,
            ProcessError::UnsupportedConversion(_) => ErrorKind::UnsupportedConversion,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ProcessError::InvalidParameter(message.into())
    }
}

impl From<BackendError> for ProcessError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Io { path, source } => ProcessError::Io {
                path,
                message: source.to_string(),
            },
            BackendError::Decode { input, message } => ProcessError::Decode { input, message },
            // Encoding writes nothing until the bytes are ready, so an encoder
            // failure is reported against the output it was meant for.
            BackendError::Encode { path, message } => ProcessError::Io { path, message },
            BackendError::Unsupported { format, message } => {
                ProcessError::UnsupportedConversion(format!("{format}: {message}"))
            }
        }
    }
}
