//! Error types for Flowlens.
//!
//! The graph, row and layout pipeline is total over well-typed input, so
//! errors only surface at the edges: decoding records and loading config.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Flowlens operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum FlowlensError {
    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Malformed workflow definition or task record.
    #[error("{0}")]
    Model(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<FlowlensError> for String {
    fn from(val: FlowlensError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for FlowlensError {
    fn from(error: std::io::Error) -> Self {
        FlowlensError::IoError(error.to_string())
    }
}

impl From<FlowlensError> for std::io::Error {
    fn from(val: FlowlensError) -> Self {
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for FlowlensError {
    fn from(error: serde_json::Error) -> Self {
        FlowlensError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for FlowlensError {
    fn from(error: toml::de::Error) -> Self {
        FlowlensError::Config(error.to_string())
    }
}
