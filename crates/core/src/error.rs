// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for tracker operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by tracker operations and forwarded over the wire.
///
/// The variant is the error kind; the payload is the human-readable message,
/// preserved verbatim when it originates in a helper.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum TrackerError {
    /// A mount spec could not be parsed.
    #[error("{0}")]
    InvalidArgument(String),

    /// Duplicate `(peer, object path)` registration or spec-match collision.
    #[error("{0}")]
    AlreadyMounted(String),

    /// No mount matched and no automount path applied.
    #[error("{0}")]
    NotMounted(String),

    /// No mountable descriptor exists for the requested type.
    #[error("{0}")]
    NotSupported(String),

    /// Generic failure: missing exec key, spawn failure, helper-reported error.
    #[error("{0}")]
    Failed(String),
}

impl TrackerError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        TrackerError::InvalidArgument(message.into())
    }

    pub fn already_mounted(message: impl Into<String>) -> Self {
        TrackerError::AlreadyMounted(message.into())
    }

    pub fn not_mounted(message: impl Into<String>) -> Self {
        TrackerError::NotMounted(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        TrackerError::NotSupported(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        TrackerError::Failed(message.into())
    }

    /// The message carried by the error, without the kind.
    pub fn message(&self) -> &str {
        match self {
            TrackerError::InvalidArgument(m)
            | TrackerError::AlreadyMounted(m)
            | TrackerError::NotMounted(m)
            | TrackerError::NotSupported(m)
            | TrackerError::Failed(m) => m,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
