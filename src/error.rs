//! Error types for the linker core.
//!
//! `LinkError` is the outcome of a failed file parse. It is deliberately
//! `Clone + PartialEq`: a parse result is computed once per file and cached,
//! so every caller of `File::parse` must be able to observe the identical
//! error. Pipeline plumbing (opening inputs, writing the link map) uses
//! `anyhow` instead, matching the rest of the crate.

use std::fmt;

use thiserror::Error;

/// A failure while turning one linker input into atoms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The input is not a valid object file for any supported container.
    #[error("{path}: cannot parse object file: {detail}")]
    Malformed { path: String, detail: String },

    /// The input parsed, but its container format does not match the
    /// backend it was handed to.
    #[error("{path}: wrong object format: expected {expected}, found {found}")]
    WrongFormat {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An invocation named no inputs at all.
    #[error("no input files")]
    NoInputFiles,
}

impl LinkError {
    pub(crate) fn malformed(path: &str, detail: impl fmt::Display) -> Self {
        LinkError::Malformed {
            path: path.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn wrong_format(path: &str, expected: &'static str, found: &'static str) -> Self {
        LinkError::WrongFormat {
            path: path.to_string(),
            expected,
            found,
        }
    }
}
