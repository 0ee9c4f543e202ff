#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the ghstats crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Every variant is fatal for the current invocation: a report is either
//! computed and delivered in full or not at all.

use std::path::{Path, PathBuf};

/// Unified error type returned by the report pipeline and CLI.
#[derive(Debug, masterror::Error)]
pub enum Error
{
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error,
    },
    /// Returned when the configuration or invocation violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String,
    },
    /// Returned when a literal timestamp does not match the expected format.
    #[error("invalid timestamp {input:?}: {source}")]
    TimeParse {
        /// Text supplied by the caller.
        input:  String,
        /// Underlying chrono parse error.
        source: chrono::ParseError,
    },
    /// Wraps JSON serialization errors.
    #[error("failed to serialize payload: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error,
    },
    /// Non-rate-limit failures reported by the code-hosting API.
    #[error("source API error: {message}")]
    Source {
        /// Human readable message describing the failed request.
        message: String,
    },
    /// A fetched record misses a field the aggregation relies on.
    #[error("malformed record: {message}")]
    Malformed {
        /// Description of the missing or unexpected field.
        message: String,
    },
    /// The webhook rejected or failed to receive the report.
    #[error("delivery failed: {message}")]
    Delivery {
        /// Human readable message describing the delivery failure.
        message: String,
    },
}

impl Error
{
    /// Constructs a validation error from the provided displayable value.
    pub fn validation<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Constructs a source API error.
    pub fn api<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Source {
            message: message.into(),
        }
    }

    /// Constructs a malformed-record error.
    pub fn malformed<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Constructs a delivery error.
    pub fn delivery<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Delivery {
            message: message.into(),
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation
    /// and is what the CLI prints before exiting.
    pub fn to_display_string(&self,) -> String
    {
        format!("{self}")
    }
}

impl From<serde_yaml::Error,> for Error
{
    fn from(source: serde_yaml::Error,) -> Self
    {
        Self::Parse {
            source,
        }
    }
}

impl From<serde_json::Error,> for Error
{
    fn from(source: serde_json::Error,) -> Self
    {
        Self::Serialize {
            source,
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error,) -> Error
{
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Creates an [`Error::TimeParse`] variant for the rejected input.
pub fn time_parse_error(input: &str, source: chrono::ParseError,) -> Error
{
    Error::TimeParse {
        input: input.to_owned(),
        source,
    }
}
