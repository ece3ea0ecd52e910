#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the cloudwatching crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.

use std::path::{Path, PathBuf};

use masterror::AppError;

/// Unified error type returned by the configuration compiler, the tag
/// resolver and the CLI.
///
/// Every variant carries enough context (field, pattern text, namespace,
/// region, underlying cause) to be logged or displayed without re-deriving
/// it from the input.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when an export entry violates a cross-field invariant.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Returned when a dimension match or no-match pattern fails to compile.
    #[error("invalid {field} pattern for dimension '{dimension}' ({pattern:?}): {source}")]
    PatternCompile {
        /// Configuration field holding the pattern (`dimensionsMatch` or
        /// `dimensionsNoMatch`).
        field:     &'static str,
        /// Dimension the pattern applies to.
        dimension: String,
        /// Pattern text as written in the configuration.
        pattern:   String,
        /// Syntax error reported by the regex engine.
        source:    regex::Error
    },
    /// Returned when the default-statistic policy name is not recognized.
    #[error("StatDefault must be one of Prior, Zero, or NaN, got {value:?}")]
    InvalidEnum {
        /// Offending policy name.
        value: String
    },
    /// Returned when a namespace has no resource-type mapping.
    #[error("namespace '{namespace}' has no tagged resource types")]
    UnsupportedNamespace {
        /// Namespace identifier that could not be mapped.
        namespace: String
    },
    /// Wraps failures reported by the tagging service or its session setup.
    #[error("tagging service failed for {namespace} in {region}: {source}")]
    TagService {
        /// Namespace being resolved.
        namespace: String,
        /// Region the session was scoped to.
        region:    String,
        /// Underlying service error.
        source:    AppError
    },
    /// Returned when the caller cancels an in-flight tag resolution.
    #[error("tag resolution for {namespace} in {region} was cancelled")]
    Cancelled {
        /// Namespace being resolved.
        namespace: String,
        /// Region the session was scoped to.
        region:    String
    },
    /// Wraps serialization errors when writing CLI output.
    #[error("failed to serialize output: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// Intended for CLI contexts; the returned string matches the
    /// [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

/// Creates an [`Error::TagService`] variant for the given resolution scope.
///
/// # Parameters
///
/// * `namespace` - Namespace whose resources were being queried.
/// * `region` - Region the tagging session was scoped to.
/// * `source` - Error reported by the tagging transport.
pub fn tag_service_error(namespace: &str, region: &str, source: AppError) -> Error {
    Error::TagService {
        namespace: namespace.to_owned(),
        region: region.to_owned(),
        source
    }
}
