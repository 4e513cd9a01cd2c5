//! Error types for zeroapi operations.
//!
//! [`ZeroApiError`] covers everything the facade can fail with. The
//! `Check` variant carries the diagnostics of a failed check together with
//! the source text, so hosts can render them with labels.

use std::{io, path::PathBuf};

use thiserror::Error;

use zeroapi_parser::error::ParseError;

/// The main error type for zeroapi operations.
#[derive(Debug, Error)]
pub enum ZeroApiError {
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {err}", path.display())]
    Check {
        err: ParseError,
        src: String,
        path: PathBuf,
    },
}

impl ZeroApiError {
    /// Create a new `Check` error with the associated source code.
    pub fn new_check_error(err: ParseError, src: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Check {
            err,
            src: src.into(),
            path: path.into(),
        }
    }
}
