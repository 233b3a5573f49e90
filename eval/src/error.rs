// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error and warning types for loading and presenting eval files
//!
//! A `LoadError` rejects one file and never the whole session. A
//! `ValueWarning` skips one result entry inside an otherwise valid file.

use serde::Serialize;
use std::fmt;

/// Why a single input file was rejected
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read from disk
    #[error("cannot read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Neither the whole text nor any JSONL line is a JSON object
    #[error("{file} is not a valid Twinkle Eval JSON object: {message}")]
    Parse { file: String, message: String },

    /// A required field is absent or has the wrong JSON type
    #[error("{file} is missing required field `{path}` (or it is malformed)")]
    Schema { file: String, path: String },
}

impl LoadError {
    /// Name of the file this error refers to
    pub fn file(&self) -> &str {
        match self {
            LoadError::Io { file, .. } | LoadError::Parse { file, .. } | LoadError::Schema { file, .. } => file,
        }
    }

    /// Short machine-readable kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => "io",
            LoadError::Parse { .. } => "parse",
            LoadError::Schema { .. } => "schema",
        }
    }
}

/// A result entry that was skipped during extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueWarning {
    pub file: String,
    pub dataset: String,
    /// Position of the entry inside `results`
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for ValueWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: dataset `{}` result #{} skipped: {}",
            self.file, self.dataset, self.index, self.reason
        )
    }
}

/// Errors raised while building a view over loaded files
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    #[error("no rows loaded; provide at least one valid Twinkle Eval file")]
    Empty,

    #[error("unknown dataset `{requested}` (available: {})", .available.join(", "))]
    UnknownDataset {
        requested: String,
        available: Vec<String>,
    },

    #[error("page size must be at least 1")]
    ZeroPageSize,

    #[error("page {page} out of range (1-{pages})")]
    PageOutOfRange { page: usize, pages: usize },
}
