// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Analyzer for Twinkle Eval result files
//!
//! This crate provides:
//! - Loading of .json / .jsonl result documents with per-file validation
//! - Extraction of per-category accuracy rows and dataset averages
//! - Comparison views across models: grouping, sorting, paging, 0-100 scaling
//! - Rendering as text tables, text charts and SVG bar charts
//! - CSV export of a page and Markdown/JSON run reports

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod loader;
pub mod present;
pub mod render;
pub mod report;
pub mod session;

pub use aggregate::DatasetAverage;
pub use config::{AnalyzerConfig, OutputConfig, SortMode, ViewConfig};
pub use error::{LoadError, ValueWarning, ViewError};
pub use extract::{CategoryResult, Row};
pub use loader::{DatasetResult, EvalFile};
pub use present::{CategoryGroup, DatasetView, Page, Scale};
pub use report::RunReport;
pub use session::{LoadFailure, LoadedSource, Session};
