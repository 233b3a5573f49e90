// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! The set of loaded eval files for one run
//!
//! Orchestrates:
//! - Per-file loading with isolation (a rejected file never stops the others)
//! - Row extraction and dataset averages per source
//! - Disambiguation of repeated source labels
//! - Building dataset views over everything loaded

use crate::aggregate::DatasetAverage;
use crate::config::ViewConfig;
use crate::error::{LoadError, ValueWarning, ViewError};
use crate::extract::{extract, Row};
use crate::loader::EvalFile;
use crate::present::{self, DatasetView};
use serde::Serialize;
use std::path::Path;

/// A file that was loaded and contributed rows
#[derive(Debug, Clone, Serialize)]
pub struct LoadedSource {
    pub file: String,
    /// Column label; suffixed with ` (n)` when it repeats an earlier file
    pub source_label: String,
    pub model_name: String,
    pub timestamp: String,
    pub row_count: usize,
    pub averages: Vec<DatasetAverage>,
    pub warnings: Vec<ValueWarning>,
}

/// A file rejected as a whole
#[derive(Debug, Clone, Serialize)]
pub struct LoadFailure {
    pub file: String,
    pub kind: String,
    pub message: String,
}

impl From<&LoadError> for LoadFailure {
    fn from(err: &LoadError) -> Self {
        Self {
            file: err.file().to_string(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// All sources of one run, in load order
#[derive(Debug, Default)]
pub struct Session {
    sources: Vec<LoadedSource>,
    failures: Vec<LoadFailure>,
    /// Valid files that produced no rows
    empty_files: Vec<String>,
    rows: Vec<Row>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every path; failures are recorded, never returned
    pub fn load_paths<P: AsRef<Path>>(&mut self, paths: &[P]) {
        for path in paths {
            let path = path.as_ref();
            tracing::info!("Loading {}", path.display());
            match EvalFile::load(path) {
                Ok(file) => self.add_file(file),
                Err(err) => self.reject(err),
            }
        }

        tracing::info!(
            "Loaded {} sources ({} rows); {} files rejected",
            self.sources.len(),
            self.rows.len(),
            self.failures.len()
        );
    }

    /// Load one in-memory document, e.g. an upload
    pub fn load_bytes(&mut self, name: &str, bytes: &[u8]) {
        match EvalFile::from_bytes(name, bytes) {
            Ok(file) => self.add_file(file),
            Err(err) => self.reject(err),
        }
    }

    fn reject(&mut self, err: LoadError) {
        tracing::error!("Rejected {}", err);
        self.failures.push(LoadFailure::from(&err));
    }

    /// Add a validated file
    pub fn add_file(&mut self, file: EvalFile) {
        let source_label = self.unique_label(file.source_label());
        let extraction = extract(&file, &source_label);

        if extraction.rows.is_empty() {
            tracing::warn!("{}: no usable results; not shown", file.name);
            self.empty_files.push(file.name);
            return;
        }

        tracing::info!(
            "{}: {} rows across {} datasets as `{}`",
            file.name,
            extraction.rows.len(),
            file.dataset_results.len(),
            source_label
        );

        self.sources.push(LoadedSource {
            file: file.name,
            source_label,
            model_name: file.model_name,
            timestamp: file.timestamp,
            row_count: extraction.rows.len(),
            averages: extraction.averages,
            warnings: extraction.warnings,
        });
        self.rows.extend(extraction.rows);
    }

    fn unique_label(&self, base: String) -> String {
        let taken = |label: &str| self.sources.iter().any(|s| s.source_label == label);
        if !taken(&base) {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{} ({})", base, n);
            if !taken(&candidate) {
                tracing::warn!("Source label `{}` already loaded; using `{}`", base, candidate);
                return candidate;
            }
            n += 1;
        }
    }

    pub fn sources(&self) -> &[LoadedSource] {
        &self.sources
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn empty_files(&self) -> &[String] {
        &self.empty_files
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column labels in load order
    pub fn source_labels(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.source_label.clone()).collect()
    }

    /// Dataset selector options, sorted
    pub fn datasets(&self) -> Vec<String> {
        present::datasets(&self.rows)
    }

    /// Present one dataset
    pub fn view(&self, config: &ViewConfig) -> Result<DatasetView, ViewError> {
        DatasetView::build(&self.rows, &self.source_labels(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortMode;

    fn doc(model: &str, timestamp: &str, scores: &[(&str, f64)]) -> String {
        let results: Vec<String> = scores
            .iter()
            .map(|(c, v)| format!(r#"{{"file": "datasets/ds/{}.csv", "accuracy_mean": {}}}"#, c, v))
            .collect();
        format!(
            r#"{{"timestamp": "{}", "config": {{"model": {{"name": "{}"}}}},
                "dataset_results": {{"datasets/ds/": {{"results": [{}]}}}}}}"#,
            timestamp,
            model,
            results.join(",")
        )
    }

    #[test]
    fn test_bad_file_does_not_affect_others() {
        let mut session = Session::new();
        session.load_bytes("a.json", doc("A", "t1", &[("c1", 0.9), ("c2", 0.8)]).as_bytes());
        session.load_bytes(
            "broken.json",
            br#"{"timestamp": "t", "config": {"model": {"name": "X"}}}"#,
        );
        session.load_bytes("b.json", doc("B", "t2", &[("c1", 0.7), ("c2", 0.95)]).as_bytes());

        assert_eq!(session.sources().len(), 2);
        assert_eq!(session.failures().len(), 1);
        assert_eq!(session.failures()[0].file, "broken.json");
        assert_eq!(session.failures()[0].kind, "schema");
        assert!(session.failures()[0].message.contains("dataset_results"));

        // The rejected source appears nowhere downstream
        assert!(session.rows().iter().all(|r| !r.source_label.starts_with("X @")));
        let view = session.view(&ViewConfig::default()).unwrap();
        assert_eq!(view.sources, vec!["A @ t1", "B @ t2"]);
        assert_eq!(view.category_order(), vec!["c2", "c1"]);
    }

    #[test]
    fn test_duplicate_labels_are_disambiguated() {
        let mut session = Session::new();
        let text = doc("A", "t1", &[("c1", 0.5)]);
        session.load_bytes("first.json", text.as_bytes());
        session.load_bytes("second.json", text.as_bytes());
        session.load_bytes("third.json", text.as_bytes());

        assert_eq!(session.source_labels(), vec!["A @ t1", "A @ t1 (2)", "A @ t1 (3)"]);
        let view = session.view(&ViewConfig::default()).unwrap();
        assert_eq!(view.sources.len(), 3);
        assert!(view.categories[0].scores.iter().all(Option::is_some));
    }

    #[test]
    fn test_file_without_rows_is_not_a_source() {
        let mut session = Session::new();
        session.load_bytes("empty.json", doc("E", "t", &[]).as_bytes());

        assert!(session.is_empty());
        assert_eq!(session.empty_files().to_vec(), vec!["empty.json".to_string()]);
        assert_eq!(session.view(&ViewConfig::default()).unwrap_err(), ViewError::Empty);
    }

    #[test]
    fn test_load_paths_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, doc("A", "t1", &[("c1", 0.5), ("c2", 0.6), ("c3", 0.7)])).unwrap();
        let bad = dir.path().join("bad.jsonl");
        std::fs::write(&bad, "not json at all\n").unwrap();

        let mut session = Session::new();
        session.load_paths(&[good, bad, dir.path().join("missing.json")]);

        assert_eq!(session.sources().len(), 1);
        assert_eq!(session.sources()[0].row_count, 3);
        assert_eq!(session.sources()[0].averages.len(), 1);
        assert_eq!(session.failures().len(), 2);
        assert_eq!(session.failures()[0].kind, "parse");
        assert_eq!(session.failures()[1].kind, "io");
        assert_eq!(session.datasets(), vec!["ds"]);

        let config = ViewConfig {
            sort: SortMode::Asc,
            page_size: 2,
            ..ViewConfig::default()
        };
        let view = session.view(&config).unwrap();
        assert_eq!(view.page_count(), 2);
    }
}
