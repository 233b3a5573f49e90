// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Flattening of `dataset_results` into per-category rows

use crate::aggregate::{dataset_average, DatasetAverage};
use crate::error::ValueWarning;
use crate::loader::EvalFile;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One validated result entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub file: String,
    pub accuracy_mean: f64,
}

/// One flat row: a category score of one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub dataset: String,
    pub category: String,
    /// File name of the category, without directories
    pub file: String,
    /// Stored ratio in [0, 1]; never rescaled in place
    pub accuracy_mean: f64,
    pub source_label: String,
}

/// Everything extracted from one file
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub rows: Vec<Row>,
    /// Dataset averages in file order, empty datasets left out
    pub averages: Vec<DatasetAverage>,
    pub warnings: Vec<ValueWarning>,
}

/// Short dataset name: `datasets/tmmlu/` becomes `tmmlu`
pub fn dataset_name(path: &str) -> String {
    if path.starts_with("datasets/") {
        path.rsplit("datasets/")
            .next()
            .unwrap_or(path)
            .trim_matches('/')
            .to_string()
    } else {
        path.to_string()
    }
}

/// Last path component of a result's `file`
pub fn file_name(file: &str) -> &str {
    file.trim_end_matches('/').rsplit('/').next().unwrap_or(file)
}

/// Category label: the file name without its last extension
pub fn category_name(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    }
}

impl CategoryResult {
    /// Validate one raw entry of a `results` list
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let entry = value.as_object().ok_or_else(|| "entry is not an object".to_string())?;

        let file = match entry.get("file") {
            None | Some(Value::Null) => return Err("missing `file`".to_string()),
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(_) => return Err("`file` is not a non-empty string".to_string()),
        };

        let accuracy_mean = match entry.get("accuracy_mean") {
            None | Some(Value::Null) => return Err("missing `accuracy_mean`".to_string()),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        }
        .ok_or_else(|| "`accuracy_mean` is not a number".to_string())?;

        if !accuracy_mean.is_finite() || !(0.0..=1.0).contains(&accuracy_mean) {
            return Err(format!("`accuracy_mean` {} is outside [0, 1]", accuracy_mean));
        }

        Ok(Self { file, accuracy_mean })
    }
}

/// Extract rows and dataset averages from a validated file
pub fn extract(file: &EvalFile, source_label: &str) -> Extraction {
    let mut extraction = Extraction::default();

    for dataset in &file.dataset_results {
        let name = dataset_name(&dataset.path);
        let mut values = Vec::with_capacity(dataset.results.len());

        for (index, raw) in dataset.results.iter().enumerate() {
            match CategoryResult::from_value(raw) {
                Ok(result) => {
                    let fname = file_name(&result.file).to_string();
                    values.push(result.accuracy_mean);
                    extraction.rows.push(Row {
                        dataset: name.clone(),
                        category: category_name(&fname).to_string(),
                        file: fname,
                        accuracy_mean: result.accuracy_mean,
                        source_label: source_label.to_string(),
                    });
                }
                Err(reason) => {
                    let warning = ValueWarning {
                        file: file.name.clone(),
                        dataset: name.clone(),
                        index,
                        reason,
                    };
                    tracing::warn!("{}", warning);
                    extraction.warnings.push(warning);
                }
            }
        }

        tracing::debug!(
            "{}: dataset `{}` -> {} rows ({} entries)",
            file.name,
            name,
            values.len(),
            dataset.results.len()
        );

        if let Some(avg) = dataset_average(&name, dataset.average_accuracy, &values) {
            extraction.averages.push(avg);
        }
    }

    extraction
}
