// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset-level averages
//!
//! A reported `average_accuracy` is passed through untouched. A missing one is
//! derived as the unweighted mean of the dataset's category values. Datasets
//! without any value are left out of aggregate views rather than zero-filled.

use serde::{Deserialize, Serialize};

/// Overall accuracy of one dataset within one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAverage {
    pub dataset: String,
    pub value: f64,
    /// True when computed here instead of read from the file
    pub derived: bool,
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Resolve the average for one dataset
pub fn dataset_average(dataset: &str, reported: Option<f64>, values: &[f64]) -> Option<DatasetAverage> {
    if let Some(value) = reported {
        return Some(DatasetAverage {
            dataset: dataset.to_string(),
            value,
            derived: false,
        });
    }

    match mean(values) {
        Some(value) => Some(DatasetAverage {
            dataset: dataset.to_string(),
            value,
            derived: true,
        }),
        None => {
            tracing::debug!("Dataset `{}` has no results; excluded from averages", dataset);
            None
        }
    }
}
