// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Analyzer configuration
//!
//! Settings can come from a JSON file; command-line flags override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Category ordering within a dataset view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Highest mean across sources first
    #[default]
    Desc,
    /// Lowest mean across sources first
    Asc,
    /// Category label, lexicographic
    Alpha,
}

/// What to show: the dashboard controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Dataset to present (first dataset by name when unset)
    pub dataset: Option<String>,
    pub sort: SortMode,
    /// Categories per page
    pub page_size: usize,
    /// Display values on a 0-100 scale
    pub percent: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            sort: SortMode::Desc,
            page_size: 20,
            percent: false,
        }
    }
}

/// Where and what to write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    /// One CSV per page
    pub csv: bool,
    /// One SVG bar chart per page
    pub svg: bool,
    /// Markdown and JSON run report
    pub report: bool,
    /// Fixed decimals in CSV cells (shortest exact form when unset)
    pub csv_precision: Option<usize>,
    /// Print text bar charts next to tables
    pub text_chart: bool,
    /// Width in characters of the longest text bar
    pub chart_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("twinkle_output"),
            csv: false,
            svg: false,
            report: false,
            csv_precision: None,
            text_chart: false,
            chart_width: 40,
        }
    }
}

/// Complete analyzer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub view: ViewConfig,
    /// 1-based page to show; all pages when unset
    pub page: Option<usize>,
    pub output: OutputConfig,
}

impl AnalyzerConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject settings no view can satisfy
    pub fn validate(&self) -> Result<()> {
        if self.view.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.page == Some(0) {
            anyhow::bail!("pages are numbered from 1");
        }
        if self.output.chart_width == 0 {
            anyhow::bail!("chart_width must be at least 1");
        }
        Ok(())
    }
}
