// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Run reports in Markdown and JSON

use crate::config::{SortMode, ViewConfig};
use crate::error::ValueWarning;
use crate::present::{CategoryGroup, DatasetView, Scale};
use crate::render;
use crate::session::{LoadFailure, LoadedSource, Session};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// One page of the presented view
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub number: usize,
    pub start: usize,
    pub end: usize,
    pub categories: Vec<CategoryGroup>,
}

/// The presented dataset
#[derive(Debug, Clone, Serialize)]
pub struct ViewSummary {
    pub dataset: String,
    pub sources: Vec<String>,
    pub sort: SortMode,
    pub page_size: usize,
    pub scale: Scale,
    pub total_categories: usize,
    pub pages: Vec<PageSummary>,
}

/// Everything known about one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub datasets: Vec<String>,
    pub sources: Vec<LoadedSource>,
    pub failures: Vec<LoadFailure>,
    pub empty_files: Vec<String>,
    pub view: Option<ViewSummary>,
}

impl ViewSummary {
    pub fn from_view(view: &DatasetView) -> Self {
        Self {
            dataset: view.dataset.clone(),
            sources: view.sources.clone(),
            sort: view.sort,
            page_size: view.page_size,
            scale: view.scale,
            total_categories: view.categories.len(),
            pages: view
                .pages()
                .iter()
                .map(|p| PageSummary {
                    number: p.number,
                    start: p.start,
                    end: p.end,
                    categories: p.categories.to_vec(),
                })
                .collect(),
        }
    }
}

impl RunReport {
    pub fn new(session: &Session, view: Option<&DatasetView>) -> Self {
        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            datasets: session.datasets(),
            sources: session.sources().to_vec(),
            failures: session.failures().to_vec(),
            empty_files: session.empty_files().to_vec(),
            view: view.map(ViewSummary::from_view),
        }
    }

    /// All skipped result entries across sources
    pub fn warnings(&self) -> impl Iterator<Item = &ValueWarning> {
        self.sources.iter().flat_map(|s| s.warnings.iter())
    }

    /// Save as pretty JSON
    pub fn save_json(&self, output_path: &Path) -> Result<()> {
        create_parent_dir(output_path)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        tracing::info!("Report saved to {}", output_path.display());
        Ok(())
    }

    /// Render as Markdown; `view` supplies the page tables
    pub fn to_markdown(&self, view: Option<&DatasetView>) -> String {
        let mut report = String::new();

        report.push_str("# Twinkle Eval Analysis Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", self.version));

        report.push_str("## Sources\n\n");
        if self.sources.is_empty() {
            report.push_str("_No valid files loaded._\n\n");
        } else {
            report.push_str("| Source | File | Rows | Skipped entries |\n");
            report.push_str("|--------|------|------|-----------------|\n");
            for source in &self.sources {
                report.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    source.source_label,
                    source.file,
                    source.row_count,
                    source.warnings.len()
                ));
            }
            report.push('\n');
        }

        if !self.failures.is_empty() || !self.empty_files.is_empty() {
            report.push_str("### Rejected Files\n\n");
            for failure in &self.failures {
                report.push_str(&format!("- **{}** ({}): {}\n", failure.file, failure.kind, failure.message));
            }
            for file in &self.empty_files {
                report.push_str(&format!("- **{}**: no usable results\n", file));
            }
            report.push('\n');
        }

        let warnings: Vec<&ValueWarning> = self.warnings().collect();
        if !warnings.is_empty() {
            report.push_str("### Skipped Entries\n\n");
            for warning in warnings {
                report.push_str(&format!("- {}\n", warning));
            }
            report.push('\n');
        }

        report.push_str("## Dataset Averages\n\n");
        let mut any_average = false;
        for source in &self.sources {
            if source.averages.is_empty() {
                continue;
            }
            any_average = true;
            report.push_str(&format!("### {}\n\n", source.source_label));
            report.push_str("| Dataset | Average Accuracy | Derived |\n");
            report.push_str("|---------|------------------|---------|\n");
            for avg in &source.averages {
                let derived = if avg.derived { "yes" } else { "-" };
                report.push_str(&format!("| {} | {:.4} | {} |\n", avg.dataset, avg.value, derived));
            }
            report.push('\n');
        }
        if !any_average {
            report.push_str("_No dataset averages available._\n\n");
        }

        if let Some(view) = view {
            report.push_str(&format!("## Dataset: {}\n\n", view.dataset));
            report.push_str(&format!(
                "- **Sort:** {:?}\n- **Page size:** {}\n- **Scale:** {}\n\n",
                view.sort,
                view.page_size,
                view.scale.metric_label()
            ));
            for page in view.pages() {
                report.push_str(&format!("### {}\n\n", page.title()));
                report.push_str(&render::markdown_table(&page));
                report.push('\n');
            }
        }

        report
    }

    pub fn save_markdown(&self, view: Option<&DatasetView>, output_path: &Path) -> Result<()> {
        create_parent_dir(output_path)?;
        std::fs::write(output_path, self.to_markdown(view))
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        tracing::info!("Markdown report saved to {}", output_path.display());
        Ok(())
    }
}

/// View settings as a human-readable line
pub fn describe_view(config: &ViewConfig) -> String {
    format!(
        "dataset={} sort={:?} page_size={} scale={}",
        config.dataset.as_deref().unwrap_or("<first>"),
        config.sort,
        config.page_size,
        if config.percent { "0-100" } else { "0-1" }
    )
}

fn create_parent_dir(output_path: &Path) -> Result<()> {
    let dir = output_path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}
