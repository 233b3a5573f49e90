// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Grouping, sorting and paging of rows for one dataset
//!
//! Rows are grouped by category with one score per source. Categories are
//! ordered by the mean across sources (or by label) and sliced into pages.
//! Stored ratios are never rescaled; the 0-100 scale is applied on read.

use crate::aggregate::mean;
use crate::config::{SortMode, ViewConfig};
use crate::error::ViewError;
use crate::extract::Row;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Display scale for accuracy values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scale {
    /// Ratios as stored, 0-1
    Ratio,
    /// Percentages, 0-100
    Percent,
}

impl Scale {
    pub fn from_percent(percent: bool) -> Self {
        if percent {
            Scale::Percent
        } else {
            Scale::Ratio
        }
    }

    /// Displayed value for a stored ratio
    pub fn display(self, stored: f64) -> f64 {
        match self {
            Scale::Ratio => stored,
            Scale::Percent => stored * 100.0,
        }
    }

    /// Upper bound of the display range
    pub fn max(self) -> f64 {
        self.display(1.0)
    }

    /// Decimals used for exported values when none are configured
    ///
    /// Percentages get two decimals: `0.07 * 100.0` is `7.000000000000001`.
    pub fn default_precision(self) -> Option<usize> {
        match self {
            Scale::Ratio => None,
            Scale::Percent => Some(2),
        }
    }

    /// Metric column name, as shown in charts
    pub fn metric_label(self) -> &'static str {
        match self {
            Scale::Ratio => "accuracy_mean",
            Scale::Percent => "accuracy_mean (x100)",
        }
    }
}

/// One source's score for a category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    /// Stored ratio; the mean when the source reports the category twice
    pub value: f64,
    pub file: String,
}

/// A category with its scores, aligned to the view's sources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    /// `scores[i]` belongs to `sources[i]` of the view
    pub scores: Vec<Option<Score>>,
    /// Mean of the stored scores present
    pub mean: f64,
}

/// Sorted categories of one dataset across all sources
#[derive(Debug, Clone, Serialize)]
pub struct DatasetView {
    pub dataset: String,
    /// Sources that have at least one row in this dataset, in load order
    pub sources: Vec<String>,
    pub categories: Vec<CategoryGroup>,
    pub sort: SortMode,
    pub page_size: usize,
    pub scale: Scale,
}

/// A contiguous slice of the sorted categories
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub dataset: &'a str,
    /// 1-based page number
    pub number: usize,
    pub pages: usize,
    /// 1-based position of the first category on this page
    pub start: usize,
    /// 1-based position of the last category on this page
    pub end: usize,
    /// Number of categories in the whole view
    pub total: usize,
    pub sources: &'a [String],
    pub categories: &'a [CategoryGroup],
    pub scale: Scale,
}

/// Distinct dataset names, sorted
pub fn datasets(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|r| r.dataset.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Order categories in place; ties fall back to the label
pub fn sort_categories(categories: &mut [CategoryGroup], mode: SortMode) {
    match mode {
        SortMode::Desc => categories.sort_by(|a, b| {
            b.mean
                .total_cmp(&a.mean)
                .then_with(|| a.category.cmp(&b.category))
        }),
        SortMode::Asc => categories.sort_by(|a, b| {
            a.mean
                .total_cmp(&b.mean)
                .then_with(|| a.category.cmp(&b.category))
        }),
        SortMode::Alpha => categories.sort_by(|a, b| a.category.cmp(&b.category)),
    }
}

/// Number of pages needed for `len` items
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

impl DatasetView {
    /// Build the view for the configured dataset
    ///
    /// `sources` gives the column order; labels absent from it are appended
    /// in row order.
    pub fn build(rows: &[Row], sources: &[String], view: &ViewConfig) -> Result<Self, ViewError> {
        if view.page_size == 0 {
            return Err(ViewError::ZeroPageSize);
        }
        if rows.is_empty() {
            return Err(ViewError::Empty);
        }

        let available = datasets(rows);
        let dataset = match &view.dataset {
            Some(requested) if available.contains(requested) => requested.clone(),
            Some(requested) => {
                return Err(ViewError::UnknownDataset {
                    requested: requested.clone(),
                    available,
                })
            }
            None => available.first().cloned().ok_or(ViewError::Empty)?,
        };

        let selected: Vec<&Row> = rows.iter().filter(|r| r.dataset == dataset).collect();

        let mut view_sources: Vec<String> = sources
            .iter()
            .filter(|s| selected.iter().any(|r| &r.source_label == *s))
            .cloned()
            .collect();
        for row in &selected {
            if !view_sources.contains(&row.source_label) {
                view_sources.push(row.source_label.clone());
            }
        }
        let source_index: HashMap<&str, usize> = view_sources
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        // category -> per-source (values, first file)
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<Option<(Vec<f64>, String)>>> = HashMap::new();
        for row in &selected {
            let slots = grouped.entry(row.category.clone()).or_insert_with(|| {
                order.push(row.category.clone());
                vec![None; view_sources.len()]
            });
            let idx = source_index[row.source_label.as_str()];
            let slot = &mut slots[idx];
            if let Some((values, _)) = slot {
                tracing::debug!(
                    "{}: category `{}` reported more than once; averaging",
                    row.source_label,
                    row.category
                );
                values.push(row.accuracy_mean);
            } else {
                *slot = Some((vec![row.accuracy_mean], row.file.clone()));
            }
        }

        let mut categories: Vec<CategoryGroup> = order
            .into_iter()
            .map(|category| {
                let slots = grouped.remove(&category).unwrap_or_default();
                let scores: Vec<Option<Score>> = slots
                    .into_iter()
                    .map(|slot| {
                        slot.and_then(|(values, file)| mean(&values).map(|value| Score { value, file }))
                    })
                    .collect();
                let present: Vec<f64> = scores.iter().flatten().map(|s| s.value).collect();
                CategoryGroup {
                    category,
                    mean: mean(&present).unwrap_or(0.0),
                    scores,
                }
            })
            .collect();

        sort_categories(&mut categories, view.sort);

        tracing::info!(
            "Dataset `{}`: {} categories across {} sources",
            dataset,
            categories.len(),
            view_sources.len()
        );

        Ok(Self {
            dataset,
            sources: view_sources,
            categories,
            sort: view.sort,
            page_size: view.page_size,
            scale: Scale::from_percent(view.percent),
        })
    }

    /// Category labels in sorted order
    pub fn category_order(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.category.as_str()).collect()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.categories.len(), self.page_size)
    }

    /// All pages in order; the last one may be shorter
    pub fn pages(&self) -> Vec<Page<'_>> {
        let pages = self.page_count();
        self.categories
            .chunks(self.page_size)
            .enumerate()
            .map(|(i, chunk)| self.make_page(i, pages, chunk))
            .collect()
    }

    /// A single page, numbered from 1
    pub fn page(&self, number: usize) -> Result<Page<'_>, ViewError> {
        let pages = self.page_count();
        if number == 0 || number > pages {
            return Err(ViewError::PageOutOfRange { page: number, pages });
        }
        let start = (number - 1) * self.page_size;
        let end = (start + self.page_size).min(self.categories.len());
        Ok(self.make_page(number - 1, pages, &self.categories[start..end]))
    }

    fn make_page<'a>(&'a self, index: usize, pages: usize, chunk: &'a [CategoryGroup]) -> Page<'a> {
        let start = index * self.page_size;
        Page {
            dataset: &self.dataset,
            number: index + 1,
            pages,
            start: start + 1,
            end: start + chunk.len(),
            total: self.categories.len(),
            sources: &self.sources,
            categories: chunk,
            scale: self.scale,
        }
    }
}

impl Page<'_> {
    /// Heading shown above the chart and table
    pub fn title(&self) -> String {
        format!("{} | categories {}-{} / {}", self.dataset, self.start, self.end, self.total)
    }

    /// Displayed value of `source` for `category`, scale applied
    pub fn value(&self, category: &CategoryGroup, source: usize) -> Option<f64> {
        category
            .scores
            .get(source)
            .and_then(|s| s.as_ref())
            .map(|s| self.scale.display(s.value))
    }
}
