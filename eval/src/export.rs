// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! CSV export of a single page

use crate::present::Page;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Format one displayed value
///
/// Without a precision the shortest representation that round-trips is used.
pub fn format_value(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{:.*}", p, value),
        None => format!("{}", value),
    }
}

/// Serialize a page: `dataset,category,<source...>`, one row per category
///
/// `precision` falls back to the page scale's default.
pub fn page_to_csv(page: &Page<'_>, precision: Option<usize>) -> Result<String> {
    let precision = precision.or(page.scale.default_precision());
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["dataset".to_string(), "category".to_string()];
    header.extend(page.sources.iter().cloned());
    writer.write_record(&header)?;

    for category in page.categories {
        let mut record = Vec::with_capacity(page.sources.len() + 2);
        record.push(page.dataset.to_string());
        record.push(category.category.clone());
        for source in 0..page.sources.len() {
            record.push(
                page.value(category, source)
                    .map(|v| format_value(v, precision))
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Default download name: `twinkle_{dataset}_{start}_{end}.csv`
pub fn csv_file_name(page: &Page<'_>) -> String {
    format!("twinkle_{}_{}_{}.csv", sanitize(page.dataset), page.start, page.end)
}

/// Make a dataset name safe to embed in a file name
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Write a page's CSV into `output_dir`
pub fn write_page_csv(page: &Page<'_>, output_dir: &Path, precision: Option<usize>) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
    let path = output_dir.join(csv_file_name(page));
    let csv = page_to_csv(page, precision)?;
    std::fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("CSV saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SortMode, ViewConfig};
    use crate::extract::Row;
    use crate::present::DatasetView;

    fn row(category: &str, value: f64, source: &str) -> Row {
        Row {
            dataset: "dataset".to_string(),
            category: category.to_string(),
            file: format!("{}.csv", category),
            accuracy_mean: value,
            source_label: source.to_string(),
        }
    }

    fn example_view(page_size: usize) -> DatasetView {
        let rows = vec![
            row("c1", 0.90, "A @ t1"),
            row("c2", 0.80, "A @ t1"),
            row("c1", 0.70, "B @ t2"),
            row("c2", 0.95, "B @ t2"),
        ];
        let sources = vec!["A @ t1".to_string(), "B @ t2".to_string()];
        let config = ViewConfig {
            dataset: None,
            sort: SortMode::Desc,
            page_size,
            percent: false,
        };
        DatasetView::build(&rows, &sources, &config).unwrap()
    }

    #[test]
    fn test_two_model_example_csv() {
        let view = example_view(2);
        let page = view.page(1).unwrap();

        let csv = page_to_csv(&page, Some(2)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "dataset,category,A @ t1,B @ t2");
        assert_eq!(lines[1], "dataset,c2,0.80,0.95");
        assert_eq!(lines[2], "dataset,c1,0.90,0.70");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_shortest_representation_by_default() {
        let view = example_view(1);
        let page = view.page(2).unwrap();

        let csv = page_to_csv(&page, None).unwrap();
        assert_eq!(csv, "dataset,category,A @ t1,B @ t2\ndataset,c1,0.9,0.7\n");
    }

    #[test]
    fn test_missing_cell_is_empty() {
        let rows = vec![row("c1", 0.5, "A"), row("c2", 0.25, "B")];
        let sources = vec!["A".to_string(), "B".to_string()];
        let config = ViewConfig {
            sort: SortMode::Alpha,
            ..ViewConfig::default()
        };
        let view = DatasetView::build(&rows, &sources, &config).unwrap();
        let csv = page_to_csv(&view.page(1).unwrap(), None).unwrap();

        assert!(csv.contains("dataset,c1,0.5,\n"));
        assert!(csv.contains("dataset,c2,,0.25\n"));
    }

    #[test]
    fn test_percent_scale_applies_to_cells() {
        let rows = vec![row("c1", 0.5, "A")];
        let config = ViewConfig {
            percent: true,
            ..ViewConfig::default()
        };
        let view = DatasetView::build(&rows, &["A".to_string()], &config).unwrap();
        let page = view.page(1).unwrap();
        assert!(page_to_csv(&page, None).unwrap().ends_with("dataset,c1,50.00\n"));
        assert!(page_to_csv(&page, Some(0)).unwrap().ends_with("dataset,c1,50\n"));
    }

    #[test]
    fn test_percent_cells_have_no_float_noise() {
        let rows = vec![row("c1", 0.07, "A")];
        let config = ViewConfig {
            percent: true,
            ..ViewConfig::default()
        };
        let view = DatasetView::build(&rows, &["A".to_string()], &config).unwrap();
        let csv = page_to_csv(&view.page(1).unwrap(), None).unwrap();
        assert!(csv.ends_with("dataset,c1,7.00\n"), "{csv}");
    }

    #[test]
    fn test_file_name_and_write() {
        let view = example_view(2);
        let page = view.page(1).unwrap();
        assert_eq!(csv_file_name(&page), "twinkle_dataset_1_2.csv");
        assert_eq!(sanitize("tw/mmlu pro"), "tw_mmlu_pro");

        let dir = tempfile::tempdir().unwrap();
        let path = write_page_csv(&page, dir.path(), Some(3)).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("dataset,category,"));
        assert!(written.contains("0.950"));
    }
}
