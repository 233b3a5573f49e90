// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Rendering of a page as a pivot table and as grouped bar charts
//!
//! Provides:
//! - Text pivot table (categories x sources) for the terminal and reports
//! - Text bar chart, one bar per source under each category
//! - SVG grouped bar chart (plotters) with one colour per source and a legend

use crate::present::Page;
use anyhow::Result;
use plotters::prelude::*;
use std::fmt::Write;

/// Bar colours, cycled per source
const PALETTE: [RGBColor; 10] = [
    RGBColor(0x4c, 0x78, 0xa8),
    RGBColor(0xf5, 0x85, 0x18),
    RGBColor(0xe4, 0x57, 0x56),
    RGBColor(0x72, 0xb7, 0xb2),
    RGBColor(0x54, 0xa2, 0x4b),
    RGBColor(0xee, 0xca, 0x3b),
    RGBColor(0xb2, 0x79, 0xa2),
    RGBColor(0xff, 0x9d, 0xa6),
    RGBColor(0x9d, 0x75, 0x5d),
    RGBColor(0xba, 0xb0, 0xac),
];

/// Share of a category slot taken by its bars
const GROUP_FILL: f64 = 0.8;

fn cell(value: Option<f64>) -> String {
    value.map_or("-".to_string(), |v| format!("{:.3}", v))
}

/// Pivot table with fixed-width columns, `-` for missing cells
pub fn text_table(page: &Page<'_>) -> String {
    let category_width = page
        .categories
        .iter()
        .map(|c| c.category.chars().count())
        .chain(std::iter::once("category".len()))
        .max()
        .unwrap_or(8);
    let widths: Vec<usize> = page.sources.iter().map(|s| s.chars().count().max(8)).collect();
    let total_width = category_width + widths.iter().map(|w| w + 2).sum::<usize>();

    let mut out = String::new();
    let _ = write!(out, "{:<width$}", "category", width = category_width);
    for (source, width) in page.sources.iter().zip(&widths) {
        let _ = write!(out, "  {:>width$}", source, width = width);
    }
    out.push('\n');
    let _ = writeln!(out, "{:-<width$}", "", width = total_width);

    for category in page.categories {
        let _ = write!(out, "{:<width$}", category.category, width = category_width);
        for (idx, width) in widths.iter().enumerate() {
            let _ = write!(out, "  {:>width$}", cell(page.value(category, idx)), width = width);
        }
        out.push('\n');
    }

    out
}

/// Pivot table as a Markdown table
pub fn markdown_table(page: &Page<'_>) -> String {
    let mut out = String::from("| category |");
    for source in page.sources {
        let _ = write!(out, " {} |", source.replace('|', "\\|"));
    }
    out.push_str("\n|---|");
    for _ in page.sources {
        out.push_str("---:|");
    }
    out.push('\n');

    for category in page.categories {
        let _ = write!(out, "| {} |", category.category.replace('|', "\\|"));
        for idx in 0..page.sources.len() {
            let _ = write!(out, " {} |", cell(page.value(category, idx)));
        }
        out.push('\n');
    }

    out
}

/// Horizontal text bars, `width` characters for the top of the scale
pub fn text_chart(page: &Page<'_>, width: usize) -> String {
    let max = page.scale.max();
    let label_width = page.sources.iter().map(|s| s.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    for category in page.categories {
        let _ = writeln!(out, "{}", category.category);
        for (idx, source) in page.sources.iter().enumerate() {
            match page.value(category, idx) {
                Some(v) => {
                    let filled = ((v / max).clamp(0.0, 1.0) * width as f64).round() as usize;
                    let _ = writeln!(
                        out,
                        "  {:<lw$} |{:<w$}| {:.3}",
                        source,
                        "#".repeat(filled),
                        v,
                        lw = label_width,
                        w = width
                    );
                }
                None => {
                    let _ = writeln!(out, "  {:<lw$} |{:<w$}| -", source, "", lw = label_width, w = width);
                }
            }
        }
    }
    out
}

/// Colour assigned to the source at `index`
pub fn source_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Grouped vertical bar chart as an SVG document
///
/// X is the category in page order, each group holds one bar per source, Y is
/// the displayed value on the page's scale. Sources are listed in the legend.
pub fn svg_chart(page: &Page<'_>) -> Result<String> {
    let groups = page.categories.len().max(1);
    let sources = page.sources.len().max(1);
    let width = (120 + groups * (sources * 18 + 24)).max(640) as u32;
    let height = 520;
    let bar_width = GROUP_FILL / sources as f64;
    let centers: Vec<f64> = (0..groups).map(|g| g as f64 + 0.5).collect();
    let title = page.title();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(110)
            .y_label_area_size(60)
            .build_cartesian_2d((0f64..groups as f64).with_key_points(centers), 0f64..page.scale.max())?;

        let category_label = |x: &f64| {
            page.categories
                .get(x.floor() as usize)
                .map(|c| c.category.clone())
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(groups)
            .x_label_formatter(&category_label)
            .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
            .x_desc("category")
            .y_desc(page.scale.metric_label())
            .draw()?;

        for (idx, source) in page.sources.iter().enumerate() {
            let color = source_color(idx);
            let left = (1.0 - GROUP_FILL) / 2.0 + idx as f64 * bar_width;
            let bars = page.categories.iter().enumerate().filter_map(|(group, category)| {
                let value = page.value(category, idx)?;
                let x = group as f64 + left;
                Some(Rectangle::new([(x, 0.0), (x + bar_width * 0.9, value)], color.filled()))
            });

            chart
                .draw_series(bars)?
                .label(source.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
    }

    Ok(svg)
}
