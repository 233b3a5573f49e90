// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Twinkle Eval analyzer CLI
//!
//! Usage:
//!   twinkle-analyzer run_a.json run_b.jsonl --sort desc --page-size 20
//!   twinkle-analyzer results/*.json --dataset tmmlu --percent --csv --svg --output out/

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use twinkle_eval::config::{AnalyzerConfig, SortMode};
use twinkle_eval::export::{sanitize, write_page_csv};
use twinkle_eval::render;
use twinkle_eval::report::{describe_view, RunReport};
use twinkle_eval::session::Session;

#[derive(Parser, Debug)]
#[command(name = "twinkle-analyzer")]
#[command(about = "Compare Twinkle Eval results (.json / .jsonl) across models")]
#[command(version)]
struct Args {
    /// Twinkle Eval result files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset to show (defaults to the first by name)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Category order
    #[arg(short, long, value_enum)]
    sort: Option<SortMode>,

    /// Categories per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Show a single page (1-based) instead of all pages
    #[arg(short, long)]
    page: Option<usize>,

    /// Display values on a 0-100 scale
    #[arg(long)]
    percent: bool,

    /// Print text bar charts next to the tables
    #[arg(long)]
    chart: bool,

    /// Output directory for CSV, SVG and report files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write one CSV per shown page
    #[arg(long)]
    csv: bool,

    /// Fixed number of decimals in CSV cells
    #[arg(long)]
    csv_precision: Option<usize>,

    /// Write one SVG bar chart per shown page
    #[arg(long)]
    svg: bool,

    /// Write Markdown and JSON run reports
    #[arg(long)]
    report: bool,

    /// List available datasets and exit
    #[arg(long)]
    list_datasets: bool,
}

impl Args {
    /// Merge flags over the file configuration
    fn into_config(self) -> Result<(AnalyzerConfig, Vec<PathBuf>, bool)> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::from_json_file(path)?,
            None => AnalyzerConfig::default(),
        };

        if self.dataset.is_some() {
            config.view.dataset = self.dataset;
        }
        if let Some(sort) = self.sort {
            config.view.sort = sort;
        }
        if let Some(page_size) = self.page_size {
            config.view.page_size = page_size;
        }
        if self.page.is_some() {
            config.page = self.page;
        }
        config.view.percent |= self.percent;
        config.output.text_chart |= self.chart;
        if let Some(output) = self.output {
            config.output.output_dir = output;
        }
        config.output.csv |= self.csv;
        config.output.svg |= self.svg;
        config.output.report |= self.report;
        if self.csv_precision.is_some() {
            config.output.csv_precision = self.csv_precision;
        }

        config.validate()?;
        Ok((config, self.files, self.list_datasets))
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (config, files, list_datasets) = Args::parse().into_config()?;

    tracing::info!("Twinkle Eval Analyzer");
    tracing::info!("=====================");
    tracing::info!("Files: {}", files.len());
    tracing::info!("View: {}", describe_view(&config.view));

    let mut session = Session::new();
    session.load_paths(&files[..]);

    for failure in session.failures() {
        eprintln!("Could not read {}: {}", failure.file, failure.message);
    }
    for file in session.empty_files() {
        eprintln!("No usable results in {}", file);
    }

    if session.is_empty() {
        anyhow::bail!("no valid Twinkle Eval files loaded");
    }

    if list_datasets {
        println!("Available datasets:");
        for dataset in session.datasets() {
            println!("  {}", dataset);
        }
        return Ok(());
    }

    let view = session.view(&config.view)?;
    let pages = match config.page {
        Some(number) => vec![view.page(number)?],
        None => view.pages(),
    };

    let out_dir = &config.output.output_dir;
    let mut written = Vec::new();

    for page in &pages {
        println!("\n{}", "=".repeat(70));
        println!("{}", page.title());
        println!("{}", "=".repeat(70));
        print!("{}", render::text_table(page));

        if config.output.text_chart {
            println!();
            print!("{}", render::text_chart(page, config.output.chart_width));
        }

        if config.output.csv {
            written.push(write_page_csv(page, out_dir, config.output.csv_precision)?);
        }

        if config.output.svg {
            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
            let svg_path = out_dir.join(format!(
                "twinkle_{}_{}_{}.svg",
                sanitize(page.dataset),
                page.start,
                page.end
            ));
            std::fs::write(&svg_path, render::svg_chart(page)?)
                .with_context(|| format!("Failed to write {}", svg_path.display()))?;
            tracing::info!("Chart saved to {}", svg_path.display());
            written.push(svg_path);
        }
    }

    if config.output.report {
        let report = RunReport::new(&session, Some(&view));
        let timestamp = report.generated_at.format("%Y%m%d_%H%M%S");
        let stem = format!("twinkle_report_{}_{}", sanitize(&view.dataset), timestamp);

        let json_path = out_dir.join(format!("{}.json", stem));
        report.save_json(&json_path)?;
        written.push(json_path);

        let md_path = out_dir.join(format!("{}.md", stem));
        report.save_markdown(Some(&view), &md_path)?;
        written.push(md_path);
    }

    println!(
        "\n{} sources, {} categories in `{}`, {} page(s) shown",
        session.sources().len(),
        view.categories.len(),
        view.dataset,
        pages.len()
    );
    for path in &written {
        println!("Saved: {}", path.display());
    }

    Ok(())
}
