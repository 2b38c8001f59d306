//! visualdata CLI Module
//!
//! Command-line access to describe, clean, reduce and export, plus the server.

use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cleaning::{Cleaner, CleaningPolicy, Imputation};
use crate::export::{ConflictPolicy, SqliteExporter};
use crate::frame::{describe, summarize, ColumnDescription, Frame, Summary};
use crate::loading::{DataLoader, LoadOptions};
use crate::reduction::{Orchestrator, ReductionMethod, ReductionParams, ReductionRequest, TargetDim};
use crate::render::{ArtifactStore, FsArtifactStore, ScatterPlot, DEFAULT_TITLE};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<12} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "visualdata")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Load, clean and project tabular data into interactive 2D/3D scatter plots")]
#[command(long_about = None)]
pub struct Cli {
    /// Directory local sources must live under
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the data comes from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// File path under the root, or an http(s) URL
    #[arg(short, long)]
    pub source: String,

    /// Database file for .sql sources
    #[arg(long)]
    pub db: Option<String>,

    /// Query to run for .sql sources
    #[arg(long)]
    pub query: Option<String>,

    /// Load images as an x, y, R, G, B table
    #[arg(long)]
    pub image_as_frame: bool,
}

impl SourceArgs {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            sql_query: self.query.clone(),
            db_path: self.db.clone(),
            image_as_frame: self.image_as_frame,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a summary and descriptive statistics
    Describe {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Remove duplicates and missing values, write the result as CSV
    Clean {
        #[command(flatten)]
        source: SourceArgs,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Drop rows with any missing value
        #[arg(long)]
        drop_missing: bool,

        /// Drop duplicate rows, keeping the first
        #[arg(long)]
        drop_duplicates: bool,

        /// Imputation strategy (none, mean, median, fill)
        #[arg(long, default_value = "none")]
        imputation: String,
    },

    /// Project numeric columns to 2 or 3 dimensions and render a scatter plot
    Reduce {
        #[command(flatten)]
        source: SourceArgs,

        /// Method (pca, tsne, umap, auto)
        #[arg(short, long, default_value = "auto")]
        method: String,

        /// Target dimensions (2 or 3)
        #[arg(short, long, default_value = "2")]
        dim: usize,

        /// Column used to color the points
        #[arg(short, long)]
        label: Option<String>,

        #[arg(long, default_value = "30")]
        perplexity: f64,

        #[arg(long, default_value = "15")]
        neighbors: usize,

        #[arg(long, default_value = "0.1")]
        min_dist: f64,

        /// Seed for umap
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value = DEFAULT_TITLE)]
        title: String,

        /// Storage directory; pages are written to its renders/ folder
        #[arg(short, long, default_value = "./storage")]
        output_dir: PathBuf,
    },

    /// Write a table into a SQLite database
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// SQLite database file
        #[arg(long)]
        db_file: PathBuf,

        /// Target table
        #[arg(short, long)]
        table: String,

        /// What to do if the table exists (fail, replace, append)
        #[arg(long, default_value = "fail")]
        if_exists: String,
    },

    /// Start the web server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
}

fn load_table(loader: &DataLoader, source: &SourceArgs) -> anyhow::Result<Frame> {
    step_run(&format!("Loading {}", source.source));
    let frame = loader.load_with(&source.source, &source.options())?.into_frame()?;
    step_done(&format!("{} rows × {} cols", frame.height(), frame.width()));
    Ok(frame)
}

// ─── Describe ──────────────────────────────────────────────────────────────────

pub fn cmd_describe(root: &Path, source: &SourceArgs) -> anyhow::Result<()> {
    section("Describe");

    let loader = DataLoader::new(root);
    let data = loader.load_with(&source.source, &source.options())?;

    match summarize(&data) {
        Summary::Table { rows, columns, column_info, duplicates } => {
            kv("Source", &source.source);
            kv("Rows", &rows.to_string());
            kv("Columns", &columns.to_string());
            kv("Duplicates", &duplicates.to_string());
            println!();
            println!("  {:<20} {:<12} {:>8}", muted("Column"), muted("Type"), muted("Missing"));
            println!("  {}", dim(&"─".repeat(42)));
            for col in &column_info {
                println!("  {:<20} {:<12} {:>8}", col.name, muted(&col.dtype), col.missing);
            }
        }
        Summary::Image { shape, dtype } => {
            kv("Image", &format!("{} × {} × {} ({})", shape[0], shape[1], shape[2], dtype));
        }
        Summary::Text { length, lines } => {
            kv("Text", &format!("{} chars, {} lines", length, lines));
        }
    }

    if let crate::loading::LoadedData::Table(frame) = &data {
        section("Statistics");
        for description in describe(frame)? {
            match description {
                ColumnDescription::Numeric { name, count, mean, std, min, max, .. } => println!(
                    "  {:<20} n={:<6} mean={:<10} std={:<10} min={:<10} max={}",
                    name,
                    count,
                    fmt_stat(mean),
                    fmt_stat(std),
                    fmt_stat(min),
                    fmt_stat(max)
                ),
                ColumnDescription::Categorical { name, count, unique, top, freq } => println!(
                    "  {:<20} n={:<6} unique={:<6} top={} ({})",
                    name,
                    count,
                    unique,
                    top.unwrap_or_else(|| "-".to_string()),
                    freq
                ),
            }
        }
    }

    println!();
    Ok(())
}

// ─── Clean ─────────────────────────────────────────────────────────────────────

pub fn cmd_clean(
    root: &Path,
    source: &SourceArgs,
    output: &Path,
    drop_missing: bool,
    drop_duplicates: bool,
    imputation: &str,
) -> anyhow::Result<()> {
    section("Clean");

    let policy = CleaningPolicy::default()
        .with_drop_missing(drop_missing)
        .with_drop_duplicates(drop_duplicates)
        .with_imputation(imputation.parse::<Imputation>()?);

    let frame = load_table(&DataLoader::new(root), source)?;

    step_run("Cleaning");
    let start = Instant::now();
    let (cleaned, report) = Cleaner::new(policy).clean_with_report(&frame)?;
    step_done(&format!("{:?}", start.elapsed()));

    kv("Duplicates", &report.duplicates_removed.to_string());
    kv("Dropped", &report.missing_rows_removed.to_string());
    kv("Imputed", &report.values_imputed.to_string());

    step_run(&format!("Saving → {}", output.display()));
    let mut file = std::fs::File::create(output)?;
    let (mut df, _) = cleaned.into_parts();
    CsvWriter::new(&mut file).finish(&mut df)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    println!();
    Ok(())
}

// ─── Reduce ────────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_reduce(
    root: &Path,
    source: &SourceArgs,
    method: &str,
    dim: usize,
    label: Option<&str>,
    params: ReductionParams,
    title: &str,
    output_dir: &Path,
) -> anyhow::Result<()> {
    section("Reduce");

    let method: ReductionMethod = method.parse()?;
    let dim = TargetDim::try_from(dim)?;
    let mut request = ReductionRequest::new(method, dim).with_params(params);
    if let Some(label) = label {
        request = request.with_label(label);
    }

    let frame = load_table(&DataLoader::new(root), source)?;

    step_run(&format!("Reducing with {}", method));
    let start = Instant::now();
    let result = Orchestrator::new().run(&frame, &request)?;
    step_done(&format!("{} in {:?}", result.method.acronym(), start.elapsed()));

    step_run("Rendering");
    let html = ScatterPlot::new(title).render(&result)?;
    let public_url = std::env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let store = FsArtifactStore::new(output_dir, public_url);
    let artifact = store.store(&html)?;
    step_done(&format!("{} KB", html.len() / 1024));

    kv("Method", result.method.acronym());
    kv("Rows", &result.frame.height().to_string());
    kv("File", &store.artifact_path(&artifact).display().to_string());
    kv("Locator", &artifact.locator);

    println!();
    Ok(())
}

// ─── Export ────────────────────────────────────────────────────────────────────

pub fn cmd_export(
    root: &Path,
    source: &SourceArgs,
    db_file: &Path,
    table: &str,
    if_exists: &str,
) -> anyhow::Result<()> {
    section("Export");

    let policy: ConflictPolicy = if_exists.parse()?;
    let frame = load_table(&DataLoader::new(root), source)?;

    step_run(&format!("Writing {} → {}", table, db_file.display()));
    let summary = SqliteExporter::new(db_file).export(&frame, table, policy)?;
    step_done(&format!("{} rows", summary.rows_written));

    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(root: &Path, host: &str, port: u16) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let config = ServerConfig::default()
        .with_address(host, port)
        .with_project_root(root);

    section(&format!("visualdata v{}", env!("CARGO_PKG_VERSION")));
    kv("API", &format!("http://{}:{}", host, port));
    kv("Health", &format!("http://{}:{}/health", host, port));
    kv("Root", &config.project_root.display().to_string());
    kv("Storage", &config.storage_dir.display().to_string());
    println!();
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    run_server(config).await
}
