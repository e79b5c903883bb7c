//! ltv360 CLI Module
//!
//! Command-line interface for the train and predict batch jobs.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::*;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use crate::export::preprocessor_artifact_path;
use crate::inference::Predictor;
use crate::preprocessing::{extract_target, FeatureGenerator};
use crate::training::{ModelKind, Trainer};
use crate::utils::{load_data, save_csv};

/// Leading column of the predictions file
pub const INDEX_COLUMN: &str = "index";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

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

// ─── CLI definition ────────────────────────────────────────────────────────────

/// Pipeline stage to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Cross-validate, fit and save every configured model
    Train,
    /// Load saved models and write predictions
    Predict,
}

#[derive(Parser, Debug)]
#[command(name = "ltv360")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer lifetime value pipeline: train boosted regressors or predict with them")]
#[command(long_about = None)]
pub struct Cli {
    /// Pipeline mode
    #[arg(long, value_enum, default_value_t = Mode::Train)]
    pub mode: Mode,

    /// Path to the YAML configuration
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Input data file; overrides data.raw_path from the configuration
    #[arg(long)]
    pub data: Option<PathBuf>,
}

/// Dispatch to the selected mode
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    match cli.mode {
        Mode::Train => cmd_train(&cli.config, cli.data.as_deref()).map(|_| ()),
        Mode::Predict => cmd_predict(&cli.config, cli.data.as_deref()).map(|_| ()),
    }
}

fn load_run_config(config_path: &Path, data_path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = load_config(config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    if let Some(path) = data_path {
        config.data.raw_path = path.to_path_buf();
    }
    Ok(config)
}

fn load_raw(config: &Config) -> anyhow::Result<DataFrame> {
    step_run("Loading data");
    let start = Instant::now();
    let df = load_data(&config.data.raw_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));
    Ok(df)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Train mode: returns the mean CV RMSE of every trained kind
pub fn cmd_train(config_path: &Path, data_path: Option<&Path>) -> anyhow::Result<BTreeMap<ModelKind, f64>> {
    section("Train");
    let config = load_run_config(config_path, data_path)?;
    let df = load_raw(&config)?;

    step_run("Generating features");
    let start = Instant::now();
    let target = extract_target(&df, &config.features.target_col)?;
    let mut generator = FeatureGenerator::new(config.features.clone());
    let features = generator.fit_transform(&df)?;
    step_done(&format!("{} feature columns in {:?}", features.width(), start.elapsed()));

    println!();
    let mut trainer = Trainer::new(&config);
    let scores = trainer.train(&features, &target)?;

    let preprocessor_path = preprocessor_artifact_path(&config.training.output_dir);
    generator.save(&preprocessor_path)?;

    println!();
    println!("  {}", "CV RMSE".white().bold());
    for (kind, score) in &scores {
        println!("  {:<16} {}", muted(kind.as_str()), format!("{:.4}", score).white().bold());
    }
    println!("  {:<16} {}", muted("Artifacts"), config.training.output_dir.display().to_string().white());
    println!();

    Ok(scores)
}

/// Predict mode: returns the path of the predictions file
pub fn cmd_predict(config_path: &Path, data_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    section("Predict");
    let config = load_run_config(config_path, data_path)?;
    let df = load_raw(&config)?;

    step_run("Generating features");
    let preprocessor_path = preprocessor_artifact_path(&config.training.output_dir);
    let generator = FeatureGenerator::load(&preprocessor_path)
        .with_context(|| format!("loading feature generator from {}", preprocessor_path.display()))?;
    let features = generator.transform(&df)?;
    step_done(&format!("{} feature columns", features.width()));

    let mut predictor = Predictor::new(&config)?;
    let predictions = predictor.predict(&features)?;
    let mut output = with_index_column(&predictions)?;

    let output_path = config.prediction.output_path.clone();
    step_run(&format!("Saving → {}", output_path.display()));
    save_csv(&mut output, &output_path)?;
    step_done(&format!("{} rows", output.height()));

    let kinds: Vec<&str> = predictor.loaded_kinds().iter().map(ModelKind::as_str).collect();
    println!();
    println!("  {:<16} {}", muted("Models"), kinds.join(", ").white());
    println!("  {:<16} {}", muted("Predictions"), output_path.display().to_string().white());
    println!();

    Ok(output_path)
}

/// Prepend a 0-based row number column
fn with_index_column(df: &DataFrame) -> anyhow::Result<DataFrame> {
    let index: Vec<i64> = (0..df.height() as i64).collect();
    let mut columns = vec![Column::new(INDEX_COLUMN.into(), index)];
    columns.extend(df.get_columns().iter().cloned());
    Ok(DataFrame::new(columns)?)
}
