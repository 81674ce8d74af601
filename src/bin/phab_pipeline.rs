// Pipeline CLI
//
// Usage: cargo run --features cli --bin phab_pipeline -- \
//          <observations.csv> <covariates.csv> <output_dir> [config.json]
//
// Writes metrics_long.csv, metrics_wide.csv and indicators.csv.

use anyhow::Context;
use phab_metrics_rust::data::DEFAULT_KEY_COLUMNS;
use phab_metrics_rust::{CovariateTable, ObservationTable, PhabPipeline, PipelineConfig};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn write_csv(df: &mut DataFrame, path: &Path) -> anyhow::Result<()> {
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write {:?}", path))?;
    tracing::info!("Wrote {} rows to {:?}", df.height(), path);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phab_metrics_rust=info,phab_pipeline=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        anyhow::bail!(
            "Usage: {} <observations.csv> <covariates.csv> <output_dir> [config.json]",
            args[0]
        );
    }
    let observations_path = PathBuf::from(&args[1]);
    let covariates_path = PathBuf::from(&args[2]);
    let output_dir = PathBuf::from(&args[3]);

    let config = match args.get(4) {
        Some(path) => PipelineConfig::load(Path::new(path))?,
        None => PipelineConfig::default(),
    };

    tracing::info!("Loading observations from {:?}", observations_path);
    let observations = ObservationTable::load_csv(&observations_path, DEFAULT_KEY_COLUMNS)?;
    tracing::info!("Loading covariates from {:?}", covariates_path);
    let covariates = CovariateTable::load_csv(&covariates_path)?;
    tracing::info!(
        "{} observations over {} sites, {} covariate rows",
        observations.len(),
        observations.sites().len(),
        covariates.len()
    );

    let pipeline = PhabPipeline::new(config)?;
    let output = pipeline.run(&observations, &covariates)?;

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
    write_csv(&mut output.metrics.to_dataframe()?, &output_dir.join("metrics_long.csv"))?;
    write_csv(&mut output.wide.to_dataframe()?, &output_dir.join("metrics_wide.csv"))?;
    write_csv(&mut output.indicators.to_dataframe()?, &output_dir.join("indicators.csv"))?;

    Ok(())
}
