//! The pipeline steps as plain functions over explicit frames.
//!
//! [`Pipeline::run`](super::Pipeline::run) chains them; they are public so
//! callers can rerun a single step on a frame they already hold.

use crate::cleaner::{DataCleaner, normalize_key, outer_merge};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::loader::DataLoader;
use crate::quality::MissingDataReporter;
use crate::types::{EntityKind, MissingDataSummary, ProjectionOutcome};
use polars::prelude::*;

/// Load and union the incident and mobilisation sources.
pub fn load(config: &PipelineConfig) -> Result<(DataFrame, DataFrame)> {
    let loader = DataLoader::from_config(config);
    let incidents = loader.load_entity(EntityKind::Incident, &config.incident_sources)?;
    let mobilisation =
        loader.load_entity(EntityKind::Mobilisation, &config.mobilisation_sources)?;
    Ok((incidents, mobilisation))
}

/// Canonicalize the key on both sides, then full outer join.
pub fn normalize_and_merge(
    incidents: DataFrame,
    mobilisation: DataFrame,
    config: &PipelineConfig,
) -> Result<DataFrame> {
    let (incidents, mobilisation) = normalize_keys(incidents, mobilisation, config)?;
    merge(incidents, mobilisation, config)
}

/// Canonicalize the key column of both entity frames.
pub fn normalize_keys(
    incidents: DataFrame,
    mobilisation: DataFrame,
    config: &PipelineConfig,
) -> Result<(DataFrame, DataFrame)> {
    let key = &config.key_column;
    let incidents = normalize_key(incidents, key).context("Normalizing incident keys")?;
    let mobilisation =
        normalize_key(mobilisation, key).context("Normalizing mobilisation keys")?;
    Ok((incidents, mobilisation))
}

/// Full outer join of frames whose keys are already canonical.
pub fn merge(
    incidents: DataFrame,
    mobilisation: DataFrame,
    config: &PipelineConfig,
) -> Result<DataFrame> {
    outer_merge(incidents, mobilisation, &config.key_column)
}

/// Keep the first row per key and remove the configured columns.
pub fn deduplicate_and_project(
    merged: DataFrame,
    config: &PipelineConfig,
) -> Result<(DataFrame, ProjectionOutcome)> {
    DataCleaner.deduplicate_and_project(merged, config)
}

/// Report missing data, then drop rows with an undefined required column.
pub fn report_and_filter(
    deduped: DataFrame,
    config: &PipelineConfig,
) -> Result<(DataFrame, MissingDataSummary)> {
    let (df, summary, _) =
        MissingDataReporter::report_and_filter(deduped, &config.required_column)?;
    Ok((df, summary))
}
