//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the load, merge and cleaning workflow.

use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::pipeline::progress::{ClosureStageReporter, PipelineStage, StageReporter};
use crate::pipeline::stages;
use crate::types::{PipelineResult, RunSummary};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The main cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lfb_processing::{Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .incident_source("LFB Incident data from 2009 - 2017.csv")
///     .mobilisation_source("LFB Mobilisation data from 2009 - 2014.csv")
///     .build()?;
///
/// let result = Pipeline::builder()
///     .config(config)
///     .on_stage(|stage, message| println!("[{}] {}", stage.display_name(), message))
///     .build()?
///     .run()?;
///
/// if result.is_empty() {
///     println!("No rows survived cleaning");
/// }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    stage_reporter: Option<Arc<dyn StageReporter>>,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured sources and run every stage.
    pub fn run(&self) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!("Starting cleaning pipeline...");

        self.report_stage(PipelineStage::Loading, "Loading sources...");
        let loaded = stages::load(&self.config);
        let result = loaded.and_then(|(incidents, mobilisation)| {
            self.process_internal(incidents, mobilisation, start_time)
        });
        self.finish(result)
    }

    /// Run every stage after loading on frames the caller already holds.
    pub fn process(&self, incidents: DataFrame, mobilisation: DataFrame) -> Result<PipelineResult> {
        let result = self.process_internal(incidents, mobilisation, Instant::now());
        self.finish(result)
    }

    /// Report stage if a reporter is configured.
    fn report_stage(&self, stage: PipelineStage, message: &str) {
        if let Some(reporter) = &self.stage_reporter {
            reporter.report(stage, message);
        }
    }

    fn finish(&self, result: Result<PipelineResult>) -> Result<PipelineResult> {
        match result {
            Ok(result) => {
                let message = if result.is_empty() {
                    "Pipeline completed with no rows".to_string()
                } else {
                    format!("Pipeline completed with {} rows", result.data.height())
                };
                self.report_stage(PipelineStage::Complete, &message);
                Ok(result)
            }
            Err(e) => {
                self.report_stage(PipelineStage::Failed, &e.to_string());
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn process_internal(
        &self,
        incidents: DataFrame,
        mobilisation: DataFrame,
        start_time: Instant,
    ) -> Result<PipelineResult> {
        let mut summary = RunSummary::new();
        summary.incident_rows = incidents.height();
        summary.mobilisation_rows = mobilisation.height();
        summary.record_shape("incidents", &incidents);
        summary.record_shape("mobilisation", &mobilisation);

        // Step 1: Normalize keys
        self.report_stage(PipelineStage::Normalizing, "Normalizing join keys...");
        info!("Step 1: Normalizing '{}'...", self.config.key_column);
        let (incidents, mobilisation) =
            stages::normalize_keys(incidents, mobilisation, &self.config)?;

        // Step 2: Merge
        self.report_stage(PipelineStage::Merging, "Merging incidents and mobilisation...");
        info!("Step 2: Merging on '{}'...", self.config.key_column);
        let merged = stages::merge(incidents, mobilisation, &self.config)?;
        summary.record_shape("merged", &merged);

        // Step 3: Deduplicate and project
        self.report_stage(PipelineStage::Deduplicating, "Removing duplicates and columns...");
        info!("Step 3: Deduplicating and projecting...");
        let (deduped, projection) = stages::deduplicate_and_project(merged, &self.config)?;
        summary.record_shape("deduplicated", &deduped);
        debug!(
            "Skipped {} absent drop columns",
            projection.skipped_columns.len()
        );
        summary.projection = projection;

        // Step 4: Report missing data, then filter
        self.report_stage(PipelineStage::Reporting, "Reporting missing data...");
        info!("Step 4: Reporting missing data and filtering...");
        let rows_before_filter = deduped.height();
        let (data, missing_summary) = stages::report_and_filter(deduped, &self.config)?;
        summary.rows_missing_required = rows_before_filter.saturating_sub(data.height());
        summary.record_shape("filtered", &data);

        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Pipeline finished in {} ms: {:?}",
            summary.duration_ms,
            data.shape()
        );

        Ok(PipelineResult {
            data,
            missing_summary,
            summary,
        })
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    stage_reporter: Option<Arc<dyn StageReporter>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a stage reporter for receiving notifications during a run.
    pub fn stage_reporter(mut self, reporter: Arc<dyn StageReporter>) -> Self {
        self.stage_reporter = Some(reporter);
        self
    }

    /// Set a stage callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`stage_reporter`](Self::stage_reporter).
    pub fn on_stage<F>(mut self, callback: F) -> Self
    where
        F: Fn(PipelineStage, &str) + Send + Sync + 'static,
    {
        self.stage_reporter = Some(Arc::new(ClosureStageReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            stage_reporter: self.stage_reporter,
        })
    }
}
