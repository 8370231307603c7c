//! Results pipeline orchestration
//!
//! This module provides the public API for study results processing.
//! It orchestrates the full pipeline from study snapshot JSON to a results
//! report or a CSV export.

use crate::adapter::{inspect_snapshot, parse_snapshot};
use crate::aggregate::TaskAggregator;
use crate::encoder::{ReportContents, ResultsEncoder, ResultsReport};
use crate::error::ComputeError;
use crate::export::ResultsExporter;
use crate::tree::TreeIndex;
use crate::types::StudySnapshot;
use tracing::debug;

/// Convert study snapshot JSON to a results report JSON (stateless, one-shot).
///
/// # Arguments
/// * `snapshot_json` - Study snapshot JSON (tree, tasks, participants, responses)
///
/// # Returns
/// Results report JSON string
///
/// # Example
/// ```ignore
/// let report_json = study_to_results(&snapshot_json)?;
/// ```
pub fn study_to_results(snapshot_json: &str) -> Result<String, ComputeError> {
    ResultsProcessor::new().process(snapshot_json)
}

/// Convert study snapshot JSON to CSV text (stateless, one-shot).
pub fn study_to_csv(snapshot_json: &str) -> Result<String, ComputeError> {
    ResultsProcessor::new().export_csv(snapshot_json)
}

/// Reusable processor holding encoder identity and report options.
pub struct ResultsProcessor {
    encoder: ResultsEncoder,
    include_csv_rows: bool,
}

impl Default for ResultsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsProcessor {
    /// Create a processor with default settings (CSV rows included in reports)
    pub fn new() -> Self {
        Self {
            encoder: ResultsEncoder::new(),
            include_csv_rows: true,
        }
    }

    /// Create a processor whose reports carry a fixed producer instance id
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            encoder: ResultsEncoder::with_instance_id(instance_id),
            include_csv_rows: true,
        }
    }

    /// Choose whether reports embed the flat export rows
    pub fn include_csv_rows(mut self, include: bool) -> Self {
        self.include_csv_rows = include;
        self
    }

    /// Analyse an already-parsed snapshot
    pub fn analyze(&self, snapshot: &StudySnapshot) -> ResultsReport {
        // Stage 1: Index the tree
        let index = TreeIndex::build(&snapshot.tree);
        debug!(
            nodes = index.stats().node_count,
            tasks = snapshot.tasks.len(),
            responses = snapshot.responses.len(),
            "indexed study tree"
        );

        // Stage 2: Inspect data quality
        let issues = inspect_snapshot(snapshot, &index);

        // Stage 3: Aggregate per task
        let task_summaries = TaskAggregator::summarize(snapshot);

        // Stage 4: Flatten for export
        let csv_rows = self
            .include_csv_rows
            .then(|| ResultsExporter::rows(snapshot));

        debug!(
            summaries = task_summaries.len(),
            issues = issues.len(),
            "study analysed"
        );

        // Stage 5: Encode
        self.encoder.encode(ReportContents {
            study: snapshot.study.clone(),
            participant_count: snapshot.participants.len(),
            tree: index.stats(),
            task_summaries,
            csv_rows,
            issues,
        })
    }

    /// Process a study snapshot and return results report JSON
    pub fn process(&self, snapshot_json: &str) -> Result<String, ComputeError> {
        let snapshot = parse_snapshot(snapshot_json)?;
        let report = self.analyze(&snapshot);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }

    /// Process a study snapshot and return CSV export text
    pub fn export_csv(&self, snapshot_json: &str) -> Result<String, ComputeError> {
        let snapshot = parse_snapshot(snapshot_json)?;
        let rows = ResultsExporter::rows(&snapshot);
        debug!(rows = rows.len(), "exporting csv");
        Ok(ResultsExporter::to_csv(&rows))
    }

    pub fn instance_id(&self) -> &str {
        self.encoder.instance_id()
    }
}
