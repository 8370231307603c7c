//! Results encoder
//!
//! Wraps task summaries, export rows and data-quality findings into a
//! versioned [`ResultsReport`] with producer metadata.

use crate::adapter::DataQualityIssue;
use crate::error::ComputeError;
use crate::tree::TreeStats;
use crate::types::{CsvRow, StudyInfo, TaskSummary};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Current results report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Data-quality section of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportQuality {
    pub issues: Vec<DataQualityIssue>,
}

/// Complete analysis of one study
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    /// When the report was computed (RFC3339)
    pub computed_at_utc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study: Option<StudyInfo>,
    pub participant_count: usize,
    pub tree: TreeStats,
    pub task_summaries: Vec<TaskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_rows: Option<Vec<CsvRow>>,
    pub quality: ReportQuality,
}

/// Parts of a report computed by the pipeline
#[derive(Debug, Clone)]
pub struct ReportContents {
    pub study: Option<StudyInfo>,
    pub participant_count: usize,
    pub tree: TreeStats,
    pub task_summaries: Vec<TaskSummary>,
    pub csv_rows: Option<Vec<CsvRow>>,
    pub issues: Vec<DataQualityIssue>,
}

/// Results encoder
pub struct ResultsEncoder {
    instance_id: String,
}

impl Default for ResultsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Stamp computed contents with producer metadata
    pub fn encode(&self, contents: ReportContents) -> ResultsReport {
        ResultsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            study: contents.study,
            participant_count: contents.participant_count,
            tree: contents.tree,
            task_summaries: contents.task_summaries,
            csv_rows: contents.csv_rows,
            quality: ReportQuality {
                issues: contents.issues,
            },
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, contents: ReportContents) -> Result<String, ComputeError> {
        let report = self.encode(contents);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}
