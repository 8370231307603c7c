//! Study snapshot adapter
//!
//! Parses study snapshot JSON and inspects it for data-quality problems.
//! Problems are reported, never fatal: scoring degrades around them.

use crate::error::ComputeError;
use crate::tree::TreeIndex;
use crate::types::StudySnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Non-fatal inconsistency found in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    /// Node ids that occur more than once in the tree
    DuplicateNodeIds { node_ids: Vec<String> },
    /// Task without any acceptable answer node
    EmptyExpectedNodes { task_id: String },
    /// Expected node id that is not in the tree
    UnresolvedExpectedNode { task_id: String, node_id: String },
    /// Response pointing at a task the snapshot does not contain
    OrphanResponse {
        response_index: usize,
        task_id: String,
    },
    /// Response from a participant the snapshot does not contain
    UnknownParticipant {
        response_index: usize,
        participant_id: String,
    },
    /// Click timestamps going backwards
    OutOfOrderClicks { response_index: usize },
}

/// Parse a study snapshot JSON string
///
/// Trees may nest arbitrarily deep: the recursion limit is lifted and the
/// stack grows on demand while deserializing.
pub fn parse_snapshot(json: &str) -> Result<StudySnapshot, ComputeError> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    deserializer.disable_recursion_limit();

    let snapshot = StudySnapshot::deserialize(serde_stacker::Deserializer::new(&mut deserializer))
        .and_then(|snapshot| deserializer.end().map(|()| snapshot))
        .map_err(|e| ComputeError::ParseError(e.to_string()))?;

    Ok(snapshot)
}

/// Collect data-quality issues, logging each one
pub fn inspect_snapshot(snapshot: &StudySnapshot, index: &TreeIndex) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();

    if !index.duplicate_ids().is_empty() {
        issues.push(DataQualityIssue::DuplicateNodeIds {
            node_ids: index.duplicate_ids().to_vec(),
        });
    }

    for task in &snapshot.tasks {
        if task.expected_node_ids.is_empty() {
            issues.push(DataQualityIssue::EmptyExpectedNodes {
                task_id: task.id.clone(),
            });
        }
        for node_id in &task.expected_node_ids {
            if !index.contains(node_id) {
                issues.push(DataQualityIssue::UnresolvedExpectedNode {
                    task_id: task.id.clone(),
                    node_id: node_id.clone(),
                });
            }
        }
    }

    let task_ids: HashSet<&str> = snapshot.tasks.iter().map(|t| t.id.as_str()).collect();
    let participant_ids: HashSet<&str> = snapshot
        .participants
        .iter()
        .map(|p| p.id.as_str())
        .collect();

    for (response_index, response) in snapshot.responses.iter().enumerate() {
        if !task_ids.contains(response.task_id.as_str()) {
            issues.push(DataQualityIssue::OrphanResponse {
                response_index,
                task_id: response.task_id.clone(),
            });
        }
        if !participant_ids.contains(response.participant_id.as_str()) {
            issues.push(DataQualityIssue::UnknownParticipant {
                response_index,
                participant_id: response.participant_id.clone(),
            });
        }
        let out_of_order = response
            .click_history
            .windows(2)
            .any(|pair| pair[1].timestamp_ms < pair[0].timestamp_ms);
        if out_of_order {
            issues.push(DataQualityIssue::OutOfOrderClicks { response_index });
        }
    }

    for issue in &issues {
        warn!(?issue, "study snapshot data-quality issue");
    }

    issues
}
