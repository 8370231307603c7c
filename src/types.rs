//! Study data types
//!
//! This module defines the study snapshot handed to the engine (tree, tasks,
//! participants, responses) and the derived structures that flow out of it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display name used when a participant did not provide one
pub const ANONYMOUS_PARTICIPANT: &str = "Anonymous";

/// Label shown for a skipped response in per-task detail records
pub const SKIPPED_LABEL: &str = "(skipped)";

/// Marker written to the tabular export for skipped responses
pub const SKIPPED_MARKER: &str = "SKIPPED";

/// A node of the information-architecture tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node identifier (unique by convention, not enforced)
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Child nodes in display order
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a leaf node
    pub fn leaf(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with children
    pub fn branch(id: impl Into<String>, label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            children,
        }
    }
}

/// A findability task shown to participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub prompt: String,
    /// Acceptable answer nodes (any of them counts as correct)
    pub expected_node_ids: Vec<String>,
}

/// Navigation action recorded while a participant browses the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    Expand,
    Back,
    Select,
}

/// One recorded click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEntry {
    /// Node that was clicked
    pub node_id: String,
    /// What the click did
    pub action: ClickAction,
    /// Milliseconds since the task started
    #[serde(rename = "ts", alias = "timestamp_ms")]
    pub timestamp_ms: i64,
}

impl ClickEntry {
    pub fn new(node_id: impl Into<String>, action: ClickAction, timestamp_ms: i64) -> Self {
        Self {
            node_id: node_id.into(),
            action,
            timestamp_ms,
        }
    }
}

/// A study participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,
}

/// One participant's attempt at one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub participant_id: String,
    pub task_id: String,
    /// Node the participant chose; `None` means the task was skipped
    #[serde(default)]
    pub selected_node_id: Option<String>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    /// Self-reported confidence
    #[serde(default)]
    pub confidence: Option<i32>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub time_to_first_click_ms: Option<i64>,
    /// Chronological click log (a `null` history reads as empty)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub click_history: Vec<ClickEntry>,
}

impl Response {
    /// Whether the participant skipped the task
    pub fn is_skipped(&self) -> bool {
        self.selected_node_id.is_none()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ClickEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ClickEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Study metadata, passed through to the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyInfo {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything the engine needs to score one study
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study: Option<StudyInfo>,
    pub tree: TreeNode,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl StudySnapshot {
    /// Display name of a participant, falling back to [`ANONYMOUS_PARTICIPANT`]
    pub fn participant_name(&self, participant_id: &str) -> &str {
        self.participants
            .iter()
            .find(|p| p.id == participant_id)
            .and_then(|p| p.name.as_deref())
            .unwrap_or(ANONYMOUS_PARTICIPANT)
    }

    /// Responses from listed participants, in response order
    pub fn participant_responses(&self) -> impl Iterator<Item = &Response> + '_ {
        self.responses
            .iter()
            .filter(move |r| self.participants.iter().any(|p| p.id == r.participant_id))
    }

    /// Look up a task by id
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

/// Navigation-quality metrics for one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationMetrics {
    /// Number of recorded clicks (R)
    pub total_clicks: usize,
    /// Distinct nodes clicked (N)
    pub unique_nodes_visited: usize,
    /// Optimal path length over clicks, rounded to 2 decimals
    pub directness: f64,
    /// Lostness score, rounded to 2 decimals
    pub lostness: f64,
    pub first_click_node_id: Option<String>,
    /// Number of `back` actions
    pub backtrack_count: usize,
    /// Mean gap between consecutive clicks
    pub avg_hesitation_ms: i64,
}

/// One rendered step of a click path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickPathStep {
    pub label: String,
    pub action: ClickAction,
}

/// Per-response detail inside a task summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDetail {
    pub participant_name: String,
    pub selected_node_id: Option<String>,
    pub selected_label: String,
    pub skipped: bool,
    pub is_correct: Option<bool>,
    pub confidence: Option<i32>,
    pub duration_ms: Option<i64>,
    pub time_to_first_click_ms: Option<i64>,
    /// Labels joined by " → ", back steps prefixed with "← "
    pub click_path: String,
    pub click_path_steps: Vec<ClickPathStep>,
    #[serde(flatten)]
    pub metrics: NavigationMetrics,
}

/// Aggregated results for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub prompt: String,
    pub expected_node_ids: Vec<String>,
    /// Resolved labels of the expected nodes, joined by ", "
    pub expected_label: String,
    pub optimal_path_length: usize,
    pub total_count: usize,
    pub correct_count: usize,
    pub skipped_count: usize,
    /// Percentage of correct responses (0-100)
    pub success_rate: i64,
    pub avg_duration_ms: i64,
    /// Rounded to 1 decimal
    pub avg_confidence: f64,
    /// Rounded to 2 decimals
    pub avg_directness: f64,
    /// Rounded to 2 decimals
    pub avg_lostness: f64,
    pub responses: Vec<ResponseDetail>,
}

/// Correctness cell of an export row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectnessCell {
    /// The participant skipped the task
    Skipped,
    /// The recorded correctness, if any
    Answered(Option<bool>),
}

impl CorrectnessCell {
    /// Text used in CSV output
    pub fn as_csv_field(&self) -> String {
        match self {
            CorrectnessCell::Skipped => SKIPPED_MARKER.to_string(),
            CorrectnessCell::Answered(Some(correct)) => correct.to_string(),
            CorrectnessCell::Answered(None) => String::new(),
        }
    }
}

impl Serialize for CorrectnessCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CorrectnessCell::Skipped => serializer.serialize_str(SKIPPED_MARKER),
            CorrectnessCell::Answered(Some(correct)) => serializer.serialize_bool(*correct),
            CorrectnessCell::Answered(None) => serializer.serialize_none(),
        }
    }
}

/// One flat export row (one per response)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvRow {
    pub participant: String,
    pub task_prompt: String,
    pub expected_node: String,
    pub selected_node: String,
    pub is_correct: CorrectnessCell,
    pub confidence: Option<i32>,
    pub duration_ms: Option<i64>,
    pub time_to_first_click_ms: Option<i64>,
    pub total_clicks: usize,
    pub unique_nodes: usize,
    pub directness: f64,
    pub lostness: f64,
    pub backtrack_count: usize,
    pub avg_hesitation_ms: i64,
    pub click_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_action_serialization() {
        let json = serde_json::to_string(&ClickAction::Back).unwrap();
        assert_eq!(json, "\"back\"");

        let parsed: ClickAction = serde_json::from_str("\"select\"").unwrap();
        assert_eq!(parsed, ClickAction::Select);
    }

    #[test]
    fn test_click_entry_reads_recorder_format() {
        let entry: ClickEntry =
            serde_json::from_str(r#"{"node_id": "n1", "action": "expand", "ts": 1200}"#).unwrap();
        assert_eq!(entry, ClickEntry::new("n1", ClickAction::Expand, 1200));

        let aliased: ClickEntry =
            serde_json::from_str(r#"{"node_id": "n1", "action": "expand", "timestamp_ms": 1200}"#)
                .unwrap();
        assert_eq!(aliased.timestamp_ms, 1200);
    }

    #[test]
    fn test_response_null_click_history() {
        let json = r#"{
            "participant_id": "p1",
            "task_id": "t1",
            "selected_node_id": null,
            "click_history": null
        }"#;

        let response: Response = serde_json::from_str(json).unwrap();
        assert!(response.is_skipped());
        assert!(response.click_history.is_empty());
        assert_eq!(response.duration_ms, None);
    }

    #[test]
    fn test_tree_deserialization_without_children() {
        let json = r#"{"id": "root", "label": "Home", "children": [{"id": "a", "label": "About"}]}"#;
        let tree: TreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_participant_name_fallback() {
        let snapshot = StudySnapshot {
            study: None,
            tree: TreeNode::leaf("root", "Home"),
            tasks: vec![],
            participants: vec![
                Participant {
                    id: "p1".to_string(),
                    name: Some("Ada".to_string()),
                },
                Participant {
                    id: "p2".to_string(),
                    name: None,
                },
            ],
            responses: vec![],
        };

        assert_eq!(snapshot.participant_name("p1"), "Ada");
        assert_eq!(snapshot.participant_name("p2"), ANONYMOUS_PARTICIPANT);
        assert_eq!(snapshot.participant_name("missing"), ANONYMOUS_PARTICIPANT);
    }

    #[test]
    fn test_correctness_cell_serialization() {
        assert_eq!(
            serde_json::to_string(&CorrectnessCell::Skipped).unwrap(),
            "\"SKIPPED\""
        );
        assert_eq!(
            serde_json::to_string(&CorrectnessCell::Answered(Some(true))).unwrap(),
            "true"
        );
        assert_eq!(
            serde_json::to_string(&CorrectnessCell::Answered(None)).unwrap(),
            "null"
        );
        assert_eq!(CorrectnessCell::Answered(Some(false)).as_csv_field(), "false");
    }
}
