//! Tabular export
//!
//! Flattens every response into one [`CsvRow`] and renders rows as CSV text.

use crate::aggregate::render_click_path;
use crate::scorer::ClickStreamScorer;
use crate::tree::PathFinder;
use crate::types::{CorrectnessCell, CsvRow, Response, StudySnapshot, SKIPPED_MARKER};

/// Column names of the CSV export, in order
pub const CSV_COLUMNS: [&str; 15] = [
    "participant",
    "taskPrompt",
    "expectedNode",
    "selectedNode",
    "isCorrect",
    "confidence",
    "durationMs",
    "timeToFirstClickMs",
    "totalClicks",
    "uniqueNodes",
    "directness",
    "lostness",
    "backtrackCount",
    "avgHesitationMs",
    "clickPath",
];

/// Exporter for flat per-response rows
pub struct ResultsExporter;

impl ResultsExporter {
    /// One row per response from a listed participant, in response order
    pub fn rows(snapshot: &StudySnapshot) -> Vec<CsvRow> {
        let finder = PathFinder::new(&snapshot.tree);
        snapshot
            .participant_responses()
            .map(|r| Self::row(snapshot, &finder, r))
            .collect()
    }

    fn row(snapshot: &StudySnapshot, finder: &PathFinder<'_>, response: &Response) -> CsvRow {
        let task = snapshot.task(&response.task_id);

        // Responses to unknown tasks are scored against a one-node path
        let (task_prompt, expected_node, optimal_path_length, target_node_id) = match task {
            Some(task) => (
                task.prompt.clone(),
                task.expected_node_ids.join(", "),
                finder.task_optimal_path_length(&task.expected_node_ids),
                task.expected_node_ids
                    .first()
                    .map(String::as_str)
                    .unwrap_or_default(),
            ),
            None => (String::new(), String::new(), 1, ""),
        };

        let metrics =
            ClickStreamScorer::score(&response.click_history, optimal_path_length, target_node_id);
        let (_, click_path) = render_click_path(finder, &response.click_history);

        let (selected_node, is_correct) = match &response.selected_node_id {
            Some(node_id) => (node_id.clone(), CorrectnessCell::Answered(response.is_correct)),
            None => (SKIPPED_MARKER.to_string(), CorrectnessCell::Skipped),
        };

        CsvRow {
            participant: snapshot.participant_name(&response.participant_id).to_string(),
            task_prompt,
            expected_node,
            selected_node,
            is_correct,
            confidence: response.confidence,
            duration_ms: response.duration_ms,
            time_to_first_click_ms: response.time_to_first_click_ms,
            total_clicks: metrics.total_clicks,
            unique_nodes: metrics.unique_nodes_visited,
            directness: metrics.directness,
            lostness: metrics.lostness,
            backtrack_count: metrics.backtrack_count,
            avg_hesitation_ms: metrics.avg_hesitation_ms,
            click_path,
        }
    }

    /// Render rows as CSV with a header line
    pub fn to_csv(rows: &[CsvRow]) -> String {
        let mut csv = String::new();
        push_line(&mut csv, CSV_COLUMNS.iter().map(|c| c.to_string()));

        for row in rows {
            push_line(
                &mut csv,
                [
                    row.participant.clone(),
                    row.task_prompt.clone(),
                    row.expected_node.clone(),
                    row.selected_node.clone(),
                    row.is_correct.as_csv_field(),
                    optional_field(row.confidence),
                    optional_field(row.duration_ms),
                    optional_field(row.time_to_first_click_ms),
                    row.total_clicks.to_string(),
                    row.unique_nodes.to_string(),
                    row.directness.to_string(),
                    row.lostness.to_string(),
                    row.backtrack_count.to_string(),
                    row.avg_hesitation_ms.to_string(),
                    row.click_path.clone(),
                ]
                .into_iter(),
            );
        }

        csv
    }
}

fn push_line(csv: &mut String, fields: impl Iterator<Item = String>) {
    let line = fields
        .map(|field| escape_csv(&field))
        .collect::<Vec<_>>()
        .join(",");
    csv.push_str(&line);
    csv.push('\n');
}

fn optional_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn escape_csv(value: &str) -> String {
    let needs_quotes = value.contains([',', '"', '\n', '\r']);
    if needs_quotes {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TaskAggregator;
    use crate::types::{ClickAction, ClickEntry, Participant, Task, TreeNode};
    use pretty_assertions::assert_eq;

    fn snapshot() -> StudySnapshot {
        let tree = TreeNode::branch(
            "A",
            "Home",
            vec![TreeNode::leaf("B", "Billing"), TreeNode::leaf("C", "Contact")],
        );
        let tasks = vec![
            Task {
                id: "t1".to_string(),
                prompt: "Where do you pay, quickly?".to_string(),
                expected_node_ids: vec!["B".to_string()],
            },
            Task {
                id: "t2".to_string(),
                prompt: "Reach support".to_string(),
                expected_node_ids: vec!["C".to_string(), "A".to_string()],
            },
        ];
        let participants = vec![
            Participant {
                id: "p1".to_string(),
                name: Some("Ada".to_string()),
            },
            Participant {
                id: "p2".to_string(),
                name: None,
            },
        ];

        let mut responses = Vec::new();
        for participant in &participants {
            for task in &tasks {
                responses.push(Response {
                    participant_id: participant.id.clone(),
                    task_id: task.id.clone(),
                    selected_node_id: Some(task.expected_node_ids[0].clone()),
                    is_correct: Some(true),
                    confidence: Some(5),
                    duration_ms: Some(1500),
                    time_to_first_click_ms: None,
                    click_history: vec![
                        ClickEntry::new("A", ClickAction::Expand, 0),
                        ClickEntry::new("C", ClickAction::Expand, 400),
                        ClickEntry::new("A", ClickAction::Back, 900),
                        ClickEntry::new(task.expected_node_ids[0].clone(), ClickAction::Select, 1200),
                    ],
                });
            }
        }

        StudySnapshot {
            study: None,
            tree,
            tasks,
            participants,
            responses,
        }
    }

    #[test]
    fn test_one_row_per_participant_task_pair() {
        let snapshot = snapshot();
        let rows = ResultsExporter::rows(&snapshot);

        assert_eq!(rows.len(), snapshot.participants.len() * snapshot.tasks.len());
        assert_eq!(rows[0].participant, "Ada");
        assert_eq!(rows[2].participant, "Anonymous");
        assert_eq!(rows[1].expected_node, "C, A");
    }

    #[test]
    fn test_rows_match_task_detail_metrics() {
        let snapshot = snapshot();
        let rows = ResultsExporter::rows(&snapshot);
        let summaries = TaskAggregator::summarize(&snapshot);

        // rows[0] is p1/t1, the first detail of the first summary
        let detail = &summaries[0].responses[0];
        assert_eq!(rows[0].directness, detail.metrics.directness);
        assert_eq!(rows[0].lostness, detail.metrics.lostness);
        assert_eq!(rows[0].total_clicks, detail.metrics.total_clicks);
        assert_eq!(rows[0].unique_nodes, detail.metrics.unique_nodes_visited);
        assert_eq!(rows[0].avg_hesitation_ms, detail.metrics.avg_hesitation_ms);
        assert_eq!(rows[0].click_path, detail.click_path);
        assert_eq!(rows[0].click_path, "Home → Contact → ← Home → Billing");
    }

    #[test]
    fn test_skipped_response_row() {
        let mut snapshot = snapshot();
        snapshot.responses[0].selected_node_id = None;
        snapshot.responses[0].is_correct = None;
        snapshot.responses[0].click_history.clear();

        let row = &ResultsExporter::rows(&snapshot)[0];
        assert_eq!(row.selected_node, SKIPPED_MARKER);
        assert_eq!(row.is_correct, CorrectnessCell::Skipped);
        assert_eq!(row.total_clicks, 0);
        assert_eq!(row.directness, 0.0);
        assert_eq!(row.click_path, "");
    }

    #[test]
    fn test_unlisted_participant_has_no_row() {
        let mut snapshot = snapshot();
        snapshot.responses[1].participant_id = "p7".to_string();

        let rows = ResultsExporter::rows(&snapshot);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].participant, "Anonymous");
        assert_eq!(rows[1].task_prompt, "Where do you pay, quickly?");
    }

    #[test]
    fn test_response_to_unknown_task() {
        let mut snapshot = snapshot();
        snapshot.responses[0].task_id = "gone".to_string();

        let row = &ResultsExporter::rows(&snapshot)[0];
        assert_eq!(row.task_prompt, "");
        assert_eq!(row.expected_node, "");
        // S = 1 against 4 clicks
        assert_eq!(row.directness, 0.25);
    }

    #[test]
    fn test_csv_rendering() {
        let mut snapshot = snapshot();
        snapshot.responses.truncate(1);
        snapshot.responses[0].selected_node_id = None;
        let rows = ResultsExporter::rows(&snapshot);

        let csv = ResultsExporter::to_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "Ada,\"Where do you pay, quickly?\",B,SKIPPED,SKIPPED,5,1500,,4,3,0.5,0.6,1,400,Home → Contact → ← Home → Billing"
        );
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_csv("carriage\rreturn"), "\"carriage\rreturn\"");
        assert_eq!(escape_csv("crlf\r\n"), "\"crlf\r\n\"");
        assert_eq!(escape_csv(""), "");
    }
}
