//! Per-task aggregation
//!
//! Groups responses by task and combines their navigation metrics into
//! [`TaskSummary`] records with one [`ResponseDetail`] per response.

use crate::scorer::{round_half_up, round_to, ClickStreamScorer};
use crate::tree::PathFinder;
use crate::types::{
    ClickAction, ClickEntry, ClickPathStep, Response, ResponseDetail, StudySnapshot, Task,
    TaskSummary, SKIPPED_LABEL,
};

/// Separator between click path steps
pub const CLICK_PATH_SEPARATOR: &str = " → ";

/// Prefix marking a back step in a click path
pub const BACK_STEP_PREFIX: &str = "← ";

/// Aggregator producing one summary per task
pub struct TaskAggregator;

impl TaskAggregator {
    /// Summarize every task of the snapshot, in task order
    pub fn summarize(snapshot: &StudySnapshot) -> Vec<TaskSummary> {
        let finder = PathFinder::new(&snapshot.tree);
        snapshot
            .tasks
            .iter()
            .map(|task| Self::summarize_task(snapshot, &finder, task))
            .collect()
    }

    /// Summarize a single task
    pub fn summarize_task(
        snapshot: &StudySnapshot,
        finder: &PathFinder<'_>,
        task: &Task,
    ) -> TaskSummary {
        let responses: Vec<&Response> = snapshot
            .participant_responses()
            .filter(|r| r.task_id == task.id)
            .collect();

        let optimal_path_length = finder.task_optimal_path_length(&task.expected_node_ids);
        let target_node_id = task
            .expected_node_ids
            .first()
            .map(String::as_str)
            .unwrap_or_default();

        let total_count = responses.len();
        let skipped_count = responses.iter().filter(|r| r.is_skipped()).count();
        let correct_count = responses
            .iter()
            .filter(|r| r.is_correct == Some(true))
            .count();

        let success_rate = ratio(correct_count as f64, total_count);
        let avg_duration = ratio(
            responses.iter().map(|r| r.duration_ms.unwrap_or(0) as f64).sum(),
            total_count,
        );
        let avg_confidence = ratio(
            responses.iter().map(|r| r.confidence.unwrap_or(0) as f64).sum(),
            total_count,
        );

        let details: Vec<ResponseDetail> = responses
            .iter()
            .map(|r| {
                build_response_detail(snapshot, finder, r, optimal_path_length, target_node_id)
            })
            .collect();

        let avg_directness = ratio(
            details.iter().map(|d| d.metrics.directness).sum(),
            total_count,
        );
        let avg_lostness = ratio(
            details.iter().map(|d| d.metrics.lostness).sum(),
            total_count,
        );

        TaskSummary {
            task_id: task.id.clone(),
            prompt: task.prompt.clone(),
            expected_node_ids: task.expected_node_ids.clone(),
            expected_label: finder.joined_labels(&task.expected_node_ids),
            optimal_path_length,
            total_count,
            correct_count,
            skipped_count,
            success_rate: round_half_up(success_rate * 100.0) as i64,
            avg_duration_ms: round_half_up(avg_duration) as i64,
            avg_confidence: round_to(avg_confidence, 1),
            avg_directness: round_to(avg_directness, 2),
            avg_lostness: round_to(avg_lostness, 2),
            responses: details,
        }
    }
}

fn build_response_detail(
    snapshot: &StudySnapshot,
    finder: &PathFinder<'_>,
    response: &Response,
    optimal_path_length: usize,
    target_node_id: &str,
) -> ResponseDetail {
    let metrics =
        ClickStreamScorer::score(&response.click_history, optimal_path_length, target_node_id);
    let (click_path_steps, click_path) = render_click_path(finder, &response.click_history);

    let selected_label = match response.selected_node_id.as_deref() {
        Some(node_id) => finder.label_or_id(node_id).to_string(),
        None => SKIPPED_LABEL.to_string(),
    };

    ResponseDetail {
        participant_name: snapshot.participant_name(&response.participant_id).to_string(),
        selected_node_id: response.selected_node_id.clone(),
        selected_label,
        skipped: response.is_skipped(),
        is_correct: response.is_correct,
        confidence: response.confidence,
        duration_ms: response.duration_ms,
        time_to_first_click_ms: response.time_to_first_click_ms,
        click_path,
        click_path_steps,
        metrics,
    }
}

/// Resolve click labels and render them as a readable path.
///
/// Unresolvable node ids are shown as-is.
pub fn render_click_path(
    finder: &PathFinder<'_>,
    clicks: &[ClickEntry],
) -> (Vec<ClickPathStep>, String) {
    let steps: Vec<ClickPathStep> = clicks
        .iter()
        .map(|c| ClickPathStep {
            label: finder.label_or_id(&c.node_id).to_string(),
            action: c.action,
        })
        .collect();

    let rendered = steps
        .iter()
        .map(|s| match s.action {
            ClickAction::Back => format!("{BACK_STEP_PREFIX}{}", s.label),
            _ => s.label.clone(),
        })
        .collect::<Vec<_>>()
        .join(CLICK_PATH_SEPARATOR);

    (steps, rendered)
}

/// `sum / count`, 0 when there is nothing to average
fn ratio(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Participant, TreeNode};
    use pretty_assertions::assert_eq;

    fn tree() -> TreeNode {
        TreeNode::branch(
            "A",
            "Home",
            vec![
                TreeNode::leaf("B", "Billing"),
                TreeNode::branch("C", "Contact", vec![TreeNode::leaf("D", "Directions")]),
            ],
        )
    }

    fn task(id: &str, expected: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            prompt: format!("Prompt for {id}"),
            expected_node_ids: expected.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn response(participant: &str, task_id: &str, selected: Option<&str>) -> Response {
        Response {
            participant_id: participant.to_string(),
            task_id: task_id.to_string(),
            selected_node_id: selected.map(str::to_string),
            is_correct: selected.map(|s| s == "B"),
            confidence: Some(4),
            duration_ms: Some(2000),
            time_to_first_click_ms: Some(300),
            click_history: vec![],
        }
    }

    fn snapshot(tasks: Vec<Task>, responses: Vec<Response>) -> StudySnapshot {
        StudySnapshot {
            study: None,
            tree: tree(),
            tasks,
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
            responses,
        }
    }

    #[test]
    fn test_end_to_end_direct_response() {
        let mut r = response("p1", "t1", Some("B"));
        r.click_history = vec![
            ClickEntry::new("A", ClickAction::Expand, 0),
            ClickEntry::new("B", ClickAction::Select, 500),
        ];
        let snapshot = snapshot(vec![task("t1", &["B"])], vec![r]);

        let summaries = TaskAggregator::summarize(&snapshot);
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.optimal_path_length, 2);
        assert_eq!(summary.expected_label, "Billing");
        assert_eq!(summary.success_rate, 100);
        assert_eq!(summary.avg_directness, 1.0);
        assert_eq!(summary.avg_lostness, 0.0);

        let detail = &summary.responses[0];
        assert_eq!(detail.participant_name, "Ada");
        assert_eq!(detail.selected_label, "Billing");
        assert_eq!(detail.click_path, "Home → Billing");
        assert_eq!(detail.metrics.directness, 1.0);
        assert_eq!(detail.metrics.lostness, 0.0);
        assert_eq!(detail.metrics.backtrack_count, 0);
        assert_eq!(detail.metrics.avg_hesitation_ms, 500);
    }

    #[test]
    fn test_counts_and_missing_values_average_as_zero() {
        let mut skipped = response("p2", "t1", None);
        skipped.duration_ms = None;
        skipped.confidence = None;
        let wrong = response("p1", "t1", Some("D"));
        let right = response("p2", "t1", Some("B"));

        let snapshot = snapshot(vec![task("t1", &["B"])], vec![skipped, wrong, right]);
        let summary = &TaskAggregator::summarize(&snapshot)[0];

        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.skipped_count, 1);
        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.success_rate, 33);
        // (0 + 2000 + 2000) / 3
        assert_eq!(summary.avg_duration_ms, 1333);
        // (0 + 4 + 4) / 3 = 2.666..
        assert_eq!(summary.avg_confidence, 2.7);

        let skipped_detail = &summary.responses[0];
        assert!(skipped_detail.skipped);
        assert_eq!(skipped_detail.selected_label, SKIPPED_LABEL);
        assert_eq!(skipped_detail.participant_name, "Anonymous");
        assert_eq!(summary.responses[1].selected_label, "Directions");
    }

    #[test]
    fn test_unlisted_participants_are_excluded() {
        let listed = response("p1", "t1", Some("B"));
        let unlisted = response("p7", "t1", Some("D"));
        let snapshot = snapshot(vec![task("t1", &["B"])], vec![listed, unlisted]);

        let summary = &TaskAggregator::summarize(&snapshot)[0];
        assert_eq!(summary.total_count, 1);
        assert_eq!(summary.success_rate, 100);
        assert_eq!(summary.responses[0].participant_name, "Ada");
    }

    #[test]
    fn test_task_without_responses() {
        let snapshot = snapshot(vec![task("t1", &["D"])], vec![]);
        let summary = &TaskAggregator::summarize(&snapshot)[0];

        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.success_rate, 0);
        assert_eq!(summary.avg_duration_ms, 0);
        assert_eq!(summary.avg_confidence, 0.0);
        assert_eq!(summary.avg_directness, 0.0);
        assert_eq!(summary.avg_lostness, 0.0);
        assert_eq!(summary.optimal_path_length, 3);
        assert!(summary.responses.is_empty());
    }

    #[test]
    fn test_unresolvable_task_degrades() {
        let mut r = response("p1", "t1", Some("ghost"));
        r.click_history = vec![
            ClickEntry::new("A", ClickAction::Expand, 0),
            ClickEntry::new("ghost", ClickAction::Select, 100),
        ];
        let snapshot = snapshot(vec![task("t1", &["ghost", "phantom"])], vec![r]);
        let summary = &TaskAggregator::summarize(&snapshot)[0];

        assert_eq!(summary.expected_label, "ghost, phantom");
        assert_eq!(summary.optimal_path_length, 1);
        assert_eq!(summary.responses[0].selected_label, "ghost");
        assert_eq!(summary.responses[0].click_path, "Home → ghost");
        assert_eq!(summary.responses[0].metrics.directness, 0.5);
    }

    #[test]
    fn test_back_steps_in_click_path() {
        let t = tree();
        let finder = PathFinder::new(&t);
        let clicks = vec![
            ClickEntry::new("A", ClickAction::Expand, 0),
            ClickEntry::new("C", ClickAction::Expand, 100),
            ClickEntry::new("A", ClickAction::Back, 200),
            ClickEntry::new("B", ClickAction::Select, 300),
        ];

        let (steps, rendered) = render_click_path(&finder, &clicks);
        assert_eq!(rendered, "Home → Contact → ← Home → Billing");
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[2].action, ClickAction::Back);
        assert_eq!(steps[2].label, "Home");
    }

    #[test]
    fn test_summaries_keep_task_order() {
        let snapshot = snapshot(
            vec![task("t2", &["D"]), task("t1", &["B"]), task("t3", &["C"])],
            vec![response("p1", "t1", Some("B"))],
        );
        let ids: Vec<String> = TaskAggregator::summarize(&snapshot)
            .into_iter()
            .map(|s| s.task_id)
            .collect();

        assert_eq!(ids, vec!["t2", "t1", "t3"]);
    }

    #[test]
    fn test_aggregation_is_repeatable() {
        let mut r = response("p1", "t1", Some("D"));
        r.click_history = vec![
            ClickEntry::new("A", ClickAction::Expand, 0),
            ClickEntry::new("C", ClickAction::Expand, 700),
            ClickEntry::new("D", ClickAction::Select, 1300),
        ];
        let snapshot = snapshot(
            vec![task("t1", &["B"]), task("t2", &["D"])],
            vec![r, response("p2", "t1", None)],
        );

        assert_eq!(
            TaskAggregator::summarize(&snapshot),
            TaskAggregator::summarize(&snapshot)
        );
    }

    #[test]
    fn test_average_of_rounded_metrics() {
        // S = 2: directness 2/3 -> 0.67, 2/2 -> 1.0
        let mut first = response("p1", "t1", Some("B"));
        first.click_history = vec![
            ClickEntry::new("A", ClickAction::Expand, 0),
            ClickEntry::new("C", ClickAction::Expand, 100),
            ClickEntry::new("B", ClickAction::Select, 200),
        ];
        let mut second = response("p2", "t1", Some("B"));
        second.click_history = vec![
            ClickEntry::new("A", ClickAction::Expand, 0),
            ClickEntry::new("B", ClickAction::Select, 200),
        ];
        let third = second.clone();

        let snapshot = snapshot(vec![task("t1", &["B"])], vec![first, second, third]);
        let summary = &TaskAggregator::summarize(&snapshot)[0];

        assert_eq!(summary.responses[0].metrics.directness, 0.67);
        // (0.67 + 1.0 + 1.0) / 3
        assert_eq!(summary.avg_directness, 0.89);
    }
}
