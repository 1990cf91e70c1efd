//! Row model: the execution graph flattened into timeline rows.
//!
//! Rows are emitted by a pre-order walk of the containment tree. Children
//! of a collapsed row are not emitted at all, so the row count always
//! matches what is on screen.

mod expansion;

use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use tracing::debug;

pub use expansion::ExpansionState;

use crate::{
    graph::{ExecutionGraph, ExecutionNode, NodeId, NodeStatus},
    model::{TaskResult, TaskType},
    utils::format,
};

/// Glyph drawn next to a row label.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RowIcon {
    #[default]
    Task,
    Fork,
    Join,
    Decision,
    Loop,
    SubWorkflow,
    Terminate,
    Attempt,
}

impl From<TaskType> for RowIcon {
    fn from(task_type: TaskType) -> Self {
        match task_type {
            TaskType::ForkJoin | TaskType::ForkJoinDynamic => RowIcon::Fork,
            TaskType::Join | TaskType::ExclusiveJoin => RowIcon::Join,
            TaskType::Decision | TaskType::Switch => RowIcon::Decision,
            TaskType::DoWhile => RowIcon::Loop,
            TaskType::SubWorkflow => RowIcon::SubWorkflow,
            TaskType::Terminate => RowIcon::Terminate,
            _ => RowIcon::Task,
        }
    }
}

/// Time envelope of a whole subtree, drawn for a collapsed row.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub status: NodeStatus,
}

/// One timeline entry.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Row {
    /// row id: the node id, or the task id for attempt rows
    pub id: String,
    /// graph node this row belongs to
    pub node_id: NodeId,
    pub label: String,
    pub icon: RowIcon,
    pub depth: usize,
    pub status: NodeStatus,
    pub collapsible: bool,
    pub expanded: bool,
    /// attempts drawn as spans, newest last
    pub records: Vec<Arc<TaskResult>>,
    /// subtree envelope, set for collapsible rows
    pub summary: Option<TimeSpan>,
}

impl Row {
    /// A collapsed collapsible row is drawn as its subtree envelope.
    pub fn shows_summary(&self) -> bool {
        self.collapsible && !self.expanded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOptions {
    /// give retried and iterated tasks one sub-row per attempt
    pub show_attempts: bool,
}

impl Default for RowOptions {
    fn default() -> Self {
        Self {
            show_attempts: true,
        }
    }
}

enum RowChild<'a> {
    Node(&'a ExecutionNode),
    Attempt(usize),
}

/// Flattens the graph into rows honoring the expansion state.
pub fn flatten(
    graph: &ExecutionGraph,
    expansion: &ExpansionState,
    options: &RowOptions,
) -> Vec<Row> {
    let mut rows = Vec::new();
    for node in graph.top_level().iter().filter_map(|id| graph.node(id)) {
        push_node(graph, node, expansion, options, &mut rows);
    }
    debug!(rows = rows.len(), "rows flattened");
    rows
}

/// Ids of every collapsible row in the full tree, visible or not.
pub fn collapsible_nodes(
    graph: &ExecutionGraph,
    options: &RowOptions,
) -> Vec<NodeId> {
    graph.nodes().filter(|node| !node.is_structural() && !row_children(graph, node, options).is_empty()).map(|node| node.id.clone()).collect()
}

/// Ids of the rows that get an expand/collapse affordance.
pub fn collapsible_ids(rows: &[Row]) -> HashSet<String> {
    rows.iter().filter(|row| row.collapsible).map(|row| row.id.clone()).collect()
}

fn row_children<'a>(
    graph: &'a ExecutionGraph,
    node: &'a ExecutionNode,
    options: &RowOptions,
) -> Vec<RowChild<'a>> {
    if node.task_type.is_composite() {
        return node.members.iter().filter_map(|id| graph.node(id)).map(RowChild::Node).collect();
    }
    if options.show_attempts && node.records.len() > 1 {
        return (0..node.records.len()).map(RowChild::Attempt).collect();
    }
    Vec::new()
}

fn push_node(
    graph: &ExecutionGraph,
    node: &ExecutionNode,
    expansion: &ExpansionState,
    options: &RowOptions,
    rows: &mut Vec<Row>,
) {
    let children = row_children(graph, node, options);
    let collapsible = !children.is_empty();
    let expanded = collapsible && expansion.is_expanded(&node.id, node.depth);

    rows.push(Row {
        id: node.id.clone(),
        node_id: node.id.clone(),
        label: node.id.clone(),
        icon: node.task_type.into(),
        depth: node.depth,
        status: node.status,
        collapsible,
        expanded,
        records: node.records.clone(),
        summary: collapsible.then(|| subtree_span(graph, node)),
    });

    if !expanded {
        return;
    }
    for child in children {
        match child {
            RowChild::Node(member) => push_node(graph, member, expansion, options, rows),
            RowChild::Attempt(i) => rows.push(attempt_row(node, i)),
        }
    }
}

fn attempt_row(
    node: &ExecutionNode,
    index: usize,
) -> Row {
    let record = &node.records[index];
    let id = format::attempt_id(&node.id, index, record);

    Row {
        id,
        node_id: node.id.clone(),
        label: format::task_label(record),
        icon: RowIcon::Attempt,
        depth: node.depth + 1,
        status: record.status.into(),
        collapsible: false,
        expanded: false,
        records: vec![record.clone()],
        summary: None,
    }
}

/// Earliest start, latest end and most severe status across a node and everything nested in it.
fn subtree_span(
    graph: &ExecutionGraph,
    node: &ExecutionNode,
) -> TimeSpan {
    let mut span = TimeSpan::default();
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        let (start, end) = current.time_bounds();
        span.start = match (span.start, start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        span.end = span.end.max(end);
        if current.status.is_executed() && (current.status.severity() < span.status.severity()) {
            span.status = current.status;
        }
        stack.extend(current.members.iter().filter_map(|id| graph.node(id)));
    }
    span
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{ExpansionState, RowIcon, RowOptions, collapsible_ids, collapsible_nodes, flatten};
    use crate::{
        graph::{ExecutionGraph, NodeStatus},
        model::{Execution, TaskResult, TaskStatus, WorkflowDef, WorkflowStatus},
    };

    fn simple(reference: &str) -> serde_json::Value {
        json!({ "taskReferenceName": reference, "type": "SIMPLE" })
    }

    fn record(
        reference: &str,
        status: TaskStatus,
        start: i64,
        end: i64,
    ) -> TaskResult {
        TaskResult {
            task_id: format!("{}-{}", reference, start),
            reference_task_name: reference.to_string(),
            status,
            scheduled_time: start,
            start_time: start,
            end_time: end,
            ..Default::default()
        }
    }

    fn graph(
        tasks: serde_json::Value,
        records: Vec<TaskResult>,
    ) -> ExecutionGraph {
        let def: WorkflowDef = serde_json::from_value(json!({ "name": "rows", "tasks": tasks })).unwrap();
        let execution = Execution {
            status: WorkflowStatus::Running,
            start_time: 1,
            workflow_definition: Some(def),
            ..Default::default()
        };
        ExecutionGraph::from_execution_and_tasks(&execution, &records)
    }

    fn nested() -> ExecutionGraph {
        graph(
            json!([
                simple("start"),
                {
                    "taskReferenceName": "fork",
                    "type": "FORK_JOIN",
                    "forkTasks": [
                        [simple("a"), { "taskReferenceName": "check", "type": "DECISION", "decisionCases": { "x": [simple("x1")] } }],
                        [simple("b")]
                    ]
                },
                { "taskReferenceName": "join", "type": "JOIN", "joinOn": ["check", "b"] },
            ]),
            vec![record("start", TaskStatus::Completed, 1, 5), record("a", TaskStatus::Completed, 5, 9), record("b", TaskStatus::Failed, 5, 20)],
        )
    }

    fn ids(rows: &[super::Row]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_linear_rows_in_definition_order() {
        let g = graph(
            json!([simple("A"), simple("B"), simple("C")]),
            vec![record("B", TaskStatus::InProgress, 100, 0), record("A", TaskStatus::Completed, 1, 100)],
        );
        let rows = flatten(&g, &ExpansionState::default(), &RowOptions::default());

        assert_eq!(ids(&rows), vec!["A", "B", "C"]);
        assert!(rows.iter().all(|r| !r.collapsible));
        assert_eq!(rows[2].status, NodeStatus::NotExecuted);
        assert!(rows[2].records.is_empty());
    }

    #[test]
    fn test_collapsed_by_default() {
        let g = nested();
        let rows = flatten(&g, &ExpansionState::default(), &RowOptions::default());

        assert_eq!(ids(&rows), vec!["start", "fork", "join"]);
        let fork = &rows[1];
        assert!(fork.collapsible);
        assert!(!fork.expanded);
        assert_eq!(fork.icon, RowIcon::Fork);
        let summary = fork.summary.unwrap();
        assert_eq!(summary.start, Some(5));
        assert_eq!(summary.end, Some(20));
        assert_eq!(summary.status, NodeStatus::Failed);
        assert_eq!(collapsible_ids(&rows).into_iter().collect::<Vec<_>>(), vec!["fork".to_string()]);
    }

    #[test]
    fn test_expand_adds_direct_children() {
        let g = nested();
        let options = RowOptions::default();
        let mut expansion = ExpansionState::default();
        let before = flatten(&g, &expansion, &options).len();

        expansion.toggle("fork", 0);
        let rows = flatten(&g, &expansion, &options);
        assert_eq!(rows.len(), before + g.members("fork").len());
        assert_eq!(ids(&rows), vec!["start", "fork", "a", "check", "b", "join"]);
        assert_eq!(rows[3].depth, 1);

        expansion.toggle("check", 1);
        let rows = flatten(&g, &expansion, &options);
        assert_eq!(ids(&rows), vec!["start", "fork", "a", "check", "x1", "b", "join"]);
    }

    #[test]
    fn test_collapse_expand_round_trip() {
        let g = nested();
        let options = RowOptions::default();
        let all = collapsible_nodes(&g, &options);
        assert_eq!(all, vec!["fork".to_string(), "check".to_string()]);

        let mut expansion = ExpansionState::default();
        expansion.expand_all(all.iter().cloned());
        let expanded = flatten(&g, &expansion, &options);
        assert_eq!(expanded.len(), 7);

        expansion.collapse_all(all.iter().cloned());
        let collapsed = flatten(&g, &expansion, &options);
        assert_eq!(ids(&collapsed), vec!["start", "fork", "join"]);

        expansion.expand_all(all);
        assert_eq!(flatten(&g, &expansion, &options), expanded);
    }

    #[test]
    fn test_retried_task_attempt_rows() {
        let mut retry = record("X", TaskStatus::Completed, 50, 90);
        retry.retry_count = 1;
        let g = graph(json!([simple("X")]), vec![record("X", TaskStatus::Failed, 10, 40), retry]);
        let mut expansion = ExpansionState::default();
        let options = RowOptions::default();

        let rows = flatten(&g, &expansion, &options);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].collapsible);
        assert_eq!(rows[0].summary.unwrap().start, Some(10));
        assert_eq!(rows[0].summary.unwrap().end, Some(90));

        expansion.toggle("X", 0);
        let rows = flatten(&g, &expansion, &options);
        assert_eq!(rows[0].records.len(), 2);
        assert_eq!(ids(&rows), vec!["X", "X-10", "X-50"]);
        assert_eq!(rows[2].label, "X (retry 1)");
        assert_eq!(rows[2].icon, RowIcon::Attempt);

        let flat = flatten(
            &g,
            &expansion,
            &RowOptions {
                show_attempts: false,
            },
        );
        assert_eq!(flat.len(), 1);
        assert!(!flat[0].collapsible);
    }

    #[test]
    fn test_default_depth_expands_top_level() {
        let g = nested();
        let rows = flatten(&g, &ExpansionState::new(1), &RowOptions::default());
        assert_eq!(ids(&rows), vec!["start", "fork", "a", "check", "b", "join"]);
    }
}
