use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{BranchCase, TaskResult, TaskStatus, TaskType, WorkflowStatus, WorkflowTask};

/// node id
pub type NodeId = String;

/// Id of the synthesized entry node.
pub const START_NODE: &str = "__start";
/// Id of the synthesized sink node.
pub const FINAL_NODE: &str = "__final";

/// Display status of a graph node: the task statuses plus "never reached".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    #[default]
    NotExecuted,
    Scheduled,
    InProgress,
    Completed,
    CompletedWithErrors,
    Failed,
    FailedWithTerminalError,
    Canceled,
    TimedOut,
    Skipped,
}

impl From<TaskStatus> for NodeStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Scheduled => NodeStatus::Scheduled,
            TaskStatus::InProgress => NodeStatus::InProgress,
            TaskStatus::Completed => NodeStatus::Completed,
            TaskStatus::CompletedWithErrors => NodeStatus::CompletedWithErrors,
            TaskStatus::Failed => NodeStatus::Failed,
            TaskStatus::FailedWithTerminalError => NodeStatus::FailedWithTerminalError,
            TaskStatus::Canceled => NodeStatus::Canceled,
            TaskStatus::TimedOut => NodeStatus::TimedOut,
            TaskStatus::Skipped => NodeStatus::Skipped,
        }
    }
}

impl From<WorkflowStatus> for NodeStatus {
    fn from(status: WorkflowStatus) -> Self {
        match status {
            WorkflowStatus::Running | WorkflowStatus::Paused => NodeStatus::InProgress,
            WorkflowStatus::Completed => NodeStatus::Completed,
            WorkflowStatus::Failed => NodeStatus::Failed,
            WorkflowStatus::TimedOut => NodeStatus::TimedOut,
            WorkflowStatus::Terminated => NodeStatus::Canceled,
        }
    }
}

impl NodeStatus {
    pub fn is_executed(&self) -> bool {
        *self != NodeStatus::NotExecuted
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::CompletedWithErrors | NodeStatus::Skipped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, NodeStatus::Failed | NodeStatus::FailedWithTerminalError | NodeStatus::TimedOut | NodeStatus::Canceled)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, NodeStatus::Scheduled | NodeStatus::InProgress)
    }

    /// Lower ranks win when several statuses are folded into one.
    pub(crate) fn severity(&self) -> u8 {
        match self {
            NodeStatus::FailedWithTerminalError => 0,
            NodeStatus::Failed => 1,
            NodeStatus::TimedOut => 2,
            NodeStatus::Canceled => 3,
            NodeStatus::InProgress => 4,
            NodeStatus::Scheduled => 5,
            NodeStatus::CompletedWithErrors => 6,
            NodeStatus::Completed => 7,
            NodeStatus::Skipped => 8,
            NodeStatus::NotExecuted => 9,
        }
    }

    /// Status of a node from its attempts, newest last.
    ///
    /// A running attempt wins over the latest status so retries in flight stay visible.
    pub fn from_records(records: &[Arc<TaskResult>]) -> Self {
        if records.iter().any(|r| r.status == TaskStatus::InProgress) {
            return NodeStatus::InProgress;
        }
        records.last().map(|r| r.status.into()).unwrap_or_default()
    }
}

/// Static parts of the definition entry a node came from.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NodeSpec {
    pub name: String,
    pub description: String,
    pub optional: bool,
    pub alias_for_ref: Option<String>,
    pub join_on: Vec<String>,
    pub sub_workflow_name: Option<String>,
}

impl From<&WorkflowTask> for NodeSpec {
    fn from(task: &WorkflowTask) -> Self {
        Self {
            name: task.name.clone(),
            description: task.description.clone(),
            optional: task.optional,
            alias_for_ref: task.alias_for_ref.clone(),
            join_on: task.join_on.clone(),
            sub_workflow_name: task.sub_workflow_param.as_ref().map(|p| p.name.clone()),
        }
    }
}

/// One step of an execution: a definition entry reconciled with its task records.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionNode {
    /// node id, the task reference name for task nodes
    pub id: NodeId,
    /// node type
    pub task_type: TaskType,
    /// definition entry, `None` for synthesized nodes
    pub spec: Option<NodeSpec>,
    /// attempts and iterations, newest last
    pub records: Vec<Arc<TaskResult>>,
    /// derived display status
    pub status: NodeStatus,
    /// enclosing composite node
    pub parent: Option<NodeId>,
    /// nodes nested in this composite, in definition order
    pub members: Vec<NodeId>,
    /// nesting depth, top level is 0
    pub depth: usize,
    /// branch selected by a decision
    pub taken_case: Option<BranchCase>,
    /// execution id of a sub-workflow, resolved separately
    pub sub_workflow_id: Option<String>,
    /// built from a task record with no definition entry
    pub synthetic: bool,
}

impl ExecutionNode {
    pub fn new(
        id: &str,
        task_type: TaskType,
    ) -> Self {
        Self {
            id: id.to_string(),
            task_type,
            spec: None,
            records: Vec::new(),
            status: NodeStatus::NotExecuted,
            parent: None,
            members: Vec::new(),
            depth: 0,
            taken_case: None,
            sub_workflow_id: None,
            synthetic: false,
        }
    }

    pub(crate) fn from_task(
        task: &WorkflowTask,
        mut records: Vec<Arc<TaskResult>>,
    ) -> Self {
        records.sort_by_key(|r| (r.iteration, r.retry_count));
        let status = NodeStatus::from_records(&records);
        let sub_workflow_id = records.iter().rev().find_map(|r| r.sub_workflow_id.clone());

        Self {
            spec: Some(NodeSpec::from(task)),
            records,
            status,
            sub_workflow_id,
            ..Self::new(&task.task_reference_name, task.task_type)
        }
    }

    pub(crate) fn synthesized(
        id: &str,
        records: Vec<Arc<TaskResult>>,
    ) -> Self {
        let task_type = records.first().map(|r| r.kind()).unwrap_or_default();
        let mut task = WorkflowTask::new(id, task_type);
        if let Some(first) = records.first() {
            task.name = first.task_def_name.clone();
        }
        Self {
            synthetic: true,
            ..Self::from_task(&task, records)
        }
    }

    /// Most recent attempt.
    pub fn latest(&self) -> Option<&Arc<TaskResult>> {
        self.records.last()
    }

    pub fn is_executed(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn is_structural(&self) -> bool {
        self.task_type.is_structural()
    }

    /// Earliest scheduled/start time and latest end time over the attempts.
    pub fn time_bounds(&self) -> (Option<i64>, Option<i64>) {
        let start = self.records.iter().filter_map(|r| r.scheduled_at().or(r.started_at())).min();
        let end = self.records.iter().filter_map(|r| r.ended_at()).max();
        (start, end)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{ExecutionNode, NodeStatus};
    use crate::model::{TaskResult, TaskStatus, TaskType, WorkflowTask};

    fn record(
        status: TaskStatus,
        retry_count: u32,
    ) -> Arc<TaskResult> {
        Arc::new(TaskResult {
            reference_task_name: "x".to_string(),
            status,
            retry_count,
            scheduled_time: 10 + retry_count as i64 * 100,
            end_time: 50 + retry_count as i64 * 100,
            ..Default::default()
        })
    }

    #[test]
    fn test_status_without_records() {
        assert_eq!(NodeStatus::from_records(&[]), NodeStatus::NotExecuted);
    }

    #[test]
    fn test_status_prefers_running_attempt() {
        let records = vec![record(TaskStatus::InProgress, 0), record(TaskStatus::Failed, 1)];
        assert_eq!(NodeStatus::from_records(&records), NodeStatus::InProgress);
    }

    #[test]
    fn test_records_ordered_by_retry() {
        let task = WorkflowTask::new("x", TaskType::Simple);
        let node = ExecutionNode::from_task(&task, vec![record(TaskStatus::Completed, 1), record(TaskStatus::Failed, 0)]);

        assert_eq!(node.records[0].retry_count, 0);
        assert_eq!(node.records[1].retry_count, 1);
        assert_eq!(node.status, NodeStatus::Completed);
        assert_eq!(node.time_bounds(), (Some(10), Some(150)));
    }
}
