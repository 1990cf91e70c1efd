use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    FlowlensError, Result,
    model::{TaskResult, WorkflowDef},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    #[default]
    Running,
    Completed,
    Failed,
    TimedOut,
    Terminated,
    Paused,
}

/// Point-in-time snapshot of one workflow execution.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Execution {
    pub workflow_id: String,
    pub workflow_name: String,
    pub workflow_version: u32,
    pub status: WorkflowStatus,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_for_incompletion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_definition: Option<WorkflowDef>,
    pub input: Value,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_input_payload_storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_output_payload_storage_path: Option<String>,
}

impl Execution {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<Execution>(s).map_err(|e| FlowlensError::Model(format!("invalid execution: {}", e)))
    }
}

/// The execution record paired with its task list, fetched together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionAndTasks {
    pub execution: Execution,
    pub tasks: Vec<TaskResult>,
}

impl ExecutionAndTasks {
    pub fn new(
        execution: Execution,
        tasks: Vec<TaskResult>,
    ) -> Self {
        Self {
            execution,
            tasks,
        }
    }

    /// Decodes the two collaborator responses (`/execution/{id}` and `/execution/{id}/tasks`).
    pub fn from_json(
        execution: &str,
        tasks: &str,
    ) -> Result<Self> {
        Ok(Self::new(Execution::from_json(execution)?, TaskResult::list_from_json(tasks)?))
    }
}

#[cfg(test)]
mod test {
    use super::{ExecutionAndTasks, WorkflowStatus};

    #[test]
    fn test_execution_and_tasks_from_json() {
        let snapshot = ExecutionAndTasks::from_json(
            r#"{"workflowId": "wf-1", "status": "FAILED", "startTime": 10, "workflowDefinition": {"name": "w", "tasks": []}}"#,
            r#"[{"taskId": "t1", "referenceTaskName": "a", "status": "COMPLETED"}]"#,
        )
        .unwrap();

        assert_eq!(snapshot.execution.workflow_id, "wf-1");
        assert_eq!(snapshot.execution.status, WorkflowStatus::Failed);
        assert!(snapshot.execution.workflow_definition.is_some());
        assert_eq!(snapshot.tasks.len(), 1);
    }

    #[test]
    fn test_bad_task_list() {
        assert!(ExecutionAndTasks::from_json("{}", r#"{"not": "a list"}"#).is_err());
    }
}
