use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FlowlensError, Result, model::WorkflowTask};

/// Kind of a task, both as declared in a definition and as reported by the server.
///
/// `Terminal` and `DoWhileEnd` never come from the server; the graph builder
/// synthesizes them for the start/final markers and the closing edge of a loop.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    #[default]
    Simple,
    ForkJoin,
    ForkJoinDynamic,
    Decision,
    Switch,
    Join,
    ExclusiveJoin,
    SubWorkflow,
    DoWhile,
    Terminate,
    Dynamic,
    Http,
    Inline,
    Lambda,
    Event,
    Wait,
    Human,
    SetVariable,
    JsonJqTransform,
    KafkaPublish,
    StartWorkflow,
    Terminal,
    DoWhileEnd,
    #[serde(other)]
    Other,
}

impl TaskType {
    /// Types whose definition nests other tasks.
    pub fn is_composite(&self) -> bool {
        matches!(self, TaskType::ForkJoin | TaskType::ForkJoinDynamic | TaskType::Decision | TaskType::Switch | TaskType::DoWhile)
    }

    /// Synthesized boundary nodes that carry no task records.
    pub fn is_structural(&self) -> bool {
        matches!(self, TaskType::Terminal | TaskType::DoWhileEnd)
    }

    pub fn is_fork(&self) -> bool {
        matches!(self, TaskType::ForkJoin | TaskType::ForkJoinDynamic)
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, TaskType::Decision | TaskType::Switch)
    }

    pub fn is_join(&self) -> bool {
        matches!(self, TaskType::Join | TaskType::ExclusiveJoin)
    }
}

/// Runtime status of one task attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
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

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Scheduled | TaskStatus::InProgress)
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::CompletedWithErrors | TaskStatus::Skipped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::FailedWithTerminalError | TaskStatus::TimedOut | TaskStatus::Canceled)
    }
}

/// One task attempt as reported by the orchestration server.
///
/// Timestamps are epoch milliseconds; zero means the task has not reached
/// that stage yet. Use the `*_at` accessors rather than the raw fields.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: String,
    pub task_type: String,
    pub reference_task_name: String,
    pub task_def_name: String,
    pub status: TaskStatus,
    pub scheduled_time: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub update_time: i64,
    pub retry_count: u32,
    pub seq: u32,
    pub poll_count: u32,
    pub iteration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_workflow_id: Option<String>,
    pub input_data: Value,
    pub output_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_for_incompletion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_task: Option<WorkflowTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_input_payload_storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_output_payload_storage_path: Option<String>,
}

fn present(ms: i64) -> Option<i64> {
    (ms > 0).then_some(ms)
}

impl TaskResult {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<TaskResult>(s).map_err(|e| FlowlensError::Model(format!("invalid task record: {}", e)))
    }

    pub fn list_from_json(s: &str) -> Result<Vec<Self>> {
        serde_json::from_str::<Vec<TaskResult>>(s).map_err(|e| FlowlensError::Model(format!("invalid task list: {}", e)))
    }

    pub fn scheduled_at(&self) -> Option<i64> {
        present(self.scheduled_time)
    }

    pub fn started_at(&self) -> Option<i64> {
        present(self.start_time)
    }

    pub fn ended_at(&self) -> Option<i64> {
        present(self.end_time)
    }

    /// Resolved task kind.
    ///
    /// The embedded `workflowTask` wins; otherwise `taskType` is parsed, and
    /// anything unrecognized (worker task names) is a SIMPLE task.
    pub fn kind(&self) -> TaskType {
        if let Some(task) = &self.workflow_task {
            return task.task_type;
        }
        TaskType::from_str(&self.task_type).unwrap_or(TaskType::Simple)
    }

    /// Reference name with the loop iteration suffix (`__<n>`) removed.
    pub fn base_reference(&self) -> &str {
        if self.iteration > 0 {
            let suffix = format!("__{}", self.iteration);
            if let Some(base) = self.reference_task_name.strip_suffix(suffix.as_str()) {
                return base;
            }
        }
        &self.reference_task_name
    }

    /// Case selected by a DECISION or SWITCH task.
    pub fn evaluated_case(&self) -> Option<String> {
        let key = match self.kind() {
            TaskType::Decision => "caseOutput",
            TaskType::Switch => "evaluationResult",
            _ => return None,
        };
        match self.output_data.get(key)?.get(0)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{TaskResult, TaskStatus, TaskType};

    #[test]
    fn test_task_result_deserialize() {
        let record: TaskResult = serde_json::from_value(json!({
            "taskId": "t-1",
            "taskType": "HTTP",
            "referenceTaskName": "fetch",
            "status": "IN_PROGRESS",
            "scheduledTime": 100,
            "startTime": 120,
            "endTime": 0,
            "retryCount": 1,
            "workerId": "worker-7"
        }))
        .unwrap();

        assert_eq!(record.kind(), TaskType::Http);
        assert_eq!(record.status, TaskStatus::InProgress);
        assert_eq!(record.scheduled_at(), Some(100));
        assert_eq!(record.started_at(), Some(120));
        assert_eq!(record.ended_at(), None);
        assert_eq!(record.worker_id.as_deref(), Some("worker-7"));
    }

    #[test]
    fn test_worker_task_type_is_simple() {
        let record = TaskResult {
            task_type: "encode_video".to_string(),
            ..Default::default()
        };
        assert_eq!(record.kind(), TaskType::Simple);
    }

    #[test]
    fn test_base_reference_strips_iteration() {
        let record = TaskResult {
            reference_task_name: "poll__3".to_string(),
            iteration: 3,
            ..Default::default()
        };
        assert_eq!(record.base_reference(), "poll");

        let record = TaskResult {
            reference_task_name: "poll__3".to_string(),
            iteration: 0,
            ..Default::default()
        };
        assert_eq!(record.base_reference(), "poll__3");
    }

    #[test]
    fn test_evaluated_case() {
        let decision = TaskResult {
            task_type: "DECISION".to_string(),
            output_data: json!({ "caseOutput": ["fast"] }),
            ..Default::default()
        };
        assert_eq!(decision.evaluated_case().as_deref(), Some("fast"));

        let switch = TaskResult {
            task_type: "SWITCH".to_string(),
            output_data: json!({ "evaluationResult": [2] }),
            ..Default::default()
        };
        assert_eq!(switch.evaluated_case().as_deref(), Some("2"));

        let simple = TaskResult {
            output_data: json!({ "caseOutput": ["fast"] }),
            ..Default::default()
        };
        assert_eq!(simple.evaluated_case(), None);
    }

    #[test]
    fn test_unknown_task_type() {
        let t: TaskType = serde_json::from_value(json!("BRAND_NEW_TYPE")).unwrap();
        assert_eq!(t, TaskType::Other);
        assert!(TaskType::ForkJoin.is_composite());
        assert!(!TaskType::SubWorkflow.is_composite());
        assert!(TaskType::DoWhileEnd.is_structural());
    }
}
