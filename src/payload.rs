//! Task input/output addressing.
//!
//! Payloads are fetched lazily by the host; this module only names what to
//! fetch and decides what the panel shows while it is (or is not) there.

use serde::Serialize;
use serde_json::Value;

use crate::{graph::ExecutionNode, model::TaskResult, utils::format};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayloadKind {
    Input,
    Output,
}

/// One lazily fetched task payload.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PayloadRequest {
    pub workflow_id: String,
    pub task_reference_name: String,
    pub task_id: Option<String>,
    pub kind: PayloadKind,
}

impl PayloadRequest {
    pub fn new(
        workflow_id: &str,
        task_reference_name: &str,
        task_id: Option<&str>,
        kind: PayloadKind,
    ) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            task_reference_name: task_reference_name.to_string(),
            task_id: task_id.filter(|id| !id.is_empty()).map(str::to_string),
            kind,
        }
    }

    /// Request for one attempt's payload.
    pub fn for_record(
        workflow_id: &str,
        record: &TaskResult,
        kind: PayloadKind,
    ) -> Self {
        Self::new(workflow_id, &record.reference_task_name, Some(&record.task_id), kind)
    }

    /// Collaborator path, e.g. `/v2/execution/wf/task/ref/output?taskId=t`.
    pub fn path(&self) -> String {
        let mut path = format!("/v2/execution/{}/task/{}/{}", self.workflow_id, self.task_reference_name, self.kind);
        if let Some(task_id) = &self.task_id {
            path.push_str("?taskId=");
            path.push_str(task_id);
        }
        path
    }

    /// Cache key; attempts of one reference are cached separately.
    pub fn cache_key(&self) -> Vec<String> {
        vec![
            "workflow".to_string(),
            self.workflow_id.clone(),
            "task".to_string(),
            self.task_id.clone().unwrap_or_else(|| self.task_reference_name.clone()),
            self.kind.to_string(),
        ]
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnavailableReason {
    NotSelected,
    NotExecuted,
    Loading,
}

/// What the payload panel shows.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PayloadState {
    Inline { value: Value },
    Externalized { path: String },
    Unavailable { reason: UnavailableReason },
}

impl PayloadState {
    /// Resolves the panel state for the selected node and attempt.
    ///
    /// `task_id` picks an attempt, defaulting to the latest. `response` is
    /// the fetched payload, `None` while the fetch is in flight.
    pub fn resolve(
        selected: Option<&ExecutionNode>,
        task_id: Option<&str>,
        kind: PayloadKind,
        response: Option<&Value>,
    ) -> Self {
        let Some(node) = selected else {
            return PayloadState::Unavailable {
                reason: UnavailableReason::NotSelected,
            };
        };
        let record = match task_id {
            Some(id) => format::find_attempt(&node.id, &node.records, id),
            None => node.latest(),
        };
        let Some(record) = record else {
            return PayloadState::Unavailable {
                reason: UnavailableReason::NotExecuted,
            };
        };

        let external = match kind {
            PayloadKind::Input => &record.external_input_payload_storage_path,
            PayloadKind::Output => &record.external_output_payload_storage_path,
        };
        if let Some(path) = external {
            return PayloadState::Externalized {
                path: path.clone(),
            };
        }

        match response {
            Some(value) => PayloadState::Inline {
                value: value.clone(),
            },
            None => PayloadState::Unavailable {
                reason: UnavailableReason::Loading,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serde_json::json;

    use super::{PayloadKind, PayloadRequest, PayloadState, UnavailableReason};
    use crate::{
        graph::ExecutionNode,
        model::{TaskResult, TaskType},
    };

    #[test]
    fn test_request_path() {
        let request = PayloadRequest::new("wf-1", "charge", Some("t-9"), PayloadKind::Output);
        assert_eq!(request.path(), "/v2/execution/wf-1/task/charge/output?taskId=t-9");
        assert_eq!(request.cache_key(), vec!["workflow", "wf-1", "task", "t-9", "output"]);

        let request = PayloadRequest::new("wf-1", "charge", Some(""), PayloadKind::Input);
        assert_eq!(request.path(), "/v2/execution/wf-1/task/charge/input");
        assert_eq!(request.cache_key(), vec!["workflow", "wf-1", "task", "charge", "input"]);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            PayloadState::resolve(None, None, PayloadKind::Input, None),
            PayloadState::Unavailable {
                reason: UnavailableReason::NotSelected,
            }
        );

        let mut node = ExecutionNode::new("charge", TaskType::Simple);
        assert_eq!(
            PayloadState::resolve(Some(&node), None, PayloadKind::Input, None),
            PayloadState::Unavailable {
                reason: UnavailableReason::NotExecuted,
            }
        );

        node.records.push(Arc::new(TaskResult {
            task_id: "t-1".to_string(),
            reference_task_name: "charge".to_string(),
            external_output_payload_storage_path: Some("s3://out".to_string()),
            ..Default::default()
        }));
        assert_eq!(
            PayloadState::resolve(Some(&node), None, PayloadKind::Input, None),
            PayloadState::Unavailable {
                reason: UnavailableReason::Loading,
            }
        );
        let value = json!({ "amount": 3 });
        assert_eq!(
            PayloadState::resolve(Some(&node), Some("t-1"), PayloadKind::Input, Some(&value)),
            PayloadState::Inline {
                value: value.clone(),
            }
        );
        assert_eq!(
            PayloadState::resolve(Some(&node), None, PayloadKind::Output, Some(&value)),
            PayloadState::Externalized {
                path: "s3://out".to_string(),
            }
        );
        assert_eq!(
            PayloadState::resolve(Some(&node), Some("t-unknown"), PayloadKind::Input, Some(&value)),
            PayloadState::Unavailable {
                reason: UnavailableReason::NotExecuted,
            }
        );
    }
}
