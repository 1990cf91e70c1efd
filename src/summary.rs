//! Detail panel content for one selected step or attempt.

use serde::Serialize;

use crate::{
    graph::ExecutionNode,
    model::{TaskResult, TaskStatus, TaskType},
    utils::format::{format_date_ms, format_duration},
};

/// How a summary value is rendered.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(i64),
    /// epoch milliseconds
    DateMs(i64),
    /// milliseconds
    Duration(i64),
    WorkerId(String),
    ExternalInput(String),
    ExternalOutput(String),
    /// navigable target: console path and its display text
    Link { path: String, text: String },
}

impl FieldValue {
    pub fn format(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::WorkerId(s) | FieldValue::ExternalInput(s) | FieldValue::ExternalOutput(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::DateMs(ms) => format_date_ms(*ms).unwrap_or_default(),
            FieldValue::Duration(ms) => format_duration(*ms),
            FieldValue::Link {
                text,
                ..
            } => text.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryField {
    pub label: &'static str,
    pub value: FieldValue,
}

impl SummaryField {
    fn new(
        label: &'static str,
        value: FieldValue,
    ) -> Self {
        Self {
            label,
            value,
        }
    }

    fn text(
        label: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::new(label, FieldValue::Text(value.into()))
    }
}

/// Ordered label/value pairs describing `record`, or the node's latest
/// attempt when no attempt is given.
///
/// Steps that never ran are described from their definition entry.
pub fn task_summary(
    node: &ExecutionNode,
    record: Option<&TaskResult>,
    now: i64,
) -> Vec<SummaryField> {
    let record = record.or(node.latest().map(|r| r.as_ref()));
    let spec = node.spec.as_ref();
    let task_type = record.map(|r| r.kind()).unwrap_or(node.task_type);

    let mut data = vec![
        SummaryField::text("Task Type", task_type.as_ref()),
        SummaryField::text("Status", record.map(|r| r.status.as_ref()).unwrap_or("Not executed")),
    ];

    let name = spec.map(|s| s.name.as_str()).filter(|n| !n.is_empty()).or(record.map(|r| r.task_def_name.as_str())).unwrap_or_default();
    data.push(SummaryField::text("Task Name", name));

    let reference = record
        .map(|r| r.reference_task_name.as_str())
        .filter(|r| !r.is_empty())
        .or(spec.and_then(|s| s.alias_for_ref.as_deref()))
        .unwrap_or(node.id.as_str());
    data.push(SummaryField::text("Task Reference", reference));

    let Some(record) = record else {
        if task_type == TaskType::SubWorkflow {
            push_sub_workflow(&mut data, node, None);
        }
        return data;
    };

    if let Some(domain) = record.domain.as_deref().filter(|d| !d.is_empty()) {
        data.push(SummaryField::text("Domain", domain));
    }
    if !record.task_id.is_empty() {
        data.push(SummaryField::text("Task Execution ID", record.task_id.as_str()));
    }
    data.push(SummaryField::new("Retry Count", FieldValue::Number(record.retry_count.into())));

    if let Some(scheduled) = record.scheduled_at() {
        data.push(SummaryField::new("Scheduled Time", FieldValue::DateMs(scheduled)));
    }
    if let Some(start) = record.started_at() {
        data.push(SummaryField::new("Start Time", FieldValue::DateMs(start)));
    }
    if let Some(end) = record.ended_at() {
        data.push(SummaryField::new("End Time", FieldValue::DateMs(end)));
    }
    if let (Some(start), Some(end)) = (record.started_at(), record.ended_at()) {
        data.push(SummaryField::new("Duration", FieldValue::Duration(end - start)));
    }
    if let (Some(start), TaskStatus::InProgress) = (record.started_at(), record.status) {
        data.push(SummaryField::new("Current Elapsed Time", FieldValue::Duration(now - start)));
    }

    if let Some(reason) = record.reason_for_incompletion.as_deref().filter(|r| !r.is_empty()) {
        data.push(SummaryField::text("Reason for Incompletion", reason));
    }
    if let Some(worker) = record.worker_id.as_deref().filter(|w| !w.is_empty()) {
        data.push(SummaryField::new("Worker", FieldValue::WorkerId(worker.to_string())));
    }
    if task_type.is_decision() {
        data.push(SummaryField::text("Evaluated Case", record.evaluated_case().unwrap_or_default()));
    }
    if task_type == TaskType::SubWorkflow {
        push_sub_workflow(&mut data, node, Some(record));
    }

    if let Some(path) = &record.external_input_payload_storage_path {
        data.push(SummaryField::new("Externalized Input", FieldValue::ExternalInput(path.clone())));
    }
    if let Some(path) = &record.external_output_payload_storage_path {
        data.push(SummaryField::new("Externalized Output", FieldValue::ExternalOutput(path.clone())));
    }

    data
}

fn push_sub_workflow(
    data: &mut Vec<SummaryField>,
    node: &ExecutionNode,
    record: Option<&TaskResult>,
) {
    let name = record
        .and_then(|r| r.input_data.get("subWorkflowName"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or(node.spec.as_ref().and_then(|s| s.sub_workflow_name.clone()));
    if let Some(name) = name {
        data.push(SummaryField::new(
            "Subworkflow Definition",
            FieldValue::Link {
                path: format!("/workflowDef/{}", name),
                text: name,
            },
        ));
    }

    let id = record.and_then(|r| r.sub_workflow_id.clone()).or(node.sub_workflow_id.clone());
    if let Some(id) = id {
        data.push(SummaryField::new(
            "Subworkflow ID",
            FieldValue::Link {
                path: format!("/execution/{}", id),
                text: id,
            },
        ));
    }
}
