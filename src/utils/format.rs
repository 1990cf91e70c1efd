//! Accessors and formatters shared by rows, labels and the task summary.

use std::sync::Arc;

use chrono::DateTime;

use crate::model::TaskResult;

/// Id of one attempt of node `node_id`: its task id, or `<node>:attempt<index>`
/// for records the server has not assigned an id yet.
///
/// Rows, bars and attempt lookups all go through this.
pub fn attempt_id(
    node_id: &str,
    index: usize,
    record: &TaskResult,
) -> String {
    if record.task_id.is_empty() { format!("{}:attempt{}", node_id, index) } else { record.task_id.clone() }
}

/// Position and record of the attempt `id` among `records`.
pub fn find_attempt<'a>(
    node_id: &str,
    records: &'a [Arc<TaskResult>],
    id: &str,
) -> Option<&'a Arc<TaskResult>> {
    records.iter().enumerate().find(|(i, r)| attempt_id(node_id, *i, r) == id).map(|(_, r)| r)
}

/// Label of one attempt: the reference name qualified by loop iteration or retry.
pub fn task_label(record: &TaskResult) -> String {
    let reference = record.base_reference();
    if record.iteration > 0 {
        format!("{} #{}", reference, record.iteration)
    } else if record.retry_count > 0 {
        format!("{} (retry {})", reference, record.retry_count)
    } else {
        reference.to_string()
    }
}

/// Compact duration, e.g. `850ms`, `12.4s`, `3m 5s`, `2h 0m 7s`, `1d 4h 0m 0s`.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return format!("-{}", format_duration(-ms));
    }
    if ms < 1000 {
        return format!("{}ms", ms);
    }
    if ms < 60_000 {
        let seconds = ms as f64 / 1000.0;
        return format!("{}s", (seconds * 10.0).round() / 10.0);
    }

    let total = ms / 1000;
    let (days, hours, minutes, seconds) = (total / 86_400, total % 86_400 / 3600, total % 3600 / 60, total % 60);
    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

/// UTC timestamp with millisecond precision; non-positive input is absent.
pub fn format_date_ms(ms: i64) -> Option<String> {
    if ms <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(ms).map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
}
