//! Structure inference for executions that do not embed their definition.
//!
//! The task list itself becomes the definition: steps chain in order of
//! first appearance, and a fork's branches are recovered from scheduling.
//! Tasks scheduled together when the fork completes open branches; a task
//! scheduled later continues the branch whose tail finished most recently
//! before it was scheduled.

use std::collections::HashSet;

use crate::model::{TaskResult, TaskType, WorkflowTask};

/// One distinct step of the task list with its time envelope.
struct Step<'a> {
    first: &'a TaskResult,
    scheduled: Option<i64>,
    ended: Option<i64>,
}

/// A parsed unit and the time envelope used to place it in a branch.
struct Item {
    tasks: Vec<WorkflowTask>,
    scheduled: Option<i64>,
    ended: Option<i64>,
}

struct Inference<'a> {
    steps: Vec<Step<'a>>,
    pos: usize,
}

/// Builds a definition from a flat task list.
pub(crate) fn infer_definition(records: &[TaskResult]) -> Vec<WorkflowTask> {
    let mut inference = Inference {
        steps: collect_steps(records),
        pos: 0,
    };
    let mut tasks = Vec::new();
    while inference.pos < inference.steps.len() {
        tasks.extend(inference.parse_item().tasks);
    }
    tasks
}

fn collect_steps(records: &[TaskResult]) -> Vec<Step<'_>> {
    let mut steps: Vec<Step<'_>> = Vec::new();
    let mut nested = HashSet::new();

    for record in records {
        let reference = record.base_reference();
        if nested.contains(reference) {
            continue;
        }
        if let Some(step) = steps.iter_mut().find(|s| s.first.base_reference() == reference) {
            step.ended = step.ended.max(record.ended_at());
            continue;
        }
        // Composite specs embedded in a record already describe their
        // children, so those children must not reappear as siblings.
        if let Some(task) = &record.workflow_task {
            if task.task_type.is_composite() {
                collect_nested(task, &mut nested);
            }
        }
        steps.push(Step {
            first: record,
            scheduled: record.scheduled_at().or(record.started_at()),
            ended: record.ended_at(),
        });
    }
    steps
}

fn collect_nested(
    task: &WorkflowTask,
    into: &mut HashSet<String>,
) {
    let children = task.fork_tasks.iter().flatten().chain(task.decision_cases.values().flatten()).chain(task.default_case.iter()).chain(task.loop_over.iter());
    for child in children {
        into.insert(child.record_reference().to_string());
        collect_nested(child, into);
    }
}

impl Inference<'_> {
    fn parse_item(&mut self) -> Item {
        let step = &self.steps[self.pos];
        self.pos += 1;

        let (first, scheduled, ended) = (step.first, step.scheduled, step.ended);
        let task = match &first.workflow_task {
            Some(task) => {
                let mut task = task.clone();
                task.task_reference_name = first.base_reference().to_string();
                task.alias_for_ref = None;
                task
            }
            None => {
                let mut task = WorkflowTask::new(first.base_reference(), first.kind());
                task.name = first.task_def_name.clone();
                task
            }
        };

        if task.task_type.is_fork() && task.fork_tasks.is_empty() && first.workflow_task.is_none() {
            return self.parse_fork(task, scheduled, ended);
        }

        Item {
            tasks: vec![task],
            scheduled,
            ended,
        }
    }

    /// Consumes the steps between a fork and its join, the join included.
    fn parse_fork(
        &mut self,
        mut fork: WorkflowTask,
        scheduled: Option<i64>,
        fork_ended: Option<i64>,
    ) -> Item {
        let mut branches: Vec<(Vec<WorkflowTask>, Option<i64>)> = Vec::new();
        let mut branch_start: Option<i64> = None;

        while self.pos < self.steps.len() && !self.steps[self.pos].first.kind().is_join() {
            let item = self.parse_item();
            if branch_start.is_none() {
                branch_start = item.scheduled;
            }

            let opens_branch = branches.is_empty() || item.scheduled.is_none() || item.scheduled <= branch_start;
            let target = if opens_branch {
                None
            } else {
                branches
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, tail_end))| tail_end.is_some() && *tail_end <= item.scheduled)
                    .max_by_key(|(_, (_, tail_end))| *tail_end)
                    .map(|(i, _)| i)
            };

            match target {
                Some(i) => {
                    branches[i].0.extend(item.tasks);
                    branches[i].1 = item.ended;
                }
                None => branches.push((item.tasks, item.ended)),
            }
        }

        fork.fork_tasks = branches.into_iter().map(|(tasks, _)| tasks).collect();
        let mut tasks = vec![fork];
        let mut ended = fork_ended;

        if self.pos < self.steps.len() {
            let join = self.parse_item();
            ended = join.ended;
            tasks.extend(join.tasks);
        }

        Item {
            tasks,
            scheduled,
            ended,
        }
    }
}
