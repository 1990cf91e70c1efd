//! Reconciles a workflow definition with a task-record snapshot.
//!
//! The definition is walked depth-first. Every entry becomes one node and
//! takes the records filed under its reference name; records left over at
//! the end are synthesized into nodes of their own so no attempt is lost.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    graph::{
        ExecutionGraph,
        edge::{EdgeKind, GraphEdge},
        node::{ExecutionNode, FINAL_NODE, NodeId, NodeStatus, START_NODE},
    },
    model::{TaskResult, TaskType, WorkflowTask},
};

/// A dangling path end and the kind of edge the next step attaches with.
type Tail = (NodeIndex, EdgeKind);

/// Task records grouped by base reference name, in arrival order.
#[derive(Default)]
struct RecordIndex {
    by_ref: HashMap<String, Vec<Arc<TaskResult>>>,
    order: Vec<String>,
}

impl RecordIndex {
    fn new(tasks: &[TaskResult]) -> Self {
        let mut index = Self::default();
        for task in tasks {
            let key = task.base_reference().to_string();
            if !index.by_ref.contains_key(&key) {
                index.order.push(key.clone());
            }
            index.by_ref.entry(key).or_default().push(Arc::new(task.clone()));
        }
        index
    }

    fn take(
        &mut self,
        reference: &str,
    ) -> Vec<Arc<TaskResult>> {
        self.by_ref.remove(reference).unwrap_or_default()
    }

    /// Records no definition entry claimed, grouped per reference in arrival order.
    fn drain_remaining(&mut self) -> Vec<(String, Vec<Arc<TaskResult>>)> {
        let order = std::mem::take(&mut self.order);
        order.into_iter().filter_map(|key| self.by_ref.remove(&key).map(|records| (key, records))).collect()
    }
}

pub(crate) struct GraphBuilder {
    graph: DiGraph<ExecutionNode, GraphEdge>,
    index: HashMap<NodeId, NodeIndex>,
    top_level: Vec<NodeId>,
    records: RecordIndex,
    terminated: Vec<NodeIndex>,
    /// ids of structural nodes still to be added
    reserved: HashSet<NodeId>,
}

impl GraphBuilder {
    pub(crate) fn new(tasks: &[TaskResult]) -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            top_level: Vec::new(),
            records: RecordIndex::new(tasks),
            terminated: Vec::new(),
            reserved: HashSet::new(),
        }
    }

    /// Builds the graph. `start` and `finish` are the statuses of the
    /// synthesized entry and sink nodes.
    pub(crate) fn build(
        mut self,
        tasks: &[WorkflowTask],
        start: NodeStatus,
        finish: NodeStatus,
    ) -> ExecutionGraph {
        self.reserved = structural_ids(tasks);
        let start_idx = self.add_structural(START_NODE, TaskType::Terminal, start);
        let mut tails = self.process_tasks(tasks, vec![(start_idx, EdgeKind::Next)], None);

        for (reference, records) in self.records.drain_remaining() {
            warn!(reference = %reference, attempts = records.len(), "task records have no definition entry, synthesizing node");
            let node = ExecutionNode::synthesized(&reference, records);
            let idx = self.add_node(node, None);
            self.connect(&tails, idx);
            tails = vec![(idx, EdgeKind::Next)];
        }

        let final_idx = self.add_structural(FINAL_NODE, TaskType::Terminal, finish);
        self.connect(&tails, final_idx);
        for idx in std::mem::take(&mut self.terminated) {
            self.add_edge(idx, final_idx, EdgeKind::Next);
        }

        self.resolve_joins();
        self.mark_executed_edges();

        debug!(nodes = self.graph.node_count(), edges = self.graph.edge_count(), "execution graph built");

        ExecutionGraph {
            graph: self.graph,
            index: self.index,
            top_level: self.top_level,
        }
    }

    fn process_tasks(
        &mut self,
        tasks: &[WorkflowTask],
        mut antecedents: Vec<Tail>,
        scope: Option<NodeIndex>,
    ) -> Vec<Tail> {
        for task in tasks {
            antecedents = self.process_task(task, antecedents, scope);
        }
        antecedents
    }

    fn process_task(
        &mut self,
        task: &WorkflowTask,
        antecedents: Vec<Tail>,
        scope: Option<NodeIndex>,
    ) -> Vec<Tail> {
        let records = self.records.take(task.record_reference());
        let idx = self.add_node(ExecutionNode::from_task(task, records), scope);

        if task.task_type.is_join() {
            let incoming: Vec<Tail> = antecedents
                .into_iter()
                .map(|(src, kind)| match kind {
                    EdgeKind::Next => (src, EdgeKind::Join),
                    other => (src, other),
                })
                .collect();
            self.connect(&incoming, idx);
        } else {
            self.connect(&antecedents, idx);
        }

        match task.task_type {
            TaskType::ForkJoin => self.process_fork(idx, &task.fork_tasks),
            TaskType::ForkJoinDynamic => {
                let branches = if task.fork_tasks.is_empty() {
                    dynamic_branches(&self.graph[idx])
                } else {
                    task.fork_tasks.clone()
                };
                self.process_fork(idx, &branches)
            }
            TaskType::Decision | TaskType::Switch => self.process_decision(idx, task),
            TaskType::DoWhile => self.process_loop(idx, task, scope),
            TaskType::Terminate => {
                self.terminated.push(idx);
                Vec::new()
            }
            _ => vec![(idx, EdgeKind::Next)],
        }
    }

    fn process_fork(
        &mut self,
        idx: NodeIndex,
        branches: &[Vec<WorkflowTask>],
    ) -> Vec<Tail> {
        if branches.is_empty() {
            return vec![(idx, EdgeKind::Next)];
        }

        let taken = self.graph[idx].is_executed();
        let mut tails = Vec::new();
        for branch in branches {
            let kind = EdgeKind::Branch {
                case: None,
                taken,
            };
            if branch.is_empty() {
                tails.push((idx, kind));
            } else {
                tails.extend(self.process_tasks(branch, vec![(idx, kind)], Some(idx)));
            }
        }
        tails
    }

    fn process_decision(
        &mut self,
        idx: NodeIndex,
        task: &WorkflowTask,
    ) -> Vec<Tail> {
        let taken_case = self.graph[idx].latest().map(|latest| task.branch_for(latest.evaluated_case().as_deref()));
        self.graph[idx].taken_case = taken_case.clone();

        let mut tails = Vec::new();
        for (case, branch) in task.decision_branches() {
            let kind = EdgeKind::Branch {
                taken: taken_case.as_ref() == Some(&case),
                case: Some(case),
            };
            if branch.is_empty() {
                tails.push((idx, kind));
            } else {
                tails.extend(self.process_tasks(branch, vec![(idx, kind)], Some(idx)));
            }
        }
        tails
    }

    fn process_loop(
        &mut self,
        idx: NodeIndex,
        task: &WorkflowTask,
        scope: Option<NodeIndex>,
    ) -> Vec<Tail> {
        if task.loop_over.is_empty() {
            return vec![(idx, EdgeKind::Next)];
        }

        let body_tails = self.process_tasks(&task.loop_over, vec![(idx, EdgeKind::Loop)], Some(idx));
        let end_id = format!("{}-END", self.graph[idx].id);
        let status = self.graph[idx].status;
        let end_idx = self.add_structural(&end_id, TaskType::DoWhileEnd, status);
        let parent = scope.map(|s| self.graph[s].id.clone());
        self.graph[end_idx].parent = parent;

        let incoming: Vec<Tail> = body_tails
            .into_iter()
            .map(|(src, kind)| match kind {
                EdgeKind::Next => (src, EdgeKind::LoopEnd),
                other => (src, other),
            })
            .collect();
        self.connect(&incoming, end_idx);

        vec![(end_idx, EdgeKind::Next)]
    }

    /// Adds a task node under `scope`, keeping ids unique.
    fn add_node(
        &mut self,
        mut node: ExecutionNode,
        scope: Option<NodeIndex>,
    ) -> NodeIndex {
        if self.is_taken(&node.id) {
            let unique = self.unique_id(&node.id);
            warn!(reference = %node.id, id = %unique, "task reference name clashes with another node");
            node.id = unique;
        }

        match scope {
            Some(parent) => {
                node.parent = Some(self.graph[parent].id.clone());
                node.depth = self.graph[parent].depth + 1;
                self.graph[parent].members.push(node.id.clone());
            }
            None => self.top_level.push(node.id.clone()),
        }

        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Structural nodes are part of the flow but never of the containment tree.
    fn add_structural(
        &mut self,
        id: &str,
        task_type: TaskType,
        status: NodeStatus,
    ) -> NodeIndex {
        self.reserved.remove(id);
        let id = if self.is_taken(id) { self.unique_id(id) } else { id.to_string() };
        let mut node = ExecutionNode::new(&id, task_type);
        node.status = status;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    fn is_taken(
        &self,
        id: &str,
    ) -> bool {
        self.index.contains_key(id) || self.reserved.contains(id)
    }

    /// First free `<id>#<n>`, counting from 2.
    fn unique_id(
        &self,
        id: &str,
    ) -> NodeId {
        let mut n = 2;
        while self.is_taken(&format!("{}#{}", id, n)) {
            n += 1;
        }
        format!("{}#{}", id, n)
    }

    fn connect(
        &mut self,
        tails: &[Tail],
        target: NodeIndex,
    ) {
        for (src, kind) in tails {
            self.add_edge(*src, target, kind.clone());
        }
    }

    fn add_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        kind: EdgeKind,
    ) {
        let edge = GraphEdge::new(&self.graph[from].id, &self.graph[to].id, kind);
        self.graph.add_edge(from, to, edge);
    }

    /// A join reflects its branches: any failure shows through, and it only
    /// reads as complete once every joined branch succeeded.
    fn resolve_joins(&mut self) {
        let joins: Vec<NodeIndex> = self.graph.node_indices().filter(|idx| self.graph[*idx].task_type == TaskType::Join).collect();

        for idx in joins {
            let join_on = self.graph[idx].spec.as_ref().map(|s| s.join_on.clone()).unwrap_or_default();
            let branches: Vec<NodeStatus> = if join_on.is_empty() {
                self.graph.edges_directed(idx, Direction::Incoming).map(|e| self.graph[e.source()].status).collect()
            } else {
                join_on.iter().filter_map(|id| self.index.get(id)).map(|b| self.graph[*b].status).collect()
            };
            self.graph[idx].status = join_status(self.graph[idx].status, &branches);
        }
    }

    fn mark_executed_edges(&mut self) {
        let indices: Vec<_> = self.graph.edge_indices().collect();
        for e in indices {
            if let Some((src, dst)) = self.graph.edge_endpoints(e) {
                self.graph[e].executed = self.graph[src].status.is_executed() && self.graph[dst].status.is_executed();
            }
        }
    }
}

pub(crate) fn join_status(
    own: NodeStatus,
    branches: &[NodeStatus],
) -> NodeStatus {
    if let Some(failure) = branches.iter().filter(|s| s.is_failure()).min_by_key(|s| s.severity()) {
        return *failure;
    }
    if !branches.is_empty() && branches.iter().all(|s| s.is_successful()) {
        return if own.is_executed() { own } else { NodeStatus::Completed };
    }
    if own.is_successful() { NodeStatus::InProgress } else { own }
}

/// Ids the builder synthesizes for `tasks`: the entry and sink markers and
/// one end marker per loop.
fn structural_ids(tasks: &[WorkflowTask]) -> HashSet<NodeId> {
    let mut ids = HashSet::from([START_NODE.to_string(), FINAL_NODE.to_string()]);
    let mut stack: Vec<&WorkflowTask> = tasks.iter().collect();
    while let Some(task) = stack.pop() {
        if task.task_type == TaskType::DoWhile {
            ids.insert(format!("{}-END", task.task_reference_name));
        }
        stack.extend(task.fork_tasks.iter().flatten());
        stack.extend(task.decision_cases.values().flatten());
        stack.extend(task.default_case.iter());
        stack.extend(task.loop_over.iter());
    }
    ids
}

/// Branches spawned by a dynamic fork, read from its latest record input.
///
/// `forkedTaskDefs` carries full task definitions; older servers only send the
/// reference names in `forkedTasks`.
fn dynamic_branches(node: &ExecutionNode) -> Vec<Vec<WorkflowTask>> {
    let Some(latest) = node.latest() else {
        return Vec::new();
    };

    if let Some(defs) = latest.input_data.get("forkedTaskDefs") {
        match serde_json::from_value::<Vec<WorkflowTask>>(defs.clone()) {
            Ok(tasks) => return tasks.into_iter().map(|t| vec![t]).collect(),
            Err(e) => warn!(fork = %node.id, error = %e, "unreadable forkedTaskDefs"),
        }
    }

    match latest.input_data.get("forkedTasks") {
        Some(Value::Array(refs)) => refs.iter().filter_map(Value::as_str).map(|r| vec![WorkflowTask::new(r, TaskType::Simple)]).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use super::join_status;
    use crate::graph::node::NodeStatus;

    #[test]
    fn test_join_status() {
        use NodeStatus::*;

        assert_eq!(join_status(NotExecuted, &[Completed, Completed]), Completed);
        assert_eq!(join_status(InProgress, &[Completed, Completed]), InProgress);
        assert_eq!(join_status(NotExecuted, &[Completed, InProgress]), NotExecuted);
        assert_eq!(join_status(Completed, &[Completed, InProgress]), InProgress);
        assert_eq!(join_status(InProgress, &[Canceled, Failed]), Failed);
        assert_eq!(join_status(NotExecuted, &[]), NotExecuted);
    }
}
