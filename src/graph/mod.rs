//! Execution graph: a workflow definition reconciled with its runtime trace.
//!
//! The graph is a petgraph DAG whose nodes are [`ExecutionNode`]s. Besides the
//! control-flow edges, every node records the composite it is nested in so
//! the row model can walk the containment tree in definition order.
//!
//! Graphs are immutable values. A new task snapshot produces a new graph.

mod builder;
mod edge;
mod infer;
mod node;

use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

pub use edge::{EdgeKind, GraphEdge};
pub use node::{ExecutionNode, FINAL_NODE, NodeId, NodeSpec, NodeStatus, START_NODE};

use crate::model::{Execution, ExecutionAndTasks, TaskResult, WorkflowDef, WorkflowStatus};
use builder::GraphBuilder;

/// Canonical graph of one execution (or one definition preview).
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    graph: DiGraph<ExecutionNode, GraphEdge>,
    index: HashMap<NodeId, NodeIndex>,
    top_level: Vec<NodeId>,
}

impl ExecutionGraph {
    /// Graph of a definition alone; every node is not executed.
    pub fn from_definition(def: &WorkflowDef) -> Self {
        GraphBuilder::new(&[]).build(&def.tasks, NodeStatus::NotExecuted, NodeStatus::NotExecuted)
    }

    /// Graph of an execution, inferring structure from the task list when
    /// the execution does not embed its definition.
    pub fn from_execution_and_tasks(
        execution: &Execution,
        tasks: &[TaskResult],
    ) -> Self {
        Self::build(execution, tasks, true)
    }

    pub fn from_snapshot(
        snapshot: &ExecutionAndTasks,
        infer_structure: bool,
    ) -> Self {
        Self::build(&snapshot.execution, &snapshot.tasks, infer_structure)
    }

    fn build(
        execution: &Execution,
        tasks: &[TaskResult],
        infer_structure: bool,
    ) -> Self {
        let definition = match &execution.workflow_definition {
            Some(def) => def.tasks.clone(),
            None if infer_structure => infer::infer_definition(tasks),
            None => Vec::new(),
        };

        let start = if execution.start_time > 0 || !tasks.is_empty() {
            NodeStatus::Completed
        } else {
            NodeStatus::NotExecuted
        };
        let finish = match execution.status {
            WorkflowStatus::Running | WorkflowStatus::Paused => NodeStatus::NotExecuted,
            status => status.into(),
        };

        GraphBuilder::new(tasks).build(&definition, start, finish)
    }

    /// Output a human-readable representation of the graph
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Execution Graph ===".to_string());
        lines.push(format!("Nodes: {}, Edges: {}", self.graph.node_count(), self.graph.edge_count()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for node in self.nodes() {
            lines.push(format!(
                "[{}] (type: {}, status: {}, attempts: {})",
                node.id,
                node.task_type.as_ref(),
                node.status.as_ref(),
                node.records.len()
            ));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for edge in self.edges() {
            let label = edge.label().map(|l| format!("[{}]", l)).unwrap_or_default();
            lines.push(format!("{} --{}{}--> {} (executed: {})", edge.source, edge.kind.as_ref(), label, edge.target, edge.executed));
        }

        lines.join("\n")
    }

    /// The synthesized entry node.
    pub fn root(&self) -> &ExecutionNode {
        &self.graph[self.index[START_NODE]]
    }

    pub fn node(
        &self,
        id: &str,
    ) -> Option<&ExecutionNode> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes in definition order.
    pub fn nodes(&self) -> impl Iterator<Item = &ExecutionNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.graph.edge_indices().map(|idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Ids of the task nodes not nested in any composite, in definition order.
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// Nodes nested in a composite, in definition order.
    pub fn members(
        &self,
        id: &str,
    ) -> &[NodeId] {
        self.node(id).map(|n| n.members.as_slice()).unwrap_or_default()
    }

    /// Control-flow successors.
    pub fn children(
        &self,
        id: &str,
    ) -> Vec<&ExecutionNode> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Control-flow predecessors.
    pub fn parents(
        &self,
        id: &str,
    ) -> Vec<&ExecutionNode> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Edges out of a node, in insertion order.
    pub fn outgoing_edges(
        &self,
        id: &str,
    ) -> Vec<&GraphEdge> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(*idx, Direction::Outgoing).collect();
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| e.weight()).collect()
    }

    fn neighbors(
        &self,
        id: &str,
        direction: Direction,
    ) -> Vec<&ExecutionNode> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(*idx, direction).collect();
        edges.sort_by_key(|e| e.id());
        edges
            .into_iter()
            .map(|e| match direction {
                Direction::Outgoing => &self.graph[e.target()],
                Direction::Incoming => &self.graph[e.source()],
            })
            .collect()
    }
}
