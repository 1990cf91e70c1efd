//! Execution graph edges.
//!
//! Edges follow control flow: sequential steps, fan-out from forks and
//! decisions, fan-in to joins and the closing edge of a loop body.

use serde::{Deserialize, Serialize};

use crate::{graph::node::NodeId, model::BranchCase};

/// Kind of control-flow transition an edge represents.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeKind {
    /// Sequential flow to the next step.
    #[default]
    Next,
    /// Fan-out from a fork or decision into one branch.
    Branch {
        /// Decision branch; `None` for fork branches.
        case: Option<BranchCase>,
        /// Whether this branch was taken at runtime.
        taken: bool,
    },
    /// Branch tail into a join.
    Join,
    /// Loop node into the first step of its body.
    Loop,
    /// Loop body tail into the loop end marker.
    LoopEnd,
}

/// Edge between two execution nodes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// ID of the source node.
    pub source: NodeId,
    /// ID of the target node.
    pub target: NodeId,
    /// Transition kind.
    pub kind: EdgeKind,
    /// Both endpoints ran.
    #[serde(default)]
    pub executed: bool,
}

impl GraphEdge {
    pub fn new(
        source: &str,
        target: &str,
        kind: EdgeKind,
    ) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            executed: false,
        }
    }

    /// Label shown on the edge, the case name for decision branches.
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            EdgeKind::Branch {
                case: Some(case),
                ..
            } => Some(case.label()),
            _ => None,
        }
    }

    /// False only for decision branches that were not selected.
    pub fn is_taken(&self) -> bool {
        match &self.kind {
            EdgeKind::Branch {
                taken,
                ..
            } => *taken,
            _ => true,
        }
    }
}
