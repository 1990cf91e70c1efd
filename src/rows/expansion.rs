use std::collections::HashMap;

use crate::graph::NodeId;

/// Per-view expand/collapse state, kept apart from the graph so several
/// views can hold their own state over the same execution.
///
/// Rows nested deeper than `default_depth` start collapsed; explicit
/// toggles override the default for exactly one id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    overrides: HashMap<NodeId, bool>,
    default_depth: usize,
}

impl ExpansionState {
    pub fn new(default_depth: usize) -> Self {
        Self {
            overrides: HashMap::new(),
            default_depth,
        }
    }

    pub fn default_depth(&self) -> usize {
        self.default_depth
    }

    pub fn is_expanded(
        &self,
        id: &str,
        depth: usize,
    ) -> bool {
        self.overrides.get(id).copied().unwrap_or(depth < self.default_depth)
    }

    /// Flips one row and returns its new state.
    pub fn toggle(
        &mut self,
        id: &str,
        depth: usize,
    ) -> bool {
        let expanded = !self.is_expanded(id, depth);
        self.overrides.insert(id.to_string(), expanded);
        expanded
    }

    pub fn set(
        &mut self,
        id: &str,
        expanded: bool,
    ) {
        self.overrides.insert(id.to_string(), expanded);
    }

    pub fn expand_all<I, S>(
        &mut self,
        ids: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        for id in ids {
            self.overrides.insert(id.into(), true);
        }
    }

    pub fn collapse_all<I, S>(
        &mut self,
        ids: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        for id in ids {
            self.overrides.insert(id.into(), false);
        }
    }

    /// Drops every explicit toggle.
    pub fn reset(&mut self) {
        self.overrides.clear();
    }
}
