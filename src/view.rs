//! The timeline session.
//!
//! A `TimelineView` owns the inputs of the pipeline (snapshot, expansion,
//! canvas size, zoom, now) and the outputs derived from them. Each event
//! handler updates one input and reruns only the stages downstream of it:
//!
//! - snapshot: build -> flatten -> layout
//! - toggle: flatten -> layout
//! - resize, zoom, tick: layout
//!
//! Derived state is computed in full before it replaces the previous one.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, info};

use crate::{
    Config,
    graph::{ExecutionGraph, ExecutionNode},
    model::{ExecutionAndTasks, WorkflowDef},
    rows::{self, ExpansionState, Row, RowOptions},
    selection::{LayoutSurface, SelectionSync, TaskCoordinate, Viewport, sync_selection},
    summary::{SummaryField, task_summary},
    timeline::{LayoutOptions, TimeRange, TimelineLayout, layout},
    utils::{format, time::time_millis},
};

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Definition(WorkflowDef),
    Snapshot(ExecutionAndTasks),
}

#[derive(Debug, Clone)]
struct Derived {
    graph: Arc<ExecutionGraph>,
    rows: Vec<Row>,
    collapsible: HashSet<String>,
    layout: TimelineLayout,
}

pub struct TimelineView {
    config: Config,
    options: LayoutOptions,
    source: Option<Source>,
    expansion: ExpansionState,
    selection: Option<TaskCoordinate>,
    viewport: Viewport,
    zoom: Option<TimeRange>,
    now: i64,
    derived: Derived,
}

impl TimelineView {
    pub fn new(config: Config) -> Self {
        let options = LayoutOptions::from(&config.timeline);
        let now = time_millis();
        let viewport = Viewport {
            width: options.label_width + options.canvas_width,
            height: config.timeline.viewport_height,
            ..Default::default()
        };
        let expansion = ExpansionState::new(config.rows.default_expand_depth);
        let derived = Derived {
            graph: Arc::new(ExecutionGraph::from_definition(&WorkflowDef::default())),
            rows: Vec::new(),
            collapsible: HashSet::new(),
            layout: layout(&[], &options, None, now),
        };

        Self {
            config,
            options,
            source: None,
            expansion,
            selection: None,
            viewport,
            zoom: None,
            now,
            derived,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared so a diagram view can hold the same graph.
    pub fn graph(&self) -> Arc<ExecutionGraph> {
        self.derived.graph.clone()
    }

    pub fn rows(&self) -> &[Row] {
        &self.derived.rows
    }

    pub fn layout(&self) -> &TimelineLayout {
        &self.derived.layout
    }

    pub fn collapsible_ids(&self) -> &HashSet<String> {
        &self.derived.collapsible
    }

    pub fn selection(&self) -> Option<&TaskCoordinate> {
        self.selection.as_ref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    /// Previews a definition; every step is not executed.
    ///
    /// Returns false when the definition is already loaded.
    pub fn load_definition(
        &mut self,
        def: WorkflowDef,
    ) -> bool {
        let source = Source::Definition(def);
        if self.source.as_ref() == Some(&source) {
            return false;
        }
        info!(workflow = %self.source_name(&source), "loading definition");
        self.replace_source(source);
        true
    }

    /// Replaces the execution snapshot. The previous derived state is
    /// discarded; expansion and selection carry over.
    ///
    /// Returns false when the snapshot is unchanged.
    pub fn load_snapshot(
        &mut self,
        snapshot: ExecutionAndTasks,
    ) -> bool {
        let source = Source::Snapshot(snapshot);
        if self.source.as_ref() == Some(&source) {
            return false;
        }
        info!(workflow = %self.source_name(&source), "loading execution snapshot");
        self.replace_source(source);
        true
    }

    /// Flips one collapsible row. Returns the new expansion flag, or `None`
    /// when `id` is not a visible collapsible row.
    ///
    /// Rows below the toggled one move, so the selection is synced again.
    pub fn toggle_row(
        &mut self,
        id: &str,
    ) -> Option<bool> {
        self.toggle(id).map(|(expanded, _)| expanded)
    }

    /// A label click toggles a collapsible row and selects any other row.
    pub fn on_label_click(
        &mut self,
        id: &str,
    ) -> SelectionSync {
        if let Some((_, sync)) = self.toggle(id) {
            return sync;
        }
        let Some(row) = self.derived.rows.iter().find(|r| r.id == id) else {
            return SelectionSync::Hidden;
        };
        let coordinate = if row.id != row.node_id {
            TaskCoordinate::attempt(&row.node_id, &row.id)
        } else {
            TaskCoordinate::node(&row.node_id)
        };
        self.on_select(Some(coordinate))
    }

    /// Changes the selection and brings it into view.
    pub fn on_select(
        &mut self,
        coordinate: Option<TaskCoordinate>,
    ) -> SelectionSync {
        self.selection = coordinate;
        self.sync()
    }

    /// Selects whatever is drawn under a point of the time canvas.
    pub fn on_canvas_click(
        &mut self,
        x: f64,
        y: f64,
    ) -> SelectionSync {
        match self.derived.layout.hit_test(x, y) {
            Some(coordinate) => self.on_select(Some(coordinate)),
            None => SelectionSync::Hidden,
        }
    }

    /// Node and summary for the current selection.
    pub fn selected_summary(&self) -> Option<(&ExecutionNode, Vec<SummaryField>)> {
        let selection = self.selection.as_ref()?;
        let node = self.derived.graph.node(&selection.id)?;
        let record = selection.task_id.as_deref().and_then(|id| format::find_attempt(&node.id, &node.records, id));
        Some((node, task_summary(node, record.map(|r| r.as_ref()), self.now)))
    }

    /// Changes the canvas width and the visible height.
    pub fn resize(
        &mut self,
        canvas_width: f64,
        viewport_height: f64,
    ) -> bool {
        self.viewport.height = viewport_height.max(0.0);
        self.viewport.width = self.options.label_width + canvas_width.max(0.0);
        if self.options.canvas_width == canvas_width {
            return false;
        }
        self.options.canvas_width = canvas_width;
        self.relayout();
        true
    }

    /// Overrides the time window; `None` goes back to the data range.
    pub fn zoom(
        &mut self,
        range: Option<TimeRange>,
    ) -> bool {
        if self.zoom == range {
            return false;
        }
        self.zoom = range;
        self.relayout();
        true
    }

    /// Advances the clock. Only running steps depend on it, so the layout
    /// is recomputed only while something is running.
    pub fn tick(
        &mut self,
        now: i64,
    ) -> bool {
        self.now = now;
        let running = self.derived.rows.iter().any(|r| r.status.is_running() || r.summary.is_some_and(|s| s.status.is_running()));
        if !running {
            return false;
        }
        self.relayout();
        true
    }

    fn toggle(
        &mut self,
        id: &str,
    ) -> Option<(bool, SelectionSync)> {
        if !self.derived.collapsible.contains(id) {
            return None;
        }
        let depth = self.derived.rows.iter().find(|r| r.id == id).map(|r| r.depth)?;
        let expanded = self.expansion.toggle(id, depth);
        debug!(id, expanded, "row toggled");
        self.reflatten();
        Some((expanded, self.sync()))
    }

    fn source_name(
        &self,
        source: &Source,
    ) -> String {
        match source {
            Source::Definition(def) => def.name.clone(),
            Source::Snapshot(snapshot) => snapshot.execution.workflow_id.clone(),
        }
    }

    fn replace_source(
        &mut self,
        source: Source,
    ) {
        let graph = match &source {
            Source::Definition(def) => ExecutionGraph::from_definition(def),
            Source::Snapshot(snapshot) => ExecutionGraph::from_snapshot(snapshot, self.config.graph.infer_structure),
        };
        self.source = Some(source);
        self.derived = self.derive(Arc::new(graph));
        self.sync();
    }

    fn reflatten(&mut self) {
        self.derived = self.derive(self.derived.graph.clone());
    }

    fn relayout(&mut self) {
        self.derived.layout = layout(&self.derived.rows, &self.options, self.zoom, self.now);
    }

    fn derive(
        &self,
        graph: Arc<ExecutionGraph>,
    ) -> Derived {
        let options = RowOptions {
            show_attempts: self.config.rows.show_attempts,
        };
        let rows = rows::flatten(&graph, &self.expansion, &options);
        let collapsible = rows::collapsible_ids(&rows);
        let layout = layout(&rows, &self.options, self.zoom, self.now);

        Derived {
            graph,
            rows,
            collapsible,
            layout,
        }
    }

    fn sync(&mut self) -> SelectionSync {
        let mut surface = LayoutSurface::new(&self.derived.layout, &mut self.viewport);
        sync_selection(self.selection.as_ref(), &mut surface)
    }
}

impl Default for TimelineView {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
