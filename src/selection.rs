//! Selection tracking and viewport sync.
//!
//! When the selected task changes, its row is scrolled into view if it is
//! not already fully visible. A selection inside a collapsed subtree has no
//! row and is left alone; expanding is always an explicit user action.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::timeline::TimelineLayout;

/// Identifies a selected step, optionally down to one attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TaskCoordinate {
    /// node id (task reference name)
    pub id: String,
    /// attempt within the node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl TaskCoordinate {
    pub fn node(id: &str) -> Self {
        Self {
            id: id.to_string(),
            task_id: None,
        }
    }

    pub fn attempt(
        id: &str,
        task_id: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            task_id: Some(task_id.to_string()),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// `other` lies fully inside `self`.
    pub fn contains(
        &self,
        other: &Rect,
    ) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Instant,
}

/// Where rows are drawn and how they are scrolled.
pub trait RenderSurface {
    /// Visible region in canvas coordinates.
    fn viewport(&self) -> Rect;

    /// Bounds of the element rendered for `id`, `None` when nothing is rendered for it.
    fn bounding_box(
        &self,
        id: &str,
    ) -> Option<Rect>;

    fn scroll_into_view(
        &mut self,
        id: &str,
        behavior: ScrollBehavior,
    );
}

/// Outcome of one selection sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSync {
    /// Nothing selected, or the selection has no rendered row.
    Hidden,
    /// The row was already fully visible.
    Visible(String),
    /// The row was scrolled into view.
    Scrolled(String),
}

/// Brings the selected row into view.
///
/// An attempt row is preferred when the coordinate names one and it is rendered.
pub fn sync_selection<S: RenderSurface>(
    selected: Option<&TaskCoordinate>,
    surface: &mut S,
) -> SelectionSync {
    let Some(selected) = selected else {
        return SelectionSync::Hidden;
    };

    let target = selected
        .task_id
        .as_deref()
        .and_then(|task_id| surface.bounding_box(task_id).map(|rect| (task_id, rect)))
        .or_else(|| surface.bounding_box(&selected.id).map(|rect| (selected.id.as_str(), rect)));

    let Some((id, rect)) = target else {
        trace!(id = %selected.id, "selection has no rendered row");
        return SelectionSync::Hidden;
    };

    if surface.viewport().contains(&rect) {
        return SelectionSync::Visible(id.to_string());
    }

    let id = id.to_string();
    trace!(id = %id, "scrolling selection into view");
    surface.scroll_into_view(&id, ScrollBehavior::Smooth);
    SelectionSync::Scrolled(id)
}

/// Scroll position and size of the visible part of the timeline.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub width: f64,
    pub height: f64,
}

/// A render surface backed by a computed layout and a viewport.
pub struct LayoutSurface<'a> {
    layout: &'a TimelineLayout,
    viewport: &'a mut Viewport,
    last_scroll: Option<ScrollBehavior>,
}

impl<'a> LayoutSurface<'a> {
    pub fn new(
        layout: &'a TimelineLayout,
        viewport: &'a mut Viewport,
    ) -> Self {
        Self {
            layout,
            viewport,
            last_scroll: None,
        }
    }

    pub fn last_scroll(&self) -> Option<ScrollBehavior> {
        self.last_scroll
    }
}

impl RenderSurface for LayoutSurface<'_> {
    fn viewport(&self) -> Rect {
        Rect::new(self.viewport.scroll_left, self.viewport.scroll_top, self.viewport.width, self.viewport.height)
    }

    fn bounding_box(
        &self,
        id: &str,
    ) -> Option<Rect> {
        self.layout.row_bounds(id)
    }

    /// Aligns the row's top edge with the top of the viewport.
    fn scroll_into_view(
        &mut self,
        id: &str,
        behavior: ScrollBehavior,
    ) {
        if let Some(rect) = self.layout.row_bounds(id) {
            let max_top = (self.layout.height() - self.viewport.height).max(0.0);
            self.viewport.scroll_top = rect.y.min(max_top).max(0.0);
            self.viewport.scroll_left = rect.x.min(self.viewport.scroll_left);
            self.last_scroll = Some(behavior);
        }
    }
}
