//! Timeline layout: rows to bands, attempts to horizontal bars.
//!
//! `layout` is a pure function of the rows, the time range, the canvas
//! options and "now". Anything that changes none of those must not trigger
//! a new layout.

use serde::Serialize;
use tracing::debug;

use crate::{
    config::TimelineConfig,
    graph::NodeStatus,
    model::TaskResult,
    rows::{Row, TimeSpan},
    selection::{Rect, TaskCoordinate},
    timeline::scale::{BandScale, TimeScale},
    utils::format,
};

/// Horizontal slack, in pixels, when hit-testing zero-width markers.
const MARKER_HIT_SLOP: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// width of the time canvas in pixels
    pub canvas_width: f64,
    /// height of one row band
    pub bandwidth: f64,
    /// height of a bar inside its band
    pub bar_height: f64,
    /// fixed gap subtracted before aligning labels
    pub label_inset: f64,
    /// where the label sits in the free space above the bar, 0 = top
    pub alignment_ratio: f64,
    /// space reserved above the first band for the time axis
    pub axis_offset: f64,
    /// width of the label column, used for row bounds
    pub label_width: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::from(&TimelineConfig::default())
    }
}

impl From<&TimelineConfig> for LayoutOptions {
    fn from(config: &TimelineConfig) -> Self {
        Self {
            canvas_width: config.canvas_width,
            bandwidth: config.bandwidth,
            bar_height: config.bar_height,
            label_inset: config.label_inset,
            alignment_ratio: config.alignment_ratio,
            axis_offset: config.axis_offset,
            label_width: config.label_width,
        }
    }
}

/// Inclusive time window in epoch milliseconds.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(
        start: i64,
        end: i64,
    ) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Earliest scheduled time to latest end over every record in `rows`.
    ///
    /// Attempts still open extend the range to `now`. Without any timestamps
    /// the range collapses to `now`.
    pub fn from_rows(
        rows: &[Row],
        now: i64,
    ) -> Self {
        let mut start: Option<i64> = None;
        let mut end: Option<i64> = None;

        let mut include = |t: i64| {
            start = Some(start.map_or(t, |s| s.min(t)));
            end = Some(end.map_or(t, |e| e.max(t)));
        };

        for row in rows {
            for record in &row.records {
                if let Some((left, right)) = record_span(record, now) {
                    include(left);
                    include(right);
                }
            }
            if let Some((left, right)) = row.summary.as_ref().and_then(|s| summary_span(s, now)) {
                include(left);
                include(right);
            }
        }

        match (start, end) {
            (Some(s), Some(e)) => Self::new(s, e),
            _ => Self::new(now, now),
        }
    }
}

/// One rectangle on the time canvas.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Bar {
    /// attempt drawn by this bar; `None` for summary bars and not-executed markers
    pub task_id: Option<String>,
    pub status: NodeStatus,
    pub x: f64,
    pub width: f64,
    pub y: f64,
    pub height: f64,
    /// zero-width placeholder
    pub marker: bool,
    /// envelope of a collapsed subtree
    pub summary: bool,
}

impl Bar {
    fn hit(
        &self,
        x: f64,
    ) -> bool {
        let slop = if self.marker { MARKER_HIT_SLOP } else { 0.0 };
        x >= self.x - slop && x <= self.x + self.width + slop
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub id: String,
    pub node_id: String,
    /// top of the band
    pub y: f64,
    /// label anchor
    pub label_y: f64,
    pub bars: Vec<Bar>,
}

/// Everything the render surface needs to draw the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayout {
    pub band: BandScale,
    pub time: TimeScale,
    pub range: TimeRange,
    pub rows: Vec<RowLayout>,
    label_width: f64,
}

impl TimelineLayout {
    pub fn height(&self) -> f64 {
        self.band.height()
    }

    pub fn row(
        &self,
        id: &str,
    ) -> Option<&RowLayout> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Label box of a row, in canvas coordinates.
    pub fn row_bounds(
        &self,
        id: &str,
    ) -> Option<Rect> {
        self.band.position(id).map(|y| Rect::new(0.0, y, self.label_width, self.band.bandwidth()))
    }

    /// The step and attempt under a point of the time canvas.
    pub fn hit_test(
        &self,
        x: f64,
        y: f64,
    ) -> Option<TaskCoordinate> {
        let id = self.band.invert(y)?;
        let row = self.row(id)?;
        let task_id = row.bars.iter().find(|bar| bar.hit(x)).and_then(|bar| bar.task_id.clone());
        Some(TaskCoordinate {
            id: row.node_id.clone(),
            task_id,
        })
    }
}

/// Lays out rows on a shared time scale.
///
/// `range` overrides the data-derived window (zoom).
pub fn layout(
    rows: &[Row],
    options: &LayoutOptions,
    range: Option<TimeRange>,
    now: i64,
) -> TimelineLayout {
    let range = range.unwrap_or_else(|| TimeRange::from_rows(rows, now));
    let band = BandScale::new(rows.iter().map(|r| r.id.clone()), options.bandwidth, options.axis_offset);
    let time = TimeScale::new((range.start, range.end), (0.0, options.canvas_width.max(0.0)));

    let bandwidth = band.bandwidth();
    let bar_height = options.bar_height.min(bandwidth);
    let frontier = time.apply(range.end);

    let rows: Vec<RowLayout> = rows
        .iter()
        .map(|row| {
            let y = band.position(&row.id).unwrap_or(options.axis_offset);
            let label_y = y + (bandwidth - bar_height - options.label_inset) * options.alignment_ratio;
            let bar_y = y + (bandwidth - bar_height) / 2.0;

            let place = |span: Option<(i64, i64)>, task_id: Option<String>, status: NodeStatus, summary: bool| match span {
                Some((left, right)) => {
                    let x = time.apply(left);
                    Bar {
                        task_id,
                        status,
                        x,
                        width: (time.apply(right) - x).max(0.0),
                        y: bar_y,
                        height: bar_height,
                        marker: right <= left,
                        summary,
                    }
                }
                None => Bar {
                    task_id,
                    status,
                    x: frontier,
                    width: 0.0,
                    y: bar_y,
                    height: bar_height,
                    marker: true,
                    summary,
                },
            };

            let bars = match (&row.summary, row.shows_summary()) {
                (Some(summary), true) => vec![place(summary_span(summary, now), None, summary.status, true)],
                _ if row.records.is_empty() => vec![place(None, None, row.status, false)],
                _ => row
                    .records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        let task_id = if row.id != row.node_id { row.id.clone() } else { format::attempt_id(&row.node_id, i, r) };
                        place(record_span(r, now), Some(task_id), r.status.into(), false)
                    })
                    .collect(),
            };

            RowLayout {
                id: row.id.clone(),
                node_id: row.node_id.clone(),
                y,
                label_y,
                bars,
            }
        })
        .collect();

    debug!(rows = rows.len(), start = range.start, end = range.end, "timeline laid out");

    TimelineLayout {
        band,
        time,
        range,
        rows,
        label_width: options.label_width,
    }
}

/// Time extent of one attempt: from scheduled (or start) to end (or now).
///
/// An attempt that has not started is a zero-width marker at its scheduled
/// time; one with only an end time is a marker at that end. An end before
/// the start collapses to zero width.
fn record_span(
    record: &TaskResult,
    now: i64,
) -> Option<(i64, i64)> {
    let Some(left) = record.scheduled_at().or(record.started_at()) else {
        return record.ended_at().map(|end| (end, end));
    };
    if record.started_at().is_none() {
        return Some((left, left));
    }
    let right = record.ended_at().unwrap_or(now);
    Some((left, right.max(left)))
}

fn summary_span(
    span: &TimeSpan,
    now: i64,
) -> Option<(i64, i64)> {
    let left = span.start?;
    let right = match span.end {
        Some(end) if !span.status.is_running() => end,
        _ if span.status.is_running() => now,
        _ => left,
    };
    Some((left, right.max(left)))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{LayoutOptions, TimeRange, layout};
    use crate::{
        graph::NodeStatus,
        model::{TaskResult, TaskStatus},
        rows::{Row, RowIcon, TimeSpan},
    };

    fn record(
        id: &str,
        status: TaskStatus,
        scheduled: i64,
        start: i64,
        end: i64,
    ) -> Arc<TaskResult> {
        Arc::new(TaskResult {
            task_id: id.to_string(),
            reference_task_name: id.to_string(),
            status,
            scheduled_time: scheduled,
            start_time: start,
            end_time: end,
            ..Default::default()
        })
    }

    fn row(
        id: &str,
        records: Vec<Arc<TaskResult>>,
    ) -> Row {
        Row {
            id: id.to_string(),
            node_id: id.to_string(),
            label: id.to_string(),
            icon: RowIcon::Task,
            depth: 0,
            status: NodeStatus::from_records(&records),
            collapsible: false,
            expanded: false,
            records,
            summary: None,
        }
    }

    fn options() -> LayoutOptions {
        LayoutOptions {
            canvas_width: 1000.0,
            bandwidth: 40.0,
            bar_height: 22.0,
            label_inset: 4.0,
            alignment_ratio: 0.5,
            axis_offset: 30.0,
            label_width: 250.0,
        }
    }

    #[test]
    fn test_linear_workflow_layout() {
        let rows = vec![
            row("A", vec![record("A", TaskStatus::Completed, 1000, 1000, 1100)]),
            row("B", vec![record("B", TaskStatus::InProgress, 1100, 1100, 0)]),
            row("C", vec![]),
        ];
        let timeline = layout(&rows, &options(), None, 1200);

        assert_eq!(timeline.range, TimeRange::new(1000, 1200));
        assert_eq!(timeline.height(), 30.0 + 3.0 * 40.0);

        let a = &timeline.rows[0];
        assert_eq!(a.y, 30.0);
        assert_eq!(a.label_y, 30.0 + (40.0 - 22.0 - 4.0) * 0.5);
        assert_eq!(a.bars[0].x, 0.0);
        assert_eq!(a.bars[0].width, 500.0);

        let b = &timeline.rows[1].bars[0];
        assert_eq!(b.x, 500.0);
        assert_eq!(b.width, 500.0);

        let c = &timeline.rows[2].bars[0];
        assert!(c.marker);
        assert_eq!(c.width, 0.0);
        assert_eq!(c.status, NodeStatus::NotExecuted);
    }

    #[test]
    fn test_span_edges_follow_scale() {
        let rows = vec![row("T", vec![record("T", TaskStatus::Completed, 2000, 2100, 2600)])];
        let timeline = layout(&rows, &options(), Some(TimeRange::new(1000, 3000)), 5000);

        let bar = &timeline.rows[0].bars[0];
        assert_eq!(bar.x, timeline.time.apply(2000));
        assert_eq!(bar.x + bar.width, timeline.time.apply(2600));
    }

    #[test]
    fn test_unstarted_and_inconsistent_records() {
        let rows = vec![
            row("queued", vec![record("queued", TaskStatus::Scheduled, 1500, 0, 0)]),
            row("broken", vec![record("broken", TaskStatus::Completed, 1800, 1800, 1200)]),
            row("span", vec![record("span", TaskStatus::Completed, 1000, 1000, 2000)]),
        ];
        let timeline = layout(&rows, &options(), None, 9999);

        let queued = &timeline.rows[0].bars[0];
        assert!(queued.marker);
        assert_eq!(queued.x, 500.0);
        let broken = &timeline.rows[1].bars[0];
        assert_eq!(broken.width, 0.0);
        assert_eq!(broken.x, 800.0);
    }

    #[test]
    fn test_end_without_start_is_marker_at_end() {
        let rows = vec![
            row("A", vec![record("A", TaskStatus::Completed, 1000, 1000, 2000)]),
            row("B", vec![record("B", TaskStatus::Completed, 0, 0, 1500)]),
            row("late", vec![record("late", TaskStatus::Completed, 0, 0, 2500)]),
        ];
        let timeline = layout(&rows, &options(), None, 9999);

        assert_eq!(timeline.range, TimeRange::new(1000, 2500));
        let b = &timeline.rows[1].bars[0];
        assert!(b.marker);
        assert_eq!(b.width, 0.0);
        assert_eq!(b.x, timeline.time.apply(1500));
        assert_eq!(b.status, NodeStatus::Completed);
    }

    #[test]
    fn test_extreme_zoom_range() {
        let rows = vec![row("A", vec![record("A", TaskStatus::Completed, 1000, 1000, 2000)])];
        let timeline = layout(&rows, &options(), Some(TimeRange::new(i64::MIN, i64::MAX)), 5000);

        let bar = &timeline.rows[0].bars[0];
        assert!(bar.x.is_finite());
        assert!((bar.x - 500.0).abs() < 1e-6);
        assert!(bar.width >= 0.0);
    }

    #[test]
    fn test_collapsed_row_draws_summary() {
        let mut fork = row("fork", vec![record("fork", TaskStatus::Completed, 1000, 1000, 1010)]);
        fork.collapsible = true;
        fork.summary = Some(TimeSpan {
            start: Some(1000),
            end: Some(2000),
            status: NodeStatus::Completed,
        });
        let timeline = layout(&[fork.clone()], &options(), None, 5000);
        let bars = &timeline.rows[0].bars;
        assert_eq!(bars.len(), 1);
        assert!(bars[0].summary);
        assert_eq!(bars[0].width, 1000.0);

        fork.expanded = true;
        let timeline = layout(&[fork], &options(), Some(TimeRange::new(1000, 2000)), 5000);
        let bars = &timeline.rows[0].bars;
        assert!(!bars[0].summary);
        assert_eq!(bars[0].task_id.as_deref(), Some("fork"));
    }

    #[test]
    fn test_hit_test() {
        let rows = vec![
            row("A", vec![record("a-1", TaskStatus::Failed, 1000, 1000, 1400), record("a-2", TaskStatus::Completed, 1600, 1600, 2000)]),
            row("B", vec![]),
        ];
        let timeline = layout(&rows, &options(), None, 2000);

        let hit = timeline.hit_test(900.0, 45.0).unwrap();
        assert_eq!(hit.id, "A");
        assert_eq!(hit.task_id.as_deref(), Some("a-2"));

        let gap = timeline.hit_test(500.0, 45.0).unwrap();
        assert_eq!(gap.task_id, None);

        assert!(timeline.hit_test(10.0, 5.0).is_none());
        assert_eq!(timeline.row_bounds("B").unwrap().y, 70.0);
    }

    #[test]
    fn test_empty_rows() {
        let timeline = layout(&[], &options(), None, 42);
        assert_eq!(timeline.range, TimeRange::new(42, 42));
        assert_eq!(timeline.height(), 30.0);
        assert!(timeline.rows.is_empty());
    }
}
