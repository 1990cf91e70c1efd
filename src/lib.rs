//! # Flowlens
//!
//! Flowlens turns workflow executions into view models for an operations
//! console. It is a pure in-memory transform: execution and task records
//! come in as JSON-shaped snapshots, a graph, a row list and a laid-out
//! timeline come out.
//!
//! ## Pipeline
//!
//! - **Graph**: a workflow definition reconciled with the task records of
//!   one execution ([`ExecutionGraph`])
//! - **Rows**: a pre-order flattening of the graph honoring collapse state
//!   ([`rows::flatten`])
//! - **Timeline**: band and time scales plus one bar per attempt
//!   ([`timeline::layout`])
//! - **Selection**: keeps the selected row inside the viewport
//!   ([`selection::sync_selection`])
//!
//! [`TimelineView`] runs the pipeline in response to events and only
//! recomputes the stages whose inputs changed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flowlens::{ExecutionAndTasks, TimelineBuilder};
//!
//! let mut view = TimelineBuilder::new().canvas_width(900.0).build();
//! view.load_snapshot(ExecutionAndTasks::from_json(execution_json, tasks_json)?);
//! view.toggle_row("fork_ref");
//! for row in view.layout().rows.iter() {
//!     println!("{} {:?}", row.id, row.bars);
//! }
//! ```

mod builder;
mod config;
mod error;
mod view;

pub mod graph;
pub mod model;
pub mod payload;
pub mod rows;
pub mod selection;
pub mod summary;
pub mod timeline;
pub mod utils;

pub use builder::TimelineBuilder;
pub use config::{Config, GraphConfig, RowsConfig, TimelineConfig};
pub use error::FlowlensError;
pub use graph::{EdgeKind, ExecutionGraph, ExecutionNode, GraphEdge, NodeStatus};
pub use model::*;
pub use rows::{ExpansionState, Row};
pub use selection::TaskCoordinate;
pub use timeline::{TimeRange, TimelineLayout};
pub use view::TimelineView;

/// Result type alias for Flowlens operations.
pub type Result<T> = std::result::Result<T, FlowlensError>;
