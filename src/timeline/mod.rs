//! Timeline view: band and time scales plus the bar layout built on them.

mod layout;
mod scale;

pub use layout::{Bar, LayoutOptions, RowLayout, TimeRange, TimelineLayout, layout};
pub use scale::{BandScale, TimeScale};
