use crate::{Config, TimelineView};

#[derive(Default)]
pub struct TimelineBuilder {
    config: Config,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn canvas_width(
        mut self,
        width: f64,
    ) -> Self {
        self.config.timeline.canvas_width = width;
        self
    }

    pub fn viewport_height(
        mut self,
        height: f64,
    ) -> Self {
        self.config.timeline.viewport_height = height;
        self
    }

    pub fn bandwidth(
        mut self,
        bandwidth: f64,
    ) -> Self {
        self.config.timeline.bandwidth = bandwidth;
        self
    }

    pub fn bar_height(
        mut self,
        height: f64,
    ) -> Self {
        self.config.timeline.bar_height = height;
        self
    }

    pub fn alignment_ratio(
        mut self,
        ratio: f64,
    ) -> Self {
        self.config.timeline.alignment_ratio = ratio;
        self
    }

    pub fn default_expand_depth(
        mut self,
        depth: usize,
    ) -> Self {
        self.config.rows.default_expand_depth = depth;
        self
    }

    pub fn show_attempts(
        mut self,
        show: bool,
    ) -> Self {
        self.config.rows.show_attempts = show;
        self
    }

    pub fn infer_structure(
        mut self,
        infer: bool,
    ) -> Self {
        self.config.graph.infer_structure = infer;
        self
    }

    pub fn build(&self) -> TimelineView {
        TimelineView::new(self.config.clone())
    }
}
