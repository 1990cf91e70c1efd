use std::{fs, path::Path};

use serde::Deserialize;

use crate::{FlowlensError, Result};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// timeline canvas config
    pub timeline: TimelineConfig,
    /// row model config
    pub rows: RowsConfig,
    /// graph builder config
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// row band height in pixels, defaults to 40
    pub bandwidth: f64,
    /// bar height in pixels, defaults to 22
    pub bar_height: f64,
    /// gap subtracted before aligning labels, defaults to 4
    pub label_inset: f64,
    /// label position in the free band space, range [0, 1], defaults to 0.3
    pub alignment_ratio: f64,
    /// space above the first row for the time axis, defaults to 30
    pub axis_offset: f64,
    /// time canvas width in pixels, defaults to 1200
    pub canvas_width: f64,
    /// label column width in pixels, defaults to 250
    pub label_width: f64,
    /// visible height of the timeline, defaults to 600
    pub viewport_height: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RowsConfig {
    /// rows shallower than this start expanded, defaults to 0 (all collapsed)
    pub default_expand_depth: usize,
    /// one sub-row per retry or iteration, defaults to true
    pub show_attempts: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraphConfig {
    /// rebuild structure from the task list when the execution carries no definition
    pub infer_structure: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            bandwidth: 40.0,
            bar_height: 22.0,
            label_inset: 4.0,
            alignment_ratio: 0.3,
            axis_offset: 30.0,
            canvas_width: 1200.0,
            label_width: 250.0,
            viewport_height: 600.0,
        }
    }
}

impl Default for RowsConfig {
    fn default() -> Self {
        Self {
            default_expand_depth: 0,
            show_attempts: true,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            infer_structure: true,
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| FlowlensError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let timeline = &self.timeline;
        if timeline.bandwidth <= 0.0 {
            return Err(FlowlensError::Config(format!("bandwidth must be positive, got {}", timeline.bandwidth)));
        }
        if timeline.bar_height < 0.0 || timeline.bar_height > timeline.bandwidth {
            return Err(FlowlensError::Config(format!("bar_height must be within [0, {}], got {}", timeline.bandwidth, timeline.bar_height)));
        }
        if !(0.0..=1.0).contains(&timeline.alignment_ratio) {
            return Err(FlowlensError::Config(format!("alignment_ratio must be within [0, 1], got {}", timeline.alignment_ratio)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{Config, FlowlensError};

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        [timeline]
        bandwidth = 32.0
        bar_height = 18.5
        alignment_ratio = 0.5

        [rows]
        default_expand_depth = 2
        show_attempts = false

        [graph]
        infer_structure = false
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert_eq!(config.timeline.bandwidth, 32.0);
        assert_eq!(config.timeline.bar_height, 18.5);
        assert_eq!(config.timeline.alignment_ratio, 0.5);
        assert_eq!(config.timeline.canvas_width, 1200.0);
        assert_eq!(config.rows.default_expand_depth, 2);
        assert!(!config.rows.show_attempts);
        assert!(!config.graph.infer_structure);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeline.bandwidth, 40.0);
        assert_eq!(config.timeline.alignment_ratio, 0.3);
        assert!(config.rows.show_attempts);
        assert!(config.graph.infer_structure);
    }

    #[test]
    fn test_config_invalid() {
        let err = Config::load_from_str("[timeline]\nbar_height = 100.0").unwrap_err();
        assert!(matches!(err, FlowlensError::Config(_)));

        let err = Config::load_from_str("[timeline]\nalignment_ratio = 2.0").unwrap_err();
        assert!(matches!(err, FlowlensError::Config(_)));

        let err = Config::load_from_str("[rows\n").unwrap_err();
        assert!(matches!(err, FlowlensError::Config(_)));

        assert!(Config::create("/definitely/not/here.toml").is_err());
    }
}
