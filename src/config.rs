//! Chart configuration
//!
//! Every report variant is one preset of the same parameterised charts. A YAML
//! file only needs to list the settings it changes; everything else comes from
//! the preset named by its `variant` key.

use crate::dataset::Dataset;
use crate::palette::{Rgb, TrafficLight};
use crate::stats::WhiskerMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;

/// Report variant presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Validation report: gapped iris charts, quartile colour bands
    #[default]
    Iris,
    /// Multimetric report: full-circle charts, tercile colour bands
    Multimetric,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Iris => write!(f, "iris"),
            Variant::Multimetric => write!(f, "multimetric"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub variant: Variant,
    pub iris: IrisConfig,
    pub radar: RadarConfig,
    pub residue_chart: ResidueChartConfig,
    pub bands: TrafficLight,
    pub layout: LayoutConfig,
}

/// How a ring draws its metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingKind {
    /// Polyline of deviations from the ring average
    Continuous,
    /// One coloured segment per residue
    Discrete,
}

/// One concentric ring of the iris chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    pub name: String,
    /// Metric index into the dataset
    pub metric: usize,
    pub kind: RingKind,
    /// +1 when larger values are better, -1 otherwise
    #[serde(default = "default_polarity")]
    pub polarity: f64,
}

/// Iris (concentric) chart settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrisConfig {
    pub canvas: [f64; 2],
    /// Gap left at 12 o'clock, in degrees
    pub gap_degrees: f64,
    pub axis_min: f64,
    pub axis_max: f64,
    pub baseline_resolution: usize,
    pub rings: Vec<RingSpec>,
    /// Rows of the docked residue side panel, if any
    #[serde(default)]
    pub residue_window: Option<usize>,
    pub discrete_colors: [Rgb; 3],
    pub shade_enabled: bool,
    pub shade_color: Rgb,
    pub markers_enabled: bool,
    pub marker_color: Rgb,
}

/// Radar chart settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarConfig {
    pub canvas: [f64; 2],
}

/// A metric shown in a residue panel slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSlot {
    pub metric: usize,
    pub label: String,
}

/// Residue panel: discrete check boxes and percentile bars with box plots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidueChartConfig {
    pub canvas: [f64; 2],
    pub checkboxes: Vec<MetricSlot>,
    pub bars: Vec<MetricSlot>,
    #[serde(default)]
    pub whiskers: WhiskerMode,
}

/// Column widths of the chain and residue views, normal and zoomed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub columns: [u8; 2],
    pub zoomed_columns: [u8; 2],
}

fn default_polarity() -> f64 {
    1.0
}

fn default_rings() -> Vec<RingSpec> {
    let ring = |name: &str, metric: usize, kind: RingKind, polarity: f64| RingSpec {
        name: name.to_string(),
        metric,
        kind,
        polarity,
    };
    vec![
        ring("Rama", 0, RingKind::Discrete, 1.0),
        ring("Rota", 1, RingKind::Discrete, -1.0),
        ring("Avg B", 2, RingKind::Continuous, -1.0),
        ring("Max B", 3, RingKind::Continuous, -1.0),
        ring("MC Fit", 4, RingKind::Continuous, -1.0),
        ring("SC Fit", 5, RingKind::Continuous, -1.0),
    ]
}

impl ResidueChartConfig {
    /// Vertical extent `(top, bottom)` of the bar chart area
    pub fn bar_bounds(&self) -> (f64, f64) {
        let size = (self.canvas[0].min(self.canvas[1]) / 50.0).floor();
        (28.0 * size, self.canvas[1] - 10.0 * size)
    }
}

impl ChartConfig {
    /// Built-in settings for a report variant
    pub fn preset(variant: Variant) -> Self {
        let iris = IrisConfig {
            canvas: [1000.0, 1000.0],
            gap_degrees: match variant {
                Variant::Iris => 0.3_f64.to_degrees(),
                Variant::Multimetric => 0.0,
            },
            axis_min: -0.7,
            axis_max: 0.25,
            baseline_resolution: 200,
            rings: default_rings(),
            residue_window: None,
            discrete_colors: [Rgb::RED, Rgb::ORANGE, Rgb::GREEN],
            shade_enabled: true,
            shade_color: Rgb::VL_RED,
            markers_enabled: true,
            marker_color: Rgb::RED,
        };
        let residue_chart = ResidueChartConfig {
            canvas: [400.0, 1000.0],
            checkboxes: vec![
                MetricSlot { metric: 0, label: "Ramachandran".to_string() },
                MetricSlot { metric: 1, label: "Rotamer".to_string() },
            ],
            bars: vec![
                MetricSlot { metric: 2, label: "Avg. B-factor".to_string() },
                MetricSlot { metric: 5, label: "Sidechain Fit".to_string() },
            ],
            whiskers: WhiskerMode::Extremes,
        };
        let (bands, layout) = match variant {
            Variant::Iris => (
                TrafficLight::quartiles(),
                LayoutConfig { columns: [7, 5], zoomed_columns: [8, 4] },
            ),
            Variant::Multimetric => (
                TrafficLight::terciles(),
                LayoutConfig { columns: [6, 6], zoomed_columns: [8, 4] },
            ),
        };

        Self {
            variant,
            iris,
            radar: RadarConfig { canvas: [600.0, 500.0] },
            residue_chart,
            bands,
            layout,
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml_str(&content).with_context(|| format!("Failed to parse YAML config: {}", path.display()))
    }

    /// Parse YAML overrides on top of the preset selected by `variant`
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let overrides: Value = serde_yaml::from_str(yaml)?;
        let variant: Variant = match overrides.get("variant") {
            Some(v) => serde_yaml::from_value(v.clone())?,
            None => Variant::default(),
        };

        let mut merged = serde_yaml::to_value(Self::preset(variant))?;
        if !overrides.is_null() {
            merge_yaml(&mut merged, overrides);
        }

        let config: ChartConfig = serde_yaml::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.bands.validate()?;

        for (name, canvas) in [
            ("iris", self.iris.canvas),
            ("radar", self.radar.canvas),
            ("residue_chart", self.residue_chart.canvas),
        ] {
            if canvas.iter().any(|&side| side <= 0.0 || !side.is_finite()) {
                anyhow::bail!("Canvas for {} chart must be positive, got {:?}", name, canvas);
            }
        }

        if !(0.0..360.0).contains(&self.iris.gap_degrees) {
            anyhow::bail!("Gap must be within [0, 360) degrees, got {}", self.iris.gap_degrees);
        }
        if self.iris.rings.is_empty() {
            anyhow::bail!("At least one iris ring must be defined");
        }
        if self.iris.residue_window == Some(0) {
            anyhow::bail!("Residue window must be at least 1 residue when set");
        }
        if self.iris.baseline_resolution == 0 {
            anyhow::bail!("Baseline resolution must be at least 1");
        }
        if self.iris.axis_min > 0.0 || self.iris.axis_max < 0.0 {
            anyhow::bail!(
                "Axis range must straddle zero, got [{}, {}]",
                self.iris.axis_min,
                self.iris.axis_max
            );
        }
        if let Some(ring) = self.iris.rings.iter().find(|r| r.polarity != 1.0 && r.polarity != -1.0) {
            anyhow::bail!("Ring '{}' has polarity {}, expected 1 or -1", ring.name, ring.polarity);
        }

        Ok(())
    }

    /// Check metric indices against a dataset
    pub fn check_dataset(&self, dataset: &Dataset) -> Result<()> {
        let num_metrics = dataset.num_metrics();
        for ring in &self.iris.rings {
            if ring.metric >= num_metrics {
                anyhow::bail!(
                    "Ring '{}' uses metric {} but the dataset has {} metrics",
                    ring.name,
                    ring.metric,
                    num_metrics
                );
            }
        }
        for slot in self.residue_chart.checkboxes.iter().chain(&self.residue_chart.bars) {
            if slot.metric >= num_metrics {
                anyhow::bail!(
                    "Residue panel slot '{}' uses metric {} but the dataset has {} metrics",
                    slot.label,
                    slot.metric,
                    num_metrics
                );
            }
        }
        Ok(())
    }

    /// Metric indices of the bar series, in order
    pub fn bar_metrics(&self) -> Vec<usize> {
        self.residue_chart.bars.iter().map(|b| b.metric).collect()
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self::preset(Variant::default())
    }
}

fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_yaml(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
