//! In-memory chart model and the redraw functions that apply a `ViewState` to it
//!
//! Every element the interactive report touches is addressed by index: chain
//! index for the iris panels, metric index for radar points, slot index for
//! the residue panel.

use crate::config::ChartConfig;
use crate::dataset::{Dataset, ResidueRecord};
use crate::geometry::{docked_window, CanvasGeometry, Point, RadarLayout, RingLayout};
use crate::palette::{DiscreteClass, Rgb};
use crate::selection::{Event, Redraw, ViewState};
use crate::stats::{RangeSummary, RangeTable};
use anyhow::Result;
use log::debug;
use serde::Serialize;

/// Vertical offset of the floating radar label above its point
const LABEL_OFFSET: f64 = 30.0;
/// Bar label sits this far above or below the bar line
const BAR_LABEL_OFFSET: f64 = 20.0;
/// Values below this get their label above the line
const BAR_LABEL_FLIP: f64 = 10.0;

/// Text shown for missing values
const NOT_APPLICABLE: &str = "N/A";

/// Glyphs of the fullscreen toggle
const EXPAND_GLYPH: &str = "\u{2197}";
const COLLAPSE_GLYPH: &str = "\u{2199}";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainView {
    pub visible: bool,
    pub button_active: bool,
    /// Text colour of the chain button, unset when inactive
    pub button_color: Option<Rgb>,
    /// Degrees about the chart centre
    pub selector_rotation: f64,
    pub highlighted_segment: Option<usize>,
    /// Model version whose layers are opaque
    pub active_version: usize,
    /// Inclusive residue range of the docked side panel
    pub window: Option<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarPoint {
    pub position: Point,
    pub fill: Rgb,
    pub fill_opacity: f64,
    pub stroke_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarView {
    pub points: Vec<RadarPoint>,
    pub polygon: Vec<Point>,
    pub polygon_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckboxView {
    pub label: String,
    pub fill: Rgb,
    pub text: String,
}

/// Box plot overlay in bar coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxPlot {
    /// y of the whisker maximum (box top)
    pub box_top: f64,
    /// y of the whisker minimum (box bottom)
    pub box_bottom: f64,
    pub mean_y: f64,
    pub low_y: f64,
    pub high_y: f64,
    pub low_visible: bool,
    pub high_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarView {
    pub label: String,
    pub value: Option<f64>,
    pub mainline_y: Option<f64>,
    pub value_text: String,
    pub value_y: Option<f64>,
    pub box_plot: Option<BoxPlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResiduePanel {
    pub checkboxes: Vec<CheckboxView>,
    pub bars: Vec<BarView>,
    pub box_plots_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatingLabel {
    pub top: String,
    pub bottom: String,
    pub position: Point,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutView {
    pub zoomed: bool,
    pub chain_column: String,
    pub residue_column: String,
    pub toggle_glyph: String,
}

/// Every mutable attribute of the report, addressed by index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartModel {
    pub chains: Vec<ChainView>,
    pub radar: RadarView,
    pub residue_panel: ResiduePanel,
    pub floating_label: FloatingLabel,
    pub summary: String,
    pub layout: LayoutView,
}

/// Maps a percentile onto the bar area: `y = offset + multiplier * value`
#[derive(Debug, Clone, Copy, PartialEq)]
struct BarScale {
    offset: f64,
    multiplier: f64,
}

impl BarScale {
    fn new((top, bottom): (f64, f64)) -> Self {
        Self {
            offset: bottom,
            multiplier: -(bottom - top) / 100.0,
        }
    }

    fn y(&self, value: f64) -> f64 {
        round_to(self.offset + self.multiplier * value, 1)
    }

    fn box_plot(&self, range: &RangeSummary) -> BoxPlot {
        BoxPlot {
            box_top: self.y(range.max),
            box_bottom: self.y(range.min),
            mean_y: self.y(range.mean),
            low_y: self.y(range.low),
            high_y: self.y(range.high),
            low_visible: range.low_visible(),
            high_visible: range.high_visible(),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round an absolute metric value for display: more decimals for smaller values
pub fn display_round(value: f64) -> f64 {
    if value < 1.0 {
        round_to(value, 3)
    } else if value < 10.0 {
        round_to(value, 2)
    } else if value < 100.0 {
        round_to(value, 1)
    } else {
        value.round()
    }
}

/// Applies view state to a chart model for one dataset and configuration
pub struct Renderer<'a> {
    dataset: &'a Dataset,
    config: &'a ChartConfig,
    ranges: RangeTable,
    radar: RadarLayout,
    bars: BarScale,
}

impl<'a> Renderer<'a> {
    pub fn new(dataset: &'a Dataset, config: &'a ChartConfig) -> Result<Self> {
        config.check_dataset(dataset)?;
        let ranges = RangeTable::compute(dataset, &config.bar_metrics(), config.residue_chart.whiskers);
        let radar = RadarLayout::new(
            dataset.num_metrics(),
            CanvasGeometry::new(config.radar.canvas[0], config.radar.canvas[1]),
        );
        Ok(Self {
            dataset,
            config,
            ranges,
            radar,
            bars: BarScale::new(config.residue_chart.bar_bounds()),
        })
    }

    pub fn ranges(&self) -> &RangeTable {
        &self.ranges
    }

    /// A fully drawn model for `state`
    pub fn render(&self, state: &ViewState) -> ChartModel {
        let center = self.radar.geometry.center;
        let mut model = ChartModel {
            chains: Vec::new(),
            radar: RadarView {
                points: Vec::new(),
                polygon: Vec::new(),
                polygon_opacity: 0.0,
            },
            residue_panel: ResiduePanel {
                checkboxes: Vec::new(),
                bars: Vec::new(),
                box_plots_visible: false,
            },
            floating_label: FloatingLabel {
                top: String::new(),
                bottom: String::new(),
                position: center,
                visible: false,
            },
            summary: String::new(),
            layout: LayoutView {
                zoomed: false,
                chain_column: String::new(),
                residue_column: String::new(),
                toggle_glyph: String::new(),
            },
        };
        self.redraw(&mut model, state, Redraw::all());
        model
    }

    /// Apply an event to the state and bring the model up to date
    pub fn handle(&self, model: &mut ChartModel, state: &mut ViewState, event: Event) -> Result<Redraw> {
        let redraw = state.apply(event, self.dataset)?;
        self.redraw(model, state, redraw);
        Ok(redraw)
    }

    /// Recompute the parts of `model` flagged in `redraw`
    pub fn redraw(&self, model: &mut ChartModel, state: &ViewState, redraw: Redraw) {
        if redraw.is_empty() {
            return;
        }
        debug!("Redrawing {:?}", redraw);
        if redraw.chain || redraw.versions || redraw.selector {
            self.set_chains(model, state);
        }
        if redraw.residue {
            self.set_radar(model, state);
            self.set_residue_panel(model, state);
            self.set_summary(model, state);
        }
        if redraw.ranges || redraw.residue {
            self.set_ranges(model, state);
        }
        if redraw.radar_label {
            self.set_floating_label(model, state);
        }
        if redraw.layout {
            self.set_layout(model, state);
        }
    }

    fn record(&self, state: &ViewState) -> Option<&'a ResidueRecord> {
        self.dataset.residue(state.model, state.chain, state.residue)
    }

    fn set_chains(&self, model: &mut ChartModel, state: &ViewState) {
        let gap = self.config.iris.gap_degrees;
        model.chains = (0..self.dataset.num_chains())
            .map(|chain| {
                let selected = chain == state.chain;
                let len = self.dataset.chain_len(chain);
                let layout = RingLayout::with_gap_degrees(len, gap);
                let residue = if selected { state.residue } else { 0 };
                ChainView {
                    visible: selected,
                    button_active: selected,
                    button_color: selected.then_some(Rgb::L_GREY),
                    selector_rotation: layout.selector_rotation_degrees(residue),
                    highlighted_segment: (len > 0).then_some(residue),
                    active_version: state.model,
                    window: self
                        .config
                        .iris
                        .residue_window
                        .filter(|_| selected)
                        .map(|window| docked_window(residue, window, len)),
                }
            })
            .collect();
    }

    fn set_radar(&self, model: &mut ChartModel, state: &ViewState) {
        let center = self.radar.geometry.center;
        let axes = self.radar.axes;

        let Some(record) = self.record(state) else {
            model.radar = RadarView {
                points: vec![
                    RadarPoint {
                        position: center,
                        fill: Rgb::WHITE,
                        fill_opacity: 0.0,
                        stroke_opacity: 0.0,
                    };
                    axes
                ],
                polygon: vec![center; axes],
                polygon_opacity: 0.0,
            };
            return;
        };

        let values: Vec<Option<f64>> = (0..axes).map(|metric| record.percentile(metric)).collect();
        let points = values
            .iter()
            .enumerate()
            .map(|(axis, value)| match value {
                Some(v) => RadarPoint {
                    position: self.radar.point(axis, *v),
                    fill: self.config.bands.color(Some(*v)),
                    fill_opacity: 0.5,
                    stroke_opacity: 1.0,
                },
                None => RadarPoint {
                    position: center,
                    fill: self.config.bands.color(None),
                    fill_opacity: 0.0,
                    stroke_opacity: 0.0,
                },
            })
            .collect();

        model.radar = RadarView {
            points,
            polygon: self.radar.polygon(&values),
            polygon_opacity: 0.5,
        };
    }

    fn set_residue_panel(&self, model: &mut ChartModel, state: &ViewState) {
        let chart = &self.config.residue_chart;
        let record = self.record(state);

        let checkboxes = chart
            .checkboxes
            .iter()
            .map(|slot| match record {
                Some(r) => {
                    let class = DiscreteClass::from_code(r.discrete(slot.metric));
                    CheckboxView {
                        label: slot.label.clone(),
                        fill: class.color(&self.config.bands),
                        text: class.to_string(),
                    }
                }
                None => CheckboxView {
                    label: slot.label.clone(),
                    fill: self.config.bands.no_data,
                    text: String::new(),
                },
            })
            .collect();

        let bars = chart
            .bars
            .iter()
            .map(|slot| {
                let value = record.and_then(|r| r.percentile(slot.metric));
                let mainline_y = value.map(|v| self.bars.y(v));
                let value_y = value.zip(mainline_y).map(|(v, y)| {
                    if v < BAR_LABEL_FLIP {
                        y - BAR_LABEL_OFFSET
                    } else {
                        y + BAR_LABEL_OFFSET
                    }
                });
                let value_text = match (record, value) {
                    (None, _) => String::new(),
                    (Some(_), None) => NOT_APPLICABLE.to_string(),
                    (Some(_), Some(v)) => v.to_string(),
                };
                BarView {
                    label: slot.label.clone(),
                    value,
                    mainline_y,
                    value_text,
                    value_y,
                    box_plot: None,
                }
            })
            .collect();

        model.residue_panel = ResiduePanel {
            checkboxes,
            bars,
            box_plots_visible: record.is_some(),
        };
    }

    fn set_ranges(&self, model: &mut ChartModel, state: &ViewState) {
        let ranges = self.ranges.for_model(state.model);
        for (i, bar) in model.residue_panel.bars.iter_mut().enumerate() {
            bar.box_plot = ranges.get(i).copied().flatten().map(|r| self.bars.box_plot(&r));
        }
    }

    fn set_summary(&self, model: &mut ChartModel, state: &ViewState) {
        let chain = self.dataset.chain_id(state.chain).unwrap_or(NOT_APPLICABLE);
        model.summary = match self.record(state) {
            Some(r) => format!("Chain {}, Residue {} ({})", chain, r.seqnum, r.code),
            None => format!("Chain {}, Residue {} ({})", chain, NOT_APPLICABLE, NOT_APPLICABLE),
        };
    }

    fn set_floating_label(&self, model: &mut ChartModel, state: &ViewState) {
        let Some(metric) = state.hovered_metric else {
            model.floating_label.top.clear();
            model.floating_label.bottom.clear();
            model.floating_label.visible = false;
            return;
        };

        let record = self.record(state);
        let absolute = record.and_then(|r| r.absolute(metric));
        let (top, bottom) = match absolute {
            Some(v) => {
                let pct = record
                    .and_then(|r| r.percentile(metric))
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| NOT_APPLICABLE.to_string());
                (display_round(v).to_string(), format!("({}%)", pct))
            }
            None => (NOT_APPLICABLE.to_string(), NOT_APPLICABLE.to_string()),
        };

        let anchor = model
            .radar
            .points
            .get(metric)
            .map(|p| p.position)
            .unwrap_or(self.radar.geometry.center);
        model.floating_label = FloatingLabel {
            top,
            bottom,
            position: Point::new(anchor.x.trunc(), anchor.y.trunc() - LABEL_OFFSET),
            visible: true,
        };
    }

    fn set_layout(&self, model: &mut ChartModel, state: &ViewState) {
        let layout = &self.config.layout;
        let [chain, residue] = if state.zoomed {
            layout.zoomed_columns
        } else {
            layout.columns
        };
        model.layout = LayoutView {
            zoomed: state.zoomed,
            chain_column: format!("col-lg-{}", chain),
            residue_column: format!("col-lg-{}", residue),
            toggle_glyph: if state.zoomed { COLLAPSE_GLYPH } else { EXPAND_GLYPH }.to_string(),
        };
    }
}
