//! Selection state machine
//!
//! The whole interactive state is one `ViewState` value. Every UI event is an
//! `Event` applied against the dataset; the returned `Redraw` tells the view
//! which parts of the chart model are stale.

use crate::dataset::Dataset;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub model: usize,
    pub chain: usize,
    pub residue: usize,
    /// Pointer held down over the chart
    pub dragging: bool,
    /// Iris panel widened
    pub zoomed: bool,
    /// Radar axis under the pointer
    pub hovered_metric: Option<usize>,
}

impl ViewState {
    /// Latest model, first chain, first residue
    pub fn new(dataset: &Dataset) -> Self {
        Self {
            model: dataset.num_models().saturating_sub(1),
            chain: 0,
            residue: 0,
            dragging: false,
            zoomed: false,
            hovered_metric: None,
        }
    }
}

/// A user interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    SelectChain(usize),
    SelectModel(usize),
    /// Step to the next model, wrapping
    ToggleModel,
    PointerDown(usize),
    PointerOver(usize),
    PointerUp,
    ToggleFullscreen,
    RadarHover(usize),
    RadarLeave,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::SelectChain(c) => write!(f, "select_chain({})", c),
            Event::SelectModel(m) => write!(f, "select_model({})", m),
            Event::ToggleModel => write!(f, "toggle_model"),
            Event::PointerDown(r) => write!(f, "pointer_down({})", r),
            Event::PointerOver(r) => write!(f, "pointer_over({})", r),
            Event::PointerUp => write!(f, "pointer_up"),
            Event::ToggleFullscreen => write!(f, "toggle_fullscreen"),
            Event::RadarHover(m) => write!(f, "radar_hover({})", m),
            Event::RadarLeave => write!(f, "radar_leave"),
        }
    }
}

/// Parse a YAML event script: a list of `- select_chain: 1` or `- toggle_model` items.
/// An empty document is an empty script.
pub fn parse_script(yaml: &str) -> Result<Vec<Event>> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let events: Option<Vec<Event>> =
        serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(yaml))?;
    Ok(events.unwrap_or_default())
}

/// Load an event script from a YAML file
pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Vec<Event>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event script: {}", path.display()))?;
    parse_script(&content).with_context(|| format!("Failed to parse event script: {}", path.display()))
}

/// Parts of the chart model invalidated by a transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Redraw {
    /// Which chain chart is shown
    pub chain: bool,
    /// Active version of every chain chart
    pub versions: bool,
    pub selector: bool,
    /// Radar, residue panel and summary
    pub residue: bool,
    /// Box plot ranges
    pub ranges: bool,
    pub layout: bool,
    pub radar_label: bool,
}

impl Redraw {
    pub fn all() -> Self {
        Self {
            chain: true,
            versions: true,
            selector: true,
            residue: true,
            ranges: true,
            layout: true,
            radar_label: true,
        }
    }

    fn selection() -> Self {
        Self {
            selector: true,
            residue: true,
            radar_label: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ViewState {
    /// Apply one event, returning what needs redrawing
    pub fn apply(&mut self, event: Event, dataset: &Dataset) -> Result<Redraw> {
        debug!("Applying {} to {:?}", event, self);
        match event {
            Event::SelectChain(chain) => {
                if chain >= dataset.num_chains() {
                    anyhow::bail!("Chain {} out of range ({} chains)", chain, dataset.num_chains());
                }
                self.chain = chain;
                self.dragging = false;
                self.residue = 0;
                Ok(Redraw {
                    chain: true,
                    ..Redraw::selection()
                })
            }
            Event::SelectModel(model) => {
                if model >= dataset.num_models() {
                    anyhow::bail!("Model {} out of range ({} models)", model, dataset.num_models());
                }
                self.switch_model(model, dataset);
                Ok(Self::model_redraw())
            }
            Event::ToggleModel => {
                let models = dataset.num_models();
                if models == 0 {
                    anyhow::bail!("Dataset has no models");
                }
                if models == 1 {
                    debug!("Only one model, toggle ignored");
                    return Ok(Redraw::default());
                }
                self.switch_model((self.model + 1) % models, dataset);
                Ok(Self::model_redraw())
            }
            Event::PointerDown(residue) => {
                self.check_residue(residue, dataset)?;
                self.dragging = true;
                self.residue = residue;
                Ok(Redraw::selection())
            }
            Event::PointerOver(residue) => {
                self.check_residue(residue, dataset)?;
                if !self.dragging {
                    return Ok(Redraw::default());
                }
                self.residue = residue;
                Ok(Redraw::selection())
            }
            Event::PointerUp => {
                self.dragging = false;
                Ok(Redraw::default())
            }
            Event::ToggleFullscreen => {
                self.zoomed = !self.zoomed;
                Ok(Redraw {
                    layout: true,
                    ..Redraw::default()
                })
            }
            Event::RadarHover(metric) => {
                if metric >= dataset.num_metrics() {
                    anyhow::bail!("Metric {} out of range ({} metrics)", metric, dataset.num_metrics());
                }
                self.hovered_metric = Some(metric);
                Ok(Redraw {
                    radar_label: true,
                    ..Redraw::default()
                })
            }
            Event::RadarLeave => {
                self.hovered_metric = None;
                Ok(Redraw {
                    radar_label: true,
                    ..Redraw::default()
                })
            }
        }
    }

    fn model_redraw() -> Redraw {
        Redraw {
            versions: true,
            ranges: true,
            ..Redraw::selection()
        }
    }

    fn check_residue(&self, residue: usize, dataset: &Dataset) -> Result<()> {
        let len = dataset.chain_len(self.chain);
        if residue >= len {
            anyhow::bail!(
                "Residue {} out of range for chain {} ({} residues)",
                residue,
                self.chain,
                len
            );
        }
        Ok(())
    }

    /// Switch model and move the residue forward to the first position the
    /// new model has a record for. At most one lap around the chain.
    fn switch_model(&mut self, model: usize, dataset: &Dataset) {
        self.model = model;
        let len = dataset.chain_len(self.chain);
        if len == 0 {
            return;
        }
        let found = (0..len)
            .map(|step| (self.residue + step) % len)
            .find(|&residue| dataset.has_data(model, self.chain, residue));
        match found {
            Some(residue) => {
                if residue != self.residue {
                    debug!(
                        "Model {} has no record at residue {}, moved to {}",
                        model, self.residue, residue
                    );
                }
                self.residue = residue;
            }
            None => warn!(
                "Model {} has no residue data for chain {}, selection left at residue {}",
                model, self.chain, self.residue
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::{record, sample_dataset};

    #[test]
    fn test_initial_state() {
        let state = ViewState::new(&sample_dataset());
        assert_eq!(state.model, 1);
        assert_eq!(state.chain, 0);
        assert_eq!(state.residue, 0);
        assert!(!state.dragging);
        assert!(!state.zoomed);
        assert_eq!(state.hovered_metric, None);
    }

    #[test]
    fn test_toggle_skips_absent_residue() {
        let dataset = sample_dataset();
        let mut state = ViewState::new(&dataset);
        state.residue = 1;
        // Model 0 lacks residue 1 in chain A
        let redraw = state.apply(Event::ToggleModel, &dataset).unwrap();
        assert_eq!(state.model, 0);
        assert_eq!(state.residue, 2);
        assert!(redraw.versions && redraw.ranges && redraw.residue);
    }

    #[test]
    fn test_toggle_wraps_around_chain() {
        let dataset = sample_dataset();
        let mut state = ViewState::new(&dataset);
        state.model = 0;
        state.residue = 3;
        // Model 1 lacks residue 3, the search wraps to 0
        state.apply(Event::ToggleModel, &dataset).unwrap();
        assert_eq!(state.model, 1);
        assert_eq!(state.residue, 0);
    }

    #[test]
    fn test_toggle_terminates_without_data() {
        let mut dataset = sample_dataset();
        for residue in dataset.models[0].chains[0].residues.iter_mut() {
            *residue = None;
        }
        let mut state = ViewState::new(&dataset);
        state.residue = 2;
        state.apply(Event::ToggleModel, &dataset).unwrap();
        assert_eq!(state.model, 0);
        assert_eq!(state.residue, 2);
    }

    #[test]
    fn test_select_model_keeps_present_residue() {
        let dataset = sample_dataset();
        let mut state = ViewState::new(&dataset);
        state.residue = 2;
        state.apply(Event::SelectModel(0), &dataset).unwrap();
        assert_eq!((state.model, state.residue), (0, 2));
        assert!(state.apply(Event::SelectModel(2), &dataset).is_err());
    }

    #[test]
    fn test_select_chain_resets() {
        let dataset = sample_dataset();
        let mut state = ViewState::new(&dataset);
        state.apply(Event::PointerDown(2), &dataset).unwrap();
        let redraw = state.apply(Event::SelectChain(1), &dataset).unwrap();
        assert_eq!(state.chain, 1);
        assert_eq!(state.residue, 0);
        assert!(!state.dragging);
        assert!(redraw.chain && redraw.selector);
        assert!(state.apply(Event::SelectChain(5), &dataset).is_err());
    }

    #[test]
    fn test_drag_selection() {
        let dataset = sample_dataset();
        let mut state = ViewState::new(&dataset);

        // Hover without a press does nothing
        let redraw = state.apply(Event::PointerOver(3), &dataset).unwrap();
        assert!(redraw.is_empty());
        assert_eq!(state.residue, 0);

        state.apply(Event::PointerDown(1), &dataset).unwrap();
        assert!(state.dragging);
        assert_eq!(state.residue, 1);

        state.apply(Event::PointerOver(3), &dataset).unwrap();
        assert_eq!(state.residue, 3);

        state.apply(Event::PointerUp, &dataset).unwrap();
        assert!(!state.dragging);
        state.apply(Event::PointerOver(2), &dataset).unwrap();
        assert_eq!(state.residue, 3);

        assert!(state.apply(Event::PointerDown(4), &dataset).is_err());
    }

    #[test]
    fn test_fullscreen_and_radar_hover() {
        let dataset = sample_dataset();
        let mut state = ViewState::new(&dataset);
        assert!(state.apply(Event::ToggleFullscreen, &dataset).unwrap().layout);
        assert!(state.zoomed);
        state.apply(Event::ToggleFullscreen, &dataset).unwrap();
        assert!(!state.zoomed);

        state.apply(Event::RadarHover(1), &dataset).unwrap();
        assert_eq!(state.hovered_metric, Some(1));
        assert!(state.apply(Event::RadarHover(3), &dataset).is_err());
        state.apply(Event::RadarLeave, &dataset).unwrap();
        assert_eq!(state.hovered_metric, None);
    }

    #[test]
    fn test_toggle_cycles_three_models() {
        let mut dataset = sample_dataset();
        let mut extra = dataset.models[1].clone();
        extra.chains[0].residues[0] = Some(record("ALA", 1, [Some(1.0), None, None], Some(2)));
        dataset.models.push(extra);
        let mut state = ViewState::new(&dataset);
        assert_eq!(state.model, 2);
        state.apply(Event::ToggleModel, &dataset).unwrap();
        assert_eq!(state.model, 0);
        state.apply(Event::ToggleModel, &dataset).unwrap();
        assert_eq!(state.model, 1);
    }

    #[test]
    fn test_toggle_ignored_with_single_model() {
        let mut dataset = sample_dataset();
        dataset.models.remove(0);
        let mut state = ViewState::new(&dataset);
        state.residue = 3;
        let redraw = state.apply(Event::ToggleModel, &dataset).unwrap();
        assert!(redraw.is_empty());
        assert_eq!((state.model, state.residue), (0, 3));
    }

    #[test]
    fn test_event_script_yaml() {
        let yaml = "- select_chain: 1\n- toggle_model\n- pointer_down: 0\n- pointer_over: 2\n- pointer_up\n- radar_hover: 2\n";
        let events = parse_script(yaml).unwrap();
        assert_eq!(
            events,
            vec![
                Event::SelectChain(1),
                Event::ToggleModel,
                Event::PointerDown(0),
                Event::PointerOver(2),
                Event::PointerUp,
                Event::RadarHover(2)
            ]
        );
        assert!(parse_script("").unwrap().is_empty());
        assert!(parse_script("- jump: 3\n").is_err());
    }

    #[test]
    fn test_load_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicks.yaml");
        std::fs::write(&path, "- select_model: 0\n- toggle_fullscreen\n- radar_leave\n").unwrap();
        let events = load_script(&path).unwrap();
        assert_eq!(
            events,
            vec![Event::SelectModel(0), Event::ToggleFullscreen, Event::RadarLeave]
        );
        assert!(load_script(dir.path().join("missing.yaml")).is_err());
    }
}
