//! Colours and traffic-light classification of metric values

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// An sRGB colour, written to attributes as `rgb(r, g, b)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const VL_GREY: Rgb = Rgb(200, 200, 200);
    pub const L_GREY: Rgb = Rgb(150, 150, 150);
    pub const RED: Rgb = Rgb(200, 80, 80);
    pub const VL_RED: Rgb = Rgb(255, 235, 235);
    pub const ORANGE: Rgb = Rgb(250, 200, 50);
    pub const GREEN: Rgb = Rgb(50, 200, 50);
    pub const BAR_RED: Rgb = Rgb(240, 106, 111);
    pub const BAR_ORANGE: Rgb = Rgb(247, 212, 134);
    pub const BAR_GREEN: Rgb = Rgb(90, 237, 141);
    pub const DARK_RED: Rgb = Rgb(200, 50, 50);
    pub const DARK_YELLOW: Rgb = Rgb(200, 200, 50);
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Band a percentile value falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    NoData,
    Low,
    Mid,
    High,
}

/// Two-breakpoint traffic-light scheme over [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficLight {
    /// Values below `breakpoints[0]` are low, below `breakpoints[1]` mid, otherwise high
    pub breakpoints: [f64; 2],
    /// Low, mid and high colours
    pub colors: [Rgb; 3],
    /// Colour for "not applicable"
    pub no_data: Rgb,
}

impl Default for TrafficLight {
    fn default() -> Self {
        Self::quartiles()
    }
}

impl TrafficLight {
    /// Iris report scheme: 25 / 75 with the bar palette
    pub fn quartiles() -> Self {
        Self {
            breakpoints: [25.0, 75.0],
            colors: [Rgb::BAR_RED, Rgb::BAR_ORANGE, Rgb::BAR_GREEN],
            no_data: Rgb::VL_GREY,
        }
    }

    /// Multimetric report scheme: 33 / 67
    pub fn terciles() -> Self {
        Self {
            breakpoints: [33.0, 67.0],
            colors: [Rgb::DARK_RED, Rgb::DARK_YELLOW, Rgb::GREEN],
            no_data: Rgb::VL_GREY,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let [lo, hi] = self.breakpoints;
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) {
            anyhow::bail!("Colour breakpoints must lie within 0-100, got {} and {}", lo, hi);
        }
        if lo > hi {
            anyhow::bail!("Colour breakpoints must be ascending, got {} then {}", lo, hi);
        }
        Ok(())
    }

    pub fn classify(&self, value: Option<f64>) -> Band {
        match value {
            None => Band::NoData,
            Some(v) if v < self.breakpoints[0] => Band::Low,
            Some(v) if v < self.breakpoints[1] => Band::Mid,
            Some(_) => Band::High,
        }
    }

    pub fn band_color(&self, band: Band) -> Rgb {
        match band {
            Band::NoData => self.no_data,
            Band::Low => self.colors[0],
            Band::Mid => self.colors[1],
            Band::High => self.colors[2],
        }
    }

    pub fn color(&self, value: Option<f64>) -> Rgb {
        self.band_color(self.classify(value))
    }
}

/// Categorical classification of a structural property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscreteClass {
    NotApplicable,
    Unfavoured,
    Allowed,
    Favoured,
}

impl DiscreteClass {
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            None => DiscreteClass::NotApplicable,
            Some(0) => DiscreteClass::Unfavoured,
            Some(1) => DiscreteClass::Allowed,
            Some(_) => DiscreteClass::Favoured,
        }
    }

    /// Same colours as the percentile bands, grey when not applicable
    pub fn color(&self, scheme: &TrafficLight) -> Rgb {
        match self {
            DiscreteClass::NotApplicable => scheme.no_data,
            DiscreteClass::Unfavoured => scheme.colors[0],
            DiscreteClass::Allowed => scheme.colors[1],
            DiscreteClass::Favoured => scheme.colors[2],
        }
    }
}

impl std::fmt::Display for DiscreteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscreteClass::NotApplicable => write!(f, "N/A"),
            DiscreteClass::Unfavoured => write!(f, "Unfavoured"),
            DiscreteClass::Allowed => write!(f, "Allowed"),
            DiscreteClass::Favoured => write!(f, "Favoured"),
        }
    }
}
