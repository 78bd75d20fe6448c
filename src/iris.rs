//! Static geometry of a per-chain iris chart
//!
//! One segment per aligned residue position, one concentric ring per metric.
//! Everything that differs between model versions (continuous polylines,
//! discrete segments, missing-data shade, clash markers) is built once per
//! version so the view can switch versions by toggling which one is shown.

use crate::config::{ChartConfig, IrisConfig, RingKind, RingSpec};
use crate::dataset::Dataset;
use crate::geometry::{coords_from_angle, CanvasGeometry, Point, RingLayout};
use crate::palette::Rgb;
use crate::stats::mean;
use anyhow::Result;
use serde::Serialize;

/// Decimal places kept in emitted coordinates
const COORD_DECIMALS: i32 = 1;

/// A coloured quad on a discrete ring
#[derive(Debug, Clone, Serialize)]
pub struct DiscreteSegment {
    pub points: [Point; 4],
    pub color: Rgb,
    pub opacity: f64,
}

/// What a ring draws
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RingShape {
    /// Closed polyline per version (data points followed by the baseline walked back)
    Continuous { polylines: Vec<Vec<Point>> },
    /// One segment per residue, per version
    Discrete { segments: Vec<Vec<DiscreteSegment>> },
}

#[derive(Debug, Clone, Serialize)]
pub struct RingGeometry {
    pub name: String,
    pub metric: usize,
    pub base_radius: f64,
    pub shape: RingShape,
}

/// Everything drawn for one chain
#[derive(Debug, Clone, Serialize)]
pub struct IrisChart {
    pub chain: usize,
    pub chain_id: String,
    pub num_segments: usize,
    pub num_versions: usize,
    pub center: Point,
    pub full_radius: f64,
    pub division: f64,
    pub gap_degrees: f64,
    pub rings: Vec<RingGeometry>,
    /// Per version, a wedge for every residue the version lacks
    pub shade: Vec<Vec<[Point; 3]>>,
    pub shade_color: Rgb,
    /// Per version, a cross (two lines) for every flagged residue
    pub markers: Vec<Vec<[[Point; 2]; 2]>>,
    pub marker_color: Rgb,
    /// Pointer targets, one wedge per residue
    pub interaction_segments: Vec<[Point; 3]>,
    /// Selector polygon drawn at residue 0; rotated to follow the selection
    pub selector: Vec<Point>,
}

/// Shared sizes for one chart
struct Frame {
    geometry: CanvasGeometry,
    layout: RingLayout,
    full_radius: f64,
    division: f64,
    /// (tick size, label size)
    sizes: (f64, f64),
}

impl Frame {
    fn new(config: &IrisConfig, segments: usize) -> Self {
        let geometry = CanvasGeometry::new(config.canvas[0], config.canvas[1]);
        let min = geometry.min_side();
        let full_radius = geometry.full_radius.floor();
        Self {
            geometry,
            layout: RingLayout::with_gap_degrees(segments, config.gap_degrees),
            full_radius,
            division: (full_radius / (config.rings.len() + 2) as f64).floor(),
            sizes: ((min / 100.0).floor(), (min / 60.0).floor()),
        }
    }

    fn at(&self, index: f64, radius: f64) -> Point {
        self.layout.place(self.geometry.center, index, radius).rounded(COORD_DECIMALS)
    }

    fn at_angle(&self, angle: f64, radius: f64) -> Point {
        coords_from_angle(self.geometry.center, angle + self.layout.gap / 2.0, radius, Point::ORIGIN)
            .rounded(COORD_DECIMALS)
    }

    fn ring_radius(&self, ring: usize) -> f64 {
        (ring + 2) as f64 * self.division
    }
}

impl IrisChart {
    /// Build the chart for one chain
    pub fn build(dataset: &Dataset, chain: usize, config: &ChartConfig) -> Result<Self> {
        if chain >= dataset.num_chains() {
            anyhow::bail!("Chain {} out of range ({} chains)", chain, dataset.num_chains());
        }

        let iris = &config.iris;
        let num_segments = dataset.chain_len(chain);
        let num_versions = dataset.num_models();
        let frame = Frame::new(iris, num_segments);

        log::debug!(
            "Building iris chart for chain {}: {} segments, {} versions, {} rings",
            chain,
            num_segments,
            num_versions,
            iris.rings.len()
        );

        let rings: Vec<RingGeometry> = iris
            .rings
            .iter()
            .enumerate()
            .map(|(ring_id, ring)| {
                let base_radius = frame.ring_radius(ring_id);
                let shape = match ring.kind {
                    RingKind::Continuous => RingShape::Continuous {
                        polylines: continuous_polylines(dataset, chain, ring, iris, &frame, base_radius),
                    },
                    RingKind::Discrete => RingShape::Discrete {
                        segments: discrete_segments(dataset, chain, ring, iris, &frame, base_radius),
                    },
                };
                RingGeometry {
                    name: ring.name.clone(),
                    metric: ring.metric,
                    base_radius,
                    shape,
                }
            })
            .collect();

        let outer = frame.full_radius + 5.0;
        let center = frame.geometry.center;

        let shade: Vec<Vec<[Point; 3]>> = (0..num_versions)
            .map(|version| {
                if !iris.shade_enabled {
                    return Vec::new();
                }
                dataset
                    .chain_residues(version, chain)
                    .iter()
                    .enumerate()
                    .filter(|(_, residue)| residue.is_none())
                    .map(|(i, _)| [center, frame.at(i as f64, outer), frame.at(i as f64 + 1.0, outer)])
                    .collect()
            })
            .collect();

        let tick = frame.sizes.0;
        let markers: Vec<Vec<[[Point; 2]; 2]>> = (0..num_versions)
            .map(|version| {
                if !iris.markers_enabled {
                    return Vec::new();
                }
                dataset
                    .chain_residues(version, chain)
                    .iter()
                    .enumerate()
                    .filter(|(_, residue)| matches!(residue, Some(r) if r.marker == Some(true)))
                    .map(|(i, _)| {
                        let i = i as f64;
                        let near = frame.full_radius - tick * 0.1;
                        let far = frame.full_radius - tick * 0.9;
                        [
                            [frame.at(i + 0.2, near), frame.at(i + 0.8, far)],
                            [frame.at(i + 0.2, far), frame.at(i + 0.8, near)],
                        ]
                    })
                    .collect()
            })
            .collect();

        let interaction_segments: Vec<[Point; 3]> = (0..num_segments)
            .map(|i| [center, frame.at(i as f64, outer), frame.at(i as f64 + 1.0, outer)])
            .collect();

        let label = frame.sizes.1;
        let mid = frame.layout.angle_delta() * 0.5;
        let selector = vec![
            frame.at_angle(mid, frame.full_radius - 1.5 * label),
            frame.at_angle(mid - 0.02, frame.full_radius - 0.5 * label),
            frame.at_angle(mid - 0.02, outer),
            frame.at_angle(mid + 0.02, outer),
            frame.at_angle(mid + 0.02, frame.full_radius - 0.5 * label),
        ];

        Ok(Self {
            chain,
            chain_id: dataset.chain_id(chain).unwrap_or_default().to_string(),
            num_segments,
            num_versions,
            center,
            full_radius: frame.full_radius,
            division: frame.division,
            gap_degrees: iris.gap_degrees,
            rings,
            shade,
            shade_color: iris.shade_color,
            markers,
            marker_color: iris.marker_color,
            interaction_segments,
            selector,
        })
    }

    /// Build charts for every chain
    pub fn build_all(dataset: &Dataset, config: &ChartConfig) -> Result<Vec<Self>> {
        (0..dataset.num_chains())
            .map(|chain| Self::build(dataset, chain, config))
            .collect()
    }
}

/// Signed, polarity-corrected values `[segment][version]` for one ring
fn ring_values(dataset: &Dataset, chain: usize, ring: &RingSpec) -> Vec<Vec<Option<f64>>> {
    (0..dataset.chain_len(chain))
        .map(|segment| {
            (0..dataset.num_models())
                .map(|version| {
                    dataset
                        .residue(version, chain, segment)
                        .and_then(|r| r.absolute(ring.metric))
                        .map(|v| v * ring.polarity)
                })
                .collect()
        })
        .collect()
}

/// Scale each value's deviation from the ring average onto `[axis_min, axis_max]`.
///
/// Deviations are shifted by the average negative deviation of the latest
/// version, so a typical below-average residue of the latest model sits on
/// the baseline.
fn plot_magnitudes(values: &[Vec<Option<f64>>], axis_min: f64, axis_max: f64) -> Vec<Vec<Option<f64>>> {
    let present: Vec<f64> = values.iter().flatten().flatten().copied().collect();
    let Some(average) = mean(&present) else {
        return values.iter().map(|set| vec![None; set.len()]).collect();
    };

    let latest_negative: Vec<f64> = values
        .iter()
        .filter_map(|set| set.last().copied().flatten())
        .map(|v| v - average)
        .filter(|delta| *delta < 0.0)
        .collect();
    let avg_negative = mean(&latest_negative).unwrap_or(0.0);

    let magnitudes: Vec<Vec<Option<f64>>> = values
        .iter()
        .map(|set| set.iter().map(|v| v.map(|v| v - average - avg_negative)).collect())
        .collect();

    let all: Vec<f64> = magnitudes.iter().flatten().flatten().copied().collect();
    let min = all.iter().copied().fold(0.0_f64, f64::min);
    let max = all.iter().copied().fold(0.0_f64, f64::max);

    magnitudes
        .iter()
        .map(|set| {
            set.iter()
                .map(|m| {
                    m.map(|m| {
                        if m > 0.0 && max != 0.0 {
                            m / max * axis_max
                        } else if m < 0.0 && min != 0.0 {
                            m / min * axis_min
                        } else {
                            0.0
                        }
                    })
                })
                .collect()
        })
        .collect()
}

fn continuous_polylines(
    dataset: &Dataset,
    chain: usize,
    ring: &RingSpec,
    iris: &IrisConfig,
    frame: &Frame,
    base_radius: f64,
) -> Vec<Vec<Point>> {
    let plots = plot_magnitudes(&ring_values(dataset, chain, ring), iris.axis_min, iris.axis_max);

    let segments = frame.layout.segments as f64;
    let resolution = iris.baseline_resolution;
    let baseline: Vec<Point> = (0..=resolution)
        .map(|i| frame.at((resolution - i) as f64 * segments / resolution as f64, base_radius))
        .collect();

    (0..dataset.num_models())
        .map(|version| {
            let mut points = Vec::with_capacity(plots.len() + baseline.len() + 1);
            points.push(frame.at(0.5, base_radius));
            for (segment, set) in plots.iter().enumerate() {
                let radius = match set[version] {
                    Some(plot) => base_radius + frame.division * plot,
                    None => base_radius,
                };
                points.push(frame.at(segment as f64 + 0.5, radius));
            }
            points.extend_from_slice(&baseline);
            points
        })
        .collect()
}

fn discrete_segments(
    dataset: &Dataset,
    chain: usize,
    ring: &RingSpec,
    iris: &IrisConfig,
    frame: &Frame,
    base_radius: f64,
) -> Vec<Vec<DiscreteSegment>> {
    let half_width = frame.sizes.0;
    let fallback = iris.discrete_colors[2];

    (0..dataset.num_models())
        .map(|version| {
            (0..dataset.chain_len(chain))
                .map(|segment| {
                    let color = dataset
                        .residue(version, chain, segment)
                        .and_then(|r| r.discrete(ring.metric))
                        .map(|code| iris.discrete_colors[usize::from(code.min(2))])
                        .unwrap_or(fallback);
                    let i = segment as f64;
                    DiscreteSegment {
                        points: [
                            frame.at(i, base_radius - half_width),
                            frame.at(i, base_radius + half_width),
                            frame.at(i + 1.0, base_radius + half_width),
                            frame.at(i + 1.0, base_radius - half_width),
                        ],
                        color,
                        opacity: if color == fallback { 0.5 } else { 1.0 },
                    }
                })
                .collect()
        })
        .collect()
}
