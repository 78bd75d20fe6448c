//! Descriptive statistics for box-plot ranges

use crate::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n, not n-1).
pub fn standard_deviation(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Linear-interpolation percentile, `p` in [0, 1].
///
/// Sorts a copy numerically, then interpolates between the elements either
/// side of the fractional index `(n - 1) * p`.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let p = p.clamp(0.0, 1.0);
    let pos = (sorted.len() - 1) as f64 * p;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;

    match sorted.get(base + 1) {
        Some(next) => Some(sorted[base] + rest * (next - sorted[base])),
        None => Some(sorted[base]),
    }
}

/// How the box-plot whiskers are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WhiskerMode {
    /// Observed minimum and maximum
    #[default]
    Extremes,
    /// 5th and 95th percentiles
    Percentiles,
    /// Mean ± 2σ, clamped to [0, 100]
    TwoSigma,
}

/// Summary drawn as a box plot behind a percentile bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub mean: f64,
    /// max(0, mean - σ)
    pub low: f64,
    /// min(100, mean + σ)
    pub high: f64,
    pub min: f64,
    pub max: f64,
}

impl RangeSummary {
    /// Summarise a series of percentile values. `None` when the series is empty.
    pub fn from_values(values: &[f64], whiskers: WhiskerMode) -> Option<Self> {
        let mean = mean(values)?;
        let std = standard_deviation(values)?;

        let (min, max) = match whiskers {
            WhiskerMode::Extremes => (
                values.iter().copied().fold(f64::INFINITY, f64::min),
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ),
            WhiskerMode::Percentiles => (percentile(values, 0.05)?, percentile(values, 0.95)?),
            WhiskerMode::TwoSigma => ((mean - 2.0 * std).max(0.0), (mean + 2.0 * std).min(100.0)),
        };

        Some(Self {
            mean,
            low: (mean - std).max(0.0),
            high: (mean + std).min(100.0),
            min,
            max,
        })
    }

    /// Whether the lower σ line sits inside the whisker range
    pub fn low_visible(&self) -> bool {
        self.low > self.min
    }

    /// Whether the upper σ line sits inside the whisker range
    pub fn high_visible(&self) -> bool {
        self.high < self.max
    }
}

/// Range summaries for every model × bar series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeTable {
    /// Metric index of each series
    pub series: Vec<usize>,
    /// `[model][series]`, `None` when the model has no value for that metric
    pub by_model: Vec<Vec<Option<RangeSummary>>>,
}

impl RangeTable {
    /// Gather percentile values per model over all chains and residues.
    /// Absent residues and absent values are skipped, never counted as 0.
    pub fn compute(dataset: &Dataset, series: &[usize], whiskers: WhiskerMode) -> Self {
        let by_model = (0..dataset.num_models())
            .map(|model| {
                series
                    .iter()
                    .map(|&metric| {
                        let values = dataset.percentile_values(model, metric);
                        log::debug!(
                            "model {} metric {}: {} values for range summary",
                            model,
                            metric,
                            values.len()
                        );
                        RangeSummary::from_values(&values, whiskers)
                    })
                    .collect()
            })
            .collect();

        Self {
            series: series.to_vec(),
            by_model,
        }
    }

    /// Summaries for one model, in series order
    pub fn for_model(&self, model: usize) -> &[Option<RangeSummary>] {
        self.by_model.get(model).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample_dataset;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_standard_deviation_is_population() {
        assert_eq!(standard_deviation(&[2.0, 2.0, 2.0]), Some(0.0));
        // Sample σ would be sqrt(2) ~ 1.414; population σ is 1.0
        let sd = standard_deviation(&[1.0, 2.0, 3.0, 2.0, 1.0, 3.0]).unwrap();
        assert!(close(sd, (4.0_f64 / 6.0).sqrt()));
        assert_eq!(standard_deviation(&[]), None);
    }

    #[test]
    fn test_percentile() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), Some(3.0));
        assert_eq!(percentile(&[1.0, 2.0], 0.5), Some(1.5));
        assert_eq!(percentile(&[7.0], 0.9), Some(7.0));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn test_percentile_sorts_numerically() {
        // Lexicographic order would be [10, 100, 9]
        assert_eq!(percentile(&[10.0, 9.0, 100.0], 0.5), Some(10.0));
        assert_eq!(percentile(&[10.0, 9.0, 100.0], 1.0), Some(100.0));
        assert_eq!(percentile(&[10.0, 9.0, 100.0], 0.0), Some(9.0));
    }

    #[test]
    fn test_range_summary_clamps_sigma_band() {
        let summary = RangeSummary::from_values(&[0.0, 0.0, 100.0, 100.0], WhiskerMode::Extremes).unwrap();
        assert!(close(summary.mean, 50.0));
        assert!(close(summary.low, 0.0));
        assert!(close(summary.high, 100.0));
        assert!(close(summary.min, 0.0));
        assert!(close(summary.max, 100.0));
        assert!(!summary.low_visible());
        assert!(!summary.high_visible());

        let summary = RangeSummary::from_values(&[10.0, 50.0, 90.0], WhiskerMode::Extremes).unwrap();
        assert!(summary.low_visible());
        assert!(summary.high_visible());
    }

    #[test]
    fn test_range_summary_whisker_modes() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let p = RangeSummary::from_values(&values, WhiskerMode::Percentiles).unwrap();
        assert!(close(p.min, 5.0));
        assert!(close(p.max, 95.0));

        let t = RangeSummary::from_values(&[40.0, 60.0], WhiskerMode::TwoSigma).unwrap();
        assert!(close(t.min, 30.0));
        assert!(close(t.max, 70.0));

        assert!(RangeSummary::from_values(&[], WhiskerMode::Extremes).is_none());
    }

    #[test]
    fn test_range_table_skips_missing() {
        let dataset = sample_dataset();
        let table = RangeTable::compute(&dataset, &[0, 1], WhiskerMode::Extremes);
        assert_eq!(table.by_model.len(), 2);

        // Model 1 metric 0: percentiles 10, 50, 90 (residue 3 absent, chain B residue has None)
        let latest = table.for_model(1)[0].unwrap();
        assert!(close(latest.mean, 50.0));
        assert!(close(latest.min, 10.0));
        assert!(close(latest.max, 90.0));

        assert!(table.for_model(7).is_empty());
    }
}
