//! Writing range summaries, chart models and geometry

use crate::dataset::Dataset;
use crate::stats::RangeTable;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One row of the range report
#[derive(Debug, Clone, Serialize)]
pub struct RangeRow {
    pub model: usize,
    pub model_label: String,
    pub metric: usize,
    pub metric_name: String,
    pub mean: Option<f64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Flatten a range table into rows labelled from the dataset
pub fn range_rows(table: &RangeTable, dataset: &Dataset) -> Vec<RangeRow> {
    let mut rows = Vec::new();
    for (model, summaries) in table.by_model.iter().enumerate() {
        let model_label = dataset
            .models
            .get(model)
            .and_then(|m| m.label.clone())
            .unwrap_or_else(|| format!("model_{}", model));
        for (&metric, summary) in table.series.iter().zip(summaries) {
            rows.push(RangeRow {
                model,
                model_label: model_label.clone(),
                metric,
                metric_name: dataset.metric_names.get(metric).cloned().unwrap_or_default(),
                mean: summary.map(|s| s.mean),
                low: summary.map(|s| s.low),
                high: summary.map(|s| s.high),
                min: summary.map(|s| s.min),
                max: summary.map(|s| s.max),
            });
        }
    }
    rows
}

/// Write range summaries (format determined by extension, stdout when no path)
pub fn write_ranges(table: &RangeTable, dataset: &Dataset, path: Option<&Path>, compact: bool) -> Result<()> {
    let rows = range_rows(table, dataset);
    match path {
        None => write_ranges_tsv(&rows, std::io::stdout().lock()),
        Some(path) => {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
            match ext {
                "tsv" | "txt" => {
                    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
                    write_ranges_tsv(&rows, BufWriter::new(file))
                        .with_context(|| format!("Failed to write TSV to {}", path.display()))
                }
                _ => write_json(&rows, Some(path), compact),
            }
        }
    }
}

fn write_ranges_tsv<W: Write>(rows: &[RangeRow], mut writer: W) -> Result<()> {
    writeln!(writer, "model\tlabel\tmetric\tmean\tlow\thigh\tmin\tmax")?;
    let cell = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.model,
            row.model_label,
            row.metric_name,
            cell(row.mean),
            cell(row.low),
            cell(row.high),
            cell(row.min),
            cell(row.max),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write any serializable value as JSON to a file, or stdout when no path
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>, compact: bool) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            let writer = BufWriter::new(file);
            to_writer(writer, value, compact).with_context(|| format!("Failed to write JSON to {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            to_writer(&mut stdout, value, compact)?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

fn to_writer<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T, compact: bool) -> Result<()> {
    if compact {
        serde_json::to_writer(&mut writer, value)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, value)?;
    }
    writer.flush()?;
    Ok(())
}
