//! Precomputed per-model/chain/residue metric dataset
//!
//! The dataset is produced by the report generator and is read-only here.
//! Residue positions are aligned across models: position `i` of a chain refers
//! to the same residue in every model, and a model that lacks the residue
//! stores `null` at that position.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Metric values for one residue in one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidueRecord {
    /// Three-letter residue code
    pub code: String,
    /// Sequence number from the structure file
    pub seqnum: i32,
    /// Raw metric values
    pub absolute: Vec<Option<f64>>,
    /// Metric values normalised to the 0-100 percentile scale
    pub percentiles: Vec<Option<f64>>,
    /// Discrete classification codes (0 unfavoured, 1 allowed, 2 favoured)
    pub discrete: Vec<Option<u8>>,
    /// Clash marker, when the generator ran the clash check
    #[serde(default)]
    pub marker: Option<bool>,
}

impl ResidueRecord {
    pub fn absolute(&self, metric: usize) -> Option<f64> {
        self.absolute.get(metric).copied().flatten()
    }

    pub fn percentile(&self, metric: usize) -> Option<f64> {
        self.percentiles.get(metric).copied().flatten()
    }

    pub fn discrete(&self, metric: usize) -> Option<u8> {
        self.discrete.get(metric).copied().flatten()
    }
}

/// One chain of one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainData {
    pub chain_id: String,
    pub residues: Vec<Option<ResidueRecord>>,
}

/// One model version (e.g. previous / latest refinement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub label: Option<String>,
    pub chains: Vec<ChainData>,
}

/// The full `[model][chain][residue]` dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub metric_names: Vec<String>,
    pub models: Vec<ModelData>,
}

impl Dataset {
    /// Load a dataset from JSON, transparently decompressing `.gz` files
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open dataset: {}", path.display()))?;

        let is_gzip = path.extension().map(|e| e == "gz").unwrap_or(false);
        let mut reader: Box<dyn Read> = if is_gzip {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

        let dataset = Self::from_json_str(&content).with_context(|| format!("Invalid dataset: {}", path.display()))?;
        log::info!(
            "Dataset loaded: {} models, {} chains, {} metrics",
            dataset.num_models(),
            dataset.num_chains(),
            dataset.num_metrics()
        );
        Ok(dataset)
    }

    /// Parse and validate a dataset from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json).context("Failed to parse dataset JSON")?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Check the shape the view relies on
    pub fn validate(&self) -> Result<()> {
        if self.metric_names.is_empty() {
            anyhow::bail!("Dataset defines no metrics");
        }
        let Some(first) = self.models.first() else {
            anyhow::bail!("Dataset contains no models");
        };
        if first.chains.is_empty() {
            anyhow::bail!("Dataset contains no chains");
        }

        let num_metrics = self.metric_names.len();
        for (model_id, model) in self.models.iter().enumerate() {
            if model.chains.len() != first.chains.len() {
                anyhow::bail!(
                    "Model {} has {} chains, expected {}",
                    model_id,
                    model.chains.len(),
                    first.chains.len()
                );
            }
            for (chain_id, chain) in model.chains.iter().enumerate() {
                let expected = first.chains[chain_id].residues.len();
                if chain.residues.is_empty() {
                    anyhow::bail!("Chain {} of model {} has no residues", chain.chain_id, model_id);
                }
                if chain.residues.len() != expected {
                    anyhow::bail!(
                        "Chain {} of model {} has {} residue positions, expected {}",
                        chain.chain_id,
                        model_id,
                        chain.residues.len(),
                        expected
                    );
                }
                for (residue_id, residue) in chain.residues.iter().enumerate() {
                    let Some(residue) = residue else { continue };
                    if residue.absolute.len() != num_metrics
                        || residue.percentiles.len() != num_metrics
                        || residue.discrete.len() != num_metrics
                    {
                        anyhow::bail!(
                            "Residue {} of chain {} (model {}) does not carry {} metric values",
                            residue_id,
                            chain.chain_id,
                            model_id,
                            num_metrics
                        );
                    }
                    if let Some(code) = residue.discrete.iter().flatten().find(|&&c| c > 2) {
                        anyhow::bail!(
                            "Residue {} of chain {} (model {}) has discrete code {}, expected 0-2",
                            residue_id,
                            chain.chain_id,
                            model_id,
                            code
                        );
                    }
                    if let Some(p) = residue
                        .percentiles
                        .iter()
                        .flatten()
                        .find(|p| !(0.0..=100.0).contains(*p))
                    {
                        anyhow::bail!(
                            "Residue {} of chain {} (model {}) has percentile {} outside 0-100",
                            residue_id,
                            chain.chain_id,
                            model_id,
                            p
                        );
                    }
                }
            }
        }
        Ok(())
    }

    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    pub fn num_chains(&self) -> usize {
        self.models.first().map(|m| m.chains.len()).unwrap_or(0)
    }

    pub fn num_metrics(&self) -> usize {
        self.metric_names.len()
    }

    /// Number of aligned residue positions in a chain
    pub fn chain_len(&self, chain: usize) -> usize {
        self.models
            .first()
            .and_then(|m| m.chains.get(chain))
            .map(|c| c.residues.len())
            .unwrap_or(0)
    }

    pub fn chain_lengths(&self) -> Vec<usize> {
        (0..self.num_chains()).map(|c| self.chain_len(c)).collect()
    }

    /// Chain identifier as written in the structure (taken from the latest model)
    pub fn chain_id(&self, chain: usize) -> Option<&str> {
        self.models
            .last()
            .and_then(|m| m.chains.get(chain))
            .map(|c| c.chain_id.as_str())
    }

    pub fn residue(&self, model: usize, chain: usize, residue: usize) -> Option<&ResidueRecord> {
        self.models
            .get(model)?
            .chains
            .get(chain)?
            .residues
            .get(residue)?
            .as_ref()
    }

    pub fn has_data(&self, model: usize, chain: usize, residue: usize) -> bool {
        self.residue(model, chain, residue).is_some()
    }

    /// Residues of one chain in one model, aligned positions
    pub fn chain_residues(&self, model: usize, chain: usize) -> &[Option<ResidueRecord>] {
        self.models
            .get(model)
            .and_then(|m| m.chains.get(chain))
            .map(|c| c.residues.as_slice())
            .unwrap_or(&[])
    }

    /// All present percentile values of a metric across every chain of a model
    pub fn percentile_values(&self, model: usize, metric: usize) -> Vec<f64> {
        self.models
            .get(model)
            .map(|m| {
                m.chains
                    .iter()
                    .flat_map(|c| c.residues.iter().flatten())
                    .filter_map(|r| r.percentile(metric))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn record(code: &str, seqnum: i32, percentiles: [Option<f64>; 3], rama: Option<u8>) -> ResidueRecord {
        ResidueRecord {
            code: code.to_string(),
            seqnum,
            absolute: percentiles.iter().map(|p| p.map(|v| v / 10.0)).collect(),
            percentiles: percentiles.to_vec(),
            discrete: vec![rama, None, None],
            marker: Some(false),
        }
    }

    /// Two models, chain A with four aligned positions, chain B with one.
    ///
    /// Model 0 lacks chain A position 1; model 1 lacks chain A position 3.
    pub(crate) fn sample_dataset() -> Dataset {
        let previous = ModelData {
            label: Some("previous".to_string()),
            chains: vec![
                ChainData {
                    chain_id: "A".to_string(),
                    residues: vec![
                        Some(record("ALA", 1, [Some(20.0), Some(30.0), Some(40.0)], Some(2))),
                        None,
                        Some(record("GLY", 3, [Some(60.0), Some(70.0), Some(80.0)], Some(0))),
                        Some(record("SER", 4, [Some(5.0), Some(50.0), None], Some(1))),
                    ],
                },
                ChainData {
                    chain_id: "B".to_string(),
                    residues: vec![Some(record("LYS", 10, [Some(45.0), None, Some(55.0)], None))],
                },
            ],
        };
        let mut latest_a3 = record("GLY", 3, [Some(90.0), Some(8.5), Some(75.0)], Some(2));
        latest_a3.marker = Some(true);
        let latest = ModelData {
            label: Some("latest".to_string()),
            chains: vec![
                ChainData {
                    chain_id: "A".to_string(),
                    residues: vec![
                        Some(record("ALA", 1, [Some(10.0), Some(20.0), Some(30.0)], Some(0))),
                        Some(record("VAL", 2, [Some(50.0), Some(60.0), None], Some(1))),
                        Some(latest_a3),
                        None,
                    ],
                },
                ChainData {
                    chain_id: "B".to_string(),
                    residues: vec![Some(record("LYS", 10, [None, Some(40.0), Some(65.0)], None))],
                },
            ],
        };
        Dataset {
            metric_names: vec!["Rama".to_string(), "Avg B".to_string(), "SC Fit".to_string()],
            models: vec![previous, latest],
        }
    }

    #[test]
    fn test_sample_is_valid() {
        let dataset = sample_dataset();
        dataset.validate().unwrap();
        assert_eq!(dataset.num_models(), 2);
        assert_eq!(dataset.chain_lengths(), vec![4, 1]);
        assert_eq!(dataset.chain_id(1), Some("B"));
        assert!(!dataset.has_data(0, 0, 1));
        assert!(!dataset.has_data(1, 0, 3));
        assert!(dataset.residue(5, 0, 0).is_none());
    }

    #[test]
    fn test_percentile_values_skip_absent() {
        let dataset = sample_dataset();
        let mut values = dataset.percentile_values(1, 0);
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values, vec![10.0, 50.0, 90.0]);
        assert_eq!(dataset.percentile_values(0, 2), vec![40.0, 80.0, 55.0]);
    }

    #[test]
    fn test_validate_rejects_ragged_chains() {
        let mut dataset = sample_dataset();
        dataset.models[1].chains[0].residues.pop();
        let err = dataset.validate().unwrap_err();
        assert!(err.to_string().contains("residue positions"));
    }

    #[test]
    fn test_validate_rejects_bad_codes() {
        let mut dataset = sample_dataset();
        if let Some(r) = dataset.models[0].chains[0].residues[0].as_mut() {
            r.discrete[0] = Some(3);
        }
        assert!(dataset.validate().is_err());

        let mut dataset = sample_dataset();
        if let Some(r) = dataset.models[0].chains[0].residues[0].as_mut() {
            r.percentiles[1] = Some(120.0);
        }
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_parse_json_with_nulls() {
        let json = r#"{
            "metric_names": ["Rama"],
            "models": [{
                "chains": [{
                    "chain_id": "A",
                    "residues": [
                        {"code": "ALA", "seqnum": 1, "absolute": [0.5], "percentiles": [42.0], "discrete": [2]},
                        null
                    ]
                }]
            }]
        }"#;
        let dataset = Dataset::from_json_str(json).unwrap();
        assert_eq!(dataset.chain_len(0), 2);
        let residue = dataset.residue(0, 0, 0).unwrap();
        assert_eq!(residue.percentile(0), Some(42.0));
        assert_eq!(residue.marker, None);
        assert!(dataset.residue(0, 0, 1).is_none());
    }

    #[test]
    fn test_load_plain_and_gzip() {
        let dataset = sample_dataset();
        let json = serde_json::to_string(&dataset).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("data.json");
        std::fs::write(&plain, &json).unwrap();
        let loaded = Dataset::load(&plain).unwrap();
        assert_eq!(loaded.chain_lengths(), vec![4, 1]);

        let gz = dir.path().join("data.json.gz");
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(json.as_bytes()).unwrap();
        std::fs::write(&gz, encoder.finish().unwrap()).unwrap();
        let loaded = Dataset::load(&gz).unwrap();
        assert_eq!(loaded.residue(1, 0, 2).map(|r| r.seqnum), Some(3));
    }
}
