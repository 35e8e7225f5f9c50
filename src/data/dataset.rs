//! Indexed dataset of labelled time series

use crate::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One labelled sequence
///
/// `features` has shape `[length, feature_dim]` with no padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Index of the sample in the full dataset
    pub index: usize,
    /// Time steps by features
    pub features: Array2<f32>,
    /// Original class label
    pub label: usize,
}

impl Sample {
    pub fn new(index: usize, features: Array2<f32>, label: usize) -> Self {
        Self { index, features, label }
    }

    /// True (unpadded) sequence length
    pub fn length(&self) -> usize {
        self.features.nrows()
    }
}

/// On-disk sample representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub index: usize,
    pub label: usize,
    /// One inner vector per time step
    pub features: Vec<Vec<f32>>,
}

/// On-disk dataset representation (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    pub feature_dim: usize,
    pub samples: Vec<SampleRecord>,
}

/// Dataset with indexed access to samples sharing one feature width
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    samples: Vec<Sample>,
    feature_dim: usize,
}

impl SequenceDataset {
    /// Build a dataset, rejecting samples whose feature width differs
    ///
    /// Dataset indices must be unique; the trainer and resumed results refer
    /// to samples by index alone.
    pub fn new(samples: Vec<Sample>, feature_dim: usize) -> Result<Self> {
        if let Some(bad) = samples.iter().find(|s| s.features.ncols() != feature_dim) {
            return Err(Error::ShapeMismatch {
                context: format!("dataset sample {}", bad.index),
                expected: vec![bad.length(), feature_dim],
                actual: bad.features.shape().to_vec(),
            });
        }
        let mut seen = HashSet::with_capacity(samples.len());
        if let Some(dup) = samples.iter().find(|s| !seen.insert(s.index)) {
            return Err(Error::DuplicateIndex { index: dup.index });
        }
        Ok(Self { samples, feature_dim })
    }

    /// Load a dataset from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound { path: path.to_path_buf() });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading dataset {}", path.display()), e))?;
        let file: DatasetFile = serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?;
        Self::from_file_repr(file)
    }

    /// Convert the serialized representation into a dataset
    pub fn from_file_repr(file: DatasetFile) -> Result<Self> {
        let feature_dim = file.feature_dim;
        let mut samples = Vec::with_capacity(file.samples.len());
        for record in file.samples {
            let rows = record.features.len();
            if let Some(row) = record.features.iter().find(|r| r.len() != feature_dim) {
                return Err(Error::ShapeMismatch {
                    context: format!("dataset sample {}", record.index),
                    expected: vec![feature_dim],
                    actual: vec![row.len()],
                });
            }
            let flat: Vec<f32> = record.features.into_iter().flatten().collect();
            let features = Array2::from_shape_vec((rows, feature_dim), flat)
                .map_err(|e| Error::Serialization(format!("sample {}: {e}", record.index)))?;
            samples.push(Sample::new(record.index, features, record.label));
        }
        Self::new(samples, feature_dim)
    }

    /// Serializable representation of this dataset
    pub fn to_file_repr(&self) -> DatasetFile {
        DatasetFile {
            feature_dim: self.feature_dim,
            samples: self
                .samples
                .iter()
                .map(|s| SampleRecord {
                    index: s.index,
                    label: s.label,
                    features: s.features.rows().into_iter().map(|r| r.to_vec()).collect(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Sample at a position
    pub fn get(&self, position: usize) -> Option<&Sample> {
        self.samples.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Samples whose dataset index satisfies a predicate, in dataset order
    pub fn filter_by_index(&self, keep: impl Fn(usize) -> bool) -> Self {
        Self {
            samples: self.samples.iter().filter(|s| keep(s.index)).cloned().collect(),
            feature_dim: self.feature_dim,
        }
    }

    /// Random subset of at most `max_samples` samples, kept in dataset order
    ///
    /// The same seed always selects the same samples.
    pub fn random_subset(&self, max_samples: usize, seed: Option<u64>) -> Self {
        if max_samples >= self.samples.len() {
            return self.clone();
        }
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut positions =
            rand::seq::index::sample(&mut rng, self.samples.len(), max_samples).into_vec();
        positions.sort_unstable();
        Self {
            samples: positions.into_iter().map(|p| self.samples[p].clone()).collect(),
            feature_dim: self.feature_dim,
        }
    }

    /// Label of the sample with the given dataset index
    pub fn label_of(&self, index: usize) -> Option<usize> {
        self.samples.iter().find(|s| s.index == index).map(|s| s.label)
    }
}
