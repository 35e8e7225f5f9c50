//! Padding of variable-length samples into fixed-shape batches

use super::Sample;
use crate::{Error, Result};
use ndarray::{s, Array3};

/// A zero-padded batch of sequences
///
/// `inputs` has shape `[batch, max_length, feature_dim]`. The four per-sample
/// vectors are parallel to the batch axis.
#[derive(Debug, Clone)]
pub struct PaddedBatch {
    inputs: Array3<f32>,
    lengths: Vec<usize>,
    labels: Vec<usize>,
    indices: Vec<usize>,
}

impl PaddedBatch {
    /// Assemble a batch, failing if the parts disagree
    pub fn new(
        inputs: Array3<f32>,
        lengths: Vec<usize>,
        labels: Vec<usize>,
        indices: Vec<usize>,
    ) -> Result<Self> {
        let batch_size = inputs.shape()[0];
        let max_length = inputs.shape()[1];
        let counts =
            [("lengths", lengths.len()), ("labels", labels.len()), ("indices", indices.len())];
        for (name, n) in counts {
            if n != batch_size {
                return Err(Error::MalformedBatch(format!(
                    "{batch_size} sequences but {n} {name}"
                )));
            }
        }
        if let Some((pos, &len)) = lengths.iter().enumerate().find(|(_, &l)| l > max_length) {
            return Err(Error::MalformedBatch(format!(
                "sample {} has length {len} beyond padded length {max_length}",
                indices[pos]
            )));
        }
        Ok(Self { inputs, lengths, labels, indices })
    }

    pub fn inputs(&self) -> &Array3<f32> {
        &self.inputs
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Dataset indices of the samples in this batch
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn size(&self) -> usize {
        self.inputs.shape()[0]
    }

    pub fn max_length(&self) -> usize {
        self.inputs.shape()[1]
    }

    pub fn feature_dim(&self) -> usize {
        self.inputs.shape()[2]
    }

    /// 1.0 for cells inside each sample's true length, 0.0 for padding
    pub fn validity_mask(&self) -> Array3<f32> {
        length_mask(&self.lengths, self.max_length(), self.feature_dim())
    }
}

/// Pad samples to the longest one and stack them
pub fn collate(samples: &[&Sample]) -> Result<PaddedBatch> {
    let feature_dim = match samples.first() {
        Some(s) => s.features.ncols(),
        None => return Err(Error::MalformedBatch("empty batch".to_string())),
    };
    let max_length = samples.iter().map(|s| s.length()).max().unwrap_or(0);
    let mut inputs = Array3::zeros((samples.len(), max_length, feature_dim));
    for (i, sample) in samples.iter().enumerate() {
        if sample.features.ncols() != feature_dim {
            return Err(Error::MalformedBatch(format!(
                "sample {} has {} features, batch has {feature_dim}",
                sample.index,
                sample.features.ncols()
            )));
        }
        inputs.slice_mut(s![i, ..sample.length(), ..]).assign(&sample.features);
    }
    PaddedBatch::new(
        inputs,
        samples.iter().map(|s| s.length()).collect(),
        samples.iter().map(|s| s.label).collect(),
        samples.iter().map(|s| s.index).collect(),
    )
}

/// Mask of shape `[lengths.len(), max_length, feature_dim]` marking valid time steps
pub fn length_mask(lengths: &[usize], max_length: usize, feature_dim: usize) -> Array3<f32> {
    Array3::from_shape_fn((lengths.len(), max_length, feature_dim), |(i, t, _)| {
        if t < lengths[i] {
            1.0
        } else {
            0.0
        }
    })
}
