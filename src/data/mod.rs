//! Variable-length sequence datasets and batch collation
//!
//! Samples are stored unpadded; `collate` pads a group of samples to the
//! longest sequence in the group and validates the result.

mod collate;
mod dataset;

pub use collate::{collate, length_mask, PaddedBatch};
pub use dataset::{DatasetFile, Sample, SampleRecord, SequenceDataset};
