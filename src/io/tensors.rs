//! SafeTensors encoding of attack results

use super::ResultStore;
use crate::attack::{RecordedTrainerExamples, TrainerResult};
use crate::{Error, Result};
use ndarray::Array3;
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;

/// Bumped whenever the tensor layout changes
pub const FORMAT_VERSION: &str = "1";

/// Stores a [`TrainerResult`] as one SafeTensors file
///
/// Integer columns are `I64`, losses and perturbations are `F32`. Sentinel
/// losses (`+inf`) are stored as raw bits and read back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeTensorsStore;

struct Column {
    name: String,
    dtype: Dtype,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

impl Column {
    fn i64(name: &str, values: impl IntoIterator<Item = i64>) -> Self {
        let values: Vec<i64> = values.into_iter().collect();
        Self {
            name: name.to_string(),
            dtype: Dtype::I64,
            shape: vec![values.len()],
            bytes: bytemuck::cast_slice(&values).to_vec(),
        }
    }

    fn f32(name: &str, shape: Vec<usize>, values: impl IntoIterator<Item = f32>) -> Self {
        let values: Vec<f32> = values.into_iter().collect();
        Self {
            name: name.to_string(),
            dtype: Dtype::F32,
            shape,
            bytes: bytemuck::cast_slice(&values).to_vec(),
        }
    }
}

fn usize_column(name: &str, values: &[usize]) -> Column {
    Column::i64(name, values.iter().map(|&v| v as i64))
}

fn examples_columns(prefix: &str, examples: &RecordedTrainerExamples) -> Vec<Column> {
    let perts = examples.perturbations();
    vec![
        Column::i64(&format!("{prefix}.epochs"), examples.epochs().iter().copied()),
        Column::f32(
            &format!("{prefix}.losses"),
            vec![examples.len()],
            examples.losses().iter().copied(),
        ),
        Column::f32(
            &format!("{prefix}.perturbations"),
            perts.shape().to_vec(),
            perts.iter().copied(),
        ),
    ]
}

/// Encode a result into SafeTensors bytes
pub fn encode(result: &TrainerResult) -> Result<Vec<u8>> {
    let mut columns = vec![
        usize_column("dataset_indices", result.dataset_indices()),
        usize_column("input_seq_lengths", result.input_seq_lengths()),
        usize_column("orig_labels", result.orig_labels()),
        usize_column("epochs_run", result.epochs_run()),
    ];
    columns.extend(examples_columns("first", result.first()));
    columns.extend(examples_columns("best", result.best()));

    let views = columns
        .iter()
        .map(|c| {
            TensorView::new(c.dtype, c.shape.clone(), &c.bytes)
                .map(|view| (c.name.as_str(), view))
                .map_err(|e| Error::Serialization(format!("tensor {}: {e}", c.name)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut metadata = HashMap::new();
    metadata.insert("format_version".to_string(), FORMAT_VERSION.to_string());
    metadata.insert("rows".to_string(), result.len().to_string());

    safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))
}

fn read_i64(tensors: &SafeTensors<'_>, name: &str) -> Result<Vec<i64>> {
    let view = tensors
        .tensor(name)
        .map_err(|e| Error::Serialization(format!("missing tensor {name}: {e}")))?;
    if view.dtype() != Dtype::I64 {
        return Err(Error::Serialization(format!(
            "tensor {name} has dtype {:?}, expected I64",
            view.dtype()
        )));
    }
    Ok(bytemuck::pod_collect_to_vec(view.data()))
}

fn read_usize(tensors: &SafeTensors<'_>, name: &str) -> Result<Vec<usize>> {
    read_i64(tensors, name)?
        .into_iter()
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| Error::Serialization(format!("negative value {v} in {name}")))
        })
        .collect()
}

fn read_f32(tensors: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = tensors
        .tensor(name)
        .map_err(|e| Error::Serialization(format!("missing tensor {name}: {e}")))?;
    if view.dtype() != Dtype::F32 {
        return Err(Error::Serialization(format!(
            "tensor {name} has dtype {:?}, expected F32",
            view.dtype()
        )));
    }
    Ok((view.shape().to_vec(), bytemuck::pod_collect_to_vec(view.data())))
}

fn read_examples(tensors: &SafeTensors<'_>, prefix: &str) -> Result<RecordedTrainerExamples> {
    let epochs = read_i64(tensors, &format!("{prefix}.epochs"))?;
    let (_, losses) = read_f32(tensors, &format!("{prefix}.losses"))?;
    let (shape, values) = read_f32(tensors, &format!("{prefix}.perturbations"))?;
    let [n, t, f] = shape[..] else {
        return Err(Error::Serialization(format!(
            "{prefix}.perturbations must be rank 3, got {shape:?}"
        )));
    };
    let perturbations = Array3::from_shape_vec((n, t, f), values)
        .map_err(|e| Error::Serialization(format!("{prefix}.perturbations: {e}")))?;
    RecordedTrainerExamples::from_parts(epochs, losses, perturbations)
}

/// Decode a result from SafeTensors bytes
pub fn decode(bytes: &[u8]) -> Result<TrainerResult> {
    let (_, header) = SafeTensors::read_metadata(bytes)
        .map_err(|e| Error::Serialization(format!("SafeTensors header: {e}")))?;
    let version = header.metadata().as_ref().and_then(|m| m.get("format_version"));
    if version.map(String::as_str) != Some(FORMAT_VERSION) {
        return Err(Error::Serialization(format!(
            "unsupported result format version {version:?}, expected {FORMAT_VERSION}"
        )));
    }

    let tensors = SafeTensors::deserialize(bytes)
        .map_err(|e| Error::Serialization(format!("Failed to deserialize result: {e}")))?;
    TrainerResult::from_parts(
        read_usize(&tensors, "dataset_indices")?,
        read_usize(&tensors, "input_seq_lengths")?,
        read_usize(&tensors, "orig_labels")?,
        read_usize(&tensors, "epochs_run")?,
        read_examples(&tensors, "first")?,
        read_examples(&tensors, "best")?,
    )
}

impl ResultStore for SafeTensorsStore {
    fn save(&self, result: &TrainerResult, path: &Path) -> Result<()> {
        let bytes = encode(result)?;
        std::fs::write(path, bytes)
            .map_err(|e| Error::io(format!("writing result {}", path.display()), e))
    }

    fn load(&self, path: &Path) -> Result<TrainerResult> {
        if !path.exists() {
            return Err(Error::NotFound { path: path.to_path_buf() });
        }
        let bytes = std::fs::read(path)
            .map_err(|e| Error::io(format!("reading result {}", path.display()), e))?;
        decode(&bytes)
    }
}
