//! Shared fixtures for attack tests

use crate::data::PaddedBatch;
use crate::model::Classifier;
use crate::Result;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3};
use std::cell::{Cell, RefCell};

/// Classifier that replays fixed logits, one entry per `forward` call
///
/// The last entry repeats once the script runs out, and only the first
/// `batch` rows are returned. `gradient` fills every
/// valid cell of the input gradient. Every `logit_grad` passed to
/// `input_gradient` is kept for inspection.
pub struct ScriptedClassifier {
    pub script: Vec<Array2<f32>>,
    pub input_size: usize,
    pub gradient: f32,
    calls: Cell<usize>,
    logit_grads: RefCell<Vec<Array2<f32>>>,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<Array2<f32>>, input_size: usize) -> Self {
        Self {
            script,
            input_size,
            gradient: 0.0,
            calls: Cell::new(0),
            logit_grads: RefCell::new(Vec::new()),
        }
    }

    pub fn with_gradient(mut self, gradient: f32) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// `logit_grad` of each `input_gradient` call, in call order
    pub fn logit_grads(&self) -> Vec<Array2<f32>> {
        self.logit_grads.borrow().clone()
    }
}

impl Classifier for ScriptedClassifier {
    fn num_classes(&self) -> usize {
        self.script[0].ncols()
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn forward(&self, inputs: ArrayView3<f32>, _lengths: &[usize]) -> Result<Array2<f32>> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        let logits = &self.script[call.min(self.script.len() - 1)];
        Ok(logits.slice(s![..inputs.shape()[0], ..]).to_owned())
    }

    fn input_gradient(
        &self,
        inputs: ArrayView3<f32>,
        lengths: &[usize],
        logit_grad: ArrayView2<f32>,
    ) -> Result<Array3<f32>> {
        self.logit_grads.borrow_mut().push(logit_grad.to_owned());
        let mut grad = Array3::zeros(inputs.raw_dim());
        for (i, &len) in lengths.iter().enumerate() {
            grad.slice_mut(s![i, ..len, ..]).fill(self.gradient);
        }
        Ok(grad)
    }
}

/// Batch of constant inputs with the given lengths, labels and indices `0..n`
pub fn constant_batch(
    lengths: Vec<usize>,
    labels: Vec<usize>,
    max_length: usize,
    feature_dim: usize,
    fill: f32,
) -> PaddedBatch {
    let n = lengths.len();
    let inputs = Array3::from_elem((n, max_length, feature_dim), fill);
    PaddedBatch::new(inputs, lengths, labels, (0..n).collect()).expect("valid test batch")
}
