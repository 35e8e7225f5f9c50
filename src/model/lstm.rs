//! Single-layer LSTM with a linear logit head
//!
//! Gate layout follows the usual `[input, forget, cell, output]` stacking, so
//! `w_ih` is `[4H, I]` and `w_hh` is `[4H, H]`. The head reads the hidden state
//! at each sample's last valid time step.

use super::Classifier;
use crate::{Error, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Frozen LSTM classifier weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmClassifier {
    w_ih: Array2<f32>,
    w_hh: Array2<f32>,
    b_ih: Array1<f32>,
    b_hh: Array1<f32>,
    fc_w: Array2<f32>,
    fc_b: Array1<f32>,
}

/// Activations kept for one time step
struct StepTape {
    i: Array1<f32>,
    f: Array1<f32>,
    g: Array1<f32>,
    o: Array1<f32>,
    c: Array1<f32>,
    c_prev: Array1<f32>,
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl LstmClassifier {
    /// Build a classifier from explicit weights, checking their shapes
    pub fn new(
        w_ih: Array2<f32>,
        w_hh: Array2<f32>,
        b_ih: Array1<f32>,
        b_hh: Array1<f32>,
        fc_w: Array2<f32>,
        fc_b: Array1<f32>,
    ) -> Result<Self> {
        let model = Self { w_ih, w_hh, b_ih, b_hh, fc_w, fc_b };
        model.validate()?;
        Ok(model)
    }

    /// Randomly initialized classifier, reproducible from `seed`
    pub fn seeded(input_size: usize, hidden_size: usize, num_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let k = 1.0 / (hidden_size as f32).sqrt();
        let mut uniform = |rows: usize, cols: usize| {
            Array2::from_shape_fn((rows, cols), |_| rng.random_range(-k..k))
        };
        let w_ih = uniform(4 * hidden_size, input_size);
        let w_hh = uniform(4 * hidden_size, hidden_size);
        let fc_w = uniform(num_classes, hidden_size);
        let gate_biases = uniform(2, 4 * hidden_size);
        let fc_b = uniform(1, num_classes).row(0).to_owned();
        Self {
            w_ih,
            w_hh,
            b_ih: gate_biases.row(0).to_owned(),
            b_hh: gate_biases.row(1).to_owned(),
            fc_w,
            fc_b,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.w_hh.ncols()
    }

    /// Check that all weight shapes agree with each other
    pub fn validate(&self) -> Result<()> {
        let hidden = self.w_hh.ncols();
        let check = |context: &str, expected: Vec<usize>, actual: &[usize]| {
            if expected.as_slice() == actual {
                Ok(())
            } else {
                Err(Error::ShapeMismatch {
                    context: format!("LSTM weight {context}"),
                    expected,
                    actual: actual.to_vec(),
                })
            }
        };
        check("w_hh", vec![4 * hidden, hidden], self.w_hh.shape())?;
        check("w_ih", vec![4 * hidden, self.w_ih.ncols()], self.w_ih.shape())?;
        check("b_ih", vec![4 * hidden], self.b_ih.shape())?;
        check("b_hh", vec![4 * hidden], self.b_hh.shape())?;
        check("fc_w", vec![self.fc_w.nrows(), hidden], self.fc_w.shape())?;
        check("fc_b", vec![self.fc_w.nrows()], self.fc_b.shape())?;
        Ok(())
    }

    fn check_batch(&self, inputs: &ArrayView3<f32>, lengths: &[usize]) -> Result<()> {
        let shape = inputs.shape();
        if shape[2] != self.input_size() {
            return Err(Error::ShapeMismatch {
                context: "classifier input".to_string(),
                expected: vec![shape[0], shape[1], self.input_size()],
                actual: shape.to_vec(),
            });
        }
        if lengths.len() != shape[0] || lengths.iter().any(|&l| l > shape[1]) {
            return Err(Error::MalformedBatch(format!(
                "lengths {lengths:?} do not fit inputs of shape {shape:?}"
            )));
        }
        Ok(())
    }

    /// Run one sequence, returning the final hidden state and the step tapes
    fn run_sequence(&self, seq: ArrayView2<f32>, length: usize) -> (Array1<f32>, Vec<StepTape>) {
        let hidden = self.hidden_size();
        let mut h = Array1::<f32>::zeros(hidden);
        let mut c = Array1::<f32>::zeros(hidden);
        let mut tape = Vec::with_capacity(length);

        for t in 0..length {
            let x = seq.row(t).to_owned();
            let gates = self.w_ih.dot(&x) + &self.b_ih + self.w_hh.dot(&h) + &self.b_hh;
            let i = gates.slice(s![0..hidden]).mapv(sigmoid);
            let f = gates.slice(s![hidden..2 * hidden]).mapv(sigmoid);
            let g = gates.slice(s![2 * hidden..3 * hidden]).mapv(f32::tanh);
            let o = gates.slice(s![3 * hidden..4 * hidden]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            h = &o * &c_next.mapv(f32::tanh);
            tape.push(StepTape { i, f, g, o, c: c_next.clone(), c_prev: c });
            c = c_next;
        }
        (h, tape)
    }

    /// Backpropagate `dh` at the last step down to the inputs of one sequence
    fn backward_sequence(&self, tape: &[StepTape], mut dh: Array1<f32>, out: &mut Array2<f32>) {
        let hidden = self.hidden_size();
        let mut dc = Array1::<f32>::zeros(hidden);

        for (t, st) in tape.iter().enumerate().rev() {
            let tanh_c = st.c.mapv(f32::tanh);
            let d_o = &dh * &tanh_c * &st.o.mapv(|v| v * (1.0 - v));
            let dc_total = &dh * &st.o * &tanh_c.mapv(|v| 1.0 - v * v) + &dc;

            let d_i = &dc_total * &st.g * &st.i.mapv(|v| v * (1.0 - v));
            let d_f = &dc_total * &st.c_prev * &st.f.mapv(|v| v * (1.0 - v));
            let d_g = &dc_total * &st.i * &st.g.mapv(|v| 1.0 - v * v);

            let mut gates_grad = Array1::<f32>::zeros(4 * hidden);
            gates_grad.slice_mut(s![0..hidden]).assign(&d_i);
            gates_grad.slice_mut(s![hidden..2 * hidden]).assign(&d_f);
            gates_grad.slice_mut(s![2 * hidden..3 * hidden]).assign(&d_g);
            gates_grad.slice_mut(s![3 * hidden..4 * hidden]).assign(&d_o);

            out.row_mut(t).assign(&self.w_ih.t().dot(&gates_grad));
            dh = self.w_hh.t().dot(&gates_grad);
            dc = &dc_total * &st.f;
        }
    }

    fn logits_from_hidden(&self, h: ArrayView1<f32>) -> Array1<f32> {
        self.fc_w.dot(&h) + &self.fc_b
    }
}

impl Classifier for LstmClassifier {
    fn num_classes(&self) -> usize {
        self.fc_w.nrows()
    }

    fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    fn forward(&self, inputs: ArrayView3<f32>, lengths: &[usize]) -> Result<Array2<f32>> {
        self.check_batch(&inputs, lengths)?;
        let mut logits = Array2::zeros((lengths.len(), self.num_classes()));
        for (b, &length) in lengths.iter().enumerate() {
            let (h, _) = self.run_sequence(inputs.slice(s![b, .., ..]), length);
            logits.row_mut(b).assign(&self.logits_from_hidden(h.view()));
        }
        Ok(logits)
    }

    fn input_gradient(
        &self,
        inputs: ArrayView3<f32>,
        lengths: &[usize],
        logit_grad: ArrayView2<f32>,
    ) -> Result<Array3<f32>> {
        self.check_batch(&inputs, lengths)?;
        if logit_grad.dim() != (lengths.len(), self.num_classes()) {
            return Err(Error::ShapeMismatch {
                context: "logit gradient".to_string(),
                expected: vec![lengths.len(), self.num_classes()],
                actual: logit_grad.shape().to_vec(),
            });
        }
        let shape = inputs.shape();
        let mut grad = Array3::zeros((shape[0], shape[1], shape[2]));
        for (b, &length) in lengths.iter().enumerate() {
            if length == 0 {
                continue;
            }
            let (_, tape) = self.run_sequence(inputs.slice(s![b, .., ..]), length);
            let dh = self.fc_w.t().dot(&logit_grad.row(b));
            let mut sample_grad = Array2::zeros((length, shape[2]));
            self.backward_sequence(&tape, dh, &mut sample_grad);
            grad.slice_mut(s![b, ..length, ..]).assign(&sample_grad);
        }
        Ok(grad)
    }
}
