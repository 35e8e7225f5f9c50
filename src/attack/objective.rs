//! Margin-based adversarial objective

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// How the logit margin enters the loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    /// `max(m, -kappa)`: the hinge `max(0, m + kappa)` shifted by `kappa`
    #[default]
    Clamped,
    /// `m`: descent keeps pushing samples that already flipped
    Unbounded,
}

/// Per-sample loss values and the gradient of their sum w.r.t. the logits
#[derive(Debug, Clone)]
pub struct ObjectiveOutput {
    pub losses: Vec<f32>,
    /// `[batch, classes]`; +1 at the original label, -1 at the strongest
    /// competing class, zero for saturated samples
    pub logit_grad: Array2<f32>,
}

/// `margin_term(logit[orig] - max_{c != orig} logit[c]) + lambda_1 * ||p||_1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginLoss {
    pub kappa: f32,
    pub lambda_1: f32,
    pub mode: MarginMode,
}

impl MarginLoss {
    pub fn new(kappa: f32, lambda_1: f32, mode: MarginMode) -> Self {
        Self { kappa, lambda_1, mode }
    }

    /// Evaluate the loss for a batch
    ///
    /// `l1_norms` holds the masked L1 norm of each sample's perturbation.
    pub fn evaluate(
        &self,
        logits: ArrayView2<f32>,
        labels: &[usize],
        l1_norms: &[f32],
    ) -> Result<ObjectiveOutput> {
        let (n, classes) = logits.dim();
        if labels.len() != n || l1_norms.len() != n {
            return Err(Error::ShapeMismatch {
                context: "objective inputs".into(),
                expected: vec![n],
                actual: vec![labels.len(), l1_norms.len()],
            });
        }
        if classes < 2 {
            return Err(Error::Config(format!(
                "margin loss needs at least two classes, classifier has {classes}"
            )));
        }

        let mut losses = Vec::with_capacity(n);
        let mut logit_grad = Array2::zeros((n, classes));
        for (i, row) in logits.outer_iter().enumerate() {
            let orig = labels[i];
            if orig >= classes {
                return Err(Error::LabelOutOfRange { label: orig, num_classes: classes });
            }
            let other = strongest_other(row.iter().copied(), orig);
            let margin = row[orig] - row[other];

            let (term, active) = match self.mode {
                MarginMode::Clamped if margin <= -self.kappa => (-self.kappa, false),
                MarginMode::Clamped | MarginMode::Unbounded => (margin, true),
            };
            if active {
                logit_grad[[i, orig]] = 1.0;
                logit_grad[[i, other]] = -1.0;
            }
            losses.push(term + self.lambda_1 * l1_norms[i]);
        }
        Ok(ObjectiveOutput { losses, logit_grad })
    }
}

/// Largest logit other than `orig`; NaN logits never win
fn strongest_other(row: impl Iterator<Item = f32>, orig: usize) -> usize {
    let mut best: Option<(usize, f32)> = None;
    for (c, v) in row.enumerate().filter(|&(c, _)| c != orig) {
        match best {
            None => best = Some((c, v)),
            Some((_, b)) if v > b || b.is_nan() => best = Some((c, v)),
            Some(_) => {}
        }
    }
    best.map_or(usize::from(orig == 0), |(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_clamped_saturates_at_kappa() {
        let loss = MarginLoss::new(0.5, 0.0, MarginMode::Clamped);
        // sample 0: margin 2.0, sample 1: margin -3.0 (clamped to -0.5)
        let logits = array![[3.0, 1.0], [0.0, 3.0]];
        let out = loss.evaluate(logits.view(), &[0, 0], &[0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(out.losses[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.losses[1], -0.5, epsilon = 1e-6);
        assert_eq!(out.logit_grad.row(0).to_vec(), vec![1.0, -1.0]);
        assert_eq!(out.logit_grad.row(1).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_unbounded_keeps_pushing() {
        let loss = MarginLoss::new(0.5, 0.0, MarginMode::Unbounded);
        let logits = array![[0.0, 3.0]];
        let out = loss.evaluate(logits.view(), &[0], &[0.0]).unwrap();
        assert_abs_diff_eq!(out.losses[0], -3.0, epsilon = 1e-6);
        assert_eq!(out.logit_grad.row(0).to_vec(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_l1_term_added() {
        let loss = MarginLoss::new(0.0, 0.1, MarginMode::Clamped);
        let logits = array![[1.0, 0.0]];
        let out = loss.evaluate(logits.view(), &[0], &[4.0]).unwrap();
        assert_abs_diff_eq!(out.losses[0], 1.4, epsilon = 1e-6);
    }

    #[test]
    fn test_picks_strongest_other_class() {
        let loss = MarginLoss::new(0.0, 0.0, MarginMode::Unbounded);
        let logits = array![[0.1, 2.0, 0.5]];
        let out = loss.evaluate(logits.view(), &[2], &[0.0]).unwrap();
        assert_eq!(out.logit_grad.row(0).to_vec(), vec![0.0, -1.0, 1.0]);
        assert_abs_diff_eq!(out.losses[0], -1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_nan_logit_never_strongest() {
        assert_eq!(strongest_other([f32::NAN, 0.0, 1.0, f32::NAN].into_iter(), 2), 1);
    }

    #[test]
    fn test_label_out_of_range() {
        let loss = MarginLoss::new(0.0, 0.0, MarginMode::Clamped);
        let logits = array![[1.0, 0.0]];
        assert!(matches!(
            loss.evaluate(logits.view(), &[5], &[0.0]),
            Err(Error::LabelOutOfRange { label: 5, num_classes: 2 })
        ));
    }

    #[test]
    fn test_single_class_rejected() {
        let loss = MarginLoss::new(0.0, 0.0, MarginMode::Clamped);
        let logits = array![[1.0]];
        assert!(matches!(loss.evaluate(logits.view(), &[0], &[0.0]), Err(Error::Config(_))));
    }
}
