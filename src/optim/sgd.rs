//! Stochastic Gradient Descent optimizer

use super::Optimizer;
use ndarray::{Array3, Zip};

/// SGD optimizer with optional momentum
pub struct SGD {
    lr: f32,
    momentum: f32,
    velocity: Option<Array3<f32>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self { lr, momentum, velocity: None }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, param: &mut Array3<f32>, grad: &Array3<f32>) {
        let lr = self.lr;
        if self.momentum > 0.0 {
            let momentum = self.momentum;
            let velocity = self.velocity.get_or_insert_with(|| Array3::zeros(grad.raw_dim()));
            // v = momentum * v - lr * grad; param += v
            Zip::from(param).and(velocity).and(grad).for_each(|p, v, &g| {
                *v = momentum * *v - lr * g;
                *p += *v;
            });
        } else {
            Zip::from(param).and(grad).for_each(|p, &g| *p -= lr * g);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &'static str {
        "sgd"
    }
}
