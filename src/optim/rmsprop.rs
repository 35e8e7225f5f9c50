//! RMSprop optimizer

use super::Optimizer;
use ndarray::{Array3, Zip};

/// RMSprop with optional momentum
pub struct RMSprop {
    lr: f32,
    alpha: f32,
    epsilon: f32,
    momentum: f32,
    square_avg: Option<Array3<f32>>,
    buffer: Option<Array3<f32>>,
}

impl RMSprop {
    pub fn new(lr: f32, alpha: f32, epsilon: f32, momentum: f32) -> Self {
        Self { lr, alpha, epsilon, momentum, square_avg: None, buffer: None }
    }
}

impl Optimizer for RMSprop {
    fn step(&mut self, param: &mut Array3<f32>, grad: &Array3<f32>) {
        let (lr, alpha, eps, momentum) = (self.lr, self.alpha, self.epsilon, self.momentum);
        let square_avg = self.square_avg.get_or_insert_with(|| Array3::zeros(grad.raw_dim()));
        Zip::from(&mut *square_avg)
            .and(grad)
            .for_each(|s, &g| *s = alpha * *s + (1.0 - alpha) * g * g);

        if momentum > 0.0 {
            let buffer = self.buffer.get_or_insert_with(|| Array3::zeros(grad.raw_dim()));
            Zip::from(param).and(buffer).and(&*square_avg).and(grad).for_each(|p, b, &s, &g| {
                *b = momentum * *b + g / (s.sqrt() + eps);
                *p -= lr * *b;
            });
        } else {
            Zip::from(param)
                .and(&*square_avg)
                .and(grad)
                .for_each(|p, &s, &g| *p -= lr * g / (s.sqrt() + eps));
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &'static str {
        "rmsprop"
    }
}
