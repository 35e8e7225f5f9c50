//! Adam optimizer

use super::Optimizer;
use ndarray::{Array3, Zip};

/// Adam optimizer with bias-corrected moment estimates
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Option<Array3<f32>>, // First moment
    v: Option<Array3<f32>>, // Second moment
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self { lr, beta1, beta2, epsilon, t: 0, m: None, v: None }
    }

    /// Create Adam with the usual defaults (0.9, 0.999, 1e-8)
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    /// Number of steps taken so far
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, param: &mut Array3<f32>, grad: &Array3<f32>) {
        self.t += 1;
        let (beta1, beta2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.lr);
        let bias1 = 1.0 - beta1.powi(self.t as i32);
        let bias2 = 1.0 - beta2.powi(self.t as i32);

        let m = self.m.get_or_insert_with(|| Array3::zeros(grad.raw_dim()));
        let v = self.v.get_or_insert_with(|| Array3::zeros(grad.raw_dim()));

        Zip::from(param).and(m).and(v).and(grad).for_each(|p, m, v, &g| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        });
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &'static str {
        "adam"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_step_moves_by_lr() {
        // With bias correction the first step is lr * sign(grad)
        let mut opt = Adam::default_params(0.01);
        let mut param = Array3::zeros((1, 1, 2));
        let grad = Array3::from_shape_vec((1, 1, 2), vec![3.0, -0.2]).unwrap();
        opt.step(&mut param, &grad);
        assert_abs_diff_eq!(param[[0, 0, 0]], -0.01, epsilon = 1e-5);
        assert_abs_diff_eq!(param[[0, 0, 1]], 0.01, epsilon = 1e-5);
        assert_eq!(opt.step_count(), 1);
    }

    #[test]
    fn test_zero_grad_leaves_param() {
        let mut opt = Adam::default_params(0.1);
        let mut param = Array3::from_elem((2, 2, 1), 0.5);
        opt.step(&mut param, &Array3::zeros((2, 2, 1)));
        assert!(param.iter().all(|&p| p == 0.5));
    }

    #[test]
    fn test_converges_on_quadratic() {
        let mut opt = Adam::default_params(0.05);
        let mut param = Array3::from_elem((1, 1, 1), 2.0);
        for _ in 0..500 {
            let grad = param.mapv(|p| 2.0 * (p - 0.5));
            opt.step(&mut param, &grad);
        }
        assert_abs_diff_eq!(param[[0, 0, 0]], 0.5, epsilon = 1e-2);
    }
}
