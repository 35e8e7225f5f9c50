//! Optimizers for the perturbation search
//!
//! Each batch gets a fresh optimizer built from an [`OptimizerSpec`], which is
//! resolved from its `name` tag when the attack spec is parsed.

mod adam;
mod optimizer;
mod rmsprop;
mod sgd;

pub use adam::Adam;
pub use optimizer::Optimizer;
pub use rmsprop::RMSprop;
pub use sgd::SGD;

use serde::{Deserialize, Serialize};

fn default_beta1() -> f32 {
    0.9
}

fn default_beta2() -> f32 {
    0.999
}

fn default_eps() -> f32 {
    1e-8
}

fn default_alpha() -> f32 {
    0.99
}

/// Optimizer selection with its hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase", deny_unknown_fields)]
pub enum OptimizerSpec {
    Adam {
        lr: f32,
        #[serde(default = "default_beta1")]
        beta1: f32,
        #[serde(default = "default_beta2")]
        beta2: f32,
        #[serde(default = "default_eps")]
        eps: f32,
    },
    Rmsprop {
        lr: f32,
        #[serde(default = "default_alpha")]
        alpha: f32,
        #[serde(default = "default_eps")]
        eps: f32,
        #[serde(default)]
        momentum: f32,
    },
    Sgd {
        lr: f32,
        #[serde(default)]
        momentum: f32,
    },
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self::Adam { lr: 0.01, beta1: default_beta1(), beta2: default_beta2(), eps: default_eps() }
    }
}

impl OptimizerSpec {
    /// Build a fresh optimizer with empty state
    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            Self::Adam { lr, beta1, beta2, eps } => Box::new(Adam::new(lr, beta1, beta2, eps)),
            Self::Rmsprop { lr, alpha, eps, momentum } => {
                Box::new(RMSprop::new(lr, alpha, eps, momentum))
            }
            Self::Sgd { lr, momentum } => Box::new(SGD::new(lr, momentum)),
        }
    }

    pub fn lr(&self) -> f32 {
        match *self {
            Self::Adam { lr, .. } | Self::Rmsprop { lr, .. } | Self::Sgd { lr, .. } => lr,
        }
    }

    pub fn set_lr(&mut self, new_lr: f32) {
        match self {
            Self::Adam { lr, .. } | Self::Rmsprop { lr, .. } | Self::Sgd { lr, .. } => *lr = new_lr,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Adam { .. } => "adam",
            Self::Rmsprop { .. } => "rmsprop",
            Self::Sgd { .. } => "sgd",
        }
    }
}
