//! Property-based tests for configuration validation

use super::error::ValidationError;
use super::validator::validate_config;
use crate::config::schema::*;
use crate::optim::OptimizerSpec;
use proptest::prelude::*;

fn arb_optimizer() -> impl Strategy<Value = OptimizerSpec> {
    (1e-6f32..1.0, 0.0f32..0.99).prop_flat_map(|(lr, momentum)| {
        prop_oneof![
            Just(OptimizerSpec::Adam { lr, beta1: 0.9, beta2: 0.999, eps: 1e-8 }),
            Just(OptimizerSpec::Rmsprop { lr, alpha: 0.99, eps: 1e-8, momentum }),
            Just(OptimizerSpec::Sgd { lr, momentum }),
        ]
    })
}

fn arb_valid_spec() -> impl Strategy<Value = AttackSpec> {
    (
        1usize..256,                        // batch_size
        1usize..500,                        // epochs_per_batch
        0.0f32..5.0,                        // kappa
        0.0f32..0.1,                        // lambda_1
        arb_optimizer(),
        proptest::option::of(1usize..50),   // checkpoint_interval
    )
        .prop_map(|(batch_size, epochs_per_batch, kappa, lambda_1, optimizer, interval)| {
            let mut spec = AttackSpec::new("model.json", "data.json");
            spec.attack = AttackHyperparams {
                kappa,
                lambda_1,
                optimizer,
                batch_size,
                epochs_per_batch,
                ..Default::default()
            };
            spec.checkpoint_interval = interval;
            spec
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_valid_spec_passes(spec in arb_valid_spec()) {
        prop_assert!(validate_config(&spec).is_ok());
    }

    #[test]
    fn prop_zero_batch_size_fails(spec in arb_valid_spec()) {
        let mut spec = spec;
        spec.attack.batch_size = 0;
        prop_assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidBatchSize(0))
        ));
    }

    #[test]
    fn prop_non_positive_lr_fails(spec in arb_valid_spec(), lr in -1.0f32..=0.0) {
        let mut spec = spec;
        spec.attack.optimizer.set_lr(lr);
        prop_assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidLearningRate(_))
        ));
    }
}
