//! Property-based tests for training and prediction.

use ndarray::Array2;
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use sgboost::persist::Model;
use sgboost::{
    ClassificationLearner, GbmConfig, Loss, Predictor, ProbabilityPredictor, RegressionLearner, Verbosity,
};

// =============================================================================
// Strategies
// =============================================================================

/// A small dataset: `(n_rows, n_features, features, targets)`.
fn arb_dataset(max_label: u8) -> impl Strategy<Value = (usize, usize, Vec<f64>, Vec<f64>)> {
    (2usize..24, 1usize..4).prop_flat_map(move |(n_rows, n_features)| {
        (
            Just(n_rows),
            Just(n_features),
            prop_vec(-100.0f64..100.0, n_rows * n_features),
            prop_vec(0..=max_label, n_rows).prop_map(|t| t.into_iter().map(f64::from).collect()),
        )
    })
}

fn config(loss: Loss, subsample_ratio: f64, seed: u64) -> GbmConfig {
    GbmConfig::builder()
        .loss(loss)
        .iterations(5)
        .learning_rate(0.5)
        .subsample_ratio(subsample_ratio)
        .seed(seed)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn probabilities_form_a_distribution(
        (n_rows, n_features, features, targets) in arb_dataset(3),
        ratio in 0.3f64..=1.0,
        seed in any::<u64>(),
    ) {
        let x = Array2::from_shape_vec((n_rows, n_features), features).unwrap();
        let model = ClassificationLearner::new(config(Loss::binomial(), ratio, seed))
            .unwrap()
            .learn(x.view(), &targets, None)
            .unwrap();

        for prediction in model.predict_probability(x.view()).unwrap() {
            let total: f64 = prediction.probabilities.iter().map(|(_, p)| p).sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
            prop_assert!(prediction.probabilities.iter().all(|&(_, p)| (0.0..=1.0).contains(&p)));
            prop_assert!(model.labels().contains(&prediction.prediction));
        }
    }

    #[test]
    fn training_is_deterministic(
        (n_rows, n_features, features, targets) in arb_dataset(20),
        ratio in 0.3f64..=1.0,
        seed in any::<u64>(),
    ) {
        let x = Array2::from_shape_vec((n_rows, n_features), features).unwrap();
        let learner = RegressionLearner::new(config(Loss::huber(0.9), ratio, seed)).unwrap();
        let a = learner.learn(x.view(), &targets, None).unwrap();
        let b = learner.learn(x.view(), &targets, None).unwrap();

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn trained_models_survive_persistence(
        (n_rows, n_features, features, targets) in arb_dataset(2),
        seed in any::<u64>(),
    ) {
        let x = Array2::from_shape_vec((n_rows, n_features), features).unwrap();
        let model = ClassificationLearner::new(config(Loss::binomial(), 0.7, seed))
            .unwrap()
            .learn(x.view(), &targets, None)
            .unwrap();

        let bytes = Model::from(model.clone()).to_bytes().unwrap();
        let loaded = Model::from_bytes(&bytes).unwrap().into_classification().unwrap();
        prop_assert_eq!(
            loaded.predict_probability_matrix(x.view()).unwrap(),
            model.predict_probability_matrix(x.view()).unwrap()
        );
    }
}
