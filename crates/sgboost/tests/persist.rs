//! Persistence integration tests.
//!
//! Saved and reloaded models must predict bit-for-bit identically.

use ndarray::Array2;

use sgboost::persist::{Model, PersistError};
use sgboost::{
    ClassificationLearner, ClassificationModel, GbmConfig, Loss, Predictor, ProbabilityPredictor,
    RegressionLearner, RegressionModel, Verbosity,
};

fn features(n_rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_rows, 3), |(r, c)| ((r * 13 + c * 29) % 17) as f64 * 0.37 - 1.1)
}

/// Probe rows that partly fall between training values.
fn probe() -> Array2<f64> {
    Array2::from_shape_fn((25, 3), |(r, c)| (r as f64 * 0.29 + c as f64 * 0.51) % 6.0 - 1.3)
}

fn multiclass_model() -> ClassificationModel {
    let x = features(45);
    let y: Vec<f64> = (0..45).map(|i| [0.5, 2.0, 3.5][i % 3]).collect();
    let config = GbmConfig::builder()
        .loss(Loss::binomial())
        .iterations(12)
        .learning_rate(0.3)
        .subsample_ratio(0.8)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap();
    ClassificationLearner::new(config).unwrap().learn(x.view(), &y, None).unwrap()
}

fn regression_model(loss: Loss) -> RegressionModel {
    let x = features(40);
    let y: Vec<f64> = (0..40).map(|i| (i as f64 * 0.7).cos() * 3.0 + 1.0 / 3.0).collect();
    let config = GbmConfig::builder()
        .loss(loss)
        .iterations(15)
        .learning_rate(0.2)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap();
    RegressionLearner::new(config).unwrap().learn(x.view(), &y, None).unwrap()
}

#[test]
fn classification_json_file_roundtrip() {
    let model = multiclass_model();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    model.save_json(&path).unwrap();
    let loaded = ClassificationModel::load_json(&path).unwrap();

    assert_eq!(loaded, model);
    assert_eq!(
        loaded.predict_probability_matrix(probe().view()).unwrap(),
        model.predict_probability_matrix(probe().view()).unwrap()
    );
    assert_eq!(loaded.predict(probe().view()).unwrap(), model.predict(probe().view()).unwrap());
}

#[test]
fn classification_binary_file_roundtrip() {
    let model = multiclass_model();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    model.save_binary(&path).unwrap();
    let loaded = ClassificationModel::load_binary(&path).unwrap();

    assert_eq!(loaded, model);
    for row in probe().rows() {
        assert_eq!(
            loaded.predict_probability_row(row).unwrap(),
            model.predict_probability_row(row).unwrap()
        );
    }
}

#[test]
fn regression_roundtrip_for_every_loss() {
    for loss in [Loss::squared(), Loss::absolute(), Loss::huber(0.8), Loss::quantile(0.3)] {
        let model = regression_model(loss);
        let expected = model.predict(probe().view()).unwrap();

        let from_json = RegressionModel::from_json_str(&model.to_json_string().unwrap()).unwrap();
        let from_bytes = RegressionModel::from_bytes(&model.to_bytes().unwrap()).unwrap();

        assert_eq!(from_json.loss(), &loss);
        assert_eq!(from_json.predict(probe().view()).unwrap(), expected);
        assert_eq!(from_bytes.predict(probe().view()).unwrap(), expected);
    }
}

#[test]
fn binary_is_smaller_than_json() {
    let model = Model::from(multiclass_model());
    assert!(model.to_bytes().unwrap().len() < model.to_json_string().unwrap().len());
}

#[test]
fn generic_model_dispatches_by_kind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    regression_model(Loss::squared()).save_json(&path).unwrap();

    let model = Model::load_json(&path).unwrap();
    assert!(matches!(model, Model::Regression(_)));
    assert!(matches!(
        model.into_classification(),
        Err(PersistError::WrongModelKind { expected: "classification", found: "regression" })
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = RegressionModel::load_binary(dir.path().join("absent.bin"));
    assert!(matches!(result, Err(PersistError::Io(_))));
}

#[test]
fn garbage_json_is_rejected() {
    assert!(matches!(Model::from_json_str("{\"format\": 3}"), Err(PersistError::Json(_))));
    assert!(matches!(Model::from_json_str("not json"), Err(PersistError::Json(_))));
}

#[test]
fn tampered_learning_rate_is_rejected() {
    let json = regression_model(Loss::squared()).to_json_string().unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["model"]["Regression"]["ensemble"]["learning_rate"] = serde_json::json!(0.0);
    let tampered = serde_json::to_string(&value).unwrap();

    assert!(matches!(RegressionModel::from_json_str(&tampered), Err(PersistError::InvalidModel(_))));
}

#[test]
fn signed_zero_labels_stay_binary_and_reload() {
    let x = ndarray::array![[1.0], [2.0], [3.0], [4.0]];
    let y = [-0.0, 0.0, 1.0, 1.0];
    let config = GbmConfig::builder()
        .loss(Loss::binomial())
        .iterations(3)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap();
    let model = ClassificationLearner::new(config).unwrap().learn(x.view(), &y, None).unwrap();

    assert_eq!(model.labels(), &[0.0, 1.0]);
    assert_eq!(model.ensemble().n_outputs(), 1);
    assert!(model.validate().is_ok());

    let loaded = ClassificationModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
    assert_eq!(loaded.predict(x.view()).unwrap(), model.predict(x.view()).unwrap());
}
