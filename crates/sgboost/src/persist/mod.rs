//! Model persistence.
//!
//! Models are stored inside a versioned envelope, either as JSON
//! (`serde_json`, exact float round-trip) or as compact binary (`postcard`).
//! Loading checks the format tag and version, then validates the model
//! structure, so a loaded model predicts exactly like the saved one.
//!
//! ```
//! use ndarray::array;
//! use sgboost::persist::Model;
//! use sgboost::{GbmConfig, Loss, Predictor, RegressionLearner};
//!
//! let x = array![[0.0], [1.0], [2.0], [3.0]];
//! let y = [0.0, 1.0, 4.0, 9.0];
//! let config = GbmConfig::builder().loss(Loss::squared()).iterations(5).build().unwrap();
//! let model = RegressionLearner::new(config).unwrap().learn(x.view(), &y, None).unwrap();
//!
//! let json = Model::from(model.clone()).to_json_string().unwrap();
//! let loaded = Model::from_json_str(&json).unwrap().into_regression().unwrap();
//! assert_eq!(loaded.predict(x.view()).unwrap(), model.predict(x.view()).unwrap());
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{ClassificationModel, ModelValidationError, RegressionModel};

/// Format tag written into every envelope.
pub const FORMAT_TAG: &str = "sgboost";

/// Current envelope version.
pub const FORMAT_VERSION: u32 = 1;

// =============================================================================
// PersistError
// =============================================================================

/// Errors while saving or loading models.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding error: {0}")]
    Binary(#[from] postcard::Error),

    #[error("not an sgboost model (format tag `{0}`)")]
    UnknownFormat(String),

    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("expected a {expected} model, found a {found} model")]
    WrongModelKind { expected: &'static str, found: &'static str },

    #[error("invalid model: {0}")]
    InvalidModel(#[from] ModelValidationError),
}

// =============================================================================
// Envelope
// =============================================================================

/// Leading fields of every envelope, read before the payload.
#[derive(Debug, Deserialize)]
struct Header {
    format: String,
    version: u32,
}

impl Header {
    fn check(&self) -> Result<(), PersistError> {
        if self.format != FORMAT_TAG {
            return Err(PersistError::UnknownFormat(self.format.clone()));
        }
        if self.version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion { found: self.version, supported: FORMAT_VERSION });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format: &'a str,
    version: u32,
    model: &'a Model,
}

#[derive(Deserialize)]
struct Envelope {
    #[allow(dead_code)]
    format: String,
    #[allow(dead_code)]
    version: u32,
    model: Model,
}

// =============================================================================
// Model
// =============================================================================

/// Any persisted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Model {
    Classification(ClassificationModel),
    Regression(RegressionModel),
}

impl From<ClassificationModel> for Model {
    fn from(model: ClassificationModel) -> Self {
        Model::Classification(model)
    }
}

impl From<RegressionModel> for Model {
    fn from(model: RegressionModel) -> Self {
        Model::Regression(model)
    }
}

impl Model {
    fn kind(&self) -> &'static str {
        match self {
            Model::Classification(_) => "classification",
            Model::Regression(_) => "regression",
        }
    }

    fn envelope(&self) -> EnvelopeRef<'_> {
        EnvelopeRef { format: FORMAT_TAG, version: FORMAT_VERSION, model: self }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        match self {
            Model::Classification(model) => model.validate(),
            Model::Regression(model) => model.validate(),
        }
    }

    pub fn into_classification(self) -> Result<ClassificationModel, PersistError> {
        match self {
            Model::Classification(model) => Ok(model),
            other => Err(PersistError::WrongModelKind { expected: "classification", found: other.kind() }),
        }
    }

    pub fn into_regression(self) -> Result<RegressionModel, PersistError> {
        match self {
            Model::Regression(model) => Ok(model),
            other => Err(PersistError::WrongModelKind { expected: "regression", found: other.kind() }),
        }
    }

    // =========================================================================
    // JSON
    // =========================================================================

    pub fn to_json_string(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(&self.envelope())?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, PersistError> {
        let header: Header = serde_json::from_str(json)?;
        header.check()?;
        let envelope: Envelope = serde_json::from_str(json)?;
        envelope.model.validate()?;
        Ok(envelope.model)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), PersistError> {
        serde_json::to_writer(writer, &self.envelope())?;
        Ok(())
    }

    pub fn read_json<R: Read>(mut reader: R) -> Result<Self, PersistError> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Self::from_json_str(&json)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        Self::read_json(BufReader::new(File::open(path)?))
    }

    // =========================================================================
    // Binary
    // =========================================================================

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        Ok(postcard::to_allocvec(&self.envelope())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        let (header, _) = postcard::take_from_bytes::<Header>(bytes)?;
        header.check()?;
        let envelope: Envelope = postcard::from_bytes(bytes)?;
        envelope.model.validate()?;
        Ok(envelope.model)
    }

    pub fn save_binary(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let bytes = self.to_bytes()?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_binary(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

// =============================================================================
// Convenience on concrete models
// =============================================================================

macro_rules! impl_persist {
    ($model:ty, $into:ident) => {
        impl $model {
            /// Serialize into a JSON envelope.
            pub fn to_json_string(&self) -> Result<String, PersistError> {
                Model::from(self.clone()).to_json_string()
            }

            /// Load from a JSON envelope, checking the model kind.
            pub fn from_json_str(json: &str) -> Result<Self, PersistError> {
                Model::from_json_str(json)?.$into()
            }

            /// Serialize into a binary envelope.
            pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
                Model::from(self.clone()).to_bytes()
            }

            /// Load from a binary envelope, checking the model kind.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
                Model::from_bytes(bytes)?.$into()
            }

            pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
                Model::from(self.clone()).save_json(path)
            }

            pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
                Model::load_json(path)?.$into()
            }

            pub fn save_binary(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
                Model::from(self.clone()).save_binary(path)
            }

            pub fn load_binary(path: impl AsRef<Path>) -> Result<Self, PersistError> {
                Model::load_binary(path)?.$into()
            }
        }
    };
}

impl_persist!(ClassificationModel, into_classification);
impl_persist!(RegressionModel, into_regression);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{Ensemble, RegressionTree};
    use crate::training::Loss;

    fn tiny_regression() -> RegressionModel {
        let ensemble = Ensemble::new(vec![vec![RegressionTree::constant(0.1 + 0.2)]], vec![1.0 / 3.0], 0.1, 1);
        RegressionModel::new(Loss::squared(), ensemble)
    }

    #[test]
    fn json_envelope_has_header() {
        let json = tiny_regression().to_json_string().unwrap();
        assert!(json.starts_with(r#"{"format":"sgboost","version":1,"#));
    }

    #[test]
    fn json_roundtrip_is_exact() {
        let model = tiny_regression();
        let loaded = RegressionModel::from_json_str(&model.to_json_string().unwrap()).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn binary_roundtrip_is_exact() {
        let model = tiny_regression();
        let loaded = RegressionModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn rejects_wrong_kind() {
        let json = tiny_regression().to_json_string().unwrap();
        assert!(matches!(
            ClassificationModel::from_json_str(&json),
            Err(PersistError::WrongModelKind { expected: "classification", found: "regression" })
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let json = tiny_regression()
            .to_json_string()
            .unwrap()
            .replace(r#""version":1"#, r#""version":99"#);
        assert!(matches!(
            Model::from_json_str(&json),
            Err(PersistError::UnsupportedVersion { found: 99, supported: 1 })
        ));
    }

    #[test]
    fn rejects_foreign_format() {
        let json = tiny_regression().to_json_string().unwrap().replace("sgboost", "other");
        assert!(matches!(Model::from_json_str(&json), Err(PersistError::UnknownFormat(_))));
    }

    #[test]
    fn rejects_structurally_invalid_model() {
        let ensemble = Ensemble::new(vec![vec![RegressionTree::constant(f64::MAX)]], vec![0.0], -1.0, 1);
        let model = RegressionModel::new(Loss::squared(), ensemble);
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(RegressionModel::from_bytes(&bytes), Err(PersistError::InvalidModel(_))));
    }

    #[test]
    fn truncated_bytes_fail() {
        let bytes = tiny_regression().to_bytes().unwrap();
        assert!(matches!(Model::from_bytes(&bytes[..bytes.len() / 2]), Err(PersistError::Binary(_))));
    }
}
