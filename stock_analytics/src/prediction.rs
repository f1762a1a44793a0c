//! Next-day close prediction.
//!
//! [`PricePredictor`] is the seam; [`LinearRegressionPredictor`] evaluates a
//! `smartcore` linear regression that was trained offline and saved as JSON.

use std::{fs::File, io::BufReader, path::Path};

use chrono::NaiveDate;
use serde::Serialize;
use smartcore::{linalg::basic::matrix::DenseMatrix, linear::linear_regression::LinearRegression};
use tracing::{debug, info};

use crate::{errors::PredictionError, features::FeatureVector};

/// Decimal places kept in a [`Prediction`].
pub const PREDICTION_DECIMALS: i32 = 3;

/// The serialized model type.
pub type CloseModel = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Anything that maps a feature row to a next-day close.
pub trait PricePredictor: Send + Sync {
    /// Raw model output for `features`.
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError>;

    /// Human readable model name for logs.
    fn name(&self) -> &str;
}

/// Predicted close for the trading day after `as_of`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Date of the bar the features were taken from.
    pub as_of: NaiveDate,
    /// Predicted close, rounded to [`PREDICTION_DECIMALS`] places.
    pub close: f64,
}

impl Prediction {
    /// Rounds `raw` and keys it by `as_of`.
    pub fn new(as_of: NaiveDate, raw: f64) -> Self {
        Self {
            as_of,
            close: round_to(raw, PREDICTION_DECIMALS),
        }
    }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Runs `predictor` on `features` and rounds the result.
pub fn predict_close(
    predictor: &dyn PricePredictor,
    features: &FeatureVector,
) -> Result<Prediction, PredictionError> {
    let raw = predictor.predict(features)?;
    if !raw.is_finite() {
        return Err(PredictionError::NonFinite(raw));
    }
    debug!(model = predictor.name(), as_of = %features.date, raw, "close predicted");
    Ok(Prediction::new(features.date, raw))
}

/// Linear regression over the eight columns of [`FeatureVector::FIELDS`].
pub struct LinearRegressionPredictor {
    model: CloseModel,
    name: String,
}

impl LinearRegressionPredictor {
    /// Wraps an in-memory model.
    pub fn from_model(model: CloseModel) -> Self {
        Self {
            model,
            name: "linear regression".to_string(),
        }
    }

    /// Loads a model serialized with `serde_json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PredictionError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PredictionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: CloseModel =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                PredictionError::Decode {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        info!(path = %path.display(), "loaded price model");
        Ok(Self {
            model,
            name: format!("linear regression ({})", file_name(path)),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl PricePredictor for LinearRegressionPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let input = DenseMatrix::from_2d_vec(&vec![features.to_row().to_vec()])
            .map_err(|e| PredictionError::Model(e.to_string()))?;
        let output = self
            .model
            .predict(&input)
            .map_err(|e| PredictionError::Model(e.to_string()))?;
        output.first().copied().ok_or(PredictionError::EmptyOutput)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
