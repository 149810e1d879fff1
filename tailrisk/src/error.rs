//! Error types for risk estimation and backtesting

use thiserror::Error;

/// Errors that can occur while estimating or backtesting tail risk
#[derive(Error, Debug)]
pub enum TailRiskError {
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Covariance matrix is not positive-definite: {0}")]
    SingularCovariance(String),

    #[error("Misaligned series: {0}")]
    MisalignedSeries(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid confidence level: {0} (must be between 0 and 1)")]
    InvalidConfidenceLevel(f64),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TailRiskError>;

/// Reject confidence levels outside the open interval (0, 1)
pub(crate) fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(TailRiskError::InvalidConfidenceLevel(alpha))
    }
}

pub(crate) fn check_window(window: usize) -> Result<()> {
    if window == 0 {
        return Err(TailRiskError::InvalidParameter(
            "Window must be at least one day".to_string(),
        ));
    }
    Ok(())
}
