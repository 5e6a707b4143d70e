//! # Errors
//!
//! $$
//! \sigma_p = 0 \Rightarrow \text{Sharpe undefined}
//! $$
//!
//! Error taxonomy shared by every engine stage.

use thiserror::Error;

/// Errors raised by the portfolio engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
  /// Too few assets or too few aligned observations to estimate moments.
  #[error("insufficient data: need at least {required} {what}, got {actual}")]
  InsufficientData {
    what: &'static str,
    required: usize,
    actual: usize,
  },

  /// A portfolio evaluated to zero volatility, so its Sharpe ratio is undefined.
  ///
  /// Recoverable: the sampler absorbs it with a `-inf` Sharpe sentinel.
  #[error("degenerate covariance: portfolio volatility is {volatility}")]
  DegenerateCovariance { volatility: f64 },

  /// Non-positive investment amount or projection horizon.
  #[error("invalid valuation input: {0}")]
  Valuation(String),

  #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
  DimensionMismatch {
    context: &'static str,
    expected: usize,
    actual: usize,
  },

  #[error("invalid parameter: {0}")]
  InvalidParameter(String),

  #[error("non-finite or non-positive input for {asset}: {value}")]
  NonFiniteInput { asset: String, value: f64 },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

pub(crate) fn ensure_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
  if expected != actual {
    return Err(EngineError::DimensionMismatch {
      context,
      expected,
      actual,
    });
  }
  Ok(())
}
