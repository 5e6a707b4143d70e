//! # Portfolio Types
//!
//! $$
//! \mathbf{w}\in\Delta^{k-1}=\{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1\}
//! $$
//!
//! Weight vectors, sampled portfolios and evaluated metrics.

use std::ops::Index;

use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::ArrayView1;

use crate::error::EngineError;
use crate::error::Result;

/// Long-only weight vector on the unit simplex.
///
/// Entries are indexed like the columns of the return matrix. Values are never
/// mutated after construction; transforms build a new vector.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightVector(Array1<f64>);

impl WeightVector {
  /// Absolute tolerance on `sum(w) == 1`.
  pub const TOLERANCE: f64 = 1e-6;

  /// `1/k` for every asset.
  pub fn equal(k: usize) -> Self {
    Self(Array1::from_elem(k, 1.0 / k as f64))
  }

  /// Scale non-negative raw weights so that they sum to one.
  pub fn normalized(raw: Array1<f64>) -> Result<Self> {
    if raw.is_empty() {
      return Err(EngineError::InsufficientData {
        what: "weights",
        required: 1,
        actual: 0,
      });
    }
    if let Some(&bad) = raw.iter().find(|w| !w.is_finite() || **w < 0.0) {
      return Err(EngineError::InvalidParameter(format!(
        "weights must be finite and non-negative, got {bad}"
      )));
    }

    let total = raw.sum();
    if total <= 0.0 {
      return Err(EngineError::InvalidParameter(
        "weights must have a positive sum".into(),
      ));
    }

    Ok(Self(raw / total))
  }

  /// Build from an iterator of raw weights; see [`WeightVector::normalized`].
  pub fn from_raw<I: IntoIterator<Item = f64>>(raw: I) -> Result<Self> {
    Self::normalized(raw.into_iter().collect())
  }

  /// Wrap a vector that is already known to lie on the simplex.
  pub(crate) fn from_simplex(w: Array1<f64>) -> Self {
    debug_assert!((w.sum() - 1.0).abs() < Self::TOLERANCE);
    Self(w)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn view(&self) -> ArrayView1<'_, f64> {
    self.0.view()
  }

  pub fn as_array(&self) -> &Array1<f64> {
    &self.0
  }

  pub fn to_vec(&self) -> Vec<f64> {
    self.0.to_vec()
  }

  pub fn iter(&self) -> impl Iterator<Item = &f64> {
    self.0.iter()
  }

  pub fn sum(&self) -> f64 {
    self.0.sum()
  }

  pub fn min(&self) -> f64 {
    self.0.iter().copied().fold(f64::INFINITY, f64::min)
  }
}

impl Index<usize> for WeightVector {
  type Output = f64;

  fn index(&self, i: usize) -> &f64 {
    &self.0[i]
  }
}

/// Annualized risk/return figures of one weighting.
#[derive(Clone, Copy, Debug, PartialEq, ImplNew)]
pub struct PortfolioMetrics {
  /// Annualized expected return.
  pub expected_return: f64,
  /// Annualized volatility `sqrt(w' Σ w)`.
  pub volatility: f64,
  /// `(expected_return - risk_free) / volatility`, `-inf` when volatility is zero.
  pub sharpe: f64,
}

/// One randomly drawn portfolio together with its metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioSample {
  pub weights: WeightVector,
  pub metrics: PortfolioMetrics,
}

impl PortfolioSample {
  pub fn expected_return(&self) -> f64 {
    self.metrics.expected_return
  }

  pub fn volatility(&self) -> f64 {
    self.metrics.volatility
  }

  pub fn sharpe(&self) -> f64 {
    self.metrics.sharpe
  }
}

/// All portfolios drawn in one optimization run, in draw order.
#[derive(Clone, Debug, Default)]
pub struct SampleSet {
  pub samples: Vec<PortfolioSample>,
}

impl SampleSet {
  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn get(&self, i: usize) -> Option<&PortfolioSample> {
    self.samples.get(i)
  }

  /// Expected returns column, in draw order.
  pub fn returns(&self) -> Array1<f64> {
    self.samples.iter().map(|s| s.expected_return()).collect()
  }

  /// Volatility column, in draw order.
  pub fn volatilities(&self) -> Array1<f64> {
    self.samples.iter().map(|s| s.volatility()).collect()
  }

  /// Sharpe column, in draw order.
  pub fn sharpes(&self) -> Array1<f64> {
    self.samples.iter().map(|s| s.sharpe()).collect()
  }

  /// Number of samples carrying the degenerate `-inf` Sharpe sentinel.
  pub fn degenerate_count(&self) -> usize {
    self
      .samples
      .iter()
      .filter(|s| s.sharpe() == f64::NEG_INFINITY)
      .count()
  }
}
