//! # Portfolio Metrics
//!
//! $$
//! \sigma_p=\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}},\qquad
//! RC_i=\frac{w_i(\Sigma\mathbf{w})_i}{\sigma_p}
//! $$
//!
//! Quadratic forms over the covariance matrix. The matrix is never inverted,
//! so singular inputs are fine.

use ndarray::Array1;
use ndarray::ArrayView1;
use ndarray::ArrayView2;

use super::types::PortfolioMetrics;
use crate::error::EngineError;
use crate::error::Result;

/// Volatilities at or below this value are treated as zero.
pub const VOLATILITY_EPSILON: f64 = 1e-15;

/// `w' Σ w`, clamped at zero against round-off on near-singular matrices.
pub fn portfolio_variance(w: ArrayView1<f64>, cov: ArrayView2<f64>) -> f64 {
  w.dot(&cov.dot(&w)).max(0.0)
}

pub fn portfolio_volatility(w: ArrayView1<f64>, cov: ArrayView2<f64>) -> f64 {
  portfolio_variance(w, cov).sqrt()
}

/// Weighted mean of daily asset returns, annualized.
pub fn annualized_return(w: ArrayView1<f64>, mean_daily: ArrayView1<f64>, trading_days: usize) -> f64 {
  w.dot(&mean_daily) * trading_days as f64
}

/// Sharpe ratio, or [`EngineError::DegenerateCovariance`] when volatility is zero.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free: f64) -> Result<f64> {
  if volatility.is_nan() || volatility <= VOLATILITY_EPSILON {
    return Err(EngineError::DegenerateCovariance { volatility });
  }
  Ok((expected_return - risk_free) / volatility)
}

/// Per-asset risk contribution `w_i (Σw)_i / σ_p`. All zeros for a riskless portfolio.
pub fn risk_contributions(w: ArrayView1<f64>, cov: ArrayView2<f64>) -> Array1<f64> {
  let sigma_w = cov.dot(&w);
  let sigma = w.dot(&sigma_w).max(0.0).sqrt();
  if sigma <= VOLATILITY_EPSILON {
    return Array1::zeros(w.len());
  }
  &w * &sigma_w / sigma
}

/// Annualized return, volatility and Sharpe of one weighting.
///
/// A zero-volatility weighting gets a `-inf` Sharpe instead of an error.
pub fn evaluate(
  w: ArrayView1<f64>,
  mean_daily: ArrayView1<f64>,
  cov: ArrayView2<f64>,
  trading_days: usize,
  risk_free: f64,
) -> PortfolioMetrics {
  let expected_return = annualized_return(w, mean_daily, trading_days);
  let volatility = portfolio_volatility(w, cov);
  let sharpe = sharpe_ratio(expected_return, volatility, risk_free).unwrap_or(f64::NEG_INFINITY);

  PortfolioMetrics::new(expected_return, volatility, sharpe)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn volatility_matches_closed_form_for_two_assets() {
    let w = array![0.6, 0.4];
    let cov = array![[0.04, 0.006], [0.006, 0.09]];
    let expected = (0.36 * 0.04 + 0.16 * 0.09 + 2.0 * 0.24 * 0.006_f64).sqrt();
    assert_abs_diff_eq!(portfolio_volatility(w.view(), cov.view()), expected, epsilon = 1e-12);
  }

  #[test]
  fn risk_contributions_sum_to_volatility() {
    let w = array![0.2, 0.3, 0.5];
    let cov = array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.02], [0.0, 0.02, 0.16]];
    let rc = risk_contributions(w.view(), cov.view());
    assert_abs_diff_eq!(rc.sum(), portfolio_volatility(w.view(), cov.view()), epsilon = 1e-12);
  }

  #[test]
  fn riskless_portfolio_has_zero_contributions_and_degenerate_sharpe() {
    let w = array![0.5, 0.5];
    let cov = array![[0.0, 0.0], [0.0, 0.0]];
    assert!(risk_contributions(w.view(), cov.view()).iter().all(|&x| x == 0.0));
    assert!(matches!(
      sharpe_ratio(0.1, 0.0, 0.05),
      Err(EngineError::DegenerateCovariance { .. })
    ));

    let m = evaluate(w.view(), array![0.001, 0.001].view(), cov.view(), 252, 0.05);
    assert_eq!(m.sharpe, f64::NEG_INFINITY);
  }

  #[test]
  fn singular_covariance_is_handled_without_inversion() {
    let cov = array![[0.04, 0.04], [0.04, 0.04]];
    let w = array![0.5, 0.5];
    assert_abs_diff_eq!(portfolio_volatility(w.view(), cov.view()), 0.2, epsilon = 1e-12);
  }
}
