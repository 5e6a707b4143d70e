//! # Risk Parity
//!
//! $$
//! RC_i=\frac{w_i(\Sigma\mathbf{w})_i}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}},\qquad
//! RC_1=\dots=RC_k
//! $$
//!
//! Two multiplicative balancers:
//!
//! - [`RiskParityBalancer`] nudges equal weights toward equal risk contributions
//!   for a fixed number of rounds (no convergence test).
//! - [`HybridRiskParityBalancer`] starts from a Markowitz weighting and trims the
//!   single largest contributor until every contribution is under a cap.

use ndarray::Array1;
use ndarray::ArrayView2;
use tracing::debug;
use tracing::warn;

use super::metrics::risk_contributions;
use super::types::WeightVector;
use crate::config::HybridConfig;
use crate::config::RiskParityConfig;
use crate::error::ensure_len;
use crate::error::EngineError;
use crate::error::Result;

fn check_covariance(cov: ArrayView2<f64>) -> Result<usize> {
  let k = cov.nrows();
  ensure_len("covariance columns", k, cov.ncols())?;
  if k == 0 {
    return Err(EngineError::InsufficientData {
      what: "assets",
      required: 1,
      actual: 0,
    });
  }
  Ok(k)
}

fn renormalize(w: &mut Array1<f64>) {
  let total = w.sum();
  if total > 0.0 {
    *w /= total;
  } else {
    w.fill(1.0 / w.len() as f64);
  }
}

/// First index of the largest entry.
fn first_argmax(x: &Array1<f64>) -> (usize, f64) {
  let mut best = (0, f64::NEG_INFINITY);
  for (i, &v) in x.iter().enumerate() {
    if v > best.1 {
      best = (i, v);
    }
  }
  best
}

/// Pure equal-risk-contribution balancer.
///
/// Each round shrinks the weights of above-average contributors by
/// `shrink_factor`, grows the rest by `grow_factor` and renormalizes.
#[derive(Clone, Copy, Debug, Default)]
pub struct RiskParityBalancer {
  pub config: RiskParityConfig,
}

impl RiskParityBalancer {
  pub fn new(config: RiskParityConfig) -> Self {
    Self { config }
  }

  pub fn balance(&self, cov: ArrayView2<f64>) -> Result<WeightVector> {
    let k = check_covariance(cov)?;
    let RiskParityConfig {
      rounds,
      shrink_factor,
      grow_factor,
    } = self.config;

    let mut w = Array1::from_elem(k, 1.0 / k as f64);
    for _ in 0..rounds {
      let rc = risk_contributions(w.view(), cov);
      let mean_rc = rc.sum() / k as f64;

      w.zip_mut_with(&rc, |wi, &rci| {
        *wi *= if rci > mean_rc { shrink_factor } else { grow_factor };
      });
      renormalize(&mut w);
    }

    debug!(assets = k, rounds, "risk parity weights computed");
    Ok(WeightVector::from_simplex(w))
  }
}

/// Default risk-contribution cap for `k` assets.
///
/// Fixed policy table: 2 → 0.50, 3 → 0.40, 4 → 0.35, anything else → 0.30.
pub fn default_threshold(k: usize) -> f64 {
  match k {
    2 => 0.50,
    3 => 0.40,
    4 => 0.35,
    _ => 0.30,
  }
}

/// Project `w` onto `{x >= floor, sum(x) = 1}` by pinning the assets that fall
/// under the floor and rescaling the others. An infeasible floor (`k * floor > 1`)
/// is lowered to `1/k`.
pub fn apply_weight_floor(w: &Array1<f64>, floor: f64) -> Array1<f64> {
  let k = w.len();
  if k == 0 {
    return w.clone();
  }
  let floor = floor.max(0.0).min(1.0 / k as f64);

  let mut pinned = vec![false; k];
  let mut out = w.clone();
  loop {
    let n_pinned = pinned.iter().filter(|&&p| p).count();
    let n_free = k - n_pinned;
    let free_mass = 1.0 - floor * n_pinned as f64;
    let free_total: f64 = w
      .iter()
      .zip(&pinned)
      .filter(|(_, &p)| !p)
      .map(|(&x, _)| x.max(0.0))
      .sum();

    for i in 0..k {
      out[i] = if pinned[i] {
        floor
      } else if free_total > 0.0 {
        w[i].max(0.0) / free_total * free_mass
      } else {
        free_mass / n_free as f64
      };
    }

    let below: Vec<usize> = (0..k).filter(|&i| !pinned[i] && out[i] < floor).collect();
    if below.is_empty() {
      return out;
    }
    for i in below {
      pinned[i] = true;
    }
    if pinned.iter().all(|&p| p) {
      return Array1::from_elem(k, 1.0 / k as f64);
    }
  }
}

/// Result of a hybrid balancing run.
#[derive(Clone, Debug, PartialEq)]
pub struct HybridOutcome {
  pub weights: WeightVector,
  /// Whether the largest risk contribution ended at or under the cap.
  pub converged: bool,
  /// Number of trimming steps that were applied.
  pub iterations: usize,
  /// Largest risk contribution of `weights`.
  pub max_contribution: f64,
  /// Cap that was enforced.
  pub threshold: f64,
}

/// Caps per-asset risk contribution of a starting weighting.
///
/// Non-convergence within `max_iterations` is not an error; the last iterate is
/// returned with `converged == false`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HybridRiskParityBalancer {
  pub config: HybridConfig,
}

impl HybridRiskParityBalancer {
  pub fn new(config: HybridConfig) -> Self {
    Self { config }
  }

  pub fn balance(&self, start: &WeightVector, cov: ArrayView2<f64>) -> Result<HybridOutcome> {
    let k = check_covariance(cov)?;
    ensure_len("starting weights", k, start.len())?;

    let HybridConfig {
      threshold,
      max_iterations,
      damping,
      weight_floor,
    } = self.config;
    let threshold = threshold.unwrap_or_else(|| default_threshold(k));

    let mut w = apply_weight_floor(start.as_array(), weight_floor);
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..max_iterations {
      let rc = risk_contributions(w.view(), cov);
      let (top, max_rc) = first_argmax(&rc);
      if max_rc <= threshold {
        converged = true;
        break;
      }

      let reduction = ((max_rc - threshold) * damping).min(1.0);
      let original = w[top];
      w[top] = original * (1.0 - reduction);
      if k > 1 {
        let share = original * reduction / (k - 1) as f64;
        for (i, wi) in w.iter_mut().enumerate() {
          if i != top {
            *wi += share;
          }
        }
      }
      renormalize(&mut w);
      w = apply_weight_floor(&w, weight_floor);
      iterations += 1;
    }

    let (_, max_contribution) = first_argmax(&risk_contributions(w.view(), cov));
    converged = converged || max_contribution <= threshold;

    if converged {
      debug!(iterations, max_contribution, threshold, "hybrid risk parity converged");
    } else {
      warn!(
        iterations,
        max_contribution, threshold, "hybrid risk parity did not converge, keeping last iterate"
      );
    }

    Ok(HybridOutcome {
      weights: WeightVector::from_simplex(w),
      converged,
      iterations,
      max_contribution,
      threshold,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;

  fn three_assets() -> ndarray::Array2<f64> {
    array![[0.09, 0.01, 0.0], [0.01, 0.04, 0.005], [0.0, 0.005, 0.01]]
  }

  #[test]
  fn pure_risk_parity_is_even_for_symmetric_assets() {
    let cov = array![[0.04, 0.0], [0.0, 0.04]];
    let w = RiskParityBalancer::default().balance(cov.view()).unwrap();
    assert_abs_diff_eq!(w[0], 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(w[1], 0.5, epsilon = 1e-9);
  }

  #[test]
  fn pure_risk_parity_favours_the_quieter_asset() {
    let cov = array![[0.09, 0.0], [0.0, 0.01]];
    let w = RiskParityBalancer::default().balance(cov.view()).unwrap();
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-9);
    assert!(w[1] > w[0]);
    assert!(w.iter().all(|&x| x >= 0.0));
  }

  #[test]
  fn threshold_table_is_fixed() {
    assert_eq!(default_threshold(2), 0.50);
    assert_eq!(default_threshold(3), 0.40);
    assert_eq!(default_threshold(4), 0.35);
    assert_eq!(default_threshold(5), 0.30);
    assert_eq!(default_threshold(12), 0.30);
  }

  #[test]
  fn floor_projection_keeps_unit_sum() {
    let w = array![0.97, 0.02, 0.01];
    let out = apply_weight_floor(&w, 0.05);
    assert_abs_diff_eq!(out.sum(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(out[1], 0.05, epsilon = 1e-12);
    assert_abs_diff_eq!(out[2], 0.05, epsilon = 1e-12);
    assert_abs_diff_eq!(out[0], 0.90, epsilon = 1e-12);
  }

  #[test]
  fn floor_projection_is_identity_above_floor() {
    let w = array![0.5, 0.3, 0.2];
    assert_eq!(apply_weight_floor(&w, 0.05), w);
  }

  #[test]
  fn hybrid_respects_floor_on_a_volatile_start() {
    // Large variances so the contributions start above the 0.40 cap.
    let cov = array![[4.0, 0.2, 0.0], [0.2, 1.0, 0.1], [0.0, 0.1, 0.25]];
    let start = WeightVector::normalized(array![0.90, 0.08, 0.02]).unwrap();

    let out = HybridRiskParityBalancer::default()
      .balance(&start, cov.view())
      .unwrap();

    assert_abs_diff_eq!(out.weights.sum(), 1.0, epsilon = 1e-6);
    assert!(out.weights.min() >= 0.05 - 1e-12);
    assert_eq!(out.threshold, 0.40);
  }

  #[test]
  fn hybrid_caps_three_assets_at_forty_percent() {
    // One dominant, very volatile asset: the first trim removes all of it and
    // the floor hands 0.05 back.
    let cov = array![[25.0, 0.0, 0.0], [0.0, 0.01, 0.0], [0.0, 0.0, 0.01]];
    let start = WeightVector::normalized(array![0.5, 0.25, 0.25]).unwrap();

    let out = HybridRiskParityBalancer::default()
      .balance(&start, cov.view())
      .unwrap();

    assert!(out.converged);
    assert_eq!(out.iterations, 1);
    assert!(out.iterations < 20);
    assert_eq!(out.threshold, 0.40);
    assert_abs_diff_eq!(out.weights[0], 0.05, epsilon = 1e-12);
    assert_abs_diff_eq!(out.weights[1], 0.475, epsilon = 1e-12);
    assert_abs_diff_eq!(out.weights[2], 0.475, epsilon = 1e-12);

    let rc = risk_contributions(out.weights.view(), cov.view());
    assert!(rc.iter().all(|&x| x <= 0.40));
    assert_abs_diff_eq!(out.max_contribution, rc[0], epsilon = 1e-15);
    assert!(out.weights.min() >= 0.05 - 1e-12);
  }

  #[test]
  fn hybrid_leaves_balanced_portfolio_untouched() {
    let cov = three_assets();
    let start = WeightVector::normalized(array![0.2, 0.3, 0.5]).unwrap();
    let out = HybridRiskParityBalancer::default()
      .balance(&start, cov.view())
      .unwrap();

    assert!(out.converged);
    assert_eq!(out.iterations, 0);
    assert_eq!(out.weights, start);
  }

  #[test]
  #[traced_test]
  fn hybrid_non_convergence_returns_last_iterate() {
    let cov = array![[1.0, 0.0], [0.0, 1.0]];
    let start = WeightVector::normalized(array![0.5, 0.5]).unwrap();
    let balancer = HybridRiskParityBalancer::new(HybridConfig {
      threshold: Some(0.01),
      max_iterations: 3,
      ..HybridConfig::default()
    });

    let out = balancer.balance(&start, cov.view()).unwrap();
    assert!(!out.converged);
    assert_eq!(out.iterations, 3);
    assert_abs_diff_eq!(out.weights.sum(), 1.0, epsilon = 1e-9);
    assert!(logs_contain("did not converge"));
  }

  #[test]
  fn hybrid_rejects_mismatched_start() {
    let cov = three_assets();
    let start = WeightVector::equal(2);
    assert!(matches!(
      HybridRiskParityBalancer::default().balance(&start, cov.view()),
      Err(EngineError::DimensionMismatch { .. })
    ));
  }
}
