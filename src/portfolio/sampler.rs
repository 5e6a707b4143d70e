//! # Random Portfolio Sampler
//!
//! $$
//! u_i\sim\mathcal U[0,1),\qquad w_i=\frac{u_i}{\sum_j u_j}
//! $$
//!
//! Monte Carlo approximation of the efficient frontier. Draws are normalized
//! uniforms (not Dirichlet), which concentrates samples toward the centre of
//! the simplex.

use impl_new_derive::ImplNew;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::parallel::prelude::*;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;
use tracing::debug;
use tracing::warn;

use super::metrics::annualized_return;
use super::metrics::portfolio_volatility;
use super::metrics::sharpe_ratio;
use super::returns::ReturnSeries;
use super::types::PortfolioMetrics;
use super::types::PortfolioSample;
use super::types::SampleSet;
use super::types::WeightVector;
use crate::config::EngineConfig;
use crate::error::ensure_len;
use crate::error::EngineError;
use crate::error::Result;

/// Draws random long-only portfolios and scores them.
#[derive(Clone, Copy, Debug, ImplNew)]
pub struct RandomPortfolioSampler {
  pub num_portfolios: usize,
  pub risk_free_rate: f64,
  pub trading_days: usize,
}

impl RandomPortfolioSampler {
  pub fn from_config(cfg: &EngineConfig) -> Self {
    Self::new(cfg.num_portfolios, cfg.risk_free_rate, cfg.trading_days)
  }

  /// Sample portfolios over the assets of `series`.
  pub fn sample<R: Rng + ?Sized>(&self, series: &ReturnSeries, rng: &mut R) -> Result<SampleSet> {
    self.sample_moments(series.mean_daily.view(), series.covariance.view(), rng)
  }

  /// Sample portfolios from daily mean returns and an annualized covariance.
  ///
  /// Uniform draws are taken sequentially from `rng`, so a fixed seed always
  /// yields the same set; scoring is done in parallel and keeps draw order.
  pub fn sample_moments<R: Rng + ?Sized>(
    &self,
    mean_daily: ArrayView1<f64>,
    cov: ArrayView2<f64>,
    rng: &mut R,
  ) -> Result<SampleSet> {
    let k = mean_daily.len();
    if k == 0 {
      return Err(EngineError::InsufficientData {
        what: "assets",
        required: 1,
        actual: 0,
      });
    }
    ensure_len("covariance rows", k, cov.nrows())?;
    ensure_len("covariance columns", k, cov.ncols())?;
    if self.num_portfolios == 0 {
      return Err(EngineError::InvalidParameter(
        "number of sampled portfolios must be positive".into(),
      ));
    }

    let unit = Uniform::new(0.0, 1.0);
    let draws = Array2::<f64>::random_using((self.num_portfolios, k), unit, rng);

    let samples: Vec<PortfolioSample> = draws
      .axis_iter(Axis(0))
      .into_par_iter()
      .map(|u| self.score(u, mean_daily, cov))
      .collect();

    let set = SampleSet { samples };
    let degenerate = set.degenerate_count();
    if degenerate > 0 {
      warn!(
        degenerate,
        total = set.len(),
        "zero-volatility portfolios scored with -inf Sharpe"
      );
    }
    debug!(samples = set.len(), assets = k, "sampled random portfolios");

    Ok(set)
  }

  fn score(&self, u: ArrayView1<f64>, mean_daily: ArrayView1<f64>, cov: ArrayView2<f64>) -> PortfolioSample {
    let total = u.sum();
    let weights = if total > 0.0 {
      WeightVector::from_simplex(&u / total)
    } else {
      WeightVector::equal(u.len())
    };

    let expected_return = annualized_return(weights.view(), mean_daily, self.trading_days);
    let volatility = portfolio_volatility(weights.view(), cov);
    // Degenerate draws are kept but can never win the max-Sharpe scan.
    let sharpe = sharpe_ratio(expected_return, volatility, self.risk_free_rate).unwrap_or(f64::NEG_INFINITY);

    PortfolioSample {
      weights,
      metrics: PortfolioMetrics::new(expected_return, volatility, sharpe),
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use ndarray::array;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;

  fn moments() -> (ndarray::Array1<f64>, ndarray::Array2<f64>) {
    (
      array![0.0008, 0.0004, 0.0002],
      array![[0.09, 0.01, 0.0], [0.01, 0.04, 0.005], [0.0, 0.005, 0.01]],
    )
  }

  #[test]
  fn every_sample_lies_on_the_simplex() {
    let (mu, cov) = moments();
    let mut rng = StdRng::seed_from_u64(7);
    let set = RandomPortfolioSampler::new(500, 0.105, 252)
      .sample_moments(mu.view(), cov.view(), &mut rng)
      .unwrap();

    assert_eq!(set.len(), 500);
    for s in &set.samples {
      assert_abs_diff_eq!(s.weights.sum(), 1.0, epsilon = 1e-6);
      assert!(s.weights.iter().all(|&w| w >= 0.0));
    }
  }

  #[test]
  fn sample_metrics_are_self_consistent() {
    let (mu, cov) = moments();
    let rf = 0.105;
    let mut rng = StdRng::seed_from_u64(11);
    let set = RandomPortfolioSampler::new(200, rf, 252)
      .sample_moments(mu.view(), cov.view(), &mut rng)
      .unwrap();

    for s in &set.samples {
      let vol = portfolio_volatility(s.weights.view(), cov.view());
      assert_relative_eq!(s.volatility(), vol, max_relative = 1e-12);
      assert_relative_eq!(s.sharpe(), (s.expected_return() - rf) / s.volatility(), max_relative = 1e-12);
      assert_relative_eq!(
        s.expected_return(),
        s.weights.view().dot(&mu) * 252.0,
        max_relative = 1e-12
      );
    }
  }

  #[test]
  fn fixed_seed_reproduces_the_sample_set() {
    let (mu, cov) = moments();
    let sampler = RandomPortfolioSampler::new(300, 0.105, 252);
    let a = sampler
      .sample_moments(mu.view(), cov.view(), &mut StdRng::seed_from_u64(42))
      .unwrap();
    let b = sampler
      .sample_moments(mu.view(), cov.view(), &mut StdRng::seed_from_u64(42))
      .unwrap();

    assert_eq!(a.samples, b.samples);
  }

  #[test]
  fn zero_variance_single_asset_gets_sentinel_sharpe() {
    let mu = array![0.001];
    let cov = array![[0.0]];
    let mut rng = StdRng::seed_from_u64(1);
    let set = RandomPortfolioSampler::new(10, 0.105, 252)
      .sample_moments(mu.view(), cov.view(), &mut rng)
      .unwrap();

    assert_eq!(set.degenerate_count(), 10);
    assert!(set.samples.iter().all(|s| s.sharpe() == f64::NEG_INFINITY));
  }

  #[test]
  fn mismatched_covariance_is_rejected() {
    let mu = array![0.001, 0.002];
    let cov = array![[0.04]];
    let mut rng = StdRng::seed_from_u64(1);
    let res = RandomPortfolioSampler::new(10, 0.105, 252).sample_moments(mu.view(), cov.view(), &mut rng);
    assert!(matches!(res, Err(EngineError::DimensionMismatch { .. })));
  }
}
