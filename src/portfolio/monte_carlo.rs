//! # Monte Carlo Projection
//!
//! $$
//! r_t\sim\mathcal N\!\left(\frac{\mu}{252},\frac{\sigma^2}{252}\right),\qquad
//! V_t = V_0\prod_{s\le t}(1+r_s)
//! $$
//!
//! Forward value paths of a portfolio with known annual return and volatility,
//! summarized by per-day 5/50/95 percentile bands and terminal percentiles.

use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Normal;
use rayon::prelude::*;
use tracing::debug;

use crate::config::ProjectionRequest;
use crate::error::EngineError;
use crate::error::Result;

/// Linear-interpolated percentile of an ascending slice, `q` in `[0, 100]`.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
  match sorted.len() {
    0 => f64::NAN,
    1 => sorted[0],
    n => {
      let pos = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
      let lo = pos.floor() as usize;
      let hi = pos.ceil() as usize;
      let frac = pos - lo as f64;
      sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
  }
}

fn sorted_copy(values: ArrayView1<f64>) -> Vec<f64> {
  let mut v = values.to_vec();
  v.sort_by(f64::total_cmp);
  v
}

/// Per-day percentiles across all simulated paths.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationBand {
  pub p5: Array1<f64>,
  pub p50: Array1<f64>,
  pub p95: Array1<f64>,
}

impl SimulationBand {
  pub fn len(&self) -> usize {
    self.p50.len()
  }

  pub fn is_empty(&self) -> bool {
    self.p50.is_empty()
  }
}

/// Terminal-value percentiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerminalPercentiles {
  /// 5th percentile.
  pub pessimistic: f64,
  /// 50th percentile.
  pub median: f64,
  /// 95th percentile.
  pub optimistic: f64,
}

/// Summary of a projection run.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
  pub investment: f64,
  /// Number of simulated trading sessions.
  pub days: usize,
  pub paths: usize,
  pub band: SimulationBand,
  pub terminal: TerminalPercentiles,
}

/// Compounds i.i.d. normal daily returns from an initial investment.
#[derive(Clone, Copy, Debug, ImplNew)]
pub struct MonteCarloProjector {
  pub trading_days: usize,
}

impl MonteCarloProjector {
  /// Simulate value paths, rows = trading days, columns = paths.
  ///
  /// One sub-seed per path is drawn from `rng` up front, so the matrix only
  /// depends on the state of `rng`, not on how rayon schedules the paths.
  pub fn simulate_paths<R: Rng + ?Sized>(
    &self,
    annual_return: f64,
    annual_volatility: f64,
    request: &ProjectionRequest,
    rng: &mut R,
  ) -> Result<Array2<f64>> {
    request.validate(self.trading_days)?;
    if !annual_return.is_finite() || !annual_volatility.is_finite() || annual_volatility < 0.0 {
      return Err(EngineError::InvalidParameter(format!(
        "annual return/volatility must be finite with volatility >= 0, got {annual_return} / {annual_volatility}"
      )));
    }

    let days = request.horizon_days(self.trading_days);
    let per_year = self.trading_days as f64;
    let daily = Normal::new(annual_return / per_year, annual_volatility / per_year.sqrt())
      .map_err(|e| EngineError::InvalidParameter(format!("daily return distribution: {e}")))?;

    let seeds: Vec<u64> = (0..request.paths).map(|_| rng.gen()).collect();
    let investment = request.investment;

    let columns: Vec<Array1<f64>> = seeds
      .into_par_iter()
      .map(|seed| {
        let mut path_rng = StdRng::seed_from_u64(seed);
        let returns = Array1::<f64>::random_using(days, daily, &mut path_rng);

        let mut path = Array1::<f64>::zeros(days);
        let mut value = investment;
        for (v, r) in path.iter_mut().zip(returns.iter()) {
          value *= 1.0 + r;
          *v = value;
        }
        path
      })
      .collect();

    let mut paths = Array2::<f64>::zeros((days, request.paths));
    for (j, col) in columns.iter().enumerate() {
      paths.column_mut(j).assign(col);
    }
    Ok(paths)
  }

  /// Simulate and reduce to percentile bands.
  pub fn project<R: Rng + ?Sized>(
    &self,
    annual_return: f64,
    annual_volatility: f64,
    request: &ProjectionRequest,
    rng: &mut R,
  ) -> Result<Projection> {
    let paths = self.simulate_paths(annual_return, annual_volatility, request, rng)?;
    let (days, n_paths) = paths.dim();

    let rows: Vec<(f64, f64, f64)> = paths
      .axis_iter(Axis(0))
      .into_par_iter()
      .map(|row| {
        let sorted = sorted_copy(row);
        (
          percentile(&sorted, 5.0),
          percentile(&sorted, 50.0),
          percentile(&sorted, 95.0),
        )
      })
      .collect();

    let band = SimulationBand {
      p5: rows.iter().map(|r| r.0).collect(),
      p50: rows.iter().map(|r| r.1).collect(),
      p95: rows.iter().map(|r| r.2).collect(),
    };
    let last = rows[days - 1];
    let terminal = TerminalPercentiles {
      pessimistic: last.0,
      median: last.1,
      optimistic: last.2,
    };

    debug!(
      days,
      paths = n_paths,
      median = terminal.median,
      "monte carlo projection finished"
    );

    Ok(Projection {
      investment: request.investment,
      days,
      paths: n_paths,
      band,
      terminal,
    })
  }
}
