//! # Return Series
//!
//! $$
//! r_{t,i}=\frac{P_{t,i}}{P_{t-1,i}}-1,\qquad
//! \Sigma = 252\cdot\frac{1}{T-1}\sum_t (r_t-\bar r)(r_t-\bar r)^\top
//! $$
//!
//! Date alignment of per-asset closes, simple daily returns and annualized
//! covariance.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use tracing::debug;

use crate::error::ensure_len;
use crate::error::EngineError;
use crate::error::Result;

/// Relative tolerance on `Σ_ij == Σ_ji` for supplied covariances.
pub const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Close-price history of one asset.
#[derive(Clone, Debug, ImplNew)]
pub struct AssetPrices {
  /// Asset identifier, e.g. `"PETR4.SA"`.
  pub ticker: String,
  /// `(date, close)` observations in any order.
  pub closes: Vec<(NaiveDate, f64)>,
}

/// Close prices of several assets on their common dates.
#[derive(Clone, Debug)]
pub struct AlignedPrices {
  pub tickers: Vec<String>,
  /// Ascending common dates.
  pub dates: Vec<NaiveDate>,
  /// Rows = dates, columns = assets.
  pub closes: Array2<f64>,
}

/// Intersect the date sets of all assets and lay their closes out as a matrix.
///
/// Duplicate dates keep the last observation. Non-finite or non-positive closes
/// on a common date are rejected.
pub fn align_prices(series: &[AssetPrices]) -> Result<AlignedPrices> {
  if series.is_empty() {
    return Err(EngineError::InsufficientData {
      what: "assets",
      required: 2,
      actual: 0,
    });
  }

  let maps: Vec<BTreeMap<NaiveDate, f64>> = series
    .iter()
    .map(|s| s.closes.iter().copied().collect())
    .collect();

  let mut common: BTreeSet<NaiveDate> = maps[0].keys().copied().collect();
  for m in &maps[1..] {
    common.retain(|d| m.contains_key(d));
  }
  let dates: Vec<NaiveDate> = common.into_iter().collect();

  let mut closes = Array2::<f64>::zeros((dates.len(), series.len()));
  for (j, (asset, m)) in series.iter().zip(maps.iter()).enumerate() {
    for (i, d) in dates.iter().enumerate() {
      let px = m[d];
      if !px.is_finite() || px <= 0.0 {
        return Err(EngineError::NonFiniteInput {
          asset: asset.ticker.clone(),
          value: px,
        });
      }
      closes[[i, j]] = px;
    }
  }

  debug!(
    assets = series.len(),
    common_dates = dates.len(),
    "aligned price series"
  );

  Ok(AlignedPrices {
    tickers: series.iter().map(|s| s.ticker.clone()).collect(),
    dates,
    closes,
  })
}

/// Daily simple returns and their annualized moments.
#[derive(Clone, Debug)]
pub struct ReturnSeries {
  pub tickers: Vec<String>,
  /// Rows = trading days, columns = assets. Empty when built from moments.
  pub returns: Array2<f64>,
  /// Per-asset mean daily return.
  pub mean_daily: Array1<f64>,
  /// Annualized covariance of daily returns.
  pub covariance: Array2<f64>,
  /// Annualization factor used for `covariance`.
  pub trading_days: usize,
}

impl ReturnSeries {
  /// Differentiate aligned closes into simple returns.
  pub fn from_prices(prices: &AlignedPrices, trading_days: usize) -> Result<Self> {
    Self::from_closes(prices.tickers.clone(), &prices.closes, trading_days)
  }

  /// Build from a close matrix (rows = dates, columns = assets).
  pub fn from_closes(tickers: Vec<String>, closes: &Array2<f64>, trading_days: usize) -> Result<Self> {
    let (n_obs, k) = closes.dim();
    ensure_len("tickers vs close columns", k, tickers.len())?;

    if k < 2 {
      return Err(EngineError::InsufficientData {
        what: "assets",
        required: 2,
        actual: k,
      });
    }
    if n_obs < 3 {
      return Err(EngineError::InsufficientData {
        what: "return observations",
        required: 2,
        actual: n_obs.saturating_sub(1),
      });
    }

    for (j, col) in closes.axis_iter(Axis(1)).enumerate() {
      if let Some(&bad) = col.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(EngineError::NonFiniteInput {
          asset: tickers[j].clone(),
          value: bad,
        });
      }
    }

    let prev = closes.slice(ndarray::s![..-1, ..]);
    let next = closes.slice(ndarray::s![1.., ..]);
    let returns = &next / &prev - 1.0;

    Self::from_returns(tickers, returns, trading_days)
  }

  /// Build from an already computed return matrix (rows = days, columns = assets).
  pub fn from_returns(tickers: Vec<String>, returns: Array2<f64>, trading_days: usize) -> Result<Self> {
    let (n_obs, k) = returns.dim();
    ensure_len("tickers vs return columns", k, tickers.len())?;

    if k < 2 {
      return Err(EngineError::InsufficientData {
        what: "assets",
        required: 2,
        actual: k,
      });
    }
    if n_obs < 2 {
      return Err(EngineError::InsufficientData {
        what: "return observations",
        required: 2,
        actual: n_obs,
      });
    }
    if let Some(&bad) = returns.iter().find(|r| !r.is_finite()) {
      return Err(EngineError::NonFiniteInput {
        asset: "returns".into(),
        value: bad,
      });
    }

    let mean_daily = returns
      .mean_axis(Axis(0))
      .ok_or(EngineError::InsufficientData {
        what: "return observations",
        required: 2,
        actual: 0,
      })?;
    let covariance = sample_covariance(&returns, &mean_daily) * trading_days as f64;

    debug!(assets = k, observations = n_obs, "built return series");

    Ok(Self {
      tickers,
      returns,
      mean_daily,
      covariance,
      trading_days,
    })
  }

  /// Build from pre-computed moments: daily mean returns and an annualized covariance.
  pub fn from_moments(
    tickers: Vec<String>,
    mean_daily: Array1<f64>,
    covariance: Array2<f64>,
    trading_days: usize,
  ) -> Result<Self> {
    let k = mean_daily.len();
    ensure_len("tickers vs mean returns", k, tickers.len())?;
    ensure_len("covariance rows", k, covariance.nrows())?;
    ensure_len("covariance columns", k, covariance.ncols())?;
    if k < 2 {
      return Err(EngineError::InsufficientData {
        what: "assets",
        required: 2,
        actual: k,
      });
    }

    if let Some(&bad) = mean_daily.iter().chain(covariance.iter()).find(|x| !x.is_finite()) {
      return Err(EngineError::NonFiniteInput {
        asset: "moments".into(),
        value: bad,
      });
    }
    for i in 0..k {
      if covariance[[i, i]] < 0.0 {
        return Err(EngineError::InvalidParameter(format!(
          "covariance diagonal must be non-negative, got {} for {}",
          covariance[[i, i]],
          tickers[i]
        )));
      }
      for j in (i + 1)..k {
        let (a, b) = (covariance[[i, j]], covariance[[j, i]]);
        if (a - b).abs() > SYMMETRY_TOLERANCE * a.abs().max(b.abs()).max(1.0) {
          return Err(EngineError::InvalidParameter(format!(
            "covariance must be symmetric, got {a} vs {b} for {} / {}",
            tickers[i], tickers[j]
          )));
        }
      }
    }

    Ok(Self {
      tickers,
      returns: Array2::zeros((0, k)),
      mean_daily,
      covariance,
      trading_days,
    })
  }

  pub fn n_assets(&self) -> usize {
    self.mean_daily.len()
  }

  pub fn n_observations(&self) -> usize {
    self.returns.nrows()
  }

  /// Per-asset annualized mean return.
  pub fn annual_returns(&self) -> Array1<f64> {
    &self.mean_daily * self.trading_days as f64
  }

  /// Per-asset annualized volatility, `sqrt(Σ_ii)`.
  pub fn annual_volatilities(&self) -> Array1<f64> {
    self.covariance.diag().mapv(|v| v.max(0.0).sqrt())
  }
}

/// Unbiased (`n - 1`) covariance of the columns of `returns`.
fn sample_covariance(returns: &Array2<f64>, mean: &Array1<f64>) -> Array2<f64> {
  let n = returns.nrows();
  let centered = returns - mean;
  let mut cov = centered.t().dot(&centered) / (n - 1) as f64;

  // Force exact symmetry; the product above can differ in the last bit.
  let k = cov.nrows();
  for i in 0..k {
    for j in (i + 1)..k {
      let v = 0.5 * (cov[[i, j]] + cov[[j, i]]);
      cov[[i, j]] = v;
      cov[[j, i]] = v;
    }
  }
  cov
}
