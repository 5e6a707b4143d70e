//! # Configuration
//!
//! $$
//! \mu_{ann} = 252\,\bar r_d,\qquad \sigma_{ann} = \sqrt{252}\,\sigma_d
//! $$
//!
//! Run-wide constants (risk-free rate, trading calendar) and per-stage knobs.
//! Every component receives these explicitly; nothing is read from globals.

use impl_new_derive::ImplNew;

use crate::error::EngineError;
use crate::error::Result;

/// Trading sessions per calendar year.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Annual risk-free rate used when none is supplied.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.105;

/// Longest projection horizon accepted, in years.
pub const MAX_HORIZON_YEARS: f64 = 30.0;

/// Knobs of the pure fixed-round risk-parity balancer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskParityConfig {
  /// Number of update rounds; there is no early exit.
  pub rounds: usize,
  /// Multiplier applied to assets whose risk contribution is above the mean.
  pub shrink_factor: f64,
  /// Multiplier applied to assets at or below the mean.
  pub grow_factor: f64,
}

impl Default for RiskParityConfig {
  fn default() -> Self {
    Self {
      rounds: 50,
      shrink_factor: 0.95,
      grow_factor: 1.05,
    }
  }
}

/// Knobs of the hybrid (threshold-capping) risk-parity balancer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HybridConfig {
  /// Maximum allowed risk contribution. `None` derives it from the asset count.
  pub threshold: Option<f64>,
  /// Iteration cap; the last iterate is returned when it is hit.
  pub max_iterations: usize,
  /// Fraction of the excess over the threshold removed per iteration.
  pub damping: f64,
  /// Minimum weight of every asset.
  pub weight_floor: f64,
}

impl Default for HybridConfig {
  fn default() -> Self {
    Self {
      threshold: None,
      max_iterations: 20,
      damping: 0.9,
      weight_floor: 0.05,
    }
  }
}

/// Configuration of a full optimization run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
  /// Annual risk-free rate used in every Sharpe computation.
  pub risk_free_rate: f64,
  /// Annualization factor for returns and covariance.
  pub trading_days: usize,
  /// Number of random portfolios drawn by the sampler.
  pub num_portfolios: usize,
  /// Share of the Markowitz weights in the final blend (`1.0` = pure Markowitz).
  pub blend_ratio: f64,
  pub risk_parity: RiskParityConfig,
  pub hybrid: HybridConfig,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      risk_free_rate: DEFAULT_RISK_FREE_RATE,
      trading_days: TRADING_DAYS_PER_YEAR,
      num_portfolios: 5000,
      blend_ratio: 0.5,
      risk_parity: RiskParityConfig::default(),
      hybrid: HybridConfig::default(),
    }
  }
}

impl EngineConfig {
  /// Set the annual risk-free rate.
  pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
    self.risk_free_rate = rate;
    self
  }

  /// Set the annualization factor.
  pub fn with_trading_days(mut self, days: usize) -> Self {
    self.trading_days = days;
    self
  }

  /// Set the number of sampled portfolios.
  pub fn with_num_portfolios(mut self, n: usize) -> Self {
    self.num_portfolios = n;
    self
  }

  /// Set the Markowitz share of the final blend.
  pub fn with_blend_ratio(mut self, p: f64) -> Self {
    self.blend_ratio = p;
    self
  }

  /// Override the hybrid balancer's risk-contribution cap.
  pub fn with_hybrid_threshold(mut self, threshold: f64) -> Self {
    self.hybrid.threshold = Some(threshold);
    self
  }

  /// Reject configurations that would make any stage ill-defined.
  pub fn validate(&self) -> Result<()> {
    if !self.risk_free_rate.is_finite() {
      return Err(EngineError::InvalidParameter(format!(
        "risk-free rate must be finite, got {}",
        self.risk_free_rate
      )));
    }
    if self.trading_days == 0 {
      return Err(EngineError::InvalidParameter(
        "trading days per year must be positive".into(),
      ));
    }
    if self.num_portfolios == 0 {
      return Err(EngineError::InvalidParameter(
        "number of sampled portfolios must be positive".into(),
      ));
    }
    if !(0.0..=1.0).contains(&self.blend_ratio) {
      return Err(EngineError::InvalidParameter(format!(
        "blend ratio must lie in [0, 1], got {}",
        self.blend_ratio
      )));
    }

    let rp = &self.risk_parity;
    if !(rp.shrink_factor > 0.0 && rp.shrink_factor <= 1.0) || !(rp.grow_factor >= 1.0) {
      return Err(EngineError::InvalidParameter(format!(
        "risk-parity factors must satisfy 0 < shrink <= 1 <= grow, got {} / {}",
        rp.shrink_factor, rp.grow_factor
      )));
    }

    let hy = &self.hybrid;
    if let Some(t) = hy.threshold {
      if !(t > 0.0 && t.is_finite()) {
        return Err(EngineError::InvalidParameter(format!(
          "hybrid threshold must be positive, got {t}"
        )));
      }
    }
    if !(hy.damping > 0.0 && hy.damping <= 1.0) {
      return Err(EngineError::InvalidParameter(format!(
        "hybrid damping must lie in (0, 1], got {}",
        hy.damping
      )));
    }
    if !(0.0..1.0).contains(&hy.weight_floor) {
      return Err(EngineError::InvalidParameter(format!(
        "weight floor must lie in [0, 1), got {}",
        hy.weight_floor
      )));
    }

    Ok(())
  }
}

/// Parameters of a Monte Carlo projection.
#[derive(Clone, Copy, Debug, PartialEq, ImplNew)]
pub struct ProjectionRequest {
  /// Initial amount invested.
  pub investment: f64,
  /// Horizon in years; converted to `round(years * trading_days)` sessions.
  pub years: f64,
  /// Number of simulated paths.
  pub paths: usize,
}

impl Default for ProjectionRequest {
  fn default() -> Self {
    Self {
      investment: 50_000.0,
      years: 10.0,
      paths: 250,
    }
  }
}

impl ProjectionRequest {
  /// Number of simulated trading sessions for the given calendar.
  pub fn horizon_days(&self, trading_days: usize) -> usize {
    (self.years * trading_days as f64).round().max(0.0) as usize
  }

  /// Reject non-positive investment, a horizon outside `(0, MAX_HORIZON_YEARS]`
  /// or zero paths before any simulation runs.
  pub fn validate(&self, trading_days: usize) -> Result<()> {
    if !(self.investment > 0.0 && self.investment.is_finite()) {
      return Err(EngineError::Valuation(format!(
        "investment must be positive, got {}",
        self.investment
      )));
    }
    if !(self.years > 0.0 && self.years.is_finite()) {
      return Err(EngineError::Valuation(format!(
        "projection horizon must be positive, got {} years",
        self.years
      )));
    }
    if self.years > MAX_HORIZON_YEARS {
      return Err(EngineError::Valuation(format!(
        "projection horizon of {} years exceeds the {MAX_HORIZON_YEARS}-year limit",
        self.years
      )));
    }
    if self.horizon_days(trading_days) == 0 {
      return Err(EngineError::Valuation(format!(
        "projection horizon of {} years is shorter than one session",
        self.years
      )));
    }
    if self.paths == 0 {
      return Err(EngineError::InvalidParameter(
        "number of simulated paths must be positive".into(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_is_valid() {
    assert!(EngineConfig::default().validate().is_ok());
    assert!(ProjectionRequest::default().validate(TRADING_DAYS_PER_YEAR).is_ok());
  }

  #[test]
  fn blend_ratio_outside_unit_interval_is_rejected() {
    let cfg = EngineConfig::default().with_blend_ratio(1.5);
    assert!(matches!(cfg.validate(), Err(EngineError::InvalidParameter(_))));
  }

  #[test]
  fn non_positive_investment_or_horizon_is_a_valuation_error() {
    let bad_investment = ProjectionRequest::new(0.0, 10.0, 250);
    let bad_years = ProjectionRequest::new(10_000.0, -1.0, 250);

    assert!(matches!(
      bad_investment.validate(TRADING_DAYS_PER_YEAR),
      Err(EngineError::Valuation(_))
    ));
    assert!(matches!(
      bad_years.validate(TRADING_DAYS_PER_YEAR),
      Err(EngineError::Valuation(_))
    ));
  }

  #[test]
  fn horizon_past_thirty_years_is_rejected() {
    let too_long = ProjectionRequest::new(10_000.0, 30.5, 10);
    assert!(matches!(
      too_long.validate(TRADING_DAYS_PER_YEAR),
      Err(EngineError::Valuation(_))
    ));
    assert!(matches!(
      ProjectionRequest::new(10_000.0, 1e300, 10).validate(TRADING_DAYS_PER_YEAR),
      Err(EngineError::Valuation(_))
    ));
    assert!(ProjectionRequest::new(10_000.0, MAX_HORIZON_YEARS, 10)
      .validate(TRADING_DAYS_PER_YEAR)
      .is_ok());
  }

  #[test]
  fn horizon_days_scales_with_calendar() {
    let req = ProjectionRequest::new(1.0, 10.0, 1);
    assert_eq!(req.horizon_days(252), 2520);
    assert_eq!(ProjectionRequest::new(1.0, 0.5, 1).horizon_days(252), 126);
  }
}
