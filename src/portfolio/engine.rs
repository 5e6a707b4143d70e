//! # Portfolio Engine
//!
//! $$
//! \mathbf{w}=p\,\mathbf{w}_{\max S}+(1-p)\,\mathbf{w}_{RP}
//! $$
//!
//! Stateless orchestration: sample the frontier, solve risk parity, blend, and
//! project the blended portfolio forward. Every call returns its full result;
//! nothing is carried between calls.

use ndarray::Array1;
use rand::Rng;
use tracing::info;

use super::blend::WeightBlender;
use super::frontier::FrontierSelection;
use super::frontier::select_frontier;
use super::metrics;
use super::monte_carlo::MonteCarloProjector;
use super::monte_carlo::Projection;
use super::returns::ReturnSeries;
use super::risk_parity::HybridOutcome;
use super::risk_parity::HybridRiskParityBalancer;
use super::risk_parity::RiskParityBalancer;
use super::sampler::RandomPortfolioSampler;
use super::types::PortfolioMetrics;
use super::types::SampleSet;
use super::types::WeightVector;
use crate::config::EngineConfig;
use crate::config::ProjectionRequest;
use crate::error::ensure_len;
use crate::error::EngineError;
use crate::error::Result;

/// Allowed distance of a percent allocation from 100.
pub const PERCENT_TOLERANCE: f64 = 0.5;

/// A weighting together with its evaluated metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
  pub weights: WeightVector,
  pub metrics: PortfolioMetrics,
}

/// Stand-alone annual figures of one asset.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetStats {
  pub ticker: String,
  pub annual_return: f64,
  pub annual_volatility: f64,
}

/// Everything produced by one [`PortfolioEngine::optimize`] call.
#[derive(Clone, Debug)]
pub struct OptimizationReport {
  pub tickers: Vec<String>,
  /// Every sampled portfolio, for frontier plots.
  pub samples: SampleSet,
  pub selection: FrontierSelection,
  /// Maximum-Sharpe sample.
  pub markowitz: Allocation,
  /// Minimum-volatility sample.
  pub conservative: Allocation,
  /// Fixed-round equal risk contribution weights.
  pub risk_parity: Allocation,
  /// Markowitz weights with capped risk contributions. Reported for comparison only.
  pub hybrid: HybridOutcome,
  pub hybrid_metrics: PortfolioMetrics,
  /// Final weights handed to the projection.
  pub blended: Allocation,
  pub assets: Vec<AssetStats>,
}

/// Entry point for optimization and projection runs.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: EngineConfig,
}

impl PortfolioEngine {
  pub fn new(config: EngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Run sampling, frontier selection, both risk-parity balancers and the blend.
  pub fn optimize<R: Rng + ?Sized>(&self, series: &ReturnSeries, rng: &mut R) -> Result<OptimizationReport> {
    self.config.validate()?;
    self.check_calendar(series)?;
    let k = series.n_assets();
    if k < 2 {
      return Err(EngineError::InsufficientData {
        what: "assets",
        required: 2,
        actual: k,
      });
    }
    let cov = series.covariance.view();

    let samples = RandomPortfolioSampler::from_config(&self.config).sample(series, rng)?;
    let selection = select_frontier(&samples)?;
    let markowitz = self.sample_allocation(&samples, selection.optimal)?;
    let conservative = self.sample_allocation(&samples, selection.conservative)?;

    let rp_weights = RiskParityBalancer::new(self.config.risk_parity).balance(cov)?;
    let risk_parity = self.allocation(series, rp_weights)?;

    let hybrid = HybridRiskParityBalancer::new(self.config.hybrid).balance(&markowitz.weights, cov)?;
    let hybrid_metrics = self.evaluate(series, &hybrid.weights)?;

    let blended_weights = WeightBlender::new(self.config.blend_ratio)?.blend(&markowitz.weights, &risk_parity.weights)?;
    let blended = self.allocation(series, blended_weights)?;

    info!(
      assets = k,
      samples = samples.len(),
      max_sharpe = markowitz.metrics.sharpe,
      blended_return = blended.metrics.expected_return,
      blended_volatility = blended.metrics.volatility,
      blended_sharpe = blended.metrics.sharpe,
      "optimization finished"
    );

    Ok(OptimizationReport {
      tickers: series.tickers.clone(),
      samples,
      selection,
      markowitz,
      conservative,
      risk_parity,
      hybrid,
      hybrid_metrics,
      blended,
      assets: asset_stats(series),
    })
  }

  /// Annualized return, volatility and Sharpe of `weights` on `series`.
  pub fn evaluate(&self, series: &ReturnSeries, weights: &WeightVector) -> Result<PortfolioMetrics> {
    self.check_calendar(series)?;
    ensure_len("weights vs assets", series.n_assets(), weights.len())?;
    Ok(metrics::evaluate(
      weights.view(),
      series.mean_daily.view(),
      series.covariance.view(),
      self.config.trading_days,
      self.config.risk_free_rate,
    ))
  }

  /// Evaluate a user allocation given in percent (must add up to 100 ± 0.5).
  pub fn evaluate_proposed(&self, series: &ReturnSeries, percents: &[f64]) -> Result<Allocation> {
    self.check_calendar(series)?;
    ensure_len("proposed allocation", series.n_assets(), percents.len())?;
    if let Some(&bad) = percents.iter().find(|p| !p.is_finite() || **p < 0.0) {
      return Err(EngineError::InvalidParameter(format!(
        "allocation percentages must be non-negative, got {bad}"
      )));
    }
    let total: f64 = percents.iter().sum();
    if (total - 100.0).abs() > PERCENT_TOLERANCE {
      return Err(EngineError::InvalidParameter(format!(
        "allocation must add up to 100%, got {total:.2}%"
      )));
    }

    let weights = WeightVector::normalized(Array1::from_iter(percents.iter().map(|p| p / 100.0)))?;
    self.allocation(series, weights)
  }

  /// Simulate the value of a portfolio with the given metrics.
  ///
  /// `metrics` are annual figures on the engine's calendar, as returned by
  /// [`PortfolioEngine::evaluate`] or [`PortfolioEngine::optimize`].
  pub fn project<R: Rng + ?Sized>(
    &self,
    metrics: &PortfolioMetrics,
    request: &ProjectionRequest,
    rng: &mut R,
  ) -> Result<Projection> {
    let projection = MonteCarloProjector::new(self.config.trading_days).project(
      metrics.expected_return,
      metrics.volatility,
      request,
      rng,
    )?;

    info!(
      investment = request.investment,
      years = request.years,
      paths = request.paths,
      pessimistic = projection.terminal.pessimistic,
      median = projection.terminal.median,
      optimistic = projection.terminal.optimistic,
      "projection finished"
    );
    Ok(projection)
  }

  /// The series must be annualized with the same calendar the engine samples and projects with.
  fn check_calendar(&self, series: &ReturnSeries) -> Result<()> {
    if series.trading_days != self.config.trading_days {
      return Err(EngineError::InvalidParameter(format!(
        "return series is annualized over {} trading days, engine is configured for {}",
        series.trading_days, self.config.trading_days
      )));
    }
    Ok(())
  }

  fn allocation(&self, series: &ReturnSeries, weights: WeightVector) -> Result<Allocation> {
    let metrics = self.evaluate(series, &weights)?;
    Ok(Allocation { weights, metrics })
  }

  fn sample_allocation(&self, samples: &SampleSet, index: usize) -> Result<Allocation> {
    let s = samples.get(index).ok_or(EngineError::InsufficientData {
      what: "sampled portfolios",
      required: index + 1,
      actual: samples.len(),
    })?;
    Ok(Allocation {
      weights: s.weights.clone(),
      metrics: s.metrics,
    })
  }
}

fn asset_stats(series: &ReturnSeries) -> Vec<AssetStats> {
  let returns = series.annual_returns();
  let vols = series.annual_volatilities();
  series
    .tickers
    .iter()
    .enumerate()
    .map(|(i, t)| AssetStats {
      ticker: t.clone(),
      annual_return: returns[i],
      annual_volatility: vols[i],
    })
    .collect()
}
