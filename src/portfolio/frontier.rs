//! # Frontier Selection
//!
//! $$
//! i^\*=\arg\max_i S_i,\qquad i_{\min}=\arg\min_i \sigma_i
//! $$
//!
//! Picks the maximum-Sharpe ("optimal") and minimum-volatility ("conservative")
//! portfolios out of a sampled set. Ties resolve to the earliest draw.

use ndarray_stats::QuantileExt;

use super::types::PortfolioSample;
use super::types::SampleSet;
use crate::error::EngineError;
use crate::error::Result;

/// Indices into a [`SampleSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontierSelection {
  /// Maximum-Sharpe sample.
  pub optimal: usize,
  /// Minimum-volatility sample.
  pub conservative: usize,
}

impl FrontierSelection {
  pub fn optimal_sample<'a>(&self, set: &'a SampleSet) -> Option<&'a PortfolioSample> {
    set.get(self.optimal)
  }

  pub fn conservative_sample<'a>(&self, set: &'a SampleSet) -> Option<&'a PortfolioSample> {
    set.get(self.conservative)
  }
}

/// Scan a sample set for its max-Sharpe and min-volatility entries.
pub fn select_frontier(set: &SampleSet) -> Result<FrontierSelection> {
  if set.is_empty() {
    return Err(EngineError::InsufficientData {
      what: "sampled portfolios",
      required: 1,
      actual: 0,
    });
  }

  let optimal = set
    .sharpes()
    .argmax()
    .map_err(|e| EngineError::InvalidParameter(format!("cannot rank Sharpe ratios: {e}")))?;
  let conservative = set
    .volatilities()
    .argmin()
    .map_err(|e| EngineError::InvalidParameter(format!("cannot rank volatilities: {e}")))?;

  Ok(FrontierSelection {
    optimal,
    conservative,
  })
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;
  use crate::portfolio::types::PortfolioMetrics;
  use crate::portfolio::types::WeightVector;

  fn sample(ret: f64, vol: f64, sharpe: f64) -> PortfolioSample {
    PortfolioSample {
      weights: WeightVector::normalized(array![1.0, 1.0]).unwrap(),
      metrics: PortfolioMetrics::new(ret, vol, sharpe),
    }
  }

  #[test]
  fn picks_max_sharpe_and_min_volatility() {
    let set = SampleSet {
      samples: vec![
        sample(0.10, 0.20, 0.5),
        sample(0.12, 0.15, 1.2),
        sample(0.08, 0.10, 0.3),
      ],
    };

    let sel = select_frontier(&set).unwrap();
    assert_eq!(sel.optimal, 1);
    assert_eq!(sel.conservative, 2);
  }

  #[test]
  fn ties_resolve_to_first_occurrence() {
    let set = SampleSet {
      samples: vec![
        sample(0.10, 0.30, 0.9),
        sample(0.10, 0.10, 1.1),
        sample(0.10, 0.10, 1.1),
      ],
    };

    let sel = select_frontier(&set).unwrap();
    assert_eq!(sel.optimal, 1);
    assert_eq!(sel.conservative, 1);
  }

  #[test]
  fn degenerate_sentinel_is_never_selected() {
    let set = SampleSet {
      samples: vec![sample(0.10, 0.0, f64::NEG_INFINITY), sample(0.01, 0.2, -0.4)],
    };

    assert_eq!(select_frontier(&set).unwrap().optimal, 1);
  }

  #[test]
  fn empty_set_is_rejected() {
    assert!(matches!(
      select_frontier(&SampleSet::default()),
      Err(EngineError::InsufficientData { .. })
    ));
  }
}
