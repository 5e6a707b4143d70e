//! # Weight Blending
//!
//! $$
//! \mathbf{w}=\frac{p\,\mathbf{w}_{MV}+(1-p)\,\mathbf{w}_{RP}}{\mathbf{1}^\top\left(p\,\mathbf{w}_{MV}+(1-p)\,\mathbf{w}_{RP}\right)}
//! $$

use super::types::WeightVector;
use crate::error::ensure_len;
use crate::error::EngineError;
use crate::error::Result;

/// Linear mix of a Markowitz weighting and a risk-parity weighting.
#[derive(Clone, Copy, Debug)]
pub struct WeightBlender {
  /// Markowitz share `p`, in `[0, 1]`.
  pub ratio: f64,
}

impl Default for WeightBlender {
  fn default() -> Self {
    Self { ratio: 0.5 }
  }
}

impl WeightBlender {
  pub fn new(ratio: f64) -> Result<Self> {
    if !(0.0..=1.0).contains(&ratio) {
      return Err(EngineError::InvalidParameter(format!(
        "blend ratio must lie in [0, 1], got {ratio}"
      )));
    }
    Ok(Self { ratio })
  }

  pub fn blend(&self, markowitz: &WeightVector, risk_parity: &WeightVector) -> Result<WeightVector> {
    ensure_len("blended weights", markowitz.len(), risk_parity.len())?;
    let p = self.ratio;
    let mixed = markowitz.as_array() * p + risk_parity.as_array() * (1.0 - p);
    WeightVector::normalized(mixed)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn inputs() -> (WeightVector, WeightVector) {
    (
      WeightVector::normalized(array![0.7, 0.2, 0.1]).unwrap(),
      WeightVector::normalized(array![0.2, 0.3, 0.5]).unwrap(),
    )
  }

  #[test]
  fn endpoints_return_the_inputs() {
    let (mv, rp) = inputs();

    let all_mv = WeightBlender::new(1.0).unwrap().blend(&mv, &rp).unwrap();
    let all_rp = WeightBlender::new(0.0).unwrap().blend(&mv, &rp).unwrap();
    for i in 0..3 {
      assert_abs_diff_eq!(all_mv[i], mv[i], epsilon = 1e-12);
      assert_abs_diff_eq!(all_rp[i], rp[i], epsilon = 1e-12);
    }
  }

  #[test]
  fn default_is_an_even_mix() {
    let (mv, rp) = inputs();
    let w = WeightBlender::default().blend(&mv, &rp).unwrap();
    assert_abs_diff_eq!(w[0], 0.45, epsilon = 1e-12);
    assert_abs_diff_eq!(w[1], 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(w[2], 0.30, epsilon = 1e-12);
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
  }

  #[test]
  fn invalid_ratio_and_length_are_rejected() {
    assert!(WeightBlender::new(-0.1).is_err());
    let (mv, _) = inputs();
    let short = WeightVector::equal(2);
    assert!(matches!(
      WeightBlender::default().blend(&mv, &short),
      Err(EngineError::DimensionMismatch { .. })
    ));
  }
}
