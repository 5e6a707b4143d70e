//! # portfolio-rs
//!
//! $$
//! S=\frac{\mu_p-r_f}{\sigma_p}
//! $$
//!
//! Long-only portfolio construction from daily closes:
//!
//! - [`portfolio::returns`]: date alignment, simple returns, annualized covariance.
//! - [`portfolio::sampler`] and [`portfolio::frontier`]: random simplex search for
//!   the maximum-Sharpe and minimum-volatility portfolios.
//! - [`portfolio::risk_parity`]: fixed-round equal risk contribution and a
//!   threshold-capped hybrid.
//! - [`portfolio::blend`]: Markowitz / risk-parity mix.
//! - [`portfolio::monte_carlo`]: forward value paths with percentile bands.
//!
//! All randomness is injected through a `rand::Rng`; seeding a `StdRng` makes
//! every run reproducible.

pub mod config;
pub mod error;
pub mod portfolio;

pub use config::EngineConfig;
pub use config::ProjectionRequest;
pub use error::EngineError;
pub use error::Result;
pub use portfolio::PortfolioEngine;
