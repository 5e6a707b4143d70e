//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Randomized Markowitz search, risk-parity balancing, blending and Monte Carlo
//! projection of long-only portfolios.

pub mod blend;
pub mod engine;
pub mod frontier;
pub mod metrics;
pub mod monte_carlo;
pub mod returns;
pub mod risk_parity;
pub mod sampler;
pub mod types;

pub use blend::WeightBlender;
pub use engine::Allocation;
pub use engine::AssetStats;
pub use engine::OptimizationReport;
pub use engine::PortfolioEngine;
pub use frontier::FrontierSelection;
pub use frontier::select_frontier;
pub use metrics::portfolio_volatility;
pub use metrics::risk_contributions;
pub use monte_carlo::MonteCarloProjector;
pub use monte_carlo::Projection;
pub use monte_carlo::SimulationBand;
pub use monte_carlo::TerminalPercentiles;
pub use returns::AlignedPrices;
pub use returns::AssetPrices;
pub use returns::ReturnSeries;
pub use returns::align_prices;
pub use risk_parity::HybridOutcome;
pub use risk_parity::HybridRiskParityBalancer;
pub use risk_parity::RiskParityBalancer;
pub use risk_parity::default_threshold;
pub use sampler::RandomPortfolioSampler;
pub use types::PortfolioMetrics;
pub use types::PortfolioSample;
pub use types::SampleSet;
pub use types::WeightVector;
