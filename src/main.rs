//! Command-line front end: optimize and project a portfolio from a CSV of closes.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::bail;
use chrono::NaiveDate;
use clap::Parser;
use csv::ReaderBuilder;
use csv::Trim;
use portfolio_rs::EngineConfig;
use portfolio_rs::PortfolioEngine;
use portfolio_rs::ProjectionRequest;
use portfolio_rs::config::DEFAULT_RISK_FREE_RATE;
use portfolio_rs::portfolio::Allocation;
use portfolio_rs::portfolio::AssetPrices;
use portfolio_rs::portfolio::OptimizationReport;
use portfolio_rs::portfolio::Projection;
use portfolio_rs::portfolio::ReturnSeries;
use portfolio_rs::portfolio::align_prices;
use prettytable::Table;
use prettytable::row;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Markowitz / risk-parity portfolio optimizer with Monte Carlo projection.
#[derive(Parser)]
#[command(name = "portfolio-rs")]
#[command(about = "Optimize a long-only portfolio from daily closes and project its value")]
struct Cli {
  /// CSV with a `date,TICKER1,TICKER2,...` header and ISO dates
  #[arg(short, long)]
  prices: PathBuf,

  /// Number of random portfolios to sample
  #[arg(short = 'n', long, default_value = "5000")]
  samples: usize,

  /// Number of Monte Carlo paths
  #[arg(short = 'm', long, default_value = "250")]
  paths: usize,

  /// Projection horizon in years
  #[arg(short, long, default_value = "10")]
  years: f64,

  /// Initial investment
  #[arg(short, long, default_value = "50000")]
  investment: f64,

  /// Markowitz share of the final blend (0.0-1.0)
  #[arg(short, long, default_value = "0.5")]
  blend: f64,

  /// Annual risk-free rate
  #[arg(short, long, default_value_t = DEFAULT_RISK_FREE_RATE)]
  risk_free: f64,

  /// Seed for reproducible runs
  #[arg(short, long)]
  seed: Option<u64>,

  /// Proposed allocation in percent, comma separated, in ticker order
  #[arg(long, value_delimiter = ',')]
  proposed: Vec<f64>,
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();

  let config = EngineConfig::default()
    .with_num_portfolios(cli.samples)
    .with_blend_ratio(cli.blend)
    .with_risk_free_rate(cli.risk_free);
  config.validate().context("invalid engine configuration")?;

  let prices = read_prices(&cli.prices)?;
  let aligned = align_prices(&prices).context("failed to align price series")?;
  info!(
    assets = aligned.tickers.len(),
    dates = aligned.dates.len(),
    "loaded {}",
    cli.prices.display()
  );
  let series = ReturnSeries::from_prices(&aligned, config.trading_days).context("failed to build return series")?;

  let mut rng = match cli.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };

  let engine = PortfolioEngine::new(config);
  let report = engine.optimize(&series, &mut rng).context("optimization failed")?;
  print_assets(&report);
  print_weights(&report);

  if !cli.proposed.is_empty() {
    let proposed = engine
      .evaluate_proposed(&series, &cli.proposed)
      .context("invalid proposed allocation")?;
    print_comparison(&report, &proposed);
  }

  let request = ProjectionRequest::new(cli.investment, cli.years, cli.paths);
  let projection = engine
    .project(&report.blended.metrics, &request, &mut rng)
    .context("projection failed")?;
  print_projection(&projection, cli.years);

  Ok(())
}

fn read_prices(path: &Path) -> anyhow::Result<Vec<AssetPrices>> {
  let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
  parse_prices(file).with_context(|| format!("cannot parse {}", path.display()))
}

/// Parse `date,TICKER1,...` closes; quoted fields, a UTF-8 BOM and CRLF endings are accepted.
fn parse_prices<R: Read>(input: R) -> anyhow::Result<Vec<AssetPrices>> {
  let mut reader = ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(Trim::All)
    .from_reader(input);

  let headers = reader.headers().context("cannot read header")?.clone();
  if headers.len() < 2 {
    bail!("header names no assets");
  }
  let mut assets: Vec<AssetPrices> = headers
    .iter()
    .skip(1)
    .map(|t| AssetPrices::new(t.to_string(), Vec::new()))
    .collect();

  for (row, record) in reader.records().enumerate() {
    let line = row + 2;
    let record = record.with_context(|| format!("line {line}: malformed record"))?;
    let raw_date = record.get(0).unwrap_or_default();
    if raw_date.is_empty() {
      continue;
    }
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
      .with_context(|| format!("line {line}: bad date {raw_date:?}"))?;

    for (asset, field) in assets.iter_mut().zip(record.iter().skip(1)) {
      // Missing closes drop the date for that asset only; alignment handles the rest.
      if field.is_empty() {
        continue;
      }
      let close: f64 = field
        .parse()
        .with_context(|| format!("line {line}: bad close {field:?} for {}", asset.ticker))?;
      asset.closes.push((date, close));
    }
  }

  Ok(assets)
}

fn pct(x: f64) -> String {
  format!("{:.2}%", x * 100.0)
}

fn print_assets(report: &OptimizationReport) {
  let mut table = Table::new();
  table.add_row(row!["Asset", "Annual return", "Annual volatility"]);
  for a in &report.assets {
    table.add_row(row![a.ticker, pct(a.annual_return), pct(a.annual_volatility)]);
  }
  table.printstd();
}

fn print_weights(report: &OptimizationReport) {
  let mut table = Table::new();
  table.add_row(row!["Asset", "Max Sharpe", "Min vol", "Risk parity", "Hybrid", "Blended"]);
  for (i, t) in report.tickers.iter().enumerate() {
    table.add_row(row![
      t,
      pct(report.markowitz.weights[i]),
      pct(report.conservative.weights[i]),
      pct(report.risk_parity.weights[i]),
      pct(report.hybrid.weights[i]),
      pct(report.blended.weights[i])
    ]);
  }

  let rows = [
    ("Max Sharpe", report.markowitz.metrics),
    ("Min vol", report.conservative.metrics),
    ("Risk parity", report.risk_parity.metrics),
    ("Hybrid", report.hybrid_metrics),
    ("Blended", report.blended.metrics),
  ];
  let mut summary = Table::new();
  summary.add_row(row!["Portfolio", "Return", "Volatility", "Sharpe"]);
  for (name, m) in rows {
    summary.add_row(row![
      name,
      pct(m.expected_return),
      pct(m.volatility),
      format!("{:.3}", m.sharpe)
    ]);
  }

  table.printstd();
  summary.printstd();
  if !report.hybrid.converged {
    println!(
      "hybrid balancer stopped after {} iterations (max contribution {:.3} > {:.2})",
      report.hybrid.iterations, report.hybrid.max_contribution, report.hybrid.threshold
    );
  }
}

fn print_comparison(report: &OptimizationReport, proposed: &Allocation) {
  let mut table = Table::new();
  table.add_row(row!["Portfolio", "Return", "Volatility", "Sharpe"]);
  for (name, m) in [("Proposed", proposed.metrics), ("Blended", report.blended.metrics)] {
    table.add_row(row![
      name,
      pct(m.expected_return),
      pct(m.volatility),
      format!("{:.3}", m.sharpe)
    ]);
  }
  table.printstd();
}

fn print_projection(projection: &Projection, years: f64) {
  let mut table = Table::new();
  table.add_row(row!["Scenario", format!("Value after {years} years")]);
  table.add_row(row!["Pessimistic (5%)", format!("{:.2}", projection.terminal.pessimistic)]);
  table.add_row(row!["Median", format!("{:.2}", projection.terminal.median)]);
  table.add_row(row!["Optimistic (95%)", format!("{:.2}", projection.terminal.optimistic)]);
  table.printstd();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quoted_fields_bom_and_crlf_are_accepted() {
    let raw = "\u{feff}\"date\",\"PETR4.SA\",\"VALE3.SA\"\r\n\"2024-01-02\",\"31.5\",60.1\r\n2024-01-03,32.0,\r\n";
    let assets = parse_prices(raw.as_bytes()).unwrap();

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].ticker, "PETR4.SA");
    assert_eq!(assets[1].ticker, "VALE3.SA");
    let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    assert_eq!(assets[0].closes[0], (d, 31.5));
    assert_eq!(assets[0].closes.len(), 2);
    assert_eq!(assets[1].closes, vec![(d, 60.1)]);
  }

  #[test]
  fn bad_close_is_reported_with_its_line() {
    let raw = "date,AAA\n2024-01-02,abc\n";
    let err = parse_prices(raw.as_bytes()).unwrap_err();
    assert!(format!("{err:#}").contains("line 2"));
  }

  #[test]
  fn header_without_assets_is_rejected() {
    assert!(parse_prices("date\n2024-01-02\n".as_bytes()).is_err());
  }
}
