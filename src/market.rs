//! # Market History
//!
//! $$
//! \hat\sigma_{\text{ann}} = \sqrt{252}\;\operatorname{sd}\!\left(\ln\frac{P_t}{P_{t-1}}\right)
//! $$
//!
//! Market snapshots passed in by the caller and the realised-volatility
//! helpers the risk model calibrates against.

use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use serde::Deserialize;
use serde::Serialize;
use statrs::statistics::Statistics;

/// Trading days per year used for annualisation.
pub const TRADING_DAYS: f64 = 252.0;

/// Daily market observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ImplNew)]
pub struct MarketSnapshot {
  pub date: NaiveDate,
  /// Broad equity index level.
  pub equity_price: f64,
  pub vix: f64,
  pub ten_year_yield: f64,
  pub dollar_index: f64,
  pub oil_price: f64,
  pub gold_price: f64,
}

/// Convert close prices to log-return series.
pub fn log_returns_series(closes: &[f64]) -> Vec<f64> {
  let mut out = Vec::with_capacity(closes.len().saturating_sub(1));
  for i in 1..closes.len() {
    if closes[i - 1] > 0.0 && closes[i] > 0.0 {
      out.push((closes[i] / closes[i - 1]).ln());
    }
  }
  out
}

/// Annualised sample volatility of the log returns of `closes`.
///
/// Returns `0.0` when fewer than two returns are available.
pub fn realized_volatility(closes: &[f64]) -> f64 {
  let returns = log_returns_series(closes);
  if returns.len() < 2 {
    return 0.0;
  }

  let sd = returns.iter().std_dev();
  if sd.is_finite() {
    sd * TRADING_DAYS.sqrt()
  } else {
    0.0
  }
}

/// Realised equity volatility over the trailing `lookback` returns.
pub fn equity_volatility(history: &[MarketSnapshot], lookback: usize) -> f64 {
  let start = history.len().saturating_sub(lookback + 1);
  let closes: Vec<f64> = history[start..].iter().map(|s| s.equity_price).collect();
  realized_volatility(&closes)
}
