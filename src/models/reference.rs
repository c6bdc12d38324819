//! # Asset Reference Table
//!
//! Static per-asset-class constants consumed by the risk and cost models.

use std::collections::BTreeMap;

use impl_new_derive::ImplNew;
use serde::Deserialize;
use serde::Serialize;

use crate::allocation::Allocation;
use crate::error::Result;
use crate::error::SynthesisError;

/// Reference constants for one asset class. Rates are annual fractions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ImplNew)]
pub struct AssetClass {
  pub name: String,
  pub expected_return: f64,
  pub volatility: f64,
  pub beta: f64,
  /// 0 (illiquid) to 1 (cash-like).
  pub liquidity_score: f64,
  /// 0 (tax-inefficient) to 1.
  pub tax_efficiency_score: f64,
  pub expense_rate: f64,
  pub transaction_rate: f64,
  pub spread_rate: f64,
  /// Market-impact multiplier relative to a liquid equity fund.
  pub impact_multiplier: f64,
  /// Expense rate of a typical actively managed alternative.
  pub high_cost_expense_rate: f64,
}

/// Lookup table of [`AssetClass`] entries with an optional fallback used for
/// names that are not in the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetReferenceTable {
  classes: BTreeMap<String, AssetClass>,
  fallback: Option<AssetClass>,
}

impl AssetReferenceTable {
  /// Table without a fallback: unknown assets are an error.
  pub fn new<I: IntoIterator<Item = AssetClass>>(classes: I) -> Self {
    Self {
      classes: classes.into_iter().map(|c| (c.name.clone(), c)).collect(),
      fallback: None,
    }
  }

  pub fn with_fallback(mut self, fallback: AssetClass) -> Self {
    self.fallback = Some(fallback);
    self
  }

  pub fn without_fallback(mut self) -> Self {
    self.fallback = None;
    self
  }

  pub fn fallback(&self) -> Option<&AssetClass> {
    self.fallback.as_ref()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.classes.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.classes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.classes.is_empty()
  }

  pub fn classes(&self) -> impl Iterator<Item = &AssetClass> {
    self.classes.values()
  }

  /// Reference entry for `name`, falling back to the configured default.
  pub fn get(&self, name: &str) -> Result<&AssetClass> {
    self
      .classes
      .get(name)
      .or(self.fallback.as_ref())
      .ok_or_else(|| SynthesisError::UnknownAssetClass {
        asset: name.to_string(),
      })
  }

  /// `Σ wᵢ · f(classᵢ)` over the allocation.
  pub fn weighted<F>(&self, allocation: &Allocation, f: F) -> Result<f64>
  where
    F: Fn(&AssetClass) -> f64,
  {
    let mut acc = 0.0;
    for (asset, w) in allocation.iter() {
      acc += w * f(self.get(asset)?);
    }
    Ok(acc)
  }

  /// Per-asset values `f(classᵢ)` in the order of `assets`.
  pub fn column<F>(&self, assets: &[String], f: F) -> Result<Vec<f64>>
  where
    F: Fn(&AssetClass) -> f64,
  {
    assets.iter().map(|a| self.get(a).map(&f)).collect()
  }
}

fn class(
  name: &str,
  expected_return: f64,
  volatility: f64,
  beta: f64,
  liquidity_score: f64,
  tax_efficiency_score: f64,
  expense_rate: f64,
  transaction_rate: f64,
  spread_rate: f64,
  impact_multiplier: f64,
  high_cost_expense_rate: f64,
) -> AssetClass {
  AssetClass::new(
    name.to_string(),
    expected_return,
    volatility,
    beta,
    liquidity_score,
    tax_efficiency_score,
    expense_rate,
    transaction_rate,
    spread_rate,
    impact_multiplier,
    high_cost_expense_rate,
  )
}

/// Fallback entry used by the default table.
pub fn default_fallback() -> AssetClass {
  class(
    "default", 0.08, 0.15, 0.8, 0.5, 0.75, 0.006, 0.001, 0.0005, 1.5, 0.015,
  )
}

impl Default for AssetReferenceTable {
  fn default() -> Self {
    Self::new([
      class(
        "Stocks", 0.10, 0.16, 1.0, 0.9, 0.85, 0.0050, 0.0005, 0.0002, 1.0, 0.015,
      ),
      class(
        "Bonds", 0.04, 0.04, 0.1, 0.7, 0.70, 0.0030, 0.0008, 0.0005, 1.2, 0.012,
      ),
      class(
        "Real Estate",
        0.08,
        0.12,
        0.7,
        0.3,
        0.80,
        0.0075,
        0.0015,
        0.0010,
        2.0,
        0.020,
      ),
      class(
        "Commodities",
        0.06,
        0.20,
        0.3,
        0.6,
        0.60,
        0.0065,
        0.0012,
        0.0008,
        1.5,
        0.018,
      ),
      class("Cash", 0.02, 0.01, 0.0, 1.0, 0.95, 0.0, 0.0, 0.0, 0.0, 0.005),
      class(
        "Alternatives",
        0.12,
        0.18,
        0.6,
        0.2,
        0.50,
        0.0120,
        0.0025,
        0.0020,
        3.0,
        0.025,
      ),
      class(
        "International",
        0.09,
        0.18,
        0.8,
        0.7,
        0.75,
        0.0070,
        0.0010,
        0.0006,
        1.3,
        0.016,
      ),
      class(
        "Emerging Markets",
        0.08,
        0.25,
        0.8,
        0.5,
        0.75,
        0.0060,
        0.0010,
        0.0005,
        1.5,
        0.015,
      ),
      class(
        "Technology",
        0.12,
        0.22,
        1.3,
        0.8,
        0.85,
        0.0045,
        0.0006,
        0.0003,
        1.0,
        0.014,
      ),
      class(
        "Healthcare",
        0.10,
        0.14,
        0.9,
        0.8,
        0.85,
        0.0040,
        0.0005,
        0.0002,
        1.1,
        0.013,
      ),
    ])
    .with_fallback(default_fallback())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_table_falls_back_for_unknown_assets() {
    let table = AssetReferenceTable::default();
    assert_eq!(table.len(), 10);
    assert_eq!(table.get("Stocks").unwrap().volatility, 0.16);
    assert_eq!(table.get("Crypto").unwrap().name, "default");
  }

  #[test]
  fn unknown_asset_without_fallback_is_an_error() {
    let table = AssetReferenceTable::default().without_fallback();
    let err = table.get("Crypto").unwrap_err();
    assert!(matches!(err, SynthesisError::UnknownAssetClass { asset } if asset == "Crypto"));
  }

  #[test]
  fn weighted_sums_follow_allocation() {
    let table = AssetReferenceTable::default();
    let alloc = Allocation::from_pairs([("Stocks", 0.5), ("Bonds", 0.5)]);
    let ret = table.weighted(&alloc, |c| c.expected_return).unwrap();
    assert!((ret - 0.07).abs() < 1e-12);
  }
}
