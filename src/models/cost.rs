//! # Cost Model
//!
//! $$
//! C = \underbrace{\sum_i w_i e_i}_{\text{expense}}
//!   + \tau \sum_i w_i (t_i + s_i)
//!   + \min\!\Big(2, \tfrac{V}{10^6}\Big) \sum_i w_i b\, m_i
//!   + f\,q \sum_i w_i t_i
//! $$
//!
//! Annual all-in cost estimates and the cost-efficiency reweighting used by
//! the synthesis corrections.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::reference::AssetReferenceTable;
use crate::allocation::Allocation;
use crate::error::Result;
use crate::error::SynthesisError;

/// Runtime configuration for [`CostModel`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModelConfig {
  /// Annual turnover used by [`CostModel::profile`].
  pub turnover_rate: f64,
  /// Market impact of a liquid fund per unit of size factor.
  pub base_impact: f64,
  /// Portfolio value at which the size factor reaches one.
  pub impact_size_reference: f64,
  pub impact_size_cap: f64,
  /// Rebalances per year.
  pub rebalancing_frequency: f64,
  /// Average fraction of the book traded per rebalance.
  pub rebalancing_fraction: f64,
  /// Annual drag per unit of tax inefficiency.
  pub tax_drag_scale: f64,
  /// Added to expense rates before inverting them into efficiency weights.
  pub efficiency_offset: f64,
  /// Share of efficiency weights in [`CostModel::reweight_for_cost`].
  pub cost_blend: f64,
  /// Cost charged per meaningful holding.
  pub complexity_penalty: f64,
  /// Weight above which a holding counts towards the complexity penalty.
  pub complexity_threshold: f64,
}

impl Default for CostModelConfig {
  fn default() -> Self {
    Self {
      turnover_rate: 0.5,
      base_impact: 0.0002,
      impact_size_reference: 1_000_000.0,
      impact_size_cap: 2.0,
      rebalancing_frequency: 4.0,
      rebalancing_fraction: 0.1,
      tax_drag_scale: 0.01,
      efficiency_offset: 0.001,
      cost_blend: 0.3,
      complexity_penalty: 0.0003,
      complexity_threshold: 0.01,
    }
  }
}

impl CostModelConfig {
  pub fn validate(&self) -> Result<()> {
    if !(self.turnover_rate.is_finite() && self.turnover_rate >= 0.0) {
      return Err(SynthesisError::Config(format!(
        "turnover_rate must be finite and non-negative, got {}",
        self.turnover_rate
      )));
    }
    if self.impact_size_reference <= 0.0 {
      return Err(SynthesisError::Config(
        "impact_size_reference must be positive".into(),
      ));
    }
    if !(0.0..=1.0).contains(&self.cost_blend) {
      return Err(SynthesisError::Config(format!(
        "cost_blend must lie in [0, 1], got {}",
        self.cost_blend
      )));
    }
    if self.efficiency_offset <= 0.0 {
      return Err(SynthesisError::Config(
        "efficiency_offset must be positive".into(),
      ));
    }
    Ok(())
  }
}

/// Annual cost estimate for one allocation. All components are fractions
/// of portfolio value except `total_cost_bps`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostProfile {
  pub total_expense_ratio: f64,
  pub transaction_costs: f64,
  pub bid_ask_spreads: f64,
  pub market_impact_costs: f64,
  pub rebalancing_costs: f64,
  pub tax_efficiency_score: f64,
  pub total_cost_bps: f64,
  /// Expense saved relative to high-cost implementations of the same mix.
  pub fee_optimization_savings: f64,
  pub cost_breakdown: BTreeMap<String, f64>,
}

impl CostProfile {
  /// Sum of the five annual cost components.
  pub fn total_cost(&self) -> f64 {
    self.total_expense_ratio
      + self.transaction_costs
      + self.bid_ask_spreads
      + self.market_impact_costs
      + self.rebalancing_costs
  }
}

/// Cost estimator over a shared reference table.
#[derive(Clone, Debug)]
pub struct CostModel {
  table: Arc<AssetReferenceTable>,
  config: CostModelConfig,
}

impl Default for CostModel {
  fn default() -> Self {
    Self::new(
      Arc::new(AssetReferenceTable::default()),
      CostModelConfig::default(),
    )
  }
}

impl CostModel {
  pub fn new(table: Arc<AssetReferenceTable>, config: CostModelConfig) -> Self {
    Self { table, config }
  }

  pub fn config(&self) -> &CostModelConfig {
    &self.config
  }

  pub fn table(&self) -> &AssetReferenceTable {
    &self.table
  }

  /// Weighted expense ratio `Σ wᵢeᵢ`.
  pub fn expense_ratio(&self, allocation: &Allocation) -> Result<f64> {
    self.table.weighted(allocation, |c| c.expense_rate)
  }

  /// Expense ratio plus a fixed charge per holding above the complexity
  /// threshold. Every candidate point is scored with this.
  pub fn cost_score(&self, allocation: &Allocation) -> Result<f64> {
    let expense = self.expense_ratio(allocation)?;
    let holdings = allocation.count_above(self.config.complexity_threshold);
    Ok(expense + self.config.complexity_penalty * holdings as f64)
  }

  /// Cost profile at the configured turnover rate.
  pub fn profile(&self, allocation: &Allocation, portfolio_value: f64) -> Result<CostProfile> {
    self.estimate(allocation, portfolio_value, self.config.turnover_rate)
  }

  pub fn estimate(
    &self,
    allocation: &Allocation,
    portfolio_value: f64,
    turnover_rate: f64,
  ) -> Result<CostProfile> {
    if !(portfolio_value.is_finite() && portfolio_value > 0.0) {
      return Err(SynthesisError::InvalidPortfolioValue(portfolio_value));
    }

    let cfg = &self.config;
    let size_factor = (portfolio_value / cfg.impact_size_reference).min(cfg.impact_size_cap);

    let mut expense = 0.0;
    let mut transaction = 0.0;
    let mut spread = 0.0;
    let mut impact = 0.0;
    let mut tax = 0.0;
    let mut high_cost = 0.0;
    for (asset, w) in allocation.iter() {
      let class = self.table.get(asset)?;
      expense += w * class.expense_rate;
      transaction += w * class.transaction_rate;
      spread += w * class.spread_rate;
      impact += w * cfg.base_impact * class.impact_multiplier;
      tax += w * class.tax_efficiency_score;
      high_cost += w * class.high_cost_expense_rate;
    }

    let transaction_costs = transaction * turnover_rate;
    let bid_ask_spreads = spread * turnover_rate;
    let market_impact_costs = impact * size_factor;
    let rebalancing_costs = transaction * cfg.rebalancing_fraction * cfg.rebalancing_frequency;
    let total = expense + transaction_costs + bid_ask_spreads + market_impact_costs + rebalancing_costs;

    let cost_breakdown = BTreeMap::from([
      ("expense_ratio".to_string(), expense),
      ("transaction".to_string(), transaction_costs),
      ("spread".to_string(), bid_ask_spreads),
      ("market_impact".to_string(), market_impact_costs),
      ("rebalancing".to_string(), rebalancing_costs),
      ("tax_drag".to_string(), (1.0 - tax) * cfg.tax_drag_scale),
    ]);

    Ok(CostProfile {
      total_expense_ratio: expense,
      transaction_costs,
      bid_ask_spreads,
      market_impact_costs,
      rebalancing_costs,
      tax_efficiency_score: tax,
      total_cost_bps: total * 10_000.0,
      fee_optimization_savings: (high_cost - expense).max(0.0),
      cost_breakdown,
    })
  }

  /// Tilt `allocation` towards its cheaper holdings.
  ///
  /// Efficiency weights are proportional to `1/(eᵢ + offset)` over the same
  /// assets and are blended in with weight `cost_blend`.
  pub fn reweight_for_cost(&self, allocation: &Allocation) -> Result<Allocation> {
    self.reweight_for_cost_within(allocation, &[])
  }

  /// [`CostModel::reweight_for_cost`] with the efficiency weights drawn from
  /// the held assets plus `universe`, so a holding set with uniform expense
  /// rates can still be tilted towards cheaper classes.
  pub fn reweight_for_cost_within(
    &self,
    allocation: &Allocation,
    universe: &[String],
  ) -> Result<Allocation> {
    let cfg = &self.config;
    let mut efficiency = Allocation::new();
    let held = allocation.iter().map(|(asset, _)| asset);
    for asset in held.chain(universe.iter().map(String::as_str)) {
      let class = self.table.get(asset)?;
      efficiency.insert(asset, 1.0 / (class.expense_rate + cfg.efficiency_offset));
    }

    let Some(efficiency) = efficiency.normalized() else {
      return Ok(allocation.clone());
    };
    let blended = allocation.blend(&efficiency, 1.0 - cfg.cost_blend);
    Ok(blended.normalized().unwrap_or(blended))
  }
}
