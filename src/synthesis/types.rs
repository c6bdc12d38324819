use serde::Deserialize;
use serde::Serialize;

use super::corrections::Correction;
use super::preferences::PreferenceWeights;
use crate::allocation::Allocation;
use crate::error::Result;
use crate::models::CostProfile;
use crate::models::RiskProfile;

/// Final allocation metrics relative to the mean of the input proposals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImprovementMetrics {
  pub return_improvement: f64,
  pub risk_improvement: f64,
  pub sharpe_improvement: f64,
  /// Change in the number of holdings.
  pub diversification_improvement: f64,
  /// Expense ratio removed by the corrections.
  pub cost_correction: f64,
  pub corrections: Vec<Correction>,
}

/// Recommended allocation and everything needed to audit it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
  /// Digest of the final allocation and method.
  pub portfolio_id: String,
  pub final_allocation: Allocation,
  /// Gross reference-table return.
  pub expected_return: f64,
  /// Gross return less the expense ratio.
  pub net_return: f64,
  /// Calibrated volatility.
  pub risk_score: f64,
  /// Final expense ratio.
  pub cost_score: f64,
  pub sharpe_ratio: f64,
  pub utility_score: f64,
  pub synthesis_confidence: f64,
  pub contributing_sources: Vec<String>,
  /// Dominance rank of the selected frontier point.
  pub pareto_rank: usize,
  /// Method tag of the selected frontier point.
  pub method: String,
  pub preference_weights: PreferenceWeights,
  pub risk_profile: RiskProfile,
  pub cost_profile: CostProfile,
  pub improvement: ImprovementMetrics,
}

impl SynthesisResult {
  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn to_json_pretty(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}
