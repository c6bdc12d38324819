//! # Configuration
//!
//! Aggregated configuration of the synthesis pipeline. Every section falls
//! back to its defaults, so a partial JSON document is enough.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::SynthesisError;
use crate::frontier::ParetoConfig;
use crate::frontier::ParetoEngine;
use crate::models::AssetReferenceTable;
use crate::models::CostModel;
use crate::models::CostModelConfig;
use crate::models::RiskModel;
use crate::models::RiskModelConfig;
use crate::synthesis::OrchestratorConfig;
use crate::synthesis::SynthesisOrchestrator;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
  pub reference: AssetReferenceTable,
  pub risk: RiskModelConfig,
  pub cost: CostModelConfig,
  pub pareto: ParetoConfig,
  pub orchestrator: OrchestratorConfig,
}

impl SynthesisConfig {
  pub fn from_json(text: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn validate(&self) -> Result<()> {
    self.risk.validate()?;
    self.cost.validate()?;
    self.pareto.validate()?;
    self.orchestrator.validate()?;

    let cap = self.orchestrator.corrections.max_weight;
    if (self.reference.len() as f64) * cap < 1.0 {
      return Err(SynthesisError::Config(format!(
        "{} reference classes cannot hold a {cap} weight cap",
        self.reference.len()
      )));
    }
    Ok(())
  }

  /// Wire the models, engine and orchestrator over one shared table.
  pub fn build(&self) -> Result<SynthesisOrchestrator> {
    self.validate()?;
    let table = Arc::new(self.reference.clone());
    let risk = RiskModel::new(Arc::clone(&table), self.risk.clone());
    let cost = CostModel::new(table, self.cost.clone());
    let engine = ParetoEngine::new(risk, cost, self.pareto.clone());
    Ok(SynthesisOrchestrator::new(engine, self.orchestrator.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frontier::DominanceRule;

  #[test]
  fn partial_json_fills_defaults() {
    let config = SynthesisConfig::from_json(
      r#"{ "cost": { "turnover_rate": 1.0 }, "pareto": { "dominance": "return_risk_cost" } }"#,
    )
    .unwrap();
    assert_eq!(config.cost.turnover_rate, 1.0);
    assert_eq!(config.cost.base_impact, 0.0002);
    assert_eq!(config.pareto.dominance, DominanceRule::ReturnRiskCost);
    assert_eq!(config.risk, RiskModelConfig::default());
    assert_eq!(config.reference.len(), 10);
  }

  #[test]
  fn json_round_trip_preserves_defaults() {
    let config = SynthesisConfig::default();
    let back = SynthesisConfig::from_json(&config.to_json().unwrap()).unwrap();
    assert_eq!(back, config);
  }

  #[test]
  fn malformed_values_are_config_errors() {
    let err = SynthesisConfig::from_json(r#"{ "pareto": { "interpolation_alphas": [1.5] } }"#)
      .unwrap_err();
    assert!(matches!(err, SynthesisError::Config(_)));

    let err = SynthesisConfig::from_json("{ not json").unwrap_err();
    assert!(matches!(err, SynthesisError::Serialization(_)));
  }

  #[test]
  fn cap_must_fit_the_reference_table() {
    let err = SynthesisConfig::from_json(
      r#"{ "reference": { "classes": { "Cash": { "name": "Cash", "expected_return": 0.02, "volatility": 0.01, "beta": 0.0, "liquidity_score": 1.0, "tax_efficiency_score": 0.95, "expense_rate": 0.0, "transaction_rate": 0.0, "spread_rate": 0.0, "impact_multiplier": 0.0, "high_cost_expense_rate": 0.005 } }, "fallback": null } }"#,
    )
    .unwrap_err();
    assert!(matches!(err, SynthesisError::Config(_)));
  }

  #[test]
  fn build_wires_shared_table() {
    let orchestrator = SynthesisConfig::default().build().unwrap();
    assert!(orchestrator.engine().risk_model().table().contains("Stocks"));
  }
}
