use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::allocation::Allocation;

/// Single objective solved for an optimized candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
  MaximizeReturn,
  MinimizeRisk,
  MinimizeCost,
  MaximizeSharpe,
}

impl Objective {
  pub const ALL: [Objective; 4] = [
    Objective::MaximizeReturn,
    Objective::MinimizeRisk,
    Objective::MinimizeCost,
    Objective::MaximizeSharpe,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Objective::MaximizeReturn => "maximize_return",
      Objective::MinimizeRisk => "minimize_risk",
      Objective::MinimizeCost => "minimize_cost",
      Objective::MaximizeSharpe => "maximize_sharpe",
    }
  }
}

impl fmt::Display for Objective {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How a candidate was produced.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMethod {
  /// A proposal taken as-is.
  Direct,
  /// `α·A + (1−α)·B` for a pair of proposals.
  Interpolation(f64),
  Optimized(Objective),
}

impl fmt::Display for SynthesisMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SynthesisMethod::Direct => f.write_str("direct"),
      SynthesisMethod::Interpolation(alpha) => write!(f, "interpolation:{alpha}"),
      SynthesisMethod::Optimized(objective) => write!(f, "optimized:{objective}"),
    }
  }
}

/// Mean-variance utility with small bonuses for horizon fit and capital
/// efficiency.
pub fn utility_score(
  expected_return: f64,
  risk_score: f64,
  timeline_fit: f64,
  capital_efficiency: f64,
) -> f64 {
  expected_return - 0.5 * risk_score * risk_score + 0.02 * timeline_fit + 0.01 * capital_efficiency
}

/// One evaluated point of the objective space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidatePoint {
  pub id: String,
  pub allocation: Allocation,
  pub expected_return: f64,
  pub risk_score: f64,
  pub cost_score: f64,
  pub utility_score: f64,
  /// Ids of the proposals this point was derived from.
  pub sources: Vec<String>,
  pub method: SynthesisMethod,
  /// Number of evaluated points this one dominates.
  pub dominance_rank: usize,
  pub pareto_efficient: bool,
}

impl CandidatePoint {
  pub fn new(
    id: String,
    allocation: Allocation,
    expected_return: f64,
    risk_score: f64,
    cost_score: f64,
    utility_score: f64,
    sources: Vec<String>,
    method: SynthesisMethod,
  ) -> Self {
    Self {
      id,
      allocation,
      expected_return,
      risk_score,
      cost_score,
      utility_score,
      sources,
      method,
      dominance_rank: 0,
      pareto_efficient: false,
    }
  }

  /// Method tag, e.g. `interpolation:0.25`.
  pub fn method_tag(&self) -> String {
    self.method.to_string()
  }
}
