use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::instrument;

use super::corrections::apply_corrections;
use super::corrections::CorrectionPolicy;
use super::log::SynthesisLog;
use super::preferences::ClientPreferences;
use super::preferences::PreferenceWeights;
use super::preferences::ScoringScales;
use super::types::ImprovementMetrics;
use super::types::SynthesisResult;
use crate::allocation::Allocation;
use crate::error::Result;
use crate::error::SynthesisError;
use crate::frontier::CandidatePoint;
use crate::frontier::ParetoEngine;
use crate::market::MarketSnapshot;
use crate::proposal::AllocationProposal;
use crate::proposal::ProposalSource;

/// Runtime configuration for [`SynthesisOrchestrator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
  pub risk_free: f64,
  /// Risk aversion of the final mean-variance utility.
  pub risk_aversion: f64,
  /// Floor on the volatility denominator of Sharpe ratios.
  pub min_volatility: f64,
  pub scoring: ScoringScales,
  pub corrections: CorrectionPolicy,
  pub pareto_bonus: f64,
  /// Confidence bonus per holding above `breadth_threshold`.
  pub breadth_bonus: f64,
  pub breadth_bonus_cap: f64,
  pub breadth_threshold: f64,
  /// Confidence bonus per dominated candidate.
  pub rank_bonus: f64,
  pub rank_bonus_cap: f64,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.02,
      risk_aversion: 3.0,
      min_volatility: 0.001,
      scoring: ScoringScales::default(),
      corrections: CorrectionPolicy::default(),
      pareto_bonus: 0.1,
      breadth_bonus: 0.02,
      breadth_bonus_cap: 0.15,
      breadth_threshold: 0.01,
      rank_bonus: 0.02,
      rank_bonus_cap: 0.1,
    }
  }
}

impl OrchestratorConfig {
  pub fn validate(&self) -> Result<()> {
    let policy = &self.corrections;
    if !(policy.max_weight > 0.0 && policy.max_weight <= 1.0) {
      return Err(SynthesisError::Config(format!(
        "max_weight must lie in (0, 1], got {}",
        policy.max_weight
      )));
    }
    if !(0.0..1.0).contains(&policy.min_weight) {
      return Err(SynthesisError::Config(format!(
        "min_weight must lie in [0, 1), got {}",
        policy.min_weight
      )));
    }
    if !(0.0..=1.0).contains(&policy.cost_blend_original) {
      return Err(SynthesisError::Config(format!(
        "cost_blend_original must lie in [0, 1], got {}",
        policy.cost_blend_original
      )));
    }
    if self.min_volatility <= 0.0 {
      return Err(SynthesisError::Config(
        "min_volatility must be positive".into(),
      ));
    }
    Ok(())
  }
}

/// Selects, corrects and re-evaluates one allocation from the frontier.
#[derive(Clone, Debug, Default)]
pub struct SynthesisOrchestrator {
  engine: ParetoEngine,
  config: OrchestratorConfig,
}

impl SynthesisOrchestrator {
  pub fn new(engine: ParetoEngine, config: OrchestratorConfig) -> Self {
    Self { engine, config }
  }

  pub fn engine(&self) -> &ParetoEngine {
    &self.engine
  }

  pub fn config(&self) -> &OrchestratorConfig {
    &self.config
  }

  /// Highest-scoring frontier point. Ties go to the lower cost score, then
  /// to the earlier point.
  pub fn select<'a>(
    &self,
    frontier: &'a [CandidatePoint],
    weights: &PreferenceWeights,
  ) -> Option<&'a CandidatePoint> {
    let mut best: Option<(&CandidatePoint, f64)> = None;
    for point in frontier {
      let score = weights.score(point, &self.config.scoring);
      best = match best {
        Some((b, bs)) if score < bs || (score == bs && point.cost_score >= b.cost_score) => {
          Some((b, bs))
        }
        _ => Some((point, score)),
      };
    }
    best.map(|(p, _)| p)
  }

  #[instrument(skip_all, fields(proposals = proposals.len()))]
  pub fn synthesize(
    &self,
    proposals: &[AllocationProposal],
    preferences: &ClientPreferences,
    market_history: &[MarketSnapshot],
    portfolio_value: f64,
  ) -> Result<SynthesisResult> {
    if proposals.is_empty() {
      return Err(SynthesisError::EmptyProposalSet);
    }
    if !(portfolio_value.is_finite() && portfolio_value > 0.0) {
      return Err(SynthesisError::InvalidPortfolioValue(portfolio_value));
    }

    let frontier = self.engine.find_frontier(proposals)?;
    let weights = PreferenceWeights::from_preferences(preferences);
    let selected = self
      .select(&frontier, &weights)
      .ok_or(SynthesisError::NoFeasibleFrontier)?;

    let risk = self.engine.risk_model();
    let cost = self.engine.cost_model();
    let cfg = &self.config;

    let universe = self.correction_universe(proposals);
    let (allocation, corrections) =
      apply_corrections(&selected.allocation, &universe, cost, &cfg.corrections)?;

    let risk_profile = risk.estimate(&allocation, market_history)?;
    let cost_profile = cost.profile(&allocation, portfolio_value)?;
    let expected_return = risk.expected_return(&allocation)?;
    let expense = cost_profile.total_expense_ratio;
    let net_return = expected_return - expense;
    let volatility = risk_profile.volatility;
    let sharpe_ratio = (net_return - cfg.risk_free) / volatility.max(cfg.min_volatility);
    let utility_score = net_return - 0.5 * cfg.risk_aversion * volatility * volatility;

    let synthesis_confidence = self.confidence(proposals, selected, &allocation);

    let n = proposals.len() as f64;
    let mean_return = proposals.iter().map(|p| p.expected_return).sum::<f64>() / n;
    let mean_risk = proposals.iter().map(|p| p.risk_score).sum::<f64>() / n;
    let mean_assets = proposals.iter().map(|p| p.allocation.len() as f64).sum::<f64>() / n;
    let baseline_sharpe = (mean_return - cfg.risk_free) / mean_risk.max(cfg.min_volatility);

    let improvement = ImprovementMetrics {
      return_improvement: expected_return - mean_return,
      risk_improvement: mean_risk - volatility,
      sharpe_improvement: sharpe_ratio - baseline_sharpe,
      diversification_improvement: allocation.len() as f64 - mean_assets,
      cost_correction: cost.expense_ratio(&selected.allocation)? - expense,
      corrections,
    };

    let method = selected.method_tag();
    let portfolio_id = portfolio_id(&allocation, &method);

    info!(
      portfolio_id = %portfolio_id,
      method = %method,
      frontier = frontier.len(),
      confidence = synthesis_confidence,
      "synthesis complete"
    );

    Ok(SynthesisResult {
      portfolio_id,
      final_allocation: allocation,
      expected_return,
      net_return,
      risk_score: volatility,
      cost_score: expense,
      sharpe_ratio,
      utility_score,
      synthesis_confidence,
      contributing_sources: selected.sources.clone(),
      pareto_rank: selected.dominance_rank,
      method,
      preference_weights: weights,
      risk_profile,
      cost_profile,
      improvement,
    })
  }

  /// Pull proposals from `source` and synthesize them.
  pub fn synthesize_from_source(
    &self,
    source: &dyn ProposalSource,
    preferences: &ClientPreferences,
    market_history: &[MarketSnapshot],
    portfolio_value: f64,
  ) -> Result<SynthesisResult> {
    let proposals = source.proposals();
    info!(source = source.name(), proposals = proposals.len(), "proposals received");
    self.synthesize(&proposals, preferences, market_history, portfolio_value)
  }

  /// Synthesize and append the result to `log`. Failed runs are not recorded.
  pub fn synthesize_and_record(
    &self,
    proposals: &[AllocationProposal],
    preferences: &ClientPreferences,
    market_history: &[MarketSnapshot],
    portfolio_value: f64,
    log: &mut SynthesisLog,
  ) -> Result<SynthesisResult> {
    let result = self.synthesize(proposals, preferences, market_history, portfolio_value)?;
    log.record(proposals.len(), result.clone());
    Ok(result)
  }

  /// Assets the corrections may move weight into: the union of the proposal
  /// holdings, widened to the whole reference table when the union is too
  /// small for the concentration cap.
  fn correction_universe(&self, proposals: &[AllocationProposal]) -> Vec<String> {
    let mut universe = Allocation::union_assets(proposals.iter().map(|p| &p.allocation));
    if (universe.len() as f64) * self.config.corrections.max_weight < 1.0 {
      for class in self.engine.risk_model().table().classes() {
        if !universe.contains(&class.name) {
          universe.push(class.name.clone());
        }
      }
    }
    universe
  }

  fn confidence(
    &self,
    proposals: &[AllocationProposal],
    selected: &CandidatePoint,
    allocation: &Allocation,
  ) -> f64 {
    let cfg = &self.config;
    let contributing: Vec<f64> = proposals
      .iter()
      .filter(|p| selected.sources.contains(&p.source_id))
      .map(|p| p.confidence)
      .collect();
    let base = if contributing.is_empty() {
      0.0
    } else {
      contributing.iter().sum::<f64>() / contributing.len() as f64
    };

    let pareto = if selected.pareto_efficient {
      cfg.pareto_bonus
    } else {
      0.0
    };
    let breadth =
      (cfg.breadth_bonus * allocation.count_above(cfg.breadth_threshold) as f64).min(cfg.breadth_bonus_cap);
    let rank = (cfg.rank_bonus * selected.dominance_rank as f64).min(cfg.rank_bonus_cap);

    (base + pareto + breadth + rank).clamp(0.0, 1.0)
  }
}

/// `synthesis-` followed by 16 hex digits of a blake3 digest over the
/// allocation and method tag.
fn portfolio_id(allocation: &Allocation, method: &str) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(b"allocation-synthesis-v1:");
  for (asset, weight) in allocation.iter() {
    hasher.update(asset.as_bytes());
    hasher.update(&weight.to_le_bytes());
  }
  hasher.update(method.as_bytes());
  let hex = hasher.finalize().to_hex();
  format!("synthesis-{}", &hex.as_str()[..16])
}
