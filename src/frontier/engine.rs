use std::sync::Arc;

use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::instrument;
use tracing::warn;
use tracing::Span;

use super::candidate::utility_score;
use super::candidate::CandidatePoint;
use super::candidate::Objective;
use super::candidate::SynthesisMethod;
use super::dominance::rank_by_dominance;
use super::dominance::DominanceRule;
use crate::allocation::Allocation;
use crate::error::Result;
use crate::error::SynthesisError;
use crate::models::CostModel;
use crate::models::RiskModel;
use crate::optimizer::dot;
use crate::optimizer::ConstrainedOptimizer;
use crate::optimizer::NelderMeadConfig;
use crate::optimizer::NelderMeadOptimizer;
use crate::optimizer::SimplexProblem;
use crate::proposal::AllocationProposal;

/// Runtime configuration for [`ParetoEngine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParetoConfig {
  /// Mixing weights for pairwise interpolation, each in `(0, 1)`.
  pub interpolation_alphas: Vec<f64>,
  /// Weights below this are dropped from synthetic allocations.
  pub dust_threshold: f64,
  /// Risk-free rate of the Sharpe objective.
  pub risk_free: f64,
  /// Floor on the risk denominator of the Sharpe objective.
  pub min_risk: f64,
  pub optimized_timeline_fit: f64,
  pub optimized_capital_efficiency: f64,
  /// Per-asset upper bound on optimized candidates. Raised to `1/n` when the
  /// union holds too few assets for it.
  pub max_weight: f64,
  pub objectives: Vec<Objective>,
  pub dominance: DominanceRule,
  pub optimizer: NelderMeadConfig,
}

impl Default for ParetoConfig {
  fn default() -> Self {
    Self {
      interpolation_alphas: vec![0.25, 0.5, 0.75],
      dust_threshold: 0.001,
      risk_free: 0.02,
      min_risk: 0.001,
      optimized_timeline_fit: 0.8,
      optimized_capital_efficiency: 0.8,
      max_weight: 0.4,
      objectives: Objective::ALL.to_vec(),
      dominance: DominanceRule::default(),
      optimizer: NelderMeadConfig::default(),
    }
  }
}

impl ParetoConfig {
  pub fn validate(&self) -> Result<()> {
    if let Some(alpha) = self
      .interpolation_alphas
      .iter()
      .find(|a| !(**a > 0.0 && **a < 1.0))
    {
      return Err(SynthesisError::Config(format!(
        "interpolation alpha {alpha} is outside (0, 1)"
      )));
    }
    if !(0.0..1.0).contains(&self.dust_threshold) {
      return Err(SynthesisError::Config(format!(
        "dust_threshold must lie in [0, 1), got {}",
        self.dust_threshold
      )));
    }
    if !(self.max_weight > 0.0 && self.max_weight <= 1.0) {
      return Err(SynthesisError::Config(format!(
        "max_weight must lie in (0, 1], got {}",
        self.max_weight
      )));
    }
    if self.min_risk <= 0.0 {
      return Err(SynthesisError::Config("min_risk must be positive".into()));
    }
    Ok(())
  }
}

/// Every evaluated candidate plus the efficient subset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontierEvaluation {
  /// In evaluation order: direct, interpolated, optimized.
  pub candidates: Vec<CandidatePoint>,
  /// Efficient candidates, highest dominance rank first.
  pub frontier: Vec<CandidatePoint>,
}

/// Builds the efficient frontier over a set of proposals.
#[derive(Clone, Debug)]
pub struct ParetoEngine {
  risk: RiskModel,
  cost: CostModel,
  optimizer: Arc<dyn ConstrainedOptimizer>,
  config: ParetoConfig,
}

impl ParetoEngine {
  pub fn new(risk: RiskModel, cost: CostModel, config: ParetoConfig) -> Self {
    let optimizer = Arc::new(NelderMeadOptimizer::new(config.optimizer.clone()));
    Self {
      risk,
      cost,
      optimizer,
      config,
    }
  }

  /// Replace the solver used for optimized candidates.
  pub fn with_optimizer(mut self, optimizer: Arc<dyn ConstrainedOptimizer>) -> Self {
    self.optimizer = optimizer;
    self
  }

  pub fn config(&self) -> &ParetoConfig {
    &self.config
  }

  pub fn risk_model(&self) -> &RiskModel {
    &self.risk
  }

  pub fn cost_model(&self) -> &CostModel {
    &self.cost
  }

  /// Efficient candidates, highest dominance rank first.
  pub fn find_frontier(&self, proposals: &[AllocationProposal]) -> Result<Vec<CandidatePoint>> {
    self.evaluate(proposals).map(|e| e.frontier)
  }

  #[instrument(skip_all, fields(proposals = proposals.len()))]
  pub fn evaluate(&self, proposals: &[AllocationProposal]) -> Result<FrontierEvaluation> {
    if proposals.is_empty() {
      return Err(SynthesisError::EmptyProposalSet);
    }

    let mut usable = Vec::with_capacity(proposals.len());
    for proposal in proposals {
      proposal.validate()?;
      if proposal
        .allocation
        .without_dust(self.config.dust_threshold)
        .is_empty()
      {
        warn!(source_id = %proposal.source_id, "skipping proposal with empty allocation");
        continue;
      }
      usable.push(proposal);
    }
    if usable.is_empty() {
      return Err(SynthesisError::NoFeasibleFrontier);
    }

    let mut candidates = usable
      .iter()
      .map(|p| self.direct(p))
      .collect::<Result<Vec<_>>>()?;

    if usable.len() >= 2 {
      candidates.extend(self.interpolated(&usable)?);
      candidates.extend(self.optimized(&usable)?);
    }

    rank_by_dominance(&mut candidates, self.config.dominance);

    let mut frontier: Vec<CandidatePoint> = candidates
      .iter()
      .filter(|c| c.pareto_efficient)
      .cloned()
      .collect();
    if frontier.is_empty() {
      return Err(SynthesisError::NoFeasibleFrontier);
    }
    frontier.sort_by(|a, b| b.dominance_rank.cmp(&a.dominance_rank));

    info!(
      candidates = candidates.len(),
      frontier = frontier.len(),
      "frontier constructed"
    );

    Ok(FrontierEvaluation {
      candidates,
      frontier,
    })
  }

  fn direct(&self, p: &AllocationProposal) -> Result<CandidatePoint> {
    Ok(CandidatePoint::new(
      p.source_id.clone(),
      p.allocation.clone(),
      p.expected_return,
      p.risk_score,
      self.cost.cost_score(&p.allocation)?,
      utility_score(
        p.expected_return,
        p.risk_score,
        p.timeline_fit,
        p.capital_efficiency,
      ),
      vec![p.source_id.clone()],
      SynthesisMethod::Direct,
    ))
  }

  fn interpolated(&self, usable: &[&AllocationProposal]) -> Result<Vec<CandidatePoint>> {
    let pairs: Vec<(usize, usize)> = (0..usable.len())
      .flat_map(|i| (i + 1..usable.len()).map(move |j| (i, j)))
      .collect();

    let span = Span::current();
    let per_pair = pairs
      .par_iter()
      .map(|&(i, j)| {
        let _entered = span.enter();
        self.interpolate(usable[i], usable[j])
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(per_pair.into_iter().flatten().collect())
  }

  fn interpolate(
    &self,
    a: &AllocationProposal,
    b: &AllocationProposal,
  ) -> Result<Vec<CandidatePoint>> {
    let timeline_fit = 0.5 * (a.timeline_fit + b.timeline_fit);
    let capital_efficiency = 0.5 * (a.capital_efficiency + b.capital_efficiency);

    let mut points = Vec::with_capacity(self.config.interpolation_alphas.len());
    for &alpha in &self.config.interpolation_alphas {
      let Some(allocation) = a
        .allocation
        .blend(&b.allocation, alpha)
        .without_dust(self.config.dust_threshold)
        .normalized()
      else {
        continue;
      };

      let expected_return = alpha * a.expected_return + (1.0 - alpha) * b.expected_return;
      let risk_score = alpha * a.risk_score + (1.0 - alpha) * b.risk_score;
      let cost_score = self.cost.cost_score(&allocation)?;

      points.push(CandidatePoint::new(
        format!("interpolation-{}-{}-{alpha:.2}", a.source_id, b.source_id),
        allocation,
        expected_return,
        risk_score,
        cost_score,
        utility_score(expected_return, risk_score, timeline_fit, capital_efficiency),
        vec![a.source_id.clone(), b.source_id.clone()],
        SynthesisMethod::Interpolation(alpha),
      ));
    }
    Ok(points)
  }

  fn optimized(&self, usable: &[&AllocationProposal]) -> Result<Vec<CandidatePoint>> {
    let assets = Allocation::union_assets(usable.iter().map(|p| &p.allocation));
    let table = self.risk.table();
    let mu = Arc::new(table.column(&assets, |c| c.expected_return)?);
    let sigma = Arc::new(table.column(&assets, |c| c.volatility)?);
    let expense = Arc::new(table.column(&assets, |c| c.expense_rate)?);
    let sources: Vec<String> = usable.iter().map(|p| p.source_id.clone()).collect();
    let bound = self.config.max_weight.max(1.0 / assets.len() as f64);

    let span = Span::current();
    let solved = self
      .config
      .objectives
      .par_iter()
      .map(|&objective| {
        let _entered = span.enter();
        let problem = match objective {
          Objective::MaximizeReturn => {
            let mu = Arc::clone(&mu);
            SimplexProblem::new(assets.len(), move |w| -dot(w, &mu))
          }
          Objective::MinimizeRisk => {
            let sigma = Arc::clone(&sigma);
            SimplexProblem::new(assets.len(), move |w| dot(w, &sigma))
          }
          Objective::MinimizeCost => {
            let expense = Arc::clone(&expense);
            SimplexProblem::new(assets.len(), move |w| dot(w, &expense))
          }
          Objective::MaximizeSharpe => {
            let mu = Arc::clone(&mu);
            let sigma = Arc::clone(&sigma);
            let rf = self.config.risk_free;
            let floor = self.config.min_risk;
            SimplexProblem::new(assets.len(), move |w| {
              -(dot(w, &mu) - rf) / dot(w, &sigma).max(floor)
            })
          }
        }
        .with_upper_bound(bound);

        match self.optimizer.minimize(&problem) {
          Ok(weights) => self.optimized_point(objective, &assets, &weights, bound, &sources),
          Err(error) => {
            warn!(objective = %objective, %error, "optimized candidate skipped");
            Ok(None)
          }
        }
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(solved.into_iter().flatten().collect())
  }

  fn optimized_point(
    &self,
    objective: Objective,
    assets: &[String],
    weights: &[f64],
    bound: f64,
    sources: &[String],
  ) -> Result<Option<CandidatePoint>> {
    let Some(allocation) = Allocation::from_weights(assets, weights)
      .without_dust(self.config.dust_threshold)
      .normalized()
    else {
      warn!(objective = %objective, "optimized candidate has no weight above dust");
      return Ok(None);
    };
    // The solver enforces the bound by penalty only.
    let allocation = allocation.capped(bound);

    let expected_return = self.risk.expected_return(&allocation)?;
    let risk_score = self.risk.weighted_volatility(&allocation)?;
    let cost_score = self.cost.cost_score(&allocation)?;
    let utility = utility_score(
      expected_return,
      risk_score,
      self.config.optimized_timeline_fit,
      self.config.optimized_capital_efficiency,
    );

    Ok(Some(CandidatePoint::new(
      format!("optimized-{objective}"),
      allocation,
      expected_return,
      risk_score,
      cost_score,
      utility,
      sources.to_vec(),
      SynthesisMethod::Optimized(objective),
    )))
  }
}

impl Default for ParetoEngine {
  fn default() -> Self {
    Self::new(
      RiskModel::default(),
      CostModel::default(),
      ParetoConfig::default(),
    )
  }
}

#[cfg(test)]
mod tests {
  use tracing_test::traced_test;

  use super::*;
  use crate::frontier::dominance::dominates;
  use crate::optimizer::OptimizerError;

  fn proposal(id: &str, pairs: &[(&str, f64)], ret: f64, risk: f64) -> AllocationProposal {
    AllocationProposal::new(
      id.into(),
      format!("{id} strategy"),
      pairs.iter().map(|(a, w)| (*a, *w)).collect(),
      ret,
      risk,
      0.8,
      0.8,
      0.8,
    )
  }

  fn scenario() -> Vec<AllocationProposal> {
    vec![
      proposal("A", &[("Stocks", 0.6), ("Technology", 0.4)], 0.12, 0.18),
      proposal("B", &[("Bonds", 0.7), ("Cash", 0.3)], 0.06, 0.08),
      proposal(
        "C",
        &[("Alternatives", 0.5), ("Commodities", 0.3), ("Real Estate", 0.2)],
        0.08,
        0.20,
      ),
    ]
  }

  #[derive(Debug)]
  struct FailingOptimizer;

  impl ConstrainedOptimizer for FailingOptimizer {
    fn minimize(&self, _: &SimplexProblem) -> std::result::Result<Vec<f64>, OptimizerError> {
      Err(OptimizerError::NotConverged { iterations: 0 })
    }
  }

  #[test]
  fn empty_input_is_rejected() {
    let engine = ParetoEngine::default();
    assert!(matches!(
      engine.find_frontier(&[]),
      Err(SynthesisError::EmptyProposalSet)
    ));
  }

  #[test]
  fn invalid_proposal_aborts() {
    let engine = ParetoEngine::default();
    let bad = proposal("bad", &[("Stocks", 0.5)], 0.1, 0.1);
    assert!(matches!(
      engine.find_frontier(&[bad]),
      Err(SynthesisError::InvalidProposal { source_id, .. }) if source_id == "bad"
    ));
  }

  #[traced_test]
  #[test]
  fn empty_allocations_are_skipped() {
    let engine = ParetoEngine::default();
    let empty = proposal("empty", &[], 0.05, 0.05);
    assert!(matches!(
      engine.find_frontier(&[empty.clone()]),
      Err(SynthesisError::NoFeasibleFrontier)
    ));
    assert!(logs_contain("skipping proposal with empty allocation"));

    let ok = proposal("ok", &[("Stocks", 1.0)], 0.1, 0.16);
    let frontier = engine.find_frontier(&[empty, ok]).unwrap();
    assert_eq!(frontier.len(), 1);
    assert_eq!(frontier[0].id, "ok");
  }

  #[test]
  fn single_proposal_yields_itself() {
    let engine = ParetoEngine::default();
    let p = proposal("solo", &[("Stocks", 0.55), ("Bonds", 0.45)], 0.08, 0.11);
    let eval = engine.evaluate(&[p.clone()]).unwrap();
    assert_eq!(eval.candidates.len(), 1);
    assert_eq!(eval.frontier.len(), 1);
    assert_eq!(eval.frontier[0].allocation, p.allocation);
    assert_eq!(eval.frontier[0].method, SynthesisMethod::Direct);
    assert!(eval.frontier[0].pareto_efficient);
  }

  #[test]
  fn scenario_excludes_dominated_proposal() {
    let engine = ParetoEngine::default();
    let frontier = engine.find_frontier(&scenario()).unwrap();
    let ids: Vec<&str> = frontier.iter().map(|c| c.id.as_str()).collect();

    assert!(ids.contains(&"A"));
    assert!(ids.contains(&"B"));
    assert!(!ids.contains(&"C"));
  }

  #[test]
  fn frontier_is_mutually_non_dominated_and_sorted() {
    let engine = ParetoEngine::default();
    let eval = engine.evaluate(&scenario()).unwrap();
    let rule = engine.config().dominance;

    for p in &eval.frontier {
      assert!(p.allocation.is_normalized());
      assert!(eval.candidates.iter().all(|q| !dominates(q, p, rule)));
    }
    for w in eval.frontier.windows(2) {
      assert!(w[0].dominance_rank >= w[1].dominance_rank);
    }
    for c in &eval.candidates {
      let expected = eval
        .candidates
        .iter()
        .filter(|q| dominates(c, q, rule))
        .count();
      assert_eq!(c.dominance_rank, expected);
    }
  }

  #[test]
  fn interpolation_covers_every_pair_and_alpha() {
    let engine = ParetoEngine::default().with_optimizer(Arc::new(FailingOptimizer));
    let eval = engine.evaluate(&scenario()).unwrap();
    let interpolated: Vec<&CandidatePoint> = eval
      .candidates
      .iter()
      .filter(|c| matches!(c.method, SynthesisMethod::Interpolation(_)))
      .collect();

    assert_eq!(interpolated.len(), 9);
    assert_eq!(interpolated[0].id, "interpolation-A-B-0.25");
    assert_eq!(interpolated[0].sources, vec!["A".to_string(), "B".to_string()]);
    assert!(interpolated.iter().all(|c| c.allocation.is_normalized()));
  }

  #[traced_test]
  #[test]
  fn failed_solves_are_dropped() {
    let engine = ParetoEngine::default().with_optimizer(Arc::new(FailingOptimizer));
    let eval = engine.evaluate(&scenario()).unwrap();
    assert!(eval
      .candidates
      .iter()
      .all(|c| !matches!(c.method, SynthesisMethod::Optimized(_))));
    assert!(logs_contain("optimized candidate skipped"));
  }

  #[test]
  fn optimized_points_span_the_union() {
    let engine = ParetoEngine::default();
    let eval = engine.evaluate(&scenario()).unwrap();
    let min_risk = eval
      .candidates
      .iter()
      .find(|c| c.method == SynthesisMethod::Optimized(Objective::MinimizeRisk))
      .unwrap();

    assert_eq!(min_risk.sources.len(), 3);
    assert!(min_risk.allocation.get("Cash") > 0.35);
    assert!(min_risk.allocation.get("Bonds") > 0.35);
    assert!(min_risk.allocation.is_normalized());
    for c in &eval.candidates {
      if matches!(c.method, SynthesisMethod::Optimized(_)) {
        assert!(c.allocation.max_weight() <= 0.4 + 1e-12);
      }
    }
  }

  #[test]
  fn unit_bound_allows_corner_solutions() {
    let config = ParetoConfig {
      max_weight: 1.0,
      ..ParetoConfig::default()
    };
    let engine = ParetoEngine::new(RiskModel::default(), CostModel::default(), config);
    let eval = engine.evaluate(&scenario()).unwrap();
    let min_risk = eval
      .candidates
      .iter()
      .find(|c| c.method == SynthesisMethod::Optimized(Objective::MinimizeRisk))
      .unwrap();
    assert!(min_risk.allocation.get("Cash") > 0.9);
  }

  #[test]
  fn invalid_max_weight_is_rejected() {
    let config = ParetoConfig {
      max_weight: 0.0,
      ..ParetoConfig::default()
    };
    assert!(matches!(config.validate(), Err(SynthesisError::Config(_))));
  }
}
