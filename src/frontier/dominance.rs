use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use super::candidate::CandidatePoint;

/// Objectives compared by [`dominates`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominanceRule {
  /// Return, risk, cost and utility.
  #[default]
  FourObjective,
  /// Return, risk and cost only. Utility is a function of return and risk
  /// and is left out.
  ReturnRiskCost,
}

/// `p` is at least as good as `q` on every objective of `rule` and strictly
/// better on at least one.
pub fn dominates(p: &CandidatePoint, q: &CandidatePoint, rule: DominanceRule) -> bool {
  let mut weak = p.expected_return >= q.expected_return
    && p.risk_score <= q.risk_score
    && p.cost_score <= q.cost_score;
  let mut strict = p.expected_return > q.expected_return
    || p.risk_score < q.risk_score
    || p.cost_score < q.cost_score;

  if rule == DominanceRule::FourObjective {
    weak &= p.utility_score >= q.utility_score;
    strict |= p.utility_score > q.utility_score;
  }

  weak && strict
}

/// Set `dominance_rank` and `pareto_efficient` on every candidate.
///
/// Each row of the O(n²) comparison runs on the rayon pool; results are
/// collected in index order.
pub fn rank_by_dominance(candidates: &mut [CandidatePoint], rule: DominanceRule) {
  let view: &[CandidatePoint] = candidates;
  let outcome: Vec<(usize, bool)> = (0..view.len())
    .into_par_iter()
    .map(|i| {
      let p = &view[i];
      let dominated_count = view
        .iter()
        .enumerate()
        .filter(|(j, q)| *j != i && dominates(p, q, rule))
        .count();
      let dominated = view
        .iter()
        .enumerate()
        .any(|(j, q)| j != i && dominates(q, p, rule));
      (dominated_count, !dominated)
    })
    .collect();

  for (candidate, (rank, efficient)) in candidates.iter_mut().zip(outcome) {
    candidate.dominance_rank = rank;
    candidate.pareto_efficient = efficient;
  }
}
