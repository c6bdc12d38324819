use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::allocation::Allocation;
use crate::error::Result;
use crate::models::concentration_risk;
use crate::models::CostModel;

/// One adjustment applied to the selected allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correction {
  /// Blend towards the cost-efficient reweighting.
  CostBlend {
    expense_before: f64,
    expense_after: f64,
  },
  /// Holdings below the minimum weight removed.
  DustRemoved { assets: Vec<String> },
  /// Per-asset weight cap applied to a concentrated allocation.
  ConcentrationCap {
    concentration_risk: f64,
    cap: f64,
    capped_assets: Vec<String>,
  },
}

/// Thresholds for [`apply_corrections`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPolicy {
  /// Expense ratio above which the cost blend is attempted.
  pub expense_threshold: f64,
  /// Share of the original allocation kept by the cost blend.
  pub cost_blend_original: f64,
  /// Concentration risk above which the weight cap is applied.
  pub concentration_threshold: f64,
  pub max_weight: f64,
  /// Holdings below this weight are dropped.
  pub min_weight: f64,
}

impl Default for CorrectionPolicy {
  fn default() -> Self {
    Self {
      expense_threshold: 0.008,
      cost_blend_original: 0.8,
      concentration_threshold: 0.7,
      max_weight: 0.4,
      min_weight: 0.01,
    }
  }
}

/// Apply cost blending, dust removal and the concentration cap, in that
/// order. Thresholds are evaluated on the allocation as selected.
///
/// `universe` is the asset set the corrections may move weight into: the
/// cost blend falls back to it when the held assets cannot lower the
/// expense ratio, and the cap spreads excess over it when too few assets
/// are held. Dust is removed before the cap so renormalization cannot lift
/// a capped weight back above `max_weight`.
pub fn apply_corrections(
  selected: &Allocation,
  universe: &[String],
  cost: &CostModel,
  policy: &CorrectionPolicy,
) -> Result<(Allocation, Vec<Correction>)> {
  let mut current = selected.clone();
  let mut applied = Vec::new();

  let expense_before = cost.expense_ratio(selected)?;
  if expense_before > policy.expense_threshold {
    let held_only: &[String] = &[];
    for pool in [held_only, universe] {
      let efficient = cost.reweight_for_cost_within(&current, pool)?;
      let Some(blended) = current.blend(&efficient, policy.cost_blend_original).normalized() else {
        continue;
      };
      let expense_after = cost.expense_ratio(&blended)?;
      if expense_after < expense_before {
        current = blended;
        applied.push(Correction::CostBlend {
          expense_before,
          expense_after,
        });
        break;
      }
    }
  }

  let dust = current.dust(policy.min_weight);
  if !dust.is_empty() {
    if let Some(kept) = current.without_dust(policy.min_weight).normalized() {
      current = kept;
      applied.push(Correction::DustRemoved { assets: dust });
    }
  }

  let concentration = concentration_risk(selected);
  if concentration > policy.concentration_threshold {
    let capped = current.capped_within(policy.max_weight, universe);
    if capped != current {
      let capped_assets: Vec<String> = current
        .iter()
        .filter(|(_, w)| *w > policy.max_weight)
        .map(|(a, _)| a.to_string())
        .collect();
      current = capped;
      applied.push(Correction::ConcentrationCap {
        concentration_risk: concentration,
        cap: policy.max_weight,
        capped_assets,
      });
    }
  }

  debug!(corrections = applied.len(), "corrections applied");
  Ok((current, applied))
}
