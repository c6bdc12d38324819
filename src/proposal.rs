//! # Proposals
//!
//! Allocation proposals produced by upstream strategy generators, and the
//! seam those producers plug into.

use impl_new_derive::ImplNew;
use serde::Deserialize;
use serde::Serialize;

use crate::allocation::Allocation;
use crate::allocation::WEIGHT_TOLERANCE;
use crate::error::Result;
use crate::error::SynthesisError;

/// One candidate allocation with its producer's own estimates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ImplNew)]
pub struct AllocationProposal {
  pub source_id: String,
  pub source_name: String,
  pub allocation: Allocation,
  pub expected_return: f64,
  pub risk_score: f64,
  /// Producer confidence in `[0, 1]`.
  pub confidence: f64,
  /// Fit to the client's investment horizon, in `[0, 1]`.
  pub timeline_fit: f64,
  /// Return per unit of deployed capital, in `[0, 1]`.
  pub capital_efficiency: f64,
}

impl AllocationProposal {
  /// Check weights and scores, naming the first offending asset or field.
  pub fn validate(&self) -> Result<()> {
    let id = self.source_id.as_str();

    for (asset, w) in self.allocation.iter() {
      if !w.is_finite() || w < 0.0 {
        return Err(SynthesisError::invalid_proposal(
          id,
          format!("weight for `{asset}` is {w}"),
        ));
      }
    }

    let total = self.allocation.total();
    if !self.allocation.is_empty() && (total - 1.0).abs() > WEIGHT_TOLERANCE {
      return Err(SynthesisError::invalid_proposal(
        id,
        format!("weights sum to {total}"),
      ));
    }

    if !self.expected_return.is_finite() {
      return Err(SynthesisError::invalid_proposal(
        id,
        format!("expected_return is {}", self.expected_return),
      ));
    }
    if !self.risk_score.is_finite() || self.risk_score < 0.0 {
      return Err(SynthesisError::invalid_proposal(
        id,
        format!("risk_score is {}", self.risk_score),
      ));
    }

    for (field, value) in [
      ("confidence", self.confidence),
      ("timeline_fit", self.timeline_fit),
      ("capital_efficiency", self.capital_efficiency),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(SynthesisError::invalid_proposal(
          id,
          format!("{field} is {value}, expected a value in [0, 1]"),
        ));
      }
    }

    Ok(())
  }
}

/// Upstream producer of proposals.
pub trait ProposalSource: Send + Sync {
  fn name(&self) -> &str;

  fn proposals(&self) -> Vec<AllocationProposal>;
}

/// Fixed list of proposals, for tests and replay.
#[derive(Clone, Debug, Default)]
pub struct StaticProposalSource {
  name: String,
  proposals: Vec<AllocationProposal>,
}

impl StaticProposalSource {
  pub fn new(name: impl Into<String>, proposals: Vec<AllocationProposal>) -> Self {
    Self {
      name: name.into(),
      proposals,
    }
  }
}

impl ProposalSource for StaticProposalSource {
  fn name(&self) -> &str {
    &self.name
  }

  fn proposals(&self) -> Vec<AllocationProposal> {
    self.proposals.clone()
  }
}
