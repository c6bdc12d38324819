//! # Errors
//!
//! Error type shared by the risk, cost, frontier and synthesis layers.

use thiserror::Error;

use crate::optimizer::OptimizerError;

/// Errors surfaced by the synthesis pipeline.
#[derive(Debug, Error)]
pub enum SynthesisError {
  /// A proposal carries weights or scores that cannot be used.
  #[error("invalid proposal `{source_id}`: {reason}")]
  InvalidProposal { source_id: String, reason: String },

  /// No proposals were supplied.
  #[error("no allocation proposals were supplied")]
  EmptyProposalSet,

  /// Every candidate was filtered out before a frontier could be formed.
  #[error("frontier construction produced no feasible candidates")]
  NoFeasibleFrontier,

  /// An asset has no reference entry and the table has no fallback.
  #[error("asset class `{asset}` has no reference entry and no fallback is configured")]
  UnknownAssetClass { asset: String },

  /// Portfolio value must be a positive, finite amount.
  #[error("portfolio value must be positive and finite, got {0}")]
  InvalidPortfolioValue(f64),

  /// Direct optimizer use failed. Inside the frontier engine a failed
  /// solve only drops the candidate.
  #[error("optimizer error: {0}")]
  Optimizer(#[from] OptimizerError),

  /// Malformed configuration.
  #[error("configuration error: {0}")]
  Config(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl SynthesisError {
  pub(crate) fn invalid_proposal(source_id: &str, reason: impl Into<String>) -> Self {
    Self::InvalidProposal {
      source_id: source_id.to_string(),
      reason: reason.into(),
    }
  }
}

/// Result alias for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthesisError>;
