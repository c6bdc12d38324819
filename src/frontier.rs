//! # Pareto Frontier
//!
//! $$
//! P \succ Q \iff \forall k:\ f_k(P) \succeq f_k(Q)\ \wedge\ \exists k:\ f_k(P) \succ f_k(Q)
//! $$
//!
//! Candidate generation (direct, pairwise interpolation, single-objective
//! optimization) and dominance filtering over return, risk, cost and
//! utility.

pub mod candidate;
pub mod dominance;
pub mod engine;

pub use candidate::utility_score;
pub use candidate::CandidatePoint;
pub use candidate::Objective;
pub use candidate::SynthesisMethod;
pub use dominance::dominates;
pub use dominance::rank_by_dominance;
pub use dominance::DominanceRule;
pub use engine::FrontierEvaluation;
pub use engine::ParetoConfig;
pub use engine::ParetoEngine;
