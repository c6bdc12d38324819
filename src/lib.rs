//! # Allocation Synthesis
//!
//! `allocation_synthesis` combines independently generated allocation
//! proposals into one recommended portfolio that trades off return, risk and
//! cost. Every estimate is deterministic: identical inputs (including any
//! calibration seed) produce bit-identical results.
//!
//! ## Modules
//!
//! | Module          | Description                                                                                  |
//! |-----------------|----------------------------------------------------------------------------------------------|
//! | [`allocation`]  | Ordered asset → weight maps with normalization, blending, capping and dust filtering.         |
//! | [`market`]      | Market snapshots and realised-volatility helpers used for risk calibration.                 |
//! | [`models`]      | Asset reference table, risk model (volatility, VaR, stress tests) and cost model.             |
//! | [`optimizer`]   | Long-only simplex optimizer seam with a Nelder-Mead implementation.                          |
//! | [`proposal`]    | Upstream allocation proposals, validation and the `ProposalSource` trait.                    |
//! | [`frontier`]    | Candidate generation and four-objective dominance filtering.                                 |
//! | [`synthesis`]   | Preference-weighted selection, corrective adjustments and the final `SynthesisResult`.       |
//! | [`config`]      | Aggregated JSON-loadable configuration.                                                      |
//!
//! ## Parallelism
//!
//! Pairwise interpolation, optimized candidates and the O(n²) dominance pass
//! run on the global `rayon` pool. Results are collected in index order.
//!
//! ## Example Usage
//!
//! ```rust
//! use allocation_synthesis::AllocationProposal;
//! use allocation_synthesis::ClientPreferences;
//! use allocation_synthesis::SynthesisOrchestrator;
//!
//! let proposal = AllocationProposal::new(
//!   "growth".into(),
//!   "Growth".into(),
//!   [("Stocks", 0.7), ("Bonds", 0.3)].into_iter().collect(),
//!   0.085,
//!   0.13,
//!   0.8,
//!   0.7,
//!   0.7,
//! );
//! let prefs = ClientPreferences::new("moderate".into(), "growth".into(), None, None);
//! let result = SynthesisOrchestrator::default()
//!   .synthesize(&[proposal], &prefs, &[], 250_000.0)
//!   .unwrap();
//! ```

pub mod allocation;
pub mod config;
pub mod error;
pub mod frontier;
pub mod market;
pub mod models;
pub mod optimizer;
pub mod proposal;
pub mod synthesis;

pub use allocation::Allocation;
pub use config::SynthesisConfig;
pub use error::Result;
pub use error::SynthesisError;
pub use frontier::CandidatePoint;
pub use frontier::ParetoEngine;
pub use market::MarketSnapshot;
pub use models::CostModel;
pub use models::RiskModel;
pub use optimizer::ConstrainedOptimizer;
pub use optimizer::NelderMeadOptimizer;
pub use proposal::AllocationProposal;
pub use proposal::ProposalSource;
pub use synthesis::ClientPreferences;
pub use synthesis::SynthesisLog;
pub use synthesis::SynthesisOrchestrator;
pub use synthesis::SynthesisResult;
