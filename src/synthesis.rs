//! # Synthesis
//!
//! $$
//! s(P) = w_r\,\mu_P\,k_r + w_\sigma(1-\sigma_P)\,k_\sigma + w_c(1-c_P)\,k_c + w_u\,u_P\,k_u
//! $$
//!
//! Preference-weighted selection from the frontier, corrective adjustments
//! and the final risk/cost pass that produces a [`SynthesisResult`].

pub mod corrections;
pub mod log;
pub mod orchestrator;
pub mod preferences;
pub mod report;
pub mod types;

pub use corrections::apply_corrections;
pub use corrections::Correction;
pub use corrections::CorrectionPolicy;
pub use log::SynthesisLog;
pub use log::SynthesisLogEntry;
pub use orchestrator::OrchestratorConfig;
pub use orchestrator::SynthesisOrchestrator;
pub use preferences::ClientPreferences;
pub use preferences::PreferenceWeights;
pub use preferences::ScoringScales;
pub use preferences::TimelineHorizon;
pub use report::format_summary;
pub use types::ImprovementMetrics;
pub use types::SynthesisResult;
