//! # Models
//!
//! $$
//! \sigma_p = \kappa \sum_i w_i \sigma_i,\qquad c_p = \sum_i w_i c_i
//! $$
//!
//! Deterministic risk and cost estimators built on a static asset-class
//! reference table. Both models are pure functions of the allocation and
//! their configuration, so they can be evaluated concurrently.

pub mod cost;
pub mod reference;
pub mod risk;

pub use cost::CostModel;
pub use cost::CostModelConfig;
pub use cost::CostProfile;
pub use reference::AssetClass;
pub use reference::AssetReferenceTable;
pub use risk::concentration_risk;
pub use risk::CalibrationNoise;
pub use risk::RiskModel;
pub use risk::RiskModelConfig;
pub use risk::RiskProfile;
pub use risk::StressScenario;
