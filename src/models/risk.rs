//! # Risk Model
//!
//! $$
//! \sigma_p = \max\!\Big(\sigma_{\min},\ \kappa \sum_i w_i \sigma_i\Big),\qquad
//! \mathrm{VaR}_{\alpha} = z_\alpha \frac{\sigma_p}{\sqrt{252}}
//! $$
//!
//! Reference-table risk estimates, optionally calibrated by the realised
//! volatility of the supplied market history.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::reference::AssetReferenceTable;
use crate::allocation::Allocation;
use crate::error::Result;
use crate::error::SynthesisError;
use crate::market::equity_volatility;
use crate::market::MarketSnapshot;
use crate::market::TRADING_DAYS;

/// One-sided 95% normal quantile.
pub const Z_95: f64 = 1.645;
/// One-sided 99% normal quantile.
pub const Z_99: f64 = 2.326;

/// Seeded multiplicative noise on the calibration factor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationNoise {
  pub seed: u64,
  /// Standard deviation of the normal draw.
  pub scale: f64,
}

/// Runtime configuration for [`RiskModel`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskModelConfig {
  /// Trailing window of market returns used for calibration.
  pub lookback: usize,
  /// Minimum number of snapshots before calibration is attempted.
  pub min_history: usize,
  /// Long-run equity volatility the realised figure is compared against.
  pub baseline_volatility: f64,
  pub clustering_weight: f64,
  pub min_calibration: f64,
  pub max_calibration: f64,
  /// Floor on the reported portfolio volatility.
  pub min_volatility: f64,
  pub expected_shortfall_multiplier: f64,
  pub max_drawdown_cap: f64,
  /// Off by default. Estimates stay deterministic for a fixed seed.
  pub calibration_noise: Option<CalibrationNoise>,
}

impl Default for RiskModelConfig {
  fn default() -> Self {
    Self {
      lookback: 252,
      min_history: 20,
      baseline_volatility: 0.15,
      clustering_weight: 0.18,
      min_calibration: 0.8,
      max_calibration: 1.5,
      min_volatility: 0.05,
      expected_shortfall_multiplier: 1.25,
      max_drawdown_cap: 0.6,
      calibration_noise: None,
    }
  }
}

impl RiskModelConfig {
  pub fn validate(&self) -> Result<()> {
    if self.min_calibration <= 0.0 || self.min_calibration > self.max_calibration {
      return Err(SynthesisError::Config(format!(
        "calibration bounds [{}, {}] are not a positive interval",
        self.min_calibration, self.max_calibration
      )));
    }
    if self.baseline_volatility <= 0.0 {
      return Err(SynthesisError::Config(
        "baseline_volatility must be positive".into(),
      ));
    }
    if self.min_volatility < 0.0 {
      return Err(SynthesisError::Config(
        "min_volatility must be non-negative".into(),
      ));
    }
    if let Some(noise) = self.calibration_noise {
      if !(noise.scale.is_finite() && noise.scale >= 0.0) {
        return Err(SynthesisError::Config(format!(
          "calibration noise scale must be finite and non-negative, got {}",
          noise.scale
        )));
      }
    }
    Ok(())
  }
}

/// Historical stress scenarios applied as volatility multiples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressScenario {
  MarketCrash2008,
  CovidShock2020,
  TechBubble2000,
  InflationSpike,
  InterestRateShock,
  GeopoliticalCrisis,
  LiquidityCrisis,
}

impl StressScenario {
  pub const ALL: [StressScenario; 7] = [
    StressScenario::MarketCrash2008,
    StressScenario::CovidShock2020,
    StressScenario::TechBubble2000,
    StressScenario::InflationSpike,
    StressScenario::InterestRateShock,
    StressScenario::GeopoliticalCrisis,
    StressScenario::LiquidityCrisis,
  ];

  pub fn name(self) -> &'static str {
    match self {
      StressScenario::MarketCrash2008 => "market_crash_2008",
      StressScenario::CovidShock2020 => "covid_shock_2020",
      StressScenario::TechBubble2000 => "tech_bubble_2000",
      StressScenario::InflationSpike => "inflation_spike",
      StressScenario::InterestRateShock => "interest_rate_shock",
      StressScenario::GeopoliticalCrisis => "geopolitical_crisis",
      StressScenario::LiquidityCrisis => "liquidity_crisis",
    }
  }

  /// Number of volatilities subtracted from the expected return.
  pub fn shock_multiplier(self) -> f64 {
    match self {
      StressScenario::MarketCrash2008 => 3.5,
      StressScenario::CovidShock2020 => 2.8,
      StressScenario::TechBubble2000 => 4.2,
      StressScenario::InflationSpike => 1.5,
      StressScenario::InterestRateShock => 2.0,
      StressScenario::GeopoliticalCrisis => 2.5,
      StressScenario::LiquidityCrisis => 3.0,
    }
  }

  /// Scenario return `μ − kσ`.
  pub fn apply(self, expected_return: f64, volatility: f64) -> f64 {
    expected_return - self.shock_multiplier() * volatility
  }
}

/// Risk estimate for one allocation. VaR and expected shortfall are
/// positive daily loss fractions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
  pub volatility: f64,
  pub var_95: f64,
  pub var_99: f64,
  pub expected_shortfall: f64,
  pub max_drawdown: f64,
  pub beta: f64,
  pub tail_risk_score: f64,
  pub concentration_risk: f64,
  pub liquidity_risk: f64,
  pub calibration_factor: f64,
  /// Scenario name → return under that scenario.
  pub stress_tests: BTreeMap<String, f64>,
  /// Asset → share of the uncalibrated weighted volatility.
  pub risk_attribution: BTreeMap<String, f64>,
}

/// Normalized Herfindahl concentration in `[0, 1]`.
///
/// Empty allocations carry no concentration; a single holding is fully
/// concentrated.
pub fn concentration_risk(allocation: &Allocation) -> f64 {
  let n = allocation.len();
  match n {
    0 => 0.0,
    1 => 1.0,
    _ => {
      let floor = 1.0 / n as f64;
      ((allocation.herfindahl() - floor) / (1.0 - floor)).clamp(0.0, 1.0)
    }
  }
}

/// Risk estimator over a shared reference table.
#[derive(Clone, Debug)]
pub struct RiskModel {
  table: Arc<AssetReferenceTable>,
  config: RiskModelConfig,
}

impl Default for RiskModel {
  fn default() -> Self {
    Self::new(
      Arc::new(AssetReferenceTable::default()),
      RiskModelConfig::default(),
    )
  }
}

impl RiskModel {
  pub fn new(table: Arc<AssetReferenceTable>, config: RiskModelConfig) -> Self {
    Self { table, config }
  }

  pub fn config(&self) -> &RiskModelConfig {
    &self.config
  }

  pub fn table(&self) -> &AssetReferenceTable {
    &self.table
  }

  /// Reference expected return `Σ wᵢμᵢ`.
  pub fn expected_return(&self, allocation: &Allocation) -> Result<f64> {
    self.table.weighted(allocation, |c| c.expected_return)
  }

  /// Uncalibrated weighted volatility `Σ wᵢσᵢ`.
  pub fn weighted_volatility(&self, allocation: &Allocation) -> Result<f64> {
    self.table.weighted(allocation, |c| c.volatility)
  }

  /// Volatility-clustering adjustment derived from recent market history.
  pub fn calibration_factor(&self, history: &[MarketSnapshot]) -> f64 {
    let cfg = &self.config;
    let mut factor = if history.len() >= cfg.min_history {
      let realized = equity_volatility(history, cfg.lookback);
      1.0 + cfg.clustering_weight * (realized / cfg.baseline_volatility - 1.0)
    } else {
      1.0
    };

    if let Some(noise) = cfg.calibration_noise {
      if noise.scale > 0.0 {
        if let Ok(normal) = Normal::new(0.0, noise.scale) {
          let mut rng = StdRng::seed_from_u64(noise.seed);
          let eps: f64 = normal.sample(&mut rng);
          factor *= 1.0 + cfg.clustering_weight * eps;
        }
      }
    }

    factor.clamp(cfg.min_calibration, cfg.max_calibration)
  }

  /// Full risk profile of `allocation` under the given market history.
  pub fn estimate(
    &self,
    allocation: &Allocation,
    history: &[MarketSnapshot],
  ) -> Result<RiskProfile> {
    let cfg = &self.config;
    let factor = self.calibration_factor(history);

    let mut raw_vol = 0.0;
    let mut ret = 0.0;
    let mut beta = 0.0;
    let mut liquidity = 0.0;
    let mut contributions = Vec::with_capacity(allocation.len());
    for (asset, w) in allocation.iter() {
      let class = self.table.get(asset)?;
      raw_vol += w * class.volatility;
      ret += w * class.expected_return;
      beta += w * class.beta;
      liquidity += w * class.liquidity_score;
      contributions.push((asset.to_string(), w * class.volatility));
    }

    let volatility = (raw_vol * factor).max(cfg.min_volatility);
    let daily = volatility / TRADING_DAYS.sqrt();
    let var_95 = Z_95 * daily;
    let var_99 = Z_99 * daily;
    let concentration = concentration_risk(allocation);

    let stress_tests = StressScenario::ALL
      .iter()
      .map(|s| (s.name().to_string(), s.apply(ret, volatility)))
      .collect();

    let risk_attribution = contributions
      .into_iter()
      .map(|(asset, c)| {
        let share = if raw_vol > 0.0 { c / raw_vol } else { 0.0 };
        (asset, share)
      })
      .collect();

    debug!(
      assets = allocation.len(),
      volatility,
      calibration_factor = factor,
      "estimated risk profile"
    );

    Ok(RiskProfile {
      volatility,
      var_95,
      var_99,
      expected_shortfall: cfg.expected_shortfall_multiplier * var_95,
      max_drawdown: (0.8 * volatility + 0.1 * concentration).min(cfg.max_drawdown_cap),
      beta,
      tail_risk_score: (0.3 + 0.4 * (2.0 * volatility).tanh() + 0.3 * concentration)
        .clamp(0.0, 1.0),
      concentration_risk: concentration,
      liquidity_risk: (1.0 - liquidity).clamp(0.0, 1.0),
      calibration_factor: factor,
      stress_tests,
      risk_attribution,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use chrono::NaiveDate;
  use tracing_test::traced_test;

  use super::*;

  fn history(prices: &[f64]) -> Vec<MarketSnapshot> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    prices
      .iter()
      .enumerate()
      .map(|(i, &p)| {
        MarketSnapshot::new(
          start + chrono::Days::new(i as u64),
          p,
          18.0,
          0.04,
          103.0,
          80.0,
          2100.0,
        )
      })
      .collect()
  }

  fn balanced() -> Allocation {
    Allocation::from_pairs([("Stocks", 0.6), ("Bonds", 0.4)])
  }

  #[test]
  fn concentration_edge_cases() {
    assert_eq!(concentration_risk(&Allocation::new()), 0.0);
    assert_eq!(concentration_risk(&Allocation::from_pairs([("Cash", 1.0)])), 1.0);
    let even = Allocation::from_pairs([("Stocks", 0.25), ("Bonds", 0.25), ("Cash", 0.25), ("Gold", 0.25)]);
    assert_abs_diff_eq!(concentration_risk(&even), 0.0, epsilon = 1e-12);
  }

  #[test]
  fn short_history_leaves_factor_at_one() {
    let model = RiskModel::default();
    assert_eq!(model.calibration_factor(&[]), 1.0);
    let prices: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
    assert_eq!(model.calibration_factor(&history(&prices)), 1.0);
  }

  #[test]
  fn turbulent_history_raises_and_clamps_factor() {
    let model = RiskModel::default();
    let prices: Vec<f64> = (0..60)
      .map(|i| if i % 2 == 0 { 100.0 } else { 106.0 })
      .collect();
    let factor = model.calibration_factor(&history(&prices));
    assert!(factor > 1.0);
    assert!(factor <= 1.5);
  }

  #[test]
  fn calm_history_lowers_factor() {
    let model = RiskModel::default();
    let prices: Vec<f64> = (0..60).map(|i| 100.0 * 1.0005f64.powi(i)).collect();
    // Constant growth has no realised volatility: 1 - 0.18.
    assert_abs_diff_eq!(model.calibration_factor(&history(&prices)), 0.82, epsilon = 1e-9);

    let flat = vec![100.0; 60];
    assert_abs_diff_eq!(model.calibration_factor(&history(&flat)), 0.82, epsilon = 1e-9);

    let wiggle: Vec<f64> = (0..60)
      .map(|i| if i % 2 == 0 { 100.0 } else { 100.05 })
      .collect();
    let factor = model.calibration_factor(&history(&wiggle));
    assert_relative_eq!(factor, 0.8296, epsilon = 1e-3);
  }

  #[test]
  fn seeded_noise_is_reproducible() {
    let config = RiskModelConfig {
      calibration_noise: Some(CalibrationNoise {
        seed: 7,
        scale: 0.2,
      }),
      ..RiskModelConfig::default()
    };
    let a = RiskModel::new(Arc::new(AssetReferenceTable::default()), config.clone());
    let b = RiskModel::new(Arc::new(AssetReferenceTable::default()), config);
    assert_eq!(a.calibration_factor(&[]), b.calibration_factor(&[]));
    assert!(a.calibration_factor(&[]) >= 0.8);
  }

  #[test]
  fn profile_without_history_uses_reference_values() {
    let model = RiskModel::default();
    let p = model.estimate(&balanced(), &[]).unwrap();

    // 0.6·0.16 + 0.4·0.04
    assert_abs_diff_eq!(p.volatility, 0.112, epsilon = 1e-12);
    assert_abs_diff_eq!(p.beta, 0.64, epsilon = 1e-12);
    assert_abs_diff_eq!(p.var_95, 1.645 * 0.112 / 252f64.sqrt(), epsilon = 1e-12);
    assert!(p.var_99 > p.var_95);
    assert_abs_diff_eq!(p.expected_shortfall, 1.25 * p.var_95, epsilon = 1e-12);
    assert_abs_diff_eq!(p.liquidity_risk, 1.0 - (0.54 + 0.28), epsilon = 1e-12);
    assert_eq!(p.stress_tests.len(), 7);
    assert_abs_diff_eq!(
      p.stress_tests["market_crash_2008"],
      0.076 - 3.5 * 0.112,
      epsilon = 1e-12
    );
    let attributed: f64 = p.risk_attribution.values().sum();
    assert_abs_diff_eq!(attributed, 1.0, epsilon = 1e-12);
  }

  #[test]
  fn volatility_has_a_floor() {
    let model = RiskModel::default();
    let p = model
      .estimate(&Allocation::from_pairs([("Cash", 1.0)]), &[])
      .unwrap();
    assert_eq!(p.volatility, 0.05);
    assert_eq!(p.concentration_risk, 1.0);
    assert!(p.max_drawdown <= 0.6);
    assert!((0.0..=1.0).contains(&p.tail_risk_score));
  }

  #[test]
  fn unknown_asset_without_fallback_fails() {
    let table = AssetReferenceTable::default().without_fallback();
    let model = RiskModel::new(Arc::new(table), RiskModelConfig::default());
    let alloc = Allocation::from_pairs([("Crypto", 1.0)]);
    assert!(matches!(
      model.estimate(&alloc, &[]),
      Err(SynthesisError::UnknownAssetClass { .. })
    ));
  }

  #[test]
  fn invalid_calibration_bounds_are_rejected() {
    let config = RiskModelConfig {
      min_calibration: 1.6,
      ..RiskModelConfig::default()
    };
    assert!(matches!(config.validate(), Err(SynthesisError::Config(_))));
  }

  #[traced_test]
  #[test]
  fn estimate_emits_debug_event() {
    let model = RiskModel::default();
    model.estimate(&balanced(), &[]).unwrap();
    assert!(logs_contain("estimated risk profile"));
  }
}
