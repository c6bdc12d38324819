use allocation_synthesis::frontier::DominanceRule;
use allocation_synthesis::frontier::ParetoConfig;
use allocation_synthesis::models::concentration_risk;
use allocation_synthesis::models::CalibrationNoise;
use allocation_synthesis::synthesis::Correction;
use allocation_synthesis::synthesis::PreferenceWeights;
use allocation_synthesis::AllocationProposal;
use allocation_synthesis::ClientPreferences;
use allocation_synthesis::MarketSnapshot;
use allocation_synthesis::SynthesisConfig;
use allocation_synthesis::SynthesisLog;
use allocation_synthesis::SynthesisOrchestrator;
use approx::assert_abs_diff_eq;
use chrono::Days;
use chrono::NaiveDate;

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

fn moderate() -> ClientPreferences {
  ClientPreferences::new(
    "moderate".into(),
    "balanced".into(),
    Some("7 years".into()),
    Some(500_000.0),
  )
}

fn history(days: u64) -> Vec<MarketSnapshot> {
  let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
  (0..days)
    .map(|i| {
      let t = i as f64;
      MarketSnapshot::new(
        start + Days::new(i),
        4300.0 * (1.0 + 0.02 * (t * 0.9).sin()),
        17.0,
        0.043,
        102.0,
        81.0,
        1980.0,
      )
    })
    .collect()
}

#[test]
fn dominated_proposal_is_excluded_from_frontier() {
  let orchestrator = SynthesisOrchestrator::default();
  let frontier = orchestrator.engine().find_frontier(&scenario()).unwrap();
  let ids: Vec<&str> = frontier.iter().map(|c| c.id.as_str()).collect();

  assert!(ids.contains(&"A"));
  assert!(ids.contains(&"B"));
  assert!(!ids.contains(&"C"));
}

#[test]
fn three_objective_rule_also_excludes_dominated_proposal() {
  let mut config = SynthesisConfig::default();
  config.pareto.dominance = DominanceRule::ReturnRiskCost;
  let orchestrator = config.build().unwrap();
  let frontier = orchestrator.engine().find_frontier(&scenario()).unwrap();

  assert!(frontier.iter().any(|c| c.id == "A"));
  assert!(frontier.iter().all(|c| c.id != "C"));
}

#[test]
fn moderate_client_gets_a_valid_recommendation() {
  let orchestrator = SynthesisOrchestrator::default();
  let result = orchestrator
    .synthesize(&scenario(), &moderate(), &history(90), 500_000.0)
    .unwrap();

  assert!(result.final_allocation.is_normalized());
  assert!((0.0..=1.0).contains(&result.synthesis_confidence));
  assert!(!result.contributing_sources.is_empty());
  assert!(result.risk_score >= 0.05);
  assert_abs_diff_eq!(
    result.net_return,
    result.expected_return - result.cost_profile.total_expense_ratio,
    epsilon = 1e-15
  );
  assert_abs_diff_eq!(result.preference_weights.expected_return, 0.3, epsilon = 1e-12);
}

fn clients() -> Vec<ClientPreferences> {
  vec![
    moderate(),
    ClientPreferences::new("conservative".into(), "income".into(), Some("2 years".into()), None),
    ClientPreferences::new("aggressive".into(), "growth".into(), Some("long term".into()), None),
    ClientPreferences::new("moderate to high".into(), "balanced growth".into(), Some("15 years".into()), None),
  ]
}

fn assert_recommendation_holds(orchestrator: &SynthesisOrchestrator, prefs: &ClientPreferences) {
  let proposals = scenario();
  let frontier = orchestrator.engine().find_frontier(&proposals).unwrap();
  let weights = PreferenceWeights::from_preferences(prefs);
  let selected = orchestrator.select(&frontier, &weights).unwrap();
  let cost = orchestrator.engine().cost_model();

  let result = orchestrator
    .synthesize(&proposals, prefs, &history(90), 500_000.0)
    .unwrap();
  let final_alloc = &result.final_allocation;

  assert_eq!(result.method, selected.method_tag());
  assert!(final_alloc.is_normalized());
  if concentration_risk(&selected.allocation) > 0.7 {
    assert!(final_alloc.max_weight() <= 0.4 + 1e-9);
  }
  let before = cost.expense_ratio(&selected.allocation).unwrap();
  if before > 0.008 {
    assert!(result.cost_score < before);
  }
  for correction in &result.improvement.corrections {
    if let Correction::ConcentrationCap { capped_assets, .. } = correction {
      assert!(!capped_assets.is_empty());
    }
  }
}

#[test]
fn scenario_recommendations_respect_cap_and_cost_rules() {
  let orchestrator = SynthesisOrchestrator::default();
  for prefs in clients() {
    assert_recommendation_holds(&orchestrator, &prefs);
  }
}

#[test]
fn unbounded_corner_points_are_still_corrected() {
  let mut config = SynthesisConfig::default();
  config.pareto = ParetoConfig {
    max_weight: 1.0,
    ..ParetoConfig::default()
  };
  let orchestrator = config.build().unwrap();
  for prefs in clients() {
    assert_recommendation_holds(&orchestrator, &prefs);
  }
}

#[test]
fn identical_inputs_serialize_identically() {
  let mut config = SynthesisConfig::default();
  config.risk.calibration_noise = Some(CalibrationNoise {
    seed: 42,
    scale: 0.1,
  });
  let orchestrator = config.build().unwrap();
  let market = history(300);

  let first = orchestrator
    .synthesize(&scenario(), &moderate(), &market, 500_000.0)
    .unwrap();
  let second = orchestrator
    .synthesize(&scenario(), &moderate(), &market, 500_000.0)
    .unwrap();

  assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
  assert_eq!(first.portfolio_id, second.portfolio_id);
}

#[test]
fn expensive_proposal_is_cost_corrected() {
  let orchestrator = SynthesisOrchestrator::default();
  let expensive = proposal(
    "alts",
    &[("Alternatives", 0.6), ("Real Estate", 0.2), ("Stocks", 0.2)],
    0.105,
    0.16,
  );
  let result = orchestrator
    .synthesize(&[expensive], &moderate(), &[], 500_000.0)
    .unwrap();

  assert!(result.cost_score < 0.0097);
  assert!(result.improvement.cost_correction > 0.0);
}

#[test]
fn log_collects_successive_runs() {
  let orchestrator = SynthesisOrchestrator::default();
  let mut log = SynthesisLog::new();
  for _ in 0..3 {
    orchestrator
      .synthesize_and_record(&scenario(), &moderate(), &[], 500_000.0, &mut log)
      .unwrap();
  }

  assert_eq!(log.len(), 3);
  let first = &log.entries()[0].result;
  assert!(log.entries().iter().all(|e| &e.result == first));
  assert_abs_diff_eq!(
    log.mean_confidence().unwrap(),
    first.synthesis_confidence,
    epsilon = 1e-12
  );
}
