use allocation_synthesis::synthesis::format_summary;
use allocation_synthesis::AllocationProposal;
use allocation_synthesis::ClientPreferences;
use allocation_synthesis::MarketSnapshot;
use allocation_synthesis::SynthesisConfig;
use allocation_synthesis::SynthesisLog;
use anyhow::Context;
use chrono::Days;
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

fn proposals() -> Vec<AllocationProposal> {
  let make = |id: &str, name: &str, pairs: &[(&str, f64)], ret, risk, conf| {
    AllocationProposal::new(
      id.to_string(),
      name.to_string(),
      pairs.iter().map(|(a, w)| (*a, *w)).collect(),
      ret,
      risk,
      conf,
      0.8,
      0.75,
    )
  };

  vec![
    make(
      "growth-01",
      "Growth",
      &[("Stocks", 0.5), ("Technology", 0.3), ("International", 0.2)],
      0.105,
      0.17,
      0.82,
    ),
    make(
      "income-01",
      "Income",
      &[("Bonds", 0.6), ("Real Estate", 0.25), ("Cash", 0.15)],
      0.052,
      0.07,
      0.88,
    ),
    make(
      "diversified-01",
      "Diversified",
      &[
        ("Stocks", 0.35),
        ("Bonds", 0.25),
        ("Emerging Markets", 0.15),
        ("Commodities", 0.1),
        ("Healthcare", 0.15),
      ],
      0.078,
      0.12,
      0.76,
    ),
  ]
}

fn market_history() -> anyhow::Result<Vec<MarketSnapshot>> {
  let start = NaiveDate::from_ymd_opt(2024, 1, 2).context("invalid start date")?;
  Ok(
    (0..120u64)
      .map(|i| {
        let t = i as f64;
        let price = 4700.0 * (1.0 + 0.0003 * t + 0.012 * (t * 0.7).sin());
        MarketSnapshot::new(
          start + Days::new(i),
          price,
          15.0 + 3.0 * (t * 0.2).cos(),
          0.041,
          103.5,
          76.0,
          2040.0,
        )
      })
      .collect(),
  )
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = match std::env::args().nth(1) {
    Some(path) => {
      let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
      SynthesisConfig::from_json(&text)?
    }
    None => SynthesisConfig::default(),
  };
  let orchestrator = config.build()?;

  let prefs = ClientPreferences::new(
    "moderate".into(),
    "balanced growth".into(),
    Some("12 years".into()),
    Some(1_500_000.0),
  );

  let mut log = SynthesisLog::new();
  let result = orchestrator.synthesize_and_record(
    &proposals(),
    &prefs,
    &market_history()?,
    750_000.0,
    &mut log,
  )?;

  println!("{}", format_summary(&result));
  println!("{}", result.to_json_pretty()?);
  Ok(())
}
