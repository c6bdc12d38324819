use prettytable::format;
use prettytable::row;
use prettytable::Table;

use super::corrections::Correction;
use super::types::SynthesisResult;

fn pct(x: f64) -> String {
  format!("{:.2}%", x * 100.0)
}

/// Allocation table followed by the headline metrics.
pub fn summary_tables(result: &SynthesisResult) -> (Table, Table) {
  let mut weights = Table::new();
  weights.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
  weights.set_titles(row!["Asset", "Weight", "Risk share"]);
  for (asset, w) in result.final_allocation.iter() {
    let share = result
      .risk_profile
      .risk_attribution
      .get(asset)
      .copied()
      .unwrap_or(0.0);
    weights.add_row(row![asset, pct(w), pct(share)]);
  }

  let mut metrics = Table::new();
  metrics.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
  metrics.set_titles(row!["Metric", "Value"]);
  metrics.add_row(row!["Portfolio", result.portfolio_id]);
  metrics.add_row(row!["Method", result.method]);
  metrics.add_row(row!["Expected return", pct(result.expected_return)]);
  metrics.add_row(row!["Net return", pct(result.net_return)]);
  metrics.add_row(row!["Volatility", pct(result.risk_score)]);
  metrics.add_row(row!["VaR 95 (daily)", pct(result.risk_profile.var_95)]);
  metrics.add_row(row!["Max drawdown", pct(result.risk_profile.max_drawdown)]);
  metrics.add_row(row!["Expense ratio", pct(result.cost_score)]);
  metrics.add_row(row![
    "Total cost",
    format!("{:.1} bps", result.cost_profile.total_cost_bps)
  ]);
  metrics.add_row(row!["Sharpe", format!("{:.3}", result.sharpe_ratio)]);
  metrics.add_row(row!["Confidence", format!("{:.2}", result.synthesis_confidence)]);
  for correction in &result.improvement.corrections {
    let text = match correction {
      Correction::CostBlend {
        expense_before,
        expense_after,
      } => format!("cost blend {} -> {}", pct(*expense_before), pct(*expense_after)),
      Correction::DustRemoved { assets } => format!("dropped {}", assets.join(", ")),
      Correction::ConcentrationCap { cap, .. } => format!("capped at {}", pct(*cap)),
    };
    metrics.add_row(row!["Correction", text]);
  }

  (weights, metrics)
}

/// Plain-text rendering of [`summary_tables`].
pub fn format_summary(result: &SynthesisResult) -> String {
  let (weights, metrics) = summary_tables(result);
  format!("{weights}\n{metrics}")
}
