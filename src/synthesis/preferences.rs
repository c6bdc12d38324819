use impl_new_derive::ImplNew;
use serde::Deserialize;
use serde::Serialize;

use crate::frontier::CandidatePoint;

/// Free-text client preferences as collected upstream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ImplNew)]
pub struct ClientPreferences {
  /// e.g. `"moderate"`, `"conservative"`, `"moderate to high"`.
  pub risk_tolerance: String,
  /// e.g. `"aggressive growth"`, `"income"`.
  pub strategy: String,
  /// e.g. `"long-term"`, `"15 years"`, `"18 months"`.
  pub timeline: Option<String>,
  pub target_amount: Option<f64>,
}

/// Investment horizon bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineHorizon {
  Short,
  Medium,
  Long,
}

impl TimelineHorizon {
  /// Years at or below which a horizon counts as short.
  pub const SHORT_YEARS: f64 = 3.0;
  /// Years at or above which a horizon counts as long.
  pub const LONG_YEARS: f64 = 10.0;

  /// Keywords first, then a leading number of years or months.
  pub fn parse(text: &str) -> Self {
    let text = text.to_lowercase();
    if text.contains("short") {
      return TimelineHorizon::Short;
    }
    if text.contains("long") {
      return TimelineHorizon::Long;
    }

    match leading_years(&text) {
      Some(y) if y <= Self::SHORT_YEARS => TimelineHorizon::Short,
      Some(y) if y >= Self::LONG_YEARS => TimelineHorizon::Long,
      _ => TimelineHorizon::Medium,
    }
  }
}

fn leading_years(text: &str) -> Option<f64> {
  let start = text.find(|c: char| c.is_ascii_digit())?;
  let rest = &text[start..];
  let end = rest
    .find(|c: char| !(c.is_ascii_digit() || c == '.'))
    .unwrap_or(rest.len());
  let value: f64 = rest[..end].parse().ok()?;

  if rest[end..].trim_start().starts_with("month") {
    Some(value / 12.0)
  } else {
    Some(value)
  }
}

/// Relative importance of the four objectives. Sums to one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceWeights {
  pub expected_return: f64,
  pub risk: f64,
  pub cost: f64,
  pub utility: f64,
}

impl Default for PreferenceWeights {
  fn default() -> Self {
    Self {
      expected_return: 0.3,
      risk: 0.3,
      cost: 0.2,
      utility: 0.2,
    }
  }
}

impl PreferenceWeights {
  /// Apply the keyword rule table to the base weights and renormalize.
  pub fn from_preferences(prefs: &ClientPreferences) -> Self {
    let mut w = Self::default();
    let tolerance = prefs.risk_tolerance.to_lowercase();
    let strategy = prefs.strategy.to_lowercase();

    if tolerance.contains("conservative") || tolerance.contains("low") {
      w.risk = 0.5;
      w.expected_return = 0.2;
    } else if tolerance.contains("aggressive") || tolerance.contains("high") {
      w.expected_return = 0.5;
      w.risk = 0.1;
    }

    if strategy.contains("growth") || strategy.contains("aggressive") {
      w.expected_return += 0.1;
      w.risk -= 0.05;
    } else if strategy.contains("income") || strategy.contains("conservative") {
      w.risk += 0.1;
      w.expected_return -= 0.05;
    }

    match prefs.timeline.as_deref().map(TimelineHorizon::parse) {
      Some(TimelineHorizon::Short) => {
        w.risk += 0.1;
        w.cost += 0.05;
      }
      Some(TimelineHorizon::Long) => {
        w.expected_return += 0.1;
        w.cost -= 0.05;
      }
      _ => {}
    }

    w.normalized()
  }

  pub fn total(&self) -> f64 {
    self.expected_return + self.risk + self.cost + self.utility
  }

  fn normalized(self) -> Self {
    let clipped = Self {
      expected_return: self.expected_return.max(0.0),
      risk: self.risk.max(0.0),
      cost: self.cost.max(0.0),
      utility: self.utility.max(0.0),
    };
    let total = clipped.total();
    if total <= 0.0 {
      return Self::default();
    }
    Self {
      expected_return: clipped.expected_return / total,
      risk: clipped.risk / total,
      cost: clipped.cost / total,
      utility: clipped.utility / total,
    }
  }

  /// Weighted selection score of a frontier point.
  pub fn score(&self, point: &CandidatePoint, scales: &ScoringScales) -> f64 {
    self.expected_return * point.expected_return * scales.expected_return
      + self.risk * (1.0 - point.risk_score) * scales.risk
      + self.cost * (1.0 - point.cost_score) * scales.cost
      + self.utility * point.utility_score * scales.utility
  }
}

/// Multipliers that bring the four objectives onto comparable ranges.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringScales {
  pub expected_return: f64,
  pub risk: f64,
  pub cost: f64,
  pub utility: f64,
}

impl Default for ScoringScales {
  fn default() -> Self {
    Self {
      expected_return: 10.0,
      risk: 10.0,
      cost: 100.0,
      utility: 10.0,
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn prefs(tolerance: &str, strategy: &str, timeline: Option<&str>) -> ClientPreferences {
    ClientPreferences::new(
      tolerance.into(),
      strategy.into(),
      timeline.map(str::to_string),
      None,
    )
  }

  #[test]
  fn moderate_keeps_base_weights() {
    let w = PreferenceWeights::from_preferences(&prefs("moderate", "balanced", None));
    assert_abs_diff_eq!(w.expected_return, 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(w.risk, 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(w.cost, 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(w.utility, 0.2, epsilon = 1e-12);
  }

  #[test]
  fn conservative_income_short_horizon() {
    let w = PreferenceWeights::from_preferences(&prefs("conservative", "income", Some("2 years")));
    // return .15, risk .7, cost .25, utility .2 before normalization
    assert_abs_diff_eq!(w.total(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(w.risk, 0.7 / 1.3, epsilon = 1e-12);
    assert_abs_diff_eq!(w.expected_return, 0.15 / 1.3, epsilon = 1e-12);
  }

  #[test]
  fn aggressive_growth_long_horizon() {
    let w = PreferenceWeights::from_preferences(&prefs(
      "moderate to high",
      "aggressive growth",
      Some("long-term"),
    ));
    // return .7, risk .05, cost .15, utility .2
    assert_abs_diff_eq!(w.expected_return, 0.7 / 1.1, epsilon = 1e-12);
    assert_abs_diff_eq!(w.risk, 0.05 / 1.1, epsilon = 1e-12);
  }

  #[test]
  fn timeline_parsing() {
    assert_eq!(TimelineHorizon::parse("Short-term"), TimelineHorizon::Short);
    assert_eq!(TimelineHorizon::parse("long term wealth"), TimelineHorizon::Long);
    assert_eq!(TimelineHorizon::parse("15 years"), TimelineHorizon::Long);
    assert_eq!(TimelineHorizon::parse("3 years"), TimelineHorizon::Short);
    assert_eq!(TimelineHorizon::parse("18 months"), TimelineHorizon::Short);
    assert_eq!(TimelineHorizon::parse("5 years"), TimelineHorizon::Medium);
    assert_eq!(TimelineHorizon::parse("medium-term"), TimelineHorizon::Medium);
  }
}
