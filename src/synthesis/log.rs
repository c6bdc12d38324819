use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::types::SynthesisResult;

/// One recorded synthesis run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthesisLogEntry {
  pub recorded_at: DateTime<Utc>,
  pub proposal_count: usize,
  pub result: SynthesisResult,
}

/// Append-only record of synthesis runs owned by the caller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SynthesisLog {
  entries: Vec<SynthesisLogEntry>,
}

impl SynthesisLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, proposal_count: usize, result: SynthesisResult) {
    self.entries.push(SynthesisLogEntry {
      recorded_at: Utc::now(),
      proposal_count,
      result,
    });
  }

  pub fn entries(&self) -> &[SynthesisLogEntry] {
    &self.entries
  }

  pub fn latest(&self) -> Option<&SynthesisLogEntry> {
    self.entries.last()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Mean synthesis confidence over all recorded runs.
  pub fn mean_confidence(&self) -> Option<f64> {
    if self.entries.is_empty() {
      return None;
    }
    let sum: f64 = self
      .entries
      .iter()
      .map(|e| e.result.synthesis_confidence)
      .sum();
    Some(sum / self.entries.len() as f64)
  }
}
