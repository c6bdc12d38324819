//! # Allocation
//!
//! $$
//! \sum_i w_i = 1,\qquad w_i \ge 0
//! $$
//!
//! Asset-class → weight maps. Entries are kept in a `BTreeMap` so every
//! weighted sum visits assets in the same order and repeated runs produce
//! bit-identical floating-point results.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

/// Tolerance on `Σw = 1`.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Ordered mapping of asset-class name to portfolio weight.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(BTreeMap<String, f64>);

impl Allocation {
  pub fn new() -> Self {
    Self(BTreeMap::new())
  }

  /// Build from `(asset, weight)` pairs. Repeated assets accumulate.
  pub fn from_pairs<I, S>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
  {
    let mut map = BTreeMap::new();
    for (asset, weight) in pairs {
      *map.entry(asset.into()).or_insert(0.0) += weight;
    }
    Self(map)
  }

  /// Zip an asset list with a weight vector of the same length.
  pub fn from_weights(assets: &[String], weights: &[f64]) -> Self {
    Self::from_pairs(assets.iter().cloned().zip(weights.iter().copied()))
  }

  pub fn insert(&mut self, asset: impl Into<String>, weight: f64) {
    self.0.insert(asset.into(), weight);
  }

  /// Weight of `asset`, zero when absent.
  pub fn get(&self, asset: &str) -> f64 {
    self.0.get(asset).copied().unwrap_or(0.0)
  }

  pub fn contains(&self, asset: &str) -> bool {
    self.0.contains_key(asset)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.0.iter().map(|(k, v)| (k.as_str(), *v))
  }

  pub fn assets(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn total(&self) -> f64 {
    self.0.values().sum()
  }

  pub fn max_weight(&self) -> f64 {
    self.0.values().copied().fold(0.0, f64::max)
  }

  /// Number of assets holding strictly more than `threshold`.
  pub fn count_above(&self, threshold: f64) -> usize {
    self.0.values().filter(|&&w| w > threshold).count()
  }

  /// Herfindahl-Hirschman index `Σw²`.
  pub fn herfindahl(&self) -> f64 {
    self.0.values().map(|w| w * w).sum()
  }

  /// True when every weight is finite and non-negative and the weights sum
  /// to one within [`WEIGHT_TOLERANCE`].
  pub fn is_normalized(&self) -> bool {
    self.0.values().all(|w| w.is_finite() && *w >= 0.0)
      && (self.total() - 1.0).abs() <= WEIGHT_TOLERANCE
  }

  /// Rescale so the weights sum to one. `None` when the total is not a
  /// positive finite number.
  pub fn normalized(&self) -> Option<Allocation> {
    let total = self.total();
    if !total.is_finite() || total <= 0.0 {
      return None;
    }

    Some(Self(
      self
        .0
        .iter()
        .map(|(k, v)| (k.clone(), v / total))
        .collect(),
    ))
  }

  /// Keep only weights at or above `min_weight`. Not renormalized.
  pub fn without_dust(&self, min_weight: f64) -> Allocation {
    Self(
      self
        .0
        .iter()
        .filter(|(_, w)| **w >= min_weight)
        .map(|(k, v)| (k.clone(), *v))
        .collect(),
    )
  }

  /// Assets whose weight is below `min_weight`.
  pub fn dust(&self, min_weight: f64) -> Vec<String> {
    self
      .0
      .iter()
      .filter(|(_, w)| **w < min_weight)
      .map(|(k, _)| k.clone())
      .collect()
  }

  /// Convex combination `α·self + (1−α)·other` over the union of assets.
  pub fn blend(&self, other: &Allocation, alpha: f64) -> Allocation {
    let assets: BTreeSet<&String> = self.0.keys().chain(other.0.keys()).collect();
    Self(
      assets
        .into_iter()
        .map(|asset| {
          let w = alpha * self.get(asset) + (1.0 - alpha) * other.get(asset);
          (asset.clone(), w)
        })
        .collect(),
    )
  }

  /// Cap every weight at `cap`, handing the excess to the uncapped assets in
  /// proportion to their weights until no asset exceeds the cap.
  ///
  /// When fewer assets are held than the cap allows (`n·cap < 1`) the
  /// closest feasible allocation, equal weights, is returned.
  pub fn capped(&self, cap: f64) -> Allocation {
    let n = self.0.len();
    if n == 0 {
      return self.clone();
    }

    if cap * (n as f64) < 1.0 - WEIGHT_TOLERANCE {
      let w = 1.0 / n as f64;
      return Self(self.0.keys().map(|k| (k.clone(), w)).collect());
    }

    let mut weights = self.0.clone();
    let mut pinned: BTreeSet<String> = BTreeSet::new();

    for _ in 0..=n {
      let mut excess = 0.0;
      for (asset, w) in weights.iter_mut() {
        if *w > cap {
          excess += *w - cap;
          *w = cap;
          pinned.insert(asset.clone());
        }
      }
      if excess <= 1e-15 {
        break;
      }

      let free: Vec<String> = weights
        .keys()
        .filter(|k| !pinned.contains(*k))
        .cloned()
        .collect();
      if free.is_empty() {
        break;
      }

      let free_total: f64 = free.iter().map(|k| weights[k]).sum();
      for asset in &free {
        let share = if free_total > 1e-15 {
          weights[asset] / free_total
        } else {
          1.0 / free.len() as f64
        };
        if let Some(w) = weights.get_mut(asset) {
          *w += excess * share;
        }
      }
    }

    Self(weights)
  }

  /// [`Allocation::capped`], widened to `universe` when too few assets are
  /// held for the cap to be feasible. Unheld universe assets enter at zero
  /// and share the excess equally; zero weights are dropped afterwards.
  pub fn capped_within(&self, cap: f64, universe: &[String]) -> Allocation {
    if cap * (self.0.len() as f64) >= 1.0 - WEIGHT_TOLERANCE {
      return self.capped(cap);
    }

    let mut widened = self.0.clone();
    for asset in universe {
      widened.entry(asset.clone()).or_insert(0.0);
    }
    let capped = Self(widened).capped(cap);
    Self(capped.0.into_iter().filter(|(_, w)| *w > 0.0).collect())
  }

  /// Sorted union of the assets held across `allocations`.
  pub fn union_assets<'a, I>(allocations: I) -> Vec<String>
  where
    I: IntoIterator<Item = &'a Allocation>,
  {
    let set: BTreeSet<&String> = allocations.into_iter().flat_map(|a| a.0.keys()).collect();
    set.into_iter().cloned().collect()
  }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Allocation {
  fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
    Self::from_pairs(iter)
  }
}
