//! # Constrained Optimizer
//!
//! $$
//! \min_{\mathbf w \in \Delta^{n-1}} f(\mathbf w),\qquad
//! w_i = \frac{e^{x_i}}{\sum_j e^{x_j}}
//! $$
//!
//! Long-only simplex optimization. The default solver runs Nelder-Mead on
//! unconstrained softmax parameters, so every iterate is a valid allocation.

use std::fmt;
use std::sync::Arc;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Failures of a single simplex solve.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum OptimizerError {
  #[error("optimization problem has no dimensions")]
  EmptyProblem,

  #[error("solver did not converge after {iterations} iterations")]
  NotConverged { iterations: u64 },

  #[error("solver failed: {0}")]
  Solver(String),

  #[error("objective is not finite at the starting point")]
  NonFiniteObjective,

  #[error("upper bound {0} is infeasible for {1} assets")]
  InfeasibleBound(f64, usize),
}

type Objective = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Minimize `objective` over long-only weight vectors of length `dimension`
/// summing to one, optionally with a per-asset upper bound.
#[derive(Clone)]
pub struct SimplexProblem {
  pub dimension: usize,
  pub upper_bound: Option<f64>,
  objective: Objective,
}

impl fmt::Debug for SimplexProblem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SimplexProblem")
      .field("dimension", &self.dimension)
      .field("upper_bound", &self.upper_bound)
      .finish_non_exhaustive()
  }
}

impl SimplexProblem {
  pub fn new<F>(dimension: usize, objective: F) -> Self
  where
    F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
  {
    Self {
      dimension,
      upper_bound: None,
      objective: Arc::new(objective),
    }
  }

  pub fn with_upper_bound(mut self, bound: f64) -> Self {
    self.upper_bound = Some(bound);
    self
  }

  pub fn evaluate(&self, weights: &[f64]) -> f64 {
    (self.objective)(weights)
  }
}

/// Solver seam used by the frontier engine for its optimized candidates.
pub trait ConstrainedOptimizer: Send + Sync + fmt::Debug {
  /// Weights of length `problem.dimension`, non-negative, summing to one.
  fn minimize(&self, problem: &SimplexProblem) -> Result<Vec<f64>, OptimizerError>;
}

/// Runtime configuration for [`NelderMeadOptimizer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
  pub max_iters: u64,
  /// Convergence threshold on the standard deviation of simplex costs.
  pub sd_tolerance: f64,
  /// Quadratic penalty on weight above the upper bound.
  pub bound_penalty: f64,
}

impl Default for NelderMeadConfig {
  fn default() -> Self {
    Self {
      max_iters: 5000,
      sd_tolerance: 1e-10,
      bound_penalty: 1e3,
    }
  }
}

/// Nelder-Mead over softmax parameters.
#[derive(Clone, Debug, Default)]
pub struct NelderMeadOptimizer {
  config: NelderMeadConfig,
}

pub(crate) fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

struct SoftmaxCost {
  objective: Objective,
  upper_bound: Option<f64>,
  penalty: f64,
}

impl SoftmaxCost {
  fn value(&self, w: &[f64]) -> f64 {
    let mut v = (self.objective)(w);
    if let Some(ub) = self.upper_bound {
      let breach: f64 = w.iter().map(|&wi| (wi - ub).max(0.0).powi(2)).sum();
      v += self.penalty * breach;
    }
    v
  }
}

impl CostFunction for SoftmaxCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let v = self.value(&softmax(x));
    if v.is_finite() {
      Ok(v)
    } else {
      Err(argmin::core::Error::msg(
        "objective returned a non-finite value",
      ))
    }
  }
}

impl NelderMeadOptimizer {
  pub fn new(config: NelderMeadConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &NelderMeadConfig {
    &self.config
  }
}

impl ConstrainedOptimizer for NelderMeadOptimizer {
  fn minimize(&self, problem: &SimplexProblem) -> Result<Vec<f64>, OptimizerError> {
    let n = problem.dimension;
    if n == 0 {
      return Err(OptimizerError::EmptyProblem);
    }
    if let Some(ub) = problem.upper_bound {
      if !(ub > 0.0) || ub * (n as f64) < 1.0 - 1e-12 {
        return Err(OptimizerError::InfeasibleBound(ub, n));
      }
    }
    if n == 1 {
      return Ok(vec![1.0]);
    }

    let cost = SoftmaxCost {
      objective: Arc::clone(&problem.objective),
      upper_bound: problem.upper_bound,
      penalty: self.config.bound_penalty,
    };

    let x0 = vec![0.0; n];
    if !cost.value(&softmax(&x0)).is_finite() {
      return Err(OptimizerError::NonFiniteObjective);
    }

    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for i in 0..n {
      let mut point = x0.clone();
      point[i] = 1.0;
      simplex.push(point);
    }

    let solver = NelderMead::new(simplex)
      .with_sd_tolerance(self.config.sd_tolerance)
      .map_err(|e| OptimizerError::Solver(e.to_string()))?;
    let max_iters = self.config.max_iters;
    let res = Executor::new(cost, solver)
      .configure(|state| state.max_iters(max_iters))
      .run()
      .map_err(|e| OptimizerError::Solver(e.to_string()))?;

    if !matches!(
      res.state.get_termination_reason(),
      Some(TerminationReason::SolverConverged)
    ) {
      return Err(OptimizerError::NotConverged {
        iterations: res.state.get_iter(),
      });
    }

    let best_x = res.state.best_param.unwrap_or(x0);
    Ok(softmax(&best_x))
  }
}
