//! Bounded phase-shift optimizer
//!
//! Maximizes SE or EE over θ ∈ [0, 2π]^N for one channel batch. The
//! objective is non-convex and multi-modal, so this is a local search from a
//! uniformly random seed point:
//!
//! 1. Minimize f(θ) = -metric(gain(θ)) with the analytic gradient
//!    (chain rule through [`Objective::gain_sensitivity`] and
//!    [`GainEvaluator::weighted_gradient`]).
//! 2. Each iteration steps along the projection arc
//!    θ(α) = clamp(θ - α∇f, 0, 2π) with a Barzilai-Borwein trial length and
//!    Armijo backtracking.
//! 3. Stop when the projected gradient is below `gtol` (converged), the
//!    relative decrease of f is below `ftol` (converged), the iteration budget
//!    runs out, or the line search cannot make progress.
//!
//! Every outcome returns the best iterate; the status is reported alongside
//! it instead of being treated as an error.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::{debug, warn};

use crate::channel::ChannelBatch;
use crate::efficiency::{LinkBudget, Objective};
use crate::error::RisResult;
use crate::gain::GainEvaluator;

/// Phase lower bound (rad)
pub const PHASE_MIN: f64 = 0.0;

/// Phase upper bound (rad)
pub const PHASE_MAX: f64 = TAU;

const ARMIJO_C1: f64 = 1e-4;
const MIN_STEP: f64 = 1e-12;
const MAX_STEP: f64 = 1e12;
const ROUNDING_TOLERANCE: f64 = 1e-12;

/// Solver tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub max_iterations: usize,
    /// Relative objective decrease that counts as converged
    pub ftol: f64,
    /// Projected-gradient infinity norm that counts as converged
    pub gtol: f64,
    pub max_line_search_steps: usize,
    /// Extra attempts from fresh seed points after a non-converged run
    pub restarts: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 15_000,
            ftol: 2.220446049250313e-9,
            gtol: 1e-5,
            max_line_search_steps: 20,
            restarts: 0,
        }
    }
}

/// How the search terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    Converged,
    IterationLimit,
    /// Non-finite objective or no acceptable step along the search arc
    NumericalFailure,
}

impl ConvergenceStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged)
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub theta: Vec<f64>,
    /// Gain vector recomputed at `theta`
    pub gain: Vec<f64>,
    /// Metric value (SE or EE) at `theta`
    pub objective_value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub attempts: usize,
    pub status: ConvergenceStatus,
}

/// Projected-gradient maximizer of SE / EE
#[derive(Debug, Clone)]
pub struct PhaseOptimizer {
    budget: LinkBudget,
    settings: OptimizerSettings,
}

impl PhaseOptimizer {
    pub fn new(budget: LinkBudget, settings: OptimizerSettings) -> Self {
        Self { budget, settings }
    }

    pub fn budget(&self) -> &LinkBudget {
        &self.budget
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    /// Optimize from a random seed point, retrying up to `restarts` times
    /// while the search does not converge.
    pub fn optimize<R: Rng + ?Sized>(
        &self,
        batch: &ChannelBatch,
        objective: Objective,
        rng: &mut R,
    ) -> OptimizationResult {
        let evaluator = GainEvaluator::new(batch);
        let mut best = self.attempt(&evaluator, objective, 1, rng);
        let mut last_converged = best.status.is_converged();

        for attempt in 2..=self.settings.restarts + 1 {
            if last_converged {
                break;
            }
            let result = self.attempt(&evaluator, objective, attempt, rng);
            last_converged = result.status.is_converged();
            best = if better(&result, &best) {
                result
            } else {
                OptimizationResult { attempts: attempt, ..best }
            };
        }

        if !best.status.is_converged() {
            warn!(
                objective = %objective,
                attempts = best.attempts,
                status = ?best.status,
                "phase search did not converge, keeping best iterate"
            );
        }
        best
    }

    fn attempt<R: Rng + ?Sized>(
        &self,
        evaluator: &GainEvaluator<'_>,
        objective: Objective,
        attempt: usize,
        rng: &mut R,
    ) -> OptimizationResult {
        let theta0 = random_phases(evaluator.ris_elements(), rng);
        let mut result = self.local_search(evaluator, objective, theta0);
        result.attempts = attempt;

        debug!(
            objective = %objective,
            attempt,
            status = ?result.status,
            iterations = result.iterations,
            value = result.objective_value,
            "phase search finished"
        );
        result
    }

    /// Single local search from `theta0`.
    ///
    /// Fails with `ShapeMismatch` when `theta0` does not have one phase per
    /// RIS element.
    pub fn search(
        &self,
        evaluator: &GainEvaluator<'_>,
        objective: Objective,
        theta0: Vec<f64>,
    ) -> RisResult<OptimizationResult> {
        evaluator.check_phases(&theta0)?;
        Ok(self.local_search(evaluator, objective, theta0))
    }

    fn local_search(
        &self,
        evaluator: &GainEvaluator<'_>,
        objective: Objective,
        theta0: Vec<f64>,
    ) -> OptimizationResult {
        let settings = &self.settings;
        let mut evaluations = 0usize;

        let mut x: Vec<f64> = theta0.into_iter().map(clamp_phase).collect();
        let (mut f, mut g) = self.value_and_gradient(evaluator, objective, &x);
        evaluations += 1;

        if !f.is_finite() || g.iter().any(|v| !v.is_finite()) {
            return self.finish(evaluator, objective, x, 0, evaluations, ConvergenceStatus::NumericalFailure);
        }

        let mut step = 1.0 / inf_norm(&g).max(MIN_STEP);
        let mut status = ConvergenceStatus::IterationLimit;
        let mut iterations = 0usize;

        while iterations < settings.max_iterations {
            if projected_gradient_norm(&x, &g) <= settings.gtol {
                status = ConvergenceStatus::Converged;
                break;
            }
            iterations += 1;

            // Backtrack along the projection arc
            let mut alpha = step;
            let mut accepted = None;
            let mut last_trial = f64::NAN;
            for _ in 0..settings.max_line_search_steps.max(1) {
                let x_new: Vec<f64> = x
                    .iter()
                    .zip(g.iter())
                    .map(|(xi, gi)| clamp_phase(xi - alpha * gi))
                    .collect();
                let directional: f64 = g
                    .iter()
                    .zip(x_new.iter().zip(x.iter()))
                    .map(|(gi, (xn, xo))| gi * (xn - xo))
                    .sum();
                let (f_new, g_new) = self.value_and_gradient(evaluator, objective, &x_new);
                evaluations += 1;
                last_trial = f_new;

                if f_new.is_finite() && f_new <= f + ARMIJO_C1 * directional {
                    accepted = Some((x_new, f_new, g_new));
                    break;
                }
                alpha *= 0.5;
            }

            let Some((x_new, f_new, g_new)) = accepted else {
                // No decrease left above rounding noise: stationary in practice
                status = if (last_trial - f).abs() <= ROUNDING_TOLERANCE * f.abs().max(1.0) {
                    ConvergenceStatus::Converged
                } else {
                    ConvergenceStatus::NumericalFailure
                };
                break;
            };

            let s: Vec<f64> = x_new.iter().zip(x.iter()).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_new.iter().zip(g.iter()).map(|(a, b)| a - b).collect();
            let decrease = (f - f_new) / f.abs().max(f_new.abs()).max(1.0);

            x = x_new;
            f = f_new;
            g = g_new;

            if decrease <= settings.ftol {
                status = ConvergenceStatus::Converged;
                break;
            }

            let sy = dot(&s, &y);
            step = if sy > 0.0 {
                (dot(&s, &s) / sy).clamp(MIN_STEP, MAX_STEP)
            } else {
                (alpha * 2.0).min(MAX_STEP)
            };
        }

        self.finish(evaluator, objective, x, iterations, evaluations, status)
    }

    /// f(θ) = -metric and its gradient
    fn value_and_gradient(
        &self,
        evaluator: &GainEvaluator<'_>,
        objective: Objective,
        theta: &[f64],
    ) -> (f64, Vec<f64>) {
        let state = evaluator.evaluate(theta);
        let value = objective.evaluate(&self.budget, &state.gains);
        let sensitivity = objective.gain_sensitivity(&self.budget, &state.gains);
        let grad = evaluator
            .weighted_gradient(&state, &sensitivity)
            .into_iter()
            .map(|d| -d)
            .collect();
        (-value, grad)
    }

    fn finish(
        &self,
        evaluator: &GainEvaluator<'_>,
        objective: Objective,
        theta: Vec<f64>,
        iterations: usize,
        evaluations: usize,
        status: ConvergenceStatus,
    ) -> OptimizationResult {
        let gain = evaluator.gain(&theta);
        let objective_value = objective.evaluate(&self.budget, &gain);
        OptimizationResult {
            theta,
            gain,
            objective_value,
            iterations,
            evaluations,
            attempts: 1,
            status,
        }
    }
}

/// Optimize `objective` on `batch` with a default-configured solver.
pub fn optimize<R: Rng + ?Sized>(
    batch: &ChannelBatch,
    p: f64,
    n0: f64,
    w: f64,
    pc: f64,
    objective: Objective,
    rng: &mut R,
) -> OptimizationResult {
    let budget = LinkBudget {
        transmit_power_w: p,
        noise_psd_w_per_hz: n0,
        bandwidth_hz: w,
        circuit_power_w: pc,
    };
    PhaseOptimizer::new(budget, OptimizerSettings::default()).optimize(batch, objective, rng)
}

/// `count` phases uniform in [0, 2π)
pub fn random_phases<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<f64> {
    let dist = Uniform::new(PHASE_MIN, PHASE_MAX);
    (0..count).map(|_| dist.sample(rng)).collect()
}

/// Converged attempts rank above non-converged ones, then the larger
/// finite objective wins.
fn better(candidate: &OptimizationResult, incumbent: &OptimizationResult) -> bool {
    let rank = |r: &OptimizationResult| (r.status.is_converged(), r.objective_value.is_finite());
    match rank(candidate).cmp(&rank(incumbent)) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.objective_value > incumbent.objective_value,
    }
}

#[inline]
fn clamp_phase(t: f64) -> f64 {
    t.clamp(PHASE_MIN, PHASE_MAX)
}

fn projected_gradient_norm(x: &[f64], g: &[f64]) -> f64 {
    x.iter()
        .zip(g.iter())
        .map(|(xi, gi)| (xi - clamp_phase(xi - gi)).abs())
        .fold(0.0, f64::max)
}

fn inf_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
