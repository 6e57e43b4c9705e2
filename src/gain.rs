//! Combined-channel power gain for a RIS phase configuration
//!
//! For realization r:
//!
//!   h_r(θ) = h_d[r] + Σ_n g_RU[n, r] · e^{jθ_n} · g_BR[n, r]
//!   g_r(θ) = |h_r(θ)|²
//!
//! [`GainEvaluator`] caches the cascaded products `g_RU · g_BR` so the
//! optimizer can evaluate many candidate phase vectors on the same batch,
//! and exposes the analytic derivative
//!
//!   ∂g_r/∂θ_n = -2 · Im( conj(h_r) · g_RU[n, r] · g_BR[n, r] · e^{jθ_n} )

use num_complex::Complex64;

use crate::channel::ChannelBatch;
use crate::error::{RisError, RisResult};

/// Gain per realization for phase vector `theta`.
///
/// # Panics
///
/// Panics if `theta.len()` differs from the batch's RIS element count.
pub fn gain(batch: &ChannelBatch, theta: &[f64]) -> Vec<f64> {
    GainEvaluator::new(batch).gain(theta)
}

/// Like [`gain`], but reports a wrong phase count as
/// [`RisError::ShapeMismatch`].
pub fn try_gain(batch: &ChannelBatch, theta: &[f64]) -> RisResult<Vec<f64>> {
    let evaluator = GainEvaluator::new(batch);
    evaluator.check_phases(theta)?;
    Ok(evaluator.gain(theta))
}

/// Gains plus the intermediate values needed for the gradient
#[derive(Debug, Clone)]
pub struct GainState {
    pub phasors: Vec<Complex64>,
    pub combined: Vec<Complex64>,
    pub gains: Vec<f64>,
}

/// Gain evaluation against one fixed channel batch
#[derive(Debug, Clone)]
pub struct GainEvaluator<'a> {
    batch: &'a ChannelBatch,
    cascaded: Vec<Complex64>,
}

impl<'a> GainEvaluator<'a> {
    pub fn new(batch: &'a ChannelBatch) -> Self {
        Self {
            batch,
            cascaded: batch.cascaded(),
        }
    }

    pub fn ris_elements(&self) -> usize {
        self.batch.ris_elements()
    }

    pub fn realizations(&self) -> usize {
        self.batch.realizations()
    }

    /// Ok when `theta` has one phase per RIS element
    pub fn check_phases(&self, theta: &[f64]) -> RisResult<()> {
        let n = self.batch.ris_elements();
        if theta.len() != n {
            return Err(RisError::ShapeMismatch {
                expected: format!("{} phases", n),
                actual: format!("{} phases", theta.len()),
            });
        }
        Ok(())
    }

    /// # Panics
    ///
    /// Panics on a phase count mismatch, see [`Self::check_phases`].
    pub fn gain(&self, theta: &[f64]) -> Vec<f64> {
        self.evaluate(theta).gains
    }

    /// # Panics
    ///
    /// Panics on a phase count mismatch, see [`Self::check_phases`].
    pub fn evaluate(&self, theta: &[f64]) -> GainState {
        let n = self.batch.ris_elements();
        assert_eq!(
            theta.len(),
            n,
            "phase vector has {} entries, RIS has {} elements",
            theta.len(),
            n
        );

        let phasors: Vec<Complex64> = theta.iter().map(|&t| Complex64::from_polar(1.0, t)).collect();

        let combined: Vec<Complex64> = self
            .batch
            .h_d()
            .iter()
            .enumerate()
            .map(|(r, &h_d)| {
                let column = &self.cascaded[r * n..(r + 1) * n];
                column
                    .iter()
                    .zip(phasors.iter())
                    .fold(h_d, |acc, (c, p)| acc + c * p)
            })
            .collect();

        let gains = combined.iter().map(|h| h.norm_sqr()).collect();

        GainState {
            phasors,
            combined,
            gains,
        }
    }

    /// `Σ_r weights[r] · ∂g_r/∂θ_n` for every element n.
    pub fn weighted_gradient(&self, state: &GainState, weights: &[f64]) -> Vec<f64> {
        let n = self.batch.ris_elements();
        let mut grad = vec![0.0; n];

        for (r, (h, &w)) in state.combined.iter().zip(weights.iter()).enumerate() {
            if w == 0.0 {
                continue;
            }
            let h_conj = h.conj();
            let column = &self.cascaded[r * n..(r + 1) * n];
            for ((g, c), p) in grad.iter_mut().zip(column.iter()).zip(state.phasors.iter()) {
                *g += -2.0 * w * (h_conj * c * p).im;
            }
        }

        grad
    }
}
