//! RIS-aided link channel model
//!
//! One scenario fixes the transmitter, receiver and RIS positions. For that
//! geometry a [`ChannelBatch`] holds `R` independent realizations of:
//!
//! - `h_d`:  direct TX → RX coefficient (1 × R)
//! - `g_BR`: TX → RIS coefficient per element (N_ris × R)
//! - `g_RU`: RIS → RX coefficient per element (N_ris × R)
//!
//! The direct path can be blocked (forced to exactly zero) or attenuated by a
//! random number of dB. Every fading draw uses a K-factor picked per
//! realization from a discrete mixture; both RIS hops of a realization share
//! one K-factor.
//!
//! Realizations are built one at a time from the caller's RNG, so the whole
//! batch is a pure function of the inputs and the stream position.

use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};

use crate::error::{RisError, RisResult};
use crate::fading::{self, KFactorMixture};
use crate::geometry::{path_loss, Interval, Position};

/// Static channel parameters for a run
#[derive(Debug, Clone)]
pub struct ChannelParams {
    pub ref_path_loss: f64,
    pub ris_position: Position,
    pub ris_elements: usize,
    pub realizations: usize,
    pub p_block: f64,
    pub p_attenuate: f64,
    pub attenuate_db_range: Interval,
}

/// Direct and RIS-relayed channel coefficients for `R` realizations.
///
/// RIS coefficients are stored realization-major: the `N_ris` values of
/// realization `r` are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBatch {
    ris_elements: usize,
    h_d: Vec<Complex64>,
    g_br: Vec<Complex64>,
    g_ru: Vec<Complex64>,
}

impl ChannelBatch {
    /// Assemble a batch from flat realization-major buffers.
    pub fn from_parts(
        ris_elements: usize,
        h_d: Vec<Complex64>,
        g_br: Vec<Complex64>,
        g_ru: Vec<Complex64>,
    ) -> RisResult<Self> {
        let expected = ris_elements * h_d.len();
        if g_br.len() != expected || g_ru.len() != expected {
            return Err(RisError::ShapeMismatch {
                expected: format!("{} x {} RIS coefficients", ris_elements, h_d.len()),
                actual: format!("g_BR has {}, g_RU has {}", g_br.len(), g_ru.len()),
            });
        }
        Ok(Self {
            ris_elements,
            h_d,
            g_br,
            g_ru,
        })
    }

    /// Number of RIS elements (rows of `g_BR` / `g_RU`)
    pub fn ris_elements(&self) -> usize {
        self.ris_elements
    }

    /// Number of realizations (columns)
    pub fn realizations(&self) -> usize {
        self.h_d.len()
    }

    /// `(rows, cols)` of `g_BR` and `g_RU`
    pub fn ris_shape(&self) -> (usize, usize) {
        (self.ris_elements, self.h_d.len())
    }

    pub fn h_d(&self) -> &[Complex64] {
        &self.h_d
    }

    pub fn g_br(&self, element: usize, realization: usize) -> Complex64 {
        self.g_br[realization * self.ris_elements + element]
    }

    pub fn g_ru(&self, element: usize, realization: usize) -> Complex64 {
        self.g_ru[realization * self.ris_elements + element]
    }

    /// TX → RIS coefficients of one realization
    pub fn g_br_column(&self, realization: usize) -> &[Complex64] {
        let start = realization * self.ris_elements;
        &self.g_br[start..start + self.ris_elements]
    }

    /// RIS → RX coefficients of one realization
    pub fn g_ru_column(&self, realization: usize) -> &[Complex64] {
        let start = realization * self.ris_elements;
        &self.g_ru[start..start + self.ris_elements]
    }

    /// Per-element cascaded coefficients `g_RU[n] · g_BR[n]`, realization-major
    pub fn cascaded(&self) -> Vec<Complex64> {
        self.g_ru
            .iter()
            .zip(self.g_br.iter())
            .map(|(ru, br)| ru * br)
            .collect()
    }

    /// Number of realizations whose direct path is exactly zero
    pub fn blocked_count(&self) -> usize {
        self.h_d
            .iter()
            .filter(|h| h.re == 0.0 && h.im == 0.0)
            .count()
    }
}

/// One realization before it is packed into a batch
struct Realization {
    h_d: Complex64,
    g_br: Vec<Complex64>,
    g_ru: Vec<Complex64>,
}

/// Channel generator with its distributions prepared once per run
#[derive(Debug, Clone)]
pub struct ChannelModel {
    params: ChannelParams,
    blockage: Bernoulli,
    attenuation: Bernoulli,
    attenuation_db: Uniform<f64>,
    k_mixture: KFactorMixture,
}

impl ChannelModel {
    pub fn new(params: ChannelParams) -> RisResult<Self> {
        Self::with_k_mixture(params, KFactorMixture::default())
    }

    pub fn with_k_mixture(params: ChannelParams, k_mixture: KFactorMixture) -> RisResult<Self> {
        let blockage = Bernoulli::new(params.p_block).map_err(|_| {
            RisError::InvalidConfig(format!("p_block {} not in [0, 1]", params.p_block))
        })?;
        let attenuation = Bernoulli::new(params.p_attenuate).map_err(|_| {
            RisError::InvalidConfig(format!("p_attenuate {} not in [0, 1]", params.p_attenuate))
        })?;
        if !params.attenuate_db_range.is_valid() {
            return Err(RisError::InvalidConfig(format!(
                "attenuation range {:?} is not a finite [min, max] interval",
                params.attenuate_db_range
            )));
        }
        let attenuation_db = Uniform::new_inclusive(
            params.attenuate_db_range.min,
            params.attenuate_db_range.max,
        );

        Ok(Self {
            params,
            blockage,
            attenuation,
            attenuation_db,
            k_mixture,
        })
    }

    pub fn params(&self) -> &ChannelParams {
        &self.params
    }

    /// Draw a fresh batch for the given endpoints.
    pub fn build<R: Rng + ?Sized>(&self, tx: &Position, rx: &Position, rng: &mut R) -> ChannelBatch {
        let ris = &self.params.ris_position;
        let pl_direct = path_loss(self.params.ref_path_loss, tx.distance_to(rx));
        let pl_br = path_loss(self.params.ref_path_loss, tx.distance_to(ris));
        let pl_ru = path_loss(self.params.ref_path_loss, ris.distance_to(rx));

        let n = self.params.ris_elements;
        let count = self.params.realizations;
        let mut h_d = Vec::with_capacity(count);
        let mut g_br = Vec::with_capacity(n * count);
        let mut g_ru = Vec::with_capacity(n * count);

        for _ in 0..count {
            let r = self.realization(pl_direct, pl_br, pl_ru, rng);
            h_d.push(r.h_d);
            g_br.extend(r.g_br);
            g_ru.extend(r.g_ru);
        }

        ChannelBatch {
            ris_elements: n,
            h_d,
            g_br,
            g_ru,
        }
    }

    fn realization<R: Rng + ?Sized>(
        &self,
        pl_direct: Complex64,
        pl_br: Complex64,
        pl_ru: Complex64,
        rng: &mut R,
    ) -> Realization {
        let h_d = self.direct_coefficient(rng) * pl_direct;

        let k_db = self.k_mixture.sample(rng);
        let n = self.params.ris_elements;
        let g_br = fading::rician(k_db, n, rng)
            .into_iter()
            .map(|h| h * pl_br)
            .collect();
        let g_ru = fading::rician(k_db, n, rng)
            .into_iter()
            .map(|h| h * pl_ru)
            .collect();

        Realization { h_d, g_br, g_ru }
    }

    /// Small-scale part of the direct path: zero when blocked, otherwise a
    /// Rician draw, optionally attenuated.
    fn direct_coefficient<R: Rng + ?Sized>(&self, rng: &mut R) -> Complex64 {
        if self.blockage.sample(rng) {
            return Complex64::new(0.0, 0.0);
        }

        let k_db = self.k_mixture.sample(rng);
        let h = fading::rician_one(k_db, rng);

        if self.attenuation.sample(rng) {
            let loss_db = self.attenuation_db.sample(rng);
            h * 10.0_f64.powf(-loss_db / 10.0)
        } else {
            h
        }
    }
}

/// Build a single channel batch from explicit parameters.
#[allow(clippy::too_many_arguments)]
pub fn build_channel<R: Rng + ?Sized>(
    ref_path_loss: f64,
    tx: &Position,
    rx: &Position,
    ris_position: &Position,
    ris_elements: usize,
    realizations: usize,
    p_block: f64,
    p_attenuate: f64,
    attenuate_db_range: Interval,
    rng: &mut R,
) -> RisResult<ChannelBatch> {
    let model = ChannelModel::new(ChannelParams {
        ref_path_loss,
        ris_position: *ris_position,
        ris_elements,
        realizations,
        p_block,
        p_attenuate,
        attenuate_db_range,
    })?;
    Ok(model.build(tx, rx, rng))
}
