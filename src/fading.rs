//! Rician small-scale fading
//!
//! Each coefficient is a fixed line-of-sight term plus a circularly
//! symmetric complex Gaussian scatter term:
//!
//!   h = √(K/(K+1)) + √(1/(K+1)) · (x + j·y)/√2,   x, y ~ N(0, 1)
//!
//! so that E[|h|²] = 1 for every K. K = 0 gives Rayleigh fading, K → ∞
//! collapses to the deterministic LOS value.
//!
//! The channel model does not use a single K: every realization draws its
//! K-factor from a small discrete mixture ([`KFactorMixture`]).

use num_complex::Complex64;
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::FRAC_1_SQRT_2;

use crate::error::{RisError, RisResult};

/// K-factors (dB) a realization can be drawn with
pub const DEFAULT_K_FACTORS_DB: [f64; 4] = [0.0, 3.0, 7.0, 10.0];

/// Selection probabilities matching [`DEFAULT_K_FACTORS_DB`]
pub const DEFAULT_K_FACTOR_WEIGHTS: [f64; 4] = [0.4, 0.3, 0.2, 0.1];

/// Convert a power ratio in dB to linear scale
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}

/// Draw `count` i.i.d. Rician coefficients with K-factor `k_db` (dB).
pub fn rician<R: Rng + ?Sized>(k_db: f64, count: usize, rng: &mut R) -> Vec<Complex64> {
    let (los, nlos) = components(k_db);
    (0..count).map(|_| draw(los, nlos, rng)).collect()
}

/// Draw a single Rician coefficient
#[inline]
pub fn rician_one<R: Rng + ?Sized>(k_db: f64, rng: &mut R) -> Complex64 {
    let (los, nlos) = components(k_db);
    draw(los, nlos, rng)
}

/// LOS amplitude and scatter scale for a K-factor in dB
fn components(k_db: f64) -> (f64, f64) {
    let k = db_to_linear(k_db);
    ((k / (k + 1.0)).sqrt(), (1.0 / (k + 1.0)).sqrt())
}

#[inline]
fn draw<R: Rng + ?Sized>(los: f64, nlos: f64, rng: &mut R) -> Complex64 {
    let re: f64 = StandardNormal.sample(rng);
    let im: f64 = StandardNormal.sample(rng);
    let scatter = Complex64::new(re, im) * FRAC_1_SQRT_2;
    Complex64::new(los, 0.0) + scatter * nlos
}

/// Discrete distribution over K-factors in dB
#[derive(Debug, Clone)]
pub struct KFactorMixture {
    values_db: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl KFactorMixture {
    pub fn new(values_db: &[f64], weights: &[f64]) -> RisResult<Self> {
        if values_db.is_empty() || values_db.len() != weights.len() {
            return Err(RisError::InvalidConfig(format!(
                "K-factor mixture needs matching non-empty value/weight lists, got {} values and {} weights",
                values_db.len(),
                weights.len()
            )));
        }
        let index = WeightedIndex::new(weights).map_err(|e| {
            RisError::InvalidConfig(format!("invalid K-factor weights {:?}: {}", weights, e))
        })?;

        Ok(Self {
            values_db: values_db.to_vec(),
            index,
        })
    }

    /// K-factor values in dB
    pub fn values_db(&self) -> &[f64] {
        &self.values_db
    }

    /// Draw one K-factor (dB)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.values_db[self.index.sample(rng)]
    }
}

impl Default for KFactorMixture {
    fn default() -> Self {
        Self {
            values_db: DEFAULT_K_FACTORS_DB.to_vec(),
            // Constant weights are positive and finite.
            index: WeightedIndex::new(DEFAULT_K_FACTOR_WEIGHTS)
                .unwrap_or_else(|_| unreachable!("default K-factor weights are valid")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rayleigh_cdf(r: f64, sigma_sq: f64) -> f64 {
        1.0 - (-r * r / (2.0 * sigma_sq)).exp()
    }

    fn mean_power(samples: &[Complex64]) -> f64 {
        samples.iter().map(|h| h.norm_sqr()).sum::<f64>() / samples.len() as f64
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_linear(10.0) - 10.0).abs() < 1e-12);
        assert!((db_to_linear(-10.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_empty_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(rician(7.0, 0, &mut rng).is_empty());
    }

    #[test]
    fn test_unit_mean_power_for_all_k() {
        for &k_db in &[0.0, 3.0, 7.0, 10.0, 20.0] {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let samples = rician(k_db, 100_000, &mut rng);
            let power = mean_power(&samples);
            assert!((power - 1.0).abs() < 0.02,
                "K={} dB: mean power {} should be ~1", k_db, power);
        }
    }

    #[test]
    fn test_rayleigh_magnitude_at_k_zero_linear() {
        // K = -inf dB is linear K = 0: pure scatter, sigma² = 1/2 per axis
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let samples = rician(f64::NEG_INFINITY, 50_000, &mut rng);

        let mags: Vec<f64> = samples.iter().map(|h| h.norm()).collect();
        let mean_mag = mags.iter().sum::<f64>() / mags.len() as f64;
        let expected_mean = (std::f64::consts::PI / 4.0).sqrt();
        assert!((mean_mag - expected_mean).abs() < 0.01,
            "Rayleigh mean magnitude {} should be ~{}", mean_mag, expected_mean);

        // Compare empirical CDF at a few radii
        for &r in &[0.25, 0.5, 1.0, 1.5] {
            let empirical = mags.iter().filter(|&&m| m < r).count() as f64 / mags.len() as f64;
            let theoretical = rayleigh_cdf(r, 0.5);
            assert!((empirical - theoretical).abs() < 0.01,
                "CDF at r={}: empirical {} vs Rayleigh {}", r, empirical, theoretical);
        }
    }

    #[test]
    fn test_k_zero_db_is_not_rayleigh() {
        // 0 dB means K = 1, so half the power is LOS
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let samples = rician(0.0, 50_000, &mut rng);
        let mean_re = samples.iter().map(|h| h.re).sum::<f64>() / samples.len() as f64;
        assert!((mean_re - 0.5_f64.sqrt()).abs() < 0.01,
            "Mean real part {} should equal LOS amplitude", mean_re);
    }

    #[test]
    fn test_large_k_collapses_to_los() {
        let spread = |k_db: f64| {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let mags: Vec<f64> = rician(k_db, 20_000, &mut rng).iter().map(|h| h.norm()).collect();
            let mean = mags.iter().sum::<f64>() / mags.len() as f64;
            mags.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / mags.len() as f64
        };

        let v0 = spread(0.0);
        let v10 = spread(10.0);
        let v40 = spread(40.0);
        assert!(v10 < v0, "Variance should shrink with K: {} !< {}", v10, v0);
        assert!(v40 < v10, "Variance should shrink with K: {} !< {}", v40, v10);
        assert!(v40 < 1e-3, "K=40 dB variance {} should be near zero", v40);
    }

    #[test]
    fn test_single_draw_matches_distribution() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let samples: Vec<Complex64> = (0..50_000).map(|_| rician_one(3.0, &mut rng)).collect();
        assert!((mean_power(&samples) - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(99);
        let mut rng2 = ChaCha8Rng::seed_from_u64(99);
        assert_eq!(rician(7.0, 64, &mut rng1), rician(7.0, 64, &mut rng2));
    }

    #[test]
    fn test_mixture_frequencies() {
        let mixture = KFactorMixture::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 100_000;
        let mut counts = [0usize; 4];
        for _ in 0..n {
            let k = mixture.sample(&mut rng);
            let idx = DEFAULT_K_FACTORS_DB.iter().position(|&v| v == k).unwrap();
            counts[idx] += 1;
        }
        for (i, &expected) in DEFAULT_K_FACTOR_WEIGHTS.iter().enumerate() {
            let observed = counts[i] as f64 / n as f64;
            assert!((observed - expected).abs() < 0.01,
                "K={} dB drawn {:.3} of the time, expected {}", DEFAULT_K_FACTORS_DB[i], observed, expected);
        }
    }

    #[test]
    fn test_mixture_rejects_bad_weights() {
        assert!(KFactorMixture::new(&[0.0, 3.0], &[1.0]).is_err());
        assert!(KFactorMixture::new(&[], &[]).is_err());
        assert!(KFactorMixture::new(&[0.0], &[0.0]).is_err());
        assert!(KFactorMixture::new(&[0.0, 3.0], &[-1.0, 2.0]).is_err());
    }
}
