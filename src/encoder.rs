//! Integer coding of optimizer results into dataset sentences
//!
//! Gains are z-scored over all realizations and scaled by 100; phases are
//! mapped from [0, 2π] onto [0, 100]. Both use round-half-to-even. Only the
//! first [`GAIN_PREFIX_LEN`] gain codes are kept in a record.

use std::f64::consts::TAU;
use std::fmt;

/// Number of leading realizations whose gain codes are kept
pub const GAIN_PREFIX_LEN: usize = 4;

/// Scale applied to z-scores and phase fractions before rounding
pub const CODE_SCALE: f64 = 100.0;

/// One encoded dataset example. Never mutated after [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    gain_codes: Vec<i64>,
    phase_codes: Vec<i64>,
}

impl SampleRecord {
    pub fn gain_codes(&self) -> &[i64] {
        &self.gain_codes
    }

    pub fn phase_codes(&self) -> &[i64] {
        &self.phase_codes
    }

    /// Dataset line including the trailing newline
    pub fn render(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for SampleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "If channel gains are {}, then RIS phase shifts are {}.",
            join_codes(&self.gain_codes),
            join_codes(&self.phase_codes)
        )
    }
}

/// Encode an optimized phase vector and its gain vector.
pub fn encode(theta: &[f64], gain: &[f64]) -> SampleRecord {
    let mut gain_codes = gain_codes(gain);
    gain_codes.truncate(GAIN_PREFIX_LEN);

    SampleRecord {
        gain_codes,
        phase_codes: phase_codes(theta),
    }
}

/// `round(z · 100)` for every gain (population std); all zeros when the
/// standard deviation is zero.
pub fn gain_codes(gain: &[f64]) -> Vec<i64> {
    let Some(&first) = gain.first() else {
        return Vec::new();
    };
    // Identical entries have exactly zero spread even when the summed mean
    // picks up rounding error
    if gain.iter().all(|&g| g == first) {
        return vec![0; gain.len()];
    }

    let n = gain.len() as f64;
    let mean = gain.iter().sum::<f64>() / n;
    let std = (gain.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n).sqrt();
    if !(std.is_finite() && std > 0.0) {
        return vec![0; gain.len()];
    }

    gain.iter()
        .map(|g| to_code((g - mean) / std * CODE_SCALE))
        .collect()
}

/// `round(θ / 2π · 100)` for every phase
pub fn phase_codes(theta: &[f64]) -> Vec<i64> {
    theta.iter().map(|t| to_code(t / TAU * CODE_SCALE)).collect()
}

#[inline]
fn to_code(v: f64) -> i64 {
    v.round_ties_even() as i64
}

fn join_codes(codes: &[i64]) -> String {
    codes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_gain_vector_encodes_to_zeros() {
        let record = encode(&[0.0; 8], &[0.0; 100]);
        assert_eq!(record.gain_codes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_constant_gain_vector_encodes_to_zeros() {
        assert_eq!(gain_codes(&[3e-12; 10]), vec![0; 10]);
    }

    #[test]
    fn test_tiny_spread_is_still_normalized() {
        let e = f64::EPSILON;
        let codes = gain_codes(&[1.0, 1.0 + 2.0 * e, 1.0, 1.0]);
        assert_ne!(codes, vec![0; 4]);
        assert!(codes[1] > 0 && codes[1] > codes[0], "{:?}", codes);
        assert!(codes[0] == codes[2] && codes[2] == codes[3], "{:?}", codes);
    }

    #[test]
    fn test_gain_z_scores() {
        // mean 2.5, population std √1.25
        let codes = gain_codes(&[1.0, 2.0, 3.0, 4.0]);
        let s = 1.25_f64.sqrt();
        let expected: Vec<i64> = [-1.5, -0.5, 0.5, 1.5]
            .iter()
            .map(|d| (d / s * 100.0_f64).round() as i64)
            .collect();
        assert_eq!(codes, expected);
        assert_eq!(codes, vec![-134, -45, 45, 134]);
    }

    #[test]
    fn test_gain_codes_are_scale_invariant() {
        let small: Vec<f64> = [1.0, 5.0, 2.0, 9.0, 3.0].iter().map(|g| g * 1e-13).collect();
        let large = [1.0, 5.0, 2.0, 9.0, 3.0];
        assert_eq!(gain_codes(&small), gain_codes(&large));
    }

    #[test]
    fn test_prefix_truncation() {
        let gains: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let record = encode(&[1.0; 3], &gains);
        assert_eq!(record.gain_codes().len(), GAIN_PREFIX_LEN);
        assert_eq!(record.gain_codes(), &gain_codes(&gains)[..4]);
    }

    #[test]
    fn test_short_gain_vector() {
        let record = encode(&[0.0], &[1.0, 3.0]);
        assert_eq!(record.gain_codes(), &[-100, 100]);
    }

    #[test]
    fn test_phase_code_boundaries() {
        let delta = 1e-6;
        assert_eq!(phase_codes(&[0.0]), vec![0]);
        let near_top = phase_codes(&[TAU - delta])[0];
        assert!(near_top == 99 || near_top == 100, "got {}", near_top);
        assert_eq!(phase_codes(&[TAU]), vec![100]);
        assert_eq!(phase_codes(&[std::f64::consts::PI]), vec![50]);
    }

    #[test]
    fn test_phase_codes_in_range() {
        let theta: Vec<f64> = (0..1000).map(|i| i as f64 / 1000.0 * TAU).collect();
        for code in phase_codes(&theta) {
            assert!((0..=100).contains(&code), "code {} out of range", code);
        }
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(to_code(0.5), 0);
        assert_eq!(to_code(1.5), 2);
        assert_eq!(to_code(2.5), 2);
        assert_eq!(to_code(-0.5), 0);
        assert_eq!(to_code(-1.5), -2);
    }

    #[test]
    fn test_render() {
        let record = SampleRecord {
            gain_codes: vec![-134, -45, 45, 134],
            phase_codes: vec![0, 25, 50, 100],
        };
        assert_eq!(
            record.render(),
            "If channel gains are -134, -45, 45, 134, then RIS phase shifts are 0, 25, 50, 100.\n"
        );
        assert!(!record.to_string().ends_with('\n'));
    }
}
