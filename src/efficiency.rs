//! Spectral and energy efficiency of a gain vector
//!
//!   SE = mean_r log2( max(1 + P·g_r / (N0·W), ε) )     [bit/s/Hz]
//!   EE = SE / (P + Pc)                                [bit/s/Hz/W]

use std::f64::consts::LN_2;

/// Floor applied to the log argument
pub const LOG_ARGUMENT_FLOOR: f64 = 1e-10;

/// Link budget shared by both metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkBudget {
    /// Transmit power P (W)
    pub transmit_power_w: f64,
    /// Noise power spectral density N0 (W/Hz)
    pub noise_psd_w_per_hz: f64,
    /// Bandwidth W (Hz)
    pub bandwidth_hz: f64,
    /// Circuit power Pc (W)
    pub circuit_power_w: f64,
}

impl LinkBudget {
    /// P / (N0·W): SNR per unit channel gain
    pub fn snr_scale(&self) -> f64 {
        self.transmit_power_w / (self.noise_psd_w_per_hz * self.bandwidth_hz)
    }

    pub fn total_power_w(&self) -> f64 {
        self.transmit_power_w + self.circuit_power_w
    }
}

/// Which efficiency the optimizer maximizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Objective {
    SpectralEfficiency,
    EnergyEfficiency,
}

impl Objective {
    pub const ALL: [Objective; 2] = [Objective::SpectralEfficiency, Objective::EnergyEfficiency];

    pub fn label(&self) -> &'static str {
        match self {
            Objective::SpectralEfficiency => "se",
            Objective::EnergyEfficiency => "ee",
        }
    }

    /// Metric value for `gains` under `budget`
    pub fn evaluate(&self, budget: &LinkBudget, gains: &[f64]) -> f64 {
        let se = spectral_efficiency(
            budget.transmit_power_w,
            gains,
            budget.noise_psd_w_per_hz,
            budget.bandwidth_hz,
        );
        match self {
            Objective::SpectralEfficiency => se,
            Objective::EnergyEfficiency => se / budget.total_power_w(),
        }
    }

    /// ∂metric/∂g_r for every realization
    pub fn gain_sensitivity(&self, budget: &LinkBudget, gains: &[f64]) -> Vec<f64> {
        let mut d = spectral_efficiency_sensitivity(budget.snr_scale(), gains);
        if *self == Objective::EnergyEfficiency {
            let total = budget.total_power_w();
            d.iter_mut().for_each(|x| *x /= total);
        }
        d
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::SpectralEfficiency => write!(f, "SE"),
            Objective::EnergyEfficiency => write!(f, "EE"),
        }
    }
}

/// Realization-averaged Shannon rate. Returns 0 for an empty gain vector.
pub fn spectral_efficiency(p: f64, gains: &[f64], n0: f64, w: f64) -> f64 {
    if gains.is_empty() {
        return 0.0;
    }
    let scale = p / (n0 * w);
    let total: f64 = gains
        .iter()
        .map(|&g| (1.0 + scale * g).max(LOG_ARGUMENT_FLOOR).log2())
        .sum();
    total / gains.len() as f64
}

/// Spectral efficiency per watt of total consumed power
pub fn energy_efficiency(p: f64, gains: &[f64], n0: f64, w: f64, pc: f64) -> f64 {
    spectral_efficiency(p, gains, n0, w) / (p + pc)
}

/// ∂SE/∂g_r. Zero where the log argument sits on the floor.
fn spectral_efficiency_sensitivity(scale: f64, gains: &[f64]) -> Vec<f64> {
    let r = gains.len() as f64;
    gains
        .iter()
        .map(|&g| {
            let arg = 1.0 + scale * g;
            if arg > LOG_ARGUMENT_FLOOR {
                scale / (arg * LN_2 * r)
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const N0: f64 = 1e-20;
    const W: f64 = 1e6;

    fn budget(p: f64, pc: f64) -> LinkBudget {
        LinkBudget {
            transmit_power_w: p,
            noise_psd_w_per_hz: N0,
            bandwidth_hz: W,
            circuit_power_w: pc,
        }
    }

    #[test]
    fn test_known_value() {
        // SNR = 1 * 3e-14 / 1e-14 = 3 → log2(4) = 2
        assert_relative_eq!(spectral_efficiency(1.0, &[3e-14], N0, W), 2.0, epsilon = 1e-12);
        // Mean of log2(2) and log2(8)
        assert_relative_eq!(spectral_efficiency(1.0, &[1e-14, 7e-14], N0, W), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_gain_gives_zero() {
        assert_eq!(spectral_efficiency(1.0, &[0.0; 10], N0, W), 0.0);
        assert_eq!(energy_efficiency(1.0, &[0.0; 10], N0, W, 0.1), 0.0);
    }

    #[test]
    fn test_empty_gain_vector() {
        assert_eq!(spectral_efficiency(1.0, &[], N0, W), 0.0);
    }

    #[test]
    fn test_log_argument_floor() {
        // Negative gain from numerical noise must not produce NaN
        let se = spectral_efficiency(1.0, &[-2e-14], N0, W);
        assert!(se.is_finite());
        assert_relative_eq!(se, LOG_ARGUMENT_FLOOR.log2(), epsilon = 1e-9);
    }

    #[test]
    fn test_se_non_negative_and_monotone_in_power() {
        let gains = [1e-15, 4e-14, 0.0, 2e-13, 7e-16];
        let mut prev = 0.0;
        for p in [0.0, 0.01, 0.1, 0.5, 1.0, 2.0, 10.0] {
            let se = spectral_efficiency(p, &gains, N0, W);
            assert!(se >= 0.0);
            assert!(se >= prev, "SE decreased: P={} gives {} < {}", p, se, prev);
            prev = se;
        }
    }

    #[test]
    fn test_ee_strictly_decreasing_in_circuit_power() {
        let gains = [1e-14, 3e-14, 5e-13];
        let mut prev = f64::INFINITY;
        for pc in [0.0, 0.05, 0.1, 1.0, 5.0] {
            let ee = energy_efficiency(1.0, &gains, N0, W, pc);
            assert!(ee < prev, "EE not decreasing: Pc={} gives {} >= {}", pc, ee, prev);
            prev = ee;
        }
    }

    #[test]
    fn test_objective_dispatch() {
        let gains = [3e-14, 7e-14];
        let b = budget(1.0, 0.25);
        let se = spectral_efficiency(1.0, &gains, N0, W);
        assert_relative_eq!(Objective::SpectralEfficiency.evaluate(&b, &gains), se);
        assert_relative_eq!(Objective::EnergyEfficiency.evaluate(&b, &gains), se / 1.25);
    }

    #[test]
    fn test_sensitivity_matches_finite_difference() {
        let gains = vec![1e-14, 5e-14, 2e-13];
        let b = budget(1.0, 0.5);
        for objective in Objective::ALL {
            let d = objective.gain_sensitivity(&b, &gains);
            for r in 0..gains.len() {
                let h = gains[r] * 1e-6;
                let mut plus = gains.clone();
                let mut minus = gains.clone();
                plus[r] += h;
                minus[r] -= h;
                let numeric = (objective.evaluate(&b, &plus) - objective.evaluate(&b, &minus)) / (2.0 * h);
                assert_relative_eq!(d[r], numeric, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(Objective::SpectralEfficiency.label(), "se");
        assert_eq!(Objective::EnergyEfficiency.to_string(), "EE");
    }
}
