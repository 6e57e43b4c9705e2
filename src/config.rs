//! Run configuration
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! samples = 5000
//! seed = 7
//! ris_elements = 64
//! ris_position = { x = 250.0, y = 250.0, z = 20.0 }
//!
//! [optimizer]
//! restarts = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::channel::ChannelParams;
use crate::efficiency::LinkBudget;
use crate::error::{RisError, RisResult};
use crate::fading::{KFactorMixture, DEFAULT_K_FACTORS_DB, DEFAULT_K_FACTOR_WEIGHTS};
use crate::geometry::{Interval, Position, Region};
use crate::optimizer::OptimizerSettings;

/// Thermal noise floor, -174 dBm/Hz, in W/Hz
pub const DEFAULT_NOISE_PSD_W_PER_HZ: f64 = 3.981071705534972e-21;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Noise power spectral density N0 (W/Hz)
    pub noise_psd_w_per_hz: f64,
    /// Bandwidth W (Hz)
    pub bandwidth_hz: f64,
    /// Circuit power Pc (W)
    pub circuit_power_w: f64,
    /// Transmit power P (W)
    pub max_transmit_power_w: f64,
    pub ris_elements: usize,
    pub ris_position: Position,
    /// Path loss at 1 m; the sign is kept as given
    pub ref_path_loss: f64,
    /// Channel realizations per scenario (R)
    pub realizations: usize,
    pub p_block: f64,
    pub p_attenuate: f64,
    pub attenuate_db_range: Interval,
    pub k_factors_db: Vec<f64>,
    pub k_factor_weights: Vec<f64>,
    /// Bounds for transmitter and receiver placement
    pub region: Region,
    pub samples: usize,
    pub seed: u64,
    pub optimizer: OptimizerSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            noise_psd_w_per_hz: DEFAULT_NOISE_PSD_W_PER_HZ,
            bandwidth_hz: 1e6,
            circuit_power_w: 0.1,
            max_transmit_power_w: 1.0,
            ris_elements: 32,
            ris_position: Position::new(500.0, 500.0, 25.0),
            ref_path_loss: -0.001,
            realizations: 100,
            p_block: 0.3,
            p_attenuate: 0.3,
            attenuate_db_range: Interval::new(10.0, 30.0),
            k_factors_db: DEFAULT_K_FACTORS_DB.to_vec(),
            k_factor_weights: DEFAULT_K_FACTOR_WEIGHTS.to_vec(),
            region: Region::default(),
            samples: 1000,
            seed: 42,
            optimizer: OptimizerSettings::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> RisResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> RisResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations the pipeline cannot run.
    ///
    /// A negative `ref_path_loss` passes (it yields imaginary path-loss
    /// scalars) but is logged, see [`Self::ref_path_loss_is_physical`].
    pub fn validate(&self) -> RisResult<()> {
        let invalid = |msg: String| Err(RisError::InvalidConfig(msg));

        if self.ris_elements == 0 {
            return invalid("ris_elements must be at least 1".into());
        }
        if self.realizations == 0 {
            return invalid("realizations must be at least 1".into());
        }
        for (name, p) in [("p_block", self.p_block), ("p_attenuate", self.p_attenuate)] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{} = {} is not a probability", name, p));
            }
        }
        if !self.attenuate_db_range.is_valid() {
            return invalid(format!("attenuate_db_range {:?} is inverted or not finite", self.attenuate_db_range));
        }
        if !self.region.is_valid() {
            return invalid(format!("region {:?} has an inverted or non-finite axis", self.region));
        }
        if !(self.noise_psd_w_per_hz > 0.0 && self.noise_psd_w_per_hz.is_finite()) {
            return invalid(format!("noise_psd_w_per_hz = {} must be positive", self.noise_psd_w_per_hz));
        }
        if !(self.bandwidth_hz > 0.0 && self.bandwidth_hz.is_finite()) {
            return invalid(format!("bandwidth_hz = {} must be positive", self.bandwidth_hz));
        }
        if !(self.max_transmit_power_w >= 0.0) || !(self.circuit_power_w >= 0.0) {
            return invalid("transmit and circuit power must be non-negative".into());
        }
        if self.max_transmit_power_w + self.circuit_power_w <= 0.0 {
            return invalid("total power must be positive for energy efficiency".into());
        }
        if !self.ref_path_loss.is_finite() {
            return invalid(format!("ref_path_loss = {} must be finite", self.ref_path_loss));
        }
        self.k_mixture()?;

        if !self.ref_path_loss_is_physical() {
            warn!(
                ref_path_loss = self.ref_path_loss,
                "negative reference path loss gives imaginary path-loss scalars"
            );
        }
        Ok(())
    }

    /// True when `ref_path_loss` is a non-negative real attenuation
    pub fn ref_path_loss_is_physical(&self) -> bool {
        self.ref_path_loss >= 0.0
    }

    pub fn channel_params(&self) -> ChannelParams {
        ChannelParams {
            ref_path_loss: self.ref_path_loss,
            ris_position: self.ris_position,
            ris_elements: self.ris_elements,
            realizations: self.realizations,
            p_block: self.p_block,
            p_attenuate: self.p_attenuate,
            attenuate_db_range: self.attenuate_db_range,
        }
    }

    pub fn link_budget(&self) -> LinkBudget {
        LinkBudget {
            transmit_power_w: self.max_transmit_power_w,
            noise_psd_w_per_hz: self.noise_psd_w_per_hz,
            bandwidth_hz: self.bandwidth_hz,
            circuit_power_w: self.circuit_power_w,
        }
    }

    pub fn k_mixture(&self) -> RisResult<KFactorMixture> {
        KFactorMixture::new(&self.k_factors_db, &self.k_factor_weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = SimulationConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.ris_elements, 32);
        assert_eq!(cfg.realizations, 100);
    }

    #[test]
    fn test_default_path_loss_sign_is_flagged() {
        // Default keeps the negative reference; the check must report it
        assert!(!SimulationConfig::default().ref_path_loss_is_physical());
        let cfg = SimulationConfig { ref_path_loss: 1e-3, ..Default::default() };
        assert!(cfg.ref_path_loss_is_physical());
    }

    #[test]
    fn test_noise_floor_constant() {
        let expected = 10.0_f64.powf(-174.0 / 10.0) * 1e-3;
        assert!((DEFAULT_NOISE_PSD_W_PER_HZ / expected - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_toml() {
        let cfg = SimulationConfig::from_toml_str(
            r#"
            samples = 5
            seed = 7
            ris_elements = 8
            ris_position = { x = 1.0, y = 2.0, z = 3.0 }

            [optimizer]
            restarts = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.samples, 5);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.ris_elements, 8);
        assert_eq!(cfg.ris_position, Position::new(1.0, 2.0, 3.0));
        assert_eq!(cfg.optimizer.restarts, 2);
        assert_eq!(cfg.optimizer.max_iterations, OptimizerSettings::default().max_iterations);
        assert_eq!(cfg.realizations, 100);
    }

    #[test]
    fn test_bundled_example_matches_defaults() {
        let cfg = SimulationConfig::from_toml_str(include_str!("../config/ris.toml")).unwrap();
        assert_eq!(cfg, SimulationConfig::default());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = toml::to_string(&SimulationConfig::default()).unwrap();
        let parsed = SimulationConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, SimulationConfig::default());
    }

    #[test]
    fn test_invalid_configs() {
        let bad = [
            SimulationConfig { ris_elements: 0, ..Default::default() },
            SimulationConfig { realizations: 0, ..Default::default() },
            SimulationConfig { p_block: 1.2, ..Default::default() },
            SimulationConfig { p_attenuate: f64::NAN, ..Default::default() },
            SimulationConfig { attenuate_db_range: Interval::new(5.0, 1.0), ..Default::default() },
            SimulationConfig { bandwidth_hz: 0.0, ..Default::default() },
            SimulationConfig { noise_psd_w_per_hz: -1.0, ..Default::default() },
            SimulationConfig { max_transmit_power_w: -1.0, ..Default::default() },
            SimulationConfig { k_factor_weights: vec![1.0], ..Default::default() },
        ];
        for cfg in &bad {
            assert!(matches!(cfg.validate(), Err(RisError::InvalidConfig(_))), "{:?} accepted", cfg);
        }
    }

    #[test]
    fn test_bad_toml_reports_parse_error() {
        let err = SimulationConfig::from_toml_str("samples = \"many\"").unwrap_err();
        assert!(matches!(err, RisError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SimulationConfig::from_toml_file("/nonexistent/ris.toml").unwrap_err();
        assert!(matches!(err, RisError::Io(_)));
    }
}
