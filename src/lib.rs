//! RIS-aided link simulation and dataset generation
//!
//! Builds Rician-faded direct and reflected channels between a transmitter,
//! a reconfigurable intelligent surface and a receiver, optimizes the
//! surface phases for spectral or energy efficiency and encodes the result
//! as text training samples.
//!
//! The numeric core (`fading`, `channel`, `gain`, `efficiency`, `optimizer`,
//! `encoder`) never fails and takes its randomness from a caller-supplied
//! RNG. `scenario` and `dataset` drive it; `nif` exposes it to the BEAM.

pub mod channel;
pub mod config;
pub mod dataset;
pub mod efficiency;
pub mod encoder;
pub mod error;
pub mod fading;
pub mod gain;
pub mod geometry;
pub mod logging;
pub mod optimizer;
pub mod scenario;
pub mod slab;

#[cfg(feature = "nif")]
mod nif;

pub use channel::{build_channel, ChannelBatch, ChannelModel, ChannelParams};
pub use config::SimulationConfig;
pub use dataset::{DatasetGenerator, DatasetWriter, GeneratorSession, RunSummary};
pub use efficiency::{energy_efficiency, spectral_efficiency, LinkBudget, Objective};
pub use encoder::{encode, SampleRecord};
pub use error::{RisError, RisResult};
pub use gain::{gain, try_gain};
pub use geometry::{Position, Region};
pub use optimizer::{optimize, ConvergenceStatus, OptimizationResult, OptimizerSettings, PhaseOptimizer};
pub use scenario::{ScenarioOutcome, ScenarioPipeline};
