//! One scenario end to end
//!
//! endpoints → channel batch → optimize SE → optimize EE → encode both.
//! Both objectives are optimized on the same batch, each from its own random
//! seed point. All randomness comes from the RNG handed in by the caller.

use rand::Rng;
use tracing::trace;

use crate::channel::ChannelModel;
use crate::config::SimulationConfig;
use crate::efficiency::Objective;
use crate::encoder::{encode, SampleRecord};
use crate::error::RisResult;
use crate::geometry::{Position, Region};
use crate::optimizer::{ConvergenceStatus, OptimizationResult, PhaseOptimizer};

/// Result of optimizing one objective on a scenario
#[derive(Debug, Clone)]
pub struct ObjectiveOutcome {
    pub objective: Objective,
    pub record: SampleRecord,
    /// SE (bit/s/Hz) or EE (bit/s/Hz/W) at the returned phases
    pub value: f64,
    pub status: ConvergenceStatus,
    pub iterations: usize,
}

impl ObjectiveOutcome {
    fn from_result(objective: Objective, result: &OptimizationResult) -> Self {
        Self {
            objective,
            record: encode(&result.theta, &result.gain),
            value: result.objective_value,
            status: result.status,
            iterations: result.iterations,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub tx: Position,
    pub rx: Position,
    /// Realizations with a fully blocked direct path
    pub blocked: usize,
    pub se: ObjectiveOutcome,
    pub ee: ObjectiveOutcome,
}

impl ScenarioOutcome {
    pub fn outcome(&self, objective: Objective) -> &ObjectiveOutcome {
        match objective {
            Objective::SpectralEfficiency => &self.se,
            Objective::EnergyEfficiency => &self.ee,
        }
    }
}

/// Channel model and optimizer prepared once for a run
#[derive(Debug, Clone)]
pub struct ScenarioPipeline {
    region: Region,
    channel: ChannelModel,
    optimizer: PhaseOptimizer,
}

impl ScenarioPipeline {
    pub fn new(config: &SimulationConfig) -> RisResult<Self> {
        config.validate()?;
        let channel = ChannelModel::with_k_mixture(config.channel_params(), config.k_mixture()?)?;
        Ok(Self {
            region: config.region,
            channel,
            optimizer: PhaseOptimizer::new(config.link_budget(), config.optimizer),
        })
    }

    /// Draw endpoints from the region and run the scenario.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> ScenarioOutcome {
        let tx = self.region.sample(rng);
        let rx = self.region.sample(rng);
        self.run_at(tx, rx, rng)
    }

    /// Run the scenario for fixed endpoints.
    pub fn run_at<R: Rng + ?Sized>(&self, tx: Position, rx: Position, rng: &mut R) -> ScenarioOutcome {
        let batch = self.channel.build(&tx, &rx, rng);

        let se = self.optimizer.optimize(&batch, Objective::SpectralEfficiency, rng);
        let ee = self.optimizer.optimize(&batch, Objective::EnergyEfficiency, rng);

        trace!(
            ?tx,
            ?rx,
            blocked = batch.blocked_count(),
            se = se.objective_value,
            ee = ee.objective_value,
            "scenario done"
        );

        ScenarioOutcome {
            tx,
            rx,
            blocked: batch.blocked_count(),
            se: ObjectiveOutcome::from_result(Objective::SpectralEfficiency, &se),
            ee: ObjectiveOutcome::from_result(Objective::EnergyEfficiency, &ee),
        }
    }
}
