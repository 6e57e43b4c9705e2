//! Dataset generation: many independent scenarios, two text files
//!
//! Scenario `i` draws from `ChaCha8Rng::seed_from_u64(seed)` on stream `i`,
//! so every scenario has its own independent stream and the output does not
//! depend on thread count or scheduling. Scenarios are fanned out with rayon
//! in chunks and written in index order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::efficiency::Objective;
use crate::error::RisResult;
use crate::scenario::{ScenarioOutcome, ScenarioPipeline};

/// File name of the spectral-efficiency dataset
pub const SE_DATASET_FILE: &str = "se_dataset.txt";

/// File name of the energy-efficiency dataset
pub const EE_DATASET_FILE: &str = "ee_dataset.txt";

/// Scenarios generated in parallel before a write
const CHUNK_SIZE: usize = 1024;

/// Aggregate statistics for a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub samples: usize,
    pub non_converged_se: usize,
    pub non_converged_ee: usize,
    pub mean_se: f64,
    pub mean_ee: f64,
    /// Fraction of direct-path realizations that were blocked
    pub blocked_fraction: f64,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[ScenarioOutcome], realizations: usize) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.add(outcome, realizations);
        }
        summary.finalize();
        summary
    }

    pub fn non_converged(&self, objective: Objective) -> usize {
        match objective {
            Objective::SpectralEfficiency => self.non_converged_se,
            Objective::EnergyEfficiency => self.non_converged_ee,
        }
    }

    // Accumulates sums in the mean fields until `finalize`
    fn add(&mut self, outcome: &ScenarioOutcome, realizations: usize) {
        self.samples += 1;
        if !outcome.se.status.is_converged() {
            self.non_converged_se += 1;
        }
        if !outcome.ee.status.is_converged() {
            self.non_converged_ee += 1;
        }
        self.mean_se += outcome.se.value;
        self.mean_ee += outcome.ee.value;
        if realizations > 0 {
            self.blocked_fraction += outcome.blocked as f64 / realizations as f64;
        }
    }

    fn finalize(&mut self) {
        if self.samples > 0 {
            let n = self.samples as f64;
            self.mean_se /= n;
            self.mean_ee /= n;
            self.blocked_fraction /= n;
        }
    }
}

/// Writes one rendered line per scenario to the SE and EE sinks
pub struct DatasetWriter<W: Write> {
    se: W,
    ee: W,
    lines: usize,
}

impl DatasetWriter<BufWriter<File>> {
    /// Create `se_dataset.txt` and `ee_dataset.txt` in `dir`, truncating
    /// existing files.
    pub fn create(dir: impl AsRef<Path>) -> RisResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let se = BufWriter::new(File::create(dir.join(SE_DATASET_FILE))?);
        let ee = BufWriter::new(File::create(dir.join(EE_DATASET_FILE))?);
        Ok(Self::from_writers(se, ee))
    }
}

impl<W: Write> DatasetWriter<W> {
    pub fn from_writers(se: W, ee: W) -> Self {
        Self { se, ee, lines: 0 }
    }

    pub fn write(&mut self, outcome: &ScenarioOutcome) -> RisResult<()> {
        self.se.write_all(outcome.se.record.render().as_bytes())?;
        self.ee.write_all(outcome.ee.record.render().as_bytes())?;
        self.lines += 1;
        Ok(())
    }

    /// Lines written to each sink so far
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush both sinks and hand them back
    pub fn finish(mut self) -> RisResult<(W, W)> {
        self.se.flush()?;
        self.ee.flush()?;
        Ok((self.se, self.ee))
    }
}

/// Paths of the two dataset files in `dir`
pub fn dataset_paths(dir: impl AsRef<Path>) -> (PathBuf, PathBuf) {
    let dir = dir.as_ref();
    (dir.join(SE_DATASET_FILE), dir.join(EE_DATASET_FILE))
}

/// Runs `config.samples` scenarios
#[derive(Debug, Clone)]
pub struct DatasetGenerator {
    config: SimulationConfig,
    pipeline: ScenarioPipeline,
}

impl DatasetGenerator {
    pub fn new(config: SimulationConfig) -> RisResult<Self> {
        let pipeline = ScenarioPipeline::new(&config)?;
        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Independent stream for scenario `index`
    pub fn scenario_rng(&self, index: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(index as u64);
        rng
    }

    pub fn generate_one(&self, index: usize) -> ScenarioOutcome {
        let mut rng = self.scenario_rng(index);
        self.pipeline.run(&mut rng)
    }

    /// Scenarios `range` in index order, computed in parallel
    pub fn generate_range(&self, range: std::ops::Range<usize>) -> Vec<ScenarioOutcome> {
        range
            .into_par_iter()
            .map(|index| self.generate_one(index))
            .collect()
    }

    /// All scenarios in index order, computed on the calling thread
    pub fn generate_sequential(&self) -> Vec<ScenarioOutcome> {
        (0..self.config.samples).map(|i| self.generate_one(i)).collect()
    }

    /// Generate every scenario and stream the lines into `writer`.
    pub fn run<W: Write>(&self, writer: &mut DatasetWriter<W>) -> RisResult<RunSummary> {
        let total = self.config.samples;
        info!(
            samples = total,
            ris_elements = self.config.ris_elements,
            realizations = self.config.realizations,
            seed = self.config.seed,
            "dataset generation started"
        );

        let mut summary = RunSummary::default();
        let mut start = 0;
        while start < total {
            let end = (start + CHUNK_SIZE).min(total);
            for outcome in self.generate_range(start..end) {
                writer.write(&outcome)?;
                summary.add(&outcome, self.config.realizations);
            }
            info!(done = end, total, "chunk written");
            start = end;
        }
        summary.finalize();

        for objective in Objective::ALL {
            let failed = summary.non_converged(objective);
            if failed > 0 {
                warn!(
                    objective = %objective,
                    failed,
                    samples = summary.samples,
                    "phase search did not converge for some scenarios"
                );
            }
        }
        info!(
            samples = summary.samples,
            mean_se = summary.mean_se,
            mean_ee = summary.mean_ee,
            blocked_fraction = summary.blocked_fraction,
            "dataset generation finished"
        );
        Ok(summary)
    }

    /// Generate into `se_dataset.txt` / `ee_dataset.txt` under `dir`.
    pub fn run_to_dir(&self, dir: impl AsRef<Path>) -> RisResult<RunSummary> {
        let mut writer = DatasetWriter::create(dir)?;
        let summary = self.run(&mut writer)?;
        writer.finish()?;
        Ok(summary)
    }
}

/// Stateful sample source: one prepared pipeline and one RNG stream.
///
/// Successive calls to [`GeneratorSession::next_sample`] continue the same
/// stream, so a session seeded with `s` always yields the same sequence.
#[derive(Debug, Clone)]
pub struct GeneratorSession {
    pipeline: ScenarioPipeline,
    rng: ChaCha8Rng,
    produced: u64,
}

impl GeneratorSession {
    pub fn new(config: &SimulationConfig, seed: u64) -> RisResult<Self> {
        Ok(Self {
            pipeline: ScenarioPipeline::new(config)?,
            rng: ChaCha8Rng::seed_from_u64(seed),
            produced: 0,
        })
    }

    pub fn next_sample(&mut self) -> ScenarioOutcome {
        self.produced += 1;
        self.pipeline.run(&mut self.rng)
    }

    /// Rendered SE and EE lines of the next scenario
    pub fn next_lines(&mut self) -> (String, String) {
        let outcome = self.next_sample();
        (outcome.se.record.render(), outcome.ee.record.render())
    }

    /// Samples produced so far
    pub fn produced(&self) -> u64 {
        self.produced
    }
}
