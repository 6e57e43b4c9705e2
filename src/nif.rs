//! BEAM entry points for RisSimnet
//!
//! Generator sessions live in a global slab; Elixir holds the integer ID.
//! Sample generation runs on a dirty CPU scheduler.

use rustler::{NifResult, NifStruct};

use crate::config::SimulationConfig;
use crate::dataset::GeneratorSession;
use crate::error::RisError;
use crate::geometry::{Interval, Position};
use crate::slab::{GeneratorSlab, DEFAULT_CAPACITY};

lazy_static::lazy_static! {
    static ref GENERATORS: GeneratorSlab<GeneratorSession> = GeneratorSlab::new(DEFAULT_CAPACITY);
}

mod atoms {
    rustler::atoms! {
        ok,
    }
}

rustler::init!("Elixir.RisSimnet.Physics.Nif");

/// Generator configuration as sent from Elixir; struct defaults live on the
/// Elixir side and match `SimulationConfig::default()`.
#[derive(NifStruct, Debug, Clone)]
#[module = "RisSimnet.Physics.Types.GeneratorParams"]
pub struct GeneratorParams {
    pub ris_elements: u64,
    pub realizations: u64,
    pub ris_position: (f64, f64, f64),
    pub ref_path_loss: f64,
    pub p_block: f64,
    pub p_attenuate: f64,
    pub attenuate_db_min: f64,
    pub attenuate_db_max: f64,
    pub max_transmit_power_w: f64,
    pub circuit_power_w: f64,
    pub noise_psd_w_per_hz: f64,
    pub bandwidth_hz: f64,
    pub restarts: u64,
}

impl From<GeneratorParams> for SimulationConfig {
    fn from(p: GeneratorParams) -> Self {
        let defaults = SimulationConfig::default();
        let (x, y, z) = p.ris_position;
        SimulationConfig {
            ris_elements: p.ris_elements as usize,
            realizations: p.realizations as usize,
            ris_position: Position::new(x, y, z),
            ref_path_loss: p.ref_path_loss,
            p_block: p.p_block,
            p_attenuate: p.p_attenuate,
            attenuate_db_range: Interval::new(p.attenuate_db_min, p.attenuate_db_max),
            max_transmit_power_w: p.max_transmit_power_w,
            circuit_power_w: p.circuit_power_w,
            noise_psd_w_per_hz: p.noise_psd_w_per_hz,
            bandwidth_hz: p.bandwidth_hz,
            optimizer: crate::optimizer::OptimizerSettings {
                restarts: p.restarts as usize,
                ..defaults.optimizer
            },
            ..defaults
        }
    }
}

fn to_nif_error(err: RisError) -> rustler::Error {
    match err {
        RisError::SlabFull => rustler::Error::Term(Box::new("slab_full")),
        RisError::UnknownGenerator(_) => rustler::Error::Term(Box::new("generator_not_found")),
        other => rustler::Error::Term(Box::new(other.to_string())),
    }
}

/// Creates a generator session and returns its handle.
#[rustler::nif]
fn create_generator(params: GeneratorParams, seed: u64) -> NifResult<(rustler::Atom, u64)> {
    let config = SimulationConfig::from(params);
    let session = GeneratorSession::new(&config, seed).map_err(to_nif_error)?;
    let id = GENERATORS.insert(session).map_err(to_nif_error)?;
    Ok((atoms::ok(), id))
}

/// Runs one scenario and returns the rendered SE and EE lines.
#[rustler::nif(schedule = "DirtyCpu")]
fn next_sample(generator_id: u64) -> NifResult<(rustler::Atom, (String, String))> {
    let lines = GENERATORS
        .with_mut(generator_id, |session| session.next_lines())
        .map_err(to_nif_error)?;
    Ok((atoms::ok(), lines))
}

/// Destroys a session and frees its slot. Unknown IDs are ignored.
#[rustler::nif]
fn destroy_generator(generator_id: u64) -> NifResult<rustler::Atom> {
    let _ = GENERATORS.remove(generator_id);
    Ok(atoms::ok())
}

/// Number of live sessions.
#[rustler::nif]
fn generator_count() -> NifResult<u64> {
    Ok(GENERATORS.count() as u64)
}
