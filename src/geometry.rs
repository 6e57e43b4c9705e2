//! Link geometry: positions, distances, distance-based path loss and the
//! uniform endpoint sampler.

use num_complex::Complex64;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Distances below this are clamped so coincident points stay finite
pub const DISTANCE_EPSILON: f64 = 1e-6;

/// Path-loss exponent shared by every link
pub const PATH_LOSS_EXPONENT: i32 = 3;

/// Point in 3D space (metres)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance, floored at [`DISTANCE_EPSILON`]
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt().max(DISTANCE_EPSILON)
    }
}

impl From<[f64; 3]> for Position {
    fn from(p: [f64; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

/// Amplitude path loss `sqrt(ref_path_loss / d^3)`.
///
/// Evaluated as a complex square root, so a negative reference loss yields a
/// purely imaginary scalar instead of NaN. Callers that need a physical
/// (non-negative real) attenuation should check the sign of `ref_path_loss`
/// up front, see `SimulationConfig::ref_path_loss_is_physical`.
pub fn path_loss(ref_path_loss: f64, distance: f64) -> Complex64 {
    Complex64::new(ref_path_loss / distance.powi(PATH_LOSS_EXPONENT), 0.0).sqrt()
}

/// Closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..self.max)
    }
}

/// Box in which transmitters and receivers are placed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            x: Interval::new(0.0, 1000.0),
            y: Interval::new(0.0, 1000.0),
            z: Interval::new(0.0, 50.0),
        }
    }
}

impl Region {
    pub fn is_valid(&self) -> bool {
        self.x.is_valid() && self.y.is_valid() && self.z.is_valid()
    }

    pub fn contains(&self, p: &Position) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Draw one point uniformly per axis
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let x = self.x.sample(rng);
        let y = self.y.sample(rng);
        let z = self.z.sample(rng);
        Position::new(x, y, z)
    }

    /// Draw `count` independent points
    pub fn sample_many<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Position> {
        (0..count).map(|_| self.sample(rng)).collect()
    }
}
