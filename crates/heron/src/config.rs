use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Every tunable constant of the simulation, fixed for the lifetime of a [`crate::Graph`].
///
/// `distance_limit` and `repulsion_cutoff_sq` are empirical defaults; diagrams at very different
/// scales may want them recalibrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    /// Coulomb constant `ke` of the repulsion law.
    pub coulomb: f64,
    /// Velocity is multiplied by this after every integration step.
    pub velocity_decay: f64,
    /// Time-step multiplier applied while the mean energy is at or above 1.
    pub dt_decay: f64,
    /// Time step after construction and after [`crate::Graph::restart`].
    pub initial_dt: f64,
    /// Pairs whose squared surface distance exceeds this do not repel.
    pub repulsion_cutoff_sq: f64,
    /// Half-width of the box queried around each node during the repulsion pass.
    pub query_radius: f64,
    /// Breadth-first searches stop at this many hops; farther nodes count as this far.
    pub distance_limit: u32,
    /// Quad-tree cells at or below this side length never subdivide.
    pub quad_min_size: f64,
    /// Overlapping rectangles repel as if their squared gap were
    /// `(w1 + h1 + w2 + h2) * overlap_floor / 2`.
    pub overlap_floor: f64,
    /// Seed for the tie-break direction used when two centers coincide.
    pub seed: u64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            coulomb: 10_000.0,
            velocity_decay: 0.9,
            dt_decay: 0.998,
            initial_dt: 1.0,
            repulsion_cutoff_sq: 1_000_000.0,
            query_radius: 500.0,
            distance_limit: 5,
            quad_min_size: 1024.0,
            overlap_floor: 1.0 / 400.0,
            seed: 1,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<()> {
        positive("coulomb", self.coulomb)?;
        positive("initialDt", self.initial_dt)?;
        positive("repulsionCutoffSq", self.repulsion_cutoff_sq)?;
        positive("queryRadius", self.query_radius)?;
        positive("quadMinSize", self.quad_min_size)?;
        positive("overlapFloor", self.overlap_floor)?;
        unit_interval("velocityDecay", self.velocity_decay)?;
        unit_interval("dtDecay", self.dt_decay)?;
        if self.distance_limit == 0 {
            return Err(Error::InvalidConfig {
                field: "distanceLimit",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            reason: format!("expected a finite positive number, got {value}"),
        })
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            reason: format!("expected a value in (0, 1], got {value}"),
        })
    }
}
