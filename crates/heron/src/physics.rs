use crate::config::PhysicsConfig;
use crate::geom::{Point, Vector, diff, magnitude, magnitude2, point};
use crate::rng::XorShift64Star;
use rustc_hash::FxHashMap;

/// Scale of the graph-distance factor `2·d/(d+2)`, the first term of the series for `ln(d)`.
const GRAPH_DISTANCE_GAIN: f64 = 0.6;

/// A simulated particle: a state box, a transition box or a connector waypoint.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub position: Point,
    pub velocity: Vector,
    pub acceleration: Vector,
    pub force: Vector,
    pub mass: f64,
    pub charge: f64,
    pub max_acceleration: f64,
    pub width: f64,
    pub height: f64,
    pub(crate) index: usize,
    /// Hop counts to nodes within the distance limit, keyed by node index.
    pub(crate) distances: FxHashMap<usize, u32>,
    kinetic: f64,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: point(0.0, 0.0),
            velocity: Vector::zero(),
            acceleration: Vector::zero(),
            force: Vector::zero(),
            mass: 1.0,
            charge: 1.0,
            max_acceleration: 5.0,
            width: 1.0,
            height: 1.0,
            index: 0,
            distances: FxHashMap::default(),
            kinetic: 0.0,
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Position in the owning graph's node list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Kinetic energy `½·m·v²` after the last integration step.
    pub fn kinetic_energy(&self) -> f64 {
        self.kinetic
    }

    /// Hop count to node `other`, saturating at `limit`.
    pub fn graph_distance(&self, other: usize, limit: u32) -> u32 {
        self.distances.get(&other).copied().unwrap_or(limit).min(limit)
    }

    pub fn center_dist2(&self, other: &Node) -> f64 {
        magnitude2(diff(other.position, self.position))
    }

    pub fn center_dist(&self, other: &Node) -> f64 {
        magnitude(diff(other.position, self.position))
    }

    /// Squared gap between the two bounding rectangles; zero when they touch or overlap.
    pub fn surface_dist2(&self, other: &Node) -> f64 {
        let dx = other.position.x - self.position.x;
        let dy = other.position.y - self.position.y;
        let half_w = other.width / 2.0 + self.width / 2.0;
        let half_h = other.height / 2.0 + self.height / 2.0;
        let dx2 = (dx * dx - half_w * half_w).max(0.0);
        let dy2 = (dy * dy - half_h * half_h).max(0.0);
        dx2 + dy2
    }

    /// Unit vector from this node towards `target`; a random unit vector if they coincide.
    pub fn direction_to(&self, target: Point, rng: &mut XorShift64Star) -> Vector {
        let to = diff(target, self.position);
        let size = magnitude(to);
        if size == 0.0 {
            rng.unit_direction()
        } else {
            to / size
        }
    }

    /// Coulomb-style repulsion exerted on `self` by `other`.
    pub fn repel(&self, other: &Node, cfg: &PhysicsConfig, rng: &mut XorShift64Star) -> Vector {
        let mut d2 = self.surface_dist2(other);
        if d2 > cfg.repulsion_cutoff_sq {
            return Vector::zero();
        }
        if d2 <= 0.0 {
            d2 = (self.width + self.height + other.width + other.height) * cfg.overlap_floor / 2.0;
        }
        let f1 = cfg.coulomb * self.charge * other.charge / d2;
        let gd = f64::from(self.graph_distance(other.index, cfg.distance_limit));
        let f2 = 2.0 * gd / (gd + 2.0) * GRAPH_DISTANCE_GAIN;
        self.direction_to(other.position, rng) * -(f1 * f2)
    }

    /// Logarithmic spring pull exerted on `self` by `edge`, whose other end is `other`.
    pub fn attract(&self, other: &Node, edge: &Edge, rng: &mut XorShift64Star) -> Vector {
        if edge.is_self_loop() {
            return Vector::zero();
        }
        let ratio = self.center_dist(other) / edge.length;
        let f = edge.stiffness * 2.0 * (ratio - 1.0) / (ratio + 1.0);
        self.direction_to(other.position, rng) * f
    }

    /// Semi-implicit Euler step with clamped acceleration and velocity decay.
    pub fn update_physics(&mut self, dt: f64, velocity_decay: f64) {
        self.acceleration = self.force / self.mass;
        let a = magnitude(self.acceleration);
        if a > self.max_acceleration {
            self.acceleration = self.acceleration * (self.max_acceleration / a);
        }
        self.velocity = (self.velocity + self.acceleration * dt) * velocity_decay;
        self.position += self.velocity * dt;
        self.kinetic = 0.5 * self.mass * magnitude2(self.velocity);
    }
}

/// A spring between two nodes. Forces are symmetric; `from`/`to` only record the direction of
/// the transition the spring draws.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Rest length.
    pub length: f64,
    pub stiffness: f64,
    pub(crate) from_index: usize,
    pub(crate) to_index: usize,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            length: 3.0,
            stiffness: 12.0,
            from_index: 0,
            to_index: 0,
        }
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// Node indices of both ends, resolved by the owning graph.
    pub fn ends(&self) -> (usize, usize) {
        (self.from_index, self.to_index)
    }

    /// The end opposite to node `index`, if `index` is an end at all.
    pub fn other_end(&self, index: usize) -> Option<usize> {
        if self.from_index == index {
            Some(self.to_index)
        } else if self.to_index == index {
            Some(self.from_index)
        } else {
            None
        }
    }
}
