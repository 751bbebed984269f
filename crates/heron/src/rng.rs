use crate::geom::{Vector, vector};

/// Small seeded generator (xorshift64*) used for tie-breaks, so identical inputs give identical
/// layouts.
#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    pub fn next_f64_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    /// A unit vector at a uniformly drawn angle.
    pub fn unit_direction(&mut self) -> Vector {
        let angle = self.next_f64_unit() * std::f64::consts::TAU;
        vector(angle.cos(), angle.sin())
    }
}
