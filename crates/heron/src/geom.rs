pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

/// `a - b`.
pub fn diff(a: Point, b: Point) -> Vector {
    a - b
}

pub fn magnitude(v: Vector) -> f64 {
    magnitude2(v).sqrt()
}

pub fn magnitude2(v: Vector) -> f64 {
    v.x * v.x + v.y * v.y
}

pub fn midpoint(a: Point, b: Point) -> Point {
    point((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Axis-aligned square covering `[origin.x, origin.x + side) x [origin.y, origin.y + side)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Square {
    pub origin: Point,
    pub side: f64,
}

impl Square {
    pub fn new(origin: Point, side: f64) -> Self {
        Self { origin, side }
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.side
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.side
    }

    /// Whether every edge of the square is a finite coordinate.
    pub fn is_finite(&self) -> bool {
        self.origin.x.is_finite()
            && self.origin.y.is_finite()
            && self.right().is_finite()
            && self.bottom().is_finite()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.origin.x <= p.x && p.x < self.right() && self.origin.y <= p.y && p.y < self.bottom()
    }

    /// Whether the square touches the axis-aligned box of half-width `radius` around `center`.
    pub fn intersects_box(&self, center: Point, radius: f64) -> bool {
        !(center.x + radius < self.origin.x
            || center.x - radius > self.right()
            || center.y + radius < self.origin.y
            || center.y - radius > self.bottom())
    }

    /// Quadrant `index` in scan order:
    ///
    /// ```text
    ///   :---:---:
    ///   | 0 | 1 |
    ///   :---:---:
    ///   | 3 | 2 |
    ///   :---:---:
    /// ```
    pub fn quadrant(&self, index: usize) -> Square {
        let half = self.side / 2.0;
        let (dx, dy) = match index {
            0 => (0.0, 0.0),
            1 => (half, 0.0),
            2 => (half, half),
            _ => (0.0, half),
        };
        Square::new(point(self.origin.x + dx, self.origin.y + dy), half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_is_half_open() {
        let sq = Square::new(point(0.0, 0.0), 10.0);
        assert!(sq.contains(point(0.0, 0.0)));
        assert!(sq.contains(point(9.999, 9.999)));
        assert!(!sq.contains(point(10.0, 5.0)));
        assert!(!sq.contains(point(5.0, 10.0)));
    }

    #[test]
    fn quadrants_tile_the_parent() {
        let sq = Square::new(point(-8.0, 4.0), 16.0);
        assert_eq!(sq.quadrant(0), Square::new(point(-8.0, 4.0), 8.0));
        assert_eq!(sq.quadrant(1), Square::new(point(0.0, 4.0), 8.0));
        assert_eq!(sq.quadrant(2), Square::new(point(0.0, 12.0), 8.0));
        assert_eq!(sq.quadrant(3), Square::new(point(-8.0, 12.0), 8.0));
    }

    #[test]
    fn overflowing_square_is_not_finite() {
        assert!(Square::new(point(-1e300, 0.0), 1e300).is_finite());
        assert!(!Square::new(point(0.0, 0.0), f64::MAX * 2.0).is_finite());
        assert!(!Square::new(point(f64::MAX, 0.0), f64::MAX).is_finite());
    }

    #[test]
    fn box_intersection_touches_edges() {
        let sq = Square::new(point(0.0, 0.0), 10.0);
        assert!(sq.intersects_box(point(15.0, 5.0), 5.0));
        assert!(!sq.intersects_box(point(15.1, 5.0), 5.0));
        assert!(sq.intersects_box(point(-3.0, -3.0), 3.0));
    }

    #[test]
    fn vector_helpers() {
        let v = diff(point(4.0, 6.0), point(1.0, 2.0));
        assert_eq!(v, vector(3.0, 4.0));
        assert_eq!(magnitude(v), 5.0);
        assert_eq!(magnitude2(v), 25.0);
        assert_eq!(midpoint(point(0.0, 0.0), point(4.0, -2.0)), point(2.0, -1.0));
    }
}
