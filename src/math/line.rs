use super::{ParametricCurve2d, Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A straight line segment, parametrised by distance from its start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment2d {
    start: Point2d,
    dir: Vector2d,
    length: f64,
}

impl LineSegment2d {
    /// Creates a line segment between two points.
    pub fn from_ends(start: Point2d, end: Point2d) -> Self {
        let delta = end - start;
        let length = delta.magnitude();
        let dir = if length > 0.0 {
            delta / length
        } else {
            Vector2d::new(1.0, 0.0)
        };
        Self { start, dir, length }
    }

    /// Creates a line segment starting at `start` and running `length` metres along `dir`.
    pub fn from_heading(start: Point2d, dir: Vector2d, length: f64) -> Self {
        Self {
            start,
            dir: dir.normalize(),
            length,
        }
    }

    /// The unit vector pointing from the start to the end of the segment.
    pub fn dir(&self) -> Vector2d {
        self.dir
    }
}

impl ParametricCurve2d for LineSegment2d {
    fn sample(&self, t: f64) -> Point2d {
        self.start + self.dir * t
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.length)
    }

    fn sample_dt(&self, _t: f64) -> Vector2d {
        self.dir
    }
}
