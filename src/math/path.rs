use super::{Arc2d, LineSegment2d, ParametricCurve2d, Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;
use smallvec::SmallVec;

/// A single piece of a [Path2d].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathPiece {
    Line(LineSegment2d),
    Arc(Arc2d),
}

/// A tangent-continuous chain of lines and arcs, parametrised by arc length.
///
/// Sampling before the start or past the end of the path extrapolates the
/// first or last piece respectively.
#[derive(Clone, Debug)]
pub struct Path2d {
    pieces: SmallVec<[PathPiece; 4]>,
    /// The arc length at which each piece starts.
    starts: SmallVec<[f64; 4]>,
    length: f64,
    end: Point2d,
    end_dir: Vector2d,
}

impl PathPiece {
    fn curve(&self) -> &dyn ParametricCurve2d {
        match self {
            PathPiece::Line(line) => line,
            PathPiece::Arc(arc) => arc,
        }
    }
}

impl ParametricCurve2d for PathPiece {
    fn sample(&self, t: f64) -> Point2d {
        self.curve().sample(t)
    }

    fn bounds(&self) -> Interval<f64> {
        self.curve().bounds()
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        self.curve().sample_dt(t)
    }
}

impl Path2d {
    /// Starts an empty path at `start`, heading along `dir`.
    pub fn starting_at(start: Point2d, dir: Vector2d) -> Self {
        Self {
            pieces: SmallVec::new(),
            starts: SmallVec::new(),
            length: 0.0,
            end: start,
            end_dir: dir.normalize(),
        }
    }

    /// Creates a path consisting of a single straight line.
    pub fn line(start: Point2d, end: Point2d) -> Self {
        let line = LineSegment2d::from_ends(start, end);
        Self::starting_at(start, line.dir()).then_line(line.length())
    }

    /// Extends the path with a straight line of the given length.
    pub fn then_line(self, length: f64) -> Self {
        let line = LineSegment2d::from_heading(self.end, self.end_dir, length);
        self.push(PathPiece::Line(line))
    }

    /// Extends the path with a circular arc.
    ///
    /// # Parameters
    /// * `radius` - The radius of the arc, in m
    /// * `sweep` - The angle turned through, in radians
    /// * `left` - Whether to bend to the left (anticlockwise) of travel
    pub fn then_arc(self, radius: f64, sweep: f64, left: bool) -> Self {
        let arc = Arc2d::tangent_to(self.end, self.end_dir, radius, sweep, left);
        self.push(PathPiece::Arc(arc))
    }

    /// Appends all the pieces of another path, which should start where this one ends.
    pub fn then_path(mut self, other: &Path2d) -> Self {
        for piece in &other.pieces {
            self = self.push(*piece);
        }
        self
    }

    fn push(mut self, piece: PathPiece) -> Self {
        let length = piece.length();
        if length <= 0.0 {
            return self;
        }
        self.end = piece.sample(length);
        self.end_dir = piece.sample_dt(length).normalize();
        self.starts.push(self.length);
        self.pieces.push(piece);
        self.length += length;
        self
    }

    /// The last point of the path.
    pub fn end(&self) -> Point2d {
        self.end
    }

    /// The unit tangent at the end of the path.
    pub fn end_dir(&self) -> Vector2d {
        self.end_dir
    }

    /// The pieces making up the path.
    pub fn pieces(&self) -> &[PathPiece] {
        &self.pieces
    }

    /// Finds the piece covering `t`, and `t` relative to the start of that piece.
    fn locate(&self, t: f64) -> Option<(&PathPiece, f64)> {
        let idx = self
            .starts
            .iter()
            .rposition(|start| *start <= t)
            .unwrap_or(0);
        let piece = self.pieces.get(idx)?;
        Some((piece, t - self.starts[idx]))
    }
}

impl ParametricCurve2d for Path2d {
    fn sample(&self, t: f64) -> Point2d {
        match self.locate(t) {
            Some((piece, t)) => piece.sample(t),
            None => self.end + self.end_dir * t,
        }
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.length)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        match self.locate(t) {
            Some((piece, t)) => piece.sample_dt(t),
            None => self.end_dir,
        }
    }
}
