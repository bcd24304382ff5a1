//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use arc::Arc2d;
pub use curve::ParametricCurve2d;
pub use line::LineSegment2d;
pub use path::{Path2d, PathPiece};
pub use util::*;

mod arc;
mod curve;
mod line;
mod path;
mod util;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;
