use super::{tangent_angle, Point2d, Vector2d, TANGENT_STEP};
use crate::util::Interval;

/// A parametric curve in 2D space, parametrised by arc length.
pub trait ParametricCurve2d {
    /// Samples the parametric curve.
    ///
    /// Implementations should accept values slightly outside of [`Self::bounds`],
    /// continuing the curve smoothly past its ends.
    fn sample(&self, t: f64) -> Point2d;

    /// Returns the minimum and maximum t-values that define the bounds of the curve.
    fn bounds(&self) -> Interval<f64>;

    /// The length of the curve.
    fn length(&self) -> f64 {
        self.bounds().length()
    }

    /// Samples the derivative of the parametric curve.
    ///
    /// The default implementation approximates the derivative by sampling
    /// two very nearby points on either side of `t`.
    fn sample_dt(&self, t: f64) -> Vector2d {
        let p1 = self.sample(t - TANGENT_STEP);
        let p2 = self.sample(t + TANGENT_STEP);
        (p2 - p1) / (2.0 * TANGENT_STEP)
    }

    /// The angle of the curve's tangent at `t`, estimated by central difference.
    /// See [`tangent_angle`](super::tangent_angle) for the angle convention.
    fn tangent_angle(&self, t: f64) -> f64 {
        let p1 = self.sample(t - TANGENT_STEP);
        let p2 = self.sample(t + TANGENT_STEP);
        tangent_angle(p2 - p1)
    }
}

impl<T: ParametricCurve2d + ?Sized> ParametricCurve2d for &T {
    fn sample(&self, t: f64) -> Point2d {
        (**self).sample(t)
    }

    fn bounds(&self) -> Interval<f64> {
        (**self).bounds()
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        (**self).sample_dt(t)
    }
}
