use super::{rot270, rot90, ParametricCurve2d, Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A circular arc, parametrised by distance travelled along it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc2d {
    centre: Point2d,
    radius: f64,
    /// Polar angle of the start point about the centre.
    start_angle: f64,
    /// `1.0` for anticlockwise (left-hand) arcs, `-1.0` for clockwise ones.
    sign: f64,
    /// Magnitude of the swept angle in radians.
    sweep: f64,
}

impl Arc2d {
    /// Creates an arc that departs `start` tangentially to `heading`.
    ///
    /// # Parameters
    /// * `start` - The first point on the arc
    /// * `heading` - The direction of travel at `start`
    /// * `radius` - The radius of the arc, in m
    /// * `sweep` - The angle turned through, in radians
    /// * `left` - Whether the arc bends to the left (anticlockwise) of travel
    pub fn tangent_to(
        start: Point2d,
        heading: Vector2d,
        radius: f64,
        sweep: f64,
        left: bool,
    ) -> Self {
        let heading = heading.normalize();
        let (side, sign) = if left {
            (rot90(heading), 1.0)
        } else {
            (rot270(heading), -1.0)
        };
        let centre = start + side * radius;
        let radial = start - centre;
        Self {
            centre,
            radius,
            start_angle: radial.y.atan2(radial.x),
            sign,
            sweep,
        }
    }

    /// The centre of the circle the arc lies on.
    pub fn centre(&self) -> Point2d {
        self.centre
    }

    /// The radius of the arc.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn angle_at(&self, t: f64) -> f64 {
        self.start_angle + self.sign * t / self.radius
    }
}

impl ParametricCurve2d for Arc2d {
    fn sample(&self, t: f64) -> Point2d {
        let angle = self.angle_at(t);
        self.centre + self.radius * Vector2d::new(angle.cos(), angle.sin())
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.radius * self.sweep)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let angle = self.angle_at(t);
        self.sign * Vector2d::new(-angle.sin(), angle.cos())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn left_quarter_turn_from_southbound_ends_eastbound() {
        let arc = Arc2d::tangent_to(
            Point2d::new(0.0, 0.0),
            Vector2d::new(0.0, -1.0),
            10.0,
            FRAC_PI_2,
            true,
        );
        assert_approx_eq!(arc.centre().x, 10.0);
        assert_approx_eq!(arc.length(), 10.0 * FRAC_PI_2);

        let end = arc.sample(arc.length());
        assert_approx_eq!(end.x, 10.0);
        assert_approx_eq!(end.y, -10.0);

        let dir = arc.sample_dt(arc.length());
        assert_approx_eq!(dir.x, 1.0);
        assert_approx_eq!(dir.y, 0.0);
    }

    #[test]
    fn right_quarter_turn_from_southbound_ends_westbound() {
        let arc = Arc2d::tangent_to(
            Point2d::new(0.0, 0.0),
            Vector2d::new(0.0, -1.0),
            4.0,
            FRAC_PI_2,
            false,
        );
        let start_dir = arc.sample_dt(0.0);
        assert_approx_eq!(start_dir.y, -1.0);

        let end = arc.sample(arc.length());
        assert_approx_eq!(end.x, -4.0);
        assert_approx_eq!(end.y, -4.0);

        let dir = arc.sample_dt(arc.length());
        assert_approx_eq!(dir.x, -1.0);
    }

    #[test]
    fn arc_is_arclength_parameterised() {
        let arc = Arc2d::tangent_to(
            Point2d::new(3.0, 2.0),
            Vector2d::new(1.0, 1.0),
            7.5,
            FRAC_PI_2,
            true,
        );
        let ts = (0..=20).map(|i| i as f64 * 0.05 * arc.length()).collect::<Vec<_>>();
        for ts in ts.windows(2) {
            let chord = (arc.sample(ts[1]) - arc.sample(ts[0])).magnitude();
            assert_approx_eq!(chord, ts[1] - ts[0], 0.01);
        }
    }
}
