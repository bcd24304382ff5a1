use super::{Point2d, Vector2d};
use cgmath::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI};

/// Half-width of the central difference used to estimate tangents, in m.
pub const TANGENT_STEP: f64 = 0.01;

/// Below this magnitude of `Δx` a tangent is treated as vertical.
const VERTICAL_TOLERANCE: f64 = 1e-9;

/// Rotates a vector 90 degrees anticlockwise, i.e. towards the left of travel.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// Rotates a vector 90 degrees clockwise, i.e. towards the right of travel.
pub fn rot270(vec: Vector2d) -> Vector2d {
    Vector2d::new(vec.y, -vec.x)
}

/// Computes the angle of a tangent from the displacement between two samples.
///
/// The result is `atan(Δy/Δx)`, shifted by π when the displacement points in the
/// negative x direction, and ±π/2 for (near) vertical displacements. The returned
/// angle therefore lies in `(-π/2, 3π/2]`.
pub fn tangent_angle(delta: Vector2d) -> f64 {
    let vertical = delta.x.abs() < VERTICAL_TOLERANCE;
    let angle = if vertical {
        FRAC_PI_2
    } else {
        (delta.y / delta.x).atan()
    };
    if (!vertical && delta.x < 0.0) || (vertical && delta.y < 0.0) {
        angle + PI
    } else {
        angle
    }
}

/// The unit vector pointing along the given heading angle.
pub fn heading_vector(angle: f64) -> Vector2d {
    Vector2d::new(angle.cos(), angle.sin())
}

/// The signed difference `b - a` between two angles, wrapped into `(-π, π]`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (b - a).rem_euclid(2.0 * PI);
    if diff > PI {
        diff - 2.0 * PI
    } else {
        diff
    }
}

/// Projects a point onto a local coordinate system.
///
/// # Parameters
/// * `point` - The point to project
/// * `origin` - The origin of the coordinate system
/// * `x_axis` - The basis vector pointing in the positive x-axis.
/// * `y_axis` - The basis vector pointing in the positive y-axis.
pub fn project_local(
    point: Point2d,
    origin: Point2d,
    x_axis: Vector2d,
    y_axis: Vector2d,
) -> Point2d {
    let point = point - origin;
    Point2d::new(point.dot(x_axis), point.dot(y_axis))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn tangent_angle_quadrants() {
        assert_approx_eq!(tangent_angle(Vector2d::new(1.0, 0.0)), 0.0);
        assert_approx_eq!(tangent_angle(Vector2d::new(1.0, 1.0)), PI / 4.0);
        assert_approx_eq!(tangent_angle(Vector2d::new(-1.0, 1.0)), 3.0 * PI / 4.0);
        assert_approx_eq!(tangent_angle(Vector2d::new(-1.0, 0.0)), PI);
        assert_approx_eq!(tangent_angle(Vector2d::new(-1.0, -1.0)), 5.0 * PI / 4.0);
        assert_approx_eq!(tangent_angle(Vector2d::new(1.0, -1.0)), -PI / 4.0);
    }

    #[test]
    fn vertical_tangents() {
        assert_approx_eq!(tangent_angle(Vector2d::new(0.0, 2.0)), FRAC_PI_2);
        assert_approx_eq!(tangent_angle(Vector2d::new(0.0, -2.0)), 3.0 * FRAC_PI_2);
        assert_approx_eq!(tangent_angle(Vector2d::new(1e-12, -2.0)), 3.0 * FRAC_PI_2);
    }

    #[test]
    fn heading_vector_inverts_tangent_angle() {
        for delta in [
            Vector2d::new(3.0, 4.0),
            Vector2d::new(-3.0, 4.0),
            Vector2d::new(-3.0, -4.0),
            Vector2d::new(0.0, -1.0),
        ] {
            let dir = heading_vector(tangent_angle(delta));
            assert_approx_eq!(dir.x, delta.normalize().x);
            assert_approx_eq!(dir.y, delta.normalize().y);
        }
    }

    #[test]
    fn angle_difference_wraps() {
        assert_approx_eq!(angle_difference(3.0 * FRAC_PI_2, -FRAC_PI_2 + 0.1), 0.1);
        assert_approx_eq!(angle_difference(0.1, -0.1), -0.2);
    }

    #[test]
    fn rotations_are_perpendicular() {
        let v = Vector2d::new(0.0, -1.0);
        assert_eq!(rot90(v), Vector2d::new(1.0, 0.0));
        assert_eq!(rot270(v), Vector2d::new(-1.0, 0.0));
        let p = project_local(
            Point2d::new(2.0, 3.0),
            Point2d::new(1.0, 1.0),
            Vector2d::new(1.0, 0.0),
            Vector2d::new(0.0, 1.0),
        );
        assert_eq!(p, Point2d::new(1.0, 2.0));
    }
}
