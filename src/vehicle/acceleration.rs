/// The longitudinal motion law of a vehicle.
///
/// Vehicles either hold still or gain speed at a constant rate towards a cap.
/// A vehicle already above its cap is slowed to it immediately.
#[derive(Clone, Copy, Debug)]
pub struct AccelerationModel {
    /// The rate of speed gain in m/s^2.
    max_acc: f64,
}

impl AccelerationModel {
    /// Creates a new acceleration model.
    pub fn new(max_acc: f64) -> Self {
        Self { max_acc }
    }

    /// The speed after accelerating for `dt` seconds, never exceeding `cap`.
    ///
    /// # Arguments
    /// * `vel` - The current speed (m/s).
    /// * `cap` - The speed to accelerate towards (m/s).
    /// * `dt` - The time step (s).
    pub fn accelerate(&self, vel: f64, cap: f64, dt: f64) -> f64 {
        f64::max(f64::min(vel + self.max_acc * dt, cap), 0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn accelerates_up_to_cap() {
        let acc = AccelerationModel::new(3.0);
        assert_approx_eq!(acc.accelerate(0.0, 12.0, 0.1), 0.3);
        assert_approx_eq!(acc.accelerate(11.9, 12.0, 0.1), 12.0);
        assert_approx_eq!(acc.accelerate(14.0, 12.0, 0.1), 12.0);
        assert_approx_eq!(acc.accelerate(1.0, 0.0, 0.1), 0.0);
    }
}
