//! Injected simulation constants and the mutable settings snapshot.

use crate::direction::TurnType;
use crate::error::ConfigError;
use crate::math::Point2d;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The geometry of the intersection and its approach roads.
///
/// These are fixed once the [RoadNetwork](crate::RoadNetwork) has been built.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IntersectionAttributes {
    /// The world space coordinates of the centre of the intersection.
    pub center: Point2d,
    /// The width of a single lane in m.
    pub lane_width: f64,
    /// The number of lanes in each direction of travel.
    pub lanes_per_direction: usize,
    /// The distance from the centre of the intersection to the end of each road, in m.
    pub approach_length: f64,
    /// The radius of the arc followed by right-turning vehicles, in m.
    pub right_turn_radius: f64,
    /// The radius of the arc followed by left-turning vehicles, in m.
    pub left_turn_radius: f64,
    /// The straight distance a left-turning vehicle covers before starting its arc, in m.
    pub left_turn_straight: f64,
}

/// The physical and behavioural attributes shared by all vehicles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VehicleAttributes {
    /// The vehicle length in m.
    pub length: f64,
    /// The vehicle width in m.
    pub width: f64,
    /// The vehicle height in m.
    pub height: f64,
    /// The rate at which vehicles gain speed, in m/s^2.
    pub acceleration: f64,
    /// Factor applied to the maximum speed of vehicles crossing straight through.
    pub crossing_boost: f64,
    /// Factor applied to the maximum speed of vehicles following a turn.
    pub turn_speed_factor: f64,
    /// The distance from the stop line within which vehicles stop for a red light, in m.
    pub stop_threshold: f64,
    /// The minimum front-to-front spacing between vehicles on the same road, in m.
    pub min_following_gap: f64,
    /// The rate of lateral movement during a lane change, in lanes/s.
    /// If `None`, lane changes happen instantly.
    pub lane_change_rate: Option<f64>,
    /// How long a teleporting left turn takes, in s.
    pub left_turn_delay: f64,
    /// How long a teleporting right turn takes, in s.
    pub right_turn_delay: f64,
    /// Standard deviation of the per-vehicle speed factor (mean 1).
    pub speed_variation: f64,
}

/// The run-time adjustable simulation settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// The number of vehicles spawned per second.
    pub spawn_rate: f64,
    /// The cruising speed of vehicles in m/s.
    pub speed: f64,
    /// The probability that a newly spawned vehicle will turn.
    pub turn_rate: f64,
}

/// How turning vehicles get from their approach road onto their exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TurnStrategy {
    /// Vehicles drive along a continuous turn trajectory.
    #[default]
    Continuous,
    /// Vehicles disappear for a fixed delay, then reappear on their exit road.
    Teleport,
}

/// A colour, as 8-bit red, green and blue components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb(pub u8, pub u8, pub u8);

/// The complete configuration of a simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    pub intersection: IntersectionAttributes,
    pub vehicle: VehicleAttributes,
    pub settings: Settings,
    /// The distance from a road's spawn point within which no new vehicle may appear, in m.
    pub spawn_clearance: f64,
    pub turn_strategy: TurnStrategy,
    /// The colours randomly assigned to new vehicles.
    pub palette: Vec<Rgb>,
}

impl IntersectionAttributes {
    /// The width of the road in both directions of travel, in m.
    pub fn road_width(&self) -> f64 {
        2.0 * self.lanes_per_direction as f64 * self.lane_width
    }

    /// Half the side length of the square where the roads cross, in m.
    pub fn half_size(&self) -> f64 {
        0.5 * self.road_width()
    }
}

impl VehicleAttributes {
    /// How long a teleporting turn of the given type takes, in s.
    pub fn turn_delay(&self, turn: TurnType) -> f64 {
        match turn {
            TurnType::Left => self.left_turn_delay,
            TurnType::Right => self.right_turn_delay,
            TurnType::Straight => 0.0,
        }
    }
}

impl Settings {
    /// The time between spawn attempts in s, or `None` if spawning is disabled.
    pub fn spawn_interval(&self) -> Option<f64> {
        (self.spawn_rate > 0.0).then(|| 1.0 / self.spawn_rate)
    }
}

impl SimulationConfig {
    /// Checks that the configuration describes a usable intersection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let i = &self.intersection;
        let v = &self.vehicle;
        let s = &self.settings;
        let checks = [
            (i.lane_width > 0.0, "lane width must be positive"),
            (
                i.lanes_per_direction >= 2,
                "at least two lanes per direction are required",
            ),
            (
                i.approach_length > i.half_size() + v.length,
                "approach roads must extend beyond the intersection",
            ),
            (i.right_turn_radius > 0.0, "right turn radius must be positive"),
            (i.left_turn_radius > 0.0, "left turn radius must be positive"),
            (i.left_turn_straight >= 0.0, "left turn straight must not be negative"),
            (v.length > 0.0 && v.width > 0.0, "vehicle dimensions must be positive"),
            (v.acceleration >= 0.0, "acceleration must not be negative"),
            (v.min_following_gap >= 0.0, "following gap must not be negative"),
            (
                v.lane_change_rate.map_or(true, |rate| rate > 0.0),
                "lane change rate must be positive",
            ),
            (v.speed_variation >= 0.0, "speed variation must not be negative"),
            (s.spawn_rate >= 0.0, "spawn rate must not be negative"),
            (s.speed >= 0.0, "speed must not be negative"),
            ((0.0..=1.0).contains(&s.turn_rate), "turn rate must be within [0, 1]"),
            (!self.palette.is_empty(), "palette must contain at least one colour"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(ConfigError::Invalid(msg.to_string())),
            None => Ok(()),
        }
    }

    /// Parses and validates a configuration from JSON. Missing fields take their default values.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for IntersectionAttributes {
    fn default() -> Self {
        Self {
            center: Point2d::new(0.0, 0.0),
            lane_width: 3.5,
            lanes_per_direction: 3,
            approach_length: 120.0,
            right_turn_radius: 6.5,
            left_turn_radius: 8.0,
            left_turn_straight: 2.0,
        }
    }
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            length: 4.5,
            width: 1.8,
            height: 1.5,
            acceleration: 3.0,
            crossing_boost: 1.2,
            turn_speed_factor: 0.6,
            stop_threshold: 4.0,
            min_following_gap: 7.0,
            lane_change_rate: None,
            left_turn_delay: 1.5,
            right_turn_delay: 1.0,
            speed_variation: 0.0,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spawn_rate: 0.5,
            speed: 12.0,
            turn_rate: 0.3,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            intersection: Default::default(),
            vehicle: Default::default(),
            settings: Default::default(),
            spawn_clearance: 10.0,
            turn_strategy: TurnStrategy::Continuous,
            palette: vec![
                Rgb(0xe6, 0x39, 0x46),
                Rgb(0x45, 0x7b, 0x9d),
                Rgb(0x2a, 0x9d, 0x8f),
                Rgb(0xe9, 0xc4, 0x6a),
                Rgb(0xf4, 0xa2, 0x61),
                Rgb(0xf1, 0xfa, 0xee),
            ],
        }
    }
}
