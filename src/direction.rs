use crate::error::ParseDirectionError;
use crate::math::Vector2d;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four approaches to the intersection.
///
/// A vehicle's `from` direction is the side of the intersection it arrives from,
/// and its `to` direction is the side it leaves by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// The manoeuvre a vehicle performs at the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TurnType {
    Straight,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// A dense index for this direction, in `0..4`.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// The direction on the other side of the intersection.
    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 2) % 4]
    }

    /// The next direction clockwise.
    fn clockwise(self) -> Self {
        Self::ALL[(self.index() + 1) % 4]
    }

    /// The next direction anticlockwise.
    fn anticlockwise(self) -> Self {
        Self::ALL[(self.index() + 3) % 4]
    }

    /// The unit vector pointing from the centre of the intersection towards this side.
    pub fn outward(self) -> Vector2d {
        match self {
            Direction::North => Vector2d::new(0.0, 1.0),
            Direction::East => Vector2d::new(1.0, 0.0),
            Direction::South => Vector2d::new(0.0, -1.0),
            Direction::West => Vector2d::new(-1.0, 0.0),
        }
    }

    /// The direction of travel of vehicles arriving from this side.
    pub fn inbound(self) -> Vector2d {
        -self.outward()
    }

    /// The side a vehicle arriving from `self` leaves by when performing `turn`.
    ///
    /// Traffic keeps to the right, so a left turn from the north heads east.
    pub fn exit_for(self, turn: TurnType) -> Self {
        match turn {
            TurnType::Straight => self.opposite(),
            TurnType::Left => self.clockwise(),
            TurnType::Right => self.anticlockwise(),
        }
    }

    /// Looks up a direction by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "east" | "e" => Some(Direction::East),
            "south" | "s" => Some(Direction::South),
            "west" | "w" => Some(Direction::West),
            _ => None,
        }
    }

    /// The lowercase name of the direction.
    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ParseDirectionError(s.to_owned()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TurnType {
    /// Whether the vehicle leaves the intersection on a different axis than it arrived.
    pub fn is_turn(self) -> bool {
        self != TurnType::Straight
    }
}
