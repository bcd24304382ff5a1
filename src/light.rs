use crate::direction::Direction;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// The state of the signal facing one approach.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum LightState {
    #[default]
    Red,
    Yellow,
    Green,
}

impl LightState {
    /// Whether a vehicle waiting at this signal may proceed.
    pub fn permits_entry(self) -> bool {
        self != LightState::Red
    }
}

/// The signal state facing each of the four approaches.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalStates([LightState; 4]);

impl SignalStates {
    /// Every approach shows the same state.
    pub const fn uniform(state: LightState) -> Self {
        Self([state; 4])
    }

    /// Returns a copy with the signal for `dir` replaced.
    pub fn with(mut self, dir: Direction, state: LightState) -> Self {
        self.set(dir, state);
        self
    }

    /// Sets the signal facing `dir`.
    pub fn set(&mut self, dir: Direction, state: LightState) {
        self.0[dir.index()] = state;
    }

    /// Iterates over each approach and its signal.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, LightState)> + '_ {
        Direction::ALL.into_iter().map(|dir| (dir, self[dir]))
    }
}

impl Index<Direction> for SignalStates {
    type Output = LightState;

    fn index(&self, dir: Direction) -> &LightState {
        &self.0[dir.index()]
    }
}

/// A fixed-time, two-phase signal plan.
///
/// The north/south and east/west approaches take turns to run. A phase shows
/// green, then yellow, then red; the next phase turns green only once the
/// previous one has been red for the all-red clearance time.
#[derive(Clone, Debug)]
pub struct FixedCycle {
    /// The north/south and east/west movements.
    movements: [Movement; 2],
    /// The index of the movement currently holding right of way.
    active: usize,
    /// Duration of the green phase in s.
    green_time: f64,
    /// Duration of the yellow phase in s.
    yellow_time: f64,
    /// Time both movements must be red before switching, in s.
    all_red_time: f64,
}

/// A single signal movement.
#[derive(Clone, Copy, Debug)]
struct Movement {
    /// The current state.
    state: LightState,
    /// The time since the current state was entered, in s.
    since: f64,
}

impl FixedCycle {
    /// Creates a plan starting with north/south on green.
    pub fn new(green_time: f64, yellow_time: f64, all_red_time: f64) -> Self {
        Self {
            movements: [
                Movement {
                    state: LightState::Green,
                    since: 0.0,
                },
                Movement {
                    state: LightState::Red,
                    since: all_red_time,
                },
            ],
            active: 0,
            green_time,
            yellow_time,
            all_red_time,
        }
    }

    /// Advances the signal timing by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        for movement in &mut self.movements {
            movement.since += dt;
        }

        let next = [0, 1].map(|idx| {
            use LightState::*;
            let movement = &self.movements[idx];
            match (idx == self.active, movement.state) {
                (true, Green) if movement.since >= self.green_time => Yellow,
                (true, Yellow) if movement.since >= self.yellow_time => Red,
                (true, Red) if self.can_turn_green(idx) => Green,
                (_, state) => state,
            }
        });

        let mut handover = false;
        for (movement, next) in self.movements.iter_mut().zip(next) {
            if movement.state != next {
                handover |= next == LightState::Red;
                movement.state = next;
                movement.since = 0.0;
            }
        }
        if handover {
            self.active = 1 - self.active;
        }
    }

    /// The state currently facing each approach.
    pub fn states(&self) -> SignalStates {
        let ns = self.movements[0].state;
        let ew = self.movements[1].state;
        SignalStates([ns, ew, ns, ew])
    }

    /// Checks that the conflicting movement has cleared the intersection.
    fn can_turn_green(&self, movement: usize) -> bool {
        let other = &self.movements[1 - movement];
        other.state == LightState::Red && other.since >= self.all_red_time
    }
}

impl Default for FixedCycle {
    fn default() -> Self {
        Self::new(20.0, 3.0, 2.0)
    }
}
