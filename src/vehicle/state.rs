#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The phase of a vehicle's journey through the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VehicleState {
    /// Driving towards the stop line.
    #[default]
    Approaching,
    /// Stopped, either at a red light or behind another vehicle.
    Waiting,
    /// Inside the intersection.
    Crossing,
    /// Hidden while performing a teleporting turn.
    Turning,
    /// Driving away from the intersection.
    Exiting,
    /// Reached the edge of the map; about to be removed.
    Completed,
}

impl VehicleState {
    /// Whether a vehicle may move from `self` to `next` within a single tick.
    ///
    /// Remaining in the same state is always allowed.
    pub fn can_transition_to(self, next: VehicleState) -> bool {
        use VehicleState::*;
        self == next
            || matches!(
                (self, next),
                (Approaching, Waiting)
                    | (Approaching, Crossing)
                    | (Waiting, Crossing)
                    | (Crossing, Turning)
                    | (Crossing, Exiting)
                    | (Turning, Exiting)
                    | (Exiting, Completed)
            )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        self == VehicleState::Completed
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleState::Approaching => "approaching",
            VehicleState::Waiting => "waiting",
            VehicleState::Crossing => "crossing",
            VehicleState::Turning => "turning",
            VehicleState::Exiting => "exiting",
            VehicleState::Completed => "completed",
        }
    }
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::VehicleState::*;

    #[test]
    fn forward_transitions() {
        assert!(Approaching.can_transition_to(Waiting));
        assert!(Approaching.can_transition_to(Crossing));
        assert!(Waiting.can_transition_to(Crossing));
        assert!(Crossing.can_transition_to(Crossing));
        assert!(Crossing.can_transition_to(Turning));
        assert!(Turning.can_transition_to(Exiting));
        assert!(Exiting.can_transition_to(Completed));
    }

    #[test]
    fn no_going_back() {
        assert!(!Waiting.can_transition_to(Approaching));
        assert!(!Crossing.can_transition_to(Waiting));
        assert!(!Approaching.can_transition_to(Exiting));
        assert!(!Turning.can_transition_to(Crossing));
        assert!(!Completed.can_transition_to(Exiting));
        assert!(Completed.is_terminal());
    }
}
