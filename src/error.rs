use crate::direction::{Direction, TurnType};
use crate::RoadId;
use thiserror::Error;

/// A failure to resolve part of the road geometry.
///
/// These are never fatal: the caller skips the affected computation for the
/// current tick and carries on with its last known state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("road {0:?} does not exist in the network")]
    UnknownRoad(RoadId),
    #[error("no {turn:?} turn is configured from the {from} approach")]
    MissingTurnRoad { from: Direction, turn: TurnType },
}

/// An unrecognised direction name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognised direction `{0}`")]
pub struct ParseDirectionError(pub String);

/// An invalid or unreadable simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[cfg(feature = "serde")]
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
