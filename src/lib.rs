pub use cgmath;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    IntersectionAttributes, Rgb, Settings, SimulationConfig, TurnStrategy, VehicleAttributes,
};
pub use direction::{Direction, TurnType};
pub use error::{ConfigError, GeometryError, ParseDirectionError};
pub use light::{FixedCycle, LightState, SignalStates};
pub use manager::{SpawnPlan, Statistics, VehicleManager};
pub use network::{AlternativeTrajectory, RoadKind, RoadNetwork, RoadSegment};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use vehicle::{Vehicle, VehicleId, VehicleState};

mod clock;
mod config;
mod debug;
mod direction;
mod error;
mod light;
mod manager;
pub mod math;
mod network;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [RoadSegment].
    pub struct RoadId;
}

type RoadSet = slotmap::SlotMap<RoadId, RoadSegment>;
