use self::acceleration::AccelerationModel;
use crate::config::{Rgb, TurnStrategy, VehicleAttributes};
use crate::debug::debug_line;
use crate::direction::{Direction, TurnType};
use crate::error::GeometryError;
use crate::light::{LightState, SignalStates};
use crate::math::Point2d;
use crate::network::{AlternativeTrajectory, RoadKind, RoadNetwork, RoadSegment};
use crate::RoadId;
use log::{trace, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

pub use state::VehicleState;

mod acceleration;
mod state;

/// Unique ID of a [Vehicle]. IDs increase in spawn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The side of the intersection the vehicle arrived from.
    from: Direction,
    /// The side of the intersection the vehicle will leave by.
    to: Direction,
    turn: TurnType,
    /// The approach side of the road the vehicle is currently on.
    direction: Direction,
    /// The road the vehicle is currently on.
    road: RoadId,
    /// The station of the front of the vehicle along its road, in m.
    u: f64,
    /// The lane offset; fractional while changing lanes.
    v: f64,
    /// The rate of lane change, in lanes/s.
    lane_rate: f64,
    /// The lane being moved into, if a gradual lane change is in progress.
    target_lane: Option<f64>,
    /// The speed in m/s.
    speed: f64,
    /// The speed the vehicle cruises at, in m/s.
    max_speed: f64,
    /// Scale factor applied to the global speed setting.
    speed_factor: f64,
    acc: AccelerationModel,
    state: VehicleState,
    /// When the current red-light wait began.
    wait_start: Option<f64>,
    /// When the current teleporting turn began.
    turn_start: f64,
    /// Wait time from previous stops, in s.
    banked_wait: f64,
    /// Total time spent waiting at red lights, in s.
    total_wait: f64,
    /// Time spent crossing the intersection, in s.
    path_progress: f64,
    /// Whether the vehicle should be drawn.
    hidden: bool,
    /// The world space coordinates of the centre of the vehicle.
    position: Point2d,
    /// The heading in radians.
    angle: f64,
    /// The point the vehicle is heading for.
    target: Option<Point2d>,
    color: Rgb,
    length: f64,
    width: f64,
    height: f64,
}

/// Everything needed to place a new vehicle.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VehicleParams {
    pub from: Direction,
    pub lane: usize,
    pub turn: TurnType,
    /// The initial station of the front of the vehicle.
    pub station: f64,
    pub speed: f64,
    pub speed_factor: f64,
    pub color: Rgb,
}

/// The world as seen by a vehicle during one tick.
pub(crate) struct StepContext<'a> {
    /// The time step in seconds.
    pub dt: f64,
    /// The current clock reading in seconds.
    pub now: f64,
    pub lights: &'a SignalStates,
    pub network: &'a RoadNetwork,
    /// Vehicle locations captured before anything moved this tick.
    pub traffic: &'a TrafficSnapshot,
    pub attribs: &'a VehicleAttributes,
    pub strategy: TurnStrategy,
}

/// The road and station of every vehicle at the start of a tick.
#[derive(Clone, Debug, Default)]
pub(crate) struct TrafficSnapshot(Vec<(VehicleId, RoadId, f64)>);

impl TrafficSnapshot {
    /// Captures the locations of the given vehicles.
    pub fn capture<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Self {
        Self(
            vehicles
                .into_iter()
                .map(|veh| (veh.id, veh.road, veh.u))
                .collect(),
        )
    }

    /// The distance to the nearest other vehicle further along `road` than `u`.
    ///
    /// Matches [VehicleManager::nearest_ahead](crate::VehicleManager::nearest_ahead)
    /// evaluated at the start of the tick.
    pub fn gap_ahead(&self, id: VehicleId, road: RoadId, u: f64) -> Option<f64> {
        self.0
            .iter()
            .filter(|(other, other_road, _)| *other != id && *other_road == road)
            .map(|(_, _, other_u)| other_u - u)
            .filter(|gap| *gap > 0.0)
            .min_by(f64::total_cmp)
    }
}

impl Vehicle {
    /// Creates a new vehicle on the approach road of `params.from`.
    pub(crate) fn new(
        id: VehicleId,
        params: &VehicleParams,
        attribs: &VehicleAttributes,
        network: &RoadNetwork,
    ) -> Result<Self, GeometryError> {
        let road = network.approach_road(params.from)?;
        let to = params.from.exit_for(params.turn);
        let target = match network.exit_point(to) {
            Ok(point) => Some(point),
            Err(err) => {
                warn!("vehicle {id} has no exit target: {err}");
                None
            }
        };
        let max_speed = params.speed * params.speed_factor;

        let mut vehicle = Self {
            id,
            from: params.from,
            to,
            turn: params.turn,
            direction: params.from,
            road,
            u: params.station,
            v: params.lane as f64,
            lane_rate: 0.0,
            target_lane: None,
            speed: max_speed,
            max_speed,
            speed_factor: params.speed_factor,
            acc: AccelerationModel::new(attribs.acceleration),
            state: VehicleState::Approaching,
            wait_start: None,
            turn_start: 0.0,
            banked_wait: 0.0,
            total_wait: 0.0,
            path_progress: 0.0,
            hidden: false,
            position: Point2d::new(0.0, 0.0),
            angle: 0.0,
            target,
            color: params.color,
            length: attribs.length,
            width: attribs.width,
            height: attribs.height,
        };
        vehicle.update_pose(network);
        Ok(vehicle)
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The side of the intersection the vehicle arrived from.
    pub fn from(&self) -> Direction {
        self.from
    }

    /// The side of the intersection the vehicle will leave by.
    pub fn to(&self) -> Direction {
        self.to
    }

    pub fn turn(&self) -> TurnType {
        self.turn
    }

    /// The approach side of the road the vehicle is currently on.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.state == VehicleState::Waiting
    }

    pub fn is_completed(&self) -> bool {
        self.state == VehicleState::Completed
    }

    /// The ID of the road the vehicle is currently on.
    pub fn road(&self) -> RoadId {
        self.road
    }

    /// The station of the front of the vehicle along its road, in m.
    pub fn station(&self) -> f64 {
        self.u
    }

    /// The lane offset; fractional while changing lanes.
    pub fn lane(&self) -> f64 {
        self.v
    }

    /// The lane the vehicle is (mostly) in.
    pub fn lane_index(&self) -> usize {
        self.v.round().max(0.0) as usize
    }

    /// The vehicle's speed in m/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The vehicle's cruising speed in m/s.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Total time spent waiting at red lights, in s.
    pub fn wait_time(&self) -> f64 {
        self.total_wait
    }

    /// When the current red-light wait began, if the vehicle is waiting at one.
    pub fn wait_started_at(&self) -> Option<f64> {
        self.wait_start
    }

    /// Time spent crossing the intersection, in s.
    pub fn path_progress(&self) -> f64 {
        self.path_progress
    }

    /// The coordinates in world space of the centre of the vehicle.
    pub fn position(&self) -> Point2d {
        self.position
    }

    /// The heading in radians anticlockwise from the positive x-axis.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// The exit point the vehicle is heading for.
    pub fn target(&self) -> Option<Point2d> {
        self.target
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The vehicle's width in m.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// The vehicle's height in m.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Scales the global speed setting into this vehicle's cruising speed.
    pub(crate) fn set_max_speed(&mut self, speed: f64) {
        self.max_speed = speed * self.speed_factor;
    }

    /// Moves the vehicle to a station and lane on a road.
    pub(crate) fn set_location(&mut self, road: RoadId, u: f64, v: f64) {
        self.road = road;
        self.u = u;
        self.v = v;
        self.lane_rate = 0.0;
        self.target_lane = None;
    }

    pub(crate) fn set_state(&mut self, state: VehicleState) {
        debug_assert!(
            self.state.can_transition_to(state),
            "illegal transition {} -> {}",
            self.state,
            state
        );
        if self.state != state {
            trace!("vehicle {} {} -> {}", self.id, self.state, state);
            self.state = state;
        }
    }

    /// Advances the vehicle by one tick.
    pub(crate) fn step(&mut self, ctx: &StepContext) {
        let road = match ctx.network.road(self.road) {
            Ok(road) => road,
            Err(err) => {
                warn!("vehicle {} skipped: {err}", self.id);
                return;
            }
        };

        match self.state {
            VehicleState::Approaching => self.approach(ctx, road),
            VehicleState::Waiting => self.wait(ctx),
            VehicleState::Crossing => self.cross(ctx, road),
            VehicleState::Turning => self.finish_turn(ctx),
            VehicleState::Exiting => self.speed = self.max_speed,
            VehicleState::Completed => return,
        }

        // The road may have changed above
        let Ok(road) = ctx.network.road(self.road) else {
            warn!("vehicle {} lost its road", self.id);
            return;
        };
        self.integrate(ctx.dt, road);

        if self.state == VehicleState::Exiting && self.u >= road.length() {
            self.set_state(VehicleState::Completed);
        }

        self.update_pose(ctx.network);
    }

    fn approach(&mut self, ctx: &StepContext, road: &RoadSegment) {
        self.commit_lane(road, ctx.attribs);

        let to_stop = f64::max(road.entry_station() - self.u, 0.0);
        let red_stop =
            to_stop <= ctx.attribs.stop_threshold && ctx.lights[self.direction] == LightState::Red;
        if red_stop || self.is_blocked(ctx) {
            self.speed = 0.0;
            if red_stop {
                self.wait_start = Some(ctx.now);
            }
            self.set_state(VehicleState::Waiting);
            return;
        }

        self.speed = self.acc.accelerate(self.speed, self.max_speed, ctx.dt);
        if ctx.network.is_within_intersection(self.position) {
            self.set_state(VehicleState::Crossing);
        }
    }

    /// Starts moving towards the lane required by the vehicle's turn.
    fn commit_lane(&mut self, road: &RoadSegment, attribs: &VehicleAttributes) {
        let desired = match self.turn {
            TurnType::Straight => self.v.round(),
            TurnType::Left => 0.0,
            TurnType::Right => road.max_lane(),
        };
        if self.target_lane == Some(desired) {
            return;
        }
        match attribs.lane_change_rate {
            Some(rate) if (desired - self.v).abs() > f64::EPSILON => {
                self.target_lane = Some(desired);
                self.lane_rate = rate.copysign(desired - self.v);
            }
            _ => {
                self.v = desired;
                self.lane_rate = 0.0;
                self.target_lane = None;
            }
        }
    }

    /// Completes any lane change still in progress.
    fn settle_lane(&mut self) {
        if let Some(target) = self.target_lane.take() {
            trace!("vehicle {} cut into lane {target} at the line", self.id);
            self.v = target;
            self.lane_rate = 0.0;
        }
    }

    fn wait(&mut self, ctx: &StepContext) {
        self.speed = 0.0;
        if let Some(start) = self.wait_start {
            self.total_wait = self.banked_wait + (ctx.now - start);
        }
        if ctx.lights[self.direction].permits_entry() && !self.is_blocked(ctx) {
            self.banked_wait = self.total_wait;
            self.wait_start = None;
            self.set_state(VehicleState::Crossing);
        }
    }

    fn cross<'a>(&mut self, ctx: &StepContext<'a>, road: &'a RoadSegment) {
        self.path_progress += ctx.dt;

        let mut road = road;
        if self.turn.is_turn() && road.kind() == RoadKind::Through {
            self.settle_lane();
            let alt = ctx
                .network
                .find_alternative_trajectory(self.road, self.u, self.lane_index())
                .filter(|alt| alt.turn() == self.turn);
            if let Some(alt) = alt {
                match ctx.strategy {
                    TurnStrategy::Continuous => {
                        self.switch_trajectory(alt, ctx);
                        match ctx.network.road(self.road) {
                            Ok(target) => road = target,
                            Err(err) => {
                                warn!("vehicle {} turned onto a missing road: {err}", self.id)
                            }
                        }
                    }
                    TurnStrategy::Teleport => {
                        self.hidden = true;
                        self.turn_start = ctx.now;
                        self.set_state(VehicleState::Turning);
                        return;
                    }
                }
            }
        }

        let cap = match (road.kind(), self.turn) {
            (RoadKind::Turn(_), _) => self.max_speed * ctx.attribs.turn_speed_factor,
            (RoadKind::Through, TurnType::Straight) => self.max_speed * ctx.attribs.crossing_boost,
            (RoadKind::Through, _) => self.max_speed,
        };
        self.speed = if self.is_blocked(ctx) {
            0.0
        } else {
            self.acc.accelerate(self.speed, cap, ctx.dt)
        };

        let left_footprint = !ctx.network.is_within_intersection(self.position);
        if left_footprint && self.u > road.entry_station() && self.path_progress > 0.0 {
            self.set_state(VehicleState::Exiting);
        }
    }

    /// Moves the vehicle onto the road a turn trajectory leads to.
    fn switch_trajectory(&mut self, alt: &AlternativeTrajectory, ctx: &StepContext) {
        debug_line("turn", alt.sample(alt.u_min()), alt.sample(alt.u_max()));
        let max_lane = ctx
            .network
            .road(alt.target())
            .map(RoadSegment::max_lane)
            .unwrap_or(0.0);
        self.set_location(alt.target(), alt.u_min(), self.v.clamp(0.0, max_lane));
        self.speed = f64::min(self.speed, self.max_speed * ctx.attribs.turn_speed_factor);
        trace!("vehicle {} took {:?} turn", self.id, self.turn);
    }

    /// Reappears on the exit road once a teleporting turn has taken long enough.
    fn finish_turn(&mut self, ctx: &StepContext) {
        if ctx.now - self.turn_start < ctx.attribs.turn_delay(self.turn) {
            return;
        }

        match self.relocate_to_exit(ctx.network) {
            Ok(()) => {
                let dest = ctx.network.position_on(self.road, self.u, self.v);
                debug_line("teleport", self.position, dest.unwrap_or(self.position));
            }
            Err(err) => warn!("vehicle {} released in place: {err}", self.id),
        }
        self.hidden = false;
        self.speed = self.max_speed;
        self.set_state(VehicleState::Exiting);
    }

    fn relocate_to_exit(&mut self, network: &RoadNetwork) -> Result<(), GeometryError> {
        let road_id = network.exit_road(self.to)?;
        let road = network.road(road_id)?;
        let lane = network.turn_exit_lane(self.from, self.turn)? as f64;
        let u = road.exit_station() + network.half_vehicle_length();
        self.set_location(road_id, u, lane);
        self.direction = self.to.opposite();
        Ok(())
    }

    /// Whether another vehicle is too close ahead on the same road.
    fn is_blocked(&self, ctx: &StepContext) -> bool {
        ctx.traffic
            .gap_ahead(self.id, self.road, self.u)
            .map_or(false, |gap| gap < ctx.attribs.min_following_gap)
    }

    /// Integrates the vehicle's speed and lane change rate.
    fn integrate(&mut self, dt: f64, road: &RoadSegment) {
        if !self.hidden {
            self.u += self.speed * dt;
        }

        if let Some(target) = self.target_lane {
            let next = self.v + self.lane_rate * dt;
            let arrived = (self.lane_rate >= 0.0 && next >= target)
                || (self.lane_rate <= 0.0 && next <= target);
            if arrived {
                self.v = target;
                self.lane_rate = 0.0;
                self.target_lane = None;
            } else {
                self.v = next;
            }
        }
        self.v = self.v.clamp(0.0, road.max_lane());
    }

    /// Updates the vehicle's world coordinates, keeping the last pose on failure.
    fn update_pose(&mut self, network: &RoadNetwork) {
        let pose = network.position_on(self.road, self.u, self.v).and_then(|pos| {
            let angle = network.heading_on(self.road, self.u, self.lane_rate, self.speed)?;
            Ok((pos, angle))
        });
        match pose {
            Ok((pos, angle)) => {
                self.position = pos;
                self.angle = angle;
            }
            Err(err) => warn!("vehicle {} kept its last pose: {err}", self.id),
        }
    }
}
