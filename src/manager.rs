use crate::clock::{Clock, SystemClock};
use crate::config::{Settings, SimulationConfig};
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::debug::debug_point;
use crate::direction::{Direction, TurnType};
use crate::error::ConfigError;
use crate::light::SignalStates;
use crate::network::RoadNetwork;
use crate::vehicle::{StepContext, TrafficSnapshot, Vehicle, VehicleId, VehicleParams};
use crate::RoadId;
use cgmath::MetricSpace;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Owns the vehicle population of an intersection and advances it tick by tick.
pub struct VehicleManager {
    /// The road geometry.
    network: RoadNetwork,
    /// The live vehicles, in spawn order.
    vehicles: Vec<Vehicle>,
    /// The ID of the next vehicle to be spawned.
    next_id: u64,
    /// The time since the last spawn attempt in s.
    spawn_timer: f64,
    /// The total simulated time in s.
    elapsed: f64,
    settings: Settings,
    config: SimulationConfig,
    rng: StdRng,
    clock: Box<dyn Clock>,
    /// Called once for each vehicle that completes its journey.
    on_complete: Option<Box<dyn FnMut(&Vehicle)>>,
    stats: Statistics,
    /// Debugging information from the previously simulated tick.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

/// A request to spawn a specific vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPlan {
    /// The approach to spawn on.
    pub direction: Direction,
    /// The lane to spawn in.
    pub lane: usize,
    pub turn: TurnType,
    /// The station of the front of the vehicle; the start of the road if `None`.
    pub station: Option<f64>,
}

/// Aggregate statistics over all completed vehicles.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statistics {
    completed: usize,
    total_wait: f64,
    /// Completions by approach direction.
    by_direction: [usize; 4],
}

impl Statistics {
    /// The number of vehicles which have completed their journey.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// The sum of the wait times of all completed vehicles, in s.
    pub fn total_wait(&self) -> f64 {
        self.total_wait
    }

    /// The mean wait time of completed vehicles in s, or zero if there are none.
    pub fn average_wait(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            self.total_wait / self.completed as f64
        }
    }

    /// The number of completed vehicles which arrived from `dir`.
    pub fn completed_from(&self, dir: Direction) -> usize {
        self.by_direction[dir.index()]
    }

    fn record(&mut self, vehicle: &Vehicle) {
        self.completed += 1;
        self.total_wait += vehicle.wait_time();
        self.by_direction[vehicle.from().index()] += 1;
    }
}

impl VehicleManager {
    /// Creates a manager with a randomly seeded generator and the system clock.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, StdRng::from_entropy(), SystemClock::new())
    }

    /// Creates a deterministic manager.
    ///
    /// # Parameters
    /// * `config` - The simulation configuration
    /// * `seed` - Seeds the random spawn generator
    /// * `clock` - The clock used for wait times and turn delays
    pub fn with_seed(
        config: SimulationConfig,
        seed: u64,
        clock: impl Clock + 'static,
    ) -> Result<Self, ConfigError> {
        Self::with_parts(config, StdRng::seed_from_u64(seed), clock)
    }

    fn with_parts(
        config: SimulationConfig,
        rng: StdRng,
        clock: impl Clock + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let network = RoadNetwork::new(&config.intersection, config.vehicle.length);
        Ok(Self {
            network,
            vehicles: vec![],
            next_id: 0,
            spawn_timer: 0.0,
            elapsed: 0.0,
            settings: config.settings,
            config,
            rng,
            clock: Box::new(clock),
            on_complete: None,
            stats: Default::default(),
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        })
    }

    /// Sets the function called with each vehicle as it completes its journey.
    pub fn set_completion_handler(&mut self, handler: impl FnMut(&Vehicle) + 'static) {
        self.on_complete = Some(Box::new(handler));
    }

    /// Replaces the run-time settings. Takes effect from the next tick.
    pub fn update_settings(&mut self, settings: Settings) {
        debug!("settings updated: {settings:?}");
        self.settings = settings;
    }

    /// Removes every vehicle and clears the statistics.
    pub fn reset(&mut self) {
        debug!("reset with {} live vehicles", self.vehicles.len());
        self.vehicles.clear();
        self.next_id = 0;
        self.spawn_timer = 0.0;
        self.elapsed = 0.0;
        self.stats = Default::default();
    }

    /// Advances the simulation.
    ///
    /// # Parameters
    /// * `dt_ms` - The time step in milliseconds
    /// * `lights` - The signal state facing each approach during this tick
    pub fn tick(&mut self, dt_ms: f64, lights: &SignalStates) {
        let dt = 0.001 * dt_ms;
        self.elapsed += dt;
        self.update_spawn_timer(dt);

        let traffic = TrafficSnapshot::capture(&self.vehicles);
        let ctx = StepContext {
            dt,
            now: self.clock.now(),
            lights,
            network: &self.network,
            traffic: &traffic,
            attribs: &self.config.vehicle,
            strategy: self.config.turn_strategy,
        };
        for vehicle in &mut self.vehicles {
            vehicle.set_max_speed(self.settings.speed);
            vehicle.step(&ctx);
        }

        self.sweep_completed();

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }
    }

    /// Attempts a random spawn whenever a full spawn interval has passed.
    fn update_spawn_timer(&mut self, dt: f64) {
        let Some(interval) = self.settings.spawn_interval() else {
            self.spawn_timer = 0.0;
            return;
        };
        self.spawn_timer += dt;
        if self.spawn_timer >= interval {
            self.spawn_timer = 0.0;
            self.spawn_random();
        }
    }

    fn spawn_random(&mut self) -> Option<VehicleId> {
        let direction = *Direction::ALL.choose(&mut self.rng)?;
        let lanes = self.network.entry_lanes(direction);
        if lanes.is_empty() {
            return None;
        }
        let lane = self.rng.gen_range(lanes);
        let turn = if self.rng.gen_bool(self.settings.turn_rate.clamp(0.0, 1.0)) {
            *[TurnType::Left, TurnType::Right].choose(&mut self.rng)?
        } else {
            TurnType::Straight
        };
        self.spawn(SpawnPlan {
            direction,
            lane,
            turn,
            station: None,
        })
    }

    /// Spawns a vehicle, unless its lane is invalid or its entry is obstructed.
    pub fn spawn(&mut self, plan: SpawnPlan) -> Option<VehicleId> {
        if !self.network.entry_lanes(plan.direction).contains(&plan.lane) {
            trace!("rejected spawn in invalid lane {}", plan.lane);
            return None;
        }
        if !self.spawn_eligible(plan.direction) {
            trace!("rejected spawn on obstructed {} approach", plan.direction);
            return None;
        }

        let params = VehicleParams {
            from: plan.direction,
            lane: plan.lane,
            turn: plan.turn,
            station: plan.station.unwrap_or(0.0),
            speed: self.settings.speed,
            speed_factor: self.sample_speed_factor(),
            color: self
                .config
                .palette
                .choose(&mut self.rng)
                .copied()
                .unwrap_or_default(),
        };
        let id = VehicleId(self.next_id);
        match Vehicle::new(id, &params, &self.config.vehicle, &self.network) {
            Ok(vehicle) => {
                debug!(
                    "spawned vehicle {id} from {} heading {} ({:?})",
                    vehicle.from(),
                    vehicle.to(),
                    vehicle.turn()
                );
                debug_point("spawn", vehicle.position());
                self.next_id += 1;
                self.vehicles.push(vehicle);
                Some(id)
            }
            Err(err) => {
                warn!("could not spawn vehicle: {err}");
                None
            }
        }
    }

    /// Samples a speed factor from a normal distribution with a mean of 1.
    fn sample_speed_factor(&mut self) -> f64 {
        let stddev = self.config.vehicle.speed_variation;
        if stddev <= 0.0 {
            return 1.0;
        }
        match rand_distr::Normal::new(1.0, stddev) {
            Ok(distr) => distr.sample(&mut self.rng).clamp(0.75, 1.25),
            Err(_) => 1.0,
        }
    }

    /// Whether a new vehicle could appear on the approach from `dir` without overlapping another.
    pub fn spawn_eligible(&self, dir: Direction) -> bool {
        let entry = match self.network.entry_point(dir) {
            Ok(point) => point,
            Err(err) => {
                warn!("no entry point for the {dir} approach: {err}");
                return false;
            }
        };
        let clearance = self.config.spawn_clearance;
        !self
            .vehicles
            .iter()
            .any(|veh| veh.from() == dir && veh.position().distance(entry) < clearance)
    }

    /// Removes completed vehicles, recording them and passing them to the completion handler.
    fn sweep_completed(&mut self) {
        let (completed, active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.vehicles)
            .into_iter()
            .partition(Vehicle::is_completed);
        self.vehicles = active;

        for vehicle in completed {
            debug!(
                "vehicle {} completed after waiting {:.1}s",
                vehicle.id(),
                vehicle.wait_time()
            );
            self.stats.record(&vehicle);
            if let Some(handler) = self.on_complete.as_mut() {
                handler(&vehicle);
            }
        }
    }

    /// Finds the closest vehicle further along `road` than station `u`.
    ///
    /// This reads live positions. Vehicles deciding how to move during a tick
    /// use the snapshot taken at its start instead, so the order they are
    /// stepped in does not matter.
    pub fn nearest_ahead(&self, road: RoadId, u: f64, excluding: VehicleId) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .filter(|veh| veh.id() != excluding && veh.road() == road && veh.station() > u)
            .min_by(|a, b| a.station().total_cmp(&b.station()))
    }

    /// The live vehicles, in spawn order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Gets a live vehicle by ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles
            .binary_search_by_key(&id, Vehicle::id)
            .ok()
            .map(|idx| &self.vehicles[idx])
    }

    #[cfg(test)]
    pub(crate) fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        let idx = self.vehicles.binary_search_by_key(&id, Vehicle::id).ok()?;
        self.vehicles.get_mut(idx)
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// The current run-time settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// The total simulated time since creation or the last reset, in s.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Gets the debugging information for the previously simulated tick as JSON,
    /// alongside the pose and state of every live vehicle.
    #[cfg(feature = "debug")]
    pub fn debug_frame(&self) -> serde_json::Value {
        use serde_json::json;
        let vehicles = self
            .vehicles
            .iter()
            .map(|veh| {
                json!({
                    "id": veh.id(),
                    "state": veh.state(),
                    "road": format!("{:?}", veh.road()),
                    "u": veh.station(),
                    "v": veh.lane(),
                    "pos": [veh.position().x, veh.position().y],
                    "angle": veh.angle(),
                    "hidden": veh.is_hidden(),
                })
            })
            .collect::<Vec<_>>();
        json!({ "events": self.debug, "vehicles": vehicles })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::ManualClock;
    use crate::light::LightState;
    use crate::vehicle::VehicleState;
    use assert_approx_eq::assert_approx_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.settings.spawn_rate = 0.0;
        config
    }

    fn manager(config: SimulationConfig) -> VehicleManager {
        VehicleManager::with_seed(config, 7, ManualClock::new()).unwrap()
    }

    fn plan(direction: Direction, lane: usize) -> SpawnPlan {
        SpawnPlan {
            direction,
            lane,
            turn: TurnType::Straight,
            station: None,
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = quiet_config();
        config.palette.clear();
        assert!(VehicleManager::with_seed(config, 0, ManualClock::new()).is_err());
    }

    #[test]
    fn spawn_clearance() {
        let mut sim = manager(quiet_config());
        assert!(sim.spawn_eligible(Direction::North));
        let first = sim.spawn(plan(Direction::North, 0)).unwrap();
        assert!(!sim.spawn_eligible(Direction::North));
        assert!(sim.spawn(plan(Direction::North, 2)).is_none());

        // Other approaches are unaffected
        assert!(sim.spawn(plan(Direction::East, 1)).is_some());

        // Once the first vehicle has moved on, the approach is free again
        let green = SignalStates::uniform(LightState::Green);
        for _ in 0..10 {
            sim.tick(100.0, &green);
        }
        assert!(sim.get_vehicle(first).unwrap().station() > 10.0);
        assert!(sim.spawn_eligible(Direction::North));
    }

    #[test]
    fn invalid_lane_is_rejected() {
        let mut sim = manager(quiet_config());
        assert!(sim.spawn(plan(Direction::West, 3)).is_none());
        assert!(sim.vehicles().is_empty());
    }

    #[test]
    fn ids_increase_in_spawn_order() {
        let mut sim = manager(quiet_config());
        let ids = Direction::ALL.map(|dir| sim.spawn(plan(dir, 1)).unwrap());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert_eq!(sim.get_vehicle(id).map(Vehicle::id), Some(id));
        }
        assert!(sim.get_vehicle(VehicleId(99)).is_none());
    }

    #[test]
    fn completed_vehicles_are_swept() {
        let mut sim = manager(quiet_config());
        let id = sim.spawn(plan(Direction::South, 1)).unwrap();
        let road = sim.network().exit_road(Direction::North).unwrap();
        let length = sim.network().road(road).unwrap().length();
        let vehicle = sim.vehicle_mut(id).unwrap();
        vehicle.set_location(road, length - 1.0, 1.0);
        vehicle.set_state(VehicleState::Crossing);
        vehicle.set_state(VehicleState::Exiting);

        let seen = Rc::new(RefCell::new(vec![]));
        let handle = seen.clone();
        sim.set_completion_handler(move |veh| handle.borrow_mut().push(veh.id()));

        sim.tick(200.0, &SignalStates::uniform(LightState::Red));
        assert!(sim.get_vehicle(id).is_none());
        assert_eq!(*seen.borrow(), vec![id]);
        assert_eq!(sim.statistics().completed(), 1);
        assert_eq!(sim.statistics().completed_from(Direction::South), 1);

        // The callback fires only once
        sim.tick(200.0, &SignalStates::uniform(LightState::Red));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn nearest_ahead_skips_vehicles_behind() {
        let mut sim = manager(quiet_config());
        let spawn_at = |sim: &mut VehicleManager, lane, station| {
            sim.spawn(SpawnPlan {
                station: Some(station),
                ..plan(Direction::East, lane)
            })
            .unwrap()
        };
        let a = spawn_at(&mut sim, 0, 80.0);
        let b = spawn_at(&mut sim, 1, 50.0);
        let c = spawn_at(&mut sim, 2, 20.0);
        let road = sim.network().approach_road(Direction::East).unwrap();

        assert_eq!(sim.nearest_ahead(road, 20.0, c).map(Vehicle::id), Some(b));
        assert_eq!(sim.nearest_ahead(road, 50.0, b).map(Vehicle::id), Some(a));
        assert!(sim.nearest_ahead(road, 80.0, a).is_none());

        // The per-tick snapshot agrees with the live query
        let traffic = TrafficSnapshot::capture(sim.vehicles());
        for (id, u) in [(c, 20.0), (b, 50.0), (a, 80.0)] {
            let live = sim.nearest_ahead(road, u, id).map(|veh| veh.station() - u);
            assert_eq!(traffic.gap_ahead(id, road, u), live);
        }
    }

    #[test]
    fn random_spawns_follow_the_spawn_rate() {
        let mut config = SimulationConfig::default();
        config.settings.spawn_rate = 2.0;
        config.spawn_clearance = 0.0;
        let mut sim = manager(config);
        let red = SignalStates::uniform(LightState::Red);
        for _ in 0..4 {
            sim.tick(250.0, &red);
        }
        assert_eq!(sim.vehicles().len(), 2);

        sim.update_settings(Settings {
            spawn_rate: 0.0,
            ..*sim.settings()
        });
        for _ in 0..20 {
            sim.tick(250.0, &red);
        }
        assert_eq!(sim.vehicles().len(), 2);
    }

    #[test]
    fn speed_setting_propagates() {
        let mut sim = manager(quiet_config());
        let id = sim.spawn(plan(Direction::West, 1)).unwrap();
        sim.update_settings(Settings {
            speed: 5.0,
            ..*sim.settings()
        });
        sim.tick(100.0, &SignalStates::uniform(LightState::Green));
        let veh = sim.get_vehicle(id).unwrap();
        assert_approx_eq!(veh.max_speed(), 5.0);
        assert_approx_eq!(veh.speed(), 5.0);
    }

    #[test]
    fn speed_factors_stay_in_range() {
        let mut config = quiet_config();
        config.vehicle.speed_variation = 0.5;
        let mut sim = manager(config);
        for _ in 0..100 {
            let factor = sim.sample_speed_factor();
            assert!((0.75..=1.25).contains(&factor));
        }
    }

    #[test]
    fn reset_clears_everything() {
        let mut sim = manager(quiet_config());
        sim.spawn(plan(Direction::North, 0));
        sim.tick(100.0, &SignalStates::uniform(LightState::Green));
        sim.reset();
        assert!(sim.vehicles().is_empty());
        assert_eq!(sim.elapsed(), 0.0);
        assert_eq!(sim.statistics(), &Statistics::default());
        assert_eq!(sim.spawn(plan(Direction::North, 0)), Some(VehicleId(0)));
    }

    #[cfg(feature = "debug")]
    #[test]
    fn debug_frame_lists_vehicles() {
        let mut sim = manager(quiet_config());
        sim.spawn(plan(Direction::North, 1));
        sim.tick(100.0, &SignalStates::uniform(LightState::Green));
        let frame = sim.debug_frame();
        assert_eq!(frame["vehicles"][0]["state"], "approaching");
        assert!(frame["events"].is_array());
    }
}
