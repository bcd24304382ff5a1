use crate::config::IntersectionAttributes;
use crate::direction::{Direction, TurnType};
use crate::error::GeometryError;
use crate::math::{
    heading_vector, project_local, rot270, rot90, ParametricCurve2d, Path2d, Point2d,
};
use crate::util::Interval;
use crate::{RoadId, RoadSet};
use itertools::iproduct;
use smallvec::SmallVec;
use std::f64::consts::FRAC_PI_2;
use std::ops::Range;

/// The roads making up a four-way intersection, and the turns between them.
///
/// Each approach has a one-way *through road* running from the edge of the map,
/// across the intersection and out to the opposite edge. Turning vehicles switch
/// onto a single-lane *turn road* part way along, via an [AlternativeTrajectory].
#[derive(Clone, Debug)]
pub struct RoadNetwork {
    /// All road segments, through roads and turn roads alike.
    roads: RoadSet,
    /// The through road entered from each direction.
    approaches: [RoadId; 4],
    /// The turn road for each approach and turn type.
    turns: Vec<(Direction, TurnType, RoadId)>,
    /// The centre of the intersection.
    center: Point2d,
    /// Half the side length of the intersection footprint, in m.
    half_size: f64,
    /// Width of a lane in m.
    lane_width: f64,
    /// Number of lanes on each through road.
    lanes: usize,
    /// Half the length of a vehicle; vehicles are positioned by their front.
    half_vehicle_length: f64,
}

/// The role a road segment plays in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoadKind {
    /// A straight road across the whole intersection.
    Through,
    /// The path followed by vehicles performing a turn.
    Turn(TurnType),
}

/// A single road, with a primary trajectory parametrised by arc length.
#[derive(Clone, Debug)]
pub struct RoadSegment {
    /// The road ID.
    id: RoadId,
    /// The approach this road is entered from.
    direction: Direction,
    kind: RoadKind,
    /// The number of lanes.
    lane_count: usize,
    /// The width of each lane in m.
    lane_width: f64,
    /// The centre line of the road.
    trajectory: Path2d,
    /// The station at which the road enters the intersection footprint.
    entry_station: f64,
    /// The station at which the road leaves the intersection footprint.
    exit_station: f64,
    /// The turns which may be taken from this road.
    alternatives: SmallVec<[AlternativeTrajectory; 2]>,
}

/// A turn geometry which overrides a road's primary trajectory over a limited
/// range of stations, for vehicles in a limited range of lanes.
#[derive(Clone, Debug)]
pub struct AlternativeTrajectory {
    /// The turn curve, parametrised by distance since the turn started.
    curve: Path2d,
    /// The stations of the source road to which this trajectory applies.
    stations: Interval<f64>,
    /// The lanes of the source road to which this trajectory applies.
    lanes: Interval<usize>,
    /// The road that vehicles switch onto.
    target: RoadId,
    turn: TurnType,
    /// The lateral offset of the departure lane from the source road's centre line.
    lateral_offset: f64,
    /// The lane of the exit road the turn curve ends in.
    exit_lane: usize,
}

impl RoadNetwork {
    /// Builds the roads and turn trajectories of an intersection.
    ///
    /// # Parameters
    /// * `attribs` - The geometry of the intersection
    /// * `vehicle_length` - The length of the vehicles which will use the network, in m
    pub fn new(attribs: &IntersectionAttributes, vehicle_length: f64) -> Self {
        let mut roads = RoadSet::with_key();
        let approaches = Direction::ALL.map(|dir| {
            roads.insert_with_key(|id| RoadSegment::through(id, dir, attribs))
        });

        let mut network = Self {
            roads,
            approaches,
            turns: vec![],
            center: attribs.center,
            half_size: attribs.half_size(),
            lane_width: attribs.lane_width,
            lanes: attribs.lanes_per_direction,
            half_vehicle_length: 0.5 * vehicle_length,
        };

        for (from, turn) in iproduct!(Direction::ALL, [TurnType::Left, TurnType::Right]) {
            network.add_turn(from, turn, attribs);
        }

        network
    }

    /// Constructs the turn road and alternative trajectory for one manoeuvre.
    fn add_turn(&mut self, from: Direction, turn: TurnType, attribs: &IntersectionAttributes) {
        let source_id = self.approaches[from.index()];
        let source = &self.roads[source_id];
        let lane = match turn {
            TurnType::Right => self.lanes - 1,
            _ => 0,
        };

        // Turns start once the whole vehicle has entered the intersection
        let u_min = source.entry_station + self.half_vehicle_length;
        let lateral_offset = source.lane_offset(lane as f64);
        let start = source.lane_point(u_min, lane as f64);
        let heading = heading_vector(source.trajectory.tangent_angle(u_min));

        let curve = match turn {
            TurnType::Right => Path2d::starting_at(start, heading).then_arc(
                attribs.right_turn_radius,
                FRAC_PI_2,
                false,
            ),
            _ => Path2d::starting_at(start, heading)
                .then_line(attribs.left_turn_straight)
                .then_arc(attribs.left_turn_radius, FRAC_PI_2, true),
        };

        // Continue straight from the end of the turn to the edge of the map
        let exit_dir = curve.end_dir();
        let along = project_local(curve.end(), self.center, exit_dir, rot90(exit_dir)).x;
        let exit_len = f64::max(attribs.approach_length - along, 0.0);

        // The exit road lane whose centre line the turn curve ends closest to
        let exit_road = &self.roads[self.approaches[from.exit_for(turn).opposite().index()]];
        let lateral_error = |lane: usize| {
            let origin = exit_road.lane_point(exit_road.exit_station, lane as f64);
            project_local(curve.end(), origin, exit_dir, rot90(exit_dir)).y.abs()
        };
        let exit_lane = (0..self.lanes)
            .min_by(|a, b| lateral_error(*a).total_cmp(&lateral_error(*b)))
            .unwrap_or(0);

        let trajectory = Path2d::line(source.lane_point(0.0, lane as f64), start)
            .then_path(&curve)
            .then_line(exit_len);

        let entry_station = source.entry_station;
        let stations = Interval::new(u_min, u_min + curve.length());
        let target = self.roads.insert_with_key(|id| RoadSegment {
            id,
            direction: from,
            kind: RoadKind::Turn(turn),
            lane_count: 1,
            lane_width: attribs.lane_width,
            trajectory,
            entry_station,
            exit_station: stations.max,
            alternatives: SmallVec::new(),
        });

        self.roads[source_id]
            .alternatives
            .push(AlternativeTrajectory {
                curve,
                stations,
                lanes: Interval::new(lane, lane),
                target,
                turn,
                lateral_offset,
                exit_lane,
            });
        self.turns.push((from, turn, target));
    }

    /// Gets the road with the given ID.
    pub fn road(&self, id: RoadId) -> Result<&RoadSegment, GeometryError> {
        self.roads.get(id).ok_or(GeometryError::UnknownRoad(id))
    }

    /// Returns an iterator over all the roads in the network.
    pub fn roads(&self) -> impl Iterator<Item = &RoadSegment> {
        self.roads.values()
    }

    /// The through road entered from `dir`.
    pub fn approach_road(&self, dir: Direction) -> Result<RoadId, GeometryError> {
        let id = self.approaches[dir.index()];
        self.road(id).map(|road| road.id)
    }

    /// The lane of `exit_road(from.exit_for(turn))` a turn from `from` ends in.
    pub fn turn_exit_lane(
        &self,
        from: Direction,
        turn: TurnType,
    ) -> Result<usize, GeometryError> {
        self.road(self.approach_road(from)?)?
            .alternatives
            .iter()
            .find(|alt| alt.turn == turn)
            .map(|alt| alt.exit_lane)
            .ok_or(GeometryError::MissingTurnRoad { from, turn })
    }

    /// The through road which leaves the intersection towards `dir`.
    pub fn exit_road(&self, dir: Direction) -> Result<RoadId, GeometryError> {
        self.approach_road(dir.opposite())
    }

    /// The turn road followed by vehicles turning from `from`.
    pub fn turn_road(&self, from: Direction, turn: TurnType) -> Result<RoadId, GeometryError> {
        self.turns
            .iter()
            .find(|(dir, t, _)| *dir == from && *t == turn)
            .map(|(_, _, id)| *id)
            .ok_or(GeometryError::MissingTurnRoad { from, turn })
    }

    /// The lanes vehicles may enter the approach from `dir` in.
    pub fn entry_lanes(&self, _dir: Direction) -> Range<usize> {
        0..self.lanes
    }

    /// Half the length of the vehicles the network was built for, in m.
    pub fn half_vehicle_length(&self) -> f64 {
        self.half_vehicle_length
    }

    /// Half the side length of the intersection footprint, in m.
    pub fn half_size(&self) -> f64 {
        self.half_size
    }

    /// Computes the world position of a vehicle.
    ///
    /// # Parameters
    /// * `road` - The road the vehicle is on
    /// * `u` - The station of the front of the vehicle
    /// * `v` - The lane the vehicle is in; fractional while changing lanes
    pub fn position_on(&self, road: RoadId, u: f64, v: f64) -> Result<Point2d, GeometryError> {
        let road = self.road(road)?;
        Ok(road.lane_point(u - self.half_vehicle_length, v))
    }

    /// The unshifted centre of lane `lane` at the given station of a road.
    pub fn lane_point(
        &self,
        road: RoadId,
        station: f64,
        lane: usize,
    ) -> Result<Point2d, GeometryError> {
        Ok(self.road(road)?.lane_point(station, lane as f64))
    }

    /// Computes the heading of a vehicle, in radians anticlockwise from the x-axis.
    ///
    /// The heading is the tangent of the road, tilted into any lane change
    /// in progress.
    ///
    /// # Parameters
    /// * `road` - The road the vehicle is on
    /// * `u` - The station of the front of the vehicle
    /// * `dv_dt` - The rate of lane change, in lanes/s
    /// * `speed` - The vehicle's speed, in m/s
    pub fn heading_on(
        &self,
        road: RoadId,
        u: f64,
        dv_dt: f64,
        speed: f64,
    ) -> Result<f64, GeometryError> {
        let road = self.road(road)?;
        let angle = road.trajectory.tangent_angle(u - self.half_vehicle_length);
        let correction = if speed.abs() < f64::EPSILON {
            0.0
        } else {
            (-(dv_dt * self.lane_width) / speed).atan()
        };
        Ok(angle + correction)
    }

    /// Finds the first turn trajectory on `road` that applies at station `u` in `lane`.
    pub fn find_alternative_trajectory(
        &self,
        road: RoadId,
        u: f64,
        lane: usize,
    ) -> Option<&AlternativeTrajectory> {
        self.roads
            .get(road)?
            .alternatives
            .iter()
            .find(|alt| alt.applies_to(u, lane))
    }

    /// The point at which vehicles from `dir` enter the map.
    pub fn entry_point(&self, dir: Direction) -> Result<Point2d, GeometryError> {
        let road = self.road(self.approach_road(dir)?)?;
        Ok(road.trajectory.sample(0.0))
    }

    /// The point at which vehicles heading towards `dir` leave the map.
    pub fn exit_point(&self, dir: Direction) -> Result<Point2d, GeometryError> {
        let road = self.road(self.exit_road(dir)?)?;
        Ok(road.trajectory.sample(road.length()))
    }

    /// The centre of the stop line on the approach from `dir`.
    pub fn stop_line_position(&self, dir: Direction) -> Result<Point2d, GeometryError> {
        let road = self.road(self.approach_road(dir)?)?;
        Ok(road.trajectory.sample(road.entry_station))
    }

    /// Whether a point lies within the square where the roads cross.
    pub fn is_within_intersection(&self, point: Point2d) -> bool {
        let extent = Interval::new(-self.half_size, self.half_size);
        extent.contains(point.x - self.center.x) && extent.contains(point.y - self.center.y)
    }
}

impl RoadSegment {
    /// Creates the through road entered from `dir`.
    fn through(id: RoadId, dir: Direction, attribs: &IntersectionAttributes) -> Self {
        let half_len = attribs.approach_length;
        let half_size = attribs.half_size();
        let inbound = dir.inbound();

        // Traffic keeps right, so the road's centre line sits right of the road axis
        let offset = rot270(inbound) * (0.5 * attribs.lanes_per_direction as f64 * attribs.lane_width);
        let start = attribs.center - inbound * half_len + offset;
        let end = attribs.center + inbound * half_len + offset;

        Self {
            id,
            direction: dir,
            kind: RoadKind::Through,
            lane_count: attribs.lanes_per_direction,
            lane_width: attribs.lane_width,
            trajectory: Path2d::line(start, end),
            entry_station: half_len - half_size,
            exit_station: half_len + half_size,
            alternatives: SmallVec::new(),
        }
    }

    /// Gets the road's ID.
    pub fn id(&self) -> RoadId {
        self.id
    }

    /// The approach this road is entered from.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> RoadKind {
        self.kind
    }

    /// Gets the length of the road in m.
    pub fn length(&self) -> f64 {
        self.trajectory.length()
    }

    /// The number of lanes.
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// The largest valid lane offset, `lane_count - 1`.
    pub fn max_lane(&self) -> f64 {
        self.lane_count.saturating_sub(1) as f64
    }

    /// The curve representing the road's centre line.
    pub fn trajectory(&self) -> &Path2d {
        &self.trajectory
    }

    /// The station at which the road enters the intersection; i.e. the stop line.
    pub fn entry_station(&self) -> f64 {
        self.entry_station
    }

    /// The station at which the road leaves the intersection.
    pub fn exit_station(&self) -> f64 {
        self.exit_station
    }

    /// The turns which may be taken from this road.
    pub fn alternatives(&self) -> &[AlternativeTrajectory] {
        &self.alternatives
    }

    /// The lateral distance of lane `v` from the centre line, positive to the right.
    pub fn lane_offset(&self, v: f64) -> f64 {
        self.lane_width * (v - 0.5 * self.max_lane())
    }

    /// The world position of the centre of lane `v` at the given station.
    pub fn lane_point(&self, station: f64, v: f64) -> Point2d {
        let centre = self.trajectory.sample(station);
        let right = rot270(heading_vector(self.trajectory.tangent_angle(station)));
        centre + right * self.lane_offset(v)
    }
}

impl AlternativeTrajectory {
    /// Whether the trajectory applies to a vehicle at station `u` in `lane`.
    pub fn applies_to(&self, u: f64, lane: usize) -> bool {
        self.stations.contains(u) && self.lanes.contains(lane)
    }

    /// Samples the turn curve at station `u` of the source road.
    pub fn sample(&self, u: f64) -> Point2d {
        self.curve.sample(u - self.stations.min)
    }

    /// Samples the turn curve, shifted `delta` metres to the right of travel.
    pub fn sample_offset(&self, u: f64, delta: f64) -> Point2d {
        let t = u - self.stations.min;
        let right = rot270(heading_vector(self.curve.tangent_angle(t)));
        self.curve.sample(t) + right * delta
    }

    /// The first station of the source road at which the turn applies.
    pub fn u_min(&self) -> f64 {
        self.stations.min
    }

    /// The last station of the source road at which the turn applies.
    pub fn u_max(&self) -> f64 {
        self.stations.max
    }

    /// The lanes of the source road the turn may be taken from.
    pub fn lanes(&self) -> Interval<usize> {
        self.lanes
    }

    /// The road vehicles switch onto.
    pub fn target(&self) -> RoadId {
        self.target
    }

    pub fn turn(&self) -> TurnType {
        self.turn
    }

    /// The lateral offset of the departure lane from the source road's centre line.
    pub fn lateral_offset(&self) -> f64 {
        self.lateral_offset
    }

    pub fn exit_lane(&self) -> usize {
        self.exit_lane
    }

    /// The turn curve, parametrised by distance since the turn started.
    pub fn curve(&self) -> &Path2d {
        &self.curve
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{angle_difference, PathPiece};
    use crate::Key;
    use assert_approx_eq::assert_approx_eq;
    use cgmath::InnerSpace;
    use std::f64::consts::PI;

    fn network() -> RoadNetwork {
        RoadNetwork::new(&IntersectionAttributes::default(), 4.5)
    }

    #[test]
    fn north_approach_lanes() {
        let net = network();
        let road = net.approach_road(Direction::North).unwrap();
        let segment = net.road(road).unwrap();
        assert_eq!(segment.lane_count(), 3);
        assert_approx_eq!(segment.length(), 240.0);
        assert_approx_eq!(segment.entry_station(), 109.5);

        // Lane 0 is nearest the centre line, higher lanes are further right (west)
        let lane0 = net.lane_point(road, 0.0, 0).unwrap();
        let lane2 = net.lane_point(road, 0.0, 2).unwrap();
        assert_approx_eq!(lane0.x, -1.75);
        assert_approx_eq!(lane0.y, 120.0);
        assert_approx_eq!(lane2.x, -8.75);
    }

    #[test]
    fn position_is_offset_by_half_a_vehicle() {
        let net = network();
        let road = net.approach_road(Direction::East).unwrap();
        let p = net.position_on(road, 10.0, 1.0).unwrap();
        // Eastern approach heads west along y = +5.25
        assert_approx_eq!(p.x, 120.0 - 7.75);
        assert_approx_eq!(p.y, 5.25);
    }

    #[test]
    fn headings_of_approaches() {
        let net = network();
        let expected = [
            (Direction::North, 1.5 * PI),
            (Direction::East, PI),
            (Direction::South, 0.5 * PI),
            (Direction::West, 0.0),
        ];
        for (dir, angle) in expected {
            let road = net.approach_road(dir).unwrap();
            assert_approx_eq!(net.heading_on(road, 50.0, 0.0, 10.0).unwrap(), angle);
        }
    }

    #[test]
    fn lane_change_tilts_heading() {
        let net = network();
        let road = net.approach_road(Direction::West).unwrap();
        let straight = net.heading_on(road, 50.0, 0.0, 10.0).unwrap();
        let changing = net.heading_on(road, 50.0, 1.0, 10.0).unwrap();
        assert_approx_eq!(changing - straight, (-0.35f64).atan());

        // No correction is possible for a stationary vehicle
        let stopped = net.heading_on(road, 50.0, 1.0, 0.0).unwrap();
        assert_approx_eq!(stopped, straight);
    }

    #[test]
    fn heading_is_continuous_along_every_road() {
        let net = network();
        for road in net.roads() {
            let mut u = 0.0;
            let mut prev = net.heading_on(road.id(), u, 0.0, 10.0).unwrap();
            while u < road.length() {
                u += 0.25;
                let next = net.heading_on(road.id(), u, 0.0, 10.0).unwrap();
                let jump = (next - prev).abs();
                assert!(
                    jump < 0.1 || (jump - 2.0 * PI).abs() < 0.1,
                    "heading jumped by {jump} at {u} on {:?}",
                    road.kind()
                );
                assert!(angle_difference(prev, next).abs() < 0.1);
                prev = next;
            }
        }
    }

    #[test]
    fn turn_trajectories_start_on_their_lane() {
        let net = network();
        for dir in Direction::ALL {
            let road = net.road(net.approach_road(dir).unwrap()).unwrap();
            assert_eq!(road.alternatives().len(), 2);
            for alt in road.alternatives() {
                let lane = alt.lanes().min;
                let expected = road.lane_point(alt.u_min(), lane as f64);
                let actual = alt.sample(alt.u_min());
                assert!((actual - expected).magnitude() < 1e-6);
                assert_approx_eq!(alt.lateral_offset(), road.lane_offset(lane as f64));

                // The destination road passes through the same point at the same station
                let target = net.road(alt.target()).unwrap();
                let on_target = target.lane_point(alt.u_min(), 0.0);
                assert!((on_target - expected).magnitude() < 1e-6);
            }
        }
    }

    #[test]
    fn turns_end_in_their_exit_lane() {
        let net = network();
        for (from, turn) in iproduct!(Direction::ALL, [TurnType::Left, TurnType::Right]) {
            let turn_road = net.road(net.turn_road(from, turn).unwrap()).unwrap();
            let end = turn_road.trajectory().end();
            let dir = turn_road.trajectory().end_dir();
            let exit = net.road(net.exit_road(from.exit_for(turn)).unwrap()).unwrap();
            let lane = net.turn_exit_lane(from, turn).unwrap();
            let origin = exit.lane_point(exit.exit_station(), lane as f64);
            let lateral = project_local(end, origin, dir, rot90(dir)).y;
            assert!(lateral.abs() < 1e-6, "{from:?} {turn:?} ends {lateral} off lane {lane}");
        }
        // The tight right-turn arc ends in the lane nearest the centre line
        assert_eq!(net.turn_exit_lane(Direction::South, TurnType::Right).unwrap(), 0);
        assert!(net.turn_exit_lane(Direction::South, TurnType::Straight).is_err());
    }

    #[test]
    fn turns_are_restricted_to_their_lanes() {
        let net = network();
        let road = net.approach_road(Direction::South).unwrap();
        let u = net.road(road).unwrap().entry_station() + 2.5;

        let left = net.find_alternative_trajectory(road, u, 0).unwrap();
        assert_eq!(left.turn(), TurnType::Left);
        let right = net.find_alternative_trajectory(road, u, 2).unwrap();
        assert_eq!(right.turn(), TurnType::Right);
        assert!(net.find_alternative_trajectory(road, u, 1).is_none());

        // Outside the station range nothing applies
        assert!(net.find_alternative_trajectory(road, 20.0, 0).is_none());
        assert!(net.find_alternative_trajectory(RoadId::null(), u, 0).is_none());
    }

    #[test]
    fn offset_samples_are_perpendicular_to_the_turn() {
        let net = network();
        let road = net.road(net.approach_road(Direction::West).unwrap()).unwrap();
        let alt = &road.alternatives()[0];
        let u = 0.5 * (alt.u_min() + alt.u_max());
        let centre = alt.sample(u);
        let shifted = alt.sample_offset(u, 1.5);
        assert_approx_eq!((shifted - centre).magnitude(), 1.5);

        // A left turn bends away from its right-hand side
        let arc = alt
            .curve()
            .pieces()
            .iter()
            .find_map(|piece| match piece {
                PathPiece::Arc(arc) => Some(*arc),
                PathPiece::Line(_) => None,
            })
            .unwrap();
        assert_approx_eq!((shifted - arc.centre()).magnitude(), arc.radius() + 1.5);
    }

    #[test]
    fn left_turn_joins_inner_exit_lane() {
        let net = network();
        let road = net.turn_road(Direction::North, TurnType::Left).unwrap();
        let segment = net.road(road).unwrap();
        assert_eq!(segment.lane_count(), 1);
        assert_eq!(segment.kind(), RoadKind::Turn(TurnType::Left));

        // Ends at the eastern edge, in lane 0 of the eastbound road
        let end = segment.trajectory().end();
        let eastbound = net.road(net.exit_road(Direction::East).unwrap()).unwrap();
        let lane0 = eastbound.lane_point(eastbound.length(), 0.0);
        assert_approx_eq!(end.x, 120.0);
        assert_approx_eq!(end.y, lane0.y);
    }

    #[test]
    fn right_turn_leaves_westwards() {
        let net = network();
        let road = net.turn_road(Direction::North, TurnType::Right).unwrap();
        let segment = net.road(road).unwrap();
        let end = segment.trajectory().end();
        assert_approx_eq!(end.x, -120.0);
        assert_approx_eq!(segment.trajectory().end_dir().x, -1.0);
        assert!(net.turn_road(Direction::North, TurnType::Straight).is_err());
    }

    #[test]
    fn intersection_queries() {
        let net = network();
        assert!(net.is_within_intersection(Point2d::new(0.0, 0.0)));
        assert!(net.is_within_intersection(Point2d::new(10.5, -10.5)));
        assert!(!net.is_within_intersection(Point2d::new(10.6, 0.0)));

        let entry = net.entry_point(Direction::South).unwrap();
        assert_approx_eq!(entry.x, 5.25);
        assert_approx_eq!(entry.y, -120.0);

        let exit = net.exit_point(Direction::West).unwrap();
        assert_approx_eq!(exit.x, -120.0);
        assert_approx_eq!(exit.y, 5.25);

        let stop = net.stop_line_position(Direction::North).unwrap();
        assert_approx_eq!(stop.y, 10.5);
        assert_eq!(net.entry_lanes(Direction::West), 0..3);
    }

    #[test]
    fn unknown_roads_are_reported() {
        let net = network();
        let missing = RoadId::null();
        assert_eq!(
            net.position_on(missing, 0.0, 0.0),
            Err(GeometryError::UnknownRoad(missing))
        );
        assert!(net.heading_on(missing, 0.0, 0.0, 1.0).is_err());
    }
}
