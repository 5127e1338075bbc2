//! Tests that simulate vehicles planning around obstacles and each other.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::PI;
use traffic_planner::{
    math::{from_heading, heading_diff, Point2d, Pose, Vector2d},
    vehicle::{
        Footprint, FuturePose, PlanContext, Planner, VehicleBehavior, TEST_POINT_SPACING,
    },
    BehaviorConfig, Control, GaussianParams, NoObstacles, ObstacleMap, PlannerConfig, SimConfig,
    SimError, Simulation, StuckPolicy, VehicleAttributes, VehicleStuckError, VehicleType,
    WeightStrategy,
};

fn planner_vehicle(position: Point2d, heading: f64, config: PlannerConfig) -> VehicleAttributes {
    VehicleAttributes {
        vehicle_type: VehicleType::Emergency,
        width: 2.0,
        length: 3.0,
        position,
        heading,
        velocity: config.speed * from_heading(heading),
        road_heading: 0.0,
        behavior: BehaviorConfig::Planner(config),
    }
}

fn fixed_vehicle(position: Point2d, heading: f64, control: Control) -> VehicleAttributes {
    VehicleAttributes {
        vehicle_type: VehicleType::Civilian,
        width: 2.0,
        length: 3.0,
        position,
        heading,
        velocity: control.speed * from_heading(heading),
        road_heading: heading,
        behavior: BehaviorConfig::FixedControl(control),
    }
}

fn sim_config(seed: u64) -> SimConfig {
    SimConfig {
        seed,
        stuck_policy: StuckPolicy::Abort,
    }
}

/// An unobstructed vehicle keeps every planned pose pointing along the road.
#[test]
fn open_road_stays_on_heading() {
    let config = PlannerConfig {
        weighting: WeightStrategy::Gaussian(GaussianParams {
            road_sigma: PI / 36.0,
            ..Default::default()
        }),
        ..Default::default()
    };
    let cone_angle = config.cone_angle;
    let mut sim = Simulation::new(sim_config(1), NoObstacles);
    let veh = sim
        .add_vehicle(&planner_vehicle(Point2d::new(0.0, 0.0), 0.0, config))
        .unwrap();

    let mut y = 0.0;
    for _ in 0..40 {
        sim.step(0.5).unwrap();
        let vehicle = sim.get_vehicle(veh).unwrap();
        assert!(vehicle.position().y > y);
        y = vehicle.position().y;
        assert!(heading_diff(vehicle.heading(), 0.0).abs() < cone_angle);
        for fp in vehicle.future_poses() {
            let world_heading = vehicle.heading() + fp.pose.heading();
            assert!(
                heading_diff(world_heading, 0.0).abs() < cone_angle,
                "planned heading {} strays from the road",
                world_heading
            );
        }
    }
    assert!(y > 80.0);
}

/// A band across the road either forces rejected proposals or leaves the vehicle stuck.
#[test]
fn band_ahead_costs_proposals() {
    let band = |p: Point2d| p.y >= 15.0 && p.y <= 17.0;
    let mut sim = Simulation::new(sim_config(2), band);
    let veh = sim
        .add_vehicle(&planner_vehicle(
            Point2d::new(0.0, 0.0),
            0.0,
            PlannerConfig::default(),
        ))
        .unwrap();

    match sim.step(0.5) {
        Ok(_) => assert!(sim.get_vehicle(veh).unwrap().stats().wasted_proposals > 0),
        Err(SimError::VehicleStuck { vehicle, source }) => {
            assert_eq!(vehicle, veh);
            assert!(matches!(source, VehicleStuckError::PlanningExhausted { .. }));
        }
        Err(err) => panic!("unexpected error: {}", err),
    }
}

/// Two planning vehicles on crossing courses avoid each other through their published plans.
/// A vehicle which runs out of planning budget is removed rather than allowed to collide.
#[test]
fn crossing_planners_do_not_collide() {
    for seed in 0..6 {
        let config = SimConfig {
            seed,
            stuck_policy: StuckPolicy::RemoveVehicle,
        };
        let mut sim = Simulation::new(config, NoObstacles);
        let north = sim
            .add_vehicle(&planner_vehicle(
                Point2d::new(0.0, 0.0),
                0.0,
                PlannerConfig::default(),
            ))
            .unwrap();
        let mut eastbound = planner_vehicle(
            Point2d::new(-30.0, 30.0),
            0.5 * PI,
            PlannerConfig::default(),
        );
        eastbound.road_heading = 0.5 * PI;
        let east = sim.add_vehicle(&eastbound).unwrap();

        for _ in 0..24 {
            let report = sim.step(0.5).unwrap();
            for (_, err) in &report.removed {
                assert!(
                    matches!(err, VehicleStuckError::PlanningExhausted { .. }),
                    "seed {}: {}",
                    seed,
                    err
                );
            }
            if sim.get_vehicle(north).is_some() && sim.get_vehicle(east).is_some() {
                assert!(
                    !sim.vehicles_overlap(north, east).unwrap(),
                    "seed {}: overlap at t={}",
                    seed,
                    sim.time()
                );
            }
        }
    }
}

/// A vehicle starts with the velocity it was given.
#[test]
fn initial_velocity_is_observable() {
    let mut sim = Simulation::new(sim_config(8), NoObstacles);
    let mut attributes = fixed_vehicle(Point2d::new(0.0, 0.0), 0.5 * PI, Control::straight(3.0));
    attributes.velocity = Vector2d::new(3.0, 0.0);
    let veh = sim.add_vehicle(&attributes).unwrap();
    let velocity = sim.get_vehicle(veh).unwrap().velocity();
    assert_eq!(velocity, Vector2d::new(3.0, 0.0));
}

/// Two vehicles driving towards each other never overlap.
#[test]
fn converging_vehicles_do_not_collide() {
    let mut sim = Simulation::new(sim_config(3), NoObstacles);
    let emergency = sim
        .add_vehicle(&planner_vehicle(
            Point2d::new(0.0, 0.0),
            0.0,
            PlannerConfig::default(),
        ))
        .unwrap();
    let civilian = sim
        .add_vehicle(&fixed_vehicle(
            Point2d::new(0.0, 45.0),
            PI,
            Control::straight(2.0),
        ))
        .unwrap();

    for _ in 0..20 {
        sim.step(0.5).unwrap();
        assert!(!sim.vehicles_overlap(emergency, civilian).unwrap());
    }
    // They have passed each other
    let e = sim.get_vehicle(emergency).unwrap().position();
    let c = sim.get_vehicle(civilian).unwrap().position();
    assert!(e.y > c.y);
}

/// A density which only favours colliding arcs exhausts every budget and fails.
#[test]
fn hopeless_density_exhausts_budgets() {
    let footprint = Footprint::new(2.0, 3.0, TEST_POINT_SPACING);
    let wall = |p: Point2d| p.y >= 4.0;
    let ctx = PlanContext {
        pose: Pose::zero(),
        road_heading: 0.0,
        footprint: &footprint,
        obstacles: &wall,
        observed: &[],
    };
    let config = PlannerConfig::default();
    let expected = Err(VehicleStuckError::PlanningExhausted {
        wasted: config.clear_budget * config.empty_plan_threshold + config.empty_plan_threshold,
        backtracks: 0,
        clears: config.clear_budget,
    });
    let mut rng = StdRng::from_seed(*b"Vegemite sandwhich is not fun...");

    let mut planner = Planner::new(config.clone());
    let narrow = |_: &FuturePose| |a: f64| if a > 0.1 && a < 0.2 { 1.0 } else { 0.0 };
    let result = planner.add_poses_with(&ctx, &mut rng, narrow);
    assert_eq!(result, expected);
    assert!(planner.future_poses().is_empty());

    let mut planner = Planner::new(config);
    let result = planner.add_poses_with(&ctx, &mut rng, |_: &FuturePose| |_: f64| 0.0);
    assert_eq!(result, expected);
}

/// Vehicles plan against the state from before the step, whatever order they move in.
#[test]
fn planning_uses_pre_step_snapshot() {
    let planner = planner_vehicle(Point2d::new(0.0, 0.0), 0.0, PlannerConfig::default());
    let oncoming = fixed_vehicle(Point2d::new(4.0, 20.0), PI, Control::straight(2.0));

    let mut first = Simulation::new(sim_config(4), NoObstacles);
    let a = first.add_vehicle(&oncoming).unwrap();
    let b = first.add_vehicle(&planner).unwrap();
    assert_eq!(first.order(), &[a, b]);

    let mut second = Simulation::new(sim_config(4), NoObstacles);
    let d = second.add_vehicle(&planner).unwrap();
    let c = second.add_vehicle(&oncoming).unwrap();
    assert_eq!(second.order(), &[d, c]);

    for _ in 0..5 {
        first.step(0.5).unwrap();
        second.step(0.5).unwrap();
        let p1 = first.get_vehicle(b).unwrap().pose();
        let p2 = second.get_vehicle(d).unwrap().pose();
        assert_eq!(p1, p2);
        let q1 = first.get_vehicle(a).unwrap().pose();
        let q2 = second.get_vehicle(c).unwrap().pose();
        assert_eq!(q1, q2);
    }
    let ids: Vec<_> = first.iter_vehicles().map(|v| v.id()).collect();
    assert_eq!(ids, vec![a, b]);
}

/// A vehicle starting inside an obstacle is stuck before it plans.
#[test]
fn stuck_vehicle_policies() {
    let rock = |p: Point2d| p.x > 20.0 && p.x < 30.0 && p.y > -5.0 && p.y < 5.0;
    let stuck = planner_vehicle(Point2d::new(25.0, 0.0), 0.0, PlannerConfig::default());
    let free = planner_vehicle(Point2d::new(-25.0, 0.0), 0.0, PlannerConfig::default());

    let mut sim = Simulation::new(sim_config(5), rock);
    let stuck_id = sim.add_vehicle(&stuck).unwrap();
    sim.add_vehicle(&free).unwrap();
    assert_eq!(
        sim.step(0.5).unwrap_err(),
        SimError::VehicleStuck {
            vehicle: stuck_id,
            source: VehicleStuckError::AlreadyCollided,
        }
    );
    assert_eq!(sim.frame(), 0);

    let mut sim = Simulation::new(
        SimConfig {
            seed: 5,
            stuck_policy: StuckPolicy::RemoveVehicle,
        },
        rock,
    );
    let stuck_id = sim.add_vehicle(&stuck).unwrap();
    let free_id = sim.add_vehicle(&free).unwrap();
    let report = sim.step(0.5).unwrap();
    assert_eq!(report.removed, vec![(stuck_id, VehicleStuckError::AlreadyCollided)]);
    assert_eq!(sim.order(), &[free_id]);
    assert!(sim.get_vehicle(stuck_id).is_none());
    assert_eq!(sim.frame(), 1);
    assert_eq!(
        sim.remove_vehicle(stuck_id),
        Err(SimError::UnknownVehicle(stuck_id))
    );
}

#[test]
fn invalid_vehicles_are_rejected() {
    let mut sim = Simulation::new(sim_config(6), NoObstacles);
    let slow = PlannerConfig {
        speed: 0.0,
        ..Default::default()
    };
    let result = sim.add_vehicle(&planner_vehicle(Point2d::new(0.0, 0.0), 0.0, slow));
    assert!(matches!(result, Err(SimError::InvalidConfig(_))));

    let mut flat = fixed_vehicle(Point2d::new(0.0, 0.0), 0.0, Control::straight(1.0));
    flat.width = 0.0;
    assert!(matches!(sim.add_vehicle(&flat), Err(SimError::InvalidConfig(_))));
    assert!(sim.order().is_empty());
}

/// A road which runs east everywhere.
struct EastboundRoad;

impl ObstacleMap for EastboundRoad {
    fn is_obstacle(&self, _point: Point2d) -> bool {
        false
    }

    fn road_heading(&self, _point: Point2d) -> Option<f64> {
        Some(0.5 * PI)
    }
}

/// A road heading supplied by the map takes precedence over the vehicle's own.
#[test]
fn vehicle_turns_onto_map_road() {
    let config = PlannerConfig {
        weighting: WeightStrategy::Gaussian(GaussianParams {
            halve_road_heading: true,
            ..Default::default()
        }),
        ..Default::default()
    };
    let mut sim = Simulation::new(sim_config(7), EastboundRoad);
    let veh = sim
        .add_vehicle(&planner_vehicle(Point2d::new(0.0, 0.0), 0.0, config))
        .unwrap();
    for _ in 0..30 {
        sim.step(0.5).unwrap();
    }
    let vehicle = sim.get_vehicle(veh).unwrap();
    assert!(heading_diff(vehicle.heading(), 0.5 * PI).abs() < PI / 8.0);
    assert!(vehicle.position().x > 30.0);
}
