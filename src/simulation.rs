use crate::config::{SimConfig, StuckPolicy};
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::error::{SimError, SimResult, VehicleStuckError};
use crate::vehicle::{Motion, ObstacleMap, Snapshot, Vehicle, VehicleAttributes};
use crate::{VehicleId, VehicleSet};
use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A continuous-space traffic simulation.
pub struct Simulation {
    /// Simulation-wide settings.
    config: SimConfig,
    /// The static environment.
    obstacles: Box<dyn ObstacleMap>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The order in which vehicles plan and move each tick.
    order: Vec<VehicleId>,
    /// The random stream shared by all planners.
    rng: StdRng,
    /// The current frame of simulation.
    frame: usize,
    /// The simulated time in s.
    time: f64,
    /// Debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

/// What happened during a step besides ordinary movement.
#[derive(Clone, Debug, Default)]
pub struct StepReport {
    /// Vehicles removed because they could not plan, with the reason.
    pub removed: Vec<(VehicleId, VehicleStuckError)>,
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new(config: SimConfig, obstacles: impl ObstacleMap + 'static) -> Self {
        Self {
            config,
            obstacles: Box::new(obstacles),
            vehicles: VehicleSet::default(),
            order: vec![],
            rng: StdRng::seed_from_u64(config.seed),
            frame: 0,
            time: 0.0,
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        }
    }

    /// Adds a vehicle to the simulation. It plans and moves after every vehicle added before it.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes) -> SimResult<VehicleId> {
        let id = self
            .vehicles
            .try_insert_with_key(|id| Vehicle::new(id, attributes))?;
        self.order.push(id);
        Ok(id)
    }

    /// Removes a vehicle from the simulation.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> SimResult<()> {
        self.vehicles.remove(id).ok_or(SimError::UnknownVehicle(id))?;
        self.order.retain(|other| *other != id);
        Ok(())
    }

    /// Sets a vehicle's preferred direction of travel.
    /// Ignored where the obstacle map defines its own road heading.
    pub fn set_road_heading(&mut self, id: VehicleId, heading: f64) -> SimResult<()> {
        let vehicle = self
            .vehicles
            .get_mut(id)
            .ok_or(SimError::UnknownVehicle(id))?;
        vehicle.set_road_heading(heading);
        Ok(())
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Every vehicle observes the state from before the step. Vehicles then plan and move
    /// one at a time, in the order they were added, after which each moved vehicle's plan
    /// is shifted into its new frame.
    ///
    /// Under [StuckPolicy::Abort] a stuck vehicle ends the step early with an error;
    /// the vehicles before it have already moved.
    pub fn step(&mut self, dt: f64) -> SimResult<StepReport> {
        let snapshot = Snapshot::capture(self.order.iter().map(|id| &self.vehicles[*id]));
        let mut report = StepReport::default();
        let mut moved: Vec<(VehicleId, Motion)> = Vec::with_capacity(self.order.len());

        for id in self.order.clone() {
            let observed = snapshot.observed_by(id);
            let vehicle = &mut self.vehicles[id];
            let road_heading = self
                .obstacles
                .road_heading(vehicle.position())
                .unwrap_or_else(|| vehicle.road_heading());
            match vehicle.plan(self.obstacles.as_ref(), road_heading, &observed, &mut self.rng) {
                Ok(control) => {
                    let motion = vehicle.integrate(&control, dt);
                    moved.push((id, motion));
                }
                Err(err) => match self.config.stuck_policy {
                    StuckPolicy::Abort => {
                        self.roll_plans(&moved, dt);
                        return Err(SimError::VehicleStuck {
                            vehicle: id,
                            source: err,
                        });
                    }
                    StuckPolicy::RemoveVehicle => {
                        warn!("Removing vehicle {:?}: {}", id, err);
                        self.remove_vehicle(id)?;
                        report.removed.push((id, err));
                    }
                },
            }
        }

        self.roll_plans(&moved, dt);
        self.frame += 1;
        self.time += dt;

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }

        Ok(report)
    }

    fn roll_plans(&mut self, moved: &[(VehicleId, Motion)], dt: f64) {
        for (id, motion) in moved {
            if let Some(vehicle) = self.vehicles.get_mut(*id) {
                vehicle.roll_forward(motion, dt);
            }
        }
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Gets the simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The order in which vehicles plan and move.
    pub fn order(&self) -> &[VehicleId] {
        &self.order
    }

    /// Returns an iterator over all the vehicles in the simulation, in planning order.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.order.iter().map(|id| &self.vehicles[*id])
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Whether two vehicles' footprints currently overlap.
    pub fn vehicles_overlap(&self, a: VehicleId, b: VehicleId) -> SimResult<bool> {
        let a = self.vehicles.get(a).ok_or(SimError::UnknownVehicle(a))?;
        let b = self.vehicles.get(b).ok_or(SimError::UnknownVehicle(b))?;
        Ok(a.overlaps(b))
    }

    /// Gets the debugging information for the previously simulated frame as JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&self) -> serde_json::Value {
        self.debug.clone()
    }
}
