use super::{Control, FuturePose, Motion, PlanContext, VehicleBehavior};
use crate::error::VehicleStuckError;
use rand::RngCore;

/// The number of poses a fixed-control vehicle publishes.
const PREDICTED_POSES: usize = 5;

/// The time between published poses, in s.
const PREDICTION_INTERVAL: f64 = 2.0;

/// Drives a constant control, ignoring its surroundings.
///
/// The predicted plan is the arc traced by the control, so it is the same
/// in the vehicle's own frame on every tick.
#[derive(Clone, Debug)]
pub struct FixedControl {
    control: Control,
    plan: Vec<FuturePose>,
}

impl FixedControl {
    pub fn new(control: Control) -> Self {
        let plan = (1..=PREDICTED_POSES)
            .map(|i| {
                let time = i as f64 * PREDICTION_INTERVAL;
                FuturePose {
                    pose: control.arc(time).point_at(1.0),
                    time,
                }
            })
            .collect();
        Self { control, plan }
    }
}

impl VehicleBehavior for FixedControl {
    fn update_control(
        &mut self,
        _ctx: &PlanContext,
        _rng: &mut dyn RngCore,
    ) -> Result<Control, VehicleStuckError> {
        Ok(self.control)
    }

    fn future_poses(&self) -> &[FuturePose] {
        &self.plan
    }

    fn roll_forward(&mut self, _motion: &Motion, _dt: f64) {}
}
