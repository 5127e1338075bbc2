use super::weighting::{pick_angle, SteeringDensity, WeightDensity};
use super::{roll_plan, Control, FuturePose, Motion, Plan, PlanContext, VehicleBehavior};
use crate::config::PlannerConfig;
use crate::debug::{debug_circle, debug_line};
use crate::error::VehicleStuckError;
use crate::math::{from_heading, heading_diff, make_arc, Arc, Point2d, Pose};
use crate::util::Interval;
use cgmath::prelude::*;
use log::{debug, trace};
use rand::RngCore;

/// Counters describing how hard a planner has had to work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerStats {
    /// Proposals rejected because they collided, or because no angle was accepted.
    pub wasted_proposals: usize,
    /// Times the last queued pose was dropped.
    pub backtracks: usize,
    /// Times the whole plan was discarded while extending it.
    pub clears: usize,
    /// Poses appended to the plan.
    pub poses_accepted: usize,
    /// Times the plan was discarded while pruning.
    pub plans_invalidated: usize,
}

/// A sampling planner which keeps a short queue of collision-free arcs ahead of the vehicle.
#[derive(Clone, Debug)]
pub struct Planner {
    config: PlannerConfig,
    plan: Plan,
    stats: PlannerStats,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            plan: Plan::new(),
            stats: PlannerStats::default(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// The steering cone, centred on the current heading.
    pub fn cone(&self) -> Interval<f64> {
        Interval::disc(0.0, 0.5 * self.config.cone_angle)
    }

    /// Drops queued poses which are no longer valid.
    ///
    /// The whole plan is discarded if the arc to its first pose collides, or if that arc
    /// no longer arrives with the queued heading. Otherwise the first pose is popped
    /// once the vehicle is close enough to consider it reached, and the pose behind it
    /// is checked in turn.
    pub fn clean_future_poses(&mut self, ctx: &PlanContext) {
        while let Some(first) = self.plan.first().copied() {
            let arc = make_arc(&Pose::zero(), first.pose.position);
            if self.arc_collides(ctx, &FuturePose::origin(), &arc) {
                debug!("Next arc collides, discarding {} planned poses", self.plan.len());
                self.plan.clear();
                self.stats.plans_invalidated += 1;
            } else if heading_diff(arc.end_heading(), first.pose.heading()).abs()
                > self.config.heading_tolerance
            {
                debug!(
                    "Arrival heading {:.3} does not match planned {:.3}, discarding plan",
                    arc.end_heading(),
                    first.pose.heading()
                );
                self.plan.clear();
                self.stats.plans_invalidated += 1;
            } else if self.is_reached(&first) {
                trace!("Reached {:?}", first.pose);
                self.plan.remove(0);
                continue;
            }
            break;
        }
    }

    /// Pops queued poses which the vehicle is close enough to consider reached.
    fn drop_reached_poses(&mut self) {
        while self.plan.first().map_or(false, |first| self.is_reached(first)) {
            self.plan.remove(0);
        }
    }

    fn is_reached(&self, pose: &FuturePose) -> bool {
        pose.pose.position.to_vec().magnitude() < self.config.speed * self.config.remove_pose_time
    }

    /// Extends the plan until it holds the configured number of poses,
    /// using the configured steering density.
    pub fn add_poses(
        &mut self,
        ctx: &PlanContext,
        rng: &mut dyn RngCore,
    ) -> Result<(), VehicleStuckError> {
        let strategy = self.config.weighting;
        let radius = self.config.observation_radius;
        let cone = self.cone();
        self.add_poses_with(ctx, rng, |tail| {
            WeightDensity::for_tail(&strategy, ctx, tail, radius, cone)
        })
    }

    /// Extends the plan until it holds the configured number of poses,
    /// drawing steering angles from the density returned by `density_at` for the current tail.
    ///
    /// Rejected proposals escalate from resampling, to dropping the last queued pose, to
    /// discarding the whole plan. Fails once the backtrack and clear budgets are spent.
    pub fn add_poses_with<D, F>(
        &mut self,
        ctx: &PlanContext,
        rng: &mut dyn RngCore,
        density_at: F,
    ) -> Result<(), VehicleStuckError>
    where
        D: SteeringDensity,
        F: Fn(&FuturePose) -> D,
    {
        let cone = self.cone();
        let mut collisions = 0;
        let mut wasted = 0;
        let mut backtracks = 0;
        let mut clears = 0;

        while self.plan.len() < self.config.poses_in_plan {
            let tail = self.plan.last().copied().unwrap_or_else(FuturePose::origin);
            let density = density_at(&tail);
            let proposal = pick_angle(&density, cone, self.config.max_draws, rng)
                .map(|angle| self.propose(&tail, angle))
                .filter(|(arc, _)| !self.arc_collides(ctx, &tail, arc));

            if let Some((arc, next)) = proposal {
                trace!("Accepted {:?} at t={:.2}", next.pose, next.time);
                debug_arc(ctx, &arc, &tail, &next);
                self.plan.push(next);
                self.stats.poses_accepted += 1;
                collisions = 0;
                continue;
            }

            collisions += 1;
            wasted += 1;
            self.stats.wasted_proposals += 1;

            if collisions < self.config.resample_threshold {
                continue;
            }
            if self.plan.is_empty() && collisions < self.config.empty_plan_threshold {
                continue;
            }
            if !self.plan.is_empty() && backtracks < self.config.backtrack_budget {
                self.plan.pop();
                backtracks += 1;
                self.stats.backtracks += 1;
                collisions = 0;
                debug!("Backtracking, {} poses left", self.plan.len());
            } else if clears < self.config.clear_budget {
                self.plan.clear();
                clears += 1;
                self.stats.clears += 1;
                collisions = 0;
                debug!("Clearing plan ({} of {})", clears, self.config.clear_budget);
            } else {
                debug!("Planning exhausted after {} rejected proposals", wasted);
                return Err(VehicleStuckError::PlanningExhausted {
                    wasted,
                    backtracks,
                    clears,
                });
            }
        }
        Ok(())
    }

    /// The arc and pose reached by steering `angle` away from `tail`'s heading.
    fn propose(&self, tail: &FuturePose, angle: f64) -> (Arc, FuturePose) {
        let offset = self.config.distance_between_poses * from_heading(angle);
        let goal = tail.pose.position_relative_to_world(Point2d::from_vec(offset));
        let arc = make_arc(&tail.pose, goal);
        let next = FuturePose {
            pose: Pose::new(goal, arc.end_heading()),
            time: tail.time + arc.length() / self.config.speed,
        };
        (arc, next)
    }

    fn arc_collides(&self, ctx: &PlanContext, start: &FuturePose, arc: &Arc) -> bool {
        let duration = arc.length() / self.config.speed;
        ctx.arc_will_collide(
            arc,
            Interval::new(start.time, start.time + duration),
            self.config.arc_split_length,
        )
    }
}

impl VehicleBehavior for Planner {
    fn update_control(
        &mut self,
        ctx: &PlanContext,
        rng: &mut dyn RngCore,
    ) -> Result<Control, VehicleStuckError> {
        if ctx.already_collided() {
            return Err(VehicleStuckError::AlreadyCollided);
        }
        self.clean_future_poses(ctx);
        self.add_poses(ctx, rng)?;
        Ok(match self.plan.first() {
            Some(first) => Control::towards(first.pose.position, self.config.speed),
            None => Control::straight(self.config.speed),
        })
    }

    fn future_poses(&self) -> &[FuturePose] {
        &self.plan
    }

    /// Shifts the plan into the new frame, then drops the poses already reached, so that
    /// the plan other vehicles observe next tick starts with the pose being steered towards.
    fn roll_forward(&mut self, motion: &Motion, dt: f64) {
        roll_plan(&mut self.plan, motion, dt);
        self.drop_reached_poses();
    }

    fn stats(&self) -> PlannerStats {
        self.stats
    }
}

/// Records an accepted arc in world space.
fn debug_arc(ctx: &PlanContext, arc: &Arc, from: &FuturePose, to: &FuturePose) {
    debug_line(
        "planned pose",
        ctx.pose.position_relative_to_world(from.pose.position),
        ctx.pose.position_relative_to_world(to.pose.position),
    );
    if let Some(circle) = arc.circle() {
        debug_circle(
            "turning circle",
            ctx.pose.position_relative_to_world(circle.center),
            circle.radius,
        );
    }
}
