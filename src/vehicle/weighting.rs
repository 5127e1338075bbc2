//! Steering densities: functions from a candidate steering angle to an
//! unnormalised acceptance weight, and rejection sampling against them.

use super::{FuturePose, PlanContext, VehicleType};
use crate::config::{GaussianParams, PdfSweepParams, WeightStrategy};
use crate::math::{bearing, heading_diff, normalize_heading, wrap_heading, LookupTable};
use crate::util::Interval;
use cgmath::prelude::*;
use rand::{Rng, RngCore};
use std::f64::consts::PI;

/// The resolution used to search a discrete profile for its largest weight.
const PROFILE_SCAN_STEP: f64 = 0.5 * PI / 180.0;

/// The weights with which each one-degree bin spreads into its neighbours.
const SMEAR_WEIGHTS: [f64; 4] = [0.8, 0.6, 0.4, 0.2];

/// Maps a steering angle, relative to the current heading, to a non-negative weight.
pub trait SteeringDensity {
    fn weight(&self, angle: f64) -> f64;

    /// An upper bound of the weight over the cone.
    fn max_weight(&self, _cone: Interval<f64>) -> f64 {
        1.0
    }
}

impl<F: Fn(f64) -> f64> SteeringDensity for F {
    fn weight(&self, angle: f64) -> f64 {
        self(angle)
    }
}

/// The mean and standard deviation of an angular Gaussian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianParameter {
    pub mean: f64,
    pub sigma: f64,
}

impl GaussianParameter {
    pub fn new(mean: f64, sigma: f64) -> Self {
        Self { mean, sigma }
    }

    /// The unscaled density at `angle`, which is 1 at the mean.
    pub fn eval(&self, angle: f64) -> f64 {
        let x = heading_diff(angle, self.mean) / self.sigma;
        (-0.5 * x * x).exp()
    }
}

/// Fuses angular Gaussians by precision-weighted averaging.
/// Means are wrapped into `[-π, π)` first. A single parameter is returned unchanged.
pub fn fuse_gaussians(params: &[GaussianParameter]) -> Option<GaussianParameter> {
    match params {
        [] => None,
        [single] => Some(*single),
        _ => {
            let (weighted_sum, precision) = params.iter().fold((0.0, 0.0), |(sum, prec), p| {
                let p_i = 1.0 / (p.sigma * p.sigma);
                (sum + wrap_heading(p.mean, -PI) * p_i, prec + p_i)
            });
            Some(GaussianParameter::new(
                weighted_sum / precision,
                (1.0 / precision).sqrt(),
            ))
        }
    }
}

/// A steering density built for one planning step.
#[derive(Clone, Debug)]
pub enum WeightDensity {
    /// A Gaussian, scaled so its largest value inside the steering cone is 1.
    Gaussian { param: GaussianParameter, scale: f64 },
    /// A 360-entry profile with one value per degree of bearing.
    Profile(LookupTable<f64>),
    /// Every angle is equally acceptable.
    Uniform,
}

impl WeightDensity {
    /// A Gaussian density restricted to `cone`.
    ///
    /// If the mean lies outside the cone, the density is rescaled by the larger of
    /// its two cone-edge values. Falls back to a uniform density if those underflow.
    pub fn gaussian(param: GaussianParameter, cone: Interval<f64>) -> Self {
        if cone.contains(param.mean) {
            return WeightDensity::Gaussian { param, scale: 1.0 };
        }
        let edge = f64::max(param.eval(cone.min), param.eval(cone.max));
        if edge > 0.0 && edge.is_finite() {
            WeightDensity::Gaussian {
                param,
                scale: 1.0 / edge,
            }
        } else {
            WeightDensity::Uniform
        }
    }

    /// A discrete density from one weight per degree, starting at a bearing of zero.
    pub fn profile(values: Vec<f64>) -> Self {
        WeightDensity::Profile(LookupTable::from_values(0.0, PI / 180.0, values))
    }

    /// Builds the density for extending the plan from `tail`, using the vehicle's road heading
    /// and the traffic it can observe.
    ///
    /// The goal direction is the road heading relative to the tail, or half of it when the
    /// strategy asks for arcs which end parallel to the road.
    pub fn for_tail(
        strategy: &WeightStrategy,
        ctx: &PlanContext,
        tail: &FuturePose,
        observation_radius: f64,
        cone: Interval<f64>,
    ) -> Self {
        let halve = match strategy {
            WeightStrategy::Gaussian(params) => params.halve_road_heading,
            WeightStrategy::PdfSweep(params) => params.halve_road_heading,
        };
        let road = heading_diff(ctx.road_heading, tail.pose.heading());
        let goal = if halve { 0.5 * road } else { road };
        let traffic = ctx
            .observed
            .iter()
            .filter(|v| v.distance() <= observation_radius)
            .map(|v| {
                let local = tail
                    .pose
                    .position_world_to_relative(v.position_at_time(tail.time))
                    .to_vec();
                (v.vehicle_type, bearing(local), local.magnitude())
            });

        match strategy {
            WeightStrategy::Gaussian(params) => {
                let gaussians: Vec<GaussianParameter> = std::iter::once(GaussianParameter::new(
                    goal,
                    params.road_sigma,
                ))
                .chain(traffic.map(|(vehicle_type, bearing, distance)| {
                    repulsion(params, vehicle_type, bearing, distance)
                }))
                .collect();
                match fuse_gaussians(&gaussians) {
                    Some(param) => Self::gaussian(param, cone),
                    None => WeightDensity::Uniform,
                }
            }
            WeightStrategy::PdfSweep(params) => {
                let samples: Vec<(f64, f64)> = traffic.map(|(_, b, d)| (b, d)).collect();
                Self::profile(pdf_sweep(&samples, goal, params))
            }
        }
    }
}

impl SteeringDensity for WeightDensity {
    fn weight(&self, angle: f64) -> f64 {
        match self {
            WeightDensity::Gaussian { param, scale } => param.eval(angle) * scale,
            WeightDensity::Profile(lut) => *lut.sample(normalize_heading(angle)),
            WeightDensity::Uniform => 1.0,
        }
    }

    fn max_weight(&self, cone: Interval<f64>) -> f64 {
        match self {
            WeightDensity::Profile(_) => {
                let steps = (cone.length() / PROFILE_SCAN_STEP).ceil() as usize;
                (0..=steps)
                    .map(|i| self.weight(f64::min(cone.min + i as f64 * PROFILE_SCAN_STEP, cone.max)))
                    .fold(0.0, f64::max)
            }
            _ => 1.0,
        }
    }
}

/// A Gaussian pointing away from another vehicle, narrower the closer it is.
fn repulsion(
    params: &GaussianParams,
    vehicle_type: VehicleType,
    bearing: f64,
    distance: f64,
) -> GaussianParameter {
    let factor = match vehicle_type {
        VehicleType::Emergency => params.emergency_avoid_sigma,
        VehicleType::Civilian => params.civilian_avoid_sigma,
    };
    GaussianParameter::new(
        wrap_heading(bearing + PI, -PI),
        f64::max(distance, 1e-3) * factor,
    )
}

/// Builds a 360-entry steering profile from the bearings and distances of nearby traffic.
///
/// Directions with close traffic get low weights; the result is then shaped by a triangular
/// profile peaking at `goal` and sharpened by `params.power`. The largest entry is 1
/// unless every entry is 0.
pub fn pdf_sweep(samples: &[(f64, f64)], goal: f64, params: &PdfSweepParams) -> Vec<f64> {
    let bin_degrees = params.bin_degrees.clamp(1, 360);
    let num_bins = 360 / bin_degrees;

    let (min_d, max_d) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, d)| {
            (lo.min(*d), hi.max(*d))
        });
    let mut bins = vec![0.0; num_bins];
    for (b, d) in samples {
        let closeness = if max_d > min_d {
            1.0 - (d - min_d) / (max_d - min_d)
        } else {
            1.0
        };
        let idx = (whole_degrees(*b) / bin_degrees) % num_bins;
        bins[idx] += closeness;
    }
    let total: f64 = bins.iter().sum();
    if total > 0.0 {
        bins.iter_mut().for_each(|v| *v /= total);
    }
    scale_by_max(&mut bins);
    bins.iter_mut().for_each(|v| *v = 1.0 - *v);

    let degrees: Vec<f64> = (0..360).map(|j| bins[(j / bin_degrees) % num_bins]).collect();
    let mut values: Vec<f64> = (0..360)
        .map(|j| {
            degrees[j]
                + SMEAR_WEIGHTS
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * (degrees[(j + 360 - k - 1) % 360] + degrees[(j + k + 1) % 360]))
                    .sum::<f64>()
        })
        .collect();
    scale_by_max(&mut values);

    let (f, b) = (params.forward_weight, params.backward_weight);
    let peak = whole_degrees(goal);
    for (j, v) in values.iter_mut().enumerate() {
        let offset = (j + 360 - peak) % 360;
        let from_peak = usize::min(offset, 360 - offset) as f64;
        *v *= f - from_peak * (f - b) / 180.0;
    }
    scale_by_max(&mut values);
    values.iter_mut().for_each(|v| *v = v.powi(params.power));
    scale_by_max(&mut values);
    values
}

/// The bearing in whole degrees, rounded down, in `0..360`.
fn whole_degrees(angle: f64) -> usize {
    (normalize_heading(angle).to_degrees() + 1e-9).floor() as usize % 360
}

fn scale_by_max(values: &mut [f64]) {
    let max = values.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        values.iter_mut().for_each(|v| *v /= max);
    }
}

/// Draws a steering angle from `cone` by rejection sampling against `density`.
///
/// Returns `None` if no draw is accepted within `max_draws` attempts.
pub fn pick_angle<D: SteeringDensity + ?Sized>(
    density: &D,
    cone: Interval<f64>,
    max_draws: usize,
    rng: &mut dyn RngCore,
) -> Option<f64> {
    let max_weight = density.max_weight(cone);
    (0..max_draws).find_map(|_| {
        let angle = cone.lerp(rng.gen());
        (rng.gen::<f64>() * max_weight < density.weight(angle)).then_some(angle)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::from_seed(*b"Vegemite sandwhich is not fun...")
    }

    #[test]
    fn single_gaussian_is_unchanged() {
        let param = GaussianParameter::new(4.0, 0.3);
        assert_eq!(fuse_gaussians(&[param]), Some(param));
        assert_eq!(fuse_gaussians(&[]), None);
    }

    #[test]
    fn fusion_is_precision_weighted() {
        let fused = fuse_gaussians(&[
            GaussianParameter::new(0.0, 1.0),
            GaussianParameter::new(0.3, 0.5),
        ])
        .unwrap();
        // Precisions 1 and 4
        assert_approx_eq!(fused.mean, 0.24);
        assert_approx_eq!(fused.sigma, (0.2f64).sqrt());

        // Means are wrapped before averaging
        let fused = fuse_gaussians(&[
            GaussianParameter::new(2.0 * PI - 0.2, 0.1),
            GaussianParameter::new(0.2, 0.1),
        ])
        .unwrap();
        assert_approx_eq!(fused.mean, 0.0);
    }

    #[test]
    fn gaussian_outside_cone_peaks_at_edge() {
        let cone = Interval::new(-0.5, 0.5);
        let density = WeightDensity::gaussian(GaussianParameter::new(1.0, 0.2), cone);
        assert_approx_eq!(density.weight(0.5), 1.0);
        assert!(density.weight(-0.5) < density.weight(0.0));

        let inside = WeightDensity::gaussian(GaussianParameter::new(0.1, 0.2), cone);
        assert_approx_eq!(inside.weight(0.1), 1.0);

        let hopeless = WeightDensity::gaussian(GaussianParameter::new(3.0, 0.01), cone);
        assert!(matches!(hopeless, WeightDensity::Uniform));
    }

    #[test]
    fn picked_angles_stay_in_cone() {
        let mut rng = rng();
        let cone = Interval::new(-0.4, 0.7);
        let density = |a: f64| if a > 0.0 { 1.0 } else { 0.25 };
        let mut positive = 0;
        for _i in 0..2000 {
            let angle = pick_angle(&density, cone, 100, &mut rng).unwrap();
            assert!(cone.contains(angle));
            if angle > 0.0 {
                positive += 1;
            }
        }
        // Expected share of positive angles is 0.7 / (0.7 + 0.1)
        assert!(positive > 1650 && positive < 1850, "{}", positive);
    }

    #[test]
    fn zero_density_gives_up() {
        let mut rng = rng();
        let cone = Interval::new(-0.5, 0.5);
        assert_eq!(pick_angle(&|_: f64| 0.0, cone, 50, &mut rng), None);
    }

    #[test]
    fn sweep_without_traffic_points_at_goal() {
        let values = pdf_sweep(&[], 0.0, &PdfSweepParams::default());
        assert_eq!(values.len(), 360);
        assert_approx_eq!(values[0], 1.0);
        assert_approx_eq!(values[180], 0.0);
        assert!(values[10] < values[1]);
        assert_approx_eq!(values[10], values[350]);

        let values = pdf_sweep(&[], 0.5 * PI, &PdfSweepParams::default());
        assert_approx_eq!(values[90], 1.0);
    }

    #[test]
    fn sweep_avoids_traffic() {
        let params = PdfSweepParams {
            power: 1,
            ..Default::default()
        };
        // Close traffic dead ahead, distant traffic to the right
        let values = pdf_sweep(&[(0.05, 5.0), (0.5 * PI, 40.0)], 0.0, &params);
        let peak = values
            .iter()
            .enumerate()
            .fold((0, 0.0), |best, (i, v)| if *v > best.1 { (i, *v) } else { best });
        assert!(peak.0 != 0 && peak.0 < 90 || peak.0 > 270, "peak at {}", peak.0);
        assert!(values[0] < values[20]);
        assert!(values[0] < values[340]);
        assert_approx_eq!(peak.1, 1.0);
    }

    #[test]
    fn road_gaussian_is_centred_on_road_heading() {
        let footprint = crate::vehicle::Footprint::new(2.0, 3.0, 0.2);
        let ctx = PlanContext {
            pose: crate::math::Pose::zero(),
            road_heading: 0.4,
            footprint: &footprint,
            obstacles: &crate::vehicle::NoObstacles,
            observed: &[],
        };
        let cone = Interval::new(-0.5, 0.5);
        let tail = FuturePose::origin();

        let params = GaussianParams::default();
        let density =
            WeightDensity::for_tail(&WeightStrategy::Gaussian(params), &ctx, &tail, 50.0, cone);
        assert_approx_eq!(density.weight(0.4), 1.0);
        assert!(density.weight(0.2) < 1.0);

        let halved = GaussianParams {
            halve_road_heading: true,
            ..params
        };
        let density =
            WeightDensity::for_tail(&WeightStrategy::Gaussian(halved), &ctx, &tail, 50.0, cone);
        assert_approx_eq!(density.weight(0.2), 1.0);

        // Road heading 0.4 rad lies in the 22nd one-degree bin
        let sweep = WeightStrategy::PdfSweep(PdfSweepParams::default());
        let density = WeightDensity::for_tail(&sweep, &ctx, &tail, 50.0, cone);
        assert_approx_eq!(density.weight(0.4), 1.0);
    }

    #[test]
    fn profile_max_weight_scans_cone() {
        let values = (0..360).map(|i| if i == 20 { 1.0 } else { 0.1 }).collect();
        let density = WeightDensity::profile(values);
        let cone = Interval::new(-0.5, 0.5);
        assert_approx_eq!(density.max_weight(cone), 1.0);
        assert_approx_eq!(density.weight(-0.1), 0.1);
        assert_approx_eq!(density.max_weight(Interval::new(-0.5, 0.2)), 0.1);
    }
}
