// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains functions for limiting joint position increments against velocity
//! and acceleration bounds.

use nalgebra::DVector;

use crate::model::VariableBounds;

/// Clips a vector of joint position increments so no joint exceeds its
/// velocity or acceleration bounds over one period.
///
/// The acceleration clip runs first, then the velocity clip on the result.
/// The acceleration is not re-checked afterwards, so a velocity clip can leave
/// a residual acceleration overshoot.
///
/// # Arguments
/// * `delta_theta` - Per-joint position increments over one period.
/// * `bounds` - Per-joint bounds, same ordering as `delta_theta`.
/// * `prev_velocity` - Velocities commanded on the previous tick.
/// * `period` - The publish period in seconds.
pub fn limit_accel_vel(
    delta_theta: &mut DVector<f64>,
    bounds: &[VariableBounds],
    prev_velocity: &DVector<f64>,
    period: f64,
) {
    for i in 0..delta_theta.len() {
        limit_single_accel_vel(&bounds[i], &mut delta_theta[i], prev_velocity[i], period);
    }
}

/// Clips one joint's position increment, acceleration bound first, velocity
/// bound second.
pub fn limit_single_accel_vel(
    bound: &VariableBounds,
    delta: &mut f64,
    prev_velocity: f64,
    period: f64,
) {
    if bound.acceleration_bounded {
        let velocity = *delta / period;
        let acceleration = (velocity - prev_velocity) / period;

        let acceleration_limit = if acceleration < bound.min_acceleration {
            Some(bound.min_acceleration)
        } else if acceleration > bound.max_acceleration {
            Some(bound.max_acceleration)
        } else {
            None
        };

        if let Some(limit) = acceleration_limit {
            // accel = ((delta / period) - prev_velocity) / period
            // --> delta = (accel * period + prev_velocity) * period
            let relative_change = ((limit * period + prev_velocity) * period) / *delta;
            // Avoid nan for a zero delta
            if relative_change.abs() < 1. {
                *delta *= relative_change;
            }
        }
    }

    if bound.velocity_bounded {
        let velocity = *delta / period;

        let velocity_limit = if velocity < bound.min_velocity {
            Some(bound.min_velocity)
        } else if velocity > bound.max_velocity {
            Some(bound.max_velocity)
        } else {
            None
        };

        if let Some(limit) = velocity_limit {
            let relative_change = (limit * period) / *delta;
            // Avoid nan for a zero delta
            if relative_change.abs() < 1. {
                *delta *= relative_change;
            }
        }
    }
}

/// Worst-case time in seconds to bring one joint to rest from `velocity`,
/// using the conservative (smaller) of its two acceleration bounds.
///
/// Returns `None` when the joint has no acceleration bound or the bound is
/// degenerate.
pub fn stop_time(bound: &VariableBounds, velocity: f64) -> Option<f64> {
    if !bound.acceleration_bounded {
        return None;
    }
    let accel_limit = f64::min(bound.min_acceleration.abs(), bound.max_acceleration.abs());
    if accel_limit <= 0. {
        return None;
    }
    Some((velocity / accel_limit).abs())
}
