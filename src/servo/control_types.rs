// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the command and trajectory value types exchanged with the transport layer.

use nalgebra::Vector3;
use std::time::{Duration, Instant};

use crate::servo::status::StatusCode;

/// Used to decide whether to enforce realtime scheduling for the servo loop
/// thread. see [`Servo`](`crate::Servo`)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RealtimeConfig {
    Enforce,
    Ignore,
}

/// A measured joint state pushed in by the transport layer.
///
/// May contain passive joints or joints outside the configured move group;
/// those are ignored by the servo loop.
#[derive(Debug, Clone, Default)]
pub struct JointState {
    /// Joint names, ordering the two value vectors.
    pub names: Vec<String>,
    /// Measured positions in \[rad\] or \[m\].
    pub positions: Vec<f64>,
    /// Measured velocities in \[rad/s\] or \[m/s\].
    pub velocities: Vec<f64>,
    /// Measurement time. `None` models an unset stamp.
    pub stamp: Option<Instant>,
}

/// An end-effector velocity command: linear and angular twist.
///
/// Units depend on [`CommandInType`](`crate::ServoConfig`): unitless commands
/// carry components in \[-1, 1\], speed-unit commands carry \[m/s\] and \[rad/s\].
#[derive(Debug, Clone)]
pub struct TwistCommand {
    /// Frame the twist is expressed in. An empty string selects the configured
    /// robot link command frame.
    pub frame_id: String,
    /// Command time. `None` models an unset stamp and is never considered stale.
    pub stamp: Option<Instant>,
    /// Linear velocity components.
    pub linear: Vector3<f64>,
    /// Angular velocity components.
    pub angular: Vector3<f64>,
}

impl TwistCommand {
    /// Creates a new TwistCommand stamped `now`.
    pub fn new(frame_id: &str, linear: [f64; 3], angular: [f64; 3]) -> Self {
        TwistCommand {
            frame_id: frame_id.to_string(),
            stamp: Some(Instant::now()),
            linear: Vector3::from(linear),
            angular: Vector3::from(angular),
        }
    }

    /// Whether any of the six components is nonzero.
    pub fn is_nonzero(&self) -> bool {
        self.linear != Vector3::zeros() || self.angular != Vector3::zeros()
    }

    /// Whether all six components are finite and, for unitless commands,
    /// within \[-1, 1\].
    pub fn is_valid(&self, unitless: bool) -> bool {
        let components = self.linear.iter().chain(self.angular.iter());
        for &component in components {
            if !component.is_finite() {
                return false;
            }
            if unitless && component.abs() > 1.0 {
                return false;
            }
        }
        true
    }
}

/// A direct joint velocity command for a subset of the group's joints.
#[derive(Debug, Clone)]
pub struct JointJogCommand {
    /// Names of the commanded joints, ordering `velocities`.
    pub names: Vec<String>,
    /// Commanded velocities, unitless or in \[rad/s\] per the configuration.
    pub velocities: Vec<f64>,
    /// Command time. `None` models an unset stamp and is never considered stale.
    pub stamp: Option<Instant>,
}

impl JointJogCommand {
    /// Creates a new JointJogCommand stamped `now`.
    pub fn new(names: &[&str], velocities: &[f64]) -> Self {
        JointJogCommand {
            names: names.iter().map(|name| name.to_string()).collect(),
            velocities: velocities.to_vec(),
            stamp: Some(Instant::now()),
        }
    }

    /// Whether any commanded velocity is nonzero.
    pub fn is_nonzero(&self) -> bool {
        self.velocities.iter().any(|&velocity| velocity != 0.0)
    }

    /// Whether all commanded velocities are finite.
    pub fn is_valid(&self) -> bool {
        self.velocities.iter().all(|velocity| velocity.is_finite())
    }
}

/// One point of an outgoing joint trajectory.
///
/// Empty vectors mean the field is not published; populated vectors have one
/// entry per joint of [`JointTrajectory::joint_names`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryPoint {
    /// Offset of this point from the start of the trajectory.
    pub time_from_start: Duration,
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    pub accelerations: Vec<f64>,
}

/// The outgoing joint trajectory command composed each tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointTrajectory {
    /// Names ordering the per-point value vectors.
    pub joint_names: Vec<String>,
    pub points: Vec<TrajectoryPoint>,
}

/// The command emitted by a tick, in the configured output format.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingCommand {
    /// A trajectory with joint names and at least one point.
    Trajectory(JointTrajectory),
    /// A bare float array of length N carrying positions or velocities,
    /// never both. Which one is fixed by the configuration.
    Multiarray(Vec<f64>),
}

/// Sink for everything the servo loop publishes.
///
/// The transport layer implements this; all three methods are fire-and-forget
/// and must not block. The loop thread owns the publisher exclusively.
pub trait ServoPublisher: Send {
    /// Publishes the outgoing command of a tick. Not called on ticks that
    /// suppress output (pause, commands stale past the configured number of
    /// halt messages, invalid commands).
    fn publish_command(&mut self, command: &OutgoingCommand);

    /// Publishes the loop status. Called exactly once per tick.
    fn publish_status(&mut self, status: StatusCode);

    /// Publishes the worst-case stop time in seconds. Called once per tick.
    fn publish_worst_case_stop_time(&mut self, seconds: f64);
}
