// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the kinematic model contract the servo loop drives.
use nalgebra::{DMatrix, Isometry3};

#[cfg(test)]
use mockall::automock;

/// Position, velocity and acceleration bounds of a single joint variable.
///
/// A joint may carry any subset of the three bound kinds; the `*_bounded`
/// flags say which min/max pairs are meaningful.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VariableBounds {
    pub position_bounded: bool,
    pub min_position: f64,
    pub max_position: f64,
    pub velocity_bounded: bool,
    pub min_velocity: f64,
    pub max_velocity: f64,
    pub acceleration_bounded: bool,
    pub min_acceleration: f64,
    pub max_acceleration: f64,
}

impl VariableBounds {
    /// Bounds of a joint with no limits defined.
    pub fn unbounded() -> Self {
        VariableBounds {
            position_bounded: false,
            min_position: f64::NEG_INFINITY,
            max_position: f64::INFINITY,
            velocity_bounded: false,
            min_velocity: f64::NEG_INFINITY,
            max_velocity: f64::INFINITY,
            acceleration_bounded: false,
            min_acceleration: f64::NEG_INFINITY,
            max_acceleration: f64::INFINITY,
        }
    }
}

/// Provider of forward kinematics, Jacobians and joint bounds for one move group.
///
/// Implementations wrap whatever robot description is in use. The servo loop
/// holds the model exclusively on its own thread, so implementations do not
/// need interior synchronization; they do need to be `Send` so the loop thread
/// can own them.
///
/// All transforms are global, i.e. expressed in the model's fixed base frame.
#[cfg_attr(test, automock)]
pub trait KinematicModel: Send {
    /// Names of the active joints of the move group, in Jacobian column order.
    fn active_joint_names(&self) -> Vec<String>;

    /// Current positions of the active joints, in [`active_joint_names`](KinematicModel::active_joint_names) order.
    fn positions(&self) -> Vec<f64>;

    /// Sets the active joint positions and recomputes the model state.
    fn set_positions(&mut self, positions: &[f64]);

    /// 6×N geometric Jacobian at the current joint positions, mapping joint
    /// velocities to the spatial end-effector velocity
    /// `[lin_x, lin_y, lin_z, ang_x, ang_y, ang_z]`.
    fn jacobian(&self) -> DMatrix<f64>;

    /// Pose of the named frame in the model's base frame, or `None` if the
    /// frame is unknown.
    fn global_transform(&self, frame: &str) -> Option<Isometry3<f64>>;

    /// Bounds of the named joint. Joints without limits report
    /// [`VariableBounds::unbounded`].
    fn variable_bounds(&self, joint: &str) -> VariableBounds;

    /// Whether the named joint's current position lies within
    /// `[min_position - margin, max_position + margin]`. A negative margin
    /// therefore tests against a shrunken, inner region. Unbounded joints
    /// always satisfy their bounds.
    fn satisfies_position_bounds(&self, joint: &str, margin: f64) -> bool;
}
