// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the periodic servoing calculation loop.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, MutexGuard};
use std::time::{Duration, Instant};

use nalgebra::{DMatrix, DVector, Isometry3};
use tracing::{debug, error, warn};

use crate::exception::{create_command_exception, ServoException, ServoResult};
use crate::model::{KinematicModel, VariableBounds};
use crate::servo::config::{CommandInType, CommandOutType, ServoConfig};
use crate::servo::control_types::{
    JointJogCommand, JointState, JointTrajectory, OutgoingCommand, ServoPublisher,
    TrajectoryPoint, TwistCommand,
};
use crate::servo::low_pass_filter::LowPassFilter;
use crate::servo::rate_limiting::{limit_accel_vel, stop_time};
use crate::servo::singularity::velocity_scale_for_singularity;
use crate::servo::state::{LatestInputs, LatestState};
use crate::servo::status::StatusCode;
use crate::utils::Throttle;

/// Number of copies of the outgoing point stuffed into one trajectory when
/// driving a Gazebo simulation.
const GAZEBO_REDUNDANT_MESSAGE_COUNT: usize = 30;

/// Per-call-site throttles for log lines that would otherwise fire every tick.
#[derive(Default)]
struct Throttles {
    waiting_for_joint_state: Throttle,
    incomplete_joint_state: Throttle,
    unknown_state_joint: Throttle,
    unknown_jog_joint: Throttle,
    invalid_command: Throttle,
    missing_accel_bound: Throttle,
    unknown_frame: Throttle,
    stale_command: Throttle,
    all_zero_command: Throttle,
    length_mismatch: Throttle,
    position_bound: Throttle,
    collision_warning: Throttle,
    singularity_warning: Throttle,
}

/// Copy of the shared input slots, taken in one lock acquisition at the start
/// of a tick. The rest of the tick works on this snapshot only.
struct InputSnapshot {
    joint_state: Option<JointState>,
    twist: Option<TwistCommand>,
    twist_nonzero: bool,
    twist_stamp: Option<Instant>,
    joint_jog: Option<JointJogCommand>,
    jog_nonzero: bool,
    jog_stamp: Option<Instant>,
    collision_velocity_scale: f64,
    control_dimensions: [bool; 6],
    drift_dimensions: [bool; 6],
}

/// The servoing calculation loop.
///
/// Lives on the servo thread; one call to [`tick`](`ServoLoop::tick`) per
/// publish period. All cross-thread inputs arrive through the
/// [`LatestState`] slots and are snapshotted at the start of each tick, so
/// everything below the snapshot operates on plain local values.
pub(crate) struct ServoLoop {
    config: Arc<ServoConfig>,
    model: Box<dyn KinematicModel>,
    publisher: Box<dyn ServoPublisher>,
    shared: Arc<LatestState>,
    num_joints: usize,
    joint_name_map: HashMap<String, usize>,
    group_bounds: Vec<VariableBounds>,
    position_filters: Vec<LowPassFilter>,
    /// Working copy the tick integrates into. Not meaningful between ticks.
    internal_joint_state: JointState,
    /// The measured group state this tick started from.
    original_joint_state: JointState,
    prev_joint_velocity: DVector<f64>,
    last_sent_command: JointTrajectory,
    tf_planning_to_cmd: Option<Isometry3<f64>>,
    status: StatusCode,
    wait_for_servo_commands: bool,
    updated_filters: bool,
    zero_velocity_count: u32,
    throttles: Throttles,
}

impl ServoLoop {
    pub fn new(
        config: Arc<ServoConfig>,
        model: Box<dyn KinematicModel>,
        publisher: Box<dyn ServoPublisher>,
        shared: Arc<LatestState>,
    ) -> ServoResult<Self> {
        let joint_names = model.active_joint_names();
        if joint_names.is_empty() {
            return Err(ServoException::ModelException {
                message: format!(
                    "move group {:?} has no active joints",
                    config.move_group_name
                ),
            });
        }
        let num_joints = joint_names.len();
        let joint_name_map: HashMap<String, usize> = joint_names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        let group_bounds = joint_names
            .iter()
            .map(|name| model.variable_bounds(name))
            .collect();
        let position_filters = (0..num_joints)
            .map(|_| LowPassFilter::new(config.low_pass_filter_coeff))
            .collect();
        let internal_joint_state = JointState {
            names: joint_names,
            positions: vec![0.; num_joints],
            velocities: vec![0.; num_joints],
            stamp: None,
        };
        Ok(ServoLoop {
            config,
            model,
            publisher,
            shared,
            num_joints,
            joint_name_map,
            group_bounds,
            position_filters,
            original_joint_state: internal_joint_state.clone(),
            internal_joint_state,
            prev_joint_velocity: DVector::zeros(num_joints),
            last_sent_command: JointTrajectory::default(),
            tf_planning_to_cmd: None,
            status: StatusCode::NoWarning,
            wait_for_servo_commands: true,
            updated_filters: false,
            zero_velocity_count: 0,
            throttles: Throttles::default(),
        })
    }

    /// Prepares the loop for ticking. Fails if no joint state has arrived, and
    /// seeds the fallback command with the current positions and zero
    /// velocities so the first no-motion tick publishes something sane.
    pub fn start(&mut self) -> ServoResult<()> {
        let latest = self.lock_inputs().joint_state.clone();
        let Some(joint_state) = latest else {
            return Err(create_command_exception(
                "unable to start servoing, no joint state has been received",
            ));
        };
        if !self.update_joints(&joint_state, Instant::now()) {
            return Err(ServoException::CommandException {
                message: "unable to start servoing, the received joint state does not cover \
                          the move group"
                    .to_string(),
            });
        }

        let mut point = TrajectoryPoint {
            time_from_start: Duration::from_secs_f64(self.config.publish_period),
            ..TrajectoryPoint::default()
        };
        if self.config.publish_joint_positions {
            point.positions = self.internal_joint_state.positions.clone();
        }
        if self.config.publish_joint_velocities {
            point.velocities = vec![0.; self.num_joints];
        }
        if self.config.publish_joint_accelerations {
            point.accelerations = vec![0.; self.num_joints];
        }
        self.last_sent_command = JointTrajectory {
            joint_names: self.internal_joint_state.names.clone(),
            points: vec![point],
        };
        Ok(())
    }

    /// One servoing cycle.
    pub fn tick(&mut self, now: Instant) {
        // Status always goes out, even on ticks that emit no command
        self.publisher.publish_status(self.status);
        self.status = StatusCode::NoWarning;

        let snapshot = self.snapshot_inputs();

        let Some(joint_state) = snapshot.joint_state.as_ref() else {
            if self.throttles.waiting_for_joint_state.ready(now) {
                warn!("Servoing is waiting for a joint state");
            }
            return;
        };
        if !self.update_joints(joint_state, now) {
            return;
        }

        self.publish_worst_case_stop_time(joint_state, now);

        self.model.set_positions(&self.internal_joint_state.positions);

        // (base->planning)^-1 * (base->command frame), recomputed every tick
        // so it is available through the handle as well
        if let Some(transform) = self.planning_to_command_transform(now) {
            self.tf_planning_to_cmd = Some(transform);
            self.lock_inputs().command_frame_transform = Some(transform);
        }

        let timeout = self.config.incoming_command_timeout;
        let twist_stale = is_stale(snapshot.twist_stamp, now, timeout);
        let jog_stale = is_stale(snapshot.jog_stamp, now, timeout);
        // A stale command counts as zero everywhere below
        let have_nonzero_twist = snapshot.twist_nonzero && !twist_stale;
        let have_nonzero_jog = snapshot.jog_nonzero && !jog_stale;
        let have_nonzero_command = have_nonzero_twist || have_nonzero_jog;

        self.updated_filters = false;

        // While paused or waiting for the first command, keep the filters
        // tracking the measured state so no jump occurs on resume
        if self.wait_for_servo_commands || self.shared.paused.load(Ordering::SeqCst) {
            self.reset_low_pass_filters();
            if snapshot.twist_stamp.is_some() || snapshot.jog_stamp.is_some() {
                self.wait_for_servo_commands = false;
            }
            return;
        }

        // Cartesian servoing has priority over joint servoing
        let mut joint_trajectory = JointTrajectory::default();
        let produced;
        if let Some(command) = snapshot.twist.clone().filter(|_| have_nonzero_twist) {
            produced = self.cartesian_servo_calcs(command, &snapshot, now, &mut joint_trajectory);
        } else if let Some(command) = snapshot.joint_jog.clone().filter(|_| have_nonzero_jog) {
            produced = self.joint_servo_calcs(command, &snapshot, now, &mut joint_trajectory);
        } else {
            // Repeat the last sent command with zeroed velocities
            joint_trajectory = self.last_sent_command.clone();
            for point in &mut joint_trajectory.points {
                for velocity in &mut point.velocities {
                    *velocity = 0.;
                }
            }
            produced = true;
        }
        if !produced {
            self.reset_low_pass_filters();
            return;
        }

        if twist_stale && jog_stale && self.throttles.stale_command.ready(now) {
            warn!("Stale command. Try a larger 'incoming_command_timeout' parameter?");
        }

        if !have_nonzero_command {
            self.sudden_halt(&mut joint_trajectory);
        }

        // Skip publication once all inputs have been zero for several cycles.
        // num_outgoing_halt_msgs_to_publish == 0 means republish forever.
        let ok_to_publish = if !have_nonzero_command
            && self.config.num_outgoing_halt_msgs_to_publish != 0
            && self.zero_velocity_count > self.config.num_outgoing_halt_msgs_to_publish
        {
            if self.throttles.all_zero_command.ready(now) {
                debug!("All-zero command. Doing nothing.");
            }
            false
        } else {
            true
        };

        if have_nonzero_command {
            self.zero_velocity_count = 0;
        } else {
            self.zero_velocity_count = self.zero_velocity_count.saturating_add(1);
        }

        if ok_to_publish {
            match self.config.command_out_type {
                CommandOutType::Trajectory => {
                    self.last_sent_command = joint_trajectory.clone();
                    self.publisher
                        .publish_command(&OutgoingCommand::Trajectory(joint_trajectory));
                }
                CommandOutType::Multiarray => {
                    // Config validation guarantees exactly one of the two
                    let data = joint_trajectory
                        .points
                        .first()
                        .map(|point| {
                            if self.config.publish_joint_positions {
                                point.positions.clone()
                            } else {
                                point.velocities.clone()
                            }
                        })
                        .unwrap_or_default();
                    self.last_sent_command = joint_trajectory;
                    self.publisher
                        .publish_command(&OutgoingCommand::Multiarray(data));
                }
            }
        }

        if !self.updated_filters {
            self.reset_low_pass_filters();
        }
    }

    fn lock_inputs(&self) -> MutexGuard<'_, LatestInputs> {
        match self.shared.inputs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn snapshot_inputs(&self) -> InputSnapshot {
        let inputs = self.lock_inputs();
        InputSnapshot {
            joint_state: inputs.joint_state.clone(),
            twist: inputs.twist.clone(),
            twist_nonzero: inputs.twist_nonzero,
            twist_stamp: inputs.twist_stamp,
            joint_jog: inputs.joint_jog.clone(),
            jog_nonzero: inputs.jog_nonzero,
            jog_stamp: inputs.jog_stamp,
            collision_velocity_scale: inputs.collision_velocity_scale,
            control_dimensions: inputs.control_dimensions,
            drift_dimensions: inputs.drift_dimensions,
        }
    }

    /// Copies the group joints out of an incoming joint state. Joints outside
    /// the group are ignored.
    fn update_joints(&mut self, incoming: &JointState, now: Instant) -> bool {
        if incoming.names.len() < self.num_joints {
            if self.throttles.incomplete_joint_state.ready(now) {
                warn!(
                    "Ignoring joint state with {} joints, the move group has {}",
                    incoming.names.len(),
                    self.num_joints
                );
            }
            return false;
        }
        for (m, name) in incoming.names.iter().enumerate() {
            let Some(&index) = self.joint_name_map.get(name) else {
                if self.throttles.unknown_state_joint.ready(now) {
                    debug!("Ignoring joint {}", name);
                }
                continue;
            };
            if let Some(&position) = incoming.positions.get(m) {
                self.internal_joint_state.positions[index] = position;
            }
        }
        self.original_joint_state = self.internal_joint_state.clone();
        true
    }

    /// Max over the group joints of the time to brake to rest, for the
    /// external collision checker.
    fn publish_worst_case_stop_time(&mut self, joint_state: &JointState, now: Instant) {
        let mut worst_case = 0.;
        for (m, name) in joint_state.names.iter().enumerate() {
            let Some(&index) = self.joint_name_map.get(name) else {
                continue;
            };
            let velocity = joint_state.velocities.get(m).copied().unwrap_or(0.);
            match stop_time(&self.group_bounds[index], velocity) {
                Some(time) => worst_case = f64::max(worst_case, time),
                None => {
                    if self.throttles.missing_accel_bound.ready(now) {
                        warn!(
                            "An acceleration limit is not defined for joint {}; minimum stop \
                             distance should not be used for collision checking",
                            name
                        );
                    }
                }
            }
        }
        self.publisher.publish_worst_case_stop_time(worst_case);
    }

    fn planning_to_command_transform(&mut self, now: Instant) -> Option<Isometry3<f64>> {
        let planning = self.model.global_transform(&self.config.planning_frame);
        let command = self
            .model
            .global_transform(&self.config.robot_link_command_frame);
        match (planning, command) {
            (Some(planning), Some(command)) => Some(planning.inverse() * command),
            _ => {
                if self.throttles.unknown_frame.ready(now) {
                    error!(
                        "The model does not know the planning frame {:?} or the command frame {:?}",
                        self.config.planning_frame, self.config.robot_link_command_frame
                    );
                }
                None
            }
        }
    }

    fn cartesian_servo_calcs(
        &mut self,
        mut command: TwistCommand,
        snapshot: &InputSnapshot,
        now: Instant,
        joint_trajectory: &mut JointTrajectory,
    ) -> bool {
        let unitless = self.config.command_in_type == CommandInType::Unitless;
        if !command.is_valid(unitless) {
            if self.throttles.invalid_command.ready(now) {
                warn!("NaN or out-of-range component in incoming command. Skipping this datapoint.");
            }
            return false;
        }

        // Zero the dimensions that are not controlled, in the command frame
        for (dimension, &controlled) in snapshot.control_dimensions.iter().enumerate() {
            if !controlled {
                if dimension < 3 {
                    command.linear[dimension] = 0.;
                } else {
                    command.angular[dimension - 3] = 0.;
                }
            }
        }

        // Transform the command into the planning frame. Twists rotate only,
        // they are not displaced.
        if command.frame_id != self.config.planning_frame {
            let rotation = if command.frame_id.is_empty()
                || command.frame_id == self.config.robot_link_command_frame
            {
                match &self.tf_planning_to_cmd {
                    Some(transform) => transform.rotation,
                    None => {
                        if self.throttles.unknown_frame.ready(now) {
                            error!("No command frame transform available yet");
                        }
                        return false;
                    }
                }
            } else {
                let planning = self.model.global_transform(&self.config.planning_frame);
                let incoming = self.model.global_transform(&command.frame_id);
                match (planning, incoming) {
                    (Some(planning), Some(incoming)) => (planning.inverse() * incoming).rotation,
                    _ => {
                        if self.throttles.unknown_frame.ready(now) {
                            warn!(
                                "Unknown incoming command frame {:?}. Skipping this datapoint.",
                                command.frame_id
                            );
                        }
                        return false;
                    }
                }
            };
            command.linear = rotation * command.linear;
            command.angular = rotation * command.angular;
            command.frame_id = self.config.planning_frame.clone();
        }

        let mut delta_x = self.scale_cartesian_command(&command);
        let mut jacobian = self.model.jacobian();

        // Remove the rows allowed to drift, walking backwards so the indices
        // stay valid while rows disappear
        for dimension in (0..6).rev() {
            if snapshot.drift_dimensions[dimension] && jacobian.nrows() > 1 {
                jacobian = jacobian.remove_row(dimension);
                delta_x = delta_x.remove_row(dimension);
            }
        }

        let svd = jacobian.svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
            return false;
        };
        let sigma_inverse = DMatrix::from_diagonal(&svd.singular_values.map(|sigma| 1. / sigma));
        let pseudo_inverse = v_t.transpose() * sigma_inverse * u.transpose();

        let mut delta_theta = &pseudo_inverse * &delta_x;

        let (scale, singularity_status) = velocity_scale_for_singularity(
            self.model.as_mut(),
            &delta_x,
            &svd,
            &pseudo_inverse,
            self.config.lower_singularity_threshold,
            self.config.hard_stop_singularity_threshold,
        );
        if singularity_status != StatusCode::NoWarning {
            self.status = singularity_status;
            if self.throttles.singularity_warning.ready(now) {
                warn!("{}", singularity_status);
            }
        }
        delta_theta *= scale;

        self.internal_servo_update(delta_theta, snapshot, now, joint_trajectory)
    }

    fn joint_servo_calcs(
        &mut self,
        command: JointJogCommand,
        snapshot: &InputSnapshot,
        now: Instant,
        joint_trajectory: &mut JointTrajectory,
    ) -> bool {
        if !command.is_valid() {
            if self.throttles.invalid_command.ready(now) {
                warn!("NaN in incoming command. Skipping this datapoint.");
            }
            return false;
        }

        let mut delta_theta = DVector::zeros(self.num_joints);
        let period = self.config.publish_period;
        for (m, name) in command.names.iter().enumerate() {
            let Some(&index) = self.joint_name_map.get(name) else {
                if self.throttles.unknown_jog_joint.ready(now) {
                    warn!("Ignoring jog for joint {} outside the move group", name);
                }
                continue;
            };
            let Some(&velocity) = command.velocities.get(m) else {
                continue;
            };
            delta_theta[index] = match self.config.command_in_type {
                CommandInType::Unitless => velocity * self.config.joint_scale * period,
                CommandInType::SpeedUnits => velocity * period,
            };
        }

        self.internal_servo_update(delta_theta, snapshot, now, joint_trajectory)
    }

    /// Shared tail of both command paths: limits, collision scaling,
    /// integration, filtering, message composition and position-bound halting.
    fn internal_servo_update(
        &mut self,
        mut delta_theta: DVector<f64>,
        snapshot: &InputSnapshot,
        now: Instant,
        joint_trajectory: &mut JointTrajectory,
    ) -> bool {
        self.internal_joint_state = self.original_joint_state.clone();

        limit_accel_vel(
            &mut delta_theta,
            &self.group_bounds,
            &self.prev_joint_velocity,
            self.config.publish_period,
        );

        let collision_scale = snapshot.collision_velocity_scale.clamp(0., 1.);
        if collision_scale <= 0. {
            self.status = StatusCode::HaltForCollision;
            if self.throttles.collision_warning.ready(now) {
                error!("Halting for collision!");
            }
        } else if collision_scale < 1. {
            self.status = StatusCode::DecelerateForCollision;
            if self.throttles.collision_warning.ready(now) {
                warn!("{}", StatusCode::DecelerateForCollision);
            }
        }
        delta_theta *= collision_scale;

        if !self.apply_joint_update(&delta_theta, now) {
            return false;
        }
        self.updated_filters = true;

        self.compose_joint_trajectory(joint_trajectory);

        if !self.position_bounds_satisfied(now) {
            self.sudden_halt(joint_trajectory);
            self.status = StatusCode::JointBound;
            self.prev_joint_velocity.fill(0.);
        }

        if self.config.use_gazebo && self.config.command_out_type == CommandOutType::Trajectory {
            self.insert_redundant_points(joint_trajectory, GAZEBO_REDUNDANT_MESSAGE_COUNT);
        }
        true
    }

    /// Integrates the increments, filters the positions and derives the
    /// velocities.
    fn apply_joint_update(&mut self, delta_theta: &DVector<f64>, now: Instant) -> bool {
        if self.internal_joint_state.positions.len() != delta_theta.len()
            || self.internal_joint_state.velocities.len() != delta_theta.len()
            || self.prev_joint_velocity.len() != delta_theta.len()
        {
            if self.throttles.length_mismatch.ready(now) {
                error!("Lengths of output and increments do not match.");
            }
            return false;
        }
        let period = self.config.publish_period;
        for i in 0..delta_theta.len() {
            self.internal_joint_state.positions[i] += delta_theta[i];
            self.internal_joint_state.positions[i] =
                self.position_filters[i].filter(self.internal_joint_state.positions[i]);
            self.internal_joint_state.velocities[i] = delta_theta[i] / period;
            self.prev_joint_velocity[i] = self.internal_joint_state.velocities[i];
        }
        true
    }

    fn compose_joint_trajectory(&self, joint_trajectory: &mut JointTrajectory) {
        joint_trajectory.joint_names = self.internal_joint_state.names.clone();
        let mut point = TrajectoryPoint {
            time_from_start: Duration::from_secs_f64(self.config.publish_period),
            ..TrajectoryPoint::default()
        };
        if self.config.publish_joint_positions {
            point.positions = self.internal_joint_state.positions.clone();
        }
        if self.config.publish_joint_velocities {
            point.velocities = self.internal_joint_state.velocities.clone();
        }
        if self.config.publish_joint_accelerations {
            // Controllers that require the field get all zeros
            point.accelerations = vec![0.; self.num_joints];
        }
        joint_trajectory.points.push(point);
    }

    /// True when no joint is past its margin-shrunken position bound with a
    /// commanded velocity moving it further out.
    fn position_bounds_satisfied(&mut self, now: Instant) -> bool {
        let margin = self.config.joint_limit_margin;
        let mut halting = false;
        for (i, name) in self.internal_joint_state.names.iter().enumerate() {
            if self.model.satisfies_position_bounds(name, -margin) {
                continue;
            }
            let bounds = &self.group_bounds[i];
            // Some joints have no position bounds defined, skip them
            if !bounds.position_bounded {
                continue;
            }
            let position = self.original_joint_state.positions[i];
            let velocity = self.internal_joint_state.velocities[i];
            if (velocity < 0. && position < bounds.min_position + margin)
                || (velocity > 0. && position > bounds.max_position - margin)
            {
                if self.throttles.position_bound.ready(now) {
                    warn!("{} close to a position limit. Halting.", name);
                }
                halting = true;
            }
        }
        !halting
    }

    /// Forces the outgoing command to the current position with zero velocity.
    fn sudden_halt(&self, joint_trajectory: &mut JointTrajectory) {
        if joint_trajectory.points.is_empty() {
            joint_trajectory.points.push(TrajectoryPoint {
                time_from_start: Duration::from_secs_f64(self.config.publish_period),
                positions: vec![0.; self.num_joints],
                velocities: vec![0.; self.num_joints],
                accelerations: Vec::new(),
            });
        }
        let point = &mut joint_trajectory.points[0];
        // Position-controlled robots get reset to the known good state,
        // velocity-controlled robots get stopped
        if self.config.publish_joint_positions {
            point.positions = self.original_joint_state.positions.clone();
        }
        if self.config.publish_joint_velocities {
            point.velocities = vec![0.; self.num_joints];
        }
    }

    /// Stuffs `count` copies of the single outgoing point into the trajectory.
    /// Gazebo skips points whose time stamp has already passed when the
    /// message arrives.
    fn insert_redundant_points(&self, joint_trajectory: &mut JointTrajectory, count: usize) {
        if count < 2 || joint_trajectory.points.is_empty() {
            return;
        }
        let template = joint_trajectory.points[0].clone();
        joint_trajectory.points = (0..count)
            .map(|i| {
                let mut point = template.clone();
                point.time_from_start =
                    Duration::from_secs_f64(self.config.publish_period * (i + 1) as f64);
                point
            })
            .collect();
    }

    fn reset_low_pass_filters(&mut self) {
        for (filter, &position) in self
            .position_filters
            .iter_mut()
            .zip(self.original_joint_state.positions.iter())
        {
            filter.reset(position);
        }
        self.updated_filters = true;
    }

    fn scale_cartesian_command(&self, command: &TwistCommand) -> DVector<f64> {
        let period = self.config.publish_period;
        let (linear_factor, angular_factor) = match self.config.command_in_type {
            CommandInType::Unitless => (
                self.config.linear_scale * period,
                self.config.rotational_scale * period,
            ),
            CommandInType::SpeedUnits => (period, period),
        };
        DVector::from_vec(vec![
            linear_factor * command.linear.x,
            linear_factor * command.linear.y,
            linear_factor * command.linear.z,
            angular_factor * command.angular.x,
            angular_factor * command.angular.y,
            angular_factor * command.angular.z,
        ])
    }
}

fn is_stale(stamp: Option<Instant>, now: Instant, timeout: f64) -> bool {
    match stamp {
        Some(stamp) => now.saturating_duration_since(stamp).as_secs_f64() >= timeout,
        None => false,
    }
}
