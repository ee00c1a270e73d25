// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the shared slots commands arrive in and the handle that fills them.

use nalgebra::Isometry3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::servo::control_types::{JointJogCommand, JointState, TwistCommand};

/// Everything producer threads may touch, guarded by the one servo mutex.
///
/// The tick copies these fields out in a single lock acquisition and works on
/// the copies; the lock is never held across kinematics, SVD or publishing.
#[derive(Debug)]
pub(crate) struct LatestInputs {
    pub joint_state: Option<JointState>,
    pub twist: Option<TwistCommand>,
    pub twist_nonzero: bool,
    pub twist_stamp: Option<Instant>,
    pub joint_jog: Option<JointJogCommand>,
    pub jog_nonzero: bool,
    pub jog_stamp: Option<Instant>,
    pub collision_velocity_scale: f64,
    /// The Cartesian input dimensions to honor, `[lin_x .. ang_z]`.
    pub control_dimensions: [bool; 6],
    /// The Cartesian dimensions allowed to drift, `[lin_x .. ang_z]`.
    pub drift_dimensions: [bool; 6],
    /// Planning frame to command frame, written by the tick once per cycle.
    pub command_frame_transform: Option<Isometry3<f64>>,
}

#[derive(Debug)]
pub(crate) struct LatestState {
    pub inputs: Mutex<LatestInputs>,
    pub paused: AtomicBool,
    pub stop_requested: AtomicBool,
}

impl LatestState {
    pub fn new() -> Self {
        LatestState {
            inputs: Mutex::new(LatestInputs {
                joint_state: None,
                twist: None,
                twist_nonzero: false,
                twist_stamp: None,
                joint_jog: None,
                jog_nonzero: false,
                jog_stamp: None,
                collision_velocity_scale: 1.0,
                control_dimensions: [true; 6],
                drift_dimensions: [false; 6],
                command_frame_transform: None,
            }),
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        }
    }
}

/// Cloneable handle the transport layer pushes inputs through.
///
/// Each update copies the value into the shared slot under the servo mutex
/// and returns immediately; the next tick sees the latest value of each kind
/// (last writer wins, no queueing).
#[derive(Clone)]
pub struct CommandHandle {
    shared: Arc<LatestState>,
}

impl CommandHandle {
    pub(crate) fn new(shared: Arc<LatestState>) -> Self {
        CommandHandle { shared }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LatestInputs> {
        // A poisoned mutex means a producer panicked mid-copy; the slots are
        // plain values, so continuing with them is sound.
        match self.shared.inputs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replaces the latest joint state.
    pub fn update_joint_state(&self, state: JointState) {
        self.lock().joint_state = Some(state);
    }

    /// Replaces the latest twist command, recording its nonzero-ness and stamp.
    pub fn update_twist(&self, command: TwistCommand) {
        let mut inputs = self.lock();
        inputs.twist_nonzero = command.is_nonzero();
        inputs.twist_stamp = command.stamp;
        inputs.twist = Some(command);
    }

    /// Replaces the latest joint jog command, recording its nonzero-ness and stamp.
    pub fn update_joint_jog(&self, command: JointJogCommand) {
        let mut inputs = self.lock();
        inputs.jog_nonzero = command.is_nonzero();
        inputs.jog_stamp = command.stamp;
        inputs.joint_jog = Some(command);
    }

    /// Replaces the collision velocity scale reported by an external collision
    /// checker. Values outside \[0, 1\] are clamped when applied.
    pub fn update_collision_velocity_scale(&self, scale: f64) {
        self.lock().collision_velocity_scale = scale;
    }

    /// Replaces the Cartesian input mask. Dimensions set to false are zeroed
    /// before the kinematics. Visible from the next tick on.
    pub fn change_control_dimensions(&self, dimensions: [bool; 6]) {
        self.lock().control_dimensions = dimensions;
    }

    /// Replaces the drift mask. Dimensions set to true are removed from the
    /// Jacobian, sacrificing their tracking to the task's redundancy. Visible
    /// from the next tick on.
    pub fn change_drift_dimensions(&self, dimensions: [bool; 6]) {
        self.lock().drift_dimensions = dimensions;
    }

    /// Pauses or unpauses servoing. A paused loop keeps ticking and publishing
    /// status, but emits no commands and tracks the measured joint state.
    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::SeqCst);
    }

    /// Transform from the planning frame to the robot link command frame, or
    /// `None` if no tick has computed it yet.
    pub fn command_frame_transform(&self) -> Option<Isometry3<f64>> {
        self.lock().command_frame_transform
    }

    /// The latest joint state pushed in, if any.
    pub fn latest_joint_state(&self) -> Option<JointState> {
        self.lock().joint_state.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn twist_update_records_flags() {
        let shared = Arc::new(LatestState::new());
        let handle = CommandHandle::new(Arc::clone(&shared));

        handle.update_twist(TwistCommand::new("", [0.; 3], [0.; 3]));
        {
            let inputs = shared.inputs.lock().unwrap();
            assert!(!inputs.twist_nonzero);
            assert!(inputs.twist_stamp.is_some());
        }

        let mut command = TwistCommand::new("", [0.1, 0., 0.], [0.; 3]);
        command.stamp = None;
        handle.update_twist(command);
        {
            let inputs = shared.inputs.lock().unwrap();
            assert!(inputs.twist_nonzero);
            // An unset stamp replaces the previous one
            assert!(inputs.twist_stamp.is_none());
        }
    }

    #[test]
    fn masks_default_and_update() {
        let shared = Arc::new(LatestState::new());
        let handle = CommandHandle::new(Arc::clone(&shared));
        {
            let inputs = shared.inputs.lock().unwrap();
            assert_eq!(inputs.control_dimensions, [true; 6]);
            assert_eq!(inputs.drift_dimensions, [false; 6]);
        }
        handle.change_drift_dimensions([false, false, true, false, false, false]);
        handle.change_control_dimensions([true, true, false, true, true, true]);
        let inputs = shared.inputs.lock().unwrap();
        assert_eq!(inputs.drift_dimensions[2], true);
        assert_eq!(inputs.control_dimensions[2], false);
    }

    #[test]
    fn handle_is_usable_across_threads() {
        let shared = Arc::new(LatestState::new());
        let handle = CommandHandle::new(Arc::clone(&shared));
        let writer = handle.clone();
        let thread = std::thread::spawn(move || {
            for i in 0..100 {
                writer.update_joint_state(JointState {
                    names: vec!["joint_1".to_string()],
                    positions: vec![i as f64],
                    velocities: vec![0.],
                    stamp: Some(Instant::now()),
                });
                std::thread::sleep(Duration::from_micros(10));
            }
        });
        for _ in 0..100 {
            let _ = handle.latest_joint_state();
        }
        thread.join().unwrap();
        let state = handle.latest_joint_state().unwrap();
        assert_eq!(state.positions, vec![99.]);
    }
}
