// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Test-only support: a deterministic 6-R arm and a recording publisher.

use std::sync::{Arc, Mutex};

use nalgebra::{DMatrix, Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::model::{KinematicModel, VariableBounds};
use crate::servo::control_types::{OutgoingCommand, ServoPublisher};
use crate::servo::status::StatusCode;

/// A bent, well-conditioned pose of the test arm.
pub const TEST_POSE: [f64; 6] = [0.1, 0.4, -0.6, 0.3, 0.5, -0.2];

/// Frame name the test arm reports as its base / planning frame.
pub const BASE_FRAME: &str = "base_link";
/// Frame name of the test arm's end effector.
pub const EE_FRAME: &str = "ee_link";

const JOINT_OFFSETS: [[f64; 3]; 6] = [
    [0., 0., 0.30],
    [0., 0., 0.10],
    [0., 0., 0.35],
    [0., 0., 0.08],
    [0., 0., 0.30],
    [0., 0., 0.07],
];
const JOINT_AXES: [[f64; 3]; 6] = [
    [0., 0., 1.],
    [0., 1., 0.],
    [0., 1., 0.],
    [0., 0., 1.],
    [0., 1., 0.],
    [0., 0., 1.],
];
const EE_OFFSET: [f64; 3] = [0., 0., 0.10];

/// A six-revolute arm with analytic forward kinematics and a geometric
/// Jacobian. Generous default bounds keep the limit enforcer quiet unless a
/// test installs tighter ones.
pub struct TestArm {
    names: Vec<String>,
    positions: Vec<f64>,
    bounds: Vec<VariableBounds>,
}

impl TestArm {
    pub fn new() -> Self {
        let bounds = VariableBounds {
            position_bounded: true,
            min_position: -2.9,
            max_position: 2.9,
            velocity_bounded: true,
            min_velocity: -20.0,
            max_velocity: 20.0,
            acceleration_bounded: true,
            min_acceleration: -2000.0,
            max_acceleration: 2000.0,
        };
        TestArm {
            names: (1..=6).map(|i| format!("joint_{}", i)).collect(),
            positions: vec![0.; 6],
            bounds: vec![bounds; 6],
        }
    }

    pub fn joint_names() -> Vec<String> {
        (1..=6).map(|i| format!("joint_{}", i)).collect()
    }

    /// Replaces the bounds of one joint.
    pub fn set_bounds(&mut self, joint: usize, bounds: VariableBounds) {
        self.bounds[joint] = bounds;
    }

    /// Frame of each joint before its own rotation, plus the end-effector pose.
    fn frames(&self) -> (Vec<Isometry3<f64>>, Isometry3<f64>) {
        let mut transform = Isometry3::identity();
        let mut joint_frames = Vec::with_capacity(6);
        for i in 0..6 {
            transform = transform * Translation3::from(Vector3::from(JOINT_OFFSETS[i]));
            joint_frames.push(transform);
            let axis = Unit::new_normalize(Vector3::from(JOINT_AXES[i]));
            transform = transform * UnitQuaternion::from_axis_angle(&axis, self.positions[i]);
        }
        transform = transform * Translation3::from(Vector3::from(EE_OFFSET));
        (joint_frames, transform)
    }
}

impl KinematicModel for TestArm {
    fn active_joint_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn positions(&self) -> Vec<f64> {
        self.positions.clone()
    }

    fn set_positions(&mut self, positions: &[f64]) {
        self.positions = positions.to_vec();
    }

    fn jacobian(&self) -> DMatrix<f64> {
        let (joint_frames, ee) = self.frames();
        let p_ee = ee.translation.vector;
        let mut jacobian = DMatrix::zeros(6, 6);
        for i in 0..6 {
            let axis = joint_frames[i].rotation * Vector3::from(JOINT_AXES[i]);
            let p_i = joint_frames[i].translation.vector;
            let linear = axis.cross(&(p_ee - p_i));
            for row in 0..3 {
                jacobian[(row, i)] = linear[row];
                jacobian[(row + 3, i)] = axis[row];
            }
        }
        jacobian
    }

    fn global_transform(&self, frame: &str) -> Option<Isometry3<f64>> {
        match frame {
            BASE_FRAME => Some(Isometry3::identity()),
            EE_FRAME => Some(self.frames().1),
            _ => None,
        }
    }

    fn variable_bounds(&self, joint: &str) -> VariableBounds {
        match self.names.iter().position(|name| name == joint) {
            Some(index) => self.bounds[index],
            None => VariableBounds::unbounded(),
        }
    }

    fn satisfies_position_bounds(&self, joint: &str, margin: f64) -> bool {
        let Some(index) = self.names.iter().position(|name| name == joint) else {
            return true;
        };
        let bounds = &self.bounds[index];
        if !bounds.position_bounded {
            return true;
        }
        let position = self.positions[index];
        position >= bounds.min_position - margin && position <= bounds.max_position + margin
    }
}

/// Everything a [`RecordingPublisher`] has seen.
#[derive(Default)]
pub struct Records {
    pub commands: Vec<OutgoingCommand>,
    pub statuses: Vec<StatusCode>,
    pub stop_times: Vec<f64>,
}

/// Publisher that appends everything into shared vectors for assertions.
pub struct RecordingPublisher {
    records: Arc<Mutex<Records>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        RecordingPublisher {
            records: Arc::new(Mutex::new(Records::default())),
        }
    }

    pub fn records(&self) -> Arc<Mutex<Records>> {
        Arc::clone(&self.records)
    }
}

impl ServoPublisher for RecordingPublisher {
    fn publish_command(&mut self, command: &OutgoingCommand) {
        self.records.lock().unwrap().commands.push(command.clone());
    }

    fn publish_status(&mut self, status: StatusCode) {
        self.records.lock().unwrap().statuses.push(status);
    }

    fn publish_worst_case_stop_time(&mut self, seconds: f64) {
        self.records.lock().unwrap().stop_times.push(seconds);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn jacobian_matches_finite_differences() {
        let mut arm = TestArm::new();
        arm.set_positions(&TEST_POSE);
        let jacobian = arm.jacobian();

        let epsilon = 1e-7;
        let (_, pose) = arm.frames();
        for joint in 0..6 {
            let mut perturbed = TEST_POSE.to_vec();
            perturbed[joint] += epsilon;
            arm.set_positions(&perturbed);
            let (_, perturbed_pose) = arm.frames();
            let linear = (perturbed_pose.translation.vector - pose.translation.vector) / epsilon;
            for row in 0..3 {
                assert!(
                    (jacobian[(row, joint)] - linear[row]).abs() < 1e-5,
                    "joint {} row {}: {} vs {}",
                    joint,
                    row,
                    jacobian[(row, joint)],
                    linear[row]
                );
            }
        }
    }

    #[test]
    fn test_pose_is_well_conditioned() {
        let mut arm = TestArm::new();
        arm.set_positions(&TEST_POSE);
        let singular_values = arm.jacobian().singular_values();
        let condition = singular_values[0] / singular_values[singular_values.len() - 1];
        assert!(condition.is_finite());
        assert!(condition < 1e3, "condition number {}", condition);
    }

    #[test]
    fn pseudoinverse_solves_the_commanded_twist() {
        let mut arm = TestArm::new();
        arm.set_positions(&TEST_POSE);
        let jacobian = arm.jacobian();
        let svd = jacobian.clone().svd(true, true);
        let u = svd.u.as_ref().unwrap();
        let v_t = svd.v_t.as_ref().unwrap();
        let sigma_inverse = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1. / s));
        let pseudo_inverse = v_t.transpose() * sigma_inverse * u.transpose();

        let delta_x = DVector::from_vec(vec![0.004, 0., 0., 0., 0., 0.]);
        let delta_theta = &pseudo_inverse * &delta_x;
        let reproduced = jacobian * delta_theta;
        for row in 0..6 {
            assert!(
                (reproduced[row] - delta_x[row]).abs() < 1e-9,
                "row {}: {} vs {}",
                row,
                reproduced[row],
                delta_x[row]
            );
        }
    }
}
