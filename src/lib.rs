// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # servo-rs
//! servo-rs is a library for realtime Cartesian and joint-space servoing of
//! articulated robot arms.
//!
//! A live stream of end-effector twist commands or direct joint velocity
//! commands is turned into one outgoing joint trajectory point per fixed
//! publish period. Each tick runs inverse differential kinematics through a
//! pseudoinverse of the Jacobian, decelerates near kinematic singularities,
//! enforces joint position, velocity and acceleration limits, scales velocity
//! for imminent collisions and low-pass filters the outgoing positions.
//!
//! **ALWAYS HAVE THE USER STOP BUTTON AT
//! HAND WHILE CONTROLLING THE ROBOT!**
//!
//! ## Design
//! The library is divided into three main modules:
//! * [model](`crate::model`) - the contract of the external kinematics
//!   provider (forward kinematics, Jacobian, joint bounds).
//! * [servo](`crate::servo`) - the servo loop, its configuration and the
//!   command types it exchanges with the transport layer.
//! * [exception](`crate::exception`) - error and Result definitions.
//!
//! The transport layer stays outside the library: incoming messages are
//! pushed through a cloneable [`CommandHandle`], outgoing messages leave
//! through a [`ServoPublisher`] implementation injected at construction.
//!
//! # Example:
//! ```no_run
//! use servo::ServoConfig;
//!
//! fn main() -> servo::ServoResult<()> {
//!     let config = ServoConfig::load("servo.toml")?;
//!     println!("servoing at {} Hz", 1. / config.publish_period);
//!     Ok(())
//! }
//! ```
//!
//! Wiring a servo takes a kinematic model of the move group and a publisher
//! for the outgoing topics:
//! ```ignore
//! let mut servo = Servo::new(config, model, publisher, RealtimeConfig::Ignore)?;
//! let handle = servo.handle();
//! // feed handle.update_joint_state(..) from the robot driver
//! assert!(servo.wait_for_initialized(Duration::from_secs(5)));
//! servo.start()?;
//! handle.update_twist(TwistCommand::new("", [0.2, 0., 0.], [0., 0., 0.]));
//! ```
//!
//! The loop keeps publishing a status code every tick; halting conditions
//! (collision, singularity, joint bound) surface there while the outgoing
//! command is forced to the current position with zero velocity.

pub mod exception;
pub mod model;
pub mod servo;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use exception::{ServoException, ServoResult};
pub use model::{KinematicModel, VariableBounds};
pub use servo::config::{CommandInType, CommandOutType, ServoConfig};
pub use servo::control_types::{
    JointJogCommand, JointState, JointTrajectory, OutgoingCommand, RealtimeConfig,
    ServoPublisher, TrajectoryPoint, TwistCommand,
};
pub use servo::low_pass_filter::LowPassFilter;
pub use servo::state::CommandHandle;
pub use servo::status::StatusCode;
pub use servo::Servo;
