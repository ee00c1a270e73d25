// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
//! Defines the per-tick status codes the servo loop publishes.
use std::fmt::{Display, Formatter, Result};

use num_derive::{FromPrimitive, ToPrimitive};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Condition of the servo loop, published once per tick as a signed 8-bit integer.
///
/// The loop resets to [`NoWarning`](`StatusCode::NoWarning`) at the start of
/// every tick; calculations during the tick may raise it.
#[derive(Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq, Copy, Clone)]
#[repr(i8)]
#[derive(FromPrimitive, ToPrimitive)]
pub enum StatusCode {
    /// Nominal operation.
    NoWarning = 0,
    /// The commanded motion approaches a kinematic singularity; velocity is scaled down.
    DecelerateForSingularity = 1,
    /// The Jacobian condition number passed the hard stop threshold; motion is zeroed.
    HaltForSingularity = 2,
    /// The collision checker reported a proximity scale below 1; velocity is scaled down.
    DecelerateForCollision = 3,
    /// The collision checker reported a scale of 0; motion is zeroed.
    HaltForCollision = 4,
    /// A joint would overshoot a position bound; the outgoing command holds position.
    JointBound = 5,
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let message = match self {
            StatusCode::NoWarning => "No warnings",
            StatusCode::DecelerateForSingularity => {
                "Moving closer to a singularity, decelerating"
            }
            StatusCode::HaltForSingularity => "Very close to a singularity, emergency stop",
            StatusCode::DecelerateForCollision => "Close to a collision, decelerating",
            StatusCode::HaltForCollision => "Collision detected, emergency stop",
            StatusCode::JointBound => "Close to a joint bound (position or velocity), halting",
        };
        write!(f, "{}", message)
    }
}
