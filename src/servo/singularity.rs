// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the condition-number heuristic that decelerates motion near
//! kinematic singularities.

use nalgebra::{DMatrix, DVector, Dyn};

use crate::model::KinematicModel;
use crate::servo::status::StatusCode;

type Svd = nalgebra::linalg::SVD<f64, Dyn, Dyn>;

/// Scale applied to the singular vector when probing its sign.
const PROBE_SCALE: f64 = 100.;

/// Computes a velocity scale in \[0, 1\] from the proximity of the commanded
/// motion to a singularity, together with the status to report.
///
/// The last column of U from the Jacobian's SVD points directly toward or away
/// from the nearest singularity, but its sign can flip between decompositions
/// (R. Bro, "Resolving the Sign Ambiguity in the Singular Value
/// Decomposition"). The sign is resolved by probing: a small motion along the
/// vector is applied to the model and kept if the Jacobian's condition number
/// grows in that direction. The model's positions are restored before
/// returning.
///
/// Motion away from the singularity is never scaled. Toward it, the scale
/// ramps from 1 at `lower_threshold` down to 0 at `hard_threshold`.
///
/// # Arguments
/// * `model` - The kinematic model, positioned at the current joint state.
/// * `commanded_delta` - The commanded Cartesian increment, row-reduced the
///   same way as the Jacobian the SVD was taken of.
/// * `svd` - SVD of the (possibly row-reduced) Jacobian, with U and V.
/// * `pseudo_inverse` - The Moore-Penrose inverse built from `svd`.
pub(crate) fn velocity_scale_for_singularity(
    model: &mut dyn KinematicModel,
    commanded_delta: &DVector<f64>,
    svd: &Svd,
    pseudo_inverse: &DMatrix<f64>,
    lower_threshold: f64,
    hard_threshold: f64,
) -> (f64, StatusCode) {
    let num_dimensions = commanded_delta.len();
    let Some(u) = svd.u.as_ref() else {
        return (1., StatusCode::NoWarning);
    };
    let mut vector_toward_singularity = u.column(num_dimensions - 1).clone_owned();

    let singular_values = &svd.singular_values;
    let ini_condition = singular_values[0] / singular_values[singular_values.len() - 1];

    // Probe with a small motion along the singular vector and look at how the
    // condition number reacts
    let delta_x = &vector_toward_singularity / PROBE_SCALE;
    let theta = DVector::from_vec(model.positions());
    let new_theta = &theta + pseudo_inverse * delta_x;
    model.set_positions(new_theta.as_slice());
    let new_jacobian = model.jacobian();
    model.set_positions(theta.as_slice());

    let new_singular_values = new_jacobian.singular_values();
    let new_condition =
        new_singular_values[0] / new_singular_values[new_singular_values.len() - 1];
    // The condition number grows toward a singularity. If it did not grow
    // along the probe, the vector points away and must be flipped.
    if ini_condition >= new_condition {
        vector_toward_singularity = -vector_toward_singularity;
    }

    // A positive dot product means the command moves toward the singularity
    let dot = vector_toward_singularity.dot(commanded_delta);
    if dot > 0. {
        if ini_condition > lower_threshold && ini_condition < hard_threshold {
            let scale = 1.
                - (ini_condition - lower_threshold) / (hard_threshold - lower_threshold);
            return (scale, StatusCode::DecelerateForSingularity);
        }
        if ini_condition >= hard_threshold {
            return (0., StatusCode::HaltForSingularity);
        }
    }
    (1., StatusCode::NoWarning)
}
