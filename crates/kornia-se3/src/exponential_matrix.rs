use glam::{DMat3, DVec3};
use rayon::prelude::*;

use crate::{maps::exp_coefficients, so3::RotationGroup};

/// The matrix `V(ω) = I + c1 [ω]× + c2 [ω]×²` mapping the translational part of
/// a Lie algebra element to the translation of its group exponential.
pub(crate) fn exponential_matrix<R: RotationGroup>(rotations: &R, rot_vec: DVec3) -> DMat3 {
    let rot_vec = rotations.regularize(rot_vec);
    let (coef_1, coef_2) = exp_coefficients(rot_vec.length());
    let skew = rotations.skew_matrix_from_vector(rot_vec);
    DMat3::IDENTITY + coef_1 * skew + coef_2 * (skew * skew)
}

/// [`exponential_matrix`] of every rotation vector of a batch.
pub(crate) fn exponential_matrices<R: RotationGroup>(rotations: &R, rot_vecs: &[DVec3]) -> Vec<DMat3> {
    rot_vecs
        .par_iter()
        .map(|r| exponential_matrix(rotations, *r))
        .collect()
}
