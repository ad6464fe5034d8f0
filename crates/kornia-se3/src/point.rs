//! Layout and shape validation of SE(3) elements.
//!
//! An element is stored as a 6-vector `[r, t]` where `r` is a rotation vector
//! (axis scaled by the angle in radians) and `t` is a translation. Tangent
//! vectors use the same layout `[ω, v]`.

use glam::DVec3;

use crate::error::LieGroupError;

/// Dimension of the rotated space, SE(n) is only implemented for n = 3.
pub const SPACE_DIMENSION: usize = 3;

/// Number of components of a group element or a tangent vector.
pub const POINT_SIZE: usize = 6;

/// An element of SE(3) as `[rx, ry, rz, tx, ty, tz]`.
pub type Se3Point = [f64; POINT_SIZE];

/// A tangent vector of SE(3) as `[ωx, ωy, ωz, vx, vy, vz]`.
pub type Se3Tangent = [f64; POINT_SIZE];

/// Check whether a row has the size of an element of SE(3).
///
/// # Arguments
///
/// * `point` - The components of the candidate element.
///
/// # Returns
///
/// `true` if the last axis has exactly 6 components.
pub fn belongs(point: &[f64]) -> bool {
    point.len() == POINT_SIZE
}

/// Validate a dynamically sized row and convert it to a group element.
///
/// The rotation block is not canonicalized here, see
/// [`SpecialEuclidean3::regularize`](crate::SpecialEuclidean3::regularize).
pub fn validate_point(point: &[f64]) -> Result<Se3Point, LieGroupError> {
    if !belongs(point) {
        return Err(LieGroupError::InvalidShape {
            expected: POINT_SIZE,
            actual: point.len(),
        });
    }
    let mut out = [0.0; POINT_SIZE];
    out.copy_from_slice(point);
    Ok(out)
}

/// Validate a row-major `N x 6` buffer and split it into group elements.
///
/// # Arguments
///
/// * `data` - The flattened batch with 6 values per row.
///
/// # Returns
///
/// The rows of the batch, or an error if the buffer length is not a multiple of 6.
pub fn points_from_flat(data: &[f64]) -> Result<Vec<Se3Point>, LieGroupError> {
    if data.len() % POINT_SIZE != 0 {
        return Err(LieGroupError::InvalidBufferLength {
            len: data.len(),
            row_size: POINT_SIZE,
        });
    }
    data.chunks_exact(POINT_SIZE).map(validate_point).collect()
}

/// Check that the weights pair with the points and return their sum.
pub(crate) fn validate_weights(num_points: usize, weights: &[f64]) -> Result<f64, LieGroupError> {
    if weights.len() != num_points {
        return Err(LieGroupError::WeightsMismatch {
            points: num_points,
            weights: weights.len(),
        });
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(LieGroupError::InvalidWeights);
    }
    let total = weights.iter().sum::<f64>();
    if total <= 0.0 {
        return Err(LieGroupError::InvalidWeights);
    }
    Ok(total)
}

/// Split a 6-vector into its rotation and translation blocks.
#[inline]
pub(crate) fn split(point: &[f64; POINT_SIZE]) -> (DVec3, DVec3) {
    (
        DVec3::new(point[0], point[1], point[2]),
        DVec3::new(point[3], point[4], point[5]),
    )
}

/// Concatenate a rotation block and a translation block.
#[inline]
pub(crate) fn join(rotation: DVec3, translation: DVec3) -> [f64; POINT_SIZE] {
    [
        rotation.x,
        rotation.y,
        rotation.z,
        translation.x,
        translation.y,
        translation.z,
    ]
}
