//! # Rotation primitives
//!
//! SE(3) delegates everything that concerns its rotation block to a
//! [`RotationGroup`]. Rotations are exchanged as **rotation vectors**: the
//! direction is the rotation axis and the magnitude is the angle in radians.
//!
//! ## Canonical form
//!
//! A rotation vector is only locally a chart of SO(3): `r` and
//! `r · (1 - 2π / ‖r‖)` encode the same rotation. [`RotationGroup::regularize`]
//! picks the representative with angle in `(-π, π]` along the original axis,
//! so the returned vector always has norm at most π. At exactly π both `r` and
//! `-r` are valid and left untouched.
//!
//! ## Jacobians
//!
//! [`RotationGroup::jacobian_translation`] is the differential, in rotation
//! vector coordinates, of the left (resp. right) translation by `r` evaluated
//! at the identity:
//!
//! ```text
//! J = ψ I + (1 - ψ)/θ² r rᵀ ± ½ [r]×        ψ = (θ/2) sin θ / (1 - cos θ)
//! ```
//!
//! with `+` for the left translation. Series expansions are used near 0 and π.

use std::f64::consts::{PI, TAU};

use glam::{DMat3, DQuat, DVec3};
use rand::Rng;
use rayon::prelude::*;

use crate::{error::LieGroupError, jacobian::Side, point::validate_weights};

const SMALL_ANGLE_EPSILON: f64 = 1.0e-8;
const SERIES_EPSILON: f64 = 1.0e-3;

const POLAR_MAX_ITERATIONS: usize = 16;
const POLAR_TOLERANCE: f64 = 1.0e-24;

/// The rotation capability consumed by [`SpecialEuclidean3`](crate::SpecialEuclidean3).
pub trait RotationGroup: Sync {
    /// Dimension of the rotated space.
    fn dimension(&self) -> usize;

    /// Canonicalize a rotation vector to its shortest representative.
    fn regularize(&self, rot_vec: DVec3) -> DVec3;

    /// Rotation matrix of a rotation vector.
    fn matrix_from_rotation_vector(&self, rot_vec: DVec3) -> DMat3;

    /// Canonical rotation vector of a rotation matrix.
    fn rotation_vector_from_matrix(&self, rot_mat: &DMat3) -> DVec3;

    /// Skew-symmetric generator `[v]×` such that `[v]× u = v × u`.
    fn skew_matrix_from_vector(&self, vec: DVec3) -> DMat3;

    /// Project an approximate rotation matrix onto the closest rotation.
    fn closest_rotation_matrix(&self, mat: &DMat3) -> DMat3;

    /// Differential of the left or right translation by `rot_vec`, at the identity.
    fn jacobian_translation(&self, rot_vec: DVec3, side: Side) -> DMat3;

    /// Sample a rotation vector uniformly over the rotations.
    fn random_uniform<G: Rng>(&self, rng: &mut G) -> DVec3;

    /// Weighted intrinsic mean of a set of rotation vectors.
    fn weighted_mean(
        &self,
        rot_vecs: &[DVec3],
        weights: &[f64],
    ) -> Result<RotationMean, LieGroupError>;
}

/// Result of [`RotationGroup::weighted_mean`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMean {
    /// The mean rotation vector.
    pub mean: DVec3,
    /// Number of iterations performed, zero for a closed form.
    pub num_iterations: usize,
    /// Whether the tolerance was met before the iteration cap.
    pub converged: bool,
}

/// The 3D rotation group with rotation vector coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialOrthogonal3 {
    /// Maximum number of fixed point iterations of [`RotationGroup::weighted_mean`].
    pub mean_max_iterations: usize,
    /// Squared norm of the mean update below which the mean is considered converged.
    pub mean_tolerance: f64,
}

impl Default for SpecialOrthogonal3 {
    fn default() -> Self {
        Self {
            mean_max_iterations: 64,
            mean_tolerance: 1.0e-20,
        }
    }
}

impl SpecialOrthogonal3 {
    /// Create the rotation group with the default mean solver settings.
    pub fn new() -> Self {
        Self::default()
    }

    fn quaternion_from_rotation_vector(rot_vec: DVec3) -> DQuat {
        let theta_sq = rot_vec.length_squared();
        let theta = theta_sq.sqrt();

        let (w, b) = if theta < SMALL_ANGLE_EPSILON {
            // taylor expansion of cos(x/2) and sin(x/2)/x around 0
            (1.0 - theta_sq / 8.0, 0.5 - theta_sq / 48.0)
        } else {
            let theta_half = 0.5 * theta;
            (theta_half.cos(), theta_half.sin() / theta)
        };

        let xyz = b * rot_vec;
        DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, w)
    }

    fn rotation_vector_from_quaternion(q: DQuat) -> DVec3 {
        let (w, vec) = if q.w < 0.0 {
            (-q.w, -q.xyz())
        } else {
            (q.w, q.xyz())
        };

        let sin_half = vec.length();
        if sin_half > SMALL_ANGLE_EPSILON {
            vec * (2.0 * sin_half.atan2(w) / sin_half)
        } else {
            vec * (2.0 / w)
        }
    }
}

impl RotationGroup for SpecialOrthogonal3 {
    fn dimension(&self) -> usize {
        3
    }

    fn regularize(&self, rot_vec: DVec3) -> DVec3 {
        let angle = rot_vec.length();
        if angle == 0.0 || !angle.is_finite() {
            return rot_vec;
        }
        // number of full turns to remove so that the angle lands in (-pi, pi]
        let turns = ((angle - PI) / TAU).ceil();
        if turns <= 0.0 {
            return rot_vec;
        }
        let canonical_angle = angle - TAU * turns;
        rot_vec * (canonical_angle / angle)
    }

    fn matrix_from_rotation_vector(&self, rot_vec: DVec3) -> DMat3 {
        DMat3::from_quat(Self::quaternion_from_rotation_vector(rot_vec))
    }

    fn rotation_vector_from_matrix(&self, rot_mat: &DMat3) -> DVec3 {
        let q = DQuat::from_mat3(rot_mat).normalize();
        self.regularize(Self::rotation_vector_from_quaternion(q))
    }

    fn skew_matrix_from_vector(&self, vec: DVec3) -> DMat3 {
        let (a, b, c) = (vec.x, vec.y, vec.z);
        DMat3::from_cols_array(&[0.0, c, -b, -c, 0.0, a, b, -a, 0.0])
    }

    fn closest_rotation_matrix(&self, mat: &DMat3) -> DMat3 {
        let det = mat.determinant();
        if det.is_nan() || det <= 0.0 {
            // the polar factor would be a reflection, fall back to the quaternion fit
            return DMat3::from_quat(DQuat::from_mat3(mat).normalize());
        }

        // Newton iteration on the orthogonal polar factor: X <- (X + X^-T) / 2
        let mut x = *mat;
        for _ in 0..POLAR_MAX_ITERATIONS {
            let next = 0.5 * (x + x.inverse().transpose());
            let step = (next - x)
                .to_cols_array()
                .iter()
                .map(|v| v * v)
                .sum::<f64>();
            x = next;
            if step < POLAR_TOLERANCE {
                break;
            }
        }
        x
    }

    fn jacobian_translation(&self, rot_vec: DVec3, side: Side) -> DMat3 {
        let rot_vec = self.regularize(rot_vec);
        let angle = rot_vec.length();
        let angle_sq = angle * angle;

        let (coef_1, coef_2) = if angle < SERIES_EPSILON {
            (1.0 - angle_sq / 12.0, 1.0 / 12.0 + angle_sq / 720.0)
        } else if (angle - PI).abs() < SERIES_EPSILON {
            let psi = angle * (PI - angle) / 4.0;
            (psi, (1.0 - psi) / angle_sq)
        } else {
            // (θ/2) sin θ / (1 - cos θ) written with half angles
            let half_angle = 0.5 * angle;
            let psi = half_angle / half_angle.tan();
            (psi, (1.0 - psi) / angle_sq)
        };

        let outer = DMat3::from_cols(rot_vec * rot_vec.x, rot_vec * rot_vec.y, rot_vec * rot_vec.z);
        let skew = self.skew_matrix_from_vector(rot_vec);
        let skew_coef = match side {
            Side::Left => 0.5,
            Side::Right => -0.5,
        };

        coef_1 * DMat3::IDENTITY + coef_2 * outer + skew_coef * skew
    }

    fn random_uniform<G: Rng>(&self, rng: &mut G) -> DVec3 {
        let r1: f64 = rng.random();
        let r2: f64 = rng.random();
        let r3: f64 = rng.random();

        // uniform random quaternion (Shoemake method)
        let one_minus_r1_sqrt = (1.0 - r1).sqrt();
        let r1_sqrt = r1.sqrt();

        let w = one_minus_r1_sqrt * (TAU * r2).cos();
        let x = one_minus_r1_sqrt * (TAU * r2).sin();
        let y = r1_sqrt * (TAU * r3).cos();
        let z = r1_sqrt * (TAU * r3).sin();

        let q = DQuat::from_xyzw(x, y, z, w).normalize();
        self.regularize(Self::rotation_vector_from_quaternion(q))
    }

    fn weighted_mean(
        &self,
        rot_vecs: &[DVec3],
        weights: &[f64],
    ) -> Result<RotationMean, LieGroupError> {
        if rot_vecs.is_empty() {
            return Err(LieGroupError::NotEnoughPoints {
                method: "rotation",
                required: 1,
                actual: 0,
            });
        }
        let total_weight = validate_weights(rot_vecs.len(), weights)?;

        let rot_mats = rot_vecs
            .iter()
            .map(|r| self.matrix_from_rotation_vector(*r))
            .collect::<Vec<_>>();

        let mut mean = self.regularize(rot_vecs[0]);
        for i in 0..self.mean_max_iterations {
            let mean_mat = self.matrix_from_rotation_vector(mean);
            let mean_mat_inv = mean_mat.transpose();

            let tangent = rot_mats
                .par_iter()
                .zip(weights.par_iter())
                .map(|(rot_mat, weight)| {
                    *weight * self.rotation_vector_from_matrix(&(mean_mat_inv * *rot_mat))
                })
                .reduce(|| DVec3::ZERO, |a, b| a + b)
                / total_weight;

            mean = self
                .rotation_vector_from_matrix(&(mean_mat * self.matrix_from_rotation_vector(tangent)));

            if tangent.length_squared() < self.mean_tolerance {
                return Ok(RotationMean {
                    mean,
                    num_iterations: i + 1,
                    converged: true,
                });
            }
        }

        log::debug!(
            "rotation mean did not converge after {} iterations",
            self.mean_max_iterations
        );

        Ok(RotationMean {
            mean,
            num_iterations: self.mean_max_iterations,
            converged: false,
        })
    }
}
