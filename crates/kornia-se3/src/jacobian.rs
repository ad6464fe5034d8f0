use glam::DMat3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::LieGroupError,
    euclidean::TranslationSpace,
    group::SpecialEuclidean3,
    point::{join, split, Se3Point, Se3Tangent, POINT_SIZE},
    so3::RotationGroup,
};

const SINGULAR_EPSILON: f64 = 1.0e-12;

/// Which translation transports tangent vectors away from the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left translation `q ↦ p · q`.
    #[default]
    Left,
    /// Right translation `q ↦ q · p`.
    Right,
}

/// Differential of a left or right translation of SE(3), evaluated at the identity.
///
/// The 6x6 matrix is block lower-triangular:
///
/// ```text
/// | rotation     0           |
/// | coupling     translation |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationJacobian {
    /// Upper-left block, acting on the rotation vector.
    pub rotation: DMat3,
    /// Lower-left block, mapping rotation increments to translation increments.
    pub coupling: DMat3,
    /// Lower-right block, acting on the translation.
    pub translation: DMat3,
}

impl TranslationJacobian {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        coupling: DMat3::ZERO,
        translation: DMat3::IDENTITY,
    };

    /// Multiply a tangent vector by the Jacobian.
    pub fn mul_tangent(&self, tangent: &Se3Tangent) -> Se3Tangent {
        let (omega, u) = split(tangent);
        join(
            self.rotation * omega,
            self.coupling * omega + self.translation * u,
        )
    }

    /// Multiply a tangent vector by the transposed Jacobian.
    pub fn transpose_mul_tangent(&self, tangent: &Se3Tangent) -> Se3Tangent {
        let (omega, u) = split(tangent);
        join(
            self.rotation.transpose() * omega + self.coupling.transpose() * u,
            self.translation.transpose() * u,
        )
    }

    /// Closed form inverse by blocks.
    ///
    /// # Returns
    ///
    /// `[[A⁻¹, 0], [-D⁻¹ C A⁻¹, D⁻¹]]`, or an error if a diagonal block is singular.
    pub fn inverse(&self) -> Result<Self, LieGroupError> {
        let rotation = try_inverse(&self.rotation)?;
        let translation = try_inverse(&self.translation)?;
        Ok(Self {
            rotation,
            coupling: -(translation * self.coupling * rotation),
            translation,
        })
    }

    /// Dense row-major 6x6 representation.
    pub fn to_array(&self) -> [[f64; POINT_SIZE]; POINT_SIZE] {
        let mut out = [[0.0; POINT_SIZE]; POINT_SIZE];
        for i in 0..3 {
            let rotation = self.rotation.row(i);
            let coupling = self.coupling.row(i);
            let translation = self.translation.row(i);
            out[i][..3].copy_from_slice(&rotation.to_array());
            out[i + 3][..3].copy_from_slice(&coupling.to_array());
            out[i + 3][3..].copy_from_slice(&translation.to_array());
        }
        out
    }
}

/// Invert a 3x3 block, rejecting (near) singular matrices.
pub(crate) fn try_inverse(mat: &DMat3) -> Result<DMat3, LieGroupError> {
    let det = mat.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(LieGroupError::SingularMatrix(det));
    }
    Ok(mat.inverse())
}

impl<R: RotationGroup, T: TranslationSpace> SpecialEuclidean3<R, T> {
    /// Jacobian of the left or right translation by `point`, at the identity.
    ///
    /// # Arguments
    ///
    /// * `point` - The group element defining the translation.
    /// * `side` - Whether the translation acts on the left or on the right.
    ///
    /// # Returns
    ///
    /// For [`Side::Left`] the rotation block is the SO(3) left Jacobian and the
    /// translation block the rotation matrix of `point`. For [`Side::Right`] the
    /// rotation block is the SO(3) right Jacobian, the coupling block `-[t]×` and
    /// the translation block the identity.
    pub fn jacobian_translation(&self, point: &Se3Point, side: Side) -> TranslationJacobian {
        let (rot_vec, translation) = split(&self.regularize_point(point));
        let rotations = self.rotations();
        let rotation = rotations.jacobian_translation(rot_vec, side);

        match side {
            Side::Left => TranslationJacobian {
                rotation,
                coupling: DMat3::ZERO,
                translation: rotations.matrix_from_rotation_vector(rot_vec),
            },
            Side::Right => TranslationJacobian {
                rotation,
                coupling: -rotations.skew_matrix_from_vector(translation),
                translation: DMat3::IDENTITY,
            },
        }
    }

    /// Jacobians of a batch of group elements.
    pub fn jacobian_translation_batch(
        &self,
        points: &[Se3Point],
        side: Side,
    ) -> Vec<TranslationJacobian> {
        points
            .par_iter()
            .map(|p| self.jacobian_translation(p, side))
            .collect()
    }
}
