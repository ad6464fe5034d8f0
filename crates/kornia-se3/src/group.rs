use glam::{DMat3, DMat4, DVec4};
use rand::Rng;
use rayon::prelude::*;

use crate::{
    error::LieGroupError,
    euclidean::{EuclideanSpace3, TranslationSpace},
    point::{belongs, join, split, validate_point, Se3Point, SPACE_DIMENSION},
    so3::{RotationGroup, SpecialOrthogonal3},
};

/// The group SE(3) of rigid body transformations in rotation vector coordinates.
///
/// The group owns its rotation and translation collaborators, which are injected
/// at construction. Every operation regularizes the group elements it consumes
/// and returns.
///
/// # Example
///
/// ```
/// use kornia_se3::SpecialEuclidean3;
///
/// let se3 = SpecialEuclidean3::new(3).unwrap();
/// let p = [0.0, 0.0, std::f64::consts::FRAC_PI_2, 1.0, 0.0, 0.0];
/// let identity = se3.compose(&p, &se3.inverse(&p));
/// assert!(identity.iter().all(|v| v.abs() < 1e-12));
/// ```
#[derive(Debug, Clone)]
pub struct SpecialEuclidean3<R = SpecialOrthogonal3, T = EuclideanSpace3> {
    rotations: R,
    translations: T,
}

impl SpecialEuclidean3 {
    /// Create SE(n) with the default collaborators.
    ///
    /// # Arguments
    ///
    /// * `dimension` - Dimension of the rotated space, only 3 is supported.
    pub fn new(dimension: usize) -> Result<Self, LieGroupError> {
        if dimension != SPACE_DIMENSION {
            return Err(LieGroupError::UnsupportedDimension(dimension));
        }
        Ok(Self {
            rotations: SpecialOrthogonal3::default(),
            translations: EuclideanSpace3,
        })
    }
}

impl Default for SpecialEuclidean3 {
    fn default() -> Self {
        Self {
            rotations: SpecialOrthogonal3::default(),
            translations: EuclideanSpace3,
        }
    }
}

impl<R: RotationGroup, T: TranslationSpace> SpecialEuclidean3<R, T> {
    /// Create SE(3) from explicit rotation and translation collaborators.
    pub fn with_components(rotations: R, translations: T) -> Result<Self, LieGroupError> {
        for dimension in [rotations.dimension(), translations.dimension()] {
            if dimension != SPACE_DIMENSION {
                return Err(LieGroupError::UnsupportedDimension(dimension));
            }
        }
        Ok(Self {
            rotations,
            translations,
        })
    }

    /// The rotation collaborator.
    pub fn rotations(&self) -> &R {
        &self.rotations
    }

    /// The translation collaborator.
    pub fn translations(&self) -> &T {
        &self.translations
    }

    /// The identity element.
    #[inline]
    pub fn identity(&self) -> Se3Point {
        [0.0; 6]
    }

    /// Check whether a row has the shape of a group element.
    #[inline]
    pub fn belongs(&self, point: &[f64]) -> bool {
        belongs(point)
    }

    /// Validate a dynamically sized row and canonicalize its rotation block.
    pub fn regularize(&self, point: &[f64]) -> Result<Se3Point, LieGroupError> {
        let point = validate_point(point)?;
        Ok(self.regularize_point(&point))
    }

    /// Canonicalize the rotation block of a group element.
    pub fn regularize_point(&self, point: &Se3Point) -> Se3Point {
        let (rot_vec, translation) = split(point);
        join(self.rotations.regularize(rot_vec), translation)
    }

    /// Canonicalize every row of a batch.
    pub fn regularize_batch(&self, points: &[Se3Point]) -> Vec<Se3Point> {
        points.par_iter().map(|p| self.regularize_point(p)).collect()
    }

    /// Group inverse `(R, t)^-1 = (R^-1, R^-1 (-t))`.
    pub fn inverse(&self, point: &Se3Point) -> Se3Point {
        let (rot_vec, translation) = split(&self.regularize_point(point));
        let inv_rot_vec = -rot_vec;
        let inv_rot_mat = self.rotations.matrix_from_rotation_vector(inv_rot_vec);
        self.regularize_point(&join(inv_rot_vec, inv_rot_mat * -translation))
    }

    /// Group inverse of every row of a batch.
    pub fn inverse_batch(&self, points: &[Se3Point]) -> Vec<Se3Point> {
        points.par_iter().map(|p| self.inverse(p)).collect()
    }

    /// Group composition `a . b = (R_a R_b, R_a t_b + t_a)`.
    ///
    /// The rotation matrices are projected onto the closest rotation before
    /// being multiplied, so repeated composition does not drift off the group.
    pub fn compose(&self, a: &Se3Point, b: &Se3Point) -> Se3Point {
        let (rot_vec_a, translation_a) = split(&self.regularize_point(a));
        let (rot_vec_b, translation_b) = split(&self.regularize_point(b));

        let rot_mat_a = self
            .rotations
            .closest_rotation_matrix(&self.rotations.matrix_from_rotation_vector(rot_vec_a));
        let rot_mat_b = self
            .rotations
            .closest_rotation_matrix(&self.rotations.matrix_from_rotation_vector(rot_vec_b));

        let rot_vec = self.rotations.rotation_vector_from_matrix(&(rot_mat_a * rot_mat_b));
        let translation = rot_mat_a * translation_b + translation_a;

        self.regularize_point(&join(rot_vec, translation))
    }

    /// Row by row composition of two batches.
    ///
    /// The batches must have the same length, or one of them a single element
    /// which is then composed with every row of the other.
    pub fn compose_batch(
        &self,
        a: &[Se3Point],
        b: &[Se3Point],
    ) -> Result<Vec<Se3Point>, LieGroupError> {
        broadcast_map(a, b, |a, b| Ok(self.compose(a, b)))
    }

    /// Sample a group element: a uniform rotation and a translation in `[-1, 1)³`.
    pub fn random_uniform<G: Rng>(&self, rng: &mut G) -> Se3Point {
        let rot_vec = self.rotations.random_uniform(rng);
        let translation = self.translations.random_uniform(rng);
        self.regularize_point(&join(rot_vec, translation))
    }

    /// Sample `num_points` group elements.
    pub fn random_uniform_batch<G: Rng>(&self, rng: &mut G, num_points: usize) -> Vec<Se3Point> {
        (0..num_points).map(|_| self.random_uniform(rng)).collect()
    }

    /// The 4x4 homogeneous matrix of a group element.
    pub fn to_matrix(&self, point: &Se3Point) -> DMat4 {
        let (rot_vec, translation) = split(&self.regularize_point(point));
        let mut matrix = DMat4::from_mat3(self.rotations.matrix_from_rotation_vector(rot_vec));
        matrix.w_axis = DVec4::new(translation.x, translation.y, translation.z, 1.0);
        matrix
    }

    /// The group element of a 4x4 homogeneous matrix.
    ///
    /// The upper-left block is projected onto the closest rotation.
    pub fn from_matrix(&self, matrix: &DMat4) -> Se3Point {
        let rot_mat = self
            .rotations
            .closest_rotation_matrix(&DMat3::from_mat4(*matrix));
        let rot_vec = self.rotations.rotation_vector_from_matrix(&rot_mat);
        self.regularize_point(&join(rot_vec, matrix.w_axis.truncate()))
    }
}

/// Apply `f` row by row to two batches, broadcasting a batch of length one.
pub(crate) fn broadcast_map<A, B, O, F>(
    left: &[A],
    right: &[B],
    f: F,
) -> Result<Vec<O>, LieGroupError>
where
    A: Sync,
    B: Sync,
    O: Send,
    F: Fn(&A, &B) -> Result<O, LieGroupError> + Sync + Send,
{
    match (left.len(), right.len()) {
        (n, m) if n == m => left
            .par_iter()
            .zip(right.par_iter())
            .map(|(a, b)| f(a, b))
            .collect(),
        (1, _) => right.par_iter().map(|b| f(&left[0], b)).collect(),
        (_, 1) => left.par_iter().map(|a| f(a, &right[0])).collect(),
        (n, m) => Err(LieGroupError::BatchMismatch { left: n, right: m }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPSILON: f64 = 1e-10;

    fn assert_point_eq(a: &Se3Point, b: &Se3Point, epsilon: f64) {
        for i in 0..6 {
            assert_relative_eq!(a[i], b[i], epsilon = epsilon);
        }
    }

    #[test]
    fn test_new() {
        assert!(SpecialEuclidean3::new(3).is_ok());
        assert_eq!(
            SpecialEuclidean3::new(2).unwrap_err(),
            LieGroupError::UnsupportedDimension(2)
        );
    }

    #[test]
    fn test_with_components() -> Result<(), LieGroupError> {
        let se3 = SpecialEuclidean3::with_components(SpecialOrthogonal3::new(), EuclideanSpace3)?;
        assert_eq!(se3.rotations().dimension(), 3);
        assert_eq!(se3.translations().dimension(), 3);
        Ok(())
    }

    #[test]
    fn test_regularize() -> Result<(), LieGroupError> {
        let se3 = SpecialEuclidean3::default();

        let p = se3.regularize(&[0.0, 0.0, 2.0 * PI + 0.1, 1.0, 2.0, 3.0])?;
        assert_point_eq(&p, &[0.0, 0.0, 0.1, 1.0, 2.0, 3.0], 1e-12);

        assert_eq!(
            se3.regularize(&[0.0; 4]),
            Err(LieGroupError::InvalidShape {
                expected: 6,
                actual: 4
            })
        );
        Ok(())
    }

    #[test]
    fn test_identity_compose() {
        let se3 = SpecialEuclidean3::default();
        let identity = se3.identity();
        assert_eq!(se3.compose(&identity, &identity), [0.0; 6]);
    }

    #[test]
    fn test_compose_quarter_turn() {
        let se3 = SpecialEuclidean3::default();
        let rot = [0.0, 0.0, FRAC_PI_2, 0.0, 0.0, 0.0];
        let rot_inv = [0.0, 0.0, -FRAC_PI_2, 0.0, 0.0, 0.0];
        assert_point_eq(&se3.compose(&rot, &rot_inv), &se3.identity(), EPSILON);

        // the rotation acts on the translation of the right operand
        let shift = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let moved = se3.compose(&rot, &shift);
        assert_point_eq(&moved, &[0.0, 0.0, FRAC_PI_2, 0.0, 1.0, 0.0], EPSILON);
        let moved = se3.compose(&shift, &rot);
        assert_point_eq(&moved, &[0.0, 0.0, FRAC_PI_2, 1.0, 0.0, 0.0], EPSILON);
    }

    #[test]
    fn test_inverse() {
        let se3 = SpecialEuclidean3::default();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            let p = se3.random_uniform(&mut rng);
            let p_inv = se3.inverse(&p);
            assert_point_eq(&se3.compose(&p, &p_inv), &se3.identity(), 1e-9);
            assert_point_eq(&se3.compose(&p_inv, &p), &se3.identity(), 1e-9);
            assert_point_eq(&se3.inverse(&p_inv), &p, 1e-9);
        }
    }

    #[test]
    fn test_compose_batch_broadcast() -> Result<(), LieGroupError> {
        let se3 = SpecialEuclidean3::default();
        let mut rng = StdRng::seed_from_u64(1);
        let a = se3.random_uniform_batch(&mut rng, 5);
        let b = se3.random_uniform_batch(&mut rng, 5);

        let rowwise = se3.compose_batch(&a, &b)?;
        for i in 0..5 {
            assert_point_eq(&rowwise[i], &se3.compose(&a[i], &b[i]), 1e-12);
        }

        let left_broadcast = se3.compose_batch(&a[..1], &b)?;
        for i in 0..5 {
            assert_point_eq(&left_broadcast[i], &se3.compose(&a[0], &b[i]), 1e-12);
        }

        let right_broadcast = se3.compose_batch(&a, &b[2..3])?;
        for i in 0..5 {
            assert_point_eq(&right_broadcast[i], &se3.compose(&a[i], &b[2]), 1e-12);
        }

        assert_eq!(
            se3.compose_batch(&a[..2], &b[..3]),
            Err(LieGroupError::BatchMismatch { left: 2, right: 3 })
        );
        Ok(())
    }

    #[test]
    fn test_inverse_batch() {
        let se3 = SpecialEuclidean3::default();
        let mut rng = StdRng::seed_from_u64(2);
        let points = se3.random_uniform_batch(&mut rng, 8);
        let inverses = se3.inverse_batch(&points);
        assert_eq!(inverses.len(), points.len());
        for (p, p_inv) in points.iter().zip(inverses.iter()) {
            assert_point_eq(p_inv, &se3.inverse(p), 1e-12);
        }
    }

    #[test]
    fn test_matrix_roundtrip() {
        let se3 = SpecialEuclidean3::default();
        let p = [0.3, -0.2, 0.9, 1.0, -2.0, 0.5];
        let matrix = se3.to_matrix(&p);
        assert_relative_eq!(matrix.w_axis.w, 1.0);
        assert_relative_eq!(matrix.x_axis.w, 0.0);
        assert_point_eq(&se3.from_matrix(&matrix), &p, 1e-10);

        // composition is the product of the homogeneous matrices
        let q = [-0.5, 0.1, 0.2, 0.0, 3.0, -1.0];
        let product = se3.to_matrix(&p) * se3.to_matrix(&q);
        assert_point_eq(&se3.from_matrix(&product), &se3.compose(&p, &q), 1e-10);
    }

    #[test]
    fn test_random_uniform_is_canonical() {
        let se3 = SpecialEuclidean3::default();
        let mut rng = StdRng::seed_from_u64(3);
        for p in se3.random_uniform_batch(&mut rng, 50) {
            let (rot_vec, _) = split(&p);
            assert!(rot_vec.length() <= PI + 1e-12);
            assert_eq!(se3.regularize_point(&p), p);
        }
    }
}
