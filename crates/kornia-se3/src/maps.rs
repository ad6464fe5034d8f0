//! Group exponential and logarithm of SE(3).
//!
//! From the identity, the exponential of `[ω, u]` is `[ω, V(ω) u]` with
//! `V = I + c1 [ω]× + c2 [ω]×²`, and the logarithm applies `V⁻¹`, which has the
//! same shape with `c1 = -1/2`. The coefficients are evaluated through series
//! expansions close to the angles where the closed forms cancel or blow up, see
//! [`AngleRegime`].
//!
//! Away from the identity the maps are transported by a translation Jacobian:
//!
//! ```text
//! exp_p(v) = p · exp(J⁻¹ v)          log_p(q) = J log(p⁻¹ q)          (left)
//! exp_p(v) = exp(J⁻¹ v) · p          log_p(q) = J log(q p⁻¹)          (right)
//! ```

use std::f64::consts::PI;

use glam::DVec3;
use rayon::prelude::*;

use crate::{
    error::LieGroupError,
    euclidean::TranslationSpace,
    group::{broadcast_map, SpecialEuclidean3},
    jacobian::Side,
    point::{join, split, Se3Point, Se3Tangent},
    so3::RotationGroup,
};

/// Half width of the angle ranges around 0 and π evaluated with series expansions.
pub(crate) const SERIES_EPSILON: f64 = 1.0e-3;

/// Which formula evaluates the coefficients of a rotation angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AngleRegime {
    /// Exactly zero, the rotation block does not act on the translation.
    Zero,
    /// Taylor expansion around 0.
    NearZero,
    /// Expansion around π, only the logarithm is singular there.
    NearPi,
    /// Closed form.
    Generic,
}

impl AngleRegime {
    pub(crate) fn classify(angle: f64) -> Self {
        if angle == 0.0 {
            Self::Zero
        } else if angle < SERIES_EPSILON {
            Self::NearZero
        } else if (angle - PI).abs() < SERIES_EPSILON {
            Self::NearPi
        } else {
            Self::Generic
        }
    }
}

/// Coefficients `(c1, c2)` of `V = I + c1 S + c2 S²`.
pub(crate) fn exp_coefficients(angle: f64) -> (f64, f64) {
    match AngleRegime::classify(angle) {
        AngleRegime::Zero => (0.0, 0.0),
        AngleRegime::NearZero => {
            let angle_sq = angle * angle;
            let angle_4 = angle_sq * angle_sq;
            (
                0.5 - angle_sq / 24.0 + angle_4 / 720.0,
                1.0 / 6.0 - angle_sq / 120.0 + angle_4 / 5040.0,
            )
        }
        AngleRegime::NearPi | AngleRegime::Generic => {
            let angle_sq = angle * angle;
            (
                (1.0 - angle.cos()) / angle_sq,
                (angle - angle.sin()) / (angle_sq * angle),
            )
        }
    }
}

/// Coefficients `(c1, c2)` of `V⁻¹ = I + c1 S + c2 S²`.
///
/// Away from zero `c2 = (1 - ψ)/θ²` with `ψ = (θ/2)/tan(θ/2)`. Its limit at zero
/// is `1/12`, so the series window uses the expansion `1/12 + θ²/720` of that same
/// expression: the logarithm stays the inverse of the exponential and is
/// continuous at the window boundary.
pub(crate) fn log_coefficients(angle: f64) -> (f64, f64) {
    let angle_sq = angle * angle;
    match AngleRegime::classify(angle) {
        AngleRegime::Zero => (0.0, 0.0),
        AngleRegime::NearZero => (-0.5, 1.0 / 12.0 + angle_sq / 720.0),
        AngleRegime::NearPi => {
            let delta = angle - PI;
            let psi = 0.5 * angle * (-0.5 * delta - delta * delta * delta / 24.0);
            (-0.5, (1.0 - psi) / angle_sq)
        }
        AngleRegime::Generic => {
            let half_angle = 0.5 * angle;
            let psi = half_angle / half_angle.tan();
            (-0.5, (1.0 - psi) / angle_sq)
        }
    }
}

impl<R: RotationGroup, T: TranslationSpace> SpecialEuclidean3<R, T> {
    /// Apply `I + c1 [ω]× + c2 [ω]×²` to `u`.
    fn apply_coefficients(&self, omega: DVec3, u: DVec3, coefs: (f64, f64)) -> DVec3 {
        let skew = self.rotations().skew_matrix_from_vector(omega);
        let skew_u = skew * u;
        u + coefs.0 * skew_u + coefs.1 * (skew * skew_u)
    }

    /// Group exponential of a Lie algebra element.
    ///
    /// # Arguments
    ///
    /// * `tangent` - The tangent vector `[ω, u]` at the identity.
    ///
    /// # Returns
    ///
    /// The regularized group element `[ω, V(ω) u]`.
    pub fn group_exp_from_identity(&self, tangent: &Se3Tangent) -> Se3Point {
        let (omega, u) = split(tangent);
        let translation = self.apply_coefficients(omega, u, exp_coefficients(omega.length()));
        self.regularize_point(&join(omega, translation))
    }

    /// Group logarithm of a group element, as a tangent vector at the identity.
    ///
    /// # Arguments
    ///
    /// * `point` - The group element, regularized before use.
    ///
    /// # Returns
    ///
    /// The Lie algebra element `[ω, V(ω)⁻¹ t]`.
    pub fn group_log_from_identity(&self, point: &Se3Point) -> Se3Tangent {
        let (omega, translation) = split(&self.regularize_point(point));
        let u = self.apply_coefficients(omega, translation, log_coefficients(omega.length()));
        join(omega, u)
    }

    /// Exponential map at `base` with the left-invariant transport.
    pub fn exp_at(&self, base: &Se3Point, tangent: &Se3Tangent) -> Result<Se3Point, LieGroupError> {
        self.exp_at_side(base, tangent, Side::Left)
    }

    /// Logarithm map at `base` with the left-invariant transport.
    pub fn log_at(&self, base: &Se3Point, point: &Se3Point) -> Se3Tangent {
        self.log_at_side(base, point, Side::Left)
    }

    /// Exponential map at `base`, transported by the translation on `side`.
    ///
    /// # Arguments
    ///
    /// * `base` - The base point.
    /// * `tangent` - A tangent vector at `base`.
    /// * `side` - The translation used to carry `tangent` back to the identity.
    ///
    /// # Returns
    ///
    /// The end point of the group geodesic, or an error if the Jacobian at `base`
    /// is singular.
    pub fn exp_at_side(
        &self,
        base: &Se3Point,
        tangent: &Se3Tangent,
        side: Side,
    ) -> Result<Se3Point, LieGroupError> {
        let base = self.regularize_point(base);
        let jacobian_inv = self.jacobian_translation(&base, side).inverse()?;
        let exp = self.group_exp_from_identity(&jacobian_inv.mul_tangent(tangent));
        Ok(match side {
            Side::Left => self.compose(&base, &exp),
            Side::Right => self.compose(&exp, &base),
        })
    }

    /// Logarithm map at `base`, transported by the translation on `side`.
    pub fn log_at_side(&self, base: &Se3Point, point: &Se3Point, side: Side) -> Se3Tangent {
        let base = self.regularize_point(base);
        let base_inv = self.inverse(&base);
        let near_identity = match side {
            Side::Left => self.compose(&base_inv, point),
            Side::Right => self.compose(point, &base_inv),
        };
        self.jacobian_translation(&base, side)
            .mul_tangent(&self.group_log_from_identity(&near_identity))
    }

    /// Group exponential of every row of a batch.
    pub fn group_exp_from_identity_batch(&self, tangents: &[Se3Tangent]) -> Vec<Se3Point> {
        tangents
            .par_iter()
            .map(|v| self.group_exp_from_identity(v))
            .collect()
    }

    /// Group logarithm of every row of a batch.
    pub fn group_log_from_identity_batch(&self, points: &[Se3Point]) -> Vec<Se3Tangent> {
        points
            .par_iter()
            .map(|p| self.group_log_from_identity(p))
            .collect()
    }

    /// Row by row [`Self::exp_at_side`], broadcasting a batch of length one.
    pub fn exp_at_batch(
        &self,
        bases: &[Se3Point],
        tangents: &[Se3Tangent],
        side: Side,
    ) -> Result<Vec<Se3Point>, LieGroupError> {
        broadcast_map(bases, tangents, |base, tangent| {
            self.exp_at_side(base, tangent, side)
        })
    }

    /// Row by row [`Self::log_at_side`], broadcasting a batch of length one.
    pub fn log_at_batch(
        &self,
        bases: &[Se3Point],
        points: &[Se3Point],
        side: Side,
    ) -> Result<Vec<Se3Tangent>, LieGroupError> {
        broadcast_map(bases, points, |base, point| {
            Ok(self.log_at_side(base, point, side))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::FRAC_PI_2;

    fn assert_point_eq(a: &Se3Point, b: &Se3Point, epsilon: f64) {
        for i in 0..6 {
            assert_relative_eq!(a[i], b[i], epsilon = epsilon);
        }
    }

    #[test]
    fn test_angle_regime() {
        assert_eq!(AngleRegime::classify(0.0), AngleRegime::Zero);
        assert_eq!(AngleRegime::classify(1e-5), AngleRegime::NearZero);
        assert_eq!(AngleRegime::classify(1.0), AngleRegime::Generic);
        assert_eq!(AngleRegime::classify(PI - 1e-5), AngleRegime::NearPi);
        assert_eq!(AngleRegime::classify(PI), AngleRegime::NearPi);
    }

    #[test]
    fn test_exp_pure_translation() {
        let se3 = SpecialEuclidean3::default();
        let v = [0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        assert_eq!(se3.group_exp_from_identity(&v), v);
        assert_eq!(se3.group_log_from_identity(&v), v);
    }

    #[test]
    fn test_exp_quarter_turn() {
        // rotating about z while moving along x sweeps a quarter circle
        let se3 = SpecialEuclidean3::default();
        let v = [0.0, 0.0, FRAC_PI_2, FRAC_PI_2, 0.0, 0.0];
        let p = se3.group_exp_from_identity(&v);
        assert_point_eq(&p, &[0.0, 0.0, FRAC_PI_2, 1.0, 1.0, 0.0], 1e-12);
        assert_point_eq(&se3.group_log_from_identity(&p), &v, 1e-12);
    }

    #[test]
    fn test_exp_matches_integrated_screw() {
        let se3 = SpecialEuclidean3::default();
        let v = [0.3, -0.5, 0.8, 1.0, -2.0, 0.5];
        let steps = 20_000;
        let small = v.map(|x| x / steps as f64);
        let mut p = se3.identity();
        for _ in 0..steps {
            p = se3.compose(&p, &small);
        }
        let exp = se3.group_exp_from_identity(&v);
        // composing n times exp(v/n) ~ exp(v), the chart error of v/n is O(1/n)
        assert_point_eq(&exp, &p, 1e-3);
    }

    #[test]
    fn test_exp_log_roundtrip() {
        let se3 = SpecialEuclidean3::default();
        let tangents = [
            [0.1, 0.2, 0.3, 1.0, 2.0, 3.0],
            [1e-4, 0.0, -2e-4, 0.5, -0.5, 0.1],
            [1e-9, 1e-9, 0.0, 1.0, 1.0, 1.0],
            [0.0, 2.0, 1.0, -3.0, 0.0, 1.0],
            [0.0, 0.0, PI - 1e-4, 1.0, 2.0, 3.0],
        ];
        for v in tangents.iter() {
            let p = se3.group_exp_from_identity(v);
            assert_point_eq(&se3.group_log_from_identity(&p), v, 1e-9);
            assert_point_eq(&se3.group_exp_from_identity(&se3.group_log_from_identity(&p)), &p, 1e-9);
        }
    }

    #[test]
    fn test_exp_beyond_pi_is_regularized() {
        // the unregularized tangent and its result describe the same transformation
        let se3 = SpecialEuclidean3::default();
        let v = [0.0, 0.0, 1.5 * PI, 1.0, 0.0, 0.5];
        let p = se3.group_exp_from_identity(&v);
        assert_relative_eq!(p[2], -0.5 * PI, epsilon = 1e-12);

        let steps = 20_000;
        let small = v.map(|x| x / steps as f64);
        let mut q = se3.identity();
        for _ in 0..steps {
            q = se3.compose(&q, &small);
        }
        assert_point_eq(&p, &q, 1e-3);
    }

    #[test]
    fn test_branch_continuity_near_zero() {
        let se3 = SpecialEuclidean3::default();
        let axis = DVec3::new(0.2, -0.6, 1.0).normalize();
        let u = DVec3::new(1.0, 2.0, 3.0);
        let below = axis * (SERIES_EPSILON - 1e-10);
        let above = axis * (SERIES_EPSILON + 1e-10);

        let exp_below = se3.group_exp_from_identity(&join(below, u));
        let exp_above = se3.group_exp_from_identity(&join(above, u));
        assert_point_eq(&exp_below, &exp_above, 1e-9);

        let log_below = se3.group_log_from_identity(&join(below, u));
        let log_above = se3.group_log_from_identity(&join(above, u));
        assert_point_eq(&log_below, &log_above, 1e-9);
    }

    #[test]
    fn test_log_series_near_zero() {
        let generic = |angle: f64| {
            let half_angle = 0.5 * angle;
            (1.0 - half_angle / half_angle.tan()) / (angle * angle)
        };

        let (c1, c2) = log_coefficients(1e-6);
        assert_eq!(c1, -0.5);
        assert_relative_eq!(c2, 1.0 / 12.0, epsilon = 1e-12);

        let inside = log_coefficients(SERIES_EPSILON - 1e-10).1;
        assert_relative_eq!(inside, generic(SERIES_EPSILON + 1e-10), epsilon = 1e-9);

        // the exponential and logarithm coefficients invert each other
        let (angle, omega) = (5e-4, DVec3::new(3e-4, -4e-4, 0.0));
        let se3 = SpecialEuclidean3::default();
        let u = DVec3::new(1.0, -2.0, 0.5);
        let v = se3.group_log_from_identity(&se3.group_exp_from_identity(&join(omega, u)));
        assert_relative_eq!(omega.length(), angle, epsilon = 1e-15);
        assert_point_eq(&v, &join(omega, u), 1e-12);
    }

    #[test]
    fn test_branch_continuity_near_pi() {
        let se3 = SpecialEuclidean3::default();
        let axis = DVec3::new(-1.0, 0.5, 0.25).normalize();
        let t = DVec3::new(1.0, -2.0, 0.5);
        let below = axis * (PI - SERIES_EPSILON - 1e-10);
        let above = axis * (PI - SERIES_EPSILON + 1e-10);

        let log_below = se3.group_log_from_identity(&join(below, t));
        let log_above = se3.group_log_from_identity(&join(above, t));
        assert_point_eq(&log_below, &log_above, 1e-8);

        // the series matches the closed form inside the window
        let (_, series) = log_coefficients(PI - 1e-4);
        let half_angle = 0.5 * (PI - 1e-4);
        let closed = (1.0 - half_angle / half_angle.tan()) / ((PI - 1e-4) * (PI - 1e-4));
        assert_relative_eq!(series, closed, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_coefficients_series() {
        let angle: f64 = 5e-4;
        let (c1, c2) = exp_coefficients(angle);
        assert_relative_eq!(c1, 0.5, epsilon = 1e-7);
        assert_relative_eq!(c2, 1.0 / 6.0, epsilon = 1e-7);
        assert_eq!(exp_coefficients(0.0), (0.0, 0.0));
    }

    #[test]
    fn test_exp_at_identity() -> Result<(), LieGroupError> {
        let se3 = SpecialEuclidean3::default();
        let v = [0.1, -0.3, 0.2, 1.0, 0.5, -0.5];
        for side in [Side::Left, Side::Right] {
            let p = se3.exp_at_side(&se3.identity(), &v, side)?;
            assert_point_eq(&p, &se3.group_exp_from_identity(&v), 1e-12);
            assert_point_eq(&se3.log_at_side(&se3.identity(), &p, side), &v, 1e-10);
        }
        Ok(())
    }

    #[test]
    fn test_exp_log_at_base_roundtrip() -> Result<(), LieGroupError> {
        let se3 = SpecialEuclidean3::default();
        let mut rng = StdRng::seed_from_u64(5);
        let v = [0.2, 0.1, -0.3, 0.5, -1.0, 0.25];
        for base in se3.random_uniform_batch(&mut rng, 10) {
            for side in [Side::Left, Side::Right] {
                let p = se3.exp_at_side(&base, &v, side)?;
                assert_point_eq(&se3.log_at_side(&base, &p, side), &v, 1e-8);

                let q = se3.compose(&base, &[0.1, -0.2, 0.05, 0.3, 0.3, -0.1]);
                let w = se3.log_at_side(&base, &q, side);
                assert_point_eq(&se3.exp_at_side(&base, &w, side)?, &q, 1e-8);
            }
        }
        Ok(())
    }

    #[test]
    fn test_log_at_base_is_zero() {
        let se3 = SpecialEuclidean3::default();
        let p = [0.4, 0.2, -1.0, 3.0, 2.0, 1.0];
        for side in [Side::Left, Side::Right] {
            assert_point_eq(&se3.log_at_side(&p, &p, side), &[0.0; 6], 1e-10);
        }
    }

    #[test]
    fn test_batches() -> Result<(), LieGroupError> {
        let se3 = SpecialEuclidean3::default();
        let mut rng = StdRng::seed_from_u64(9);
        let bases = se3.random_uniform_batch(&mut rng, 4);
        let tangents = [
            [0.1, 0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.2, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.3, 0.0, 0.0, 1.0],
            [0.1, 0.1, 0.1, 1.0, 1.0, 1.0],
        ];

        let exps = se3.group_exp_from_identity_batch(&tangents);
        let logs = se3.group_log_from_identity_batch(&exps);
        for i in 0..4 {
            assert_point_eq(&logs[i], &tangents[i], 1e-10);
        }

        let moved = se3.exp_at_batch(&bases, &tangents, Side::Left)?;
        let back = se3.log_at_batch(&bases, &moved, Side::Left)?;
        for i in 0..4 {
            assert_point_eq(&moved[i], &se3.exp_at(&bases[i], &tangents[i])?, 1e-12);
            assert_point_eq(&back[i], &tangents[i], 1e-8);
        }

        let broadcast = se3.log_at_batch(&bases[..1], &bases, Side::Right)?;
        assert_eq!(broadcast.len(), 4);
        assert_point_eq(&broadcast[0], &[0.0; 6], 1e-10);

        assert_eq!(
            se3.exp_at_batch(&bases[..2], &tangents[..3], Side::Left),
            Err(LieGroupError::BatchMismatch { left: 2, right: 3 })
        );
        Ok(())
    }
}
