use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::LieGroupError,
    euclidean::TranslationSpace,
    group::{broadcast_map, SpecialEuclidean3},
    jacobian::Side,
    point::{split, Se3Point, Se3Tangent, POINT_SIZE},
    so3::RotationGroup,
};

/// Block diagonal inner product on the Lie algebra of SE(3).
///
/// The metric at any other point is obtained by translating this inner product
/// on the left or on the right, see [`SpecialEuclidean3::metric_matrix`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    /// Scale of the rotation block.
    pub rotation_weight: f64,
    /// Scale of the translation block.
    pub translation_weight: f64,
}

impl Default for Metric {
    fn default() -> Self {
        Self {
            rotation_weight: 1.0,
            translation_weight: 1.0,
        }
    }
}

impl Metric {
    /// Create a metric from the weights of the rotation and translation blocks.
    pub fn new(rotation_weight: f64, translation_weight: f64) -> Self {
        Self {
            rotation_weight,
            translation_weight,
        }
    }

    fn diagonal(&self) -> [f64; POINT_SIZE] {
        let (a, b) = (self.rotation_weight, self.translation_weight);
        [a, a, a, b, b, b]
    }

    /// The 6x6 inner product matrix at the identity, `diag(α I, β I)`.
    pub fn inner_product_matrix(&self) -> [[f64; POINT_SIZE]; POINT_SIZE] {
        let mut out = [[0.0; POINT_SIZE]; POINT_SIZE];
        for (i, weight) in self.diagonal().into_iter().enumerate() {
            out[i][i] = weight;
        }
        out
    }

    /// Inner product of two tangent vectors at the identity.
    pub fn inner_product(&self, a: &Se3Tangent, b: &Se3Tangent) -> f64 {
        let (omega_a, u_a) = split(a);
        let (omega_b, u_b) = split(b);
        self.rotation_weight * omega_a.dot(omega_b) + self.translation_weight * u_a.dot(u_b)
    }
}

impl<R: RotationGroup, T: TranslationSpace> SpecialEuclidean3<R, T> {
    /// Matrix of the translated metric at `point`, `M = J⁻ᵀ M₀ J⁻¹`.
    ///
    /// # Arguments
    ///
    /// * `point` - The point where the metric is evaluated.
    /// * `side` - Translation used to carry the inner product away from the identity.
    /// * `metric` - The inner product `M₀` at the identity.
    pub fn metric_matrix(
        &self,
        point: &Se3Point,
        side: Side,
        metric: &Metric,
    ) -> Result<[[f64; POINT_SIZE]; POINT_SIZE], LieGroupError> {
        let jac_inv = self.jacobian_translation(point, side).inverse()?.to_array();
        let diagonal = metric.diagonal();

        let mut out = [[0.0; POINT_SIZE]; POINT_SIZE];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = (0..POINT_SIZE)
                    .map(|k| jac_inv[k][i] * diagonal[k] * jac_inv[k][j])
                    .sum();
            }
        }
        Ok(out)
    }

    /// Squared Riemannian norm `vᵀ M v` of a tangent vector at `point`.
    pub fn squared_norm(
        &self,
        point: &Se3Point,
        tangent: &Se3Tangent,
        side: Side,
        metric: &Metric,
    ) -> Result<f64, LieGroupError> {
        let at_identity = self
            .jacobian_translation(point, side)
            .inverse()?
            .mul_tangent(tangent);
        Ok(metric.inner_product(&at_identity, &at_identity))
    }

    /// Row by row [`Self::squared_norm`], broadcasting a batch of length one.
    pub fn squared_norm_batch(
        &self,
        points: &[Se3Point],
        tangents: &[Se3Tangent],
        side: Side,
        metric: &Metric,
    ) -> Result<Vec<f64>, LieGroupError> {
        broadcast_map(points, tangents, |point, tangent| {
            self.squared_norm(point, tangent, side, metric)
        })
    }

    /// Squared norms of a batch of tangent vectors, all attached at `base`.
    ///
    /// Fed with the logarithms of points at `base`, these are the squared
    /// distances from `base` to the points.
    pub(crate) fn squared_norms_at(
        &self,
        base: &Se3Point,
        tangents: &[Se3Tangent],
        side: Side,
        metric: &Metric,
    ) -> Result<Vec<f64>, LieGroupError> {
        let jac_inv = self.jacobian_translation(base, side).inverse()?;
        Ok(tangents
            .par_iter()
            .map(|tangent| {
                let at_identity = jac_inv.mul_tangent(tangent);
                metric.inner_product(&at_identity, &at_identity)
            })
            .collect())
    }
}
