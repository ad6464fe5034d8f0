use glam::{DMat3, DVec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::LieGroupError,
    euclidean::TranslationSpace,
    exponential_matrix::exponential_matrices,
    group::SpecialEuclidean3,
    jacobian::{try_inverse, Side},
    maps::AngleRegime,
    metric::Metric,
    point::{join, split, validate_weights, Se3Point, Se3Tangent},
    so3::RotationGroup,
};

// squared step below which the estimate only moves by rounding noise
const STEP_FLOOR: f64 = 1.0e-24;

/// Parameters of the iterative Riemannian mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiemannianMeanParams {
    /// Side of the invariant metric, and of the exp/log maps used by the iteration.
    pub side: Side,
    /// Inner product at the identity.
    pub metric: Metric,
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Convergence tolerance, relative to the weighted variance at the current estimate.
    pub tolerance: f64,
}

impl Default for RiemannianMeanParams {
    fn default() -> Self {
        Self {
            side: Side::Left,
            metric: Metric::default(),
            max_iterations: 100,
            tolerance: 1.0e-10,
        }
    }
}

/// Strategy of [`SpecialEuclidean3::weighted_barycenter`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarycenterMethod {
    /// Closed form solution of the group exponential barycenter equation.
    #[default]
    GroupExponential,
    /// Fixed point iteration on the Riemannian (Fréchet) mean.
    Riemannian(RiemannianMeanParams),
}

/// Result of a barycenter computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarycenterResult {
    /// The estimated mean.
    pub mean: Se3Point,
    /// Weighted variance of the points at the mean.
    pub variance: f64,
    /// Number of iterations performed, those of the rotation mean for the closed form.
    pub num_iterations: usize,
    /// Whether the tolerance was met before the iteration cap.
    pub converged: bool,
}

impl<R: RotationGroup, T: TranslationSpace> SpecialEuclidean3<R, T> {
    /// Weighted barycenter of a batch of group elements.
    ///
    /// # Arguments
    ///
    /// * `points` - The group elements.
    /// * `weights` - One non-negative weight per point, relative to their sum.
    /// * `method` - The barycenter to compute.
    ///
    /// # Returns
    ///
    /// The mean together with the variance at the mean. A mean whose iteration, of
    /// the Riemannian mean or of the rotation mean, hits its cap is returned with
    /// `converged == false`.
    pub fn weighted_barycenter(
        &self,
        points: &[Se3Point],
        weights: &[f64],
        method: &BarycenterMethod,
    ) -> Result<BarycenterResult, LieGroupError> {
        match method {
            BarycenterMethod::GroupExponential => self.exponential_barycenter(points, weights),
            BarycenterMethod::Riemannian(params) => self.riemannian_mean(points, weights, params),
        }
    }

    /// Group exponential barycenter, the solution `m` of `Σ wᵢ log(m⁻¹ xᵢ) = 0`.
    ///
    /// The rotation is the weighted mean of the rotation collaborator. With
    /// `ωᵢ = log(R̄ᵀ Rᵢ)` and `Mᵢ = V(ωᵢ)⁻¹`, the translation solves
    ///
    /// ```text
    /// (Σ wᵢ Mᵢ R̄ᵀ) t̄ = Σ wᵢ Mᵢ R̄ᵀ tᵢ
    /// ```
    ///
    /// The reported variance uses the left invariant default metric. The iteration
    /// count and convergence flag are those of the rotation mean.
    pub fn exponential_barycenter(
        &self,
        points: &[Se3Point],
        weights: &[f64],
    ) -> Result<BarycenterResult, LieGroupError> {
        if points.is_empty() {
            return Err(LieGroupError::NotEnoughPoints {
                method: "group exponential",
                required: 1,
                actual: 0,
            });
        }
        let total_weight = validate_weights(points.len(), weights)?;

        let points = self.regularize_batch(points);
        let rotations = self.rotations();

        let rot_vecs = points.iter().map(|p| split(p).0).collect::<Vec<_>>();
        let rotation_mean = rotations.weighted_mean(&rot_vecs, weights)?;
        if !rotation_mean.converged {
            log::warn!(
                "group exponential barycenter: rotation mean did not converge after {} iterations",
                rotation_mean.num_iterations
            );
        }
        let mean_rot_vec = rotation_mean.mean;
        let mean_rot_mat_inv = rotations.matrix_from_rotation_vector(mean_rot_vec).transpose();

        // rotation from the mean to every point
        let omegas = rot_vecs
            .par_iter()
            .map(|r| {
                rotations.rotation_vector_from_matrix(
                    &(mean_rot_mat_inv * rotations.matrix_from_rotation_vector(*r)),
                )
            })
            .collect::<Vec<_>>();

        if log::log_enabled!(log::Level::Trace) {
            for (i, omega) in omegas.iter().enumerate() {
                log::trace!(
                    "point {}: angle to the mean rotation {:.3e} ({:?})",
                    i,
                    omega.length(),
                    AngleRegime::classify(omega.length())
                );
            }
        }

        // accumulate both sides of the translation equation
        let (lhs, rhs) = exponential_matrices(rotations, &omegas)
            .par_iter()
            .zip(points.par_iter())
            .zip(weights.par_iter())
            .map(|((exp_mat, point), weight)| {
                let weight = weight / total_weight;
                let corrector = try_inverse(exp_mat)? * mean_rot_mat_inv;
                Ok::<_, LieGroupError>((weight * corrector, weight * (corrector * split(point).1)))
            })
            .try_reduce(
                || (DMat3::ZERO, DVec3::ZERO),
                |a, b| Ok((a.0 + b.0, a.1 + b.1)),
            )?;

        let mean_translation = try_inverse(&lhs)? * rhs;
        let mean = self.regularize_point(&join(mean_rot_vec, mean_translation));

        let params = RiemannianMeanParams::default();
        let variance = self.riemannian_variance(&mean, &points, weights, params.side, &params.metric)?;

        log::debug!("group exponential barycenter of {} points", points.len());

        Ok(BarycenterResult {
            mean,
            variance,
            num_iterations: rotation_mean.num_iterations,
            converged: rotation_mean.converged,
        })
    }

    /// Iterative Riemannian mean.
    ///
    /// Starting at the first point, the estimate is moved by the exponential of the
    /// weighted mean of the logarithms of the points, until the squared norm of the
    /// step falls below `tolerance` times the weighted variance. The iteration also
    /// stops, as converged, once the squared step is at most `1e-24`: below that
    /// the estimate only moves by rounding, which happens when the variance is zero
    /// or the tolerance is tighter than the precision of the logarithms.
    ///
    /// # Arguments
    ///
    /// * `points` - At least two group elements.
    /// * `weights` - One non-negative weight per point.
    /// * `params` - Side, metric and stopping criteria.
    pub fn riemannian_mean(
        &self,
        points: &[Se3Point],
        weights: &[f64],
        params: &RiemannianMeanParams,
    ) -> Result<BarycenterResult, LieGroupError> {
        if points.len() < 2 {
            return Err(LieGroupError::NotEnoughPoints {
                method: "Riemannian",
                required: 2,
                actual: points.len(),
            });
        }
        let total_weight = validate_weights(points.len(), weights)?;
        let weights = weights.iter().map(|w| w / total_weight).collect::<Vec<_>>();
        let (side, metric) = (params.side, &params.metric);

        let mut result = BarycenterResult {
            mean: self.regularize_point(&points[0]),
            variance: 0.0,
            num_iterations: 0,
            converged: false,
        };
        // logarithms at the current estimate, shared by the step and the variance
        let mut logs = self.log_at_batch(&[result.mean], points, side)?;
        result.variance = self.variance_from_logs(&result.mean, &logs, &weights, side, metric)?;

        // main fixed point loop
        for i in 0..params.max_iterations {
            let tangent = logs
                .par_iter()
                .zip(weights.par_iter())
                .map(|(v, weight)| v.map(|x| weight * x))
                .reduce(|| [0.0; 6], add_tangents);

            let next = self.exp_at_side(&result.mean, &tangent, side)?;
            let step = self.squared_norm(
                &result.mean,
                &self.log_at_side(&result.mean, &next, side),
                side,
                metric,
            )?;

            let threshold = params.tolerance * result.variance;
            result.mean = next;
            result.num_iterations += 1;
            logs = self.log_at_batch(&[result.mean], points, side)?;
            result.variance =
                self.variance_from_logs(&result.mean, &logs, &weights, side, metric)?;

            log::debug!(
                "Iteration: {} step: {:e} variance: {:e}",
                i,
                step,
                result.variance
            );

            // check convergence and exit if below tolerance
            if step <= threshold || step <= STEP_FLOOR {
                log::debug!(
                    "Riemannian mean converged in {} iterations with variance {}",
                    result.num_iterations,
                    result.variance
                );
                result.converged = true;
                return Ok(result);
            }
        }

        log::warn!(
            "Riemannian mean did not converge after {} iterations, variance {}",
            params.max_iterations,
            result.variance
        );

        Ok(result)
    }

    /// Weighted variance of a batch of points at `base`.
    ///
    /// # Returns
    ///
    /// `Σ wᵢ d(base, xᵢ)² / Σ wᵢ` with the squared distances measured by `metric`
    /// translated on `side`.
    pub fn riemannian_variance(
        &self,
        base: &Se3Point,
        points: &[Se3Point],
        weights: &[f64],
        side: Side,
        metric: &Metric,
    ) -> Result<f64, LieGroupError> {
        let total_weight = validate_weights(points.len(), weights)?;
        let logs = self.log_at_batch(&[*base], points, side)?;
        Ok(self.variance_from_logs(base, &logs, weights, side, metric)? / total_weight)
    }

    /// `Σ wᵢ ‖vᵢ‖²` for the logarithms `vᵢ` of the points at `base`.
    fn variance_from_logs(
        &self,
        base: &Se3Point,
        logs: &[Se3Tangent],
        weights: &[f64],
        side: Side,
        metric: &Metric,
    ) -> Result<f64, LieGroupError> {
        Ok(self
            .squared_norms_at(base, logs, side, metric)?
            .par_iter()
            .zip(weights.par_iter())
            .map(|(d, w)| d * w)
            .sum::<f64>())
    }
}

fn add_tangents(a: Se3Tangent, b: Se3Tangent) -> Se3Tangent {
    std::array::from_fn(|i| a[i] + b[i])
}
