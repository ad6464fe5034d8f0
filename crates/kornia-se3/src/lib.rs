#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia SE(3)
//!
//! The group of rigid body transformations as a computational manifold. Elements
//! are 6-vectors `[r, t]` made of a rotation vector and a translation.
//!
//! - **Group algebra**: composition, inverse and canonicalization, per element and
//!   over broadcast batches.
//! - **Exponential and logarithm maps**: at the identity and at any base point, with
//!   the left or right invariant transport.
//! - **Riemannian metric**: a block inner product translated by the Jacobians of the
//!   group translations.
//! - **Barycenters**: the closed form group exponential barycenter and the iterative
//!   Riemannian mean of weighted points.
//!
//! ## Example
//!
//! ```rust
//! use kornia_se3::{BarycenterMethod, SpecialEuclidean3};
//!
//! let se3 = SpecialEuclidean3::new(3).unwrap();
//!
//! let a = [0.0, 0.0, 0.1, 1.0, 0.0, 0.0];
//! let b = [0.0, 0.0, 0.3, 3.0, 0.0, 0.0];
//! let v = se3.log_at(&a, &b);
//! let b_again = se3.exp_at(&a, &v).unwrap();
//! assert!((b_again[3] - b[3]).abs() < 1e-9);
//!
//! let result = se3
//!     .weighted_barycenter(&[a, b], &[1.0, 1.0], &BarycenterMethod::GroupExponential)
//!     .unwrap();
//! assert!((result.mean[2] - 0.2).abs() < 1e-9);
//! ```

/// Weighted means of group elements.
pub mod barycenter;

/// Error types.
pub mod error;

/// The Euclidean collaborator of the group.
pub mod euclidean;

mod exponential_matrix;

/// The group SE(3) and its algebra.
pub mod group;

/// Translation Jacobians of SE(3).
pub mod jacobian;

pub mod maps;

/// Invariant Riemannian metrics on SE(3).
pub mod metric;

pub mod point;

pub mod so3;

pub use barycenter::{BarycenterMethod, BarycenterResult, RiemannianMeanParams};
pub use error::LieGroupError;
pub use euclidean::{EuclideanSpace3, TranslationSpace};
pub use group::SpecialEuclidean3;
pub use jacobian::{Side, TranslationJacobian};
pub use metric::Metric;
pub use point::{belongs, points_from_flat, validate_point, Se3Point, Se3Tangent};
pub use so3::{RotationGroup, RotationMean, SpecialOrthogonal3};
