/// Error types for the SE(3) group and its solvers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LieGroupError {
    /// The group is only defined for the three dimensional rotation case.
    #[error("Only SE(3) is implemented, got dimension {0}")]
    UnsupportedDimension(usize),

    /// The last axis of the input does not match the size of a group element.
    #[error("Invalid point shape: expected {expected} components, got {actual}")]
    InvalidShape {
        /// Number of components of a group element.
        expected: usize,
        /// Number of components received.
        actual: usize,
    },

    /// A flat buffer does not split into whole group elements.
    #[error("Buffer of {len} values is not a multiple of the row size {row_size}")]
    InvalidBufferLength {
        /// Number of values in the buffer.
        len: usize,
        /// Number of values per group element.
        row_size: usize,
    },

    /// Two batches can not be paired row by row nor broadcast.
    #[error("Batch sizes are not broadcastable: {left} vs {right}")]
    BatchMismatch {
        /// Length of the left-hand batch.
        left: usize,
        /// Length of the right-hand batch.
        right: usize,
    },

    /// The number of weights differs from the number of points.
    #[error("Mismatched lengths: {points} points but {weights} weights")]
    WeightsMismatch {
        /// Number of points.
        points: usize,
        /// Number of weights.
        weights: usize,
    },

    /// Weights must be finite, non-negative and have a positive sum.
    #[error("Weights must be non-negative with a positive sum")]
    InvalidWeights,

    /// The solver needs more points than it was given.
    #[error("{method} barycenter requires at least {required} points, got {actual}")]
    NotEnoughPoints {
        /// Name of the barycenter method.
        method: &'static str,
        /// Minimum number of points.
        required: usize,
        /// Number of points received.
        actual: usize,
    },

    /// A matrix that has to be inverted is singular.
    #[error("Singular matrix, determinant {0}")]
    SingularMatrix(f64),
}
