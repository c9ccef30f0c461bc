use castle_kernel::Axis;
use thiserror::Error;

use crate::policy::SizePolicy;

/// Rejected shape-operator input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    #[error("subdivision needs at least one part")]
    EmptySplit,

    #[error("relative weights along {axis:?} sum to zero")]
    ZeroRelativeWeight { axis: Axis },

    #[error("absolute sizes along {axis:?} need {required}, only {available} available")]
    NegativeExtent {
        axis: Axis,
        required: f64,
        available: f64,
    },

    #[error("repeat tile along {axis:?} must be positive, got {size}")]
    NonPositiveTile { axis: Axis, size: f64 },

    #[error("{policy:?} arc length on a zero radius")]
    ZeroRadius { policy: SizePolicy },

    #[error("operation requires a cylindrical coordinate system")]
    NotCylindrical,
}
