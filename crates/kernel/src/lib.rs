pub mod geometry;
pub mod soup;
pub mod primitives;
pub mod boolean;

// Re-export key types at crate root for convenience.
pub use boolean::{BoolOp, BooleanEngine, ExactBooleanEngine, ExactMesh};
pub use geometry::{Axis, Bounds, CoordSys, CoordSysKind, Interval};
pub use primitives::{build_primitive, PrimitiveSettings};
pub use soup::PolygonSoup;

/// Global tolerance configuration for the floating-point side of the kernel.
///
/// The boolean engine is exact and does not consult these values.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Lengths below this (native units) are treated as empty, e.g. repeat padding.
    pub length: f64,
    /// Angle slack (radians) for the full-circle seam policy and sample de-duplication.
    pub angular: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            length: 1e-4,
            angular: 1e-9,
        }
    }
}

impl Tolerance {
    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() <= self.length
    }

    pub fn is_zero_angle(&self, angle: f64) -> bool {
        angle.abs() <= self.angular
    }

    /// True when an angular span covers a whole turn.
    pub fn is_full_turn(&self, span: f64) -> bool {
        span >= std::f64::consts::TAU - self.angular
    }
}
