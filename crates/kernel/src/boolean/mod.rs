pub mod arrangement;
pub mod classify;
pub mod contact;
pub mod engine;
pub mod exact;
pub mod mesh;
pub mod triangulate;

pub use engine::{boolean_op, BoolOp};
pub use mesh::{ExactMesh, ExactTriangle};

use crate::soup::PolygonSoup;

/// Trait for boolean operations on closed triangle meshes.
///
/// Operations never fail: degenerate input triangles are ignored and an
/// empty mesh is a valid result.
pub trait BooleanEngine {
    fn union(&self, a: &ExactMesh, b: &ExactMesh) -> ExactMesh;

    /// Subtract `b` from `a`.
    fn subtract(&self, a: &ExactMesh, b: &ExactMesh) -> ExactMesh;

    fn intersect(&self, a: &ExactMesh, b: &ExactMesh) -> ExactMesh;
}

/// Boolean engine on exact rational arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactBooleanEngine;

impl BooleanEngine for ExactBooleanEngine {
    fn union(&self, a: &ExactMesh, b: &ExactMesh) -> ExactMesh {
        boolean_op(a, b, BoolOp::Union)
    }

    fn subtract(&self, a: &ExactMesh, b: &ExactMesh) -> ExactMesh {
        boolean_op(a, b, BoolOp::Difference)
    }

    fn intersect(&self, a: &ExactMesh, b: &ExactMesh) -> ExactMesh {
        boolean_op(a, b, BoolOp::Intersection)
    }
}

/// Intersect two floating-point soups through the exact engine.
pub fn intersect_soups(a: &PolygonSoup, b: &PolygonSoup) -> PolygonSoup {
    ExactBooleanEngine
        .intersect(&ExactMesh::from_soup(a), &ExactMesh::from_soup(b))
        .to_soup()
}

#[cfg(test)]
mod trait_tests {
    use super::*;
    use crate::geometry::{Bounds, Frame};
    use crate::primitives::make_box;
    use approx::assert_relative_eq;

    fn cube(min: [f64; 3], max: [f64; 3]) -> PolygonSoup {
        make_box(&Frame::world(), &Bounds::from_min_max(min, max))
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let a = cube([0.0; 3], [1.0; 3]);
        let b = cube([5.0; 3], [6.0; 3]);
        assert!(intersect_soups(&a, &b).is_empty());
    }

    #[test]
    fn test_identical_intersection_keeps_volume() {
        let a = cube([0.0; 3], [1.0; 3]);
        let result = intersect_soups(&a, &a);
        assert_relative_eq!(result.signed_volume(), 1.0, epsilon = 1e-12);
        assert_eq!(result.triangle_count(), 12);
    }

    #[test]
    fn test_engine_trait_is_object_safe() {
        let engine: &dyn BooleanEngine = &ExactBooleanEngine;
        let a = ExactMesh::from_soup(&cube([0.0; 3], [2.0; 3]));
        let b = ExactMesh::from_soup(&cube([1.0; 3], [3.0; 3]));
        let sub = engine.subtract(&a, &b).to_soup();
        assert_relative_eq!(sub.signed_volume(), 7.0, epsilon = 1e-9);
        let uni = engine.union(&a, &b).to_soup();
        assert_relative_eq!(uni.signed_volume(), 15.0, epsilon = 1e-9);
    }
}
