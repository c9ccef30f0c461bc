use nalgebra::{Point3, Vector3};
use tracing::warn;

use super::exact::{int, ExactPlane, ExactVec3};
use crate::soup::PolygonSoup;

/// Triangle with exact corners and the floating-point normals it carries
/// through the boolean pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactTriangle {
    pub vertices: [ExactVec3; 3],
    pub normals: [Vector3<f64>; 3],
}

impl ExactTriangle {
    pub fn new(vertices: [ExactVec3; 3], normals: [Vector3<f64>; 3]) -> Self {
        Self { vertices, normals }
    }

    /// Unnormalised geometric normal following the winding.
    pub fn normal(&self) -> ExactVec3 {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a))
    }

    pub fn plane(&self) -> Option<ExactPlane> {
        let [a, b, c] = &self.vertices;
        ExactPlane::through(a, b, c)
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal().is_zero()
    }

    pub fn centroid(&self) -> ExactVec3 {
        let [a, b, c] = &self.vertices;
        let third = int(1) / int(3);
        &(&(a + b) + c) * &third
    }

    pub fn positions_f64(&self) -> [Point3<f64>; 3] {
        let [a, b, c] = &self.vertices;
        [a.to_point(), b.to_point(), c.to_point()]
    }

    /// Same triangle with the opposite winding and negated normals.
    pub fn reversed(&self) -> Self {
        let [a, b, c] = &self.vertices;
        let [na, nb, nc] = &self.normals;
        Self::new([a.clone(), c.clone(), b.clone()], [-na, -nc, -nb])
    }
}

/// Exact counterpart of [`PolygonSoup`]: a flat list of triangles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExactMesh {
    pub triangles: Vec<ExactTriangle>,
}

impl ExactMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Convert a soup; triangles with non-finite coordinates are dropped.
    pub fn from_soup(soup: &PolygonSoup) -> Self {
        let mut triangles = Vec::with_capacity(soup.triangle_count());
        let mut dropped = 0usize;
        for tri in &soup.triangles {
            let corner = |k: usize| ExactVec3::from_point(&soup.positions[tri[k] as usize]);
            match (corner(0), corner(1), corner(2)) {
                (Some(a), Some(b), Some(c)) => {
                    let n = |k: usize| soup.normals.get(tri[k] as usize).copied().unwrap_or_else(Vector3::zeros);
                    triangles.push(ExactTriangle::new([a, b, c], [n(0), n(1), n(2)]));
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "skipped triangles with non-finite coordinates");
        }
        Self { triangles }
    }

    /// Convert back to floating point, three fresh vertices per triangle.
    pub fn to_soup(&self) -> PolygonSoup {
        let mut soup = PolygonSoup::new();
        for tri in &self.triangles {
            let positions = tri.positions_f64();
            let ids: Vec<u32> = positions
                .iter()
                .zip(&tri.normals)
                .map(|(p, n)| soup.add_vertex(*p, *n))
                .collect();
            soup.add_triangle(ids[0], ids[1], ids[2]);
        }
        soup
    }
}

impl From<&PolygonSoup> for ExactMesh {
    fn from(soup: &PolygonSoup) -> Self {
        Self::from_soup(soup)
    }
}
