use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

/// Indexed triangle soup with per-vertex normals.
///
/// Vertices are not shared between faces unless the builder chose to; seams
/// are only closed up to identical positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonSoup {
    pub positions: Vec<Point3<f64>>,
    pub normals: Vec<Vector3<f64>>,
    pub triangles: Vec<[u32; 3]>,
}

impl PolygonSoup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn add_vertex(&mut self, pos: Point3<f64>, normal: Vector3<f64>) -> u32 {
        let idx = self.positions.len() as u32;
        self.positions.push(pos);
        self.normals.push(normal);
        idx
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.triangles.push([i0, i1, i2]);
    }

    /// Two triangles `(a, b, c)` and `(a, c, d)`.
    pub fn add_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.add_triangle(a, b, c);
        self.add_triangle(a, c, d);
    }

    pub fn merge(&mut self, other: &PolygonSoup) {
        let offset = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    pub fn triangle_positions(&self, tri: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[tri];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    pub fn iter_triangles(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        (0..self.triangles.len()).map(|t| self.triangle_positions(t))
    }

    /// Signed enclosed volume (divergence theorem). Positive for outward winding.
    pub fn signed_volume(&self) -> f64 {
        self.iter_triangles()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)))
            .sum::<f64>()
            / 6.0
    }

    pub fn surface_area(&self) -> f64 {
        self.iter_triangles()
            .map(|[a, b, c]| 0.5 * (b - a).cross(&(c - a)).norm())
            .sum()
    }

    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    /// Number of unmatched directed edges after welding identical positions.
    ///
    /// Zero means the soup is closed with consistent winding.
    pub fn boundary_edge_count(&self) -> usize {
        let mut welded: HashMap<[u64; 3], u32> = HashMap::new();
        let ids: Vec<u32> = self
            .positions
            .iter()
            .map(|p| {
                // +0.0 folds negative zero into positive zero
                let key = [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()];
                let next = welded.len() as u32;
                *welded.entry(key).or_insert(next)
            })
            .collect();

        let mut directed: HashMap<(u32, u32), i64> = HashMap::new();
        for tri in &self.triangles {
            for k in 0..3 {
                let a = ids[tri[k] as usize];
                let b = ids[tri[(k + 1) % 3] as usize];
                if a == b {
                    continue;
                }
                let (key, delta) = if a < b { ((a, b), 1) } else { ((b, a), -1) };
                *directed.entry(key).or_insert(0) += delta;
            }
        }
        directed.values().map(|v| v.unsigned_abs() as usize).sum()
    }

    pub fn positions_f32(&self) -> Vec<f32> {
        self.positions
            .iter()
            .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect()
    }

    pub fn normals_f32(&self) -> Vec<f32> {
        self.normals
            .iter()
            .flat_map(|n| [n.x as f32, n.y as f32, n.z as f32])
            .collect()
    }

    pub fn indices_u32(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tetrahedron() -> PolygonSoup {
        let mut soup = PolygonSoup::new();
        let n = Vector3::zeros();
        let o = soup.add_vertex(Point3::new(0.0, 0.0, 0.0), n);
        let x = soup.add_vertex(Point3::new(1.0, 0.0, 0.0), n);
        let y = soup.add_vertex(Point3::new(0.0, 1.0, 0.0), n);
        let z = soup.add_vertex(Point3::new(0.0, 0.0, 1.0), n);
        soup.add_triangle(o, y, x);
        soup.add_triangle(o, x, z);
        soup.add_triangle(o, z, y);
        soup.add_triangle(x, y, z);
        soup
    }

    #[test]
    fn test_tetrahedron_volume_and_closure() {
        let soup = tetrahedron();
        assert_relative_eq!(soup.signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
        assert_eq!(soup.boundary_edge_count(), 0);
    }

    #[test]
    fn test_open_soup_reports_boundary() {
        let mut soup = tetrahedron();
        soup.triangles.pop();
        assert_eq!(soup.boundary_edge_count(), 3);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = tetrahedron();
        let b = tetrahedron();
        a.merge(&b);
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.triangles[4], [4, 6, 5]);
        assert_relative_eq!(a.signed_volume(), 2.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flatten_for_upload() {
        let soup = tetrahedron();
        assert_eq!(soup.positions_f32().len(), 12);
        assert_eq!(soup.indices_u32().len(), 12);
        let (lo, hi) = soup.bounding_box().unwrap();
        assert_eq!(lo, Point3::origin());
        assert_eq!(hi, Point3::new(1.0, 1.0, 1.0));
    }
}
