use num_traits::Zero;
use tracing::warn;

use super::exact::{orient2d, sign, ExactPlane, ExactVec2, ExactVec3};
use super::mesh::ExactMesh;

/// Orientation of a boundary hit relative to the probing fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Same,
    Opposite,
}

/// Point location relative to a closed triangle mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    Inside,
    Outside,
    OnBoundary(Facing),
}

/// Directions for ray parity; chosen so that no component vanishes.
const RAY_DIRECTIONS: [(i64, i64, i64); 6] = [
    (7919, 104, 1009),
    (-229, 7013, 523),
    (311, -433, 6007),
    (-5003, -761, 2111),
    (1301, 4973, -3559),
    (-2593, 1777, -6469),
];

enum Containment {
    Interior,
    Edge,
    Outside,
}

struct Face {
    plane: ExactPlane,
    corners: [ExactVec2; 3],
    orientation: i8,
}

impl Face {
    fn locate(&self, q: &ExactVec2) -> Containment {
        let [a, b, c] = &self.corners;
        let signs = [orient2d(a, b, q), orient2d(b, c, q), orient2d(c, a, q)]
            .map(|o| sign(&o) * self.orientation);
        if signs.iter().all(|&s| s > 0) {
            Containment::Interior
        } else if signs.iter().all(|&s| s >= 0) {
            Containment::Edge
        } else {
            Containment::Outside
        }
    }
}

/// Exact point-in-mesh classifier (on-surface test plus ray parity).
pub struct Classifier {
    faces: Vec<Face>,
    rays: Vec<ExactVec3>,
}

impl Classifier {
    /// Degenerate triangles are ignored.
    pub fn new(mesh: &ExactMesh) -> Self {
        let faces = mesh
            .triangles
            .iter()
            .filter_map(|tri| {
                let plane = tri.plane()?;
                let corners = tri.vertices.each_ref().map(|v| plane.project(v));
                let orientation = sign(&orient2d(&corners[0], &corners[1], &corners[2]));
                Some(Face { plane, corners, orientation })
            })
            .collect();
        let rays = RAY_DIRECTIONS
            .iter()
            .map(|&(x, y, z)| ExactVec3::from_ints(x, y, z))
            .collect();
        Self { faces, rays }
    }

    /// Classify `point`; `normal` is the orientation of the surface it was
    /// sampled from and only matters for boundary hits.
    pub fn classify(&self, point: &ExactVec3, normal: &ExactVec3) -> PointClassification {
        for face in &self.faces {
            if face.plane.side(point).is_zero()
                && !matches!(face.locate(&face.plane.project(point)), Containment::Outside)
            {
                let facing = if sign(&normal.dot(&face.plane.normal)) > 0 {
                    Facing::Same
                } else {
                    Facing::Opposite
                };
                return PointClassification::OnBoundary(facing);
            }
        }

        for ray in &self.rays {
            if let Some(crossings) = self.crossings(point, ray) {
                return if crossings % 2 == 1 {
                    PointClassification::Inside
                } else {
                    PointClassification::Outside
                };
            }
        }
        warn!("every ray grazed an edge; classifying as outside");
        PointClassification::Outside
    }

    /// Faces crossed by the ray, or `None` if it touches an edge, a vertex or
    /// runs within a face plane.
    fn crossings(&self, origin: &ExactVec3, dir: &ExactVec3) -> Option<usize> {
        let mut count = 0;
        for face in &self.faces {
            let denom = face.plane.normal.dot(dir);
            let side = face.plane.side(origin);
            if denom.is_zero() {
                if side.is_zero() {
                    return None;
                }
                continue;
            }
            if sign(&side) * sign(&denom) >= 0 {
                continue;
            }
            let t = -side / denom;
            let hit = origin + &(dir * &t);
            match face.locate(&face.plane.project(&hit)) {
                Containment::Interior => count += 1,
                Containment::Edge => return None,
                Containment::Outside => {}
            }
        }
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Bounds, Frame};
    use crate::primitives::make_box;

    fn cube() -> ExactMesh {
        ExactMesh::from_soup(&make_box(
            &Frame::world(),
            &Bounds::from_min_max([0.0; 3], [2.0; 3]),
        ))
    }

    fn up() -> ExactVec3 {
        ExactVec3::from_ints(0, 0, 1)
    }

    #[test]
    fn test_inside_and_outside() {
        let cls = Classifier::new(&cube());
        assert_eq!(
            cls.classify(&ExactVec3::from_ints(1, 1, 1), &up()),
            PointClassification::Inside
        );
        assert_eq!(
            cls.classify(&ExactVec3::from_ints(3, 1, 1), &up()),
            PointClassification::Outside
        );
    }

    #[test]
    fn test_boundary_facing() {
        let cls = Classifier::new(&cube());
        let on_top = ExactVec3::from_ints(1, 1, 2);
        assert_eq!(
            cls.classify(&on_top, &up()),
            PointClassification::OnBoundary(Facing::Same)
        );
        assert_eq!(
            cls.classify(&on_top, &-&up()),
            PointClassification::OnBoundary(Facing::Opposite)
        );
    }

    #[test]
    fn test_point_in_extended_face_plane_is_outside() {
        let cls = Classifier::new(&cube());
        assert_eq!(
            cls.classify(&ExactVec3::from_ints(5, 1, 2), &up()),
            PointClassification::Outside
        );
    }
}
