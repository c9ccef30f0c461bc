use std::collections::{BTreeSet, HashMap, HashSet};

use super::arrangement::{on_segment, PlanarGraph};
use super::exact::{incircle, orient2d, sign, ExactVec2};

type Edge = (usize, usize);

fn edge(i: usize, j: usize) -> Edge {
    (i.min(j), i.max(j))
}

/// Constrained Delaunay triangulation of a planar graph whose outer boundary
/// is convex, e.g. the edges of a triangle plus everything cut into it.
///
/// Builds a greedy constrained triangulation (shortest admissible edges
/// first) and then legalises non-constrained edges with Lawson flips.
/// Returns counter-clockwise index triples.
pub fn constrained_delaunay(graph: &PlanarGraph) -> Vec<[usize; 3]> {
    let pts = &graph.vertices;
    let n = pts.len();
    if n < 3 {
        return Vec::new();
    }

    let constrained: HashSet<Edge> = graph.edges.iter().map(|&(i, j)| edge(i, j)).collect();
    let mut edges: BTreeSet<Edge> = constrained.iter().copied().collect();

    let mut candidates: Vec<_> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .filter(|e| !constrained.contains(e))
        .map(|(i, j)| {
            let d = &pts[j] - &pts[i];
            (d.dot(&d), i, j)
        })
        .collect();
    candidates.sort();

    for (_, i, j) in candidates {
        let blocked = (0..n).any(|k| k != i && k != j && on_segment(&pts[i], &pts[j], &pts[k]));
        if blocked {
            continue;
        }
        let crosses = edges
            .iter()
            .any(|&(a, b)| properly_cross(pts, (i, j), (a, b)));
        if !crosses {
            edges.insert((i, j));
        }
    }

    let max_flips = 4 * n * n + 16;
    for _ in 0..max_flips {
        let faces = extract_faces(pts, &edges);
        match find_illegal_edge(pts, &faces, &constrained) {
            Some((old, new)) => {
                edges.remove(&old);
                edges.insert(new);
            }
            None => return faces,
        }
    }
    extract_faces(pts, &edges)
}

/// Interior crossing of two edges that share no endpoint.
fn properly_cross(pts: &[ExactVec2], (i, j): Edge, (a, b): Edge) -> bool {
    if i == a || i == b || j == a || j == b {
        return false;
    }
    let o1 = sign(&orient2d(&pts[i], &pts[j], &pts[a]));
    let o2 = sign(&orient2d(&pts[i], &pts[j], &pts[b]));
    let o3 = sign(&orient2d(&pts[a], &pts[b], &pts[i]));
    let o4 = sign(&orient2d(&pts[a], &pts[b], &pts[j]));
    o1 * o2 < 0 && o3 * o4 < 0
}

/// Empty 3-cycles of a triangulated graph, counter-clockwise.
fn extract_faces(pts: &[ExactVec2], edges: &BTreeSet<Edge>) -> Vec<[usize; 3]> {
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); pts.len()];
    for &(i, j) in edges {
        adjacency[i].insert(j);
        adjacency[j].insert(i);
    }

    let mut faces = Vec::new();
    for &(i, j) in edges {
        for &k in adjacency[i].intersection(&adjacency[j]) {
            if k <= j {
                continue;
            }
            let o = sign(&orient2d(&pts[i], &pts[j], &pts[k]));
            if o == 0 {
                continue;
            }
            let (a, b, c) = if o > 0 { (i, j, k) } else { (i, k, j) };
            let occupied = (0..pts.len()).any(|m| {
                m != a
                    && m != b
                    && m != c
                    && sign(&orient2d(&pts[a], &pts[b], &pts[m])) > 0
                    && sign(&orient2d(&pts[b], &pts[c], &pts[m])) > 0
                    && sign(&orient2d(&pts[c], &pts[a], &pts[m])) > 0
            });
            if !occupied {
                faces.push([a, b, c]);
            }
        }
    }
    faces
}

/// First unconstrained edge whose opposite vertex lies inside the
/// circumcircle of its neighbouring face, with the edge that replaces it.
fn find_illegal_edge(
    pts: &[ExactVec2],
    faces: &[[usize; 3]],
    constrained: &HashSet<Edge>,
) -> Option<(Edge, Edge)> {
    let mut opposite: HashMap<Edge, Vec<(usize, usize)>> = HashMap::new();
    for (f, face) in faces.iter().enumerate() {
        for k in 0..3 {
            let e = edge(face[k], face[(k + 1) % 3]);
            opposite.entry(e).or_default().push((f, face[(k + 2) % 3]));
        }
    }

    let mut shared: Vec<_> = opposite
        .into_iter()
        .filter(|(e, sides)| sides.len() == 2 && !constrained.contains(e))
        .collect();
    shared.sort_by_key(|(e, _)| *e);

    for (e, sides) in shared {
        let (face, k) = sides[0];
        let (_, l) = sides[1];
        let [a, b, c] = faces[face];
        if sign(&incircle(&pts[a], &pts[b], &pts[c], &pts[l])) > 0
            && properly_cross(pts, edge(k, l), e)
        {
            return Some((e, edge(k, l)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boolean::arrangement::Arrangement;
    use num_traits::Zero;

    fn p(x: i64, y: i64) -> ExactVec2 {
        ExactVec2::from_ints(x, y)
    }

    fn graph_of(segments: &[((i64, i64), (i64, i64))], points: &[(i64, i64)]) -> PlanarGraph {
        let mut arr = Arrangement::new();
        for &((ax, ay), (bx, by)) in segments {
            arr.insert_segment(p(ax, ay), p(bx, by));
        }
        for &(x, y) in points {
            arr.insert_point(p(x, y));
        }
        arr.planar_graph()
    }

    fn total_area(graph: &PlanarGraph, faces: &[[usize; 3]]) -> num_rational::BigRational {
        faces.iter().fold(num_rational::BigRational::zero(), |acc, f| {
            acc + orient2d(&graph.vertices[f[0]], &graph.vertices[f[1]], &graph.vertices[f[2]])
        })
    }

    const TRIANGLE: [((i64, i64), (i64, i64)); 3] = [((0, 0), (8, 0)), ((8, 0), (0, 8)), ((0, 8), (0, 0))];

    #[test]
    fn test_plain_triangle() {
        let graph = graph_of(&TRIANGLE, &[]);
        let faces = constrained_delaunay(&graph);
        assert_eq!(faces.len(), 1);
    }

    #[test]
    fn test_interior_point_gives_three_faces() {
        let graph = graph_of(&TRIANGLE, &[(2, 2)]);
        let faces = constrained_delaunay(&graph);
        assert_eq!(faces.len(), 3);
        assert_eq!(total_area(&graph, &faces), crate::boolean::exact::int(64));
    }

    #[test]
    fn test_constraint_is_kept() {
        let mut segments = TRIANGLE.to_vec();
        segments.push(((1, 1), (6, 1)));
        let graph = graph_of(&segments, &[]);
        let faces = constrained_delaunay(&graph);
        let a = graph.vertices.iter().position(|v| *v == p(1, 1)).unwrap();
        let b = graph.vertices.iter().position(|v| *v == p(6, 1)).unwrap();
        let uses_constraint = faces.iter().any(|f| {
            (0..3).any(|k| edge(f[k], f[(k + 1) % 3]) == edge(a, b))
        });
        assert!(uses_constraint);
        assert_eq!(total_area(&graph, &faces), crate::boolean::exact::int(64));
        for f in &faces {
            assert!(sign(&orient2d(&graph.vertices[f[0]], &graph.vertices[f[1]], &graph.vertices[f[2]])) > 0);
        }
    }

    #[test]
    fn test_points_on_boundary_are_used() {
        let graph = graph_of(&TRIANGLE, &[(4, 0), (0, 4)]);
        let faces = constrained_delaunay(&graph);
        assert_eq!(faces.len(), 3);
        assert_eq!(total_area(&graph, &faces), crate::boolean::exact::int(64));
    }

    #[test]
    fn test_square_is_delaunay() {
        // Thin strip with split long sides.
        let graph = graph_of(
            &[((0, 0), (10, 0)), ((10, 0), (10, 1)), ((10, 1), (0, 1)), ((0, 1), (0, 0))],
            &[(5, 0), (5, 1)],
        );
        let faces = constrained_delaunay(&graph);
        assert_eq!(faces.len(), 4);
        assert_eq!(total_area(&graph, &faces), crate::boolean::exact::int(20));
    }
}
