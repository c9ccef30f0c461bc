use std::collections::{BTreeSet, HashMap};

use num_traits::Zero;

use super::exact::{orient2d, sign, ExactVec2, Scalar};

/// Points and segments inserted into the projected plane of one triangle.
#[derive(Debug, Clone, Default)]
pub struct Arrangement {
    points: Vec<ExactVec2>,
    segments: Vec<(ExactVec2, ExactVec2)>,
}

/// Planar straight-line graph: no edge crosses another or passes through a vertex.
#[derive(Debug, Clone, Default)]
pub struct PlanarGraph {
    pub vertices: Vec<ExactVec2>,
    pub edges: Vec<(usize, usize)>,
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.segments.is_empty()
    }

    pub fn insert_point(&mut self, p: ExactVec2) {
        self.points.push(p);
    }

    pub fn insert_segment(&mut self, a: ExactVec2, b: ExactVec2) {
        if a == b {
            self.points.push(a);
        } else {
            self.segments.push((a, b));
        }
    }

    /// Split every segment at all crossings and at every vertex lying on it.
    pub fn planar_graph(&self) -> PlanarGraph {
        let mut index: HashMap<ExactVec2, usize> = HashMap::new();
        let mut vertices = Vec::new();
        let mut intern = |p: &ExactVec2| -> usize {
            if let Some(&i) = index.get(p) {
                return i;
            }
            vertices.push(p.clone());
            index.insert(p.clone(), vertices.len() - 1);
            vertices.len() - 1
        };

        for p in &self.points {
            intern(p);
        }
        for (a, b) in &self.segments {
            intern(a);
            intern(b);
        }
        for (i, (a, b)) in self.segments.iter().enumerate() {
            for (c, d) in &self.segments[i + 1..] {
                if let Some(p) = proper_crossing(a, b, c, d) {
                    intern(&p);
                }
            }
        }

        let mut edges = BTreeSet::new();
        for (a, b) in &self.segments {
            let dir = b - a;
            let mut on: Vec<(Scalar, usize)> = vertices
                .iter()
                .enumerate()
                .filter(|(_, v)| on_segment(a, b, v))
                .map(|(i, v)| ((v - a).dot(&dir), i))
                .collect();
            on.sort();
            for pair in on.windows(2) {
                let (i, j) = (pair[0].1, pair[1].1);
                edges.insert((i.min(j), i.max(j)));
            }
        }

        PlanarGraph {
            vertices,
            edges: edges.into_iter().collect(),
        }
    }
}

/// Closed-segment membership.
pub fn on_segment(a: &ExactVec2, b: &ExactVec2, p: &ExactVec2) -> bool {
    orient2d(a, b, p).is_zero() && sign(&(p - a).dot(&(p - b))) <= 0
}

/// Crossing point of two segments that meet in a single point interior to both.
pub fn proper_crossing(
    a: &ExactVec2,
    b: &ExactVec2,
    c: &ExactVec2,
    d: &ExactVec2,
) -> Option<ExactVec2> {
    let o1 = sign(&orient2d(a, b, c));
    let o2 = sign(&orient2d(a, b, d));
    let o3 = sign(&orient2d(c, d, a));
    let o4 = sign(&orient2d(c, d, b));
    if o1 * o2 >= 0 || o3 * o4 >= 0 {
        return None;
    }
    let ab = b - a;
    let cd = d - c;
    let t = (c - a).cross(&cd) / ab.cross(&cd);
    Some(a + &(&ab * &t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64) -> ExactVec2 {
        ExactVec2::from_ints(x, y)
    }

    #[test]
    fn test_crossing_segments_split_in_four() {
        let mut arr = Arrangement::new();
        arr.insert_segment(p(0, 0), p(2, 2));
        arr.insert_segment(p(0, 2), p(2, 0));
        let graph = arr.planar_graph();
        assert_eq!(graph.vertices.len(), 5);
        assert_eq!(graph.edges.len(), 4);
        assert!(graph.vertices.contains(&p(1, 1)));
    }

    #[test]
    fn test_point_on_segment_splits_it() {
        let mut arr = Arrangement::new();
        arr.insert_segment(p(0, 0), p(4, 0));
        arr.insert_point(p(1, 0));
        arr.insert_point(p(2, 5));
        let graph = arr.planar_graph();
        assert_eq!(graph.vertices.len(), 4);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_overlapping_collinear_segments_merge() {
        let mut arr = Arrangement::new();
        arr.insert_segment(p(0, 0), p(3, 0));
        arr.insert_segment(p(1, 0), p(5, 0));
        let graph = arr.planar_graph();
        assert_eq!(graph.vertices.len(), 4);
        assert_eq!(graph.edges.len(), 3);
    }

    #[test]
    fn test_degenerate_segment_becomes_point() {
        let mut arr = Arrangement::new();
        arr.insert_segment(p(1, 1), p(1, 1));
        let graph = arr.planar_graph();
        assert_eq!(graph.vertices.len(), 1);
        assert!(graph.edges.is_empty());
    }
}
