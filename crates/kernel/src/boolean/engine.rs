use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

use super::arrangement::Arrangement;
use super::classify::{Classifier, Facing, PointClassification};
use super::contact::{coplanar_cuts, is_coplanar, triangle_contact, Contact};
use super::exact::{sign, ExactPlane};
use super::mesh::{ExactMesh, ExactTriangle};
use super::triangulate::constrained_delaunay;

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    Union,
    Intersection,
    Difference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    Reverse,
    Drop,
}

/// Fragment selection. Shared coplanar regions are taken from the first
/// operand only, so the result has no doubled faces.
fn verdict(op: BoolOp, operand: Operand, class: PointClassification) -> Verdict {
    use PointClassification::*;
    match (op, operand, class) {
        (BoolOp::Intersection, Operand::First, Inside | OnBoundary(Facing::Same)) => Verdict::Keep,
        (BoolOp::Intersection, Operand::Second, Inside) => Verdict::Keep,
        (BoolOp::Union, Operand::First, Outside | OnBoundary(Facing::Same)) => Verdict::Keep,
        (BoolOp::Union, Operand::Second, Outside) => Verdict::Keep,
        (BoolOp::Difference, Operand::First, Outside | OnBoundary(Facing::Opposite)) => Verdict::Keep,
        (BoolOp::Difference, Operand::Second, Inside) => Verdict::Reverse,
        _ => Verdict::Drop,
    }
}

struct Prepared<'a> {
    tri: &'a ExactTriangle,
    plane: ExactPlane,
    lo: [f64; 3],
    hi: [f64; 3],
}

/// Non-degenerate triangles with their planes and slightly padded boxes.
/// Padding covers the rounding of rational coordinates to `f64`.
fn prepare(mesh: &ExactMesh) -> Vec<Prepared<'_>> {
    let pad = |v: f64| (v.abs() + 1.0) * 1e-9;
    mesh.triangles
        .iter()
        .filter_map(|tri| {
            let plane = tri.plane()?;
            let pts = tri.positions_f64();
            let mut lo = [f64::INFINITY; 3];
            let mut hi = [f64::NEG_INFINITY; 3];
            for p in &pts {
                for k in 0..3 {
                    lo[k] = lo[k].min(p[k] - pad(p[k]));
                    hi[k] = hi[k].max(p[k] + pad(p[k]));
                }
            }
            Some(Prepared { tri, plane, lo, hi })
        })
        .collect()
}

fn boxes_overlap(a: &Prepared<'_>, b: &Prepared<'_>) -> bool {
    (0..3).all(|k| a.lo[k] <= b.hi[k] && b.lo[k] <= a.hi[k])
}

fn record(cuts: &mut Arrangement, plane: &ExactPlane, contact: &Contact) {
    match contact {
        Contact::Point(p) => cuts.insert_point(plane.project(p)),
        Contact::Segment(p, q) => cuts.insert_segment(plane.project(p), plane.project(q)),
    }
}

/// Run a boolean operation on two closed exact meshes.
///
/// Both operands are cut along their mutual intersection curves; every
/// fragment is classified exactly against the other operand. Coplanar
/// triangle pairs cut each other along their clipped edges, so shared faces
/// are split alike on both sides. Degenerate triangles are ignored.
#[instrument(level = "debug", skip_all, fields(op = ?op, a = a.len(), b = b.len()))]
pub fn boolean_op(a: &ExactMesh, b: &ExactMesh, op: BoolOp) -> ExactMesh {
    let prepared_a = prepare(a);
    let prepared_b = prepare(b);
    let mut cuts_a = vec![Arrangement::new(); prepared_a.len()];
    let mut cuts_b = vec![Arrangement::new(); prepared_b.len()];

    let mut tested = 0usize;
    let mut contacts = 0usize;
    let mut coplanar = 0usize;
    for (i, ta) in prepared_a.iter().enumerate() {
        for (j, tb) in prepared_b.iter().enumerate() {
            if !boxes_overlap(ta, tb) {
                continue;
            }
            tested += 1;
            if let Some(contact) =
                triangle_contact(&ta.tri.vertices, &ta.plane, &tb.tri.vertices, &tb.plane)
            {
                contacts += 1;
                record(&mut cuts_a[i], &ta.plane, &contact);
                record(&mut cuts_b[j], &tb.plane, &contact);
            } else if is_coplanar(&tb.tri.vertices, &ta.plane) {
                coplanar += 1;
                for (p, q) in coplanar_cuts(&ta.tri.vertices, &ta.plane, &tb.tri.vertices) {
                    cuts_a[i].insert_segment(p, q);
                }
                for (p, q) in coplanar_cuts(&tb.tri.vertices, &tb.plane, &ta.tri.vertices) {
                    cuts_b[j].insert_segment(p, q);
                }
            }
        }
    }

    let mut result = ExactMesh::new();
    let mut produced = 0usize;
    let passes = [
        (Operand::First, &prepared_a, &cuts_a, Classifier::new(b)),
        (Operand::Second, &prepared_b, &cuts_b, Classifier::new(a)),
    ];
    for (operand, prepared, cuts, other) in &passes {
        for (source, cut) in prepared.iter().zip(cuts.iter()) {
            for fragment in split_triangle(source, cut) {
                produced += 1;
                let class = other.classify(&fragment.centroid(), &fragment.normal());
                match verdict(op, *operand, class) {
                    Verdict::Keep => result.triangles.push(fragment),
                    Verdict::Reverse => result.triangles.push(fragment.reversed()),
                    Verdict::Drop => {}
                }
            }
        }
    }

    debug!(tested, contacts, coplanar, produced, kept = result.len(), "boolean finished");
    result
}

/// Triangulate a triangle together with the cuts recorded on it. Fragments
/// keep the source winding; normals are interpolated from the source corners.
fn split_triangle(source: &Prepared<'_>, cuts: &Arrangement) -> Vec<ExactTriangle> {
    if cuts.is_empty() {
        return vec![source.tri.clone()];
    }
    let plane = &source.plane;
    let mut arrangement = cuts.clone();
    let corners = source.tri.vertices.each_ref().map(|v| plane.project(v));
    for k in 0..3 {
        arrangement.insert_segment(corners[k].clone(), corners[(k + 1) % 3].clone());
    }
    let graph = arrangement.planar_graph();

    constrained_delaunay(&graph)
        .into_iter()
        .map(|face| {
            let mut v = face.map(|idx| plane.unproject(&graph.vertices[idx]));
            let n = (&v[1] - &v[0]).cross(&(&v[2] - &v[0]));
            if sign(&n.dot(&plane.normal)) < 0 {
                v.swap(1, 2);
            }
            let normals = v.each_ref().map(|p| interpolate_normal(source.tri, &p.to_point()));
            ExactTriangle::new(v, normals)
        })
        .collect()
}

fn interpolate_normal(tri: &ExactTriangle, p: &Point3<f64>) -> Vector3<f64> {
    let [n0, n1, n2] = tri.normals;
    if n0 == n1 && n1 == n2 {
        return n0;
    }
    let [s0, s1, s2] = tri.positions_f64();
    let (e0, e1, e2) = (s1 - s0, s2 - s0, p - s0);
    let (d00, d01, d11) = (e0.dot(&e0), e0.dot(&e1), e1.dot(&e1));
    let (d20, d21) = (e2.dot(&e0), e2.dot(&e1));
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < f64::EPSILON {
        return n0;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let n = n0 * (1.0 - v - w) + n1 * v + n2 * w;
    n.try_normalize(f64::EPSILON).unwrap_or(n0)
}
