use num_traits::Zero;

use super::exact::{orient2d, sign, ExactPlane, ExactVec2, ExactVec3, Scalar};

/// Exact contact set of two non-coplanar triangles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    Point(ExactVec3),
    Segment(ExactVec3, ExactVec3),
}

/// Intersect two triangles given with their supporting planes.
///
/// Coplanar pairs report no contact here; see [`coplanar_cuts`].
pub fn triangle_contact(
    a: &[ExactVec3; 3],
    plane_a: &ExactPlane,
    b: &[ExactVec3; 3],
    plane_b: &ExactPlane,
) -> Option<Contact> {
    let side_b = b.each_ref().map(|v| plane_a.side(v));
    if !straddles(&side_b) {
        return None;
    }
    let side_a = a.each_ref().map(|v| plane_b.side(v));
    if !straddles(&side_a) {
        return None;
    }

    let along = plane_a.normal.cross(&plane_b.normal);
    let (a_lo, a_hi) = extremes(plane_section(a, &side_a), &along)?;
    let (b_lo, b_hi) = extremes(plane_section(b, &side_b), &along)?;

    let (lo_t, lo_p) = if a_lo.0 >= b_lo.0 { a_lo } else { b_lo };
    let (hi_t, hi_p) = if a_hi.0 <= b_hi.0 { a_hi } else { b_hi };
    if lo_t > hi_t {
        None
    } else if lo_t == hi_t {
        Some(Contact::Point(lo_p))
    } else {
        Some(Contact::Segment(lo_p, hi_p))
    }
}

/// True when every corner of `tri` lies in `plane`.
pub fn is_coplanar(tri: &[ExactVec3; 3], plane: &ExactPlane) -> bool {
    tri.iter().all(|v| plane.side(v).is_zero())
}

/// Edges of `other` clipped to `tri`, both lying in `plane`, as segments in
/// the projected coordinates of `plane`. A clipped edge may collapse to a
/// single point.
pub fn coplanar_cuts(
    tri: &[ExactVec3; 3],
    plane: &ExactPlane,
    other: &[ExactVec3; 3],
) -> Vec<(ExactVec2, ExactVec2)> {
    let t = tri.each_ref().map(|v| plane.project(v));
    let o = other.each_ref().map(|v| plane.project(v));
    let winding = sign(&orient2d(&t[0], &t[1], &t[2]));
    (0..3)
        .filter_map(|k| clip_segment(&t, winding, &o[k], &o[(k + 1) % 3]))
        .collect()
}

/// Part of `p..q` inside the closed triangle `t` of the given winding.
fn clip_segment(
    t: &[ExactVec2; 3],
    winding: i8,
    p: &ExactVec2,
    q: &ExactVec2,
) -> Option<(ExactVec2, ExactVec2)> {
    let w = Scalar::from_integer(winding.into());
    let mut lo = Scalar::zero();
    let mut hi = Scalar::from_integer(1.into());
    for k in 0..3 {
        let (a, b) = (&t[k], &t[(k + 1) % 3]);
        let f0 = orient2d(a, b, p) * &w;
        let f1 = orient2d(a, b, q) * &w;
        match (sign(&f0) >= 0, sign(&f1) >= 0) {
            (true, true) => {}
            (false, false) => return None,
            (inside_p, _) => {
                let cross = &f0 / (&f0 - &f1);
                if inside_p {
                    hi = hi.min(cross);
                } else {
                    lo = lo.max(cross);
                }
            }
        }
    }
    if lo > hi {
        return None;
    }
    let dir = q - p;
    Some((p + &(&dir * &lo), p + &(&dir * &hi)))
}

/// True when the triangle touches the plane without lying in it.
fn straddles(sides: &[Scalar; 3]) -> bool {
    let signs = sides.each_ref().map(sign);
    let pos = signs.iter().filter(|&&s| s > 0).count();
    let neg = signs.iter().filter(|&&s| s < 0).count();
    pos < 3 && neg < 3 && pos + neg > 0
}

/// Points of the triangle lying on the other plane: vertices on it plus
/// strict edge crossings. One or two points for a straddling triangle.
fn plane_section(tri: &[ExactVec3; 3], sides: &[Scalar; 3]) -> Vec<ExactVec3> {
    let mut points = Vec::with_capacity(2);
    for k in 0..3 {
        if sides[k].is_zero() {
            points.push(tri[k].clone());
        }
    }
    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        if sign(&sides[i]) * sign(&sides[j]) < 0 {
            let t = &sides[i] / (&sides[i] - &sides[j]);
            let step = &(&tri[j] - &tri[i]) * &t;
            points.push(&tri[i] + &step);
        }
    }
    points
}

/// Smallest and largest point along `dir`.
fn extremes(
    points: Vec<ExactVec3>,
    dir: &ExactVec3,
) -> Option<((Scalar, ExactVec3), (Scalar, ExactVec3))> {
    let mut keyed = points.into_iter().map(|p| (dir.dot(&p), p));
    let first = keyed.next()?;
    let (mut lo, mut hi) = (first.clone(), first);
    for item in keyed {
        if item.0 < lo.0 {
            lo = item;
        } else if item.0 > hi.0 {
            hi = item;
        }
    }
    Some((lo, hi))
}
