use std::f64::consts::TAU;

use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

use crate::Tolerance;
use crate::geometry::{Axis, Bounds, CoordSys, Frame};
use crate::soup::PolygonSoup;

/// Settings for primitive generation.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveSettings {
    /// Wedge subdivisions over a full turn.
    pub angular_resolution: u32,
    pub tolerance: Tolerance,
}

impl Default for PrimitiveSettings {
    fn default() -> Self {
        Self {
            angular_resolution: 20,
            tolerance: Tolerance::default(),
        }
    }
}

/// Build the closed primitive for a shape: a box for Cartesian systems, an
/// annular wedge for cylindrical ones.
#[instrument(level = "debug", skip_all, fields(kind = ?coord_sys.kind(), min = ?bounds.min(), max = ?bounds.max()))]
pub fn build_primitive(
    coord_sys: &CoordSys,
    bounds: &Bounds,
    settings: &PrimitiveSettings,
) -> PolygonSoup {
    match coord_sys {
        CoordSys::Cartesian(frame) => make_box(frame, bounds),
        CoordSys::Cylindrical(frame) => make_wedge(frame, bounds, settings),
    }
}

/// Six quads with flat normals, four vertices each.
pub fn make_box(frame: &Frame, bounds: &Bounds) -> PolygonSoup {
    let flip = !frame.is_right_handed();
    let m = frame.basis_matrix();
    let lo = bounds.min();
    let hi = bounds.max();
    let mut soup = PolygonSoup::new();

    for axis in Axis::ALL {
        let a = axis.index();
        let u = (a + 1) % 3;
        let v = (a + 2) % 3;
        for high in [false, true] {
            let fixed = if high { hi[a] } else { lo[a] };
            let corner = |cu: f64, cv: f64| {
                let mut local = Vector3::zeros();
                local[a] = fixed;
                local[u] = cu;
                local[v] = cv;
                frame.point_at(&local)
            };
            let mut local_normal = Vector3::zeros();
            local_normal[a] = if high { 1.0 } else { -1.0 };
            let normal = (m * local_normal).normalize();

            let ring = [
                corner(lo[u], lo[v]),
                corner(hi[u], lo[v]),
                corner(hi[u], hi[v]),
                corner(lo[u], hi[v]),
            ];
            push_face(&mut soup, &ring, &[normal; 4], high == flip);
        }
    }
    debug!(triangles = soup.triangle_count(), "built box");
    soup
}

/// Annular wedge `[r0, r1] x [phi0, phi1] x [h0, h1]`.
///
/// Lateral faces carry smooth radial normals, caps are flat. An inner radius
/// of zero gives a solid sector. A span of a whole turn emits no end caps and
/// closes the seam on the first ring sample.
pub fn make_wedge(frame: &Frame, bounds: &Bounds, settings: &PrimitiveSettings) -> PolygonSoup {
    let tol = &settings.tolerance;
    let phi = bounds[Axis::Y].normalized_angle(tol);
    let radius = bounds[Axis::X];
    let height = bounds[Axis::Z];
    let full = tol.is_full_turn(phi.extent());
    let solid = tol.is_zero_length(radius.min);
    let (r0, r1) = (if solid { 0.0 } else { radius.min }, radius.max);
    let (h0, h1) = (height.min, height.max);

    let angles = sample_angles(phi.min, phi.max, settings.angular_resolution, tol);
    let mut dirs: Vec<Vector3<f64>> = angles.iter().map(|&a| frame.radial(a)).collect();
    if full {
        let first = dirs[0];
        if let Some(last) = dirs.last_mut() {
            *last = first;
        }
    }

    let axis_point = |z: f64| frame.cylinder_point(0.0, &Vector3::zeros(), z);
    let at = |rad: f64, d: &Vector3<f64>, z: f64| -> Point3<f64> {
        if rad == 0.0 { axis_point(z) } else { frame.cylinder_point(rad, d, z) }
    };

    let flip = !frame.is_right_handed();
    let up = frame.bases[2].normalize();
    let mut soup = PolygonSoup::new();

    for pair in dirs.windows(2) {
        let (d0, d1) = (&pair[0], &pair[1]);
        let (n0, n1) = (d0.normalize(), d1.normalize());

        push_face(
            &mut soup,
            &[at(r1, d0, h0), at(r1, d1, h0), at(r1, d1, h1), at(r1, d0, h1)],
            &[n0, n1, n1, n0],
            flip,
        );
        if !solid {
            push_face(
                &mut soup,
                &[at(r0, d0, h0), at(r0, d0, h1), at(r0, d1, h1), at(r0, d1, h0)],
                &[-n0, -n0, -n1, -n1],
                flip,
            );
            push_face(
                &mut soup,
                &[at(r0, d0, h1), at(r1, d0, h1), at(r1, d1, h1), at(r0, d1, h1)],
                &[up; 4],
                flip,
            );
            push_face(
                &mut soup,
                &[at(r0, d0, h0), at(r0, d1, h0), at(r1, d1, h0), at(r1, d0, h0)],
                &[-up; 4],
                flip,
            );
        } else {
            push_face(
                &mut soup,
                &[axis_point(h1), at(r1, d0, h1), at(r1, d1, h1)],
                &[up; 3],
                flip,
            );
            push_face(
                &mut soup,
                &[axis_point(h0), at(r1, d1, h0), at(r1, d0, h0)],
                &[-up; 3],
                flip,
            );
        }
    }

    if !full {
        let start = &dirs[0];
        let end = &dirs[dirs.len() - 1];
        let start_normal = -frame.bases[2].cross(start).normalize();
        let end_normal = frame.bases[2].cross(end).normalize();
        push_face(
            &mut soup,
            &[at(r0, start, h0), at(r1, start, h0), at(r1, start, h1), at(r0, start, h1)],
            &[start_normal; 4],
            flip,
        );
        push_face(
            &mut soup,
            &[at(r0, end, h0), at(r0, end, h1), at(r1, end, h1), at(r1, end, h0)],
            &[end_normal; 4],
            flip,
        );
    }

    debug!(
        segments = dirs.len() - 1,
        full,
        solid,
        triangles = soup.triangle_count(),
        "built wedge"
    );
    soup
}

/// Interval ends plus every multiple of `2π / resolution` strictly between them.
fn sample_angles(lo: f64, hi: f64, resolution: u32, tol: &Tolerance) -> Vec<f64> {
    let step = TAU / f64::from(resolution.max(1));
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    let mut angles = vec![lo];
    for k in first..=last {
        // `a` lies in [lo, hi]; skip samples that would duplicate an end.
        let a = k as f64 * step;
        if !tol.is_zero_angle(a - lo) && !tol.is_zero_angle(hi - a) {
            angles.push(a);
        }
    }
    angles.push(hi);
    angles
}

/// Add a planar polygon (3 or 4 corners, counter-clockwise seen from outside)
/// as a triangle fan, reversed when `flip` is set.
fn push_face(soup: &mut PolygonSoup, corners: &[Point3<f64>], normals: &[Vector3<f64>], flip: bool) {
    let ids: Vec<u32> = corners
        .iter()
        .zip(normals)
        .map(|(p, n)| soup.add_vertex(*p, *n))
        .collect();
    match (ids.as_slice(), flip) {
        (&[a, b, c, d], false) => soup.add_quad(a, b, c, d),
        (&[a, b, c, d], true) => soup.add_quad(a, d, c, b),
        (&[a, b, c], false) => soup.add_triangle(a, b, c),
        (&[a, b, c], true) => soup.add_triangle(a, c, b),
        _ => debug_assert!(false, "faces have three or four corners"),
    }
}
