//! Architectural rules: stateless procedures that grow a castle vocabulary
//! out of shape-tree operators.
//!
//! World up is +Y. Towers use the cylindrical frame `{+X, -Z, +Y}` so angle 0
//! faces +X; walls use the Cartesian frame `{d, up × d, up}` with `d` running
//! from the first tower to the second.

use std::f64::consts::TAU;

use castle_kernel::{Axis, Bounds, CoordSys, Interval, Tolerance};
use castle_shape::{ChildChildOperator, Padding, Shape, Size, Split};
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument, warn};

use crate::error::RuleError;
use crate::style::CastleStyle;

/// A wall entering a tower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerOpening {
    /// Direction of the wall in the tower's angle coordinate.
    pub angle: f64,
    pub width: f64,
    /// The opening is cut from the ground up to this height.
    pub height: f64,
}

/// Cylindrical system of a tower standing at `origin`.
pub fn tower_coord_sys(origin: Point3<f64>) -> CoordSys {
    CoordSys::cylindrical(origin, [Vector3::x(), -Vector3::z(), Vector3::y()])
}

/// Angle of the horizontal direction from `origin` to `towards` in a tower frame.
pub fn tower_angle(origin: &Point3<f64>, towards: &Point3<f64>) -> f64 {
    let d = towards - origin;
    (-d.z).atan2(d.x)
}

/// Distance from a tower axis to where the corners of a wall of `width` meet
/// the tower surface.
pub fn attachment_offset(radius: f64, width: f64) -> f64 {
    (radius * radius - 0.25 * width * width).max(0.0).sqrt()
}

/// Axis running along the face of a wall or tower, and how sizes along it
/// are measured.
fn facade(shape: &Shape) -> (Axis, fn(f64) -> Size) {
    match shape.coord_sys() {
        CoordSys::Cartesian(_) => (Axis::X, Size::absolute),
        CoordSys::Cylindrical(_) => (Axis::Y, Size::outer),
    }
}

/// Plinth, windowed body and battlement of a straight curtain wall.
#[instrument(level = "debug", skip_all)]
pub fn castle_outer_wall(shape: &mut Shape, style: &CastleStyle) -> Result<(), RuleError> {
    let CoordSys::Cartesian(_) = shape.coord_sys() else {
        return Err(RuleError::UnsupportedCoordSys {
            rule: "castle_outer_wall",
            kind: shape.coord_sys().kind(),
        });
    };

    let height = shape.bounds().extent(Axis::Z);
    let top = style.battlement_height();
    if height > style.plinth_height + top {
        shape.subdivide(
            Axis::Z,
            &[
                Split::absolute("Base", style.plinth_height),
                Split::relative("Body", 1.0),
                Split::absolute("Parapet", top),
            ],
        )?;
    } else {
        debug!(height, "wall too short for a body");
        shape.subdivide(
            Axis::Z,
            &[
                Split::relative("Base", style.plinth_height),
                Split::relative("Parapet", top),
            ],
        )?;
    }

    let overhang = style.plinth_overhang;
    for base in shape.children_mut("Base") {
        base.bounds_expand(&[(0.0, 0.0), (overhang, overhang), (0.0, 0.0)]);
    }
    for body in shape.children_mut("Body") {
        castle_windows(body, style)?;
    }
    for parapet in shape.children_mut("Parapet") {
        castle_battlement(parapet, style)?;
    }
    Ok(())
}

/// Window bays along a facade.
///
/// Each bay is a pier, an opening column and a pier. The column holds an
/// apron, a sill, an empty light and a lintel. Cartesian sills are widened
/// boxes; cylindrical sills are a radial ring clipped by a flat slab.
#[instrument(level = "debug", skip_all, fields(kind = ?shape.coord_sys().kind()))]
pub fn castle_windows(shape: &mut Shape, style: &CastleStyle) -> Result<(), RuleError> {
    let (axis, size) = facade(shape);
    let needed = style.window_apron + style.sill_height + style.window_height;
    if shape.bounds().extent(Axis::Z) < needed {
        debug!(needed, "facade too short for windows");
        return Ok(());
    }

    let bays = shape.repeat(axis, "Bay", size(style.window_spacing), Padding::default())?;
    let cylindrical = matches!(shape.coord_sys(), CoordSys::Cylindrical(_));
    for bay in shape.children_mut("Bay") {
        bay.subdivide(
            axis,
            &[
                Split::relative("Pier", 1.0),
                Split::new("Opening", size(style.window_width)),
                Split::relative("Pier", 1.0),
            ],
        )?;
        for opening in bay.children_mut("Opening") {
            opening.subdivide(
                Axis::Z,
                &[
                    Split::absolute("Apron", style.window_apron),
                    Split::absolute("Sill", style.sill_height),
                    Split::absolute("Light", style.window_height).hidden(),
                    Split::relative("Lintel", 1.0),
                ],
            )?;
            for sill in opening.children_mut("Sill") {
                if cylindrical {
                    curved_sill(sill, style)?;
                } else {
                    sill.bounds_expand(&[
                        (style.frame_width, style.frame_width),
                        (style.frame_depth, style.frame_depth),
                        (0.0, 0.0),
                    ]);
                }
            }
        }
    }
    debug!(bays, "windows placed");
    Ok(())
}

fn curved_sill(sill: &mut Shape, style: &CastleStyle) -> Result<(), RuleError> {
    let outer = sill.bounds()[Axis::X].max;
    let spread = 2.0 * style.frame_width / outer;

    sill.set_child_child_op(ChildChildOperator::Intersect);
    sill.subdivide(Axis::X, &[Split::relative("Ring", 1.0)])?;
    for ring in sill.children_mut("Ring") {
        ring.bounds_expand(&[(0.0, style.frame_depth), (spread, spread), (0.0, 0.0)]);
    }
    sill.wrap_cartesian_over_cylindrical("Surround")?;
    for surround in sill.children_mut("Surround") {
        surround.bounds_expand(&[
            (0.0, style.frame_depth),
            (style.frame_width, style.frame_width),
            (0.0, 0.0),
        ]);
    }
    Ok(())
}

/// Breastwork topped by a row of merlons separated by embrasures.
#[instrument(level = "debug", skip_all, fields(kind = ?shape.coord_sys().kind()))]
pub fn castle_battlement(shape: &mut Shape, style: &CastleStyle) -> Result<(), RuleError> {
    let (axis, size) = facade(shape);
    let crenel = style
        .crenel_height
        .min(0.5 * shape.bounds().extent(Axis::Z));
    shape.subdivide(
        Axis::Z,
        &[
            Split::relative("Breastwork", 1.0),
            Split::absolute("Crenellation", crenel),
        ],
    )?;

    for row in shape.children_mut("Crenellation") {
        row.repeat(
            axis,
            "Crenel",
            size(style.merlon_width + style.embrasure_width),
            Padding::default(),
        )?;
        for crenel in row.children_mut("Crenel") {
            crenel.subdivide(
                axis,
                &[
                    Split::relative("Merlon", style.merlon_width),
                    Split::relative("Embrasure", style.embrasure_width).hidden(),
                ],
            )?;
        }
    }
    Ok(())
}

/// Round tower with a shell, windows, openings for connected walls and a
/// crenellated crown on a roof.
///
/// The body is cut into height bands at every distinct opening height, so a
/// wall's opening only reaches as high as the wall itself.
#[instrument(level = "debug", skip_all, fields(radius = radius, height = height, openings = openings.len()))]
pub fn make_tower(
    origin: Point3<f64>,
    radius: f64,
    height: f64,
    openings: &[TowerOpening],
    style: &CastleStyle,
) -> Result<Shape, RuleError> {
    let tol = Tolerance::default();
    let mut tower = Shape::new(
        tower_coord_sys(origin),
        Bounds::new(
            Interval::new(0.0, radius),
            Interval::new(0.0, TAU),
            Interval::new(0.0, height),
        ),
    );
    let crown = style.crown_height.min(0.5 * height);
    let body_top = height - crown;
    tower.subdivide(
        Axis::Z,
        &[Split::relative("Body", 1.0), Split::absolute("Crown", crown)],
    )?;

    let cut_height = |opening: &TowerOpening| opening.height.min(body_top);
    let mut tops: Vec<f64> = openings
        .iter()
        .map(cut_height)
        .filter(|h| *h > tol.length && *h < body_top - tol.length)
        .collect();
    tops.sort_by(f64::total_cmp);
    tops.dedup_by(|a, b| (*a - *b).abs() <= tol.length);
    tops.push(body_top);

    let band_gaps: Vec<Vec<(f64, f64)>> = tops
        .iter()
        .map(|top| {
            let active = openings
                .iter()
                .filter(|o| cut_height(*o) >= top - tol.length);
            merged_gaps(active, radius)
        })
        .collect();

    let mut below = 0.0;
    let mut splits = Vec::with_capacity(tops.len());
    for (i, (top, gaps)) in tops.iter().zip(&band_gaps).enumerate() {
        let split = if i + 1 == tops.len() {
            Split::relative("Band", 1.0)
        } else {
            Split::absolute("Band", top - below)
        };
        let open: f64 = gaps.iter().map(|(lo, hi)| hi - lo).sum();
        splits.push(if open >= TAU - tol.angular {
            split.hidden()
        } else {
            split
        });
        below = *top;
    }
    let visible_gaps: Vec<&Vec<(f64, f64)>> = splits
        .iter()
        .zip(&band_gaps)
        .filter(|(split, _)| split.visible)
        .map(|(_, gaps)| gaps)
        .collect();

    for body in tower.children_mut("Body") {
        body.subdivide(Axis::Z, &splits)?;
        for (band, gaps) in body.children_mut("Band").iter_mut().zip(&visible_gaps) {
            carve_band(band, gaps, style)?;
        }
    }

    for crown in tower.children_mut("Crown") {
        crown.bounds_expand(&[(0.0, style.crown_overhang), (0.0, 0.0), (0.0, 0.0)]);
        let roof = style.roof_thickness.min(crown.bounds().extent(Axis::Z));
        crown.subdivide(
            Axis::Z,
            &[
                Split::absolute("Roof", roof),
                Split::relative("Battlement", 1.0),
            ],
        )?;
        for battlement in crown.children_mut("Battlement") {
            ring_split(battlement, style.shell_thickness, "Walk", "Ring")?;
            for ring in battlement.children_mut("Ring") {
                castle_battlement(ring, style)?;
            }
        }
    }

    debug!(bands = splits.len(), nodes = tower.node_count(), "tower laid out");
    Ok(tower)
}

/// Split off an outer ring of `thickness`, hiding the inside. Thin shapes
/// become the ring entirely.
fn ring_split(
    shape: &mut Shape,
    thickness: f64,
    inside: &str,
    ring: &str,
) -> Result<(), RuleError> {
    let radial = shape.bounds().extent(Axis::X);
    if radial > thickness + Tolerance::default().length {
        shape.subdivide(
            Axis::X,
            &[
                Split::relative(inside, 1.0).hidden(),
                Split::absolute(ring, thickness),
            ],
        )?;
    } else {
        shape.subdivide(Axis::X, &[Split::relative(ring, 1.0)])?;
    }
    Ok(())
}

fn carve_band(band: &mut Shape, gaps: &[(f64, f64)], style: &CastleStyle) -> Result<(), RuleError> {
    match gaps.first() {
        None => band.subdivide(Axis::Y, &[Split::relative("Sector", 1.0)])?,
        Some(&(start, _)) => {
            band.bounds_expand(&[(0.0, 0.0), (-start, start), (0.0, 0.0)]);
            let mut splits = Vec::with_capacity(2 * gaps.len());
            for (i, &(lo, hi)) in gaps.iter().enumerate() {
                splits.push(Split::absolute("Gap", hi - lo).hidden());
                match gaps.get(i + 1) {
                    Some(&(next, _)) => splits.push(Split::absolute("Sector", next - hi)),
                    None => splits.push(Split::relative("Sector", 1.0)),
                }
            }
            band.subdivide(Axis::Y, &splits)?;
        }
    }

    for sector in band.children_mut("Sector") {
        ring_split(sector, style.shell_thickness, "Core", "Shell")?;
        if style.tower_windows {
            for shell in sector.children_mut("Shell") {
                castle_windows(shell, style)?;
            }
        }
    }
    Ok(())
}

/// Angular intervals cut by `openings`, sorted by start, merged where they
/// overlap. Starts lie in `[0, 2π)`; ends may pass `2π`.
fn merged_gaps<'a>(
    openings: impl Iterator<Item = &'a TowerOpening>,
    radius: f64,
) -> Vec<(f64, f64)> {
    let mut gaps: Vec<(f64, f64)> = openings
        .map(|o| {
            let half = (0.5 * o.width / radius).clamp(0.0, 1.0).asin();
            let lo = (o.angle - half).rem_euclid(TAU);
            (lo, lo + 2.0 * half)
        })
        .filter(|(lo, hi)| hi > lo)
        .collect();
    gaps.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(gaps.len());
    for (lo, hi) in gaps {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    // Fold gaps that wrap past 2π into the first one.
    while merged.len() > 1 {
        let first = merged[0];
        let last = merged[merged.len() - 1];
        if last.1 < first.0 + TAU {
            break;
        }
        merged.remove(0);
        let end = merged.len() - 1;
        merged[end].1 = last.1.max(first.1 + TAU);
    }
    merged
}

/// Bare wall between two towers; its ends stop where the wall corners meet
/// each tower surface.
#[instrument(level = "debug", skip_all, fields(width = width, height = height))]
pub fn make_wall(
    from: Point3<f64>,
    to: Point3<f64>,
    from_radius: f64,
    to_radius: f64,
    width: f64,
    height: f64,
) -> Shape {
    let mut d = to - from;
    d.y = 0.0;
    let distance = d.norm();
    let dir = if distance > 0.0 {
        d / distance
    } else {
        Vector3::x()
    };
    let start = attachment_offset(from_radius, width);
    let end = attachment_offset(to_radius, width);
    let mut length = distance - start - end;
    if length < 0.0 {
        warn!(distance, start, end, "towers overlap; wall clamped to zero length");
        length = 0.0;
    }

    let up = Vector3::y();
    Shape::new(
        CoordSys::cartesian(from + dir * start, [dir, up.cross(&dir), up]),
        Bounds::new(
            Interval::new(0.0, length),
            Interval::new(-0.5 * width, 0.5 * width),
            Interval::new(0.0, height),
        ),
    )
}

/// Free-standing walls along a polyline.
pub fn make_walls(nodes: &[Point3<f64>], width: f64, height: f64) -> Vec<Shape> {
    nodes
        .windows(2)
        .map(|pair| make_wall(pair[0], pair[1], 0.0, 0.0, width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use castle_kernel::CoordSysKind;
    use castle_shape::{BuildSettings, PADDING};
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI};

    fn opening(angle: f64, width: f64, height: f64) -> TowerOpening {
        TowerOpening {
            angle,
            width,
            height,
        }
    }

    #[test]
    fn test_tower_angle_convention() {
        let o = Point3::origin();
        assert_relative_eq!(tower_angle(&o, &Point3::new(1.0, 0.0, 0.0)), 0.0);
        assert_relative_eq!(tower_angle(&o, &Point3::new(0.0, 0.0, -1.0)), FRAC_PI_2);
        let sys = tower_coord_sys(o);
        let p = sys.local_to_world([1.0, FRAC_PI_2, 0.0]);
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_attachment_offset() {
        assert_relative_eq!(attachment_offset(5.0, 6.0), 4.0);
        assert_eq!(attachment_offset(1.0, 6.0), 0.0);
    }

    #[test]
    fn test_merged_gaps_overlap_and_wrap() {
        let r = 10.0;
        let gaps = merged_gaps(
            [opening(0.0, 2.0, 1.0), opening(0.05, 2.0, 1.0), opening(PI, 2.0, 1.0)].iter(),
            r,
        );
        assert_eq!(gaps.len(), 2);
        let half = (0.1f64).asin();
        assert_relative_eq!(gaps[0].0, PI - half, epsilon = 1e-12);
        assert_relative_eq!(gaps[1].0, TAU - half, epsilon = 1e-12);
        assert_relative_eq!(gaps[1].1, TAU + 0.05 + half, epsilon = 1e-12);
    }

    #[test]
    fn test_merged_gaps_full_circle() {
        let openings: Vec<TowerOpening> = (0..4)
            .map(|i| opening(i as f64 * FRAC_PI_2, 20.0, 1.0))
            .collect();
        let gaps = merged_gaps(openings.iter(), 10.0);
        let open: f64 = gaps.iter().map(|(lo, hi)| hi - lo).sum();
        assert!(open >= TAU - 1e-9);
    }

    #[test]
    fn test_tower_single_opening_span() {
        let tower = make_tower(
            Point3::origin(),
            20.0,
            40.0,
            &[opening(0.0, 20.0, 40.0)],
            &CastleStyle::plain(),
        )
        .unwrap();

        let bands = tower.children("Body")[0].children("Band");
        assert_eq!(bands.len(), 1);
        let sectors = bands[0].children("Sector");
        assert_eq!(sectors.len(), 1);
        assert_relative_eq!(
            sectors[0].bounds()[Axis::Y].extent(),
            TAU - FRAC_PI_3,
            epsilon = 1e-9
        );
        assert_eq!(sectors[0].children("Shell").len(), 1);
    }

    #[test]
    fn test_tower_bands_follow_wall_heights() {
        let style = CastleStyle::plain();
        let tower = make_tower(
            Point3::origin(),
            12.0,
            45.0,
            &[opening(0.0, 5.0, 20.0), opening(PI, 5.0, 60.0)],
            &style,
        )
        .unwrap();

        let bands = tower.children("Body")[0].children("Band");
        assert_eq!(bands.len(), 2);
        assert_relative_eq!(bands[0].bounds()[Axis::Z].max, 20.0);
        assert_eq!(bands[0].children("Sector").len(), 2);
        assert_eq!(bands[1].children("Sector").len(), 1);
        assert_relative_eq!(bands[1].bounds()[Axis::Z].max, 45.0 - style.crown_height);
    }

    #[test]
    fn test_tower_crown_overhangs() {
        let style = CastleStyle::plain();
        let tower = make_tower(Point3::origin(), 12.0, 45.0, &[], &style).unwrap();
        let crown = &tower.children("Crown")[0];
        assert_relative_eq!(crown.bounds()[Axis::X].max, 12.0 + style.crown_overhang);
        assert_eq!(crown.children("Roof")[0].bounds()[Axis::X].min, 0.0);
        let ring = &crown.children("Battlement")[0].children("Ring")[0];
        assert!(!ring.children("Crenellation")[0].children("Crenel").is_empty());
    }

    #[test]
    fn test_tower_windows_stamp_curved_sills() {
        let style = CastleStyle::default();
        let tower = make_tower(Point3::origin(), 12.0, 45.0, &[], &style).unwrap();
        let shell = &tower.children("Body")[0].children("Band")[0].children("Sector")[0]
            .children("Shell")[0];
        let bay = &shell.children("Bay")[0];
        let sill = &bay.children("Opening")[0].children("Sill")[0];
        assert_eq!(sill.child_child_op(), ChildChildOperator::Intersect);
        assert_eq!(sill.children("Ring").len(), 1);
        assert!(matches!(
            sill.children("Surround")[0].coord_sys(),
            CoordSys::Cartesian(_)
        ));
    }

    #[test]
    fn test_curved_sill_builds_closed_mesh() {
        let mut sector = Shape::new(
            tower_coord_sys(Point3::origin()),
            Bounds::new(
                Interval::new(9.0, 12.0),
                Interval::new(0.0, 0.3),
                Interval::new(0.0, 0.3),
            ),
        );
        curved_sill(&mut sector, &CastleStyle::default()).unwrap();
        sector.init(&BuildSettings::default());

        let soup = sector.soup().unwrap();
        assert!(!soup.is_empty());
        assert_eq!(soup.boundary_edge_count(), 0);
        assert!(soup.signed_volume() > 0.0);
    }

    #[test]
    fn test_outer_wall_layout() {
        let style = CastleStyle::default();
        let mut wall = make_wall(
            Point3::origin(),
            Point3::new(40.0, 0.0, 0.0),
            0.0,
            0.0,
            5.0,
            36.0,
        );
        castle_outer_wall(&mut wall, &style).unwrap();

        let base = &wall.children("Base")[0];
        assert_relative_eq!(base.bounds()[Axis::Y].min, -2.5 - style.plinth_overhang);
        let body = &wall.children("Body")[0];
        assert_eq!(body.children("Bay").len(), 5);
        assert!(body.children(PADDING).is_empty());
        let sill = &body.children("Bay")[0].children("Opening")[0].children("Sill")[0];
        assert_relative_eq!(sill.bounds()[Axis::Y].max, 2.5 + style.frame_depth);
        let parapet = &wall.children("Parapet")[0];
        assert_relative_eq!(parapet.bounds()[Axis::Z].max, 36.0);
        assert_eq!(
            parapet.children("Crenellation")[0].children("Crenel").len(),
            13
        );
    }

    #[test]
    fn test_short_wall_skips_body() {
        let mut wall = make_wall(
            Point3::origin(),
            Point3::new(10.0, 0.0, 0.0),
            0.0,
            0.0,
            2.0,
            4.0,
        );
        castle_outer_wall(&mut wall, &CastleStyle::default()).unwrap();
        assert!(wall.children("Body").is_empty());
        assert_eq!(wall.children("Parapet").len(), 1);
    }

    #[test]
    fn test_outer_wall_rejects_cylindrical() {
        let mut tower = Shape::new(
            tower_coord_sys(Point3::origin()),
            Bounds::new(
                Interval::new(0.0, 5.0),
                Interval::new(0.0, TAU),
                Interval::new(0.0, 10.0),
            ),
        );
        assert_eq!(
            castle_outer_wall(&mut tower, &CastleStyle::default()),
            Err(RuleError::UnsupportedCoordSys {
                rule: "castle_outer_wall",
                kind: CoordSysKind::Cylindrical
            })
        );
    }

    #[test]
    fn test_wall_attaches_to_tower_surfaces() {
        let wall = make_wall(
            Point3::origin(),
            Point3::new(0.0, 0.0, 30.0),
            5.0,
            5.0,
            6.0,
            10.0,
        );
        assert_relative_eq!(wall.bounds()[Axis::X].extent(), 22.0, epsilon = 1e-12);
        let origin = wall.coord_sys().origin();
        assert_relative_eq!(origin.z, 4.0, epsilon = 1e-12);
        let bases = wall.coord_sys().bases();
        assert_relative_eq!(bases[1], Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_overlapping_towers_clamp_wall() {
        let wall = make_wall(
            Point3::origin(),
            Point3::new(5.0, 0.0, 0.0),
            5.0,
            5.0,
            2.0,
            10.0,
        );
        assert_eq!(wall.bounds()[Axis::X].extent(), 0.0);
    }

    #[test]
    fn test_make_walls_polyline() {
        let nodes = [
            Point3::new(-80.0, 0.0, 0.0),
            Point3::new(130.0, 0.0, 30.0),
            Point3::new(200.0, 0.0, 70.0),
            Point3::new(240.0, 0.0, 0.0),
        ];
        let walls = make_walls(&nodes, 4.0, 20.0);
        assert_eq!(walls.len(), 3);
        assert_relative_eq!(
            walls[0].bounds()[Axis::X].max,
            (210.0f64 * 210.0 + 30.0 * 30.0).sqrt(),
            epsilon = 1e-9
        );
    }
}
