use std::f64::consts::{FRAC_PI_3, TAU};

use approx::assert_relative_eq;
use castle_architecture::{Castle, CastlePart, CastleStyle, PartError, PartId};
use castle_kernel::Axis;
use castle_shape::{Material, RecordingBackend, Shape};
use nalgebra::{Point3, Vector3};

fn sectors(tower: &Shape) -> Vec<&Shape> {
    tower.children("Body")[0]
        .children("Band")
        .iter()
        .flat_map(|band| band.children("Sector"))
        .collect()
}

fn height_of(castle: &Castle, id: impl Into<PartId>) -> f64 {
    castle
        .part(id.into())
        .and_then(|p| p.as_height().map(|h| h.height()))
        .unwrap()
}

#[test]
fn tower_opening_matches_wall_width() {
    let mut castle = Castle::new(CastleStyle::plain());
    let a = castle.add_tower(Point3::origin(), 20.0, 40.0).unwrap();
    let b = castle
        .add_tower(Point3::new(120.0, 0.0, 0.0), 20.0, 40.0)
        .unwrap();
    castle.connect(a, b, 20.0, 40.0).unwrap();

    let tower = castle.tower(a).unwrap().shape();
    let sectors = sectors(tower);
    assert_eq!(sectors.len(), 1);
    assert_relative_eq!(
        sectors[0].bounds()[Axis::Y].extent(),
        TAU - FRAC_PI_3,
        epsilon = 1e-9
    );
    // The gap is centred on the neighbour direction (angle 0).
    let sector = sectors[0].bounds()[Axis::Y];
    assert_relative_eq!(sector.min.rem_euclid(TAU), FRAC_PI_3 / 2.0, epsilon = 1e-9);
}

#[test]
fn lowering_tower_lowers_only_connected_walls() {
    let mut castle = Castle::new(CastleStyle::plain());
    let t1 = castle.add_tower(Point3::origin(), 10.0, 50.0).unwrap();
    let t2 = castle
        .add_tower(Point3::new(80.0, 0.0, 0.0), 10.0, 50.0)
        .unwrap();
    let t3 = castle
        .add_tower(Point3::new(80.0, 0.0, 80.0), 10.0, 50.0)
        .unwrap();
    let t4 = castle
        .add_tower(Point3::new(0.0, 0.0, 80.0), 10.0, 50.0)
        .unwrap();
    let w1 = castle.connect(t1, t2, 5.0, 40.0).unwrap();
    let w3 = castle.connect(t3, t4, 5.0, 40.0).unwrap();

    castle.set_height(t1.into(), 30.0).unwrap();

    assert_eq!(height_of(&castle, t1), 30.0);
    assert_eq!(height_of(&castle, w1), 30.0);
    assert_eq!(height_of(&castle, w3), 40.0);
    assert_eq!(height_of(&castle, t2), 50.0);

    let wall = castle.wall(w1).unwrap().shape();
    assert_relative_eq!(wall.bounds()[Axis::Z].max, 30.0);
    let untouched = castle.wall(w3).unwrap().shape();
    assert_relative_eq!(untouched.bounds()[Axis::Z].max, 40.0);

    // Raising the tower again leaves the wall where it is.
    castle.set_height(t1.into(), 60.0).unwrap();
    assert_eq!(height_of(&castle, w1), 30.0);
}

#[test]
fn raising_wall_raises_endpoint_towers() {
    let mut castle = Castle::new(CastleStyle::plain());
    let a = castle.add_tower(Point3::origin(), 10.0, 30.0).unwrap();
    let b = castle
        .add_tower(Point3::new(60.0, 0.0, 0.0), 10.0, 45.0)
        .unwrap();
    let w = castle.connect(a, b, 5.0, 20.0).unwrap();

    castle.set_height(w.into(), 40.0).unwrap();
    assert_eq!(height_of(&castle, a), 40.0);
    assert_eq!(height_of(&castle, b), 45.0);

    // Tower `b` now has two bands: up to the wall and above it.
    let b_shape = castle.tower(b).unwrap().shape();
    let bands = b_shape.children("Body")[0].children("Band");
    assert_eq!(bands.len(), 2);
    assert_relative_eq!(bands[0].bounds()[Axis::Z].max, 40.0);
}

#[test]
fn radius_change_moves_wall_ends() {
    let mut castle = Castle::new(CastleStyle::plain());
    let a = castle.add_tower(Point3::origin(), 10.0, 40.0).unwrap();
    let b = castle
        .add_tower(Point3::new(60.0, 0.0, 0.0), 10.0, 40.0)
        .unwrap();
    let w = castle.connect(a, b, 6.0, 30.0).unwrap();
    let before = castle.wall(w).unwrap().shape().bounds()[Axis::X].extent();

    castle.set_radius(a.into(), 5.0).unwrap();

    let after = castle.wall(w).unwrap().shape().bounds()[Axis::X].extent();
    assert_relative_eq!(before, 60.0 - 2.0 * 91.0f64.sqrt(), epsilon = 1e-9);
    assert_relative_eq!(after, 60.0 - 91.0f64.sqrt() - 4.0, epsilon = 1e-9);
    assert_eq!(height_of(&castle, w), 30.0);
    assert_eq!(
        castle.tower(a).unwrap().shape().bounds()[Axis::X].max,
        5.0
    );
}

#[test]
fn moving_tower_rebuilds_neighbours() {
    let mut castle = Castle::new(CastleStyle::plain());
    let a = castle.add_tower(Point3::origin(), 10.0, 40.0).unwrap();
    let b = castle
        .add_tower(Point3::new(60.0, 0.0, 0.0), 10.0, 40.0)
        .unwrap();
    let w = castle.connect(a, b, 10.0, 30.0).unwrap();

    castle.move_tower(b, Vector3::new(-60.0, 0.0, -60.0)).unwrap();
    assert_eq!(castle.tower(b).unwrap().origin(), Point3::new(0.0, 0.0, -60.0));

    let wall = castle.wall(w).unwrap().shape();
    let dir = wall.coord_sys().bases()[0];
    assert_relative_eq!(dir, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);

    // The neighbour's opening now faces back along +Z, i.e. angle -π/2.
    let neighbour = sectors(castle.tower(b).unwrap().shape());
    let sector = neighbour[0].bounds()[Axis::Y];
    let gap_mid = (sector.max + FRAC_PI_3 / 2.0).rem_euclid(TAU);
    assert_relative_eq!(gap_mid, 1.5 * std::f64::consts::PI, epsilon = 1e-9);
}

#[test]
fn removing_wall_closes_openings() {
    let mut castle = Castle::new(CastleStyle::plain());
    let (towers, walls) = castle
        .make_walls(
            &[
                Point3::origin(),
                Point3::new(60.0, 0.0, 0.0),
                Point3::new(30.0, 0.0, 50.0),
            ],
            true,
        )
        .unwrap();
    assert_eq!(towers.len(), 3);
    assert_eq!(walls.len(), 3);
    assert_eq!(castle.tower(towers[0]).unwrap().connectors().len(), 2);

    castle.remove_wall(walls[0]).unwrap();
    assert_eq!(castle.tower(towers[0]).unwrap().connectors().len(), 1);
    assert_eq!(castle.remove_wall(walls[0]), Err(PartError::UnknownWall));
    assert_eq!(castle.walls().count(), 2);
}

#[test]
fn stale_ids_are_rejected() {
    let mut castle = Castle::new(CastleStyle::plain());
    let a = castle.add_tower(Point3::origin(), 10.0, 40.0).unwrap();
    let b = castle
        .add_tower(Point3::new(60.0, 0.0, 0.0), 10.0, 40.0)
        .unwrap();
    let w = castle.connect(a, b, 5.0, 30.0).unwrap();
    castle.remove_wall(w).unwrap();

    assert_eq!(castle.set_height(w.into(), 10.0), Err(PartError::UnknownWall));
    assert!(castle.part(w.into()).is_none());
    assert_eq!(
        castle.set_height(a.into(), -1.0),
        Err(PartError::InvalidDimension {
            what: "height",
            value: -1.0
        })
    );
}

#[test]
fn windowed_tower_builds_closed_sills() {
    let style = CastleStyle::default();
    let mut castle = Castle::new(style.clone());
    let a = castle.add_tower(Point3::origin(), 12.0, 45.0).unwrap();

    let tower = castle.tower(a).unwrap().shape();
    let shell = &sectors(tower)[0].children("Shell")[0];
    let bays = shell.children("Bay");
    assert_eq!(bays.len(), 9);
    for bay in bays {
        let sill = &bay.children("Opening")[0].children("Sill")[0];
        let soup = sill.soup().expect("intersected sill");
        assert!(!soup.is_empty());
        assert_eq!(soup.boundary_edge_count(), 0);
    }

    let bay_count = bays.len();
    let mut backend = RecordingBackend::new();
    castle.render(&mut backend, &Material::default());
    assert!(backend.draws().len() > bay_count);
}
