use castle_shape::{BuildSettings, Material, MeshHandle, RenderBackend, Shape};
use nalgebra::{Point3, Vector3};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info, instrument, warn};

use crate::error::PartError;
use crate::rules::{castle_outer_wall, make_tower, make_wall, tower_angle, TowerOpening};
use crate::style::CastleStyle;

// ─── Part Keys ───────────────────────────────────────────────────────────────

new_key_type! {
    pub struct TowerId;
    pub struct WallId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartId {
    Tower(TowerId),
    Wall(WallId),
}

impl From<TowerId> for PartId {
    fn from(id: TowerId) -> Self {
        Self::Tower(id)
    }
}

impl From<WallId> for PartId {
    fn from(id: WallId) -> Self {
        Self::Wall(id)
    }
}

// ─── Capabilities ────────────────────────────────────────────────────────────

pub trait HasHeight {
    fn height(&self) -> f64;
}

pub trait HasRadius {
    fn radius(&self) -> f64;
}

/// Common view of towers and walls for editors and pickers.
pub trait CastlePart {
    fn shape(&self) -> &Shape;

    /// Caller-assigned identity, e.g. a picking id.
    fn tag(&self) -> Option<u32>;

    fn as_height(&self) -> Option<&dyn HasHeight> {
        None
    }

    fn as_radius(&self) -> Option<&dyn HasRadius> {
        None
    }
}

// ─── Parts ───────────────────────────────────────────────────────────────────

/// Wall entering a tower, with the tower at its other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connector {
    pub wall: WallId,
    pub neighbor: TowerId,
}

#[derive(Debug)]
pub struct CastleTower {
    origin: Point3<f64>,
    height: f64,
    radius: f64,
    connectors: Vec<Connector>,
    tag: Option<u32>,
    shape: Shape,
}

impl CastleTower {
    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }
}

impl HasHeight for CastleTower {
    fn height(&self) -> f64 {
        self.height
    }
}

impl HasRadius for CastleTower {
    fn radius(&self) -> f64 {
        self.radius
    }
}

impl CastlePart for CastleTower {
    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn tag(&self) -> Option<u32> {
        self.tag
    }

    fn as_height(&self) -> Option<&dyn HasHeight> {
        Some(self)
    }

    fn as_radius(&self) -> Option<&dyn HasRadius> {
        Some(self)
    }
}

#[derive(Debug)]
pub struct ConnectingCastleWall {
    height: f64,
    width: f64,
    node1: TowerId,
    node2: TowerId,
    tag: Option<u32>,
    shape: Shape,
}

impl ConnectingCastleWall {
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn nodes(&self) -> (TowerId, TowerId) {
        (self.node1, self.node2)
    }
}

impl HasHeight for ConnectingCastleWall {
    fn height(&self) -> f64 {
        self.height
    }
}

impl CastlePart for ConnectingCastleWall {
    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn tag(&self) -> Option<u32> {
        self.tag
    }

    fn as_height(&self) -> Option<&dyn HasHeight> {
        Some(self)
    }
}

// ─── Castle ──────────────────────────────────────────────────────────────────

/// Arena of towers and the walls connecting them.
///
/// Parts refer to each other by id. Every edit rebuilds the shape trees it
/// affects; handles of replaced trees are released on the next
/// [`Castle::render`].
#[derive(Debug)]
pub struct Castle {
    style: CastleStyle,
    settings: BuildSettings,
    towers: SlotMap<TowerId, CastleTower>,
    walls: SlotMap<WallId, ConnectingCastleWall>,
    retired: Vec<MeshHandle>,
}

/// Placement and size of every part, kept to undo an edit whose rebuild fails.
#[derive(Debug, Clone)]
struct Dimensions {
    towers: Vec<(TowerId, Point3<f64>, f64, f64)>,
    walls: Vec<(WallId, f64)>,
}

fn check_dimension(what: &'static str, value: f64) -> Result<(), PartError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PartError::InvalidDimension { what, value })
    }
}

impl Castle {
    pub fn new(style: CastleStyle) -> Self {
        Self::with_settings(style, BuildSettings::default())
    }

    pub fn with_settings(style: CastleStyle, settings: BuildSettings) -> Self {
        Self {
            style,
            settings,
            towers: SlotMap::with_key(),
            walls: SlotMap::with_key(),
            retired: Vec::new(),
        }
    }

    pub fn style(&self) -> &CastleStyle {
        &self.style
    }

    pub fn tower(&self, id: TowerId) -> Option<&CastleTower> {
        self.towers.get(id)
    }

    pub fn wall(&self, id: WallId) -> Option<&ConnectingCastleWall> {
        self.walls.get(id)
    }

    pub fn towers(&self) -> impl Iterator<Item = (TowerId, &CastleTower)> + '_ {
        self.towers.iter()
    }

    pub fn walls(&self) -> impl Iterator<Item = (WallId, &ConnectingCastleWall)> + '_ {
        self.walls.iter()
    }

    pub fn part(&self, id: PartId) -> Option<&dyn CastlePart> {
        match id {
            PartId::Tower(id) => self.towers.get(id).map(|t| t as &dyn CastlePart),
            PartId::Wall(id) => self.walls.get(id).map(|w| w as &dyn CastlePart),
        }
    }

    /// Shape-tree nodes over every part.
    pub fn node_count(&self) -> usize {
        let towers: usize = self.towers.values().map(|t| t.shape.node_count()).sum();
        let walls: usize = self.walls.values().map(|w| w.shape.node_count()).sum();
        towers + walls
    }

    #[instrument(skip(self))]
    pub fn add_tower(
        &mut self,
        origin: Point3<f64>,
        radius: f64,
        height: f64,
    ) -> Result<TowerId, PartError> {
        check_dimension("radius", radius)?;
        check_dimension("height", height)?;
        let mut shape = make_tower(origin, radius, height, &[], &self.style)?;
        shape.init(&self.settings);
        let id = self.towers.insert(CastleTower {
            origin,
            height,
            radius,
            connectors: Vec::new(),
            tag: None,
            shape,
        });
        info!(?id, "tower added");
        Ok(id)
    }

    /// Join two towers with a wall. Towers lower than the wall are raised.
    #[instrument(skip(self))]
    pub fn connect(
        &mut self,
        a: TowerId,
        b: TowerId,
        width: f64,
        height: f64,
    ) -> Result<WallId, PartError> {
        if a == b {
            return Err(PartError::SelfConnection);
        }
        check_dimension("width", width)?;
        check_dimension("height", height)?;
        let shape = self.wall_shape(a, b, width, height)?;
        let id = self.walls.insert(ConnectingCastleWall {
            height,
            width,
            node1: a,
            node2: b,
            tag: None,
            shape,
        });

        let before = self.dimensions();
        for (tower, neighbor) in [(a, b), (b, a)] {
            if let Some(entry) = self.towers.get_mut(tower) {
                entry.connectors.push(Connector { wall: id, neighbor });
                if entry.height < height {
                    info!(?tower, from = entry.height, to = height, "raising tower to new wall");
                    entry.height = height;
                }
            }
        }
        if let Err(err) = self.rebuild(before, &[a.into(), b.into()]) {
            for tower in [a, b] {
                if let Some(entry) = self.towers.get_mut(tower) {
                    entry.connectors.retain(|c| c.wall != id);
                }
            }
            self.walls.remove(id);
            return Err(err);
        }
        info!(?id, "wall connected");
        Ok(id)
    }

    /// Towers at every node joined by walls in order, using the style's
    /// default dimensions. A closed ring also joins the last node to the first.
    pub fn make_walls(
        &mut self,
        nodes: &[Point3<f64>],
        closed: bool,
    ) -> Result<(Vec<TowerId>, Vec<WallId>), PartError> {
        let (radius, height) = (self.style.tower_radius, self.style.tower_height);
        let (width, wall_height) = (self.style.wall_width, self.style.wall_height);

        let towers = nodes
            .iter()
            .map(|node| self.add_tower(*node, radius, height))
            .collect::<Result<Vec<_>, _>>()?;
        let mut pairs: Vec<(TowerId, TowerId)> =
            towers.windows(2).map(|pair| (pair[0], pair[1])).collect();
        if closed && towers.len() > 2 {
            pairs.push((towers[towers.len() - 1], towers[0]));
        }
        let walls = pairs
            .into_iter()
            .map(|(a, b)| self.connect(a, b, width, wall_height))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((towers, walls))
    }

    pub fn remove_wall(&mut self, id: WallId) -> Result<(), PartError> {
        let wall = self.walls.get(id).ok_or(PartError::UnknownWall)?;
        let nodes: Vec<TowerId> = [wall.node1, wall.node2]
            .into_iter()
            .filter(|tower| self.towers.contains_key(*tower))
            .collect();
        let shapes = nodes
            .iter()
            .map(|&tower| Ok((PartId::Tower(tower), self.tower_shape(tower, Some(id))?)))
            .collect::<Result<Vec<_>, PartError>>()?;

        if let Some(mut wall) = self.walls.remove(id) {
            wall.shape.take_handles(&mut self.retired);
        }
        for tower in nodes {
            if let Some(entry) = self.towers.get_mut(tower) {
                entry.connectors.retain(|c| c.wall != id);
            }
        }
        self.install(shapes);
        info!(?id, "wall removed");
        Ok(())
    }

    pub fn set_tag(&mut self, id: PartId, tag: Option<u32>) -> Result<(), PartError> {
        match id {
            PartId::Tower(id) => {
                self.towers.get_mut(id).ok_or(PartError::UnknownTower)?.tag = tag;
            }
            PartId::Wall(id) => {
                self.walls.get_mut(id).ok_or(PartError::UnknownWall)?.tag = tag;
            }
        }
        Ok(())
    }

    pub fn find_by_tag(&self, tag: u32) -> Option<PartId> {
        self.towers
            .iter()
            .find(|(_, t)| t.tag == Some(tag))
            .map(|(id, _)| PartId::Tower(id))
            .or_else(|| {
                self.walls
                    .iter()
                    .find(|(_, w)| w.tag == Some(tag))
                    .map(|(id, _)| PartId::Wall(id))
            })
    }

    pub fn set_height(&mut self, id: PartId, height: f64) -> Result<(), PartError> {
        match id {
            PartId::Tower(id) => self.set_tower_height(id, height),
            PartId::Wall(id) => self.set_wall_height(id, height),
        }
    }

    /// Walls taller than the new height are lowered to it. Raising a tower
    /// leaves its walls alone.
    #[instrument(skip(self))]
    pub fn set_tower_height(&mut self, id: TowerId, height: f64) -> Result<(), PartError> {
        check_dimension("height", height)?;
        let connectors = self.towers.get(id).ok_or(PartError::UnknownTower)?.connectors.clone();
        let before = self.dimensions();
        if let Some(tower) = self.towers.get_mut(id) {
            tower.height = height;
        }

        let mut affected = vec![PartId::Tower(id)];
        for connector in connectors {
            let Some(wall) = self.walls.get_mut(connector.wall) else {
                continue;
            };
            if wall.height > height {
                info!(wall = ?connector.wall, from = wall.height, to = height, "lowering connected wall");
                wall.height = height;
                affected.push(connector.wall.into());
                push_unique(&mut affected, connector.neighbor.into());
            }
        }
        self.rebuild(before, &affected)
    }

    /// Endpoint towers lower than the new height are raised to it.
    #[instrument(skip(self))]
    pub fn set_wall_height(&mut self, id: WallId, height: f64) -> Result<(), PartError> {
        check_dimension("height", height)?;
        let wall = self.walls.get(id).ok_or(PartError::UnknownWall)?;
        let nodes = [wall.node1, wall.node2];
        if !nodes.iter().all(|tower| self.towers.contains_key(*tower)) {
            return Err(PartError::UnknownTower);
        }
        let before = self.dimensions();
        if let Some(wall) = self.walls.get_mut(id) {
            wall.height = height;
        }

        let mut affected = vec![PartId::Wall(id)];
        for tower in nodes {
            if let Some(entry) = self.towers.get_mut(tower) {
                if entry.height < height {
                    info!(?tower, from = entry.height, to = height, "raising tower to wall");
                    entry.height = height;
                }
            }
            push_unique(&mut affected, tower.into());
        }
        self.rebuild(before, &affected)
    }

    /// Rebuilds the tower and the walls attached to it.
    #[instrument(skip(self))]
    pub fn set_radius(&mut self, id: PartId, radius: f64) -> Result<(), PartError> {
        let PartId::Tower(id) = id else {
            return Err(PartError::Unsupported {
                capability: "radius",
            });
        };
        check_dimension("radius", radius)?;
        let connectors = self.towers.get(id).ok_or(PartError::UnknownTower)?.connectors.clone();
        let before = self.dimensions();
        if let Some(tower) = self.towers.get_mut(id) {
            tower.radius = radius;
        }

        let mut affected = vec![PartId::Tower(id)];
        for connector in connectors {
            push_unique(&mut affected, connector.wall.into());
        }
        self.rebuild(before, &affected)
    }

    /// Translate a tower and recompute everything around it.
    #[instrument(skip(self))]
    pub fn move_tower(&mut self, id: TowerId, delta: Vector3<f64>) -> Result<(), PartError> {
        if let Some(&value) = delta.iter().find(|v| !v.is_finite()) {
            warn!(?id, value, "rejected non-finite tower offset");
            return Err(PartError::InvalidDimension {
                what: "offset",
                value,
            });
        }
        let connectors = self.towers.get(id).ok_or(PartError::UnknownTower)?.connectors.clone();
        let before = self.dimensions();
        if let Some(tower) = self.towers.get_mut(id) {
            tower.origin += delta;
        }

        let mut affected = vec![PartId::Tower(id)];
        for connector in connectors {
            push_unique(&mut affected, connector.wall.into());
            push_unique(&mut affected, connector.neighbor.into());
        }
        self.rebuild(before, &affected)
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            towers: self
                .towers
                .iter()
                .map(|(id, t)| (id, t.origin, t.radius, t.height))
                .collect(),
            walls: self.walls.iter().map(|(id, w)| (id, w.height)).collect(),
        }
    }

    fn restore(&mut self, before: Dimensions) {
        for (id, origin, radius, height) in before.towers {
            if let Some(tower) = self.towers.get_mut(id) {
                tower.origin = origin;
                tower.radius = radius;
                tower.height = height;
            }
        }
        for (id, height) in before.walls {
            if let Some(wall) = self.walls.get_mut(id) {
                wall.height = height;
            }
        }
    }

    /// Rebuild `parts` from their current dimensions. Nothing is replaced
    /// unless every part builds; on failure the dimensions revert to `before`.
    fn rebuild(&mut self, before: Dimensions, parts: &[PartId]) -> Result<(), PartError> {
        let built = parts
            .iter()
            .map(|&part| {
                let shape = match part {
                    PartId::Tower(id) => self.tower_shape(id, None)?,
                    PartId::Wall(id) => {
                        let wall = self.walls.get(id).ok_or(PartError::UnknownWall)?;
                        self.wall_shape(wall.node1, wall.node2, wall.width, wall.height)?
                    }
                };
                Ok((part, shape))
            })
            .collect::<Result<Vec<_>, PartError>>();

        match built {
            Ok(shapes) => {
                self.install(shapes);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, parts = parts.len(), "rebuild failed, edit reverted");
                self.restore(before);
                Err(err)
            }
        }
    }

    /// Swap in rebuilt trees, retiring the handles of the replaced ones.
    fn install(&mut self, shapes: Vec<(PartId, Shape)>) {
        for (part, shape) in shapes {
            let slot = match part {
                PartId::Tower(id) => self.towers.get_mut(id).map(|t| &mut t.shape),
                PartId::Wall(id) => self.walls.get_mut(id).map(|w| &mut w.shape),
            };
            if let Some(slot) = slot {
                let mut old = std::mem::replace(slot, shape);
                old.take_handles(&mut self.retired);
                debug!(?part, "part rebuilt");
            }
        }
    }

    fn wall_shape(
        &self,
        a: TowerId,
        b: TowerId,
        width: f64,
        height: f64,
    ) -> Result<Shape, PartError> {
        let from = self.towers.get(a).ok_or(PartError::UnknownTower)?;
        let to = self.towers.get(b).ok_or(PartError::UnknownTower)?;
        let mut shape = make_wall(from.origin, to.origin, from.radius, to.radius, width, height);
        castle_outer_wall(&mut shape, &self.style)?;
        shape.init(&self.settings);
        Ok(shape)
    }

    /// Tower tree with an opening per connected wall, leaving out `removed`.
    fn tower_shape(&self, id: TowerId, removed: Option<WallId>) -> Result<Shape, PartError> {
        let tower = self.towers.get(id).ok_or(PartError::UnknownTower)?;
        let openings: Vec<TowerOpening> = tower
            .connectors
            .iter()
            .filter(|c| Some(c.wall) != removed)
            .filter_map(|c| {
                let wall = self.walls.get(c.wall)?;
                let neighbor = self.towers.get(c.neighbor)?;
                Some(TowerOpening {
                    angle: tower_angle(&tower.origin, &neighbor.origin),
                    width: wall.width,
                    height: wall.height,
                })
            })
            .collect();
        let mut shape = make_tower(
            tower.origin,
            tower.radius,
            tower.height,
            &openings,
            &self.style,
        )?;
        shape.init(&self.settings);
        debug!(?id, openings = openings.len(), "tower laid out");
        Ok(shape)
    }

    /// Release handles of replaced trees, then draw every part.
    pub fn render(&mut self, backend: &mut dyn RenderBackend, material: &Material) {
        for handle in self.retired.drain(..) {
            backend.release(handle);
        }
        for tower in self.towers.values_mut() {
            tower.shape.render(backend, material);
        }
        for wall in self.walls.values_mut() {
            wall.shape.render(backend, material);
        }
    }

    /// Return every handle this castle holds to `backend`.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        for handle in self.retired.drain(..) {
            backend.release(handle);
        }
        for tower in self.towers.values_mut() {
            tower.shape.release(backend);
        }
        for wall in self.walls.values_mut() {
            wall.shape.release(backend);
        }
    }
}

fn push_unique(parts: &mut Vec<PartId>, part: PartId) {
    if !parts.contains(&part) {
        parts.push(part);
    }
}
