use std::path::{Path, PathBuf};

use castle_architecture::{Castle, CastleStyle, PartError, PartId, TowerId, WallId};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerEntry {
    pub origin: [f64; 3],
    pub radius: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallEntry {
    /// Index into `towers`.
    pub from: usize,
    pub to: usize,
    pub width: f64,
    pub height: f64,
}

/// Part addressed by its index in the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartRef {
    Tower(usize),
    Wall(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightEdit {
    pub part: PartRef,
    pub height: f64,
}

/// Castle description read from JSON; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub style: CastleStyle,
    pub towers: Vec<TowerEntry>,
    pub walls: Vec<WallEntry>,
    pub output_dir: PathBuf,
    pub edits: Vec<HeightEdit>,
}

impl Default for Layout {
    fn default() -> Self {
        let style = CastleStyle::default();
        let nodes = [
            [-80.0, 0.0, 0.0],
            [130.0, 0.0, 30.0],
            [200.0, 0.0, 70.0],
            [240.0, 0.0, 0.0],
        ];
        let towers = nodes
            .iter()
            .map(|origin| TowerEntry {
                origin: *origin,
                radius: style.tower_radius,
                height: style.tower_height,
            })
            .collect();
        let walls = (1..nodes.len())
            .map(|i| WallEntry {
                from: i - 1,
                to: i,
                width: style.wall_width,
                height: style.wall_height,
            })
            .collect();
        Self {
            style,
            towers,
            walls,
            output_dir: PathBuf::from("renders"),
            edits: vec![
                HeightEdit {
                    part: PartRef::Tower(1),
                    height: 30.0,
                },
                HeightEdit {
                    part: PartRef::Wall(2),
                    height: 50.0,
                },
            ],
        }
    }
}

#[derive(Debug)]
pub struct BuiltLayout {
    pub castle: Castle,
    pub towers: Vec<TowerId>,
    pub walls: Vec<WallId>,
}

impl BuiltLayout {
    pub fn resolve(&self, part: PartRef) -> Option<PartId> {
        match part {
            PartRef::Tower(i) => self.towers.get(i).copied().map(PartId::Tower),
            PartRef::Wall(i) => self.walls.get(i).copied().map(PartId::Wall),
        }
    }
}

impl Layout {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn build(&self) -> Result<BuiltLayout, PartError> {
        let mut castle = Castle::new(self.style.clone());
        let towers = self
            .towers
            .iter()
            .map(|t| castle.add_tower(Point3::from(t.origin), t.radius, t.height))
            .collect::<Result<Vec<_>, _>>()?;
        let walls = self
            .walls
            .iter()
            .map(|w| {
                let a = *towers.get(w.from).ok_or(PartError::UnknownTower)?;
                let b = *towers.get(w.to).ok_or(PartError::UnknownTower)?;
                castle.connect(a, b, w.width, w.height)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BuiltLayout {
            castle,
            towers,
            walls,
        })
    }
}
