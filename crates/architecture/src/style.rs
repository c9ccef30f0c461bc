use serde::{Deserialize, Serialize};

/// Fixed architectural parameters shared by every rule, in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastleStyle {
    /// Height of the wall plinth.
    pub plinth_height: f64,
    /// How far the plinth sticks out on each face of a wall.
    pub plinth_overhang: f64,
    /// Solid breastwork below the crenels.
    pub parapet_height: f64,
    pub crenel_height: f64,
    pub merlon_width: f64,
    pub embrasure_width: f64,
    /// Width of one window bay.
    pub window_spacing: f64,
    pub window_width: f64,
    pub window_height: f64,
    /// Masonry below each sill.
    pub window_apron: f64,
    pub sill_height: f64,
    /// Sideways overhang of a sill past the opening.
    pub frame_width: f64,
    /// Forward projection of a sill past the face.
    pub frame_depth: f64,
    pub tower_windows: bool,
    pub shell_thickness: f64,
    pub crown_height: f64,
    pub crown_overhang: f64,
    pub roof_thickness: f64,
    pub tower_radius: f64,
    pub tower_height: f64,
    pub wall_width: f64,
    pub wall_height: f64,
}

impl Default for CastleStyle {
    fn default() -> Self {
        Self {
            plinth_height: 3.0,
            plinth_overhang: 0.5,
            parapet_height: 1.2,
            crenel_height: 1.5,
            merlon_width: 2.0,
            embrasure_width: 1.0,
            window_spacing: 8.0,
            window_width: 2.0,
            window_height: 4.0,
            window_apron: 6.0,
            sill_height: 0.3,
            frame_width: 0.4,
            frame_depth: 0.3,
            tower_windows: true,
            shell_thickness: 3.0,
            crown_height: 4.0,
            crown_overhang: 1.0,
            roof_thickness: 0.5,
            tower_radius: 12.0,
            tower_height: 45.0,
            wall_width: 5.0,
            wall_height: 36.0,
        }
    }
}

impl CastleStyle {
    /// Height taken by the battlement of a wall or tower crown.
    pub fn battlement_height(&self) -> f64 {
        self.parapet_height + self.crenel_height
    }

    /// Style without tower windows; cheap to rebuild.
    pub fn plain() -> Self {
        Self {
            tower_windows: false,
            ..Self::default()
        }
    }
}
