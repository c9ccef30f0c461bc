pub mod error;
pub mod parts;
pub mod rules;
pub mod style;

pub use error::{PartError, RuleError};
pub use parts::{
    Castle, CastlePart, CastleTower, ConnectingCastleWall, Connector, HasHeight, HasRadius,
    PartId, TowerId, WallId,
};
pub use rules::{
    castle_battlement, castle_outer_wall, castle_windows, make_tower, make_wall, make_walls,
    TowerOpening,
};
pub use style::CastleStyle;
