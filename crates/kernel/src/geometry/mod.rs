pub mod bounds;
pub mod coords;

pub use bounds::{Axis, Bounds, Interval};
pub use coords::{CoordSys, CoordSysKind, Frame};
