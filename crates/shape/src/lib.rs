pub mod error;
pub mod policy;
pub mod render;
pub mod shape;

pub use error::ShapeError;
pub use policy::{
    ChildChildOperator, Padding, PaddingType, ParentChildOperator, Size, SizePolicy, Split,
};
pub use render::{Material, MeshHandle, RecordingBackend, RenderBackend, RenderEvent};
pub use shape::{Shape, PADDING};

use castle_kernel::PrimitiveSettings;

/// Settings consumed by [`Shape::init`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildSettings {
    pub primitive: PrimitiveSettings,
}
