use castle_kernel::CoordSysKind;
use castle_shape::ShapeError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleError {
    #[error("rule `{rule}` does not support {kind:?} shapes")]
    UnsupportedCoordSys {
        rule: &'static str,
        kind: CoordSysKind,
    },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PartError {
    #[error("unknown tower id")]
    UnknownTower,

    #[error("unknown wall id")]
    UnknownWall,

    #[error("a wall cannot connect a tower to itself")]
    SelfConnection,

    #[error("invalid {what}: {value}")]
    InvalidDimension { what: &'static str, value: f64 },

    #[error("part has no {capability}")]
    Unsupported { capability: &'static str },

    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl From<ShapeError> for PartError {
    fn from(err: ShapeError) -> Self {
        Self::Rule(RuleError::Shape(err))
    }
}
