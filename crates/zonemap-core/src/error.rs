//! 核心错误定义

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneError {
    #[error("Ring has {count} vertices, a polygon needs at least {min}")]
    TooFewVertices { count: usize, min: usize },

    #[error("Ring is not closed: first and last vertex differ")]
    NotClosed,

    #[error("Ring contains a non-finite coordinate at vertex {index}")]
    NonFinite { index: usize },

    #[error("Zone label must not be empty")]
    EmptyLabel,

    #[error("Invalid color token: {0:?}")]
    InvalidColor(String),

    #[error("Invalid coordinate {value:?}: {reason}")]
    InvalidCoordinate { value: String, reason: String },
}
