//! Error types for the simulation core

use thiserror::Error;

/// Physics system errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Hull or polygon construction from insufficient or collinear points
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Polygon exceeds the supported vertex capacity
    #[error("Polygon has {0} vertices, maximum is {1}")]
    TooManyVertices(usize, usize),

    /// Non-finite coordinates
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Dynamic body whose shapes carry no mass
    #[error("Dynamic body {0:?} has zero mass")]
    ZeroMass(crate::body::BodyHandle),

    /// Use of a destroyed or foreign handle
    #[error("Stale handle: {0}")]
    StaleHandle(String),

    /// Non-finite state produced by integration; the world is poisoned
    #[error("Numeric divergence: {0}")]
    NumericDivergence(String),

    /// Out-of-range scalar input
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
