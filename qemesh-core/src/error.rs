//! Error types for qemesh

use thiserror::Error;

/// Malformed input topology, detected while building connectivity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("Non-manifold edge: directed edge {from} -> {to} appears more than once")]
    NonManifoldEdge { from: u32, to: u32 },

    #[error("Degenerate face {face}: triangle repeats a vertex index")]
    DegenerateFace { face: usize },

    #[error("Index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("Index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Main error type for qemesh operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Stale handle: {0}")]
    StaleHandle(String),

    #[error("Simplification left no live faces")]
    EmptyResult,

    #[error("Invalid target of {target} vertices for a mesh of {vertex_count}")]
    InvalidTarget { target: u32, vertex_count: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for qemesh operations
pub type Result<T> = std::result::Result<T, Error>;
