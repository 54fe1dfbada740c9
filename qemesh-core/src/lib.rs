//! Core data structures for qemesh
//!
//! This crate provides the types shared by importers, the simplification
//! engine and exporters: vertex records, the indexed triangle mesh, error
//! types, and a few procedural shapes.

pub mod point;
pub mod mesh;
pub mod error;
pub mod primitives;

pub use point::*;
pub use mesh::*;
pub use error::*;
