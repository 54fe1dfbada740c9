//! Mesh simplification by greedy edge collapse
//!
//! This crate reduces triangle meshes to a target vertex count while keeping
//! them closed, oriented 2-manifolds:
//! - Half-edge connectivity with typed handles
//! - Quadric error metric costs and merge placement
//! - A lazily invalidated priority queue of collapse candidates
//! - A steppable engine plus a one-call simplifier

pub mod quadric;
pub mod half_edge;
pub mod collapse;
pub mod cost;
pub mod queue;
pub mod config;
pub mod engine;
pub mod compact;
pub mod edge_collapse;

pub use quadric::*;
pub use half_edge::*;
pub use collapse::*;
pub use cost::*;
pub use queue::*;
pub use config::*;
pub use engine::*;
pub use compact::*;
pub use edge_collapse::*;

use qemesh_core::{IndexedMesh, Result};

/// Simplify a mesh by reducing the number of vertices
pub trait MeshSimplifier {
    /// Simplify mesh down to `target_vertices` live vertices, or as close as
    /// topology allows
    fn simplify_to(&self, mesh: &IndexedMesh, target_vertices: u32) -> Result<IndexedMesh>;

    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &IndexedMesh, reduction_ratio: f32) -> Result<IndexedMesh> {
        let target = target_for_ratio(mesh.vertex_count(), reduction_ratio)?;
        self.simplify_to(mesh, target)
    }
}
