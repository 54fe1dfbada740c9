//! Edge collapse simplification
//!
//! Entry point tying the pieces together: build half-edge connectivity from an
//! [`IndexedMesh`], run the greedy quadric-error engine to a vertex target, and
//! compact the result.

use crate::config::SimplifyConfig;
use crate::engine::{EngineState, SimplificationEngine, SimplificationStats};
use crate::half_edge::HalfEdgeMesh;
use crate::MeshSimplifier;
use qemesh_core::{Error, IndexedMesh, Result};

/// Output of [`EdgeCollapseSimplifier::simplify_with_report`]
#[derive(Debug, Clone)]
pub struct SimplificationReport {
    pub mesh: IndexedMesh,
    /// `Converged` if the target was met, `Exhausted` if no legal collapse remained
    pub state: EngineState,
    pub stats: SimplificationStats,
}

/// Edge collapse mesh simplifier using half-edge connectivity and QEM.
#[derive(Debug, Clone, Default)]
pub struct EdgeCollapseSimplifier {
    pub config: SimplifyConfig,
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SimplifyConfig) -> Self {
        Self { config }
    }

    /// Simplify towards `target_vertices` and report how the run ended.
    ///
    /// When the referenced vertices already meet the target, the input is
    /// returned as is, once it has been checked to be a valid oriented
    /// manifold.
    pub fn simplify_with_report(
        &self,
        mesh: &IndexedMesh,
        target_vertices: u32,
    ) -> Result<SimplificationReport> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }

        let half_edge =
            HalfEdgeMesh::build_with(mesh.vertices.clone(), &mesh.indices, self.config.winding)?;
        let mut engine =
            SimplificationEngine::new(half_edge, target_vertices, self.config.clone())?;

        if engine.state() == EngineState::Converged {
            return Ok(SimplificationReport {
                mesh: mesh.clone(),
                state: engine.state(),
                stats: engine.stats().clone(),
            });
        }

        let state = engine.run()?;
        Ok(SimplificationReport {
            mesh: engine.export()?,
            state,
            stats: engine.stats().clone(),
        })
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify_to(&self, mesh: &IndexedMesh, target_vertices: u32) -> Result<IndexedMesh> {
        Ok(self.simplify_with_report(mesh, target_vertices)?.mesh)
    }
}

/// Vertex target that removes `reduction_ratio` of `vertex_count` vertices.
///
/// The ratio must lie in `0.0..=1.0`; the target never drops below one vertex.
pub fn target_for_ratio(vertex_count: usize, reduction_ratio: f32) -> Result<u32> {
    if !(0.0..=1.0).contains(&reduction_ratio) {
        return Err(Error::InvalidData(
            "Reduction ratio must be between 0.0 and 1.0".to_string(),
        ));
    }
    let keep = ((1.0 - reduction_ratio as f64) * vertex_count as f64).round();
    Ok((keep as u32).max(1))
}
