//! Greedy edge-collapse loop
//!
//! The engine owns the half-edge mesh, the cost model and the candidate
//! queue. Each [`SimplificationEngine::step`] pops the cheapest current
//! edge and either collapses it or records it as rejected, then checks
//! whether the target has been reached or the candidates ran out.

use crate::collapse::{CollapseOutcome, Rejection};
use crate::compact::compact;
use crate::config::SimplifyConfig;
use crate::cost::CostModel;
use crate::half_edge::{HalfEdgeId, HalfEdgeMesh, VertexId};
use crate::queue::CollapseQueue;
use qemesh_core::{Error, IndexedMesh, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Built and seeded, no step taken yet
    Ready,
    Running,
    /// Live vertex count reached the target
    Converged,
    /// No acceptable candidate left above the target
    Exhausted,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Converged | EngineState::Exhausted)
    }
}

/// Counters for one simplification run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimplificationStats {
    pub input_vertices: usize,
    pub input_faces: usize,
    pub live_vertices: usize,
    pub live_faces: usize,
    pub collapses: usize,
    pub rejected: usize,
    /// Time spent seeding and stepping
    pub elapsed: Duration,
}

impl SimplificationStats {
    /// Share of input vertices removed so far, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.input_vertices == 0 {
            return 0.0;
        }
        (self.input_vertices - self.live_vertices) as f64 / self.input_vertices as f64 * 100.0
    }
}

pub struct SimplificationEngine {
    mesh: HalfEdgeMesh,
    cost_model: CostModel,
    queue: CollapseQueue,
    config: SimplifyConfig,
    target: usize,
    state: EngineState,
    stats: SimplificationStats,
    /// Canonical edges refused since their neighborhood last changed
    rejected: HashSet<HalfEdgeId>,
}

impl SimplificationEngine {
    /// Compute quadrics and seed the queue for reducing `mesh` to
    /// `target_vertices` live vertices.
    ///
    /// A target at or above the current vertex count leaves the engine
    /// already [`EngineState::Converged`].
    pub fn new(
        mut mesh: HalfEdgeMesh,
        target_vertices: u32,
        config: SimplifyConfig,
    ) -> Result<Self> {
        if target_vertices == 0 {
            return Err(Error::InvalidTarget {
                target: target_vertices,
                vertex_count: mesh.live_vertex_count(),
            });
        }

        let start = Instant::now();
        let cost_model = CostModel::new(config.merge_policy);
        cost_model.initialize_vertex_quadrics(&mut mesh)?;

        let stats = SimplificationStats {
            input_vertices: mesh.live_vertex_count(),
            input_faces: mesh.live_face_count(),
            live_vertices: mesh.live_vertex_count(),
            live_faces: mesh.live_face_count(),
            ..Default::default()
        };
        let mut engine = Self {
            mesh,
            cost_model,
            queue: CollapseQueue::new(),
            config,
            target: target_vertices as usize,
            state: EngineState::Ready,
            stats,
            rejected: HashSet::new(),
        };

        if engine.mesh.live_vertex_count() <= engine.target {
            engine.state = EngineState::Converged;
        } else {
            engine.seed()?;
        }
        engine.stats.elapsed += start.elapsed();

        tracing::debug!(
            vertices = engine.stats.input_vertices,
            faces = engine.stats.input_faces,
            target = engine.target,
            candidates = engine.queue.len(),
            "simplification engine ready"
        );
        Ok(engine)
    }

    /// Build the half-edge mesh from an indexed mesh, then [`SimplificationEngine::new`].
    pub fn from_indexed(
        mesh: &IndexedMesh,
        target_vertices: u32,
        config: SimplifyConfig,
    ) -> Result<Self> {
        let half_edge =
            HalfEdgeMesh::build_with(mesh.vertices.clone(), &mesh.indices, config.winding)?;
        Self::new(half_edge, target_vertices, config)
    }

    fn seed(&mut self) -> Result<()> {
        let edges: Vec<HalfEdgeId> = self.mesh.edges().collect();
        let (mesh, model, config) = (&self.mesh, &self.cost_model, &self.config);
        let candidates = edges
            .par_iter()
            .map(|&edge| Ok(candidate_cost(mesh, model, config, edge)?.map(|cost| (edge, cost))))
            .collect::<Result<Vec<_>>>()?;

        let candidates: Vec<(HalfEdgeId, f64)> = candidates.into_iter().flatten().collect();
        for &(edge, cost) in &candidates {
            self.mesh.set_edge_cost(edge, cost);
        }
        self.queue.seed_all(candidates);
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &SimplificationStats {
        &self.stats
    }

    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    pub fn into_mesh(self) -> HalfEdgeMesh {
        self.mesh
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn config(&self) -> &SimplifyConfig {
        &self.config
    }

    /// Perform one iteration. Terminal states are sticky.
    pub fn step(&mut self) -> Result<EngineState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        self.state = EngineState::Running;

        let start = Instant::now();
        let result = self.advance();
        self.stats.elapsed += start.elapsed();
        self.stats.live_vertices = self.mesh.live_vertex_count();
        self.stats.live_faces = self.mesh.live_face_count();
        result?;

        if self.state.is_terminal() {
            tracing::debug!(
                state = ?self.state,
                vertices = self.stats.live_vertices,
                faces = self.stats.live_faces,
                collapses = self.stats.collapses,
                rejected = self.stats.rejected,
                reduction_percent = self.stats.reduction_percent(),
                elapsed = ?self.stats.elapsed,
                "simplification finished"
            );
        }
        Ok(self.state)
    }

    /// Step until a terminal state.
    pub fn run(&mut self) -> Result<EngineState> {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Step until a terminal state or until `progress` breaks. A break leaves
    /// the engine `Running`; the mesh can still be exported.
    pub fn run_with<F>(&mut self, mut progress: F) -> Result<EngineState>
    where
        F: FnMut(&SimplificationStats) -> ControlFlow<()>,
    {
        loop {
            let state = self.step()?;
            if state.is_terminal() || progress(&self.stats).is_break() {
                return Ok(state);
            }
        }
    }

    /// Compact the current live mesh. Allowed between any two steps.
    pub fn export(&self) -> Result<IndexedMesh> {
        compact(&self.mesh)
    }

    fn advance(&mut self) -> Result<()> {
        if self.mesh.live_vertex_count() <= self.target {
            self.state = EngineState::Converged;
            return Ok(());
        }

        let Some((edge, cost)) = self.queue.pop_min(&self.mesh) else {
            self.state = EngineState::Exhausted;
            return Ok(());
        };
        if self.config.max_error.is_some_and(|max| cost > max) {
            tracing::debug!(cost, "cheapest collapse exceeds maximum error");
            self.state = EngineState::Exhausted;
            return Ok(());
        }

        match self.try_collapse(edge) {
            Ok(CollapseOutcome::Collapsed(record)) => {
                self.stats.collapses += 1;
                self.refresh_around(record.survivor)?;
            }
            Ok(CollapseOutcome::Rejected(reason)) => {
                tracing::trace!(edge = edge.0, ?reason, "collapse rejected");
                self.stats.rejected += 1;
                self.rejected.insert(edge);
            }
            Err(Error::StaleHandle(handle)) => {
                tracing::warn!(%handle, "skipping stale collapse candidate");
                self.stats.rejected += 1;
            }
            Err(e) => return Err(e),
        }

        if self.mesh.live_vertex_count() <= self.target {
            self.state = EngineState::Converged;
        }
        Ok(())
    }

    fn try_collapse(&mut self, edge: HalfEdgeId) -> Result<CollapseOutcome> {
        let (_, position) = self.cost_model.half_edge_cost(&self.mesh, edge)?;
        if self.config.preserve_boundary && touches_boundary(&self.mesh, edge)? {
            return Ok(CollapseOutcome::Rejected(Rejection::PreservedBoundary));
        }
        if self.config.prevent_face_flips && self.mesh.would_flip(edge, &position)? {
            return Ok(CollapseOutcome::Rejected(Rejection::FaceFlip));
        }
        self.mesh.collapse(edge, position)
    }

    /// Re-cost every edge at the survivor and give previously rejected edges
    /// in its one-ring another chance.
    fn refresh_around(&mut self, survivor: VertexId) -> Result<()> {
        let mut touched = self.mesh.incident_edges(survivor)?;
        for neighbor in self.mesh.vertex_ring(survivor)? {
            for edge in self.mesh.incident_edges(neighbor)? {
                if self.rejected.remove(&edge) {
                    touched.push(edge);
                }
            }
        }

        for edge in touched {
            self.rejected.remove(&edge);
            match candidate_cost(&self.mesh, &self.cost_model, &self.config, edge)? {
                Some(cost) => {
                    self.mesh.set_edge_cost(edge, cost);
                    self.queue.reinsert(edge, cost);
                }
                None => self.queue.invalidate(edge),
            }
        }
        Ok(())
    }
}

fn touches_boundary(mesh: &HalfEdgeMesh, edge: HalfEdgeId) -> Result<bool> {
    let (u, v) = mesh.endpoints(edge)?;
    Ok(mesh.is_boundary_vertex(u)? || mesh.is_boundary_vertex(v)?)
}

/// Queue cost of `edge`, or `None` when boundary preservation excludes it.
fn candidate_cost(
    mesh: &HalfEdgeMesh,
    model: &CostModel,
    config: &SimplifyConfig,
    edge: HalfEdgeId,
) -> Result<Option<f64>> {
    let boundary = touches_boundary(mesh, edge)?;
    if boundary && config.preserve_boundary {
        return Ok(None);
    }
    let (cost, _) = model.half_edge_cost(mesh, edge)?;
    Ok(Some(if boundary { cost + config.boundary_weight } else { cost }))
}
