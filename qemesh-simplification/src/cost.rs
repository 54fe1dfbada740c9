//! Quadric error costs for edge collapses

use crate::half_edge::{FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};
use crate::quadric::Quadric;
use qemesh_core::{Point3d, Point3f, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Where the merged vertex of a collapse is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Minimizer of the summed quadric, falling back to the midpoint when
    /// the system is singular.
    #[default]
    Optimal,
    /// Always the edge midpoint.
    Midpoint,
}

/// Computes face quadrics, per-vertex quadric sums and edge collapse costs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostModel {
    policy: MergePolicy,
}

impl CostModel {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Quadric of the plane through `face`; zero for a degenerate triangle.
    pub fn face_quadric(mesh: &HalfEdgeMesh, face: FaceId) -> Result<Quadric> {
        let [p0, p1, p2] = mesh.face_positions(face)?.map(|p| p.cast::<f64>());
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let normal = e1.cross(&e2);
        let length = normal.norm();

        if !length.is_finite() || length <= f64::EPSILON * (e1.norm_squared() + e2.norm_squared()) {
            return Ok(Quadric::zero());
        }
        Ok(Quadric::from_normal_and_point(&(normal / length), &p0))
    }

    /// Reset every live vertex quadric to the sum of its incident face quadrics.
    pub fn initialize_vertex_quadrics(&self, mesh: &mut HalfEdgeMesh) -> Result<()> {
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        let contributions = faces
            .par_iter()
            .map(|&face| Ok((mesh.face_vertices(face)?, Self::face_quadric(mesh, face)?)))
            .collect::<Result<Vec<_>>>()?;

        for id in mesh.vertex_ids().collect::<Vec<_>>() {
            mesh.vertex_mut(id)?.quadric = Quadric::zero();
        }
        for (vertices, quadric) in contributions {
            for v in vertices {
                mesh.vertex_mut(v)?.quadric += quadric;
            }
        }

        tracing::debug!(faces = faces.len(), "initialized vertex quadrics");
        Ok(())
    }

    /// Cost and merge position for collapsing the edge between `u` and `v`.
    ///
    /// The cost is the summed quadric evaluated at the merge position, clamped
    /// to zero against rounding.
    pub fn edge_cost(
        &self,
        mesh: &HalfEdgeMesh,
        u: VertexId,
        v: VertexId,
    ) -> Result<(f64, Point3f)> {
        let a = mesh.vertex(u)?;
        let b = mesh.vertex(v)?;
        let quadric = a.quadric + b.quadric;
        let midpoint: Point3d =
            nalgebra::center(&a.position().cast::<f64>(), &b.position().cast::<f64>());

        let position = match self.policy {
            MergePolicy::Optimal => quadric.minimizer().unwrap_or(midpoint),
            MergePolicy::Midpoint => midpoint,
        };
        let cost = quadric.evaluate(&position).max(0.0);
        Ok((cost, position.cast()))
    }

    /// [`CostModel::edge_cost`] for the endpoints of a half-edge.
    pub fn half_edge_cost(&self, mesh: &HalfEdgeMesh, edge: HalfEdgeId) -> Result<(f64, Point3f)> {
        let (u, v) = mesh.endpoints(edge)?;
        self.edge_cost(mesh, u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qemesh_core::{primitives, IndexedMesh};

    fn build(mesh: IndexedMesh) -> HalfEdgeMesh {
        HalfEdgeMesh::build(mesh.vertices, &mesh.indices).unwrap()
    }

    #[test]
    fn test_degenerate_face_has_zero_quadric() {
        let mesh = build(IndexedMesh::from_positions_and_triangles(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
            ],
            &[[0, 1, 2]],
        ));
        assert_eq!(CostModel::face_quadric(&mesh, FaceId(0)).unwrap(), Quadric::zero());
    }

    #[test]
    fn test_vertices_lie_on_their_own_planes() {
        let mut mesh = build(primitives::tetrahedron());
        CostModel::default().initialize_vertex_quadrics(&mut mesh).unwrap();
        for id in mesh.vertex_ids() {
            let vertex = mesh.vertex(id).unwrap();
            assert_relative_eq!(
                vertex.quadric.evaluate(&vertex.position().cast()),
                0.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_flat_grid_edges_are_free() {
        let mut mesh = build(primitives::grid(4));
        let model = CostModel::new(MergePolicy::Optimal);
        model.initialize_vertex_quadrics(&mut mesh).unwrap();
        for edge in mesh.edges() {
            let (cost, _) = model.half_edge_cost(&mesh, edge).unwrap();
            assert_relative_eq!(cost, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_optimal_placement_on_cube_edge() {
        let mut mesh = build(primitives::cube());
        let model = CostModel::new(MergePolicy::Optimal);
        model.initialize_vertex_quadrics(&mut mesh).unwrap();

        // Edge (1,0,0)-(1,1,0): three planes pin x = 1 and z = 0, y = 0 and
        // y = 1 pull equally, so the merge lands halfway.
        let (cost, position) = model.edge_cost(&mesh, VertexId(1), VertexId(2)).unwrap();
        assert_relative_eq!(position, Point3f::new(1.0, 0.5, 0.0), epsilon = 1e-5);
        assert_relative_eq!(cost, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_midpoint_policy() {
        let mut mesh = build(primitives::cube());
        let model = CostModel::new(MergePolicy::Midpoint);
        model.initialize_vertex_quadrics(&mut mesh).unwrap();
        let (cost, position) = model.edge_cost(&mesh, VertexId(0), VertexId(1)).unwrap();
        assert_relative_eq!(position, Point3f::new(0.5, 0.0, 0.0));
        assert!(cost >= 0.0);
    }

    #[test]
    fn test_costs_are_non_negative() {
        let mut mesh = build(primitives::uv_sphere(8, 12));
        let model = CostModel::default();
        model.initialize_vertex_quadrics(&mut mesh).unwrap();
        for edge in mesh.edges() {
            assert!(model.half_edge_cost(&mesh, edge).unwrap().0 >= 0.0);
        }
    }
}
