//! Indexed triangle mesh, the shape exchanged with importers and exporters

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh as an ordered vertex list and a flat index list.
///
/// Every consecutive triple of `indices` names one triangle, in a consistent
/// winding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl IndexedMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertex records and a flat index list
    pub fn from_vertices_and_indices(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Create a mesh from bare positions and triangles
    pub fn from_positions_and_triangles(positions: Vec<Point3f>, triangles: &[[u32; 3]]) -> Self {
        Self {
            vertices: positions.into_iter().map(Vertex::new).collect(),
            indices: triangles.iter().flatten().copied().collect(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of complete triangles
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Iterate over complete triangles
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Vertex positions in order
    pub fn positions(&self) -> impl Iterator<Item = &Point3f> + '_ {
        self.vertices.iter().map(|v| &v.position)
    }

    /// Attach per-vertex normals. Ignored unless one normal per vertex is given.
    pub fn set_normals(&mut self, normals: &[Vector3f]) {
        if normals.len() == self.vertices.len() {
            for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
                vertex.normal = Some(*normal);
            }
        }
    }

    /// Calculate face normals, one per triangle
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.triangles()
            .map(|[a, b, c]| {
                let v0 = self.vertices[a as usize].position;
                let v1 = self.vertices[b as usize].position;
                let v2 = self.vertices[c as usize].position;

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1.cross(&edge2).normalize()
            })
            .collect()
    }
}
