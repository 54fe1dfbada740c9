//! Conversion of the live half-edge mesh back to an indexed triangle list

use crate::half_edge::HalfEdgeMesh;
use qemesh_core::{Error, IndexedMesh, Result};

/// Pack live vertices densely and emit one index triple per live face.
///
/// Surviving vertices keep their relative order; faces keep their relative
/// order and their cyclic winding starting at the face's stored half-edge.
pub fn compact(mesh: &HalfEdgeMesh) -> Result<IndexedMesh> {
    if mesh.live_face_count() == 0 {
        return Err(Error::EmptyResult);
    }

    let mut old_to_new: Vec<Option<u32>> = vec![None; mesh.vertex_capacity()];
    let mut vertices = Vec::with_capacity(mesh.live_vertex_count());
    for id in mesh.vertex_ids() {
        old_to_new[id.index()] = Some(vertices.len() as u32);
        vertices.push(mesh.vertex(id)?.attributes);
    }

    let mut indices = Vec::with_capacity(mesh.live_face_count() * 3);
    for face in mesh.face_ids() {
        for v in mesh.face_vertices(face)? {
            let index = old_to_new[v.index()]
                .ok_or_else(|| Error::StaleHandle(format!("{v:?} referenced by {face:?}")))?;
            indices.push(index);
        }
    }

    tracing::debug!(
        vertices = vertices.len(),
        faces = indices.len() / 3,
        "compacted mesh"
    );
    Ok(IndexedMesh::from_vertices_and_indices(vertices, indices))
}
