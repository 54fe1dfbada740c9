//! Half-edge connectivity over an arena of vertices, half-edges and faces
//!
//! All cross-references are small integer handles into the arenas owned by
//! [`HalfEdgeMesh`]. Entities are only ever marked `removed` while a
//! simplification runs; physical compaction happens once, at export.

use crate::quadric::Quadric;
use itertools::Itertools;
use qemesh_core::{Error, Point3f, Result, StructuralError, Vertex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Type-safe vertex handle; also the vertex's stable identity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Type-safe half-edge handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HalfEdgeId(pub u32);

/// Type-safe face handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl HalfEdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How the builder treats a triangle whose directed edge already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindingRepair {
    /// Fail with [`StructuralError::NonManifoldEdge`].
    #[default]
    Strict,
    /// Insert the triangle with reversed winding; fail only if that conflicts too.
    FlipConflicting,
}

/// A vertex in the half-edge mesh
#[derive(Debug, Clone)]
pub struct MeshVertex {
    pub attributes: Vertex,
    /// Accumulated quadric of all faces ever merged into this vertex
    pub quadric: Quadric,
    /// One live outgoing half-edge (arbitrary choice if several)
    pub(crate) outgoing: Option<HalfEdgeId>,
    /// Number of live outgoing half-edges, equal to the number of incident faces
    pub(crate) degree: u32,
    pub(crate) removed: bool,
}

impl MeshVertex {
    fn new(attributes: Vertex) -> Self {
        Self {
            attributes,
            quadric: Quadric::zero(),
            outgoing: None,
            degree: 0,
            removed: false,
        }
    }

    pub fn position(&self) -> &Point3f {
        &self.attributes.position
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

/// A half-edge in the mesh
///
/// The destination is not stored; it is the origin of `next`.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub(crate) origin: VertexId,
    /// The next half-edge around the face
    pub(crate) next: HalfEdgeId,
    /// The opposite half-edge (None for boundary edges)
    pub(crate) twin: Option<HalfEdgeId>,
    pub(crate) face: FaceId,
    /// Cached collapse cost, shared by both halves of an edge
    pub(crate) cost: f64,
    pub(crate) removed: bool,
}

impl HalfEdge {
    pub fn origin(&self) -> VertexId {
        self.origin
    }

    pub fn next(&self) -> HalfEdgeId {
        self.next
    }

    pub fn twin(&self) -> Option<HalfEdgeId> {
        self.twin
    }

    pub fn face(&self) -> FaceId {
        self.face
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

/// A triangular face
#[derive(Debug, Clone)]
pub struct Face {
    /// One half-edge on the boundary of this face
    pub(crate) half_edge: HalfEdgeId,
    pub(crate) removed: bool,
}

impl Face {
    pub fn half_edge(&self) -> HalfEdgeId {
        self.half_edge
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

/// Half-edge mesh owning all vertex, half-edge and face storage.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    pub(crate) vertices: Vec<MeshVertex>,
    pub(crate) half_edges: Vec<HalfEdge>,
    pub(crate) faces: Vec<Face>,
    /// Live half-edge per directed (origin, destination) pair
    pub(crate) edge_map: HashMap<(VertexId, VertexId), HalfEdgeId>,
    pub(crate) live_vertices: usize,
    pub(crate) live_faces: usize,
}

impl HalfEdgeMesh {
    /// Build connectivity from an indexed triangle list, rejecting conflicting windings.
    pub fn build(vertices: Vec<Vertex>, indices: &[u32]) -> Result<Self> {
        Self::build_with(vertices, indices, WindingRepair::Strict)
    }

    /// Build connectivity from an indexed triangle list.
    ///
    /// Triangles are inserted in the order given; each `(a, b, c)` becomes the
    /// half-edge cycle `a->b`, `b->c`, `c->a`. Once all faces exist, every
    /// `u->v` is paired with `v->u` when present. Vertices no triangle refers
    /// to are marked removed.
    pub fn build_with(
        vertices: Vec<Vertex>,
        indices: &[u32],
        winding: WindingRepair,
    ) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(StructuralError::IndexCount(indices.len()).into());
        }

        let vertex_count = vertices.len();
        let face_count = indices.len() / 3;
        let mut mesh = HalfEdgeMesh {
            vertices: vertices.into_iter().map(MeshVertex::new).collect(),
            half_edges: Vec::with_capacity(face_count * 3),
            faces: Vec::with_capacity(face_count),
            edge_map: HashMap::with_capacity(face_count * 3),
            live_vertices: 0,
            live_faces: 0,
        };

        let mut flipped = 0usize;
        for (face, (&a, &b, &c)) in indices.iter().tuples().enumerate() {
            if let Some(&index) = [a, b, c].iter().find(|&&i| i as usize >= vertex_count) {
                return Err(StructuralError::IndexOutOfRange { index, vertex_count }.into());
            }
            if a == b || b == c || c == a {
                return Err(StructuralError::DegenerateFace { face }.into());
            }

            let triangle = match (mesh.first_conflict([a, b, c]), winding) {
                (None, _) => [a, b, c],
                (Some((from, to)), WindingRepair::Strict) => {
                    return Err(StructuralError::NonManifoldEdge { from, to }.into());
                }
                (Some(_), WindingRepair::FlipConflicting) => {
                    if let Some((from, to)) = mesh.first_conflict([b, a, c]) {
                        return Err(StructuralError::NonManifoldEdge { from, to }.into());
                    }
                    flipped += 1;
                    [b, a, c]
                }
            };
            mesh.insert_face(triangle);
        }

        mesh.pair_twins();

        let mut isolated = 0usize;
        for vertex in mesh.vertices.iter_mut().filter(|v| v.degree == 0) {
            vertex.removed = true;
            isolated += 1;
        }
        mesh.live_vertices = vertex_count - isolated;
        mesh.live_faces = face_count;

        tracing::debug!(
            vertices = vertex_count,
            faces = face_count,
            flipped,
            isolated,
            "built half-edge mesh"
        );
        Ok(mesh)
    }

    fn first_conflict(&self, [a, b, c]: [u32; 3]) -> Option<(u32, u32)> {
        [(a, b), (b, c), (c, a)]
            .into_iter()
            .find(|&(from, to)| self.edge_map.contains_key(&(VertexId(from), VertexId(to))))
    }

    fn insert_face(&mut self, triangle: [u32; 3]) {
        let face = FaceId(self.faces.len() as u32);
        let base = self.half_edges.len() as u32;

        for j in 0..3 {
            let id = HalfEdgeId(base + j as u32);
            let origin = VertexId(triangle[j]);
            let dest = VertexId(triangle[(j + 1) % 3]);
            self.half_edges.push(HalfEdge {
                origin,
                next: HalfEdgeId(base + ((j + 1) % 3) as u32),
                twin: None,
                face,
                cost: 0.0,
                removed: false,
            });
            self.edge_map.insert((origin, dest), id);

            let vertex = &mut self.vertices[origin.index()];
            vertex.degree += 1;
            if vertex.outgoing.is_none() {
                vertex.outgoing = Some(id);
            }
        }

        self.faces.push(Face {
            half_edge: HalfEdgeId(base),
            removed: false,
        });
    }

    fn pair_twins(&mut self) {
        for index in 0..self.half_edges.len() {
            let id = HalfEdgeId(index as u32);
            if self.half_edges[index].twin.is_some() {
                continue;
            }
            let origin = self.half_edges[index].origin;
            let dest = self.dest_unchecked(id);
            if let Some(&twin) = self.edge_map.get(&(dest, origin)) {
                self.half_edges[index].twin = Some(twin);
                self.half_edges[twin.index()].twin = Some(id);
            }
        }
    }

    // ========================================================================
    // Unchecked internals; callers guarantee the handle is live.
    // ========================================================================

    #[inline]
    pub(crate) fn he(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.half_edges[id.index()]
    }

    #[inline]
    pub(crate) fn he_mut(&mut self, id: HalfEdgeId) -> &mut HalfEdge {
        &mut self.half_edges[id.index()]
    }

    #[inline]
    pub(crate) fn dest_unchecked(&self, id: HalfEdgeId) -> VertexId {
        self.he(self.he(id).next).origin
    }

    #[inline]
    pub(crate) fn prev_unchecked(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.he(self.he(id).next).next
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Live vertex by handle
    pub fn vertex(&self, id: VertexId) -> Result<&MeshVertex> {
        match self.vertices.get(id.index()) {
            Some(v) if !v.removed => Ok(v),
            _ => Err(Error::StaleHandle(format!("{id:?}"))),
        }
    }

    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> Result<&mut MeshVertex> {
        match self.vertices.get_mut(id.index()) {
            Some(v) if !v.removed => Ok(v),
            _ => Err(Error::StaleHandle(format!("{id:?}"))),
        }
    }

    /// Live half-edge by handle
    pub fn half_edge(&self, id: HalfEdgeId) -> Result<&HalfEdge> {
        match self.half_edges.get(id.index()) {
            Some(he) if !he.removed => Ok(he),
            _ => Err(Error::StaleHandle(format!("{id:?}"))),
        }
    }

    /// Live face by handle
    pub fn face(&self, id: FaceId) -> Result<&Face> {
        match self.faces.get(id.index()) {
            Some(f) if !f.removed => Ok(f),
            _ => Err(Error::StaleHandle(format!("{id:?}"))),
        }
    }

    /// Number of vertex slots, live or removed
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn live_vertex_count(&self) -> usize {
        self.live_vertices
    }

    pub fn live_face_count(&self) -> usize {
        self.live_faces
    }

    /// Live vertex handles in index order
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.removed)
            .map(|(i, _)| VertexId(i as u32))
    }

    /// Live face handles in index order
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.removed)
            .map(|(i, _)| FaceId(i as u32))
    }

    /// Live half-edge handles in index order
    pub fn half_edge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.half_edges
            .iter()
            .enumerate()
            .filter(|(_, he)| !he.removed)
            .map(|(i, _)| HalfEdgeId(i as u32))
    }

    /// One half-edge per live undirected edge: its canonical representative.
    pub fn edges(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.half_edge_ids().filter(|&id| self.canonical_edge(id) == id)
    }

    /// The half-edge standing in for the undirected edge `id` belongs to:
    /// the lower handle of the pair, or `id` itself on a boundary.
    pub fn canonical_edge(&self, id: HalfEdgeId) -> HalfEdgeId {
        match self.he(id).twin {
            Some(twin) if twin < id => twin,
            _ => id,
        }
    }

    // ========================================================================
    // Topology Queries
    // ========================================================================

    pub fn destination(&self, id: HalfEdgeId) -> Result<VertexId> {
        self.half_edge(id)?;
        Ok(self.dest_unchecked(id))
    }

    pub fn prev(&self, id: HalfEdgeId) -> Result<HalfEdgeId> {
        self.half_edge(id)?;
        Ok(self.prev_unchecked(id))
    }

    /// Origin and destination of a half-edge
    pub fn endpoints(&self, id: HalfEdgeId) -> Result<(VertexId, VertexId)> {
        let he = self.half_edge(id)?;
        Ok((he.origin, self.dest_unchecked(id)))
    }

    pub fn face_half_edges(&self, id: FaceId) -> Result<[HalfEdgeId; 3]> {
        let first = self.face(id)?.half_edge;
        let second = self.he(first).next;
        Ok([first, second, self.he(second).next])
    }

    pub fn face_vertices(&self, id: FaceId) -> Result<[VertexId; 3]> {
        let [a, b, c] = self.face_half_edges(id)?;
        Ok([self.he(a).origin, self.he(b).origin, self.he(c).origin])
    }

    pub fn face_positions(&self, id: FaceId) -> Result<[Point3f; 3]> {
        let [a, b, c] = self.face_vertices(id)?;
        Ok([
            self.vertices[a.index()].attributes.position,
            self.vertices[b.index()].attributes.position,
            self.vertices[c.index()].attributes.position,
        ])
    }

    /// Live half-edge from `from` to `to`, if any
    pub fn find_half_edge(&self, from: VertexId, to: VertexId) -> Option<HalfEdgeId> {
        self.edge_map.get(&(from, to)).copied()
    }

    pub fn is_boundary_edge(&self, id: HalfEdgeId) -> Result<bool> {
        Ok(self.half_edge(id)?.twin.is_none())
    }

    pub fn is_boundary_vertex(&self, id: VertexId) -> Result<bool> {
        Ok(self.neighbors_of_vertex(id)?.is_boundary())
    }

    /// Outgoing half-edges of `v`, walked lazily via `twin.next`.
    ///
    /// Each call starts a fresh walk. On a boundary vertex the walk starts at
    /// the outgoing half-edge right after the boundary so the whole fan is
    /// visited before the opposite boundary ends it.
    pub fn neighbors_of_vertex(&self, v: VertexId) -> Result<VertexFan<'_>> {
        let vertex = self.vertex(v)?;
        let Some(outgoing) = vertex.outgoing else {
            return Ok(VertexFan::empty(self));
        };

        // Rewind against the walking direction until a boundary or a full turn.
        let limit = self.half_edges.len();
        let mut start = outgoing;
        let mut boundary = false;
        for _ in 0..limit {
            match self.he(self.prev_unchecked(start)).twin {
                None => {
                    boundary = true;
                    break;
                }
                Some(twin) if twin == outgoing => break,
                Some(twin) => start = twin,
            }
        }

        Ok(VertexFan {
            mesh: self,
            start: Some(start),
            current: Some(start),
            boundary,
            remaining: limit,
        })
    }

    /// Vertices sharing an edge with `v`
    pub fn vertex_ring(&self, v: VertexId) -> Result<Vec<VertexId>> {
        let fan = self.neighbors_of_vertex(v)?;
        let boundary_in = fan.boundary.then_some(fan.start).flatten();
        let mut ring: Vec<VertexId> = fan.map(|e| self.dest_unchecked(e)).collect();
        if let Some(first) = boundary_in {
            ring.push(self.he(self.prev_unchecked(first)).origin);
        }
        Ok(ring)
    }

    /// Canonical half-edge of every live undirected edge incident to `v`
    pub fn incident_edges(&self, v: VertexId) -> Result<Vec<HalfEdgeId>> {
        let fan = self.neighbors_of_vertex(v)?;
        let boundary_in = fan.boundary.then_some(fan.start).flatten();
        let mut edges: Vec<HalfEdgeId> = fan.map(|e| self.canonical_edge(e)).collect();
        if let Some(first) = boundary_in {
            edges.push(self.prev_unchecked(first));
        }
        Ok(edges)
    }

    pub(crate) fn set_edge_cost(&mut self, id: HalfEdgeId, cost: f64) {
        self.he_mut(id).cost = cost;
        if let Some(twin) = self.he(id).twin {
            self.he_mut(twin).cost = cost;
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check every structural invariant of the live mesh.
    ///
    /// Validates that:
    /// 1. live faces own three live half-edges forming a 3-cycle
    /// 2. twins are symmetric, live, and reversed
    /// 3. no directed edge occurs twice and the edge map matches the live set
    /// 4. vertex degrees, outgoing pointers and live counts are consistent
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut face_count = 0usize;
        for face_id in self.face_ids() {
            face_count += 1;
            let start = self.faces[face_id.index()].half_edge;
            let mut current = start;
            for _ in 0..3 {
                let he = self
                    .half_edges
                    .get(current.index())
                    .ok_or_else(|| format!("Face {face_id:?}: missing half-edge {current:?}"))?;
                if he.removed || he.face != face_id {
                    return Err(format!(
                        "Face {face_id:?}: half-edge {current:?} is removed or belongs to {:?}",
                        he.face
                    ));
                }
                current = he.next;
            }
            if current != start {
                return Err(format!("Face {face_id:?}: next cycle is not a triangle"));
            }
        }
        if face_count != self.live_faces {
            return Err(format!(
                "Live face count {} differs from {face_count} live faces",
                self.live_faces
            ));
        }

        let mut directed = HashSet::new();
        let mut degrees = vec![0u32; self.vertices.len()];
        for id in self.half_edge_ids() {
            let he = self.he(id);
            if self.faces[he.face.index()].removed {
                return Err(format!("Half-edge {id:?}: live on removed face {:?}", he.face));
            }
            let next = self.he(he.next);
            if next.removed || self.he(next.next).next != id {
                return Err(format!("Half-edge {id:?}: next.next.next is not itself"));
            }
            if self.vertices[he.origin.index()].removed {
                return Err(format!("Half-edge {id:?}: origin {:?} is removed", he.origin));
            }
            let dest = next.origin;
            if !directed.insert((he.origin, dest)) {
                return Err(format!("Duplicate directed edge {:?} -> {dest:?}", he.origin));
            }
            if self.edge_map.get(&(he.origin, dest)) != Some(&id) {
                return Err(format!("Half-edge {id:?}: edge map entry is missing or stale"));
            }
            if let Some(twin) = he.twin {
                let t = self.he(twin);
                if t.removed || t.twin != Some(id) {
                    return Err(format!("Half-edge {id:?}: twin {twin:?} is not paired back"));
                }
                if t.origin != dest {
                    return Err(format!("Half-edge {id:?}: twin {twin:?} is not reversed"));
                }
            }
            degrees[he.origin.index()] += 1;
        }
        if self.edge_map.len() != directed.len() {
            return Err(format!(
                "Edge map holds {} entries for {} live half-edges",
                self.edge_map.len(),
                directed.len()
            ));
        }

        let mut vertex_count = 0usize;
        for (index, vertex) in self.vertices.iter().enumerate() {
            if vertex.removed {
                continue;
            }
            vertex_count += 1;
            if vertex.degree != degrees[index] || vertex.degree == 0 {
                return Err(format!(
                    "Vertex {index}: degree {} but {} live outgoing half-edges",
                    vertex.degree, degrees[index]
                ));
            }
            match vertex.outgoing {
                Some(out) if !self.he(out).removed && self.he(out).origin.index() == index => {}
                other => {
                    return Err(format!("Vertex {index}: invalid outgoing half-edge {other:?}"));
                }
            }
        }
        if vertex_count != self.live_vertices {
            return Err(format!(
                "Live vertex count {} differs from {vertex_count} live vertices",
                self.live_vertices
            ));
        }

        Ok(())
    }
}

/// Lazy walk over the outgoing half-edges of one vertex.
#[derive(Debug, Clone)]
pub struct VertexFan<'a> {
    mesh: &'a HalfEdgeMesh,
    start: Option<HalfEdgeId>,
    current: Option<HalfEdgeId>,
    boundary: bool,
    remaining: usize,
}

impl<'a> VertexFan<'a> {
    fn empty(mesh: &'a HalfEdgeMesh) -> Self {
        Self {
            mesh,
            start: None,
            current: None,
            boundary: false,
            remaining: 0,
        }
    }

    /// Whether the walk ends at a boundary instead of closing a full turn
    pub fn is_boundary(&self) -> bool {
        self.boundary
    }
}

impl Iterator for VertexFan<'_> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<HalfEdgeId> {
        let current = self.current?;
        if self.remaining == 0 {
            self.current = None;
            return None;
        }
        self.remaining -= 1;

        self.current = self
            .mesh
            .he(current)
            .twin
            .map(|twin| self.mesh.he(twin).next)
            .filter(|&next| Some(next) != self.start);
        Some(current)
    }
}
