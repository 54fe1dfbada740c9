//! Half-edge collapse with topology checks
//!
//! Collapsing `h = u->v` moves `u` to the merge point, redirects every edge
//! of `v` onto `u`, removes the one or two faces adjacent to `h`, and stitches
//! the outer twins of each removed face together.

use crate::half_edge::{FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};
use qemesh_core::{Point3f, Result, Vector3f};
use std::collections::HashSet;

/// Why a candidate collapse was refused. The mesh is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Interior edge joining two boundary vertices; collapsing would pinch the surface.
    BoundaryPinch,
    /// Boundary edge of a face whose other edges are boundary too.
    IsolatedFace,
    /// Endpoints share neighbors other than the opposite apexes.
    LinkCondition,
    /// A redirected edge would duplicate an existing directed edge.
    DuplicateEdge,
    /// An apex would drop below the valence of a closed tetrahedron.
    MinimalComponent,
    /// An endpoint's fan does not cover all of its faces.
    NonManifoldVertex,
    /// A surviving face normal would reverse.
    FaceFlip,
    /// Edge touches the boundary and boundary preservation is on.
    PreservedBoundary,
}

/// What an accepted collapse did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseRecord {
    pub survivor: VertexId,
    pub removed_vertex: VertexId,
    pub removed_faces: Vec<FaceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollapseOutcome {
    Collapsed(CollapseRecord),
    Rejected(Rejection),
}

/// Local neighborhood of `h = u->v`.
///
/// Face A is `(h, h1, h2)` with apex `c`; face B, when `h` has a twin, is
/// `(t, t1, t2)` with apex `d`. `o1`/`o2` are the outer twins of `h1`/`h2`,
/// `p1`/`p2` those of `t1`/`t2`.
#[derive(Debug, Clone, Copy)]
struct CollapseSite {
    h: HalfEdgeId,
    u: VertexId,
    v: VertexId,
    c: VertexId,
    fa: FaceId,
    h1: HalfEdgeId,
    h2: HalfEdgeId,
    o1: Option<HalfEdgeId>,
    o2: Option<HalfEdgeId>,
    back: Option<BackFace>,
}

#[derive(Debug, Clone, Copy)]
struct BackFace {
    t: HalfEdgeId,
    d: VertexId,
    fb: FaceId,
    t1: HalfEdgeId,
    t2: HalfEdgeId,
    p1: Option<HalfEdgeId>,
    p2: Option<HalfEdgeId>,
}

impl CollapseSite {
    fn doomed(&self) -> Vec<HalfEdgeId> {
        let mut doomed = vec![self.h, self.h1, self.h2];
        if let Some(b) = self.back {
            doomed.extend([b.t, b.t1, b.t2]);
        }
        doomed
    }

    fn apexes(&self) -> Vec<VertexId> {
        let mut apexes = vec![self.c];
        apexes.extend(self.back.map(|b| b.d));
        apexes
    }

    fn removed_faces(&self) -> Vec<FaceId> {
        let mut faces = vec![self.fa];
        faces.extend(self.back.map(|b| b.fb));
        faces
    }
}

impl HalfEdgeMesh {
    fn collapse_site(&self, h: HalfEdgeId) -> Result<CollapseSite> {
        let he = self.half_edge(h)?;
        let u = he.origin;
        let h1 = he.next;
        let h2 = self.he(h1).next;
        let v = self.he(h1).origin;
        self.vertex(u)?;
        self.vertex(v)?;

        let back = he.twin.map(|t| {
            let t1 = self.he(t).next;
            let t2 = self.he(t1).next;
            BackFace {
                t,
                d: self.he(t2).origin,
                fb: self.he(t).face,
                t1,
                t2,
                p1: self.he(t1).twin,
                p2: self.he(t2).twin,
            }
        });

        Ok(CollapseSite {
            h,
            u,
            v,
            c: self.he(h2).origin,
            fa: he.face,
            h1,
            h2,
            o1: self.he(h1).twin,
            o2: self.he(h2).twin,
            back,
        })
    }

    /// Check whether collapsing `h` (origin survives) keeps the mesh a valid
    /// oriented 2-manifold. Returns the first violated condition, if any.
    pub fn check_collapse(&self, h: HalfEdgeId) -> Result<Option<Rejection>> {
        let site = self.collapse_site(h)?;
        let (u, v) = (site.u, site.v);

        let fan_u = self.neighbors_of_vertex(u)?;
        let u_boundary = fan_u.is_boundary();
        let v_fan = self.neighbors_of_vertex(v)?;
        let v_boundary = v_fan.is_boundary();
        let v_out: Vec<HalfEdgeId> = v_fan.collect();
        if fan_u.count() != self.fan_size(u) || v_out.len() != self.fan_size(v) {
            return Ok(Some(Rejection::NonManifoldVertex));
        }

        match site.back {
            Some(_) if u_boundary && v_boundary => return Ok(Some(Rejection::BoundaryPinch)),
            None if self.he(site.h1).twin.is_none() && self.he(site.h2).twin.is_none() => {
                return Ok(Some(Rejection::IsolatedFace));
            }
            _ => {}
        }

        for apex in site.apexes() {
            let fan = self.neighbors_of_vertex(apex)?;
            let boundary = fan.is_boundary();
            let ring = fan.count() + usize::from(boundary);
            if ring <= if boundary { 2 } else { 3 } {
                return Ok(Some(Rejection::MinimalComponent));
            }
        }

        let ring_u: HashSet<VertexId> = self.vertex_ring(u)?.into_iter().collect();
        let common: HashSet<VertexId> = self
            .vertex_ring(v)?
            .into_iter()
            .filter(|w| ring_u.contains(w))
            .collect();
        if common != site.apexes().into_iter().collect::<HashSet<_>>() {
            return Ok(Some(Rejection::LinkCondition));
        }

        let doomed = site.doomed();
        let survives = |key: (VertexId, VertexId)| {
            self.find_half_edge(key.0, key.1)
                .is_some_and(|e| !doomed.contains(&e))
        };
        for &e in v_out.iter().filter(|e| !doomed.contains(e)) {
            let x = self.dest_unchecked(e);
            let y = self.he(self.prev_unchecked(e)).origin;
            if survives((u, x)) || survives((y, u)) {
                return Ok(Some(Rejection::DuplicateEdge));
            }
        }

        Ok(None)
    }

    fn fan_size(&self, v: VertexId) -> usize {
        self.vertices[v.index()].degree as usize
    }

    /// Whether moving both endpoints of `h` to `position` reverses the normal
    /// of any face that survives the collapse.
    pub fn would_flip(&self, h: HalfEdgeId, position: &Point3f) -> Result<bool> {
        let site = self.collapse_site(h)?;
        let removed = site.removed_faces();

        for vertex in [site.u, site.v] {
            for e in self.neighbors_of_vertex(vertex)? {
                if removed.contains(&self.he(e).face) {
                    continue;
                }
                let origin = self.vertices[vertex.index()].attributes.position;
                let dest = self.vertices[self.dest_unchecked(e).index()].attributes.position;
                let apex = self.vertices[self.he(self.prev_unchecked(e)).origin.index()]
                    .attributes
                    .position;

                let before: Vector3f = (dest - origin).cross(&(apex - origin));
                let after: Vector3f = (dest - position).cross(&(apex - position));
                let degenerate = |n: &Vector3f| n.norm_squared() <= f32::EPSILON * f32::EPSILON;
                if degenerate(&before) || degenerate(&after) {
                    continue;
                }
                if before.dot(&after) < 0.0 {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Collapse `h = u->v`, keeping `u` at `merged`.
    ///
    /// Fails with [`qemesh_core::Error::StaleHandle`] if `h` or an endpoint is
    /// removed. Topology violations come back as
    /// [`CollapseOutcome::Rejected`] with the mesh unchanged.
    pub fn collapse(&mut self, h: HalfEdgeId, merged: Point3f) -> Result<CollapseOutcome> {
        if let Some(rejection) = self.check_collapse(h)? {
            return Ok(CollapseOutcome::Rejected(rejection));
        }
        let site = self.collapse_site(h)?;
        Ok(CollapseOutcome::Collapsed(self.apply_collapse(site, merged)?))
    }

    fn apply_collapse(&mut self, site: CollapseSite, merged: Point3f) -> Result<CollapseRecord> {
        let CollapseSite { u, v, c, .. } = site;
        let doomed = site.doomed();
        let v_out: Vec<HalfEdgeId> = self
            .neighbors_of_vertex(v)?
            .filter(|e| !doomed.contains(e))
            .collect();

        self.remove_face(site.fa);
        self.link_twins(site.o1, site.o2);
        if let Some(b) = site.back {
            self.remove_face(b.fb);
            self.link_twins(b.p1, b.p2);
        }

        for &e in &v_out {
            let x = self.dest_unchecked(e);
            let p = self.prev_unchecked(e);
            let y = self.he(p).origin;

            self.edge_map.remove(&(v, x));
            self.he_mut(e).origin = u;
            self.edge_map.insert((u, x), e);

            self.edge_map.remove(&(y, v));
            self.edge_map.insert((y, u), p);
        }

        let (degree, quadric) = {
            let gone = &mut self.vertices[v.index()];
            gone.removed = true;
            gone.outgoing = None;
            (std::mem::take(&mut gone.degree), gone.quadric)
        };
        let survivor = &mut self.vertices[u.index()];
        survivor.degree += degree;
        survivor.quadric += quadric;
        survivor.attributes.position = merged;
        self.live_vertices -= 1;

        // Every vertex that lost an outgoing half-edge needs a live one again.
        let mut candidates: Vec<HalfEdgeId> = [site.o1, site.o2]
            .into_iter()
            .chain(site.back.into_iter().flat_map(|b| [b.p1, b.p2]))
            .flatten()
            .flat_map(|e| [e, self.he(e).next])
            .collect();
        candidates.extend(&v_out);
        let mut touched = vec![u, c];
        touched.extend(site.back.map(|b| b.d));
        for w in touched {
            let current = self.vertices[w.index()].outgoing;
            if current.is_some_and(|e| !self.he(e).removed && self.he(e).origin == w) {
                continue;
            }
            let replacement = candidates
                .iter()
                .copied()
                .find(|&e| !self.he(e).removed && self.he(e).origin == w);
            self.vertices[w.index()].outgoing = replacement;
        }

        tracing::trace!(survivor = u.0, removed = v.0, "collapsed edge");
        Ok(CollapseRecord {
            survivor: u,
            removed_vertex: v,
            removed_faces: site.removed_faces(),
        })
    }

    fn remove_face(&mut self, face: FaceId) {
        let [a, b, c] = {
            let first = self.faces[face.index()].half_edge;
            let second = self.he(first).next;
            [first, second, self.he(second).next]
        };
        for e in [a, b, c] {
            let origin = self.he(e).origin;
            let dest = self.dest_unchecked(e);
            self.edge_map.remove(&(origin, dest));
            self.vertices[origin.index()].degree -= 1;
        }
        for e in [a, b, c] {
            self.he_mut(e).removed = true;
        }
        self.faces[face.index()].removed = true;
        self.live_faces -= 1;
    }

    fn link_twins(&mut self, a: Option<HalfEdgeId>, b: Option<HalfEdgeId>) {
        if let Some(a) = a {
            self.he_mut(a).twin = b;
        }
        if let Some(b) = b {
            self.he_mut(b).twin = a;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qemesh_core::{primitives, Error, IndexedMesh};

    fn build(mesh: IndexedMesh) -> HalfEdgeMesh {
        HalfEdgeMesh::build(mesh.vertices, &mesh.indices).unwrap()
    }

    fn midpoint(mesh: &HalfEdgeMesh, h: HalfEdgeId) -> Point3f {
        let (u, v) = mesh.endpoints(h).unwrap();
        let a = mesh.vertex(u).unwrap().position();
        let b = mesh.vertex(v).unwrap().position();
        nalgebra::center(a, b)
    }

    #[test]
    fn test_interior_collapse_removes_two_faces() {
        let mut mesh = build(primitives::grid(5));
        // Center vertex 12 towards its right neighbor 13.
        let h = mesh.find_half_edge(VertexId(12), VertexId(13)).unwrap();
        let faces_before = mesh.live_face_count();
        let merged = midpoint(&mesh, h);

        let outcome = mesh.collapse(h, merged).unwrap();
        let CollapseOutcome::Collapsed(record) = outcome else {
            panic!("expected collapse, got {outcome:?}");
        };
        assert_eq!(record.survivor, VertexId(12));
        assert_eq!(record.removed_vertex, VertexId(13));
        assert_eq!(record.removed_faces.len(), 2);
        assert_eq!(mesh.live_face_count(), faces_before - 2);
        assert_eq!(mesh.live_vertex_count(), 24);
        assert_eq!(*mesh.vertex(VertexId(12)).unwrap().position(), merged);
        assert!(mesh.vertex(VertexId(13)).is_err());
        mesh.validate().unwrap();

        // 13's old neighbors now hang off 12.
        assert!(mesh.find_half_edge(VertexId(12), VertexId(14)).is_some());
        assert!(mesh.find_half_edge(VertexId(14), VertexId(12)).is_some());
    }

    #[test]
    fn test_boundary_collapse_removes_one_face() {
        let mut mesh = build(primitives::grid(4));
        // Bottom border edge 1->2 (border runs the other way: 2->1 has no twin).
        let h = mesh.find_half_edge(VertexId(2), VertexId(1)).unwrap();
        assert!(mesh.is_boundary_edge(h).unwrap());
        let merged = midpoint(&mesh, h);

        let outcome = mesh.collapse(h, merged).unwrap();
        assert!(matches!(
            outcome,
            CollapseOutcome::Collapsed(CollapseRecord { ref removed_faces, .. })
                if removed_faces.len() == 1
        ));
        mesh.validate().unwrap();
        assert!(mesh.is_boundary_vertex(VertexId(2)).unwrap());
    }

    #[test]
    fn test_tetrahedron_cannot_shrink() {
        let mut mesh = build(primitives::tetrahedron());
        let edges: Vec<_> = mesh.edges().collect();
        for h in edges {
            assert_eq!(
                mesh.check_collapse(h).unwrap(),
                Some(Rejection::MinimalComponent)
            );
            let merged = midpoint(&mesh, h);
            assert_eq!(
                mesh.collapse(h, merged).unwrap(),
                CollapseOutcome::Rejected(Rejection::MinimalComponent)
            );
        }
        assert_eq!(mesh.live_vertex_count(), 4);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_interior_edge_between_border_vertices_is_pinch() {
        // In a 3x3 grid, 1-3 is the diagonal of the corner quad.
        let mesh = build(primitives::grid(3));
        let h = mesh.find_half_edge(VertexId(1), VertexId(3)).unwrap();
        assert!(!mesh.is_boundary_edge(h).unwrap());
        assert_eq!(mesh.check_collapse(h).unwrap(), Some(Rejection::BoundaryPinch));
    }

    #[test]
    fn test_lonely_triangle_is_rejected() {
        let mut mesh = build(IndexedMesh::from_positions_and_triangles(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        ));
        for h in mesh.edges().collect::<Vec<_>>() {
            let merged = midpoint(&mesh, h);
            assert_eq!(
                mesh.collapse(h, merged).unwrap(),
                CollapseOutcome::Rejected(Rejection::IsolatedFace)
            );
        }
    }

    #[test]
    fn test_collapsing_removed_edge_is_stale() {
        let mut mesh = build(primitives::grid(5));
        let h = mesh.find_half_edge(VertexId(12), VertexId(13)).unwrap();
        let merged = midpoint(&mesh, h);
        mesh.collapse(h, merged).unwrap();
        let (vertices, faces) = (mesh.live_vertex_count(), mesh.live_face_count());

        assert!(matches!(
            mesh.collapse(h, merged),
            Err(Error::StaleHandle(_))
        ));
        // A refused collapse leaves the mesh untouched.
        assert_eq!(mesh.live_vertex_count(), vertices);
        assert_eq!(mesh.live_face_count(), faces);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_sequential_collapses_keep_invariants() {
        let mut mesh = build(primitives::uv_sphere(6, 8));
        let mut collapsed = 0;
        for _ in 0..200 {
            let Some(h) = mesh.edges().find(|&h| mesh.check_collapse(h).unwrap().is_none()) else {
                break;
            };
            let faces = mesh.live_face_count();
            let merged = midpoint(&mesh, h);
            assert!(matches!(
                mesh.collapse(h, merged).unwrap(),
                CollapseOutcome::Collapsed(_)
            ));
            assert_eq!(mesh.live_face_count(), faces - 2);
            mesh.validate().unwrap();
            collapsed += 1;
        }
        assert!(collapsed > 20);
        // Closed genus-0 surface: F = 2V - 4.
        assert_eq!(mesh.live_face_count(), 2 * mesh.live_vertex_count() - 4);
    }

    #[test]
    fn test_flip_detection() {
        let mesh = build(primitives::grid(5));
        let h = mesh.find_half_edge(VertexId(12), VertexId(13)).unwrap();
        assert!(!mesh.would_flip(h, &Point3f::new(2.5, 2.0, 0.0)).unwrap());
        // Dragging the pair far to the left folds the faces on that side.
        assert!(mesh.would_flip(h, &Point3f::new(-3.0, 2.0, 0.0)).unwrap());
    }
}
