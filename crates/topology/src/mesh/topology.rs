//! Adjacency walks over the disk, radial and loop cycles.
//!
//! Every iterator here is lazy and borrows the mesh, so the borrow checker
//! rules out topology changes while a walk is in progress. Building the same
//! iterator again from the same element yields the same sequence.

use super::types::{DiskLink, EdgeId, FaceId, LoopId, VertId};
use super::Mesh;

/// Edges around a vertex (disk cycle)
#[derive(Debug, Clone)]
pub struct VertEdges<'a> {
    mesh: &'a Mesh,
    v: VertId,
    start: Option<EdgeId>,
    cur: Option<EdgeId>,
}

impl Iterator for VertEdges<'_> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<EdgeId> {
        let cur = self.cur?;
        let next = self.mesh.disk_next(cur, self.v);
        self.cur = (Some(next) != self.start).then_some(next);
        Some(cur)
    }
}

/// Loops around an edge (radial cycle)
#[derive(Debug, Clone)]
pub struct RadialLoops<'a> {
    mesh: &'a Mesh,
    start: Option<LoopId>,
    cur: Option<LoopId>,
}

impl Iterator for RadialLoops<'_> {
    type Item = LoopId;

    fn next(&mut self) -> Option<LoopId> {
        let cur = self.cur?;
        let next = self.mesh.loop_(cur).radial_next;
        self.cur = (Some(next) != self.start).then_some(next);
        Some(cur)
    }
}

/// Loops of a face in winding order
#[derive(Debug, Clone)]
pub struct FaceLoops<'a> {
    mesh: &'a Mesh,
    cur: LoopId,
    remaining: usize,
}

impl Iterator for FaceLoops<'_> {
    type Item = LoopId;

    fn next(&mut self) -> Option<LoopId> {
        if self.remaining == 0 {
            return None;
        }
        let cur = self.cur;
        self.cur = self.mesh.loop_(cur).next;
        self.remaining -= 1;
        Some(cur)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for FaceLoops<'_> {}

impl Mesh {
    // ========================================================================
    // Cycle links
    // ========================================================================

    pub(crate) fn disk_link(&self, e: EdgeId, v: VertId) -> DiskLink {
        let edge = self.edge(e);
        debug_assert!(edge.has_vert(v), "{e:?} is not in the disk of {v:?}");
        if edge.v1 == v {
            edge.v1_disk
        } else {
            edge.v2_disk
        }
    }

    pub(crate) fn disk_link_mut(&mut self, e: EdgeId, v: VertId) -> &mut DiskLink {
        let edge = self.edge_mut(e);
        debug_assert!(edge.has_vert(v), "{e:?} is not in the disk of {v:?}");
        if edge.v1 == v {
            &mut edge.v1_disk
        } else {
            &mut edge.v2_disk
        }
    }

    /// Next edge after `e` in the disk cycle of `v`
    pub fn disk_next(&self, e: EdgeId, v: VertId) -> EdgeId {
        self.disk_link(e, v).next
    }

    /// Previous edge before `e` in the disk cycle of `v`
    pub fn disk_prev(&self, e: EdgeId, v: VertId) -> EdgeId {
        self.disk_link(e, v).prev
    }

    // ========================================================================
    // Vertex walks
    // ========================================================================

    pub fn vert_edges(&self, v: VertId) -> VertEdges<'_> {
        let start = self.vert(v).e;
        VertEdges {
            mesh: self,
            v,
            start,
            cur: start,
        }
    }

    /// Loops whose corner vertex is `v`
    pub fn vert_loops(&self, v: VertId) -> impl Iterator<Item = LoopId> + '_ {
        self.vert_edges(v)
            .flat_map(move |e| self.edge_loops(e))
            .filter(move |&l| self.loop_(l).v == v)
    }

    pub fn vert_faces(&self, v: VertId) -> impl Iterator<Item = FaceId> + '_ {
        self.vert_loops(v).map(move |l| self.loop_(l).f)
    }

    /// Vertices sharing an edge with `v`
    pub fn vert_neighbors(&self, v: VertId) -> impl Iterator<Item = VertId> + '_ {
        self.vert_edges(v).filter_map(move |e| self.edge(e).other_vert(v))
    }

    /// Number of edges at `v`
    pub fn vert_degree(&self, v: VertId) -> usize {
        self.vert_edges(v).count()
    }

    // ========================================================================
    // Edge walks
    // ========================================================================

    pub fn edge_verts(&self, e: EdgeId) -> impl Iterator<Item = VertId> + use<> {
        let edge = self.edge(e);
        [edge.v1, edge.v2].into_iter()
    }

    pub fn edge_loops(&self, e: EdgeId) -> RadialLoops<'_> {
        let start = self.edge(e).l;
        RadialLoops {
            mesh: self,
            start,
            cur: start,
        }
    }

    pub fn edge_faces(&self, e: EdgeId) -> impl Iterator<Item = FaceId> + '_ {
        self.edge_loops(e).map(move |l| self.loop_(l).f)
    }

    /// Number of faces using `e`
    pub fn edge_face_count(&self, e: EdgeId) -> usize {
        self.edge_loops(e).count()
    }

    /// True for an edge with no faces
    pub fn is_wire_edge(&self, e: EdgeId) -> bool {
        self.edge(e).l.is_none()
    }

    /// True for an edge used by exactly one face
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        self.edge_face_count(e) == 1
    }

    // ========================================================================
    // Face and loop walks
    // ========================================================================

    pub fn face_loops(&self, f: FaceId) -> FaceLoops<'_> {
        let face = self.face(f);
        FaceLoops {
            mesh: self,
            cur: face.l_first,
            remaining: face.len,
        }
    }

    pub fn face_verts(&self, f: FaceId) -> impl ExactSizeIterator<Item = VertId> + '_ {
        self.face_loops(f).map(move |l| self.loop_(l).v)
    }

    pub fn face_edges(&self, f: FaceId) -> impl ExactSizeIterator<Item = EdgeId> + '_ {
        self.face_loops(f).map(move |l| self.loop_(l).e)
    }

    /// Loops sharing the edge of `l`, starting with `l` itself
    pub fn loop_radial(&self, l: LoopId) -> RadialLoops<'_> {
        RadialLoops {
            mesh: self,
            start: Some(l),
            cur: Some(l),
        }
    }
}
