//! Modification methods for the mesh store: deletion, edge splitting,
//! compaction and normals.

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, trace};

use super::construction::newell_normal;
use super::types::{
    EdgeId, ElemKind, ElemRef, FaceId, Loop, LoopId, MeshError, Propagation, VertId,
};
use super::Mesh;

/// Result of mesh compaction: old id to new id for every surviving element.
///
/// Ids of deleted elements have no entry. Any id held from before the
/// compaction must be translated through this map or dropped.
#[derive(Debug, Default)]
pub struct CompactionMap {
    pub vert_map: HashMap<VertId, VertId>,
    pub edge_map: HashMap<EdgeId, EdgeId>,
    pub loop_map: HashMap<LoopId, LoopId>,
    pub face_map: HashMap<FaceId, FaceId>,
}

impl CompactionMap {
    /// Translate an element reference, None if the element was deleted
    pub fn remap(&self, elem: ElemRef) -> Option<ElemRef> {
        match elem.kind()? {
            ElemKind::Vert => self.vert_map.get(&VertId(elem.index())).map(|&v| v.into()),
            ElemKind::Edge => self.edge_map.get(&EdgeId(elem.index())).map(|&e| e.into()),
            ElemKind::Loop => self.loop_map.get(&LoopId(elem.index())).map(|&l| l.into()),
            ElemKind::Face => self.face_map.get(&FaceId(elem.index())).map(|&f| f.into()),
        }
    }
}

impl Mesh {
    pub fn set_vertex_position(&mut self, v: VertId, co: Vec3) {
        self.vert_mut(v).co = co;
    }

    /// Remove all geometry. Flag marks are dropped, the flag depth is kept.
    pub fn clear(&mut self) {
        self.verts.clear();
        self.edges.clear();
        self.loops.clear();
        self.faces.clear();
        self.flags.reset();
        debug!("clear: mesh emptied");
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Delete a face.
    ///
    /// - `IsolatedOnly`: the face and its loops only
    /// - `Cascade`: also the face's edges that are left without faces
    /// - `CascadePrune`: also the face's vertices that are left without edges
    pub fn delete_face(&mut self, f: FaceId, propagation: Propagation) -> Result<(), MeshError> {
        let edges: Vec<EdgeId> = self.face_edges(f).collect();
        let verts: Vec<VertId> = self.face_verts(f).collect();

        self.kill_face(f);
        if propagation != Propagation::IsolatedOnly {
            for e in edges {
                if self.edge(e).l.is_none() {
                    self.kill_edge(e);
                }
            }
        }
        if propagation == Propagation::CascadePrune {
            self.prune_verts(&verts);
        }
        Ok(())
    }

    /// Delete an edge.
    ///
    /// - `IsolatedOnly`: fails with [`MeshError::NotIsolated`] if a face uses it
    /// - `Cascade`: also every face using it
    /// - `CascadePrune`: also its endpoints when they are left without edges
    pub fn delete_edge(&mut self, e: EdgeId, propagation: Propagation) -> Result<(), MeshError> {
        let edge = self.edge(e);
        let ends = [edge.v1, edge.v2];
        if propagation == Propagation::IsolatedOnly && edge.l.is_some() {
            return Err(MeshError::NotIsolated(e.into()));
        }

        let faces: Vec<FaceId> = self.edge_faces(e).collect();
        for f in faces {
            self.kill_face(f);
        }
        self.kill_edge(e);
        if propagation == Propagation::CascadePrune {
            self.prune_verts(&ends);
        }
        Ok(())
    }

    /// Delete a vertex.
    ///
    /// - `IsolatedOnly`: fails with [`MeshError::NotIsolated`] if an edge uses it
    /// - `Cascade`: also every edge and face using it
    /// - `CascadePrune`: also neighbouring vertices left without edges
    pub fn delete_vertex(&mut self, v: VertId, propagation: Propagation) -> Result<(), MeshError> {
        if propagation == Propagation::IsolatedOnly && self.vert(v).e.is_some() {
            return Err(MeshError::NotIsolated(v.into()));
        }

        let edges: Vec<EdgeId> = self.vert_edges(v).collect();
        let neighbors: Vec<VertId> = self.vert_neighbors(v).collect();
        for e in edges {
            let faces: Vec<FaceId> = self.edge_faces(e).collect();
            for f in faces {
                self.kill_face(f);
            }
            self.kill_edge(e);
        }
        self.kill_vert(v);
        if propagation == Propagation::CascadePrune {
            self.prune_verts(&neighbors);
        }
        Ok(())
    }

    fn prune_verts(&mut self, verts: &[VertId]) {
        for &v in verts {
            if self.try_vert(v).is_some_and(|vert| vert.e.is_none()) {
                self.kill_vert(v);
            }
        }
    }

    fn kill_face(&mut self, f: FaceId) {
        let loops: Vec<LoopId> = self.face_loops(f).collect();
        for l in loops {
            self.radial_remove(l);
            self.loops.remove(l.0);
            self.flags.forget(l.into());
        }
        self.faces.remove(f.0);
        self.flags.forget(f.into());
        trace!("kill_face: {:?}", f);
    }

    /// The edge must have no loops left
    fn kill_edge(&mut self, e: EdgeId) {
        debug_assert!(self.edge(e).l.is_none(), "{e:?} still has loops");
        let edge = self.edge(e);
        let (v1, v2) = (edge.v1, edge.v2);
        self.disk_remove(e, v1);
        self.disk_remove(e, v2);
        self.edges.remove(e.0);
        self.flags.forget(e.into());
        trace!("kill_edge: {:?}", e);
    }

    /// The vertex must have no edges left
    fn kill_vert(&mut self, v: VertId) {
        debug_assert!(self.vert(v).e.is_none(), "{v:?} still has edges");
        self.verts.remove(v.0);
        self.flags.forget(v.into());
        trace!("kill_vert: {:?}", v);
    }

    // ========================================================================
    // Edge split
    // ========================================================================

    /// Insert a new vertex on `e` at `factor` (0 at `v1`, 1 at `v2`).
    ///
    /// `e` keeps `v1` and now ends at the new vertex; the returned edge runs
    /// from the new vertex to the old `v2`. Every face using `e` gains a corner.
    pub fn split_edge(&mut self, e: EdgeId, factor: f32) -> (VertId, EdgeId) {
        let edge = self.edge(e);
        let (a, b) = (edge.v1, edge.v2);
        let co = self.vert(a).co.lerp(self.vert(b).co, factor);
        let loops: Vec<LoopId> = self.edge_loops(e).collect();

        // ===== PHASE 1: SPLIT THE EDGE =====
        let n = self.create_vertex(co);
        self.disk_remove(e, b);
        self.edge_mut(e).v2 = n;
        self.disk_append(e, n);
        let e2 = self.push_edge(n, b);

        // ===== PHASE 2: PATCH FACE CYCLES =====
        for l in loops {
            if self.loop_(l).v == a {
                // a -> b becomes a -(e)-> n -(e2)-> b
                self.insert_loop_after(l, n, e2);
            } else {
                // b -> a becomes b -(e2)-> n -(e)-> a
                self.radial_remove(l);
                self.radial_append(l, e2);
                self.insert_loop_after(l, n, e);
            }
        }

        trace!("split_edge: {:?} at {} -> {:?}, {:?}", e, factor, n, e2);
        (n, e2)
    }

    fn insert_loop_after(&mut self, l: LoopId, v: VertId, e: EdgeId) -> LoopId {
        let (f, next) = {
            let lp = self.loop_(l);
            (lp.f, lp.next)
        };
        let id = LoopId(self.loops.next_index());
        self.loops.push(Loop {
            v,
            e,
            f,
            next,
            prev: l,
            radial_next: id,
            radial_prev: id,
        });
        self.loop_mut(next).prev = id;
        self.loop_mut(l).next = id;
        self.radial_append(id, e);
        self.face_mut(f).len += 1;
        id
    }

    // ========================================================================
    // Normals
    // ========================================================================

    /// Recompute face normals (Newell) and vertex normals (average of faces)
    pub fn recalc_normals(&mut self) {
        let face_normals: Vec<(FaceId, Vec3)> = self
            .face_ids()
            .map(|f| (f, newell_normal(self.face_verts(f).map(|v| self.vert(v).co))))
            .collect();
        for (f, no) in face_normals {
            self.face_mut(f).no = no;
        }

        let vert_normals: Vec<(VertId, Vec3)> = self
            .vert_ids()
            .map(|v| {
                let sum: Vec3 = self.vert_faces(v).map(|f| self.face(f).no).sum();
                (v, sum.normalize_or_zero())
            })
            .collect();
        for (v, no) in vert_normals {
            self.vert_mut(v).no = no;
        }
    }

    // ========================================================================
    // Compaction
    // ========================================================================

    /// Remove dead slots and renumber every element contiguously.
    ///
    /// All cross references and every flag layer are rewritten. Ids taken
    /// before the call are stale afterwards; translate them with the returned
    /// map.
    pub fn compact(&mut self) -> CompactionMap {
        debug!(
            "compact: START ({} / {} verts, {} / {} edges, {} / {} loops, {} / {} faces live)",
            self.verts.live(),
            self.verts.capacity(),
            self.edges.live(),
            self.edges.capacity(),
            self.loops.live(),
            self.loops.capacity(),
            self.faces.live(),
            self.faces.capacity()
        );

        // ===== PHASE 1: MOVE SURVIVORS =====
        let vmap = self.verts.compact();
        let emap = self.edges.compact();
        let lmap = self.loops.compact();
        let fmap = self.faces.compact();

        // ===== PHASE 2: REWRITE REFERENCES =====
        let vert = |v: VertId| VertId(moved(&vmap, v.0));
        let edge = |e: EdgeId| EdgeId(moved(&emap, e.0));
        let lp = |l: LoopId| LoopId(moved(&lmap, l.0));
        let face = |f: FaceId| FaceId(moved(&fmap, f.0));

        for v in self.verts.iter_mut() {
            v.e = v.e.map(edge);
        }
        for e in self.edges.iter_mut() {
            e.v1 = vert(e.v1);
            e.v2 = vert(e.v2);
            for link in [&mut e.v1_disk, &mut e.v2_disk] {
                link.prev = edge(link.prev);
                link.next = edge(link.next);
            }
            e.l = e.l.map(lp);
        }
        for l in self.loops.iter_mut() {
            l.v = vert(l.v);
            l.e = edge(l.e);
            l.f = face(l.f);
            l.next = lp(l.next);
            l.prev = lp(l.prev);
            l.radial_next = lp(l.radial_next);
            l.radial_prev = lp(l.radial_prev);
        }
        for f in self.faces.iter_mut() {
            f.l_first = lp(f.l_first);
        }

        // ===== PHASE 3: FLAGS =====
        self.flags.remap(ElemKind::Vert, &vmap, self.verts.capacity());
        self.flags.remap(ElemKind::Edge, &emap, self.edges.capacity());
        self.flags.remap(ElemKind::Loop, &lmap, self.loops.capacity());
        self.flags.remap(ElemKind::Face, &fmap, self.faces.capacity());

        debug!(
            "compact: END ({} verts, {} edges, {} loops, {} faces)",
            self.verts.live(),
            self.edges.live(),
            self.loops.live(),
            self.faces.live()
        );

        CompactionMap {
            vert_map: id_map(&vmap, VertId),
            edge_map: id_map(&emap, EdgeId),
            loop_map: id_map(&lmap, LoopId),
            face_map: id_map(&fmap, FaceId),
        }
    }
}

/// New index of a surviving element
fn moved(map: &[Option<u32>], old: u32) -> u32 {
    match map.get(old as usize) {
        Some(Some(new)) => *new,
        _ => panic!("compact: live element references dead slot {old}"),
    }
}

fn id_map<T: std::hash::Hash + Eq>(map: &[Option<u32>], id: fn(u32) -> T) -> HashMap<T, T> {
    map.iter()
        .enumerate()
        .filter_map(|(old, new)| new.map(|new| (id(old as u32), id(new))))
        .collect()
}
