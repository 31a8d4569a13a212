//! Element creation, bulk import and triangle export.

use glam::Vec3;
use tracing::{debug, trace};

use super::types::{
    DiskLink, Edge, EdgeId, EdgePolicy, Face, FaceId, Loop, LoopId, MeshError, VertId, Vertex,
};
use super::Mesh;

impl Mesh {
    pub fn create_vertex(&mut self, co: Vec3) -> VertId {
        let id = VertId(self.verts.push(Vertex {
            co,
            no: Vec3::ZERO,
            e: None,
        }));
        trace!("create_vertex: {:?} at {}", id, co);
        id
    }

    /// Edge between `v1` and `v2`, created if the two are not connected yet.
    ///
    /// Fails with [`MeshError::DegenerateTopology`] when `v1 == v2`.
    pub fn create_edge(&mut self, v1: VertId, v2: VertId) -> Result<EdgeId, MeshError> {
        if v1 == v2 {
            return Err(MeshError::DegenerateTopology(format!(
                "edge endpoints are the same vertex {v1:?}"
            )));
        }
        // Both lookups panic on a stale id before anything is touched
        let _ = (self.vert(v1), self.vert(v2));

        if let Some(existing) = self.find_edge(v1, v2) {
            return Ok(existing);
        }

        let id = self.push_edge(v1, v2);
        trace!("create_edge: {:?} = ({:?}, {:?})", id, v1, v2);
        Ok(id)
    }

    /// New edge linked into both disk cycles, without any checks
    pub(crate) fn push_edge(&mut self, v1: VertId, v2: VertId) -> EdgeId {
        let id = EdgeId(self.edges.next_index());
        let self_link = DiskLink { prev: id, next: id };
        self.edges.push(Edge {
            v1,
            v2,
            v1_disk: self_link,
            v2_disk: self_link,
            l: None,
        });
        self.disk_append(id, v1);
        self.disk_append(id, v2);
        id
    }

    /// Edge connecting `a` and `b` in either direction
    pub fn find_edge(&self, a: VertId, b: VertId) -> Option<EdgeId> {
        self.vert_edges(a).find(|&e| self.edge(e).has_vert(b))
    }

    /// Create a face from its corner vertices and the edges between them.
    ///
    /// `edges[i]` must connect `verts[i]` and `verts[(i + 1) % n]`. Nothing is
    /// created when the input is rejected.
    pub fn create_face(&mut self, verts: &[VertId], edges: &[EdgeId]) -> Result<FaceId, MeshError> {
        check_polygon(verts)?;
        if edges.len() != verts.len() {
            return Err(MeshError::DegenerateTopology(format!(
                "face has {} vertices but {} edges",
                verts.len(),
                edges.len()
            )));
        }
        let n = verts.len();
        for i in 0..n {
            let (a, b) = (verts[i], verts[(i + 1) % n]);
            let edge = self.edge(edges[i]);
            if !(edge.has_vert(a) && edge.has_vert(b)) {
                return Err(MeshError::DegenerateTopology(format!(
                    "{:?} does not connect {:?} and {:?}",
                    edges[i], a, b
                )));
            }
        }

        Ok(self.create_face_unchecked(verts, edges))
    }

    /// Create a face from its corner vertices, looking up the edges between them.
    ///
    /// With [`EdgePolicy::RequireExisting`] a missing edge is an error; with
    /// [`EdgePolicy::CreateMissing`] the missing edges are created first.
    pub fn create_face_from_verts(
        &mut self,
        verts: &[VertId],
        policy: EdgePolicy,
    ) -> Result<FaceId, MeshError> {
        check_polygon(verts)?;
        for v in verts {
            let _ = self.vert(*v);
        }
        let n = verts.len();

        // ===== PHASE 1: RESOLVE EDGES =====
        let found: Vec<Option<EdgeId>> = (0..n)
            .map(|i| self.find_edge(verts[i], verts[(i + 1) % n]))
            .collect();
        if policy == EdgePolicy::RequireExisting {
            if let Some(i) = found.iter().position(Option::is_none) {
                return Err(MeshError::DegenerateTopology(format!(
                    "no edge between {:?} and {:?}",
                    verts[i],
                    verts[(i + 1) % n]
                )));
            }
        }

        // ===== PHASE 2: CREATE =====
        let mut edges = Vec::with_capacity(n);
        for (i, edge) in found.into_iter().enumerate() {
            let edge = match edge {
                Some(e) => e,
                None => self.create_edge(verts[i], verts[(i + 1) % n])?,
            };
            edges.push(edge);
        }
        Ok(self.create_face_unchecked(verts, &edges))
    }

    fn create_face_unchecked(&mut self, verts: &[VertId], edges: &[EdgeId]) -> FaceId {
        let n = verts.len();
        let f = FaceId(self.faces.next_index());
        let first = self.loops.next_index();
        let loop_id = |i: usize| LoopId(first + (i % n) as u32);

        for i in 0..n {
            let id = LoopId(self.loops.push(Loop {
                v: verts[i],
                e: edges[i],
                f,
                next: loop_id(i + 1),
                prev: loop_id(i + n - 1),
                radial_next: loop_id(i),
                radial_prev: loop_id(i),
            }));
            self.radial_append(id, edges[i]);
        }

        let no = newell_normal(verts.iter().map(|v| self.vert(*v).co));
        self.faces.push(Face {
            l_first: loop_id(0),
            len: n,
            no,
        });
        trace!("create_face: {:?} with {} corners", f, n);
        f
    }

    // ========================================================================
    // Cycle maintenance
    // ========================================================================

    /// Insert `e` into the disk cycle of `v`, before the current first edge
    pub(crate) fn disk_append(&mut self, e: EdgeId, v: VertId) {
        match self.vert(v).e {
            None => {
                *self.disk_link_mut(e, v) = DiskLink { prev: e, next: e };
                self.vert_mut(v).e = Some(e);
            }
            Some(first) => {
                let last = self.disk_prev(first, v);
                *self.disk_link_mut(e, v) = DiskLink {
                    prev: last,
                    next: first,
                };
                self.disk_link_mut(last, v).next = e;
                self.disk_link_mut(first, v).prev = e;
            }
        }
    }

    /// Unlink `e` from the disk cycle of `v`
    pub(crate) fn disk_remove(&mut self, e: EdgeId, v: VertId) {
        let DiskLink { prev, next } = self.disk_link(e, v);
        if next == e {
            self.vert_mut(v).e = None;
        } else {
            self.disk_link_mut(prev, v).next = next;
            self.disk_link_mut(next, v).prev = prev;
            if self.vert(v).e == Some(e) {
                self.vert_mut(v).e = Some(next);
            }
        }
        *self.disk_link_mut(e, v) = DiskLink { prev: e, next: e };
    }

    /// Insert loop `l` into the radial cycle of `e` and point the loop at `e`
    pub(crate) fn radial_append(&mut self, l: LoopId, e: EdgeId) {
        self.loop_mut(l).e = e;
        match self.edge(e).l {
            None => {
                let lp = self.loop_mut(l);
                lp.radial_next = l;
                lp.radial_prev = l;
                self.edge_mut(e).l = Some(l);
            }
            Some(first) => {
                let last = self.loop_(first).radial_prev;
                let lp = self.loop_mut(l);
                lp.radial_next = first;
                lp.radial_prev = last;
                self.loop_mut(last).radial_next = l;
                self.loop_mut(first).radial_prev = l;
            }
        }
    }

    /// Unlink loop `l` from the radial cycle of its edge
    pub(crate) fn radial_remove(&mut self, l: LoopId) {
        let lp = self.loop_(l);
        let (e, prev, next) = (lp.e, lp.radial_prev, lp.radial_next);
        if next == l {
            self.edge_mut(e).l = None;
        } else {
            self.loop_mut(prev).radial_next = next;
            self.loop_mut(next).radial_prev = prev;
            if self.edge(e).l == Some(l) {
                self.edge_mut(e).l = Some(next);
            }
        }
        let lp = self.loop_mut(l);
        lp.radial_next = l;
        lp.radial_prev = l;
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    /// Build a mesh from a vertex list and polygons indexing into it.
    ///
    /// Shared edges are created once. The whole import is rejected, leaving
    /// nothing behind, when any polygon is invalid.
    pub fn from_polygons(positions: &[Vec3], polygons: &[Vec<u32>]) -> Result<Self, MeshError> {
        let mut mesh = Mesh::new();
        mesh.append_polygons(positions, polygons)?;
        Ok(mesh)
    }

    /// Append vertices and polygons to this mesh. Returns the new vertex ids.
    ///
    /// Every polygon is validated before the first element is created.
    pub fn append_polygons(
        &mut self,
        positions: &[Vec3],
        polygons: &[Vec<u32>],
    ) -> Result<Vec<VertId>, MeshError> {
        for (pi, poly) in polygons.iter().enumerate() {
            if let Some(bad) = poly.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(MeshError::InvalidTopology(format!(
                    "polygon {pi} references vertex {bad} of {}",
                    positions.len()
                )));
            }
            let ids: Vec<VertId> = poly.iter().map(|&i| VertId(i)).collect();
            check_polygon(&ids)
                .map_err(|err| MeshError::InvalidTopology(format!("polygon {pi}: {err}")))?;
        }

        let verts: Vec<VertId> = positions.iter().map(|co| self.create_vertex(*co)).collect();
        for poly in polygons {
            let corners: Vec<VertId> = poly.iter().map(|&i| verts[i as usize]).collect();
            self.create_face_from_verts(&corners, EdgePolicy::CreateMissing)?;
        }

        debug!(
            "append_polygons: {} verts, {} faces -> {} edges total",
            positions.len(),
            polygons.len(),
            self.edge_count()
        );
        Ok(verts)
    }

    /// Fan-triangulated positions and indices of every live face.
    ///
    /// Indices refer to the returned position list, which holds the live
    /// vertices in id order.
    pub fn to_triangles(&self) -> (Vec<[f32; 3]>, Vec<u32>) {
        let mut remap = vec![u32::MAX; self.verts.capacity()];
        let mut positions = Vec::with_capacity(self.vert_count());
        for v in self.vert_ids() {
            remap[v.index()] = positions.len() as u32;
            positions.push(self.vert(v).co.to_array());
        }

        let mut indices = Vec::new();
        for f in self.face_ids() {
            let corners: Vec<u32> = self.face_verts(f).map(|v| remap[v.index()]).collect();
            for i in 1..corners.len() - 1 {
                indices.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
            }
        }
        (positions, indices)
    }
}

/// At least 3 corners and no repeated vertex
fn check_polygon(verts: &[VertId]) -> Result<(), MeshError> {
    if verts.len() < 3 {
        return Err(MeshError::DegenerateTopology(format!(
            "face needs at least 3 vertices, got {}",
            verts.len()
        )));
    }
    for (i, v) in verts.iter().enumerate() {
        if verts[i + 1..].contains(v) {
            return Err(MeshError::DegenerateTopology(format!(
                "vertex {v:?} appears twice in face"
            )));
        }
    }
    Ok(())
}

/// Newell's method; robust for non-planar and concave polygons
pub(crate) fn newell_normal(points: impl Iterator<Item = Vec3>) -> Vec3 {
    let points: Vec<Vec3> = points.collect();
    let mut n = Vec3::ZERO;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n.normalize_or_zero()
}
