//! Vertex/edge/loop/face mesh store for operator-driven editing
//!
//! Adjacency follows the BMesh layout:
//! - every vertex points into a *disk cycle*, the circular list of its edges
//! - every edge points into a *radial cycle*, the circular list of loops
//!   (face corners) that use it
//! - every face points into its *loop cycle*, one loop per corner
//!
//! Elements live in append-only pools. Deleting an element leaves a dead slot
//! behind so indices stay valid until [`Mesh::compact`] renumbers everything.

mod construction;
mod modification;
mod pool;
mod topology;
mod types;
mod validation;

use kernel_config::KernelConfig;

pub use modification::CompactionMap;
pub use types::{
    DiskLink, Edge, EdgeId, EdgePolicy, ElemKind, ElemRef, ElemType, Face, FaceId, Loop, LoopId,
    MeshError, Propagation, VertId, Vertex,
};

use crate::flags::FlagTable;
use pool::Pool;

/// Mesh topology store
///
/// Owns every element and the flag table operators use to pass working sets
/// to each other.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub(crate) verts: Pool<Vertex>,
    pub(crate) edges: Pool<Edge>,
    pub(crate) loops: Pool<Loop>,
    pub(crate) faces: Pool<Face>,
    pub(crate) flags: FlagTable,
    config: KernelConfig,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Empty mesh with the default configuration
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            verts: Pool::default(),
            edges: Pool::default(),
            loops: Pool::default(),
            faces: Pool::default(),
            flags: FlagTable::new(config.max_flag_depth),
            config,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ========================================================================
    // Counts
    // ========================================================================

    pub fn vert_count(&self) -> usize {
        self.verts.live()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.live()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.live()
    }

    pub fn face_count(&self) -> usize {
        self.faces.live()
    }

    /// Live element count of every kind in `htype`
    pub fn count(&self, htype: ElemType) -> usize {
        ElemKind::ALL
            .iter()
            .filter(|kind| htype.contains(**kind))
            .map(|kind| match kind {
                ElemKind::Vert => self.vert_count(),
                ElemKind::Edge => self.edge_count(),
                ElemKind::Loop => self.loop_count(),
                ElemKind::Face => self.face_count(),
            })
            .sum()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get vertex by id, None if it was deleted or never existed
    pub fn try_vert(&self, id: VertId) -> Option<&Vertex> {
        self.verts.get(id.0)
    }

    pub fn try_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    pub fn try_loop(&self, id: LoopId) -> Option<&Loop> {
        self.loops.get(id.0)
    }

    pub fn try_face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id.0)
    }

    /// Get a live vertex.
    ///
    /// # Panics
    /// On a stale or dangling id.
    pub fn vert(&self, id: VertId) -> &Vertex {
        match self.verts.get(id.0) {
            Some(v) => v,
            None => stale(ElemRef::from(id)),
        }
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        match self.edges.get(id.0) {
            Some(e) => e,
            None => stale(ElemRef::from(id)),
        }
    }

    pub fn loop_(&self, id: LoopId) -> &Loop {
        match self.loops.get(id.0) {
            Some(l) => l,
            None => stale(ElemRef::from(id)),
        }
    }

    pub fn face(&self, id: FaceId) -> &Face {
        match self.faces.get(id.0) {
            Some(f) => f,
            None => stale(ElemRef::from(id)),
        }
    }

    pub(crate) fn vert_mut(&mut self, id: VertId) -> &mut Vertex {
        match self.verts.get_mut(id.0) {
            Some(v) => v,
            None => stale(ElemRef::from(id)),
        }
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        match self.edges.get_mut(id.0) {
            Some(e) => e,
            None => stale(ElemRef::from(id)),
        }
    }

    pub(crate) fn loop_mut(&mut self, id: LoopId) -> &mut Loop {
        match self.loops.get_mut(id.0) {
            Some(l) => l,
            None => stale(ElemRef::from(id)),
        }
    }

    pub(crate) fn face_mut(&mut self, id: FaceId) -> &mut Face {
        match self.faces.get_mut(id.0) {
            Some(f) => f,
            None => stale(ElemRef::from(id)),
        }
    }

    /// Whether a reference points at a live element
    pub fn contains(&self, elem: ElemRef) -> bool {
        match elem.kind() {
            Some(ElemKind::Vert) => self.verts.get(elem.index()).is_some(),
            Some(ElemKind::Edge) => self.edges.get(elem.index()).is_some(),
            Some(ElemKind::Loop) => self.loops.get(elem.index()).is_some(),
            Some(ElemKind::Face) => self.faces.get(elem.index()).is_some(),
            None => false,
        }
    }

    /// Ids of all live vertices, in index order
    pub fn vert_ids(&self) -> impl Iterator<Item = VertId> + '_ {
        self.verts.ids().map(VertId)
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.ids().map(EdgeId)
    }

    pub fn loop_ids(&self) -> impl Iterator<Item = LoopId> + '_ {
        self.loops.ids().map(LoopId)
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.ids().map(FaceId)
    }

    /// All live elements of the kinds in `htype`: vertices, edges, loops, then faces
    pub fn elements(&self, htype: ElemType) -> impl Iterator<Item = ElemRef> + '_ {
        let verts = htype
            .contains(ElemKind::Vert)
            .then(|| self.vert_ids().map(ElemRef::from));
        let edges = htype
            .contains(ElemKind::Edge)
            .then(|| self.edge_ids().map(ElemRef::from));
        let loops = htype
            .contains(ElemKind::Loop)
            .then(|| self.loop_ids().map(ElemRef::from));
        let faces = htype
            .contains(ElemKind::Face)
            .then(|| self.face_ids().map(ElemRef::from));
        verts
            .into_iter()
            .flatten()
            .chain(edges.into_iter().flatten())
            .chain(loops.into_iter().flatten())
            .chain(faces.into_iter().flatten())
    }

    // ========================================================================
    // Flags
    // ========================================================================

    pub fn flags(&self) -> &FlagTable {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FlagTable {
        &mut self.flags
    }

    /// Current operator nesting depth
    pub fn flag_depth(&self) -> usize {
        self.flags.depth()
    }

    /// Set `bit` on `elem` at the current depth
    pub fn set_flag(&mut self, elem: impl Into<ElemRef>, bit: u32) {
        let elem = elem.into();
        debug_assert!(self.contains(elem), "stale element reference {elem:?}");
        self.flags.set(elem, bit);
    }

    pub fn clear_flag(&mut self, elem: impl Into<ElemRef>, bit: u32) {
        self.flags.clear(elem.into(), bit);
    }

    pub fn test_flag(&self, elem: impl Into<ElemRef>, bit: u32) -> bool {
        self.flags.test(elem.into(), bit)
    }

    /// Live elements of the kinds in `htype` carrying `bit` at the current depth
    pub fn flagged(&self, htype: ElemType, bit: u32) -> impl Iterator<Item = ElemRef> + '_ {
        self.elements(htype)
            .filter(move |elem| self.flags.test(*elem, bit))
    }

    pub fn count_flagged(&self, htype: ElemType, bit: u32) -> usize {
        self.flagged(htype, bit).count()
    }

    /// Clear `bit` on every element of the kinds in `htype` at the current depth
    pub fn clear_flags(&mut self, htype: ElemType, bit: u32) {
        for kind in ElemKind::ALL {
            if htype.contains(kind) {
                self.flags.clear_kind(kind, bit);
            }
        }
    }
}

#[cold]
fn stale(elem: ElemRef) -> ! {
    panic!("stale element reference {elem:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn quad() -> (Mesh, Vec<VertId>, FaceId) {
        let mut mesh = Mesh::new();
        let verts: Vec<VertId> = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .map(|co| mesh.create_vertex(co))
        .collect();
        let face = mesh
            .create_face_from_verts(&verts, EdgePolicy::CreateMissing)
            .unwrap();
        (mesh, verts, face)
    }

    #[test]
    fn test_counts_by_type() {
        let (mesh, _, _) = quad();
        assert_eq!(mesh.count(ElemType::VERT), 4);
        assert_eq!(mesh.count(ElemType::EDGE | ElemType::FACE), 5);
        assert_eq!(mesh.count(ElemType::ALL), 4 + 4 + 4 + 1);
    }

    #[test]
    fn test_flag_round_trip_on_every_kind() {
        let (mut mesh, verts, face) = quad();
        let edge = mesh.find_edge(verts[0], verts[1]).unwrap();
        let l = mesh.face(face).first_loop();
        let elems = [
            ElemRef::from(verts[2]),
            ElemRef::from(edge),
            ElemRef::from(l),
            ElemRef::from(face),
        ];

        for elem in elems {
            for bit in [1u32, 1 << 5, 1 << 31] {
                mesh.set_flag(elem, bit);
                assert!(mesh.test_flag(elem, bit));
                mesh.clear_flag(elem, bit);
                assert!(!mesh.test_flag(elem, bit));
            }
        }
    }

    #[test]
    fn test_count_flagged_ignores_deleted() {
        let (mut mesh, verts, _) = quad();
        for v in &verts {
            mesh.set_flag(*v, 1);
        }
        assert_eq!(mesh.count_flagged(ElemType::VERT, 1), 4);

        mesh.delete_vertex(verts[0], Propagation::Cascade).unwrap();
        assert_eq!(mesh.count_flagged(ElemType::VERT, 1), 3);
    }

    #[test]
    fn test_depth_isolation_through_mesh() {
        let (mut mesh, verts, _) = quad();
        mesh.set_flag(verts[0], 4);

        mesh.flags_mut().push_layer();
        assert!(!mesh.test_flag(verts[0], 4));
        mesh.set_flag(verts[1], 4);
        assert_eq!(mesh.count_flagged(ElemType::VERT, 4), 1);
        mesh.flags_mut().pop_layer();

        assert!(mesh.test_flag(verts[0], 4));
        assert!(!mesh.test_flag(verts[1], 4));
    }

    #[test]
    fn test_clear_flags_by_type() {
        let (mut mesh, verts, face) = quad();
        mesh.set_flag(verts[0], 1);
        mesh.set_flag(face, 1);
        mesh.clear_flags(ElemType::VERT, 1);
        assert!(!mesh.test_flag(verts[0], 1));
        assert!(mesh.test_flag(face, 1));
    }

    #[test]
    #[should_panic(expected = "stale element reference")]
    fn test_dead_vertex_access_panics() {
        let (mut mesh, verts, _) = quad();
        mesh.delete_vertex(verts[0], Propagation::Cascade).unwrap();
        let _ = mesh.vert(verts[0]);
    }
}
