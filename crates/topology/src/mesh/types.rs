//! Type definitions for the mesh topology store.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

macro_rules! elem_id {
    ($name:ident, $kind:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<$name> for ElemRef {
            fn from(id: $name) -> Self {
                ElemRef::new($kind, id.0)
            }
        }
    };
}

elem_id!(VertId, ElemKind::Vert);
elem_id!(EdgeId, ElemKind::Edge);
elem_id!(LoopId, ElemKind::Loop);
elem_id!(FaceId, ElemKind::Face);

/// The four element kinds of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ElemKind {
    Vert = 1,
    Edge = 2,
    Loop = 4,
    Face = 8,
}

impl ElemKind {
    pub const ALL: [ElemKind; 4] = [ElemKind::Vert, ElemKind::Edge, ElemKind::Loop, ElemKind::Face];

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Vert),
            2 => Some(Self::Edge),
            4 => Some(Self::Loop),
            8 => Some(Self::Face),
            _ => None,
        }
    }

    /// Single-kind type mask
    pub const fn mask(self) -> ElemType {
        ElemType(self as u32)
    }

    /// Dense index into per-kind tables
    pub(crate) const fn slot(self) -> usize {
        match self {
            Self::Vert => 0,
            Self::Edge => 1,
            Self::Loop => 2,
            Self::Face => 3,
        }
    }
}

/// Bitmask over element kinds, used as a type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElemType(pub u32);

impl ElemType {
    pub const NONE: ElemType = ElemType(0);
    pub const VERT: ElemType = ElemType(ElemKind::Vert as u32);
    pub const EDGE: ElemType = ElemType(ElemKind::Edge as u32);
    pub const LOOP: ElemType = ElemType(ElemKind::Loop as u32);
    pub const FACE: ElemType = ElemType(ElemKind::Face as u32);
    pub const ALL: ElemType = ElemType(1 | 2 | 4 | 8);

    pub const fn contains(self, kind: ElemKind) -> bool {
        self.0 & kind as u32 != 0
    }
}

impl std::ops::BitOr for ElemType {
    type Output = ElemType;

    fn bitor(self, rhs: Self) -> Self::Output {
        ElemType(self.0 | rhs.0)
    }
}

/// Kind-tagged element index.
///
/// Plain old data so it can live in arena-backed pointer buffers.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(C)]
pub struct ElemRef {
    kind: u32,
    index: u32,
}

impl ElemRef {
    pub const fn new(kind: ElemKind, index: u32) -> Self {
        Self {
            kind: kind as u32,
            index,
        }
    }

    /// Element kind. A zeroed (never assigned) reference has no kind.
    pub fn kind(self) -> Option<ElemKind> {
        ElemKind::from_raw(self.kind)
    }

    pub const fn index(self) -> u32 {
        self.index
    }

    pub fn as_vert(self) -> Option<VertId> {
        (self.kind == ElemKind::Vert as u32).then_some(VertId(self.index))
    }

    pub fn as_edge(self) -> Option<EdgeId> {
        (self.kind == ElemKind::Edge as u32).then_some(EdgeId(self.index))
    }

    pub fn as_loop(self) -> Option<LoopId> {
        (self.kind == ElemKind::Loop as u32).then_some(LoopId(self.index))
    }

    pub fn as_face(self) -> Option<FaceId> {
        (self.kind == ElemKind::Face as u32).then_some(FaceId(self.index))
    }
}

impl fmt::Debug for ElemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{:?}({})", kind, self.index),
            None => write!(f, "Null({})", self.index),
        }
    }
}

/// Links of an edge inside one of its vertices' disk cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskLink {
    pub prev: EdgeId,
    pub next: EdgeId,
}

/// A vertex in the mesh
#[derive(Debug, Clone)]
pub struct Vertex {
    pub co: Vec3,
    pub no: Vec3,
    /// Any edge of the disk cycle (None for a loose vertex)
    pub(crate) e: Option<EdgeId>,
}

/// An edge between two distinct vertices
#[derive(Debug, Clone)]
pub struct Edge {
    pub v1: VertId,
    pub v2: VertId,
    pub(crate) v1_disk: DiskLink,
    pub(crate) v2_disk: DiskLink,
    /// Any loop of the radial cycle (None for a wire edge)
    pub(crate) l: Option<LoopId>,
}

impl Edge {
    /// The endpoint opposite `v`
    pub fn other_vert(&self, v: VertId) -> Option<VertId> {
        if v == self.v1 {
            Some(self.v2)
        } else if v == self.v2 {
            Some(self.v1)
        } else {
            None
        }
    }

    pub fn has_vert(&self, v: VertId) -> bool {
        self.v1 == v || self.v2 == v
    }
}

/// A face corner: one vertex, the edge leaving it along the face, and the face
#[derive(Debug, Clone)]
pub struct Loop {
    pub v: VertId,
    pub e: EdgeId,
    pub f: FaceId,
    pub(crate) next: LoopId,
    pub(crate) prev: LoopId,
    pub(crate) radial_next: LoopId,
    pub(crate) radial_prev: LoopId,
}

impl Loop {
    pub fn next(&self) -> LoopId {
        self.next
    }

    pub fn prev(&self) -> LoopId {
        self.prev
    }

    pub fn radial_next(&self) -> LoopId {
        self.radial_next
    }
}

/// A polygon, stored as a cycle of loops
#[derive(Debug, Clone)]
pub struct Face {
    pub(crate) l_first: LoopId,
    pub(crate) len: usize,
    pub no: Vec3,
}

impl Face {
    pub fn first_loop(&self) -> LoopId {
        self.l_first
    }

    /// Number of corners
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// How far a deletion spreads to elements that depend on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Propagation {
    /// Delete the element only when nothing depends on it
    IsolatedOnly,
    /// Delete dependents (faces of an edge, edges and faces of a vertex);
    /// a deleted face also takes its edges that are left without faces
    Cascade,
    /// Cascade, then delete vertices left without edges
    CascadePrune,
}

/// How `create_face_from_verts` treats missing edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgePolicy {
    RequireExisting,
    CreateMissing,
}

/// Errors that can occur during mesh mutation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("degenerate topology: {0}")]
    DegenerateTopology(String),
    #[error("element {0:?} still has dependent elements")]
    NotIsolated(ElemRef),
    #[error("invalid mesh topology: {0}")]
    InvalidTopology(String),
}
