//! `delete`: remove elements with one of the deletion contexts.

use topology::{ElemKind, ElemRef, Mesh, Propagation};
use tracing::trace;

use super::OP_DELETE;
use crate::error::OpError;
use crate::operator::Operator;
use crate::registry::{MeshOperator, OpDefinition};
use crate::slot::{SlotDef, SlotType};

pub const GEOM: usize = 0;
pub const CONTEXT: usize = 1;

pub const SLOTS: &[SlotDef] = &[
    SlotDef::input("geom", SlotType::PtrBuffer),
    SlotDef::input("context", SlotType::Int),
];

/// What a delete removes, stored as an integer in the `context` slot.
///
/// Each context reads only elements of its target kind from `geom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DeleteContext {
    /// Vertices and every edge and face using them
    Verts = 1,
    /// Edges, their faces, and endpoints left without edges
    Edges = 2,
    /// Faces only; edges and vertices stay
    OnlyFaces = 3,
    /// Edges and their faces; vertices stay
    EdgesFaces = 4,
    /// Faces and their edges left without faces; vertices stay
    Faces = 5,
    /// As `Faces`, plus vertices left without edges
    FacesPrune = 6,
    /// The whole mesh, `geom` is ignored
    All = 7,
}

impl DeleteContext {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            1 => Self::Verts,
            2 => Self::Edges,
            3 => Self::OnlyFaces,
            4 => Self::EdgesFaces,
            5 => Self::Faces,
            6 => Self::FacesPrune,
            7 => Self::All,
            _ => return None,
        })
    }

    /// Element kind read from `geom`
    pub fn target(self) -> Option<ElemKind> {
        match self {
            Self::Verts => Some(ElemKind::Vert),
            Self::Edges | Self::EdgesFaces => Some(ElemKind::Edge),
            Self::OnlyFaces | Self::Faces | Self::FacesPrune => Some(ElemKind::Face),
            Self::All => None,
        }
    }

    pub fn propagation(self) -> Propagation {
        match self {
            Self::OnlyFaces => Propagation::IsolatedOnly,
            Self::Edges | Self::FacesPrune => Propagation::CascadePrune,
            Self::Verts | Self::EdgesFaces | Self::Faces | Self::All => Propagation::Cascade,
        }
    }
}

pub struct DeleteOp;

impl MeshOperator for DeleteOp {
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        let raw = op.get_int(CONTEXT)?;
        let context = DeleteContext::from_raw(raw)
            .ok_or_else(|| OpError::invalid("context", format!("unknown deletion context {raw}")))?;

        let Some(target) = context.target() else {
            delete_all(mesh)?;
            return Ok(());
        };

        // Every reference is checked before the first deletion
        let elems = op.buffer_kind(mesh, GEOM, target)?;
        let propagation = context.propagation();
        for elem in elems {
            // Earlier cascades may have taken it already
            if !mesh.contains(elem) {
                continue;
            }
            trace!("delete: {:?} ({:?})", elem, context);
            delete_elem(mesh, elem, propagation)?;
        }
        Ok(())
    }
}

fn delete_elem(mesh: &mut Mesh, elem: ElemRef, propagation: Propagation) -> Result<(), OpError> {
    if let Some(v) = elem.as_vert() {
        mesh.delete_vertex(v, propagation)?;
    } else if let Some(e) = elem.as_edge() {
        mesh.delete_edge(e, propagation)?;
    } else if let Some(f) = elem.as_face() {
        mesh.delete_face(f, propagation)?;
    }
    Ok(())
}

fn delete_all(mesh: &mut Mesh) -> Result<(), OpError> {
    let verts: Vec<_> = mesh.vert_ids().collect();
    for v in verts {
        mesh.delete_vertex(v, Propagation::Cascade)?;
    }
    Ok(())
}

pub fn definition() -> OpDefinition {
    OpDefinition::new(OP_DELETE, "delete", SLOTS, DeleteOp)
}
