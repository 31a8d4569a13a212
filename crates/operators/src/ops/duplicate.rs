//! `duplicate`: copy a set of elements, including the edges and vertices
//! the selected faces and edges need.

use std::collections::HashMap;

use topology::{EdgeId, ElemRef, ElemType, Mesh, VertId};
use tracing::trace;

use super::OP_DUPLICATE;
use crate::error::OpError;
use crate::operator::Operator;
use crate::registry::{MeshOperator, OpDefinition};
use crate::slot::{SlotDef, SlotType};

pub const GEOM: usize = 0;
pub const NEWOUT: usize = 1;

pub const SLOTS: &[SlotDef] = &[
    SlotDef::input("geom", SlotType::PtrBuffer),
    SlotDef::output("newout", SlotType::PtrBuffer),
];

const DUPE: u32 = 1;

pub struct DuplicateOp;

impl MeshOperator for DuplicateOp {
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        let geom = op.buffer_elems(mesh, GEOM, ElemType::VERT | ElemType::EDGE | ElemType::FACE)?;

        // ===== PHASE 1: MARK =====
        for &elem in &geom {
            mesh.set_flag(elem, DUPE);
            if let Some(f) = elem.as_face() {
                let edges: Vec<EdgeId> = mesh.face_edges(f).collect();
                for e in edges {
                    mesh.set_flag(e, DUPE);
                }
            }
        }
        let marked_edges: Vec<EdgeId> = mesh
            .flagged(ElemType::EDGE, DUPE)
            .filter_map(ElemRef::as_edge)
            .collect();
        for &e in &marked_edges {
            let edge = mesh.edge(e);
            let (v1, v2) = (edge.v1, edge.v2);
            mesh.set_flag(v1, DUPE);
            mesh.set_flag(v2, DUPE);
        }

        // ===== PHASE 2: COPY =====
        let marked_verts: Vec<VertId> = mesh
            .flagged(ElemType::VERT, DUPE)
            .filter_map(ElemRef::as_vert)
            .collect();
        let marked_faces: Vec<_> = mesh
            .flagged(ElemType::FACE, DUPE)
            .filter_map(ElemRef::as_face)
            .collect();
        let mut out: Vec<ElemRef> =
            Vec::with_capacity(marked_verts.len() + marked_edges.len() + marked_faces.len());

        let mut vmap: HashMap<VertId, VertId> = HashMap::with_capacity(marked_verts.len());
        for v in marked_verts {
            let copy = mesh.create_vertex(mesh.vert(v).co);
            vmap.insert(v, copy);
            out.push(copy.into());
        }

        let mut emap: HashMap<EdgeId, EdgeId> = HashMap::with_capacity(marked_edges.len());
        for e in marked_edges {
            let edge = mesh.edge(e);
            let (v1, v2) = (vmap[&edge.v1], vmap[&edge.v2]);
            let copy = mesh.create_edge(v1, v2)?;
            emap.insert(e, copy);
            out.push(copy.into());
        }

        for f in marked_faces {
            let verts: Vec<VertId> = mesh.face_verts(f).map(|v| vmap[&v]).collect();
            let edges: Vec<EdgeId> = mesh.face_edges(f).map(|e| emap[&e]).collect();
            let copy = mesh.create_face(&verts, &edges)?;
            out.push(copy.into());
        }

        trace!("duplicate: {} elements -> {} new", geom.len(), out.len());
        op.write_buffer(NEWOUT, &out)
    }
}

pub fn definition() -> OpDefinition {
    OpDefinition::new(OP_DUPLICATE, "duplicate", SLOTS, DuplicateOp)
}
