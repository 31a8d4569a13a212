//! `split`: detach a set of faces from the rest of the mesh.
//!
//! Runs `duplicate` on the input, then `delete` with
//! [`DeleteContext::FacesPrune`] on the original faces, both as nested
//! operators. Edges and vertices still used by unselected faces survive, so
//! the copy ends up disconnected along the selection border.

use topology::Mesh;

use super::{delete, duplicate, DeleteContext, OP_DELETE, OP_DUPLICATE, OP_SPLIT};
use crate::error::OpError;
use crate::operator::{copy_slot, Operator};
use crate::registry::{MeshOperator, OpDefinition};
use crate::slot::{SlotDef, SlotType};

pub const GEOM: usize = 0;
pub const GEOMOUT: usize = 1;

pub const SLOTS: &[SlotDef] = &[
    SlotDef::input("geom", SlotType::PtrBuffer),
    SlotDef::output("geomout", SlotType::PtrBuffer),
];

pub struct SplitOp;

impl MeshOperator for SplitOp {
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        let mut dup = Operator::new();
        dup.init_nested(op, mesh, OP_DUPLICATE);
        copy_slot(op, &mut dup, GEOM, duplicate::GEOM)?;
        let result = dup
            .exec(mesh)
            .and_then(|()| copy_slot(&dup, op, duplicate::NEWOUT, GEOMOUT));
        dup.finish(mesh);
        result?;

        let mut del = Operator::new();
        del.init_nested(op, mesh, OP_DELETE);
        copy_slot(op, &mut del, GEOM, delete::GEOM)?;
        del.set_int(delete::CONTEXT, DeleteContext::FacesPrune as i32)?;
        let result = del.exec(mesh);
        del.finish(mesh);
        result
    }
}

pub fn definition() -> OpDefinition {
    OpDefinition::new(OP_SPLIT, "split", SLOTS, SplitOp)
}
