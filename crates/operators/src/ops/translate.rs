//! `translate`: move vertices by a fixed offset.

use topology::{ElemKind, ElemRef, Mesh};

use super::OP_TRANSLATE;
use crate::error::OpError;
use crate::operator::Operator;
use crate::registry::{MeshOperator, OpDefinition};
use crate::slot::{SlotDef, SlotType};

pub const VERTS: usize = 0;
pub const VEC: usize = 1;

pub const SLOTS: &[SlotDef] = &[
    SlotDef::input("verts", SlotType::PtrBuffer),
    SlotDef::input("vec", SlotType::Vec3),
];

const MOVED: u32 = 1;

pub struct TranslateOp;

impl MeshOperator for TranslateOp {
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        let offset = op.get_vec3(VEC)?;
        if !offset.is_finite() {
            return Err(OpError::invalid("vec", format!("non-finite offset {offset}")));
        }

        for v in op
            .buffer_kind(mesh, VERTS, ElemKind::Vert)?
            .into_iter()
            .filter_map(ElemRef::as_vert)
        {
            if mesh.test_flag(v, MOVED) {
                continue;
            }
            mesh.set_flag(v, MOVED);
            let co = mesh.vert(v).co + offset;
            mesh.set_vertex_position(v, co);
        }
        Ok(())
    }
}

pub fn definition() -> OpDefinition {
    OpDefinition::new(OP_TRANSLATE, "translate", SLOTS, TranslateOp)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::Registry;
    use glam::Vec3;
    use topology::VertId;

    #[test]
    fn test_translate_moves_each_vertex_once() {
        let mut mesh = Mesh::new();
        let a = mesh.create_vertex(Vec3::ZERO);
        let b = mesh.create_vertex(Vec3::X);
        let c = mesh.create_vertex(Vec3::Y);

        let mut op = Operator::new();
        op.init_with(&mesh, Arc::new(Registry::with_builtins()), OP_TRANSLATE);
        let verts: Vec<ElemRef> = vec![a.into(), b.into(), a.into()];
        op.set_ptr_buffer(VERTS, verts).unwrap();
        op.set_vec3(VEC, Vec3::new(0.0, 0.0, 2.0)).unwrap();
        op.exec(&mut mesh).unwrap();
        op.finish(&mut mesh);

        assert_eq!(mesh.vert(a).co, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(mesh.vert(b).co, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(mesh.vert(c).co, Vec3::Y);
    }

    #[test]
    fn test_vec3_is_not_normalized() {
        let mut mesh = Mesh::new();
        mesh.create_vertex(Vec3::ZERO);
        let mut op = Operator::new();
        op.init_with(&mesh, Arc::new(Registry::with_builtins()), OP_TRANSLATE);
        op.set_vec3(VEC, Vec3::new(3.0, 4.0, 0.0)).unwrap();
        assert_eq!(op.get_vec3(VEC).unwrap(), Vec3::new(3.0, 4.0, 0.0));
        op.set_ptr_buffer(VERTS, vec![ElemRef::from(VertId(0))]).unwrap();
        op.exec(&mut mesh).unwrap();
        op.finish(&mut mesh);
        assert_eq!(mesh.vert(VertId(0)).co, Vec3::new(3.0, 4.0, 0.0));
    }
}
