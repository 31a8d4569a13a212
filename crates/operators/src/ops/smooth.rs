//! `smooth_verts`: one Laplacian smoothing pass.
//!
//! Each vertex moves towards the average of its edge neighbours by `factor`.
//! New positions are computed from the old ones before any vertex moves.

use glam::Vec3;
use topology::{ElemKind, ElemRef, Mesh, VertId};
use tracing::trace;

use super::OP_SMOOTH_VERTS;
use crate::error::OpError;
use crate::operator::Operator;
use crate::registry::{MeshOperator, OpDefinition};
use crate::slot::{SlotDef, SlotType};

pub const VERTS: usize = 0;
pub const FACTOR: usize = 1;

pub const SLOTS: &[SlotDef] = &[
    SlotDef::input("verts", SlotType::PtrBuffer),
    SlotDef::input("factor", SlotType::Float),
];

pub struct SmoothVertsOp;

impl MeshOperator for SmoothVertsOp {
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        let factor = op.get_float(FACTOR)?;
        if !factor.is_finite() {
            return Err(OpError::invalid("factor", format!("non-finite factor {factor}")));
        }
        let verts: Vec<VertId> = op
            .buffer_kind(mesh, VERTS, ElemKind::Vert)?
            .into_iter()
            .filter_map(ElemRef::as_vert)
            .collect();

        let targets: Vec<(VertId, Vec3)> = verts
            .iter()
            .filter_map(|&v| {
                let (sum, count) = mesh
                    .vert_neighbors(v)
                    .fold((Vec3::ZERO, 0usize), |(sum, n), u| (sum + mesh.vert(u).co, n + 1));
                (count > 0).then(|| {
                    let co = mesh.vert(v).co;
                    (v, co.lerp(sum / count as f32, factor))
                })
            })
            .collect();

        trace!("smooth_verts: {} of {} verts moved", targets.len(), verts.len());
        for (v, co) in targets {
            mesh.set_vertex_position(v, co);
        }
        Ok(())
    }
}

pub fn definition() -> OpDefinition {
    OpDefinition::new(OP_SMOOTH_VERTS, "smooth_verts", SLOTS, SmoothVertsOp)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::Registry;

    fn smooth(mesh: &mut Mesh, verts: Vec<ElemRef>, factor: f32) {
        let mut op = Operator::new();
        op.init_with(mesh, Arc::new(Registry::with_builtins()), OP_SMOOTH_VERTS);
        op.set_ptr_buffer(VERTS, verts).unwrap();
        op.set_float(FACTOR, factor).unwrap();
        op.exec(mesh).unwrap();
        op.finish(mesh);
    }

    #[test]
    fn test_spike_is_pulled_down() {
        // Pyramid apex over a square
        let positions = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
        ];
        let polys = [vec![0, 1, 4], vec![1, 2, 4], vec![2, 3, 4], vec![3, 0, 4]];
        let mut mesh = Mesh::from_polygons(&positions, &polys).unwrap();

        smooth(&mut mesh, vec![VertId(4).into()], 0.5);
        assert!((mesh.vert(VertId(4)).co - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
        assert_eq!(mesh.vert(VertId(0)).co, Vec3::new(-1.0, -1.0, 0.0));
    }

    #[test]
    fn test_positions_use_old_values() {
        let mut mesh = Mesh::new();
        let a = mesh.create_vertex(Vec3::ZERO);
        let b = mesh.create_vertex(Vec3::new(2.0, 0.0, 0.0));
        mesh.create_edge(a, b).unwrap();

        smooth(&mut mesh, vec![a.into(), b.into()], 1.0);
        assert_eq!(mesh.vert(a).co, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(mesh.vert(b).co, Vec3::ZERO);
    }

    #[test]
    fn test_loose_vertex_stays() {
        let mut mesh = Mesh::new();
        let v = mesh.create_vertex(Vec3::ONE);
        smooth(&mut mesh, vec![v.into()], 1.0);
        assert_eq!(mesh.vert(v).co, Vec3::ONE);
    }
}
