//! `subdivide_edges`: cut edges into equal segments.

use topology::{ElemKind, ElemRef, Mesh};
use tracing::trace;

use super::OP_SUBDIVIDE_EDGES;
use crate::error::OpError;
use crate::operator::Operator;
use crate::registry::{MeshOperator, OpDefinition};
use crate::slot::{SlotDef, SlotType};

pub const EDGES: usize = 0;
pub const NUMCUTS: usize = 1;
pub const OUTVERTS: usize = 2;

pub const SLOTS: &[SlotDef] = &[
    SlotDef::input("edges", SlotType::PtrBuffer),
    SlotDef::input("numcuts", SlotType::Int),
    SlotDef::output("outverts", SlotType::PtrBuffer),
];

const SEEN: u32 = 1;

/// Upper bound on `numcuts`
pub const MAX_CUTS: i32 = 1 << 16;

pub struct SubdivideEdgesOp;

impl MeshOperator for SubdivideEdgesOp {
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        let cuts = op.get_int(NUMCUTS)?;
        if !(1..=MAX_CUTS).contains(&cuts) {
            return Err(OpError::invalid(
                "numcuts",
                format!("need between 1 and {MAX_CUTS} cuts, got {cuts}"),
            ));
        }
        let edges = op.buffer_kind(mesh, EDGES, ElemKind::Edge)?;

        let mut out: Vec<ElemRef> = Vec::new();
        for e in edges.into_iter().filter_map(ElemRef::as_edge) {
            if mesh.test_flag(e, SEEN) {
                continue;
            }
            mesh.set_flag(e, SEEN);

            // Each cut splits the remaining far segment
            let mut rest = e;
            for i in 0..cuts {
                let factor = 1.0 / ((cuts - i) as f32 + 1.0);
                let (v, next) = mesh.split_edge(rest, factor);
                mesh.set_flag(next, SEEN);
                out.push(v.into());
                rest = next;
            }
            trace!("subdivide_edges: {:?} cut {} times", e, cuts);
        }

        op.write_buffer(OUTVERTS, &out)
    }
}

pub fn definition() -> OpDefinition {
    OpDefinition::new(OP_SUBDIVIDE_EDGES, "subdivide_edges", SLOTS, SubdivideEdgesOp)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::Registry;
    use glam::Vec3;
    use topology::{EdgeId, FaceId, KernelConfig, VertId};

    fn triangle() -> Mesh {
        let mut mesh = Mesh::with_config(KernelConfig::default().with_validation(true));
        mesh.append_polygons(
            &[Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)],
            &[vec![0, 1, 2]],
        )
        .unwrap();
        mesh
    }

    fn subdivide(mesh: &mut Mesh, edges: Vec<ElemRef>, cuts: i32) -> Result<Vec<ElemRef>, OpError> {
        let mut op = Operator::new();
        op.init_with(mesh, Arc::new(Registry::with_builtins()), OP_SUBDIVIDE_EDGES);
        op.set_ptr_buffer(EDGES, edges)?;
        op.set_int(NUMCUTS, cuts)?;
        let result = op
            .exec(mesh)
            .and_then(|()| Ok(op.buffer::<ElemRef>(OUTVERTS)?.to_vec()));
        op.finish(mesh);
        result
    }

    #[test]
    fn test_two_cuts_evenly_spaced() {
        let mut mesh = triangle();
        let e = mesh.find_edge(VertId(0), VertId(1)).unwrap();
        let out = subdivide(&mut mesh, vec![e.into()], 2).unwrap();

        let xs: Vec<f32> = out
            .iter()
            .map(|v| mesh.vert(v.as_vert().unwrap()).co.x)
            .collect();
        assert!((xs[0] - 1.0).abs() < 1e-5);
        assert!((xs[1] - 2.0).abs() < 1e-5);
        assert_eq!(mesh.face(FaceId(0)).len(), 5);
        assert_eq!(mesh.edge_count(), 5);
    }

    #[test]
    fn test_duplicate_edges_cut_once() {
        let mut mesh = triangle();
        let e = mesh.find_edge(VertId(1), VertId(2)).unwrap();
        let out = subdivide(&mut mesh, vec![e.into(), e.into()], 1).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(mesh.face(FaceId(0)).len(), 4);
    }

    #[test]
    fn test_all_edges() {
        let mut mesh = triangle();
        let edges: Vec<ElemRef> = mesh.edge_ids().map(ElemRef::from).collect();
        let out = subdivide(&mut mesh, edges, 1).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(mesh.face(FaceId(0)).len(), 6);
        assert_eq!(mesh.vert_count(), 6);
    }

    #[test]
    fn test_zero_cuts_rejected() {
        let mut mesh = triangle();
        let err = subdivide(&mut mesh, vec![EdgeId(0).into()], 0).unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { slot: "numcuts", .. }));
        assert_eq!(mesh.vert_count(), 3);
    }

    #[test]
    fn test_huge_cut_count_rejected() {
        let mut mesh = triangle();
        let e = mesh.find_edge(VertId(0), VertId(1)).unwrap();
        for cuts in [MAX_CUTS + 1, i32::MAX] {
            let err = subdivide(&mut mesh, vec![e.into()], cuts).unwrap_err();
            assert!(matches!(err, OpError::InvalidArgument { slot: "numcuts", .. }));
        }
        assert_eq!(mesh.vert_count(), 3);
        assert_eq!(mesh.edge_count(), 3);
        assert_eq!(mesh.face(FaceId(0)).len(), 3);
    }
}
