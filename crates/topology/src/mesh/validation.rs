//! Full topology validation.
//!
//! Checks the store invariants:
//! - every edge joins two distinct live vertices
//! - the disk cycle of a vertex holds exactly the edges that use it
//! - the radial cycle of an edge holds exactly the loops that use it
//! - every face has a closed loop cycle of `len >= 3` corners, each loop's
//!   edge joining its vertex to the next loop's vertex

use std::collections::HashMap;

use super::types::{EdgeId, FaceId, Loop, LoopId, MeshError, VertId};
use super::Mesh;

fn invalid(msg: String) -> MeshError {
    MeshError::InvalidTopology(msg)
}

impl Mesh {
    /// Validate the whole store. Never panics, even on a corrupted mesh.
    pub fn validate(&self) -> Result<(), MeshError> {
        self.validate_edges()?;
        self.validate_disks()?;
        self.validate_radials()?;
        self.validate_faces()?;
        Ok(())
    }

    fn validate_edges(&self) -> Result<(), MeshError> {
        for e in self.edge_ids() {
            let edge = self.edge(e);
            if edge.v1 == edge.v2 {
                return Err(invalid(format!("{e:?} is degenerate ({:?} twice)", edge.v1)));
            }
            for (v, link) in [(edge.v1, edge.v1_disk), (edge.v2, edge.v2_disk)] {
                if self.try_vert(v).is_none() {
                    return Err(invalid(format!("{e:?} references dead {v:?}")));
                }
                for neighbor in [link.prev, link.next] {
                    let ok = self.try_edge(neighbor).is_some_and(|n| n.has_vert(v));
                    if !ok {
                        return Err(invalid(format!(
                            "{e:?} disk link at {v:?} points to {neighbor:?} outside the disk"
                        )));
                    }
                }
                if self.disk_link(link.next, v).prev != e || self.disk_link(link.prev, v).next != e {
                    return Err(invalid(format!("{e:?} disk links at {v:?} are not symmetric")));
                }
            }
        }
        Ok(())
    }

    fn validate_disks(&self) -> Result<(), MeshError> {
        let mut uses: HashMap<VertId, usize> = HashMap::new();
        for e in self.edge_ids() {
            let edge = self.edge(e);
            *uses.entry(edge.v1).or_default() += 1;
            *uses.entry(edge.v2).or_default() += 1;
        }

        let limit = self.edges.capacity() + 1;
        for v in self.vert_ids() {
            let expected = uses.get(&v).copied().unwrap_or(0);
            let Some(first) = self.vert(v).e else {
                if expected != 0 {
                    return Err(invalid(format!("{v:?} has no disk but {expected} edges use it")));
                }
                continue;
            };
            if !self.try_edge(first).is_some_and(|edge| edge.has_vert(v)) {
                return Err(invalid(format!("{v:?} disk starts at foreign edge {first:?}")));
            }

            let mut walked = 0;
            let mut cur = first;
            loop {
                walked += 1;
                if walked > limit {
                    return Err(invalid(format!("{v:?} disk cycle does not close")));
                }
                cur = self.disk_next(cur, v);
                if cur == first {
                    break;
                }
            }
            if walked != expected {
                return Err(invalid(format!(
                    "{v:?} disk cycle has {walked} edges but {expected} edges use it"
                )));
            }
        }
        Ok(())
    }

    fn validate_radials(&self) -> Result<(), MeshError> {
        let mut uses: HashMap<EdgeId, usize> = HashMap::new();
        for l in self.loop_ids() {
            let lp = self.loop_(l);
            if self.try_edge(lp.e).is_none() {
                return Err(invalid(format!("{l:?} references dead {:?}", lp.e)));
            }
            *uses.entry(lp.e).or_default() += 1;
        }

        let limit = self.loops.capacity() + 1;
        for e in self.edge_ids() {
            let expected = uses.get(&e).copied().unwrap_or(0);
            let Some(first) = self.edge(e).l else {
                if expected != 0 {
                    return Err(invalid(format!("{e:?} has no radial cycle but {expected} loops use it")));
                }
                continue;
            };

            let mut walked = 0;
            let mut cur = first;
            loop {
                let Some(lp) = self.try_loop(cur) else {
                    return Err(invalid(format!("{e:?} radial cycle reaches dead {cur:?}")));
                };
                if lp.e != e {
                    return Err(invalid(format!("{cur:?} in radial cycle of {e:?} uses {:?}", lp.e)));
                }
                if self.try_loop(lp.radial_next).map(|n| n.radial_prev) != Some(cur) {
                    return Err(invalid(format!("{cur:?} radial links are not symmetric")));
                }
                walked += 1;
                if walked > limit {
                    return Err(invalid(format!("{e:?} radial cycle does not close")));
                }
                cur = lp.radial_next;
                if cur == first {
                    break;
                }
            }
            if walked != expected {
                return Err(invalid(format!(
                    "{e:?} radial cycle has {walked} loops but {expected} loops use it"
                )));
            }
        }
        Ok(())
    }

    fn validate_faces(&self) -> Result<(), MeshError> {
        let mut total = 0;
        for f in self.face_ids() {
            let face = self.face(f);
            if face.len < 3 {
                return Err(invalid(format!("{f:?} has {} corners", face.len)));
            }

            let mut cur = face.l_first;
            for _ in 0..face.len {
                let lp = self.face_loop(f, cur)?;
                let next = self.face_loop(f, lp.next)?;
                if next.prev != cur {
                    return Err(invalid(format!("{cur:?} next/prev links are not symmetric")));
                }
                let joins = self
                    .try_edge(lp.e)
                    .is_some_and(|edge| edge.has_vert(lp.v) && edge.has_vert(next.v));
                if !joins {
                    return Err(invalid(format!(
                        "{cur:?} edge {:?} does not join {:?} and {:?}",
                        lp.e, lp.v, next.v
                    )));
                }
                cur = lp.next;
            }
            if cur != face.l_first {
                return Err(invalid(format!(
                    "{f:?} loop cycle does not close after {} steps",
                    face.len
                )));
            }
            total += face.len;
        }

        if total != self.loop_count() {
            return Err(invalid(format!(
                "faces own {total} loops but {} loops are live",
                self.loop_count()
            )));
        }
        Ok(())
    }

    fn face_loop(&self, f: FaceId, l: LoopId) -> Result<&Loop, MeshError> {
        match self.try_loop(l) {
            Some(lp) if lp.f == f => Ok(lp),
            Some(lp) => Err(invalid(format!("{l:?} in cycle of {f:?} belongs to {:?}", lp.f))),
            None => Err(invalid(format!("{f:?} loop cycle reaches dead {l:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::EdgePolicy;
    use glam::Vec3;

    fn triangle() -> (Mesh, FaceId) {
        let mut mesh = Mesh::new();
        let v: Vec<VertId> = [Vec3::ZERO, Vec3::X, Vec3::Y]
            .into_iter()
            .map(|co| mesh.create_vertex(co))
            .collect();
        let f = mesh
            .create_face_from_verts(&v, EdgePolicy::CreateMissing)
            .unwrap();
        (mesh, f)
    }

    #[test]
    fn test_valid_mesh_passes() {
        let (mesh, _) = triangle();
        mesh.validate().unwrap();
        Mesh::new().validate().unwrap();
    }

    #[test]
    fn test_detects_broken_loop_cycle() {
        let (mut mesh, f) = triangle();
        let first = mesh.face(f).first_loop();
        mesh.loop_mut(first).next = first;
        assert!(matches!(mesh.validate(), Err(MeshError::InvalidTopology(_))));
    }

    #[test]
    fn test_detects_disk_asymmetry() {
        let (mut mesh, _) = triangle();
        let v = VertId(0);
        let e = mesh.vert(v).e.unwrap();
        mesh.disk_link_mut(e, v).next = e;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_detects_wrong_face_length() {
        let (mut mesh, f) = triangle();
        mesh.face_mut(f).len = 4;
        assert!(mesh.validate().is_err());
    }
}
