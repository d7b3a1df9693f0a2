//! Cross field combed along the dual spanning tree.

use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;

use super::tree::DualTree;
use crate::algo::crossfield::{closest_rotation, CrossField};
use crate::algo::geometry::quarter_turns;
use crate::mesh::{EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex};

/// Position of `e` among the edges of `f`.
pub(crate) fn edge_slot<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, f: FaceId<I>, e: EdgeId<I>) -> Option<usize> {
    mesh.face_edges(f).iter().position(|&x| x == e)
}

/// One face angle per triangle, chosen among the four rotations of the cross
/// so that it varies continuously along the dual spanning tree.
///
/// The angle is the direction of the U gradient in the face frame; the
/// V gradient is a quarter turn further.
#[derive(Debug, Clone)]
pub struct LiftedField {
    angles: Vec<f64>,
}

impl LiftedField {
    /// Comb the face crosses of `field` outward from the tree roots.
    pub(crate) fn comb<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, field: &CrossField<I>, tree: &DualTree<I>) -> Self {
        let raw = field.face_angles(mesh);
        let mut angles = vec![0.0; mesh.num_faces()];
        for &f in &tree.order {
            angles[f.index()] = match tree.parent[f.index()] {
                None => raw[f.index()].unwrap_or(0.0),
                Some((p, e)) => {
                    let carried = transport(mesh, field, angles[p.index()], p, f, e);
                    match raw[f.index()] {
                        Some(a) => closest_rotation(a, carried),
                        None => carried,
                    }
                }
            };
        }
        Self { angles }
    }

    /// Combed angle of a face.
    #[inline]
    pub fn angle<I: MeshIndex>(&self, f: FaceId<I>) -> f64 {
        self.angles[f.index()]
    }

    /// Unit direction of the U gradient in 3D.
    pub fn u_direction<I: MeshIndex>(&self, field: &CrossField<I>, f: FaceId<I>) -> Vector3<f64> {
        field.frame(f).direction(self.angles[f.index()])
    }

    /// Unit direction of the V gradient in 3D.
    pub fn v_direction<I: MeshIndex>(&self, field: &CrossField<I>, f: FaceId<I>) -> Vector3<f64> {
        field.frame(f).direction(self.angles[f.index()] + FRAC_PI_2)
    }

    /// Quarter turns from the combed cross of the face left of `he` to the
    /// combed cross of the face on its right.
    pub fn rotation_across<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>, field: &CrossField<I>, he: HalfEdgeId<I>) -> u8 {
        let left = mesh.face_of(he);
        let right = mesh.opposite_face(he);
        if !right.is_valid() {
            return 0;
        }
        let e = mesh.edge_of(he);
        let carried = transport(mesh, field, self.angle(left), left, right, e);
        quarter_turns(self.angle(right) - carried)
    }

    /// Angle, relative to the direction of `he`, of the U gradient in the face left of `he`.
    pub fn angle_to_halfedge<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>, field: &CrossField<I>, he: HalfEdgeId<I>) -> f64 {
        let f = mesh.face_of(he);
        self.angle(f) - field.frame(f).angle_of(&mesh.edge_vector(he))
    }
}

/// Carry the angle `a` of face `from` across the shared edge `e` into face `to`.
///
/// Unfolding around the edge preserves the angle to the edge direction.
fn transport<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    field: &CrossField<I>,
    a: f64,
    from: FaceId<I>,
    to: FaceId<I>,
    e: EdgeId<I>,
) -> f64 {
    match (edge_slot(mesh, from, e), edge_slot(mesh, to, e)) {
        (Some(i), Some(j)) => a - field.edge_angle(from, i) + field.edge_angle(to, j),
        _ => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::crossfield::compute_cross_field;
    use crate::algo::cutgraph::tree::{distance_field, dual_spanning_tree};
    use crate::algo::diagnostics::Diagnostics;
    use crate::algo::options::LayoutOptions;
    use crate::mesh::fixtures;

    #[test]
    fn test_tree_edges_have_no_rotation() {
        let surface = fixtures::icosphere(1);
        let mesh = surface.mesh();
        let mut diagnostics = Diagnostics::new();
        let field = compute_cross_field(&surface, &LayoutOptions::default(), &mut diagnostics);
        let tree = dual_spanning_tree(&surface, &distance_field(mesh, &vec![false; mesh.num_vertices()]));
        let lifted = LiftedField::comb(mesh, &field, &tree);
        for e in mesh.edge_ids() {
            if tree.in_tree[e.index()] {
                assert_eq!(lifted.rotation_across(mesh, &field, mesh.edge_halfedge(e)), 0);
            }
        }
    }

    #[test]
    fn test_flat_square_combs_to_one_direction() {
        let surface = fixtures::grid(3);
        let mesh = surface.mesh();
        let mut diagnostics = Diagnostics::new();
        let field = compute_cross_field(&surface, &LayoutOptions::default(), &mut diagnostics);
        let tree = dual_spanning_tree(&surface, &distance_field(mesh, &vec![false; mesh.num_vertices()]));
        let lifted = LiftedField::comb(mesh, &field, &tree);
        let first = lifted.u_direction(&field, FaceId::new(0));
        for f in mesh.face_ids() {
            assert!((lifted.u_direction(&field, f) - first).norm() < 1e-6);
            assert!(lifted.v_direction(&field, f).dot(&first).abs() < 1e-6);
        }
    }
}
