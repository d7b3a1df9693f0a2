//! Mesh construction utilities.
//!
//! Builds half-edge meshes from indexed triangle lists as found in mesh file
//! formats, and converts them back.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh};
use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{LayoutError, Result};

/// Build a half-edge mesh from vertices and triangle faces.
///
/// Faces must be consistently oriented. A directed edge used by two faces
/// means the surface is non-manifold or flipped there, and is rejected.
///
/// # Example
/// ```
/// use quadlayout::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_edges(), 3);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(LayoutError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(LayoutError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(LayoutError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());

    let vertex_ids: Vec<VertexId<I>> = vertices.iter().map(|&pos| mesh.add_vertex(pos)).collect();

    // Directed edge (v0, v1) -> half-edge
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> = HashMap::with_capacity(faces.len() * 3);

    for face in faces {
        let base = mesh.num_halfedges();
        let face_id = FaceId::<I>::new(mesh.num_faces());
        mesh.faces.push(Face {
            halfedge: HalfEdgeId::new(base),
        });

        for k in 0..3 {
            let he = HalfEdgeId::<I>::new(base + k);
            let (a, b) = (face[k], face[(k + 1) % 3]);
            if edge_map.insert((a, b), he).is_some() {
                return Err(LayoutError::NonManifoldEdge { v0: a, v1: b });
            }
            mesh.halfedges.push(HalfEdge {
                origin: vertex_ids[a],
                next: HalfEdgeId::new(base + (k + 1) % 3),
                prev: HalfEdgeId::new(base + (k + 2) % 3),
                face: face_id,
                ..HalfEdge::new()
            });
            // Overwritten for shared vertices; boundary vertices are fixed below.
            mesh.vertex_mut(vertex_ids[a]).halfedge = he;
        }
    }

    // Link twins and number full edges in face order so ids are reproducible.
    let num_interior = mesh.num_halfedges();
    for i in 0..num_interior {
        let he = HalfEdgeId::<I>::new(i);
        if mesh.halfedge(he).edge.is_valid() {
            continue;
        }
        let v0 = mesh.origin(he).index();
        let v1 = mesh.origin(mesh.next(he)).index();
        let edge = EdgeId::<I>::new(mesh.edges.len());
        mesh.edges.push(he);

        let twin = match edge_map.get(&(v1, v0)) {
            Some(&twin) => twin,
            None => {
                let boundary_he = HalfEdgeId::<I>::new(mesh.num_halfedges());
                mesh.halfedges.push(HalfEdge {
                    origin: vertex_ids[v1],
                    ..HalfEdge::new()
                });
                boundary_he
            }
        };

        mesh.halfedge_mut(he).twin = twin;
        mesh.halfedge_mut(he).edge = edge;
        mesh.halfedge_mut(twin).twin = he;
        mesh.halfedge_mut(twin).edge = edge;
    }

    link_boundary_loops(&mut mesh);
    fix_boundary_vertex_halfedges(&mut mesh);

    Ok(mesh)
}

/// Link boundary half-edges into loops.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::with_capacity(boundary_hes.len());
    for &he in &boundary_hes {
        if outgoing.insert(mesh.origin(he).index(), he).is_some() {
            log::warn!("vertex {} touches the boundary more than once", mesh.origin(he).index());
        }
    }

    for &he in &boundary_hes {
        let dest = mesh.dest(he).index();
        if let Some(&next_he) = outgoing.get(&dest) {
            mesh.halfedge_mut(he).next = next_he;
            mesh.halfedge_mut(next_he).prev = he;
        }
    }
}

/// Ensure boundary vertices point to a boundary half-edge.
fn fix_boundary_vertex_halfedges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();
    for he in boundary_hes {
        let v = mesh.origin(he);
        mesh.vertex_mut(v).halfedge = he;
    }
}

/// Convert a half-edge mesh back to a face-vertex representation.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let vertices: Vec<Point3<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();

    let faces: Vec<[usize; 3]> = mesh
        .face_ids()
        .map(|f| {
            let [v0, v1, v2] = mesh.face_triangle(f);
            [v0.index(), v1.index(), v2.index()]
        })
        .collect();

    (vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_single_triangle() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh<u32> = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();

        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_halfedges(), 6);
        assert_eq!(mesh.num_edges(), 3);
        assert!(mesh.is_valid());
        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
            assert!(mesh.is_boundary_halfedge(mesh.vertex(v).halfedge));
        }
    }

    #[test]
    fn test_two_triangles() {
        let (vertices, faces) = two_triangles();
        let mesh: HalfEdgeMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_halfedges(), 10);
        assert_eq!(mesh.num_edges(), 5);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_edge_ids_are_reproducible() {
        let (vertices, faces) = two_triangles();
        let a: HalfEdgeMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();
        let b: HalfEdgeMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();
        for e in a.edge_ids() {
            assert_eq!(a.edge_vertices(e), b.edge_vertices(e));
        }
    }

    #[test]
    fn test_roundtrip() {
        let (vertices, faces) = two_triangles();
        let mesh: HalfEdgeMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();
        let (out_verts, out_faces) = to_face_vertex(&mesh);

        assert_eq!(out_faces, faces);
        for (v_in, v_out) in vertices.iter().zip(out_verts.iter()) {
            assert!((v_in - v_out).norm() < 1e-10);
        }
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let result: Result<HalfEdgeMesh<u32>> = build_from_triangles(&vertices, &[[0, 1, 2]]);
        assert!(matches!(result, Err(LayoutError::InvalidVertexIndex { .. })));
    }

    #[test]
    fn test_repeated_index_face() {
        let (vertices, _) = two_triangles();
        let result: Result<HalfEdgeMesh<u32>> = build_from_triangles(&vertices, &[[0, 0, 2]]);
        assert!(matches!(result, Err(LayoutError::DegenerateFace { face: 0 })));
    }

    #[test]
    fn test_flipped_face_rejected() {
        let (vertices, _) = two_triangles();
        // Both faces traverse 0 -> 1.
        let result: Result<HalfEdgeMesh<u32>> = build_from_triangles(&vertices, &[[0, 1, 2], [0, 1, 3]]);
        assert!(matches!(result, Err(LayoutError::NonManifoldEdge { v0: 0, v1: 1 })));
    }

    #[test]
    fn test_empty() {
        let result: Result<HalfEdgeMesh<u32>> = build_from_triangles(&[], &[]);
        assert!(matches!(result, Err(LayoutError::EmptyMesh)));
    }
}
