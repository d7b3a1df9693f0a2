//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation and the surface
//! view with classified boundary curves that the layout pipeline consumes.
//!
//! # Overview
//!
//! [`HalfEdgeMesh`] represents a triangle mesh using a half-edge
//! (doubly-connected edge list) data structure with an additional table of
//! full edges. [`SurfaceMesh`] wraps it with per-vertex classification and
//! ordered [`BoundaryCurve`]s.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Construction
//!
//! ```
//! use quadlayout::mesh::SurfaceMesh;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3]];
//!
//! let surface: SurfaceMesh = SurfaceMesh::from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(surface.curves().len(), 4);
//! ```

mod builder;
mod halfedge;
mod index;
mod surface;

#[cfg(test)]
pub(crate) mod fixtures;

pub use builder::{build_from_triangles, to_face_vertex};
pub use halfedge::{Face, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter, DEGENERATE_AREA};
pub use index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use surface::{BoundaryCurve, Component, SurfaceMesh, VertexClass, DEFAULT_FEATURE_ANGLE};
