//! # quadlayout
//!
//! Cross-field guided quadrilateral layout for triangulated surfaces.
//!
//! Given a triangle mesh with its boundary and feature curves, quadlayout
//! computes a smooth 4-fold direction field, finds its singularities, cuts
//! the surface into a disk, solves for a seamless U,V parametrization and
//! traces the iso-lines leaving each singularity. The iso-lines split the
//! surface into four-sided blocks ready for structured quad meshing.
//!
//! ## Features
//!
//! - **Half-edge data structure**: O(1) adjacency queries with type-safe indices
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit indices
//! - **Contained failures**: degenerate elements, solver trouble and runaway
//!   paths are reported through [`Diagnostics`](algo::Diagnostics) instead of aborting
//! - **Parallel stages**: relaxation, assembly, tracing and components run on rayon
//!
//! ## Quick Start
//!
//! ```no_run
//! use quadlayout::prelude::*;
//!
//! let surface: SurfaceMesh = quadlayout::io::load("part.stl").unwrap();
//! let options = LayoutOptions::default().with_target_quad_count(500);
//! let result = quad_layout(&surface, &options).unwrap();
//!
//! for s in result.singularities() {
//!     println!("index {}/4 at {:?}", s.index, s.position);
//! }
//! println!("{} blocks, success = {}", result.num_patches(), result.is_success());
//! ```
//!
//! ## Building Surfaces Programmatically
//!
//! ```
//! use quadlayout::prelude::*;
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
//! assert_eq!(surface.euler_characteristic(), 1);
//! assert_eq!(surface.mesh().num_faces(), 2);
//!
//! let result = quad_layout(&surface, &LayoutOptions::default().with_target_quad_count(4)).unwrap();
//! assert_eq!(result.components().len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// ```
/// use quadlayout::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{
        quad_layout, quad_layout_with_progress, CrossFieldMethod, LayoutOptions, QuadLayoutResult, SolverKind,
    };
    pub use crate::error::{LayoutError, Result};
    pub use crate::mesh::{
        build_from_triangles, EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, SurfaceMesh, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let surface: SurfaceMesh = SurfaceMesh::from_triangles(&vertices, &faces).unwrap();
        let mesh = surface.mesh();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 6);
        assert!(mesh.is_valid());
        assert!(surface.curves().is_empty());
        assert_eq!(surface.euler_characteristic(), 2);

        let result = quad_layout(&surface, &LayoutOptions::default()).unwrap();
        assert_eq!(result.index_sum(), 8);
    }
}
