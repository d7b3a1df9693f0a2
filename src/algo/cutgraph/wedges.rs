//! Vertex duplication along the cut graph.
//!
//! The faces around a vertex are split into wedges by the seam edges
//! meeting there. Each wedge gets its own degree of freedom, so the two
//! sides of a seam carry independent potential values.

use crate::mesh::{FaceId, MeshIndex, SurfaceMesh, VertexId};

const UNSET: usize = usize::MAX;

/// Degrees of freedom of the cut surface.
#[derive(Debug, Clone)]
pub struct WedgeDofs<I: MeshIndex = u32> {
    corner_dofs: Vec<[usize; 3]>,
    new_to_old: Vec<VertexId<I>>,
}

impl<I: MeshIndex> WedgeDofs<I> {
    /// Split every vertex at the edges flagged in `seam`.
    pub fn build(surface: &SurfaceMesh<I>, seam: &[bool]) -> Self {
        let mesh = surface.mesh();
        let mut corner_dofs = vec![[UNSET; 3]; mesh.num_faces()];
        let mut new_to_old = Vec::with_capacity(mesh.num_vertices());

        for v in mesh.vertex_ids() {
            let fan = surface.ccw_fan(v);
            if fan.is_empty() {
                continue;
            }
            let m = fan.len();
            let is_seam = |i: usize| seam[mesh.edge_of(fan[i]).index()];
            // A closed fan starts at its first seam; an open one at the boundary.
            let start = if mesh.is_boundary_vertex(v) {
                0
            } else {
                (0..m).find(|&i| is_seam(i)).unwrap_or(0)
            };

            for step in 0..m {
                let i = (start + step) % m;
                if step == 0 || is_seam(i) {
                    new_to_old.push(v);
                }
                let f = mesh.face_of(fan[i]);
                if let Some(k) = mesh.corner_of(f, v) {
                    corner_dofs[f.index()][k] = new_to_old.len() - 1;
                }
            }
        }

        // Corners the fans missed belong to vertices touching the boundary twice.
        let mut missed = 0;
        for f in mesh.face_ids() {
            let tri = mesh.face_triangle(f);
            for k in 0..3 {
                if corner_dofs[f.index()][k] == UNSET {
                    new_to_old.push(tri[k]);
                    corner_dofs[f.index()][k] = new_to_old.len() - 1;
                    missed += 1;
                }
            }
        }
        if missed > 0 {
            log::warn!("{} face corners at non-manifold vertices got their own dof", missed);
        }

        Self {
            corner_dofs,
            new_to_old,
        }
    }

    /// Number of degrees of freedom.
    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    /// Whether there are no degrees of freedom.
    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    /// Dof of corner `k` of face `f`.
    #[inline]
    pub fn corner(&self, f: FaceId<I>, k: usize) -> usize {
        self.corner_dofs[f.index()][k]
    }

    /// Dofs of the three corners of a face.
    #[inline]
    pub fn face(&self, f: FaceId<I>) -> [usize; 3] {
        self.corner_dofs[f.index()]
    }

    /// Original vertex of a dof.
    #[inline]
    pub fn vertex(&self, dof: usize) -> VertexId<I> {
        self.new_to_old[dof]
    }

    /// The new to old vertex map.
    pub fn new_to_old(&self) -> &[VertexId<I>] {
        &self.new_to_old
    }

    /// Triangles of the uncut surface, recovered through the new to old map.
    pub fn restore(&self) -> Vec<[usize; 3]> {
        self.corner_dofs
            .iter()
            .map(|c| c.map(|d| self.new_to_old[d].index()))
            .collect()
    }
}
