//! Cut graph construction.
//!
//! The cut graph is a set of mesh edges that, together with the boundary,
//! slices the surface into a topological disk on which the cross field can
//! be combed into a single-valued frame. It is built as the complement of a
//! spanning tree of the dual graph, trimmed of branches that lead nowhere.
//!
//! # Pipeline
//!
//! 1. Distance from every singularity, corner and boundary vertex.
//! 2. Maximum spanning tree of the dual graph, so the cotree hugs the
//!    singularities and the boundary.
//! 3. Cotree edges plus embedded curves form the cut; dangling branches
//!    that do not end at a required vertex are pruned.
//! 4. Vertices are split into one dof per wedge between seams.
//! 5. The cross field is combed along the tree ([`LiftedField`]).
//! 6. Cut and boundary edges are grouped into arcs ([`CutGraphGroup`]) with
//!    a quarter-turn transition between their sides.

mod groups;
mod lifted;
mod tree;
mod wedges;

pub use groups::{rotation_matrix, CutGraphGroup, GroupKind};
pub use lifted::LiftedField;
pub use wedges::WedgeDofs;

pub(crate) use lifted::edge_slot;

use crate::algo::crossfield::CrossField;
use crate::algo::diagnostics::Diagnostics;
use crate::algo::singularity::Singularities;
use crate::mesh::{EdgeId, FaceId, MeshIndex, SurfaceMesh, VertexId};

/// Which side of a group a face lies on when an edge is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    /// Group index.
    pub group: usize,
    /// Position of the edge along the group.
    pub position: usize,
    /// True when going from the left side to the right side.
    pub forward: bool,
}

/// The cut graph of a surface with its groups, dofs and combed field.
#[derive(Debug, Clone)]
pub struct CutGraph<I: MeshIndex = u32> {
    cut: Vec<bool>,
    tree: Vec<bool>,
    groups: Vec<CutGraphGroup<I>>,
    edge_slot: Vec<Option<(usize, usize)>>,
    dofs: WedgeDofs<I>,
    lifted: LiftedField,
}

impl<I: MeshIndex> CutGraph<I> {
    /// Build the cut graph and flag its edges in the cross field.
    pub fn build(
        surface: &SurfaceMesh<I>,
        field: &mut CrossField<I>,
        singularities: &Singularities<I>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mesh = surface.mesh();
        let required = singularities.required_vertices(surface);
        let sources: Vec<bool> = mesh
            .vertex_ids()
            .map(|v| required[v.index()] || mesh.is_boundary_vertex(v))
            .collect();
        let distance = tree::distance_field(mesh, &sources);
        let dual_tree = tree::dual_spanning_tree(surface, &distance);

        let fixed: Vec<bool> = mesh.edge_ids().map(|e| surface.is_internal_curve_edge(e)).collect();
        let mut cut: Vec<bool> = mesh
            .edge_ids()
            .map(|e| !mesh.is_boundary_edge(e) && !dual_tree.in_tree[e.index()])
            .collect();
        tree::prune_cut(mesh, &mut cut, &fixed, &required);

        for e in mesh.edge_ids() {
            field.edge_mut(e).on_cut_graph = cut[e.index()];
        }

        let dofs = WedgeDofs::build(surface, &cut);
        let lifted = LiftedField::comb(mesh, field, &dual_tree);
        let arcs = groups::trace_arcs(surface, &cut, &required);
        let groups = groups::build_groups(surface, field, &lifted, &dofs, arcs, diagnostics);

        let mut edge_slot = vec![None; mesh.num_edges()];
        for (g, group) in groups.iter().enumerate() {
            for (i, e) in group.edges(mesh).enumerate() {
                edge_slot[e.index()] = Some((g, i));
            }
        }

        log::debug!(
            "cut graph: {} cut edges, {} groups, {} dofs for {} vertices",
            cut.iter().filter(|&&c| c).count(),
            groups.len(),
            dofs.len(),
            mesh.num_vertices()
        );

        Self {
            cut,
            tree: dual_tree.in_tree,
            groups,
            edge_slot,
            dofs,
            lifted,
        }
    }

    /// Whether an edge is a seam: a cut edge or an embedded curve.
    #[inline]
    pub fn is_cut_edge(&self, e: EdgeId<I>) -> bool {
        self.cut[e.index()]
    }

    /// Whether the dual edge belongs to the spanning tree.
    #[inline]
    pub fn is_tree_edge(&self, e: EdgeId<I>) -> bool {
        self.tree[e.index()]
    }

    /// Number of seam edges.
    pub fn num_cut_edges(&self) -> usize {
        self.cut.iter().filter(|&&c| c).count()
    }

    /// All groups.
    pub fn groups(&self) -> &[CutGraphGroup<I>] {
        &self.groups
    }

    /// A single group.
    pub fn group(&self, id: usize) -> &CutGraphGroup<I> {
        &self.groups[id]
    }

    /// Mutable access to the groups, used to record jumps.
    pub fn groups_mut(&mut self) -> &mut [CutGraphGroup<I>] {
        &mut self.groups
    }

    /// Group and position of an edge, if it lies on a group.
    pub fn edge_group(&self, e: EdgeId<I>) -> Option<(usize, usize)> {
        self.edge_slot[e.index()]
    }

    /// How leaving face `from` across seam `e` crosses its group.
    ///
    /// `None` for edges that are not seams or belong to a skipped group.
    pub fn crossing(&self, surface: &SurfaceMesh<I>, e: EdgeId<I>, from: FaceId<I>) -> Option<Crossing> {
        if !self.cut[e.index()] {
            return None;
        }
        let (group, position) = self.edge_slot[e.index()]?;
        let g = &self.groups[group];
        if !g.valid {
            return None;
        }
        Some(Crossing {
            group,
            position,
            forward: surface.mesh().face_of(g.halfedges[position]) == from,
        })
    }

    /// Vertex duplication.
    pub fn dofs(&self) -> &WedgeDofs<I> {
        &self.dofs
    }

    /// Dof of vertex `v` as seen from face `f`.
    pub fn dof_at(&self, surface: &SurfaceMesh<I>, f: FaceId<I>, v: VertexId<I>) -> Option<usize> {
        surface.mesh().corner_of(f, v).map(|k| self.dofs.corner(f, k))
    }

    /// Field combed along the dual spanning tree.
    pub fn lifted(&self) -> &LiftedField {
        &self.lifted
    }

    /// Triangles of the uncut surface, recovered from the dof map.
    pub fn restore(&self) -> Vec<[usize; 3]> {
        self.dofs.restore()
    }
}

/// Build the cut graph of a surface.
pub fn build_cut_graph<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    field: &mut CrossField<I>,
    singularities: &Singularities<I>,
    diagnostics: &mut Diagnostics,
) -> CutGraph<I> {
    CutGraph::build(surface, field, singularities, diagnostics)
}
