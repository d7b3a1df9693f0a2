//! Arcs of the cut graph and their transitions.

use crate::algo::crossfield::CrossField;
use crate::algo::diagnostics::{Diagnostics, IssueKind};
use crate::algo::geometry::quarter_turns;
use crate::mesh::{EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, SurfaceMesh, VertexId};

use super::lifted::LiftedField;
use super::wedges::WedgeDofs;

/// What an arc of the cut graph runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// The surface boundary.
    Boundary,
    /// A seam cut into the surface.
    Cut,
    /// An embedded feature curve.
    InternalBoundary,
}

/// Quarter-turn rotation `k` as the integer matrix `[[0, 1], [-1, 0]]^k`.
pub fn rotation_matrix(k: u8) -> [[i32; 2]; 2] {
    match k % 4 {
        0 => [[1, 0], [0, 1]],
        1 => [[0, 1], [-1, 0]],
        2 => [[-1, 0], [0, -1]],
        _ => [[0, -1], [1, 0]],
    }
}

/// An arc of the cut graph between two nodes, with the transition between
/// its two sides.
///
/// `left` and `right` hold the dofs of the arc vertices on either side,
/// in arc order. The potentials satisfy
/// `(U, V)_right = M (U, V)_left + jump` with `M = rotation_matrix(rotation)`.
#[derive(Debug, Clone)]
pub struct CutGraphGroup<I: MeshIndex = u32> {
    /// What the arc runs along.
    pub kind: GroupKind,
    /// Boundary or feature curve the arc belongs to.
    pub curve: Option<usize>,
    /// Arc vertices; a closed arc repeats its first vertex.
    pub vertices: Vec<VertexId<I>>,
    /// Half-edges along the arc. Their faces form the left side; for
    /// boundary arcs they are the interior half-edges.
    pub halfedges: Vec<HalfEdgeId<I>>,
    /// Dofs of the vertices on the left side.
    pub left: Vec<usize>,
    /// Dofs of the vertices on the right side; equal to `left` on the boundary.
    pub right: Vec<usize>,
    /// Quarter turns from left to right.
    pub rotation: u8,
    /// Translation from left to right, filled in by the potential solve.
    pub jump: [f64; 2],
    /// Which potential (0 = U, 1 = V) the arc is an iso-line of, per side.
    pub iso_field: [Option<usize>; 2],
    /// False when the sides could not be matched; such groups carry no constraint.
    pub valid: bool,
}

impl<I: MeshIndex> CutGraphGroup<I> {
    /// Transition matrix.
    pub fn matrix(&self) -> [[i32; 2]; 2] {
        rotation_matrix(self.rotation)
    }

    /// Map left-side potentials to the right side.
    pub fn apply(&self, uv: [f64; 2]) -> [f64; 2] {
        let m = self.matrix();
        [
            m[0][0] as f64 * uv[0] + m[0][1] as f64 * uv[1] + self.jump[0],
            m[1][0] as f64 * uv[0] + m[1][1] as f64 * uv[1] + self.jump[1],
        ]
    }

    /// Whether the arc is a closed loop.
    pub fn is_loop(&self) -> bool {
        self.vertices.len() > 2 && self.vertices.first() == self.vertices.last()
    }

    /// Number of edges along the arc.
    pub fn num_edges(&self) -> usize {
        self.halfedges.len()
    }

    /// Edges along the arc.
    pub fn edges<'a>(&'a self, mesh: &'a HalfEdgeMesh<I>) -> impl Iterator<Item = EdgeId<I>> + 'a {
        self.halfedges.iter().map(move |&he| mesh.edge_of(he))
    }
}

fn segment_kind<I: MeshIndex>(surface: &SurfaceMesh<I>, cut: &[bool], e: EdgeId<I>) -> Option<(GroupKind, Option<usize>)> {
    let mesh = surface.mesh();
    if mesh.is_boundary_edge(e) {
        Some((GroupKind::Boundary, surface.edge_curve(e)))
    } else if surface.is_internal_curve_edge(e) {
        Some((GroupKind::InternalBoundary, surface.edge_curve(e)))
    } else if cut[e.index()] {
        Some((GroupKind::Cut, None))
    } else {
        None
    }
}

/// Split the cut graph plus the boundary into arcs between nodes.
///
/// Nodes are vertices of degree other than two, required vertices, corners,
/// and vertices where the arc kind or curve changes. A loop without a node
/// starts at its lowest-numbered edge.
pub(crate) fn trace_arcs<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    cut: &[bool],
    required: &[bool],
) -> Vec<(GroupKind, Option<usize>, Vec<VertexId<I>>)> {
    let mesh = surface.mesh();
    let incident = |v: VertexId<I>| -> Vec<EdgeId<I>> {
        let mut edges: Vec<EdgeId<I>> = mesh
            .vertex_halfedges(v)
            .map(|he| mesh.edge_of(he))
            .filter(|&e| segment_kind(surface, cut, e).is_some())
            .collect();
        edges.sort();
        edges.dedup();
        edges
    };
    let is_node = |v: VertexId<I>| {
        if required[v.index()] || surface.is_corner(v) {
            return true;
        }
        let edges = incident(v);
        edges.len() != 2 || segment_kind(surface, cut, edges[0]) != segment_kind(surface, cut, edges[1])
    };
    let other = |e: EdgeId<I>, v: VertexId<I>| {
        let [a, b] = mesh.edge_vertices(e);
        if a == v {
            b
        } else {
            a
        }
    };

    let mut visited = vec![false; mesh.num_edges()];
    let mut arcs = Vec::new();
    let walk = |start: VertexId<I>, first: EdgeId<I>, visited: &mut Vec<bool>| {
        let key = segment_kind(surface, cut, first);
        let mut vertices = vec![start];
        let (mut v, mut e) = (start, first);
        loop {
            visited[e.index()] = true;
            v = other(e, v);
            vertices.push(v);
            if v == start || is_node(v) {
                break;
            }
            match incident(v).into_iter().find(|x| !visited[x.index()]) {
                Some(next) => e = next,
                None => break,
            }
        }
        key.map(|(kind, curve)| (kind, curve, vertices))
    };

    for v in mesh.vertex_ids().filter(|&v| is_node(v)) {
        for e in incident(v) {
            if !visited[e.index()] {
                arcs.extend(walk(v, e, &mut visited));
            }
        }
    }
    for e in mesh.edge_ids() {
        if !visited[e.index()] && segment_kind(surface, cut, e).is_some() {
            let [a, b] = mesh.edge_vertices(e);
            arcs.extend(walk(a.min(b), e, &mut visited));
        }
    }
    arcs
}

/// Attach dofs, transitions and iso-line fields to the arcs.
pub(crate) fn build_groups<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    field: &CrossField<I>,
    lifted: &LiftedField,
    dofs: &WedgeDofs<I>,
    arcs: Vec<(GroupKind, Option<usize>, Vec<VertexId<I>>)>,
    diagnostics: &mut Diagnostics,
) -> Vec<CutGraphGroup<I>> {
    let mesh = surface.mesh();
    let mut groups = Vec::with_capacity(arcs.len());

    for (id, (kind, curve, mut vertices)) in arcs.into_iter().enumerate() {
        if kind == GroupKind::Boundary {
            // Keep the surface on the left.
            let forward = mesh.find_halfedge(vertices[0], vertices[1]);
            if forward.map_or(true, |he| mesh.is_boundary_halfedge(he)) {
                vertices.reverse();
            }
        }
        let halfedges: Option<Vec<HalfEdgeId<I>>> =
            vertices.windows(2).map(|w| mesh.find_halfedge(w[0], w[1])).collect();
        let Some(halfedges) = halfedges else {
            diagnostics.error(IssueKind::Topology, format!("cut graph arc {} is not a chain of edges", id));
            continue;
        };

        let mut valid = true;
        let mut side = |faces: &dyn Fn(HalfEdgeId<I>) -> Option<FaceId<I>>| -> Vec<usize> {
            let mut dofs_along = Vec::with_capacity(vertices.len());
            for (i, &he) in halfedges.iter().enumerate() {
                let Some(f) = faces(he) else {
                    valid = false;
                    return dofs_along;
                };
                let dof_at = |v: VertexId<I>| mesh.corner_of(f, v).map(|k| dofs.corner(f, k));
                let (Some(a), Some(b)) = (dof_at(vertices[i]), dof_at(vertices[i + 1])) else {
                    valid = false;
                    return dofs_along;
                };
                if i == 0 {
                    dofs_along.push(a);
                } else if dofs_along[i] != a {
                    valid = false;
                }
                dofs_along.push(b);
            }
            dofs_along
        };

        let left = side(&|he| Some(mesh.face_of(he)));
        let right = if kind == GroupKind::Boundary {
            left.clone()
        } else {
            side(&|he| {
                let f = mesh.opposite_face(he);
                f.is_valid().then_some(f)
            })
        };

        let mut rotation = 0;
        if kind != GroupKind::Boundary {
            let turns: Vec<u8> = halfedges.iter().map(|&he| lifted.rotation_across(mesh, field, he)).collect();
            rotation = turns.first().copied().unwrap_or(0);
            if turns.iter().any(|&k| k != rotation) {
                valid = false;
            }
        }

        if !valid || left.len() != right.len() || left.len() != vertices.len() {
            diagnostics.error(
                IssueKind::Topology,
                format!(
                    "{:?} arc {} from vertex {} has unmatched sides and is skipped",
                    kind,
                    id,
                    vertices[0].index()
                ),
            );
            valid = false;
        }

        let iso_left = iso_field(mesh, field, lifted, halfedges.iter().copied());
        let iso_right = match kind {
            GroupKind::Boundary => iso_left,
            _ => iso_field(mesh, field, lifted, halfedges.iter().map(|&he| mesh.twin(he))),
        };
        let iso = match kind {
            GroupKind::Cut => [None, None],
            _ => [iso_left, iso_right],
        };

        groups.push(CutGraphGroup {
            kind,
            curve,
            vertices,
            halfedges,
            left,
            right,
            rotation,
            jump: [0.0, 0.0],
            iso_field: iso,
            valid,
        });
    }
    groups
}

/// The potential held constant along the half-edges: V when the U gradient
/// runs along them, U otherwise. Decided by majority over the edges.
fn iso_field<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    field: &CrossField<I>,
    lifted: &LiftedField,
    halfedges: impl Iterator<Item = HalfEdgeId<I>>,
) -> Option<usize> {
    let (mut along, mut across) = (0usize, 0usize);
    for he in halfedges {
        if !mesh.face_of(he).is_valid() || !field.frame(mesh.face_of(he)).valid {
            continue;
        }
        if quarter_turns(lifted.angle_to_halfedge(mesh, field, he)) % 2 == 0 {
            along += 1;
        } else {
            across += 1;
        }
    }
    match (along, across) {
        (0, 0) => None,
        (a, b) if a >= b => Some(1),
        _ => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_matrices_compose() {
        let mul = |a: [[i32; 2]; 2], b: [[i32; 2]; 2]| {
            let mut c = [[0; 2]; 2];
            for i in 0..2 {
                for j in 0..2 {
                    c[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j];
                }
            }
            c
        };
        let m1 = rotation_matrix(1);
        assert_eq!(mul(m1, m1), rotation_matrix(2));
        assert_eq!(mul(m1, rotation_matrix(2)), rotation_matrix(3));
        assert_eq!(mul(m1, rotation_matrix(3)), rotation_matrix(0));
    }

    #[test]
    fn test_apply_transition() {
        let group: CutGraphGroup = CutGraphGroup {
            kind: GroupKind::Cut,
            curve: None,
            vertices: Vec::new(),
            halfedges: Vec::new(),
            left: Vec::new(),
            right: Vec::new(),
            rotation: 1,
            jump: [0.5, -1.0],
            iso_field: [None, None],
            valid: true,
        };
        let uv = group.apply([2.0, 3.0]);
        assert!((uv[0] - 3.5).abs() < 1e-12);
        assert!((uv[1] + 3.0).abs() < 1e-12);
    }
}
