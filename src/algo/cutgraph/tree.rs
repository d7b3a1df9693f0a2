//! Dual spanning tree and cut pruning.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::mesh::{EdgeId, FaceId, HalfEdgeMesh, MeshIndex, SurfaceMesh, VertexId};

/// Heap entry ordered by key; equal keys pop the lower id first.
#[derive(Debug, Clone, Copy)]
struct Entry {
    key: f64,
    id: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key).then_with(|| other.id.cmp(&self.id))
    }
}

/// Edge-graph distance from the nearest source vertex.
///
/// Without sources every distance is zero.
pub(crate) fn distance_field<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, sources: &[bool]) -> Vec<f64> {
    let n = mesh.num_vertices();
    if !sources.iter().any(|&s| s) {
        return vec![0.0; n];
    }

    let mut distances = vec![f64::INFINITY; n];
    let mut heap = BinaryHeap::new();
    for (i, _) in sources.iter().enumerate().filter(|&(_, &s)| s) {
        distances[i] = 0.0;
        // Negated keys turn the max-heap into a min-heap.
        heap.push(Entry { key: -0.0, id: i });
    }

    while let Some(Entry { key, id }) = heap.pop() {
        let d = -key;
        if d > distances[id] {
            continue;
        }
        let v = VertexId::<I>::new(id);
        for he in mesh.vertex_halfedges(v) {
            let w = mesh.dest(he);
            let nd = d + mesh.edge_length(he);
            if nd < distances[w.index()] {
                distances[w.index()] = nd;
                heap.push(Entry { key: -nd, id: w.index() });
            }
        }
    }

    // Vertices unreachable from any source sit on a separate piece.
    for d in distances.iter_mut().filter(|d| d.is_infinite()) {
        *d = 0.0;
    }
    distances
}

/// Spanning forest of the triangle adjacency graph.
#[derive(Debug, Clone)]
pub(crate) struct DualTree<I: MeshIndex = u32> {
    /// Parent face and the edge crossed to reach it; `None` for roots.
    pub parent: Vec<Option<(FaceId<I>, EdgeId<I>)>>,
    /// Faces in the order they joined the tree.
    pub order: Vec<FaceId<I>>,
    /// Per edge, whether the dual edge belongs to the tree.
    pub in_tree: Vec<bool>,
}

/// Whether the tree may cross an edge.
fn crossable<I: MeshIndex>(surface: &SurfaceMesh<I>, e: EdgeId<I>) -> bool {
    !surface.mesh().is_boundary_edge(e) && !surface.is_internal_curve_edge(e)
}

/// Grow a maximum spanning forest over the dual graph with Prim's algorithm.
///
/// Edges far from the sources of `distance` join the tree first, which
/// leaves the cotree, and with it the cut, close to the singularities and
/// the boundary. Boundary and embedded curve edges are never crossed.
pub(crate) fn dual_spanning_tree<I: MeshIndex>(surface: &SurfaceMesh<I>, distance: &[f64]) -> DualTree<I> {
    let mesh = surface.mesh();
    let nf = mesh.num_faces();
    let mut parent = vec![None; nf];
    let mut order = Vec::with_capacity(nf);
    let mut in_tree = vec![false; mesh.num_edges()];
    let mut visited = vec![false; nf];

    let edge_key = |e: EdgeId<I>| {
        let [a, b] = mesh.edge_vertices(e);
        0.5 * (distance[a.index()] + distance[b.index()])
    };
    let face_key = |f: FaceId<I>| mesh.face_triangle(f).iter().map(|v| distance[v.index()]).sum::<f64>() / 3.0;

    let mut roots: Vec<FaceId<I>> = mesh.face_ids().collect();
    roots.sort_by(|&a, &b| face_key(b).total_cmp(&face_key(a)).then(a.cmp(&b)));

    let mut heap = BinaryHeap::new();
    for root in roots {
        if visited[root.index()] {
            continue;
        }
        visited[root.index()] = true;
        order.push(root);
        for e in mesh.face_edges(root) {
            if crossable(surface, e) {
                heap.push(Entry { key: edge_key(e), id: e.index() });
            }
        }

        while let Some(Entry { id, .. }) = heap.pop() {
            let e = EdgeId::<I>::new(id);
            let [f, g] = mesh.edge_faces(e);
            let (from, to) = match (visited[f.index()], visited[g.index()]) {
                (true, false) => (f, g),
                (false, true) => (g, f),
                _ => continue,
            };
            visited[to.index()] = true;
            in_tree[id] = true;
            parent[to.index()] = Some((from, e));
            order.push(to);
            for next in mesh.face_edges(to) {
                if next != e && crossable(surface, next) {
                    heap.push(Entry { key: edge_key(next), id: next.index() });
                }
            }
        }
    }

    DualTree { parent, order, in_tree }
}

/// Remove dangling cut branches.
///
/// Repeatedly deletes the cut edge of a vertex that has exactly one incident
/// cut or boundary edge, unless the vertex is required. Edges flagged in
/// `fixed` are never removed.
pub(crate) fn prune_cut<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, cut: &mut [bool], fixed: &[bool], required: &[bool]) {
    let in_graph = |e: EdgeId<I>, cut: &[bool]| cut[e.index()] || mesh.is_boundary_edge(e);
    let mut degree = vec![0usize; mesh.num_vertices()];
    for e in mesh.edge_ids() {
        if in_graph(e, cut) {
            for v in mesh.edge_vertices(e) {
                degree[v.index()] += 1;
            }
        }
    }

    let mut queue: VecDeque<VertexId<I>> = mesh
        .vertex_ids()
        .filter(|v| degree[v.index()] == 1 && !required[v.index()])
        .collect();

    while let Some(v) = queue.pop_front() {
        if degree[v.index()] != 1 {
            continue;
        }
        let Some(e) = mesh
            .vertex_halfedges(v)
            .map(|he| mesh.edge_of(he))
            .find(|&e| cut[e.index()])
        else {
            continue;
        };
        if fixed[e.index()] {
            continue;
        }
        cut[e.index()] = false;
        for w in mesh.edge_vertices(e) {
            degree[w.index()] -= 1;
            if w != v && degree[w.index()] == 1 && !required[w.index()] {
                queue.push_back(w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures;

    #[test]
    fn test_tree_spans_every_face() {
        let surface = fixtures::disk(10, 3);
        let mesh = surface.mesh();
        let distance = distance_field(mesh, &vec![false; mesh.num_vertices()]);
        let tree = dual_spanning_tree(&surface, &distance);
        assert_eq!(tree.order.len(), mesh.num_faces());
        let roots = tree.parent.iter().filter(|p| p.is_none()).count();
        assert_eq!(roots, 1);
        assert_eq!(tree.in_tree.iter().filter(|&&t| t).count(), mesh.num_faces() - 1);
    }

    #[test]
    fn test_distance_field_from_corner() {
        let surface = fixtures::grid(4);
        let mesh = surface.mesh();
        let mut sources = vec![false; mesh.num_vertices()];
        sources[0] = true;
        let d = distance_field(mesh, &sources);
        assert_eq!(d[0], 0.0);
        // Opposite corner: four diagonal steps.
        assert!((d[24] - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_prune_removes_dangling_branches() {
        let surface = fixtures::grid(2);
        let mesh = surface.mesh();
        let center = VertexId::new(4);
        let mut cut = vec![false; mesh.num_edges()];
        for he in mesh.vertex_halfedges(center) {
            cut[mesh.edge_of(he).index()] = true;
        }
        let fixed = vec![false; mesh.num_edges()];

        let mut required = vec![false; mesh.num_vertices()];
        let mut pruned = cut.clone();
        prune_cut(mesh, &mut pruned, &fixed, &required);
        // Every spoke ends on the boundary, so nothing dangles.
        assert_eq!(pruned, cut);

        // A lone spoke from a boundary vertex to the center dangles.
        let mut single = vec![false; mesh.num_edges()];
        let spoke = mesh.edge_of(mesh.find_halfedge(center, VertexId::new(1)).unwrap());
        single[spoke.index()] = true;
        prune_cut(mesh, &mut single, &fixed, &required);
        assert!(single.iter().all(|&c| !c));

        // Unless the center is required.
        required[4] = true;
        single[spoke.index()] = true;
        prune_cut(mesh, &mut single, &fixed, &required);
        assert!(single[spoke.index()]);
    }
}
