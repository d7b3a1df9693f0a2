//! Per-edge record of where separatrices cut the mesh.

use super::{PathLocation, SeparatrixPath, Span};
use crate::mesh::{EdgeId, FaceId, HalfEdgeMesh, MeshIndex};

/// Two edge points closer than this (in edge parameter) are the same point.
pub const POINT_TOLERANCE: f64 = 1e-6;

/// A separatrix crossing an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePoint {
    /// Parameter along the canonical orientation of the edge.
    pub t: f64,
    /// Path that put the point there.
    pub path: usize,
}

/// A straight piece of a separatrix inside one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chord<I: MeshIndex = u32> {
    /// Endpoints on the triangle boundary.
    pub ends: [PathLocation<I>; 2],
    /// Path the chord belongs to.
    pub path: usize,
}

/// Accumulated separatrix geometry: points on edges, edges followed exactly,
/// and chords through triangles.
///
/// Each location is owned by the first path committed there; a later path
/// touching it is redundant.
#[derive(Debug, Clone)]
pub struct EdgeCuts<I: MeshIndex = u32> {
    points: Vec<Vec<EdgePoint>>,
    aligned: Vec<Option<usize>>,
    chords: Vec<Vec<Chord<I>>>,
}

impl<I: MeshIndex> EdgeCuts<I> {
    /// An empty record for `mesh`.
    pub fn new(mesh: &HalfEdgeMesh<I>) -> Self {
        Self {
            points: vec![Vec::new(); mesh.num_edges()],
            aligned: vec![None; mesh.num_edges()],
            chords: vec![Vec::new(); mesh.num_faces()],
        }
    }

    /// Points on an edge, sorted by parameter.
    pub fn points(&self, e: EdgeId<I>) -> &[EdgePoint] {
        &self.points[e.index()]
    }

    /// Path running exactly along an edge.
    pub fn aligned(&self, e: EdgeId<I>) -> Option<usize> {
        self.aligned[e.index()]
    }

    /// Chords through a face.
    pub fn chords(&self, f: FaceId<I>) -> &[Chord<I>] {
        &self.chords[f.index()]
    }

    /// Index of the point at parameter `t` on edge `e`.
    pub fn find_point(&self, e: EdgeId<I>, t: f64) -> Option<usize> {
        self.points[e.index()].iter().position(|p| (p.t - t).abs() < POINT_TOLERANCE)
    }

    /// Total number of edge points.
    pub fn num_points(&self) -> usize {
        self.points.iter().map(Vec::len).sum()
    }

    /// Number of edges followed by a separatrix.
    pub fn num_aligned(&self) -> usize {
        self.aligned.iter().flatten().count()
    }

    /// Ids of the committed paths, ascending.
    pub fn paths(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .points
            .iter()
            .flatten()
            .map(|p| p.path)
            .chain(self.aligned.iter().flatten().copied())
            .chain(self.chords.iter().flatten().map(|c| c.path))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0 && self.num_aligned() == 0
    }

    /// Whether `path` runs through a location some committed path owns.
    pub fn conflicts(&self, mesh: &HalfEdgeMesh<I>, path: &SeparatrixPath<I>) -> bool {
        let point_taken = path.points.iter().any(|p| match p.location {
            PathLocation::Edge { edge, t } => self.find_point(edge, t).is_some(),
            PathLocation::Vertex(_) => false,
        });
        point_taken || aligned_edges(mesh, path).any(|e| self.aligned[e.index()].is_some())
    }

    /// Commit the geometry of path `id`.
    pub fn insert(&mut self, mesh: &HalfEdgeMesh<I>, id: usize, path: &SeparatrixPath<I>) {
        for p in &path.points {
            if let PathLocation::Edge { edge, t } = p.location {
                let list = &mut self.points[edge.index()];
                if !list.iter().any(|q| (q.t - t).abs() < POINT_TOLERANCE) {
                    list.push(EdgePoint { t, path: id });
                    list.sort_by(|a, b| a.t.total_cmp(&b.t));
                }
            }
        }
        for e in aligned_edges(mesh, path) {
            self.aligned[e.index()].get_or_insert(id);
        }
        for (i, span) in path.spans.iter().enumerate() {
            let ends = [path.points[i].location, path.points[i + 1].location];
            if let Span::Face(f) = *span {
                if !matches!(ends, [PathLocation::Vertex(_), PathLocation::Vertex(_)]) {
                    self.chords[f.index()].push(Chord { ends, path: id });
                }
            }
        }
    }
}

/// Edges a path follows: explicit edge spans plus face spans joining two corners.
fn aligned_edges<'a, I: MeshIndex>(
    mesh: &'a HalfEdgeMesh<I>,
    path: &'a SeparatrixPath<I>,
) -> impl Iterator<Item = EdgeId<I>> + 'a {
    path.spans.iter().enumerate().filter_map(move |(i, span)| match *span {
        Span::Edge(e) => Some(e),
        Span::Face(_) => match (path.points[i].location, path.points[i + 1].location) {
            (PathLocation::Vertex(a), PathLocation::Vertex(b)) if a != b => {
                mesh.find_halfedge(a, b).map(|he| mesh.edge_of(he))
            }
            _ => None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::separatrix::{PathKind, PathPoint};
    use crate::mesh::{fixtures, VertexId};

    fn path_along(mesh: &HalfEdgeMesh, chain: &[usize]) -> SeparatrixPath {
        let vertices: Vec<VertexId> = chain.iter().map(|&v| VertexId::new(v)).collect();
        SeparatrixPath {
            kind: PathKind::SingToBdry,
            start: vertices[0],
            end: None,
            field: 0,
            points: vertices
                .iter()
                .map(|&v| PathPoint {
                    position: *mesh.position(v),
                    location: PathLocation::Vertex(v),
                })
                .collect(),
            spans: vertices
                .windows(2)
                .filter_map(|w| mesh.find_halfedge(w[0], w[1]))
                .map(|he| Span::Edge(mesh.edge_of(he)))
                .collect(),
            crossings: Vec::new(),
            diff: 0.0,
        }
    }

    #[test]
    fn test_shared_edge_conflicts() {
        let surface = fixtures::grid(3);
        let mesh = surface.mesh();
        let mut cuts = EdgeCuts::new(mesh);
        // Row y = 1/3: vertices 4..8.
        let first = path_along(mesh, &[4, 5, 6]);
        assert!(!cuts.conflicts(mesh, &first));
        cuts.insert(mesh, 0, &first);
        assert_eq!(cuts.num_aligned(), 2);
        assert_eq!(cuts.paths(), vec![0]);

        let overlapping = path_along(mesh, &[6, 5]);
        assert!(cuts.conflicts(mesh, &overlapping));

        // Column x = 1/3 crosses the row at vertex 5 without sharing an edge.
        let crossing = path_along(mesh, &[1, 5, 9]);
        assert!(!cuts.conflicts(mesh, &crossing));
    }

    #[test]
    fn test_edge_points_are_merged() {
        let surface = fixtures::grid(2);
        let mesh = surface.mesh();
        let e = mesh.edge_of(mesh.find_halfedge(VertexId::new(1), VertexId::new(4)).unwrap());
        let f = mesh.edge_faces(e)[0];
        let start = VertexId::new(0);
        let path = SeparatrixPath {
            kind: PathKind::SingToBdry,
            start,
            end: None,
            field: 1,
            points: vec![
                PathPoint {
                    position: *mesh.position(start),
                    location: PathLocation::Vertex(start),
                },
                PathPoint {
                    position: mesh.edge_point(e, 0.5),
                    location: PathLocation::Edge { edge: e, t: 0.5 },
                },
            ],
            spans: vec![Span::Face(f)],
            crossings: Vec::new(),
            diff: 0.0,
        };
        let mut cuts = EdgeCuts::new(mesh);
        cuts.insert(mesh, 0, &path);
        cuts.insert(mesh, 1, &path);
        assert_eq!(cuts.points(e).len(), 1);
        assert_eq!(cuts.points(e)[0].path, 0);
        assert_eq!(cuts.find_point(e, 0.5 + 1e-9), Some(0));
        assert!(cuts.conflicts(mesh, &path));
        assert_eq!(cuts.chords(f).len(), 2);
    }
}
