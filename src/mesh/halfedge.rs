//! Half-edge mesh data structure.
//!
//! Triangle surfaces are stored as a half-edge (doubly-connected edge list)
//! structure with an additional table of full edges. Every element lives in a
//! flat arena and is addressed by a typed index, so per-element algorithm data
//! (edge crosses, potentials, cut flags) can be kept in dense side arrays keyed
//! by the same indices.
//!
//! # Boundary Handling
//!
//! Boundary half-edges have an invalid face ID. Their twins are the interior
//! half-edges. Boundary loops can be walked with the `next` link on boundary
//! half-edges, and every boundary vertex stores an outgoing boundary half-edge.

use nalgebra::{Point3, Vector3};

use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};

/// Area below which a face is considered degenerate.
pub const DEGENERATE_AREA: f64 = 1e-14;

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge from this vertex.
    /// For boundary vertices, this is guaranteed to be a boundary half-edge.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,

    /// The opposite half-edge.
    pub twin: HalfEdgeId<I>,

    /// The next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId<I>,

    /// The previous half-edge around the face.
    pub prev: HalfEdgeId<I>,

    /// The face this half-edge belongs to. Invalid for boundary half-edges.
    pub face: FaceId<I>,

    /// The full edge this half-edge is one side of.
    pub edge: EdgeId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unlinked half-edge.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
            edge: EdgeId::invalid(),
        }
    }

    /// Check if this half-edge is on the boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

/// A triangular face in the half-edge mesh.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// The first half-edge of the face; the other two follow via `next`.
    pub halfedge: HalfEdgeId<I>,
}

/// A half-edge triangle mesh.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,
    /// Canonical half-edge of every full edge.
    pub(crate) edges: Vec<HalfEdgeId<I>>,
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        let num_halfedges = num_faces * 3 + num_faces / 2;
        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            faces: Vec::with_capacity(num_faces),
            edges: Vec::with_capacity(num_halfedges / 2 + 1),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of full edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Get the full edge of a half-edge.
    #[inline]
    pub fn edge_of(&self, he: HalfEdgeId<I>) -> EdgeId<I> {
        self.halfedge(he).edge
    }

    /// Get the canonical half-edge of a full edge.
    #[inline]
    pub fn edge_halfedge(&self, e: EdgeId<I>) -> HalfEdgeId<I> {
        self.edges[e.index()]
    }

    /// Get the endpoints of an edge, ordered along its canonical half-edge.
    #[inline]
    pub fn edge_vertices(&self, e: EdgeId<I>) -> [VertexId<I>; 2] {
        let he = self.edge_halfedge(e);
        [self.origin(he), self.dest(he)]
    }

    /// Get the faces on either side of an edge.
    ///
    /// The first entry is the face of the canonical half-edge (always valid),
    /// the second the face of its twin (invalid on the boundary).
    #[inline]
    pub fn edge_faces(&self, e: EdgeId<I>) -> [FaceId<I>; 2] {
        let he = self.edge_halfedge(e);
        [self.face_of(he), self.face_of(self.twin(he))]
    }

    /// Check if a half-edge is on the boundary.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    /// Check if a full edge lies on the boundary.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId<I>) -> bool {
        let he = self.edge_halfedge(e);
        self.is_boundary_halfedge(he) || self.is_boundary_halfedge(self.twin(he))
    }

    /// Check if a vertex is on the boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        let start = self.vertex(v).halfedge;
        if !start.is_valid() {
            return true;
        }
        // The builder points boundary vertices at a boundary half-edge.
        self.is_boundary_halfedge(start) || self.vertex_halfedges(v).any(|he| self.is_boundary_halfedge(he))
    }

    /// Find the half-edge going from `a` to `b`, if the two vertices are connected.
    pub fn find_halfedge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<HalfEdgeId<I>> {
        self.vertex_halfedges(a).find(|&he| self.dest(he) == b)
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.edges.len()).map(EdgeId::new)
    }

    /// Iterate over outgoing half-edges around a vertex.
    ///
    /// Consecutive half-edges `he_i`, `he_{i+1}` enclose the face
    /// `face_of(he_{i+1})`; for a boundary vertex the walk starts at the
    /// outgoing boundary half-edge.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Iterate over faces adjacent to a vertex, in rotation order.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v).filter_map(|he| {
            let f = self.face_of(he);
            if f.is_valid() {
                Some(f)
            } else {
                None
            }
        })
    }

    /// Get the three half-edges of a face.
    pub fn face_halfedges(&self, f: FaceId<I>) -> [HalfEdgeId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [he0, he1, he2]
    }

    /// Get the three edges of a face; edge `i` goes from corner `i` to corner `i + 1`.
    pub fn face_edges(&self, f: FaceId<I>) -> [EdgeId<I>; 3] {
        let [h0, h1, h2] = self.face_halfedges(f);
        [self.edge_of(h0), self.edge_of(h1), self.edge_of(h2)]
    }

    /// Get the three vertices of a triangular face.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        let [h0, h1, h2] = self.face_halfedges(f);
        [self.origin(h0), self.origin(h1), self.origin(h2)]
    }

    /// Get the positions of the three vertices of a triangular face.
    pub fn face_positions(&self, f: FaceId<I>) -> [Point3<f64>; 3] {
        let [v0, v1, v2] = self.face_triangle(f);
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    /// Position (0, 1 or 2) of vertex `v` among the corners of face `f`.
    pub fn corner_of(&self, f: FaceId<I>, v: VertexId<I>) -> Option<usize> {
        self.face_triangle(f).iter().position(|&c| c == v)
    }

    /// Get the face across `he`'s edge from `face_of(he)`.
    #[inline]
    pub fn opposite_face(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.face_of(self.twin(he))
    }

    // ==================== Geometry ====================

    /// Compute the unit normal of a face, or the zero vector for a degenerate face.
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        let n = (p1 - p0).cross(&(p2 - p0));
        let len = n.norm();
        if len * 0.5 <= DEGENERATE_AREA {
            Vector3::zeros()
        } else {
            n / len
        }
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Interior angle of face `f` at its corner `corner`.
    pub fn corner_angle(&self, f: FaceId<I>, corner: usize) -> f64 {
        let p = self.face_positions(f);
        let a = p[corner];
        let b = p[(corner + 1) % 3];
        let c = p[(corner + 2) % 3];
        let ab = b - a;
        let ac = c - a;
        let denom = ab.norm() * ac.norm();
        if denom < 1e-300 {
            return 0.0;
        }
        (ab.dot(&ac) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Sum of incident face angles at a vertex.
    pub fn angle_sum(&self, v: VertexId<I>) -> f64 {
        self.vertex_faces(v)
            .filter_map(|f| self.corner_of(f, v).map(|c| self.corner_angle(f, c)))
            .sum()
    }

    /// Compute the length of the edge of a half-edge.
    pub fn edge_length(&self, he: HalfEdgeId<I>) -> f64 {
        self.edge_vector(he).norm()
    }

    /// Compute the edge vector (from origin to destination).
    pub fn edge_vector(&self, he: HalfEdgeId<I>) -> Vector3<f64> {
        self.position(self.dest(he)) - self.position(self.origin(he))
    }

    /// Point at parameter `t` along the canonical orientation of an edge.
    pub fn edge_point(&self, e: EdgeId<I>, t: f64) -> Point3<f64> {
        let [a, b] = self.edge_vertices(e);
        let pa = self.position(a);
        let pb = self.position(b);
        Point3::from(pa.coords * (1.0 - t) + pb.coords * t)
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId<I>) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Mean length over all full edges.
    pub fn mean_edge_length(&self) -> f64 {
        if self.edges.is_empty() {
            return 1.0;
        }
        let sum: f64 = self.edges.iter().map(|&he| self.edge_length(he)).sum();
        sum / self.edges.len() as f64
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = first.position;
        let mut max = first.position;
        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }
        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Euler characteristic V - E + F.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_vertices() as i64 - self.num_edges() as i64 + self.num_faces() as i64
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    // ==================== Validation ====================

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        for (i, v) in self.vertices.iter().enumerate() {
            if v.halfedge.is_valid() && self.halfedge(v.halfedge).origin.index() != i {
                return false;
            }
        }

        for (i, he) in self.halfedges.iter().enumerate() {
            if !he.twin.is_valid() || self.halfedge(he.twin).twin.index() != i {
                return false;
            }
            if he.next.is_valid() && self.halfedge(he.next).prev.index() != i {
                return false;
            }
            if he.prev.is_valid() && self.halfedge(he.prev).next.index() != i {
                return false;
            }
            if !he.edge.is_valid() || self.halfedge(he.twin).edge != he.edge {
                return false;
            }
        }

        for (i, &he) in self.edges.iter().enumerate() {
            if self.edge_of(he).index() != i {
                return false;
            }
        }

        self.faces.iter().all(|f| f.halfedge.is_valid())
    }
}

/// Iterator over outgoing half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, v: VertexId<I>) -> Self {
        let start = mesh.vertex(v).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // he: v -> w, twin: w -> v, next(twin): v -> x in the following face.
        let next = self.mesh.next(self.mesh.twin(self.current));
        if !next.is_valid() || next == self.start {
            self.done = true;
        } else {
            self.current = next;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;

    fn two_triangles() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::<u32>::with_capacity(0, 0);
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_edges(), 0);
        assert!(mesh.is_valid());
        assert!(mesh.bounding_box().is_none());
    }

    #[test]
    fn test_edge_table() {
        let mesh = two_triangles();
        assert_eq!(mesh.num_edges(), 5);
        assert!(mesh.is_valid());

        let boundary = mesh.edge_ids().filter(|&e| mesh.is_boundary_edge(e)).count();
        assert_eq!(boundary, 4);

        for e in mesh.edge_ids() {
            let [f0, f1] = mesh.edge_faces(e);
            assert!(f0.is_valid());
            assert_eq!(f1.is_valid(), !mesh.is_boundary_edge(e));
        }
    }

    #[test]
    fn test_face_edges_follow_corners() {
        let mesh = two_triangles();
        let f = FaceId::new(0);
        let corners = mesh.face_triangle(f);
        for (i, e) in mesh.face_edges(f).iter().enumerate() {
            let [a, b] = mesh.edge_vertices(*e);
            let expected = [corners[i], corners[(i + 1) % 3]];
            assert!((a == expected[0] && b == expected[1]) || (a == expected[1] && b == expected[0]));
        }
    }

    #[test]
    fn test_angles() {
        let mesh = two_triangles();
        // Vertex 0 sees a right angle split by the diagonal.
        assert!((mesh.angle_sum(VertexId::new(0)) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((mesh.corner_angle(FaceId::new(0), 1) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(mesh.euler_characteristic(), 1);
    }

    #[test]
    fn test_degenerate_normal_is_zero() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        let f = FaceId::new(0);
        assert!(mesh.face_area(f) <= DEGENERATE_AREA);
        assert_eq!(mesh.face_normal(f), Vector3::zeros());
    }

    #[test]
    fn test_find_halfedge() {
        let mesh = two_triangles();
        let he = mesh.find_halfedge(VertexId::new(0), VertexId::new(2)).unwrap();
        assert_eq!(mesh.dest(he), VertexId::new(2));
        assert!(mesh.find_halfedge(VertexId::new(1), VertexId::new(3)).is_none());
    }
}
