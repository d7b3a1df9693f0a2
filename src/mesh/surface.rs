//! Surface mesh with boundary curve classification.
//!
//! [`SurfaceMesh`] is the view of the input surface that the layout pipeline
//! consumes: the half-edge connectivity plus a classification of every vertex
//! (interior, on a curve, or a corner) and the ordered boundary curves, both
//! the true boundary loops and any embedded feature curves added by the caller.

use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::PI;

use nalgebra::Point3;

use super::builder::build_from_triangles;
use super::halfedge::HalfEdgeMesh;
use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{LayoutError, Result};

/// Turning angle above which a boundary vertex splits two curves.
pub const DEFAULT_FEATURE_ANGLE: f64 = PI / 6.0;

/// Classification of a vertex with respect to the boundary curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexClass {
    /// Not on any curve.
    Interior,
    /// In the interior of the given curve.
    Curve(usize),
    /// Endpoint of one or more curves.
    Corner,
}

/// An ordered chain of mesh vertices along the boundary or an embedded curve.
///
/// Curves on the true boundary are oriented so that the surface lies on
/// their left. A periodic curve repeats its first vertex at the end.
#[derive(Debug, Clone)]
pub struct BoundaryCurve<I: MeshIndex = u32> {
    vertices: Vec<VertexId<I>>,
    periodic: bool,
    internal: bool,
    /// Cumulative arc length at each vertex.
    arc_length: Vec<f64>,
}

impl<I: MeshIndex> BoundaryCurve<I> {
    fn new(mesh: &HalfEdgeMesh<I>, vertices: Vec<VertexId<I>>, internal: bool) -> Self {
        let periodic = vertices.len() > 2 && vertices.first() == vertices.last();
        let mut arc_length = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        arc_length.push(0.0);
        for w in vertices.windows(2) {
            total += (mesh.position(w[1]) - mesh.position(w[0])).norm();
            arc_length.push(total);
        }
        Self {
            vertices,
            periodic,
            internal,
            arc_length,
        }
    }

    /// The vertex chain.
    pub fn vertices(&self) -> &[VertexId<I>] {
        &self.vertices
    }

    /// Whether the curve is a closed loop with no corner on it.
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Whether the curve is embedded in the surface rather than on its boundary.
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Total arc length.
    pub fn length(&self) -> f64 {
        self.arc_length.last().copied().unwrap_or(0.0)
    }

    /// Number of edge segments.
    pub fn num_segments(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }
}

/// A triangle surface with classified boundary curves.
#[derive(Debug, Clone)]
pub struct SurfaceMesh<I: MeshIndex = u32> {
    mesh: HalfEdgeMesh<I>,
    classes: Vec<VertexClass>,
    curves: Vec<BoundaryCurve<I>>,
    edge_curve: Vec<Option<usize>>,
    dropped_faces: Vec<usize>,
    feature_angle: f64,
}

/// A connected component of a surface, with maps back to the parent surface.
#[derive(Debug, Clone)]
pub struct Component<I: MeshIndex = u32> {
    /// The component as a standalone surface.
    pub surface: SurfaceMesh<I>,
    /// Parent vertex of each component vertex.
    pub vertex_map: Vec<VertexId<I>>,
    /// Parent face of each component face.
    pub face_map: Vec<FaceId<I>>,
}

impl<I: MeshIndex> SurfaceMesh<I> {
    /// Build a surface from an indexed triangle list.
    ///
    /// Faces that would make an edge non-manifold (a third face on an edge, or
    /// a second face traversing an edge in the same direction) and faces with
    /// repeated indices are dropped with a warning instead of failing. Their
    /// input indices are available through [`dropped_faces`](Self::dropped_faces).
    pub fn from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<Self> {
        Self::from_triangles_with_angle(vertices, faces, DEFAULT_FEATURE_ANGLE)
    }

    /// Like [`from_triangles`](Self::from_triangles) with an explicit corner threshold.
    pub fn from_triangles_with_angle(
        vertices: &[Point3<f64>],
        faces: &[[usize; 3]],
        feature_angle: f64,
    ) -> Result<Self> {
        let mut directed: HashSet<(usize, usize)> = HashSet::with_capacity(faces.len() * 3);
        let mut undirected: HashMap<(usize, usize), u8> = HashMap::with_capacity(faces.len() * 2);
        let mut kept = Vec::with_capacity(faces.len());
        let mut dropped = Vec::new();

        for (fi, face) in faces.iter().enumerate() {
            let repeated = face[0] == face[1] || face[1] == face[2] || face[0] == face[2];
            let conflict = (0..3).any(|k| {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                directed.contains(&(a, b)) || undirected.get(&(a.min(b), a.max(b))).copied().unwrap_or(0) >= 2
            });
            if repeated || conflict {
                log::warn!("dropping face {} ({:?}): non-manifold or repeated vertex", fi, face);
                dropped.push(fi);
                continue;
            }
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                directed.insert((a, b));
                *undirected.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
            kept.push(*face);
        }

        let mesh = build_from_triangles(vertices, &kept)?;
        let mut surface = Self::from_mesh(mesh, feature_angle);
        surface.dropped_faces = dropped;
        Ok(surface)
    }

    /// Classify the boundary of an existing half-edge mesh.
    pub fn from_mesh(mesh: HalfEdgeMesh<I>, feature_angle: f64) -> Self {
        let mut surface = Self {
            classes: vec![VertexClass::Interior; mesh.num_vertices()],
            curves: Vec::new(),
            edge_curve: vec![None; mesh.num_edges()],
            dropped_faces: Vec::new(),
            feature_angle,
            mesh,
        };
        surface.detect_boundary_curves();
        surface
    }

    fn detect_boundary_curves(&mut self) {
        let mesh = &self.mesh;
        let mut visited = vec![false; mesh.num_halfedges()];
        let mut loops: Vec<Vec<VertexId<I>>> = Vec::new();

        for start in mesh.halfedge_ids() {
            if !mesh.is_boundary_halfedge(start) || visited[start.index()] {
                continue;
            }
            let mut chain = Vec::new();
            let mut he = start;
            while he.is_valid() && !visited[he.index()] {
                visited[he.index()] = true;
                chain.push(mesh.origin(he));
                he = mesh.next(he);
            }
            // Boundary half-edges run against the faces; flip so the surface is on the left.
            chain.reverse();
            loops.push(chain);
        }

        for chain in loops {
            let corners: Vec<usize> = chain
                .iter()
                .enumerate()
                .filter(|(_, &v)| (PI - self.mesh.angle_sum(v)).abs() > self.feature_angle)
                .map(|(i, _)| i)
                .collect();

            if corners.is_empty() {
                let mut vertices = chain.clone();
                vertices.push(chain[0]);
                self.push_curve(vertices, false);
                continue;
            }

            let n = chain.len();
            for (k, &c) in corners.iter().enumerate() {
                let end = corners[(k + 1) % corners.len()];
                let span = if end > c { end - c } else { end + n - c };
                let vertices: Vec<VertexId<I>> = (0..=span).map(|i| chain[(c + i) % n]).collect();
                self.push_curve(vertices, false);
            }
            for &c in &corners {
                self.classes[chain[c].index()] = VertexClass::Corner;
            }
        }
    }

    fn push_curve(&mut self, vertices: Vec<VertexId<I>>, internal: bool) -> usize {
        let id = self.curves.len();
        for w in vertices.windows(2) {
            if let Some(he) = self.mesh.find_halfedge(w[0], w[1]) {
                self.edge_curve[self.mesh.edge_of(he).index()] = Some(id);
            }
        }
        let periodic = vertices.len() > 2 && vertices.first() == vertices.last();
        for (i, &v) in vertices.iter().enumerate() {
            let endpoint = !periodic && (i == 0 || i + 1 == vertices.len());
            let class = &mut self.classes[v.index()];
            *class = match *class {
                VertexClass::Corner => VertexClass::Corner,
                _ if endpoint => VertexClass::Corner,
                VertexClass::Interior => VertexClass::Curve(id),
                VertexClass::Curve(other) if other == id => VertexClass::Curve(id),
                VertexClass::Curve(_) => VertexClass::Corner,
            };
        }
        self.curves.push(BoundaryCurve::new(&self.mesh, vertices, internal));
        id
    }

    /// Embed a feature curve given as a chain of vertex indices.
    ///
    /// Consecutive vertices must share an interior mesh edge. A chain whose
    /// first and last vertex coincide is a closed curve. Returns the curve id.
    pub fn add_internal_curve(&mut self, chain: &[usize]) -> Result<usize> {
        let id = self.curves.len();
        if chain.len() < 2 {
            return Err(LayoutError::invalid_param("curve", chain.len(), "needs at least two vertices"));
        }
        for w in chain.windows(2) {
            if w[0] >= self.mesh.num_vertices() || w[1] >= self.mesh.num_vertices() {
                return Err(LayoutError::BrokenCurve { curve: id, v0: w[0], v1: w[1] });
            }
            let he = self
                .mesh
                .find_halfedge(VertexId::new(w[0]), VertexId::new(w[1]))
                .ok_or(LayoutError::BrokenCurve { curve: id, v0: w[0], v1: w[1] })?;
            let e = self.mesh.edge_of(he);
            if self.mesh.is_boundary_edge(e) || self.edge_curve[e.index()].is_some() {
                return Err(LayoutError::BrokenCurve { curve: id, v0: w[0], v1: w[1] });
            }
        }
        let vertices = chain.iter().map(|&v| VertexId::new(v)).collect();
        Ok(self.push_curve(vertices, true))
    }

    // ==================== Accessors ====================

    /// The underlying half-edge mesh.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh<I> {
        &self.mesh
    }

    /// Classification of a vertex.
    #[inline]
    pub fn vertex_class(&self, v: VertexId<I>) -> VertexClass {
        self.classes[v.index()]
    }

    /// Whether a vertex is a curve endpoint.
    #[inline]
    pub fn is_corner(&self, v: VertexId<I>) -> bool {
        self.classes[v.index()] == VertexClass::Corner
    }

    /// All curves, boundary loops first.
    pub fn curves(&self) -> &[BoundaryCurve<I>] {
        &self.curves
    }

    /// A single curve.
    pub fn curve(&self, id: usize) -> &BoundaryCurve<I> {
        &self.curves[id]
    }

    /// The curve an edge belongs to, if any.
    #[inline]
    pub fn edge_curve(&self, e: EdgeId<I>) -> Option<usize> {
        self.edge_curve[e.index()]
    }

    /// Whether an edge lies on an embedded (internal) curve.
    pub fn is_internal_curve_edge(&self, e: EdgeId<I>) -> bool {
        self.edge_curve(e).map_or(false, |c| self.curves[c].internal)
    }

    /// Input indices of the faces dropped during construction.
    pub fn dropped_faces(&self) -> &[usize] {
        &self.dropped_faces
    }

    /// Corner threshold used for boundary curve detection.
    pub fn feature_angle(&self) -> f64 {
        self.feature_angle
    }

    /// Euler characteristic V - E + F.
    pub fn euler_characteristic(&self) -> i64 {
        self.mesh.euler_characteristic()
    }

    /// Arc-length parameter of the point of `curve` closest to `point`.
    pub fn curve_parameter(&self, curve: usize, point: &Point3<f64>) -> f64 {
        let c = &self.curves[curve];
        let mut best = (f64::INFINITY, 0.0);
        for (i, w) in c.vertices.windows(2).enumerate() {
            let a = self.mesh.position(w[0]);
            let b = self.mesh.position(w[1]);
            let ab = b - a;
            let len_sq = ab.norm_squared();
            let t = if len_sq > 0.0 {
                ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let dist = (point - (a + ab * t)).norm();
            if dist < best.0 {
                best = (dist, c.arc_length[i] + t * (c.arc_length[i + 1] - c.arc_length[i]));
            }
        }
        best.1
    }

    // ==================== Components ====================

    /// Face sets of the connected components, in order of their lowest face.
    pub fn component_faces(&self) -> Vec<Vec<FaceId<I>>> {
        let mesh = &self.mesh;
        let mut label = vec![usize::MAX; mesh.num_faces()];
        let mut components = Vec::new();

        for seed in mesh.face_ids() {
            if label[seed.index()] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut faces = Vec::new();
            let mut queue = VecDeque::from([seed]);
            label[seed.index()] = id;
            while let Some(f) = queue.pop_front() {
                faces.push(f);
                for he in mesh.face_halfedges(f) {
                    let g = mesh.opposite_face(he);
                    if g.is_valid() && label[g.index()] == usize::MAX {
                        label[g.index()] = id;
                        queue.push_back(g);
                    }
                }
            }
            components.push(faces);
        }
        components
    }

    /// Split the surface into connected components.
    ///
    /// Internal curves are carried over to the component holding them.
    pub fn components(&self) -> Result<Vec<Component<I>>> {
        let face_sets = self.component_faces();
        if face_sets.len() == 1 {
            return Ok(vec![Component {
                surface: self.clone(),
                vertex_map: self.mesh.vertex_ids().collect(),
                face_map: self.mesh.face_ids().collect(),
            }]);
        }

        let mut out = Vec::with_capacity(face_sets.len());
        for faces in face_sets {
            let mut local: HashMap<VertexId<I>, usize> = HashMap::new();
            let mut vertex_map = Vec::new();
            let mut positions = Vec::new();
            let mut triangles = Vec::with_capacity(faces.len());
            for &f in &faces {
                let tri = self.mesh.face_triangle(f).map(|v| {
                    *local.entry(v).or_insert_with(|| {
                        vertex_map.push(v);
                        positions.push(*self.mesh.position(v));
                        vertex_map.len() - 1
                    })
                });
                triangles.push(tri);
            }

            let mesh = build_from_triangles(&positions, &triangles)?;
            let mut surface = SurfaceMesh::from_mesh(mesh, self.feature_angle);
            for curve in self.curves.iter().filter(|c| c.internal) {
                let chain: Option<Vec<usize>> = curve.vertices.iter().map(|v| local.get(v).copied()).collect();
                if let Some(chain) = chain {
                    surface.add_internal_curve(&chain)?;
                }
            }
            out.push(Component {
                surface,
                vertex_map,
                face_map: faces,
            });
        }
        Ok(out)
    }

    /// The outgoing half-edges of a vertex in counter-clockwise order.
    ///
    /// For a boundary vertex the fan starts at the interior half-edge lying on
    /// the boundary and ends at the last interior half-edge before the
    /// boundary closes it; boundary half-edges are omitted.
    pub fn ccw_fan(&self, v: VertexId<I>) -> Vec<HalfEdgeId<I>> {
        let mut fan: Vec<HalfEdgeId<I>> = self
            .mesh
            .vertex_halfedges(v)
            .filter(|&he| !self.mesh.is_boundary_halfedge(he))
            .collect();
        fan.reverse();
        fan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures;

    #[test]
    fn test_square_has_four_corners() {
        let surface = fixtures::grid(4);
        let corners = surface.mesh().vertex_ids().filter(|&v| surface.is_corner(v)).count();
        assert_eq!(corners, 4);
        assert_eq!(surface.curves().len(), 4);
        for c in surface.curves() {
            assert_eq!(c.num_segments(), 4);
            assert!(!c.is_periodic());
            assert!((c.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_boundary_orientation_keeps_surface_left() {
        let surface = fixtures::grid(2);
        let mesh = surface.mesh();
        for curve in surface.curves() {
            for w in curve.vertices().windows(2) {
                let he = mesh.find_halfedge(w[0], w[1]).unwrap();
                assert!(!mesh.is_boundary_halfedge(he));
            }
        }
    }

    #[test]
    fn test_closed_surface_has_no_curves() {
        let surface = fixtures::icosphere(1);
        assert!(surface.curves().is_empty());
        assert_eq!(surface.euler_characteristic(), 2);
        assert!(surface
            .mesh()
            .vertex_ids()
            .all(|v| surface.vertex_class(v) == VertexClass::Interior));
    }

    #[test]
    fn test_disk_boundary_is_periodic() {
        let surface = fixtures::disk(16, 3);
        assert_eq!(surface.curves().len(), 1);
        let curve = surface.curve(0);
        assert!(curve.is_periodic());
        assert_eq!(curve.num_segments(), 16);
    }

    #[test]
    fn test_curve_parameter() {
        let surface = fixtures::grid(4);
        let mesh = surface.mesh();
        // Find the curve starting at the origin.
        let id = surface
            .curves()
            .iter()
            .position(|c| mesh.position(c.vertices()[0]).coords.norm() < 1e-12)
            .unwrap();
        let t = surface.curve_parameter(id, &Point3::new(0.3, -0.1, 0.0));
        assert!((t - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_non_manifold_face_dropped() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        // The third face is a third wing on edge (0, 1).
        let faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let surface: SurfaceMesh = SurfaceMesh::from_triangles(&vertices, &faces).unwrap();
        assert_eq!(surface.dropped_faces(), &[2]);
        assert_eq!(surface.mesh().num_faces(), 2);
    }

    #[test]
    fn test_internal_curve() {
        let mut surface = fixtures::grid(4);
        // Middle row, vertices (0..=4, 2).
        let chain: Vec<usize> = (0..=4).map(|i| 2 * 5 + i).collect();
        // The chain ends on the boundary; its interior part is embedded.
        let interior = &chain[1..4];
        let id = surface.add_internal_curve(interior).unwrap();
        assert!(surface.curve(id).is_internal());
        assert!(surface.is_corner(VertexId::new(interior[0])));
        assert_eq!(surface.vertex_class(VertexId::new(interior[1])), VertexClass::Curve(id));

        let err = surface.add_internal_curve(&[0, 12]).unwrap_err();
        assert!(matches!(err, LayoutError::BrokenCurve { .. }));
    }

    #[test]
    fn test_components() {
        let surface = fixtures::two_squares();
        let parts = surface.components().unwrap();
        assert_eq!(parts.len(), 2);
        let total: usize = parts.iter().map(|c| c.surface.mesh().num_faces()).sum();
        assert_eq!(total, surface.mesh().num_faces());
        for part in &parts {
            for (local, parent) in part.vertex_map.iter().enumerate() {
                let p = part.surface.mesh().position(VertexId::new(local));
                assert_eq!(p, surface.mesh().position(*parent));
            }
        }
    }

    #[test]
    fn test_ccw_fan_order() {
        let surface = fixtures::grid(2);
        let mesh = surface.mesh();
        let center = VertexId::new(4);
        let fan = surface.ccw_fan(center);
        assert_eq!(fan.len(), mesh.vertex_halfedges(center).count());
        // Consecutive CCW half-edges enclose the face of the earlier one.
        for i in 0..fan.len() {
            let a = fan[i];
            let b = fan[(i + 1) % fan.len()];
            assert_eq!(mesh.twin(mesh.prev(a)), b);
        }
    }
}
