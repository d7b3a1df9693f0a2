//! Cross field computation.
//!
//! A cross field assigns every point of the surface four directions related
//! by quarter turns. It is stored per edge as one [`EdgeCross`]: a tangent
//! frame built on the edge and an angle `theta` measured from the edge
//! direction, meaningful modulo `pi/2`.
//!
//! Measuring the angle from the edge makes transport between adjacent
//! triangles exact: unfolding two triangles around their shared edge
//! preserves angles to that edge. Within one triangle, the angle of a
//! neighbouring edge's cross is moved into this edge's reference by the
//! difference of the two edge directions in the triangle's plane.
//!
//! # Algorithms
//!
//! - **Relaxation**: every free edge is repeatedly moved to the circular mean of
//!   its transported neighbours. The mean is taken over `4 theta`, which picks
//!   the best-aligned of the four rotations of each neighbour.
//! - **Heat diffusion**: a few implicit steps of the connection Laplacian on
//!   `exp(4 i theta)` with renormalization, then relaxation polishes the result.
//!
//! Boundary and feature-curve edges are fixed at `theta = 0`, aligned with
//! the curve. Zero-length edges are flagged invalid and left out.

use nalgebra::{DVector, Matrix3, Vector3};
use rayon::prelude::*;

use super::diagnostics::{Diagnostics, IssueKind};
use super::geometry::{face_frames, wrap_quarter, FaceFrame};
use super::options::{CrossFieldMethod, LayoutOptions};
use super::sparse::{conjugate_gradient, CsrMatrix};
use crate::mesh::{EdgeId, FaceId, HalfEdgeMesh, MeshIndex, SurfaceMesh};

/// A neighbouring edge and the transport offset into this edge's reference.
///
/// The neighbour's cross seen from this edge has angle `theta_neighbor + offset`.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<I: MeshIndex = u32> {
    /// The neighbouring edge.
    pub edge: EdgeId<I>,
    /// Angle to add when transporting the neighbour's cross.
    pub offset: f64,
}

/// Cross field state of one mesh edge.
#[derive(Debug, Clone)]
pub struct EdgeCross<I: MeshIndex = u32> {
    /// Unit direction of the canonical half-edge.
    pub tangent: Vector3<f64>,
    /// `normal × tangent`.
    pub cotangent: Vector3<f64>,
    /// Average normal of the adjacent faces.
    pub normal: Vector3<f64>,
    /// Cross angle from `tangent`, modulo `pi/2`.
    pub theta: f64,
    /// The other edges of the adjacent triangles.
    pub neighbors: [Option<Neighbor<I>>; 4],
    /// Edge lies on the surface boundary.
    pub on_boundary: bool,
    /// Edge belongs to the cut graph.
    pub on_cut_graph: bool,
    /// Edge lies on an embedded feature curve.
    pub on_internal_boundary: bool,
    /// False for zero-length edges and edges without a valid adjacent face.
    pub valid: bool,
}

impl<I: MeshIndex> EdgeCross<I> {
    /// Whether the angle is locked to the edge.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.on_boundary || self.on_internal_boundary
    }

    /// One of the four cross directions in 3D.
    pub fn direction(&self) -> Vector3<f64> {
        self.tangent * self.theta.cos() + self.cotangent * self.theta.sin()
    }

    fn neighbors(&self) -> impl Iterator<Item = &Neighbor<I>> {
        self.neighbors.iter().flatten()
    }
}

/// A cross field over the edges of a surface.
#[derive(Debug, Clone)]
pub struct CrossField<I: MeshIndex = u32> {
    edges: Vec<EdgeCross<I>>,
    frames: Vec<FaceFrame>,
    /// Polar angle of each face edge's canonical direction in the face frame.
    edge_angles: Vec<[f64; 3]>,
    sweeps: usize,
    residual: f64,
    converged: bool,
}

impl<I: MeshIndex> CrossField<I> {
    /// Build frames and neighbour sets; all angles start at zero.
    pub fn new(surface: &SurfaceMesh<I>, diagnostics: &mut Diagnostics) -> Self {
        let mesh = surface.mesh();
        let frames = face_frames(mesh);
        let min_length = 1e-10 * mesh.mean_edge_length().max(f64::MIN_POSITIVE);

        let degenerate_faces = frames.iter().filter(|f| !f.valid).count();
        if degenerate_faces > 0 {
            diagnostics.warn(
                IssueKind::Degeneracy,
                format!("{} zero-area faces excluded from the cross field", degenerate_faces),
            );
        }

        let edge_angles: Vec<[f64; 3]> = mesh
            .face_ids()
            .map(|f| {
                let frame = &frames[f.index()];
                mesh.face_edges(f)
                    .map(|e| frame.angle_of(&mesh.edge_vector(mesh.edge_halfedge(e))))
            })
            .collect();

        let mut edges: Vec<EdgeCross<I>> = Vec::with_capacity(mesh.num_edges());
        for e in mesh.edge_ids() {
            let vector = mesh.edge_vector(mesh.edge_halfedge(e));
            let length = vector.norm();
            let mut normal = Vector3::zeros();
            for f in mesh.edge_faces(e) {
                if f.is_valid() && frames[f.index()].valid {
                    normal += frames[f.index()].n;
                }
            }
            let valid = length > min_length && normal.norm() > 1e-12;
            if length <= min_length {
                let [a, b] = mesh.edge_vertices(e);
                diagnostics.warn(
                    IssueKind::Degeneracy,
                    format!("edge {} ({}, {}) has zero length and is excluded", e.index(), a.index(), b.index()),
                );
            }

            let (tangent, normal) = if valid {
                (vector / length, normal.normalize())
            } else {
                (Vector3::x(), Vector3::z())
            };
            edges.push(EdgeCross {
                tangent,
                cotangent: normal.cross(&tangent),
                normal,
                theta: 0.0,
                neighbors: [None; 4],
                on_boundary: mesh.is_boundary_edge(e),
                on_cut_graph: false,
                on_internal_boundary: surface.is_internal_curve_edge(e),
                valid,
            });
        }

        for f in mesh.face_ids() {
            if !frames[f.index()].valid {
                continue;
            }
            let fe = mesh.face_edges(f);
            for k in 0..3 {
                if !edges[fe[k].index()].valid {
                    continue;
                }
                for j in [(k + 1) % 3, (k + 2) % 3] {
                    if !edges[fe[j].index()].valid {
                        continue;
                    }
                    let neighbor = Neighbor {
                        edge: fe[j],
                        offset: edge_angles[f.index()][j] - edge_angles[f.index()][k],
                    };
                    if let Some(slot) = edges[fe[k].index()].neighbors.iter_mut().find(|s| s.is_none()) {
                        *slot = Some(neighbor);
                    }
                }
            }
        }

        Self {
            edges,
            frames,
            edge_angles,
            sweeps: 0,
            residual: 0.0,
            converged: false,
        }
    }

    // ==================== Accessors ====================

    /// Per-edge cross data.
    pub fn edges(&self) -> &[EdgeCross<I>] {
        &self.edges
    }

    /// Cross data of one edge.
    #[inline]
    pub fn edge(&self, e: EdgeId<I>) -> &EdgeCross<I> {
        &self.edges[e.index()]
    }

    /// Mutable cross data of one edge.
    #[inline]
    pub fn edge_mut(&mut self, e: EdgeId<I>) -> &mut EdgeCross<I> {
        &mut self.edges[e.index()]
    }

    /// Angle of one edge's cross.
    #[inline]
    pub fn theta(&self, e: EdgeId<I>) -> f64 {
        self.edges[e.index()].theta
    }

    /// Tangent frame of a face.
    #[inline]
    pub fn frame(&self, f: FaceId<I>) -> &FaceFrame {
        &self.frames[f.index()]
    }

    /// Polar angle, in the frame of `f`, of the canonical direction of its `k`-th edge.
    #[inline]
    pub fn edge_angle(&self, f: FaceId<I>, k: usize) -> f64 {
        self.edge_angles[f.index()][k]
    }

    /// Relaxation sweeps performed so far.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Largest angle change in the last sweep.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Whether the last relaxation met the tolerance.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Cross angle in the frame of face `f`, in `(-pi/4, pi/4]`.
    ///
    /// Averages the crosses of the face's valid edges. `None` for a
    /// degenerate face.
    pub fn face_angle(&self, mesh: &HalfEdgeMesh<I>, f: FaceId<I>) -> Option<f64> {
        if !self.frames[f.index()].valid {
            return None;
        }
        let mut first = None;
        let (mut c, mut s) = (0.0, 0.0);
        for (k, e) in mesh.face_edges(f).iter().enumerate() {
            let edge = &self.edges[e.index()];
            if !edge.valid {
                continue;
            }
            let a = self.edge_angles[f.index()][k] + edge.theta;
            first.get_or_insert(a);
            c += (4.0 * a).cos();
            s += (4.0 * a).sin();
        }
        if c * c + s * s > 1e-24 {
            Some(0.25 * s.atan2(c))
        } else {
            first.map(wrap_quarter)
        }
    }

    /// [`face_angle`](Self::face_angle) for every face.
    pub fn face_angles(&self, mesh: &HalfEdgeMesh<I>) -> Vec<Option<f64>> {
        mesh.face_ids().map(|f| self.face_angle(mesh, f)).collect()
    }

    // ==================== Initialization ====================

    /// Seed angles from the principal curvature directions, falling back to
    /// a global axis where the surface is flat or umbilic, then propagate the
    /// boundary direction `layers` rings inward.
    pub fn initialize(&mut self, mesh: &HalfEdgeMesh<I>, layers: usize) {
        let principal = self.principal_angles(mesh);
        for (edge, principal) in self.edges.iter_mut().zip(principal) {
            if !edge.valid || edge.is_fixed() {
                edge.theta = 0.0;
                continue;
            }
            edge.theta = match principal {
                Some(theta) => theta,
                None => {
                    // Project a global axis, avoiding one close to the normal.
                    let axis = if edge.normal.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
                    wrap_quarter(axis.dot(&edge.cotangent).atan2(axis.dot(&edge.tangent)))
                }
            };
        }

        let mut seeded: Vec<bool> = self.edges.iter().map(|e| e.valid && e.is_fixed()).collect();
        for _ in 0..layers {
            let frontier: Vec<(usize, f64)> = (0..self.edges.len())
                .filter(|&i| self.edges[i].valid && !seeded[i])
                .filter_map(|i| {
                    let (c, s) = self.edges[i]
                        .neighbors()
                        .filter(|n| seeded[n.edge.index()])
                        .fold((0.0, 0.0), |(c, s), n| {
                            let a = 4.0 * (self.edges[n.edge.index()].theta + n.offset);
                            (c + a.cos(), s + a.sin())
                        });
                    (c * c + s * s > 1e-24).then(|| (i, 0.25 * s.atan2(c)))
                })
                .collect();
            if frontier.is_empty() {
                break;
            }
            for (i, theta) in frontier {
                self.edges[i].theta = theta;
                seeded[i] = true;
            }
        }
    }

    /// Angle of a principal curvature direction at each edge, from the
    /// bending tensor `sum beta |e| e e^T` over the edges of the adjacent
    /// faces. `None` where the tensor is too isotropic to pick a direction.
    fn principal_angles(&self, mesh: &HalfEdgeMesh<I>) -> Vec<Option<f64>> {
        let bending: Vec<Matrix3<f64>> = mesh
            .edge_ids()
            .map(|e| {
                let [f0, f1] = mesh.edge_faces(e);
                if !(f0.is_valid() && f1.is_valid()) {
                    return Matrix3::zeros();
                }
                let (n0, n1) = (&self.frames[f0.index()], &self.frames[f1.index()]);
                if !(n0.valid && n1.valid) || !self.edges[e.index()].valid {
                    return Matrix3::zeros();
                }
                let vector = mesh.edge_vector(mesh.edge_halfedge(e));
                let dir = vector.normalize();
                let beta = n0.n.cross(&n1.n).dot(&dir).atan2(n0.n.dot(&n1.n));
                dir * dir.transpose() * (beta * vector.norm())
            })
            .collect();

        mesh.edge_ids()
            .map(|e| {
                let edge = &self.edges[e.index()];
                if !edge.valid {
                    return None;
                }
                let mut tensor = bending[e.index()] * 0.5;
                for f in mesh.edge_faces(e) {
                    if f.is_valid() {
                        for k in mesh.face_edges(f) {
                            tensor += bending[k.index()] * 0.5;
                        }
                    }
                }
                let a = edge.tangent.dot(&(tensor * edge.tangent));
                let b = edge.tangent.dot(&(tensor * edge.cotangent));
                let c = edge.cotangent.dot(&(tensor * edge.cotangent));
                let spread = ((a - c).powi(2) + 4.0 * b * b).sqrt();
                let mean = 0.5 * (a + c);
                let scale = (mean + 0.5 * spread).abs() + (mean - 0.5 * spread).abs();
                (spread > 1e-12 && spread > 0.25 * scale).then(|| wrap_quarter(0.5 * (2.0 * b).atan2(a - c)))
            })
            .collect()
    }

    // ==================== Relaxation ====================

    /// One Jacobi sweep; returns the largest angle change.
    fn sweep(&mut self, parallel: bool) -> f64 {
        let old: Vec<f64> = self.edges.iter().map(|e| e.theta).collect();
        let edges = &self.edges;
        let update = |i: usize| -> f64 {
            let edge = &edges[i];
            if !edge.valid || edge.is_fixed() {
                return old[i];
            }
            let (mut c, mut s) = ((4.0 * old[i]).cos(), (4.0 * old[i]).sin());
            for n in edge.neighbors() {
                let a = 4.0 * (old[n.edge.index()] + n.offset);
                c += a.cos();
                s += a.sin();
            }
            if c * c + s * s < 1e-24 {
                old[i]
            } else {
                0.25 * s.atan2(c)
            }
        };

        let new: Vec<f64> = if parallel {
            (0..edges.len()).into_par_iter().map(&update).collect()
        } else {
            (0..edges.len()).map(&update).collect()
        };

        let mut residual: f64 = 0.0;
        for (edge, (theta, prev)) in self.edges.iter_mut().zip(new.into_iter().zip(old)) {
            residual = residual.max(wrap_quarter(theta - prev).abs());
            edge.theta = theta;
        }
        residual
    }

    /// Relax until no angle moves by more than `convergence_tol`, or the sweep cap.
    pub fn relax(&mut self, options: &LayoutOptions, diagnostics: &mut Diagnostics) {
        self.converged = false;
        for _ in 0..options.max_relaxation_sweeps {
            self.residual = self.sweep(options.parallel);
            self.sweeps += 1;
            if self.residual < options.convergence_tol {
                self.converged = true;
                break;
            }
        }
        if !self.converged {
            diagnostics.warn(
                IssueKind::IterationCap,
                format!(
                    "cross field relaxation stopped after {} sweeps with residual {:.3e}",
                    options.max_relaxation_sweeps, self.residual
                ),
            );
        }
        log::debug!("cross field: {} sweeps, residual {:.3e}", self.sweeps, self.residual);
    }

    // ==================== Heat Diffusion ====================

    /// Implicit heat steps of the connection Laplacian on `exp(4 i theta)`.
    pub fn diffuse(&mut self, levels: usize, diagnostics: &mut Diagnostics) {
        let free: Vec<usize> = (0..self.edges.len())
            .filter(|&i| self.edges[i].valid && !self.edges[i].is_fixed())
            .collect();
        if free.is_empty() {
            return;
        }
        let mut slot = vec![usize::MAX; self.edges.len()];
        for (k, &i) in free.iter().enumerate() {
            slot[i] = k;
        }

        let n = 2 * free.len();
        let t = (free.len() as f64).sqrt().max(1.0);
        let mut triplets = Vec::with_capacity(n * 9);
        let mut fixed_rhs = DVector::zeros(n);

        for (k, &i) in free.iter().enumerate() {
            triplets.push((2 * k, 2 * k, 1.0));
            triplets.push((2 * k + 1, 2 * k + 1, 1.0));
            for nb in self.edges[i].neighbors() {
                let (c, s) = ((4.0 * nb.offset).cos(), (4.0 * nb.offset).sin());
                triplets.push((2 * k, 2 * k, t));
                triplets.push((2 * k + 1, 2 * k + 1, t));
                let j = nb.edge.index();
                if slot[j] != usize::MAX {
                    let m = slot[j];
                    triplets.extend([
                        (2 * k, 2 * m, -t * c),
                        (2 * k, 2 * m + 1, t * s),
                        (2 * k + 1, 2 * m, -t * s),
                        (2 * k + 1, 2 * m + 1, -t * c),
                    ]);
                } else {
                    // Fixed neighbour: z_j = exp(4 i theta_j), rotated by the offset.
                    let a = 4.0 * (self.edges[j].theta + nb.offset);
                    fixed_rhs[2 * k] += t * a.cos();
                    fixed_rhs[2 * k + 1] += t * a.sin();
                }
            }
        }
        let matrix = CsrMatrix::from_triplets(n, n, triplets);

        let mut z = DVector::from_iterator(
            n,
            free.iter().flat_map(|&i| {
                let a = 4.0 * self.edges[i].theta;
                [a.cos(), a.sin()]
            }),
        );

        for level in 0..levels {
            let rhs = &z + &fixed_rhs;
            match conjugate_gradient(&matrix, &rhs, Some(&z), 10 * n, 1e-10) {
                Ok(next) => z = next,
                Err(err) => {
                    diagnostics.warn(IssueKind::IterationCap, format!("heat diffusion level {}: {}", level, err));
                    break;
                }
            }
            for k in 0..free.len() {
                let norm = z[2 * k].hypot(z[2 * k + 1]);
                if norm > 1e-12 {
                    z[2 * k] /= norm;
                    z[2 * k + 1] /= norm;
                }
            }
        }

        for (k, &i) in free.iter().enumerate() {
            if z[2 * k].hypot(z[2 * k + 1]) > 1e-12 {
                self.edges[i].theta = 0.25 * z[2 * k + 1].atan2(z[2 * k]);
            }
        }
    }
}

/// Compute the cross field of a surface.
///
/// Initializes from the boundary, runs heat diffusion when selected, and
/// relaxes to convergence. Zero-length edges and sweep-cap exhaustion are
/// reported through `diagnostics`.
pub fn compute_cross_field<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    options: &LayoutOptions,
    diagnostics: &mut Diagnostics,
) -> CrossField<I> {
    let mut field = CrossField::new(surface, diagnostics);
    field.initialize(surface.mesh(), options.boundary_expansion_layers);
    if options.cross_field_method == CrossFieldMethod::HeatDiffusion {
        field.diffuse(options.diffusion_levels, diagnostics);
    }
    field.relax(options, diagnostics);
    field
}

/// The representative of angle `a`, modulo quarter turns, closest to `b`.
#[inline]
pub fn closest_rotation(a: f64, b: f64) -> f64 {
    b + wrap_quarter(a - b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{fixtures, VertexId};
    use std::f64::consts::FRAC_PI_2;

    fn solve(surface: &SurfaceMesh, options: &LayoutOptions) -> (CrossField, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let field = compute_cross_field(surface, options, &mut diagnostics);
        (field, diagnostics)
    }

    #[test]
    fn test_neighbor_counts() {
        let surface = fixtures::grid(3);
        let mut diagnostics = Diagnostics::new();
        let field = CrossField::new(&surface, &mut diagnostics);
        for e in surface.mesh().edge_ids() {
            let count = field.edge(e).neighbors().count();
            if surface.mesh().is_boundary_edge(e) {
                assert_eq!(count, 2);
            } else {
                assert_eq!(count, 4);
            }
        }
        assert!(diagnostics.issues().is_empty());
    }

    #[test]
    fn test_flat_square_field_is_axis_aligned() {
        let surface = fixtures::grid(4);
        let (field, diagnostics) = solve(&surface, &LayoutOptions::default());
        assert!(field.is_converged());
        assert!(diagnostics.is_success());

        let mesh = surface.mesh();
        for f in mesh.face_ids() {
            let a = field.face_angle(mesh, f).unwrap();
            let d = field.frame(f).direction(a);
            assert!((d.x * d.y).abs() < 1e-6, "face {:?} direction {:?}", f, d);
        }
    }

    #[test]
    fn test_boundary_edges_stay_aligned() {
        let surface = fixtures::disk(12, 3);
        let (field, _) = solve(&surface, &LayoutOptions::default());
        for e in surface.mesh().edge_ids() {
            if surface.mesh().is_boundary_edge(e) {
                assert_eq!(field.theta(e), 0.0);
            }
        }
    }

    #[test]
    fn test_relaxation_is_idempotent() {
        let surface = fixtures::icosphere(1);
        let options = LayoutOptions::default();
        let (field, _) = solve(&surface, &options);
        assert!(field.is_converged());

        let mut again = field.clone();
        let mut diagnostics = Diagnostics::new();
        again.relax(&options, &mut diagnostics);
        for e in surface.mesh().edge_ids() {
            let change = wrap_quarter(again.theta(e) - field.theta(e)).abs();
            assert!(change <= options.convergence_tol, "edge {:?} moved by {}", e, change);
        }
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let surface = fixtures::disk(10, 3);
        let (a, _) = solve(&surface, &LayoutOptions::default());
        let (b, _) = solve(&surface, &LayoutOptions::default().sequential());
        for e in surface.mesh().edge_ids() {
            assert!((a.theta(e) - b.theta(e)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_heat_diffusion_on_square() {
        let surface = fixtures::grid(4);
        let options = LayoutOptions::default().with_cross_field_method(CrossFieldMethod::HeatDiffusion);
        let (field, diagnostics) = solve(&surface, &options);
        assert!(field.is_converged());
        assert!(diagnostics.is_success());
        let mesh = surface.mesh();
        for f in mesh.face_ids() {
            let d = field.frame(f).direction(field.face_angle(mesh, f).unwrap());
            assert!((d.x * d.y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_zero_length_edge_is_reported() {
        let surface = fixtures::collapsed_edge();
        let (field, diagnostics) = solve(&surface, &LayoutOptions::default());
        assert!(diagnostics.has(IssueKind::Degeneracy));
        assert!(field.edges().iter().any(|e| !e.valid));
        assert!(field.edges().iter().all(|e| e.theta.is_finite()));
    }

    #[test]
    fn test_degenerate_triangle_does_not_panic() {
        let surface = fixtures::degenerate_triangle();
        let (field, diagnostics) = solve(&surface, &LayoutOptions::default());
        assert!(diagnostics.has(IssueKind::Degeneracy));
        assert!(field.face_angle(surface.mesh(), FaceId::new(0)).is_none());
    }

    #[test]
    fn test_sweep_cap_is_reported() {
        let surface = fixtures::icosphere(1);
        let options = LayoutOptions::default().with_max_relaxation_sweeps(1).with_convergence_tol(1e-15);
        let (field, diagnostics) = solve(&surface, &options);
        assert!(!field.is_converged());
        assert_eq!(field.sweeps(), 1);
        assert!(diagnostics.has(IssueKind::IterationCap));
    }

    #[test]
    fn test_torus_seed_follows_principal_directions() {
        let surface = fixtures::torus(16, 8);
        let mesh = surface.mesh();
        let mut diagnostics = Diagnostics::new();
        let mut field = CrossField::new(&surface, &mut diagnostics);
        field.initialize(mesh, 0);
        // Edges along the big circle, vertex (i, j) is i * 8 + j.
        for (i, j) in [(0, 0), (3, 2), (7, 4), (12, 7)] {
            let a = VertexId::new(i * 8 + j);
            let b = VertexId::new(((i + 1) % 16) * 8 + j);
            let e = mesh.edge_of(mesh.find_halfedge(a, b).unwrap());
            assert!(wrap_quarter(field.theta(e)).abs() < 1e-6, "edge {:?}", e);
        }
    }

    #[test]
    fn test_flat_seed_uses_global_axis() {
        let surface = fixtures::grid(3);
        let mut diagnostics = Diagnostics::new();
        let mut field = CrossField::new(&surface, &mut diagnostics);
        assert!(field.principal_angles(surface.mesh()).iter().all(Option::is_none));
        field.initialize(surface.mesh(), 0);
        for edge in field.edges() {
            let d = edge.direction();
            assert!(d.x.abs().max(d.y.abs()) > 1.0 - 1e-9);
        }
    }

    #[test]
    fn test_closest_rotation() {
        let a = closest_rotation(0.1 + 3.0 * FRAC_PI_2, 0.0);
        assert!((a - 0.1).abs() < 1e-12);
        let b = closest_rotation(0.1, FRAC_PI_2);
        assert!((b - (0.1 + FRAC_PI_2)).abs() < 1e-12);
    }
}
