//! Singularity detection.
//!
//! The index of a vertex is read off the cross field around its one-ring.
//! Walking the faces of the fan counter-clockwise, the cross of each face is
//! unfolded into the next face across their shared edge and compared with
//! the cross stored there. The mismatches `j` are quarter-turn-ambiguous and
//! are wrapped into `(-pi/4, pi/4]`. Together with the angle defect `kappa`
//! they add up to a multiple of `pi/2`:
//!
//! ```text
//! q = (kappa + sum j) / (pi / 2)
//! ```
//!
//! `q` is the index in quarter turns. Interior vertices use
//! `kappa = 2 pi - sum alpha`; boundary vertices use `kappa = pi - sum alpha`
//! and add the mismatch between the boundary edges and their first and last
//! face. Each mismatch appears with opposite signs at the two ends of its
//! edge, so the indices of a surface sum to `4 chi`.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Point3;
use rayon::prelude::*;

use super::crossfield::CrossField;
use super::diagnostics::{Diagnostics, IssueKind};
use super::geometry::wrap_quarter;
use super::options::LayoutOptions;
use crate::mesh::{MeshIndex, SurfaceMesh, VertexId};

/// Where a singularity sits relative to the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingularityKind {
    /// On a mesh vertex.
    Vertex,
    /// On an edge whose two vertices were both flagged.
    Edge,
    /// Inside a triangle whose three vertices were all flagged.
    Triangle,
    /// A sharp boundary corner promoted to a singularity.
    Corner,
}

/// A defect of the cross field.
#[derive(Debug, Clone)]
pub struct Singularity<I: MeshIndex = u32> {
    /// Representative vertex; separatrices and cuts start here.
    pub vertex: VertexId<I>,
    /// Location, moved to the simplex centroid for merged singularities.
    pub position: Point3<f64>,
    /// Index in quarter turns.
    pub index: i32,
    /// Placement.
    pub kind: SingularityKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Holonomy {
    Isolated,
    Degenerate,
    Index { q: i32, deviation: f64 },
}

/// Per-vertex indices and the singularities of a cross field.
#[derive(Debug, Clone)]
pub struct Singularities<I: MeshIndex = u32> {
    indices: Vec<Option<i32>>,
    singularities: Vec<Singularity<I>>,
    forced_corners: Vec<VertexId<I>>,
    unreliable: Vec<VertexId<I>>,
    index_sum: i32,
    euler_characteristic: i64,
}

impl<I: MeshIndex> Singularities<I> {
    /// Quarter-turn index of a vertex; zero for skipped vertices.
    #[inline]
    pub fn index(&self, v: VertexId<I>) -> i32 {
        self.indices[v.index()].unwrap_or(0)
    }

    /// Whether the index of a vertex could be computed.
    pub fn is_evaluated(&self, v: VertexId<I>) -> bool {
        self.indices[v.index()].is_some()
    }

    /// Vertices whose holonomy missed a quarter-turn multiple by more than
    /// the singularity tolerance. Their index is kept but may be wrong.
    pub fn unreliable(&self) -> &[VertexId<I>] {
        &self.unreliable
    }

    /// Interior singularities followed by forced corners.
    pub fn singularities(&self) -> &[Singularity<I>] {
        &self.singularities
    }

    /// Boundary corners sharper than the configured threshold.
    pub fn forced_corners(&self) -> &[VertexId<I>] {
        &self.forced_corners
    }

    /// Sum of all vertex indices, in quarter turns.
    pub fn index_sum(&self) -> i32 {
        self.index_sum
    }

    /// Sum of all vertex indices in full turns.
    pub fn index_sum_turns(&self) -> f64 {
        self.index_sum as f64 / 4.0
    }

    /// Euler characteristic of the surface the field lives on.
    pub fn euler_characteristic(&self) -> i64 {
        self.euler_characteristic
    }

    /// Whether the indices add up to the Euler characteristic.
    pub fn is_poincare_hopf_consistent(&self) -> bool {
        i64::from(self.index_sum) == 4 * self.euler_characteristic
    }

    /// Vertices separatrices are traced from: singularities plus every
    /// boundary vertex with a nonzero index.
    pub fn sources(&self, surface: &SurfaceMesh<I>) -> Vec<VertexId<I>> {
        let mesh = surface.mesh();
        let mut sources: Vec<VertexId<I>> = self.singularities.iter().map(|s| s.vertex).collect();
        sources.extend(mesh.vertex_ids().filter(|&v| mesh.is_boundary_vertex(v) && self.index(v) != 0));
        sources.sort();
        sources.dedup();
        sources
    }

    /// Per-vertex flag of the cut graph endpoints: every vertex with a
    /// nonzero index plus every corner.
    pub fn required_vertices(&self, surface: &SurfaceMesh<I>) -> Vec<bool> {
        surface
            .mesh()
            .vertex_ids()
            .map(|v| surface.is_corner(v) || self.index(v) != 0)
            .collect()
    }
}

fn vertex_holonomy<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    field: &CrossField<I>,
    face_angles: &[Option<f64>],
    v: VertexId<I>,
) -> Holonomy {
    let mesh = surface.mesh();
    let fan = surface.ccw_fan(v);
    if fan.is_empty() {
        return Holonomy::Isolated;
    }

    let mut beta = Vec::with_capacity(fan.len());
    let mut alpha = Vec::with_capacity(fan.len());
    for &he in &fan {
        let f = mesh.face_of(he);
        let (Some(a), Some(corner)) = (face_angles[f.index()], mesh.corner_of(f, v)) else {
            return Holonomy::Degenerate;
        };
        beta.push(a - field.frame(f).angle_of(&mesh.edge_vector(he)));
        alpha.push(mesh.corner_angle(f, corner));
    }

    let m = fan.len();
    let boundary = mesh.is_boundary_vertex(v);
    let angle_sum: f64 = alpha.iter().sum();
    let mut total = if boundary { PI - angle_sum } else { 2.0 * PI - angle_sum };
    let pairs = if boundary { m - 1 } else { m };
    for i in 0..pairs {
        let k = (i + 1) % m;
        total += wrap_quarter(beta[k] - (beta[i] - alpha[i]));
    }
    if boundary {
        // Boundary edges carry the cross aligned with themselves.
        total += wrap_quarter(beta[0]);
        total += wrap_quarter(-(beta[m - 1] - alpha[m - 1]));
    }

    let q = (total / FRAC_PI_2).round();
    Holonomy::Index {
        q: q as i32,
        deviation: (total - q * FRAC_PI_2).abs(),
    }
}

/// Turn flagged interior vertex indices into unit singularities.
///
/// Flagged vertices sharing a triangle, then an edge, are resolved together:
/// indices that cancel leave nothing, and a group summing to one quarter turn
/// becomes a single singularity at the simplex centroid. Any vertex still
/// carrying an index yields one singularity per quarter turn; indices beyond
/// one are reported.
fn merge_flagged<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    flagged: &[i32],
    diagnostics: &mut Diagnostics,
) -> Vec<Singularity<I>> {
    let mesh = surface.mesh();
    let mut charge = flagged.to_vec();
    let mut out = Vec::new();
    let mut cancelled = 0;
    let representative = |vertices: &[VertexId<I>], charge: &[i32], sum: i32| {
        vertices
            .iter()
            .copied()
            .filter(|v| charge[v.index()].signum() == sum.signum())
            .min()
            .unwrap_or(vertices[0])
    };

    for f in mesh.face_ids() {
        let tri = mesh.face_triangle(f);
        if tri.iter().any(|v| charge[v.index()] == 0) {
            continue;
        }
        let sum: i32 = tri.iter().map(|v| charge[v.index()]).sum();
        match sum {
            0 => cancelled += 1,
            1 | -1 => out.push(Singularity {
                vertex: representative(&tri, &charge, sum),
                position: mesh.face_centroid(f),
                index: sum,
                kind: SingularityKind::Triangle,
            }),
            _ => continue,
        }
        for v in tri {
            charge[v.index()] = 0;
        }
    }

    for e in mesh.edge_ids() {
        let [a, b] = mesh.edge_vertices(e);
        let (qa, qb) = (charge[a.index()], charge[b.index()]);
        if qa == 0 || qb == 0 {
            continue;
        }
        match qa + qb {
            0 => cancelled += 1,
            sum @ (1 | -1) => out.push(Singularity {
                vertex: representative(&[a, b], &charge, sum),
                position: nalgebra::center(mesh.position(a), mesh.position(b)),
                index: sum,
                kind: SingularityKind::Edge,
            }),
            _ => continue,
        }
        charge[a.index()] = 0;
        charge[b.index()] = 0;
    }

    let mut split = Vec::new();
    for v in mesh.vertex_ids() {
        let q = charge[v.index()];
        if q.abs() > 1 {
            split.push((v.index(), q));
        }
        for _ in 0..q.unsigned_abs() {
            out.push(Singularity {
                vertex: v,
                position: *mesh.position(v),
                index: q.signum(),
                kind: SingularityKind::Vertex,
            });
        }
    }
    if !split.is_empty() {
        diagnostics.warn(
            IssueKind::Topology,
            format!("vertices with index beyond a quarter turn split into unit singularities: {:?}", split),
        );
    }
    if cancelled > 0 {
        log::debug!("singularities: {} flagged groups cancelled out", cancelled);
    }
    out.sort_by_key(|s| s.vertex);
    out
}

/// Locate the singularities of a cross field.
///
/// Vertices next to a degenerate face are skipped with a warning. A failing
/// Poincaré-Hopf check is reported but does not stop the pipeline.
pub fn detect_singularities<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    field: &CrossField<I>,
    options: &LayoutOptions,
    diagnostics: &mut Diagnostics,
) -> Singularities<I> {
    let mesh = surface.mesh();
    let face_angles = field.face_angles(mesh);
    let holonomy = |i: usize| vertex_holonomy(surface, field, &face_angles, VertexId::new(i));
    let results: Vec<Holonomy> = if options.parallel {
        (0..mesh.num_vertices()).into_par_iter().map(holonomy).collect()
    } else {
        (0..mesh.num_vertices()).map(holonomy).collect()
    };

    let mut indices = vec![None; mesh.num_vertices()];
    let mut unreliable = Vec::new();
    let mut worst: f64 = 0.0;
    let mut skipped = 0;
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Holonomy::Isolated => {}
            Holonomy::Degenerate => skipped += 1,
            Holonomy::Index { q, deviation } => {
                if deviation > options.singularity_tolerance {
                    unreliable.push(VertexId::new(i));
                    worst = worst.max(deviation);
                }
                indices[i] = Some(q);
            }
        }
    }
    if !unreliable.is_empty() {
        diagnostics.warn(
            IssueKind::Degeneracy,
            format!(
                "{} vertices have holonomy off a quarter turn by more than {:.3e} rad (worst {:.3e})",
                unreliable.len(),
                options.singularity_tolerance,
                worst
            ),
        );
    }
    if skipped > 0 {
        diagnostics.warn(
            IssueKind::Degeneracy,
            format!("{} vertices next to degenerate faces have no index", skipped),
        );
    }

    let flagged: Vec<i32> = mesh
        .vertex_ids()
        .map(|v| match indices[v.index()] {
            Some(q) if !mesh.is_boundary_vertex(v) => q,
            _ => 0,
        })
        .collect();
    let mut singularities = merge_flagged(surface, &flagged, diagnostics);

    let forced_corners: Vec<VertexId<I>> = mesh
        .vertex_ids()
        .filter(|&v| surface.is_corner(v) && mesh.is_boundary_vertex(v))
        .filter(|&v| mesh.angle_sum(v) < options.sharp_corner_angle)
        .collect();
    singularities.extend(forced_corners.iter().map(|&v| Singularity {
        vertex: v,
        position: *mesh.position(v),
        index: 1,
        kind: SingularityKind::Corner,
    }));

    let index_sum: i32 = indices.iter().flatten().sum();
    let euler_characteristic = surface.euler_characteristic();
    let result = Singularities {
        indices,
        singularities,
        forced_corners,
        unreliable,
        index_sum,
        euler_characteristic,
    };

    if !result.is_poincare_hopf_consistent() {
        diagnostics.warn(
            IssueKind::PoincareHopf,
            format!(
                "singularity indices sum to {} turns, Euler characteristic is {}",
                result.index_sum_turns(),
                euler_characteristic
            ),
        );
    }
    log::debug!(
        "singularities: {} found, {} forced corners, index sum {} turns",
        result.singularities.len(),
        result.forced_corners.len(),
        result.index_sum_turns()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::crossfield::compute_cross_field;
    use crate::mesh::fixtures;

    fn detect(surface: &SurfaceMesh) -> (Singularities, Diagnostics) {
        let options = LayoutOptions::default();
        let mut diagnostics = Diagnostics::new();
        let field = compute_cross_field(surface, &options, &mut diagnostics);
        let sing = detect_singularities(surface, &field, &options, &mut diagnostics);
        (sing, diagnostics)
    }

    #[test]
    fn test_flat_square_has_no_singularities() {
        let surface = fixtures::grid(4);
        let (sing, diagnostics) = detect(&surface);
        assert!(sing.singularities().is_empty());
        assert!(sing.forced_corners().is_empty());
        assert!(sing.is_poincare_hopf_consistent());
        assert!(!diagnostics.has(IssueKind::PoincareHopf));

        // Right-angle corners turn the field by a quarter each.
        for v in surface.mesh().vertex_ids() {
            let expected = if surface.is_corner(v) { 1 } else { 0 };
            assert_eq!(sing.index(v), expected, "vertex {:?}", v);
        }
        assert_eq!(sing.sources(&surface).len(), 4);
    }

    #[test]
    fn test_sphere_indices_sum_to_two() {
        let surface = fixtures::icosphere(2);
        let (sing, diagnostics) = detect(&surface);
        assert_eq!(sing.euler_characteristic(), 2);
        assert!((sing.index_sum_turns() - 2.0).abs() < 1e-12);
        assert!(!diagnostics.has(IssueKind::PoincareHopf));

        let total: i32 = sing.singularities().iter().map(|s| s.index).sum();
        assert_eq!(total, 8);
        assert!(sing.singularities().iter().all(|s| s.kind != SingularityKind::Corner));
    }

    #[test]
    fn test_torus_indices_sum_to_zero() {
        let surface = fixtures::torus(16, 8);
        let (sing, _) = detect(&surface);
        assert_eq!(sing.euler_characteristic(), 0);
        assert_eq!(sing.index_sum(), 0);
        // Seeded along the principal directions, the field needs no singularity.
        assert!(sing.singularities().is_empty());
        assert!(surface.mesh().vertex_ids().all(|v| sing.index(v) == 0));
    }

    #[test]
    fn test_disk_is_consistent() {
        let surface = fixtures::disk(16, 4);
        let (sing, _) = detect(&surface);
        assert!(sing.is_poincare_hopf_consistent());
    }

    #[test]
    fn test_l_shape_concave_corner() {
        let surface = fixtures::l_shape(2);
        let (sing, _) = detect(&surface);
        let mesh = surface.mesh();
        let concave = mesh
            .vertex_ids()
            .find(|&v| (mesh.position(v) - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12)
            .unwrap();
        assert_eq!(sing.index(concave), -1);
        assert!(sing.singularities().is_empty());
        assert_eq!(sing.index_sum(), 4);
        assert!(sing.sources(&surface).contains(&concave));
    }

    #[test]
    fn test_sharp_corners_are_forced() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.3, 0.5, 0.0),
        ];
        let surface = SurfaceMesh::from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        let (sing, _) = detect(&surface);
        assert_eq!(sing.forced_corners(), &[VertexId::new(0), VertexId::new(1)]);
        let corners: Vec<_> = sing
            .singularities()
            .iter()
            .filter(|s| s.kind == SingularityKind::Corner)
            .collect();
        assert_eq!(corners.len(), 2);
        assert!(corners.iter().all(|s| s.index == 1));
    }

    #[test]
    fn test_flagged_triangle_merges_to_centroid() {
        let surface = fixtures::grid(2);
        let mesh = surface.mesh();
        let mut flagged = vec![0; mesh.num_vertices()];
        let f = mesh.face_ids().next().unwrap();
        let tri = mesh.face_triangle(f);
        flagged[tri[0].index()] = 1;
        flagged[tri[1].index()] = 1;
        flagged[tri[2].index()] = -1;
        let mut diagnostics = Diagnostics::new();
        let merged = merge_flagged(&surface, &flagged, &mut diagnostics);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, SingularityKind::Triangle);
        assert_eq!(merged[0].index, 1);
        assert_eq!(merged[0].vertex, tri[0].min(tri[1]));
        assert!((merged[0].position - mesh.face_centroid(f)).norm() < 1e-12);
        assert!(diagnostics.issues().is_empty());
    }

    #[test]
    fn test_opposite_flags_cancel() {
        let surface = fixtures::grid(2);
        let mut flagged = vec![0; surface.mesh().num_vertices()];
        flagged[4] = 1;
        flagged[5] = -1;
        flagged[6] = 1;
        let mut diagnostics = Diagnostics::new();
        let merged = merge_flagged(&surface, &flagged, &mut diagnostics);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, SingularityKind::Vertex);
        assert_eq!(merged[0].vertex, VertexId::new(6));
        assert_eq!(merged[0].index, 1);
    }

    #[test]
    fn test_flagged_edge_merges_to_midpoint() {
        let surface = fixtures::grid(2);
        let mut flagged = vec![0; surface.mesh().num_vertices()];
        flagged[4] = 2;
        flagged[5] = -1;
        let mut diagnostics = Diagnostics::new();
        let merged = merge_flagged(&surface, &flagged, &mut diagnostics);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, SingularityKind::Edge);
        assert_eq!(merged[0].index, 1);
        assert_eq!(merged[0].vertex, VertexId::new(4));
        assert!((merged[0].position - Point3::new(0.75, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_large_index_splits_into_unit_singularities() {
        let surface = fixtures::grid(2);
        let mut flagged = vec![0; surface.mesh().num_vertices()];
        flagged[4] = -2;
        let mut diagnostics = Diagnostics::new();
        let merged = merge_flagged(&surface, &flagged, &mut diagnostics);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|s| s.index == -1 && s.vertex == VertexId::new(4)));
        assert!(diagnostics.has(IssueKind::Topology));
    }

    #[test]
    fn test_tolerance_marks_unreliable_vertices() {
        let surface = fixtures::icosphere(1);
        let (sing, diagnostics) = detect(&surface);
        assert!(sing.unreliable().is_empty());
        assert!(!diagnostics.has(IssueKind::Degeneracy));

        let options = LayoutOptions::default().with_singularity_tolerance(f64::MIN_POSITIVE);
        let mut diagnostics = Diagnostics::new();
        let field = compute_cross_field(&surface, &options, &mut diagnostics);
        let strict = detect_singularities(&surface, &field, &options, &mut diagnostics);
        assert!(!strict.unreliable().is_empty());
        assert!(diagnostics.has(IssueKind::Degeneracy));
        assert_eq!(strict.index_sum(), sing.index_sum());
    }

    #[test]
    fn test_degenerate_neighbourhood_is_skipped() {
        let surface = fixtures::collapsed_edge();
        let (sing, diagnostics) = detect(&surface);
        assert!(diagnostics.has(IssueKind::Degeneracy));
        assert!(!sing.is_evaluated(VertexId::new(5)));
        assert_eq!(sing.index(VertexId::new(5)), 0);
    }
}
