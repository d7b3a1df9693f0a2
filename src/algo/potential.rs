//! Seamless potentials.
//!
//! Two scalar fields U and V are solved on the dofs of the cut surface so
//! that their gradients follow the combed cross field:
//!
//! ```text
//! min  sum_T  A_T ( |grad U - u_T / h|^2 + |grad V - v_T / h|^2 )
//! ```
//!
//! where `u_T` and `v_T` are the unit U and V directions of triangle `T`
//! and `h = sqrt(area / target_quad_count)` is the target quad size.
//!
//! The minimization is subject to linear constraints enforced with Lagrange
//! multipliers:
//!
//! - across every cut group, `(U, V)_right = M (U, V)_left + jump`, with the
//!   jump pair as extra unknowns;
//! - along boundary and embedded-curve groups, the potential the arc is an
//!   iso-line of stays constant on each side;
//! - the average of each field is zero.
//!
//! The saddle-point system is handed to a [`LinearSolver`].

use nalgebra::Vector3;
use rayon::prelude::*;

use super::crossfield::CrossField;
use super::cutgraph::{CutGraph, GroupKind};
use super::diagnostics::{Diagnostics, IssueKind};
use super::geometry::hat_gradients;
use super::options::LayoutOptions;
use super::solver::{create_solver, LinearSolver};
use crate::mesh::{FaceId, MeshIndex, SurfaceMesh, VertexId};

/// Element contribution of one triangle: stiffness entries and right-hand side.
struct Element {
    dofs: [usize; 3],
    stiffness: [[f64; 3]; 3],
    rhs: [[f64; 3]; 2],
}

/// U and V per dof of the cut surface.
#[derive(Debug, Clone)]
pub struct Potential {
    uv: Vec<[f64; 2]>,
    scale: f64,
    success: bool,
}

impl Potential {
    /// Potentials of a dof.
    #[inline]
    pub fn uv(&self, dof: usize) -> [f64; 2] {
        self.uv[dof]
    }

    /// One potential (0 = U, 1 = V) of a dof.
    #[inline]
    pub fn value(&self, dof: usize, field: usize) -> f64 {
        self.uv[dof][field]
    }

    /// All potentials, indexed by dof.
    pub fn values(&self) -> &[[f64; 2]] {
        &self.uv
    }

    /// Target quad size `h`.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whether the linear solver reported an accurate solution.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Potentials of vertex `v` as seen from face `f`.
    pub fn at<I: MeshIndex>(&self, surface: &SurfaceMesh<I>, graph: &CutGraph<I>, f: FaceId<I>, v: VertexId<I>) -> Option<[f64; 2]> {
        graph.dof_at(surface, f, v).map(|d| self.uv[d])
    }

    /// Largest violation of a cut transition over all valid cut groups.
    pub fn max_transition_residual<I: MeshIndex>(&self, graph: &CutGraph<I>) -> f64 {
        graph
            .groups()
            .iter()
            .filter(|g| g.kind == GroupKind::Cut && g.valid)
            .flat_map(|g| {
                g.left.iter().zip(&g.right).map(move |(&l, &r)| {
                    let mapped = g.apply(self.uv[l]);
                    (mapped[0] - self.uv[r][0]).abs().max((mapped[1] - self.uv[r][1]).abs())
                })
            })
            .fold(0.0, f64::max)
    }
}

fn element<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    field: &CrossField<I>,
    graph: &CutGraph<I>,
    f: FaceId<I>,
    inv_h: f64,
) -> Option<Element> {
    let mesh = surface.mesh();
    if !field.frame(f).valid {
        return None;
    }
    let grads = hat_gradients(&mesh.face_positions(f))?;
    let area = mesh.face_area(f);
    let targets: [Vector3<f64>; 2] = [
        graph.lifted().u_direction(field, f) * inv_h,
        graph.lifted().v_direction(field, f) * inv_h,
    ];

    let mut stiffness = [[0.0; 3]; 3];
    let mut rhs = [[0.0; 3]; 2];
    for k in 0..3 {
        for l in 0..3 {
            stiffness[k][l] = area * grads[k].dot(&grads[l]);
        }
        for (c, target) in targets.iter().enumerate() {
            rhs[c][k] = area * grads[k].dot(target);
        }
    }
    Some(Element {
        dofs: graph.dofs().face(f),
        stiffness,
        rhs,
    })
}

/// A constraint row: `sum coefficient * unknown = value`.
type Row = (Vec<(usize, f64)>, f64);

fn constraint_rows<I: MeshIndex>(graph: &CutGraph<I>, num_dofs: usize) -> (Vec<Row>, Vec<Option<usize>>) {
    let unknown = |dof: usize, c: usize| 2 * dof + c;
    let mut rows: Vec<Row> = Vec::new();
    let mut jump_slot = vec![None; graph.groups().len()];
    let mut next_jump = 2 * num_dofs;

    for (gid, g) in graph.groups().iter().enumerate() {
        if !g.valid {
            continue;
        }
        match g.kind {
            GroupKind::Cut => {
                jump_slot[gid] = Some(next_jump);
                let m = g.matrix();
                let count = if g.is_loop() { g.left.len() - 1 } else { g.left.len() };
                for i in 0..count {
                    for c in 0..2 {
                        let mut row = vec![(unknown(g.right[i], c), 1.0), (next_jump + c, -1.0)];
                        for k in 0..2 {
                            if m[c][k] != 0 {
                                row.push((unknown(g.left[i], k), -(m[c][k] as f64)));
                            }
                        }
                        rows.push((row, 0.0));
                    }
                }
                next_jump += 2;
            }
            GroupKind::Boundary | GroupKind::InternalBoundary => {
                let mut sides = vec![(&g.left, g.iso_field[0])];
                if g.kind == GroupKind::InternalBoundary {
                    sides.push((&g.right, g.iso_field[1]));
                }
                for (dofs, iso) in sides {
                    let Some(c) = iso else { continue };
                    for w in dofs.windows(2) {
                        if w[0] != w[1] {
                            rows.push((vec![(unknown(w[1], c), 1.0), (unknown(w[0], c), -1.0)], 0.0));
                        }
                    }
                }
            }
        }
    }

    for c in 0..2 {
        rows.push(((0..num_dofs).map(|d| (unknown(d, c), 1.0)).collect(), 0.0));
    }
    (rows, jump_slot)
}

/// Solve the seamless potentials and record the jumps in the cut groups.
///
/// A failed solve is reported as a [`IssueKind::SolverFailure`] error; the
/// best available values are returned anyway.
pub fn solve_potentials<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    field: &CrossField<I>,
    graph: &mut CutGraph<I>,
    options: &LayoutOptions,
    diagnostics: &mut Diagnostics,
) -> Potential {
    let mesh = surface.mesh();
    let num_dofs = graph.dofs().len();
    let area = mesh.surface_area();
    let scale = if area > 0.0 {
        (area / options.target_quad_count as f64).sqrt()
    } else {
        1.0
    };
    let inv_h = 1.0 / scale;

    let elements: Vec<Option<Element>> = {
        let graph = &*graph;
        let build = |i: usize| element(surface, field, graph, FaceId::new(i), inv_h);
        if options.parallel {
            (0..mesh.num_faces()).into_par_iter().map(build).collect()
        } else {
            (0..mesh.num_faces()).map(build).collect()
        }
    };

    let (rows, jump_slot) = constraint_rows(graph, num_dofs);
    let num_jumps = 2 * jump_slot.iter().flatten().count();
    let first_row = 2 * num_dofs + num_jumps;
    let size = first_row + rows.len();

    let mut solver: Box<dyn LinearSolver> = create_solver(options.solver, size);
    solver.assemble(size, true);
    for el in elements.iter().flatten() {
        for k in 0..3 {
            for l in 0..3 {
                for c in 0..2 {
                    solver.add_equation(2 * el.dofs[k] + c, 2 * el.dofs[l] + c, el.stiffness[k][l]);
                }
            }
            for c in 0..2 {
                solver.add_rhs(2 * el.dofs[k] + c, el.rhs[c][k]);
            }
        }
    }
    for (r, (row, value)) in rows.iter().enumerate() {
        let lambda = first_row + r;
        for &(col, coefficient) in row {
            solver.add_equation(lambda, col, coefficient);
            solver.add_equation(col, lambda, coefficient);
        }
        solver.add_rhs(lambda, *value);
    }

    let success = solver.solve();
    if !success {
        diagnostics.error(
            IssueKind::SolverFailure,
            format!("potential solve on {} unknowns did not converge; keeping best values", size),
        );
    }

    let uv: Vec<[f64; 2]> = (0..num_dofs)
        .map(|d| [solver.value(2 * d), solver.value(2 * d + 1)])
        .collect();
    for (g, slot) in graph.groups_mut().iter_mut().zip(&jump_slot) {
        if let Some(j) = *slot {
            g.jump = [solver.value(j), solver.value(j + 1)];
        }
    }

    log::debug!(
        "potentials: {} dofs, {} constraints, scale {:.4}, success {}",
        num_dofs,
        rows.len(),
        scale,
        success
    );
    Potential { uv, scale, success }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::crossfield::compute_cross_field;
    use crate::algo::cutgraph::build_cut_graph;
    use crate::algo::singularity::detect_singularities;
    use crate::algo::solver::SolverKind;
    use crate::mesh::fixtures;

    fn solve(surface: &SurfaceMesh, options: &LayoutOptions) -> (Potential, CutGraph, CrossField, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut field = compute_cross_field(surface, options, &mut diagnostics);
        let sing = detect_singularities(surface, &field, options, &mut diagnostics);
        let mut graph = build_cut_graph(surface, &mut field, &sing, &mut diagnostics);
        let potential = solve_potentials(surface, &field, &mut graph, options, &mut diagnostics);
        (potential, graph, field, diagnostics)
    }

    #[test]
    fn test_stiffness_is_cotangent_laplacian() {
        use crate::algo::geometry::cotangent_angle;

        let surface = fixtures::icosphere(1);
        let (_, graph, field, _) = solve(&surface, &LayoutOptions::default());
        let mesh = surface.mesh();
        for f in mesh.face_ids() {
            let el = element(&surface, &field, &graph, f, 1.0).unwrap();
            let p = mesh.face_positions(f);
            for k in 0..3 {
                let (l, o) = ((k + 1) % 3, (k + 2) % 3);
                let expected = -0.5 * cotangent_angle(&p[o], &p[k], &p[l]);
                assert!((el.stiffness[k][l] - expected).abs() < 1e-12);
                assert!(el.stiffness[k].iter().sum::<f64>().abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_flat_square_is_affine() {
        let surface = fixtures::grid(4);
        let options = LayoutOptions::default().with_target_quad_count(16);
        let (potential, graph, field, diagnostics) = solve(&surface, &options);
        assert!(potential.is_success());
        assert!(diagnostics.is_success());
        assert!((potential.scale() - 0.25).abs() < 1e-12);

        let mesh = surface.mesh();
        let f0 = FaceId::new(0);
        let u_dir = graph.lifted().u_direction(&field, f0);
        let v_dir = graph.lifted().v_direction(&field, f0);
        let p0 = *mesh.position(VertexId::new(0));
        let uv0 = potential.uv(0);
        for v in mesh.vertex_ids() {
            let d = mesh.position(v) - p0;
            let uv = potential.uv(v.index());
            assert!((uv[0] - uv0[0] - d.dot(&u_dir) / 0.25).abs() < 1e-6);
            assert!((uv[1] - uv0[1] - d.dot(&v_dir) / 0.25).abs() < 1e-6);
        }

        // Zero average.
        let mean: f64 = potential.values().iter().map(|uv| uv[0]).sum::<f64>() / potential.values().len() as f64;
        assert!(mean.abs() < 1e-8);
    }

    #[test]
    fn test_transitions_hold_on_sphere() {
        let surface = fixtures::icosphere(2);
        let (potential, graph, _, _) = solve(&surface, &LayoutOptions::default());
        assert!(potential.is_success());
        assert!(graph.groups().iter().any(|g| g.kind == GroupKind::Cut));
        assert!(potential.max_transition_residual(&graph) < 1e-6);
    }

    #[test]
    fn test_transitions_hold_on_torus_with_sparse_solver() {
        let surface = fixtures::torus(12, 6);
        let options = LayoutOptions::default().with_solver(SolverKind::Sparse);
        let (potential, graph, _, _) = solve(&surface, &options);
        assert!(potential.max_transition_residual(&graph) < 1e-4);
    }

    #[test]
    fn test_boundary_arcs_are_iso_lines() {
        let surface = fixtures::l_shape(2);
        let (potential, graph, _, _) = solve(&surface, &LayoutOptions::default());
        for g in graph.groups().iter().filter(|g| g.kind == GroupKind::Boundary) {
            let c = g.iso_field[0].unwrap();
            let first = potential.value(g.left[0], c);
            for &d in &g.left {
                assert!((potential.value(d, c) - first).abs() < 1e-6);
            }
        }
    }
}
