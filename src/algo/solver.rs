//! Linear solver abstraction used by the potential solve.
//!
//! The potential solver only knows degrees of freedom, matrix entries and
//! right-hand sides. It hands them to a [`LinearSolver`], which owns storage
//! and the factorization or iteration strategy.

use nalgebra::{DMatrix, DVector};

use super::sparse::{cgnr_best_effort, conjugate_gradient, CsrMatrix};

/// Systems with at most this many unknowns use the dense solver under [`SolverKind::Auto`].
pub const DENSE_LIMIT: usize = 2500;

/// Relative residual under which a solution is accepted.
const ACCEPT_RESIDUAL: f64 = 1e-6;

/// Which [`LinearSolver`] implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Dense LU with an SVD least-squares fallback.
    Dense,
    /// CSR storage with conjugate gradient and a CGNR fallback.
    Sparse,
    /// Dense up to [`DENSE_LIMIT`] unknowns, sparse above.
    #[default]
    Auto,
}

/// A linear system `A x = b` assembled entry by entry.
pub trait LinearSolver: Send {
    /// Reset to an empty `size` by `size` system.
    fn assemble(&mut self, size: usize, symmetric: bool);

    /// Add `coefficient` to `A[row][col]`.
    fn add_equation(&mut self, row: usize, col: usize, coefficient: f64);

    /// Add `value` to `b[row]`.
    fn add_rhs(&mut self, row: usize, value: f64);

    /// Solve the system. Returns `false` if no accurate solution was found,
    /// in which case [`value`](Self::value) still returns the best iterate.
    fn solve(&mut self) -> bool;

    /// Solution value of a degree of freedom.
    fn value(&self, dof: usize) -> f64;

    /// Number of unknowns.
    fn size(&self) -> usize;
}

/// Create the solver selected by `kind` for a system with `size` unknowns.
pub fn create_solver(kind: SolverKind, size: usize) -> Box<dyn LinearSolver> {
    match kind {
        SolverKind::Dense => Box::new(DenseLinearSolver::new()),
        SolverKind::Sparse => Box::new(SparseLinearSolver::new()),
        SolverKind::Auto if size <= DENSE_LIMIT => Box::new(DenseLinearSolver::new()),
        SolverKind::Auto => Box::new(SparseLinearSolver::new()),
    }
}

fn relative_residual(r: f64, b: f64) -> f64 {
    r / b.max(1.0)
}

/// Iterative solver over a CSR matrix.
#[derive(Debug, Clone)]
pub struct SparseLinearSolver {
    size: usize,
    symmetric: bool,
    triplets: Vec<(usize, usize, f64)>,
    rhs: DVector<f64>,
    solution: DVector<f64>,
    max_iterations: usize,
    tolerance: f64,
}

impl Default for SparseLinearSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseLinearSolver {
    /// Create an empty solver.
    pub fn new() -> Self {
        Self {
            size: 0,
            symmetric: true,
            triplets: Vec::new(),
            rhs: DVector::zeros(0),
            solution: DVector::zeros(0),
            max_iterations: 0,
            tolerance: 1e-10,
        }
    }

    /// Set the iteration cap; zero means ten times the system size.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the relative residual tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl LinearSolver for SparseLinearSolver {
    fn assemble(&mut self, size: usize, symmetric: bool) {
        self.size = size;
        self.symmetric = symmetric;
        self.triplets.clear();
        self.rhs = DVector::zeros(size);
        self.solution = DVector::zeros(size);
    }

    fn add_equation(&mut self, row: usize, col: usize, coefficient: f64) {
        if coefficient != 0.0 {
            self.triplets.push((row, col, coefficient));
        }
    }

    fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    fn solve(&mut self) -> bool {
        let a = CsrMatrix::from_triplets(self.size, self.size, self.triplets.clone());
        let max_iter = if self.max_iterations == 0 {
            10 * self.size.max(10)
        } else {
            self.max_iterations
        };
        let b_norm = self.rhs.norm();

        if self.symmetric {
            if let Ok(x) = conjugate_gradient(&a, &self.rhs, None, max_iter, self.tolerance) {
                let residual = (a.mul_vec(&x) - &self.rhs).norm();
                if relative_residual(residual, b_norm) < ACCEPT_RESIDUAL {
                    self.solution = x;
                    return true;
                }
            }
            log::debug!("conjugate gradient failed on {} unknowns, retrying with CGNR", self.size);
        }

        let (x, converged) = cgnr_best_effort(&a, &self.rhs, None, 4 * max_iter, self.tolerance);
        let residual = (a.mul_vec(&x) - &self.rhs).norm();
        self.solution = x;
        converged && relative_residual(residual, b_norm) < ACCEPT_RESIDUAL
    }

    fn value(&self, dof: usize) -> f64 {
        self.solution[dof]
    }

    fn size(&self) -> usize {
        self.size
    }
}

/// Direct solver over a dense matrix.
#[derive(Debug, Clone)]
pub struct DenseLinearSolver {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    solution: DVector<f64>,
}

impl Default for DenseLinearSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseLinearSolver {
    /// Create an empty solver.
    pub fn new() -> Self {
        Self {
            matrix: DMatrix::zeros(0, 0),
            rhs: DVector::zeros(0),
            solution: DVector::zeros(0),
        }
    }
}

impl LinearSolver for DenseLinearSolver {
    fn assemble(&mut self, size: usize, _symmetric: bool) {
        self.matrix = DMatrix::zeros(size, size);
        self.rhs = DVector::zeros(size);
        self.solution = DVector::zeros(size);
    }

    fn add_equation(&mut self, row: usize, col: usize, coefficient: f64) {
        self.matrix[(row, col)] += coefficient;
    }

    fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    fn solve(&mut self) -> bool {
        let b_norm = self.rhs.norm();
        let accept = |x: &DVector<f64>| {
            x.iter().all(|v| v.is_finite())
                && relative_residual((&self.matrix * x - &self.rhs).norm(), b_norm) < ACCEPT_RESIDUAL
        };

        if let Some(x) = self.matrix.clone().lu().solve(&self.rhs) {
            if accept(&x) {
                self.solution = x;
                return true;
            }
        }

        // Rank deficient: redundant constraints or an unpinned null space.
        log::debug!("LU failed on {} unknowns, falling back to SVD", self.rhs.len());
        let svd = self.matrix.clone().svd(true, true);
        match svd.solve(&self.rhs, 1e-10) {
            Ok(x) => {
                let ok = accept(&x);
                self.solution = x;
                ok
            }
            Err(message) => {
                log::warn!("SVD solve failed: {}", message);
                false
            }
        }
    }

    fn value(&self, dof: usize) -> f64 {
        self.solution[dof]
    }

    fn size(&self) -> usize {
        self.rhs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// min x^2 + y^2 + z^2 subject to x + y = 1 and y + z = 1, stated twice.
    fn fill_redundant_kkt(solver: &mut dyn LinearSolver) {
        solver.assemble(6, true);
        for i in 0..3 {
            solver.add_equation(i, i, 2.0);
        }
        let rows = [(3, [0, 1]), (4, [1, 2]), (5, [1, 2])];
        for (row, cols) in rows {
            for c in cols {
                solver.add_equation(row, c, 1.0);
                solver.add_equation(c, row, 1.0);
            }
            solver.add_rhs(row, 1.0);
        }
    }

    fn check_solution(solver: &dyn LinearSolver) {
        let (x, y, z) = (solver.value(0), solver.value(1), solver.value(2));
        assert!((x + y - 1.0).abs() < 1e-6);
        assert!((y + z - 1.0).abs() < 1e-6);
        // Minimizer: x = z = 1/3, y = 2/3.
        assert!((x - 1.0 / 3.0).abs() < 1e-6);
        assert!((y - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_dense_falls_back_on_redundant_rows() {
        let mut solver = DenseLinearSolver::new();
        fill_redundant_kkt(&mut solver);
        assert!(solver.solve());
        check_solution(&solver);
    }

    #[test]
    fn test_sparse_falls_back_on_indefinite() {
        let mut solver = SparseLinearSolver::new().with_tolerance(1e-12);
        fill_redundant_kkt(&mut solver);
        assert!(solver.solve());
        check_solution(&solver);
    }

    #[test]
    fn test_inconsistent_system_reports_failure() {
        let mut solver = DenseLinearSolver::new();
        solver.assemble(2, true);
        solver.add_equation(0, 0, 1.0);
        solver.add_equation(1, 0, 1.0);
        solver.add_rhs(0, 1.0);
        solver.add_rhs(1, 2.0);
        assert!(!solver.solve());
        // Least-squares answer is still available.
        assert!((solver.value(0) - 1.5).abs() < 1e-8);
    }

    #[test]
    fn test_auto_selection() {
        assert_eq!(create_solver(SolverKind::Auto, 10).size(), 0);
        let mut solver = create_solver(SolverKind::Sparse, 3);
        solver.assemble(1, true);
        solver.add_equation(0, 0, 2.0);
        solver.add_rhs(0, 4.0);
        assert!(solver.solve());
        assert!((solver.value(0) - 2.0).abs() < 1e-10);
    }
}
