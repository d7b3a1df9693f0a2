//! Configuration of the layout pipeline.

use std::f64::consts::{FRAC_PI_3, PI};

use super::solver::SolverKind;
use crate::error::{LayoutError, Result};

/// How the cross field is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossFieldMethod {
    /// Iterative circular-mean relaxation over the edge graph.
    #[default]
    Relaxation,
    /// Implicit heat diffusion of the connection Laplacian, polished by relaxation.
    HeatDiffusion,
}

/// Options for [`quad_layout`](super::layout::quad_layout).
///
/// Every stage reads the fields it needs from this one flat record.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Approximate number of quads the parametrization is scaled for.
    pub target_quad_count: usize,

    /// Number of implicit heat steps for [`CrossFieldMethod::HeatDiffusion`].
    pub diffusion_levels: usize,

    /// Relaxation stops once no edge angle moves by more than this (radians).
    pub convergence_tol: f64,

    /// Rings of edges around the boundary seeded with the boundary direction
    /// before relaxation.
    pub boundary_expansion_layers: usize,

    /// Cap on relaxation sweeps.
    pub max_relaxation_sweeps: usize,

    /// Cross field algorithm.
    pub cross_field_method: CrossFieldMethod,

    /// Allowed deviation (radians) of a vertex holonomy from a quarter-turn
    /// multiple. Vertices beyond it are listed as unreliable.
    pub singularity_tolerance: f64,

    /// Boundary corners with a smaller interior angle become singularities.
    pub sharp_corner_angle: f64,

    /// Distance, in mean edge lengths, at which a separatrix snaps to a singularity.
    pub closing_tolerance: f64,

    /// Cut-graph crossings after which a separatrix is abandoned.
    pub max_cut_crossings: usize,

    /// Largest accepted accumulated potential drift along a separatrix.
    pub diff_tolerance: f64,

    /// Linear solver used for the potentials.
    pub solver: SolverKind,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            target_quad_count: 100,
            diffusion_levels: 8,
            convergence_tol: 1e-6,
            boundary_expansion_layers: 2,
            max_relaxation_sweeps: 5000,
            cross_field_method: CrossFieldMethod::Relaxation,
            singularity_tolerance: 0.1,
            sharp_corner_angle: FRAC_PI_3,
            closing_tolerance: 0.25,
            max_cut_crossings: 20,
            diff_tolerance: 0.05,
            solver: SolverKind::Auto,
            parallel: true,
        }
    }
}

impl LayoutOptions {
    /// Set the target quad count.
    pub fn with_target_quad_count(mut self, count: usize) -> Self {
        self.target_quad_count = count;
        self
    }

    /// Set the number of heat diffusion levels.
    pub fn with_diffusion_levels(mut self, levels: usize) -> Self {
        self.diffusion_levels = levels;
        self
    }

    /// Set the relaxation convergence tolerance.
    pub fn with_convergence_tol(mut self, tol: f64) -> Self {
        self.convergence_tol = tol;
        self
    }

    /// Set the number of boundary expansion layers.
    pub fn with_boundary_expansion_layers(mut self, layers: usize) -> Self {
        self.boundary_expansion_layers = layers;
        self
    }

    /// Set the relaxation sweep cap.
    pub fn with_max_relaxation_sweeps(mut self, sweeps: usize) -> Self {
        self.max_relaxation_sweeps = sweeps;
        self
    }

    /// Select the cross field algorithm.
    pub fn with_cross_field_method(mut self, method: CrossFieldMethod) -> Self {
        self.cross_field_method = method;
        self
    }

    /// Set the holonomy deviation (radians) above which a vertex index is
    /// listed in [`Singularities::unreliable`](super::singularity::Singularities::unreliable).
    pub fn with_singularity_tolerance(mut self, tol: f64) -> Self {
        self.singularity_tolerance = tol;
        self
    }

    /// Set the sharp corner threshold (radians).
    pub fn with_sharp_corner_angle(mut self, angle: f64) -> Self {
        self.sharp_corner_angle = angle;
        self
    }

    /// Set the separatrix closing tolerance.
    pub fn with_closing_tolerance(mut self, tol: f64) -> Self {
        self.closing_tolerance = tol;
        self
    }

    /// Set the cut crossing cap for separatrices.
    pub fn with_max_cut_crossings(mut self, crossings: usize) -> Self {
        self.max_cut_crossings = crossings;
        self
    }

    /// Set the accepted separatrix drift.
    pub fn with_diff_tolerance(mut self, tol: f64) -> Self {
        self.diff_tolerance = tol;
        self
    }

    /// Select the linear solver.
    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        if self.target_quad_count == 0 {
            return Err(LayoutError::invalid_param("target_quad_count", 0, "must be positive"));
        }
        if !(self.convergence_tol > 0.0 && self.convergence_tol.is_finite()) {
            return Err(LayoutError::invalid_param("convergence_tol", self.convergence_tol, "must be positive"));
        }
        if self.max_relaxation_sweeps == 0 {
            return Err(LayoutError::invalid_param("max_relaxation_sweeps", 0, "must be positive"));
        }
        if self.cross_field_method == CrossFieldMethod::HeatDiffusion && self.diffusion_levels == 0 {
            return Err(LayoutError::invalid_param("diffusion_levels", 0, "must be positive for heat diffusion"));
        }
        if !(self.singularity_tolerance > 0.0 && self.singularity_tolerance < PI / 4.0) {
            return Err(LayoutError::invalid_param(
                "singularity_tolerance",
                self.singularity_tolerance,
                "must lie in (0, pi/4)",
            ));
        }
        if !(self.sharp_corner_angle > 0.0 && self.sharp_corner_angle < PI) {
            return Err(LayoutError::invalid_param(
                "sharp_corner_angle",
                self.sharp_corner_angle,
                "must lie in (0, pi)",
            ));
        }
        if !(self.closing_tolerance > 0.0 && self.closing_tolerance.is_finite()) {
            return Err(LayoutError::invalid_param("closing_tolerance", self.closing_tolerance, "must be positive"));
        }
        if !(self.diff_tolerance > 0.0 && self.diff_tolerance.is_finite()) {
            return Err(LayoutError::invalid_param("diff_tolerance", self.diff_tolerance, "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LayoutOptions::default().validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = LayoutOptions::default()
            .with_target_quad_count(400)
            .with_cross_field_method(CrossFieldMethod::HeatDiffusion)
            .with_solver(SolverKind::Sparse)
            .sequential();
        assert_eq!(options.target_quad_count, 400);
        assert_eq!(options.solver, SolverKind::Sparse);
        assert!(!options.parallel);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = LayoutOptions::default().with_convergence_tol(-1.0).validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid parameter: convergence_tol = -1 (must be positive)");

        assert!(LayoutOptions::default().with_target_quad_count(0).validate().is_err());
        assert!(LayoutOptions::default().with_sharp_corner_angle(4.0).validate().is_err());
        assert!(LayoutOptions::default()
            .with_cross_field_method(CrossFieldMethod::HeatDiffusion)
            .with_diffusion_levels(0)
            .validate()
            .is_err());
    }
}
