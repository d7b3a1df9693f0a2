//! Quad layout algorithms.
//!
//! The pipeline stages, in the order [`layout::quad_layout`] runs them:
//!
//! - **Cross field**: smooth 4-fold direction field on mesh edges ([`crossfield`])
//! - **Singularities**: per-vertex holonomy indices and the Poincaré–Hopf check ([`singularity`])
//! - **Cut graph**: cuts the surface into a disk and groups the cut sides ([`cutgraph`])
//! - **Potentials**: global U,V solve with transition conditions ([`potential`])
//! - **Separatrices**: iso-lines traced out of singularities ([`separatrix`])
//! - **Assembly**: splits the surface into blocks along the separatrices ([`assemble`])
//!
//! Supporting modules hold the linear solvers, options, diagnostics and
//! progress reporting shared by the stages.

pub mod assemble;
pub mod crossfield;
pub mod cutgraph;
pub mod diagnostics;
pub mod geometry;
pub mod layout;
pub mod options;
pub mod potential;
pub mod progress;
pub mod separatrix;
pub mod singularity;
pub mod solver;
pub mod sparse;

pub use diagnostics::{Diagnostics, Issue, IssueKind, Severity};
pub use layout::{quad_layout, quad_layout_with_progress, ComponentLayout, QuadLayoutResult};
pub use options::{CrossFieldMethod, LayoutOptions};
pub use progress::Progress;
pub use solver::SolverKind;
