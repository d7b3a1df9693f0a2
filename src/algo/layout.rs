//! The full quad layout pipeline.
//!
//! [`quad_layout`] splits the surface into connected components and runs the
//! six stages on each:
//!
//! 1. cross field ([`compute_cross_field`])
//! 2. singularities ([`detect_singularities`])
//! 3. cut graph ([`build_cut_graph`])
//! 4. potentials ([`solve_potentials`])
//! 5. separatrices ([`trace_separatrices`])
//! 6. layout assembly ([`assemble_layout`])
//!
//! Components share nothing, so they run in parallel when
//! [`LayoutOptions::parallel`] is set. Contained failures from every stage
//! are merged into one [`Diagnostics`] in component order.
//!
//! # Example
//!
//! ```no_run
//! use quadlayout::prelude::*;
//!
//! let surface: SurfaceMesh = quadlayout::io::load("part.stl").unwrap();
//! let options = LayoutOptions::default().with_target_quad_count(400);
//! let result = quad_layout(&surface, &options).unwrap();
//!
//! println!("{} blocks", result.num_patches());
//! for issue in result.diagnostics().issues() {
//!     eprintln!("{}", issue);
//! }
//! ```

use rayon::prelude::*;

use super::assemble::{assemble_layout, QuadLayout};
use super::crossfield::{compute_cross_field, CrossField};
use super::cutgraph::{build_cut_graph, CutGraph};
use super::diagnostics::Diagnostics;
use super::options::LayoutOptions;
use super::potential::{solve_potentials, Potential};
use super::progress::Progress;
use super::separatrix::{trace_separatrices, PathKind, Separatrices};
use super::singularity::{detect_singularities, Singularities, Singularity};
use crate::error::{LayoutError, Result};
use crate::mesh::{Component, FaceId, MeshIndex, SurfaceMesh, VertexId};

/// Number of progress stages per component.
pub const STAGES: usize = 6;

/// Everything the pipeline produced for one connected component.
#[derive(Debug, Clone)]
pub struct ComponentLayout<I: MeshIndex = u32> {
    /// The component as a standalone surface.
    pub surface: SurfaceMesh<I>,
    /// Input vertex of each component vertex.
    pub vertex_map: Vec<VertexId<I>>,
    /// Input face of each component face.
    pub face_map: Vec<FaceId<I>>,
    /// Smoothed cross field.
    pub field: CrossField<I>,
    /// Per-vertex indices and singularities.
    pub singularities: Singularities<I>,
    /// Cut graph with its groups and wedge unknowns.
    pub cut_graph: CutGraph<I>,
    /// U,V potentials on the cut surface.
    pub potential: Potential,
    /// Traced separatrices and the cuts they leave.
    pub separatrices: Separatrices<I>,
    /// Block decomposition.
    pub layout: QuadLayout<I>,
}

impl<I: MeshIndex> ComponentLayout<I> {
    /// Input vertex of a component vertex.
    pub fn parent_vertex(&self, v: VertexId<I>) -> VertexId<I> {
        self.vertex_map[v.index()]
    }

    /// Input face of a component face.
    pub fn parent_face(&self, f: FaceId<I>) -> FaceId<I> {
        self.face_map[f.index()]
    }
}

/// Result of [`quad_layout`].
#[derive(Debug, Clone)]
pub struct QuadLayoutResult<I: MeshIndex = u32> {
    components: Vec<ComponentLayout<I>>,
    diagnostics: Diagnostics,
}

impl<I: MeshIndex> QuadLayoutResult<I> {
    /// Per-component results, ordered by lowest input face.
    pub fn components(&self) -> &[ComponentLayout<I>] {
        &self.components
    }

    /// Contained failures from all stages.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether no stage recorded an error.
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_success()
    }

    /// Total number of blocks.
    pub fn num_patches(&self) -> usize {
        self.components.iter().map(|c| c.layout.num_patches()).sum()
    }

    /// All singularities with their vertex mapped back to the input surface.
    pub fn singularities(&self) -> Vec<Singularity<I>> {
        self.components
            .iter()
            .flat_map(|c| {
                c.singularities.singularities().iter().map(move |s| Singularity {
                    vertex: c.parent_vertex(s.vertex),
                    ..s.clone()
                })
            })
            .collect()
    }

    /// Sum of singularity indices over all components, in quarter turns.
    pub fn index_sum(&self) -> i32 {
        self.components.iter().map(|c| c.singularities.index_sum()).sum()
    }

    /// Number of retained separatrices of a kind.
    pub fn separatrix_count(&self, kind: PathKind) -> usize {
        self.components.iter().map(|c| c.separatrices.count(kind)).sum()
    }
}

/// Run the full pipeline on `surface`.
///
/// Fails only on invalid options or an empty surface; everything else is
/// reported through [`QuadLayoutResult::diagnostics`].
pub fn quad_layout<I: MeshIndex>(surface: &SurfaceMesh<I>, options: &LayoutOptions) -> Result<QuadLayoutResult<I>> {
    quad_layout_with_progress(surface, options, &Progress::none())
}

/// Run the full pipeline, reporting progress per stage.
///
/// Component `c` owns stages `c * STAGES .. (c + 1) * STAGES` of the total.
pub fn quad_layout_with_progress<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    options: &LayoutOptions,
    progress: &Progress,
) -> Result<QuadLayoutResult<I>> {
    options.validate()?;
    if surface.mesh().num_faces() == 0 {
        return Err(LayoutError::EmptyMesh);
    }

    let parts = surface.components()?;
    let stages = parts.len() * STAGES;
    log::debug!("quad layout: {} component(s), {} faces", parts.len(), surface.mesh().num_faces());

    let run = |(c, part): (usize, Component<I>)| layout_component(part, options, progress, c * STAGES, stages);
    let results: Vec<(ComponentLayout<I>, Diagnostics)> = if options.parallel && parts.len() > 1 {
        parts.into_par_iter().enumerate().map(run).collect()
    } else {
        parts.into_iter().enumerate().map(run).collect()
    };

    let mut diagnostics = Diagnostics::new();
    let mut components = Vec::with_capacity(results.len());
    for (component, diag) in results {
        diagnostics.merge(diag);
        components.push(component);
    }
    progress.report(stages, stages, "done");

    Ok(QuadLayoutResult {
        components,
        diagnostics,
    })
}

fn layout_component<I: MeshIndex>(
    part: Component<I>,
    options: &LayoutOptions,
    progress: &Progress,
    first_stage: usize,
    stages: usize,
) -> (ComponentLayout<I>, Diagnostics) {
    let Component {
        surface,
        vertex_map,
        face_map,
    } = part;
    let mut diag = Diagnostics::new();

    // Step 1: Smooth the cross field
    progress.begin_stage(first_stage, stages, "cross field");
    let mut field = compute_cross_field(&surface, options, &mut diag);

    // Step 2: Locate singularities
    progress.begin_stage(first_stage + 1, stages, "singularities");
    let singularities = detect_singularities(&surface, &field, options, &mut diag);

    // Step 3: Cut the surface into a disk
    progress.begin_stage(first_stage + 2, stages, "cut graph");
    let mut cut_graph = build_cut_graph(&surface, &mut field, &singularities, &mut diag);

    // Step 4: Solve for U,V
    progress.begin_stage(first_stage + 3, stages, "potentials");
    let potential = solve_potentials(&surface, &field, &mut cut_graph, options, &mut diag);

    // Step 5: Trace iso-lines out of the singularities
    progress.begin_stage(first_stage + 4, stages, "separatrices");
    let separatrices = trace_separatrices(&surface, &cut_graph, &potential, &singularities, options, &mut diag);

    // Step 6: Split the surface into blocks
    progress.begin_stage(first_stage + 5, stages, "layout");
    let layout = assemble_layout(&surface, &cut_graph, &potential, separatrices.edge_cuts(), &mut diag);

    log::debug!(
        "component {}: {} singularities, {} groups, {} separatrices, {} blocks",
        first_stage / STAGES,
        singularities.singularities().len(),
        cut_graph.groups().len(),
        separatrices.retained().count(),
        layout.num_patches()
    );

    let component = ComponentLayout {
        surface,
        vertex_map,
        face_map,
        field,
        singularities,
        cut_graph,
        potential,
        separatrices,
        layout,
    };
    (component, diag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::diagnostics::IssueKind;
    use crate::mesh::fixtures;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_flat_square_is_one_block() {
        let surface = fixtures::grid(4);
        let options = LayoutOptions::default().with_target_quad_count(16);
        let result = quad_layout(&surface, &options).unwrap();

        assert!(result.is_success());
        assert_eq!(result.components().len(), 1);
        assert_eq!(result.num_patches(), 1);
        assert!(result.singularities().is_empty());
        assert_eq!(result.index_sum(), 4);
        assert_eq!(result.separatrix_count(PathKind::SingToBdry), 0);
    }

    #[test]
    fn test_l_shape_has_three_blocks() {
        let surface = fixtures::l_shape(2);
        let options = LayoutOptions::default().with_target_quad_count(12);
        let result = quad_layout(&surface, &options).unwrap();

        assert_eq!(result.num_patches(), 3);
        assert_eq!(result.separatrix_count(PathKind::SingToBdry), 2);
    }

    #[test]
    fn test_sphere_index_sum() {
        let surface = fixtures::icosphere(2);
        let result = quad_layout(&surface, &LayoutOptions::default()).unwrap();

        let component = &result.components()[0];
        assert_eq!(result.index_sum(), 4 * component.singularities.euler_characteristic() as i32);
        assert!(!result.diagnostics().has(IssueKind::PoincareHopf));
        assert!(result.num_patches() >= 1);
    }

    #[test]
    fn test_components_map_to_input() {
        let surface = fixtures::two_squares();
        let options = LayoutOptions::default().with_target_quad_count(8);
        let result = quad_layout(&surface, &options).unwrap();

        assert_eq!(result.components().len(), 2);
        assert_eq!(result.num_patches(), 2);

        let mut seen = vec![false; surface.mesh().num_faces()];
        for component in result.components() {
            for f in component.surface.mesh().face_ids() {
                let parent = component.parent_face(f);
                assert!(!seen[parent.index()]);
                seen[parent.index()] = true;

                let here = component.surface.mesh().face_triangle(f).map(|v| *component.surface.mesh().position(v));
                let there = surface.mesh().face_triangle(parent).map(|v| *surface.mesh().position(v));
                assert_eq!(here, there);
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let surface = fixtures::two_squares();
        let options = LayoutOptions::default().with_target_quad_count(8);
        let par = quad_layout(&surface, &options).unwrap();
        let seq = quad_layout(&surface, &options.clone().sequential()).unwrap();

        assert_eq!(par.num_patches(), seq.num_patches());
        assert_eq!(par.diagnostics().issues(), seq.diagnostics().issues());
        for (a, b) in par.components().iter().zip(seq.components()) {
            assert_eq!(a.layout.num_triangles(), b.layout.num_triangles());
        }
    }

    #[test]
    fn test_invalid_options_rejected() {
        let surface = fixtures::grid(2);
        let options = LayoutOptions::default().with_convergence_tol(-1.0);
        assert!(matches!(
            quad_layout(&surface, &options),
            Err(LayoutError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_degenerate_input_is_contained() {
        let surface = fixtures::degenerate_triangle();
        let result = quad_layout(&surface, &LayoutOptions::default()).unwrap();
        assert!(result.diagnostics().has(IssueKind::Degeneracy));
    }

    #[test]
    fn test_progress_covers_every_stage() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |current, total, message| {
            sink.lock().unwrap().push((current, total, message.to_string()));
        });

        let surface = fixtures::grid(2);
        quad_layout_with_progress(&surface, &LayoutOptions::default(), &progress).unwrap();

        let seen = seen.lock().unwrap();
        let stages: Vec<&str> = seen.iter().map(|(_, _, m)| m.as_str()).collect();
        for name in ["cross field", "singularities", "cut graph", "potentials", "separatrices", "layout"] {
            assert!(stages.contains(&name), "missing stage {}", name);
        }
        let (current, total, _) = seen.last().unwrap();
        assert_eq!(current, total);
    }
}
