//! Separatrix tracing.
//!
//! A separatrix is an iso-line of U or V leaving a singularity or a boundary
//! vertex with nonzero index. It is followed face by face through the
//! piecewise linear potentials. Crossing a cut group re-expresses the
//! followed value on the other side through the group transition, which may
//! switch between U and V. A walk ends when it
//!
//! - comes within the closing distance of another source ([`PathKind::SingToSing`]),
//! - reaches the boundary or an embedded curve ([`PathKind::SingToBdry`]),
//! - runs past the crossing or step cap, or gets lost ([`PathKind::SingToNothing`]).
//!
//! Walks only read the potentials and the cut graph, so they run in
//! parallel. The results are filtered and then committed one by one into
//! [`EdgeCuts`]; a path touching a location an earlier path already owns is
//! [`PathKind::Redundant`].

mod cuts;
mod trace;

pub use cuts::{Chord, EdgeCuts, EdgePoint, POINT_TOLERANCE};

use std::collections::HashSet;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::cutgraph::CutGraph;
use super::diagnostics::{Diagnostics, IssueKind};
use super::options::LayoutOptions;
use super::potential::Potential;
use super::singularity::Singularities;
use crate::mesh::{EdgeId, FaceId, MeshIndex, SurfaceMesh, VertexId};
use trace::Tracer;

/// How a separatrix ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Between two sources.
    SingToSing,
    /// From a source to the boundary or an embedded curve.
    SingToBdry,
    /// Abandoned.
    SingToNothing,
    /// Duplicates a path that was kept.
    Redundant,
}

/// Where a path point lies on the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathLocation<I: MeshIndex = u32> {
    /// On a vertex.
    Vertex(VertexId<I>),
    /// On an edge, at parameter `t` of its canonical orientation.
    Edge {
        /// The edge.
        edge: EdgeId<I>,
        /// Parameter in `(0, 1)`.
        t: f64,
    },
}

/// What a path segment runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<I: MeshIndex = u32> {
    /// The interior of a triangle.
    Face(FaceId<I>),
    /// Exactly along a mesh edge.
    Edge(EdgeId<I>),
}

/// A point of a separatrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint<I: MeshIndex = u32> {
    /// Position in space.
    pub position: Point3<f64>,
    /// Location on the mesh.
    pub location: PathLocation<I>,
}

/// A traced separatrix.
#[derive(Debug, Clone)]
pub struct SeparatrixPath<I: MeshIndex = u32> {
    /// How the path ended.
    pub kind: PathKind,
    /// Source the path leaves.
    pub start: VertexId<I>,
    /// Source the path closed on, for [`PathKind::SingToSing`].
    pub end: Option<VertexId<I>>,
    /// Potential followed from the start (0 = U, 1 = V).
    pub field: usize,
    /// Polyline; consecutive points lie in one triangle or on one edge.
    pub points: Vec<PathPoint<I>>,
    /// One span per segment.
    pub spans: Vec<Span<I>>,
    /// Cut groups crossed, with `+1` for left to right and `-1` otherwise.
    pub crossings: Vec<(usize, i8)>,
    /// Accumulated mismatch of the followed value across cuts.
    pub diff: f64,
}

impl<I: MeshIndex> SeparatrixPath<I> {
    /// Length of the polyline.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].position - w[0].position).norm())
            .sum()
    }

    /// Unit direction in which the path leaves its start.
    pub fn initial_direction(&self) -> Vector3<f64> {
        match self.points.as_slice() {
            [a, b, ..] => (b.position - a.position).try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros),
            _ => Vector3::zeros(),
        }
    }

    /// Whether the path is part of the layout.
    pub fn is_retained(&self) -> bool {
        matches!(self.kind, PathKind::SingToSing | PathKind::SingToBdry)
    }
}

/// All traced separatrices and the cuts of the retained ones.
#[derive(Debug, Clone)]
pub struct Separatrices<I: MeshIndex = u32> {
    paths: Vec<SeparatrixPath<I>>,
    cuts: EdgeCuts<I>,
}

impl<I: MeshIndex> Separatrices<I> {
    /// Every traced path, including abandoned and redundant ones.
    pub fn paths(&self) -> &[SeparatrixPath<I>] {
        &self.paths
    }

    /// Paths kept in the layout, with their ids.
    pub fn retained(&self) -> impl Iterator<Item = (usize, &SeparatrixPath<I>)> + '_ {
        self.paths.iter().enumerate().filter(|(_, p)| p.is_retained())
    }

    /// Number of paths of a kind.
    pub fn count(&self, kind: PathKind) -> usize {
        self.paths.iter().filter(|p| p.kind == kind).count()
    }

    /// Edge cuts of the retained paths.
    pub fn edge_cuts(&self) -> &EdgeCuts<I> {
        &self.cuts
    }
}

/// Identity of a passage for deduplication: start, end and coarse direction.
type PassageKey = (usize, [i64; 3], [i64; 3]);

fn passage_key<I: MeshIndex>(path: &SeparatrixPath<I>, cell: f64) -> PassageKey {
    let quantize = |v: Vector3<f64>| [v.x.round() as i64, v.y.round() as i64, v.z.round() as i64];
    let end = match (path.end, path.points.last()) {
        (Some(v), _) => [v.index() as i64, -1, -1],
        (None, Some(p)) => quantize(p.position.coords / cell),
        (None, None) => [-1; 3],
    };
    (path.start.index(), end, quantize(path.initial_direction() * 8.0))
}

/// Drop degenerate and duplicate passages.
///
/// Near-zero paths and repeats of an earlier (start, end, direction) become
/// [`PathKind::Redundant`]; closed loops and paths that drift too far across
/// cuts become [`PathKind::SingToNothing`]. Returns how many were dropped.
fn filter_passages<I: MeshIndex>(paths: &mut [SeparatrixPath<I>], mean_edge: f64, diff_tolerance: f64) -> usize {
    let mut seen: HashSet<PassageKey> = HashSet::new();
    let mut dropped = 0;
    for path in paths.iter_mut().filter(|p| p.is_retained()) {
        let demote = if path.length() < 1e-6 * mean_edge || !seen.insert(passage_key(path, 1e-3 * mean_edge)) {
            Some(PathKind::Redundant)
        } else if path.kind == PathKind::SingToSing && (path.end == Some(path.start) || path.diff > diff_tolerance) {
            Some(PathKind::SingToNothing)
        } else {
            None
        };
        if let Some(kind) = demote {
            path.kind = kind;
            dropped += 1;
        }
    }
    dropped
}

/// Trace every separatrix of the surface and commit the retained ones.
pub fn trace_separatrices<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    graph: &CutGraph<I>,
    potential: &Potential,
    singularities: &Singularities<I>,
    options: &LayoutOptions,
    diagnostics: &mut Diagnostics,
) -> Separatrices<I> {
    let mesh = surface.mesh();
    let mean_edge = mesh.mean_edge_length();
    let sources = singularities.sources(surface);
    let mut is_source = vec![false; mesh.num_vertices()];
    for &v in &sources {
        is_source[v.index()] = true;
    }

    let tracer = Tracer {
        surface,
        graph,
        potential,
        is_source,
        close_distance: options.closing_tolerance * mean_edge,
        max_crossings: options.max_cut_crossings,
        max_steps: 4 * (mesh.num_faces() + mesh.num_vertices()) + 16,
    };

    let jobs: Vec<_> = sources
        .iter()
        .flat_map(|&v| tracer.exits(v).into_iter().map(move |exit| (v, exit)))
        .collect();
    let traced: Vec<(SeparatrixPath<I>, bool)> = if options.parallel {
        jobs.par_iter().map(|(v, exit)| tracer.trace(*v, exit)).collect()
    } else {
        jobs.iter().map(|(v, exit)| tracer.trace(*v, exit)).collect()
    };

    let runaway = traced.iter().filter(|(_, r)| *r).count();
    let mut paths: Vec<SeparatrixPath<I>> = traced.into_iter().map(|(p, _)| p).collect();
    if runaway > 0 {
        diagnostics.warn(
            IssueKind::IterationCap,
            format!("{} separatrices abandoned at the crossing or step cap", runaway),
        );
    }

    let dropped = filter_passages(&mut paths, mean_edge, options.diff_tolerance);

    let mut cuts = EdgeCuts::new(mesh);
    for (id, path) in paths.iter_mut().enumerate() {
        if !path.is_retained() {
            continue;
        }
        if cuts.conflicts(mesh, path) {
            path.kind = PathKind::Redundant;
        } else {
            cuts.insert(mesh, id, path);
        }
    }

    let result = Separatrices { paths, cuts };
    log::debug!(
        "separatrices: {} sources, {} traced, {} sing-sing, {} sing-boundary, {} abandoned, {} redundant ({} filtered)",
        sources.len(),
        result.paths.len(),
        result.count(PathKind::SingToSing),
        result.count(PathKind::SingToBdry),
        result.count(PathKind::SingToNothing),
        result.count(PathKind::Redundant),
        dropped
    );
    result
}
