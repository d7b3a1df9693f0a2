//! Walking one iso-line through the triangulation.

use std::f64::consts::FRAC_1_SQRT_2;

use nalgebra::{Point3, Vector3};

use super::{PathKind, PathLocation, PathPoint, SeparatrixPath, Span};
use crate::algo::cutgraph::CutGraph;
use crate::algo::geometry::point_segment_distance;
use crate::algo::potential::Potential;
use crate::mesh::{EdgeId, FaceId, HalfEdgeId, MeshIndex, SurfaceMesh, VertexClass, VertexId};

/// Relative potential difference under which an edge counts as an iso-line.
const ALIGN_TOLERANCE: f64 = 1e-4;

/// Edge parameter under which a crossing snaps to the edge endpoint.
const SNAP: f64 = 1e-9;

/// Potential differences below this are treated as a constant field.
const VALUE_EPSILON: f64 = 1e-14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ExitKind<I: MeshIndex> {
    /// Along the edge to a neighbor vertex.
    Along(VertexId<I>),
    /// Through the opposite edge at parameter `t` of the half-edge.
    Through { he: HalfEdgeId<I>, t: f64 },
}

/// A direction in which an iso-line leaves a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Exit<I: MeshIndex> {
    pub face: FaceId<I>,
    pub field: usize,
    pub value: f64,
    pub kind: ExitKind<I>,
    pub direction: Vector3<f64>,
}

enum State<I: MeshIndex> {
    /// Leaving face `face_of(he)` through `he` at parameter `t`.
    Edge { he: HalfEdgeId<I>, t: f64, field: usize, value: f64 },
    /// Arrived at a vertex heading in `direction`.
    Vertex { v: VertexId<I>, direction: Vector3<f64> },
    Done { kind: PathKind, end: Option<VertexId<I>>, runaway: bool },
}

/// Read-only context shared by all traces.
pub(crate) struct Tracer<'a, I: MeshIndex> {
    pub surface: &'a SurfaceMesh<I>,
    pub graph: &'a CutGraph<I>,
    pub potential: &'a Potential,
    pub is_source: Vec<bool>,
    pub close_distance: f64,
    pub max_crossings: usize,
    pub max_steps: usize,
}

impl<'a, I: MeshIndex> Tracer<'a, I> {
    fn corner_value(&self, f: FaceId<I>, v: VertexId<I>, field: usize) -> f64 {
        self.potential
            .at(self.surface, self.graph, f, v)
            .map_or(0.0, |uv| uv[field])
    }

    fn position(&self, v: VertexId<I>) -> Point3<f64> {
        *self.surface.mesh().position(v)
    }

    fn halfedge_point(&self, he: HalfEdgeId<I>, t: f64) -> Point3<f64> {
        let mesh = self.surface.mesh();
        let a = mesh.position(mesh.origin(he));
        let b = mesh.position(mesh.dest(he));
        Point3::from(a.coords * (1.0 - t) + b.coords * t)
    }

    fn edge_location(&self, he: HalfEdgeId<I>, t: f64) -> PathLocation<I> {
        let mesh = self.surface.mesh();
        let edge = mesh.edge_of(he);
        let t = if mesh.edge_halfedge(edge) == he { t } else { 1.0 - t };
        PathLocation::Edge { edge, t }
    }

    /// Separatrices stop at the boundary and at embedded curves.
    fn blocks(&self, e: EdgeId<I>) -> bool {
        self.surface.mesh().is_boundary_edge(e) || self.surface.is_internal_curve_edge(e)
    }

    /// Iso-lines through `v`, one per field and face, deduplicated along edges.
    pub fn exits(&self, v: VertexId<I>) -> Vec<Exit<I>> {
        let mesh = self.surface.mesh();
        let origin = self.position(v);
        let mut exits = Vec::new();
        let mut along: Vec<VertexId<I>> = Vec::new();

        for f in mesh.vertex_faces(v) {
            let Some(k) = mesh.corner_of(f, v) else { continue };
            let tri = mesh.face_triangle(f);
            let (n1, n2) = (tri[(k + 1) % 3], tri[(k + 2) % 3]);
            for field in 0..2 {
                let value = self.corner_value(f, v, field);
                let d1 = self.corner_value(f, n1, field) - value;
                let d2 = self.corner_value(f, n2, field) - value;
                let scale = d1.abs() + d2.abs();
                if scale < VALUE_EPSILON {
                    continue;
                }
                let flat1 = d1.abs() <= ALIGN_TOLERANCE * scale;
                let flat2 = d2.abs() <= ALIGN_TOLERANCE * scale;
                for (flat, n) in [(flat1, n1), (flat2, n2)] {
                    if !flat || along.contains(&n) {
                        continue;
                    }
                    let Some(he) = mesh.find_halfedge(v, n) else { continue };
                    if self.blocks(mesh.edge_of(he)) {
                        continue;
                    }
                    along.push(n);
                    exits.push(Exit {
                        face: f,
                        field,
                        value,
                        kind: ExitKind::Along(n),
                        direction: (self.position(n) - origin).normalize(),
                    });
                }
                if !flat1 && !flat2 && d1 * d2 < 0.0 {
                    let he = mesh.face_halfedges(f)[(k + 1) % 3];
                    let t = d1 / (d1 - d2);
                    let p = self.halfedge_point(he, t);
                    exits.push(Exit {
                        face: f,
                        field,
                        value,
                        kind: ExitKind::Through { he, t },
                        direction: (p - origin).try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros),
                    });
                }
            }
        }
        exits
    }

    /// Trace the iso-line leaving `start` through `exit`.
    ///
    /// The flag is set when the walk hit one of its iteration caps.
    pub fn trace(&self, start: VertexId<I>, exit: &Exit<I>) -> (SeparatrixPath<I>, bool) {
        let mut path = SeparatrixPath {
            kind: PathKind::SingToNothing,
            start,
            end: None,
            field: exit.field,
            points: vec![PathPoint {
                position: self.position(start),
                location: PathLocation::Vertex(start),
            }],
            spans: Vec::new(),
            crossings: Vec::new(),
            diff: 0.0,
        };

        let mut state = self.take_exit(&mut path, start, exit);
        let mut steps = 0;
        loop {
            state = match state {
                State::Done { kind, end, runaway } => {
                    path.kind = kind;
                    path.end = end;
                    log::trace!(
                        "separatrix from {:?}: {:?} with {} points, {} crossings",
                        start,
                        kind,
                        path.points.len(),
                        path.crossings.len()
                    );
                    return (path, runaway);
                }
                _ if steps >= self.max_steps => State::Done {
                    kind: PathKind::SingToNothing,
                    end: None,
                    runaway: true,
                },
                State::Edge { he, t, field, value } => self.cross_edge(&mut path, he, t, field, value),
                State::Vertex { v, direction } => self.pass_vertex(&mut path, v, direction),
            };
            steps += 1;
        }
    }

    fn push(&self, path: &mut SeparatrixPath<I>, location: PathLocation<I>, span: Span<I>) {
        let position = match location {
            PathLocation::Vertex(v) => self.position(v),
            PathLocation::Edge { edge, t } => self.surface.mesh().edge_point(edge, t),
        };
        path.points.push(PathPoint { position, location });
        path.spans.push(span);
    }

    /// Source corner of `f` the segment `a`-`b` passes within the closing distance of.
    fn closing_target(&self, path: &SeparatrixPath<I>, f: FaceId<I>, a: &Point3<f64>, b: &Point3<f64>) -> Option<VertexId<I>> {
        let leaving_start = path.points.len() == 1;
        self.surface
            .mesh()
            .face_triangle(f)
            .into_iter()
            .filter(|&s| self.is_source[s.index()] && !(leaving_start && s == path.start))
            .map(|s| (s, point_segment_distance(&self.position(s), a, b)))
            .filter(|&(_, d)| d < self.close_distance)
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(s, _)| s)
    }

    fn take_exit(&self, path: &mut SeparatrixPath<I>, v: VertexId<I>, exit: &Exit<I>) -> State<I> {
        let mesh = self.surface.mesh();
        match exit.kind {
            ExitKind::Along(n) => {
                let Some(he) = mesh.find_halfedge(v, n) else {
                    return State::Done {
                        kind: PathKind::SingToNothing,
                        end: None,
                        runaway: false,
                    };
                };
                self.push(path, PathLocation::Vertex(n), Span::Edge(mesh.edge_of(he)));
                State::Vertex {
                    v: n,
                    direction: exit.direction,
                }
            }
            ExitKind::Through { he, t } => {
                let p = self.halfedge_point(he, t);
                if let Some(target) = self.closing_target(path, exit.face, &self.position(v), &p) {
                    self.push(path, PathLocation::Vertex(target), Span::Face(exit.face));
                    return State::Done {
                        kind: PathKind::SingToSing,
                        end: Some(target),
                        runaway: false,
                    };
                }
                self.push(path, self.edge_location(he, t), Span::Face(exit.face));
                State::Edge {
                    he,
                    t,
                    field: exit.field,
                    value: exit.value,
                }
            }
        }
    }

    fn cross_edge(&self, path: &mut SeparatrixPath<I>, he: HalfEdgeId<I>, t: f64, field: usize, value: f64) -> State<I> {
        let mesh = self.surface.mesh();
        let e = mesh.edge_of(he);
        let twin = mesh.twin(he);
        let g = mesh.face_of(twin);
        if self.blocks(e) || !g.is_valid() {
            return State::Done {
                kind: PathKind::SingToBdry,
                end: None,
                runaway: false,
            };
        }

        let (mut field, mut value) = (field, value);
        if self.graph.is_cut_edge(e) {
            let Some(crossing) = self.graph.crossing(self.surface, e, mesh.face_of(he)) else {
                // Unresolved group: there is no transition to follow.
                return State::Done {
                    kind: PathKind::SingToNothing,
                    end: None,
                    runaway: false,
                };
            };
            let group = self.graph.group(crossing.group);
            let m = group.matrix();
            let (next, mapped) = if crossing.forward {
                let row = (0..2).find(|&r| m[r][field] != 0).unwrap_or(field);
                (row, m[row][field] as f64 * value + group.jump[row])
            } else {
                let col = (0..2).find(|&c| m[field][c] != 0).unwrap_or(field);
                (col, m[field][col] as f64 * (value - group.jump[field]))
            };
            path.crossings.push((crossing.group, if crossing.forward { 1 } else { -1 }));
            if path.crossings.len() > self.max_crossings {
                return State::Done {
                    kind: PathKind::SingToNothing,
                    end: None,
                    runaway: true,
                };
            }
            let s = 1.0 - t;
            let interpolated = (1.0 - s) * self.corner_value(g, mesh.origin(twin), next)
                + s * self.corner_value(g, mesh.dest(twin), next);
            path.diff += (mapped - interpolated).abs();
            field = next;
            value = interpolated;
        }
        self.walk_face(path, g, twin, field, value)
    }

    /// Follow the iso-line `field == value` through face `g`, entered across `entry`.
    fn walk_face(&self, path: &mut SeparatrixPath<I>, g: FaceId<I>, entry: HalfEdgeId<I>, field: usize, value: f64) -> State<I> {
        let mesh = self.surface.mesh();
        let h1 = mesh.next(entry);
        let h2 = mesh.next(h1);

        let mut best: Option<(HalfEdgeId<I>, f64, f64)> = None;
        for h in [h1, h2] {
            let va = self.corner_value(g, mesh.origin(h), field);
            let vb = self.corner_value(g, mesh.dest(h), field);
            if (vb - va).abs() < VALUE_EPSILON {
                continue;
            }
            let s = (value - va) / (vb - va);
            if !(-SNAP..=1.0 + SNAP).contains(&s) {
                continue;
            }
            let margin = s.min(1.0 - s);
            if best.map_or(true, |(_, _, m)| margin > m) {
                best = Some((h, s.clamp(0.0, 1.0), margin));
            }
        }
        let Some((h, s, _)) = best else {
            return State::Done {
                kind: PathKind::SingToNothing,
                end: None,
                runaway: false,
            };
        };

        let hit = if s <= SNAP {
            Some(mesh.origin(h))
        } else if s >= 1.0 - SNAP {
            Some(mesh.dest(h))
        } else {
            None
        };
        let p_in = path.points.last().map_or_else(Point3::origin, |p| p.position);
        let p_out = hit.map_or_else(|| self.halfedge_point(h, s), |v| self.position(v));

        if let Some(target) = self.closing_target(path, g, &p_in, &p_out) {
            self.push(path, PathLocation::Vertex(target), Span::Face(g));
            return State::Done {
                kind: PathKind::SingToSing,
                end: Some(target),
                runaway: false,
            };
        }

        match hit {
            Some(v) => {
                self.push(path, PathLocation::Vertex(v), Span::Face(g));
                State::Vertex {
                    v,
                    direction: (p_out - p_in).try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros),
                }
            }
            None => {
                self.push(path, self.edge_location(h, s), Span::Face(g));
                State::Edge { he: h, t: s, field, value }
            }
        }
    }

    fn pass_vertex(&self, path: &mut SeparatrixPath<I>, v: VertexId<I>, direction: Vector3<f64>) -> State<I> {
        if self.is_source[v.index()] {
            return State::Done {
                kind: PathKind::SingToSing,
                end: Some(v),
                runaway: false,
            };
        }
        if self.surface.mesh().is_boundary_vertex(v) || self.surface.vertex_class(v) != VertexClass::Interior {
            return State::Done {
                kind: PathKind::SingToBdry,
                end: None,
                runaway: false,
            };
        }

        let exits = self.exits(v);
        let straightest = exits
            .iter()
            .map(|x| (x, x.direction.dot(&direction)))
            .filter(|&(_, dot)| dot > FRAC_1_SQRT_2)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match straightest {
            Some((exit, _)) => self.take_exit(path, v, exit),
            None => State::Done {
                kind: PathKind::SingToNothing,
                end: None,
                runaway: false,
            },
        }
    }
}
