//! Quad layout assembly.
//!
//! The retained separatrices are cut into the triangulation: every edge
//! point becomes a vertex, and every triangle crossed by separatrix chords
//! is split along them and re-triangulated. Triangles are then grouped into
//! blocks by flood fill across edges that are neither separatrices nor
//! curves. Finally the separatrix edges of each path are chained into
//! ordered [`SeparatrixCurve`]s.
//!
//! # Cut patterns
//!
//! The chords inside one triangle form a [`CutPattern`]. Counting the points
//! where chords meet the sides of the triangle:
//!
//! | Pattern       | Chords                        | Side cuts          |
//! |---------------|-------------------------------|--------------------|
//! | `Uncut`       | none                          | 0                  |
//! | `Single`      | one                           | 1 (from a corner) or 2 |
//! | `Parallel`    | several, pairwise disjoint    | up to 2 per chord  |
//! | `Crossing`    | meeting at interior points    | 3, 4, 6 and more   |
//!
//! Every chord runs from side to side of a convex polygon, so it splits each
//! piece it passes through into two convex pieces. Crossing chords are
//! inserted one after the other, through the points where they meet the
//! chords already inserted.
//!
//! A chord ending on an interior edge point that the neighbouring triangle
//! does not continue is a T-junction. Only that chord is removed; the line
//! then ends at the chord's other point.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use nalgebra::{Point2, Point3};

use super::cutgraph::CutGraph;
use super::diagnostics::{Diagnostics, IssueKind};
use super::geometry::{barycentric, FaceFrame};
use super::potential::Potential;
use super::separatrix::{EdgeCuts, PathLocation};
use crate::error::Result;
use crate::mesh::{build_from_triangles, EdgeId, FaceId, HalfEdgeMesh, MeshIndex, SurfaceMesh, VertexId};

/// How separatrix chords cut one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutPattern {
    /// No chords.
    Uncut,
    /// One chord.
    Single,
    /// Several chords that do not meet.
    Parallel(usize),
    /// Chords meeting inside the triangle.
    Crossing {
        /// Number of chords.
        chords: usize,
        /// Number of pairwise meeting points.
        crossings: usize,
    },
}

/// Where a layout vertex comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VertexOrigin<I: MeshIndex = u32> {
    /// An input vertex.
    Vertex(VertexId<I>),
    /// A separatrix point on an input edge.
    Edge {
        /// The edge.
        edge: EdgeId<I>,
        /// Parameter along its canonical orientation.
        t: f64,
    },
    /// Separatrices crossing inside an input face.
    Face(FaceId<I>),
}

/// What a tagged layout edge lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeTag {
    /// The surface boundary, with its curve.
    Boundary(Option<usize>),
    /// An embedded curve.
    Curve(usize),
    /// A separatrix, by path id.
    Separatrix(usize),
}

/// A layout edge separating two blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutEdge {
    /// Endpoints, smaller index first.
    pub vertices: [usize; 2],
    /// What the edge lies on.
    pub tag: EdgeTag,
}

/// A connected run of layout edges along one separatrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatrixCurve {
    /// Path the curve belongs to.
    pub path: usize,
    /// Layout vertices in order along the curve.
    pub vertices: Vec<usize>,
}

impl SeparatrixCurve {
    /// Number of layout edges on the curve.
    pub fn num_edges(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Whether the curve returns to its first vertex.
    pub fn is_closed(&self) -> bool {
        self.vertices.len() > 2 && self.vertices.first() == self.vertices.last()
    }
}

/// The surface cut along its separatrices and split into blocks.
#[derive(Debug, Clone)]
pub struct QuadLayout<I: MeshIndex = u32> {
    positions: Vec<Point3<f64>>,
    origins: Vec<VertexOrigin<I>>,
    triangles: Vec<[usize; 3]>,
    source_faces: Vec<FaceId<I>>,
    uv: Vec<[[f64; 2]; 3]>,
    patches: Vec<usize>,
    num_patches: usize,
    edges: Vec<LayoutEdge>,
    curves: Vec<SeparatrixCurve>,
    excluded_chords: usize,
    unsplit_chords: usize,
}

impl<I: MeshIndex> QuadLayout<I> {
    /// Vertex positions; input vertices keep their index.
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Origin of a vertex.
    pub fn origin(&self, v: usize) -> VertexOrigin<I> {
        self.origins[v]
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Triangles.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Input face a triangle was cut from.
    pub fn source_face(&self, t: usize) -> FaceId<I> {
        self.source_faces[t]
    }

    /// Potentials at the corners of a triangle.
    pub fn uv(&self, t: usize) -> [[f64; 2]; 3] {
        self.uv[t]
    }

    /// Block of a triangle.
    pub fn patch(&self, t: usize) -> usize {
        self.patches[t]
    }

    /// Number of blocks.
    pub fn num_patches(&self) -> usize {
        self.num_patches
    }

    /// Triangles of one block.
    pub fn patch_triangles(&self, patch: usize) -> Vec<usize> {
        (0..self.triangles.len()).filter(|&t| self.patches[t] == patch).collect()
    }

    /// Area of one block.
    pub fn patch_area(&self, patch: usize) -> f64 {
        self.patch_triangles(patch)
            .into_iter()
            .map(|t| triangle_area(&self.positions, self.triangles[t]))
            .sum()
    }

    /// Edges on the boundary, on curves, and on separatrices.
    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    /// Number of edges tagged with a separatrix.
    pub fn num_separatrix_edges(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| matches!(e.tag, EdgeTag::Separatrix(_)))
            .count()
    }

    /// Separatrix curves, ordered by path id.
    pub fn separatrix_curves(&self) -> &[SeparatrixCurve] {
        &self.curves
    }

    /// Curves of one path.
    pub fn curves_of(&self, path: usize) -> impl Iterator<Item = &SeparatrixCurve> + '_ {
        self.curves.iter().filter(move |c| c.path == path)
    }

    /// Chords dropped at T-junctions.
    pub fn excluded_chords(&self) -> usize {
        self.excluded_chords
    }

    /// Chords no piece of their triangle could be split along.
    pub fn unsplit_chords(&self) -> usize {
        self.unsplit_chords
    }

    /// Build a half-edge mesh of the cut triangulation.
    pub fn to_mesh(&self) -> Result<HalfEdgeMesh<I>> {
        build_from_triangles(&self.positions, &self.triangles)
    }
}

fn triangle_area(positions: &[Point3<f64>], t: [usize; 3]) -> f64 {
    let [a, b, c] = t.map(|v| positions[v]);
    0.5 * (b - a).cross(&(c - a)).norm()
}

/// Parameters along `a` and `b` of their crossing, when they cross away from
/// their endpoints.
fn proper_intersection(a: &[Point2<f64>; 2], b: &[Point2<f64>; 2]) -> Option<(f64, f64)> {
    let side = |o: &Point2<f64>, p: &Point2<f64>, q: &Point2<f64>| (p - o).perp(&(q - o));
    let d1 = side(&a[0], &a[1], &b[0]);
    let d2 = side(&a[0], &a[1], &b[1]);
    let d3 = side(&b[0], &b[1], &a[0]);
    let d4 = side(&b[0], &b[1], &a[1]);
    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        Some((d3 / (d3 - d4), d1 / (d1 - d2)))
    } else {
        None
    }
}

/// Every pair of crossing chords, with the crossing parameter along each.
fn chord_crossings(chords: &[[Point2<f64>; 2]]) -> Vec<(usize, usize, f64, f64)> {
    let mut hits = Vec::new();
    for i in 0..chords.len() {
        for j in i + 1..chords.len() {
            if let Some((s, t)) = proper_intersection(&chords[i], &chords[j]) {
                hits.push((i, j, s, t));
            }
        }
    }
    hits
}

/// Classify the chords of a triangle, given in its plane.
pub fn classify(chords: &[[Point2<f64>; 2]]) -> CutPattern {
    match chords.len() {
        0 => CutPattern::Uncut,
        1 => CutPattern::Single,
        n => match chord_crossings(chords).len() {
            0 => CutPattern::Parallel(n),
            crossings => CutPattern::Crossing { chords: n, crossings },
        },
    }
}

/// Split the polygon holding `a` and `b` along `a, interior.., b`.
///
/// Returns false when no polygon holds both ends.
fn split_polygon(polygons: &mut Vec<Vec<usize>>, a: usize, b: usize, interior: &[usize]) -> bool {
    let found = polygons.iter().enumerate().find_map(|(pi, p)| {
        let ia = p.iter().position(|&v| v == a)?;
        let ib = p.iter().position(|&v| v == b)?;
        Some((pi, ia, ib))
    });
    let Some((pi, ia, ib)) = found else {
        return false;
    };
    let n = polygons[pi].len();
    if interior.is_empty() && ((ia + 1) % n == ib || (ib + 1) % n == ia) {
        return true;
    }
    let poly = polygons.swap_remove(pi);
    let arc = |from: usize, to: usize| -> Vec<usize> {
        let len = (to + n - from) % n + 1;
        (0..len).map(|k| poly[(from + k) % n]).collect()
    };
    let mut first = arc(ia, ib);
    first.extend(interior.iter().rev());
    let mut second = arc(ib, ia);
    second.extend(interior.iter());
    polygons.push(first);
    polygons.push(second);
    true
}

/// Ear-clip a convex polygon whose sides may hold collinear points.
fn triangulate_polygon(polygon: &[usize], positions: &[Point3<f64>], min_area: f64, out: &mut Vec<[usize; 3]>) {
    let mut ring = polygon.to_vec();
    while ring.len() > 3 {
        let n = ring.len();
        let ear = (0..n).find(|&i| triangle_area(positions, [ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]]) > min_area);
        let Some(i) = ear else { return };
        out.push([ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]]);
        ring.remove(i);
    }
    if ring.len() == 3 && triangle_area(positions, [ring[0], ring[1], ring[2]]) > min_area {
        out.push([ring[0], ring[1], ring[2]]);
    }
}

/// One face split along its chords.
struct Split {
    triangles: Vec<[usize; 3]>,
    /// Chord pieces, each with the index of its chord.
    pieces: Vec<([usize; 2], usize)>,
    /// Chords whose ends were not found on a common piece.
    failed: usize,
}

/// Split one polygon along its chords.
///
/// `planar` holds the chords in the plane of the face. Crossing points are
/// appended to `positions`; crossings closer than `sqrt(min_area)` share
/// one vertex.
fn retriangulate(
    positions: &mut Vec<Point3<f64>>,
    polygon: Vec<usize>,
    chords: &[[usize; 2]],
    planar: &[[Point2<f64>; 2]],
    min_area: f64,
) -> Split {
    let mut polygons = vec![polygon];
    let mut pieces = Vec::new();
    let mut failed = 0;
    match classify(planar) {
        CutPattern::Uncut => {}
        CutPattern::Single | CutPattern::Parallel(_) => {
            for (i, &[a, b]) in chords.iter().enumerate() {
                if split_polygon(&mut polygons, a, b, &[]) {
                    pieces.push(([a, b], i));
                } else {
                    failed += 1;
                }
            }
        }
        CutPattern::Crossing { .. } => {
            let merge = min_area.sqrt();
            let first_new = positions.len();
            let mut stops: Vec<Vec<(f64, usize)>> = chords.iter().map(|&[a, b]| vec![(0.0, a), (1.0, b)]).collect();
            for (i, j, s, t) in chord_crossings(planar) {
                let [a, b] = chords[i];
                let p = Point3::from(positions[a].coords.lerp(&positions[b].coords, s));
                let v = match (first_new..positions.len()).find(|&k| (positions[k] - p).norm() <= merge) {
                    Some(k) => k,
                    None => {
                        positions.push(p);
                        positions.len() - 1
                    }
                };
                stops[i].push((s, v));
                stops[j].push((t, v));
            }

            // Each chord is split between consecutive points already on a polygon side.
            let mut placed: HashSet<usize> = polygons[0].iter().copied().collect();
            for (i, mut stops) in stops.into_iter().enumerate() {
                stops.sort_by(|x, y| x.0.total_cmp(&y.0));
                stops.dedup_by_key(|stop| stop.1);
                let mut anchor = 0;
                let mut ok = true;
                for k in 1..stops.len() {
                    if placed.contains(&stops[k].1) {
                        let interior: Vec<usize> = stops[anchor + 1..k].iter().map(|stop| stop.1).collect();
                        ok &= split_polygon(&mut polygons, stops[anchor].1, stops[k].1, &interior);
                        anchor = k;
                    }
                }
                placed.extend(stops.iter().map(|stop| stop.1));
                if ok {
                    pieces.extend(stops.windows(2).map(|w| ([w[0].1, w[1].1], i)));
                } else {
                    failed += 1;
                }
            }
        }
    }
    let mut triangles = Vec::new();
    for poly in &polygons {
        triangulate_polygon(poly, positions, min_area, &mut triangles);
    }
    Split {
        triangles,
        pieces,
        failed,
    }
}

/// Order segments into maximal chains, starting from odd-degree vertices.
fn chain_segments(segments: &[[usize; 2]]) -> Vec<Vec<usize>> {
    let mut incident: HashMap<usize, Vec<usize>> = HashMap::new();
    for (s, &[a, b]) in segments.iter().enumerate() {
        incident.entry(a).or_default().push(s);
        incident.entry(b).or_default().push(s);
    }
    let mut ends: Vec<usize> = incident
        .iter()
        .filter(|(_, list)| list.len() % 2 == 1)
        .map(|(&v, _)| v)
        .collect();
    ends.sort_unstable();

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();
    for start in ends.into_iter().chain(segments.iter().map(|s| s[0])) {
        while let Some(first) = incident[&start].iter().copied().find(|&s| !used[s]) {
            let mut chain = vec![start];
            let (mut at, mut segment) = (start, first);
            loop {
                used[segment] = true;
                let [a, b] = segments[segment];
                at = if a == at { b } else { a };
                chain.push(at);
                match incident[&at].iter().copied().find(|&s| !used[s]) {
                    Some(next) => segment = next,
                    None => break,
                }
            }
            chains.push(chain);
        }
    }
    chains
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

fn project(frame: &FaceFrame, origin: &Point3<f64>, p: &Point3<f64>) -> Point2<f64> {
    let d = p - origin;
    Point2::new(d.dot(&frame.x), d.dot(&frame.y))
}

/// Cut the surface along the recorded separatrices and label the blocks.
pub fn assemble_layout<I: MeshIndex>(
    surface: &SurfaceMesh<I>,
    graph: &CutGraph<I>,
    potential: &Potential,
    cuts: &EdgeCuts<I>,
    diagnostics: &mut Diagnostics,
) -> QuadLayout<I> {
    let mesh = surface.mesh();
    let blocks = |e: EdgeId<I>| mesh.is_boundary_edge(e) || surface.is_internal_curve_edge(e);

    // Step 1: input vertices keep their index, edge points follow
    let mut positions: Vec<Point3<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();
    let mut origins: Vec<VertexOrigin<I>> = mesh.vertex_ids().map(VertexOrigin::Vertex).collect();
    let mut edge_points: Vec<Vec<usize>> = vec![Vec::new(); mesh.num_edges()];
    for e in mesh.edge_ids() {
        for p in cuts.points(e) {
            positions.push(mesh.edge_point(e, p.t));
            origins.push(VertexOrigin::Edge { edge: e, t: p.t });
            edge_points[e.index()].push(positions.len() - 1);
        }
    }
    let edge_chain = |e: EdgeId<I>| -> Vec<usize> {
        let [a, b] = mesh.edge_vertices(e);
        let mut chain = vec![a.index()];
        chain.extend(edge_points[e.index()].iter().copied());
        chain.push(b.index());
        chain
    };

    // Step 2: chords in layout vertex ids; chords along a side follow that edge
    let resolve = |location: PathLocation<I>| match location {
        PathLocation::Vertex(v) => Some(v.index()),
        PathLocation::Edge { edge, t } => cuts.find_point(edge, t).map(|i| edge_points[edge.index()][i]),
    };
    let sides = |f: FaceId<I>, location: PathLocation<I>| -> Vec<EdgeId<I>> {
        match location {
            PathLocation::Vertex(v) => mesh
                .face_edges(f)
                .into_iter()
                .filter(|&e| mesh.edge_vertices(e).contains(&v))
                .collect(),
            PathLocation::Edge { edge, .. } => vec![edge],
        }
    };
    let mut chords: Vec<Vec<([usize; 2], usize)>> = vec![Vec::new(); mesh.num_faces()];
    let mut along: Vec<(EdgeId<I>, [usize; 2], usize)> = Vec::new();
    for f in mesh.face_ids() {
        for chord in cuts.chords(f) {
            let (Some(a), Some(b)) = (resolve(chord.ends[0]), resolve(chord.ends[1])) else {
                continue;
            };
            if a == b {
                continue;
            }
            let first = sides(f, chord.ends[0]);
            match sides(f, chord.ends[1]).into_iter().find(|e| first.contains(e)) {
                Some(e) => along.push((e, [a, b], chord.path)),
                None => chords[f.index()].push(([a, b], chord.path)),
            }
        }
    }

    // Step 3: drop chords ending at T-junctions, judged on the chords as recorded
    let continued: HashSet<usize> = along.iter().flat_map(|(_, ends, _)| *ends).collect();
    let uses = |chords: &[([usize; 2], usize)], v: usize| chords.iter().any(|(c, _)| c.contains(&v));
    let mut t_junctions = Vec::new();
    for e in mesh.edge_ids().filter(|&e| !blocks(e)) {
        let faces: Vec<FaceId<I>> = mesh.edge_faces(e).into_iter().filter(|f| f.is_valid()).collect();
        for &v in edge_points[e.index()].iter().filter(|&&v| !continued.contains(&v)) {
            let using: Vec<FaceId<I>> = faces.iter().copied().filter(|f| uses(&chords[f.index()], v)).collect();
            if !using.is_empty() && using.len() < faces.len() {
                t_junctions.extend(using.into_iter().map(|f| (f, v)));
            }
        }
    }
    let mut excluded = 0;
    for &(f, v) in &t_junctions {
        let list = &mut chords[f.index()];
        let before = list.len();
        list.retain(|(c, _)| !c.contains(&v));
        excluded += before - list.len();
    }
    if excluded > 0 {
        diagnostics.warn(
            IssueKind::Topology,
            format!("{} separatrix chords ending at T-junctions excluded", excluded),
        );
    }

    // Step 4: split every face along its chords
    let mut triangles = Vec::new();
    let mut source_faces = Vec::new();
    let mut tags: BTreeMap<(usize, usize), EdgeTag> = BTreeMap::new();
    let mut unsplit = 0;
    for f in mesh.face_ids() {
        let mut polygon = Vec::new();
        for he in mesh.face_halfedges(f) {
            polygon.push(mesh.origin(he).index());
            let e = mesh.edge_of(he);
            let points = &edge_points[e.index()];
            if mesh.edge_halfedge(e) == he {
                polygon.extend(points.iter().copied());
            } else {
                polygon.extend(points.iter().rev().copied());
            }
        }
        let face_chords = &chords[f.index()];
        let ends: Vec<[usize; 2]> = face_chords.iter().map(|(c, _)| *c).collect();
        let frame = FaceFrame::new(mesh, f);
        let origin = *mesh.position(mesh.face_triangle(f)[0]);
        let planar: Vec<[Point2<f64>; 2]> = ends
            .iter()
            .map(|c| c.map(|v| project(&frame, &origin, &positions[v])))
            .collect();
        let first_new = positions.len();
        let min_area = 1e-9 * mesh.face_area(f);
        let split = retriangulate(&mut positions, polygon, &ends, &planar, min_area);
        origins.extend((first_new..positions.len()).map(|_| VertexOrigin::Face(f)));
        for ([a, b], chord) in split.pieces {
            tags.insert(edge_key(a, b), EdgeTag::Separatrix(face_chords[chord].1));
        }
        unsplit += split.failed;
        source_faces.extend(std::iter::repeat(f).take(split.triangles.len()));
        triangles.extend(split.triangles);
    }
    for &(e, [a, b], path) in &along {
        let chain = edge_chain(e);
        let (Some(i), Some(j)) = (chain.iter().position(|&v| v == a), chain.iter().position(|&v| v == b)) else {
            continue;
        };
        for w in chain[i.min(j)..=i.max(j)].windows(2) {
            tags.insert(edge_key(w[0], w[1]), EdgeTag::Separatrix(path));
        }
    }
    if unsplit > 0 {
        diagnostics.warn(
            IssueKind::Topology,
            format!("{} separatrix chords could not be split into their triangles", unsplit),
        );
    }

    // Step 5: input edges on the boundary, curves, or followed by a separatrix
    for e in mesh.edge_ids() {
        let tag = if let Some(path) = cuts.aligned(e) {
            EdgeTag::Separatrix(path)
        } else if mesh.is_boundary_edge(e) {
            EdgeTag::Boundary(surface.edge_curve(e))
        } else if let (true, Some(curve)) = (surface.is_internal_curve_edge(e), surface.edge_curve(e)) {
            EdgeTag::Curve(curve)
        } else {
            continue;
        };
        for w in edge_chain(e).windows(2) {
            tags.entry(edge_key(w[0], w[1])).or_insert(tag);
        }
    }

    // Step 6: potentials at the corners
    let uv: Vec<[[f64; 2]; 3]> = triangles
        .iter()
        .zip(&source_faces)
        .map(|(tri, &f)| {
            let corners = mesh.face_triangle(f).map(|v| potential.at(surface, graph, f, v).unwrap_or([0.0; 2]));
            let face = mesh.face_positions(f);
            tri.map(|v| match barycentric(&face, &positions[v]) {
                Some(w) => [0, 1].map(|c| w[0] * corners[0][c] + w[1] * corners[1][c] + w[2] * corners[2][c]),
                None => corners[0],
            })
        })
        .collect();

    // Step 7: blocks
    let mut adjacency: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            adjacency.entry(edge_key(tri[k], tri[(k + 1) % 3])).or_default().push(t);
        }
    }
    let mut patches = vec![usize::MAX; triangles.len()];
    let mut num_patches = 0;
    for seed in 0..triangles.len() {
        if patches[seed] != usize::MAX {
            continue;
        }
        patches[seed] = num_patches;
        let mut queue = VecDeque::from([seed]);
        while let Some(t) = queue.pop_front() {
            let tri = triangles[t];
            for k in 0..3 {
                let key = edge_key(tri[k], tri[(k + 1) % 3]);
                if tags.contains_key(&key) {
                    continue;
                }
                for &n in adjacency.get(&key).into_iter().flatten() {
                    if patches[n] == usize::MAX {
                        patches[n] = num_patches;
                        queue.push_back(n);
                    }
                }
            }
        }
        num_patches += 1;
    }

    let edges: Vec<LayoutEdge> = tags
        .into_iter()
        .map(|((a, b), tag)| LayoutEdge { vertices: [a, b], tag })
        .collect();

    // Step 8: separatrix curves; every committed path must leave at least one
    let mut by_path: BTreeMap<usize, Vec<[usize; 2]>> = BTreeMap::new();
    for edge in &edges {
        if let EdgeTag::Separatrix(path) = edge.tag {
            by_path.entry(path).or_default().push(edge.vertices);
        }
    }
    let curves: Vec<SeparatrixCurve> = by_path
        .iter()
        .flat_map(|(&path, segments)| {
            chain_segments(segments)
                .into_iter()
                .map(move |vertices| SeparatrixCurve { path, vertices })
        })
        .collect();
    let lost: Vec<usize> = cuts.paths().into_iter().filter(|p| !by_path.contains_key(p)).collect();
    if !lost.is_empty() {
        diagnostics.error(
            IssueKind::Topology,
            format!("retained separatrices {:?} contribute no layout edges", lost),
        );
    }

    log::debug!(
        "layout: {} blocks, {} triangles from {} faces, {} separatrix curves, {} chords excluded",
        num_patches,
        triangles.len(),
        mesh.num_faces(),
        curves.len(),
        excluded
    );

    QuadLayout {
        positions,
        origins,
        triangles,
        source_faces,
        uv,
        patches,
        num_patches,
        edges,
        curves,
        excluded_chords: excluded,
        unsplit_chords: unsplit,
    }
}
