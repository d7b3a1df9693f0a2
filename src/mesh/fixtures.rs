//! Test surfaces shared by the unit tests.

use std::collections::HashMap;
use std::f64::consts::PI;

use nalgebra::Point3;

use super::surface::SurfaceMesh;

fn surface(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> SurfaceMesh {
    SurfaceMesh::from_triangles(vertices, faces).unwrap()
}

/// Drop unreferenced vertices and renumber the faces.
fn compact(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let mut map = HashMap::new();
    let mut out = Vec::new();
    let faces = faces
        .iter()
        .map(|f| {
            f.map(|v| {
                *map.entry(v).or_insert_with(|| {
                    out.push(vertices[v]);
                    out.len() - 1
                })
            })
        })
        .collect();
    (out, faces)
}

/// Triangles of an `nx` by `ny` grid of cells, vertex (i, j) at index `j * (nx + 1) + i`.
fn grid_faces(nx: usize, ny: usize, keep: impl Fn(usize, usize) -> bool) -> Vec<[usize; 3]> {
    let mut faces = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            if !keep(i, j) {
                continue;
            }
            let a = j * (nx + 1) + i;
            let b = a + 1;
            let c = b + nx + 1;
            let d = a + nx + 1;
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    faces
}

fn grid_vertices(nx: usize, ny: usize, size: f64) -> Vec<Point3<f64>> {
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            vertices.push(Point3::new(
                size * i as f64 / nx as f64,
                size * j as f64 / ny as f64,
                0.0,
            ));
        }
    }
    vertices
}

/// Unit square split into `n` by `n` cells, two triangles each.
pub fn grid(n: usize) -> SurfaceMesh {
    surface(&grid_vertices(n, n, 1.0), &grid_faces(n, n, |_, _| true))
}

/// Raw vertices and faces of the unit square grid.
pub fn grid_data(n: usize) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    (grid_vertices(n, n, 1.0), grid_faces(n, n, |_, _| true))
}

/// L-shaped domain: a `2n` square grid without its upper-right quadrant.
pub fn l_shape(n: usize) -> SurfaceMesh {
    let m = 2 * n;
    let vertices = grid_vertices(m, m, 2.0);
    let faces = grid_faces(m, m, |i, j| i < n || j < n);
    let (vertices, faces) = compact(&vertices, &faces);
    surface(&vertices, &faces)
}

/// Two disjoint unit squares.
pub fn two_squares() -> SurfaceMesh {
    let (mut vertices, mut faces) = grid_data(2);
    let offset = vertices.len();
    let shifted: Vec<Point3<f64>> = vertices.iter().map(|p| p + nalgebra::Vector3::new(3.0, 0.0, 0.0)).collect();
    vertices.extend(shifted);
    let more: Vec<[usize; 3]> = faces.iter().map(|f| f.map(|v| v + offset)).collect();
    faces.extend(more);
    surface(&vertices, &faces)
}

/// Flat disk with `segments` boundary vertices and `rings` concentric rings.
pub fn disk(segments: usize, rings: usize) -> SurfaceMesh {
    let mut vertices = vec![Point3::origin()];
    for r in 1..=rings {
        let radius = r as f64 / rings as f64;
        for s in 0..segments {
            let a = 2.0 * PI * s as f64 / segments as f64;
            vertices.push(Point3::new(radius * a.cos(), radius * a.sin(), 0.0));
        }
    }
    let ring = |r: usize, s: usize| 1 + (r - 1) * segments + s % segments;
    let mut faces = Vec::new();
    for s in 0..segments {
        faces.push([0, ring(1, s), ring(1, s + 1)]);
    }
    for r in 1..rings {
        for s in 0..segments {
            let (a, b) = (ring(r, s), ring(r, s + 1));
            let (c, d) = (ring(r + 1, s + 1), ring(r + 1, s));
            faces.push([a, d, c]);
            faces.push([a, c, b]);
        }
    }
    surface(&vertices, &faces)
}

/// Unit icosahedron refined `level` times by midpoint subdivision.
pub fn icosphere(level: usize) -> SurfaceMesh {
    let (vertices, faces) = icosphere_data(level);
    surface(&vertices, &faces)
}

/// Raw vertices and faces of the icosphere.
pub fn icosphere_data(level: usize) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let mut vertices: Vec<Point3<f64>> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|p| Point3::from(nalgebra::Vector3::new(p[0], p[1], p[2]).normalize()))
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..level {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Point3<f64>>| {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                let m = (vertices[a].coords + vertices[b].coords).normalize();
                vertices.push(Point3::from(m));
                vertices.len() - 1
            })
        };
        let mut refined = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            refined.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = refined;
    }
    (vertices, faces)
}

/// Torus with `n` segments around the tube axis and `m` around the tube.
pub fn torus(n: usize, m: usize) -> SurfaceMesh {
    let (big, small) = (1.0, 0.35);
    let mut vertices = Vec::with_capacity(n * m);
    for i in 0..n {
        let u = 2.0 * PI * i as f64 / n as f64;
        for j in 0..m {
            let v = 2.0 * PI * j as f64 / m as f64;
            let r = big + small * v.cos();
            vertices.push(Point3::new(r * u.cos(), r * u.sin(), small * v.sin()));
        }
    }
    let idx = |i: usize, j: usize| (i % n) * m + j % m;
    let mut faces = Vec::with_capacity(2 * n * m);
    for i in 0..n {
        for j in 0..m {
            let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    surface(&vertices, &faces)
}

/// Three by three grid whose center vertex sits on its right neighbour,
/// collapsing the interior edge between them to zero length.
pub fn collapsed_edge() -> SurfaceMesh {
    let (mut vertices, faces) = grid_data(3);
    // Vertex (1, 1) onto vertex (2, 1).
    vertices[5] = vertices[6];
    surface(&vertices, &faces)
}

/// A lone triangle with two coincident vertices.
pub fn degenerate_triangle() -> SurfaceMesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
    ];
    surface(&vertices, &[[0, 1, 2]])
}
