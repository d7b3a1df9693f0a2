//! STL (stereolithography) input.
//!
//! STL stores every triangle with its own three corners, so shared corners
//! are welded back together before the surface is built. Binary and ASCII
//! files are both accepted.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{LayoutError, Result};
use crate::mesh::{MeshIndex, SurfaceMesh};

/// Corners closer than this are welded into one vertex.
pub const WELD_TOLERANCE: f64 = 1e-10;

/// Load a surface from an STL file.
///
/// # Example
///
/// ```no_run
/// use quadlayout::io::stl;
/// use quadlayout::mesh::SurfaceMesh;
///
/// let surface: SurfaceMesh = stl::load("part.stl").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<SurfaceMesh<I>> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    read(&mut reader).map_err(|e| match e {
        LayoutError::LoadError { message, .. } => LayoutError::LoadError {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Read a surface from any seekable STL stream.
pub fn read<R: Read + Seek, I: MeshIndex>(reader: &mut R) -> Result<SurfaceMesh<I>> {
    let stl = stl_io::read_stl(reader).map_err(|e| load_error(e.to_string()))?;

    let mut welder = Welder::new(WELD_TOLERANCE);
    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(stl.faces.len());
    let mut skipped = 0;
    for tri in &stl.faces {
        let corners = tri.vertices.map(|i| {
            let v = &stl.vertices[i];
            welder.insert(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        });
        if corners[0] != corners[1] && corners[1] != corners[2] && corners[0] != corners[2] {
            faces.push(corners);
        } else {
            skipped += 1;
        }
    }

    if faces.is_empty() {
        return Err(load_error("STL file contains no valid triangles".to_string()));
    }
    if skipped > 0 {
        log::warn!("skipped {} STL triangle(s) collapsed by welding", skipped);
    }
    log::debug!(
        "read STL: {} triangles, {} welded vertices",
        faces.len(),
        welder.vertices.len()
    );

    SurfaceMesh::from_triangles(&welder.vertices, &faces)
}

fn load_error(message: String) -> LayoutError {
    LayoutError::LoadError {
        path: Default::default(),
        message,
    }
}

/// Welds points through a hash grid with cells of the weld tolerance.
struct Welder {
    tolerance: f64,
    cells: HashMap<[i64; 3], Vec<usize>>,
    vertices: Vec<Point3<f64>>,
}

impl Welder {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            cells: HashMap::new(),
            vertices: Vec::new(),
        }
    }

    fn cell(&self, p: &Point3<f64>) -> [i64; 3] {
        [0, 1, 2].map(|k| (p[k] / self.tolerance).floor() as i64)
    }

    fn insert(&mut self, p: Point3<f64>) -> usize {
        let [x, y, z] = self.cell(&p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&[x + dx, y + dy, z + dz]) else {
                        continue;
                    };
                    if let Some(&i) = bucket.iter().find(|&&i| (self.vertices[i] - p).norm() < self.tolerance) {
                        return i;
                    }
                }
            }
        }
        let index = self.vertices.len();
        self.vertices.push(p);
        self.cells.entry([x, y, z]).or_default().push(index);
        index
    }
}
