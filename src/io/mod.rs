//! Surface file input.
//!
//! | Format | Extension | Load | Notes |
//! |--------|-----------|------|-------|
//! | STL | `.stl` | ✓ | Binary and ASCII, corners welded |
//!
//! ```no_run
//! use quadlayout::io::load;
//! use quadlayout::mesh::SurfaceMesh;
//!
//! let surface: SurfaceMesh = load("part.stl").unwrap();
//! ```

pub mod stl;

use std::path::Path;

use crate::error::{LayoutError, Result};
use crate::mesh::{MeshIndex, SurfaceMesh};

/// Supported surface file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// STL (stereolithography) format.
    Stl,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "stl" => Some(Format::Stl),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

/// Load a surface, picking the reader from the file extension.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<SurfaceMesh<I>> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| LayoutError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })?;

    match format {
        Format::Stl => stl::load(path),
    }
}
