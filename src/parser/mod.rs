//! Mesh file loading
//!
//! Uploads pass through a gate (extension and size) before any byte is
//! interpreted, then are dispatched to the STL or 3MF reader. Every reader
//! produces a [`Mesh`], which guarantees at least one triangle and finite
//! coordinates.

pub mod stl;
pub mod threemf;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::config::UploadLimits;
use crate::error::{Error, Result};
use crate::model::Mesh;

/// Mesh file formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshFormat {
    /// Binary or ASCII STL
    #[serde(rename = "stl")]
    Stl,
    /// 3MF package
    #[serde(rename = "3mf")]
    ThreeMf,
}

impl MeshFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::ThreeMf => "3mf",
        }
    }

    /// Determine the format from a file name's extension (case-insensitive)
    ///
    /// # Errors
    /// [`Error::UnsupportedFileType`] when the extension is missing or unknown.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                Error::UnsupportedFileType(format!(
                    "'{}' has no file extension. Upload an .stl or .3mf file",
                    file_name
                ))
            })?;

        if extension.eq_ignore_ascii_case("stl") {
            Ok(MeshFormat::Stl)
        } else if extension.eq_ignore_ascii_case("3mf") {
            Ok(MeshFormat::ThreeMf)
        } else {
            Err(Error::UnsupportedFileType(format!(
                "'.{}' files are not supported. Upload an .stl or .3mf file",
                extension
            )))
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Apply the upload gate without parsing
///
/// Checks the extension against the allowed formats and the size against the
/// ceiling, in that order.
pub fn check_upload(file_name: &str, size: usize, limits: &UploadLimits) -> Result<MeshFormat> {
    let format = MeshFormat::from_file_name(file_name)?;
    if !limits.allowed_formats.contains(&format) {
        return Err(Error::UnsupportedFileType(format!(
            "'.{}' uploads are disabled",
            format
        )));
    }
    if size > limits.max_file_size {
        return Err(Error::FileTooLarge {
            size,
            limit: limits.max_file_size,
        });
    }
    Ok(format)
}

/// Load a mesh from an uploaded file
///
/// # Arguments
///
/// * `file_name` - Uploaded file name; its extension selects the reader
/// * `bytes` - File contents
/// * `limits` - Upload gate
///
/// # Example
///
/// ```no_run
/// use printquote::{UploadLimits, parser::load_mesh};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("bracket.stl")?;
/// let mesh = load_mesh("bracket.stl", &bytes, &UploadLimits::default())?;
/// println!("{} triangles", mesh.triangle_count());
/// # Ok(())
/// # }
/// ```
pub fn load_mesh(file_name: &str, bytes: &[u8], limits: &UploadLimits) -> Result<Mesh> {
    let format = check_upload(file_name, bytes.len(), limits)?;
    debug!(file_name, %format, size = bytes.len(), "loading mesh");
    match format {
        MeshFormat::Stl => stl::parse_stl(bytes),
        MeshFormat::ThreeMf => threemf::parse_3mf_with_limit(bytes, limits.max_part_size),
    }
}
