//! STL (stereolithography) reader
//!
//! Both layouts are supported.
//!
//! # Binary
//!
//! ```text
//! UINT8[80]    – Header (ignored)
//! UINT32       – Number of triangles
//! foreach triangle
//!     REAL32[3] – Normal vector
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count
//! end
//! ```
//!
//! # ASCII
//!
//! ```text
//! solid name
//!   facet normal ni nj nk
//!     outer loop
//!       vertex v1x v1y v1z
//!       vertex v2x v2y v2z
//!       vertex v3x v3y v3z
//!     endloop
//!   endfacet
//! endsolid name
//! ```
//!
//! Many exporters write binary files whose header starts with `solid`, so a
//! buffer is only treated as ASCII when it starts with `solid`, its length
//! does not match the binary record layout, and the bytes after the header
//! look like text. Truncated or padded binary files with a `solid` header
//! therefore still reach the binary reader.

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Mesh, Triangle};

/// Binary header size in bytes
pub const HEADER_SIZE: usize = 80;

/// Header plus the triangle count
pub const PREAMBLE_SIZE: usize = HEADER_SIZE + 4;

/// Size of one binary triangle record (normal + 3 vertices + attribute)
pub const TRIANGLE_SIZE: usize = 50;

/// Bytes inspected when deciding whether a `solid` buffer is text
const TEXT_PROBE_SIZE: usize = 512;

/// Parse an STL buffer, detecting ASCII or binary layout
pub fn parse_stl(bytes: &[u8]) -> Result<Mesh> {
    if is_ascii_stl(bytes) {
        parse_ascii(bytes)
    } else {
        parse_binary(bytes)
    }
}

/// Whether the buffer should be read as ASCII STL
pub fn is_ascii_stl(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(HEADER_SIZE)];
    if !head.trim_ascii_start().starts_with(b"solid") {
        return false;
    }
    let matches_binary_layout = declared_triangle_count(bytes)
        .and_then(expected_binary_len)
        .is_some_and(|expected| expected == bytes.len());
    !matches_binary_layout && looks_like_text(bytes)
}

/// Text has no NUL or other control bytes besides whitespace in its first
/// few hundred bytes, while binary triangle counts and float records almost
/// always contain them. Non-ASCII bytes are allowed for UTF-8 solid names.
fn looks_like_text(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(TEXT_PROBE_SIZE)]
        .iter()
        .all(|&b| !b.is_ascii_control() || b.is_ascii_whitespace())
}

fn declared_triangle_count(bytes: &[u8]) -> Option<u32> {
    let count = bytes.get(HEADER_SIZE..PREAMBLE_SIZE)?;
    Some(u32::from_le_bytes([count[0], count[1], count[2], count[3]]))
}

fn expected_binary_len(count: u32) -> Option<usize> {
    (count as usize)
        .checked_mul(TRIANGLE_SIZE)
        .and_then(|records| records.checked_add(PREAMBLE_SIZE))
}

/// Parse a binary STL buffer
///
/// # Errors
/// - [`Error::Truncated`] when the buffer is shorter than the preamble or
///   than the records it declares
/// - [`Error::EmptyMesh`] when the declared count is zero
/// - [`Error::CorruptGeometry`] when a vertex coordinate is not finite
pub fn parse_binary(bytes: &[u8]) -> Result<Mesh> {
    let count = declared_triangle_count(bytes).ok_or(Error::Truncated {
        expected: PREAMBLE_SIZE,
        actual: bytes.len(),
    })?;

    if count == 0 {
        return Err(Error::EmptyMesh);
    }

    let expected = expected_binary_len(count).ok_or(Error::Truncated {
        expected: usize::MAX,
        actual: bytes.len(),
    })?;
    if bytes.len() < expected {
        return Err(Error::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        debug!(
            trailing = bytes.len() - expected,
            "ignoring bytes after the last STL triangle record"
        );
    }

    let records = &bytes[PREAMBLE_SIZE..expected];
    let mut triangles = Vec::with_capacity(count as usize);
    for (index, record) in records.chunks_exact(TRIANGLE_SIZE).enumerate() {
        let normal = read_vector(&record[0..12]);
        let a = read_point(&record[12..24]);
        let b = read_point(&record[24..36]);
        let c = read_point(&record[36..48]);
        for p in [&a, &b, &c] {
            if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                return Err(Error::CorruptGeometry(format!(
                    "binary STL triangle {} has a non-finite vertex coordinate",
                    index
                )));
            }
        }
        triangles.push(Triangle {
            vertices: [a, b, c],
            normal: usable_normal(normal),
        });
    }

    debug!(triangles = triangles.len(), "parsed binary STL");
    Mesh::from_triangles(triangles)
}

/// Read three little-endian f32s
fn read_f32s(buf: &[u8]) -> [f64; 3] {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    [f64::from(x), f64::from(y), f64::from(z)]
}

fn read_point(buf: &[u8]) -> Point3<f64> {
    let [x, y, z] = read_f32s(buf);
    Point3::new(x, y, z)
}

fn read_vector(buf: &[u8]) -> Vector3<f64> {
    let [x, y, z] = read_f32s(buf);
    Vector3::new(x, y, z)
}

/// Keep a declared normal only when it is finite and non-zero
fn usable_normal(normal: Vector3<f64>) -> Option<Vector3<f64>> {
    if normal.iter().all(|c| c.is_finite()) && normal.norm_squared() > 0.0 {
        Some(normal)
    } else {
        None
    }
}

/// Parse an ASCII STL buffer
///
/// Keywords are matched case-insensitively; unknown lines are ignored.
///
/// # Errors
/// - [`Error::InvalidFormat`] for unparsable coordinates or a facet without
///   exactly three vertices
/// - [`Error::CorruptGeometry`] for non-finite coordinates
/// - [`Error::EmptyMesh`] when no facet is found
pub fn parse_ascii(bytes: &[u8]) -> Result<Mesh> {
    let text = String::from_utf8_lossy(bytes);
    let mut triangles = Vec::new();
    let mut normal: Option<Vector3<f64>> = None;
    let mut loop_vertices: Vec<Point3<f64>> = Vec::with_capacity(3);
    let mut in_facet = false;

    for (line_index, line) in text.lines().enumerate() {
        let line_number = line_index + 1;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "facet" => {
                if in_facet {
                    return Err(Error::invalid_format_context(
                        &format!("ASCII STL line {}", line_number),
                        "facet starts before the previous one ended",
                    ));
                }
                in_facet = true;
                loop_vertices.clear();
                normal = None;
                if parts.next().is_some_and(|p| p.eq_ignore_ascii_case("normal")) {
                    // Unparsable normals are dropped, they do not affect pricing
                    if let Ok(n) = parse_coords(parts, line_number) {
                        normal = usable_normal(Vector3::new(n[0], n[1], n[2]));
                    }
                }
            }
            "vertex" => {
                if !in_facet {
                    return Err(Error::invalid_format_context(
                        &format!("ASCII STL line {}", line_number),
                        "vertex outside of a facet",
                    ));
                }
                let [x, y, z] = parse_coords(parts, line_number)?;
                if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                    return Err(Error::CorruptGeometry(format!(
                        "ASCII STL line {} has a non-finite vertex coordinate",
                        line_number
                    )));
                }
                loop_vertices.push(Point3::new(x, y, z));
            }
            "endfacet" => {
                if loop_vertices.len() != 3 {
                    return Err(Error::invalid_format_context(
                        &format!("ASCII STL line {}", line_number),
                        &format!("facet has {} vertices, expected 3", loop_vertices.len()),
                    ));
                }
                triangles.push(Triangle {
                    vertices: [loop_vertices[0], loop_vertices[1], loop_vertices[2]],
                    normal: normal.take(),
                });
                loop_vertices.clear();
                in_facet = false;
            }
            "endsolid" => break,
            _ => {}
        }
    }

    if in_facet {
        warn!("ASCII STL ended inside an unterminated facet");
        return Err(Error::invalid_format_context(
            "ASCII STL",
            "file ends inside an unterminated facet",
        ));
    }

    debug!(triangles = triangles.len(), "parsed ASCII STL");
    Mesh::from_triangles(triangles)
}

fn parse_coords<'a>(mut parts: impl Iterator<Item = &'a str>, line_number: usize) -> Result<[f64; 3]> {
    let mut coords = [0.0; 3];
    for coord in &mut coords {
        let token = parts.next().ok_or_else(|| {
            Error::invalid_format_context(
                &format!("ASCII STL line {}", line_number),
                "expected three coordinates",
            )
        })?;
        *coord = token.parse::<f64>().map_err(|_| {
            Error::invalid_format_context(
                &format!("ASCII STL line {}", line_number),
                &format!("'{}' is not a number", token),
            )
        })?;
    }
    Ok(coords)
}
