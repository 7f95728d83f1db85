//! 3MF package reader
//!
//! 3MF files are ZIP archives following the Open Packaging Conventions. Only
//! the geometry needed for pricing is read: mesh objects, the model unit and
//! the build items with their transforms. Materials, colors and extensions
//! are ignored.

use nalgebra::Point3;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use tracing::debug;
use zip::ZipArchive;

use crate::config::DEFAULT_MAX_PART_SIZE;
use crate::error::{Error, Result};
use crate::model::{Mesh, Triangle};

/// Main 3D model part path within the package
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Relationships part path
pub const RELS_PATH: &str = "_rels/.rels";

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Number of values in a 3MF affine transform attribute
const TRANSFORM_SIZE: usize = 12;

/// Parse a 3MF package into a mesh in millimeters
///
/// Parts are inflated up to [`DEFAULT_MAX_PART_SIZE`]; use
/// [`parse_3mf_with_limit`] to apply a configured ceiling.
pub fn parse_3mf(bytes: &[u8]) -> Result<Mesh> {
    parse_3mf_with_limit(bytes, DEFAULT_MAX_PART_SIZE)
}

/// Parse a 3MF package, rejecting any part that inflates beyond
/// `max_part_size` bytes with [`Error::FileTooLarge`]
pub fn parse_3mf_with_limit(bytes: &[u8], max_part_size: usize) -> Result<Mesh> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let model_path = find_model_path(&mut archive, max_part_size)?;
    debug!(model_path = %model_path, "reading 3MF model part");
    let xml = read_part(&mut archive, &model_path, max_part_size)?;
    parse_model_xml(&xml)
}

/// Locate the model part through the root relationships, falling back to the
/// conventional path
fn find_model_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    max_part_size: usize,
) -> Result<String> {
    if archive.index_for_name(RELS_PATH).is_some() {
        let rels = read_part(archive, RELS_PATH, max_part_size)?;
        if let Some(target) = model_relationship_target(&rels)? {
            return Ok(target.trim_start_matches('/').to_string());
        }
    }
    if archive.index_for_name(MODEL_PATH).is_some() {
        Ok(MODEL_PATH.to_string())
    } else {
        Err(Error::InvalidFormat(format!(
            "3MF package has no 3D model part (looked for {} and {})",
            RELS_PATH, MODEL_PATH
        )))
    }
}

/// Read one part as text, never inflating more than `limit + 1` bytes
///
/// The declared size is checked first, and the read itself is capped since
/// the central directory can understate it.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
    limit: usize,
) -> Result<String> {
    let file = archive.by_name(path)?;
    let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
    if declared > limit {
        return Err(Error::FileTooLarge {
            size: declared,
            limit,
        });
    }

    let mut content = String::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    file.take(cap).read_to_string(&mut content)?;
    if content.len() > limit {
        return Err(Error::FileTooLarge {
            size: content.len(),
            limit,
        });
    }
    Ok(content)
}

fn model_relationship_target(rels: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(rels);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut target = None;
                let mut rel_type = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attr_str(&attr.value)?;
                    match attr.key.local_name().as_ref() {
                        b"Target" => target = Some(value.to_string()),
                        b"Type" => rel_type = Some(value.to_string()),
                        _ => {}
                    }
                }
                if rel_type.as_deref() == Some(MODEL_REL_TYPE) {
                    return Ok(target);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn attr_str(value: &[u8]) -> Result<&str> {
    std::str::from_utf8(value).map_err(|e| Error::XmlAttr(e.to_string()))
}

/// Millimeters per model unit
fn unit_scale(unit: &str) -> Result<f64> {
    match unit {
        "micron" => Ok(0.001),
        "millimeter" => Ok(1.0),
        "centimeter" => Ok(10.0),
        "inch" => Ok(25.4),
        "foot" => Ok(304.8),
        "meter" => Ok(1000.0),
        other => Err(Error::invalid_format_context(
            "3MF model",
            &format!(
                "unknown unit '{}'. Must be one of: micron, millimeter, centimeter, inch, foot, meter",
                other
            ),
        )),
    }
}

/// A build item: an object reference plus an optional transform
struct BuildItem {
    object_id: usize,
    transform: Option<[f64; TRANSFORM_SIZE]>,
}

/// Geometry gathered while walking the model XML
#[derive(Default)]
struct ModelGeometry {
    scale: Option<f64>,
    objects: HashMap<usize, Vec<Triangle>>,
    object_order: Vec<usize>,
    items: Vec<BuildItem>,
    current_object: Option<usize>,
    vertices: Vec<Point3<f64>>,
}

/// Parse the XML of a 3MF model part
///
/// Exposed for callers that already extracted the model part.
pub fn parse_model_xml(xml: &str) -> Result<Mesh> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut geometry = ModelGeometry::default();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => geometry.start_element(e, false)?,
            Event::Empty(ref e) => geometry.start_element(e, true)?,
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"object" {
                    geometry.current_object = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    geometry.into_mesh()
}

impl ModelGeometry {
    fn start_element(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<()> {
        match e.local_name().as_ref() {
            b"model" => {
                let unit = optional_attr(e, b"unit")?;
                self.scale = Some(unit_scale(unit.as_deref().unwrap_or("millimeter"))?);
            }
            b"object" => {
                let id = required_attr(e, b"id", "object")?
                    .parse::<usize>()
                    .map_err(|_| Error::invalid_format_context("3MF object", "id is not an integer"))?;
                if !is_empty {
                    self.current_object = Some(id);
                    self.vertices.clear();
                }
            }
            b"vertex" => {
                if self.current_object.is_some() {
                    let x = parse_f64_attr(e, b"x", "vertex")?;
                    let y = parse_f64_attr(e, b"y", "vertex")?;
                    let z = parse_f64_attr(e, b"z", "vertex")?;
                    self.vertices.push(Point3::new(x, y, z));
                }
            }
            b"triangle" => {
                if let Some(id) = self.current_object {
                    let triangle = self.resolve_triangle(e)?;
                    if !self.objects.contains_key(&id) {
                        self.object_order.push(id);
                    }
                    self.objects.entry(id).or_default().push(triangle);
                }
            }
            b"item" => {
                let object_id = required_attr(e, b"objectid", "item")?
                    .parse::<usize>()
                    .map_err(|_| {
                        Error::invalid_format_context("3MF item", "objectid is not an integer")
                    })?;
                let transform = optional_attr(e, b"transform")?
                    .map(|t| parse_transform(&t))
                    .transpose()?;
                self.items.push(BuildItem {
                    object_id,
                    transform,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve_triangle(&self, e: &BytesStart<'_>) -> Result<Triangle> {
        let mut corners = [Point3::origin(); 3];
        for (corner, name) in corners.iter_mut().zip([b"v1", b"v2", b"v3"]) {
            let index = required_attr(e, name, "triangle")?
                .parse::<usize>()
                .map_err(|_| {
                    Error::invalid_format_context("3MF triangle", "vertex index is not an integer")
                })?;
            *corner = *self.vertices.get(index).ok_or_else(|| {
                Error::CorruptGeometry(format!(
                    "3MF triangle references vertex {} but the object has {} vertices",
                    index,
                    self.vertices.len()
                ))
            })?;
        }
        Ok(Triangle::new(corners[0], corners[1], corners[2]))
    }

    fn into_mesh(self) -> Result<Mesh> {
        let scale = self.scale.ok_or_else(|| {
            Error::invalid_format_context("3MF model part", "missing <model> root element")
        })?;

        let mut triangles = Vec::new();
        if self.items.is_empty() {
            for id in &self.object_order {
                for t in &self.objects[id] {
                    triangles.push(scaled(t, scale, None));
                }
            }
        } else {
            for item in &self.items {
                // Component-only objects have no triangles of their own
                let Some(object) = self.objects.get(&item.object_id) else {
                    debug!(object_id = item.object_id, "build item has no mesh geometry");
                    continue;
                };
                for t in object {
                    triangles.push(scaled(t, scale, item.transform.as_ref()));
                }
            }
        }

        debug!(triangles = triangles.len(), scale, "parsed 3MF model");
        Mesh::from_triangles(triangles)
    }
}

fn scaled(triangle: &Triangle, scale: f64, transform: Option<&[f64; TRANSFORM_SIZE]>) -> Triangle {
    let map = |p: &Point3<f64>| {
        let p = match transform {
            Some(m) => apply_transform(p, m),
            None => *p,
        };
        p * scale
    };
    let [a, b, c] = &triangle.vertices;
    Triangle::new(map(a), map(b), map(c))
}

/// Apply a 3MF affine transform `m00 m01 m02 m10 m11 m12 m20 m21 m22 m30 m31 m32`
///
/// Points are row vectors multiplied on the left: `p' = [x y z 1] · M`.
pub fn apply_transform(p: &Point3<f64>, m: &[f64; TRANSFORM_SIZE]) -> Point3<f64> {
    Point3::new(
        p.x * m[0] + p.y * m[3] + p.z * m[6] + m[9],
        p.x * m[1] + p.y * m[4] + p.z * m[7] + m[10],
        p.x * m[2] + p.y * m[5] + p.z * m[8] + m[11],
    )
}

fn parse_transform(value: &str) -> Result<[f64; TRANSFORM_SIZE]> {
    let values = value
        .split_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let matrix: [f64; TRANSFORM_SIZE] = values.try_into().map_err(|v: Vec<f64>| {
        Error::invalid_format_context(
            "3MF item transform",
            &format!("expected {} values, got {}", TRANSFORM_SIZE, v.len()),
        )
    })?;
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(Error::CorruptGeometry(
            "3MF item transform contains a non-finite value".to_string(),
        ));
    }
    Ok(matrix)
}

fn optional_attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr_str(&attr.value)?.to_string()));
        }
    }
    Ok(None)
}

fn required_attr(e: &BytesStart<'_>, name: &[u8], element: &str) -> Result<String> {
    optional_attr(e, name)?.ok_or_else(|| {
        Error::XmlAttr(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element,
            String::from_utf8_lossy(name)
        ))
    })
}

fn parse_f64_attr(e: &BytesStart<'_>, name: &[u8], element: &str) -> Result<f64> {
    let value = required_attr(e, name, element)?;
    value.trim().parse::<f64>().map_err(|_| {
        Error::invalid_format_context(
            &format!("3MF {}", element),
            &format!("attribute '{}' is not a number: '{}'", String::from_utf8_lossy(name), value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_TRIANGLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="centimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
    <resources>
        <object id="1" type="model">
            <mesh>
                <vertices>
                    <vertex x="0" y="0" z="0"/>
                    <vertex x="1" y="0" z="0"/>
                    <vertex x="0" y="1" z="0"/>
                </vertices>
                <triangles>
                    <triangle v1="0" v2="1" v3="2"/>
                </triangles>
            </mesh>
        </object>
    </resources>
    <build>
        <item objectid="1" transform="1 0 0 0 1 0 0 0 1 5 0 0"/>
    </build>
</model>"#;

    #[test]
    fn test_parse_model_xml_scales_and_transforms() {
        let mesh = parse_model_xml(SINGLE_TRIANGLE).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        let [a, b, c] = mesh.triangles()[0].vertices;
        // translate by 5 cm then scale to millimeters
        assert_eq!(a, Point3::new(50.0, 0.0, 0.0));
        assert_eq!(b, Point3::new(60.0, 0.0, 0.0));
        assert_eq!(c, Point3::new(50.0, 10.0, 0.0));
    }

    #[test]
    fn test_without_build_items_all_objects_are_used() {
        let xml = SINGLE_TRIANGLE.replace(
            r#"<item objectid="1" transform="1 0 0 0 1 0 0 0 1 5 0 0"/>"#,
            "",
        );
        let mesh = parse_model_xml(&xml).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangles()[0].vertices[1], Point3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_out_of_range_index_is_corrupt() {
        let xml = SINGLE_TRIANGLE.replace(r#"v3="2""#, r#"v3="9""#);
        assert!(matches!(
            parse_model_xml(&xml).unwrap_err(),
            Error::CorruptGeometry(_)
        ));
    }

    #[test]
    fn test_unknown_unit() {
        let xml = SINGLE_TRIANGLE.replace("centimeter", "furlong");
        let err = parse_model_xml(&xml).unwrap_err();
        assert!(err.to_string().contains("furlong"));
    }

    #[test]
    fn test_model_without_triangles_is_empty() {
        let xml = r#"<model unit="millimeter"><resources><object id="1"><mesh><vertices/><triangles/></mesh></object></resources></model>"#;
        assert!(matches!(parse_model_xml(xml).unwrap_err(), Error::EmptyMesh));
    }

    #[test]
    fn test_bad_transform_length() {
        let xml = SINGLE_TRIANGLE.replace("1 0 0 0 1 0 0 0 1 5 0 0", "1 0 0");
        assert!(matches!(
            parse_model_xml(&xml).unwrap_err(),
            Error::InvalidFormat(_)
        ));
    }

    #[test]
    fn test_relationship_target() {
        let rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rel0" Target="/3D/part.model" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;
        assert_eq!(
            model_relationship_target(rels).unwrap().as_deref(),
            Some("/3D/part.model")
        );
    }

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        use std::io::Write;
        use zip::ZipWriter;
        use zip::write::SimpleFileOptions;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, content) in parts {
            zip.start_file(*path, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_part_over_limit_is_rejected() {
        let padding = " ".repeat(64 * 1024);
        let xml = SINGLE_TRIANGLE.replace("<resources>", &format!("<resources>{}", padding));
        let bytes = package(&[(MODEL_PATH, &xml)]);
        assert!(bytes.len() < padding.len());

        match parse_3mf_with_limit(&bytes, 4096).unwrap_err() {
            Error::FileTooLarge { size, limit } => {
                assert_eq!(limit, 4096);
                assert!(size > limit);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(parse_3mf(&bytes).unwrap().triangle_count(), 1);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(parse_3mf(b"solid nope").unwrap_err(), Error::Zip(_)));
    }
}
