//! Mesh serialization
//!
//! Writes a [`Mesh`] back out as binary STL, ASCII STL or a minimal 3MF
//! package. Used to normalize uploads into one format and to produce test
//! fixtures. Facets without a declared normal get the one implied by their
//! winding; degenerate facets get a zero normal.

use nalgebra::Vector3;
use std::io::{Seek, Write};

use crate::error::Result;
use crate::model::{Mesh, Triangle};
use crate::parser::threemf::{MODEL_PATH, MODEL_REL_TYPE, RELS_PATH};

const STL_HEADER: &[u8] = b"printquote binary STL";

fn facet_normal(triangle: &Triangle) -> Vector3<f64> {
    triangle
        .normal
        .or_else(|| triangle.computed_normal())
        .unwrap_or_else(Vector3::zeros)
}

/// Write a mesh as binary STL
///
/// Coordinates are narrowed to `f32`, the only precision binary STL stores.
pub fn write_stl_binary<W: Write>(mesh: &Mesh, mut writer: W) -> Result<()> {
    let mut header = [0u8; 80];
    header[..STL_HEADER.len()].copy_from_slice(STL_HEADER);
    writer.write_all(&header)?;
    writer.write_all(&(mesh.triangle_count() as u32).to_le_bytes())?;

    for triangle in mesh.triangles() {
        let normal = facet_normal(triangle);
        for c in normal.iter() {
            writer.write_all(&(*c as f32).to_le_bytes())?;
        }
        for vertex in &triangle.vertices {
            for c in vertex.iter() {
                writer.write_all(&(*c as f32).to_le_bytes())?;
            }
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a mesh as ASCII STL under the given solid name
pub fn write_stl_ascii<W: Write>(mesh: &Mesh, name: &str, mut writer: W) -> Result<()> {
    let name = name.split_whitespace().next().unwrap_or("mesh");
    writeln!(writer, "solid {}", name)?;
    for triangle in mesh.triangles() {
        let n = facet_normal(triangle);
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for v in &triangle.vertices {
            writeln!(writer, "      vertex {:e} {:e} {:e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", name)?;
    writer.flush()?;
    Ok(())
}

/// Build the XML of a single-object 3MF model in millimeters
pub fn write_model_xml(mesh: &Mesh) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(
        r#"<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">"#,
    );
    xml.push('\n');
    xml.push_str("  <resources>\n");
    xml.push_str("    <object id=\"1\" type=\"model\">\n");
    xml.push_str("      <mesh>\n");

    xml.push_str("        <vertices>\n");
    for v in mesh.positions() {
        xml.push_str(&format!(
            "          <vertex x=\"{}\" y=\"{}\" z=\"{}\"/>\n",
            v.x, v.y, v.z
        ));
    }
    xml.push_str("        </vertices>\n");

    xml.push_str("        <triangles>\n");
    for i in 0..mesh.triangle_count() {
        let base = i * 3;
        xml.push_str(&format!(
            "          <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>\n",
            base,
            base + 1,
            base + 2
        ));
    }
    xml.push_str("        </triangles>\n");

    xml.push_str("      </mesh>\n");
    xml.push_str("    </object>\n");
    xml.push_str("  </resources>\n");
    xml.push_str("  <build>\n");
    xml.push_str("    <item objectid=\"1\"/>\n");
    xml.push_str("  </build>\n");
    xml.push_str("</model>\n");
    xml
}

/// Write a mesh as a 3MF package (ZIP archive)
pub fn write_3mf<W: Write + Seek>(mesh: &Mesh, writer: W) -> Result<()> {
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let content_types = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types.as_bytes())?;

    let rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/{}" Id="rel0" Type="{}"/>
</Relationships>"#,
        MODEL_PATH, MODEL_REL_TYPE
    );
    zip.start_file(RELS_PATH, options)?;
    zip.write_all(rels.as_bytes())?;

    zip.start_file(MODEL_PATH, options)?;
    zip.write_all(write_model_xml(mesh).as_bytes())?;

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{stl, threemf};
    use nalgebra::Point3;
    use std::io::Cursor;

    fn sample() -> Mesh {
        Mesh::from_triangles(vec![
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(0.0, 10.0, 0.0),
            ),
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 10.0, 0.0),
                Point3::new(0.0, 0.0, 2.5),
            ),
        ])
        .unwrap()
    }

    fn same_positions(a: &Mesh, b: &Mesh) -> bool {
        a.triangle_count() == b.triangle_count()
            && a.positions().zip(b.positions()).all(|(p, q)| (p - q).norm() < 1e-6)
    }

    #[test]
    fn test_binary_layout() {
        let mut out = Vec::new();
        write_stl_binary(&sample(), &mut out).unwrap();
        assert_eq!(out.len(), 84 + 2 * 50);
        assert_eq!(u32::from_le_bytes([out[80], out[81], out[82], out[83]]), 2);
        assert!(out.starts_with(STL_HEADER));
    }

    #[test]
    fn test_binary_reads_back() {
        let mut out = Vec::new();
        write_stl_binary(&sample(), &mut out).unwrap();
        let parsed = stl::parse_stl(&out).unwrap();
        assert!(same_positions(&sample(), &parsed));
        // computed normal of the first facet points up
        let n = parsed.triangles()[0].normal.unwrap();
        assert!((n - Vector3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_ascii_reads_back() {
        let mut out = Vec::new();
        write_stl_ascii(&sample(), "bracket v2", &mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("solid bracket\n"));
        assert!(text.trim_end().ends_with("endsolid bracket"));
        let parsed = stl::parse_stl(&out).unwrap();
        assert!(same_positions(&sample(), &parsed));
    }

    #[test]
    fn test_3mf_reads_back() {
        let mut cursor = Cursor::new(Vec::new());
        write_3mf(&sample(), &mut cursor).unwrap();
        let parsed = threemf::parse_3mf(cursor.get_ref()).unwrap();
        assert!(same_positions(&sample(), &parsed));
    }
}
