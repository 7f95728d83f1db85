//! Shared fixtures for integration tests
//!
//! Builds meshes and their encoded uploads (binary STL, ASCII STL, 3MF) in
//! memory, so no test depends on files checked into the repository.

#![allow(dead_code)]

use nalgebra::Point3;
use printquote::writer::{write_3mf, write_stl_ascii, write_stl_binary};
use printquote::{Material, Mesh, PrintParameters, Quality, Triangle};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Axis-aligned cube with outward winding, corner at the origin
pub fn cube_mesh(size: f64) -> Mesh {
    let p = |x: f64, y: f64, z: f64| Point3::new(x * size, y * size, z * size);
    let v = [
        p(0.0, 0.0, 0.0),
        p(1.0, 0.0, 0.0),
        p(1.0, 1.0, 0.0),
        p(0.0, 1.0, 0.0),
        p(0.0, 0.0, 1.0),
        p(1.0, 0.0, 1.0),
        p(1.0, 1.0, 1.0),
        p(0.0, 1.0, 1.0),
    ];
    let faces = [
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [2, 3, 7],
        [2, 7, 6],
        [1, 2, 6],
        [1, 6, 5],
        [3, 0, 4],
        [3, 4, 7],
    ];
    Mesh::from_triangles(
        faces
            .iter()
            .map(|&[a, b, c]| Triangle::new(v[a], v[b], v[c]))
            .collect(),
    )
    .unwrap()
}

/// UV sphere with `rings` latitude bands and `segments` longitude slices
pub fn sphere_mesh(radius: f64, rings: usize, segments: usize) -> Mesh {
    use std::f64::consts::PI;

    let point = |ring: usize, segment: usize| {
        let theta = PI * ring as f64 / rings as f64;
        let phi = 2.0 * PI * segment as f64 / segments as f64;
        Point3::new(
            radius * theta.sin() * phi.cos(),
            radius * theta.sin() * phi.sin(),
            radius * theta.cos(),
        )
    };

    let mut triangles = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let next = (segment + 1) % segments;
            let a = point(ring, segment);
            let b = point(ring + 1, segment);
            let c = point(ring + 1, next);
            let d = point(ring, next);
            if ring != 0 {
                triangles.push(Triangle::new(a, b, d));
            }
            if ring + 1 != rings {
                triangles.push(Triangle::new(d, b, c));
            }
        }
    }
    Mesh::from_triangles(triangles).unwrap()
}

/// Binary STL bytes of a mesh
pub fn binary_stl(mesh: &Mesh) -> Vec<u8> {
    let mut out = Vec::new();
    write_stl_binary(mesh, &mut out).unwrap();
    out
}

/// ASCII STL bytes of a mesh
pub fn ascii_stl(mesh: &Mesh) -> Vec<u8> {
    let mut out = Vec::new();
    write_stl_ascii(mesh, "fixture", &mut out).unwrap();
    out
}

/// 3MF package bytes of a mesh
pub fn threemf_package(mesh: &Mesh) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_3mf(mesh, &mut cursor).unwrap();
    cursor.into_inner()
}

/// 3MF package with a hand-written model part at `model_path`
///
/// When `with_rels` is false the package has no `_rels/.rels`, exercising the
/// fallback to the conventional model path.
pub fn threemf_with_model(model_xml: &str, model_path: &str, with_rels: bool) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    if with_rels {
        zip.start_file("_rels/.rels", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/{}" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#,
            model_path
        )
        .unwrap();
    }

    zip.start_file(model_path, options).unwrap();
    zip.write_all(model_xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Model XML of a single cube object given in `unit`, with optional build transform
pub fn cube_model_xml(size: f64, unit: &str, transform: Option<&str>) -> String {
    let mesh = cube_mesh(size);
    let mut vertices = String::new();
    let mut triangles = String::new();
    for (i, t) in mesh.triangles().iter().enumerate() {
        for v in &t.vertices {
            vertices.push_str(&format!(
                "<vertex x=\"{}\" y=\"{}\" z=\"{}\"/>",
                v.x, v.y, v.z
            ));
        }
        triangles.push_str(&format!(
            "<triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>",
            3 * i,
            3 * i + 1,
            3 * i + 2
        ));
    }
    let item = match transform {
        Some(t) => format!("<item objectid=\"3\" transform=\"{}\"/>", t),
        None => "<item objectid=\"3\"/>".to_string(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="{unit}" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="3" type="model"><mesh><vertices>{vertices}</vertices><triangles>{triangles}</triangles></mesh></object>
  </resources>
  <build>{item}</build>
</model>"#
    )
}

/// PLA at standard quality
pub fn pla_standard(infill: u32) -> PrintParameters {
    PrintParameters::new(Material::Pla, Quality::Standard, infill).unwrap()
}
