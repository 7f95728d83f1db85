//! Integration tests for the mesh readers

mod common;

use common::{ascii_stl, binary_stl, cube_mesh, cube_model_xml, threemf_package, threemf_with_model};
use printquote::config::ComplexityThresholds;
use printquote::mesh_ops::analyze;
use printquote::parser::{load_mesh, stl, threemf};
use printquote::{Error, ErrorKind, PricingConfig, UploadLimits};

fn volume_cm3(bytes: &[u8], name: &str) -> f64 {
    let mesh = load_mesh(name, bytes, &UploadLimits::default()).unwrap();
    analyze(&mesh, &ComplexityThresholds::default()).volume_cm3
}

#[test]
fn test_ascii_and_binary_stl_are_equivalent() {
    let mesh = cube_mesh(12.5);
    let from_binary = stl::parse_stl(&binary_stl(&mesh)).unwrap();
    let from_ascii = stl::parse_stl(&ascii_stl(&mesh)).unwrap();
    assert_eq!(from_binary.triangle_count(), from_ascii.triangle_count());
    for (a, b) in from_binary.positions().zip(from_ascii.positions()) {
        assert_eq!(a, b);
    }
}

#[test]
fn test_binary_header_starting_with_solid() {
    let mut bytes = binary_stl(&cube_mesh(10.0));
    bytes[..5].copy_from_slice(b"solid");
    assert!(!stl::is_ascii_stl(&bytes));
    assert_eq!(stl::parse_stl(&bytes).unwrap().triangle_count(), 12);
}

#[test]
fn test_truncated_binary_with_solid_header_reports_truncation() {
    let mut bytes = binary_stl(&cube_mesh(20.0));
    bytes[..10].copy_from_slice(b"solid part");
    bytes.truncate(84 + 5 * 50);
    match stl::parse_stl(&bytes).unwrap_err() {
        Error::Truncated { expected, actual } => {
            assert_eq!(expected, 84 + 12 * 50);
            assert_eq!(actual, 84 + 5 * 50);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_padded_binary_with_solid_header() {
    let mut bytes = binary_stl(&cube_mesh(20.0));
    bytes[..10].copy_from_slice(b"solid part");
    bytes.extend_from_slice(&[0u8; 3]);
    assert_eq!(stl::parse_stl(&bytes).unwrap().triangle_count(), 12);
}

#[test]
fn test_3mf_round_trip() {
    let bytes = threemf_package(&cube_mesh(20.0));
    assert!((volume_cm3(&bytes, "cube.3mf") - 8.0).abs() < 1e-9);
}

#[test]
fn test_3mf_units_scale_to_millimeters() {
    let cases = [
        ("millimeter", 8.0),
        ("centimeter", 8000.0),
        ("micron", 8.0e-9),
        ("inch", 8.0 * 25.4f64.powi(3)),
    ];
    for (unit, expected) in cases {
        let xml = cube_model_xml(20.0, unit, None);
        let bytes = threemf_with_model(&xml, "3D/3dmodel.model", true);
        let volume = volume_cm3(&bytes, "cube.3mf");
        assert!(
            (volume - expected).abs() / expected < 1e-9,
            "{unit}: {volume} vs {expected}"
        );
    }
}

#[test]
fn test_3mf_build_transform_is_applied() {
    // Scale x by 2 and translate; volume doubles, bounding box moves
    let xml = cube_model_xml(10.0, "millimeter", Some("2 0 0 0 1 0 0 0 1 100 50 0"));
    let bytes = threemf_with_model(&xml, "3D/3dmodel.model", true);
    let mesh = load_mesh("part.3mf", &bytes, &UploadLimits::default()).unwrap();
    let analysis = analyze(&mesh, &ComplexityThresholds::default());
    assert!((analysis.volume_cm3 - 2.0).abs() < 1e-9);
    assert_eq!(analysis.bbox_min, [100.0, 50.0, 0.0]);
    assert_eq!(analysis.bbox_max, [120.0, 60.0, 10.0]);
}

#[test]
fn test_3mf_model_path_from_relationships() {
    let xml = cube_model_xml(20.0, "millimeter", None);
    let bytes = threemf_with_model(&xml, "3D/part_a.model", true);
    assert!((volume_cm3(&bytes, "cube.3mf") - 8.0).abs() < 1e-9);
}

#[test]
fn test_3mf_fallback_without_relationships() {
    let xml = cube_model_xml(20.0, "millimeter", None);
    let bytes = threemf_with_model(&xml, "3D/3dmodel.model", false);
    assert!((volume_cm3(&bytes, "cube.3mf") - 8.0).abs() < 1e-9);
}

#[test]
fn test_3mf_without_model_part() {
    let xml = cube_model_xml(20.0, "millimeter", None);
    let bytes = threemf_with_model(&xml, "3D/elsewhere.model", false);
    let err = threemf::parse_3mf(&bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
    assert!(err.is_user_correctable());
}

#[test]
fn test_3mf_malformed_xml() {
    let bytes = threemf_with_model("<model unit=\"millimeter\"><resources>", "3D/3dmodel.model", true);
    let err = threemf::parse_3mf(&bytes).unwrap_err();
    assert!(err.is_user_correctable(), "{err:?}");
}

#[test]
fn test_3mf_inflating_past_part_limit_is_rejected() {
    // Compresses to a few KiB but inflates to 4 MiB
    let padding = " ".repeat(4 * 1024 * 1024);
    let xml = cube_model_xml(20.0, "millimeter", None)
        .replace("<resources>", &format!("<resources>{}", padding));
    let bytes = threemf_with_model(&xml, "3D/3dmodel.model", true);

    let limits = PricingConfig::default()
        .with_max_file_size(256 * 1024)
        .with_max_part_size(1024 * 1024)
        .upload;
    assert!(bytes.len() < limits.max_file_size);

    let err = load_mesh("bomb.3mf", &bytes, &limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    match err {
        Error::FileTooLarge { size, limit } => {
            assert_eq!(limit, 1024 * 1024);
            assert!(size > limit);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_renamed_stl_as_3mf_is_a_parse_error() {
    let bytes = binary_stl(&cube_mesh(10.0));
    let err = load_mesh("cube.3mf", &bytes, &UploadLimits::default()).unwrap_err();
    assert!(matches!(err, Error::Zip(_)));
}

#[test]
fn test_corrupt_ascii_coordinate() {
    let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 one 0\nendloop\nendfacet\nendsolid x\n";
    let err = stl::parse_stl(text.as_bytes()).unwrap_err();
    match err {
        Error::InvalidFormat(msg) => assert!(msg.contains("line 6"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}
