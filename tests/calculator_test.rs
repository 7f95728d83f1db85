//! Calculator session flows across parsing, re-pricing and file replacement

mod common;

use common::{binary_stl, cube_mesh, pla_standard, sphere_mesh, threemf_package};
use printquote::{CalculatorSession, CalculatorState, Error, Material, PricingConfig, Quality};
use std::thread;

#[test]
fn test_recalculation_reuses_cached_analysis() {
    let mut session = CalculatorSession::default();
    session
        .select_file("cube.stl", binary_stl(&cube_mesh(20.0)))
        .unwrap();
    session.parse().unwrap();
    let analysis = session.analysis().unwrap().clone();

    let mut totals = Vec::new();
    for infill in [20, 40, 60, 80, 100] {
        let estimate = session.estimate(&pla_standard(infill)).unwrap();
        totals.push(estimate.cost.total_cost);
        assert_eq!(session.state(), CalculatorState::Estimated);
    }
    assert!(totals.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(session.analysis(), Some(&analysis));
}

#[test]
fn test_session_estimate_matches_one_shot_estimate() {
    let bytes = threemf_package(&sphere_mesh(12.0, 16, 32));
    let params = printquote::PrintParameters::new(Material::Abs, Quality::Draft, 30).unwrap();

    let mut session = CalculatorSession::default();
    session.select_file("ball.3mf", bytes.clone()).unwrap();
    session.parse().unwrap();
    let from_session = session.estimate(&params).unwrap().clone();

    let one_shot = printquote::estimate("ball.3mf", &bytes, &params).unwrap();
    assert_eq!(from_session, one_shot);
}

#[test]
fn test_replacing_file_mid_parse() {
    let mut session = CalculatorSession::default();
    session
        .select_file("big.stl", binary_stl(&sphere_mesh(30.0, 80, 160)))
        .unwrap();
    let slow = session.start_parse().unwrap();
    let slow = thread::spawn(move || slow.run());

    session
        .select_file("cube.stl", binary_stl(&cube_mesh(20.0)))
        .unwrap();
    let fast = session.start_parse().unwrap().run();
    assert!(session.finish_parse(fast));

    let stale = slow.join().unwrap();
    assert!(stale.result().is_ok());
    assert!(!session.finish_parse(stale));

    assert_eq!(session.analysis().unwrap().triangle_count, 12);
    let estimate = session.estimate(&pla_standard(20)).unwrap();
    assert_eq!(estimate.file_name, "cube.stl");
}

#[test]
fn test_failed_parse_then_new_file() {
    let mut session = CalculatorSession::default();
    let mut truncated = binary_stl(&cube_mesh(20.0));
    truncated.truncate(200);
    session.select_file("cube.stl", truncated).unwrap();
    assert!(matches!(
        session.parse().unwrap_err(),
        Error::Truncated { .. }
    ));
    assert_eq!(session.state(), CalculatorState::ParseFailed);
    assert!(session.estimate(&pla_standard(20)).is_err());

    session
        .select_file("cube.stl", binary_stl(&cube_mesh(20.0)))
        .unwrap();
    session.parse().unwrap();
    assert!(session.estimate(&pla_standard(20)).is_ok());
}

#[test]
fn test_oversized_upload_is_rejected_before_parsing() {
    let config = PricingConfig::default().with_max_file_size(100);
    let mut session = CalculatorSession::new(config);
    let err = session
        .select_file("cube.stl", binary_stl(&cube_mesh(20.0)))
        .unwrap_err();
    assert!(matches!(err, Error::FileTooLarge { .. }));
    assert_eq!(session.state(), CalculatorState::Idle);
    assert!(matches!(
        session.start_parse().unwrap_err(),
        Error::InvalidState(_)
    ));
}
