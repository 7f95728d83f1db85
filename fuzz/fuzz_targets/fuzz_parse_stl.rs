#![no_main]

use libfuzzer_sys::fuzz_target;
use printquote::config::ComplexityThresholds;
use printquote::mesh_ops::analyze;
use printquote::parser::stl;

fuzz_target!(|data: &[u8]| {
    // Binary/ASCII detection, both readers and the analyzer on whatever parses
    if let Ok(mesh) = stl::parse_stl(data) {
        let analysis = analyze(&mesh, &ComplexityThresholds::default());
        assert!(analysis.volume_cm3 >= 0.0);
    }
});
