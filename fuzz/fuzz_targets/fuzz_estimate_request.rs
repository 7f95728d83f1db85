#![no_main]

use libfuzzer_sys::fuzz_target;
use printquote::{EstimateRequest, PrintParameters};

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data) {
        if let Ok(request) = EstimateRequest::from_json(body) {
            if let Ok(params) = PrintParameters::try_from(request) {
                assert!((10..=100).contains(&params.infill));
            }
        }
    }
});
