#![no_main]

use libfuzzer_sys::fuzz_target;
use printquote::{Material, PrintParameters, Quality};

fuzz_target!(|data: &[u8]| {
    // Full pipeline: ZIP extraction -> XML parsing -> analysis -> pricing
    if let Ok(params) = PrintParameters::new(Material::Pla, Quality::Standard, 20) {
        let _ = printquote::estimate("upload.3mf", data, &params);
    }
});
