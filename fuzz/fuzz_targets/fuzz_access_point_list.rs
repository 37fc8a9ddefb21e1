#![no_main]

use libfuzzer_sys::fuzz_target;
use periph_hal::coprocessor::{decode_access_point_list, encode_access_point_list};

fuzz_target!(|data: &[u8]| {
    if let Ok(networks) = decode_access_point_list(data) {
        // Valid lists survive a re-encode unchanged
        let encoded = encode_access_point_list(&networks);
        let again = decode_access_point_list(&encoded).expect("re-encoded list decodes");
        assert_eq!(again, networks);
    }
});
