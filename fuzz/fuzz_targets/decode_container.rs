#![no_main]

use ilo_decoder::{BoundsPolicy, ContainerDecoder, DecoderConfig};
use libfuzzer_sys::fuzz_target;

// Fuzz target: full container decode on arbitrary bytes, under both
// bounds policies.
//
// Catches bugs in:
// - Target list length arithmetic
// - Backward offsets from the footer (kernel_offset, sig_offset)
// - Window truncation to total_size
// - Marker search and padding checks
// - Image size fields and payload slicing
fuzz_target!(|data: &[u8]| {
    for bounds in [BoundsPolicy::Strict, BoundsPolicy::Permissive] {
        let decoder = ContainerDecoder::new(DecoderConfig {
            bounds,
            max_image_size: 1 << 20,
            ..DecoderConfig::default()
        });
        if let Ok(decoded) = decoder.decode(data) {
            for artifact in decoded.artifacts() {
                if let Some(offset) = artifact.offset {
                    assert!(offset + artifact.bytes.len() <= data.len());
                }
            }
        }
    }
});
