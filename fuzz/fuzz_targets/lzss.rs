#![no_main]

use ilo_decoder::{Decompressor, Lzss};
use libfuzzer_sys::fuzz_target;

// Fuzz target: LZSS decompression of arbitrary streams.
//
// Output must never exceed the configured limit, whatever the input.
fuzz_target!(|data: &[u8]| {
    let lzss = Lzss::with_limit(1 << 16);
    let mut out = Vec::new();
    if let Ok(produced) = lzss.decompress(data, &mut out) {
        assert_eq!(produced, out.len());
        assert!(out.len() <= lzss.limit());
    }
});
