#![no_main]

use arbitrary::Arbitrary;
use ilo_wire::{Record, RecordKind};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    kind: u8,
    bytes: &'a [u8],
}

// Fuzz target: Record::decode for every record kind, then render it.
fuzz_target!(|input: Input<'_>| {
    let kind = match input.kind % 4 {
        0 => RecordKind::BootloaderHeader,
        1 => RecordKind::BootloaderFooter,
        2 => RecordKind::ImageHeader,
        _ => RecordKind::SignatureParams,
    };
    if let Ok(record) = Record::decode(kind, input.bytes) {
        let _ = record.render_text();
    }
});
