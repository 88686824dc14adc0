//! Shared fixtures for the integration tests and benchmarks.

use ilo_builder::FirmwareBuilder;
use ilo_builder::builder::SIGN_PARAMS_SLOT;

/// Trailing padding that makes a bootloader-only container exactly
/// `total_size = 0x10440`.
pub const SCENARIO_PADDING: usize = 0x1_0000 - 0x400 - SIGN_PARAMS_SLOT - 0x40;

/// Deterministic text-like image contents of `len` bytes.
///
/// Lines repeat with small variations, so the data compresses the way
/// firmware images do, and never contains an `iLO` tag.
pub fn sample_image(label: &str, len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 64);
    let mut line = 0u32;
    while out.len() < len {
        out.extend_from_slice(format!("{label}: section {:04} init {}\n", line % 97, line % 7).as_bytes());
        line += 1;
    }
    out.truncate(len);
    out
}

/// A container with all three images, each preceded by some padding.
pub fn three_image_builder() -> FirmwareBuilder {
    FirmwareBuilder::new()
        .image(sample_image("elf", 0x3000))
        .image_with_padding(sample_image("kernel_main", 0x8000), 0x200)
        .image_with_padding(sample_image("kernel_recovery", 0x2000), 0x10)
        .trailing_padding(0x100)
        .sign_params(signature_params(0x208))
}

/// One known target, a 0x400-byte bootloader, an empty signature blob and
/// `total_size = 0x10440`.
pub fn scenario_builder() -> FirmwareBuilder {
    FirmwareBuilder::new().trailing_padding(SCENARIO_PADDING)
}

/// A signature-parameters blob of `len` bytes whose first word is the key
/// size in bits.
pub fn signature_params(len: usize) -> Vec<u8> {
    let mut blob: Vec<u8> = (0..len).map(|i| (i * 13 % 199) as u8).collect();
    if len >= 4 {
        blob[..4].copy_from_slice(&2048u32.to_le_bytes());
    }
    blob
}
