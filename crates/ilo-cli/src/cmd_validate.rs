/// Implementation of `ilo validate`.
///
/// Runs a full decode, including decompression of every image, and
/// reports either a list of checkmarks or the first failure. Nothing is
/// written to disk.
///
/// # Success output
///
/// ```text
/// ✓ Targets: 1 resolved (iLO 4)
/// ✓ Bootloader: header at 0x00000018, binary 0x400 bytes at 0x00010018
/// ✓ Signature parameters: 0x208 bytes
/// ✓ Images: 3 extracted (elf, kernel_main, kernel_recovery)
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Error [3]: padding byte 0x00 at offset 0x465 before elf header
/// ```
///
/// The bracketed number is also the process exit status.
use std::fs;

use anyhow::{Context, Result};
use ilo_decoder::ContainerDecoder;

use crate::ValidateArgs;

/// Run the `ilo validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to decode; the
/// decode error is kept as the source so `main` can map it to its exit
/// code.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    match ContainerDecoder::new(args.decoder.config()).decode(&bytes) {
        Ok(decoded) => {
            let names: Vec<&str> = decoded.targets.iter().map(|t| t.name.as_str()).collect();
            println!(
                "✓ Targets: {} resolved ({})",
                decoded.targets.len(),
                names.join(", ")
            );

            let bootloader = &decoded.bootloader;
            println!(
                "✓ Bootloader: header at 0x{:08x}, binary {:#x} bytes at 0x{:08x}",
                bootloader.header_bytes.offset,
                bootloader.binary.len(),
                bootloader.binary.offset
            );
            println!("✓ Signature parameters: {:#x} bytes", decoded.sign_params.raw.len());

            let images: Vec<&str> = decoded.images.iter().map(|i| i.name.as_str()).collect();
            println!(
                "✓ Images: {} extracted ({})",
                images.len(),
                images.join(", ")
            );
            Ok(())
        }

        Err(e) => {
            println!("✗ Error [{}]: {e}", e.code());
            Err(e).context("validation failed")
        }
    }
}
