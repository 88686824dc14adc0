/// Implementation of `ilo extract`.
///
/// Decodes the firmware file and writes every region to the output
/// directory, followed by the offset map:
///
/// ```text
/// OUTDIR/
///   bootloader.hdr  bootloader.sig  bootloader.bin
///   sign_params.raw
///   elf.hdr  elf.sig  elf.raw  elf.bin            (one set per image)
///   firmware.map                                  (sorted JSON offsets)
/// ```
///
/// Nothing is written unless the decode succeeds, except for
/// `failed_assert.bin` when the padding before an image header is dirty.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ilo_decoder::{ContainerDecoder, DecodeError, DecodedContainer, DecoderConfig};
use log::{info, warn};

use crate::ExtractArgs;

/// File the offending region is saved to on a padding violation.
const FAILED_ASSERT: &str = "failed_assert.bin";

/// File the offset map is written to.
const FIRMWARE_MAP: &str = "firmware.map";

/// Run the `ilo extract` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the container fails to
/// decode, or an output file cannot be written.
pub fn run(args: &ExtractArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let decoded = extract(&bytes, &args.outdir, args.decoder.config())
        .with_context(|| format!("failed to extract {}", args.file.display()))?;

    for (name, offset) in decoded.offsets.iter() {
        println!("  > {name} at 0x{offset:08x}");
    }
    println!(
        "Extracted {} image{} to {}",
        decoded.images.len(),
        if decoded.images.len() == 1 { "" } else { "s" },
        args.outdir.display()
    );

    Ok(())
}

/// Decode `bytes` and write every artifact plus `firmware.map` to
/// `outdir`.
///
/// On a padding violation the working buffer at the time of failure is
/// saved as `failed_assert.bin` and the decode error is returned; a
/// failure to save it is only logged.
///
/// # Errors
///
/// Returns the [`DecodeError`] if decoding fails, or an I/O error if an
/// output file cannot be written.
pub fn extract<'a>(
    bytes: &'a [u8],
    outdir: &Path,
    config: DecoderConfig,
) -> Result<DecodedContainer<'a>> {
    let decoded = match ContainerDecoder::new(config).decode(bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            if let DecodeError::PaddingViolation {
                region_start,
                region_end,
                ..
            } = &e
            {
                let region = bytes.get(*region_start..*region_end).unwrap_or_default();
                if let Err(write_err) = save_failed_region(outdir, region) {
                    warn!("cannot save {FAILED_ASSERT}: {write_err:#}");
                }
            }
            return Err(e.into());
        }
    };

    fs::create_dir_all(outdir).with_context(|| format!("cannot create {}", outdir.display()))?;

    for artifact in decoded.artifacts() {
        write(outdir, &artifact.file_name, artifact.bytes)?;
    }

    let map = decoded
        .offsets
        .to_json()
        .context("cannot serialise the offset map")?;
    write(outdir, FIRMWARE_MAP, map.as_bytes())?;

    Ok(decoded)
}

fn save_failed_region(outdir: &Path, region: &[u8]) -> Result<()> {
    fs::create_dir_all(outdir).with_context(|| format!("cannot create {}", outdir.display()))?;
    write(outdir, FAILED_ASSERT, region)?;
    info!("saved {:#x} bytes to {FAILED_ASSERT}", region.len());
    Ok(())
}

fn write(outdir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = outdir.join(name);
    fs::write(&path, bytes).with_context(|| format!("cannot write {}", path.display()))
}
