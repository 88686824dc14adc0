/// Implementation of `ilo inspect`.
///
/// Decodes a firmware file and prints its records, the region table and
/// the offset map without writing any files. Each region carries a BLAKE3
/// digest so two firmware releases can be compared region by region.
///
/// # Output format
///
/// ```text
/// Targets:
///   #0 2932ecae-cc69-d843-bd0e-61dc3406f71b  iLO 4
/// bootloader header
///   magic             : iLO4
///   ...
/// Regions:
///   NAME                  OFFSET      SIZE        BLAKE3
///   bootloader.hdr        0x00000018  0x00000440  6f0e...
///   elf.bin               -           0x00012000  a1c4...
/// ```
use std::fs;

use anyhow::{Context, Result};
use ilo_decoder::{Artifact, ContainerDecoder, DecodedContainer, OffsetMap};
use ilo_wire::Record;
use serde::Serialize;

use crate::InspectArgs;

/// Bytes of each header shown by `--show-hex`: everything before the
/// signature.
const HEADER_FIELDS_LEN: usize = 0x40;

#[derive(Serialize)]
struct Report<'a> {
    file: String,
    size: usize,
    targets: Vec<TargetRow>,
    regions: Vec<RegionRow>,
    offsets: &'a OffsetMap,
}

#[derive(Serialize)]
struct TargetRow {
    index: usize,
    id: String,
    name: String,
}

#[derive(Serialize)]
struct RegionRow {
    name: String,
    offset: Option<usize>,
    size: usize,
    blake3: String,
}

impl From<&Artifact<'_>> for RegionRow {
    fn from(artifact: &Artifact<'_>) -> Self {
        Self {
            name: artifact.file_name.clone(),
            offset: artifact.offset,
            size: artifact.bytes.len(),
            blake3: blake3::hash(artifact.bytes).to_hex().to_string(),
        }
    }
}

/// Run the `ilo inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to decode.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let decoded = ContainerDecoder::new(args.decoder.config())
        .decode(&bytes)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    let regions: Vec<RegionRow> = decoded.artifacts().iter().map(RegionRow::from).collect();

    if args.json {
        let report = Report {
            file: args.file.display().to_string(),
            size: bytes.len(),
            targets: decoded
                .targets
                .iter()
                .map(|t| TargetRow {
                    index: t.index,
                    id: t.id.to_string(),
                    name: t.name.clone(),
                })
                .collect(),
            regions,
            offsets: &decoded.offsets,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_records(&decoded, args.show_hex);
    print_regions(&regions);

    println!("Offsets:");
    for (name, offset) in decoded.offsets.iter() {
        println!("  {name:<20}  0x{offset:08x}");
    }

    Ok(())
}

// ── Text output ───────────────────────────────────────────────────────────────

fn print_records(decoded: &DecodedContainer<'_>, show_hex: bool) {
    println!("Targets:");
    for target in &decoded.targets {
        println!("  #{} {}  {}", target.index, target.id, target.name);
    }

    let bootloader = &decoded.bootloader;
    println!("{}", Record::BootloaderHeader(bootloader.header.clone()).render_text());
    if show_hex {
        hex_dump(bootloader.header_bytes.bytes, HEADER_FIELDS_LEN);
    }
    println!("{}", Record::BootloaderFooter(bootloader.footer.clone()).render_text());
    if show_hex {
        hex_dump(bootloader.footer_bytes.bytes, bootloader.footer_bytes.len());
    }
    println!(
        "{}",
        Record::SignatureParams(decoded.sign_params.params.clone()).render_text()
    );

    for image in &decoded.images {
        println!("{} ({})", Record::ImageHeader(image.header.clone()).render_text(), image.name);
        if show_hex {
            hex_dump(image.header_bytes.bytes, HEADER_FIELDS_LEN);
        }
    }
}

fn print_regions(regions: &[RegionRow]) {
    println!("Regions:");
    println!("  {:<20}  {:<10}  {:<10}  BLAKE3", "NAME", "OFFSET", "SIZE");
    for row in regions {
        let offset = row
            .offset
            .map_or_else(|| "-".to_string(), |offset| format!("0x{offset:08x}"));
        println!(
            "  {:<20}  {offset:<10}  0x{:08x}  {}",
            row.name, row.size, row.blake3
        );
    }
}

/// 16 bytes per line, offset + hex + ASCII.
fn hex_dump(bytes: &[u8], len: usize) {
    let shown = &bytes[..len.min(bytes.len())];
    for (i, chunk) in shown.chunks(16).enumerate() {
        let hex = chunk
            .iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        println!("    {:04x}  {hex:<47}  {ascii}", i * 16);
    }
}
