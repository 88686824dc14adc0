//! End-to-end decoding of well-formed containers.
//!
//! Every container here is assembled by `FirmwareBuilder`, which also
//! reports where it placed each part, so the decoder's offsets and slices
//! can be checked against an independent layout rather than against
//! themselves.

use std::collections::{BTreeMap, BTreeSet};

use ilo_builder::FirmwareBuilder;
use ilo_decoder::{BoundsPolicy, ContainerDecoder, DecodeError, DecoderConfig, ImageName};
use ilo_tests::{SCENARIO_PADDING, sample_image, scenario_builder, three_image_builder};
use ilo_wire::{HEADER_SIZE, Record};
use insta::assert_snapshot;

fn strict() -> ContainerDecoder {
    ContainerDecoder::new(DecoderConfig::default())
}

fn permissive() -> ContainerDecoder {
    ContainerDecoder::new(DecoderConfig {
        bounds: BoundsPolicy::Permissive,
        ..DecoderConfig::default()
    })
}

// ── Full extraction ───────────────────────────────────────────────────────────

#[test]
fn three_images_are_extracted() {
    let fw = three_image_builder().build().unwrap();
    let decoded = strict().decode(&fw.bytes).expect("well-formed container");

    let names: Vec<ImageName> = decoded.images.iter().map(|i| i.name).collect();
    assert_eq!(names, ImageName::ALL);

    for (image, built) in decoded.images.iter().zip(&fw.images) {
        assert_eq!(image.data, built.data, "{} data", image.name);
        assert_eq!(image.header_bytes.range(), built.header);
        assert_eq!(image.payload.range(), built.payload.start + 4..built.payload.end);
    }

    assert_eq!(decoded.bootloader.binary.range(), fw.bootloader);
    assert_eq!(decoded.sign_params.raw.range(), fw.sign_params);
    assert_eq!(decoded.sign_params.params.key_size, Some(2048));
}

#[test]
fn offset_map_matches_layout() {
    let fw = three_image_builder().build().unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();

    let expected: BTreeMap<&str, usize> = fw.offsets.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(decoded.offsets.sorted(), expected);

    let order: Vec<&str> = decoded.offsets.iter().map(|(name, _)| name).collect();
    assert_eq!(
        order,
        [
            "BOOTLOADER_HDR",
            "BOOTLOADER",
            "ELF_HDR",
            "ELF",
            "KERNEL_MAIN_HDR",
            "KERNEL_MAIN",
            "KERNEL_RECOVERY_HDR",
            "KERNEL_RECOVERY",
        ]
    );
}

#[test]
fn offset_map_is_injective() {
    let fw = three_image_builder().build().unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();

    let distinct: BTreeSet<usize> = decoded.offsets.iter().map(|(_, offset)| offset).collect();
    assert_eq!(distinct.len(), decoded.offsets.len());

    for name in ImageName::ALL {
        let header = decoded.offsets.get(name.header_key()).unwrap();
        let payload = decoded.offsets.get(name.map_key()).unwrap();
        assert_eq!(payload, header + HEADER_SIZE);
    }
}

#[test]
fn sizes_are_consistent() {
    let fw = three_image_builder().build().unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();

    // Target list: count word, ids, reserved word.
    assert_eq!(decoded.bootloader.header_bytes.offset, 4 + 16 * decoded.targets.len() + 4);

    let total_size = decoded.bootloader.header.size as usize;
    assert_eq!(decoded.bootloader.header_bytes.offset + total_size, fw.bytes.len());

    for image in &decoded.images {
        let raw_size = image.header.size as usize;
        assert_eq!(raw_size, HEADER_SIZE + 4 + image.payload.len());
        assert_eq!(image.header.decompressed_size as usize, image.data.len());
    }
}

#[test]
fn artifacts_cover_every_region() {
    let fw = three_image_builder().build().unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();
    let artifacts = decoded.artifacts();

    let names: Vec<&str> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(
        names,
        [
            "bootloader.hdr",
            "bootloader.sig",
            "bootloader.bin",
            "sign_params.raw",
            "elf.hdr",
            "elf.sig",
            "elf.raw",
            "elf.bin",
            "kernel_main.hdr",
            "kernel_main.sig",
            "kernel_main.raw",
            "kernel_main.bin",
            "kernel_recovery.hdr",
            "kernel_recovery.sig",
            "kernel_recovery.raw",
            "kernel_recovery.bin",
        ]
    );

    for artifact in &artifacts {
        if let Some(offset) = artifact.offset {
            let end = offset + artifact.bytes.len();
            assert_eq!(&fw.bytes[offset..end], artifact.bytes, "{}", artifact.file_name);
        }
        match artifact.file_name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("hdr") => assert_eq!(artifact.bytes.len(), 0x440),
            Some("sig") => assert_eq!(artifact.bytes.len(), 0x100),
            Some("bin") if artifact.offset.is_none() => {
                let stem = artifact.file_name.trim_end_matches(".bin");
                let image = decoded.images.iter().find(|i| i.name.as_str() == stem).unwrap();
                assert_eq!(artifact.bytes.len(), image.data.len());
            }
            _ => {}
        }
    }
}

#[test]
fn fewer_than_three_images() {
    let fw = FirmwareBuilder::new()
        .image(sample_image("elf", 0x800))
        .trailing_padding(0x40)
        .build()
        .unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();

    assert_eq!(decoded.images.len(), 1);
    assert!(decoded.image(ImageName::KernelMain).is_none());
    assert_eq!(decoded.offsets.len(), 4);
}

#[test]
fn identical_input_decodes_identically() {
    let fw = three_image_builder().build().unwrap();
    let first = strict().decode(&fw.bytes).unwrap();
    let second = strict().decode(&fw.bytes).unwrap();

    let digest = |d: &ilo_decoder::DecodedContainer<'_>| -> Vec<(String, blake3::Hash)> {
        d.artifacts()
            .iter()
            .map(|a| (a.file_name.clone(), blake3::hash(a.bytes)))
            .collect()
    };
    assert_eq!(digest(&first), digest(&second));
    assert_eq!(first.offsets, second.offsets);
}

// ── Reference scenario ────────────────────────────────────────────────────────

#[test]
fn bootloader_only_scenario() {
    let fw = scenario_builder().build().unwrap();
    assert_eq!(SCENARIO_PADDING, 0xF7C0);

    let decoded = strict().decode(&fw.bytes).unwrap();
    assert_eq!(decoded.targets[0].name, "iLO 4");
    assert_eq!(decoded.bootloader.header.size, 0x10440);
    assert_eq!(decoded.bootloader.footer.sig_displacement(), 0x40);
    assert_eq!(decoded.bootloader.footer.kernel_offset, 0x840);
    assert_eq!(decoded.bootloader.binary.len(), 0x400);
    assert!(decoded.sign_params.raw.is_empty());
    assert_eq!(decoded.sign_params.raw.offset, fw.footer.start);
    assert!(decoded.images.is_empty());
}

#[test]
fn short_kernel_offset_needs_permissive_bounds() {
    let fw = scenario_builder().kernel_offset(0x40).build().unwrap();

    let err = strict().decode(&fw.bytes).unwrap_err();
    assert!(matches!(err, DecodeError::CorruptContainer { .. }), "{err}");

    let decoded = permissive().decode(&fw.bytes).unwrap();
    assert!(decoded.bootloader.binary.is_empty());
    assert!(decoded.sign_params.raw.is_empty());
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

#[test]
fn scenario_map_snapshot() {
    let fw = scenario_builder().build().unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();
    assert_snapshot!(decoded.offsets.to_json().unwrap(), @r#"
{
    "BOOTLOADER": 64536,
    "BOOTLOADER_HDR": 24
}
"#);
}

#[test]
fn stored_images_map_snapshot() {
    let fw = FirmwareBuilder::new()
        .stored_image(vec![0x11; 64])
        .image_with_padding(Vec::new(), 0)
        .build()
        .unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();
    assert_eq!(decoded.images[1].data, Vec::<u8>::new());
    assert_snapshot!(decoded.offsets.to_json().unwrap(), @r#"
{
    "BOOTLOADER": 3368,
    "BOOTLOADER_HDR": 24,
    "ELF": 2200,
    "ELF_HDR": 1112,
    "KERNEL_MAIN": 3364,
    "KERNEL_MAIN_HDR": 2276
}
"#);
}

#[test]
fn scenario_records_snapshot() {
    let fw = scenario_builder().build().unwrap();
    let decoded = strict().decode(&fw.bytes).unwrap();

    let header = Record::BootloaderHeader(decoded.bootloader.header.clone());
    assert_snapshot!(header.render_text(), @r"
bootloader header
  magic             : iLO4
  build_version     : 2.55
  kind              : 0x0000
  compression_type  : 0x0000
  field_24          : 0x00000000
  field_28          : 0x00000000
  decompressed_size : 0x00000000
  total_size        : 0x00010440
  load_address      : 0x00000000
  field_38          : 0x00000000
  field_3c          : 0x00000000
  signature         : 256 bytes
");

    let footer = Record::BootloaderFooter(decoded.bootloader.footer.clone());
    assert_snapshot!(footer.render_text(), @r"
bootloader footer
  sig_offset        : 0xffc0 (-0x40)
  field_2a          : 0x0000
  kernel_offset     : 0x00000840
");
}
