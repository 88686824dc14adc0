use ilo_wire::{
    BootloaderFooter, FOOTER_SIZE, HEADER_SIZE, Record, RecordKind, SignedHeader, TARGET_ID_SIZE,
    TargetId,
};
use log::{debug, info, warn};

use crate::config::{BoundsPolicy, DecoderConfig};
use crate::container::{Bootloader, DecodedContainer, Image, ImageName, SignParams, TargetEntry};
use crate::cursor::{Cursor, Section};
use crate::decompression::{Decompressor, Lzss};
use crate::error::DecodeError;
use crate::offset_map::OffsetMap;

/// Decodes an in-memory firmware container into its regions.
///
/// Decoding walks the buffer front to back in four steps:
///
///   1. **Targets**: read the target count and identifiers, resolve each
///      against the configured target table, skip the reserved word.
///   2. **Bootloader**: read the 0x440-byte header, then the footer from
///      the last 0x40 bytes. The footer's `kernel_offset` locates the
///      embedded bootloader binary relative to the end of the buffer.
///      The working buffer is then cut to `total_size` bytes.
///   3. **Signature parameters**: locate the blob from the footer's
///      `sig_offset`, again relative to the end of the working buffer.
///   4. **Images**: up to three times, search for the bootloader header's
///      magic, check the gap before it is all 0xFF, read the image header
///      and length-prefixed payload, and decompress it.
///
/// Every region's absolute start is recorded in the offset map as it is
/// found.
///
/// # Example
///
/// ```rust
/// use ilo_builder::FirmwareBuilder;
/// use ilo_decoder::{ContainerDecoder, DecoderConfig};
///
/// let fw = FirmwareBuilder::new()
///     .image(b"\x7fELF....".to_vec())
///     .build()
///     .unwrap();
///
/// let decoded = ContainerDecoder::new(DecoderConfig::default())
///     .decode(&fw.bytes)
///     .unwrap();
/// assert_eq!(decoded.targets[0].name, "iLO 4");
/// assert_eq!(decoded.images[0].data, b"\x7fELF....");
/// ```
#[derive(Clone, Debug)]
pub struct ContainerDecoder<D = Lzss> {
    config: DecoderConfig,
    decompressor: D,
}

impl Default for ContainerDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl ContainerDecoder {
    /// A decoder using LZSS with the configured image size limit.
    pub fn new(config: DecoderConfig) -> Self {
        let decompressor = Lzss::with_limit(config.max_image_size);
        Self {
            config,
            decompressor,
        }
    }
}

impl<D: Decompressor> ContainerDecoder<D> {
    /// A decoder using a caller-supplied payload decompressor.
    pub fn with_decompressor(config: DecoderConfig, decompressor: D) -> Self {
        Self {
            config,
            decompressor,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a complete firmware container.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::UnknownTarget`] if a target id is not in the table.
    /// - [`DecodeError::TruncatedInput`] if a fixed-size structure runs
    ///   past the end of the data.
    /// - [`DecodeError::CorruptContainer`] if `total_size`, `kernel_offset`
    ///   or `sig_offset` points outside the data (strict bounds only).
    /// - [`DecodeError::PaddingViolation`] if the gap before an image
    ///   header holds a byte other than 0xFF.
    /// - [`DecodeError::SizeMismatch`] if an image's length field disagrees
    ///   with its header or with the bytes present.
    /// - [`DecodeError::Decompress`] if a payload fails to decompress.
    pub fn decode<'a>(&self, input: &'a [u8]) -> Result<DecodedContainer<'a>, DecodeError> {
        let mut cursor = Cursor::new(input);
        let mut offsets = OffsetMap::new();

        let targets = self.read_targets(&mut cursor)?;
        let bootloader = self.read_bootloader(&mut cursor, &mut offsets)?;
        let sign_params = self.read_sign_params(&cursor, &bootloader.footer)?;
        let images = self.extract_images(&mut cursor, &mut offsets, bootloader.header.magic)?;

        Ok(DecodedContainer {
            targets,
            bootloader,
            sign_params,
            images,
            offsets,
        })
    }

    fn read_targets(&self, cursor: &mut Cursor<'_>) -> Result<Vec<TargetEntry>, DecodeError> {
        let count = cursor.read_u32_le("target count")? as usize;
        let table_len = count.checked_mul(TARGET_ID_SIZE).unwrap_or(usize::MAX);
        let table = cursor.take(table_len, "target list")?;

        let mut targets = Vec::with_capacity(count);
        for (index, raw) in table.bytes.chunks_exact(TARGET_ID_SIZE).enumerate() {
            let mut bytes = [0u8; TARGET_ID_SIZE];
            bytes.copy_from_slice(raw);
            let id = TargetId::from_bytes(bytes);

            let name = self
                .config
                .targets
                .lookup(&id)
                .ok_or(DecodeError::UnknownTarget { index, id })?;
            info!("target #{index}: {id} ({name})");

            targets.push(TargetEntry {
                index,
                id,
                name: name.to_string(),
            });
        }

        cursor.skip(4, "reserved word")?;
        Ok(targets)
    }

    fn read_bootloader<'a>(
        &self,
        cursor: &mut Cursor<'a>,
        offsets: &mut OffsetMap,
    ) -> Result<Bootloader<'a>, DecodeError> {
        let policy = self.config.bounds;

        let header_bytes = cursor.take(HEADER_SIZE, "bootloader header")?;
        let header = decode_header(RecordKind::BootloaderHeader, header_bytes)?;
        offsets.record("BOOTLOADER_HDR", header_bytes.offset)?;
        info!(
            "bootloader header at {:#010x}, magic {}, total_size {:#x}",
            header_bytes.offset,
            header.magic_str(),
            header.size
        );

        let header_end = cursor.position();
        let footer_bytes = cursor.tail(FOOTER_SIZE, "bootloader footer")?;
        let footer = decode_footer(footer_bytes)?;

        let kernel_offset = footer.kernel_offset as usize;
        let binary = cursor.tail_range(kernel_offset, HEADER_SIZE, policy, "bootloader binary")?;

        let total_size = header.size as usize;
        let body_len = match total_size.checked_sub(HEADER_SIZE) {
            Some(len) => len,
            None if policy == BoundsPolicy::Strict => {
                return Err(DecodeError::CorruptContainer {
                    offset: header_bytes.offset,
                    reason: format!("total_size {total_size:#x} is smaller than its own header"),
                });
            }
            None => 0,
        };
        cursor.truncate(body_len, policy, "bootloader body")?;

        let map_offset = header_end
            .checked_add(total_size)
            .and_then(|end| end.checked_sub(kernel_offset + HEADER_SIZE));
        let map_offset = match map_offset {
            Some(offset) => offset,
            None if policy == BoundsPolicy::Strict => {
                return Err(DecodeError::CorruptContainer {
                    offset: footer_bytes.offset,
                    reason: format!(
                        "kernel_offset {kernel_offset:#x} reaches before the bootloader body"
                    ),
                });
            }
            None => header_end,
        };
        offsets.record("BOOTLOADER", map_offset)?;
        info!(
            "bootloader binary at {:#010x}, {:#x} bytes",
            binary.offset,
            binary.len()
        );

        Ok(Bootloader {
            header,
            header_bytes,
            binary,
            footer,
            footer_bytes,
        })
    }

    fn read_sign_params<'a>(
        &self,
        cursor: &Cursor<'a>,
        footer: &BootloaderFooter,
    ) -> Result<SignParams<'a>, DecodeError> {
        let raw = cursor.end_range(
            footer.sig_displacement(),
            FOOTER_SIZE,
            self.config.bounds,
            "signature parameters",
        )?;

        let record = Record::decode(RecordKind::SignatureParams, raw.bytes)?;
        debug!("{}", record.render_text());
        let params = match record {
            Record::SignatureParams(params) => params,
            other => {
                return Err(DecodeError::CorruptContainer {
                    offset: raw.offset,
                    reason: format!("expected signature parameters, decoded {}", other.kind()),
                });
            }
        };
        info!(
            "signature parameters at {:#010x}, {:#x} bytes",
            raw.offset,
            raw.len()
        );

        Ok(SignParams { params, raw })
    }

    fn extract_images<'a>(
        &self,
        cursor: &mut Cursor<'a>,
        offsets: &mut OffsetMap,
        marker: [u8; 4],
    ) -> Result<Vec<Image<'a>>, DecodeError> {
        let mut images = Vec::with_capacity(ImageName::ALL.len());

        for name in ImageName::ALL {
            let Some(gap) = cursor.find(&marker) else {
                debug!("no further image marker after {:#010x}", cursor.position());
                break;
            };

            check_padding(cursor, gap, name)?;
            cursor.skip(gap, "image padding")?;

            let image = self.read_image(cursor, offsets, name)?;
            images.push(image);
        }

        Ok(images)
    }

    fn read_image<'a>(
        &self,
        cursor: &mut Cursor<'a>,
        offsets: &mut OffsetMap,
        name: ImageName,
    ) -> Result<Image<'a>, DecodeError> {
        let image = name.as_str();

        let header_bytes = cursor.take(HEADER_SIZE, "image header")?;
        let header = decode_header(RecordKind::ImageHeader, header_bytes)?;
        offsets.record(name.header_key(), header_bytes.offset)?;
        offsets.record(name.map_key(), cursor.position())?;

        let raw_size = header.size as usize;
        let payload_size = raw_size.checked_sub(HEADER_SIZE + 4).ok_or(DecodeError::SizeMismatch {
            image,
            field: "raw_size",
            offset: header_bytes.offset,
            expected: HEADER_SIZE + 4,
            actual: raw_size,
        })?;

        let payload_at = cursor.position();
        let psz = cursor.read_u32_le("image length field")? as usize;
        if psz != payload_size {
            return Err(DecodeError::SizeMismatch {
                image,
                field: "psz",
                offset: payload_at,
                expected: payload_size,
                actual: psz,
            });
        }

        let payload = cursor.take_up_to(payload_size);
        if payload.len() != psz {
            return Err(DecodeError::SizeMismatch {
                image,
                field: "payload length",
                offset: payload_at,
                expected: psz,
                actual: payload.len(),
            });
        }

        let mut data = Vec::new();
        let produced = self
            .decompressor
            .decompress(payload.bytes, &mut data)
            .map_err(|source| DecodeError::Decompress { image, source })?;
        if produced != data.len() {
            return Err(DecodeError::SizeMismatch {
                image,
                field: "decompressed length",
                offset: payload.offset,
                expected: produced,
                actual: data.len(),
            });
        }

        if header.decompressed_size as usize != produced {
            warn!(
                "{image}: header says {:#x} bytes decompressed, got {produced:#x}",
                header.decompressed_size
            );
        }
        info!(
            "{image} at {:#010x}: {:#x} bytes -> {produced:#x} bytes",
            header_bytes.offset,
            payload.len()
        );

        Ok(Image {
            name,
            header,
            header_bytes,
            payload,
            data,
            decompressed_len: produced,
        })
    }
}

/// Every byte between the cursor and the next header must be 0xFF.
fn check_padding(cursor: &Cursor<'_>, gap: usize, name: ImageName) -> Result<(), DecodeError> {
    let padding = cursor.peek(gap);
    match padding.bytes.iter().position(|&b| b != 0xFF) {
        None => Ok(()),
        Some(at) => Err(DecodeError::PaddingViolation {
            image: name.as_str(),
            offset: padding.offset + at,
            byte: padding.bytes[at],
            region_start: cursor.position(),
            region_end: cursor.end(),
        }),
    }
}

fn decode_header(kind: RecordKind, bytes: Section<'_>) -> Result<SignedHeader, DecodeError> {
    let record = Record::decode(kind, bytes.bytes)?;
    debug!("{:#010x}: {}", bytes.offset, record.render_text());
    match record {
        Record::BootloaderHeader(header) | Record::ImageHeader(header) => Ok(header),
        other => Err(DecodeError::CorruptContainer {
            offset: bytes.offset,
            reason: format!("expected {kind}, decoded {}", other.kind()),
        }),
    }
}

fn decode_footer(bytes: Section<'_>) -> Result<BootloaderFooter, DecodeError> {
    match Record::decode(RecordKind::BootloaderFooter, bytes.bytes)? {
        Record::BootloaderFooter(footer) => Ok(footer),
        other => Err(DecodeError::CorruptContainer {
            offset: bytes.offset,
            reason: format!("expected bootloader footer, decoded {}", other.kind()),
        }),
    }
}
