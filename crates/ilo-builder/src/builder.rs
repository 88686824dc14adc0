use std::collections::BTreeMap;
use std::ops::Range;

use ilo_wire::{
    BootloaderFooter, FOOTER_SIZE, HEADER_SIZE, RecordKind, SignedHeader, TARGET_ID_SIZE,
    TargetId,
};

use crate::compression;
use crate::error::BuildError;

/// Room reserved between the bootloader binary and the footer for the
/// signature-parameters blob.
pub const SIGN_PARAMS_SLOT: usize = HEADER_SIZE - FOOTER_SIZE;

/// Image names in the order the decoder assigns them.
const IMAGE_KEYS: [&str; 3] = ["ELF", "KERNEL_MAIN", "KERNEL_RECOVERY"];

/// Identifier of the iLO 4 target, in file byte order.
pub const ILO4_TARGET: [u8; TARGET_ID_SIZE] = [
    0x29, 0x32, 0xEC, 0xAE, 0xCC, 0x69, 0xD8, 0x43, 0xBD, 0x0E, 0x61, 0xDC, 0x34, 0x06, 0xF7, 0x1B,
];

#[derive(Clone, Debug)]
struct ImageSpec {
    padding: usize,
    data: Vec<u8>,
    stored: bool,
}

/// Assembles a firmware container from its parts.
///
/// The container is laid out as:
///
/// ```text
///   ┌──────────────────────────────┐
///   │ target count (u32 LE)        │
///   │ target ids (16 bytes each)   │
///   │ reserved (u32)               │
///   ├──────────────────────────────┤
///   │ bootloader header (0x440)    │  ← size = total_size
///   ├──────────────────────────────┤
///   │ 0xFF padding                 │  ┐
///   │ image header (0x440)         │  │ repeated per image
///   │ psz (u32 LE) + LZSS payload  │  ┘
///   ├──────────────────────────────┤
///   │ 0xFF padding                 │
///   │ bootloader binary            │  ← end − kernel_offset
///   │ 0xFF fill + sign params      │  ← 0x400-byte slot
///   │ bootloader footer (0x40)     │
///   └──────────────────────────────┘
/// ```
///
/// Header size fields, the footer's `kernel_offset` and `sig_offset` are
/// derived from the parts unless overridden.
///
/// # Example
///
/// ```rust
/// use ilo_builder::FirmwareBuilder;
///
/// let fw = FirmwareBuilder::new()
///     .image(b"elf image".to_vec())
///     .build()
///     .unwrap();
/// assert!(fw.offsets.contains_key("ELF_HDR"));
/// ```
#[derive(Clone, Debug)]
pub struct FirmwareBuilder {
    targets: Vec<[u8; TARGET_ID_SIZE]>,
    marker: [u8; 4],
    build_version: String,
    images: Vec<ImageSpec>,
    trailing_padding: usize,
    bootloader: Vec<u8>,
    sign_params: Vec<u8>,
    total_size: Option<u32>,
    kernel_offset: Option<u32>,
    sig_offset: Option<u16>,
}

/// A built container together with where each part was placed.
#[derive(Clone, Debug)]
pub struct BuiltFirmware {
    pub bytes: Vec<u8>,
    /// The offset map a correct decoder reports for these bytes.
    pub offsets: BTreeMap<String, usize>,
    /// Absolute range of the bootloader header.
    pub bootloader_header: Range<usize>,
    /// Absolute range of the embedded bootloader binary.
    pub bootloader: Range<usize>,
    /// Absolute range of the signature-parameters blob.
    pub sign_params: Range<usize>,
    /// Absolute range of the footer.
    pub footer: Range<usize>,
    pub images: Vec<BuiltImage>,
}

/// Placement of one image inside a built container.
#[derive(Clone, Debug)]
pub struct BuiltImage {
    /// The 0xFF gap before the header.
    pub padding: Range<usize>,
    pub header: Range<usize>,
    /// The payload, starting with its 4-byte length field.
    pub payload: Range<usize>,
    /// The uncompressed image bytes.
    pub data: Vec<u8>,
}

impl BuiltFirmware {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for FirmwareBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FirmwareBuilder {
    /// A builder for a container targeting iLO 4, with a 0x400-byte
    /// bootloader, no images and an empty signature-parameters blob.
    pub fn new() -> Self {
        Self {
            targets: vec![ILO4_TARGET],
            marker: *b"iLO4",
            build_version: "2.55".to_string(),
            images: Vec::new(),
            trailing_padding: 0,
            bootloader: default_bootloader(0x400),
            sign_params: Vec::new(),
            total_size: None,
            kernel_offset: None,
            sig_offset: None,
        }
    }

    /// Replace the target list.
    #[must_use]
    pub fn targets(mut self, targets: impl IntoIterator<Item = TargetId>) -> Self {
        self.targets = targets.into_iter().map(|id| id.0).collect();
        self
    }

    /// Set the 4-byte tag written at the start of every header.
    #[must_use]
    pub fn marker(mut self, marker: [u8; 4]) -> Self {
        self.marker = marker;
        self
    }

    #[must_use]
    pub fn build_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = version.into();
        self
    }

    /// Append an LZSS-compressed image directly after the previous part.
    #[must_use]
    pub fn image(self, data: Vec<u8>) -> Self {
        self.image_with_padding(data, 0)
    }

    /// Append an LZSS-compressed image preceded by `padding` bytes of 0xFF.
    #[must_use]
    pub fn image_with_padding(mut self, data: Vec<u8>, padding: usize) -> Self {
        self.images.push(ImageSpec {
            padding,
            data,
            stored: false,
        });
        self
    }

    /// Append an image encoded as literals only.
    #[must_use]
    pub fn stored_image(mut self, data: Vec<u8>) -> Self {
        self.images.push(ImageSpec {
            padding: 0,
            data,
            stored: true,
        });
        self
    }

    /// 0xFF bytes between the last image and the bootloader binary.
    #[must_use]
    pub fn trailing_padding(mut self, len: usize) -> Self {
        self.trailing_padding = len;
        self
    }

    /// The embedded bootloader binary. It must not contain the marker.
    #[must_use]
    pub fn bootloader(mut self, bytes: Vec<u8>) -> Self {
        self.bootloader = bytes;
        self
    }

    /// The signature-parameters blob, at most [`SIGN_PARAMS_SLOT`] bytes.
    #[must_use]
    pub fn sign_params(mut self, bytes: Vec<u8>) -> Self {
        self.sign_params = bytes;
        self
    }

    /// Write this value into the bootloader header instead of the derived
    /// `total_size`.
    #[must_use]
    pub fn total_size(mut self, value: u32) -> Self {
        self.total_size = Some(value);
        self
    }

    /// Write this value into the footer instead of the derived
    /// `kernel_offset`.
    #[must_use]
    pub fn kernel_offset(mut self, value: u32) -> Self {
        self.kernel_offset = Some(value);
        self
    }

    /// Write this raw value into the footer instead of the derived
    /// `sig_offset`.
    #[must_use]
    pub fn sig_offset(mut self, value: u16) -> Self {
        self.sig_offset = Some(value);
        self
    }

    /// Lay out the container.
    ///
    /// # Errors
    ///
    /// - [`BuildError::SignParamsTooLarge`] if the blob exceeds
    ///   [`SIGN_PARAMS_SLOT`].
    /// - [`BuildError::FieldOverflow`] if a derived size exceeds 32 bits.
    pub fn build(&self) -> Result<BuiltFirmware, BuildError> {
        if self.sign_params.len() > SIGN_PARAMS_SLOT {
            return Err(BuildError::SignParamsTooLarge {
                len: self.sign_params.len(),
                limit: SIGN_PARAMS_SLOT,
            });
        }

        let mut out = Vec::new();
        let mut offsets = BTreeMap::new();

        out.extend_from_slice(&to_u32("target count", self.targets.len())?.to_le_bytes());
        for id in &self.targets {
            out.extend_from_slice(id);
        }
        out.extend_from_slice(&[0; 4]);

        let bl_header_at = out.len();
        out.resize(bl_header_at + HEADER_SIZE, 0);
        offsets.insert("BOOTLOADER_HDR".to_string(), bl_header_at);
        let body_start = out.len();

        let mut images = Vec::with_capacity(self.images.len());
        for (index, spec) in self.images.iter().enumerate() {
            let padding_at = out.len();
            out.resize(padding_at + spec.padding, 0xFF);

            let packed = if spec.stored {
                compression::store(&spec.data)
            } else {
                compression::compress(&spec.data)
            };

            let header_at = out.len();
            let raw_size = to_u32("raw_size", HEADER_SIZE + 4 + packed.len())?;
            let mut header = self.header(raw_size);
            header.decompressed_size = to_u32("decompressed_size", spec.data.len())?;
            header.kind = 2;
            out.resize(header_at + HEADER_SIZE, 0);
            header.write_to(&mut out[header_at..], RecordKind::ImageHeader)?;

            let payload_at = out.len();
            out.extend_from_slice(&to_u32("psz", packed.len())?.to_le_bytes());
            out.extend_from_slice(&packed);

            if let Some(key) = IMAGE_KEYS.get(index) {
                offsets.insert(format!("{key}_HDR"), header_at);
                offsets.insert((*key).to_string(), payload_at);
            }

            images.push(BuiltImage {
                padding: padding_at..header_at,
                header: header_at..payload_at,
                payload: payload_at..out.len(),
                data: spec.data.clone(),
            });
        }

        let pad_at = out.len();
        out.resize(pad_at + self.trailing_padding, 0xFF);

        let bootloader_at = out.len();
        out.extend_from_slice(&self.bootloader);
        offsets.insert("BOOTLOADER".to_string(), bootloader_at);

        let slot_at = out.len();
        out.resize(slot_at + SIGN_PARAMS_SLOT, 0xFF);
        let params_at = out.len() - self.sign_params.len();
        out[params_at..].copy_from_slice(&self.sign_params);

        let footer_at = out.len();
        let kernel_offset = match self.kernel_offset {
            Some(value) => value,
            None => to_u32("kernel_offset", self.bootloader.len() + HEADER_SIZE)?,
        };
        let sig_offset = self.sig_offset.unwrap_or_else(|| {
            BootloaderFooter::encode_sig_offset(self.sign_params.len() + FOOTER_SIZE)
        });
        out.resize(footer_at + FOOTER_SIZE, 0);
        BootloaderFooter::new(kernel_offset, sig_offset).write_to(&mut out[footer_at..])?;

        let total_size = match self.total_size {
            Some(value) => value,
            None => to_u32("total_size", HEADER_SIZE + out.len() - body_start)?,
        };
        self.header(total_size)
            .write_to(&mut out[bl_header_at..], RecordKind::BootloaderHeader)?;

        Ok(BuiltFirmware {
            bytes: out,
            offsets,
            bootloader_header: bl_header_at..body_start,
            bootloader: bootloader_at..slot_at,
            sign_params: params_at..footer_at,
            footer: footer_at..footer_at + FOOTER_SIZE,
            images,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn header(&self, size: u32) -> SignedHeader {
        let mut header = SignedHeader::new(self.marker, size);
        let version = self.build_version.as_bytes();
        let n = version.len().min(header.build_version.len());
        header.build_version[..n].copy_from_slice(&version[..n]);
        for (i, byte) in header.signature.iter_mut().enumerate() {
            *byte = (i % 0xFB) as u8;
        }
        header
    }
}

fn to_u32(field: &'static str, value: usize) -> Result<u32, BuildError> {
    u32::try_from(value).map_err(|_| BuildError::FieldOverflow { field, value })
}

/// Bootloader filler that never contains an `iLO` tag.
#[allow(clippy::cast_possible_truncation)]
fn default_bootloader(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
