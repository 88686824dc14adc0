use std::fmt;

use ilo_wire::header::{SIGNATURE_OFFSET, SIGNATURE_SIZE};
use ilo_wire::{BootloaderFooter, SignatureParams, SignedHeader, TargetId};

use crate::cursor::Section;
use crate::offset_map::OffsetMap;

/// The images a container may carry, in the order they appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageName {
    Elf,
    KernelMain,
    KernelRecovery,
}

impl ImageName {
    pub const ALL: [ImageName; 3] = [Self::Elf, Self::KernelMain, Self::KernelRecovery];

    /// Lower-case name, used as the artifact file stem.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elf => "elf",
            Self::KernelMain => "kernel_main",
            Self::KernelRecovery => "kernel_recovery",
        }
    }

    /// Offset-map key of the payload.
    pub fn map_key(self) -> &'static str {
        match self {
            Self::Elf => "ELF",
            Self::KernelMain => "KERNEL_MAIN",
            Self::KernelRecovery => "KERNEL_RECOVERY",
        }
    }

    /// Offset-map key of the header.
    pub fn header_key(self) -> &'static str {
        match self {
            Self::Elf => "ELF_HDR",
            Self::KernelMain => "KERNEL_MAIN_HDR",
            Self::KernelRecovery => "KERNEL_RECOVERY_HDR",
        }
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved entry of the container's target list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetEntry {
    pub index: usize,
    pub id: TargetId,
    pub name: String,
}

/// The bootloader: its header, the embedded binary and the trailing footer.
#[derive(Clone, Debug)]
pub struct Bootloader<'a> {
    pub header: SignedHeader,
    pub header_bytes: Section<'a>,
    pub binary: Section<'a>,
    pub footer: BootloaderFooter,
    pub footer_bytes: Section<'a>,
}

impl<'a> Bootloader<'a> {
    /// The signature sub-field of the header.
    pub fn signature(&self) -> Section<'a> {
        signature_of(self.header_bytes)
    }
}

/// The signature-parameters blob that precedes the footer.
#[derive(Clone, Debug)]
pub struct SignParams<'a> {
    pub params: SignatureParams,
    pub raw: Section<'a>,
}

/// One extracted image.
#[derive(Clone, Debug)]
pub struct Image<'a> {
    pub name: ImageName,
    pub header: SignedHeader,
    pub header_bytes: Section<'a>,
    /// Compressed payload, after its 4-byte length field.
    pub payload: Section<'a>,
    pub data: Vec<u8>,
    /// Byte count reported by the decompressor; always `data.len()`.
    pub decompressed_len: usize,
}

impl<'a> Image<'a> {
    pub fn signature(&self) -> Section<'a> {
        signature_of(self.header_bytes)
    }
}

fn signature_of(header: Section<'_>) -> Section<'_> {
    header.sub(SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE)
}

/// Everything decoded from a firmware container.
///
/// Slices borrow from the input buffer; only decompressed image data is
/// owned.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │ DecodedContainer                                         │
/// │   targets:     Vec<TargetEntry>  ← resolved device names │
/// │   bootloader:  Bootloader        ← hdr, bin, footer      │
/// │   sign_params: SignParams        ← raw blob              │
/// │   images:      Vec<Image>        ← at most three         │
/// │   offsets:     OffsetMap         ← firmware.map          │
/// └──────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug)]
pub struct DecodedContainer<'a> {
    pub targets: Vec<TargetEntry>,
    pub bootloader: Bootloader<'a>,
    pub sign_params: SignParams<'a>,
    pub images: Vec<Image<'a>>,
    pub offsets: OffsetMap,
}

/// One output file: its name, contents and where the bytes came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact<'a> {
    pub file_name: String,
    pub bytes: &'a [u8],
    /// Absolute offset in the input, `None` for decompressed data.
    pub offset: Option<usize>,
}

impl<'a> Artifact<'a> {
    fn from_section(file_name: String, section: Section<'a>) -> Self {
        Self {
            file_name,
            bytes: section.bytes,
            offset: Some(section.offset),
        }
    }
}

impl DecodedContainer<'_> {
    /// Every artifact the extraction writes, except the offset map.
    ///
    /// Order: bootloader header, signature, binary, signature parameters,
    /// then `.hdr`, `.sig`, `.raw`, `.bin` for each image.
    pub fn artifacts(&self) -> Vec<Artifact<'_>> {
        let mut out = vec![
            Artifact::from_section("bootloader.hdr".to_string(), self.bootloader.header_bytes),
            Artifact::from_section("bootloader.sig".to_string(), self.bootloader.signature()),
            Artifact::from_section("bootloader.bin".to_string(), self.bootloader.binary),
            Artifact::from_section("sign_params.raw".to_string(), self.sign_params.raw),
        ];

        for image in &self.images {
            let stem = image.name.as_str();
            out.push(Artifact::from_section(format!("{stem}.hdr"), image.header_bytes));
            out.push(Artifact::from_section(format!("{stem}.sig"), image.signature()));
            out.push(Artifact::from_section(format!("{stem}.raw"), image.payload));
            out.push(Artifact {
                file_name: format!("{stem}.bin"),
                bytes: &image.data,
                offset: None,
            });
        }

        out
    }

    pub fn image(&self, name: ImageName) -> Option<&Image<'_>> {
        self.images.iter().find(|image| image.name == name)
    }
}
