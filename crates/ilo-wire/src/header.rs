use std::borrow::Cow;
use std::fmt::Write as _;

use crate::error::WireError;
use crate::le::{array, read_u16, read_u32, write_u16, write_u32};
use crate::record::RecordKind;

/// Total size of a signed header, in bytes.
///
/// The bootloader header and every image header share this layout.
pub const HEADER_SIZE: usize = 0x440;

/// Size of the platform tag at the start of every signed header.
///
/// The same four bytes (for example `iLO4`) mark the start of each image,
/// so the decoder captures them from the bootloader header and scans for
/// them later.
pub const MAGIC_SIZE: usize = 4;

pub const BUILD_VERSION_SIZE: usize = 0x1C;

/// Offset of the embedded signature sub-field within the header.
pub const SIGNATURE_OFFSET: usize = 0x40;

/// Size of the embedded signature sub-field (RSA-2048).
pub const SIGNATURE_SIZE: usize = 0x100;

/// Signed header preceding the bootloader and each image.
///
/// ```text
/// ┌────────┬─────────┬───────────────────────────────────────────────┐
/// │ Offset │ Size    │ Field                                         │
/// ├────────┼─────────┼───────────────────────────────────────────────┤
/// │ 0x000  │ 4       │ magic (platform tag, e.g. "iLO4")             │
/// │ 0x004  │ 0x1C    │ build version, NUL padded                     │
/// │ 0x020  │ 2       │ kind                                          │
/// │ 0x022  │ 2       │ compression type                              │
/// │ 0x024  │ 4       │ field_24                                      │
/// │ 0x028  │ 4       │ field_28                                      │
/// │ 0x02C  │ 4       │ decompressed size                             │
/// │ 0x030  │ 4       │ size: total_size (bootloader) / raw_size      │
/// │ 0x034  │ 4       │ load address                                  │
/// │ 0x038  │ 4       │ field_38                                      │
/// │ 0x03C  │ 4       │ field_3c                                      │
/// │ 0x040  │ 0x100   │ signature                                     │
/// │ 0x140  │ 0x300   │ padding                                       │
/// └────────┴─────────┴───────────────────────────────────────────────┘
/// ```
///
/// `size` counts the header itself: for an image it is header plus
/// payload, for the bootloader it spans everything the bootloader header
/// covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeader {
    pub magic: [u8; MAGIC_SIZE],
    pub build_version: [u8; BUILD_VERSION_SIZE],
    pub kind: u16,
    pub compression_type: u16,
    pub field_24: u32,
    pub field_28: u32,
    pub decompressed_size: u32,
    pub size: u32,
    pub load_address: u32,
    pub field_38: u32,
    pub field_3c: u32,
    pub signature: [u8; SIGNATURE_SIZE],
}

impl SignedHeader {
    /// Create a header with the given tag and size; every other field is zero.
    pub fn new(magic: [u8; MAGIC_SIZE], size: u32) -> Self {
        Self {
            magic,
            build_version: [0; BUILD_VERSION_SIZE],
            kind: 0,
            compression_type: 0,
            field_24: 0,
            field_28: 0,
            decompressed_size: 0,
            size,
            load_address: 0,
            field_38: 0,
            field_3c: 0,
            signature: [0; SIGNATURE_SIZE],
        }
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// No field is validated here: sizes and offsets are trusted from the
    /// data and checked by the container decoder where they are used.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`HEADER_SIZE`].
    pub fn read_from(buf: &[u8], kind: RecordKind) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                kind,
                needed: HEADER_SIZE,
                available: buf.len(),
            });
        }

        Ok(Self {
            magic: array(buf, 0x000),
            build_version: array(buf, 0x004),
            kind: read_u16(buf, 0x020),
            compression_type: read_u16(buf, 0x022),
            field_24: read_u32(buf, 0x024),
            field_28: read_u32(buf, 0x028),
            decompressed_size: read_u32(buf, 0x02C),
            size: read_u32(buf, 0x030),
            load_address: read_u32(buf, 0x034),
            field_38: read_u32(buf, 0x038),
            field_3c: read_u32(buf, 0x03C),
            signature: array(buf, SIGNATURE_OFFSET),
        })
    }

    /// Write the header into the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// The trailing padding area is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`HEADER_SIZE`].
    pub fn write_to(&self, buf: &mut [u8], kind: RecordKind) -> Result<(), WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                kind,
                needed: HEADER_SIZE,
                available: buf.len(),
            });
        }

        buf[0x000..0x004].copy_from_slice(&self.magic);
        buf[0x004..0x020].copy_from_slice(&self.build_version);
        write_u16(buf, 0x020, self.kind);
        write_u16(buf, 0x022, self.compression_type);
        write_u32(buf, 0x024, self.field_24);
        write_u32(buf, 0x028, self.field_28);
        write_u32(buf, 0x02C, self.decompressed_size);
        write_u32(buf, 0x030, self.size);
        write_u32(buf, 0x034, self.load_address);
        write_u32(buf, 0x038, self.field_38);
        write_u32(buf, 0x03C, self.field_3c);
        buf[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE].copy_from_slice(&self.signature);

        Ok(())
    }

    /// The build version string with trailing NULs removed.
    pub fn build_version(&self) -> Cow<'_, str> {
        let end = self
            .build_version
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(BUILD_VERSION_SIZE);
        String::from_utf8_lossy(&self.build_version[..end])
    }

    /// The platform tag as text, e.g. `iLO4`.
    pub fn magic_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.magic)
    }

    pub(crate) fn render(&self, title: &str, size_label: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "  {:<18}: {}", "magic", self.magic_str());
        let _ = writeln!(out, "  {:<18}: {}", "build_version", self.build_version());
        let _ = writeln!(out, "  {:<18}: {:#06x}", "kind", self.kind);
        let _ = writeln!(out, "  {:<18}: {:#06x}", "compression_type", self.compression_type);
        let _ = writeln!(out, "  {:<18}: {:#010x}", "field_24", self.field_24);
        let _ = writeln!(out, "  {:<18}: {:#010x}", "field_28", self.field_28);
        let _ = writeln!(out, "  {:<18}: {:#010x}", "decompressed_size", self.decompressed_size);
        let _ = writeln!(out, "  {:<18}: {:#010x}", size_label, self.size);
        let _ = writeln!(out, "  {:<18}: {:#010x}", "load_address", self.load_address);
        let _ = writeln!(out, "  {:<18}: {:#010x}", "field_38", self.field_38);
        let _ = writeln!(out, "  {:<18}: {:#010x}", "field_3c", self.field_3c);
        let _ = write!(out, "  {:<18}: {} bytes", "signature", SIGNATURE_SIZE);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SignedHeader {
        let mut header = SignedHeader::new(*b"iLO4", 0x0001_0440);
        header.build_version[..10].copy_from_slice(b"2.55 build");
        header.kind = 0x0002;
        header.decompressed_size = 0x0003_0000;
        header.load_address = 0x8000_0000;
        header.signature = [0xA5; SIGNATURE_SIZE];
        header
    }

    #[test]
    fn fields_land_at_documented_offsets() {
        let mut buf = vec![0u8; HEADER_SIZE];
        sample().write_to(&mut buf, RecordKind::ImageHeader).unwrap();

        assert_eq!(&buf[0..4], b"iLO4");
        assert_eq!(&buf[0x30..0x34], &0x0001_0440u32.to_le_bytes());
        assert_eq!(&buf[0x2C..0x30], &0x0003_0000u32.to_le_bytes());
        assert!(buf[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE]
            .iter()
            .all(|&b| b == 0xA5));
        assert!(buf[SIGNATURE_OFFSET + SIGNATURE_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn parses_what_was_written() {
        let mut buf = vec![0xFFu8; HEADER_SIZE + 16];
        sample().write_to(&mut buf, RecordKind::BootloaderHeader).unwrap();
        let parsed = SignedHeader::read_from(&buf, RecordKind::BootloaderHeader).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn build_version_stops_at_nul() {
        assert_eq!(sample().build_version(), "2.55 build");
        assert_eq!(sample().magic_str(), "iLO4");
    }

    #[test]
    fn reject_short_buffer() {
        let buf = [0u8; HEADER_SIZE - 1];
        let result = SignedHeader::read_from(&buf, RecordKind::ImageHeader);
        assert!(matches!(
            result,
            Err(WireError::UnexpectedEof {
                needed: HEADER_SIZE,
                available: 0x43F,
                ..
            })
        ));
    }

    #[test]
    fn render_uses_size_label() {
        let text = sample().render("bootloader header", "total_size");
        assert!(text.starts_with("bootloader header\n"));
        assert!(text.contains("total_size        : 0x00010440"));
        assert!(text.contains("magic             : iLO4"));
    }
}
