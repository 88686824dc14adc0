use std::fmt::Write as _;

use crate::error::WireError;
use crate::le::{array, read_u16, read_u32, write_u16, write_u32};
use crate::record::RecordKind;

/// Size of the bootloader footer, in bytes.
pub const FOOTER_SIZE: usize = 0x40;

const PREFIX_SIZE: usize = 0x28;
const SUFFIX_SIZE: usize = 0x10;

/// Footer occupying the last 0x40 bytes of the bootloader payload.
///
/// ```text
/// ┌────────┬──────┬───────────────────────────────────────────────┐
/// │ Offset │ Size │ Field                                         │
/// ├────────┼──────┼───────────────────────────────────────────────┤
/// │ 0x00   │ 0x28 │ opaque prefix                                 │
/// │ 0x28   │ 2    │ sig_offset (two's-complement displacement)    │
/// │ 0x2A   │ 2    │ field_2a                                      │
/// │ 0x2C   │ 4    │ kernel_offset                                 │
/// │ 0x30   │ 0x10 │ opaque suffix                                 │
/// └────────┴──────┴───────────────────────────────────────────────┘
/// ```
///
/// Both offsets are measured backwards from the end of the bootloader
/// payload. Use [`sig_displacement`](Self::sig_displacement) rather than
/// `sig_offset` directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootloaderFooter {
    pub prefix: [u8; PREFIX_SIZE],
    pub sig_offset: u16,
    pub field_2a: u16,
    pub kernel_offset: u32,
    pub suffix: [u8; SUFFIX_SIZE],
}

impl BootloaderFooter {
    /// Create a footer from its two meaningful fields.
    pub fn new(kernel_offset: u32, sig_offset: u16) -> Self {
        Self {
            prefix: [0; PREFIX_SIZE],
            sig_offset,
            field_2a: 0,
            kernel_offset,
            suffix: [0; SUFFIX_SIZE],
        }
    }

    /// Parse a footer from the first [`FOOTER_SIZE`] bytes of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`FOOTER_SIZE`].
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < FOOTER_SIZE {
            return Err(WireError::UnexpectedEof {
                kind: RecordKind::BootloaderFooter,
                needed: FOOTER_SIZE,
                available: buf.len(),
            });
        }

        Ok(Self {
            prefix: array(buf, 0x00),
            sig_offset: read_u16(buf, 0x28),
            field_2a: read_u16(buf, 0x2A),
            kernel_offset: read_u32(buf, 0x2C),
            suffix: array(buf, 0x30),
        })
    }

    /// Write the footer into the first [`FOOTER_SIZE`] bytes of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`FOOTER_SIZE`].
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), WireError> {
        if buf.len() < FOOTER_SIZE {
            return Err(WireError::UnexpectedEof {
                kind: RecordKind::BootloaderFooter,
                needed: FOOTER_SIZE,
                available: buf.len(),
            });
        }

        buf[0x00..0x28].copy_from_slice(&self.prefix);
        write_u16(buf, 0x28, self.sig_offset);
        write_u16(buf, 0x2A, self.field_2a);
        write_u32(buf, 0x2C, self.kernel_offset);
        buf[0x30..0x40].copy_from_slice(&self.suffix);

        Ok(())
    }

    /// Distance of the signature-parameters blob from the end of the
    /// bootloader payload.
    ///
    /// `sig_offset` stores a small negative number as its unsigned 16-bit
    /// bit pattern; this recovers the magnitude as
    /// `(!sig_offset + 1) mod 65536`.
    pub fn sig_displacement(&self) -> usize {
        usize::from((!self.sig_offset).wrapping_add(1))
    }

    /// Encode a backwards displacement the way the footer stores it.
    ///
    /// Displacements are reduced modulo 65536.
    pub fn encode_sig_offset(displacement: usize) -> u16 {
        // Truncation to 16 bits is the storage format.
        #[allow(clippy::cast_possible_truncation)]
        let low = displacement as u16;
        low.wrapping_neg()
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "bootloader footer");
        let _ = writeln!(
            out,
            "  {:<18}: {:#06x} (-{:#x})",
            "sig_offset",
            self.sig_offset,
            self.sig_displacement()
        );
        let _ = writeln!(out, "  {:<18}: {:#06x}", "field_2a", self.field_2a);
        let _ = write!(out, "  {:<18}: {:#010x}", "kernel_offset", self.kernel_offset);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sig_displacement_recovers_negative_offset() {
        let footer = BootloaderFooter::new(0x840, 0xFFC0);
        assert_eq!(footer.sig_displacement(), 0x40);

        let footer = BootloaderFooter::new(0x840, 0xFBC0);
        assert_eq!(footer.sig_displacement(), 0x440);
    }

    #[test]
    fn zero_sig_offset_means_zero_displacement() {
        let footer = BootloaderFooter::new(0, 0);
        assert_eq!(footer.sig_displacement(), 0);
    }

    #[test]
    fn encode_sig_offset_is_inverse_of_displacement() {
        for displacement in [0x40, 0x440, 0x1000, 0xFFFF] {
            let footer = BootloaderFooter::new(0, BootloaderFooter::encode_sig_offset(displacement));
            assert_eq!(footer.sig_displacement(), displacement);
        }
    }

    #[test]
    fn fields_land_at_documented_offsets() {
        let mut buf = [0u8; FOOTER_SIZE];
        BootloaderFooter::new(0x0000_0840, 0xFFC0)
            .write_to(&mut buf)
            .unwrap();
        assert_eq!(&buf[0x28..0x2A], &[0xC0, 0xFF]);
        assert_eq!(&buf[0x2C..0x30], &[0x40, 0x08, 0x00, 0x00]);

        let parsed = BootloaderFooter::read_from(&buf).unwrap();
        assert_eq!(parsed.kernel_offset, 0x840);
        assert_eq!(parsed.sig_offset, 0xFFC0);
    }

    #[test]
    fn reject_short_buffer() {
        let result = BootloaderFooter::read_from(&[0u8; 0x3F]);
        assert!(matches!(
            result,
            Err(WireError::UnexpectedEof {
                kind: RecordKind::BootloaderFooter,
                ..
            })
        ));
    }
}
