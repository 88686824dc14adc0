use std::fmt::Write as _;

/// Cryptographic parameters trailing the bootloader payload.
///
/// The blob is variable length and is extracted verbatim; only its size
/// and leading word are decoded, for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureParams {
    /// Length of the blob in bytes.
    pub len: usize,
    /// First little-endian word, when the blob holds at least four bytes.
    pub key_size: Option<u32>,
}

impl SignatureParams {
    /// Decode the display fields of a signature-parameters blob.
    ///
    /// Any length is accepted, including zero.
    pub fn read_from(buf: &[u8]) -> Self {
        let key_size = buf
            .get(..4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        Self {
            len: buf.len(),
            key_size,
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "signature parameters");
        let _ = write!(out, "  {:<18}: {:#x} bytes", "length", self.len);
        if let Some(key_size) = self.key_size {
            let _ = write!(out, "\n  {:<18}: {key_size:#010x}", "key_size");
        }
        out
    }
}
