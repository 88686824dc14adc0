use crate::config::DEFAULT_MAX_IMAGE_SIZE;
use crate::error::DecompressError;

/// Size of the LZSS ring window.
pub const WINDOW_SIZE: usize = 0x1000;

/// Length added to the 4-bit length field of a back-reference.
pub const MIN_MATCH: usize = 3;

/// Expands an image payload into its uncompressed bytes.
///
/// The container decoder is generic over this trait so other payload
/// encodings can be plugged in. Implementations append to `out` and
/// return the number of bytes they produced.
pub trait Decompressor {
    /// # Errors
    ///
    /// Returns a [`DecompressError`] if the stream is malformed or its
    /// output exceeds the implementation's limit.
    fn decompress(&self, input: &[u8], out: &mut Vec<u8>) -> Result<usize, DecompressError>;
}

/// LZSS with a 4 KiB zero-filled ring window.
///
/// ```text
///   control byte ── 8 items, bit 0 first
///     bit = 1 → literal:        [byte]
///     bit = 0 → back-reference: [b0][b1]
///                 window pos = b0 | (b1 & 0xF0) << 4
///                 length     = (b1 & 0x0F) + 3
/// ```
///
/// Back-references are copied one byte at a time through the window, so a
/// reference may overlap the bytes it is producing. The stream may end at
/// any item boundary.
#[derive(Clone, Copy, Debug)]
pub struct Lzss {
    max_output: usize,
}

impl Default for Lzss {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_IMAGE_SIZE)
    }
}

impl Lzss {
    /// An LZSS decoder that refuses to produce more than `max_output`
    /// bytes.
    pub fn with_limit(max_output: usize) -> Self {
        Self { max_output }
    }

    pub fn limit(&self) -> usize {
        self.max_output
    }
}

struct Window<'o> {
    ring: [u8; WINDOW_SIZE],
    pos: usize,
    out: &'o mut Vec<u8>,
    produced: usize,
    limit: usize,
}

impl Window<'_> {
    fn emit(&mut self, byte: u8) -> Result<(), DecompressError> {
        if self.produced >= self.limit {
            return Err(DecompressError::TooLarge { limit: self.limit });
        }
        self.out.push(byte);
        self.ring[self.pos] = byte;
        self.pos = (self.pos + 1) % WINDOW_SIZE;
        self.produced += 1;
        Ok(())
    }

    fn copy(&mut self, from: usize, len: usize) -> Result<(), DecompressError> {
        for k in 0..len {
            let byte = self.ring[(from + k) % WINDOW_SIZE];
            self.emit(byte)?;
        }
        Ok(())
    }
}

impl Decompressor for Lzss {
    fn decompress(&self, input: &[u8], out: &mut Vec<u8>) -> Result<usize, DecompressError> {
        let mut window = Window {
            ring: [0; WINDOW_SIZE],
            pos: 0,
            out,
            produced: 0,
            limit: self.max_output,
        };

        let mut i = 0;
        while i < input.len() {
            let control = input[i];
            i += 1;

            for bit in 0..8 {
                let Some(&b0) = input.get(i) else {
                    break;
                };

                if control & (1 << bit) != 0 {
                    window.emit(b0)?;
                    i += 1;
                    continue;
                }

                let Some(&b1) = input.get(i + 1) else {
                    return Err(DecompressError::Truncated { offset: i });
                };
                i += 2;

                let from = usize::from(b0) | (usize::from(b1 & 0xF0) << 4);
                let len = usize::from(b1 & 0x0F) + MIN_MATCH;
                window.copy(from, len)?;
            }
        }

        Ok(window.produced)
    }
}
