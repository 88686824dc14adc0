use ilo_wire::{TargetId, WireError};

/// Errors that can occur while decoding a firmware container.
///
/// Every variant is terminal: the decoder stops at the first problem and
/// hands back no partial result. Each variant maps to a distinct process
/// exit status through [`code`](Self::code).
///
/// Error hierarchy:
///
/// ```text
///   DecodeError
///   ├── UnknownTarget      ← target id missing from the target table   (2)
///   ├── PaddingViolation   ← non-0xFF byte before an image header      (3)
///   ├── SizeMismatch       ← psz disagrees with raw_size or the data   (4)
///   ├── TruncatedInput     ← a fixed-size read ran past the end        (5)
///   ├── CorruptContainer   ← a size or offset points outside the data  (6)
///   ├── Decompress         ← LZSS stream could not be expanded         (7)
///   ├── DuplicateRegion    ← same offset-map key recorded twice        (8)
///   └── Wire(WireError)    ← from ilo-wire record decoding             (9)
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A target identifier in the container's target list has no entry in
    /// the configured target table.
    #[error("unknown target #{index}: {id}")]
    UnknownTarget { index: usize, id: TargetId },

    /// The gap before an image header holds a byte other than 0xFF.
    ///
    /// `region_start..region_end` is the working buffer at the time of the
    /// failure, in absolute file offsets; the CLI saves it as
    /// `failed_assert.bin`.
    #[error("padding byte {byte:#04x} at offset {offset:#x} before {image} header")]
    PaddingViolation {
        image: &'static str,
        offset: usize,
        byte: u8,
        region_start: usize,
        region_end: usize,
    },

    /// An image's length field does not agree with its header or with the
    /// bytes actually present.
    #[error("{image}: {field} is {actual:#x}, expected {expected:#x} (payload at {offset:#x})")]
    SizeMismatch {
        image: &'static str,
        field: &'static str,
        offset: usize,
        expected: usize,
        actual: usize,
    },

    /// The input ended inside a structure of known size.
    #[error("truncated {what} at offset {offset:#x}: need {needed:#x} bytes, {available:#x} left")]
    TruncatedInput {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A size or backward offset read from the container does not fit the
    /// data it describes.
    #[error("corrupt container at offset {offset:#x}: {reason}")]
    CorruptContainer { offset: usize, reason: String },

    /// An image payload failed to decompress.
    #[error("{image}: decompression failed: {source}")]
    Decompress {
        image: &'static str,
        #[source]
        source: DecompressError,
    },

    /// The same offset-map key was recorded twice.
    #[error("region {name} recorded twice")]
    DuplicateRegion { name: String },

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl DecodeError {
    /// Process exit status for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::UnknownTarget { .. } => 2,
            Self::PaddingViolation { .. } => 3,
            Self::SizeMismatch { .. } => 4,
            Self::TruncatedInput { .. } => 5,
            Self::CorruptContainer { .. } => 6,
            Self::Decompress { .. } => 7,
            Self::DuplicateRegion { .. } => 8,
            Self::Wire(_) => 9,
        }
    }
}

/// Errors raised by a [`Decompressor`](crate::Decompressor).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecompressError {
    /// The stream ended in the middle of a back-reference.
    #[error("stream ends inside a back-reference at input offset {offset:#x}")]
    Truncated { offset: usize },

    /// Output grew past the configured limit.
    #[error("output exceeds {limit:#x} bytes")]
    TooLarge { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DecodeError::UnknownTarget {
                index: 0,
                id: TargetId::from_bytes([0; 16]),
            },
            DecodeError::PaddingViolation {
                image: "elf",
                offset: 0,
                byte: 0,
                region_start: 0,
                region_end: 0,
            },
            DecodeError::SizeMismatch {
                image: "elf",
                field: "psz",
                offset: 0,
                expected: 0,
                actual: 1,
            },
            DecodeError::TruncatedInput {
                what: "footer",
                offset: 0,
                needed: 1,
                available: 0,
            },
            DecodeError::CorruptContainer {
                offset: 0,
                reason: String::new(),
            },
            DecodeError::Decompress {
                image: "elf",
                source: DecompressError::TooLarge { limit: 0 },
            },
            DecodeError::DuplicateRegion {
                name: "ELF".to_string(),
            },
        ];

        let mut codes: Vec<i32> = errors.iter().map(DecodeError::code).collect();
        codes.sort_unstable();
        assert_eq!(codes, vec![2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn messages_carry_hex_offsets() {
        let err = DecodeError::PaddingViolation {
            image: "kernel_main",
            offset: 0x1234,
            byte: 0x00,
            region_start: 0x1000,
            region_end: 0x2000,
        };
        assert_eq!(
            err.to_string(),
            "padding byte 0x00 at offset 0x1234 before kernel_main header"
        );
    }
}
