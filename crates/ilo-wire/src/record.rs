use std::fmt;

use crate::error::WireError;
use crate::footer::{BootloaderFooter, FOOTER_SIZE};
use crate::header::{HEADER_SIZE, SignedHeader};
use crate::sign_params::SignatureParams;

/// The kinds of record found in a firmware container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    BootloaderHeader,
    BootloaderFooter,
    ImageHeader,
    SignatureParams,
}

impl RecordKind {
    /// Size of the record on the wire, or `None` for variable-length kinds.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Self::BootloaderHeader | Self::ImageHeader => Some(HEADER_SIZE),
            Self::BootloaderFooter => Some(FOOTER_SIZE),
            Self::SignatureParams => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BootloaderHeader => "bootloader header",
            Self::BootloaderFooter => "bootloader footer",
            Self::ImageHeader => "image header",
            Self::SignatureParams => "signature parameters",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded record, tagged with its kind.
///
/// This is the single entry point through which the container decoder
/// interprets raw bytes: every length check on a record happens in
/// [`Record::decode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    BootloaderHeader(SignedHeader),
    BootloaderFooter(BootloaderFooter),
    ImageHeader(SignedHeader),
    SignatureParams(SignatureParams),
}

impl Record {
    /// Decode a record of `kind` from the start of `buf`.
    ///
    /// Fixed-size kinds read exactly their size and ignore any trailing
    /// bytes. Signature parameters consume the whole buffer.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than the
    /// record's fixed size.
    pub fn decode(kind: RecordKind, buf: &[u8]) -> Result<Self, WireError> {
        Ok(match kind {
            RecordKind::BootloaderHeader => Self::BootloaderHeader(SignedHeader::read_from(buf, kind)?),
            RecordKind::ImageHeader => Self::ImageHeader(SignedHeader::read_from(buf, kind)?),
            RecordKind::BootloaderFooter => Self::BootloaderFooter(BootloaderFooter::read_from(buf)?),
            RecordKind::SignatureParams => Self::SignatureParams(SignatureParams::read_from(buf)),
        })
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::BootloaderHeader(_) => RecordKind::BootloaderHeader,
            Self::BootloaderFooter(_) => RecordKind::BootloaderFooter,
            Self::ImageHeader(_) => RecordKind::ImageHeader,
            Self::SignatureParams(_) => RecordKind::SignatureParams,
        }
    }

    /// Render the record as multi-line text, one field per line.
    ///
    /// ```text
    /// image header
    ///   magic             : iLO4
    ///   build_version     : 2.55
    ///   ...
    ///   raw_size          : 0x00012440
    /// ```
    pub fn render_text(&self) -> String {
        match self {
            Self::BootloaderHeader(h) => h.render("bootloader header", "total_size"),
            Self::ImageHeader(h) => h.render("image header", "raw_size"),
            Self::BootloaderFooter(f) => f.render(),
            Self::SignatureParams(p) => p.render(),
        }
    }

    /// The signed header, for the two header kinds.
    pub fn as_header(&self) -> Option<&SignedHeader> {
        match self {
            Self::BootloaderHeader(h) | Self::ImageHeader(h) => Some(h),
            _ => None,
        }
    }
}
