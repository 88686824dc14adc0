use ilo_wire::TargetTable;

/// Default ceiling on the decompressed size of a single image: 64 MiB.
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 64 * 1024 * 1024;

/// Configuration for the container decoder.
///
/// ```text
/// ┌────────────────┬──────────────────────────────────────────────────┐
/// │ Field          │ Purpose                                          │
/// ├────────────────┼──────────────────────────────────────────────────┤
/// │ bounds         │ Reject or clamp sizes that point outside the data│
/// │ max_image_size │ Upper bound on one decompressed image            │
/// │ targets        │ Target ids the decoder accepts, with their names │
/// └────────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    pub bounds: BoundsPolicy,
    pub max_image_size: usize,
    pub targets: TargetTable,
}

impl Default for DecoderConfig {
    /// Strict bounds, 64 MiB per image, built-in targets only.
    fn default() -> Self {
        Self {
            bounds: BoundsPolicy::default(),
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            targets: TargetTable::default(),
        }
    }
}

/// How the decoder treats a `total_size`, `kernel_offset` or `sig_offset`
/// that reaches outside the buffer it describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Fail with [`DecodeError::CorruptContainer`](crate::DecodeError::CorruptContainer)
    /// or [`DecodeError::TruncatedInput`](crate::DecodeError::TruncatedInput).
    #[default]
    Strict,
    /// Clamp the range to the buffer, producing an empty region when
    /// nothing is left.
    Permissive,
}
