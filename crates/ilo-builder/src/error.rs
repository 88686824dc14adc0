use ilo_wire::WireError;

/// Errors that can occur while assembling a firmware container.
///
/// ```text
///   BuildError
///   ├── SignParamsTooLarge ← blob does not fit before the footer
///   ├── FieldOverflow      ← a size does not fit its 32-bit field
///   └── Wire(WireError)    ← from ilo-wire record encoding
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("signature parameters ({len:#x} bytes) exceed the {limit:#x}-byte slot")]
    SignParamsTooLarge { len: usize, limit: usize },

    #[error("{field} value {value:#x} does not fit in 32 bits")]
    FieldOverflow { field: &'static str, value: usize },

    #[error(transparent)]
    Wire(#[from] WireError),
}
