use crate::record::RecordKind;

/// Errors raised while decoding or encoding fixed-size firmware records.
///
/// ```text
///   WireError
///   ├── UnexpectedEof       ← buffer shorter than the record layout
///   ├── InvalidTargetSpec   ← `--target` value not of the form UUID=NAME
///   └── Uuid(uuid::Error)   ← malformed UUID text in a target spec
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer ended before a complete record could be read or written.
    #[error("{kind} needs {needed:#x} bytes, only {available:#x} available")]
    UnexpectedEof {
        kind: RecordKind,
        needed: usize,
        available: usize,
    },

    /// A target table entry was not written as `UUID=NAME`.
    #[error("invalid target entry {spec:?}: expected UUID=NAME")]
    InvalidTargetSpec { spec: String },

    #[error(transparent)]
    Uuid(#[from] uuid::Error),
}
