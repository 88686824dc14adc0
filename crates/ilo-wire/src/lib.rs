#![warn(clippy::pedantic)]

pub mod error;
pub mod footer;
pub mod header;
pub mod record;
pub mod sign_params;
pub mod target;

mod le;

pub use error::WireError;
pub use footer::{BootloaderFooter, FOOTER_SIZE};
pub use header::{HEADER_SIZE, SignedHeader};
pub use record::{Record, RecordKind};
pub use sign_params::SignatureParams;
pub use target::{TARGET_ID_SIZE, TargetId, TargetTable};
