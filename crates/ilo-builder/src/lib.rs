#![warn(clippy::pedantic)]

pub mod builder;
pub mod compression;
pub mod error;

pub use builder::{BuiltFirmware, BuiltImage, FirmwareBuilder, ILO4_TARGET, SIGN_PARAMS_SLOT};
pub use error::BuildError;
