#![warn(clippy::pedantic)]

pub mod config;
pub mod container;
pub mod cursor;
pub mod decoder;
pub mod decompression;
pub mod error;
pub mod offset_map;

pub use config::{BoundsPolicy, DEFAULT_MAX_IMAGE_SIZE, DecoderConfig};
pub use container::{Artifact, Bootloader, DecodedContainer, Image, ImageName, SignParams, TargetEntry};
pub use cursor::Section;
pub use decoder::ContainerDecoder;
pub use decompression::{Decompressor, Lzss};
pub use error::{DecodeError, DecompressError};
pub use offset_map::OffsetMap;
