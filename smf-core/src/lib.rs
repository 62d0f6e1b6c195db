pub mod bitset;
pub mod build;
pub mod codec;
pub mod download;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod restore;
pub mod xor;

pub use error::{BuildError, CodecError, ManifestError, RestoreError};
pub use manifest::{DataBlock, DataType, EncodeType, Info, Status};
