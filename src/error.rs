//! Error types
//!
//! Malformed encoder output is a drop-and-log policy inside the packer, not
//! an error surfaced to callers. The variants here cover the fallible codec
//! configuration parsers and builders, which callers may invoke directly.

use thiserror::Error;

/// Errors from parsing or building codec configuration structures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MediaError {
    /// AAC AudioSpecificConfig shorter than its fixed fields.
    #[error("invalid AAC audio specific config")]
    InvalidAacConfig,

    /// H.264 SPS shorter than the profile/level bytes the
    /// AVCDecoderConfigurationRecord borrows from it.
    #[error("invalid AVC sequence parameter set")]
    InvalidAvcSps,
}

pub type Result<T> = std::result::Result<T, MediaError>;
