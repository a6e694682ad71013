//! Media-format primitives
//!
//! This module provides:
//! - Annex-B byte-stream scanning
//! - H.264/AVC and H.265/HEVC NAL unit classification
//! - AVC/HEVC decoder configuration records
//! - AAC AudioSpecificConfig handling
//! - FLV tag serialization

pub mod aac;
pub mod annexb;
pub mod flv;
pub mod h264;
pub mod h265;

pub use aac::AudioSpecificConfig;
pub use annexb::NalUnits;
pub use flv::{FlvTagType, StreamMetadata};
pub use h264::NaluType;
pub use h265::{HevcDecoderConfig, HevcNaluType};
