//! H.264/AVC NAL unit classification
//!
//! The NAL unit type lives in the low five bits of the first byte of every
//! NAL unit:
//!
//! ```text
//! +---------------+-----------------+-------------------+
//! | forbidden (1) | nal_ref_idc (2) | nal_unit_type (5) |
//! +---------------+-----------------+-------------------+
//! ```
//!
//! The packer only routes on a handful of types: parameter sets are cached
//! and stripped, access unit delimiters are dropped, IDR slices mark the
//! access unit as a keyframe. Everything else flows through as payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{MediaError, Result};

/// NAL unit type, derived from the low five bits of the NAL header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    /// Non-IDR slice (P/B frame), type 1.
    NonIdrSlice,
    /// IDR slice (keyframe), type 5.
    IdrSlice,
    /// Sequence parameter set, type 7.
    Sps,
    /// Picture parameter set, type 8.
    Pps,
    /// Access unit delimiter, type 9.
    Aud,
    /// Any other type.
    Other,
}

impl NaluType {
    /// Classify a NAL unit from its header byte.
    pub fn from_byte(b: u8) -> Self {
        match b & 0x1F {
            1 => NaluType::NonIdrSlice,
            5 => NaluType::IdrSlice,
            7 => NaluType::Sps,
            8 => NaluType::Pps,
            9 => NaluType::Aud,
            _ => NaluType::Other,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, NaluType::IdrSlice)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, NaluType::Sps | NaluType::Pps)
    }
}

/// Build an AVCDecoderConfigurationRecord embedding one SPS and one PPS.
///
/// Layout (ISO/IEC 14496-15):
/// ```text
/// configurationVersion (1) | AVCProfileIndication (1) | profile_compatibility (1)
/// | AVCLevelIndication (1) | lengthSizeMinusOne (1)
/// | numOfSPS (1) | spsLength (2) | spsNALUnit
/// | numOfPPS (1) | ppsLength (2) | ppsNALUnit
/// ```
///
/// Profile, compatibility and level bytes are lifted straight out of the
/// SPS, so the SPS must carry at least its header plus those three bytes.
pub fn build_avc_decoder_config(sps: &[u8], pps: &[u8]) -> Result<Bytes> {
    if sps.len() < 4 {
        return Err(MediaError::InvalidAvcSps);
    }

    let mut buf = BytesMut::with_capacity(11 + sps.len() + pps.len());

    buf.put_u8(0x01); // configurationVersion
    buf.put_u8(sps[1]); // AVCProfileIndication
    buf.put_u8(sps[2]); // profile_compatibility
    buf.put_u8(sps[3]); // AVCLevelIndication
    buf.put_u8(0xFF); // lengthSizeMinusOne = 3 (4-byte lengths)

    buf.put_u8(0xE1); // 1 SPS
    buf.put_u16(sps.len() as u16);
    buf.put_slice(sps);

    buf.put_u8(0x01); // 1 PPS
    buf.put_u16(pps.len() as u16);
    buf.put_slice(pps);

    Ok(buf.freeze())
}
