//! Stream configuration
//!
//! The packer needs two things from the surrounding system: which video
//! codec family the encoder produces, and the audio parameters advertised
//! in the AAC sequence header. Everything else about capture and encoding
//! stays outside this crate.

/// Video codec family produced by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// H.264/AVC
    H264,
    /// H.265/HEVC
    H265,
}

/// Audio parameters used when building the AAC sequence header.
///
/// Defaults match what hardware encoders are configured with when the
/// caller never reports a format: 44.1 kHz, 16-bit samples, mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParams {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Sample size in bits (8 or 16).
    pub sample_size: u8,
    /// Two channels when true, one otherwise.
    pub stereo: bool,
}

impl AudioParams {
    /// Channel count as written into the AudioSpecificConfig.
    pub fn channels(&self) -> u8 {
        if self.stereo {
            2
        } else {
            1
        }
    }
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            sample_size: 16,
            stereo: false,
        }
    }
}
