//! AAC AudioSpecificConfig
//!
//! RTMP transports AAC in raw frames; decoder initialization happens
//! out-of-band through a two-byte AudioSpecificConfig carried in the AAC
//! sequence header:
//!
//! ```text
//! +------------------+--------------------------+----------------------+
//! | audioObjectType  | samplingFrequencyIndex   | channelConfiguration |
//! | (5 bits)         | (4 bits)                 | (4 bits)             |
//! +------------------+--------------------------+----------------------+
//! ```
//!
//! The packer builds the config from cached stream parameters and parses
//! it back out of the encoder's codec-specific data when the output format
//! changes.

use crate::error::{MediaError, Result};

/// AAC-LC audio object type, the profile hardware encoders produce.
const OBJECT_TYPE_AAC_LC: u8 = 2;

/// Standard sampling frequencies by index.
const SAMPLING_FREQUENCIES: [u32; 16] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350, 0, 0,
    0,
];

/// Sampling frequency index for a rate in Hz; 15 (escape value) when the
/// rate is not one of the standard frequencies.
pub fn sample_rate_index(sample_rate: u32) -> u8 {
    SAMPLING_FREQUENCIES
        .iter()
        .position(|&f| f != 0 && f == sample_rate)
        .map(|i| i as u8)
        .unwrap_or(15)
}

/// Parsed or constructed AudioSpecificConfig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// Audio object type (profile); 2 = AAC-LC.
    pub audio_object_type: u8,
    /// Sampling frequency index.
    pub sampling_frequency_index: u8,
    /// Sampling frequency in Hz.
    pub sampling_frequency: u32,
    /// Channel configuration (1 = mono, 2 = stereo, ...).
    pub channel_configuration: u8,
}

impl AudioSpecificConfig {
    /// Config for an AAC-LC stream with the given rate and channel count.
    pub fn new(sample_rate: u32, channels: u8) -> Self {
        Self {
            audio_object_type: OBJECT_TYPE_AAC_LC,
            sampling_frequency_index: sample_rate_index(sample_rate),
            sampling_frequency: sample_rate,
            channel_configuration: channels,
        }
    }

    /// Parse the fixed fields from codec-specific data.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(MediaError::InvalidAacConfig);
        }

        let b0 = data[0];
        let b1 = data[1];

        let audio_object_type = (b0 >> 3) & 0x1F;
        let sampling_frequency_index = ((b0 & 0x07) << 1) | ((b1 >> 7) & 0x01);

        let sampling_frequency = if sampling_frequency_index == 0x0F {
            // Explicit frequency in the next 24 bits
            if data.len() < 5 {
                return Err(MediaError::InvalidAacConfig);
            }
            let f0 = (data[1] & 0x7F) as u32;
            let f1 = data[2] as u32;
            let f2 = data[3] as u32;
            let f3 = (data[4] >> 1) as u32;
            (f0 << 17) | (f1 << 9) | (f2 << 1) | f3
        } else {
            SAMPLING_FREQUENCIES[sampling_frequency_index as usize]
        };

        let channel_configuration = (b1 >> 3) & 0x0F;

        Ok(Self {
            audio_object_type,
            sampling_frequency_index,
            sampling_frequency,
            channel_configuration,
        })
    }

    /// Serialize the two fixed bytes.
    pub fn encode(&self) -> [u8; 2] {
        [
            (self.audio_object_type << 3) | ((self.sampling_frequency_index >> 1) & 0x07),
            ((self.sampling_frequency_index & 0x01) << 7) | ((self.channel_configuration & 0x0F) << 3),
        ]
    }

    /// Channel count described by the configuration.
    pub fn channels(&self) -> u8 {
        match self.channel_configuration {
            0 => 0, // defined in stream
            c @ 1..=6 => c,
            7 => 8,
            _ => 0,
        }
    }
}
