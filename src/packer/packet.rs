//! Packets handed to the transport

use bytes::Bytes;

/// Discriminator for packets produced by the packer.
///
/// The sender uses this to order and prioritize writes: configuration
/// packets must reach the peer before any media, and a dropped keyframe is
/// worth more than a dropped inter frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// AAC sequence header (AudioSpecificConfig).
    FirstAudio = 1,
    /// AVC/HEVC sequence header (decoder configuration record).
    FirstVideo = 2,
    /// Out-of-band SPS/PPS, reserved for senders with a dedicated
    /// parameter path. The packer folds parameter sets into `FirstVideo`
    /// and never emits this itself.
    SpsPps = 3,
    /// Raw AAC frame.
    Audio = 4,
    /// Keyframe access unit.
    KeyFrame = 5,
    /// Non-keyframe access unit.
    Video = 6,
}

impl PacketType {
    /// True for the one-shot configuration packets emitted at stream start.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PacketType::FirstAudio | PacketType::FirstVideo | PacketType::SpsPps
        )
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            PacketType::FirstVideo | PacketType::KeyFrame | PacketType::Video
        )
    }
}

/// One fully serialized FLV tag-data payload.
#[derive(Debug, Clone)]
pub struct Packet {
    /// What the payload contains.
    pub packet_type: PacketType,
    /// Presentation timestamp in milliseconds.
    pub timestamp_ms: u32,
    /// Serialized tag data, ready for the transport.
    pub data: Bytes,
}

impl Packet {
    pub fn new(packet_type: PacketType, timestamp_ms: u32, data: Bytes) -> Self {
        Self {
            packet_type,
            timestamp_ms,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_packet_types() {
        assert!(PacketType::FirstAudio.is_config());
        assert!(PacketType::FirstVideo.is_config());
        assert!(PacketType::SpsPps.is_config());
        assert!(!PacketType::Audio.is_config());
        assert!(!PacketType::KeyFrame.is_config());
        assert!(!PacketType::Video.is_config());
    }

    #[test]
    fn test_video_packet_types() {
        assert!(PacketType::FirstVideo.is_video());
        assert!(PacketType::KeyFrame.is_video());
        assert!(PacketType::Video.is_video());
        assert!(!PacketType::Audio.is_video());
        assert!(!PacketType::FirstAudio.is_video());
    }
}
