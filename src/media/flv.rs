//! FLV tag serialization
//!
//! FLV (Flash Video) is the container format used by RTMP for audio/video
//! data. Each RTMP audio/video message is an FLV tag without the tag
//! header, so the packer emits bare tag data; the file-level header and
//! tag-header writers are here for callers muxing to an FLV file.
//!
//! Video tag data:
//! ```text
//! +----------+----------+------------+-----------------+
//! | FrameType| CodecID  | PacketType | CompositionTime | Data
//! | (4 bits) | (4 bits) | (1 byte)   | (3 bytes)       |
//! +----------+----------+------------+-----------------+
//! ```
//!
//! Audio tag data:
//! ```text
//! +-----------+----------+----------+----------+---------------+
//! |SoundFormat|SoundRate |SoundSize |SoundType | AACPacketType | Data
//! | (4 bits)  | (2 bits) | (1 bit)  | (1 bit)  | (1 byte)      |
//! +-----------+----------+----------+----------+---------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::amf::{Amf0Writer, AmfValue};
use crate::config::{AudioParams, VideoCodec};
use crate::error::Result;
use crate::media::aac::AudioSpecificConfig;
use crate::media::{h264, h265};

/// Size of the FLV file header.
pub const FLV_HEADER_SIZE: usize = 9;
/// Size of one FLV tag header.
pub const TAG_HEADER_SIZE: usize = 11;
/// Size of the previous-tag-size trailer after each tag.
pub const PREVIOUS_TAG_SIZE: usize = 4;
/// Size of the video tag data header.
pub const VIDEO_HEADER_SIZE: usize = 5;
/// Size of the audio tag data header.
pub const AUDIO_HEADER_SIZE: usize = 2;

/// FLV tag type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlvTagType {
    Audio = 8,
    Video = 9,
    Script = 18,
}

// Video frame types (upper nibble of the first video byte).
const FRAME_TYPE_KEY: u8 = 1;
const FRAME_TYPE_INTER: u8 = 2;

// Video codec ids (lower nibble of the first video byte).
const CODEC_ID_AVC: u8 = 7;
const CODEC_ID_HEVC: u8 = 12;

// AVC/HEVC packet types.
const VIDEO_PACKET_SEQUENCE_HEADER: u8 = 0;
const VIDEO_PACKET_NALU: u8 = 1;

// Audio header fields: AAC, 44 kHz rate signal, stereo flag.
const SOUND_FORMAT_AAC: u8 = 10;
const SOUND_RATE_44K: u8 = 3;
const SOUND_TYPE_STEREO: u8 = 1;

// AAC packet types.
const AAC_PACKET_SEQUENCE_HEADER: u8 = 0;
const AAC_PACKET_RAW: u8 = 1;

fn codec_id(codec: VideoCodec) -> u8 {
    match codec {
        VideoCodec::H264 => CODEC_ID_AVC,
        VideoCodec::H265 => CODEC_ID_HEVC,
    }
}

/// Write the FLV file header (signature, version, track flags, offset).
pub fn write_flv_header(buf: &mut BytesMut, has_video: bool, has_audio: bool) {
    buf.put_slice(b"FLV");
    buf.put_u8(0x01);
    let mut flags = 0u8;
    if has_video {
        flags |= 0x01;
    }
    if has_audio {
        flags |= 0x04;
    }
    buf.put_u8(flags);
    buf.put_u32(FLV_HEADER_SIZE as u32);
}

/// Write one FLV tag header.
///
/// ```text
/// TagType (1) | DataSize (3) | Timestamp (3) | TimestampExt (1) | StreamID (3)
/// ```
pub fn write_tag_header(buf: &mut BytesMut, tag_type: FlvTagType, data_size: u32, timestamp: u32) {
    buf.put_u8(tag_type as u8);
    put_u24(buf, data_size);
    put_u24(buf, timestamp & 0x00FF_FFFF);
    buf.put_u8((timestamp >> 24) as u8);
    put_u24(buf, 0); // stream id
}

/// Write the 5-byte video tag data header.
fn write_video_header(buf: &mut BytesMut, keyframe: bool, codec: VideoCodec, packet_type: u8) {
    let frame_type = if keyframe {
        FRAME_TYPE_KEY
    } else {
        FRAME_TYPE_INTER
    };
    buf.put_u8((frame_type << 4) | (codec_id(codec) & 0x0F));
    buf.put_u8(packet_type);
    put_u24(buf, 0); // composition time
}

/// Write the 2-byte audio tag data header.
fn write_audio_header(buf: &mut BytesMut, sequence_header: bool, sample_size: u8) {
    let sound_size = if sample_size == 8 { 0 } else { 1 };
    buf.put_u8(
        (SOUND_FORMAT_AAC << 4) | (SOUND_RATE_44K << 2) | (sound_size << 1) | SOUND_TYPE_STEREO,
    );
    buf.put_u8(if sequence_header {
        AAC_PACKET_SEQUENCE_HEADER
    } else {
        AAC_PACKET_RAW
    });
}

/// Build the AVC sequence header tag data: video header plus
/// AVCDecoderConfigurationRecord.
pub fn build_avc_sequence_tag(sps: &[u8], pps: &[u8]) -> Result<Bytes> {
    let record = h264::build_avc_decoder_config(sps, pps)?;
    let mut buf = BytesMut::with_capacity(VIDEO_HEADER_SIZE + record.len());
    write_video_header(&mut buf, true, VideoCodec::H264, VIDEO_PACKET_SEQUENCE_HEADER);
    buf.put_slice(&record);
    Ok(buf.freeze())
}

/// Build the HEVC sequence header tag data: video header plus
/// HEVCDecoderConfigurationRecord.
pub fn build_hevc_sequence_tag(vps: &[u8], sps: &[u8], pps: &[u8]) -> Bytes {
    let record = h265::build_hevc_decoder_config(vps, sps, pps);
    let mut buf = BytesMut::with_capacity(VIDEO_HEADER_SIZE + record.len());
    write_video_header(&mut buf, true, VideoCodec::H265, VIDEO_PACKET_SEQUENCE_HEADER);
    buf.put_slice(&record);
    buf.freeze()
}

/// Build a video tag data payload around length-prefixed NAL units.
pub fn build_video_tag(codec: VideoCodec, data: &[u8], keyframe: bool) -> Bytes {
    let mut buf = BytesMut::with_capacity(VIDEO_HEADER_SIZE + data.len());
    write_video_header(&mut buf, keyframe, codec, VIDEO_PACKET_NALU);
    buf.put_slice(data);
    buf.freeze()
}

/// Build the AAC sequence header tag data from cached audio parameters.
pub fn build_audio_config_tag(params: &AudioParams) -> Bytes {
    let config = AudioSpecificConfig::new(params.sample_rate, params.channels());
    let mut buf = BytesMut::with_capacity(AUDIO_HEADER_SIZE + 2);
    write_audio_header(&mut buf, true, params.sample_size);
    buf.put_slice(&config.encode());
    buf.freeze()
}

/// Build an audio tag data payload around one raw AAC frame.
pub fn build_audio_tag(data: &[u8], sample_size: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(AUDIO_HEADER_SIZE + data.len());
    write_audio_header(&mut buf, false, sample_size);
    buf.put_slice(data);
    buf.freeze()
}

/// Properties advertised in the `onMetaData` script tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub video_codec: VideoCodec,
    pub audio_sample_rate: u32,
    pub audio_sample_size: u8,
    pub stereo: bool,
}

impl StreamMetadata {
    /// Serialize as AMF0 script data: the `onMetaData` marker string
    /// followed by an ECMA array of properties.
    pub fn encode(&self) -> Bytes {
        let mut writer = Amf0Writer::new();
        writer.write_string("onMetaData");
        writer.write_ecma_array(&[
            ("width", AmfValue::Number(self.width as f64)),
            ("height", AmfValue::Number(self.height as f64)),
            ("framerate", AmfValue::Number(self.framerate as f64)),
            (
                "videocodecid",
                AmfValue::Number(codec_id(self.video_codec) as f64),
            ),
            (
                "audiosamplerate",
                AmfValue::Number(self.audio_sample_rate as f64),
            ),
            (
                "audiosamplesize",
                AmfValue::Number(self.audio_sample_size as f64),
            ),
            ("stereo", AmfValue::Boolean(self.stereo)),
            ("audiocodecid", AmfValue::Number(SOUND_FORMAT_AAC as f64)),
        ]);
        writer.finish()
    }
}

fn put_u24(buf: &mut BytesMut, value: u32) {
    buf.put_u8((value >> 16) as u8);
    buf.put_u8((value >> 8) as u8);
    buf.put_u8(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flv_header() {
        let mut buf = BytesMut::new();
        write_flv_header(&mut buf, true, true);
        assert_eq!(
            &buf[..],
            &[0x46, 0x4C, 0x56, 0x01, 0x05, 0x00, 0x00, 0x00, 0x09]
        );

        let mut video_only = BytesMut::new();
        write_flv_header(&mut video_only, true, false);
        assert_eq!(video_only[4], 0x01);
    }

    #[test]
    fn test_tag_header() {
        let mut buf = BytesMut::new();
        write_tag_header(&mut buf, FlvTagType::Video, 0x000102, 0x03040506);
        assert_eq!(buf.len(), TAG_HEADER_SIZE);
        assert_eq!(buf[0], 0x09);
        assert_eq!(&buf[1..4], &[0x00, 0x01, 0x02]); // data size
        assert_eq!(&buf[4..7], &[0x04, 0x05, 0x06]); // timestamp low
        assert_eq!(buf[7], 0x03); // timestamp extended
        assert_eq!(&buf[8..11], &[0x00, 0x00, 0x00]); // stream id
    }

    #[test]
    fn test_avc_sequence_tag() {
        let sps = [0x67, 0x64, 0x00, 0x1F];
        let pps = [0x68, 0xEF, 0x38];
        let tag = build_avc_sequence_tag(&sps, &pps).unwrap();

        assert_eq!(tag[0], 0x17); // keyframe + AVC
        assert_eq!(tag[1], 0x00); // sequence header
        assert_eq!(&tag[2..5], &[0x00, 0x00, 0x00]); // composition time
        assert_eq!(tag[5], 0x01); // record version
        assert_eq!(tag.len(), VIDEO_HEADER_SIZE + 11 + sps.len() + pps.len());
    }

    #[test]
    fn test_hevc_sequence_tag() {
        let vps = [0x40, 0x01, 0x0C];
        let sps = [0x42, 0x01, 0x01];
        let pps = [0x44, 0x01, 0xC0];
        let tag = build_hevc_sequence_tag(&vps, &sps, &pps);

        assert_eq!(tag[0], 0x1C); // keyframe + HEVC
        assert_eq!(tag[1], 0x00); // sequence header
        assert_eq!(tag[5], 0x01); // record version
        assert_eq!(tag.len(), VIDEO_HEADER_SIZE + 38 + vps.len() + sps.len() + pps.len());
    }

    #[test]
    fn test_video_tag_keyframe() {
        let data = [0x00, 0x00, 0x00, 0x02, 0x65, 0x88];
        let tag = build_video_tag(VideoCodec::H264, &data, true);
        assert_eq!(tag[0], 0x17);
        assert_eq!(tag[1], 0x01); // NALU
        assert_eq!(&tag[2..5], &[0x00, 0x00, 0x00]);
        assert_eq!(&tag[5..], &data);
    }

    #[test]
    fn test_video_tag_inter_frame() {
        let tag = build_video_tag(VideoCodec::H264, &[0x41], false);
        assert_eq!(tag[0], 0x27);
    }

    #[test]
    fn test_video_tag_hevc() {
        let key = build_video_tag(VideoCodec::H265, &[0x26], true);
        assert_eq!(key[0], 0x1C);
        let inter = build_video_tag(VideoCodec::H265, &[0x02], false);
        assert_eq!(inter[0], 0x2C);
    }

    #[test]
    fn test_audio_config_tag() {
        let params = AudioParams {
            sample_rate: 44_100,
            sample_size: 16,
            stereo: true,
        };
        let tag = build_audio_config_tag(&params);
        assert_eq!(&tag[..], &[0xAF, 0x00, 0x12, 0x10]);
    }

    #[test]
    fn test_audio_config_tag_mono_default() {
        let tag = build_audio_config_tag(&AudioParams::default());
        // Header byte is fixed; the channel count only lands in the config
        assert_eq!(tag[0], 0xAF);
        assert_eq!(tag[1], 0x00);
        assert_eq!(&tag[2..], &[0x12, 0x08]);
    }

    #[test]
    fn test_audio_tag() {
        let frame = [0x21, 0x00, 0x49];
        let tag = build_audio_tag(&frame, 16);
        assert_eq!(tag[0], 0xAF);
        assert_eq!(tag[1], 0x01); // raw frame
        assert_eq!(&tag[2..], &frame);
    }

    #[test]
    fn test_audio_tag_8bit_samples() {
        let tag = build_audio_tag(&[0x21], 8);
        assert_eq!(tag[0], 0xAD); // sound size bit cleared
    }

    #[test]
    fn test_metadata_encoding() {
        let meta = StreamMetadata {
            width: 1280,
            height: 720,
            framerate: 30,
            video_codec: VideoCodec::H264,
            audio_sample_rate: 44_100,
            audio_sample_size: 16,
            stereo: true,
        };
        let data = meta.encode();

        // "onMetaData" string value
        assert_eq!(data[0], 0x02);
        assert_eq!(&data[1..3], &[0x00, 0x0A]);
        assert_eq!(&data[3..13], b"onMetaData");
        // ECMA array with 8 properties
        assert_eq!(data[13], 0x08);
        assert_eq!(&data[14..18], &[0x00, 0x00, 0x00, 0x08]);
        // First property: width = 1280
        assert_eq!(&data[18..20], &[0x00, 0x05]);
        assert_eq!(&data[20..25], b"width");
        assert_eq!(data[25], 0x00); // number marker
        assert_eq!(f64::from_be_bytes(data[26..34].try_into().unwrap()), 1280.0);
        // Object end marker
        assert_eq!(&data[data.len() - 3..], &[0x00, 0x00, 0x09]);
    }
}
