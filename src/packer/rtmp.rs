//! RTMP packetization state machine
//!
//! Consumes encoder output (Annex-B video access units and raw AAC frames)
//! and produces ordered FLV tag-data packets. The ordering guarantee a
//! downstream consumer depends on:
//!
//! 1. the decoder configuration records go out first (`FirstVideo`, then
//!    `FirstAudio`, built from the cached parameter sets),
//! 2. the first media packet after them is a `KeyFrame`,
//! 3. only then does steady-state interleaved audio/video flow.
//!
//! Anything arriving before its gate opens is dropped: media before the
//! sequence headers, inter frames before the first keyframe, and audio
//! before both. These drops are normal startup behavior, not failures.
//!
//! The packer is not internally synchronized. All entry points take
//! `&mut self`; callers feeding it from separate audio and video encoder
//! threads must share it behind one lock so that `stop()` can never
//! interleave with an in-flight call.

use tracing::{debug, trace, warn};

use crate::config::{AudioParams, VideoCodec};
use crate::error::Result;
use crate::media::aac::AudioSpecificConfig;
use crate::media::flv;
use crate::packer::demux::{AccessUnitDemuxer, ParameterSets};
use crate::packer::packet::{Packet, PacketType};

/// Packetizer for one RTMP publishing session.
#[derive(Debug)]
pub struct RtmpPacker {
    demuxer: AccessUnitDemuxer,
    audio: AudioParams,
    started: bool,
    header_written: bool,
    keyframe_written: bool,
}

impl RtmpPacker {
    pub fn new(codec: VideoCodec) -> Self {
        Self {
            demuxer: AccessUnitDemuxer::new(codec),
            audio: AudioParams::default(),
            started: false,
            header_written: false,
            keyframe_written: false,
        }
    }

    pub fn codec(&self) -> VideoCodec {
        self.demuxer.codec()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Begin a session. Gating flags stay cleared, so the next parameter
    /// set and keyframe open the stream exactly as on a fresh instance.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// End the session: drop cached parameter sets, close both gates and
    /// stop accepting input until `start()` is called again.
    pub fn stop(&mut self) {
        self.started = false;
        self.header_written = false;
        self.keyframe_written = false;
        self.demuxer.reset();
    }

    /// Replace the cached audio parameters used for the AAC sequence
    /// header. Only effective before the headers are emitted.
    pub fn set_audio_params(&mut self, params: AudioParams) {
        self.audio = params;
    }

    /// Cache sample rate and channel count from the encoder's
    /// codec-specific data (AudioSpecificConfig).
    pub fn on_audio_format_changed(&mut self, codec_specific_data: &[u8]) {
        match AudioSpecificConfig::parse(codec_specific_data) {
            Ok(config) => {
                self.audio.sample_rate = config.sampling_frequency;
                self.audio.stereo = config.channels() >= 2;
                debug!(
                    sample_rate = config.sampling_frequency,
                    channels = config.channels(),
                    "audio format cached"
                );
            }
            Err(err) => {
                warn!(%err, "unparseable codec specific data, keeping current audio parameters");
            }
        }
    }

    /// Process one video encoder output buffer.
    ///
    /// Returns the packets produced by this buffer in emission order; an
    /// empty vector means everything was gated or the buffer was
    /// unparseable.
    pub fn on_video_data(&mut self, data: &[u8], pts_us: i64) -> Vec<Packet> {
        if !self.started {
            trace!("video data before start, dropping");
            return Vec::new();
        }

        let timestamp_ms = timestamp_ms(pts_us);
        let output = self.demuxer.demux(data);
        let mut packets = Vec::new();

        if let Some(params) = output.parameters {
            match self.sequence_header_packet(&params, timestamp_ms) {
                Ok(first_video) => {
                    packets.push(first_video);
                    packets.push(Packet::new(
                        PacketType::FirstAudio,
                        timestamp_ms,
                        flv::build_audio_config_tag(&self.audio),
                    ));
                    self.header_written = true;
                }
                Err(err) => {
                    warn!(%err, "cannot build decoder configuration record");
                }
            }
        }

        if let Some(frame) = output.frame {
            if !self.header_written {
                debug!("video frame before sequence header, dropping");
            } else {
                if frame.keyframe {
                    self.keyframe_written = true;
                }
                if !self.keyframe_written {
                    debug!("waiting for first keyframe, dropping inter frame");
                } else {
                    let packet_type = if frame.keyframe {
                        PacketType::KeyFrame
                    } else {
                        PacketType::Video
                    };
                    packets.push(Packet::new(
                        packet_type,
                        timestamp_ms,
                        flv::build_video_tag(self.codec(), &frame.data, frame.keyframe),
                    ));
                }
            }
        }

        packets
    }

    /// Process one encoded audio frame. Audio is gated on both the
    /// sequence headers and the first keyframe so it can never race ahead
    /// of the first video reference frame.
    pub fn on_audio_data(&mut self, data: &[u8], pts_us: i64) -> Option<Packet> {
        if !self.started {
            trace!("audio data before start, dropping");
            return None;
        }
        if !self.header_written || !self.keyframe_written {
            trace!("audio frame before headers and first keyframe, dropping");
            return None;
        }

        Some(Packet::new(
            PacketType::Audio,
            timestamp_ms(pts_us),
            flv::build_audio_tag(data, self.audio.sample_size),
        ))
    }

    fn sequence_header_packet(&self, params: &ParameterSets, timestamp_ms: u32) -> Result<Packet> {
        let data = match params {
            ParameterSets::H264 { sps, pps } => flv::build_avc_sequence_tag(sps, pps)?,
            ParameterSets::H265 { vps, sps, pps } => flv::build_hevc_sequence_tag(vps, sps, pps),
        };
        Ok(Packet::new(PacketType::FirstVideo, timestamp_ms, data))
    }
}

fn timestamp_ms(pts_us: i64) -> u32 {
    (pts_us.max(0) / 1000) as u32
}
