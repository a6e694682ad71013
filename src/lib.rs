//! RTMP/FLV packetization for live streaming.
//!
//! This crate sits between a hardware video/audio encoder and an RTMP
//! transport. It consumes raw Annex-B access units and encoded AAC frames,
//! demuxes and classifies NAL units for H.264 and H.265, and re-packages
//! everything into FLV tag framing with the startup ordering RTMP
//! consumers require: decoder configuration records first, then a
//! keyframe, then steady-state interleaved media.
//!
//! ```text
//! encoder output ──> RtmpPacker ──> AccessUnitDemuxer ──> NalUnits
//!                        │                                  │
//!                        │ <── parameters / AVCC payload ───┘
//!                        v
//!                ordered Packets ──> sender (out of scope)
//! ```
//!
//! # Example
//!
//! ```
//! use rtmp_packer::{PacketType, RtmpPacker, VideoCodec};
//!
//! let mut packer = RtmpPacker::new(VideoCodec::H264);
//! packer.start();
//!
//! // One encoder buffer holding [SPS][PPS][IDR slice]
//! let access_unit = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x64, 0x00, 0x1F, // SPS
//!     0x00, 0x00, 0x00, 0x01, 0x68, 0xEF, 0x38, // PPS
//!     0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, // IDR
//! ];
//! let packets = packer.on_video_data(&access_unit, 0);
//!
//! let types: Vec<_> = packets.iter().map(|p| p.packet_type).collect();
//! assert_eq!(
//!     types,
//!     [PacketType::FirstVideo, PacketType::FirstAudio, PacketType::KeyFrame]
//! );
//! ```
//!
//! # Threading
//!
//! Nothing here suspends, blocks or spawns; every call is synchronous CPU
//! work on the caller's thread. A packer instance is single-threaded by
//! construction (`&mut self` everywhere) — when audio and video encoders
//! drain on separate threads, share it behind one lock.

pub mod amf;
pub mod config;
pub mod error;
pub mod media;
pub mod packer;

pub use config::{AudioParams, VideoCodec};
pub use error::{MediaError, Result};
pub use packer::{Packet, PacketType, RtmpPacker};
