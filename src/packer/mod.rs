//! Packetization
//!
//! The access-unit demuxer splits encoder output into parameter sets and
//! AVCC payloads; the RTMP packer drives it and owns the session state
//! machine that orders configuration, keyframe and media packets.

pub mod demux;
pub mod packet;
pub mod rtmp;

pub use demux::{AccessUnitDemuxer, DemuxOutput, ParameterSets, VideoFrame};
pub use packet::{Packet, PacketType};
pub use rtmp::RtmpPacker;
