//! Access-unit demuxing
//!
//! Turns one encoder output buffer (an Annex-B access unit) into at most
//! two events: a one-shot "parameters ready" event once every parameter
//! set the codec family needs has been seen, and a video payload holding
//! the access unit's remaining NAL units re-framed with 4-byte big-endian
//! length prefixes (AVCC), tagged with its keyframe status.
//!
//! Parameter sets and access unit delimiters never appear in the payload;
//! the sets are copied into an internal cache so the sequence header can
//! be built from them long after the encoder buffer was recycled.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::config::VideoCodec;
use crate::media::annexb::NalUnits;
use crate::media::h264::NaluType;
use crate::media::h265::HevcNaluType;

/// Parameter sets collected from the bitstream, one variant per codec
/// family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSets {
    H264 { sps: Bytes, pps: Bytes },
    H265 { vps: Bytes, sps: Bytes, pps: Bytes },
}

/// One demuxed access unit in AVCC framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Concatenated length-prefixed NAL units.
    pub data: Bytes,
    /// Whether any slice in the unit is a keyframe type.
    pub keyframe: bool,
}

/// Result of feeding one encoder buffer through the demuxer.
#[derive(Debug, Clone, Default)]
pub struct DemuxOutput {
    /// Set exactly once per session, when the parameter cache completes.
    pub parameters: Option<ParameterSets>,
    /// Set when the buffer carried any payload NAL units.
    pub frame: Option<VideoFrame>,
}

#[derive(Debug, Default)]
struct H264Params {
    sps: Option<Bytes>,
    pps: Option<Bytes>,
}

#[derive(Debug, Default)]
struct H265Params {
    vps: Option<Bytes>,
    sps: Option<Bytes>,
    pps: Option<Bytes>,
}

#[derive(Debug)]
enum ParameterSetCache {
    H264(H264Params),
    H265(H265Params),
}

impl ParameterSetCache {
    fn new(codec: VideoCodec) -> Self {
        match codec {
            VideoCodec::H264 => ParameterSetCache::H264(H264Params::default()),
            VideoCodec::H265 => ParameterSetCache::H265(H265Params::default()),
        }
    }

    /// The cached sets, once every one the codec family requires is present.
    fn ready(&self) -> Option<ParameterSets> {
        match self {
            ParameterSetCache::H264(p) => match (&p.sps, &p.pps) {
                (Some(sps), Some(pps)) => Some(ParameterSets::H264 {
                    sps: sps.clone(),
                    pps: pps.clone(),
                }),
                _ => None,
            },
            ParameterSetCache::H265(p) => match (&p.vps, &p.sps, &p.pps) {
                (Some(vps), Some(sps), Some(pps)) => Some(ParameterSets::H265 {
                    vps: vps.clone(),
                    sps: sps.clone(),
                    pps: pps.clone(),
                }),
                _ => None,
            },
        }
    }

    fn reset(&mut self) {
        match self {
            ParameterSetCache::H264(p) => *p = H264Params::default(),
            ParameterSetCache::H265(p) => *p = H265Params::default(),
        }
    }
}

/// Stateful Annex-B to AVCC demuxer for one encoder session.
#[derive(Debug)]
pub struct AccessUnitDemuxer {
    codec: VideoCodec,
    cache: ParameterSetCache,
    parameters_pending: bool,
}

impl AccessUnitDemuxer {
    pub fn new(codec: VideoCodec) -> Self {
        Self {
            codec,
            cache: ParameterSetCache::new(codec),
            parameters_pending: true,
        }
    }

    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    /// Clear the parameter cache and re-arm the one-shot parameters event.
    pub fn reset(&mut self) {
        self.cache.reset();
        self.parameters_pending = true;
    }

    /// Demux one encoder output buffer.
    ///
    /// A buffer without a leading start code, or with an empty NAL unit,
    /// is dropped whole; the session stays usable.
    pub fn demux(&mut self, data: &[u8]) -> DemuxOutput {
        let mut payload = BytesMut::new();
        let mut keyframe = false;
        let mut units = 0usize;

        for nal in NalUnits::new(data) {
            let Some(&first) = nal.first() else {
                warn!("empty NAL unit in access unit, dropping buffer");
                return DemuxOutput::default();
            };
            units += 1;

            match &mut self.cache {
                ParameterSetCache::H264(params) => match NaluType::from_byte(first) {
                    NaluType::Aud => continue,
                    NaluType::Sps => {
                        params.sps = Some(Bytes::copy_from_slice(nal));
                        continue;
                    }
                    NaluType::Pps => {
                        params.pps = Some(Bytes::copy_from_slice(nal));
                        continue;
                    }
                    ty => {
                        keyframe |= ty.is_keyframe();
                    }
                },
                ParameterSetCache::H265(params) => match HevcNaluType::from_byte(first) {
                    HevcNaluType::Aud => continue,
                    HevcNaluType::Vps => {
                        params.vps = Some(Bytes::copy_from_slice(nal));
                        continue;
                    }
                    HevcNaluType::Sps => {
                        params.sps = Some(Bytes::copy_from_slice(nal));
                        continue;
                    }
                    HevcNaluType::Pps => {
                        params.pps = Some(Bytes::copy_from_slice(nal));
                        continue;
                    }
                    ty => {
                        keyframe |= ty.is_keyframe();
                    }
                },
            }

            payload.put_u32(nal.len() as u32);
            payload.put_slice(nal);
        }

        if units == 0 && !data.is_empty() {
            warn!(len = data.len(), "no start code in encoder buffer, dropping");
        }

        let parameters = if self.parameters_pending {
            let ready = self.cache.ready();
            if ready.is_some() {
                debug!(codec = ?self.codec, "parameter sets complete");
                self.parameters_pending = false;
            }
            ready
        } else {
            None
        };

        let frame = if payload.is_empty() {
            None
        } else {
            Some(VideoFrame {
                data: payload.freeze(),
                keyframe,
            })
        };

        DemuxOutput { parameters, frame }
    }
}
