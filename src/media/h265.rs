//! H.265/HEVC NAL unit classification and decoder configuration
//!
//! HEVC NAL units carry a two-byte header; the type lives in bits 1..6 of
//! the first byte:
//!
//! ```text
//! +---------------+-------------------+----------------+-----------------+
//! | forbidden (1) | nal_unit_type (6) | layer_id (6)   | temporal_id (3) |
//! +---------------+-------------------+----------------+-----------------+
//! ```
//!
//! Besides classification this module builds the
//! HEVCDecoderConfigurationRecord (ISO/IEC 14496-15) that RTMP consumers
//! expect as the video sequence header. The record's profile/tier/level
//! fields are read out of the SPS, which requires unescaping the RBSP and
//! walking the bit-packed profile_tier_level structure.

use bytes::{BufMut, Bytes, BytesMut};

/// NAL unit type, derived from bits 1..6 of the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HevcNaluType {
    /// Video parameter set, type 32.
    Vps,
    /// Sequence parameter set, type 33.
    Sps,
    /// Picture parameter set, type 34.
    Pps,
    /// Access unit delimiter, type 35.
    Aud,
    /// Intra random access point slice, types 16..=23 (BLA_W_LP through
    /// RSV_IRAP_VCL23). The HEVC keyframe equivalent.
    IrapSlice,
    /// Any other type.
    Other,
}

impl HevcNaluType {
    /// Classify a NAL unit from its first header byte.
    pub fn from_byte(b: u8) -> Self {
        match (b & 0x7E) >> 1 {
            32 => HevcNaluType::Vps,
            33 => HevcNaluType::Sps,
            34 => HevcNaluType::Pps,
            35 => HevcNaluType::Aud,
            16..=23 => HevcNaluType::IrapSlice,
            _ => HevcNaluType::Other,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, HevcNaluType::IrapSlice)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(
            self,
            HevcNaluType::Vps | HevcNaluType::Sps | HevcNaluType::Pps
        )
    }
}

// NAL unit types embedded in the record's parameter set arrays.
const NAL_TYPE_VPS: u8 = 32;
const NAL_TYPE_SPS: u8 = 33;
const NAL_TYPE_PPS: u8 = 34;

/// Fields of the HEVCDecoderConfigurationRecord.
///
/// Defaults are the conservative Main-profile values used when the SPS
/// cannot be parsed: a decoder initialized with them will still lock onto
/// the in-band parameter sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcDecoderConfig {
    pub general_profile_space: u8,
    pub general_tier_flag: u8,
    pub general_profile_idc: u8,
    pub general_profile_compatibility_flags: u32,
    pub general_constraint_indicator_flags: u64,
    pub general_level_idc: u8,
    pub min_spatial_segmentation_idc: u16,
    pub parallelism_type: u8,
    pub chroma_format_idc: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub avg_frame_rate: u16,
    pub constant_frame_rate: u8,
    pub num_temporal_layers: u8,
    pub temporal_id_nested: bool,
    pub length_size_minus_one: u8,
}

impl Default for HevcDecoderConfig {
    fn default() -> Self {
        Self {
            general_profile_space: 0,
            general_tier_flag: 0,
            general_profile_idc: 1,
            general_profile_compatibility_flags: 0,
            general_constraint_indicator_flags: 0,
            general_level_idc: 120,
            min_spatial_segmentation_idc: 0,
            parallelism_type: 0,
            chroma_format_idc: 1,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            avg_frame_rate: 0,
            constant_frame_rate: 0,
            num_temporal_layers: 1,
            temporal_id_nested: true,
            length_size_minus_one: 3,
        }
    }
}

impl HevcDecoderConfig {
    /// Derive record fields from an SPS NAL unit, falling back to the
    /// defaults when the SPS is too short to parse.
    pub fn from_sps(sps: &[u8]) -> Self {
        Self::parse_sps(sps).unwrap_or_default()
    }

    fn parse_sps(sps: &[u8]) -> Option<Self> {
        let rbsp = unescape_rbsp(sps)?;
        if rbsp.is_empty() {
            return None;
        }
        let mut r = BitReader::new(&rbsp);

        r.read_bits(4); // sps_video_parameter_set_id
        let max_sub_layers_minus1 = r.read_bits(3) as usize;
        let temporal_id_nested = r.read_bit() == 1;

        let ptl = parse_profile_tier_level(&mut r, max_sub_layers_minus1);

        r.read_ue(); // sps_seq_parameter_set_id
        let chroma_format_idc = r.read_ue();
        if chroma_format_idc == 3 {
            r.read_bit(); // separate_colour_plane_flag
        }

        r.read_ue(); // pic_width_in_luma_samples
        r.read_ue(); // pic_height_in_luma_samples

        if r.read_bit() == 1 {
            // conformance window offsets
            r.read_ue();
            r.read_ue();
            r.read_ue();
            r.read_ue();
        }

        let bit_depth_luma_minus8 = r.read_ue();
        let bit_depth_chroma_minus8 = r.read_ue();

        Some(HevcDecoderConfig {
            general_profile_space: ptl.general_profile_space,
            general_tier_flag: ptl.general_tier_flag,
            general_profile_idc: ptl.general_profile_idc,
            general_profile_compatibility_flags: ptl.general_profile_compatibility_flags,
            general_constraint_indicator_flags: ptl.general_constraint_indicator_flags,
            general_level_idc: ptl.general_level_idc,
            chroma_format_idc: chroma_format_idc.min(3) as u8,
            bit_depth_luma_minus8: bit_depth_luma_minus8.min(7) as u8,
            bit_depth_chroma_minus8: bit_depth_chroma_minus8.min(7) as u8,
            num_temporal_layers: (max_sub_layers_minus1 as u8 + 1).clamp(1, 8),
            temporal_id_nested,
            ..Self::default()
        })
    }

    /// Serialize the record with the given parameter sets embedded as
    /// three single-entry arrays (VPS, SPS, PPS).
    pub fn encode(&self, vps: &[u8], sps: &[u8], pps: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(38 + vps.len() + sps.len() + pps.len());

        buf.put_u8(0x01); // configurationVersion
        buf.put_u8(
            ((self.general_profile_space & 0x03) << 6)
                | ((self.general_tier_flag & 0x01) << 5)
                | (self.general_profile_idc & 0x1F),
        );
        buf.put_u32(self.general_profile_compatibility_flags);
        // general_constraint_indicator_flags is 48 bits wide
        for shift in [40u32, 32, 24, 16, 8, 0] {
            buf.put_u8(((self.general_constraint_indicator_flags >> shift) & 0xFF) as u8);
        }
        buf.put_u8(self.general_level_idc);

        let min_seg = self.min_spatial_segmentation_idc & 0x0FFF;
        buf.put_u8(0xF0 | (min_seg >> 8) as u8);
        buf.put_u8((min_seg & 0xFF) as u8);

        buf.put_u8(0xFC | (self.parallelism_type & 0x03));
        buf.put_u8(0xFC | (self.chroma_format_idc & 0x03));
        buf.put_u8(0xF8 | (self.bit_depth_luma_minus8 & 0x07));
        buf.put_u8(0xF8 | (self.bit_depth_chroma_minus8 & 0x07));

        buf.put_u16(self.avg_frame_rate);

        let temporal_layers = self.num_temporal_layers.saturating_sub(1).min(7);
        buf.put_u8(
            ((self.constant_frame_rate & 0x03) << 6)
                | ((temporal_layers & 0x07) << 3)
                | ((self.temporal_id_nested as u8) << 2)
                | (self.length_size_minus_one & 0x03),
        );

        buf.put_u8(0x03); // numOfArrays
        put_nal_array(&mut buf, NAL_TYPE_VPS, vps);
        put_nal_array(&mut buf, NAL_TYPE_SPS, sps);
        put_nal_array(&mut buf, NAL_TYPE_PPS, pps);

        buf.freeze()
    }
}

/// Build an HEVCDecoderConfigurationRecord from raw parameter set NAL
/// units, deriving the profile/tier/level fields from the SPS.
pub fn build_hevc_decoder_config(vps: &[u8], sps: &[u8], pps: &[u8]) -> Bytes {
    HevcDecoderConfig::from_sps(sps).encode(vps, sps, pps)
}

fn put_nal_array(buf: &mut BytesMut, nal_type: u8, data: &[u8]) {
    buf.put_u8(0x80 | (nal_type & 0x3F)); // array_completeness = 1
    buf.put_u16(1); // numNalus
    buf.put_u16(data.len() as u16);
    buf.put_slice(data);
}

struct ProfileTierLevel {
    general_profile_space: u8,
    general_tier_flag: u8,
    general_profile_idc: u8,
    general_profile_compatibility_flags: u32,
    general_constraint_indicator_flags: u64,
    general_level_idc: u8,
}

fn parse_profile_tier_level(r: &mut BitReader<'_>, max_sub_layers_minus1: usize) -> ProfileTierLevel {
    let general_profile_space = r.read_bits(2) as u8;
    let general_tier_flag = r.read_bit() as u8;
    let general_profile_idc = r.read_bits(5) as u8;

    let mut compatibility_flags = 0u32;
    for _ in 0..32 {
        compatibility_flags = (compatibility_flags << 1) | r.read_bit();
    }

    let mut constraint_flags = 0u64;
    for _ in 0..48 {
        constraint_flags = (constraint_flags << 1) | r.read_bit() as u64;
    }

    let general_level_idc = r.read_bits(8) as u8;

    let mut profile_present = [false; 8];
    let mut level_present = [false; 8];
    for i in 0..max_sub_layers_minus1 {
        profile_present[i] = r.read_bit() == 1;
        level_present[i] = r.read_bit() == 1;
    }

    if max_sub_layers_minus1 > 0 {
        for _ in 0..(8 - max_sub_layers_minus1) {
            r.read_bits(2); // reserved_zero_2bits
        }
    }

    for i in 0..max_sub_layers_minus1 {
        if profile_present[i] {
            r.read_bits(2); // sub_layer_profile_space
            r.read_bits(1); // sub_layer_tier_flag
            r.read_bits(5); // sub_layer_profile_idc
            for _ in 0..32 {
                r.read_bit();
            }
            for _ in 0..48 {
                r.read_bit();
            }
        }
        if level_present[i] {
            r.read_bits(8); // sub_layer_level_idc
        }
    }

    ProfileTierLevel {
        general_profile_space,
        general_tier_flag,
        general_profile_idc,
        general_profile_compatibility_flags: compatibility_flags,
        general_constraint_indicator_flags: constraint_flags,
        general_level_idc,
    }
}

/// Strip the two-byte NAL header and every emulation_prevention_three_byte
/// from a NAL unit, yielding the raw RBSP.
fn unescape_rbsp(nal: &[u8]) -> Option<Vec<u8>> {
    if nal.len() <= 2 {
        return None;
    }
    let mut out = Vec::with_capacity(nal.len() - 2);
    let mut zeros = 0usize;
    for &b in &nal[2..] {
        if zeros >= 2 && b == 0x03 {
            zeros = 0;
            continue;
        }
        out.push(b);
        zeros = if b == 0x00 { zeros + 1 } else { 0 };
    }
    Some(out)
}

/// MSB-first bit reader over an RBSP.
///
/// Reads past the end yield zero bits, so a truncated SPS degrades into
/// zero-valued fields instead of failing; the caller clamps what it keeps.
struct BitReader<'a> {
    data: &'a [u8],
    byte: usize,
    bit: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, byte: 0, bit: 0 }
    }

    fn read_bit(&mut self) -> u32 {
        if self.byte >= self.data.len() {
            return 0;
        }
        let bit = (self.data[self.byte] >> (7 - self.bit)) & 0x01;
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.byte += 1;
        }
        bit as u32
    }

    fn read_bits(&mut self, count: u32) -> u32 {
        let mut bits = 0;
        for _ in 0..count {
            bits = (bits << 1) | self.read_bit();
        }
        bits
    }

    /// Exp-Golomb ue(v). Degenerate prefixes (32+ leading zeros) read as 0.
    fn read_ue(&mut self) -> u32 {
        let mut leading_zeros = 0u32;
        loop {
            let bit = self.read_bit();
            if bit == 0 && leading_zeros < 32 {
                leading_zeros += 1;
                continue;
            }
            if leading_zeros >= 32 {
                return 0;
            }
            let prefix = (1u32 << leading_zeros) - 1;
            let suffix = if leading_zeros > 0 {
                self.read_bits(leading_zeros)
            } else {
                0
            };
            return prefix + suffix;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal SPS: one temporal layer, Main profile idc 1, level 93,
    // 4:2:0 chroma, 8-bit, tiny conformance-free picture.
    const TEST_SPS: [u8; 17] = [
        0x42, 0x01, // NAL header (type 33)
        0x01, // vps id 0, max_sub_layers_minus1 0, nesting 1
        0x01, // profile space 0, tier 0, profile idc 1
        0x60, 0x00, 0x00, 0x00, // compatibility flags
        0x90, 0x00, 0x00, 0x00, 0x00, 0x00, // constraint flags
        0x5D, // level idc 93
        0xAD, // sps id 0, chroma 1, width 0, height 0, no window, depths 0
        0x80,
    ];

    #[test]
    fn test_classification() {
        assert_eq!(HevcNaluType::from_byte(0x40), HevcNaluType::Vps);
        assert_eq!(HevcNaluType::from_byte(0x42), HevcNaluType::Sps);
        assert_eq!(HevcNaluType::from_byte(0x44), HevcNaluType::Pps);
        assert_eq!(HevcNaluType::from_byte(0x46), HevcNaluType::Aud);
        assert_eq!(HevcNaluType::from_byte(0x26), HevcNaluType::IrapSlice); // IDR_W_RADL (19)
        assert_eq!(HevcNaluType::from_byte(0x02), HevcNaluType::Other); // TRAIL_R (1)
    }

    #[test]
    fn test_classification_all_types() {
        for ty in 0u8..64 {
            let expected = match ty {
                32 => HevcNaluType::Vps,
                33 => HevcNaluType::Sps,
                34 => HevcNaluType::Pps,
                35 => HevcNaluType::Aud,
                16..=23 => HevcNaluType::IrapSlice,
                _ => HevcNaluType::Other,
            };
            // The forbidden bit and the layer-id bit around the type field
            // never influence the result.
            assert_eq!(HevcNaluType::from_byte(ty << 1), expected, "type {}", ty);
            assert_eq!(
                HevcNaluType::from_byte((ty << 1) | 0x81),
                expected,
                "type {}",
                ty
            );
        }
    }

    #[test]
    fn test_irap_range_is_keyframe() {
        for ty in 16u8..=23 {
            assert!(HevcNaluType::from_byte(ty << 1).is_keyframe());
        }
        assert!(!HevcNaluType::from_byte(15 << 1).is_keyframe());
        assert!(!HevcNaluType::from_byte(24 << 1).is_keyframe());
    }

    #[test]
    fn test_parse_sps() {
        let config = HevcDecoderConfig::from_sps(&TEST_SPS);
        assert_eq!(config.general_profile_space, 0);
        assert_eq!(config.general_tier_flag, 0);
        assert_eq!(config.general_profile_idc, 1);
        assert_eq!(config.general_profile_compatibility_flags, 0x6000_0000);
        assert_eq!(config.general_constraint_indicator_flags, 0x9000_0000_0000);
        assert_eq!(config.general_level_idc, 93);
        assert_eq!(config.chroma_format_idc, 1);
        assert_eq!(config.bit_depth_luma_minus8, 0);
        assert_eq!(config.bit_depth_chroma_minus8, 0);
        assert_eq!(config.num_temporal_layers, 1);
        assert!(config.temporal_id_nested);
    }

    #[test]
    fn test_short_sps_falls_back_to_defaults() {
        let config = HevcDecoderConfig::from_sps(&[0x42, 0x01]);
        assert_eq!(config, HevcDecoderConfig::default());
        assert_eq!(config.general_profile_idc, 1);
        assert_eq!(config.general_level_idc, 120);
    }

    #[test]
    fn test_record_layout() {
        let vps = [0x40, 0x01, 0x0C];
        let pps = [0x44, 0x01, 0xC0];
        let record = build_hevc_decoder_config(&vps, &TEST_SPS, &pps);

        assert_eq!(record.len(), 38 + vps.len() + TEST_SPS.len() + pps.len());
        assert_eq!(record[0], 0x01); // configurationVersion
        assert_eq!(record[1], 0x01); // space 0, tier 0, profile idc 1
        assert_eq!(&record[2..6], &[0x60, 0x00, 0x00, 0x00]);
        assert_eq!(&record[6..12], &[0x90, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(record[12], 93); // level
        assert_eq!(&record[13..15], &[0xF0, 0x00]); // min_spatial_segmentation
        assert_eq!(record[15], 0xFC); // parallelism
        assert_eq!(record[16], 0xFD); // chroma 4:2:0
        assert_eq!(record[17], 0xF8); // luma depth 8
        assert_eq!(record[18], 0xF8); // chroma depth 8
        assert_eq!(&record[19..21], &[0x00, 0x00]); // avg frame rate
        assert_eq!(record[21], 0x07); // cfr 0, layers 0, nested, length 4
        assert_eq!(record[22], 0x03); // numOfArrays

        // VPS array
        assert_eq!(record[23], 0x80 | 32);
        assert_eq!(&record[24..26], &[0x00, 0x01]);
        assert_eq!(&record[26..28], &[0x00, 0x03]);
        assert_eq!(&record[28..31], &vps);

        // SPS array
        assert_eq!(record[31], 0x80 | 33);
        assert_eq!(&record[34..36], &[0x00, 0x11]);
        assert_eq!(&record[36..53], &TEST_SPS);

        // PPS array
        assert_eq!(record[53], 0x80 | 34);
        assert_eq!(&record[58..], &pps);
    }

    #[test]
    fn test_unescape_rbsp() {
        // 00 00 03 -> emulation prevention byte removed
        let nal = [0x42, 0x01, 0x10, 0x00, 0x00, 0x03, 0x01, 0x20];
        assert_eq!(unescape_rbsp(&nal).unwrap(), vec![0x10, 0x00, 0x00, 0x01, 0x20]);

        assert!(unescape_rbsp(&[0x42, 0x01]).is_none());
    }

    #[test]
    fn test_bit_reader_zero_fill_past_end() {
        let mut r = BitReader::new(&[0xFF]);
        assert_eq!(r.read_bits(8), 0xFF);
        assert_eq!(r.read_bits(8), 0x00);
        assert_eq!(r.read_ue(), 0);
    }

    #[test]
    fn test_exp_golomb() {
        // 1 -> 0, 010 -> 1, 011 -> 2, 00100 -> 3
        let mut r = BitReader::new(&[0b1_010_011_0, 0b0100_0000]);
        assert_eq!(r.read_ue(), 0);
        assert_eq!(r.read_ue(), 1);
        assert_eq!(r.read_ue(), 2);
        assert_eq!(r.read_ue(), 3);
    }
}
