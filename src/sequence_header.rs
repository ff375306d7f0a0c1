//! Sequence header syntax: parse parameters, source parameter overrides and
//! the picture coding mode.

use crate::bit_reader::Vc2BitReader;
use crate::constants::{
    EXPECTED_LEVELS, EXPECTED_MAJOR_VERSION, EXPECTED_MINOR_VERSION, EXPECTED_PROFILE,
};
use crate::error::Vc2DecoderError;

/// A source parameter given either as an index into a preset table or, for
/// index 0, as explicit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetOrCustom<T> {
    Preset(u32),
    Custom(T),
}

impl<T> PresetOrCustom<T> {
    pub fn index(&self) -> u32 {
        match self {
            Self::Preset(index) => *index,
            Self::Custom(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanArea {
    pub width: u32,
    pub height: u32,
    pub left_offset: u32,
    pub top_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomSignalRange {
    pub luma_offset: u32,
    pub luma_excursion: u32,
    pub color_diff_offset: u32,
    pub color_diff_excursion: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomColorSpec {
    pub color_primaries: Option<u32>,
    pub color_matrix: Option<u32>,
    pub transfer_function: Option<u32>,
}

/// The video format exactly as signalled: a base format plus the overrides
/// whose flags were set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceVideoFormat {
    pub base_video_format: u32,
    pub dimensions: Option<(u32, u32)>,
    pub color_diff_format: Option<u32>,
    pub scan_format: Option<u32>,
    pub frame_rate: Option<PresetOrCustom<(u32, u32)>>,
    pub pixel_aspect_ratio: Option<PresetOrCustom<(u32, u32)>>,
    pub clean_area: Option<CleanArea>,
    pub signal_range: Option<PresetOrCustom<CustomSignalRange>>,
    pub color_spec: Option<PresetOrCustom<CustomColorSpec>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseParameters {
    pub major_version: u32,
    pub minor_version: u32,
    pub profile: u32,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceHeader {
    pub parse_parameters: ParseParameters,
    pub video_format: SequenceVideoFormat,
    pub picture_coding_mode: u32,
    /// Byte-aligned length of the encoded header.
    pub encoded_length: usize,
}

fn read_optional<T>(
    reader: &mut Vc2BitReader,
    read: impl FnOnce(&mut Vc2BitReader) -> Result<T, Vc2DecoderError>,
) -> Result<Option<T>, Vc2DecoderError> {
    if reader.read_bool()? {
        Ok(Some(read(reader)?))
    } else {
        Ok(None)
    }
}

fn read_pair(reader: &mut Vc2BitReader) -> Result<(u32, u32), Vc2DecoderError> {
    Ok((reader.read_uint()?, reader.read_uint()?))
}

fn read_indexed<T>(
    reader: &mut Vc2BitReader,
    read_custom: impl FnOnce(&mut Vc2BitReader) -> Result<T, Vc2DecoderError>,
) -> Result<PresetOrCustom<T>, Vc2DecoderError> {
    match reader.read_uint()? {
        0 => Ok(PresetOrCustom::Custom(read_custom(reader)?)),
        index => Ok(PresetOrCustom::Preset(index)),
    }
}

impl ParseParameters {
    fn read(reader: &mut Vc2BitReader) -> Result<Self, Vc2DecoderError> {
        let params = Self {
            major_version: reader.read_uint()?,
            minor_version: reader.read_uint()?,
            profile: reader.read_uint()?,
            level: reader.read_uint()?,
        };
        let checks = [
            ("major version", params.major_version, EXPECTED_MAJOR_VERSION),
            ("minor version", params.minor_version, EXPECTED_MINOR_VERSION),
            ("profile", params.profile, EXPECTED_PROFILE),
        ];
        for (name, got, expected) in checks {
            if got != expected {
                log::warn!("Expected {} {}, got {} when parsing sequence header", name, expected, got);
            }
        }
        if !EXPECTED_LEVELS.contains(&params.level) {
            log::warn!("Expected level 3 or 6, got {} when parsing sequence header", params.level);
        }
        Ok(params)
    }
}

impl SequenceVideoFormat {
    fn read(reader: &mut Vc2BitReader) -> Result<Self, Vc2DecoderError> {
        let base_video_format = reader.read_uint()?;
        let dimensions = read_optional(reader, read_pair)?;
        let color_diff_format = read_optional(reader, |r| r.read_uint())?;
        let scan_format = read_optional(reader, |r| r.read_uint())?;
        let frame_rate = read_optional(reader, |r| read_indexed(r, read_pair))?;
        let pixel_aspect_ratio = read_optional(reader, |r| read_indexed(r, read_pair))?;
        let clean_area = read_optional(reader, |r| {
            Ok(CleanArea {
                width: r.read_uint()?,
                height: r.read_uint()?,
                left_offset: r.read_uint()?,
                top_offset: r.read_uint()?,
            })
        })?;
        let signal_range = read_optional(reader, |r| {
            read_indexed(r, |r| {
                Ok(CustomSignalRange {
                    luma_offset: r.read_uint()?,
                    luma_excursion: r.read_uint()?,
                    color_diff_offset: r.read_uint()?,
                    color_diff_excursion: r.read_uint()?,
                })
            })
        })?;
        let color_spec = read_optional(reader, |r| {
            read_indexed(r, |r| {
                Ok(CustomColorSpec {
                    color_primaries: read_optional(r, |r| r.read_uint())?,
                    color_matrix: read_optional(r, |r| r.read_uint())?,
                    transfer_function: read_optional(r, |r| r.read_uint())?,
                })
            })
        })?;

        Ok(Self {
            base_video_format,
            dimensions,
            color_diff_format,
            scan_format,
            frame_rate,
            pixel_aspect_ratio,
            clean_area,
            signal_range,
            color_spec,
        })
    }
}

impl SequenceHeader {
    /// Parses the data unit following a sequence header's parse info.
    pub fn parse(data: &[u8]) -> Result<Self, Vc2DecoderError> {
        let mut reader = Vc2BitReader::new(data);
        let parse_parameters = ParseParameters::read(&mut reader)?;
        let video_format = SequenceVideoFormat::read(&mut reader)?;
        let picture_coding_mode = reader.read_uint()?;
        reader.byte_align();

        Ok(Self {
            parse_parameters,
            video_format,
            picture_coding_mode,
            encoded_length: reader.position(),
        })
    }

    /// Pictures are fields rather than frames.
    pub fn is_interlaced(&self) -> bool {
        self.picture_coding_mode != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Packs a list of (value, bit count) fields MSB first.
    fn pack(fields: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u8;
        let mut count = 0;
        for &(value, bits) in fields {
            for i in (0..bits).rev() {
                acc = (acc << 1) | ((value >> i) & 1) as u8;
                count += 1;
                if count == 8 {
                    out.push(acc);
                    acc = 0;
                    count = 0;
                }
            }
        }
        if count > 0 {
            out.push(acc << (8 - count));
        }
        out
    }

    #[test]
    fn test_parse_minimal_header() {
        let fields = [
            (0b011, 3),      // major version 2
            (1, 1),          // minor version 0
            (0b00001, 5),    // profile 3
            (0b00001, 5),    // level 3
            (0b0101011, 7),  // base video format 14
            (0, 9),          // no overrides
            (1, 1),          // progressive
        ];
        let data = pack(&fields);

        let header = SequenceHeader::parse(&data).unwrap();
        assert_eq!(
            header.parse_parameters,
            ParseParameters {
                major_version: 2,
                minor_version: 0,
                profile: 3,
                level: 3
            }
        );
        assert_eq!(header.video_format.base_video_format, 14);
        assert_eq!(header.video_format.frame_rate, None);
        assert!(!header.is_interlaced());
        assert_eq!(header.encoded_length, data.len());
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(
            SequenceHeader::parse(&[0b0110_0000]),
            Err(Vc2DecoderError::CoderOverrun)
        );
    }
}
