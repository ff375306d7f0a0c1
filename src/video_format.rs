//! Base video formats and the resolution of sequence header overrides into
//! a concrete `VideoFormat`.

use crate::error::Vc2DecoderError;
use crate::sequence_header::{PresetOrCustom, SequenceVideoFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDiffFormat {
    Yuv444 = 2,
    Yuv422 = 1,
    Yuv420 = 0,
}

impl std::convert::TryFrom<u32> for ColorDiffFormat {
    type Error = Vc2DecoderError;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Yuv420),
            1 => Ok(Self::Yuv422),
            2 => Ok(Self::Yuv444),
            _ => Err(Vc2DecoderError::BadStream),
        }
    }
}

/// Output signal range codes reported through `OutputFormat`.
pub const SIGNAL_RANGE_10BIT_VIDEO: u32 = 3;
pub const SIGNAL_RANGE_12BIT_VIDEO: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub numer: u32,
    pub denom: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRange {
    pub luma_offset: u32,
    pub luma_excursion: u32,
    pub luma_bytes_per_sample: u32,
    pub luma_active_bits: u32,
    pub color_diff_offset: u32,
    pub color_diff_excursion: u32,
    pub color_diff_bytes_per_sample: u32,
    pub color_diff_active_bits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSpec {
    pub color_primaries: u32,
    pub color_matrix: u32,
    pub transfer_function: u32,
}

// Colour primaries, matrix and transfer function codes.
pub const PRIMARIES_HDTV: u32 = 0;
pub const PRIMARIES_SDTV_525: u32 = 1;
pub const PRIMARIES_SDTV_625: u32 = 2;
pub const PRIMARIES_DCINE: u32 = 3;
pub const MATRIX_HDTV: u32 = 0;
pub const MATRIX_SDTV: u32 = 1;
pub const MATRIX_REVERSIBLE: u32 = 2;
pub const TRANSFER_TV_GAMMA: u32 = 0;
pub const TRANSFER_DCINE: u32 = 3;

pub const PRESET_FRAME_RATES: [FrameRate; 12] = [
    FrameRate { numer: 0, denom: 0 },
    FrameRate { numer: 24000, denom: 1001 },
    FrameRate { numer: 24, denom: 1 },
    FrameRate { numer: 25, denom: 1 },
    FrameRate { numer: 30000, denom: 1001 },
    FrameRate { numer: 30, denom: 1 },
    FrameRate { numer: 50, denom: 1 },
    FrameRate { numer: 60000, denom: 1001 },
    FrameRate { numer: 60, denom: 1 },
    FrameRate { numer: 15000, denom: 1001 },
    FrameRate { numer: 25, denom: 2 },
    FrameRate { numer: 48, denom: 1 },
];

pub const PRESET_PIXEL_ASPECT_RATIOS: [(u32, u32); 7] =
    [(0, 0), (1, 1), (10, 11), (12, 11), (40, 33), (16, 11), (4, 3)];

const fn signal_range(
    luma_offset: u32,
    luma_excursion: u32,
    color_diff_offset: u32,
    color_diff_excursion: u32,
    bytes: u32,
    bits: u32,
) -> SignalRange {
    SignalRange {
        luma_offset,
        luma_excursion,
        luma_bytes_per_sample: bytes,
        luma_active_bits: bits,
        color_diff_offset,
        color_diff_excursion,
        color_diff_bytes_per_sample: bytes,
        color_diff_active_bits: bits,
    }
}

const RANGE_8BIT_FULL: SignalRange = signal_range(0, 255, 128, 255, 1, 8);
const RANGE_10BIT_VIDEO: SignalRange = signal_range(64, 876, 512, 896, 2, 10);
const RANGE_12BIT_VIDEO: SignalRange = signal_range(256, 3504, 2048, 3584, 2, 12);

pub const PRESET_SIGNAL_RANGES: [SignalRange; 5] = [
    signal_range(0, 0, 0, 0, 0, 0),
    RANGE_8BIT_FULL,
    signal_range(16, 219, 128, 224, 1, 8),
    RANGE_10BIT_VIDEO,
    RANGE_12BIT_VIDEO,
];

const fn color_spec(color_primaries: u32, color_matrix: u32, transfer_function: u32) -> ColorSpec {
    ColorSpec {
        color_primaries,
        color_matrix,
        transfer_function,
    }
}

const SPEC_SDTV_525: ColorSpec = color_spec(PRIMARIES_SDTV_525, MATRIX_SDTV, TRANSFER_TV_GAMMA);
const SPEC_SDTV_625: ColorSpec = color_spec(PRIMARIES_SDTV_625, MATRIX_SDTV, TRANSFER_TV_GAMMA);
const SPEC_HDTV: ColorSpec = color_spec(PRIMARIES_HDTV, MATRIX_HDTV, TRANSFER_TV_GAMMA);
const SPEC_DCINE: ColorSpec = color_spec(PRIMARIES_DCINE, MATRIX_REVERSIBLE, TRANSFER_DCINE);

pub const PRESET_COLOR_SPECS: [ColorSpec; 5] = [
    color_spec(0, 0, 0),
    SPEC_SDTV_525,
    SPEC_SDTV_625,
    SPEC_HDTV,
    SPEC_DCINE,
];

/// Fully resolved video format of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    pub frame_width: u32,
    pub frame_height: u32,
    pub color_diff_format_index: u32,
    pub source_sampling: u32,
    pub top_field_first: bool,
    pub frame_rate: FrameRate,
    pub pixel_aspect_ratio: (u32, u32),
    pub clean_width: u32,
    pub clean_height: u32,
    pub left_offset: u32,
    pub top_offset: u32,
    pub signal_range: SignalRange,
    pub color_spec: ColorSpec,
}

#[allow(clippy::too_many_arguments)]
const fn preset(
    (frame_width, frame_height): (u32, u32),
    color_diff_format: ColorDiffFormat,
    source_sampling: u32,
    top_field_first: bool,
    frame_rate: (u32, u32),
    pixel_aspect_ratio: (u32, u32),
    (clean_width, clean_height, left_offset, top_offset): (u32, u32, u32, u32),
    signal_range: SignalRange,
    color_spec: ColorSpec,
) -> VideoFormat {
    VideoFormat {
        frame_width,
        frame_height,
        color_diff_format_index: color_diff_format as u32,
        source_sampling,
        top_field_first,
        frame_rate: FrameRate {
            numer: frame_rate.0,
            denom: frame_rate.1,
        },
        pixel_aspect_ratio,
        clean_width,
        clean_height,
        left_offset,
        top_offset,
        signal_range,
        color_spec,
    }
}

use ColorDiffFormat::{Yuv420, Yuv422, Yuv444};

/// Base video formats, indexed by the sequence header's `base_video_format`.
pub const PRESET_VIDEO_FORMATS: [VideoFormat; 23] = [
    // Custom
    preset((640, 480), Yuv420, 0, false, (24000, 1001), (1, 1), (640, 480, 0, 0), RANGE_8BIT_FULL, SPEC_HDTV),
    // QSIF525
    preset((176, 120), Yuv420, 0, false, (15000, 1001), (10, 11), (176, 120, 0, 0), RANGE_8BIT_FULL, SPEC_SDTV_525),
    // QCIF
    preset((176, 144), Yuv420, 0, true, (25, 2), (12, 11), (176, 144, 0, 0), RANGE_8BIT_FULL, SPEC_SDTV_625),
    // SIF525
    preset((352, 240), Yuv420, 0, false, (15000, 1001), (10, 11), (352, 240, 0, 0), RANGE_8BIT_FULL, SPEC_SDTV_525),
    // CIF
    preset((352, 288), Yuv420, 0, true, (25, 2), (12, 11), (352, 288, 0, 0), RANGE_8BIT_FULL, SPEC_SDTV_625),
    // 4SIF525
    preset((704, 480), Yuv420, 0, false, (15000, 1001), (10, 11), (704, 480, 0, 0), RANGE_8BIT_FULL, SPEC_SDTV_525),
    // 4CIF
    preset((704, 576), Yuv420, 0, true, (25, 2), (12, 11), (704, 576, 0, 0), RANGE_8BIT_FULL, SPEC_SDTV_625),
    // SD480I-60
    preset((720, 480), Yuv422, 1, false, (30000, 1001), (10, 11), (704, 480, 8, 0), RANGE_10BIT_VIDEO, SPEC_SDTV_525),
    // SD576I-50
    preset((720, 576), Yuv422, 1, true, (25, 1), (12, 11), (704, 576, 8, 0), RANGE_10BIT_VIDEO, SPEC_SDTV_625),
    // HD720P-60
    preset((1280, 720), Yuv422, 0, true, (60000, 1001), (1, 1), (1280, 720, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // HD720P-50
    preset((1280, 720), Yuv422, 0, true, (50, 1), (1, 1), (1280, 720, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // HD1080I-60
    preset((1920, 1080), Yuv422, 1, true, (30000, 1001), (1, 1), (1920, 1080, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // HD1080I-50
    preset((1920, 1080), Yuv422, 1, true, (25, 1), (1, 1), (1920, 1080, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // HD1080P-60
    preset((1920, 1080), Yuv422, 0, true, (60000, 1001), (1, 1), (1920, 1080, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // HD1080P-50
    preset((1920, 1080), Yuv422, 0, true, (50, 1), (1, 1), (1920, 1080, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // DC2K
    preset((2048, 1080), Yuv444, 0, true, (24, 1), (1, 1), (2048, 1080, 0, 0), RANGE_12BIT_VIDEO, SPEC_DCINE),
    // DC4K
    preset((4096, 2160), Yuv444, 0, true, (24, 1), (1, 1), (4096, 2160, 0, 0), RANGE_12BIT_VIDEO, SPEC_DCINE),
    // UHDTV 4K-60
    preset((3840, 2160), Yuv422, 0, true, (60000, 1001), (1, 1), (3840, 2160, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // UHDTV 4K-50
    preset((3840, 2160), Yuv422, 0, true, (50, 1), (1, 1), (3840, 2160, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // UHDTV 8K-60
    preset((7680, 4320), Yuv422, 0, true, (60000, 1001), (1, 1), (7680, 4320, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // UHDTV 8K-50
    preset((7680, 4320), Yuv422, 0, true, (50, 1), (1, 1), (7680, 4320, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // HD1080P-24
    preset((1920, 1080), Yuv422, 0, true, (24, 1), (1, 1), (1920, 1080, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
    // SD Pro486
    preset((720, 486), Yuv422, 1, false, (30000, 1001), (10, 11), (720, 486, 0, 0), RANGE_10BIT_VIDEO, SPEC_HDTV),
];

fn lookup<T: Copy>(table: &[T], index: u32) -> Result<T, Vc2DecoderError> {
    table
        .get(index as usize)
        .copied()
        .ok_or(Vc2DecoderError::BadStream)
}

fn max_to_active_bits(max: u32) -> u32 {
    u32::BITS - max.leading_zeros()
}

impl VideoFormat {
    /// Starts from the base format and applies every override present in the header.
    pub fn resolve(header: &SequenceVideoFormat) -> Result<Self, Vc2DecoderError> {
        let mut fmt = lookup(&PRESET_VIDEO_FORMATS, header.base_video_format)?;

        if let Some((width, height)) = header.dimensions {
            fmt.frame_width = width;
            fmt.frame_height = height;
        }

        if let Some(index) = header.color_diff_format {
            ColorDiffFormat::try_from(index)?;
            fmt.color_diff_format_index = index;
        }

        if let Some(source_sampling) = header.scan_format {
            fmt.source_sampling = source_sampling;
        }

        match header.frame_rate {
            Some(PresetOrCustom::Preset(index)) => {
                fmt.frame_rate = lookup(&PRESET_FRAME_RATES, index)?;
            }
            Some(PresetOrCustom::Custom((numer, denom))) => {
                fmt.frame_rate = FrameRate { numer, denom };
            }
            None => {}
        }

        match header.pixel_aspect_ratio {
            Some(PresetOrCustom::Preset(index)) => {
                fmt.pixel_aspect_ratio = lookup(&PRESET_PIXEL_ASPECT_RATIOS, index)?;
            }
            Some(PresetOrCustom::Custom(ratio)) => fmt.pixel_aspect_ratio = ratio,
            None => {}
        }

        if let Some(area) = header.clean_area {
            fmt.clean_width = area.width;
            fmt.clean_height = area.height;
            fmt.left_offset = area.left_offset;
            fmt.top_offset = area.top_offset;
        }

        match header.signal_range {
            Some(PresetOrCustom::Preset(index)) => {
                fmt.signal_range = lookup(&PRESET_SIGNAL_RANGES, index)?;
            }
            Some(PresetOrCustom::Custom(custom)) => {
                let luma_active_bits =
                    max_to_active_bits(custom.luma_excursion.saturating_add(custom.luma_offset));
                let color_diff_active_bits = max_to_active_bits(
                    (custom.color_diff_excursion / 2).saturating_add(custom.color_diff_offset),
                );
                fmt.signal_range = SignalRange {
                    luma_offset: custom.luma_offset,
                    luma_excursion: custom.luma_excursion,
                    luma_bytes_per_sample: if luma_active_bits > 8 { 2 } else { 1 },
                    luma_active_bits,
                    color_diff_offset: custom.color_diff_offset,
                    color_diff_excursion: custom.color_diff_excursion,
                    color_diff_bytes_per_sample: if color_diff_active_bits > 8 { 2 } else { 1 },
                    color_diff_active_bits,
                };
            }
            None => {}
        }

        match header.color_spec {
            Some(PresetOrCustom::Preset(index)) => {
                fmt.color_spec = lookup(&PRESET_COLOR_SPECS, index)?;
            }
            Some(PresetOrCustom::Custom(custom)) => {
                if let Some(primaries) = custom.color_primaries {
                    fmt.color_spec.color_primaries = primaries;
                }
                if let Some(matrix) = custom.color_matrix {
                    fmt.color_spec.color_matrix = matrix;
                }
                if let Some(transfer) = custom.transfer_function {
                    fmt.color_spec.transfer_function = transfer;
                }
            }
            None => {}
        }

        Ok(fmt)
    }

    /// Only 4:2:2 at 10 or 12 active bits can be decoded.
    pub fn check_supported(&self) -> Result<(), Vc2DecoderError> {
        let range = &self.signal_range;
        let bits_ok = |bits: u32| bits == 10 || bits == 12;
        if !bits_ok(range.luma_active_bits)
            || !bits_ok(range.color_diff_active_bits)
            || self.color_diff_format_index != ColorDiffFormat::Yuv422 as u32
        {
            log::error!(
                "Frame geometry not supported, only 4:2:2 10-bit or 12-bit is supported (format {}, {}/{} bits)",
                self.color_diff_format_index,
                range.luma_active_bits,
                range.color_diff_active_bits
            );
            return Err(Vc2DecoderError::NotImplemented);
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            log::error!("Empty frame geometry {}x{}", self.frame_width, self.frame_height);
            return Err(Vc2DecoderError::NotImplemented);
        }
        Ok(())
    }

    pub fn active_bits(&self) -> u32 {
        self.signal_range.luma_active_bits
    }
}

/// Geometry and timing of the pictures the decoder writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
    pub signal_range: u32,
    /// Chroma sampling index of the output planes.
    pub source_sampling: u32,
    pub frame_rate_numer: u32,
    pub frame_rate_denom: u32,
    pub interlaced: bool,
}

impl OutputFormat {
    pub fn new(fmt: &VideoFormat, interlaced: bool) -> Self {
        Self {
            width: fmt.frame_width,
            height: fmt.frame_height,
            signal_range: if fmt.active_bits() == 12 {
                SIGNAL_RANGE_12BIT_VIDEO
            } else {
                SIGNAL_RANGE_10BIT_VIDEO
            },
            source_sampling: fmt.color_diff_format_index,
            frame_rate_numer: fmt.frame_rate.numer,
            frame_rate_denom: fmt.frame_rate.denom,
            interlaced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence_header::{CleanArea, CustomColorSpec, CustomSignalRange};

    fn base(index: u32) -> SequenceVideoFormat {
        SequenceVideoFormat {
            base_video_format: index,
            ..Default::default()
        }
    }

    #[test]
    fn test_hd1080p50_preset() {
        let fmt = VideoFormat::resolve(&base(14)).unwrap();
        assert_eq!((fmt.frame_width, fmt.frame_height), (1920, 1080));
        assert_eq!(fmt.frame_rate, FrameRate { numer: 50, denom: 1 });
        assert_eq!(fmt.active_bits(), 10);
        assert!(fmt.check_supported().is_ok());

        let out = OutputFormat::new(&fmt, false);
        assert_eq!(out.signal_range, SIGNAL_RANGE_10BIT_VIDEO);
        assert_eq!(out.source_sampling, 1);
    }

    #[test]
    fn test_unsupported_presets() {
        // 4:2:0 8-bit
        let fmt = VideoFormat::resolve(&base(0)).unwrap();
        assert_eq!(fmt.check_supported(), Err(Vc2DecoderError::NotImplemented));
        // 4:4:4 12-bit
        let fmt = VideoFormat::resolve(&base(15)).unwrap();
        assert_eq!(fmt.check_supported(), Err(Vc2DecoderError::NotImplemented));
        assert_eq!(
            VideoFormat::resolve(&base(23)),
            Err(Vc2DecoderError::BadStream)
        );
    }

    #[test]
    fn test_overrides() {
        let header = SequenceVideoFormat {
            base_video_format: 0,
            dimensions: Some((64, 32)),
            color_diff_format: Some(1),
            scan_format: Some(0),
            frame_rate: Some(PresetOrCustom::Custom((7, 3))),
            pixel_aspect_ratio: Some(PresetOrCustom::Preset(6)),
            clean_area: Some(CleanArea {
                width: 60,
                height: 30,
                left_offset: 2,
                top_offset: 1,
            }),
            signal_range: Some(PresetOrCustom::Custom(CustomSignalRange {
                luma_offset: 256,
                luma_excursion: 3504,
                color_diff_offset: 2048,
                color_diff_excursion: 3584,
            })),
            color_spec: Some(PresetOrCustom::Custom(CustomColorSpec {
                color_primaries: Some(PRIMARIES_DCINE),
                color_matrix: None,
                transfer_function: Some(TRANSFER_DCINE),
            })),
        };
        let fmt = VideoFormat::resolve(&header).unwrap();
        assert_eq!((fmt.frame_width, fmt.frame_height), (64, 32));
        assert_eq!(fmt.frame_rate, FrameRate { numer: 7, denom: 3 });
        assert_eq!(fmt.pixel_aspect_ratio, (4, 3));
        assert_eq!(fmt.clean_width, 60);
        assert_eq!(fmt.signal_range.luma_active_bits, 12);
        assert_eq!(fmt.signal_range.color_diff_active_bits, 12);
        assert_eq!(fmt.signal_range.luma_bytes_per_sample, 2);
        assert_eq!(fmt.color_spec.color_primaries, PRIMARIES_DCINE);
        assert_eq!(fmt.color_spec.color_matrix, MATRIX_HDTV);
        assert_eq!(fmt.color_spec.transfer_function, TRANSFER_DCINE);
        assert!(fmt.check_supported().is_ok());
        assert_eq!(OutputFormat::new(&fmt, true).signal_range, SIGNAL_RANGE_12BIT_VIDEO);
    }
}
