// Synthetic VC-2 HQ stream writer for the integration tests.
//
// Builds sequence headers, HQ pictures with hand-chosen or random slice
// coefficients, and the parse info framing around them.

#![allow(dead_code)]

use vc2hqdecode::ParseInfo;

pub const SEQUENCE_HEADER: u8 = 0x00;
pub const END_OF_SEQUENCE: u8 = 0x10;
pub const AUXILIARY_DATA: u8 = 0x20;
pub const PADDING_DATA: u8 = 0x30;
pub const LOW_DELAY_PICTURE: u8 = 0xC8;
pub const HQ_PICTURE: u8 = 0xE8;

// Wavelet indices as coded in the transform parameters.
pub const DESLAURIERS_DUBUC_9_7: u32 = 0;
pub const LEGALL_5_3: u32 = 1;
pub const DESLAURIERS_DUBUC_13_7: u32 = 2;
pub const HAAR_0: u32 = 3;
pub const HAAR_1: u32 = 4;

/// MSB-first bit packer.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u8,
    count: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.acc = (self.acc << 1) | u8::from(bit);
        self.count += 1;
        if self.count == 8 {
            self.bytes.push(self.acc);
            self.acc = 0;
            self.count = 0;
        }
    }

    /// Interleaved exp-Golomb: each bit of `value + 1` below the leading one
    /// is preceded by a 0 follow bit, and a 1 ends the value.
    pub fn write_uint(&mut self, value: u32) {
        let x = u64::from(value) + 1;
        let bits = 64 - x.leading_zeros();
        for i in (0..bits - 1).rev() {
            self.write_bit(false);
            self.write_bit((x >> i) & 1 == 1);
        }
        self.write_bit(true);
    }

    /// Magnitude, then a sign bit (1 for negative) when non-zero.
    pub fn write_sint(&mut self, value: i32) {
        self.write_uint(value.unsigned_abs());
        if value != 0 {
            self.write_bit(value < 0);
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_bit(value);
    }

    /// Completes the last byte with zero bits.
    pub fn into_bytes(mut self) -> Vec<u8> {
        while self.count != 0 {
            self.write_bit(false);
        }
        self.bytes
    }

    /// Completes the last byte with one bits, which the coefficient decoder
    /// reads as zeros.
    pub fn into_coefficient_bytes(mut self) -> Vec<u8> {
        while self.count != 0 {
            self.write_bit(true);
        }
        self.bytes
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceConfig {
    pub base_video_format: u32,
    pub width: u32,
    pub height: u32,
    pub interlaced: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        // HD1080P-60 is 4:2:2 10-bit
        Self {
            base_video_format: 13,
            width: 256,
            height: 64,
            interlaced: false,
        }
    }
}

pub fn sequence_header(cfg: &SequenceConfig) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_uint(2); // major version
    w.write_uint(0); // minor version
    w.write_uint(3); // HQ profile
    w.write_uint(3); // level
    w.write_uint(cfg.base_video_format);
    w.write_bool(true);
    w.write_uint(cfg.width);
    w.write_uint(cfg.height);
    // colour diff, scan format, frame rate, aspect ratio, clean area,
    // signal range and colour spec all left at the base format
    for _ in 0..7 {
        w.write_bool(false);
    }
    w.write_uint(u32::from(cfg.interlaced));
    w.into_bytes()
}

#[derive(Debug, Clone, Copy)]
pub struct TransformConfig {
    pub wavelet: u32,
    pub depth: u32,
    pub slices_x: u32,
    pub slices_y: u32,
    pub prefix_bytes: u32,
    pub size_scalar: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            wavelet: HAAR_0,
            depth: 1,
            slices_x: 8,
            slices_y: 8,
            prefix_bytes: 0,
            size_scalar: 2,
        }
    }
}

pub fn transform_params(cfg: &TransformConfig) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_uint(cfg.wavelet);
    w.write_uint(cfg.depth);
    w.write_uint(cfg.slices_x);
    w.write_uint(cfg.slices_y);
    w.write_uint(cfg.prefix_bytes);
    w.write_uint(cfg.size_scalar);
    w.write_bool(false);
    w.into_bytes()
}

/// One slice: quantiser index and the coefficients of Y, Cb and Cr in
/// subband order. Missing trailing coefficients decode as zero.
#[derive(Debug, Clone, Default)]
pub struct Slice {
    pub qindex: u8,
    pub components: [Vec<i32>; 3],
}

fn coded_component(coefficients: &[i32], scalar: usize) -> Vec<u8> {
    let mut w = BitWriter::new();
    for &c in coefficients {
        w.write_sint(c);
    }
    let mut bytes = w.into_coefficient_bytes();
    while bytes.len() % scalar != 0 {
        bytes.push(0xFF);
    }
    assert!(bytes.len() / scalar <= 255, "component too long for its length byte");
    bytes
}

/// Picture number, transform parameters and slices in raster order.
pub fn hq_picture(number: u32, cfg: &TransformConfig, slices: &[Slice]) -> Vec<u8> {
    assert_eq!(slices.len(), (cfg.slices_x * cfg.slices_y) as usize);
    let scalar = cfg.size_scalar as usize;
    let mut out = number.to_be_bytes().to_vec();
    out.extend(transform_params(cfg));
    for slice in slices {
        out.extend(std::iter::repeat_n(0u8, cfg.prefix_bytes as usize));
        out.push(slice.qindex);
        for component in &slice.components {
            let bytes = coded_component(component, scalar);
            out.push((bytes.len() / scalar) as u8);
            out.extend(bytes);
        }
    }
    out
}

/// Frames data units with parse info headers, linking each to the previous.
#[derive(Default)]
pub struct StreamWriter {
    bytes: Vec<u8>,
    previous: u32,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(mut self, parse_code: u8, payload: &[u8]) -> Self {
        let size = (13 + payload.len()) as u32;
        let info = ParseInfo {
            parse_code,
            next_parse_offset: size,
            previous_parse_offset: self.previous,
        };
        self.bytes.extend(info.to_bytes());
        self.bytes.extend_from_slice(payload);
        self.previous = size;
        self
    }

    pub fn end_of_sequence(mut self) -> Self {
        let info = ParseInfo {
            parse_code: END_OF_SEQUENCE,
            next_parse_offset: 0,
            previous_parse_offset: self.previous,
        };
        self.bytes.extend(info.to_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Coefficients per component for a slice of `width` x `height` luma samples.
pub fn coefficient_counts(width: usize, height: usize) -> [usize; 3] {
    [width * height, width / 2 * height, width / 2 * height]
}

/// Slices whose only non-zero coefficients are in the LL band of a depth-1
/// transform, holding `value(component, slice_index, ll_index)`.
pub fn ll_slices(
    cfg: &TransformConfig,
    slice_width: usize,
    slice_height: usize,
    qindex: impl Fn(usize) -> u8,
    value: impl Fn(usize, usize, usize) -> i32,
) -> Vec<Slice> {
    assert_eq!(cfg.depth, 1);
    let count = (cfg.slices_x * cfg.slices_y) as usize;
    (0..count)
        .map(|n| {
            let widths = [slice_width, slice_width / 2, slice_width / 2];
            let components = [0, 1, 2].map(|c| {
                let ll = widths[c] / 2 * slice_height / 2;
                (0..ll).map(|i| value(c, n, i)).collect()
            });
            Slice {
                qindex: qindex(n),
                components,
            }
        })
        .collect()
}

/// Planar output buffers sized for a `width` x `height` picture.
pub struct Planes {
    pub width: usize,
    pub height: usize,
    pub planes: [Vec<u16>; 3],
}

impl Planes {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            planes: [
                vec![0xFFFF; width * height],
                vec![0xFFFF; width / 2 * height],
                vec![0xFFFF; width / 2 * height],
            ],
        }
    }

    pub fn buffer(&mut self) -> vc2hqdecode::PictureBuffer<'_> {
        let [y, u, v] = &mut self.planes;
        vc2hqdecode::PictureBuffer::new(
            [y.as_mut_slice(), u.as_mut_slice(), v.as_mut_slice()],
            [self.width, self.width / 2, self.width / 2],
        )
    }

    pub fn sample(&self, c: usize, x: usize, y: usize) -> u16 {
        let stride = if c == 0 { self.width } else { self.width / 2 };
        self.planes[c][y * stride + x]
    }
}
