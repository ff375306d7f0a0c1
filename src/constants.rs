// Parse info prefix as defined in SMPTE ST 2042-1, section 10.5.1.
pub const PARSE_INFO_PREFIX: [u8; 4] = [0x42, 0x42, 0x43, 0x44];

// Size of a parse info header: prefix, parse code and two 32-bit offsets.
pub const PARSE_INFO_HEADER_SIZE: usize = 13;

// Picture number preceding the transform parameters of a picture.
pub const PICTURE_NUMBER_SIZE: usize = 4;

// Parse parameters expected for an HQ profile stream.
pub const EXPECTED_MAJOR_VERSION: u32 = 2;
pub const EXPECTED_MINOR_VERSION: u32 = 0;
pub const EXPECTED_PROFILE: u32 = 3;
pub const EXPECTED_LEVELS: [u32; 2] = [3, 6];

// Quantisation matrices are built for every possible slice qindex byte.
pub const MAXIMUM_QINDEX: usize = 255;

// Deepest transform for which default quantisation adjustments exist.
pub const MAXIMUM_WAVELET_DEPTH: u32 = 4;

// Custom quantisation matrices are accepted up to this depth.
pub const MAXIMUM_CUSTOM_MATRIX_DEPTH: usize = 8;

pub const MAXIMUM_JOBS: usize = 64;

// A job boundary overlaps enough whole slices to cover this many luma columns.
pub const HORIZONTAL_OVERLAP_PIXELS: usize = 32;
pub const VERTICAL_OVERLAP_SLICES: usize = 1;

// Colourise debug overlays span a 10-bit range.
pub const COLOURISE_MAXIMUM: u16 = (1 << 10) - 1;
pub const COLOURISE_MIDPOINT: u16 = 1 << 9;
