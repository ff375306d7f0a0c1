pub mod constants;
pub mod error;

pub use backend::{Backend, BackendKind};
pub use decoder::{PictureBuffer, SequenceInfo, Vc2Decoder};
pub use error::{DecodeStatus, Vc2DecoderError, result_code};
pub use params::{ColouriseMode, DecoderParams, PartialDecode};
pub use stream::{ParseInfo, StreamCursor, parse_info};
pub use video_format::{OutputFormat, VideoFormat};

pub mod backend;
pub mod bit_reader;
pub mod decoder;
pub mod dequantise;
pub mod job;
pub mod params;
pub mod parse_code;
pub mod partition;
pub mod quant_matrix;
pub mod sample;
pub mod scheduler;
pub mod sequence_header;
pub mod slices;
pub mod stream;
pub mod transform_params;
pub mod video_format;
pub mod vlc;
pub mod wavelet;

#[cfg(feature = "ffi")]
pub mod ffi;
