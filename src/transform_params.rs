use crate::bit_reader::Vc2BitReader;
use crate::constants::MAXIMUM_CUSTOM_MATRIX_DEPTH;
use crate::error::Vc2DecoderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WaveletFilter {
    /// Deslauriers-Dubuc (9,7).
    DeslauriersDubuc9_7 = 0,

    /// LeGall (5,3).
    LeGall5_3 = 1,

    /// Deslauriers-Dubuc (13,7).
    DeslauriersDubuc13_7 = 2,

    /// Haar with no renormalisation shift.
    Haar0 = 3,

    /// Haar with a one bit renormalisation shift.
    Haar1 = 4,

    /// Fidelity filter.
    Fidelity = 5,

    /// Daubechies (9,7) integer approximation.
    Daubechies9_7 = 6,
}

/// Width of the intermediate coefficients a filter needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSize {
    Bits16,
    Bits32,
}

impl WaveletFilter {
    pub const ALL: [WaveletFilter; 7] = [
        Self::DeslauriersDubuc9_7,
        Self::LeGall5_3,
        Self::DeslauriersDubuc13_7,
        Self::Haar0,
        Self::Haar1,
        Self::Fidelity,
        Self::Daubechies9_7,
    ];

    pub fn sample_size(self) -> SampleSize {
        match self {
            Self::Fidelity | Self::Daubechies9_7 => SampleSize::Bits32,
            _ => SampleSize::Bits16,
        }
    }
}

impl std::convert::TryFrom<u32> for WaveletFilter {
    type Error = Vc2DecoderError;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(v as usize)
            .copied()
            .ok_or(Vc2DecoderError::BadStream)
    }
}

/// Quantisation matrix carried in the stream, one (HL, LH, HH) triple per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomQuantMatrix {
    pub ll: u32,
    pub hl: [u32; MAXIMUM_CUSTOM_MATRIX_DEPTH],
    pub lh: [u32; MAXIMUM_CUSTOM_MATRIX_DEPTH],
    pub hh: [u32; MAXIMUM_CUSTOM_MATRIX_DEPTH],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformParams {
    pub wavelet: WaveletFilter,
    pub depth: u32,
    pub slices_x: u32,
    pub slices_y: u32,
    pub slice_prefix_bytes: u32,
    pub slice_size_scalar: u32,
    pub custom_quant_matrix: Option<CustomQuantMatrix>,
    /// Byte-aligned length of the encoded block.
    pub encoded_length: usize,
}

impl TransformParams {
    pub fn parse(data: &[u8]) -> Result<Self, Vc2DecoderError> {
        let mut reader = Vc2BitReader::new(data);
        let wavelet = WaveletFilter::try_from(reader.read_uint()?)?;
        let depth = reader.read_uint()?;
        let slices_x = reader.read_uint()?;
        let slices_y = reader.read_uint()?;
        let slice_prefix_bytes = reader.read_uint()?;
        let slice_size_scalar = reader.read_uint()?;

        let custom_quant_matrix = if reader.read_bool()? {
            if depth as usize > MAXIMUM_CUSTOM_MATRIX_DEPTH {
                log::error!("Custom quantisation matrix for depth {} is not supported", depth);
                return Err(Vc2DecoderError::NotImplemented);
            }
            let mut matrix = CustomQuantMatrix {
                ll: reader.read_uint()?,
                ..Default::default()
            };
            for l in 0..depth as usize {
                matrix.hl[l] = reader.read_uint()?;
                matrix.lh[l] = reader.read_uint()?;
                matrix.hh[l] = reader.read_uint()?;
            }
            Some(matrix)
        } else {
            None
        };
        reader.byte_align();

        Ok(Self {
            wavelet,
            depth,
            slices_x,
            slices_y,
            slice_prefix_bytes,
            slice_size_scalar,
            custom_quant_matrix,
            encoded_length: reader.position(),
        })
    }
}
