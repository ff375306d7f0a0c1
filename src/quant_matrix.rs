//! Quantisation matrices: per quantiser index, level and subband rescale
//! factors and offsets.

use crate::constants::{MAXIMUM_QINDEX, MAXIMUM_WAVELET_DEPTH};
use crate::error::Vc2DecoderError;
use crate::transform_params::{CustomQuantMatrix, WaveletFilter};

pub const SUBBAND_LL: usize = 0;
pub const SUBBAND_HL: usize = 1;
pub const SUBBAND_LH: usize = 2;
pub const SUBBAND_HH: usize = 3;

type Adjustments = [[u32; 4]; 5];

const NONE: Adjustments = [[0; 4]; 5];

// Indexed by [wavelet][depth][level][subband].
const DEFAULT_ADJUSTMENTS: [[Adjustments; 5]; 7] = {
    const DD: Adjustments = [[5, 0, 0, 0], [0, 3, 3, 0], [0, 4, 4, 1], [0, 5, 5, 2], [0, 6, 6, 3]];
    const LEGALL: Adjustments = [[4, 0, 0, 0], [0, 2, 2, 0], [0, 4, 4, 2], [0, 5, 5, 3], [0, 7, 7, 5]];
    const HAAR1: Adjustments = [[8, 0, 0, 0], [0, 4, 4, 0], [0, 4, 4, 0], [0, 4, 4, 0], [0, 4, 4, 0]];
    const FIDELITY: Adjustments =
        [[0, 0, 0, 0], [0, 4, 4, 8], [0, 8, 8, 12], [0, 13, 13, 17], [0, 17, 17, 21]];
    const DAUBECHIES: Adjustments = [[3, 0, 0, 0], [0, 1, 1, 0], [0, 4, 4, 2], [0, 6, 6, 5], [0, 9, 9, 7]];
    [
        [NONE, DD, DD, DD, DD],
        [NONE, LEGALL, LEGALL, LEGALL, LEGALL],
        [NONE, DD, DD, DD, DD],
        [
            NONE,
            [[8, 0, 0, 0], [0, 4, 4, 0], [0; 4], [0; 4], [0; 4]],
            [[12, 0, 0, 0], [0, 8, 8, 4], [0, 4, 4, 0], [0; 4], [0; 4]],
            [[16, 0, 0, 0], [0, 12, 12, 8], [0, 8, 8, 4], [0, 4, 4, 0], [0; 4]],
            [[20, 0, 0, 0], [0, 16, 16, 12], [0, 12, 12, 8], [0, 8, 8, 4], [0, 4, 4, 0]],
        ],
        [NONE, HAAR1, HAAR1, HAAR1, HAAR1],
        [NONE, FIDELITY, FIDELITY, FIDELITY, FIDELITY],
        [NONE, DAUBECHIES, DAUBECHIES, DAUBECHIES, DAUBECHIES],
    ]
};

/// Rescale factor for a quantiser index, a fixed-point approximation of
/// `4 * 2^(index/4)`. Saturates at `i32::MAX` for indices too large to represent.
pub fn quant_factor(index: u32) -> i32 {
    let base = 1u128 << (index / 4).min(64);
    let factor = match index % 4 {
        0 => 4 * base,
        1 => (503_829 * base + 52_958) / 105_917,
        2 => (665_857 * base + 58_854) / 117_708,
        _ => (440_253 * base + 32_722) / 65_444,
    };
    factor.min(i32::MAX as u128) as i32
}

pub fn quant_offset(index: u32) -> i32 {
    match index {
        0 => 1,
        1 => 2,
        _ => ((i64::from(quant_factor(index)) + 1) / 2) as i32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantEntry {
    pub factor: i32,
    pub offset: i32,
}

impl QuantEntry {
    fn new(qindex: usize, adjustment: u32) -> Self {
        let qi = (qindex as i64 - i64::from(adjustment)).max(0) as u32;
        Self {
            factor: quant_factor(qi),
            offset: quant_offset(qi).saturating_add(2),
        }
    }
}

/// One row per quantiser index; each row holds `depth + 1` levels of four subbands.
#[derive(Debug, Clone)]
pub struct QuantMatrix {
    depth: usize,
    entries: Vec<[QuantEntry; 4]>,
}

impl QuantMatrix {
    pub fn new(
        wavelet: WaveletFilter,
        depth: u32,
        custom: Option<&CustomQuantMatrix>,
    ) -> Result<Self, Vc2DecoderError> {
        if depth > MAXIMUM_WAVELET_DEPTH {
            log::error!(
                "Could not form quantisation matrices, depth {} greater than {} not supported",
                depth,
                MAXIMUM_WAVELET_DEPTH
            );
            return Err(Vc2DecoderError::NotImplemented);
        }
        let depth = depth as usize;

        let adjustments: Vec<[u32; 4]> = match custom {
            Some(matrix) => (0..=depth)
                .map(|l| match l {
                    0 => [matrix.ll, 0, 0, 0],
                    l => [0, matrix.hl[l - 1], matrix.lh[l - 1], matrix.hh[l - 1]],
                })
                .collect(),
            None => DEFAULT_ADJUSTMENTS[wavelet as usize][depth][..=depth].to_vec(),
        };

        let mut entries = Vec::with_capacity((MAXIMUM_QINDEX + 1) * (depth + 1));
        for q in 0..=MAXIMUM_QINDEX {
            for level in &adjustments {
                entries.push([
                    QuantEntry::new(q, level[SUBBAND_LL]),
                    QuantEntry::new(q, level[SUBBAND_HL]),
                    QuantEntry::new(q, level[SUBBAND_LH]),
                    QuantEntry::new(q, level[SUBBAND_HH]),
                ]);
            }
        }

        Ok(Self { depth, entries })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Levels `0..=depth` for one quantiser index.
    pub fn row(&self, qindex: u8) -> &[[QuantEntry; 4]] {
        let start = qindex as usize * (self.depth + 1);
        &self.entries[start..start + self.depth + 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quant_factor_values() {
        assert_eq!(quant_factor(0), 4);
        assert_eq!(quant_factor(1), 5);
        assert_eq!(quant_factor(2), 6);
        assert_eq!(quant_factor(3), 7);
        assert_eq!(quant_factor(4), 8);
        assert_eq!(quant_factor(5), 10);
        assert_eq!(quant_factor(8), 16);
        assert_eq!(quant_factor(255), i32::MAX);
    }

    #[test]
    fn test_quant_offset_values() {
        assert_eq!(quant_offset(0), 1);
        assert_eq!(quant_offset(1), 2);
        assert_eq!(quant_offset(2), 3);
        assert_eq!(quant_offset(4), 4);
    }

    #[test]
    fn test_default_matrix_adjustment() {
        let matrix = QuantMatrix::new(WaveletFilter::LeGall5_3, 2, None).unwrap();
        assert_eq!(matrix.depth(), 2);
        let row = matrix.row(10);
        assert_eq!(row.len(), 3);
        // LL adjusted by 4
        assert_eq!(row[0][SUBBAND_LL].factor, quant_factor(6));
        assert_eq!(row[0][SUBBAND_LL].offset, quant_offset(6) + 2);
        // level 2 HH adjusted by 2
        assert_eq!(row[2][SUBBAND_HH].factor, quant_factor(8));
        // clamped at zero
        let row = matrix.row(1);
        assert_eq!(row[0][SUBBAND_LL].factor, 4);
        assert_eq!(row[0][SUBBAND_LL].offset, 3);
    }

    #[test]
    fn test_custom_matrix() {
        let custom = CustomQuantMatrix {
            ll: 1,
            hl: [2, 3, 0, 0, 0, 0, 0, 0],
            lh: [2, 3, 0, 0, 0, 0, 0, 0],
            hh: [4, 5, 0, 0, 0, 0, 0, 0],
        };
        let matrix = QuantMatrix::new(WaveletFilter::Haar0, 2, Some(&custom)).unwrap();
        let row = matrix.row(20);
        assert_eq!(row[0][SUBBAND_LL].factor, quant_factor(19));
        assert_eq!(row[1][SUBBAND_HL].factor, quant_factor(18));
        assert_eq!(row[2][SUBBAND_HH].factor, quant_factor(15));
    }

    #[test]
    fn test_depth_limit() {
        assert_eq!(
            QuantMatrix::new(WaveletFilter::LeGall5_3, 5, None).err(),
            Some(Vc2DecoderError::NotImplemented)
        );
    }
}
