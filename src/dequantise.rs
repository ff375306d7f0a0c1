//! Rescaling of decoded coefficients into a slice-shaped block of the plane.
//!
//! Coefficients arrive in subband order: LL, then HL, LH, HH for each level
//! from the coarsest to the finest. Each band is scanned row-major at the
//! band's own subsampling.

use crate::quant_matrix::{QuantEntry, SUBBAND_HH, SUBBAND_HL, SUBBAND_LH, SUBBAND_LL};
use crate::sample::Sample;

/// Placement of one subband inside a slice: first row, first column, step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Band {
    level: usize,
    subband: usize,
    y0: usize,
    x0: usize,
    step: usize,
}

fn bands(depth: usize) -> impl Iterator<Item = Band> {
    let ll = Band {
        level: 0,
        subband: SUBBAND_LL,
        y0: 0,
        x0: 0,
        step: 1 << depth,
    };
    std::iter::once(ll).chain((1..=depth).flat_map(move |level| {
        let step = 1 << (depth + 1 - level);
        let half = step / 2;
        [
            (SUBBAND_HL, 0, half),
            (SUBBAND_LH, half, 0),
            (SUBBAND_HH, half, half),
        ]
        .into_iter()
        .map(move |(subband, y0, x0)| Band {
            level,
            subband,
            y0,
            x0,
            step,
        })
    }))
}

#[inline]
fn rescale(d: i32, entry: &QuantEntry) -> i64 {
    let magnitude =
        (i64::from(d.unsigned_abs()) * i64::from(entry.factor) + i64::from(entry.offset)) >> 2;
    match d.signum() {
        0 => 0,
        s => i64::from(s) * magnitude,
    }
}

/// `out` starts at the slice's top-left sample; `coeffs` holds
/// `width * height` values.
pub fn dequantise_reference<S: Sample>(
    matrix_row: &[[QuantEntry; 4]],
    coeffs: &[i32],
    out: &mut [S],
    stride: usize,
    width: usize,
    height: usize,
    depth: usize,
) {
    let mut input = coeffs.iter();
    for band in bands(depth) {
        let entry = &matrix_row[band.level][band.subband];
        let mut y = band.y0;
        while y < height {
            let mut x = band.x0;
            while x < width {
                let Some(&d) = input.next() else {
                    return;
                };
                out[y * stride + x] = S::from_i64(rescale(d, entry));
                x += band.step;
            }
            y += band.step;
        }
    }
}

/// Row-sliced variant with a branch-free sign restore.
pub fn dequantise_fast<S: Sample>(
    matrix_row: &[[QuantEntry; 4]],
    coeffs: &[i32],
    out: &mut [S],
    stride: usize,
    width: usize,
    height: usize,
    depth: usize,
) {
    let mut input = coeffs;
    for band in bands(depth) {
        let entry = &matrix_row[band.level][band.subband];
        let qf = i64::from(entry.factor);
        let qo = i64::from(entry.offset);
        if band.x0 >= width {
            continue;
        }
        let per_row = (width - band.x0).div_ceil(band.step);

        for y in (band.y0..height).step_by(band.step) {
            let (row_coeffs, rest) = input.split_at(per_row.min(input.len()));
            input = rest;
            let row = &mut out[y * stride + band.x0..y * stride + width];
            for (dst, &d) in row.iter_mut().step_by(band.step).zip(row_coeffs) {
                let sign = i64::from(d >> 31);
                let nonzero = -i64::from(d != 0);
                let magnitude = ((i64::from(d.unsigned_abs()) * qf + qo) >> 2) & nonzero;
                *dst = S::from_i64((magnitude ^ sign) - sign);
            }
        }
    }
}
