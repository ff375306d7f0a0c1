//! Reference synthesis: every pass gathers one line of the plane, lifts it,
//! and scatters it back.

use super::{FilterDef, LiftingStep, OutputWindow, RowSink, reflect};
use crate::sample::Sample;

/// Applies one lifting step to an interleaved line of `2 * m` samples.
pub fn apply_step(step: &LiftingStep, a: &mut [i32], m: usize) {
    let (target, source) = if step.kind.updates_even() { (0, 1) } else { (1, 0) };
    for n in 0..m {
        let first = step.first_source(n);
        let mut sum: i32 = 0;
        for (j, &tap) in step.taps.iter().enumerate() {
            let k = reflect(first + j as isize, m);
            sum = sum.wrapping_add(tap.wrapping_mul(a[2 * k + source]));
        }
        let t = 2 * n + target;
        a[t] = step.apply(a[t], sum);
    }
}

/// Runs every synthesis step of `def` over an interleaved line.
pub fn lift_line(def: &FilterDef, a: &mut [i32]) {
    let m = a.len() / 2;
    if m == 0 {
        return;
    }
    for step in def.steps {
        apply_step(step, a, m);
    }
}

/// Vertical pass over every `skip`-th column, reading every `skip`-th row.
pub fn vertical<S: Sample>(
    def: &FilterDef,
    data: &mut [S],
    stride: usize,
    width: usize,
    height: usize,
    skip: usize,
) {
    let rows = height / skip;
    let mut line = vec![0i32; rows];
    for x in (0..width).step_by(skip) {
        for (k, v) in line.iter_mut().enumerate() {
            *v = data[k * skip * stride + x].to_i32();
        }
        lift_line(def, &mut line);
        for (k, &v) in line.iter().enumerate() {
            data[k * skip * stride + x] = S::from_i32(v);
        }
    }
}

/// Horizontal pass over every `skip`-th row, followed by the filter's
/// renormalisation.
pub fn horizontal<S: Sample>(
    def: &FilterDef,
    data: &mut [S],
    stride: usize,
    width: usize,
    height: usize,
    skip: usize,
) {
    let cols = width / skip;
    let mut line = vec![0i32; cols];
    for y in (0..height).step_by(skip) {
        let row = &mut data[y * stride..];
        for (k, v) in line.iter_mut().enumerate() {
            *v = row[k * skip].to_i32();
        }
        lift_line(def, &mut line);
        for (k, &v) in line.iter().enumerate() {
            row[k * skip] = S::from_i32(def.renormalise(v));
        }
    }
}

/// Last horizontal pass at full resolution. Only rows and columns inside
/// `window` are synthesized and written; the sink receives them relative to
/// the window origin.
pub fn final_horizontal<S: Sample>(
    def: &FilterDef,
    data: &[S],
    stride: usize,
    width: usize,
    height: usize,
    window: &OutputWindow,
    out: &mut dyn RowSink,
) {
    let mut line = vec![0i32; width];
    let columns = window.columns(width);
    for y in window.rows(height) {
        let row = &data[y * stride..y * stride + width];
        for (v, s) in line.iter_mut().zip(row) {
            *v = s.to_i32();
        }
        lift_line(def, &mut line);
        let dst = out.row(y - window.offset_y);
        for x in columns.clone() {
            dst[x - window.offset_x] = window.output_sample(line[x], def);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform_params::WaveletFilter;
    use crate::wavelet::test_support::forward_line;
    use crate::wavelet::{StridedPlane, filter};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_synthesis_inverts_analysis() {
        let mut rng = StdRng::seed_from_u64(42);
        for wavelet in WaveletFilter::ALL {
            let def = filter(wavelet);
            for len in [2usize, 4, 6, 8, 16, 34] {
                let original: Vec<i32> = (0..len).map(|_| rng.gen_range(-512..512)).collect();
                let mut line = original.clone();
                forward_line(def, &mut line);
                lift_line(def, &mut line);
                assert_eq!(line, original, "{:?} length {}", wavelet, len);
            }
        }
    }

    #[test]
    fn test_legall_small_line() {
        // e0 = 4 - ((2 + 2 + 2) >> 2) = 3, o0 = 2 + ((3 + 3 + 1) >> 1) = 5
        let mut line = [4, 2];
        lift_line(filter(WaveletFilter::LeGall5_3), &mut line);
        assert_eq!(line, [3, 5]);
    }

    #[test]
    fn test_haar_pair() {
        // e = 10 - ((4 + 1) >> 1) = 8, o = 4 + 8 = 12
        let mut line = [10, 4];
        lift_line(filter(WaveletFilter::Haar0), &mut line);
        assert_eq!(line, [8, 12]);
    }

    // Single non-zero odd sample on an 8-sample line. The synthesized pairs
    // before the shift are [-2, 1, -1, 0, ..] for 9/7 and [-3, 3, -1, 0, ..]
    // for 13/7; both filters truncate the renormalising shift.
    const DESLAURIERS_DUBUC_VECTORS: [(WaveletFilter, [i32; 8], [i32; 8]); 2] = [
        (
            WaveletFilter::DeslauriersDubuc9_7,
            [0, 3, 0, 0, 0, 0, 0, 0],
            [-1, 0, -1, 0, 0, 0, 0, 0],
        ),
        (
            WaveletFilter::DeslauriersDubuc13_7,
            [0, 5, 0, 0, 0, 0, 0, 0],
            [-2, 1, -1, 0, 0, 0, 0, 0],
        ),
    ];

    #[test]
    fn test_deslauriers_dubuc_horizontal_vectors() {
        for (wavelet, input, expected) in DESLAURIERS_DUBUC_VECTORS {
            let mut row = input;
            horizontal(filter(wavelet), &mut row[..], 8, 8, 1, 1);
            assert_eq!(row, expected, "{:?}", wavelet);
        }
    }

    #[test]
    fn test_deslauriers_dubuc_final_vectors() {
        let window = OutputWindow {
            offset_x: 0,
            offset_y: 0,
            width: 8,
            height: 1,
            active_bits: 10,
        };
        for (wavelet, input, expected) in DESLAURIERS_DUBUC_VECTORS {
            let mut out = [0u16; 8];
            let mut sink = StridedPlane {
                data: &mut out,
                stride: 8,
            };
            final_horizontal(filter(wavelet), &input[..], 8, 8, 1, &window, &mut sink);
            assert_eq!(out, expected.map(|v| (v + 512) as u16), "{:?}", wavelet);
        }
    }

    #[test]
    fn test_final_writes_only_window() {
        let def = filter(WaveletFilter::LeGall5_3);
        let (width, height) = (8, 4);
        let data: Vec<i16> = (0..width * height).map(|v| (v as i16 - 16) * 3).collect();
        let window = OutputWindow {
            offset_x: 2,
            offset_y: 1,
            width: 4,
            height: 2,
            active_bits: 10,
        };
        let mut out = vec![0xFFFFu16; 6 * 3];
        let mut sink = StridedPlane {
            data: &mut out,
            stride: 6,
        };
        final_horizontal(def, &data, width, width, height, &window, &mut sink);
        for y in 0..3 {
            for x in 0..6 {
                let v = out[y * 6 + x];
                if y < 2 && x < 4 {
                    assert!(v <= 1023);
                } else {
                    assert_eq!(v, 0xFFFF);
                }
            }
        }
    }
}
