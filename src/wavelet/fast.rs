//! Accelerated synthesis. Vertical passes work on whole rows so the inner
//! loop runs along contiguous columns; horizontal passes de-interleave into
//! even and odd scratch lines padded with their reflections so no index in
//! the tap loop needs a boundary check. Results are identical to
//! [`super::lifting`] for the even line lengths every pass sees.

use super::{FilterDef, LiftingStep, OutputWindow, RowSink, reflect};
use crate::sample::Sample;

// Widest reach of any tap past either end of a half line.
const PAD: usize = 8;

/// Even and odd halves of a line with reflected margins.
struct SplitLine {
    m: usize,
    halves: [Vec<i32>; 2],
    padded: Vec<i32>,
}

impl SplitLine {
    fn new(m: usize) -> Self {
        Self {
            m,
            halves: [vec![0; m], vec![0; m]],
            padded: vec![0; m + 2 * PAD],
        }
    }

    fn load<S: Sample>(&mut self, samples: impl Iterator<Item = S>) {
        for (i, s) in samples.take(2 * self.m).enumerate() {
            self.halves[i & 1][i >> 1] = s.to_i32();
        }
    }

    fn lift(&mut self, def: &FilterDef) {
        if self.m == 0 {
            return;
        }
        for step in def.steps {
            self.apply(step);
        }
    }

    fn apply(&mut self, step: &LiftingStep) {
        let m = self.m;
        let (target, source) = if step.kind.updates_even() { (0, 1) } else { (1, 0) };
        for (i, p) in self.padded.iter_mut().enumerate() {
            *p = self.halves[source][reflect(i as isize - PAD as isize, m)];
        }
        let base = step.first_source(0) + PAD as isize;
        let padded = &self.padded;
        for (n, t) in self.halves[target].iter_mut().enumerate() {
            let start = (base + n as isize) as usize;
            let window = &padded[start..start + step.taps.len()];
            let sum = window
                .iter()
                .zip(step.taps)
                .fold(0i32, |acc, (&v, &tap)| acc.wrapping_add(tap.wrapping_mul(v)));
            *t = step.apply(*t, sum);
        }
    }

    #[inline]
    fn get(&self, i: usize) -> i32 {
        self.halves[i & 1][i >> 1]
    }
}

/// Vertical pass processing whole rows at a time.
pub fn vertical<S: Sample>(
    def: &FilterDef,
    data: &mut [S],
    stride: usize,
    width: usize,
    height: usize,
    skip: usize,
) {
    let rows = height / skip;
    let cols = width.div_ceil(skip);
    let m = rows / 2;
    if m == 0 {
        return;
    }

    // halves[0] holds even rows, halves[1] odd rows, each `cols` wide.
    let mut halves = [vec![0i32; m * cols], vec![0i32; m * cols]];
    for r in 0..2 * m {
        let src = &data[r * skip * stride..];
        let dst = &mut halves[r & 1][(r >> 1) * cols..((r >> 1) + 1) * cols];
        for (d, s) in dst.iter_mut().zip(src.iter().step_by(skip)) {
            *d = s.to_i32();
        }
    }

    let mut acc = vec![0i32; cols];
    for step in def.steps {
        let [even, odd] = &mut halves;
        let (dst, src) = if step.kind.updates_even() {
            (even, &*odd)
        } else {
            (odd, &*even)
        };
        for n in 0..m {
            acc.fill(0);
            let first = step.first_source(n);
            for (j, &tap) in step.taps.iter().enumerate() {
                let k = reflect(first + j as isize, m);
                let src_row = &src[k * cols..(k + 1) * cols];
                for (a, &v) in acc.iter_mut().zip(src_row) {
                    *a = a.wrapping_add(tap.wrapping_mul(v));
                }
            }
            let dst_row = &mut dst[n * cols..(n + 1) * cols];
            for (t, &sum) in dst_row.iter_mut().zip(&acc) {
                *t = step.apply(*t, sum);
            }
        }
    }

    for r in 0..2 * m {
        let src = &halves[r & 1][(r >> 1) * cols..((r >> 1) + 1) * cols];
        let dst = &mut data[r * skip * stride..];
        for (d, &s) in dst.iter_mut().step_by(skip).zip(src) {
            *d = S::from_i32(s);
        }
    }
}

pub fn horizontal<S: Sample>(
    def: &FilterDef,
    data: &mut [S],
    stride: usize,
    width: usize,
    height: usize,
    skip: usize,
) {
    let cols = width / skip;
    let mut line = SplitLine::new(cols / 2);
    for y in (0..height).step_by(skip) {
        let row = &mut data[y * stride..y * stride + width];
        line.load(row.iter().step_by(skip).copied());
        line.lift(def);
        for (i, d) in row.iter_mut().step_by(skip).take(2 * line.m).enumerate() {
            *d = S::from_i32(def.renormalise(line.get(i)));
        }
    }
}

pub fn final_horizontal<S: Sample>(
    def: &FilterDef,
    data: &[S],
    stride: usize,
    width: usize,
    height: usize,
    window: &OutputWindow,
    out: &mut dyn RowSink,
) {
    let mut line = SplitLine::new(width / 2);
    let columns = window.columns(width);
    for y in window.rows(height) {
        line.load(data[y * stride..y * stride + width].iter().copied());
        line.lift(def);
        let dst = &mut out.row(y - window.offset_y)[..columns.len()];
        for (d, x) in dst.iter_mut().zip(columns.clone()) {
            *d = window.output_sample(line.get(x), def);
        }
    }
}
