//! Inverse wavelet synthesis by lifting.
//!
//! A line of `N` samples is viewed as even samples `e[n] = A[2n]` and odd
//! samples `o[n] = A[2n + 1]`, `M = N / 2`. Every filter is a short sequence
//! of lifting steps over those two halves followed by a renormalising shift.
//! Neighbours past either end are taken by half-sample symmetric reflection.

pub mod fast;
pub mod lifting;

use crate::transform_params::WaveletFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftKind {
    /// `e[n] += (sum taps * o) >> shift`
    AddToEven,
    /// `e[n] -= (sum taps * o) >> shift`
    SubtractFromEven,
    /// `o[n] += (sum taps * e) >> shift`
    AddToOdd,
    /// `o[n] -= (sum taps * e) >> shift`
    SubtractFromOdd,
}

impl LiftKind {
    pub fn updates_even(self) -> bool {
        matches!(self, Self::AddToEven | Self::SubtractFromEven)
    }

    pub fn subtracts(self) -> bool {
        matches!(self, Self::SubtractFromEven | Self::SubtractFromOdd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiftingStep {
    pub kind: LiftKind,
    pub shift: u32,
    /// Index of the first tap relative to the sample being updated.
    pub offset: isize,
    pub taps: &'static [i32],
}

impl LiftingStep {
    /// Position in the other half of the first tap for output `n`.
    #[inline]
    pub fn first_source(&self, n: usize) -> isize {
        let base = n as isize + self.offset;
        if self.kind.updates_even() { base - 1 } else { base }
    }

    #[inline]
    pub fn rounding(&self) -> i32 {
        if self.shift > 0 { 1 << (self.shift - 1) } else { 0 }
    }

    #[inline]
    pub fn apply(&self, target: i32, sum: i32) -> i32 {
        let delta = sum.wrapping_add(self.rounding()) >> self.shift;
        if self.kind.subtracts() {
            target.wrapping_sub(delta)
        } else {
            target.wrapping_add(delta)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDef {
    pub steps: &'static [LiftingStep],
    /// Renormalisation applied after each horizontal pass.
    pub shift: u32,
    /// Round the renormalisation to nearest rather than truncating.
    pub round: bool,
}

impl FilterDef {
    /// Renormalising shift applied after a horizontal pass.
    #[inline]
    pub fn renormalise(&self, v: i32) -> i32 {
        if self.shift == 0 {
            v
        } else if self.round {
            v.wrapping_add(1 << (self.shift - 1)) >> self.shift
        } else {
            v >> self.shift
        }
    }
}

const fn step(kind: LiftKind, shift: u32, offset: isize, taps: &'static [i32]) -> LiftingStep {
    LiftingStep {
        kind,
        shift,
        offset,
        taps,
    }
}

use LiftKind::{AddToEven, AddToOdd, SubtractFromEven, SubtractFromOdd};

const DESLAURIERS_DUBUC_9_7: FilterDef = FilterDef {
    steps: &[
        step(SubtractFromEven, 2, 0, &[1, 1]),
        step(AddToOdd, 4, -1, &[-1, 9, 9, -1]),
    ],
    shift: 1,
    round: false,
};

const LEGALL_5_3: FilterDef = FilterDef {
    steps: &[
        step(SubtractFromEven, 2, 0, &[1, 1]),
        step(AddToOdd, 1, 0, &[1, 1]),
    ],
    shift: 1,
    round: true,
};

const DESLAURIERS_DUBUC_13_7: FilterDef = FilterDef {
    steps: &[
        step(SubtractFromEven, 5, -1, &[-1, 9, 9, -1]),
        step(AddToOdd, 4, -1, &[-1, 9, 9, -1]),
    ],
    shift: 1,
    round: false,
};

const HAAR_STEPS: &[LiftingStep] = &[
    step(SubtractFromEven, 1, 1, &[1]),
    step(AddToOdd, 0, 0, &[1]),
];

const HAAR_0: FilterDef = FilterDef {
    steps: HAAR_STEPS,
    shift: 0,
    round: true,
};

const HAAR_1: FilterDef = FilterDef {
    steps: HAAR_STEPS,
    shift: 1,
    round: true,
};

const FIDELITY: FilterDef = FilterDef {
    steps: &[
        step(AddToOdd, 8, -3, &[-2, 10, -25, 81, 81, -25, 10, -2]),
        step(SubtractFromEven, 8, -3, &[-8, 21, -46, 161, 161, -46, 21, -8]),
    ],
    shift: 0,
    round: true,
};

const DAUBECHIES_9_7: FilterDef = FilterDef {
    steps: &[
        step(SubtractFromEven, 12, 0, &[1817, 1817]),
        step(SubtractFromOdd, 12, 0, &[3616, 3616]),
        step(AddToEven, 12, 0, &[217, 217]),
        step(AddToOdd, 12, 0, &[6497, 6497]),
    ],
    shift: 1,
    round: true,
};

pub fn filter(wavelet: WaveletFilter) -> &'static FilterDef {
    match wavelet {
        WaveletFilter::DeslauriersDubuc9_7 => &DESLAURIERS_DUBUC_9_7,
        WaveletFilter::LeGall5_3 => &LEGALL_5_3,
        WaveletFilter::DeslauriersDubuc13_7 => &DESLAURIERS_DUBUC_13_7,
        WaveletFilter::Haar0 => &HAAR_0,
        WaveletFilter::Haar1 => &HAAR_1,
        WaveletFilter::Fidelity => &FIDELITY,
        WaveletFilter::Daubechies9_7 => &DAUBECHIES_9_7,
    }
}

/// Half-sample symmetric reflection into `0..m`.
#[inline]
pub fn reflect(index: isize, m: usize) -> usize {
    let period = 2 * m as isize;
    let i = index.rem_euclid(period) as usize;
    if i >= m { 2 * m - 1 - i } else { i }
}

/// Caller-visible 16-bit output rows.
pub trait RowSink {
    fn row(&mut self, y: usize) -> &mut [u16];
}

/// A plane addressed by row stride.
pub struct StridedPlane<'a> {
    pub data: &'a mut [u16],
    pub stride: usize,
}

impl RowSink for StridedPlane<'_> {
    fn row(&mut self, y: usize) -> &mut [u16] {
        let start = y * self.stride;
        let end = (start + self.stride).min(self.data.len());
        &mut self.data[start..end]
    }
}

impl RowSink for Vec<&mut [u16]> {
    fn row(&mut self, y: usize) -> &mut [u16] {
        &mut *self[y]
    }
}

/// Sub-rectangle of the transformed plane written by the final step, and the
/// bit depth of the output samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputWindow {
    pub offset_x: usize,
    pub offset_y: usize,
    pub width: usize,
    pub height: usize,
    pub active_bits: u32,
}

impl OutputWindow {
    /// Level shift, renormalise and clip one synthesized sample.
    #[inline]
    pub fn output_sample(&self, v: i32, def: &FilterDef) -> u16 {
        let max = (1i32 << self.active_bits) - 1;
        def.renormalise(v)
            .wrapping_add(1 << (self.active_bits - 1))
            .clamp(0, max) as u16
    }

    pub fn rows(&self, height: usize) -> std::ops::Range<usize> {
        self.offset_y..height.min(self.offset_y + self.height)
    }

    pub fn columns(&self, width: usize) -> std::ops::Range<usize> {
        self.offset_x.min(width)..width.min(self.offset_x + self.width)
    }
}
