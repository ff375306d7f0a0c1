//! Kernel selection. A `Backend` bundles the entropy decoder, dequantiser and
//! wavelet passes; every implementation produces identical output.

use std::str::FromStr;

use crate::dequantise;
use crate::error::Vc2DecoderError;
use crate::quant_matrix::QuantEntry;
use crate::sample::Sample;
use crate::vlc;
use crate::wavelet::{self, FilterDef, OutputWindow, RowSink};

/// Environment variable that forces a backend at decoder creation.
pub const BACKEND_ENV_VAR: &str = "VC2DECODE_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Straightforward bit-serial and gather/scatter kernels.
    Reference,
    /// Table-driven entropy decoding and row-oriented lifting.
    Accelerated,
}

impl FromStr for BackendKind {
    type Err = Vc2DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "c" | "portable" => Ok(Self::Reference),
            "accelerated" | "fast" | "simd" => Ok(Self::Accelerated),
            _ => Err(Vc2DecoderError::BadParams),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Accelerated => write!(f, "accelerated"),
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn has_vector_unit() -> bool {
    is_x86_feature_detected!("sse4.1") || is_x86_feature_detected!("avx2")
}

#[cfg(target_arch = "aarch64")]
fn has_vector_unit() -> bool {
    std::arch::is_aarch64_feature_detected!("neon")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn has_vector_unit() -> bool {
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backend {
    kind: BackendKind,
}

impl Backend {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    /// Picks the backend from `VC2DECODE_BACKEND` if set, otherwise from the
    /// CPU's capabilities.
    pub fn detect() -> Self {
        if let Ok(value) = std::env::var(BACKEND_ENV_VAR) {
            match value.parse() {
                Ok(kind) => return Self::new(kind),
                Err(_) => log::warn!("Ignoring unknown {} value {:?}", BACKEND_ENV_VAR, value),
            }
        }
        if has_vector_unit() {
            Self::new(BackendKind::Accelerated)
        } else {
            Self::new(BackendKind::Reference)
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Decodes one component of a coded slice, returning the unread byte count.
    pub fn vlc(&self, input: &[u8], output: &mut [i32]) -> usize {
        match self.kind {
            BackendKind::Reference => vlc::decode_reference(input, output),
            BackendKind::Accelerated => vlc::decode_lut(input, output),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn dequantise<S: Sample>(
        &self,
        matrix_row: &[[QuantEntry; 4]],
        coeffs: &[i32],
        out: &mut [S],
        stride: usize,
        width: usize,
        height: usize,
        depth: usize,
    ) {
        match self.kind {
            BackendKind::Reference => {
                dequantise::dequantise_reference(matrix_row, coeffs, out, stride, width, height, depth)
            }
            BackendKind::Accelerated => {
                dequantise::dequantise_fast(matrix_row, coeffs, out, stride, width, height, depth)
            }
        }
    }

    pub fn vertical<S: Sample>(
        &self,
        def: &FilterDef,
        data: &mut [S],
        stride: usize,
        width: usize,
        height: usize,
        skip: usize,
    ) {
        match self.kind {
            BackendKind::Reference => wavelet::lifting::vertical(def, data, stride, width, height, skip),
            BackendKind::Accelerated => wavelet::fast::vertical(def, data, stride, width, height, skip),
        }
    }

    pub fn horizontal<S: Sample>(
        &self,
        def: &FilterDef,
        data: &mut [S],
        stride: usize,
        width: usize,
        height: usize,
        skip: usize,
    ) {
        match self.kind {
            BackendKind::Reference => {
                wavelet::lifting::horizontal(def, data, stride, width, height, skip)
            }
            BackendKind::Accelerated => wavelet::fast::horizontal(def, data, stride, width, height, skip),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn final_horizontal<S: Sample>(
        &self,
        def: &FilterDef,
        data: &[S],
        stride: usize,
        width: usize,
        height: usize,
        window: &OutputWindow,
        out: &mut dyn RowSink,
    ) {
        match self.kind {
            BackendKind::Reference => {
                wavelet::lifting::final_horizontal(def, data, stride, width, height, window, out)
            }
            BackendKind::Accelerated => {
                wavelet::fast::final_horizontal(def, data, stride, width, height, window, out)
            }
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::detect()
    }
}
