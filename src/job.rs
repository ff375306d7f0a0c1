//! One parallel tile of a picture: the wavelet-domain scratch planes it owns
//! and the decode that turns its coded slices into output samples.

use crate::backend::Backend;
use crate::constants::{COLOURISE_MAXIMUM, COLOURISE_MIDPOINT};
use crate::error::Vc2DecoderError;
use crate::params::ColouriseMode;
use crate::partition::{JobGeometry, PlaneGeometry};
use crate::quant_matrix::QuantMatrix;
use crate::sample::Sample;
use crate::slices::CodedSlice;
use crate::transform_params::SampleSize;
use crate::wavelet::{FilterDef, OutputWindow, RowSink};

/// Everything a job reads but does not own. Shared by all jobs of a picture.
#[derive(Clone, Copy)]
pub struct JobContext<'a> {
    pub backend: Backend,
    pub filter: &'static FilterDef,
    pub matrix: &'a QuantMatrix,
    pub depth: usize,
    pub active_bits: u32,
    pub colourise: Option<ColouriseMode>,
    /// Slice data of the picture; slice records are offsets into it.
    pub data: &'a [u8],
}

/// Rows of the caller's output planes that belong to one job, each exactly
/// as wide as the job's output in that plane.
pub type JobOutput<'b> = [Vec<&'b mut [u16]>; 3];

#[derive(Debug)]
enum PlaneStore {
    Bits16([Vec<i16>; 3]),
    Bits32([Vec<i32>; 3]),
}

fn plane_buffers<S: Sample>(geometry: &JobGeometry) -> [Vec<S>; 3] {
    geometry
        .planes
        .map(|p| vec![S::default(); p.tile_width * p.tile_height])
}

#[derive(Debug)]
pub struct Job {
    pub geometry: JobGeometry,
    /// Unused coded bytes of each slice in the last decode.
    padding: Vec<usize>,
    coeffs: Vec<i32>,
    planes: PlaneStore,
}

impl Job {
    pub fn new(geometry: JobGeometry, sample_size: SampleSize) -> Self {
        let slice_samples = geometry.planes[0].slice_width * geometry.planes[0].slice_height;
        let planes = match sample_size {
            SampleSize::Bits16 => PlaneStore::Bits16(plane_buffers(&geometry)),
            SampleSize::Bits32 => PlaneStore::Bits32(plane_buffers(&geometry)),
        };
        Self {
            padding: vec![0; geometry.slice_count()],
            coeffs: vec![0; slice_samples],
            planes,
            geometry,
        }
    }

    pub fn padding(&self) -> &[usize] {
        &self.padding
    }

    /// Decodes the job's slices, one record per slice of the job in raster
    /// order, into its rows of the output.
    pub fn decode(
        &mut self,
        ctx: &JobContext,
        slices: &[CodedSlice],
        mut out: JobOutput,
    ) -> Result<(), Vc2DecoderError> {
        if slices.len() != self.geometry.slice_count() {
            log::error!(
                "Job expects {} slices, got {}",
                self.geometry.slice_count(),
                slices.len()
            );
            return Err(Vc2DecoderError::DecodeFailed);
        }
        for (c, rows) in out.iter().enumerate() {
            let p = &self.geometry.planes[c];
            if rows.len() != p.output_height || rows.iter().any(|r| r.len() != p.output_width) {
                log::error!("Output rows for plane {} do not match the job geometry", c);
                return Err(Vc2DecoderError::DecodeFailed);
            }
        }

        self.padding.fill(0);
        match &mut self.planes {
            PlaneStore::Bits16(planes) => decode_planes(
                planes,
                &self.geometry,
                slices,
                &mut self.padding,
                &mut self.coeffs,
                ctx,
                &mut out,
            )?,
            PlaneStore::Bits32(planes) => decode_planes(
                planes,
                &self.geometry,
                slices,
                &mut self.padding,
                &mut self.coeffs,
                ctx,
                &mut out,
            )?,
        }

        if let Some(mode) = ctx.colourise {
            self.colourise(mode, slices, &mut out);
        }
        Ok(())
    }

    /// Overwrites both chroma planes with a per-slice value scaled over the
    /// range seen in this job.
    fn colourise(&self, mode: ColouriseMode, slices: &[CodedSlice], out: &mut JobOutput) {
        let values: Vec<u16> = match mode {
            ColouriseMode::Quantiser => {
                scale(&slices.iter().map(|s| usize::from(s.qindex)).collect::<Vec<_>>())
            }
            ColouriseMode::Padding => scale(&self.padding),
            ColouriseMode::Unpadded => self
                .padding
                .iter()
                .map(|&p| if p == 0 { COLOURISE_MAXIMUM } else { COLOURISE_MIDPOINT })
                .collect(),
        };
        log::debug!(
            "Colourise {:?}: {} slices, values {:?}..{:?}",
            mode,
            values.len(),
            values.iter().min(),
            values.iter().max()
        );

        let slices_x = self.geometry.slices_x;
        for (c, rows) in out.iter_mut().enumerate().skip(1) {
            let p = &self.geometry.planes[c];
            for (yy, row) in rows.iter_mut().enumerate() {
                let sy = (yy + p.output_y) / p.slice_height;
                for (xx, v) in row.iter_mut().enumerate() {
                    let sx = (xx + p.output_x) / p.slice_width;
                    *v = values[sy * slices_x + sx];
                }
            }
        }
    }
}

fn scale(values: &[usize]) -> Vec<u16> {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);
    let factor = usize::from(COLOURISE_MAXIMUM) / (max - min).max(1);
    values
        .iter()
        .map(|&v| ((v - min) * factor).min(usize::from(COLOURISE_MAXIMUM)) as u16)
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn decode_planes<S: Sample>(
    planes: &mut [Vec<S>; 3],
    geometry: &JobGeometry,
    slices: &[CodedSlice],
    padding: &mut [usize],
    coeffs: &mut [i32],
    ctx: &JobContext,
    out: &mut JobOutput,
) -> Result<(), Vc2DecoderError> {
    for (c, plane) in planes.iter_mut().enumerate() {
        let p = &geometry.planes[c];
        let count = p.slice_width * p.slice_height;
        let coeffs = &mut coeffs[..count];
        for sy in 0..geometry.slices_y {
            for sx in 0..geometry.slices_x {
                let n = sy * geometry.slices_x + sx;
                let slice = &slices[n];
                padding[n] += ctx.backend.vlc(slice.component(ctx.data, c)?, coeffs);
                let origin = sy * p.slice_height * p.tile_width + sx * p.slice_width;
                ctx.backend.dequantise(
                    ctx.matrix.row(slice.qindex),
                    coeffs,
                    &mut plane[origin..],
                    p.tile_width,
                    p.slice_width,
                    p.slice_height,
                    ctx.depth,
                );
            }
        }
    }

    let transformed = if ctx.colourise.is_some() { 1 } else { 3 };
    for c in 0..transformed {
        synthesise(&mut planes[c], &geometry.planes[c], ctx, &mut out[c]);
    }
    Ok(())
}

/// Inverse transform of one tile plane, deepest level first, writing the
/// job's output window on the last pass.
fn synthesise<S: Sample>(
    plane: &mut [S],
    p: &PlaneGeometry,
    ctx: &JobContext,
    rows: &mut dyn RowSink,
) {
    let (w, h) = (p.tile_width, p.tile_height);
    for level in 0..ctx.depth - 1 {
        let skip = 1 << (ctx.depth - 1 - level);
        ctx.backend.vertical(ctx.filter, plane, w, w, h, skip);
        ctx.backend.horizontal(ctx.filter, plane, w, w, h, skip);
    }
    ctx.backend.vertical(ctx.filter, plane, w, w, h, 1);
    let window = OutputWindow {
        offset_x: p.output_x,
        offset_y: p.output_y,
        width: p.output_width,
        height: p.output_height,
        active_bits: ctx.active_bits,
    };
    ctx.backend
        .final_horizontal(ctx.filter, plane, w, w, h, &window, rows);
}
