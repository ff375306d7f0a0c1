//! C Foreign Function Interface for vc2hqdecode.
//!
//! Decoders are opaque handles. Input is passed as a pointer/length pair that
//! every call advances past the data it consumed, so the caller can loop on
//! `vc2decode_decode_one_picture` without tracking offsets itself. Return
//! values are the integer result codes of [`crate::result_code`].

use std::os::raw::{c_int, c_uchar};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

use crate::decoder::{PictureBuffer, Vc2Decoder};
use crate::error::{DecodeStatus, Vc2DecoderError, result_code};
use crate::params::{DecoderParams, PartialDecode};
use crate::stream::StreamCursor;

/// Opaque decoder handle.
#[repr(C)]
pub struct Vc2DecoderHandle {
    _private: [u8; 0],
}

/// User parameters. Non-zero integers enable the boolean options.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Vc2DecoderParamsUser {
    pub threads: c_int,
    pub numa_first_node: c_int,
    pub colourise_quantiser: c_int,
    pub colourise_padding: c_int,
    pub colourise_unpadded: c_int,
    pub partial_decode: c_int,
    pub partial_decode_offset_x: c_int,
    pub partial_decode_offset_y: c_int,
    pub partial_decode_width: c_int,
    pub partial_decode_height: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Vc2DecoderOutputFormat {
    pub width: c_int,
    pub height: c_int,
    pub signal_range: c_int,
    pub source_sampling: c_int,
    pub frame_rate_numer: c_int,
    pub frame_rate_denom: c_int,
    pub interlaced: c_int,
}

/// Resolved stream description and decode counters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Vc2DecoderSequenceInfo {
    pub major_version: u32,
    pub minor_version: u32,
    pub profile: u32,
    pub level: u32,
    pub base_video_format: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub color_diff_format_index: u32,
    pub source_sampling: u32,
    pub top_field_first: c_int,
    pub frame_rate_numer: u32,
    pub frame_rate_denom: u32,
    pub pixel_aspect_ratio_numer: u32,
    pub pixel_aspect_ratio_denom: u32,
    pub clean_width: u32,
    pub clean_height: u32,
    pub left_offset: u32,
    pub top_offset: u32,
    pub luma_offset: u32,
    pub luma_excursion: u32,
    pub color_diff_offset: u32,
    pub color_diff_excursion: u32,
    pub color_primaries: u32,
    pub color_matrix: u32,
    pub transfer_function: u32,
    pub picture_coding_mode: u32,
    pub wavelet_index: u32,
    pub wavelet_depth: u32,
    pub slices_x: u32,
    pub slices_y: u32,
    pub slice_prefix_bytes: u32,
    pub slice_size_scalar: u32,
    pub custom_quant_matrix_flag: c_int,
    pub sequence_headers_seen: u64,
    pub pictures_decoded: u64,
    pub last_picture_number: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Vc2DecoderParseSegment {
    pub parse_code: c_int,
    pub next_parse_offset: u32,
    pub previous_parse_offset: u32,
}

/// Runs `f`, turning a panic into `UnknownError`.
fn guarded(f: impl FnOnce() -> Result<DecodeStatus, Vc2DecoderError>) -> c_int {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result_code(result),
        Err(_) => Vc2DecoderError::UnknownError.code(),
    }
}

fn non_negative(v: c_int) -> Result<usize, Vc2DecoderError> {
    usize::try_from(v).map_err(|_| Vc2DecoderError::BadParams)
}

impl Vc2DecoderParamsUser {
    fn to_params(self) -> Result<DecoderParams, Vc2DecoderError> {
        let partial_decode = if self.partial_decode != 0 {
            Some(PartialDecode {
                offset_x: non_negative(self.partial_decode_offset_x)?,
                offset_y: non_negative(self.partial_decode_offset_y)?,
                width: non_negative(self.partial_decode_width)?,
                height: non_negative(self.partial_decode_height)?,
            })
        } else {
            None
        };
        Ok(DecoderParams {
            threads: non_negative(self.threads)?,
            numa_first_node: self.numa_first_node,
            colourise_quantiser: self.colourise_quantiser != 0,
            colourise_padding: self.colourise_padding != 0,
            colourise_unpadded: self.colourise_unpadded != 0,
            partial_decode,
            backend: None,
        })
    }
}

/// Builds a cursor over the caller's input.
///
/// # Safety
/// `data` and `length` must be valid, and `*data` must point to `*length`
/// readable bytes.
unsafe fn input<'a>(
    data: *mut *const c_uchar,
    length: *mut usize,
) -> Result<StreamCursor<'a>, Vc2DecoderError> {
    if data.is_null() || length.is_null() {
        return Err(Vc2DecoderError::BadParams);
    }
    let (ptr, len) = unsafe { (*data, *length) };
    if len == 0 {
        return Ok(StreamCursor::new(&[]));
    }
    if ptr.is_null() {
        return Err(Vc2DecoderError::BadParams);
    }
    Ok(StreamCursor::new(unsafe { std::slice::from_raw_parts(ptr, len) }))
}

/// Moves the caller's input past what `cursor` consumed.
///
/// # Safety
/// Same pointers as passed to [`input`].
unsafe fn advance(data: *mut *const c_uchar, length: *mut usize, cursor: &StreamCursor) {
    let used = cursor.position();
    if used > 0 {
        unsafe {
            *data = (*data).add(used);
            *length -= used;
        }
    }
}

/// # Safety
/// `handle` must be null or a live handle from `vc2decode_create`.
unsafe fn from_handle<'a>(handle: *mut Vc2DecoderHandle) -> Result<&'a mut Vc2Decoder, Vc2DecoderError> {
    if handle.is_null() {
        return Err(Vc2DecoderError::BadParams);
    }
    Ok(unsafe { &mut *(handle as *mut Vc2Decoder) })
}

/// Create a decoder with default parameters. Returns null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn vc2decode_create() -> *mut Vc2DecoderHandle {
    match catch_unwind(Vc2Decoder::new) {
        Ok(Ok(decoder)) => Box::into_raw(Box::new(decoder)) as *mut Vc2DecoderHandle,
        _ => ptr::null_mut(),
    }
}

/// Free a decoder handle.
///
/// # Safety
/// `handle` must be null or a handle from `vc2decode_create` that has not
/// been destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_destroy(handle: *mut Vc2DecoderHandle) {
    if !handle.is_null() {
        let _ = unsafe { Box::from_raw(handle as *mut Vc2Decoder) };
    }
}

/// Apply user parameters.
///
/// # Safety
/// `handle` must be a valid handle. `params` must point to a valid
/// `Vc2DecoderParamsUser`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_set_parameters(
    handle: *mut Vc2DecoderHandle,
    params: *const Vc2DecoderParamsUser,
) -> c_int {
    guarded(|| {
        let decoder = unsafe { from_handle(handle)? };
        if params.is_null() {
            return Err(Vc2DecoderError::BadParams);
        }
        let params = unsafe { *params }.to_params()?;
        decoder.set_params(params)?;
        Ok(DecodeStatus::Ok)
    })
}

/// Scan forward to the first sequence header and configure for it.
///
/// # Safety
/// `handle` must be valid. `*data` must point to `*length` readable bytes;
/// both are advanced past the consumed input.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_synchronise(
    handle: *mut Vc2DecoderHandle,
    data: *mut *const c_uchar,
    length: *mut usize,
    skip_aux: c_int,
) -> c_int {
    guarded(|| {
        let decoder = unsafe { from_handle(handle)? };
        let mut cursor = unsafe { input(data, length)? };
        let result = decoder.synchronise(&mut cursor, skip_aux != 0);
        unsafe { advance(data, length, &cursor) };
        result
    })
}

/// Decode data units until one yields a result for the caller.
///
/// # Safety
/// `handle` must be valid. `*data` must point to `*length` readable bytes;
/// both are advanced past the consumed input. `planes`, `strides` and
/// `lengths` must each point to three elements, and `planes[c]` must be
/// writable for `lengths[c]` samples.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_decode_one_picture(
    handle: *mut Vc2DecoderHandle,
    data: *mut *const c_uchar,
    length: *mut usize,
    planes: *const *mut u16,
    strides: *const usize,
    lengths: *const usize,
    skip_aux: c_int,
) -> c_int {
    guarded(|| {
        let decoder = unsafe { from_handle(handle)? };
        if planes.is_null() || strides.is_null() || lengths.is_null() {
            return Err(Vc2DecoderError::BadParams);
        }
        let (planes, strides, lengths) = unsafe {
            (
                std::slice::from_raw_parts(planes, 3),
                std::slice::from_raw_parts(strides, 3),
                std::slice::from_raw_parts(lengths, 3),
            )
        };
        if planes.iter().any(|p| p.is_null()) {
            return Err(Vc2DecoderError::BadParams);
        }
        let [y, u, v] = [0, 1, 2]
            .map(|c| unsafe { std::slice::from_raw_parts_mut(planes[c], lengths[c]) });
        let mut picture = PictureBuffer::new([y, u, v], [strides[0], strides[1], strides[2]]);

        let mut cursor = unsafe { input(data, length)? };
        let result = decoder.decode_one_picture(&mut cursor, &mut picture, skip_aux != 0);
        unsafe { advance(data, length, &cursor) };
        result
    })
}

/// Return the payload of the auxiliary data unit at the input and move past
/// it. The payload points into the caller's input.
///
/// # Safety
/// `handle` must be valid. `*data` must point to `*length` readable bytes.
/// `aux` and `aux_length` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_extract_aux(
    handle: *mut Vc2DecoderHandle,
    data: *mut *const c_uchar,
    length: *mut usize,
    aux: *mut *const c_uchar,
    aux_length: *mut usize,
) -> c_int {
    guarded(|| {
        let decoder = unsafe { from_handle(handle)? };
        if aux.is_null() || aux_length.is_null() {
            return Err(Vc2DecoderError::BadParams);
        }
        let mut cursor = unsafe { input(data, length)? };
        let payload = decoder.extract_aux(&mut cursor)?;
        unsafe {
            advance(data, length, &cursor);
            *aux = payload.as_ptr();
            *aux_length = payload.len();
        }
        Ok(DecodeStatus::Ok)
    })
}

/// Read the geometry of the pictures the decoder writes.
///
/// # Safety
/// `handle` must be valid. `format` must point to a writable
/// `Vc2DecoderOutputFormat`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_get_output_format(
    handle: *mut Vc2DecoderHandle,
    format: *mut Vc2DecoderOutputFormat,
) -> c_int {
    guarded(|| {
        let decoder = unsafe { from_handle(handle)? };
        if format.is_null() {
            return Err(Vc2DecoderError::BadParams);
        }
        let f = decoder.output_format()?;
        unsafe {
            *format = Vc2DecoderOutputFormat {
                width: f.width as c_int,
                height: f.height as c_int,
                signal_range: f.signal_range as c_int,
                source_sampling: f.source_sampling as c_int,
                frame_rate_numer: f.frame_rate_numer as c_int,
                frame_rate_denom: f.frame_rate_denom as c_int,
                interlaced: c_int::from(f.interlaced),
            };
        }
        Ok(DecodeStatus::Ok)
    })
}

/// Read the stream description and decode counters. Fields of headers not
/// yet seen are zero.
///
/// # Safety
/// `handle` must be valid. `info` must point to a writable
/// `Vc2DecoderSequenceInfo`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_get_sequence_info(
    handle: *mut Vc2DecoderHandle,
    info: *mut Vc2DecoderSequenceInfo,
) -> c_int {
    guarded(|| {
        let decoder = unsafe { from_handle(handle)? };
        if info.is_null() {
            return Err(Vc2DecoderError::BadParams);
        }
        let s = decoder.sequence_info();
        let mut out = Vc2DecoderSequenceInfo {
            sequence_headers_seen: s.sequence_headers_seen,
            pictures_decoded: s.pictures_decoded,
            last_picture_number: s.last_picture_number,
            ..Default::default()
        };
        if let Some(h) = &s.sequence_header {
            out.major_version = h.parse_parameters.major_version;
            out.minor_version = h.parse_parameters.minor_version;
            out.profile = h.parse_parameters.profile;
            out.level = h.parse_parameters.level;
            out.base_video_format = h.video_format.base_video_format;
            out.picture_coding_mode = h.picture_coding_mode;
        }
        if let Some(f) = &s.video_format {
            out.frame_width = f.frame_width;
            out.frame_height = f.frame_height;
            out.color_diff_format_index = f.color_diff_format_index;
            out.source_sampling = f.source_sampling;
            out.top_field_first = c_int::from(f.top_field_first);
            out.frame_rate_numer = f.frame_rate.numer;
            out.frame_rate_denom = f.frame_rate.denom;
            (out.pixel_aspect_ratio_numer, out.pixel_aspect_ratio_denom) = f.pixel_aspect_ratio;
            out.clean_width = f.clean_width;
            out.clean_height = f.clean_height;
            out.left_offset = f.left_offset;
            out.top_offset = f.top_offset;
            out.luma_offset = f.signal_range.luma_offset;
            out.luma_excursion = f.signal_range.luma_excursion;
            out.color_diff_offset = f.signal_range.color_diff_offset;
            out.color_diff_excursion = f.signal_range.color_diff_excursion;
            out.color_primaries = f.color_spec.color_primaries;
            out.color_matrix = f.color_spec.color_matrix;
            out.transfer_function = f.color_spec.transfer_function;
        }
        if let Some(t) = &s.transform_params {
            out.wavelet_index = t.wavelet as u32;
            out.wavelet_depth = t.depth;
            out.slices_x = t.slices_x;
            out.slices_y = t.slices_y;
            out.slice_prefix_bytes = t.slice_prefix_bytes;
            out.slice_size_scalar = t.slice_size_scalar;
            out.custom_quant_matrix_flag = c_int::from(t.custom_quant_matrix.is_some());
        }
        unsafe { *info = out };
        Ok(DecodeStatus::Ok)
    })
}

/// Parse the parse info header at `data`.
///
/// # Safety
/// `data` must point to `length` readable bytes. `segment` must point to a
/// writable `Vc2DecoderParseSegment`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vc2decode_parse_info(
    data: *const c_uchar,
    length: usize,
    segment: *mut Vc2DecoderParseSegment,
) -> c_int {
    guarded(|| {
        if data.is_null() || segment.is_null() {
            return Err(Vc2DecoderError::BadParams);
        }
        let bytes = unsafe { std::slice::from_raw_parts(data, length) };
        let info = crate::stream::parse_info(bytes)?;
        unsafe {
            *segment = Vc2DecoderParseSegment {
                parse_code: c_int::from(info.parse_code),
                next_parse_offset: info.next_parse_offset,
                previous_parse_offset: info.previous_parse_offset,
            };
        }
        Ok(DecodeStatus::Ok)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handles_are_rejected() {
        let mut format = Vc2DecoderOutputFormat::default();
        let code = unsafe { vc2decode_get_output_format(ptr::null_mut(), &mut format) };
        assert_eq!(code, Vc2DecoderError::BadParams.code());
        unsafe { vc2decode_destroy(ptr::null_mut()) };
    }

    #[test]
    fn test_parameters_round_trip_through_handle() {
        let handle = vc2decode_create();
        assert!(!handle.is_null());
        let params = Vc2DecoderParamsUser {
            threads: 4,
            numa_first_node: -1,
            colourise_padding: 1,
            ..Default::default()
        };
        assert_eq!(unsafe { vc2decode_set_parameters(handle, &params) }, 0);

        let bad = Vc2DecoderParamsUser {
            threads: 1,
            partial_decode: 1,
            partial_decode_width: -8,
            partial_decode_height: 8,
            ..Default::default()
        };
        assert_eq!(
            unsafe { vc2decode_set_parameters(handle, &bad) },
            Vc2DecoderError::BadParams.code()
        );

        let mut format = Vc2DecoderOutputFormat::default();
        assert_eq!(
            unsafe { vc2decode_get_output_format(handle, &mut format) },
            Vc2DecoderError::BadParams.code()
        );
        unsafe { vc2decode_destroy(handle) };
    }

    #[test]
    fn test_synchronise_advances_input() {
        let handle = vc2decode_create();
        let bytes = [0u8; 20];
        let mut data = bytes.as_ptr();
        let mut length = bytes.len();
        let code = unsafe { vc2decode_synchronise(handle, &mut data, &mut length, 1) };
        assert_eq!(code, DecodeStatus::EndOfSequence as c_int);
        assert_eq!(length, 0);
        assert_eq!(data, bytes[20..].as_ptr());
        unsafe { vc2decode_destroy(handle) };
    }

    #[test]
    fn test_parse_info() {
        let bytes = [0x42, 0x42, 0x43, 0x44, 0x10, 0, 0, 0, 0, 0, 0, 0, 13];
        let mut segment = Vc2DecoderParseSegment::default();
        assert_eq!(
            unsafe { vc2decode_parse_info(bytes.as_ptr(), bytes.len(), &mut segment) },
            0
        );
        assert_eq!(segment.parse_code, 0x10);
        assert_eq!(segment.next_parse_offset, 0);
        assert_eq!(segment.previous_parse_offset, 13);

        assert_eq!(
            unsafe { vc2decode_parse_info(bytes.as_ptr(), 4, &mut segment) },
            Vc2DecoderError::CoderOverrun.code()
        );
        assert_eq!(
            unsafe { vc2decode_parse_info(bytes[1..].as_ptr(), 12, &mut segment) },
            Vc2DecoderError::NotParseInfo.code()
        );
    }
}
