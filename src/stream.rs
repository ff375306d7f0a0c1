//! Byte-level access to a VC-2 stream: a bounds-checked cursor and the
//! parse info headers that frame every data unit.

use crate::constants::{PARSE_INFO_HEADER_SIZE, PARSE_INFO_PREFIX};
use crate::error::Vc2DecoderError;
use crate::parse_code::ParseCode;

/// Read position over caller-supplied input. Every access is checked against
/// the end of the buffer and fails with `CoderOverrun` instead of reading past it.
#[derive(Debug, Clone)]
pub struct StreamCursor<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> StreamCursor<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn remaining(&self) -> usize {
        self.source.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    pub fn seek(&mut self, position: usize) -> Result<(), Vc2DecoderError> {
        if position > self.source.len() {
            return Err(Vc2DecoderError::CoderOverrun);
        }
        self.position = position;
        Ok(())
    }

    pub fn seek_to_end(&mut self) {
        self.position = self.source.len();
    }

    pub fn skip(&mut self, count: usize) -> Result<(), Vc2DecoderError> {
        let end = self
            .position
            .checked_add(count)
            .ok_or(Vc2DecoderError::CoderOverrun)?;
        self.seek(end)
    }

    pub fn read_u8(&mut self) -> Result<u8, Vc2DecoderError> {
        if self.position >= self.source.len() {
            return Err(Vc2DecoderError::CoderOverrun);
        }
        let val = self.source[self.position];
        self.position += 1;
        Ok(val)
    }

    pub fn read_u32(&mut self) -> Result<u32, Vc2DecoderError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Borrows the next `count` bytes and advances past them.
    pub fn take(&mut self, count: usize) -> Result<&'a [u8], Vc2DecoderError> {
        let start = self.position;
        self.skip(count)?;
        Ok(&self.source[start..self.position])
    }
}

/// A decoded parse info header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseInfo {
    pub parse_code: u8,
    pub next_parse_offset: u32,
    pub previous_parse_offset: u32,
}

impl ParseInfo {
    pub fn code(&self) -> Result<ParseCode, Vc2DecoderError> {
        ParseCode::try_from(self.parse_code)
    }

    /// Offset from the start of this header to the next one, if the stream says.
    pub fn next_header(&self) -> Option<usize> {
        match self.next_parse_offset {
            0 => None,
            n => Some(n as usize),
        }
    }

    pub fn previous_header(&self) -> Option<usize> {
        match self.previous_parse_offset {
            0 => None,
            n => Some(n as usize),
        }
    }

    /// Length of the data unit following the header, when the next offset is known.
    pub fn data_length(&self) -> Option<usize> {
        self.next_header().map(|n| n - PARSE_INFO_HEADER_SIZE)
    }

    pub fn to_bytes(&self) -> [u8; PARSE_INFO_HEADER_SIZE] {
        let mut out = [0u8; PARSE_INFO_HEADER_SIZE];
        out[..4].copy_from_slice(&PARSE_INFO_PREFIX);
        out[4] = self.parse_code;
        out[5..9].copy_from_slice(&self.next_parse_offset.to_be_bytes());
        out[9..13].copy_from_slice(&self.previous_parse_offset.to_be_bytes());
        out
    }
}

/// Decodes the parse info header at the start of `data`.
pub fn parse_info(data: &[u8]) -> Result<ParseInfo, Vc2DecoderError> {
    let prefix_len = data.len().min(PARSE_INFO_PREFIX.len());
    if data[..prefix_len] != PARSE_INFO_PREFIX[..prefix_len] {
        return Err(Vc2DecoderError::NotParseInfo);
    }
    if data.len() < PARSE_INFO_HEADER_SIZE {
        return Err(Vc2DecoderError::CoderOverrun);
    }

    let next_parse_offset = u32::from_be_bytes([data[5], data[6], data[7], data[8]]);
    let previous_parse_offset = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);

    if next_parse_offset != 0 && (next_parse_offset as usize) < PARSE_INFO_HEADER_SIZE {
        return Err(Vc2DecoderError::NotParseInfo);
    }

    Ok(ParseInfo {
        parse_code: data[4],
        next_parse_offset,
        previous_parse_offset,
    })
}

/// Scans forward byte by byte for the next valid parse info header and
/// returns its offset within `data`.
pub fn find_next_parse_info(data: &[u8]) -> Option<usize> {
    let mut offset = 0;
    while offset < data.len() {
        match parse_info(&data[offset..]) {
            Ok(_) => return Some(offset),
            Err(Vc2DecoderError::NotParseInfo) => offset += 1,
            Err(_) => return None,
        }
    }
    None
}
