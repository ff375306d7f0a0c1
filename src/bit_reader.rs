use crate::error::Vc2DecoderError;

/// MSB-first bit reader for the header syntax (sequence header, transform
/// parameters). Running off the end of the unit is a `CoderOverrun`.
pub struct Vc2BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_num: u8,
}

impl<'a> Vc2BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_num: 7,
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, Vc2DecoderError> {
        let byte = *self.data.get(self.pos).ok_or(Vc2DecoderError::CoderOverrun)?;
        let bit = (byte >> self.bit_num) & 1;
        if self.bit_num == 0 {
            self.bit_num = 7;
            self.pos += 1;
        } else {
            self.bit_num -= 1;
        }
        Ok(bit == 1)
    }

    /// Interleaved exp-Golomb unsigned integer.
    pub fn read_uint(&mut self) -> Result<u32, Vc2DecoderError> {
        let mut value: u64 = 1;
        while !self.read_bool()? {
            value <<= 1;
            if self.read_bool()? {
                value |= 1;
            }
            if value > u64::from(u32::MAX) + 1 {
                return Err(Vc2DecoderError::BadStream);
            }
        }
        Ok((value - 1) as u32)
    }

    pub fn byte_align(&mut self) {
        if self.bit_num != 7 {
            self.bit_num = 7;
            self.pos += 1;
        }
    }

    /// Bytes consumed so far, counting a partially read byte.
    pub fn position(&self) -> usize {
        if self.bit_num == 7 { self.pos } else { self.pos + 1 }
    }
}
