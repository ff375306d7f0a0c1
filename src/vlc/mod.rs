//! Coefficient entropy decoding.
//!
//! Each coefficient is coded as interleaved exp-Golomb: a leading 1 codes a
//! zero, otherwise magnitude bits alternate with follow bits and a final sign
//! bit. Input exhausted before the output is full is read as 1 bits, which
//! terminates any open value and fills the rest with zeros.

pub mod lut;

use lut::VLC_LUT;

pub const STATE_START: u8 = 0;
pub const STATE_DATA: u8 = 1;
pub const STATE_FOLLOW: u8 = 2;
pub const STATE_SIGN: u8 = 3;

fn signed(magnitude_plus_one: i32, sign: i32) -> i32 {
    magnitude_plus_one.wrapping_sub(1).wrapping_mul(sign)
}

/// Bit-serial decoder. Returns the padding left once `output` is full: the
/// input bytes after the first one not consumed, matching a decoder that has
/// already fetched that byte.
pub fn decode_reference(input: &[u8], output: &mut [i32]) -> usize {
    let mut state = STATE_START;
    let mut v: i32 = 0;
    let mut pos = 0;
    let mut bit_n = 7;
    let mut n = 0;

    while n < output.len() {
        let bit = if pos < input.len() {
            let b = (input[pos] >> bit_n) & 1;
            if bit_n == 0 {
                bit_n = 7;
                pos += 1;
            } else {
                bit_n -= 1;
            }
            i32::from(b)
        } else {
            1
        };

        match state {
            STATE_START => {
                if bit == 1 {
                    output[n] = 0;
                    n += 1;
                } else {
                    v = 1;
                    state = STATE_DATA;
                }
            }
            STATE_DATA => {
                v = v.wrapping_shl(1).wrapping_add(bit);
                state = STATE_FOLLOW;
            }
            STATE_FOLLOW => {
                state = if bit == 1 { STATE_SIGN } else { STATE_DATA };
            }
            _ => {
                output[n] = signed(v, if bit == 0 { 1 } else { -1 });
                n += 1;
                v = 0;
                state = STATE_START;
            }
        }
    }

    if pos < input.len() {
        let consumed = pos + usize::from(bit_n != 7);
        (input.len() - consumed).saturating_sub(1)
    } else {
        0
    }
}

/// Table-driven decoder, one input byte per step. Produces exactly the same
/// coefficients and padding as [`decode_reference`].
pub fn decode_lut(input: &[u8], output: &mut [i32]) -> usize {
    let capacity = output.len();
    let mut state = STATE_START;
    let mut v: i32 = 0;
    let mut n = 0;

    for (i, &byte) in input.iter().enumerate() {
        if n >= capacity {
            return input.len() - i - 1;
        }
        let entry = &VLC_LUT[state as usize][byte as usize];

        let v_cont = v.wrapping_shl(u32::from(entry.carry_shift)) | i32::from(entry.carry_bits);
        if entry.carry_sign != 0 {
            output[n] = signed(v_cont, i32::from(entry.carry_sign));
            n += 1;
        }

        let take = usize::from(entry.count).min(capacity - n);
        for (out, &value) in output[n..n + take].iter_mut().zip(&entry.values) {
            *out = i32::from(value);
        }
        n += take;

        v = if entry.restart {
            i32::from(entry.tail)
        } else {
            v_cont
        };
        state = entry.next_state;
    }

    let rest = &mut output[n..];
    if let Some(first) = rest.first_mut() {
        match state {
            STATE_DATA => *first = signed(v.wrapping_shl(1).wrapping_add(1), -1),
            STATE_FOLLOW | STATE_SIGN => *first = signed(v, -1),
            _ => *first = 0,
        }
        rest[1..].fill(0);
    }
    0
}
