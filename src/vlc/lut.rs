//! Byte-at-a-time transition table for the coefficient code.

use super::{STATE_DATA, STATE_FOLLOW, STATE_SIGN, STATE_START};

/// Effect of feeding one input byte to the decoder in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlcLutEntry {
    /// Magnitude bits appended to the value carried in from the previous byte.
    pub carry_shift: u8,
    pub carry_bits: u8,
    /// Sign of the carried value if it terminates in this byte, 0 otherwise.
    pub carry_sign: i8,
    /// Values that start and finish inside this byte, in order.
    pub values: [i8; 8],
    pub count: u8,
    /// The carried value is finished; continue from `tail` instead.
    pub restart: bool,
    pub tail: u8,
    pub next_state: u8,
}

const EMPTY: VlcLutEntry = VlcLutEntry {
    carry_shift: 0,
    carry_bits: 0,
    carry_sign: 0,
    values: [0; 8],
    count: 0,
    restart: false,
    tail: 0,
    next_state: STATE_START,
};

const fn build_entry(state: u8, byte: u8) -> VlcLutEntry {
    let mut entry = EMPTY;
    let mut carry = state != STATE_START;
    let mut st = state;
    let mut v: i32 = 0;

    let mut i = 0;
    while i < 8 {
        let bit = (byte >> (7 - i)) & 1;
        match st {
            STATE_START => {
                if bit == 1 {
                    entry.values[entry.count as usize] = 0;
                    entry.count += 1;
                } else {
                    v = 1;
                    st = STATE_DATA;
                }
            }
            STATE_DATA => {
                if carry {
                    entry.carry_shift += 1;
                    entry.carry_bits = (entry.carry_bits << 1) | bit;
                } else {
                    v = (v << 1) | bit as i32;
                }
                st = STATE_FOLLOW;
            }
            STATE_FOLLOW => {
                st = if bit == 1 { STATE_SIGN } else { STATE_DATA };
            }
            _ => {
                let sign: i8 = if bit == 0 { 1 } else { -1 };
                if carry {
                    entry.carry_sign = sign;
                    carry = false;
                } else {
                    entry.values[entry.count as usize] = sign * (v - 1) as i8;
                    entry.count += 1;
                }
                v = 0;
                st = STATE_START;
            }
        }
        i += 1;
    }

    entry.restart = !carry;
    entry.tail = v as u8;
    entry.next_state = st;
    entry
}

pub const VLC_LUT: [[VlcLutEntry; 256]; 4] = {
    let mut lut = [[EMPTY; 256]; 4];
    let states = [STATE_START, STATE_DATA, STATE_FOLLOW, STATE_SIGN];
    let mut s = 0;
    while s < 4 {
        let mut byte: usize = 0;
        while byte < 256 {
            lut[s][byte] = build_entry(states[s], byte as u8);
            byte += 1;
        }
        s += 1;
    }
    lut
};
