use crate::error::Vc2DecoderError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Parse codes outside the table are stream errors.
fn unknown_parse_code(_: u8) -> Vc2DecoderError {
    Vc2DecoderError::BadStream
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[num_enum(error_type(name = Vc2DecoderError, constructor = unknown_parse_code))]
#[repr(u8)]
pub enum ParseCode {
    /// Sequence header: parse parameters, video format and picture coding mode.
    SequenceHeader = 0x00,

    /// End of sequence.
    EndOfSequence = 0x10,

    /// Auxiliary data, passed through to the caller untouched.
    AuxiliaryData = 0x20,

    /// Padding data, skipped.
    PaddingData = 0x30,

    // The following picture types belong to other profiles and are rejected.
    /// Core syntax picture, arithmetic coded.
    CorePictureAc = 0x08,
    /// Core syntax picture, VLC coded.
    CorePictureVlc = 0x48,
    /// Low delay profile picture.
    LowDelayPicture = 0xC8,

    /// High quality profile picture, the only decodable picture type.
    HighQualityPicture = 0xE8,

    /// Low delay profile picture fragment.
    LowDelayFragment = 0xCC,
    /// High quality profile picture fragment.
    HighQualityFragment = 0xEC,
}

impl ParseCode {
    pub fn is_unsupported_picture(self) -> bool {
        matches!(
            self,
            Self::CorePictureAc | Self::CorePictureVlc | Self::LowDelayPicture
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(ParseCode::try_from(0xE8), Ok(ParseCode::HighQualityPicture));
        assert_eq!(ParseCode::try_from(0x10), Ok(ParseCode::EndOfSequence));
        assert!(ParseCode::try_from(0x48).unwrap().is_unsupported_picture());
        assert!(!ParseCode::HighQualityPicture.is_unsupported_picture());
        assert_eq!(ParseCode::try_from(0x77), Err(Vc2DecoderError::BadStream));
        assert_eq!(ParseCode::try_from(0x31), Err(Vc2DecoderError::BadStream));
    }

    #[test]
    fn test_codes_round_trip() {
        for code in [0x00u8, 0x10, 0x20, 0x30, 0x08, 0x48, 0xC8, 0xE8, 0xCC, 0xEC] {
            let parsed = ParseCode::try_from(code).unwrap();
            assert_eq!(u8::from(parsed), code);
        }
    }
}
