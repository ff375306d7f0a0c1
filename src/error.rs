use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Failure family of the decoder result codes. Discriminants are the values
/// seen across the C ABI and must not change.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Vc2DecoderError {
    #[error("Bad parameters")]
    BadParams = -1,
    #[error("Decode failed")]
    DecodeFailed = -2,
    #[error("Bad thread")]
    BadThread = -3,
    #[error("Not implemented")]
    NotImplemented = -4,
    #[error("No quantiser")]
    NoQuantiser = -5,
    #[error("Coder overrun")]
    CoderOverrun = -6,
    #[error("Not a parse info header")]
    NotParseInfo = -7,
    #[error("Bad stream")]
    BadStream = -8,

    #[error("Unknown error")]
    UnknownError = -99,
}

impl Vc2DecoderError {
    pub fn code(self) -> i32 {
        self.into()
    }

    /// Stream-syntax errors leave the decoder usable; the caller resynchronises.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::NotParseInfo | Self::BadStream | Self::CoderOverrun
        )
    }
}

/// Success family of the decoder result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum DecodeStatus {
    Ok = 0,
    EndOfSequence = 1,
    Reconfigured = 2,
    Picture = 3,
    Auxiliary = 4,
    InvalidPicture = 5,
}

/// Folds a decoder result into the integer code used by C callers.
pub fn result_code(result: Result<DecodeStatus, Vc2DecoderError>) -> i32 {
    match result {
        Ok(status) => status.into(),
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_codes_are_stable() {
        assert_eq!(result_code(Ok(DecodeStatus::Ok)), 0);
        assert_eq!(result_code(Ok(DecodeStatus::EndOfSequence)), 1);
        assert_eq!(result_code(Ok(DecodeStatus::Reconfigured)), 2);
        assert_eq!(result_code(Ok(DecodeStatus::Picture)), 3);
        assert_eq!(result_code(Ok(DecodeStatus::Auxiliary)), 4);
        assert_eq!(result_code(Ok(DecodeStatus::InvalidPicture)), 5);

        assert_eq!(result_code(Err(Vc2DecoderError::BadParams)), -1);
        assert_eq!(result_code(Err(Vc2DecoderError::DecodeFailed)), -2);
        assert_eq!(result_code(Err(Vc2DecoderError::BadThread)), -3);
        assert_eq!(result_code(Err(Vc2DecoderError::NotImplemented)), -4);
        assert_eq!(result_code(Err(Vc2DecoderError::NoQuantiser)), -5);
        assert_eq!(result_code(Err(Vc2DecoderError::CoderOverrun)), -6);
        assert_eq!(result_code(Err(Vc2DecoderError::NotParseInfo)), -7);
        assert_eq!(result_code(Err(Vc2DecoderError::BadStream)), -8);
        assert_eq!(result_code(Err(Vc2DecoderError::UnknownError)), -99);
    }

    #[test]
    fn test_codes_convert_back() {
        assert_eq!(DecodeStatus::try_from(3), Ok(DecodeStatus::Picture));
        assert!(DecodeStatus::try_from(6).is_err());
        assert_eq!(
            Vc2DecoderError::try_from(-6),
            Ok(Vc2DecoderError::CoderOverrun)
        );
        assert_eq!(Vc2DecoderError::try_from(-99), Ok(Vc2DecoderError::UnknownError));
        assert_eq!(Vc2DecoderError::try_from(-42).map_err(|e| e.number), Err(-42));
    }
}
