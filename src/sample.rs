use crate::transform_params::SampleSize;

/// Storage type of wavelet-domain coefficients. Arithmetic is done in `i32`
/// (or `i64` for dequantisation) and truncated back on store.
pub trait Sample: Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    const SIZE: SampleSize;

    fn to_i32(self) -> i32;
    fn from_i32(v: i32) -> Self;
    fn from_i64(v: i64) -> Self;
}

impl Sample for i16 {
    const SIZE: SampleSize = SampleSize::Bits16;

    #[inline]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }

    #[inline]
    fn from_i32(v: i32) -> Self {
        v as i16
    }

    #[inline]
    fn from_i64(v: i64) -> Self {
        v as i16
    }
}

impl Sample for i32 {
    const SIZE: SampleSize = SampleSize::Bits32;

    #[inline]
    fn to_i32(self) -> i32 {
        self
    }

    #[inline]
    fn from_i32(v: i32) -> Self {
        v
    }

    #[inline]
    fn from_i64(v: i64) -> Self {
        v as i32
    }
}
