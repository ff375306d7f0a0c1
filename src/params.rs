use crate::backend::BackendKind;
use crate::error::Vc2DecoderError;

/// Output rectangle, in picture coordinates, to decode instead of the whole
/// picture. For interlaced streams the rectangle is in field coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialDecode {
    pub offset_x: usize,
    pub offset_y: usize,
    pub width: usize,
    pub height: usize,
}

/// Debug overlays that replace the chroma planes with a visualisation of a
/// property of each job's slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColouriseMode {
    /// Chroma scaled by slice quantiser index.
    Quantiser,
    /// Chroma scaled by the number of unused bytes in each slice.
    Padding,
    /// Full scale where a slice has no unused bytes, midpoint elsewhere.
    Unpadded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderParams {
    pub threads: usize,
    /// First CPU node for worker affinity. Recorded only.
    pub numa_first_node: i32,
    pub colourise_quantiser: bool,
    pub colourise_padding: bool,
    pub colourise_unpadded: bool,
    pub partial_decode: Option<PartialDecode>,
    /// Forces a kernel set instead of detecting one.
    pub backend: Option<BackendKind>,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self {
            threads: 1,
            numa_first_node: -1,
            colourise_quantiser: false,
            colourise_padding: false,
            colourise_unpadded: false,
            partial_decode: None,
            backend: None,
        }
    }
}

impl DecoderParams {
    pub fn validate(&self) -> Result<(), Vc2DecoderError> {
        if self.threads == 0 {
            log::error!("Thread count must be at least 1");
            return Err(Vc2DecoderError::BadParams);
        }
        if let Some(p) = self.partial_decode {
            if p.width == 0 || p.height == 0 {
                log::error!("Partial decode rectangle is empty");
                return Err(Vc2DecoderError::BadParams);
            }
        }
        Ok(())
    }

    /// The active overlay. Quantiser takes precedence over padding, padding
    /// over unpadded.
    pub fn colourise(&self) -> Option<ColouriseMode> {
        if self.colourise_quantiser {
            Some(ColouriseMode::Quantiser)
        } else if self.colourise_padding {
            Some(ColouriseMode::Padding)
        } else if self.colourise_unpadded {
            Some(ColouriseMode::Unpadded)
        } else {
            None
        }
    }
}
