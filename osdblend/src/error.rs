use thiserror::Error;

use crate::bitmaps::BitmapFormat;

#[derive(Debug, Error)]
pub enum DrawError {
    /// No registered pixel format matches the intermediate overlay layout
    /// derived from the target format.
    #[error("no compatible overlay format for target format {0}")]
    NoOverlayFormat(&'static str),

    /// The target format requires strip alignment beyond what the slice and
    /// tile geometry can carry.
    #[error("alignment {x}x{y} exceeds slice/tile limits")]
    AlignmentOutOfRange { x: usize, y: usize },

    /// The planar-float layouts of the overlay and the video disagree in a
    /// way the blend kernel cannot bridge.
    #[error("overlay and video plane layouts disagree")]
    PlaneLayoutMismatch,

    /// The scaler has no conversion path between the two image parameter
    /// sets.
    #[error("scaler cannot convert {src} to {dst}")]
    ScalerUnsupported {
        src: &'static str,
        dst: &'static str,
    },

    #[error("unsupported subtitle bitmap format {0:?}")]
    UnsupportedBitmapFormat(BitmapFormat),
}

pub type Result<T> = ::std::result::Result<T, DrawError>;
