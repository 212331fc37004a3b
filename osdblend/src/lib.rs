//! Subtitle/OSD compositor: blends overlay bitmaps onto decoded video
//! frames whose pixel format, colorspace, chroma subsampling and alpha
//! convention may all differ from the overlay's native RGBA.
//!
//! The pipeline rasterizes subtitle bitmaps into a single premultiplied
//! RGBA overlay, converts it to an intermediate matching the video's
//! colorspace and chroma layout, and blends marked strips through a planar
//! float32 working format. All buffers, scalers and converters live on a
//! [`Compositor`] and are reused across frames; the overlay is only
//! repainted when the producer's change id moves.

pub mod bitmaps;
pub mod draw;
pub mod error;
pub mod frame;
pub mod repack;
pub mod scale;
pub mod settings;
mod util;

pub use bitmaps::{BitmapFormat, MAX_OSD_PARTS, SubBitmap, SubBitmapList, SubBitmaps};
pub use draw::{Compositor, DrawStats, SLICE_W, TILE_H};
pub use error::{DrawError, Result};
pub use frame::format::PixelFormat;
pub use frame::{AlphaMode, ChromaLoc, Colorspace, Frame, FrameParams, Levels};
pub use settings::{ScaleFilter, Settings};
