//! Input model: the bitmap lists produced by subtitle renderers.
//!
//! The compositor consumes these as-is; it never owns bitmap memory. A
//! producer tags every list and item with an opaque `change_id` that is
//! compared by equality to decide whether cached intermediates can be
//! reused.

/// Highest `render_index` a producer may use, and therefore the number of
/// per-stream part-cache slots a compositor keeps.
pub const MAX_OSD_PARTS: usize = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BitmapFormat {
    /// Placeholder producers use for cleared state; never rasterized.
    Empty,
    /// 8-bit coverage bitmaps plus one flat `0xRRGGBBAA` color per bitmap,
    /// where the low color byte encodes transparency (not opacity).
    Libass,
    /// Pre-scaled packed BGRA with premultiplied alpha.
    Rgba,
}

impl BitmapFormat {
    /// Whether the compositor can rasterize this format.
    pub const fn is_supported(self) -> bool {
        matches!(self, BitmapFormat::Libass | BitmapFormat::Rgba)
    }
}

/// One subtitle bitmap, positioned on the output frame.
///
/// For [`BitmapFormat::Libass`] the payload is a `w`x`h` coverage plane and
/// `dw`/`dh` are unused. For [`BitmapFormat::Rgba`] the payload is `w`x`h`
/// packed BGRA which is displayed at `dw`x`dh`.
#[derive(Clone, Copy, Debug)]
pub struct SubBitmap<'a> {
    pub bitmap: &'a [u8],
    /// Distance between payload rows, in bytes.
    pub stride: usize,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub dw: i32,
    pub dh: i32,
    /// Flat fill color for [`BitmapFormat::Libass`], `0xRRGGBBAA`.
    pub color: u32,
}

/// All bitmaps of one subtitle stream, in the producer's paint order.
#[derive(Clone, Debug)]
pub struct SubBitmaps<'a> {
    pub format: BitmapFormat,
    pub change_id: u64,
    /// Stable per-stream slot, `< MAX_OSD_PARTS`.
    pub render_index: usize,
    pub parts: Vec<SubBitmap<'a>>,
}

/// The full overlay state for one output frame.
#[derive(Clone, Debug, Default)]
pub struct SubBitmapList<'a> {
    pub change_id: u64,
    /// Bounding box the bitmaps were laid out for; the destination frame
    /// must be at least this large.
    pub w: usize,
    pub h: usize,
    pub items: Vec<SubBitmaps<'a>>,
}
