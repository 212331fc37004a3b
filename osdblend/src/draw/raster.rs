//! Rasterization of subtitle bitmaps into the RGBA overlay.

use super::DrawStats;
use super::slices::SliceMap;
use crate::bitmaps::{SubBitmap, SubBitmaps};
use crate::error::Result;
use crate::frame::format::PixelFormat;
use crate::frame::{AlphaMode, BgraView, Frame, FrameParams, Levels};
use crate::scale::Scaler;

const D: u32 = 255 * 255;

/// Per-stream cache of scaled intermediates for the pre-scaled RGBA path.
#[derive(Default)]
pub(super) struct Part {
    pub(super) change_id: Option<u64>,
    pub(super) imgs: Vec<Option<Frame>>,
}

/// Blit 8-bit coverage bitmaps with a flat fill color. The color is
/// `0xRRGGBBAA` with the low byte encoding transparency, so the effective
/// source is premultiplied `(v*B*A, v*G*A, v*R*A, v*A) / 255`.
pub(super) fn render_mono(overlay: &mut Frame, map: &mut SliceMap, sb: &SubBitmaps<'_>) {
    for s in &sb.parts {
        let (x, y) = (s.x as usize, s.y as usize);
        let (w, h) = (s.w as usize, s.h as usize);
        draw_mono_rgba(overlay, x, y, s);
        map.mark_rect(x, y, x + w, y + h);
    }
}

fn draw_mono_rgba(overlay: &mut Frame, x: usize, y: usize, s: &SubBitmap<'_>) {
    let r = (s.color >> 24) & 0xff;
    let g = (s.color >> 16) & 0xff;
    let b = (s.color >> 8) & 0xff;
    let a = 0xff - (s.color & 0xff);
    let (w, h) = (s.w as usize, s.h as usize);

    for j in 0..h {
        let src = &s.bitmap[j * s.stride..j * s.stride + w];
        let dst = &mut overlay.row_mut(0, y + j)[x * 4..(x + w) * 4];
        for (d, &v) in dst.chunks_exact_mut(4).zip(src) {
            let v = v as u32;
            let aa = a * v;
            let db = d[0] as u32;
            let dg = d[1] as u32;
            let dr = d[2] as u32;
            let da = d[3] as u32;
            d[0] = ((v * b * a + db * (D - aa)) / D) as u8;
            d[1] = ((v * g * a + dg * (D - aa)) / D) as u8;
            d[2] = ((v * r * a + dr * (D - aa)) / D) as u8;
            d[3] = ((aa * 255 + da * (D - aa)) / D) as u8;
        }
    }
}

/// Blit premultiplied BGRA over premultiplied BGRA.
fn draw_rgba(overlay: &mut Frame, x: usize, y: usize, src: &BgraView<'_>) {
    for j in 0..src.h {
        let srow = src.row(j);
        let dst = &mut overlay.row_mut(0, y + j)[x * 4..(x + src.w) * 4];
        for (d, s) in dst.chunks_exact_mut(4).zip(srow.chunks_exact(4)) {
            let f = D - s[3] as u32;
            d[0] = (s[0] as u32 + d[0] as u32 * f / D).min(255) as u8;
            d[1] = (s[1] as u32 + d[1] as u32 * f / D).min(255) as u8;
            d[2] = (s[2] as u32 + d[2] as u32 * f / D).min(255) as u8;
            d[3] = (s[3] as u32 + d[3] as u32 * f / D).min(255) as u8;
        }
    }
}

pub(super) struct ClippedPart {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
    pub sx: usize,
    pub sy: usize,
    pub sw: usize,
    pub sh: usize,
}

impl ClippedPart {
    pub fn dw(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn dh(&self) -> usize {
        self.y1 - self.y0
    }
}

/// Clip the destination rectangle of a part to the target bounds, and carry
/// the clip over to the source rectangle. The source is clipped rather than
/// the scaled image so that a ridiculous scale factor cannot explode memory
/// use, even if integer rounding stretches the result by up to a pixel.
pub(super) fn clip_part(s: &SubBitmap<'_>, bound_w: usize, bound_h: usize) -> Option<ClippedPart> {
    let sx0 = s.x;
    let sy0 = s.y;
    let sx1 = s.x + s.dw;
    let sy1 = s.y + s.dh;

    let x0 = sx0.clamp(0, bound_w as i32);
    let y0 = sy0.clamp(0, bound_h as i32);
    let x1 = sx1.clamp(0, bound_w as i32);
    let y1 = sy1.clamp(0, bound_h as i32);

    let dw = x1 - x0;
    let dh = y1 - y0;
    if dw <= 0 || dh <= 0 {
        return None;
    }

    let mut sx = 0i32;
    let mut sy = 0i32;
    let mut sw = s.w;
    let mut sh = s.h;
    if x0 != sx0 || y0 != sy0 || x1 != sx1 || y1 != sy1 {
        let fx = s.dw as f64 / s.w as f64;
        let fy = s.dh as f64 / s.h as f64;
        sx = (((x0 - sx0) as f64 / fx) as i32).clamp(0, s.w);
        sy = (((y0 - sy0) as f64 / fy) as i32).clamp(0, s.h);
        sw = ((dw as f64 / fx) as i32).clamp(1, s.w);
        sh = ((dh as f64 / fy) as i32).clamp(1, s.h);
    }

    assert!(sx >= 0 && sw > 0 && sx + sw <= s.w);
    assert!(sy >= 0 && sh > 0 && sy + sh <= s.h);

    Some(ClippedPart {
        x0: x0 as usize,
        y0: y0 as usize,
        x1: x1 as usize,
        y1: y1 as usize,
        sx: sx as usize,
        sy: sy as usize,
        sw: sw as usize,
        sh: sh as usize,
    })
}

/// Rasterize pre-scaled premultiplied BGRA bitmaps, resizing through the
/// per-stream part cache where destination and source sizes differ.
pub(super) fn render_rgba(
    overlay: &mut Frame,
    map: &mut SliceMap,
    part: &mut Part,
    scaler: &Scaler,
    stats: &mut DrawStats,
    sb: &SubBitmaps<'_>,
) -> Result<()> {
    if part.change_id != Some(sb.change_id) {
        part.imgs.clear();
        part.imgs.resize_with(sb.parts.len(), || None);
        part.change_id = Some(sb.change_id);
    }

    let (bound_w, bound_h) = map.bounds();
    for (i, s) in sb.parts.iter().enumerate() {
        let Some(c) = clip_part(s, bound_w, bound_h) else {
            continue;
        };

        let full = BgraView::new(s.bitmap, s.stride, s.w as usize, s.h as usize);
        let clipped = full.sub_view(c.sx, c.sy, c.sw, c.sh);

        if (c.dw(), c.dh()) != (c.sw, c.sh) {
            if part.imgs[i].is_none() {
                let mut params = FrameParams::new(c.dw(), c.dh(), PixelFormat::Bgra);
                params.levels = Levels::Full;
                params.alpha = AlphaMode::Premultiplied;
                let mut scaled = Frame::new(params);
                scaler.scale_bgra(&mut scaled, &clipped)?;
                stats.parts_scaled += 1;
                part.imgs[i] = Some(scaled);
            }
            let scaled = part.imgs[i].as_ref().expect("just rendered");
            debug_assert_eq!((scaled.width(), scaled.height()), (c.dw(), c.dh()));
            draw_rgba(overlay, c.x0, c.y0, &scaled.bgra_view());
        } else {
            draw_rgba(overlay, c.x0, c.y0, &clipped);
        }

        map.mark_rect(c.x0, c.y0, c.x1, c.y1);
    }

    Ok(())
}
