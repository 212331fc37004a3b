//! Software scaler: colorspace conversion of the overlay, chroma-rate alpha
//! resampling, sub-bitmap resizing, and the premultiply/unpremultiply
//! conversions.
//!
//! Everything operates on 8-bit frames; the conversion paths are exactly the
//! ones the compositor configures at reinit, and `supports` names them.

use crate::error::{DrawError, Result};
use crate::frame::format::{COMP_ALPHA, comp_range};
use crate::frame::{BgraView, Colorspace, Frame, FrameParams, ChromaLoc, Levels, PlaneView, Rect};
use crate::settings::ScaleFilter;
use crate::util::is_aligned;

pub struct Scaler {
    filter: ScaleFilter,
}

impl Scaler {
    pub fn new(filter: ScaleFilter) -> Scaler {
        Scaler { filter }
    }

    /// Whether a conversion path between the two parameter sets exists.
    pub fn supports(&self, dst: &FrameParams, src: &FrameParams) -> bool {
        use crate::frame::format::PixelFormat::Bgra;
        if dst.format == src.format && dst.w == src.w && dst.h == src.h {
            // Same layout: plain copies, and alpha-mode conversions for
            // formats that carry alpha.
            return dst.alpha == src.alpha || dst.desc().has_alpha();
        }
        if src.format == Bgra && dst.format == Bgra {
            return true;
        }
        if src.format == Bgra && !dst.desc().is_rgb && dst.w == src.w && dst.h == src.h {
            return true;
        }
        // The chroma-rate alpha resample: gray to gray, any size ratio.
        src.desc().planes.len() == 1
            && src.desc().planes == dst.desc().planes
            && !src.desc().is_rgb
    }

    fn unsupported(dst: &FrameParams, src: &FrameParams) -> DrawError {
        DrawError::ScalerUnsupported {
            src: src.format.name(),
            dst: dst.format.name(),
        }
    }

    /// Convert a rectangle of a packed premultiplied BGRA image into a
    /// YUV-family destination of the same size, downsampling chroma
    /// according to the destination's chroma location.
    pub fn convert_rgba(
        &self,
        dst: &mut Frame,
        dst_rect: Rect,
        src: &Frame,
        src_rect: Rect,
    ) -> Result<()> {
        let dp = *dst.params();
        if !self.supports(&dp, src.params()) || dp.desc().is_rgb {
            return Err(Self::unsupported(&dp, src.params()));
        }
        let desc = dp.desc();
        let (xs, ys) = (desc.chroma_xs, desc.chroma_ys);
        debug_assert!(xs <= 1 && ys <= 1);
        debug_assert_eq!(src_rect.w(), dst_rect.w());
        debug_assert_eq!(src_rect.h(), dst_rect.h());
        debug_assert!(is_aligned(dst_rect.x0 | dst_rect.x1, 1 << xs));
        debug_assert!(is_aligned(dst_rect.y0 | dst_rect.y1, 1 << ys));

        let (kr, kb) = matrix_coefficients(dp.colorspace);
        let kg = 1.0 - kr - kb;
        let (yoff, ymul, cmul) = match dp.levels {
            Levels::Limited => (16.0, 219.0, 224.0),
            Levels::Full => (0.0, 255.0, 255.0),
        };

        let (y_plane, y_off, y_step) = desc.locate_component(1).expect("luma");
        let (a_plane, a_off, a_step) = desc.locate_component(COMP_ALPHA).expect("alpha");
        let chroma: Vec<(usize, usize, usize, u8)> = [2u8, 3u8]
            .iter()
            .filter_map(|&c| desc.locate_component(c).map(|(p, o, s)| (p, o, s, c)))
            .collect();

        let (bw, bh) = (src_rect.w(), src_rect.h());
        let rows = 1usize << ys;
        let mut acc_cb = vec![0f32; bw];
        let mut acc_cr = vec![0f32; bw];

        for by in (0..bh).step_by(rows) {
            acc_cb.fill(0.0);
            acc_cr.fill(0.0);
            for r in 0..rows {
                let srow = src.row(0, src_rect.y0 + by + r);
                let dy = dst_rect.y0 + by + r;
                {
                    let drow = dst.row_mut(y_plane, dy);
                    for x in 0..bw {
                        let px = &srow[(src_rect.x0 + x) * 4..(src_rect.x0 + x) * 4 + 4];
                        let b = px[0] as f32 / 255.0;
                        let g = px[1] as f32 / 255.0;
                        let rr = px[2] as f32 / 255.0;
                        let y = kr * rr + kg * g + kb * b;
                        drow[(dst_rect.x0 + x) * y_step + y_off] =
                            (yoff + ymul * y).round().clamp(0.0, 255.0) as u8;
                        acc_cb[x] += (b - y) / (2.0 * (1.0 - kb));
                        acc_cr[x] += (rr - y) / (2.0 * (1.0 - kr));
                    }
                }
                let drow = dst.row_mut(a_plane, dy);
                for x in 0..bw {
                    drow[(dst_rect.x0 + x) * a_step + a_off] =
                        srow[(src_rect.x0 + x) * 4 + 3];
                }
            }

            let cy = (dst_rect.y0 + by) >> ys;
            let inv_rows = 1.0 / rows as f32;
            for &(plane, off, step, comp) in &chroma {
                let acc = if comp == 2 { &acc_cb } else { &acc_cr };
                let drow = dst.row_mut(plane, cy);
                for cx in 0..bw >> xs {
                    let c = if xs == 0 {
                        acc[cx]
                    } else {
                        match dp.chroma_location {
                            ChromaLoc::Center => 0.5 * (acc[cx * 2] + acc[cx * 2 + 1]),
                            ChromaLoc::Left => {
                                let l = acc[(cx * 2).saturating_sub(1)];
                                let m = acc[cx * 2];
                                let r = acc[(cx * 2 + 1).min(bw - 1)];
                                0.25 * (l + 2.0 * m + r)
                            }
                        }
                    } * inv_rows;
                    drow[((dst_rect.x0 >> xs) + cx) * step + off] =
                        (128.0 + cmul * c).round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        Ok(())
    }

    /// Box-downsample a gray plane by `(1 << xs, 1 << ys)`.
    pub fn resample_alpha(
        &self,
        dst: &mut Frame,
        dst_rect: Rect,
        src: &PlaneView<'_>,
        src_rect: Rect,
        xs: u32,
        ys: u32,
    ) -> Result<()> {
        debug_assert_eq!(dst_rect.w() << xs, src_rect.w());
        debug_assert_eq!(dst_rect.h() << ys, src_rect.h());
        let n = 1u32 << (xs + ys);
        for cy in 0..dst_rect.h() {
            for cx in 0..dst_rect.w() {
                let mut sum = 0u32;
                for ry in 0..1usize << ys {
                    let srow = src.row(src_rect.y0 + (cy << ys) + ry);
                    for rx in 0..1usize << xs {
                        sum += srow[src_rect.x0 + (cx << xs) + rx] as u32;
                    }
                }
                dst.row_mut(0, dst_rect.y0 + cy)[dst_rect.x0 + cx] = ((sum + n / 2) / n) as u8;
            }
        }
        Ok(())
    }

    /// Resize a packed BGRA rectangle to the destination frame's size.
    /// Premultiplied samples interpolate linearly, so no alpha handling is
    /// needed here.
    pub fn scale_bgra(&self, dst: &mut Frame, src: &BgraView<'_>) -> Result<()> {
        let (dw, dh) = (dst.width(), dst.height());
        let (sw, sh) = (src.w, src.h);
        debug_assert!(dw > 0 && dh > 0 && sw > 0 && sh > 0);
        match self.filter {
            ScaleFilter::Nearest => {
                for y in 0..dh {
                    let sy = (((y as f64 + 0.5) * sh as f64 / dh as f64) as usize).min(sh - 1);
                    let srow = src.row(sy);
                    let drow = dst.row_mut(0, y);
                    for x in 0..dw {
                        let sx = (((x as f64 + 0.5) * sw as f64 / dw as f64) as usize).min(sw - 1);
                        drow[x * 4..x * 4 + 4].copy_from_slice(&srow[sx * 4..sx * 4 + 4]);
                    }
                }
            }
            ScaleFilter::Bilinear => {
                for y in 0..dh {
                    let fy = ((y as f32 + 0.5) * sh as f32 / dh as f32 - 0.5).max(0.0);
                    let y0 = (fy as usize).min(sh - 1);
                    let y1 = (y0 + 1).min(sh - 1);
                    let wy = fy - y0 as f32;
                    let row0 = src.row(y0);
                    let row1 = src.row(y1);
                    let drow = dst.row_mut(0, y);
                    for x in 0..dw {
                        let fx = ((x as f32 + 0.5) * sw as f32 / dw as f32 - 0.5).max(0.0);
                        let x0 = (fx as usize).min(sw - 1);
                        let x1 = (x0 + 1).min(sw - 1);
                        let wx = fx - x0 as f32;
                        for c in 0..4 {
                            let top = lerp(row0[x0 * 4 + c] as f32, row0[x1 * 4 + c] as f32, wx);
                            let bot = lerp(row1[x0 * 4 + c] as f32, row1[x1 * 4 + c] as f32, wx);
                            drow[x * 4 + c] = lerp(top, bot, wy).round() as u8;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Convert a straight-alpha frame into its premultiplied equivalent.
    pub fn premultiply(&self, dst: &mut Frame, src: &Frame) -> Result<()> {
        self.alpha_convert(dst, src, true)
    }

    /// Convert a premultiplied frame back to straight alpha.
    pub fn unpremultiply(&self, dst: &mut Frame, src: &Frame) -> Result<()> {
        self.alpha_convert(dst, src, false)
    }

    fn alpha_convert(&self, dst: &mut Frame, src: &Frame, forward: bool) -> Result<()> {
        let desc = src.desc();
        if dst.params().format != src.params().format || !desc.has_alpha() {
            return Err(Self::unsupported(dst.params(), src.params()));
        }
        let levels = src.params().levels;
        let (a_plane, a_off, a_step) = desc.locate_component(COMP_ALPHA).expect("has alpha");

        // Alpha for one (possibly subsampled) sample position, averaged over
        // the covered macro-pixel block.
        let alpha_at = |x: usize, y: usize, xs: u32, ys: u32| -> f32 {
            let mut sum = 0u32;
            for ry in 0..1usize << ys {
                let row = src.row(a_plane, (y << ys) + ry);
                for rx in 0..1usize << xs {
                    sum += row[((x << xs) + rx) * a_step + a_off] as u32;
                }
            }
            sum as f32 / (1 << (xs + ys)) as f32 / 255.0
        };

        for (i, plane) in desc.planes.iter().enumerate() {
            let (xs, ys) = desc.plane_sub(i);
            let (pw, ph) = src.plane_dims(i);
            let step = plane.components.len();
            for y in 0..ph {
                for x in 0..pw {
                    for (ci, &comp) in plane.components.iter().enumerate() {
                        let v = src.row(i, y)[x * step + ci];
                        let out = if comp == COMP_ALPHA {
                            v
                        } else {
                            let range = comp_range(desc, comp, levels);
                            let a = alpha_at(x, y, xs, ys);
                            let f = v as f32 - range.off;
                            let f = if forward {
                                f * a
                            } else if a > 0.0 {
                                f / a
                            } else {
                                0.0
                            };
                            (f + range.off).round().clamp(0.0, 255.0) as u8
                        };
                        dst.row_mut(i, y)[x * step + ci] = out;
                    }
                }
            }
        }
        Ok(())
    }
}

#[inline(always)]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn matrix_coefficients(colorspace: Colorspace) -> (f32, f32) {
    match colorspace {
        Colorspace::Bt709 => (0.2126, 0.0722),
        // RGB targets never reach the conversion path; 601 is the fallback
        // for gray-only formats.
        Colorspace::Bt601 | Colorspace::Rgb => (0.299, 0.114),
    }
}
