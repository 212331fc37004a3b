//! Strip conversion between a format's storage layout and its planar
//! float32 expansion.
//!
//! A "line" is a strip `align_y` rows tall: one chroma macro-row. Callers
//! must keep `x`, `y` and `w` aligned to `align_x`/`align_y`; subsampled
//! planes then land exactly on sample boundaries.

use crate::frame::format::{CompRange, FloatLayout, PixelFormat, comp_range};
use crate::frame::{FloatFrame, Frame, FrameParams};
use crate::util::is_aligned;

struct CompMap {
    /// Storage plane and sample position inside a packed group.
    plane: usize,
    offset: usize,
    step: usize,
    xs: u32,
    ys: u32,
    range: CompRange,
}

pub struct Repack {
    format: PixelFormat,
    layout: FloatLayout,
    align_x: usize,
    align_y: usize,
    maps: Vec<CompMap>,
}

impl Repack {
    pub fn new(params: &FrameParams) -> Repack {
        let desc = params.desc();
        let layout = desc.float_layout();
        let maps = layout
            .planes
            .iter()
            .map(|fp| {
                let (plane, offset, step) = desc
                    .locate_component(fp.component)
                    .expect("layout derived from desc");
                CompMap {
                    plane,
                    offset,
                    step,
                    xs: fp.xs,
                    ys: fp.ys,
                    range: comp_range(desc, fp.component, params.levels),
                }
            })
            .collect();
        Repack {
            format: params.format,
            layout,
            align_x: 1 << desc.chroma_xs,
            align_y: 1 << desc.chroma_ys,
            maps,
        }
    }

    pub fn align_x(&self) -> usize {
        self.align_x
    }

    pub fn align_y(&self) -> usize {
        self.align_y
    }

    pub fn float_layout(&self) -> &FloatLayout {
        &self.layout
    }

    /// Convert one aligned strip from storage into float planes.
    pub fn unpack_line(
        &self,
        dst: &mut FloatFrame,
        dst_x: usize,
        dst_y: usize,
        src: &Frame,
        src_x: usize,
        src_y: usize,
        w: usize,
    ) {
        debug_assert_eq!(src.params().format, self.format);
        debug_assert!(is_aligned(src_x | dst_x | w, self.align_x));
        debug_assert!(is_aligned(src_y | dst_y, self.align_y));
        for (i, m) in self.maps.iter().enumerate() {
            let rows = self.align_y >> m.ys;
            let cw = w >> m.xs;
            for r in 0..rows {
                let s = src.row(m.plane, (src_y >> m.ys) + r);
                let d = dst.row_mut(i, (dst_y >> m.ys) + r);
                let sx = (src_x >> m.xs) * m.step + m.offset;
                let dx = dst_x >> m.xs;
                for k in 0..cw {
                    d[dx + k] = (s[sx + k * m.step] as f32 - m.range.off) / m.range.mul;
                }
            }
        }
    }

    /// Convert one aligned strip from float planes back into storage,
    /// rounding and clamping to the 8-bit sample range.
    pub fn pack_line(
        &self,
        dst: &mut Frame,
        dst_x: usize,
        dst_y: usize,
        src: &FloatFrame,
        src_x: usize,
        src_y: usize,
        w: usize,
    ) {
        debug_assert_eq!(dst.params().format, self.format);
        debug_assert!(is_aligned(src_x | dst_x | w, self.align_x));
        debug_assert!(is_aligned(src_y | dst_y, self.align_y));
        for (i, m) in self.maps.iter().enumerate() {
            let rows = self.align_y >> m.ys;
            let cw = w >> m.xs;
            for r in 0..rows {
                let s = src.row(i, (src_y >> m.ys) + r);
                let d = dst.row_mut(m.plane, (dst_y >> m.ys) + r);
                let dx = (dst_x >> m.xs) * m.step + m.offset;
                let sx = src_x >> m.xs;
                for k in 0..cw {
                    let v = s[sx + k] * m.range.mul + m.range.off;
                    d[dx + k * m.step] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}
