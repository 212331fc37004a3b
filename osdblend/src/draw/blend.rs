//! The per-slice blend of the converted overlay into the video frame.
//!
//! Both sides are premultiplied in the float working format, so one kernel
//! covers every plane; only the source-alpha array differs (chroma planes
//! read the separately resampled chroma alpha).

use super::slices::{SLICE_W, assert_slice_aligned};
use super::{DrawStats, State};
use crate::frame::{FloatFrame, Frame};
use crate::util::chroma_div_up;

/// `dst = src + dst * (1 - src_alpha)`, premultiplied source-over.
#[inline]
pub(super) fn blend_line_f32(dst: &mut [f32], src: &[f32], src_a: &[f32]) {
    for ((d, &s), &a) in dst.iter_mut().zip(src).zip(src_a) {
        *d = s + *d * (1.0 - a);
    }
}

/// Blend one repacked strip. `w` is the strip width at luma resolution.
fn blend_slice(
    video_tmp: &mut FloatFrame,
    overlay_tmp: &FloatFrame,
    calpha_tmp: Option<&FloatFrame>,
    w: usize,
) {
    let chroma_ys = video_tmp.layout().chroma_ys;
    let a_plane = overlay_tmp.num_planes() - 1;

    for i in 0..video_tmp.num_planes() {
        let fp = video_tmp.layout().planes[i];
        debug_assert!(fp.ys <= chroma_ys);
        let rows = (1usize << chroma_ys) - (1usize << fp.ys) + 1;
        let cw = chroma_div_up(w, fp.xs);

        for y in 0..rows {
            let src = overlay_tmp.row(i, y);
            let src_a = if fp.xs != 0 || fp.ys != 0 {
                calpha_tmp
                    .expect("subsampled planes require chroma alpha")
                    .row(0, y)
            } else {
                overlay_tmp.row(a_plane, y)
            };
            let dst = video_tmp.row_mut(i, y);
            blend_line_f32(&mut dst[..cw], &src[..cw], &src_a[..cw]);
        }
    }
}

impl State {
    /// Repack, blend and write back every marked strip of `dst`.
    pub(super) fn blend_overlay_with_video(&mut self, dst: &mut Frame, stats: &mut DrawStats) {
        let xs = dst.desc().chroma_xs;
        let ys = dst.desc().chroma_ys;

        for y in (0..self.h).step_by(self.align_y) {
            for sx in 0..self.slices.per_row() {
                let s = self.slices.row(y)[sx];
                if s.x0 >= s.x1 {
                    continue;
                }
                let w = (s.x1 - s.x0) as usize;
                let x = sx * SLICE_W + s.x0 as usize;

                assert_slice_aligned(x, w, self.align_x);
                debug_assert!(x + w <= self.w);

                let overlay = self.video_overlay.as_ref().unwrap_or(&self.rgba_overlay);
                self.overlay_repack
                    .unpack_line(&mut self.overlay_tmp, 0, 0, overlay, x, y, w);
                self.video_repack
                    .unpack_line(&mut self.video_tmp, 0, 0, dst, x, y, w);
                if let (Some(repack), Some(calpha), Some(tmp)) = (
                    &self.calpha_repack,
                    &self.calpha_overlay,
                    &mut self.calpha_tmp,
                ) {
                    repack.unpack_line(tmp, 0, 0, calpha, x >> xs, y >> ys, w >> xs);
                }

                blend_slice(
                    &mut self.video_tmp,
                    &self.overlay_tmp,
                    self.calpha_tmp.as_ref(),
                    w,
                );

                self.video_repack.pack_line(dst, x, y, &self.video_tmp, 0, 0, w);
                stats.slices_blended += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_line_endpoints() {
        let mut dst = [0.5f32, 0.5, 0.5];
        let src = [1.0f32, 0.25, 0.0];
        let src_a = [1.0f32, 0.5, 0.0];
        blend_line_f32(&mut dst, &src, &src_a);
        // Opaque source replaces, half blends, transparent keeps.
        assert_eq!(dst[0], 1.0);
        assert_eq!(dst[1], 0.5);
        assert_eq!(dst[2], 0.5);
    }
}
