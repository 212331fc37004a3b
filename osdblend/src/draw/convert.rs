//! Conversion of the RGBA overlay into the video-colorspace intermediate.

use super::slices::{SLICE_W, TILE_H};
use super::{DrawStats, State};
use crate::error::Result;
use crate::frame::Rect;

impl State {
    /// Bring `video_overlay` (and `calpha_overlay`) up to date with the
    /// freshly rasterized RGBA overlay. In tiled mode only tiles with at
    /// least one marked slice are converted.
    pub(super) fn convert_to_video_overlay(&mut self, stats: &mut DrawStats) -> Result<()> {
        if self.video_overlay.is_none() {
            return Ok(());
        }

        if self.scale_in_tiles {
            let t_h = self.rgba_overlay.height() / TILE_H;
            for ty in 0..t_h {
                for sx in 0..self.slices.per_row() {
                    let pixels_set = (0..TILE_H).any(|y| {
                        let s = self.slices.row(ty * TILE_H + y)[sx];
                        s.x0 < s.x1
                    });
                    if !pixels_set {
                        continue;
                    }
                    self.convert_overlay_part(sx * SLICE_W, ty * TILE_H, SLICE_W, TILE_H)?;
                    stats.tiles_converted += 1;
                }
            }
        } else {
            let (w, h) = (self.rgba_overlay.width(), self.rgba_overlay.height());
            self.convert_overlay_part(0, 0, w, h)?;
            stats.tiles_converted += 1;
        }

        Ok(())
    }

    fn convert_overlay_part(&mut self, x0: usize, y0: usize, w: usize, h: usize) -> Result<()> {
        let rect = Rect {
            x0,
            y0,
            x1: x0 + w,
            y1: y0 + h,
        };

        {
            let vo = self.video_overlay.as_mut().expect("checked by caller");
            self.rgba_to_overlay
                .convert_rgba(vo, rect, &self.rgba_overlay, rect)?;
        }

        if let Some(calpha) = self.calpha_overlay.as_mut() {
            let vo = self.video_overlay.as_ref().expect("checked by caller");
            let desc = vo.desc();
            let (xs, ys) = (desc.chroma_xs, desc.chroma_ys);
            let aplane = desc.alpha_plane().expect("intermediate carries alpha");
            let crect = Rect {
                x0: x0 >> xs,
                y0: y0 >> ys,
                x1: (x0 + w) >> xs,
                y1: (y0 + h) >> ys,
            };
            let scaler = self.alpha_to_calpha.as_ref().expect("allocated with calpha");
            scaler.resample_alpha(calpha, crect, &vo.plane_view(aplane), rect, xs, ys)?;
        }

        Ok(())
    }
}
