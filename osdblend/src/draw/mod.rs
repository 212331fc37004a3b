//! The compositor cache and its public entry point.
//!
//! A [`Compositor`] owns every buffer, scaler and repacker the pipeline
//! needs, keyed by the destination frame's parameters. Draw calls reuse the
//! cached overlay wholesale while the bitmap list's change id is unchanged,
//! repaint it when the id moves, and rebuild everything when the target
//! parameters change.

mod blend;
mod convert;
mod raster;
mod slices;

pub use slices::{SLICE_W, Slice, SliceMap, TILE_H};

use raster::Part;
use tracing::debug;

use crate::bitmaps::{BitmapFormat, MAX_OSD_PARTS, SubBitmapList, SubBitmaps};
use crate::error::{DrawError, Result};
use crate::frame::format::{COMP_ALPHA, FormatQuery, MAX_PLANES, PixelFormat, find_format};
use crate::frame::{AlphaMode, ChromaLoc, Colorspace, FloatFrame, Frame, FrameParams, Levels};
use crate::repack::Repack;
use crate::scale::Scaler;
use crate::settings::Settings;
use crate::util::align_up;

/// Counters over the cached pipeline, for tests and diagnostics. Reset when
/// the cache is rebuilt.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DrawStats {
    /// Overlay repaints (the list's change id moved).
    pub repaints: u64,
    /// Overlay-to-video conversion calls: tiles in tiled mode, whole images
    /// otherwise.
    pub tiles_converted: u64,
    /// Sub-bitmap resizes that missed the part cache.
    pub parts_scaled: u64,
    /// Strips blended into a destination frame.
    pub slices_blended: u64,
}

struct PremulBracket {
    premul: Scaler,
    unpremul: Scaler,
    tmp: Frame,
}

struct State {
    params: FrameParams,
    /// Target size rounded up to the repack alignment.
    w: usize,
    h: usize,
    align_x: usize,
    align_y: usize,
    change_id: Option<u64>,
    parts: Vec<Part>,
    slices: SliceMap,
    scale_in_tiles: bool,

    /// All OSD bitmaps rasterized as premultiplied BGRA.
    rgba_overlay: Frame,
    /// The overlay in the video's colorspace and chroma layout; `None` when
    /// the RGBA overlay already matches.
    video_overlay: Option<Frame>,
    /// The intermediate's alpha plane resampled to chroma resolution.
    calpha_overlay: Option<Frame>,

    sub_scale: Scaler,
    rgba_to_overlay: Scaler,
    alpha_to_calpha: Option<Scaler>,

    overlay_repack: Repack,
    video_repack: Repack,
    calpha_repack: Option<Repack>,

    overlay_tmp: FloatFrame,
    video_tmp: FloatFrame,
    calpha_tmp: Option<FloatFrame>,

    premul: Option<PremulBracket>,
}

/// The compositor and its frame-to-frame cache.
///
/// Every call runs to completion on the calling thread; there is no shared
/// state between compositors, so concurrent rendering needs one
/// `Compositor` per consumer.
pub struct Compositor {
    settings: Settings,
    stats: DrawStats,
    state: Option<State>,
}

impl Default for Compositor {
    fn default() -> Self {
        Compositor::new()
    }
}

impl Compositor {
    pub fn new() -> Compositor {
        Compositor::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Compositor {
        Compositor {
            settings,
            stats: DrawStats::default(),
            state: None,
        }
    }

    /// Composite `list` into `dst`.
    ///
    /// On configuration errors the cache is cleared and the destination is
    /// untouched; on conversion errors the cache is retained for a retry and
    /// `dst` is unmodified unless blending had already begun.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn draw(&mut self, dst: &mut Frame, list: &SubBitmapList<'_>) -> Result<()> {
        debug_assert!(dst.width() >= list.w && dst.height() >= list.h);

        if self.state.as_ref().is_none_or(|s| s.params != *dst.params()) {
            self.state = None;
            self.stats = DrawStats::default();
            self.state = Some(State::new(dst.params(), &self.settings)?);
        }
        let state = self.state.as_mut().expect("initialized above");

        if state.change_id != Some(list.change_id) {
            state.change_id = Some(list.change_id);
            self.stats.repaints += 1;

            state.clear_rgba_overlay();
            for item in &list.items {
                state.render_item(item, &mut self.stats)?;
            }
            state.convert_to_video_overlay(&mut self.stats)?;
        }

        if state.slices.any_osd() && state.premul.is_some() {
            let mut bracket = state.premul.take().expect("checked");
            let res = (|| {
                bracket.premul.premultiply(&mut bracket.tmp, dst)?;
                state.blend_overlay_with_video(&mut bracket.tmp, &mut self.stats);
                bracket.unpremul.unpremultiply(dst, &bracket.tmp)
            })();
            state.premul = Some(bracket);
            res?;
        } else {
            state.blend_overlay_with_video(dst, &mut self.stats);
        }

        Ok(())
    }

    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    /// One line of alignment factors and internal buffer formats.
    pub fn debug_info(&self) -> String {
        let Some(s) = &self.state else {
            return "uninitialized".to_string();
        };
        format!(
            "align={}:{} ov={} ov_f={} v_f={} ca={} ca_f={}",
            s.align_x,
            s.align_y,
            s.video_overlay
                .as_ref()
                .map_or("-", |f| f.params().format.name()),
            s.overlay_tmp.layout().describe(),
            s.video_tmp.layout().describe(),
            s.calpha_overlay
                .as_ref()
                .map_or("-", |f| f.params().format.name()),
            s.calpha_tmp
                .as_ref()
                .map_or_else(|| "-".to_string(), |f| f.layout().describe()),
        )
    }
}

impl State {
    fn new(params: &FrameParams, settings: &Settings) -> Result<State> {
        let desc = params.desc();
        let need_premul = params.alpha != AlphaMode::Premultiplied && desc.has_alpha();

        let video_repack = Repack::new(params);
        let vf = video_repack.float_layout().clone();

        // Pick the intermediate overlay format: same subsampling and plane
        // order as the video's float layout, 8-bit, with an alpha plane.
        let mut scale_in_tiles = settings.scale_in_tiles;
        let overlay_fmt = if params.colorspace == Colorspace::Rgb && vf.planes.len() >= 3 {
            // No point in anything fancier, and no chroma to worry about.
            scale_in_tiles = false;
            PixelFormat::Bgra
        } else {
            let mut query = FormatQuery {
                planes: vf.planes.iter().map(|p| vec![p.component]).collect(),
                chroma_xs: vf.chroma_xs,
                chroma_ys: vf.chroma_ys,
            };
            if query.planes.last().map(|p| p[0]) != Some(COMP_ALPHA) {
                if query.planes.len() >= MAX_PLANES {
                    return Err(DrawError::NoOverlayFormat(desc.name));
                }
                query.planes.push(vec![COMP_ALPHA]);
            }
            scale_in_tiles &= query.chroma_xs > 0 || query.chroma_ys > 0;
            find_format(&query).ok_or(DrawError::NoOverlayFormat(desc.name))?
        };

        let mut overlay_params = FrameParams::new(0, 0, overlay_fmt);
        overlay_params.alpha = AlphaMode::Premultiplied;
        if overlay_fmt != PixelFormat::Bgra {
            overlay_params.colorspace = params.colorspace;
            overlay_params.levels = params.levels;
            overlay_params.chroma_location = params.chroma_location;
        } else {
            overlay_params.levels = Levels::Full;
        }
        let overlay_repack = Repack::new(&overlay_params);
        let of = overlay_repack.float_layout().clone();

        // The layouts must agree plane-by-plane, modulo the video possibly
        // lacking alpha.
        if of.planes.last().map(|p| p.component) != Some(COMP_ALPHA) {
            return Err(DrawError::PlaneLayoutMismatch);
        }
        if of.planes.len() != vf.planes.len() && of.planes.len() != vf.planes.len() + 1 {
            return Err(DrawError::PlaneLayoutMismatch);
        }
        if vf
            .planes
            .iter()
            .zip(&of.planes)
            .any(|(v, o)| v.component != o.component)
        {
            return Err(DrawError::PlaneLayoutMismatch);
        }

        let align_x = video_repack.align_x();
        let align_y = video_repack.align_y();
        debug_assert!(align_x >= overlay_repack.align_x());
        debug_assert!(align_y >= overlay_repack.align_y());
        if align_x > SLICE_W || align_y > TILE_H {
            return Err(DrawError::AlignmentOutOfRange {
                x: align_x,
                y: align_y,
            });
        }

        let w = align_up(params.w, align_x);
        let h = align_up(params.h, align_y);

        // Overlay size. In tiled mode round up to whole tiles, so the edge
        // tiles convert like any other.
        let (mut ov_w, mut ov_h) = (w, h);
        if scale_in_tiles {
            ov_w = align_up(ov_w, SLICE_W);
            ov_h = align_up(ov_h, TILE_H);
        }

        let mut rgba_params = FrameParams::new(ov_w, ov_h, PixelFormat::Bgra);
        rgba_params.levels = Levels::Full;
        rgba_params.alpha = AlphaMode::Premultiplied;
        let rgba_overlay = Frame::new(rgba_params);

        let overlay_tmp = FloatFrame::new(of, SLICE_W, align_y);
        let video_tmp = FloatFrame::new(vf, SLICE_W, align_y);

        let rgba_to_overlay = Scaler::new(settings.rgba_scale_filter);
        let mut video_overlay = None;
        let mut calpha_overlay = None;
        let mut alpha_to_calpha = None;
        let mut calpha_repack = None;
        let mut calpha_tmp = None;

        if overlay_fmt != PixelFormat::Bgra {
            let mut vo_params = overlay_params;
            vo_params.w = ov_w;
            vo_params.h = ov_h;
            // Tile edges cannot carry accurate chroma siting.
            if scale_in_tiles {
                vo_params.chroma_location = ChromaLoc::Center;
            }
            if !rgba_to_overlay.supports(&vo_params, rgba_overlay.params()) {
                return Err(DrawError::ScalerUnsupported {
                    src: rgba_params.format.name(),
                    dst: overlay_fmt.name(),
                });
            }
            video_overlay = Some(Frame::new(vo_params));

            let odesc = overlay_fmt.desc();
            let (xs, ys) = (odesc.chroma_xs, odesc.chroma_ys);
            if xs > 0 || ys > 0 {
                // A gray format compatible with the alpha plane, for both
                // the aliased alpha view and its chroma-sized resample.
                let calpha_fmt = find_format(&FormatQuery {
                    planes: vec![vec![1]],
                    chroma_xs: 0,
                    chroma_ys: 0,
                })
                .ok_or(DrawError::NoOverlayFormat(desc.name))?;

                // Full range gray always has the same range as alpha.
                let mut ca_params = FrameParams::new(ov_w >> xs, ov_h >> ys, calpha_fmt);
                ca_params.levels = Levels::Full;

                let mut alpha_params = ca_params;
                alpha_params.w = ov_w;
                alpha_params.h = ov_h;
                let scaler = Scaler::new(settings.rgba_scale_filter);
                if !scaler.supports(&ca_params, &alpha_params) {
                    return Err(DrawError::ScalerUnsupported {
                        src: calpha_fmt.name(),
                        dst: calpha_fmt.name(),
                    });
                }
                alpha_to_calpha = Some(scaler);

                let repack = Repack::new(&ca_params);
                calpha_tmp = Some(FloatFrame::new(repack.float_layout().clone(), SLICE_W, 1));
                calpha_repack = Some(repack);
                calpha_overlay = Some(Frame::new(ca_params));
            }
        }

        let premul = if need_premul {
            let scaler = Scaler::new(settings.rgba_scale_filter);
            let mut premul_params = *params;
            premul_params.alpha = AlphaMode::Premultiplied;
            if !scaler.supports(&premul_params, params) {
                return Err(DrawError::ScalerUnsupported {
                    src: params.format.name(),
                    dst: params.format.name(),
                });
            }
            Some(PremulBracket {
                premul: scaler,
                unpremul: Scaler::new(settings.rgba_scale_filter),
                tmp: Frame::new(premul_params),
            })
        } else {
            None
        };

        let slices = SliceMap::new(w, h, ov_h, align_x, align_y);

        debug!(
            video = params.format.name(),
            overlay = overlay_fmt.name(),
            align_x,
            align_y,
            scale_in_tiles,
            need_premul,
            "compositor cache initialized"
        );

        Ok(State {
            params: *params,
            w,
            h,
            align_x,
            align_y,
            change_id: None,
            parts: Vec::new(),
            slices,
            scale_in_tiles,
            rgba_overlay,
            video_overlay,
            calpha_overlay,
            sub_scale: Scaler::new(settings.rgba_scale_filter),
            rgba_to_overlay,
            alpha_to_calpha,
            overlay_repack,
            video_repack,
            calpha_repack,
            overlay_tmp,
            video_tmp,
            calpha_tmp,
            premul,
        })
    }

    /// Zero the previously marked overlay regions and reset every slice.
    /// This is the only path that both writes pixels and resets slices.
    fn clear_rgba_overlay(&mut self) {
        for y in 0..self.rgba_overlay.height() {
            let line = self.slices.row_mut(y);
            let row = self.rgba_overlay.row_mut(0, y);
            for (sx, s) in line.iter_mut().enumerate() {
                if s.x0 <= s.x1 {
                    let base = sx * SLICE_W;
                    row[(base + s.x0 as usize) * 4..(base + s.x1 as usize) * 4].fill(0);
                    *s = Slice::EMPTY;
                }
            }
        }
        self.slices.set_idle();
    }

    fn render_item(&mut self, item: &SubBitmaps<'_>, stats: &mut DrawStats) -> Result<()> {
        match item.format {
            BitmapFormat::Libass => {
                raster::render_mono(&mut self.rgba_overlay, &mut self.slices, item);
                Ok(())
            }
            BitmapFormat::Rgba => {
                assert!(item.render_index < MAX_OSD_PARTS);
                if self.parts.len() <= item.render_index {
                    self.parts.resize_with(item.render_index + 1, Part::default);
                }
                raster::render_rgba(
                    &mut self.rgba_overlay,
                    &mut self.slices,
                    &mut self.parts[item.render_index],
                    &self.sub_scale,
                    stats,
                    item,
                )
            }
            format => Err(DrawError::UnsupportedBitmapFormat(format)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmaps::SubBitmap;

    fn init_tracing() {
        use tracing_subscriber::EnvFilter;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn frame_bytes(f: &Frame) -> Vec<u8> {
        let mut out = Vec::new();
        for p in 0..f.desc().num_planes() {
            let (_, h) = f.plane_dims(p);
            for y in 0..h {
                out.extend_from_slice(f.row(p, y));
            }
        }
        out
    }

    fn yuv420_frame(w: usize, h: usize) -> Frame {
        let mut params = FrameParams::new(w, h, PixelFormat::Yuv420p);
        params.levels = Levels::Limited;
        let mut f = Frame::new(params);
        // A recognizable pattern rather than flat planes.
        for p in 0..3 {
            let (pw, ph) = f.plane_dims(p);
            for y in 0..ph {
                for x in 0..pw {
                    f.row_mut(p, y)[x] = (30 + p * 40 + x + y) as u8;
                }
            }
        }
        f
    }

    fn rgba_item<'a>(
        bitmap: &'a [u8],
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        change_id: u64,
    ) -> SubBitmaps<'a> {
        SubBitmaps {
            format: BitmapFormat::Rgba,
            change_id,
            render_index: 0,
            parts: vec![SubBitmap {
                bitmap,
                stride: w as usize * 4,
                x,
                y,
                w,
                h,
                dw: w,
                dh: h,
                color: 0,
            }],
        }
    }

    fn list<'a>(change_id: u64, w: usize, h: usize, items: Vec<SubBitmaps<'a>>) -> SubBitmapList<'a> {
        SubBitmapList {
            change_id,
            w,
            h,
            items,
        }
    }

    #[test]
    fn test_empty_list_is_identity() {
        init_tracing();
        let mut comp = Compositor::new();
        let mut dst = yuv420_frame(32, 16);
        let before = frame_bytes(&dst);
        comp.draw(&mut dst, &list(1, 0, 0, vec![])).unwrap();
        assert_eq!(frame_bytes(&dst), before);
        assert_eq!(comp.stats().repaints, 1);
        assert_eq!(comp.stats().slices_blended, 0);
    }

    #[test]
    fn test_bgra_pipeline_mono_red() {
        init_tracing();
        let mut params = FrameParams::new(4, 1, PixelFormat::Bgra);
        params.levels = Levels::Full;
        params.alpha = AlphaMode::Premultiplied;
        let mut dst = Frame::new(params);
        dst.row_mut(0, 0).copy_from_slice(&[
            0, 0, 0, 0, //
            0, 0, 0, 255, //
            255, 255, 255, 0, //
            128, 128, 128, 255,
        ]);

        let coverage = [255u8, 128, 0, 255];
        let item = SubBitmaps {
            format: BitmapFormat::Libass,
            change_id: 1,
            render_index: 0,
            parts: vec![SubBitmap {
                bitmap: &coverage,
                stride: 4,
                x: 0,
                y: 0,
                w: 4,
                h: 1,
                dw: 0,
                dh: 0,
                color: 0xFF000000,
            }],
        };
        let mut comp = Compositor::new();
        comp.draw(&mut dst, &list(1, 4, 1, vec![item])).unwrap();

        // BGRA target: no intermediate conversion, blend in full-range RGB.
        assert!(comp.debug_info().contains("ov=-"));
        assert_eq!(
            dst.row(0, 0),
            &[
                0, 0, 255, 255, //
                0, 0, 128, 255, //
                255, 255, 255, 0, //
                0, 0, 255, 255,
            ]
        );
    }

    #[test]
    fn test_unchanged_change_id_skips_repaint() {
        init_tracing();
        let white = [255u8; 8 * 8 * 4];
        let items = vec![rgba_item(&white, 4, 4, 8, 8, 3)];
        let sbs = list(3, 32, 16, items);

        let mut comp = Compositor::new();
        let mut dst1 = yuv420_frame(32, 16);
        comp.draw(&mut dst1, &sbs).unwrap();
        let stats1 = comp.stats();
        assert_eq!(stats1.repaints, 1);
        assert!(stats1.tiles_converted > 0);

        let mut dst2 = yuv420_frame(32, 16);
        comp.draw(&mut dst2, &sbs).unwrap();
        let stats2 = comp.stats();
        // Same change id: no rasterization, no conversion, same output.
        assert_eq!(stats2.repaints, 1);
        assert_eq!(stats2.tiles_converted, stats1.tiles_converted);
        assert_eq!(frame_bytes(&dst1), frame_bytes(&dst2));
    }

    #[test]
    fn test_subsampled_target_uses_chroma_alpha() {
        init_tracing();
        let mut params = FrameParams::new(32, 32, PixelFormat::Yuva420p);
        params.levels = Levels::Limited;
        params.alpha = AlphaMode::Straight;
        let mut dst = Frame::new(params);
        dst.fill_plane(0, 60);
        dst.fill_plane(1, 128);
        dst.fill_plane(2, 128);
        dst.fill_plane(3, 255);

        let white = [255u8; 16 * 16 * 4];
        let mut comp = Compositor::new();
        comp.draw(&mut dst, &list(1, 32, 32, vec![rgba_item(&white, 4, 4, 16, 16, 1)]))
            .unwrap();

        let state = comp.state.as_ref().unwrap();
        let calpha = state.calpha_overlay.as_ref().expect("4:2:0 needs calpha");
        // Chroma-sized: half the (tile-rounded) overlay in both directions.
        assert_eq!(
            (calpha.width(), calpha.height()),
            (state.rgba_overlay.width() / 2, state.rgba_overlay.height() / 2)
        );
        // Inside the covered area the chroma alpha is saturated too.
        assert_eq!(calpha.row(0, 5)[5], 255);

        // Opaque white over the marked area, untouched outside it.
        assert_eq!(dst.row(0, 8)[8], 235);
        assert_eq!(dst.row(1, 4)[4], 128);
        assert_eq!(dst.row(2, 4)[4], 128);
        assert_eq!(dst.row(3, 8)[8], 255);
        assert_eq!(dst.row(0, 28)[28], 60);
        assert_eq!(dst.row(1, 14)[14], 128);
    }

    #[test]
    fn test_reinit_on_params_change() {
        init_tracing();
        let white = [255u8; 4 * 4 * 4];
        let sbs = list(1, 16, 8, vec![rgba_item(&white, 0, 0, 4, 4, 1)]);

        let mut comp = Compositor::new();
        let mut params = FrameParams::new(16, 8, PixelFormat::Bgra);
        params.levels = Levels::Full;
        params.alpha = AlphaMode::Premultiplied;
        comp.draw(&mut Frame::new(params), &sbs).unwrap();
        assert!(comp.debug_info().starts_with("align=1:1"));
        assert!(comp.stats().repaints == 1);

        let mut dst = yuv420_frame(16, 8);
        comp.draw(&mut dst, &sbs).unwrap();
        // New target params: full reinit, fresh stats, new alignment.
        assert!(comp.debug_info().starts_with("align=2:2"));
        assert!(comp.debug_info().contains("ov=yuva420p"));
        assert_eq!(comp.stats().repaints, 1);
    }

    #[test]
    fn test_tile_skip() {
        init_tracing();
        let white = [255u8; 4 * 4 * 4];
        let mut dst = yuv420_frame(512, 8);
        let mut comp = Compositor::new();
        comp.draw(&mut dst, &list(1, 512, 8, vec![rgba_item(&white, 0, 0, 4, 4, 1)]))
            .unwrap();
        // Overlay is 2x2 tiles; only tile (0, 0) has marked slices.
        assert_eq!(comp.stats().tiles_converted, 1);
    }

    #[test]
    fn test_whole_image_mode_when_tiling_disabled() {
        init_tracing();
        let white = [255u8; 4 * 4 * 4];
        let mut dst = yuv420_frame(512, 8);
        let mut comp = Compositor::with_settings(Settings {
            scale_in_tiles: false,
            ..Settings::default()
        });
        comp.draw(&mut dst, &list(1, 512, 8, vec![rgba_item(&white, 0, 0, 4, 4, 1)]))
            .unwrap();
        assert_eq!(comp.stats().tiles_converted, 1);
        let state = comp.state.as_ref().unwrap();
        assert!(!state.scale_in_tiles);
        // Whole-image mode keeps the caller's chroma siting.
        let vo = state.video_overlay.as_ref().unwrap();
        assert_eq!(vo.params().chroma_location, ChromaLoc::Left);
    }

    #[test]
    fn test_premultiplied_source_over_law() {
        init_tracing();
        let mut params = FrameParams::new(4, 2, PixelFormat::Bgra);
        params.levels = Levels::Full;
        params.alpha = AlphaMode::Premultiplied;
        let mut dst = Frame::new(params);
        for px in dst.row_mut(0, 0).chunks_exact_mut(4) {
            px.copy_from_slice(&[10, 20, 30, 255]);
        }
        for px in dst.row_mut(0, 1).chunks_exact_mut(4) {
            px.copy_from_slice(&[10, 20, 30, 255]);
        }

        // Premultiplied source covering the whole frame with alpha 100.
        let src_px = [20u8, 40, 80, 100];
        let mut bitmap = Vec::new();
        for _ in 0..4 * 2 {
            bitmap.extend_from_slice(&src_px);
        }
        let mut comp = Compositor::new();
        comp.draw(&mut dst, &list(1, 4, 2, vec![rgba_item(&bitmap, 0, 0, 4, 2, 1)]))
            .unwrap();

        let expect = |s: u8, d: u8| -> f32 { s as f32 + d as f32 * (255.0 - 100.0) / 255.0 };
        let got = &dst.row(0, 1)[..4];
        for (i, (&s, &d)) in src_px.iter().zip(&[10u8, 20, 30, 255]).enumerate() {
            assert!(
                (got[i] as f32 - expect(s, d)).abs() <= 1.0,
                "channel {i}: {} vs {}",
                got[i],
                expect(s, d)
            );
        }
    }

    #[test]
    fn test_transparent_source_leaves_dst_unchanged() {
        init_tracing();
        let zeros = [0u8; 8 * 8 * 4];
        let mut dst = yuv420_frame(32, 16);
        let before = frame_bytes(&dst);
        let mut comp = Compositor::new();
        comp.draw(&mut dst, &list(1, 32, 16, vec![rgba_item(&zeros, 0, 0, 8, 8, 1)]))
            .unwrap();
        // The rect was marked and blended, but a zero source blends to the
        // destination exactly.
        assert!(comp.stats().slices_blended > 0);
        assert_eq!(frame_bytes(&dst), before);
    }

    #[test]
    fn test_gray_target_gets_alpha_sibling() {
        init_tracing();
        let mut params = FrameParams::new(16, 8, PixelFormat::Gray8);
        params.levels = Levels::Limited;
        let mut dst = Frame::new(params);
        dst.fill_plane(0, 60);

        let coverage = [255u8; 4 * 4];
        let item = SubBitmaps {
            format: BitmapFormat::Libass,
            change_id: 1,
            render_index: 0,
            parts: vec![SubBitmap {
                bitmap: &coverage,
                stride: 4,
                x: 0,
                y: 0,
                w: 4,
                h: 4,
                dw: 0,
                dh: 0,
                color: 0xFFFFFF00, // opaque white
            }],
        };
        let mut comp = Compositor::new();
        comp.draw(&mut dst, &list(1, 16, 8, vec![item])).unwrap();
        assert!(comp.debug_info().contains("ov=yap8"));
        assert_eq!(dst.row(0, 0)[0], 235);
        assert_eq!(dst.row(0, 0)[8], 60);
    }

    #[test]
    fn test_unsupported_format_rejected() {
        init_tracing();
        let mut dst = yuv420_frame(16, 8);
        let item = SubBitmaps {
            format: BitmapFormat::Empty,
            change_id: 1,
            render_index: 0,
            parts: vec![],
        };
        let mut comp = Compositor::new();
        let err = comp.draw(&mut dst, &list(1, 0, 0, vec![item])).unwrap_err();
        assert!(matches!(err, DrawError::UnsupportedBitmapFormat(_)));
    }
}
