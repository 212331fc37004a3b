//! Owning planar images and the non-owning views the compositor needs.

pub mod format;

use crate::util::{align_up, chroma_div_up, u16_div_by_255};
use format::{FloatLayout, FormatDesc, PixelFormat};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Colorspace {
    Rgb,
    #[default]
    Bt601,
    Bt709,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Levels {
    #[default]
    Limited,
    Full,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ChromaLoc {
    #[default]
    Left,
    Center,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum AlphaMode {
    #[default]
    Straight,
    Premultiplied,
}

/// Everything that identifies an image's memory layout and interpretation.
/// Two images are compatible iff their params are equal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameParams {
    pub w: usize,
    pub h: usize,
    pub format: PixelFormat,
    pub colorspace: Colorspace,
    pub levels: Levels,
    pub chroma_location: ChromaLoc,
    pub alpha: AlphaMode,
}

impl FrameParams {
    pub fn new(w: usize, h: usize, format: PixelFormat) -> FrameParams {
        FrameParams {
            w,
            h,
            format,
            colorspace: if format.desc().is_rgb {
                Colorspace::Rgb
            } else {
                Colorspace::default()
            },
            levels: Levels::default(),
            chroma_location: ChromaLoc::default(),
            alpha: AlphaMode::default(),
        }
    }

    pub fn desc(&self) -> &'static FormatDesc {
        self.format.desc()
    }
}

/// Axis-aligned pixel rectangle, `x0/y0` inclusive, `x1/y1` exclusive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::From)]
pub struct Rect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Rect {
    pub fn w(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn h(&self) -> usize {
        self.y1 - self.y0
    }
}

#[derive(Clone)]
struct Plane {
    buf: Vec<u8>,
    /// Width and height in pixels (not samples).
    w: usize,
    h: usize,
    /// Samples per pixel (1 for planar, more for packed planes).
    step: usize,
    /// Distance between rows, in samples.
    stride: usize,
}

/// An owning planar 8-bit image.
///
/// Plane buffers are padded up to whole chroma macro-pixels, so strip access
/// aligned to the format's chroma factors never leaves the allocation. The
/// logical size remains `params.w` x `params.h`.
#[derive(Clone)]
pub struct Frame {
    params: FrameParams,
    planes: Vec<Plane>,
}

impl Frame {
    pub fn new(params: FrameParams) -> Frame {
        let desc = params.desc();
        let aw = align_up(params.w, 1 << desc.chroma_xs);
        let ah = align_up(params.h, 1 << desc.chroma_ys);
        let planes = (0..desc.num_planes())
            .map(|i| {
                let (xs, ys) = desc.plane_sub(i);
                let (w, h) = (aw >> xs, ah >> ys);
                let step = desc.planes[i].components.len();
                Plane {
                    buf: vec![0u8; w * step * h],
                    w,
                    h,
                    step,
                    stride: w * step,
                }
            })
            .collect();
        Frame { params, planes }
    }

    pub fn params(&self) -> &FrameParams {
        &self.params
    }

    pub fn desc(&self) -> &'static FormatDesc {
        self.params.desc()
    }

    pub fn width(&self) -> usize {
        self.params.w
    }

    pub fn height(&self) -> usize {
        self.params.h
    }

    /// Padded dimensions of one plane, in pixels.
    pub fn plane_dims(&self, plane: usize) -> (usize, usize) {
        (self.planes[plane].w, self.planes[plane].h)
    }

    pub fn row(&self, plane: usize, y: usize) -> &[u8] {
        let p = &self.planes[plane];
        debug_assert!(y < p.h);
        &p.buf[y * p.stride..(y + 1) * p.stride]
    }

    pub fn row_mut(&mut self, plane: usize, y: usize) -> &mut [u8] {
        let p = &mut self.planes[plane];
        debug_assert!(y < p.h);
        &mut p.buf[y * p.stride..(y + 1) * p.stride]
    }

    pub fn fill_plane(&mut self, plane: usize, value: u8) {
        self.planes[plane].buf.fill(value);
    }

    /// View the whole image as packed BGRA. Panics for other formats.
    pub fn bgra_view(&self) -> BgraView<'_> {
        assert_eq!(self.params.format, PixelFormat::Bgra);
        let p = &self.planes[0];
        BgraView {
            data: &p.buf,
            stride: p.stride,
            w: p.w,
            h: p.h,
        }
    }

    /// Borrow one single-component plane as a standalone gray image.
    pub fn plane_view(&self, plane: usize) -> PlaneView<'_> {
        let p = &self.planes[plane];
        assert_eq!(p.step, 1);
        PlaneView {
            data: &p.buf,
            stride: p.stride,
            w: p.w,
            h: p.h,
        }
    }

    /// Import an image-rs RGBA image as packed premultiplied BGRA, which is
    /// exactly what the pre-scaled bitmap contract requires.
    pub fn from_rgba_image(img: &image::RgbaImage) -> Frame {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let mut params = FrameParams::new(w, h, PixelFormat::Bgra);
        params.levels = Levels::Full;
        params.alpha = AlphaMode::Premultiplied;
        let mut frame = Frame::new(params);
        let src = img.as_raw();
        for y in 0..h {
            let dst = frame.row_mut(0, y);
            let src = &src[y * w * 4..(y + 1) * w * 4];
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                let a = s[3] as u16;
                d[0] = u16_div_by_255(s[2] as u16 * a) as u8;
                d[1] = u16_div_by_255(s[1] as u16 * a) as u8;
                d[2] = u16_div_by_255(s[0] as u16 * a) as u8;
                d[3] = s[3];
            }
        }
        frame
    }

    /// Export a BGRA frame as an image-rs RGBA image. Samples are copied as
    /// stored; a premultiplied frame stays premultiplied.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        assert_eq!(self.params.format, PixelFormat::Bgra);
        let (w, h) = (self.params.w, self.params.h);
        let mut img = image::RgbaImage::new(w as u32, h as u32);
        for y in 0..h {
            let src = &self.row(0, y)[..w * 4];
            let dst = &mut img.as_mut()[y * w * 4..(y + 1) * w * 4];
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
                d[3] = s[3];
            }
        }
        img
    }
}

/// A packed BGRA rectangle over foreign memory (caller bitmaps, or a
/// [`Frame::bgra_view`]).
#[derive(Clone, Copy)]
pub struct BgraView<'a> {
    data: &'a [u8],
    /// Distance between rows, in bytes.
    stride: usize,
    pub w: usize,
    pub h: usize,
}

impl<'a> BgraView<'a> {
    pub fn new(data: &'a [u8], stride: usize, w: usize, h: usize) -> BgraView<'a> {
        assert!(h == 0 || (h - 1) * stride + w * 4 <= data.len());
        BgraView { data, stride, w, h }
    }

    pub fn row(&self, y: usize) -> &'a [u8] {
        debug_assert!(y < self.h);
        &self.data[y * self.stride..y * self.stride + self.w * 4]
    }

    /// A sub-rectangle sharing the same memory.
    pub fn sub_view(&self, x: usize, y: usize, w: usize, h: usize) -> BgraView<'a> {
        debug_assert!(x + w <= self.w && y + h <= self.h);
        BgraView {
            data: &self.data[y * self.stride + x * 4..],
            stride: self.stride,
            w,
            h,
        }
    }
}

/// One single-component plane borrowed from a parent [`Frame`]. The parent
/// must outlive the view; the borrow checker enforces exactly that.
#[derive(Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    stride: usize,
    pub w: usize,
    pub h: usize,
}

impl<'a> PlaneView<'a> {
    pub fn row(&self, y: usize) -> &'a [u8] {
        debug_assert!(y < self.h);
        &self.data[y * self.stride..y * self.stride + self.w]
    }
}

/// An owning planar float32 working image; used for the per-slice strips.
pub struct FloatFrame {
    layout: FloatLayout,
    planes: Vec<Vec<f32>>,
    strides: Vec<usize>,
}

impl FloatFrame {
    pub fn new(layout: FloatLayout, w: usize, h: usize) -> FloatFrame {
        let mut planes = Vec::new();
        let mut strides = Vec::new();
        for p in &layout.planes {
            let pw = chroma_div_up(w, p.xs);
            let ph = chroma_div_up(h, p.ys);
            planes.push(vec![0f32; pw * ph]);
            strides.push(pw);
        }
        FloatFrame {
            layout,
            planes,
            strides,
        }
    }

    pub fn layout(&self) -> &FloatLayout {
        &self.layout
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    pub fn row(&self, plane: usize, y: usize) -> &[f32] {
        let stride = self.strides[plane];
        &self.planes[plane][y * stride..(y + 1) * stride]
    }

    pub fn row_mut(&mut self, plane: usize, y: usize) -> &mut [f32] {
        let stride = self.strides[plane];
        &mut self.planes[plane][y * stride..(y + 1) * stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_padding() {
        let mut params = FrameParams::new(17, 9, PixelFormat::Yuv420p);
        params.alpha = AlphaMode::Premultiplied;
        let frame = Frame::new(params);
        assert_eq!((frame.width(), frame.height()), (17, 9));
        assert_eq!(frame.plane_dims(0), (18, 10));
        assert_eq!(frame.plane_dims(1), (9, 5));
        assert_eq!(frame.row(1, 4).len(), 9);
    }

    #[test]
    fn test_bgra_view_sub() {
        let mut params = FrameParams::new(4, 2, PixelFormat::Bgra);
        params.alpha = AlphaMode::Premultiplied;
        let mut frame = Frame::new(params);
        frame.row_mut(0, 1)[4..8].copy_from_slice(&[1, 2, 3, 4]);
        let view = frame.bgra_view().sub_view(1, 1, 2, 1);
        assert_eq!(&view.row(0)[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_rgba_image_roundtrip() {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 255, 0, 128]));
        let frame = Frame::from_rgba_image(&img);
        // Opaque red stays red; half-transparent green is premultiplied.
        assert_eq!(&frame.row(0, 0)[..8], &[0, 0, 255, 255, 0, 128, 0, 128]);
        let back = frame.to_rgba_image();
        assert_eq!(back.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(back.get_pixel(1, 0).0, [0, 128, 0, 128]);
    }

    #[test]
    fn test_float_frame_strip() {
        let layout = PixelFormat::Yuva420p.desc().float_layout();
        let mut strip = FloatFrame::new(layout, 256, 2);
        assert_eq!(strip.num_planes(), 4);
        assert_eq!(strip.row(0, 1).len(), 256);
        assert_eq!(strip.row(1, 0).len(), 128);
        strip.row_mut(2, 0)[127] = 0.5;
        assert_eq!(strip.row(2, 0)[127], 0.5);
    }
}
