//! Pixel format descriptors and the static format registry.
//!
//! Components are identified by id: 1 = R or luma, 2 = G or U, 3 = B or V,
//! 4 = alpha. A plane lists its component ids in memory order, so a packed
//! BGRA plane reads `[3, 2, 1, 4]`. All registered formats store 8-bit
//! unsigned samples; the float working layout derived from a format is
//! planar f32 with one plane per component.

use super::Levels;

pub const MAX_PLANES: usize = 4;
pub const COMP_ALPHA: u8 = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    Bgra,
    Gbrp,
    Gbrap,
    Gray8,
    Yap8,
    Nv12,
    Yuv420p,
    Yuva420p,
    Yuv422p,
    Yuva422p,
    Yuv444p,
    Yuva444p,
}

#[derive(Debug, Eq, PartialEq)]
pub struct PlaneDesc {
    /// Component ids stored in this plane, in memory order.
    pub components: &'static [u8],
}

#[derive(Debug, Eq, PartialEq)]
pub struct FormatDesc {
    pub id: PixelFormat,
    pub name: &'static str,
    pub planes: &'static [PlaneDesc],
    /// Chroma subsampling factors as log2 ratios.
    pub chroma_xs: u32,
    pub chroma_ys: u32,
    /// Component ids 1..3 denote R/G/B rather than luma/chroma.
    pub is_rgb: bool,
}

macro_rules! fmt_desc {
    ($id:ident, $name:literal, [$([$($c:literal),+]),+], $xs:literal, $ys:literal, $rgb:literal) => {
        FormatDesc {
            id: PixelFormat::$id,
            name: $name,
            planes: &[$(PlaneDesc { components: &[$($c),+] }),+],
            chroma_xs: $xs,
            chroma_ys: $ys,
            is_rgb: $rgb,
        }
    };
}

static FORMATS: [FormatDesc; 12] = [
    fmt_desc!(Bgra, "bgra", [[3, 2, 1, 4]], 0, 0, true),
    fmt_desc!(Gbrp, "gbrp", [[2], [3], [1]], 0, 0, true),
    fmt_desc!(Gbrap, "gbrap", [[2], [3], [1], [4]], 0, 0, true),
    fmt_desc!(Gray8, "gray8", [[1]], 0, 0, false),
    fmt_desc!(Yap8, "yap8", [[1], [4]], 0, 0, false),
    fmt_desc!(Nv12, "nv12", [[1], [2, 3]], 1, 1, false),
    fmt_desc!(Yuv420p, "yuv420p", [[1], [2], [3]], 1, 1, false),
    fmt_desc!(Yuva420p, "yuva420p", [[1], [2], [3], [4]], 1, 1, false),
    fmt_desc!(Yuv422p, "yuv422p", [[1], [2], [3]], 1, 0, false),
    fmt_desc!(Yuva422p, "yuva422p", [[1], [2], [3], [4]], 1, 0, false),
    fmt_desc!(Yuv444p, "yuv444p", [[1], [2], [3]], 0, 0, false),
    fmt_desc!(Yuva444p, "yuva444p", [[1], [2], [3], [4]], 0, 0, false),
];

impl PixelFormat {
    pub fn desc(self) -> &'static FormatDesc {
        FORMATS.iter().find(|d| d.id == self).expect("registered")
    }

    pub fn name(self) -> &'static str {
        self.desc().name
    }
}

impl FormatDesc {
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    pub fn has_alpha(&self) -> bool {
        self.planes
            .iter()
            .any(|p| p.components.contains(&COMP_ALPHA))
    }

    /// Index of the standalone alpha plane, if the format has one.
    pub fn alpha_plane(&self) -> Option<usize> {
        self.planes
            .iter()
            .position(|p| p.components == [COMP_ALPHA])
    }

    /// Subsampling `(xs, ys)` of one plane. Only pure-chroma planes of YUV
    /// formats are subsampled.
    pub fn plane_sub(&self, plane: usize) -> (u32, u32) {
        let p = &self.planes[plane];
        if !self.is_rgb && p.components.iter().all(|&c| c == 2 || c == 3) {
            (self.chroma_xs, self.chroma_ys)
        } else {
            (0, 0)
        }
    }

    /// Where component `comp` lives: `(plane, offset, step)` with `offset`
    /// the sample index inside a packed group of `step` samples.
    pub fn locate_component(&self, comp: u8) -> Option<(usize, usize, usize)> {
        for (i, p) in self.planes.iter().enumerate() {
            if let Some(off) = p.components.iter().position(|&c| c == comp) {
                return Some((i, off, p.components.len()));
            }
        }
        None
    }

    /// The planar-float32 expansion of this format: one plane per component.
    ///
    /// Packed RGB expands in g,b,r,a order so that packed and planar RGB
    /// formats agree plane-by-plane.
    pub fn float_layout(&self) -> FloatLayout {
        let mut planes: Vec<FloatPlane> = Vec::new();
        for (i, p) in self.planes.iter().enumerate() {
            let (xs, ys) = self.plane_sub(i);
            for &c in p.components {
                planes.push(FloatPlane {
                    component: c,
                    xs,
                    ys,
                });
            }
        }
        let rank = |c: u8| -> u8 {
            if self.is_rgb {
                match c {
                    2 => 0,
                    3 => 1,
                    1 => 2,
                    _ => 3,
                }
            } else {
                c
            }
        };
        planes.sort_by_key(|p| rank(p.component));
        FloatLayout {
            planes,
            chroma_xs: self.chroma_xs,
            chroma_ys: self.chroma_ys,
        }
    }
}

/// One plane of a planar-float32 working image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FloatPlane {
    pub component: u8,
    pub xs: u32,
    pub ys: u32,
}

/// Plane structure of a planar-float32 working image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FloatLayout {
    pub planes: Vec<FloatPlane>,
    pub chroma_xs: u32,
    pub chroma_ys: u32,
}

impl FloatLayout {
    pub fn describe(&self) -> String {
        if self.chroma_xs > 0 || self.chroma_ys > 0 {
            format!("f32p{}@{}:{}", self.planes.len(), self.chroma_xs, self.chroma_ys)
        } else {
            format!("f32p{}", self.planes.len())
        }
    }
}

/// Structural format query used for reverse lookups.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormatQuery {
    /// Component ids per plane, in memory order.
    pub planes: Vec<Vec<u8>>,
    pub chroma_xs: u32,
    pub chroma_ys: u32,
}

/// Find a registered format with the given plane structure and subsampling.
pub fn find_format(query: &FormatQuery) -> Option<PixelFormat> {
    FORMATS
        .iter()
        .find(|d| {
            d.chroma_xs == query.chroma_xs
                && d.chroma_ys == query.chroma_ys
                && d.planes.len() == query.planes.len()
                && d.planes
                    .iter()
                    .zip(&query.planes)
                    .all(|(a, b)| a.components == b.as_slice())
        })
        .map(|d| d.id)
}

/// Offset/scale pair mapping a stored sample to its float working value:
/// `float = (stored - off) / mul`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompRange {
    pub off: f32,
    pub mul: f32,
}

/// Nominal range of one component. The float working format removes the
/// per-component offset, which is what lets a single premultiplied
/// source-over kernel hold on every plane regardless of quantization range.
pub fn comp_range(desc: &FormatDesc, comp: u8, levels: Levels) -> CompRange {
    let limited = levels == Levels::Limited;
    if comp == COMP_ALPHA {
        CompRange {
            off: 0.0,
            mul: 255.0,
        }
    } else if desc.is_rgb || comp == 1 {
        if limited {
            CompRange {
                off: 16.0,
                mul: 219.0,
            }
        } else {
            CompRange {
                off: 0.0,
                mul: 255.0,
            }
        }
    } else {
        // Chroma is centered on the neutral value.
        CompRange {
            off: 128.0,
            mul: if limited { 224.0 } else { 255.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_shapes() {
        let d = PixelFormat::Yuva420p.desc();
        assert_eq!(d.num_planes(), 4);
        assert!(d.has_alpha());
        assert_eq!(d.alpha_plane(), Some(3));
        assert_eq!(d.plane_sub(0), (0, 0));
        assert_eq!(d.plane_sub(1), (1, 1));
        assert_eq!(d.plane_sub(3), (0, 0));

        let nv12 = PixelFormat::Nv12.desc();
        assert_eq!(nv12.plane_sub(1), (1, 1));
        assert_eq!(nv12.locate_component(3), Some((1, 1, 2)));
        assert!(!nv12.has_alpha());
    }

    #[test]
    fn test_float_layout_rgb_order() {
        // Packed BGRA and planar GBRA must expand to the same plane order.
        let packed = PixelFormat::Bgra.desc().float_layout();
        let planar = PixelFormat::Gbrap.desc().float_layout();
        let comps: Vec<u8> = packed.planes.iter().map(|p| p.component).collect();
        assert_eq!(comps, vec![2, 3, 1, 4]);
        assert_eq!(packed.planes, planar.planes);
    }

    #[test]
    fn test_find_format() {
        let q = FormatQuery {
            planes: vec![vec![1], vec![2], vec![3], vec![4]],
            chroma_xs: 1,
            chroma_ys: 1,
        };
        assert_eq!(find_format(&q), Some(PixelFormat::Yuva420p));

        let q = FormatQuery {
            planes: vec![vec![1], vec![4]],
            chroma_xs: 0,
            chroma_ys: 0,
        };
        assert_eq!(find_format(&q), Some(PixelFormat::Yap8));

        let q = FormatQuery {
            planes: vec![vec![1]],
            chroma_xs: 0,
            chroma_ys: 0,
        };
        assert_eq!(find_format(&q), Some(PixelFormat::Gray8));

        let q = FormatQuery {
            planes: vec![vec![4], vec![1]],
            chroma_xs: 0,
            chroma_ys: 0,
        };
        assert_eq!(find_format(&q), None);
    }

    #[test]
    fn test_comp_range() {
        let d = PixelFormat::Yuv420p.desc();
        let luma = comp_range(d, 1, Levels::Limited);
        assert_eq!((luma.off, luma.mul), (16.0, 219.0));
        let chroma = comp_range(d, 2, Levels::Limited);
        assert_eq!((chroma.off, chroma.mul), (128.0, 224.0));
        let alpha = comp_range(PixelFormat::Yuva420p.desc(), 4, Levels::Limited);
        assert_eq!((alpha.off, alpha.mul), (0.0, 255.0));
        let rgb = comp_range(PixelFormat::Bgra.desc(), 3, Levels::Full);
        assert_eq!((rgb.off, rgb.mul), (0.0, 255.0));
    }
}
