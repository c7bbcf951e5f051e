//! Error-diffusion palette reduction.
//!
//! Every pixel is mapped to the nearest palette entry (plain squared RGB
//! distance) after adding the error diffused into it by already processed
//! neighbours. The residual is reshaped by a level curve and spread forward
//! with one of eleven fixed 3x6 kernels.

use crate::error::{Error, Result};
use crate::palette::Palette;

/// Border around the error planes so kernels reaching 3 columns left/right and
/// 2 rows down never need bounds checks.
pub const SHIFT: usize = 3;

/// Weight matrix: row 0 is the current row tail, rows 1 and 2 the next two rows.
/// Columns cover dx = -3..=2.
pub type Kernel = [[f32; 6]; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherAlgorithm {
    #[default]
    FloydSteinberg,
    JarvisJudiceNinke,
    Stucki,
    Burkes,
    Fan,
    Sierra3,
    Sierra2,
    Sierra24A,
    Atkinson,
    ShiauFan4,
    ShiauFan5,
}

impl DitherAlgorithm {
    pub const ALL: [DitherAlgorithm; 11] = [
        DitherAlgorithm::FloydSteinberg,
        DitherAlgorithm::JarvisJudiceNinke,
        DitherAlgorithm::Stucki,
        DitherAlgorithm::Burkes,
        DitherAlgorithm::Fan,
        DitherAlgorithm::Sierra3,
        DitherAlgorithm::Sierra2,
        DitherAlgorithm::Sierra24A,
        DitherAlgorithm::Atkinson,
        DitherAlgorithm::ShiauFan4,
        DitherAlgorithm::ShiauFan5,
    ];

    pub fn kernel(self) -> &'static Kernel {
        &KERNELS[self as usize]
    }

    /// Short command-line name.
    pub fn short_name(self) -> &'static str {
        match self {
            DitherAlgorithm::FloydSteinberg => "FldStnbrg",
            DitherAlgorithm::JarvisJudiceNinke => "JrvJdcNnk",
            DitherAlgorithm::Stucki => "Stucki",
            DitherAlgorithm::Burkes => "Burkes",
            DitherAlgorithm::Fan => "Fan",
            DitherAlgorithm::Sierra3 => "Sierra3",
            DitherAlgorithm::Sierra2 => "Sierra2",
            DitherAlgorithm::Sierra24A => "Sierra24A",
            DitherAlgorithm::Atkinson => "Atkinson",
            DitherAlgorithm::ShiauFan4 => "ShiauFan4",
            DitherAlgorithm::ShiauFan5 => "ShiauFan5",
        }
    }
}

impl std::fmt::Display for DitherAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

impl std::str::FromStr for DitherAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        resolve_algorithm(s).ok_or_else(|| {
            let known: Vec<_> = DitherAlgorithm::ALL.iter().map(|a| a.short_name()).collect();
            format!("unknown diffusion algorithm '{s}' (expected one of {})", known.join(", "))
        })
    }
}

/// Accepts the short names as well as snake/kebab case long names, case-insensitive.
pub fn resolve_algorithm(name: &str) -> Option<DitherAlgorithm> {
    let norm = name.trim().to_ascii_lowercase().replace('-', "_");
    match norm.as_str() {
        "fldstnbrg" | "floyd_steinberg" | "fs" => Some(DitherAlgorithm::FloydSteinberg),
        "jrvjdcnnk" | "jarvis_judice_ninke" | "jarvis" => Some(DitherAlgorithm::JarvisJudiceNinke),
        "stucki" => Some(DitherAlgorithm::Stucki),
        "burkes" => Some(DitherAlgorithm::Burkes),
        "fan" => Some(DitherAlgorithm::Fan),
        "sierra3" | "sierra_3" => Some(DitherAlgorithm::Sierra3),
        "sierra2" | "sierra_2" => Some(DitherAlgorithm::Sierra2),
        // 2-4A is commonly called "filter lite" or "sierra lite"
        "sierra24a" | "sierra_2_4a" | "sierra_lite" | "filter_lite" => {
            Some(DitherAlgorithm::Sierra24A)
        }
        "atkinson" => Some(DitherAlgorithm::Atkinson),
        "shiaufan4" | "shiau_fan_4" | "shiau_fan4" => Some(DitherAlgorithm::ShiauFan4),
        "shiaufan5" | "shiau_fan_5" | "shiau_fan5" => Some(DitherAlgorithm::ShiauFan5),
        _ => None,
    }
}

#[rustfmt::skip]
const KERNELS: [Kernel; 11] = [
    // Floyd-Steinberg
    [
        [0.0, 0.0, 0.0,        0.0,        7.0 / 16.0, 0.0],
        [0.0, 0.0, 3.0 / 16.0, 5.0 / 16.0, 1.0 / 16.0, 0.0],
        [0.0, 0.0, 0.0,        0.0,        0.0,        0.0],
    ],
    // Jarvis, Judice, Ninke
    [
        [0.0, 0.0,        0.0,        0.0,        7.0 / 48.0, 5.0 / 48.0],
        [0.0, 3.0 / 48.0, 5.0 / 48.0, 7.0 / 48.0, 5.0 / 48.0, 3.0 / 48.0],
        [0.0, 1.0 / 48.0, 3.0 / 48.0, 5.0 / 48.0, 3.0 / 48.0, 1.0 / 48.0],
    ],
    // Stucki
    [
        [0.0, 0.0,        0.0,        0.0,        8.0 / 42.0, 4.0 / 42.0],
        [0.0, 2.0 / 42.0, 4.0 / 42.0, 8.0 / 42.0, 4.0 / 42.0, 2.0 / 42.0],
        [0.0, 1.0 / 42.0, 2.0 / 42.0, 4.0 / 42.0, 2.0 / 42.0, 1.0 / 42.0],
    ],
    // Burkes
    [
        [0.0, 0.0,        0.0,        0.0,        8.0 / 32.0, 4.0 / 32.0],
        [0.0, 2.0 / 32.0, 4.0 / 32.0, 8.0 / 32.0, 4.0 / 32.0, 2.0 / 32.0],
        [0.0, 0.0,        0.0,        0.0,        0.0,        0.0],
    ],
    // Fan
    [
        [0.0, 0.0,        0.0,        0.0,        7.0 / 16.0, 0.0],
        [0.0, 1.0 / 16.0, 3.0 / 16.0, 5.0 / 16.0, 0.0,        0.0],
        [0.0, 0.0,        0.0,        0.0,        0.0,        0.0],
    ],
    // Sierra 3
    [
        [0.0, 0.0,        0.0,        0.0,        5.0 / 32.0, 3.0 / 32.0],
        [0.0, 2.0 / 32.0, 4.0 / 32.0, 5.0 / 32.0, 4.0 / 32.0, 2.0 / 32.0],
        [0.0, 0.0,        2.0 / 32.0, 3.0 / 32.0, 2.0 / 32.0, 0.0],
    ],
    // Sierra 2
    [
        [0.0, 0.0,        0.0,        0.0,        4.0 / 16.0, 3.0 / 16.0],
        [0.0, 1.0 / 16.0, 2.0 / 16.0, 3.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
        [0.0, 0.0,        0.0,        0.0,        0.0,        0.0],
    ],
    // Sierra 2-4A
    [
        [0.0, 0.0, 0.0,       0.0,       2.0 / 4.0, 0.0],
        [0.0, 0.0, 1.0 / 4.0, 1.0 / 4.0, 0.0,       0.0],
        [0.0, 0.0, 0.0,       0.0,       0.0,       0.0],
    ],
    // Atkinson
    [
        [0.0, 0.0, 0.0,       0.0,       1.0 / 8.0, 1.0 / 8.0],
        [0.0, 0.0, 1.0 / 8.0, 1.0 / 8.0, 1.0 / 8.0, 0.0],
        [0.0, 0.0, 0.0,       1.0 / 8.0, 0.0,       0.0],
    ],
    // Shiau-Fan 4-cell
    [
        [0.0, 0.0,       0.0,       0.0,       4.0 / 8.0, 0.0],
        [0.0, 1.0 / 8.0, 1.0 / 8.0, 2.0 / 8.0, 0.0,       0.0],
        [0.0, 0.0,       0.0,       0.0,       0.0,       0.0],
    ],
    // Shiau-Fan 5-cell
    [
        [0.0,        0.0,        0.0,        0.0,        8.0 / 16.0, 0.0],
        [1.0 / 16.0, 1.0 / 16.0, 2.0 / 16.0, 4.0 / 16.0, 0.0,        0.0],
        [0.0,        0.0,        0.0,        0.0,        0.0,        0.0],
    ],
];

/// Lookup table reshaping a channel residual before it is diffused.
///
/// Indexed by `256 + delta` for `delta` in `-255..=255`. Level 0 is linear.
#[derive(Debug, Clone)]
pub struct LevelCurve {
    table: [f32; 512],
}

impl LevelCurve {
    pub fn new(level: u32) -> Self {
        let mut table = [0.0f32; 512];
        for i in 1..256usize {
            let v = if level > 0 {
                (i as f64).powf(level as f64 / 100.0) as f32
            } else {
                i as f32
            };
            table[256 + i] = v;
            table[256 - i] = -v;
        }
        LevelCurve { table }
    }

    #[inline(always)]
    pub fn weight(&self, delta: i32) -> f32 {
        self.table[(256 + delta) as usize]
    }
}

/// Per-channel diffused error with a `SHIFT` border on every side.
#[derive(Debug, Clone)]
pub struct ErrorPlane {
    data: Vec<f32>,
    stride: usize,
}

impl ErrorPlane {
    pub fn new(width: usize, height: usize) -> Self {
        let stride = width + 2 * SHIFT;
        ErrorPlane {
            data: vec![0.0; stride * (height + 2 * SHIFT)],
            stride,
        }
    }

    /// Error accumulated for image pixel (x, y).
    #[inline(always)]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.stride + x + SHIFT]
    }

    #[inline(always)]
    fn add(&mut self, col: usize, y: usize, v: f32) {
        let cell = &mut self.data[y * self.stride + col];
        *cell += v;
    }

    /// Spread `w` from image pixel (x, y) over the 12 kernel cells.
    pub fn propagate(&mut self, kernel: &Kernel, w: f32, x: usize, y: usize) {
        let col = x + SHIFT;
        self.add(col + 1, y, w * kernel[0][4]);
        self.add(col + 2, y, w * kernel[0][5]);
        for (dy, row) in kernel.iter().enumerate().skip(1) {
            for (k, weight) in row.iter().enumerate() {
                self.add(col - SHIFT + k, y + dy, w * weight);
            }
        }
    }
}

/// One palette index per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl IndexedImage {
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}

/// Palette, kernel and curve shared by every image of one run.
#[derive(Debug, Clone)]
pub struct Ditherer<'a> {
    palette: &'a Palette,
    kernel: &'static Kernel,
    curve: LevelCurve,
}

impl<'a> Ditherer<'a> {
    pub fn new(palette: &'a Palette, algorithm: DitherAlgorithm, level: u32) -> Result<Self> {
        if palette.is_empty() {
            return Err(Error::EmptyPalette);
        }
        Ok(Ditherer {
            palette,
            kernel: algorithm.kernel(),
            curve: LevelCurve::new(level),
        })
    }

    /// Quantize an RGBA8 buffer (`width * height * 4` bytes) to palette indices.
    ///
    /// Alpha is ignored here; transparency is extracted separately.
    pub fn dither(&self, pixels: &[u8], width: usize, height: usize) -> IndexedImage {
        debug_assert_eq!(pixels.len(), width * height * 4);
        let mut planes = [
            ErrorPlane::new(width, height),
            ErrorPlane::new(width, height),
            ErrorPlane::new(width, height),
        ];
        let mut out = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let i = (y * width + x) * 4;
                let mut proposed = [0u8; 3];
                for c in 0..3 {
                    proposed[c] = round_clip(pixels[i + c], planes[c].at(x, y));
                }
                let best = self.palette.nearest_index(proposed);
                let chosen = self.palette.colors()[best as usize];
                for c in 0..3 {
                    let residual = proposed[c] as i32 - chosen[c] as i32;
                    let w = self.curve.weight(residual);
                    planes[c].propagate(self.kernel, w, x, y);
                }
                out.push(best);
            }
        }
        IndexedImage {
            width,
            height,
            pixels: out,
        }
    }
}

/// Add diffused error, round by adding 0.5 and truncating toward zero, clip to 0..=255.
#[inline(always)]
fn round_clip(value: u8, err: f32) -> u8 {
    let v = (value as f64 + (err as f64 + 0.5)) as i64;
    v.clamp(0, 255) as u8
}

/// Convenience wrapper for a single image.
pub fn dither_image(
    pixels: &[u8],
    width: usize,
    height: usize,
    palette: &Palette,
    algorithm: DitherAlgorithm,
    level: u32,
) -> Result<IndexedImage> {
    Ok(Ditherer::new(palette, algorithm, level)?.dither(pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Vec<u8> {
        let mut img = vec![0u8; width * height * 4];
        for y in 0..height {
            for x in 0..width {
                let i = (y * width + x) * 4;
                img[i] = (x * 255 / width.max(1)) as u8;
                img[i + 1] = (y * 255 / height.max(1)) as u8;
                img[i + 2] = (((x + y) * 8) % 256) as u8;
                img[i + 3] = 255;
            }
        }
        img
    }

    #[test]
    fn kernels_sum_to_one() {
        for alg in DitherAlgorithm::ALL {
            let sum: f32 = alg.kernel().iter().flatten().sum();
            assert!((sum - 1.0).abs() < 1e-6, "{alg} sums to {sum}");
            // Nothing may flow backwards into the current row.
            assert!(alg.kernel()[0][..4].iter().all(|&w| w == 0.0), "{alg}");
        }
    }

    #[test]
    fn resolves_short_and_long_names() {
        assert_eq!(resolve_algorithm("FldStnbrg"), Some(DitherAlgorithm::FloydSteinberg));
        assert_eq!(resolve_algorithm("floyd-steinberg"), Some(DitherAlgorithm::FloydSteinberg));
        assert_eq!(resolve_algorithm("JRVJDCNNK"), Some(DitherAlgorithm::JarvisJudiceNinke));
        assert_eq!(resolve_algorithm("sierra24a"), Some(DitherAlgorithm::Sierra24A));
        assert_eq!(resolve_algorithm("ShiauFan5"), Some(DitherAlgorithm::ShiauFan5));
        assert_eq!(resolve_algorithm("bayer_8"), None);
        for alg in DitherAlgorithm::ALL {
            assert_eq!(alg.short_name().parse::<DitherAlgorithm>(), Ok(alg));
        }
        assert!("nope".parse::<DitherAlgorithm>().is_err());
    }

    #[test]
    fn level_curve_shapes() {
        let linear = LevelCurve::new(0);
        assert_eq!(linear.weight(0), 0.0);
        assert_eq!(linear.weight(17), 17.0);
        assert_eq!(linear.weight(-255), -255.0);

        let full = LevelCurve::new(100);
        assert_eq!(full.weight(42), 42.0);
        assert_eq!(full.weight(-42), -42.0);

        let half = LevelCurve::new(50);
        assert!((half.weight(16) - 4.0).abs() < 1e-5);
        assert!((half.weight(-16) + 4.0).abs() < 1e-5);
        assert!((half.weight(255) - 255f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn propagate_touches_the_twelve_cells() {
        let mut plane = ErrorPlane::new(8, 4);
        let kernel = DitherAlgorithm::Sierra3.kernel();
        plane.propagate(kernel, 32.0, 3, 0);
        assert_eq!(plane.at(4, 0), 5.0);
        assert_eq!(plane.at(5, 0), 3.0);
        assert_eq!(plane.at(1, 1), 2.0);
        assert_eq!(plane.at(3, 1), 5.0);
        assert_eq!(plane.at(5, 1), 2.0);
        assert_eq!(plane.at(1, 2), 0.0);
        assert_eq!(plane.at(2, 2), 2.0);
        assert_eq!(plane.at(3, 2), 3.0);
        assert_eq!(plane.at(3, 0), 0.0);
        assert_eq!(plane.at(2, 0), 0.0);
    }

    #[test]
    fn propagate_at_edges_stays_in_border() {
        let mut plane = ErrorPlane::new(2, 1);
        let kernel = DitherAlgorithm::ShiauFan5.kernel();
        plane.propagate(kernel, 16.0, 0, 0);
        plane.propagate(kernel, 16.0, 1, 0);
        assert_eq!(plane.at(1, 0), 8.0);
    }

    #[test]
    fn rounding_adds_half_then_truncates() {
        assert_eq!(round_clip(10, 0.4), 10);
        assert_eq!(round_clip(10, 0.5), 11);
        assert_eq!(round_clip(10, -0.4), 10);
        // 10 - 0.7 + 0.5 = 9.8 truncates to 9.
        assert_eq!(round_clip(10, -0.7), 9);
        assert_eq!(round_clip(0, -0.7), 0);
        assert_eq!(round_clip(250, 40.0), 255);
        assert_eq!(round_clip(3, -40.0), 0);
    }

    #[test]
    fn single_color_palette_maps_everything_to_zero() {
        let palette = Palette::from_rgb(&[[10, 20, 30]]).unwrap();
        let img = gradient(8, 1);
        for alg in DitherAlgorithm::ALL {
            let out = dither_image(&img, 8, 1, &palette, alg, 0).unwrap();
            assert_eq!(out.pixels, vec![0u8; 8]);
        }
    }

    #[test]
    fn exact_palette_colors_have_no_error() {
        let palette = Palette::from_rgb(&[[0, 0, 0], [255, 255, 255], [255, 0, 0]]).unwrap();
        let mut img = Vec::new();
        for (i, c) in [[0, 0, 0], [255, 255, 255], [255, 0, 0]].iter().cycle().take(12).enumerate() {
            img.extend_from_slice(&[c[0], c[1], c[2], (i * 20) as u8]);
        }
        let out = dither_image(&img, 4, 3, &palette, DitherAlgorithm::Stucki, 100).unwrap();
        assert_eq!(out.pixels, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2]);
        assert_eq!(out.row(1), &[1, 2, 0, 1]);
        assert_eq!(out.get(3, 2), 2);
    }

    #[test]
    fn diffusion_mixes_two_colors() {
        // Mid gray between black and white must alternate rather than collapse.
        let palette = Palette::from_rgb(&[[0, 0, 0], [255, 255, 255]]).unwrap();
        let img: Vec<u8> = (0..16).flat_map(|_| [128, 128, 128, 255]).collect();
        let out = dither_image(&img, 16, 1, &palette, DitherAlgorithm::FloydSteinberg, 100).unwrap();
        let whites = out.pixels.iter().filter(|&&p| p == 1).count();
        assert!((6..=10).contains(&whites), "got {whites} whites");
        assert_eq!(&out.pixels[..4], &[1, 0, 1, 0]);
    }

    #[test]
    fn dither_is_deterministic_for_every_kernel() {
        let palette = Palette::from_rgb(&[
            [0, 0, 0],
            [255, 255, 255],
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
        ])
        .unwrap();
        let img = gradient(16, 16);
        for alg in DitherAlgorithm::ALL {
            for level in [0, 37, 100] {
                let a = dither_image(&img, 16, 16, &palette, alg, level).unwrap();
                let b = dither_image(&img, 16, 16, &palette, alg, level).unwrap();
                assert_eq!(a, b);
                assert!(a.pixels.iter().all(|&p| (p as usize) < palette.len()));
            }
        }
    }

    #[test]
    fn empty_palette_is_rejected() {
        let palette = Palette::default();
        assert!(matches!(
            Ditherer::new(&palette, DitherAlgorithm::Fan, 100),
            Err(Error::EmptyPalette)
        ));
    }
}
