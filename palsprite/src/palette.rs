//! Fixed output palette loaded from a 6-bit-per-channel `.pal` file.
//!
//! Entry order is the index written by the encoders. Each raw channel byte is
//! widened with `(v << 2) + 1`, so a fully saturated 6-bit value (63) becomes 253.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Number of colors the game palette files carry.
pub const DEFAULT_COLOR_COUNT: usize = 256;

/// Packed 32-bit color: `r | g << 8 | b << 16 | a << 24`.
///
/// Alpha is 0 for a pixel forced transparent and 255 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quad(pub u32);

impl Quad {
    pub const OPAQUE: u8 = 255;

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Quad(r as u32 | (g as u32) << 8 | (b as u32) << 16 | (a as u32) << 24)
    }

    pub fn r(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub fn b(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

#[derive(Debug, Clone, Default)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
    by_quad: HashMap<Quad, u8>,
}

impl Palette {
    /// Parse `color_count` triples from raw palette bytes.
    ///
    /// A trailing partial triple is ignored; extra complete triples are dropped
    /// with a warning.
    pub fn load(raw: &[u8], color_count: usize) -> Result<Self> {
        if color_count == 0 {
            return Err(Error::EmptyPalette);
        }
        if color_count > 256 {
            return Err(Error::LimitExceeded(format!(
                "palette of {color_count} colors does not fit 8-bit indices"
            )));
        }
        let available = raw.len() / 3;
        if available < color_count {
            return Err(Error::IncompletePalette {
                got: available,
                expected: color_count,
            });
        }
        if available > color_count {
            tracing::warn!(
                got = available,
                expected = color_count,
                "palette file has extra colors; ignoring the tail"
            );
        }
        let mut palette = Palette::default();
        for triple in raw.chunks_exact(3).take(color_count) {
            let [r, g, b] = [triple[0], triple[1], triple[2]].map(widen_channel);
            palette.push(Quad::new(r, g, b, Quad::OPAQUE));
        }
        Ok(palette)
    }

    /// Build a palette from already 8-bit colors, e.g. for synthetic tests.
    pub fn from_rgb(colors: &[[u8; 3]]) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::EmptyPalette);
        }
        if colors.len() > 256 {
            return Err(Error::LimitExceeded(format!(
                "palette of {} colors does not fit 8-bit indices",
                colors.len()
            )));
        }
        let mut palette = Palette::default();
        for c in colors {
            palette.push(Quad::new(c[0], c[1], c[2], Quad::OPAQUE));
        }
        Ok(palette)
    }

    fn push(&mut self, quad: Quad) {
        let index = self.colors.len() as u8;
        self.colors.push([quad.r(), quad.g(), quad.b()]);
        self.by_quad.insert(quad, index);
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.colors.get(index as usize).copied()
    }

    /// Exact reverse lookup; a later duplicate entry shadows an earlier one.
    pub fn index_of(&self, quad: Quad) -> Option<u8> {
        self.by_quad.get(&quad).copied()
    }

    /// Smallest bit depth in {1, 2, 4, 8} able to address every entry.
    pub fn bits_per_pixel(&self) -> u32 {
        match self.colors.len() {
            0..=2 => 1,
            3..=4 => 2,
            5..=16 => 4,
            _ => 8,
        }
    }

    /// Linear scan for the entry with the smallest squared RGB distance.
    ///
    /// Comparison is strict, so the lowest index wins ties.
    pub fn nearest_index(&self, rgb: [u8; 3]) -> u8 {
        let (r, g, b) = (rgb[0] as i32, rgb[1] as i32, rgb[2] as i32);
        let mut best = 0usize;
        let mut best_dist = i32::MAX;
        for (idx, pal) in self.colors.iter().enumerate() {
            let dr = r - pal[0] as i32;
            let dg = g - pal[1] as i32;
            let db = b - pal[2] as i32;
            let dist = dr * dr + dg * dg + db * db;
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
        }
        best as u8
    }
}

#[inline(always)]
fn widen_channel(v: u8) -> u8 {
    (v << 2).wrapping_add(1)
}
