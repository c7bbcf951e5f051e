//! One-bit transparency mask, MSB first, rows padded to 4 bytes.
//!
//! This is the AND-mask layout: a set bit marks a transparent pixel. Bits past
//! the last pixel of a row are set as well, padding bytes stay zero.

/// Alpha below this value counts as transparent.
pub const DEFAULT_TRANSPARENCY_THRESHOLD: u8 = 196;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransparencyMask {
    width: usize,
    height: usize,
    stride: usize,
    bits: Vec<u8>,
}

/// Bytes per mask row: `ceil(width / 8)` rounded up to a multiple of 4.
pub fn mask_line_len(width: usize) -> usize {
    (width.div_ceil(8) + 3) & !3
}

impl TransparencyMask {
    /// Derive the mask from an RGBA8 buffer.
    ///
    /// Sources without an alpha channel never produce transparent pixels.
    pub fn extract(
        pixels: &[u8],
        width: usize,
        height: usize,
        has_alpha: bool,
        threshold: u8,
    ) -> Self {
        let stride = mask_line_len(width);
        let mut bits = vec![0u8; stride * height];
        for y in 0..height {
            let row = &mut bits[y * stride..(y + 1) * stride];
            for x in 0..width {
                let alpha = pixels[(y * width + x) * 4 + 3];
                if has_alpha && alpha < threshold {
                    row[x >> 3] |= 0x80 >> (x & 7);
                }
            }
            // Fill the remainder of the last partial byte.
            for x in width..width.div_ceil(8) * 8 {
                row[x >> 3] |= 0x80 >> (x & 7);
            }
        }
        TransparencyMask {
            width,
            height,
            stride,
            bits,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline(always)]
    pub fn is_transparent(&self, x: usize, y: usize) -> bool {
        self.bits[y * self.stride + (x >> 3)] & (0x80 >> (x & 7)) != 0
    }

    /// Packed bits of one row, including padding.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.bits[y * self.stride..(y + 1) * self.stride]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}
