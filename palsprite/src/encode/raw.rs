//! Headerless packed scanlines.

use crate::dither::IndexedImage;

/// Bytes per output row: packed length rounded up to a multiple of 4.
pub fn line_len(width: usize, bits: u32) -> usize {
    let per_byte = pixels_per_byte(bits);
    (width.div_ceil(per_byte) + 3) & !3
}

fn pixels_per_byte(bits: u32) -> usize {
    (8 / bits.clamp(1, 8)) as usize
}

/// Pack `8 / bits` indices per byte, first pixel in the most significant bits.
///
/// A trailing partial byte is left-aligned. Indices are masked to `bits`.
pub fn pack_row(row: &[u8], bits: u32) -> Vec<u8> {
    let per_byte = pixels_per_byte(bits);
    if per_byte <= 1 {
        return row.to_vec();
    }
    let mask = ((1u16 << bits) - 1) as u8;
    row.chunks(per_byte)
        .map(|chunk| {
            let mut byte = 0u8;
            for (i, &px) in chunk.iter().enumerate() {
                let shift = 8 - bits as usize * (i + 1);
                byte |= (px & mask) << shift;
            }
            byte
        })
        .collect()
}

/// Serialize every row packed at `bits` per pixel and zero-padded to [`line_len`].
pub fn encode(image: &IndexedImage, bits: u32) -> Vec<u8> {
    let stride = line_len(image.width, bits);
    let mut out = Vec::with_capacity(stride * image.height);
    for y in 0..image.height {
        let packed = pack_row(image.row(y), bits);
        out.extend_from_slice(&packed);
        out.resize(out.len() + stride - packed.len(), 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: usize, height: usize, pixels: Vec<u8>) -> IndexedImage {
        IndexedImage {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn eight_bit_rows_are_copied_then_padded() {
        let img = image(5, 2, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(pack_row(img.row(0), 8).len(), 5);
        assert_eq!(line_len(5, 8), 8);
        let out = encode(&img, 8);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 0, 0, 0, 6, 7, 8, 9, 10, 0, 0, 0]);
    }

    #[test]
    fn one_bit_packs_eight_per_byte() {
        let row = [1, 0, 1, 1, 0, 0, 0, 1, 1, 1];
        let packed = pack_row(&row, 1);
        assert_eq!(packed.len(), 10usize.div_ceil(8));
        assert_eq!(packed, vec![0b1011_0001, 0b1100_0000]);
        let out = encode(&image(10, 1, row.to_vec()), 1);
        assert_eq!(out, vec![0b1011_0001, 0b1100_0000, 0, 0]);
    }

    #[test]
    fn four_bit_packs_high_nibble_first() {
        let packed = pack_row(&[0xa, 0x3, 0xf, 0x1, 0x7], 4);
        assert_eq!(packed, vec![0xa3, 0xf1, 0x70]);
    }

    #[test]
    fn two_bit_masks_out_of_range_indices() {
        let packed = pack_row(&[3, 2, 1, 0, 7], 2);
        assert_eq!(packed, vec![0b1110_0100, 0b1100_0000]);
    }

    #[test]
    fn line_len_is_word_aligned() {
        assert_eq!(line_len(1, 8), 4);
        assert_eq!(line_len(4, 8), 4);
        assert_eq!(line_len(33, 1), 8);
        assert_eq!(line_len(9, 4), 8);
        assert_eq!(line_len(0, 8), 0);
    }
}
