use rayon::prelude::*;

use crate::dither::{DitherAlgorithm, Ditherer};
use crate::encode::sspr::SpriteSheet;
use crate::encode::{OutputFormat, Sprite, WordWidth, hspr, raw, sspr};
use crate::error::{Error, Result};
use crate::mask::{DEFAULT_TRANSPARENCY_THRESHOLD, TransparencyMask};
use crate::palette::{DEFAULT_COLOR_COUNT, Palette};
use crate::source::SourceImage;

/// Everything a conversion run depends on besides its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub format: OutputFormat,
    pub algorithm: DitherAlgorithm,
    /// Level curve exponent in percent; 0 keeps the error linear.
    pub level: u32,
    pub colors: usize,
    pub transparency_threshold: u8,
    pub word_width: WordWidth,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            format: OutputFormat::Raw,
            algorithm: DitherAlgorithm::FloydSteinberg,
            level: 100,
            colors: DEFAULT_COLOR_COUNT,
            transparency_threshold: DEFAULT_TRANSPARENCY_THRESHOLD,
            word_width: WordWidth::W32,
        }
    }
}

/// Encoded output of one run, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Raw(Vec<u8>),
    Hspr(Vec<u8>),
    Sspr(SpriteSheet),
}

/// Quantize one image and extract its mask.
pub fn convert_image(src: &SourceImage, ditherer: &Ditherer, threshold: u8) -> Sprite {
    let indexed = ditherer.dither(&src.pixels, src.width, src.height);
    let mask = TransparencyMask::extract(
        &src.pixels,
        src.width,
        src.height,
        src.has_alpha,
        threshold,
    );
    Sprite::new(indexed, mask)
}

/// Quantize every image. Images are independent and run in parallel; the
/// result keeps input order.
pub fn convert_all(
    images: &[SourceImage],
    palette: &Palette,
    opts: &ConvertOptions,
) -> Result<Vec<Sprite>> {
    let ditherer = Ditherer::new(palette, opts.algorithm, opts.level)?;
    Ok(images
        .par_iter()
        .enumerate()
        .map(|(i, src)| {
            tracing::info!(
                image = i,
                width = src.width,
                height = src.height,
                "converting image colors to indexes"
            );
            convert_image(src, &ditherer, opts.transparency_threshold)
        })
        .collect())
}

/// Serialize converted sprites in the requested format.
pub fn encode(sprites: &[Sprite], palette: &Palette, opts: &ConvertOptions) -> Result<Encoded> {
    check_image_count(opts.format, sprites.len())?;
    match opts.format {
        OutputFormat::Raw => Ok(Encoded::Raw(raw::encode(
            &sprites[0].indexed,
            palette.bits_per_pixel(),
        ))),
        OutputFormat::Hspr => Ok(Encoded::Hspr(hspr::encode(&sprites[0], opts.word_width)?)),
        OutputFormat::Sspr => Ok(Encoded::Sspr(sspr::encode(sprites, opts.word_width)?)),
    }
}

/// RAW and HSPR take exactly one image; SSPR up to its table limit.
pub fn check_image_count(format: OutputFormat, count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::NoInput);
    }
    if count > format.max_images() {
        return Err(Error::LimitExceeded(format!(
            "{format:?} supports at most {} input image(s), got {count}",
            format.max_images()
        )));
    }
    Ok(())
}

/// Convert and encode in one step.
pub fn process(images: &[SourceImage], palette: &Palette, opts: &ConvertOptions) -> Result<Encoded> {
    check_image_count(opts.format, images.len())?;
    let sprites = convert_all(images, palette, opts)?;
    encode(&sprites, palette, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(width: usize, height: usize, rgb: [u8; 3]) -> SourceImage {
        let pixels = (0..width * height)
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect();
        SourceImage::from_rgba(width, height, false, pixels)
    }

    #[test]
    fn single_entry_palette_end_to_end() {
        let palette = Palette::from_rgb(&[[10, 20, 30]]).unwrap();
        let opts = ConvertOptions {
            format: OutputFormat::Sspr,
            level: 0,
            ..Default::default()
        };
        let src = opaque(8, 1, [200, 100, 50]);
        let sprites = convert_all(std::slice::from_ref(&src), &palette, &opts).unwrap();
        assert_eq!(sprites[0].indexed.pixels, vec![0u8; 8]);
        let Encoded::Sspr(sheet) = encode(&sprites, &palette, &opts).unwrap() else {
            panic!("expected SSPR output");
        };
        let mut expected = vec![2u8, 0, 8];
        expected.extend([0u8; 8]);
        expected.push(0);
        assert_eq!(sheet.data, expected);
    }

    #[test]
    fn alternating_transparency_end_to_end() {
        let palette = Palette::from_rgb(&[[10, 20, 30]]).unwrap();
        let opts = ConvertOptions {
            format: OutputFormat::Sspr,
            level: 0,
            ..Default::default()
        };
        let pixels = [255u8, 0, 255, 0]
            .iter()
            .flat_map(|&a| [10, 20, 30, a])
            .collect();
        let src = SourceImage::from_rgba(4, 1, true, pixels);
        let Encoded::Sspr(sheet) = process(&[src], &palette, &opts).unwrap() else {
            panic!("expected SSPR output");
        };
        assert_eq!(&sheet.data[2..], &[1, 0, 0xff, 1, 0, 0]);
    }

    #[test]
    fn raw_uses_palette_bit_depth() {
        let palette = Palette::from_rgb(&[[0, 0, 0], [255, 255, 255]]).unwrap();
        let opts = ConvertOptions::default();
        let src = opaque(9, 2, [255, 255, 255]);
        let Encoded::Raw(bytes) = process(&[src], &palette, &opts).unwrap() else {
            panic!("expected RAW output");
        };
        assert_eq!(bytes, vec![0xff, 0x80, 0, 0, 0xff, 0x80, 0, 0]);
    }

    #[test]
    fn single_image_formats_reject_more() {
        let palette = Palette::from_rgb(&[[0, 0, 0]]).unwrap();
        let images = vec![opaque(1, 1, [0, 0, 0]), opaque(1, 1, [0, 0, 0])];
        for format in [OutputFormat::Raw, OutputFormat::Hspr] {
            let opts = ConvertOptions {
                format,
                ..Default::default()
            };
            assert!(matches!(
                process(&images, &palette, &opts),
                Err(Error::LimitExceeded(_))
            ));
        }
        let opts = ConvertOptions {
            format: OutputFormat::Sspr,
            ..Default::default()
        };
        assert!(process(&images, &palette, &opts).is_ok());
        assert!(matches!(process(&[], &palette, &opts), Err(Error::NoInput)));
    }

    #[test]
    fn parallel_conversion_keeps_order() {
        let palette = Palette::from_rgb(&[[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]]).unwrap();
        let images: Vec<_> = (0..8)
            .map(|i| opaque(3, 3, [[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]][i % 4]))
            .collect();
        let sprites = convert_all(&images, &palette, &ConvertOptions::default()).unwrap();
        for (i, s) in sprites.iter().enumerate() {
            assert!(s.indexed.pixels.iter().all(|&p| p as usize == i % 4));
        }
    }
}
