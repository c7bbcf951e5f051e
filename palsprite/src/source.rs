use std::io::ErrorKind;
use std::path::Path;

use image::{ColorType, DynamicImage, ImageFormat};

use crate::error::{Error, Result};

/// Decoded truecolor raster, always stored as interleaved RGBA8.
///
/// `has_alpha` records whether the file carried transparency; for RGB sources
/// the alpha bytes are 255 and are never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub width: usize,
    pub height: usize,
    pub has_alpha: bool,
    pub pixels: Vec<u8>,
}

impl SourceImage {
    pub fn from_rgba(width: usize, height: usize, has_alpha: bool, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), width * height * 4, "RGBA buffer size mismatch");
        SourceImage {
            width,
            height,
            has_alpha,
            pixels,
        }
    }

    /// Accept RGB and RGBA images of any channel depth; 16-bit channels keep
    /// their high byte. Grayscale is rejected.
    pub fn from_dynamic(img: DynamicImage, path: &Path) -> Result<Self> {
        let has_alpha = match img.color() {
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => false,
            ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => true,
            ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
                return Err(Error::BadFileFormat {
                    path: path.to_path_buf(),
                    reason: "grayscale image not supported".into(),
                });
            }
            other => {
                return Err(Error::BadFileFormat {
                    path: path.to_path_buf(),
                    reason: format!("unsupported color mode {other:?}"),
                });
            }
        };
        let (w, h) = (img.width() as usize, img.height() as usize);
        let pixels = match img.color() {
            ColorType::Rgb16 | ColorType::Rgba16 => img
                .to_rgba16()
                .into_raw()
                .into_iter()
                .map(|v| (v >> 8) as u8)
                .collect(),
            _ => img.to_rgba8().into_raw(),
        };
        Ok(Self::from_rgba(w, h, has_alpha, pixels))
    }

    /// Decode a PNG from memory. Anything without a PNG signature is rejected.
    pub fn decode_png(bytes: &[u8], path: &Path) -> Result<Self> {
        if !matches!(image::guess_format(bytes), Ok(ImageFormat::Png)) {
            return Err(Error::BadFileFormat {
                path: path.to_path_buf(),
                reason: "not a PNG file".into(),
            });
        }
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|e| {
            match e {
                image::ImageError::IoError(io) => Error::FileRead {
                    path: path.to_path_buf(),
                    reason: io.to_string(),
                },
                other => Error::BadFileFormat {
                    path: path.to_path_buf(),
                    reason: format!("PNG error: {other}"),
                },
            }
        })?;
        Self::from_dynamic(img, path)
    }

    pub fn load_png(path: &Path) -> Result<Self> {
        let bytes = read_file(path)?;
        Self::decode_png(&bytes, path)
    }
}

/// Read a whole input file, classifying the failure.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => Error::CannotOpen {
            path: path.to_path_buf(),
            source: e,
        },
        _ => Error::FileRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })
}
