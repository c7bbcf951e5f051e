//! Serializers for the three sprite file kinds.
//!
//! Encoders do no color math; they only lay out palette indices and the
//! transparency mask produced by the conversion step.

pub mod hspr;
pub mod raw;
pub mod sspr;

use serde::Deserialize;

use crate::dither::IndexedImage;
use crate::error::{Error, Result};
use crate::mask::TransparencyMask;

/// Output file kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Packed scanlines, no header, no transparency.
    #[default]
    Raw,
    /// Huge sprite: row offset table plus word-sized run lengths.
    Hspr,
    /// Small sprites: byte run lengths, many sprites per file, separate table file.
    Sspr,
}

impl OutputFormat {
    /// Only SSPR can carry more than one image.
    pub fn max_images(self) -> usize {
        match self {
            OutputFormat::Raw | OutputFormat::Hspr => 1,
            OutputFormat::Sspr => sspr::MAX_SPRITES,
        }
    }

    /// Extension used when no output path is given.
    pub fn default_extension(self) -> &'static str {
        match self {
            OutputFormat::Raw => "raw",
            OutputFormat::Hspr | OutputFormat::Sspr => "dat",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(OutputFormat::Raw),
            "hspr" => Ok(OutputFormat::Hspr),
            "sspr" => Ok(OutputFormat::Sspr),
            other => Err(format!("unknown output format '{other}' (expected RAW, HSPR or SSPR)")),
        }
    }
}

/// Width of the offset and run-length fields in HSPR files and of the offset
/// field in SSPR tables. Values are little-endian.
///
/// The game reads these as its native `long`/`size_t`, which is 32 bits on the
/// builds that consume these files. Pick 64 only for a reader built with 64-bit
/// native words; the two layouts are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u32")]
pub enum WordWidth {
    #[default]
    W32,
    W64,
}

impl WordWidth {
    pub fn bytes(self) -> usize {
        match self {
            WordWidth::W32 => 4,
            WordWidth::W64 => 8,
        }
    }

    fn encode(self, value: u64) -> Result<Vec<u8>> {
        match self {
            WordWidth::W32 => {
                let v = u32::try_from(value).map_err(|_| {
                    Error::LimitExceeded(format!("value {value} does not fit a 32-bit word"))
                })?;
                Ok(v.to_le_bytes().to_vec())
            }
            WordWidth::W64 => Ok(value.to_le_bytes().to_vec()),
        }
    }

    pub fn write(self, out: &mut Vec<u8>, value: u64) -> Result<()> {
        out.extend_from_slice(&self.encode(value)?);
        Ok(())
    }

    /// Overwrite a previously reserved word at `at`.
    pub fn patch(self, out: &mut [u8], at: usize, value: u64) -> Result<()> {
        let bytes = self.encode(value)?;
        out[at..at + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    /// Read a word at `at`, if the buffer is long enough.
    pub fn read(self, data: &[u8], at: usize) -> Option<u64> {
        let raw = data.get(at..at + self.bytes())?;
        Some(match self {
            WordWidth::W32 => u32::from_le_bytes(raw.try_into().ok()?) as u64,
            WordWidth::W64 => u64::from_le_bytes(raw.try_into().ok()?),
        })
    }
}

impl TryFrom<u32> for WordWidth {
    type Error = String;

    fn try_from(bits: u32) -> std::result::Result<Self, Self::Error> {
        match bits {
            32 => Ok(WordWidth::W32),
            64 => Ok(WordWidth::W64),
            other => Err(format!("word width must be 32 or 64, got {other}")),
        }
    }
}

impl std::str::FromStr for WordWidth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bits: u32 = s.parse().map_err(|_| format!("invalid word width '{s}'"))?;
        WordWidth::try_from(bits)
    }
}

/// A converted image: palette indices plus its transparency mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub indexed: IndexedImage,
    pub mask: TransparencyMask,
}

impl Sprite {
    pub fn new(indexed: IndexedImage, mask: TransparencyMask) -> Self {
        debug_assert_eq!(indexed.width, mask.width());
        debug_assert_eq!(indexed.height, mask.height());
        Sprite { indexed, mask }
    }

    pub fn width(&self) -> usize {
        self.indexed.width
    }

    pub fn height(&self) -> usize {
        self.indexed.height
    }

    /// Length of the run starting at `x` on row `y` whose pixels all have the
    /// given transparency.
    pub(crate) fn run_len(&self, x: usize, y: usize, transparent: bool) -> usize {
        (x..self.width())
            .take_while(|&i| self.mask.is_transparent(i, y) == transparent)
            .count()
    }
}
