//! "Huge sprite" RLE: a row offset table, then rows of word-sized runs.
//!
//! ```text
//! [word offset; height]            offsets relative to the end of this table
//! row := { [word n] [n indices] [word m] }*    n opaque, m transparent
//! ```
//! A row always starts with an opaque run, possibly empty.

use super::{Sprite, WordWidth};
use crate::error::{Error, Result};

pub fn encode(sprite: &Sprite, word: WordWidth) -> Result<Vec<u8>> {
    let header_len = sprite.height() * word.bytes();
    let mut out = vec![0u8; header_len];
    for y in 0..sprite.height() {
        let offset = (out.len() - header_len) as u64;
        word.patch(&mut out, y * word.bytes(), offset)?;
        encode_row(&mut out, sprite, y, word)?;
    }
    tracing::debug!(
        width = sprite.width(),
        height = sprite.height(),
        bytes = out.len(),
        "encoded HSPR"
    );
    Ok(out)
}

fn encode_row(out: &mut Vec<u8>, sprite: &Sprite, y: usize, word: WordWidth) -> Result<()> {
    let row = sprite.indexed.row(y);
    let mut x = 0;
    while x < sprite.width() {
        let filled = sprite.run_len(x, y, false);
        word.write(out, filled as u64)?;
        out.extend_from_slice(&row[x..x + filled]);
        x += filled;

        let clear = sprite.run_len(x, y, true);
        word.write(out, clear as u64)?;
        x += clear;
    }
    Ok(())
}

/// Decoded row: `Some(index)` for opaque pixels, `None` for transparent ones.
pub type DecodedRow = Vec<Option<u8>>;

/// Parse an HSPR stream back into rows.
pub fn decode(data: &[u8], width: usize, height: usize, word: WordWidth) -> Result<Vec<DecodedRow>> {
    let header_len = height
        .checked_mul(word.bytes())
        .ok_or_else(|| Error::Malformed(format!("HSPR height {height} is too large")))?;
    let truncated = || Error::Malformed("HSPR stream is truncated".into());
    let mut rows = Vec::with_capacity(height);
    for y in 0..height {
        let offset = read_len(data, y * word.bytes(), word)?;
        let mut pos = header_len.checked_add(offset).ok_or_else(truncated)?;
        let mut row = Vec::with_capacity(width);
        while row.len() < width {
            let filled = read_len(data, pos, word)?;
            pos += word.bytes();
            if filled > width - row.len() {
                return Err(overflow(y, width));
            }
            let bytes = data.get(pos..pos + filled).ok_or_else(truncated)?;
            row.extend(bytes.iter().map(|&b| Some(b)));
            pos += filled;

            let clear = read_len(data, pos, word)?;
            pos += word.bytes();
            if filled == 0 && clear == 0 {
                return Err(Error::Malformed(format!("HSPR row {y} has an empty run pair")));
            }
            if clear > width - row.len() {
                return Err(overflow(y, width));
            }
            row.extend(std::iter::repeat_n(None, clear));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Read a length or offset word; values past `usize` cannot address the stream.
fn read_len(data: &[u8], at: usize, word: WordWidth) -> Result<usize> {
    let value = word
        .read(data, at)
        .ok_or_else(|| Error::Malformed("HSPR stream is truncated".into()))?;
    usize::try_from(value).map_err(|_| Error::Malformed(format!("HSPR word {value} out of range")))
}

fn overflow(y: usize, width: usize) -> Error {
    Error::Malformed(format!("HSPR row {y} overflows width {width}"))
}
