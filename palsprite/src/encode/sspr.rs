//! "Small sprite" RLE: many sprites per data file plus a record table.
//!
//! Data file: `u16` sprite count (images + 1), then every sprite's rows. A row
//! is a list of signed byte runs: `n > 0` followed by `n` indices, `n < 0` for
//! `-n` transparent pixels. Runs are at most 127 long and each row ends with
//! `0`. Transparency that reaches the right edge is not written at all.
//!
//! Table file: packed `{word offset, u8 width, u8 height}` records, offsets
//! relative to the start of the data file, followed by one all-zero record.

use super::{Sprite, WordWidth};
use crate::error::{Error, Result};

/// Longest run a signed byte prefix can describe.
pub const MAX_RUN: usize = 127;

/// The count field also covers the trailing sentinel record.
pub const MAX_SPRITES: usize = u16::MAX as usize - 1;

/// Largest sprite side a table record can hold.
pub const MAX_SIDE: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub offset: u64,
    pub width: u8,
    pub height: u8,
}

impl TableRecord {
    const SENTINEL: TableRecord = TableRecord {
        offset: 0,
        width: 0,
        height: 0,
    };
}

/// Both output streams of an SSPR run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSheet {
    pub data: Vec<u8>,
    pub table: Vec<u8>,
    pub records: Vec<TableRecord>,
}

/// Append one row's runs to `out`.
pub fn encode_row(out: &mut Vec<u8>, sprite: &Sprite, y: usize) {
    let row = sprite.indexed.row(y);
    let width = sprite.width();
    let mut x = 0;
    while x < width {
        let filled = sprite.run_len(x, y, false);
        tracing::debug!(y, x, filled, "fill area");
        for chunk in row[x..x + filled].chunks(MAX_RUN) {
            out.push(chunk.len() as u8);
            out.extend_from_slice(chunk);
        }
        x += filled;

        let mut clear = sprite.run_len(x, y, true);
        tracing::debug!(y, x, clear, "trans area");
        if x + clear >= width {
            x += clear;
            clear = 0;
        }
        while clear > 0 {
            let part = clear.min(MAX_RUN);
            out.push((-(part as i8)) as u8);
            x += part;
            clear -= part;
        }
    }
    out.push(0);
}

/// Encode all sprites into a data stream and its table.
pub fn encode(sprites: &[Sprite], word: WordWidth) -> Result<SpriteSheet> {
    if sprites.len() > MAX_SPRITES {
        return Err(Error::LimitExceeded(format!(
            "{} sprites given, SSPR holds at most {MAX_SPRITES}",
            sprites.len()
        )));
    }
    let count = (sprites.len() + 1) as u16;
    let mut data = count.to_le_bytes().to_vec();
    let mut records = Vec::with_capacity(sprites.len() + 1);
    for (i, sprite) in sprites.iter().enumerate() {
        let (width, height) = (sprite.width(), sprite.height());
        if width > MAX_SIDE || height > MAX_SIDE {
            return Err(Error::LimitExceeded(format!(
                "sprite {i} is {width}x{height}, SSPR sprites are at most {MAX_SIDE}x{MAX_SIDE}"
            )));
        }
        records.push(TableRecord {
            offset: data.len() as u64,
            width: width as u8,
            height: height as u8,
        });
        for y in 0..height {
            encode_row(&mut data, sprite, y);
        }
        tracing::debug!(sprite = i, width, height, "encoded SSPR sprite");
    }
    records.push(TableRecord::SENTINEL);

    let mut table = Vec::with_capacity(records.len() * (word.bytes() + 2));
    for rec in &records {
        word.write(&mut table, rec.offset)?;
        table.push(rec.width);
        table.push(rec.height);
    }
    Ok(SpriteSheet {
        data,
        table,
        records,
    })
}

/// Decode one row starting at `data[0]`; returns the pixels and bytes consumed.
///
/// Pixels after the last run are transparent.
pub fn decode_row(data: &[u8], width: usize) -> Result<(Vec<Option<u8>>, usize)> {
    let truncated = || Error::Malformed("SSPR row is truncated".into());
    let mut row = Vec::with_capacity(width);
    let mut pos = 0;
    loop {
        let n = *data.get(pos).ok_or_else(truncated)? as i8;
        pos += 1;
        match n {
            0 => break,
            n if n > 0 => {
                let bytes = data.get(pos..pos + n as usize).ok_or_else(truncated)?;
                row.extend(bytes.iter().map(|&b| Some(b)));
                pos += n as usize;
            }
            n => row.extend(std::iter::repeat_n(None, n.unsigned_abs() as usize)),
        }
        if row.len() > width {
            return Err(Error::Malformed(format!(
                "SSPR row overflows width {width}"
            )));
        }
    }
    row.resize(width, None);
    Ok((row, pos))
}
