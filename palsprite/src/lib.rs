//! Palette-indexed sprite conversion.
//!
//! Truecolor images are error-diffusion dithered against a fixed palette and
//! serialized as headerless packed RAW, "huge sprite" HSPR or multi-sprite SSPR
//! files.

pub mod cli;
pub mod config;
pub mod dither;
pub mod encode;
pub mod error;
pub mod mask;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod source;

pub use error::{Error, Result};
