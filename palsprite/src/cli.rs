//! Command line surface and the conversion run it drives.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use thiserror::Error;

use crate::config::Config;
use crate::dither::DitherAlgorithm;
use crate::encode::{OutputFormat, WordWidth};
use crate::output::{OutputPaths, write_encoded};
use crate::palette::Palette;
use crate::pipeline::{self, ConvertOptions};
use crate::source::{SourceImage, read_file};

#[derive(Parser, Debug, Clone)]
#[command(name = "palsprite", version)]
#[command(about = "Convert PNG images to palette-indexed RAW, HSPR or SSPR sprite files")]
pub struct Cli {
    /// Verbose console output; repeat for trace output
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// The input is a text file listing PNG files (one per line, globs allowed)
    #[arg(short, long)]
    pub batchlist: bool,

    /// Output file format: RAW, HSPR or SSPR
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Diffusion algorithm: FldStnbrg, JrvJdcNnk, Stucki, Burkes, Fan, Sierra3,
    /// Sierra2, Sierra24A, Atkinson, ShiauFan4, ShiauFan5
    #[arg(short = 'd', long = "diffuse")]
    pub algorithm: Option<DitherAlgorithm>,

    /// Diffusion level, 0..100 (0 keeps the error linear)
    #[arg(short = 'l', long = "dflevel", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub level: Option<u32>,

    /// Output image file name
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output table file name (SSPR only)
    #[arg(short = 't', long = "outtab")]
    pub table: Option<PathBuf>,

    /// Input PAL file name
    #[arg(short, long)]
    pub palette: Option<PathBuf>,

    /// Config file (defaults to palsprite.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Alpha below this value is transparent
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Number of palette entries to read
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=256))]
    pub colors: Option<u16>,

    /// Width in bits of HSPR/SSPR offset and length fields: 32 or 64
    #[arg(long)]
    pub word_width: Option<WordWidth>,

    /// Input PNG files, or a single list file with --batchlist
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

impl Cli {
    /// Command line values layered over config-derived options.
    pub fn apply(&self, mut opts: ConvertOptions) -> ConvertOptions {
        if let Some(f) = self.format {
            opts.format = f;
        }
        if let Some(a) = self.algorithm {
            opts.algorithm = a;
        }
        if let Some(l) = self.level {
            opts.level = l;
        }
        if let Some(c) = self.colors {
            opts.colors = c as usize;
        }
        if let Some(t) = self.threshold {
            opts.transparency_threshold = t;
        }
        if let Some(w) = self.word_width {
            opts.word_width = w;
        }
        opts
    }

    /// Logging directive: `-v` flags first, then the config file, then `RUST_LOG`.
    pub fn log_directive(&self, config: &Config) -> String {
        match self.verbose {
            0 => config
                .log_filter()
                .map(str::to_string)
                .or_else(|| std::env::var("RUST_LOG").ok())
                .unwrap_or_else(|| "info".to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

/// Failure of a run, tagged with the stage it happened in.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("incorrect arguments: {0:#}")]
    Usage(anyhow::Error),
    #[error("loading images failed: {0:#}")]
    LoadImages(anyhow::Error),
    #[error("loading palette failed: {0:#}")]
    LoadPalette(anyhow::Error),
    #[error("converting colors failed: {0:#}")]
    Convert(anyhow::Error),
    #[error("saving output failed: {0:#}")]
    Write(anyhow::Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Usage(_) => 11,
            RunError::LoadImages(_) => 2,
            RunError::LoadPalette(_) => 4,
            RunError::Convert(_) => 6,
            RunError::Write(_) => 8,
        }
    }
}

/// Everything derived from the command line before any image is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub inputs: Vec<PathBuf>,
    pub palette: PathBuf,
    pub outputs: OutputPaths,
    pub options: ConvertOptions,
}

impl Job {
    pub fn from_cli(cli: &Cli, config: &Config) -> anyhow::Result<Job> {
        let options = cli.apply(config.convert_options()?);
        let inputs = if cli.batchlist {
            let [list] = cli.inputs.as_slice() else {
                bail!("batch mode takes exactly one list file");
            };
            read_batch_list(list)?
        } else {
            cli.inputs.clone()
        };
        let Some(first) = inputs.first() else {
            bail!("incorrectly specified input file name");
        };
        pipeline::check_image_count(options.format, inputs.len())?;
        let data = cli
            .output
            .clone()
            .unwrap_or_else(|| change_extension(first, options.format.default_extension()));
        let table = cli
            .table
            .clone()
            .unwrap_or_else(|| change_extension(&data, "tab"));
        let palette = cli
            .palette
            .clone()
            .unwrap_or_else(|| change_extension(first, "pal"));
        Ok(Job {
            inputs,
            palette,
            outputs: OutputPaths { data, table },
            options,
        })
    }
}

/// File name of `path` without its directory, with the extension replaced.
pub fn change_extension(path: &Path, ext: &str) -> PathBuf {
    let name = path.file_name().map(PathBuf::from).unwrap_or_default();
    name.with_extension(ext)
}

/// Read a list of inputs: one per line, trailing whitespace trimmed, blank
/// lines skipped. Lines with glob metacharacters are expanded.
pub fn read_batch_list(list: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(list)
        .with_context(|| format!("reading batch list {}", list.display()))?;
    let mut inputs = Vec::new();
    for line in text.lines() {
        let entry = line.trim_end();
        if entry.is_empty() {
            continue;
        }
        if entry.contains(&['*', '?', '['][..]) {
            let mut matched: Vec<PathBuf> = glob::glob(entry)
                .with_context(|| format!("invalid glob pattern '{entry}'"))?
                .filter_map(|r| match r {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::warn!(pattern = %entry, error = %e, "glob entry unreadable");
                        None
                    }
                })
                .collect();
            if matched.is_empty() {
                tracing::warn!(pattern = %entry, "no files matched batch list pattern");
            }
            matched.sort();
            inputs.extend(matched);
        } else {
            inputs.push(PathBuf::from(entry));
        }
    }
    tracing::debug!(list = %list.display(), total = inputs.len(), "batch list loaded");
    Ok(inputs)
}

/// Load, convert, encode and write. Nothing is written unless every earlier
/// stage succeeded.
pub fn run(job: &Job) -> Result<Vec<PathBuf>, RunError> {
    let mut images = Vec::with_capacity(job.inputs.len());
    for path in &job.inputs {
        tracing::info!(path = %path.display(), "loading image");
        let img = SourceImage::load_png(path).map_err(|e| RunError::LoadImages(e.into()))?;
        images.push(img);
    }

    tracing::info!(path = %job.palette.display(), "loading palette file");
    let palette = read_file(&job.palette)
        .and_then(|raw| Palette::load(&raw, job.options.colors))
        .map_err(|e| RunError::LoadPalette(e.into()))?;

    let opts = &job.options;
    tracing::debug!(
        format = ?opts.format,
        algorithm = %opts.algorithm,
        level = opts.level,
        colors = palette.len(),
        "conversion settings"
    );
    let encoded =
        pipeline::process(&images, &palette, opts).map_err(|e| RunError::Convert(e.into()))?;

    write_encoded(&encoded, &job.outputs).map_err(|e| RunError::Write(e.into()))
}
