use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use toml_edit::DocumentMut;

use crate::dither::resolve_algorithm;
use crate::encode::{OutputFormat, WordWidth};
use crate::pipeline::ConvertOptions;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "palsprite.toml";

/// Strongly typed representation of the configuration file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub logging: Option<Logging>,
    pub convert: Option<Convert>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Logging {
    pub filter: Option<String>,
}

/// Defaults for a conversion run; every field may be overridden on the command line.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Convert {
    pub format: Option<OutputFormat>,
    /// Diffusion kernel name, e.g. `floyd_steinberg` or `Sierra24A`.
    pub algorithm: Option<String>,
    pub level: Option<u32>,
    pub colors: Option<usize>,
    pub transparency_threshold: Option<u8>,
    pub word_width: Option<WordWidth>,
}

impl Config {
    /// Load an explicit config file, or `palsprite.toml` from the working
    /// directory when present. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    bail!("config file {} not found", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !p.exists() {
                    return Ok(Config::default());
                }
                p
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Config> {
        let doc = text.parse::<DocumentMut>()?;
        let typed: Config = toml_edit::de::from_document(doc)?;
        Ok(typed)
    }

    pub fn log_filter(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.filter.as_deref())
    }

    /// Conversion options from the file layered over built-in defaults.
    pub fn convert_options(&self) -> Result<ConvertOptions> {
        let mut opts = ConvertOptions::default();
        let Some(c) = self.convert.as_ref() else {
            return Ok(opts);
        };
        if let Some(format) = c.format {
            opts.format = format;
        }
        if let Some(name) = c.algorithm.as_deref() {
            opts.algorithm = resolve_algorithm(name)
                .with_context(|| format!("unknown diffusion algorithm '{name}'"))?;
        }
        if let Some(level) = c.level {
            if level > 100 {
                bail!("dither level must be within 0..=100, got {level}");
            }
            opts.level = level;
        }
        if let Some(colors) = c.colors {
            if !(1..=256).contains(&colors) {
                bail!("colors must be within 1..=256, got {colors}");
            }
            opts.colors = colors;
        }
        if let Some(t) = c.transparency_threshold {
            opts.transparency_threshold = t;
        }
        if let Some(w) = c.word_width {
            opts.word_width = w;
        }
        Ok(opts)
    }
}
