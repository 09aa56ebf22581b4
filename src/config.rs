use std::path::PathBuf;

use anyhow::{Context, bail};
use log::{debug, info};
use serde::Deserialize;

use crate::engine::Spread;
use crate::session::{FontSize, LineHeight};
use crate::theme;

// ---------------------------------------------------------------------------
// ConfigFile — deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub locale: Option<String>,
    pub theme: Option<String>,
    /// Directory with `<code>.json` tables that override the built-in ones.
    pub locales_dir: Option<PathBuf>,
    #[serde(default)]
    pub reader: ReaderConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ReaderConfigFile {
    pub font_size: Option<u32>,
    pub line_height: Option<f64>,
    pub spread: Option<Spread>,
    pub location_density: Option<u32>,
    pub swipe_threshold_px: Option<f64>,
    pub mobile_breakpoint_px: Option<u32>,
}

// ---------------------------------------------------------------------------
// Config — resolved (all fields concrete)
// ---------------------------------------------------------------------------

pub struct Config {
    pub locale: String,
    pub theme: String,
    pub locales_dir: Option<PathBuf>,
    pub reader: ReaderConfig,
}

/// Session defaults. Settings are reset to these on every load.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub font_size: FontSize,
    pub line_height: LineHeight,
    pub spread: Spread,
    /// Target characters per location when building the page index.
    pub location_density: u32,
    pub swipe_threshold_px: f64,
    /// Viewports narrower than this are treated as mobile.
    pub mobile_breakpoint_px: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            font_size: FontSize::DEFAULT,
            line_height: LineHeight::DEFAULT,
            spread: Spread::Auto,
            location_density: 1650,
            swipe_threshold_px: 50.0,
            mobile_breakpoint_px: 768,
        }
    }
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(&mut self, locale: Option<String>, theme: Option<String>) {
        if let Some(ref v) = locale {
            debug!("config: CLI override locale={v}");
            self.locale = locale;
        }
        if let Some(ref v) = theme {
            debug!("config: CLI override theme={v}");
            self.theme = theme;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields.
    ///
    /// Font size and line height are clamped into their ranges; an unknown
    /// theme name is an error.
    pub fn resolve(self) -> anyhow::Result<Config> {
        let defaults = ReaderConfig::default();
        let theme = self.theme.unwrap_or_else(|| theme::DEFAULT_THEME.into());
        if theme::get(&theme).is_none() {
            let known: Vec<_> = theme::THEMES.iter().map(|t| t.name).collect();
            bail!("unknown theme '{theme}' (available: {})", known.join(", "));
        }
        let r = self.reader;
        let config = Config {
            locale: self.locale.unwrap_or_else(|| "en".into()),
            theme,
            locales_dir: self.locales_dir,
            reader: ReaderConfig {
                font_size: r.font_size.map_or(defaults.font_size, FontSize::new),
                line_height: r.line_height.map_or(defaults.line_height, LineHeight::from_f64),
                spread: r.spread.unwrap_or(defaults.spread),
                location_density: r
                    .location_density
                    .unwrap_or(defaults.location_density)
                    .max(1),
                // f64::max maps NaN to the other operand
                swipe_threshold_px: r
                    .swipe_threshold_px
                    .unwrap_or(defaults.swipe_threshold_px)
                    .max(0.0),
                mobile_breakpoint_px: r
                    .mobile_breakpoint_px
                    .unwrap_or(defaults.mobile_breakpoint_px),
            },
        };
        info!(
            "config: resolved locale={}, theme={}, font_size={}, line_height={}, \
             spread={}, location_density={}, swipe_threshold={}px, mobile_breakpoint={}px",
            config.locale,
            config.theme,
            config.reader.font_size.px(),
            config.reader.line_height,
            config.reader.spread,
            config.reader.location_density,
            config.reader.swipe_threshold_px,
            config.reader.mobile_breakpoint_px,
        );
        Ok(config)
    }
}

/// Resolve the XDG config path for folio.
fn config_path() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(config_dir.join("folio").join("config.toml"))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
