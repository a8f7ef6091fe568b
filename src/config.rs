use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::{default_palette, parse_hex, Rgb8};
use crate::data::names::GLOBAL_KEY;
use crate::error::ConfigError;

pub const DEFAULT_SMOOTHING_WINDOW: usize = 7;

// ---------------------------------------------------------------------------
// ViewConfig – user-tunable view parameters
// ---------------------------------------------------------------------------

/// View parameters, optionally read from a JSON file. Every field has a
/// default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub smoothing_window: usize,
    /// Selection keys that bypass site-name resolution.
    pub reserved_keys: Vec<String>,
    /// Category palette as `#rrggbb`; empty means the built-in palette.
    pub palette: Vec<String>,
    /// Final flux → `#rrggbb`.
    pub final_flux_colors: BTreeMap<String, String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            reserved_keys: vec![GLOBAL_KEY.to_string()],
            palette: Vec::new(),
            final_flux_colors: BTreeMap::new(),
        }
    }
}

impl ViewConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: ViewConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("loaded view config from {}", path.display());
        Ok(config)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoothing_window == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        self.color_scheme().map(|_| ())
    }

    pub fn color_scheme(&self) -> Result<ColorScheme, ConfigError> {
        ColorScheme::from_config(self)
    }
}

// ---------------------------------------------------------------------------
// ColorScheme – parsed colours
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ColorScheme {
    pub palette: Vec<Rgb8>,
    pub final_flux: BTreeMap<String, Rgb8>,
}

impl Default for ColorScheme {
    fn default() -> Self {
        ColorScheme {
            palette: default_palette(),
            final_flux: BTreeMap::new(),
        }
    }
}

impl ColorScheme {
    pub fn from_config(config: &ViewConfig) -> Result<Self, ConfigError> {
        let palette = if config.palette.is_empty() {
            default_palette()
        } else {
            config.palette.iter().map(|hex| parse_hex(hex)).collect::<Result<_, _>>()?
        };
        let final_flux = config
            .final_flux_colors
            .iter()
            .map(|(flux, hex)| Ok((flux.clone(), parse_hex(hex)?)))
            .collect::<Result<_, ConfigError>>()?;
        Ok(ColorScheme {
            palette,
            final_flux,
        })
    }
}
