use std::collections::BTreeMap;

use indexmap::IndexMap;
use palette::{Hsl, IntoColor, Srgb};

use crate::error::ConfigError;
use crate::views::nested::SubcategoryEntry;

pub type Rgb8 = Srgb<u8>;

/// Neutral colour for labels without a mapping.
pub const FALLBACK_HEX: u32 = 0x9ca3af;

/// Default category palette, cycled in column order.
pub const DEFAULT_PALETTE_HEX: [u32; 8] = [
    0x3b82f6, 0x8b5cf6, 0xec4899, 0xf59e0b, 0x10b981, 0xef4444, 0x06b6d4, 0x84cc16,
];

/// Fixed colours for the documented final fluxes.
pub const FINAL_FLUX_HEX: [(&str, u32); 3] = [
    ("MASSICOT", 0xef4444),
    ("DEMANTELEMENT", 0xf59e0b),
    ("DECHETS ULTIMES", 0x6b7280),
];

pub fn rgb(hex: u32) -> Rgb8 {
    Srgb::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

pub fn default_palette() -> Vec<Rgb8> {
    DEFAULT_PALETTE_HEX.iter().copied().map(rgb).collect()
}

/// Parse `#rrggbb` (the `#` is optional).
pub fn parse_hex(value: &str) -> Result<Rgb8, ConfigError> {
    let digits = value.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidColor(value.to_string()));
    }
    u32::from_str_radix(digits, 16)
        .map(rgb)
        .map_err(|_| ConfigError::InvalidColor(value.to_string()))
}

pub fn to_hex(color: Rgb8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Brighten every channel by `amount`, saturating at 255.
pub fn lighten(color: Rgb8, amount: u8) -> Rgb8 {
    Srgb::new(
        color.red.saturating_add(amount),
        color.green.saturating_add(amount),
        color.blue.saturating_add(amount),
    )
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb8> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Srgb::new(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: label → colour
// ---------------------------------------------------------------------------

/// Maps chart labels to colours, in label order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    mapping: IndexMap<String, Rgb8>,
    default_color: Rgb8,
}

impl ColorMap {
    /// Assign `palette` colours to `labels` in order, wrapping around.
    pub fn cycling<S: AsRef<str>>(labels: &[S], palette: &[Rgb8]) -> Self {
        let default_color = rgb(FALLBACK_HEX);
        let mapping = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let color = if palette.is_empty() {
                    default_color
                } else {
                    palette[i % palette.len()]
                };
                (label.as_ref().to_string(), color)
            })
            .collect();
        ColorMap {
            mapping,
            default_color,
        }
    }

    /// Final-flux colours: `overrides` first, then the fixed colours of the
    /// documented fluxes, then evenly spaced hues for anything else.
    pub fn final_fluxes<S: AsRef<str>>(fluxes: &[S], overrides: &BTreeMap<String, Rgb8>) -> Self {
        let generated = generate_palette(fluxes.len());
        let mapping = fluxes
            .iter()
            .enumerate()
            .map(|(i, flux)| {
                let flux = flux.as_ref();
                let color = overrides
                    .get(flux)
                    .copied()
                    .or_else(|| {
                        FINAL_FLUX_HEX
                            .iter()
                            .find(|(name, _)| *name == flux)
                            .map(|(_, hex)| rgb(*hex))
                    })
                    .unwrap_or(generated[i]);
                (flux.to_string(), color)
            })
            .collect();
        ColorMap {
            mapping,
            default_color: rgb(FALLBACK_HEX),
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Rgb8 {
        self.mapping.get(label).copied().unwrap_or(self.default_color)
    }

    /// Return the legend entries (label → hex colour).
    pub fn legend_entries(&self) -> Vec<(String, String)> {
        self.mapping.iter().map(|(label, c)| (label.clone(), to_hex(*c))).collect()
    }

    pub fn to_hex_map(&self) -> IndexMap<String, String> {
        self.mapping.iter().map(|(label, c)| (label.clone(), to_hex(*c))).collect()
    }

    /// Merge another map in; existing labels keep their colour.
    pub fn extend(&mut self, other: &ColorMap) {
        for (label, color) in &other.mapping {
            self.mapping.entry(label.clone()).or_insert(*color);
        }
    }
}

/// Inner-ring colours: each sub-category takes a lighter shade of its parent
/// category's colour.
pub fn subcategory_colors(inner: &[SubcategoryEntry], categories: &ColorMap) -> Vec<Rgb8> {
    inner.iter().map(|entry| lighten(categories.color_for(&entry.category), 50)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_and_errors() {
        let c = parse_hex("#3b82f6").unwrap();
        assert_eq!((c.red, c.green, c.blue), (0x3b, 0x82, 0xf6));
        assert_eq!(to_hex(c), "#3b82f6");
        assert_eq!(parse_hex("EF4444").unwrap(), rgb(0xef4444));
        assert!(matches!(parse_hex("#12345"), Err(ConfigError::InvalidColor(_))));
        assert!(parse_hex("#gggggg").is_err());
    }

    #[test]
    fn palette_cycles() {
        let palette = default_palette();
        let labels: Vec<String> = (0..10).map(|i| format!("C{i}")).collect();
        let map = ColorMap::cycling(&labels, &palette);
        assert_eq!(map.color_for("C0"), palette[0]);
        assert_eq!(map.color_for("C8"), palette[0]);
        assert_eq!(map.color_for("C9"), palette[1]);
        assert_eq!(map.color_for("unknown"), rgb(FALLBACK_HEX));
    }

    #[test]
    fn final_flux_colors() {
        let mut overrides = BTreeMap::new();
        overrides.insert("MASSICOT".to_string(), rgb(0x000000));
        let map = ColorMap::final_fluxes(&["MASSICOT", "DECHETS ULTIMES", "BOIS"], &overrides);
        assert_eq!(to_hex(map.color_for("MASSICOT")), "#000000");
        assert_eq!(to_hex(map.color_for("DECHETS ULTIMES")), "#6b7280");
        assert_eq!(map.color_for("BOIS"), generate_palette(3)[2]);
        assert_eq!(map.legend_entries().len(), 3);
    }

    #[test]
    fn lighten_saturates() {
        let c = lighten(rgb(0xf0_10_00), 50);
        assert_eq!((c.red, c.green, c.blue), (255, 0x42, 50));
    }

    #[test]
    fn generated_palette_len() {
        assert_eq!(generate_palette(5).len(), 5);
        assert!(generate_palette(0).is_empty());
    }
}
