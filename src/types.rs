use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error correction level, ordered from least to most redundant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecc {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl Ecc {
    /// Row index into the version/level lookup tables.
    pub(crate) fn ordinal(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::Quartile => 2,
            Self::High => 3,
        }
    }

    /// The 2-bit value written into the format information.
    pub(crate) fn format_bits(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 0,
            Self::Quartile => 3,
            Self::High => 2,
        }
    }
}

impl fmt::Display for Ecc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "L"),
            Self::Medium => write!(f, "M"),
            Self::Quartile => write!(f, "Q"),
            Self::High => write!(f, "H"),
        }
    }
}

impl FromStr for Ecc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "medium" => Ok(Self::Medium),
            "q" | "quartile" => Ok(Self::Quartile),
            "h" | "high" => Ok(Self::High),
            other => Err(format!("unknown error correction level \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotShape {
    #[default]
    Square,
    Rounded,
    Circle,
}

impl FromStr for DotShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "rounded" => Ok(Self::Rounded),
            "circle" | "dot" => Ok(Self::Circle),
            other => Err(format!("unknown dot shape \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeShape {
    #[default]
    Square,
    Rounded,
    Circle,
}

impl FromStr for EyeShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "rounded" => Ok(Self::Rounded),
            "circle" => Ok(Self::Circle),
            other => Err(format!("unknown eye shape \"{other}\"")),
        }
    }
}

/// An sRGB color with alpha, parsed from and serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };

    /// Parses `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color \"{s}\" must start with '#'"))?;
        if !matches!(digits.len(), 6 | 8) {
            return Err(format!("color \"{s}\" must be #RRGGBB or #RRGGBBAA"));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("color \"{s}\" has invalid hex digits"))
        };
        Ok(Rgba {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: if digits.len() == 8 { byte(6)? } else { 255 },
        })
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Rgba::from_hex(&s)
    }
}

impl From<Rgba> for String {
    fn from(c: Rgba) -> String {
        c.to_hex()
    }
}

/// Maximum fraction of the symbol area a logo may cover, per EC level.
///
/// Defaults follow the nominal Reed-Solomon recovery rates. A logo damages one
/// contiguous region rather than scattered modules, so these are already
/// optimistic; raising them risks unscannable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoPolicy {
    #[serde(default = "default_cap_low")]
    pub low: f32,
    #[serde(default = "default_cap_medium")]
    pub medium: f32,
    #[serde(default = "default_cap_quartile")]
    pub quartile: f32,
    #[serde(default = "default_cap_high")]
    pub high: f32,
}

fn default_cap_low() -> f32 { 0.07 }
fn default_cap_medium() -> f32 { 0.15 }
fn default_cap_quartile() -> f32 { 0.25 }
fn default_cap_high() -> f32 { 0.30 }

impl Default for LogoPolicy {
    fn default() -> Self {
        Self {
            low: default_cap_low(),
            medium: default_cap_medium(),
            quartile: default_cap_quartile(),
            high: default_cap_high(),
        }
    }
}

impl LogoPolicy {
    pub fn max_coverage(&self, level: Ecc) -> f32 {
        match level {
            Ecc::Low => self.low,
            Ecc::Medium => self.medium,
            Ecc::Quartile => self.quartile,
            Ecc::High => self.high,
        }
    }
}

/// Styling options for the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default = "default_bg_color")]
    pub bg_color: Rgba,
    #[serde(default = "default_dot_color")]
    pub dot_color: Rgba,
    /// Finder pattern color; falls back to `dot_color` when unset.
    #[serde(default)]
    pub eye_color: Option<Rgba>,
    #[serde(default)]
    pub dot_shape: DotShape,
    #[serde(default)]
    pub eye_shape: EyeShape,
    /// Quiet zone width in modules.
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Rendered size of one module in pixels.
    #[serde(default = "default_module_px")]
    pub module_px: u32,
    /// Logo width as a fraction of the symbol width (quiet zone excluded).
    #[serde(default = "default_logo_scale")]
    pub logo_scale: f32,
    #[serde(default)]
    pub logo_policy: LogoPolicy,
}

fn default_bg_color() -> Rgba { Rgba::WHITE }
fn default_dot_color() -> Rgba { Rgba::BLACK }
fn default_padding() -> u32 { 1 }
fn default_module_px() -> u32 { 10 }
fn default_logo_scale() -> f32 { 0.2 }

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            bg_color: default_bg_color(),
            dot_color: default_dot_color(),
            eye_color: None,
            dot_shape: DotShape::default(),
            eye_shape: EyeShape::default(),
            padding: default_padding(),
            module_px: default_module_px(),
            logo_scale: default_logo_scale(),
            logo_policy: LogoPolicy::default(),
        }
    }
}

impl StyleConfig {
    pub fn eye_color(&self) -> Rgba {
        self.eye_color.unwrap_or(self.dot_color)
    }
}

/// One generation request: text plus everything needed to style the output.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub text: String,
    pub ec_level: Ecc,
    /// Forces a specific symbol version (1-40) instead of the smallest fit.
    pub version: Option<u8>,
    pub style: StyleConfig,
    /// Raw bytes of a logo image to composite over the center.
    pub logo: Option<Vec<u8>>,
}

impl GenerateRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_config_default() {
        let style = StyleConfig::default();
        assert_eq!(style.bg_color, Rgba::WHITE);
        assert_eq!(style.dot_color, Rgba::BLACK);
        assert!(style.eye_color.is_none());
        assert_eq!(style.eye_color(), Rgba::BLACK);
        assert_eq!(style.padding, 1);
        assert_eq!(style.module_px, 10);
        assert_eq!(style.logo_scale, 0.2);
    }

    #[test]
    fn ecc_display() {
        assert_eq!(format!("{}", Ecc::Low), "L");
        assert_eq!(format!("{}", Ecc::Medium), "M");
        assert_eq!(format!("{}", Ecc::Quartile), "Q");
        assert_eq!(format!("{}", Ecc::High), "H");
    }

    #[test]
    fn ecc_from_str() {
        assert_eq!("low".parse::<Ecc>().unwrap(), Ecc::Low);
        assert_eq!("H".parse::<Ecc>().unwrap(), Ecc::High);
        assert_eq!("q".parse::<Ecc>().unwrap(), Ecc::Quartile);
        assert!("ultra".parse::<Ecc>().is_err());
    }

    #[test]
    fn shape_from_str() {
        assert_eq!("circle".parse::<DotShape>().unwrap(), DotShape::Circle);
        assert_eq!("dot".parse::<DotShape>().unwrap(), DotShape::Circle);
        assert_eq!("ROUNDED".parse::<EyeShape>().unwrap(), EyeShape::Rounded);
        assert!("triangle".parse::<DotShape>().is_err());
        assert!("dot".parse::<EyeShape>().is_err());
    }

    #[test]
    fn color_parse_rgb() {
        let c = Rgba::from_hex("#1a2B3c").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0x1a, 0x2b, 0x3c, 255));
        assert_eq!(c.to_hex(), "#1a2b3c");
    }

    #[test]
    fn color_parse_rgba() {
        let c = Rgba::from_hex("#00ff0080").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0, 255, 0, 0x80));
        assert_eq!(c.to_hex(), "#00ff0080");
    }

    #[test]
    fn color_parse_rejects_garbage() {
        assert!(Rgba::from_hex("123456").is_err());
        assert!(Rgba::from_hex("#12345").is_err());
        assert!(Rgba::from_hex("#zzzzzz").is_err());
        assert!(Rgba::from_hex("").is_err());
    }

    #[test]
    fn logo_policy_caps_increase_with_level() {
        let p = LogoPolicy::default();
        assert!(p.max_coverage(Ecc::Low) < p.max_coverage(Ecc::Medium));
        assert!(p.max_coverage(Ecc::Medium) < p.max_coverage(Ecc::Quartile));
        assert!(p.max_coverage(Ecc::Quartile) < p.max_coverage(Ecc::High));
        assert_eq!(p.max_coverage(Ecc::High), 0.30);
    }

    #[test]
    fn style_from_toml() {
        let toml_str = r##"
            bg_color = "#101010"
            dot_color = "#e0e0e0"
            dot_shape = "circle"
            padding = 4

            [logo_policy]
            high = 0.2
        "##;
        let style: StyleConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(style.bg_color, Rgba::from_hex("#101010").unwrap());
        assert_eq!(style.dot_shape, DotShape::Circle);
        assert_eq!(style.eye_shape, EyeShape::Square);
        assert_eq!(style.padding, 4);
        assert_eq!(style.module_px, 10);
        assert_eq!(style.logo_policy.high, 0.2);
        assert_eq!(style.logo_policy.low, 0.07);
    }

    #[test]
    fn style_from_toml_bad_color_is_error() {
        let toml_str = r#"bg_color = "white""#;
        assert!(toml::from_str::<StyleConfig>(toml_str).is_err());
    }
}
