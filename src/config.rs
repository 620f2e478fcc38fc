use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use tracing::warn;

use crate::selection::{SelectionRect, DEFAULT_PREVIEW_SIZE};

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Image file or folder of images
    pub input: PathBuf,

    /// Output folder (defaults next to the input)
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = ModelVariant::Base)]
    pub model: ModelVariant,

    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Remove the object and keep the background instead
    #[arg(long)]
    pub invert: bool,

    /// Solid background color (`#rrggbb` or `r,g,b`); transparent when omitted
    #[arg(short, long)]
    pub background: Option<BackgroundColor>,

    /// Crop box `x1,y1,x2,y2` in original pixels; unparsable input means no crop
    #[arg(long)]
    pub crop: Option<String>,

    /// Crop box `x1,y1,x2,y2` drawn on the scaled preview of a single input file
    #[arg(long)]
    pub display_crop: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PREVIEW_SIZE)]
    pub preview_size: u32,

    /// Write the scaled preview used for `--display-crop` and exit
    #[arg(long)]
    pub write_preview: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    /// Output folder, falling back to the input's folder for a single file
    /// and to `<input>/processed` for a directory.
    pub fn output_dir(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        if self.input.is_dir() {
            self.input.join("processed")
        } else {
            self.input
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(self.model.file_name())
    }

    /// Snapshot of the settings that drive a batch run.
    pub fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            variant: self.model,
            invert_mask: self.invert,
            background: self.background,
            crop: self.crop.as_deref().and_then(parse_crop_box),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Matting network flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum ModelVariant {
    /// Best quality
    #[default]
    Base,
    /// Lower latency
    Fast,
}

impl ModelVariant {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Fast => "fast",
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Base => "base.onnx",
            Self::Fast => "fast.onnx",
        }
    }

    /// Square network input used when the model leaves its shape dynamic.
    pub const fn default_input_size(self) -> u32 {
        match self {
            Self::Base => 1024,
            Self::Fast => 384,
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Solid RGB background used instead of transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for BackgroundColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            let channels = s
                .split(',')
                .map(|c| c.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format!("invalid color channel in `{s}`: {e}"))?;
            return match channels.as_slice() {
                [r, g, b] => Ok(Self::new(*r, *g, *b)),
                _ => Err(format!("expected three channels `r,g,b`, got `{s}`")),
            };
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected `#rrggbb`, got `{s}`"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("invalid hex `{s}`: {e}"))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Immutable settings snapshot for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessingConfig {
    pub variant: ModelVariant,
    pub invert_mask: bool,
    pub background: Option<BackgroundColor>,
    pub crop: Option<SelectionRect>,
}

/// Leniently parses `x1,y1,x2,y2`.
///
/// Anything other than four non-negative integers with `x1 < x2` and
/// `y1 < y2` is treated as "no crop" and logged.
pub fn parse_crop_box(input: &str) -> Option<SelectionRect> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let coords: Option<Vec<u32>> = input
        .split(',')
        .map(|c| c.trim().parse::<u32>().ok())
        .collect();

    match coords.as_deref() {
        Some(&[x1, y1, x2, y2]) if x1 < x2 && y1 < y2 => Some(SelectionRect { x1, y1, x2, y2 }),
        _ => {
            warn!(crop = input, "Ignoring malformed crop box, processing without crop");
            None
        }
    }
}

/// Parses four comma-separated display coordinates.
pub fn parse_display_box(input: &str) -> Option<[f64; 4]> {
    let coords: Vec<f64> = input
        .split(',')
        .map(|c| c.trim().parse::<f64>().ok())
        .collect::<Option<_>>()?;
    coords.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_parse_crop_box() {
        assert_eq!(
            parse_crop_box(" 10, 20 ,300,400 "),
            Some(SelectionRect::new(10, 20, 300, 400))
        );
        assert_eq!(parse_crop_box(""), None);
        assert_eq!(parse_crop_box("10,20,30"), None);
        assert_eq!(parse_crop_box("10,20,30,40,50"), None);
        assert_eq!(parse_crop_box("a,b,c,d"), None);
        assert_eq!(parse_crop_box("-1,0,10,10"), None);
        assert_eq!(parse_crop_box("30,0,10,10"), None);
        assert_eq!(parse_crop_box("0,0,0,10"), None);
    }

    #[test]
    fn test_parse_display_box() {
        assert_eq!(
            parse_display_box("1.5, 2, 30, 40"),
            Some([1.5, 2.0, 30.0, 40.0])
        );
        assert_eq!(parse_display_box("1,2,3"), None);
        assert_eq!(parse_display_box("x,2,3,4"), None);
    }

    #[test]
    fn test_background_color_parsing() {
        assert_eq!("#ff8000".parse(), Ok(BackgroundColor::new(255, 128, 0)));
        assert_eq!("00FF10".parse(), Ok(BackgroundColor::new(0, 255, 16)));
        assert_eq!("12, 34, 56".parse(), Ok(BackgroundColor::new(12, 34, 56)));
        assert!("#ff80".parse::<BackgroundColor>().is_err());
        assert!("1,2".parse::<BackgroundColor>().is_err());
        assert!("256,0,0".parse::<BackgroundColor>().is_err());
        assert_eq!(BackgroundColor::new(1, 2, 255).to_string(), "#0102ff");
    }

    #[test]
    fn test_cli_parsing() {
        let config = Config::try_parse_from([
            "magic-mask",
            "photos",
            "out",
            "--model",
            "fast",
            "--invert",
            "-b",
            "#000000",
            "--crop",
            "1,2,3,4",
        ])
        .unwrap();

        assert_eq!(config.output_dir(), PathBuf::from("out"));
        assert_eq!(config.model_path(), PathBuf::from("models/fast.onnx"));
        assert_eq!(config.preview_size, 600);

        let processing = config.processing_config();
        assert_eq!(processing.variant, ModelVariant::Fast);
        assert!(processing.invert_mask);
        assert_eq!(processing.background, Some(BackgroundColor::new(0, 0, 0)));
        assert_eq!(processing.crop, Some(SelectionRect::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_unparsable_crop_is_no_crop() {
        let config =
            Config::try_parse_from(["magic-mask", "in.png", "--crop", "left half"]).unwrap();
        assert_eq!(config.processing_config().crop, None);
    }

    #[test]
    fn test_default_output_dir() -> std::io::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let file = temp.path().join("cat.jpg");

        let bin = OsStr::new("magic-mask");

        let config = Config::try_parse_from([bin, temp.path().as_os_str()]).unwrap();
        assert_eq!(config.output_dir(), temp.path().join("processed"));

        let config = Config::try_parse_from([bin, file.as_os_str()]).unwrap();
        assert_eq!(config.output_dir(), temp.path().to_path_buf());

        let config = Config::try_parse_from(["magic-mask", "cat.jpg"]).unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("."));
        Ok(())
    }
}
