use std::io::{self, Read, Write};
use std::process;

use clap::Parser;
use serde::Serialize;

use qr_forge::{DotShape, Ecc, EyeShape, GenerateRequest, Rgba};

#[derive(Parser)]
#[command(name = "qr-forge", about = "Generate styled QR codes as PNG")]
struct Cli {
    /// Text to encode; read from stdin when omitted
    text: Option<String>,

    /// Error correction level: low, medium, quartile, high
    #[arg(long, default_value = "medium")]
    ec_level: String,

    /// Force a symbol version (1-40) instead of the smallest fit
    #[arg(long)]
    symbol_version: Option<u8>,

    /// Background color as #RRGGBB
    #[arg(long)]
    bg_color: Option<String>,

    /// Data module color as #RRGGBB
    #[arg(long)]
    dot_color: Option<String>,

    /// Finder pattern color as #RRGGBB (defaults to the dot color)
    #[arg(long)]
    eye_color: Option<String>,

    /// Data module shape: square, rounded, circle
    #[arg(long)]
    dot_shape: Option<String>,

    /// Finder pattern shape: square, rounded, circle
    #[arg(long)]
    eye_shape: Option<String>,

    /// Quiet zone width in modules
    #[arg(long)]
    padding: Option<u32>,

    /// Rendered module size in pixels
    #[arg(long)]
    module_px: Option<u32>,

    /// Path to a logo image to composite over the center
    #[arg(long)]
    logo: Option<String>,

    /// Logo width as a fraction of the symbol width
    #[arg(long)]
    logo_scale: Option<f32>,

    /// Path to a TOML style config file
    #[arg(long = "config")]
    config_path: Option<String>,

    /// Write the PNG here instead of stdout
    #[arg(short, long)]
    out: Option<String>,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

fn error_json(error: &str) -> String {
    serde_json::to_string(&ErrorOutput {
        error: error.to_string(),
    })
    .unwrap()
}

fn fail(message: &str) -> ! {
    eprintln!("{}", error_json(message));
    process::exit(1);
}

/// Bad colors fall back to the style's current value, matching the lenient
/// form handling this tool fronts for; library callers get `InvalidStyle`.
fn parse_color(value: &Option<String>, current: Rgba) -> Rgba {
    match value {
        Some(s) => match Rgba::from_hex(s) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Warning: {e}, using default");
                current
            }
        },
        None => current,
    }
}

fn main() {
    let cli = Cli::parse();

    let text = match cli.text {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buf) {
                fail(&format!("Failed to read stdin: {e}"));
            }
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if text.is_empty() {
        fail("No text provided");
    }

    let ec_level = match cli.ec_level.parse::<Ecc>() {
        Ok(level) => level,
        Err(e) => fail(&e),
    };

    let mut style = qr_forge::render::load_style(cli.config_path.as_deref());
    style.bg_color = parse_color(&cli.bg_color, style.bg_color);
    style.dot_color = parse_color(&cli.dot_color, style.dot_color);
    if cli.eye_color.is_some() {
        style.eye_color = Some(parse_color(&cli.eye_color, style.eye_color()));
    }
    if let Some(ref s) = cli.dot_shape {
        match s.parse::<DotShape>() {
            Ok(shape) => style.dot_shape = shape,
            Err(e) => fail(&e),
        }
    }
    if let Some(ref s) = cli.eye_shape {
        match s.parse::<EyeShape>() {
            Ok(shape) => style.eye_shape = shape,
            Err(e) => fail(&e),
        }
    }
    style.padding = cli.padding.unwrap_or(style.padding);
    style.module_px = cli.module_px.unwrap_or(style.module_px);
    style.logo_scale = cli.logo_scale.unwrap_or(style.logo_scale);

    let logo = cli.logo.map(|path| match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => fail(&format!("Failed to read logo {path}: {e}")),
    });

    let request = GenerateRequest {
        text,
        ec_level,
        version: cli.symbol_version,
        style,
        logo,
    };

    let png = match qr_forge::generate(&request) {
        Ok(png) => png,
        Err(e) => fail(&e.to_string()),
    };

    match cli.out {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &png) {
                fail(&format!("Failed to write {path}: {e}"));
            }
            eprintln!("Wrote {} bytes to {}", png.len(), path);
        }
        None => {
            if let Err(e) = io::stdout().write_all(&png) {
                fail(&format!("Failed to write PNG: {e}"));
            }
        }
    }
}
