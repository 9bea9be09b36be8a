//! Styled rasterization of a [`QrSymbol`]: shapes, colors, quiet zone, and
//! optional logo overlay, encoded as PNG.

use image::GenericImageView;
use image::imageops::FilterType;
use tiny_skia::{
    Color, FillRule, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::error::{QrForgeError, Result};
use crate::matrix::QrSymbol;
use crate::types::{DotShape, EyeShape, Rgba, StyleConfig};

/// Output canvases above this are rejected before allocation.
pub const MAX_DIMENSION: u32 = 10_000;

/// Corner radius of "rounded" modules, as a fraction of the module size.
const ROUND_RADIUS: f32 = 0.3;

/// Rasterizes the symbol with the given style and returns PNG bytes.
pub fn render(symbol: &QrSymbol, style: &StyleConfig) -> Result<Vec<u8>> {
    render_with_logo(symbol, style, None)
}

/// Like [`render`], compositing a logo image over the symbol center. The logo
/// must fit the error correction budget of the symbol's level.
pub fn render_with_logo(
    symbol: &QrSymbol,
    style: &StyleConfig,
    logo: Option<&[u8]>,
) -> Result<Vec<u8>> {
    validate_style(style)?;

    let module = style.module_px;
    let canvas = u64::from(symbol.size() + 2 * style.padding) * u64::from(module);
    if canvas > u64::from(MAX_DIMENSION) {
        return Err(QrForgeError::CanvasTooLarge {
            width: canvas.min(u64::from(u32::MAX)) as u32,
            height: canvas.min(u64::from(u32::MAX)) as u32,
            max_dimension: MAX_DIMENSION,
        });
    }
    let canvas = canvas as u32;

    let mut pixmap = Pixmap::new(canvas, canvas).ok_or(QrForgeError::RenderFailed)?;
    pixmap.fill(to_color(style.bg_color));

    // One path per color class; light modules stay background.
    let mut dots = PathBuilder::new();
    let mut eyes = PathBuilder::new();
    let size = symbol.size();
    for y in 0..size {
        for x in 0..size {
            if !symbol.module(x, y) {
                continue;
            }
            let px = ((x + style.padding) * module) as f32;
            let py = ((y + style.padding) * module) as f32;
            let m = module as f32;
            let (is_eye, is_eyeball) = eye_class(x, y, size);
            if is_eyeball {
                // Eyeballs stay square so the finder center reads solid.
                push_square(&mut eyes, px, py, m);
            } else if is_eye {
                match style.eye_shape {
                    EyeShape::Square => push_square(&mut eyes, px, py, m),
                    EyeShape::Rounded => push_rounded(&mut eyes, px, py, m),
                    EyeShape::Circle => eyes.push_circle(px + m / 2.0, py + m / 2.0, m / 2.0),
                }
            } else {
                match style.dot_shape {
                    DotShape::Square => push_square(&mut dots, px, py, m),
                    DotShape::Rounded => push_rounded(&mut dots, px, py, m),
                    DotShape::Circle => dots.push_circle(px + m / 2.0, py + m / 2.0, m / 2.0),
                }
            }
        }
    }
    fill(&mut pixmap, dots, style.dot_color);
    fill(&mut pixmap, eyes, style.eye_color());

    if let Some(bytes) = logo {
        overlay_logo(&mut pixmap, symbol, style, bytes)?;
    }

    pixmap.encode_png().map_err(|_| QrForgeError::RenderFailed)
}

fn validate_style(style: &StyleConfig) -> Result<()> {
    if style.module_px == 0 {
        return Err(QrForgeError::InvalidStyle(
            "module_px must be at least 1".to_string(),
        ));
    }
    if !(style.logo_scale > 0.0 && style.logo_scale <= 1.0) {
        return Err(QrForgeError::InvalidStyle(format!(
            "logo_scale {} must be within (0, 1]",
            style.logo_scale
        )));
    }
    for (name, cap) in [
        ("low", style.logo_policy.low),
        ("medium", style.logo_policy.medium),
        ("quartile", style.logo_policy.quartile),
        ("high", style.logo_policy.high),
    ] {
        if !(0.0..=1.0).contains(&cap) {
            return Err(QrForgeError::InvalidStyle(format!(
                "logo_policy.{name} {cap} must be within [0, 1]"
            )));
        }
    }
    Ok(())
}

/// Whether (x, y) sits in one of the three 7x7 finder patterns, and whether
/// it is in the inner 3x3 eyeball.
fn eye_class(x: u32, y: u32, size: u32) -> (bool, bool) {
    let corners = [(0, 0), (size - 7, 0), (0, size - 7)];
    for (cx, cy) in corners {
        if x >= cx && x < cx + 7 && y >= cy && y < cy + 7 {
            let ball = x >= cx + 2 && x < cx + 5 && y >= cy + 2 && y < cy + 5;
            return (true, ball);
        }
    }
    (false, false)
}

fn push_square(pb: &mut PathBuilder, x: f32, y: f32, size: f32) {
    if let Some(rect) = Rect::from_xywh(x, y, size, size) {
        pb.push_rect(rect);
    }
}

fn push_rounded(pb: &mut PathBuilder, x: f32, y: f32, size: f32) {
    let r = size * ROUND_RADIUS;
    pb.move_to(x + r, y);
    pb.line_to(x + size - r, y);
    pb.quad_to(x + size, y, x + size, y + r);
    pb.line_to(x + size, y + size - r);
    pb.quad_to(x + size, y + size, x + size - r, y + size);
    pb.line_to(x + r, y + size);
    pb.quad_to(x, y + size, x, y + size - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
}

fn fill(pixmap: &mut Pixmap, pb: PathBuilder, color: Rgba) {
    let Some(path) = pb.finish() else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(to_color(color));
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::default(), None);
}

fn to_color(c: Rgba) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}

/// Loads a [`StyleConfig`] from a TOML file, falling back to defaults (with a
/// warning on stderr) when the file is missing or malformed.
pub fn load_style(config_path: Option<&str>) -> StyleConfig {
    let Some(path) = config_path else {
        return StyleConfig::default();
    };
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to read style config {path}: {e}");
            return StyleConfig::default();
        }
    };
    match toml::from_str(&contents) {
        Ok(style) => style,
        Err(e) => {
            eprintln!("Warning: failed to parse style config {path}: {e}");
            StyleConfig::default()
        }
    }
}

fn overlay_logo(
    pixmap: &mut Pixmap,
    symbol: &QrSymbol,
    style: &StyleConfig,
    bytes: &[u8],
) -> Result<()> {
    let logo =
        image::load_from_memory(bytes).map_err(|e| QrForgeError::LogoDecode(e.to_string()))?;

    let symbol_px = symbol.size() * style.module_px;
    let target = ((symbol_px as f32) * style.logo_scale).round().max(1.0) as u32;
    let resized = logo.resize(target, target, FilterType::Lanczos3);
    let (w, h) = resized.dimensions();

    let coverage = (w * h) as f32 / (symbol_px * symbol_px) as f32;
    let cap = style.logo_policy.max_coverage(symbol.ec_level());
    if coverage > cap {
        return Err(QrForgeError::LogoTooLarge {
            coverage: coverage * 100.0,
            cap: cap * 100.0,
            level: symbol.ec_level(),
        });
    }

    let x0 = (pixmap.width() - w) / 2;
    let y0 = (pixmap.height() - h) / 2;

    // Clear the backing rectangle so the logo sits on background, not modules.
    if let Some(rect) = Rect::from_xywh(x0 as f32, y0 as f32, w as f32, h as f32) {
        let mut paint = Paint::default();
        paint.set_color(to_color(style.bg_color));
        pixmap.fill_rect(rect, &paint, Transform::default(), None);
    }

    // tiny-skia wants premultiplied RGBA.
    let rgba = resized.to_rgba8();
    let premultiplied: Vec<u8> = rgba
        .as_raw()
        .chunks_exact(4)
        .flat_map(|px| {
            let a = u16::from(px[3]);
            [
                ((u16::from(px[0]) * a) / 255) as u8,
                ((u16::from(px[1]) * a) / 255) as u8,
                ((u16::from(px[2]) * a) / 255) as u8,
                px[3],
            ]
        })
        .collect();
    let logo_size = IntSize::from_wh(w, h).ok_or(QrForgeError::RenderFailed)?;
    let logo_pixmap =
        Pixmap::from_vec(premultiplied, logo_size).ok_or(QrForgeError::RenderFailed)?;
    pixmap.draw_pixmap(
        x0 as i32,
        y0 as i32,
        logo_pixmap.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use crate::types::Ecc;
    use image::GenericImageView;

    fn symbol() -> QrSymbol {
        encode("HELLO", Ecc::Medium).unwrap()
    }

    fn png_logo(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn render_is_deterministic() {
        let s = symbol();
        let style = StyleConfig::default();
        let a = render(&s, &style).unwrap();
        let b = render(&s, &style).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn canvas_dimensions_follow_padding() {
        let s = symbol();
        for (padding, extra) in [(0u32, 0u32), (1, 2), (4, 8)] {
            let style = StyleConfig {
                padding,
                ..StyleConfig::default()
            };
            let png = render(&s, &style).unwrap();
            let img = image::load_from_memory(&png).unwrap();
            let expected = (s.size() + extra) * style.module_px;
            assert_eq!(img.dimensions(), (expected, expected));
        }
    }

    #[test]
    fn padding_does_not_move_module_content() {
        let s = symbol();
        let base = StyleConfig::default();
        let padded = StyleConfig {
            padding: base.padding + 3,
            ..base.clone()
        };
        let img_a = image::load_from_memory(&render(&s, &base).unwrap()).unwrap();
        let img_b = image::load_from_memory(&render(&s, &padded).unwrap()).unwrap();
        let shift = 3 * base.module_px;
        let probe = s.size() * base.module_px / 2;
        assert_eq!(
            img_a.get_pixel(probe, probe),
            img_b.get_pixel(probe + shift, probe + shift)
        );
    }

    #[test]
    fn circle_dots_square_eyes_in_one_image() {
        let s = symbol();
        let style = StyleConfig {
            dot_shape: DotShape::Circle,
            eye_shape: EyeShape::Square,
            eye_color: Some(Rgba::from_hex("#cc0000").unwrap()),
            padding: 0,
            ..StyleConfig::default()
        };
        let png = render(&s, &style).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        let m = style.module_px;

        // Finder corner module (0,0): full square in eye color.
        assert_eq!(img.get_pixel(m / 2, m / 2).0, [0xcc, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0xcc, 0, 0, 255]);

        // Find a dark data module and check circle geometry: colored at the
        // center, background at the cell corner.
        let (x, y) = (0..s.size())
            .flat_map(|y| (0..s.size()).map(move |x| (x, y)))
            .find(|&(x, y)| s.module(x, y) && !eye_class(x, y, s.size()).0)
            .unwrap();
        let center = img.get_pixel(x * m + m / 2, y * m + m / 2).0;
        assert_eq!(center, [0, 0, 0, 255]);
        let corner = img.get_pixel(x * m, y * m).0;
        assert_eq!(corner, [255, 255, 255, 255], "circle leaves corners light");
    }

    #[test]
    fn rendered_png_decodes_back() {
        let s = encode("RENDER ROUND TRIP", Ecc::Medium).unwrap();
        let style = StyleConfig {
            padding: 4,
            ..StyleConfig::default()
        };
        let png = render(&s, &style).unwrap();
        let luma = image::load_from_memory(&png).unwrap().to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare(luma);
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1);
        let (_, content) = grids[0].decode().unwrap();
        assert_eq!(content, "RENDER ROUND TRIP");
    }

    #[test]
    fn small_logo_composites_over_center() {
        let s = encode("LOGO SPACE", Ecc::High).unwrap();
        let style = StyleConfig {
            logo_scale: 0.2,
            ..StyleConfig::default()
        };
        let logo = png_logo(64, 64, [0, 0, 255, 255]);
        let png = render_with_logo(&s, &style, Some(&logo)).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        let center = img.get_pixel(img.width() / 2, img.height() / 2).0;
        assert_eq!(center, [0, 0, 255, 255]);
    }

    #[test]
    fn oversized_logo_rejected_at_low() {
        // Tiny payload, Low EC, logo asking for >50% coverage.
        let s = encode("1", Ecc::Low).unwrap();
        let style = StyleConfig {
            logo_scale: 0.75,
            ..StyleConfig::default()
        };
        let logo = png_logo(64, 64, [0, 0, 255, 255]);
        let err = render_with_logo(&s, &style, Some(&logo)).unwrap_err();
        match err {
            QrForgeError::LogoTooLarge { coverage, cap, level } => {
                assert!(coverage > 50.0);
                assert!((cap - 7.0).abs() < 1e-3);
                assert_eq!(level, Ecc::Low);
            }
            other => panic!("expected LogoTooLarge, got {other}"),
        }
    }

    #[test]
    fn same_logo_allowed_at_high() {
        let s = encode("1", Ecc::High).unwrap();
        let style = StyleConfig {
            logo_scale: 0.5,
            ..StyleConfig::default()
        };
        let logo = png_logo(64, 64, [0, 0, 255, 255]);
        // 25% coverage: above the Low cap, within the High cap.
        assert!(render_with_logo(&s, &style, Some(&logo)).is_ok());
        let s_low = encode("1", Ecc::Low).unwrap();
        assert!(render_with_logo(&s_low, &style, Some(&logo)).is_err());
    }

    #[test]
    fn garbage_logo_bytes_rejected() {
        let s = symbol();
        let err = render_with_logo(&s, &StyleConfig::default(), Some(b"not an image")).unwrap_err();
        assert!(matches!(err, QrForgeError::LogoDecode(_)));
    }

    #[test]
    fn invalid_style_rejected() {
        let s = symbol();
        let zero_module = StyleConfig {
            module_px: 0,
            ..StyleConfig::default()
        };
        assert!(matches!(
            render(&s, &zero_module).unwrap_err(),
            QrForgeError::InvalidStyle(_)
        ));
        let wild_scale = StyleConfig {
            logo_scale: 1.5,
            ..StyleConfig::default()
        };
        assert!(matches!(
            render(&s, &wild_scale).unwrap_err(),
            QrForgeError::InvalidStyle(_)
        ));
    }

    #[test]
    fn oversized_canvas_rejected() {
        let s = symbol();
        let style = StyleConfig {
            module_px: 100,
            padding: 40,
            ..StyleConfig::default()
        };
        assert!(matches!(
            render(&s, &style).unwrap_err(),
            QrForgeError::CanvasTooLarge { .. }
        ));
    }

    #[test]
    fn eye_class_covers_three_corners() {
        assert_eq!(eye_class(0, 0, 21), (true, false));
        assert_eq!(eye_class(3, 3, 21), (true, true));
        assert_eq!(eye_class(20, 0, 21), (true, false));
        assert_eq!(eye_class(16, 2, 21), (true, true));
        assert_eq!(eye_class(0, 20, 21), (true, false));
        assert_eq!(eye_class(20, 20, 21), (false, false));
        assert_eq!(eye_class(10, 10, 21), (false, false));
    }
}
