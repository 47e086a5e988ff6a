// src/app/gfx.rs
use std::path::Path;

use eframe::egui::{self as eg, ColorImage, TextureHandle};

use super::types::ColorScheme;

/// Upload an RGBA image to a GPU texture. (UI thread only)
pub fn upload_rgba(
    ctx: &eg::Context,
    w: u32,
    h: u32,
    bytes: &[u8],
    name: &str,
) -> TextureHandle {
    let img = ColorImage::from_rgba_unmultiplied([w as usize, h as usize], bytes);
    ctx.load_texture(name.to_string(), img, eg::TextureOptions::LINEAR)
}

/// Load a texture from a cached poster file. Rejects landscape art.
/// (UI thread only)
pub fn load_texture_from_path(
    ctx: &eg::Context,
    path: &Path,
    name: &str,
) -> Result<TextureHandle, String> {
    let (w, h, bytes) = super::cache::load_rgba(path)?;
    if h == 0 || (w as f32) / (h as f32) > 1.0 {
        return Err(format!("non-poster aspect {w}x{h}"));
    }
    Ok(upload_rgba(ctx, w, h, &bytes, name))
}

pub fn apply_color_scheme(ctx: &eg::Context, scheme: ColorScheme) {
    ctx.set_visuals(match scheme {
        ColorScheme::Light => eg::Visuals::light(),
        ColorScheme::Dark => eg::Visuals::dark(),
    });
}
