use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Result, ViewerError};
use crate::gpu::{GraphicsContext, TextureHandle};

/// Decode an image file and upload it as an RGBA8 texture.
///
/// With `flip_vertically` the first row uploaded is the bottom of the image,
/// matching OpenGL's texture origin.
pub fn load_texture(ctx: &mut dyn GraphicsContext, path: &Path, flip_vertically: bool) -> Result<TextureHandle> {
    let img = image::open(path).map_err(|e| {
        ViewerError::Texture(format!("Failed to decode {}: {e}", path.display()))
    })?;
    let img = if flip_vertically { img.flipv() } else { img };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let texture = ctx.create_texture(width, height, rgba.as_raw());
    if !texture.is_allocated() {
        return Err(ViewerError::Texture(format!(
            "Upload of {} ({width}x{height}) failed",
            path.display()
        )));
    }
    debug!(path = %path.display(), width, height, texture = texture.0, "Loaded texture");
    Ok(texture)
}

/// Like [`load_texture`], but logs failures and returns `NONE`.
pub fn load_image_into_texture(ctx: &mut dyn GraphicsContext, path: &Path, flip_vertically: bool) -> TextureHandle {
    load_texture(ctx, path, flip_vertically).unwrap_or_else(|e| {
        warn!("{e}");
        TextureHandle::NONE
    })
}
