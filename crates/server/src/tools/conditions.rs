//! cond and muf tool implementations.
//!
//! Both return a propagation image from a public site. The MUF map is
//! published as SVG; it is rendered to PNG once per fetched map and the
//! PNG is kept on the cache entry.

use base64::{Engine, prelude::BASE64_STANDARD};
use bytes::Bytes;
use hamclub_core::{Card, Error, WebCache};
use resvg::{tiny_skia, usvg};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_content;
use crate::error::ToolError;

pub const SOLAR_CONDITIONS_URL: &str = "https://www.hamqsl.com/solar101pic.php";
pub const MUF_MAP_URL: &str = "https://prop.kc2g.com/renders/current/mufd-normal-now.svg";

/// Derivation kind for the rendered MUF map.
const PNG_KIND: &str = "image/png";

/// Output accompanying the image content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImageOutput {
    pub card: Card,
    /// Suggested attachment filename.
    pub filename: String,
    pub mime_type: String,
}

/// Implementation of the cond tool.
pub async fn cond_impl(cache: &WebCache) -> Result<CallToolResult, McpError> {
    let entry = cache.get(SOLAR_CONDITIONS_URL).await?;

    let Some((mime_type, extension)) = sniff_image_type(entry.content()) else {
        return Err(not_an_image(cache, SOLAR_CONDITIONS_URL, "unrecognized image format").await);
    };

    let card = Card::new("Current Solar Conditions", "Images from [hamqsl.com](https://www.hamqsl.com)")
        .footer(entry.last_refreshed());
    image_result(card, format!("conditions.{extension}"), mime_type, entry.content())
}

/// Implementation of the muf tool.
pub async fn muf_impl(cache: &WebCache) -> Result<CallToolResult, McpError> {
    let (entry, png) = match cache.get_or_derive(MUF_MAP_URL, PNG_KIND, svg_to_png).await {
        Ok(found) => found,
        Err(err) if err.is_fetch_error() => return Err(err.into()),
        Err(err) => return Err(not_an_image(cache, MUF_MAP_URL, &err.to_string()).await),
    };

    let card = Card::new("Current MUF Map", "Map from [prop.kc2g.com](https://prop.kc2g.com)")
        .footer(entry.last_refreshed());
    image_result(card, "mufmap.png".to_string(), PNG_KIND, &png)
}

/// Drop the unusable body so the next call fetches again.
async fn not_an_image(cache: &WebCache, url: &str, reason: &str) -> McpError {
    cache.clear(url).await;
    tracing::warn!(url, reason, "response was not a usable image");
    ToolError::NotAnImage { url: url.to_string(), reason: reason.to_string() }.into()
}

fn image_result(card: Card, filename: String, mime_type: &str, image: &[u8]) -> Result<CallToolResult, McpError> {
    let output = ImageOutput { card, filename, mime_type: mime_type.to_string() };
    let encoded = BASE64_STANDARD.encode(image);
    Ok(CallToolResult::success(vec![json_content(&output)?, Content::image(encoded, mime_type)]))
}

/// Rasterize an SVG document at its intrinsic size.
fn svg_to_png(svg: &Bytes) -> Result<Bytes, Error> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_data(svg, &options).map_err(|e| Error::InvalidInput(format!("invalid SVG: {e}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| Error::InvalidInput(format!("cannot render a {}x{} image", size.width(), size.height())))?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    let png = pixmap
        .encode_png()
        .map_err(|e| Error::InvalidInput(format!("PNG encoding failed: {e}")))?;

    tracing::debug!(width = size.width(), height = size.height(), bytes = png.len(), "rendered SVG to PNG");
    Ok(Bytes::from(png))
}

/// Identify a raster image format from its leading bytes.
fn sniff_image_type(content: &[u8]) -> Option<(&'static str, &'static str)> {
    if content.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(("image/png", "png"))
    } else if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        Some(("image/gif", "gif"))
    } else if content.starts_with(&[0xff, 0xd8, 0xff]) {
        Some(("image/jpeg", "jpg"))
    } else {
        None
    }
}
