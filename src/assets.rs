use rust_embed::RustEmbed;

/// Front-end files (page, script, styles, border GeoJSON, locale dictionaries)
/// compiled into the binary.
#[derive(RustEmbed)]
#[folder = "frontend/"]
pub struct Asset;

/// Simple MIME type detection based on file extension
pub fn mime_type(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("geojson") => "application/geo+json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
