// §6.3 `dumb://` custom scheme, served entirely in-process from a small
// embedded asset table — the teacher bundles its own small assets
// (`style.css`) via `include_bytes!`/`include_str!` rather than a
// build-time asset-bundling crate, so this follows the same precedent
// instead of pulling in something like `rust-embed`.

use gtk::gio::prelude::*;
use gtk::glib;

struct Asset {
    path: &'static str,
    bytes: &'static [u8],
}

static ASSETS: &[Asset] = &[
    Asset { path: "home.html", bytes: include_bytes!("../../assets/home.html") },
    Asset { path: "app.css", bytes: include_bytes!("../../assets/app.css") },
    Asset { path: "app.js", bytes: include_bytes!("../../assets/app.js") },
    Asset { path: "favicon.svg", bytes: include_bytes!("../../assets/favicon.svg") },
];

fn find_asset(path: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|a| a.path == path)
}

fn mime_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "js" | "mjs" => "text/javascript",
        "css" => "text/css",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        _ => "text/plain",
    }
}

// Resolves a `dumb://` URI to the embedded bytes and mime type it serves,
// per the routing table in spec §6.3. Returns None for an asset-not-found
// (`NetworkAssetMissing`, surfaced by the caller as a 404-equivalent).
fn resolve(uri: &str) -> Option<(&'static [u8], &'static str)> {
    let rest = uri.strip_prefix("dumb://").or_else(|| uri.strip_prefix("dumb:"))?;
    let rest = rest.trim_start_matches('/');

    if rest.is_empty() || rest == "home" {
        let asset = find_asset("home.html")?;
        return Some((asset.bytes, "text/html"));
    }

    if rest == "homepage/favicon.ico" {
        let asset = find_asset("favicon.svg")?;
        return Some((asset.bytes, "image/svg+xml"));
    }

    if let Some(relative) = rest.strip_prefix("app/") {
        let cleaned = path_clean::clean(relative);
        let cleaned = cleaned.to_string_lossy();
        let asset = find_asset(cleaned.as_ref())?;
        return Some((asset.bytes, mime_for(asset.path)));
    }

    None
}

pub fn register_dumb_scheme(context: &webkit6::WebContext) {
    context.register_uri_scheme("dumb", |request| {
        let uri = request.uri().map(|u| u.to_string()).unwrap_or_default();

        match resolve(&uri) {
            Some((bytes, mime)) => {
                let stream = gtk::gio::MemoryInputStream::from_bytes(&glib::Bytes::from_static(bytes));
                request.finish(&stream, bytes.len() as i64, Some(mime));
            }
            None => {
                warn!("dumb:// asset not found: {uri}");
                let error = glib::Error::new(
                    gtk::gio::IOErrorEnum::NotFound,
                    &format!("No asset for {uri}"),
                );
                request.finish_error(&mut error.clone());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_resolves_to_home_html() {
        let (_, mime) = resolve("dumb://home").unwrap();
        assert_eq!(mime, "text/html");
        let (_, mime) = resolve("dumb:home").unwrap();
        assert_eq!(mime, "text/html");
    }

    #[test]
    fn app_path_resolves_known_asset_with_derived_mime() {
        let (_, mime) = resolve("dumb://app/app.css").unwrap();
        assert_eq!(mime, "text/css");
    }

    #[test]
    fn favicon_maps_to_embedded_svg() {
        let (_, mime) = resolve("dumb://homepage/favicon.ico").unwrap();
        assert_eq!(mime, "image/svg+xml");
    }

    #[test]
    fn unknown_extension_falls_back_to_text_plain() {
        assert_eq!(mime_for("weird.xyz"), "text/plain");
    }

    #[test]
    fn missing_asset_resolves_to_none() {
        assert!(resolve("dumb://app/does-not-exist.js").is_none());
    }
}
