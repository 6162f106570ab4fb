//! Static file server for the built output directory.
//!
//! A lightweight HTTP server on `tiny_http`:
//!
//! - Exact file match served directly
//! - Directory-style and extensionless paths fall back to `index.html`
//!   and `<path>.html`
//! - `404.html` (when built) served as the not-found page, with status 404
//! - Graceful shutdown on Ctrl+C
//!
//! The path-to-file mapping mirrors the route rules the builder writes and
//! the checker verifies, so anything the checker accepts is servable.

use crate::log;
use anyhow::{Context, Result};
use std::{
    fs,
    io::Cursor,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Interface the dev server binds to.
const INTERFACE: &str = "127.0.0.1";

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

/// Serve a built output directory until Ctrl+C.
pub fn serve_site(out_dir: &Path, port: u16) -> Result<()> {
    let interface: std::net::IpAddr = INTERFACE.parse()?;
    let (server, addr) = try_bind_port(interface, port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "serving {} at http://{}", out_dir.display(), addr);

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, out_dir) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: std::net::IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < max_retries => {
                continue;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    max_retries,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Handle a single HTTP request.
fn handle_request(request: Request, out_dir: &Path) -> Result<()> {
    // Decode URL-encoded characters (e.g., %20 → space)
    let url_path = urlencoding::decode(request.url())
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    // Strip query string and fragment before resolving
    let path = url_path
        .split(['?', '#'])
        .next()
        .unwrap_or(&url_path)
        .to_owned();

    match resolve_file(out_dir, &path) {
        Some(file) => {
            // The 404 fallback page keeps its not-found status even though
            // a file is being served.
            let status = if file.ends_with("404.html") { 404 } else { 200 };
            serve_file(request, &file, status)
        }
        None => serve_not_found(request),
    }
}

/// Map a request path to the file to serve.
///
/// Resolution order: exact file, `<path>/index.html`, `<path>.html`
/// (extensionless paths only), then the `404.html` fallback page.
fn resolve_file(root: &Path, url_path: &str) -> Option<PathBuf> {
    if url_path == "/" {
        let index = root.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    } else {
        let local = root.join(url_path.trim_matches('/'));
        if local.is_file() {
            return Some(local);
        }
        if local.extension().is_none() {
            let with_index = local.join("index.html");
            if with_index.is_file() {
                return Some(with_index);
            }
            let with_html = local.with_extension("html");
            if with_html.is_file() {
                return Some(with_html);
            }
        }
    }

    let fallback = root.join("404.html");
    fallback.is_file().then_some(fallback)
}

/// Serve a file with appropriate content type and status.
fn serve_file(request: Request, path: &Path, status: u16) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = guess_content_type(path);

    let response = Response::from_data(content)
        .with_status_code(StatusCode(status))
        .with_header(Header::from_bytes("Content-Type", content_type).unwrap());

    request.respond(response)?;
    Ok(())
}

/// Serve a plain 404 when no fallback page exists.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![Header::from_bytes("Content-Type", "text/plain").unwrap()],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        // Default binary
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_root_serves_index() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.html", "home");
        assert_eq!(
            resolve_file(dir.path(), "/"),
            Some(dir.path().join("index.html"))
        );
    }

    #[test]
    fn test_exact_file_match() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "assets/site.css", "body{}");
        assert_eq!(
            resolve_file(dir.path(), "/assets/site.css"),
            Some(dir.path().join("assets/site.css"))
        );
    }

    #[test]
    fn test_directory_resolves_to_index() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/index.html", "docs");
        assert_eq!(
            resolve_file(dir.path(), "/docs/"),
            Some(dir.path().join("docs/index.html"))
        );
        assert_eq!(
            resolve_file(dir.path(), "/docs"),
            Some(dir.path().join("docs/index.html"))
        );
    }

    #[test]
    fn test_extensionless_html_fallback() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "about.html", "about");
        assert_eq!(
            resolve_file(dir.path(), "/about"),
            Some(dir.path().join("about.html"))
        );
    }

    #[test]
    fn test_missing_path_falls_back_to_404_page() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "404.html", "nope");
        assert_eq!(
            resolve_file(dir.path(), "/nowhere/"),
            Some(dir.path().join("404.html"))
        );
    }

    #[test]
    fn test_missing_path_without_404_page() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_file(dir.path(), "/nowhere/"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            guess_content_type(Path::new("a/index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(guess_content_type(Path::new("x.png")), "image/png");
        assert_eq!(
            guess_content_type(Path::new("x.unknown")),
            "application/octet-stream"
        );
    }
}
