//! A minimal preview server for a built site, used by the `test` command.
//!
//! Request resolution order:
//! 1. Exact file match → serve file
//! 2. Directory with `index.html` → serve `index.html`
//! 3. Anything else → 404

use crate::page::INDEX_FILE;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Serves `root` on `127.0.0.1:<port>` until Ctrl+C.
pub fn serve(root: &Path, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let server = Arc::new(
        Server::http(addr).map_err(|e| anyhow!("Binding {}: {}", addr, e))?,
    );

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        info!("Shutting down");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    info!("Serving {} at http://{}", root.display(), addr);
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, root) {
            warn!("Request error: {}", e);
        }
    }
    Ok(())
}

fn handle_request(request: Request, root: &Path) -> Result<()> {
    debug!("{} {}", request.method(), request.url());
    match resolve(root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

/// Maps a request URL onto a file below `root`. Returns [`None`] if nothing
/// should be served.
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let url_path = urlencoding::decode(url).ok()?.into_owned();
    let path_without_query = url_path.split('?').next().unwrap_or("");
    let request_path = path_without_query.trim_matches('/');

    // Refuse to walk out of the served directory.
    if request_path.split('/').any(|segment| segment == "..") {
        return None;
    }

    let local_path = root.join(request_path);
    if local_path.is_file() {
        return Some(local_path);
    }
    let index_path = local_path.join(INDEX_FILE);
    if index_path.is_file() {
        return Some(index_path);
    }
    None
}

fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content)
        .with_header(content_type_header(guess_content_type(path))?);
    request.respond(response)?;
    Ok(())
}

fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![content_type_header("text/plain")?],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

fn content_type_header(content_type: &str) -> Result<Header> {
    Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
        .map_err(|_| anyhow!("Invalid content type `{}`", content_type))
}

/// Guesses the MIME type from the file extension.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("blog")).unwrap();
        std::fs::write(root.path().join(INDEX_FILE), "home").unwrap();
        std::fs::write(root.path().join("blog").join(INDEX_FILE), "blog").unwrap();
        std::fs::write(root.path().join("my file.txt"), "x").unwrap();

        assert_eq!(Some(root.path().join(INDEX_FILE)), resolve(root.path(), "/"));
        assert_eq!(
            Some(root.path().join("blog").join(INDEX_FILE)),
            resolve(root.path(), "/blog/?t=1")
        );
        assert_eq!(
            Some(root.path().join("my file.txt")),
            resolve(root.path(), "/my%20file.txt")
        );
        assert_eq!(None, resolve(root.path(), "/missing/"));
        assert_eq!(None, resolve(root.path(), "/../etc/passwd"));
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!("text/css; charset=utf-8", guess_content_type(Path::new("a/styles.css")));
        assert_eq!("application/octet-stream", guess_content_type(Path::new("blob")));
    }
}
