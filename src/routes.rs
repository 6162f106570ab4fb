//! Route derivation and path mapping.
//!
//! A route is a normalized, slash-delimited URL path: it always begins with
//! `/`, directory-style routes end with `/`, and explicit `.html` routes
//! carry no trailing slash. The route ↔ output-path mapping here is shared
//! by the builder, the dev server and the link checker, so all three agree
//! on where a route lives on disk.

use std::path::{Component, Path, PathBuf};

// ============================================================================
// Route Normalization
// ============================================================================

/// Ensure a route starts with `/`.
pub fn normalize_route(route: &str) -> String {
    if route.starts_with('/') {
        route.to_owned()
    } else {
        format!("/{route}")
    }
}

/// Ensure a route ends with `/`. The root route stays `/`.
pub fn ensure_trailing_slash(route: &str) -> String {
    if route == "/" || route.ends_with('/') {
        route.to_owned()
    } else {
        format!("{route}/")
    }
}

// ============================================================================
// Route Derivation
// ============================================================================

/// Derive the canonical route for a content file.
///
/// An explicit permalink wins verbatim. Otherwise the relative path decides:
///
/// | Source | Route |
/// |--------|-------|
/// | `index.md` | `/` |
/// | `docs/index.md` | `/docs/` |
/// | `docs/install.md` | `/docs/install/` |
pub fn route_from_file(rel_path: &Path, permalink: Option<&str>) -> String {
    if let Some(permalink) = permalink {
        return permalink.to_owned();
    }

    let mut parts: Vec<&str> = rel_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .collect();
    let file = parts.pop().unwrap_or_default();
    let stem = file.strip_suffix(".md").unwrap_or(file);

    let dir = parts.join("/");
    if stem == "index" {
        if dir.is_empty() {
            return "/".to_owned();
        }
        return ensure_trailing_slash(&format!("/{dir}"));
    }

    let slug = if dir.is_empty() {
        format!("/{stem}")
    } else {
        format!("/{dir}/{stem}")
    };
    ensure_trailing_slash(&slug)
}

/// Map a route to its output file under `out_dir`.
///
/// `.html` routes map directly to that file; everything else is normalized
/// to trailing-slash form and lands on a nested `index.html`.
pub fn output_path_from_route(route: &str, out_dir: &Path) -> PathBuf {
    if route.ends_with(".html") {
        return out_dir.join(route.trim_start_matches('/'));
    }
    let normalized = ensure_trailing_slash(&normalize_route(route));
    if normalized == "/" {
        return out_dir.join("index.html");
    }
    out_dir.join(normalized.trim_matches('/')).join("index.html")
}

/// Recover the route an output file is served at (inverse of
/// [`output_path_from_route`] for paths inside `out_dir`).
pub fn route_from_output_path(path: &Path, out_dir: &Path) -> String {
    let rel = path.strip_prefix(out_dir).unwrap_or(path);
    let rel: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .collect();
    let rel = rel.join("/");

    if rel == "index.html" {
        return "/".to_owned();
    }
    if let Some(dir) = rel.strip_suffix("/index.html") {
        return format!("/{dir}/");
    }
    format!("/{rel}")
}

// ============================================================================
// Path Safety
// ============================================================================

/// Lexically normalize a path: resolve `.` and `..` components without
/// touching the filesystem (the candidate may not exist yet).
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Check whether `candidate` is `root` itself or lies strictly under it.
///
/// The comparison is component-wise, so `/srv/site-evil` is not inside
/// `/srv/site`.
pub fn is_within_root(candidate: &Path, root: &Path) -> bool {
    let candidate = normalize_lexically(candidate);
    let root = normalize_lexically(root);
    candidate.starts_with(&root)
}
