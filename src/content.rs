//! Content document loading.
//!
//! Splits markdown files into a typed front-matter header and a body,
//! resolves external `source` references behind the path-safety check, and
//! renders markdown to HTML.
//!
//! The front-matter header is a `---`-delimited block of `key: value` lines
//! at the very top of the file. Recognized keys land in [`FrontMatter`];
//! unknown keys are ignored.

use crate::routes::is_within_root;
use anyhow::Result;
use pulldown_cmark::{Options, Parser, html as md_html};
use std::{fs, path::Path};
use thiserror::Error;

/// Content-source errors. Both are authoring bugs and abort the build.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content source outside site root: `{source_field}` (from {document})")]
    SourceOutsideRoot {
        document: String,
        source_field: String,
    },

    #[error("Content source not found: `{source_field}` (from {document})")]
    SourceNotFound {
        document: String,
        source_field: String,
    },
}

/// Typed front-matter schema. Every recognized key is optional; absent keys
/// fall back to config-level defaults during the build.
#[derive(Debug, Clone, Default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub permalink: Option<String>,
    pub redirect: Option<String>,
    pub lang: Option<String>,
    pub body_class: Option<String>,
    pub extra_head: Option<String>,
    pub source: Option<String>,
}

/// One parsed markdown file under the content root.
#[derive(Debug, Clone)]
pub struct ContentDocument {
    /// Path relative to the content directory
    pub relative_path: std::path::PathBuf,
    pub front_matter: FrontMatter,
    pub body: String,
}

/// Split a raw document into front matter and body.
///
/// A header exists only when the first line is exactly `---` and a closing
/// `---` line follows; anything else is all body.
pub fn parse_document(relative_path: &Path, raw: &str) -> ContentDocument {
    let (front_matter, body) = split_front_matter(raw);
    ContentDocument {
        relative_path: relative_path.to_path_buf(),
        front_matter,
        body: body.to_owned(),
    }
}

fn split_front_matter(raw: &str) -> (FrontMatter, &str) {
    let mut lines = raw.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (FrontMatter::default(), raw);
    };
    if first.trim_end() != "---" {
        return (FrontMatter::default(), raw);
    }

    let mut front_matter = FrontMatter::default();
    let mut consumed = first.len();
    for line in lines {
        consumed += line.len();
        let trimmed = line.trim_end();
        if trimmed == "---" {
            return (front_matter, &raw[consumed..]);
        }
        parse_header_line(trimmed, &mut front_matter);
    }

    // No closing delimiter: not a header after all.
    (FrontMatter::default(), raw)
}

/// Parse one `key: value` header line into the schema. Lines without a
/// colon and unknown keys are ignored.
fn parse_header_line(line: &str, front_matter: &mut FrontMatter) {
    let Some((key, value)) = line.split_once(':') else {
        return;
    };
    let value = unquote(value.trim()).to_owned();
    let slot = match key.trim() {
        "title" => &mut front_matter.title,
        "description" => &mut front_matter.description,
        "ogTitle" => &mut front_matter.og_title,
        "ogDescription" => &mut front_matter.og_description,
        "ogImage" => &mut front_matter.og_image,
        "permalink" => &mut front_matter.permalink,
        "redirect" => &mut front_matter.redirect,
        "lang" => &mut front_matter.lang,
        "bodyClass" => &mut front_matter.body_class,
        "extraHead" => &mut front_matter.extra_head,
        "source" => &mut front_matter.source,
        _ => return,
    };
    *slot = Some(value);
}

/// Strip one pair of matching surrounding quotes, if present.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Load the body text a document renders from.
///
/// Without a `source` field this is the document's own body. With one, the
/// referenced file is read instead, after checking it resolves inside
/// `allowed_root`. Both failure modes are fatal authoring errors.
pub fn load_body(
    document: &ContentDocument,
    site_root: &Path,
    allowed_root: &Path,
) -> Result<String, ContentError> {
    let Some(source) = &document.front_matter.source else {
        return Ok(document.body.clone());
    };

    let document_name = document.relative_path.display().to_string();
    let source_path = site_root.join(source);
    let source_path = std::path::absolute(&source_path).unwrap_or(source_path);
    let allowed_root = std::path::absolute(allowed_root).unwrap_or_else(|_| allowed_root.to_path_buf());

    if !is_within_root(&source_path, &allowed_root) {
        return Err(ContentError::SourceOutsideRoot {
            document: document_name,
            source_field: source.clone(),
        });
    }
    if !source_path.is_file() {
        return Err(ContentError::SourceNotFound {
            document: document_name,
            source_field: source.clone(),
        });
    }
    fs::read_to_string(&source_path).map_err(|_| ContentError::SourceNotFound {
        document: document_name,
        source_field: source.clone(),
    })
}

/// Render markdown to an HTML fragment.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn parse(raw: &str) -> ContentDocument {
        parse_document(Path::new("docs/install.md"), raw)
    }

    #[test]
    fn test_header_and_body_split() {
        let doc = parse("---\ntitle: Install\n---\n# Install\n");
        assert_eq!(doc.front_matter.title.as_deref(), Some("Install"));
        assert_eq!(doc.body, "# Install\n");
    }

    #[test]
    fn test_quoted_values_unquoted() {
        let doc = parse("---\nredirect: \"/new-location/\"\nlang: 'fr'\n---\n");
        assert_eq!(doc.front_matter.redirect.as_deref(), Some("/new-location/"));
        assert_eq!(doc.front_matter.lang.as_deref(), Some("fr"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let doc = parse("---\ntitle: X\nweight: 4\ndraft: true\n---\nbody");
        assert_eq!(doc.front_matter.title.as_deref(), Some("X"));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_camel_case_keys() {
        let doc = parse("---\nogTitle: A\nogImage: /img.png\nbodyClass: home\n---\n");
        assert_eq!(doc.front_matter.og_title.as_deref(), Some("A"));
        assert_eq!(doc.front_matter.og_image.as_deref(), Some("/img.png"));
        assert_eq!(doc.front_matter.body_class.as_deref(), Some("home"));
    }

    #[test]
    fn test_no_header_is_all_body() {
        let doc = parse("# Just markdown\n");
        assert!(doc.front_matter.title.is_none());
        assert_eq!(doc.body, "# Just markdown\n");
    }

    #[test]
    fn test_unclosed_header_is_all_body() {
        let raw = "---\ntitle: X\nno closing line\n";
        let doc = parse(raw);
        assert!(doc.front_matter.title.is_none());
        assert_eq!(doc.body, raw);
    }

    #[test]
    fn test_crlf_header() {
        let doc = parse("---\r\ntitle: Install\r\n---\r\nbody\r\n");
        assert_eq!(doc.front_matter.title.as_deref(), Some("Install"));
    }

    #[test]
    fn test_value_containing_colon() {
        let doc = parse("---\ntitle: Install: the hard way\n---\n");
        assert_eq!(
            doc.front_matter.title.as_deref(),
            Some("Install: the hard way")
        );
    }

    #[test]
    fn test_render_markdown_basics() {
        let html = render_markdown("# Title\n\nSome *text*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn test_render_markdown_passes_raw_html() {
        let html = render_markdown("<div data-cta=\"primary\">Go</div>");
        assert!(html.contains("data-cta=\"primary\""));
    }

    #[test]
    fn test_load_body_without_source() {
        let doc = parse("---\ntitle: X\n---\nbody text");
        let body = load_body(&doc, Path::new("/nonexistent"), Path::new("/nonexistent")).unwrap();
        assert_eq!(body, "body text");
    }

    #[test]
    fn test_load_body_from_source_file() {
        let dir = TempDir::new().unwrap();
        let site_root = dir.path().join("site");
        std::fs::create_dir_all(&site_root).unwrap();
        std::fs::write(dir.path().join("README.md"), "shared text").unwrap();

        let doc = parse("---\nsource: ../README.md\n---\nignored");
        let body = load_body(&doc, &site_root, dir.path()).unwrap();
        assert_eq!(body, "shared text");
    }

    #[test]
    fn test_load_body_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let site_root = dir.path().join("site");
        std::fs::create_dir_all(&site_root).unwrap();

        let doc = parse("---\nsource: ../../outside.md\n---\n");
        let err = load_body(&doc, &site_root, dir.path()).unwrap_err();
        assert!(matches!(err, ContentError::SourceOutsideRoot { .. }));
        assert!(err.to_string().contains("docs/install.md"));
    }

    #[test]
    fn test_load_body_missing_source() {
        let dir = TempDir::new().unwrap();
        let site_root = dir.path().join("site");
        std::fs::create_dir_all(&site_root).unwrap();

        let doc = parse("---\nsource: ../missing.md\n---\n");
        let err = load_body(&doc, &site_root, dir.path()).unwrap_err();
        assert!(matches!(err, ContentError::SourceNotFound { .. }));
    }

    #[test]
    fn test_relative_path_preserved() {
        let doc = parse_document(Path::new("docs/faq.md"), "body");
        assert_eq!(doc.relative_path, PathBuf::from("docs/faq.md"));
    }
}
