//! Post-build output validation.
//!
//! Walks the generated output tree independently of any build state and
//! verifies three invariants: the fixed set of required pages exists, core
//! pages carry both call-to-action markers, and every internal anchor
//! resolves to a file on disk. Issues are accumulated across all passes;
//! the run always reports everything it found, never just the first hit.
//!
//! Link resolution re-derives each page's route from its output path and
//! resolves hrefs with standard relative-URL resolution, using the same
//! route ↔ path rules as the builder. The two must agree exactly or this
//! module produces false positives.

use crate::{log, routes::route_from_output_path};
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};
use url::Url;
use walkdir::WalkDir;

/// Output-relative paths that must exist after every build.
const REQUIRED_PAGES: &[&str] = &[
    "index.html",
    "docs/index.html",
    "docs/install/index.html",
    "docs/quickstart/index.html",
    "docs/commands/index.html",
    "docs/workflow/index.html",
    "docs/faq/index.html",
    "codex-power-user/index.html",
    "404.html",
    "go/install/index.html",
    "go/github/index.html",
];

/// Pages that must carry both call-to-action markers.
const CORE_PAGES: &[&str] = &[
    "index.html",
    "docs/index.html",
    "docs/install/index.html",
    "docs/quickstart/index.html",
    "docs/commands/index.html",
    "docs/workflow/index.html",
    "docs/faq/index.html",
    "codex-power-user/index.html",
];

/// Which call-to-action marker a page is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtaKind {
    Primary,
    Secondary,
}

impl fmt::Display for CtaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtaKind::Primary => write!(f, "primary"),
            CtaKind::Secondary => write!(f, "secondary"),
        }
    }
}

/// One validation finding. Collected, never thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The output directory itself is absent.
    MissingOutput { path: PathBuf },
    /// A required page is absent from the output tree.
    MissingPage { page: String },
    /// A core page lacks a call-to-action marker.
    MissingCta { page: String, kind: CtaKind },
    /// An internal anchor points at a file that does not exist.
    BrokenLink { page: String, href: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingOutput { path } => {
                write!(f, "Output not found: {} (run a build first)", path.display())
            }
            ValidationIssue::MissingPage { page } => {
                write!(f, "Missing required page: {page}")
            }
            ValidationIssue::MissingCta { page, kind } => {
                write!(f, "Missing {kind} CTA in {page}")
            }
            ValidationIssue::BrokenLink { page, href } => {
                write!(f, "Broken internal link: {href} referenced from {page}")
            }
        }
    }
}

static ANCHOR_HREF: OnceLock<Regex> = OnceLock::new();
static CTA_PRIMARY: OnceLock<Regex> = OnceLock::new();
static CTA_SECONDARY: OnceLock<Regex> = OnceLock::new();

fn anchor_href() -> &'static Regex {
    ANCHOR_HREF.get_or_init(|| {
        Regex::new(r#"<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
    })
}

fn cta_marker(kind: CtaKind) -> &'static Regex {
    let (slot, pattern) = match kind {
        CtaKind::Primary => (&CTA_PRIMARY, r#"data-cta\s*=\s*["']primary["']"#),
        CtaKind::Secondary => (&CTA_SECONDARY, r#"data-cta\s*=\s*["']secondary["']"#),
    };
    slot.get_or_init(|| Regex::new(pattern).unwrap())
}

/// Print the outcome of a validator run: a pass message, or every issue
/// found as a bulleted list.
pub fn report(issues: &[ValidationIssue]) {
    if issues.is_empty() {
        log!("check"; "all checks passed");
        return;
    }
    log!("error"; "validation failed with {} issue(s):", issues.len());
    for issue in issues {
        eprintln!("- {issue}");
    }
}

/// Run all validation passes over a built output directory.
pub fn check_site(out_dir: &Path) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if !out_dir.is_dir() {
        issues.push(ValidationIssue::MissingOutput {
            path: out_dir.to_path_buf(),
        });
        return Ok(issues);
    }

    check_required_pages(out_dir, &mut issues);
    check_cta_markers(out_dir, &mut issues)?;
    check_links(out_dir, &mut issues)?;

    Ok(issues)
}

fn check_required_pages(out_dir: &Path, issues: &mut Vec<ValidationIssue>) {
    for page in REQUIRED_PAGES {
        if !out_dir.join(page).is_file() {
            issues.push(ValidationIssue::MissingPage {
                page: (*page).to_owned(),
            });
        }
    }
}

fn check_cta_markers(out_dir: &Path, issues: &mut Vec<ValidationIssue>) -> Result<()> {
    for page in CORE_PAGES {
        let path = out_dir.join(page);
        if !path.is_file() {
            // absence already reported by the required-pages pass
            continue;
        }
        let html = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for kind in [CtaKind::Primary, CtaKind::Secondary] {
            if !cta_marker(kind).is_match(&html) {
                issues.push(ValidationIssue::MissingCta {
                    page: (*page).to_owned(),
                    kind,
                });
            }
        }
    }
    Ok(())
}

fn check_links(out_dir: &Path, issues: &mut Vec<ValidationIssue>) -> Result<()> {
    for file in collect_html_files(out_dir)? {
        let html = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let page_route = route_from_output_path(&file, out_dir);
        let page = page_route.trim_start_matches('/').to_owned();
        let page = if page.is_empty() { "index.html".to_owned() } else { page };

        for caps in anchor_href().captures_iter(&html) {
            let href = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            if href.is_empty() || href == "#" || is_external_href(href) {
                continue;
            }
            let Some(target) = resolve_internal_link(href, &page_route, out_dir) else {
                // malformed href: treated as a non-link, not reported
                continue;
            };
            if !target.is_file() {
                issues.push(ValidationIssue::BrokenLink {
                    page: page.clone(),
                    href: href.to_owned(),
                });
            }
        }
    }
    Ok(())
}

fn is_external_href(href: &str) -> bool {
    href.starts_with("http://")
        || href.starts_with("https://")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
}

/// Resolve an internal href against the page's route and map the result to
/// the output file it must correspond to. Returns `None` for hrefs that do
/// not parse as relative URLs.
fn resolve_internal_link(href: &str, page_route: &str, out_dir: &Path) -> Option<PathBuf> {
    let base = Url::parse(&format!("http://local{page_route}")).ok()?;
    let resolved = base.join(href).ok()?;
    let pathname = resolved.path();
    if pathname.is_empty() {
        return None;
    }

    if pathname == "/" {
        return Some(out_dir.join("index.html"));
    }
    let cleaned = pathname.trim_matches('/');
    if Path::new(pathname).extension().is_some() {
        return Some(out_dir.join(cleaned));
    }
    Some(out_dir.join(cleaned).join("index.html"))
}

/// All `.html` files under the output tree, sorted for stable reports.
fn collect_html_files(out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(out_dir).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to walk output {}", out_dir.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "html")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CTA_BLOCK: &str = r#"<a data-cta="primary" href="/go/install/">Install</a>
<a data-cta="secondary" href="/docs/">Docs</a>"#;

    fn write_page(out: &Path, rel: &str, body: &str) {
        let path = out.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("<html><body>{body}</body></html>")).unwrap();
    }

    /// A complete output tree that passes every check.
    fn scaffold_valid(out: &Path) {
        for page in CORE_PAGES {
            write_page(out, page, CTA_BLOCK);
        }
        write_page(out, "404.html", "<p>Not found</p>");
        write_page(out, "go/install/index.html", "<p>Redirecting</p>");
        write_page(out, "go/github/index.html", "<p>Redirecting</p>");
    }

    #[test]
    fn test_valid_output_has_no_issues() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        assert_eq!(check_site(dir.path()).unwrap(), vec![]);
    }

    #[test]
    fn test_missing_output_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("dist");
        let issues = check_site(&missing).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], ValidationIssue::MissingOutput { .. }));
    }

    #[test]
    fn test_missing_required_page_reported() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        fs::remove_file(dir.path().join("404.html")).unwrap();

        let issues = check_site(dir.path()).unwrap();
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingPage {
                page: "404.html".into()
            }]
        );
    }

    #[test]
    fn test_missing_primary_cta_reported_alone() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        write_page(
            dir.path(),
            "index.html",
            r#"<a data-cta="secondary" href="/docs/">Docs</a>"#,
        );

        let issues = check_site(dir.path()).unwrap();
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingCta {
                page: "index.html".into(),
                kind: CtaKind::Primary,
            }]
        );
    }

    #[test]
    fn test_relative_link_resolution_against_page_route() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        // page /docs/quickstart/ links to ../install/ which exists
        write_page(
            dir.path(),
            "docs/quickstart/index.html",
            &format!(r#"{CTA_BLOCK}<a href="../install/">Install</a>"#),
        );
        assert_eq!(check_site(dir.path()).unwrap(), vec![]);
    }

    #[test]
    fn test_broken_relative_link_reported_once() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        write_page(
            dir.path(),
            "docs/quickstart/index.html",
            &format!(r#"{CTA_BLOCK}<a href="../install/">Install</a>"#),
        );
        fs::remove_file(dir.path().join("docs/install/index.html")).unwrap();

        let issues = check_site(dir.path()).unwrap();
        let broken: Vec<_> = issues
            .iter()
            .filter(|issue| matches!(issue, ValidationIssue::BrokenLink { .. }))
            .collect();
        assert_eq!(
            broken,
            vec![&ValidationIssue::BrokenLink {
                page: "docs/quickstart/".into(),
                href: "../install/".into(),
            }]
        );
        // the missing file also trips the required-pages pass
        assert!(issues.contains(&ValidationIssue::MissingPage {
            page: "docs/install/index.html".into()
        }));
    }

    #[test]
    fn test_external_and_pseudo_links_skipped() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        write_page(
            dir.path(),
            "docs/faq/index.html",
            &format!(
                r##"{CTA_BLOCK}
<a href="https://github.com/x/y">gh</a>
<a href="http://example.com/">ex</a>
<a href="mailto:a@b.c">mail</a>
<a href="tel:+123">tel</a>
<a href="javascript:void(0)">js</a>
<a href="#">top</a>
<a href="#section">anchor</a>"##
            ),
        );
        assert_eq!(check_site(dir.path()).unwrap(), vec![]);
    }

    #[test]
    fn test_asset_link_resolved_by_extension() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        write_page(
            dir.path(),
            "docs/index.html",
            &format!(r#"{CTA_BLOCK}<a href="/assets/cheatsheet.pdf">pdf</a>"#),
        );

        let issues = check_site(dir.path()).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(matches!(&issues[0], ValidationIssue::BrokenLink { href, .. } if href == "/assets/cheatsheet.pdf"));

        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/cheatsheet.pdf"), b"%PDF").unwrap();
        assert_eq!(check_site(dir.path()).unwrap(), vec![]);
    }

    #[test]
    fn test_absolute_internal_link() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        write_page(
            dir.path(),
            "docs/workflow/index.html",
            &format!(r#"{CTA_BLOCK}<a href="/docs/commands/">commands</a><a href="/">home</a>"#),
        );
        assert_eq!(check_site(dir.path()).unwrap(), vec![]);
    }

    #[test]
    fn test_all_issues_collected_in_one_run() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        fs::remove_file(dir.path().join("404.html")).unwrap();
        write_page(dir.path(), "docs/faq/index.html", "no markers, no links");

        let issues = check_site(dir.path()).unwrap();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_single_quoted_href_extracted() {
        let dir = TempDir::new().unwrap();
        scaffold_valid(dir.path());
        write_page(
            dir.path(),
            "docs/commands/index.html",
            &format!(r#"{CTA_BLOCK}<a class="x" href='/missing/'>m</a>"#),
        );

        let issues = check_site(dir.path()).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(matches!(&issues[0], ValidationIssue::BrokenLink { href, .. } if href == "/missing/"));
    }
}
