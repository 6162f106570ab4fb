//! Site building orchestration.
//!
//! One build invocation: load config, read templates, reset the output
//! directory, copy assets, compile every markdown document to its route,
//! and synthesize the social-card fallback image.
//!
//! Documents are processed sequentially in sorted path order. Any failure
//! aborts the whole build: a half-built output tree must never ship, so
//! there is no catch-and-continue.

use crate::{
    config::{SiteConfig, SitePaths},
    content::{ContentDocument, load_body, parse_document, render_markdown},
    log,
    nav::{analytics_snippet, build_footer, build_nav},
    routes::{output_path_from_route, route_from_file},
    template::{Templates, Vars, load_templates, render},
};
use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Fallback social-card image, written when the site ships none of its own
/// so `og:image` URLs never 404 (embedded at compile time).
const OG_FALLBACK_PNG: &[u8] = include_bytes!("embed/og-default.png");

/// Output-relative location of the fallback social-card image.
const OG_FALLBACK_REL: &str = "assets/og-default.png";

const TWITTER_CARD: &str = "summary_large_image";

/// Build the entire site. Returns the number of content files processed.
///
/// Stateless and repeatedly callable; the watch-mode caller is responsible
/// for never overlapping two invocations.
pub fn build_site(paths: &SitePaths) -> Result<usize> {
    let config = SiteConfig::load(&paths.config_path)
        .with_context(|| format!("Failed to load config {}", paths.config_path.display()))?;
    let templates = load_templates(&paths.templates)?;

    prepare_output(&paths.output)?;
    copy_dir(&paths.assets, &paths.output.join("assets"))?;

    let files = collect_markdown_files(&paths.content)?;
    let mut seen_routes: FxHashMap<String, PathBuf> = FxHashMap::default();

    for file in &files {
        let rel = file.strip_prefix(&paths.content)?;
        let raw = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let document = parse_document(rel, &raw);
        let route = route_from_file(rel, document.front_matter.permalink.as_deref());

        if let Some(previous) = seen_routes.insert(route.clone(), rel.to_path_buf()) {
            bail!(
                "Route collision: `{}` is derived from both {} and {}",
                route,
                previous.display(),
                rel.display()
            );
        }

        compile_document(&document, &route, &config, &templates, paths)
            .with_context(|| format!("Failed to build {}", rel.display()))?;
    }

    ensure_og_fallback(&paths.output)?;

    log!("build"; "built {} content files", files.len());
    Ok(files.len())
}

/// Compile one document to its output file: a redirect page when the front
/// matter requests one, a rendered content page otherwise.
fn compile_document(
    document: &ContentDocument,
    route: &str,
    config: &SiteConfig,
    templates: &Templates,
    paths: &SitePaths,
) -> Result<()> {
    let front_matter = &document.front_matter;
    let site = &config.site;

    let page_title = match &front_matter.title {
        Some(title) => format!("{title} | {}", site.name),
        None => site.name.clone(),
    };
    let description = front_matter
        .description
        .clone()
        .unwrap_or_else(|| site.description.clone());
    let og_title = front_matter.og_title.clone().unwrap_or_else(|| page_title.clone());
    let og_description = front_matter
        .og_description
        .clone()
        .unwrap_or_else(|| description.clone());
    let og_image = front_matter
        .og_image
        .clone()
        .unwrap_or_else(|| format!("{}/{}", site.base_url, OG_FALLBACK_REL));
    let og_url = if route == "/" {
        site.base_url.clone()
    } else {
        format!("{}{}", site.base_url, route)
    };

    let mut vars: Vars = FxHashMap::default();
    vars.insert("lang", front_matter.lang.clone().unwrap_or_else(|| "en".into()));
    vars.insert("title", page_title);
    vars.insert("description", description);
    vars.insert("ogTitle", og_title);
    vars.insert("ogDescription", og_description);
    vars.insert("ogImage", og_image);
    vars.insert("ogUrl", og_url);
    vars.insert("twitterCard", TWITTER_CARD.into());
    vars.insert("tagline", site.tagline.clone());
    vars.insert("navItems", build_nav(&config.nav, route));
    vars.insert("footerItems", build_footer(&config.nav, &config.ctas));
    vars.insert("ctaPrimaryLabel", config.ctas.primary.label.clone());
    vars.insert("ctaPrimaryHref", config.ctas.primary.href.clone());
    vars.insert("ctaSecondaryLabel", config.ctas.secondary.label.clone());
    vars.insert("ctaSecondaryHref", config.ctas.secondary.href.clone());
    vars.insert("year", Local::now().year().to_string());
    vars.insert("siteName", site.name.clone());
    vars.insert("bodyClass", front_matter.body_class.clone().unwrap_or_default());
    vars.insert("analyticsSnippet", analytics_snippet(&config.analytics_token));
    vars.insert("extraHead", front_matter.extra_head.clone().unwrap_or_default());

    let output_path = output_path_from_route(route, &paths.output);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    // Redirect pages skip markdown rendering entirely. Their title drops
    // the site-name suffix.
    if let Some(redirect) = &front_matter.redirect {
        let title = front_matter
            .title
            .clone()
            .or_else(|| (!site.name.is_empty()).then(|| site.name.clone()))
            .unwrap_or_else(|| "Redirecting".into());
        vars.insert("title", title);
        vars.insert("redirectUrl", redirect.clone());
        let html = render(&templates.redirect, &vars);
        return fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {}", output_path.display()));
    }

    // External `source` references escape the content tree but must stay
    // inside the directory containing the site root.
    let allowed_root = paths.root.parent().unwrap_or(&paths.root);
    let body = load_body(document, &paths.root, allowed_root)?;
    vars.insert("content", render_markdown(&body));

    let html = render(&templates.layout, &vars);
    fs::write(&output_path, html)
        .with_context(|| format!("Failed to write {}", output_path.display()))
}

/// Clear and recreate the output directory.
fn prepare_output(output: &Path) -> Result<()> {
    if output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clear output directory {}", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))
}

/// Copy a directory tree verbatim. A missing source is fine (a site without
/// static assets is legal).
fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    if !src.exists() {
        return Ok(());
    }
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path)
                .with_context(|| format!("Failed to copy {}", src_path.display()))?;
        }
    }
    Ok(())
}

/// Collect all markdown files under the content root, sorted for
/// deterministic build order.
fn collect_markdown_files(content: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(content).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("Failed to walk content directory {}", content.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "md")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Write the embedded fallback social-card image unless the assets tree
/// already shipped one.
fn ensure_og_fallback(output: &Path) -> Result<()> {
    let path = output.join(OG_FALLBACK_REL);
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, OG_FALLBACK_PNG)
        .with_context(|| format!("Failed to write {}", path.display()))
}
