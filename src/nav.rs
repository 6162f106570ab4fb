//! Navigation and footer rendering.
//!
//! Builds the `navItems` and `footerItems` HTML fragments substituted into
//! the layout template. Nav order follows config order; the footer is a
//! fixed curation, not a generic transform.

use crate::config::{Ctas, NavLink};
use crate::routes::{ensure_trailing_slash, normalize_route};

/// Route of the GitHub redirect page, always third in the footer.
const GITHUB_ROUTE: &str = "/go/github/";

/// Maximum nav entries appended to the footer after the fixed links.
const FOOTER_EXTRA_LINKS: usize = 3;

/// Render the nav link list for a page, marking the active entry.
///
/// A link is active when it is internal and either both it and the current
/// route are `/`, or it is a non-root prefix of the current route (both
/// normalized to trailing-slash form).
pub fn build_nav(nav: &[NavLink], current_route: &str) -> String {
    let current = ensure_trailing_slash(&normalize_route(current_route));
    nav.iter()
        .map(|item| {
            let is_external = item.href.starts_with("http");
            let normalized = ensure_trailing_slash(&normalize_route(&item.href));
            let active = if !is_external
                && ((normalized == "/" && current == "/")
                    || (normalized != "/" && current.starts_with(&normalized)))
            {
                " active"
            } else {
                ""
            };
            format!(
                r#"<li><a class="nav-link{active}" href="{}">{}</a></li>"#,
                item.href, item.label
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the footer link list: Install, Docs and GitHub first, then up to
/// three nav entries that don't duplicate those hrefs, in nav order.
pub fn build_footer(nav: &[NavLink], ctas: &Ctas) -> String {
    let fixed = [
        ("Install", ctas.primary.href.as_str()),
        ("Docs", ctas.secondary.href.as_str()),
        ("GitHub", GITHUB_ROUTE),
    ];
    let extra = nav
        .iter()
        .filter(|item| !fixed.iter().any(|(_, href)| *href == item.href))
        .take(FOOTER_EXTRA_LINKS)
        .map(|item| (item.label.as_str(), item.href.as_str()));

    fixed
        .into_iter()
        .chain(extra)
        .map(|(label, href)| format!(r#"<a href="{href}">{label}</a>"#))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The Cloudflare Web Analytics beacon tag, injected into every page.
pub fn analytics_snippet(token: &str) -> String {
    format!(
        "\n<script defer src=\"https://static.cloudflareinsights.com/beacon.min.js\" data-cf-beacon='{{\"token\":\"{token}\"}}'></script>"
    )
}
