//! Site configuration management.
//!
//! Handles loading, parsing, and resolving the `site.config.json`
//! configuration file. The parsed config is resolved once per build
//! (environment overrides applied) and threaded by reference through
//! every downstream call.

use crate::cli::Cli;
use anyhow::Result;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Environment variables that may carry the analytics token, in priority order.
const ANALYTICS_ENV_VARS: &[&str] = &["CF_ANALYTICS_TOKEN", "CLOUDFLARE_ANALYTICS_TOKEN"];

/// Placeholder emitted when no analytics token is configured anywhere.
/// Deploy pipelines substitute the real token at publish time.
const ANALYTICS_TOKEN_PLACEHOLDER: &str = "__CF_ANALYTICS_TOKEN__";

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Json(#[from] serde_json::Error),
}

/// `site` section in site.config.json
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    /// Site name, used as the title fallback and suffix
    pub name: String,

    /// Default meta description
    pub description: String,

    /// Short tagline rendered by the layout
    pub tagline: String,

    /// Absolute base URL, e.g. "https://example.com" (no trailing slash)
    pub base_url: String,
}

/// A single navigation entry
#[derive(Debug, Clone, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// A call-to-action link
#[derive(Debug, Clone, Deserialize)]
pub struct Cta {
    pub label: String,
    pub href: String,
}

/// `ctas` section in site.config.json
#[derive(Debug, Clone, Deserialize)]
pub struct Ctas {
    pub primary: Cta,
    pub secondary: Cta,
}

/// `analytics` section in site.config.json
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsConfig {
    /// Cloudflare Web Analytics token; overridable via environment
    pub cloudflare_token: Option<String>,
}

/// Root configuration structure representing site.config.json
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Basic site information
    pub site: SiteInfo,

    /// Ordered navigation entries (render order is significant)
    pub nav: Vec<NavLink>,

    /// Primary and secondary call-to-action links
    pub ctas: Ctas,

    /// Analytics settings
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Analytics token after environment resolution; filled by [`SiteConfig::resolve_env`]
    #[serde(skip)]
    pub analytics_token: String,
}

impl SiteConfig {
    /// Parse configuration from a JSON string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from a file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load and fully resolve configuration for one build invocation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_path(path)?;
        config.resolve_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides with an explicit precedence order:
    /// `CF_ANALYTICS_TOKEN` > `CLOUDFLARE_ANALYTICS_TOKEN` > config file value
    /// > literal placeholder.
    pub fn resolve_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let env_token = ANALYTICS_ENV_VARS
            .iter()
            .filter_map(|name| env(name))
            .find(|value| !value.is_empty());

        self.analytics_token = env_token
            .or_else(|| {
                self.analytics
                    .cloudflare_token
                    .clone()
                    .filter(|value| !value.is_empty())
            })
            .unwrap_or_else(|| ANALYTICS_TOKEN_PLACEHOLDER.to_owned());
    }
}

/// Filesystem layout of one site project, derived from CLI arguments.
///
/// Content, template and asset directories live under the site root with
/// fixed names; only the output directory is configurable.
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub content: PathBuf,
    pub templates: PathBuf,
    pub assets: PathBuf,
    pub output: PathBuf,
}

impl SitePaths {
    pub fn from_cli(cli: &Cli) -> Self {
        let root = cli.root.clone();
        Self {
            config_path: root.join(&cli.config),
            content: root.join("content"),
            templates: root.join("templates"),
            assets: root.join("assets"),
            output: root.join(&cli.output),
            root,
        }
    }
}

#[test]
fn test_parse_full_config() {
    let config = r#"{
        "site": {
            "name": "Loopr",
            "description": "Run agents in a loop",
            "tagline": "ship while you sleep",
            "baseUrl": "https://example.com"
        },
        "nav": [
            { "label": "Home", "href": "/" },
            { "label": "Docs", "href": "/docs/" }
        ],
        "ctas": {
            "primary": { "label": "Install", "href": "/go/install/" },
            "secondary": { "label": "Docs", "href": "/docs/" }
        },
        "analytics": { "cloudflareToken": "abc123" }
    }"#;
    let config = SiteConfig::from_str(config).unwrap();

    assert_eq!(config.site.name, "Loopr");
    assert_eq!(config.site.base_url, "https://example.com");
    assert_eq!(config.nav.len(), 2);
    assert_eq!(config.nav[1].href, "/docs/");
    assert_eq!(config.ctas.primary.label, "Install");
    assert_eq!(config.analytics.cloudflare_token.as_deref(), Some("abc123"));
}

#[test]
fn test_missing_required_field_is_an_error() {
    // `site.baseUrl` missing
    let config = r#"{
        "site": { "name": "X", "description": "d", "tagline": "t" },
        "nav": [],
        "ctas": {
            "primary": { "label": "Install", "href": "/go/install/" },
            "secondary": { "label": "Docs", "href": "/docs/" }
        }
    }"#;
    assert!(SiteConfig::from_str(config).is_err());
}

#[test]
fn test_analytics_section_optional() {
    let config = r#"{
        "site": { "name": "X", "description": "d", "tagline": "t", "baseUrl": "https://x.dev" },
        "nav": [],
        "ctas": {
            "primary": { "label": "Install", "href": "/go/install/" },
            "secondary": { "label": "Docs", "href": "/docs/" }
        }
    }"#;
    let config = SiteConfig::from_str(config).unwrap();
    assert!(config.analytics.cloudflare_token.is_none());
}

#[test]
fn test_malformed_json_is_an_error() {
    assert!(SiteConfig::from_str("{ not json").is_err());
}

#[cfg(test)]
fn minimal_config() -> SiteConfig {
    SiteConfig::from_str(
        r#"{
        "site": { "name": "X", "description": "d", "tagline": "t", "baseUrl": "https://x.dev" },
        "nav": [],
        "ctas": {
            "primary": { "label": "Install", "href": "/go/install/" },
            "secondary": { "label": "Docs", "href": "/docs/" }
        },
        "analytics": { "cloudflareToken": "from-file" }
    }"#,
    )
    .unwrap()
}

#[test]
fn test_token_env_priority_order() {
    let mut config = minimal_config();
    config.resolve_env(|name| match name {
        "CF_ANALYTICS_TOKEN" => Some("primary-env".into()),
        "CLOUDFLARE_ANALYTICS_TOKEN" => Some("secondary-env".into()),
        _ => None,
    });
    assert_eq!(config.analytics_token, "primary-env");
}

#[test]
fn test_token_secondary_env_fallback() {
    let mut config = minimal_config();
    config.resolve_env(|name| match name {
        "CLOUDFLARE_ANALYTICS_TOKEN" => Some("secondary-env".into()),
        _ => None,
    });
    assert_eq!(config.analytics_token, "secondary-env");
}

#[test]
fn test_token_file_fallback() {
    let mut config = minimal_config();
    config.resolve_env(|_| None);
    assert_eq!(config.analytics_token, "from-file");
}

#[test]
fn test_token_placeholder_fallback() {
    let mut config = minimal_config();
    config.analytics.cloudflare_token = None;
    config.resolve_env(|_| None);
    assert_eq!(config.analytics_token, "__CF_ANALYTICS_TOKEN__");
}

#[test]
fn test_empty_env_value_is_skipped() {
    let mut config = minimal_config();
    config.resolve_env(|name| match name {
        "CF_ANALYTICS_TOKEN" => Some(String::new()),
        _ => None,
    });
    assert_eq!(config.analytics_token, "from-file");
}
