//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stanza static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Site root directory (holds the config file, content/, templates/ and assets/)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Config file name (relative to the site root)
    #[arg(short = 'C', long, default_value = "site.config.json")]
    pub config: PathBuf,

    /// Output directory path (relative to the site root)
    #[arg(short, long, default_value = "dist")]
    pub output: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared serving arguments for Serve and Dev commands
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on (falls back to the PORT environment variable)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile content into the output directory
    Build,

    /// Serve a previously built output directory
    Serve {
        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Build, serve and rebuild on change
    Dev {
        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Validate the built output: required pages, CTA markers, internal links
    Check,
}

/// Resolve the port to bind: CLI flag, then PORT environment variable, then default.
pub fn resolve_port(flag: Option<u16>, default: u16) -> u16 {
    flag.or_else(|| {
        std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
    })
    .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_port_flag_wins() {
        assert_eq!(resolve_port(Some(8080), 5000), 8080);
    }

    #[test]
    fn test_resolve_port_default() {
        // PORT is not set in the test environment
        if std::env::var("PORT").is_err() {
            assert_eq!(resolve_port(None, 5000), 5000);
        }
    }
}
