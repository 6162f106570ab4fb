//! Stanza - a static site generator for markdown docs sites.

mod build;
mod check;
mod cli;
mod config;
mod content;
mod logger;
mod nav;
mod routes;
mod serve;
mod template;
mod watch;

use anyhow::Result;
use build::build_site;
use check::{check_site, report};
use clap::Parser;
use cli::{Cli, Commands, resolve_port};
use config::SitePaths;
use serve::serve_site;
use watch::watch_for_changes_blocking;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = SitePaths::from_cli(&cli);

    match &cli.command {
        Commands::Build => build_site(&paths).map(|_| ()),
        Commands::Serve { serve_args } => {
            serve_site(&paths.output, resolve_port(serve_args.port, 5000))
        }
        Commands::Dev { serve_args } => {
            build_site(&paths)?;

            let watch_paths = paths.clone();
            std::thread::spawn(move || {
                if let Err(err) = watch_for_changes_blocking(&watch_paths) {
                    crate::log!("watch"; "{err}");
                }
            });

            serve_site(&paths.output, resolve_port(serve_args.port, 3000))
        }
        Commands::Check => {
            let issues = check_site(&paths.output)?;
            report(&issues);
            if issues.is_empty() {
                Ok(())
            } else {
                std::process::exit(1);
            }
        }
    }
}
