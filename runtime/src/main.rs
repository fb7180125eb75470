// Copyright 2026 SiteDigest Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use sitedigest_runtime::cli;

#[derive(Parser)]
#[command(
    name = "sitedigest",
    about = "SiteDigest: condense a website into a ranked corpus with pricing facts",
    version,
    after_help = "Run 'sitedigest <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crawler service (POST /crawl, GET /health)
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value = "8787")]
        port: u16,
        /// Internal pages per crawl when the request does not say
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Render a site with the local browser and print the raw pages as JSON
    Crawl {
        /// Root URL of the site
        url: String,
        /// Maximum number of internal pages to render
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Crawl, rank, extract prices, summarize and store a site digest
    Digest {
        /// Root URL of the site
        url: String,
        /// Session id to store the digest under (random when omitted)
        #[arg(long)]
        session: Option<String>,
        /// Crawl with the local browser instead of the crawler service
        #[arg(long)]
        local: bool,
        /// Maximum number of internal pages to render
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if !matches!(args.command, Commands::Completions { .. }) {
        cli::logging::init(args.verbose, args.log_json)?;
    }

    let result = match args.command {
        Commands::Serve {
            host,
            port,
            max_pages,
        } => cli::serve::run(&host, port, max_pages).await,
        Commands::Crawl { url, max_pages } => cli::crawl_cmd::run(&url, max_pages).await,
        Commands::Digest {
            url,
            session,
            local,
            max_pages,
        } => cli::digest_cmd::run(&url, session, local, max_pages).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sitedigest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
