//! # NKO Assistant CLI (`nko`)
//!
//! ## Usage
//!
//! ```bash
//! nko --config ./config/nko.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nko serve http` | HTTP server: `/query`, `/tools`, `/mcp`, `/health` |
//! | `nko serve mcp` | MCP server over stdio |
//! | `nko serve backend --fixture <file>` | Fixture NKO backend |
//! | `nko ask` | Interactive console (or one `--query`) |
//! | `nko tools list` | List the directory tools |
//!
//! Logging is controlled by `RUST_LOG` (`nko_assistant=info` is always
//! on) and goes to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nko_assistant::app::AppContext;
use nko_assistant::tools::{print_tools, ToolRegistry};
use nko_assistant::{config, console, fixture, mcp, server};

/// NKO Assistant: natural-language search over a directory of Russian
/// non-profit organizations.
#[derive(Parser)]
#[command(
    name = "nko",
    about = "NKO Assistant: natural-language search over a directory of non-profit organizations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/nko.toml`. A missing file means built-in
    /// defaults.
    #[arg(long, global = true, default_value = "./config/nko.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },

    /// Ask the assistant from the terminal.
    ///
    /// Without `--query`, reads queries from stdin until `выход`, `exit`,
    /// `quit` or end of input.
    Ask {
        /// Answer this single query and exit.
        #[arg(long)]
        query: Option<String>,
        /// Auth token passed through to the backend.
        #[arg(long)]
        token: Option<String>,
    },

    /// Directory tool subcommands.
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// HTTP server on `[server].bind`.
    Http,
    /// MCP server over stdio.
    Mcp,
    /// Fixture NKO backend serving a JSON file.
    Backend {
        /// Fixture file (`{"cities": [...], "nko": [...], "favorites": {...}}`).
        #[arg(long)]
        fixture: PathBuf,
        /// Listen address.
        #[arg(long, default_value = "127.0.0.1:8001")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List the directory tools.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nko_assistant=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't touch the backend or the provider
    match &cli.command {
        Commands::Tools {
            action: ToolsAction::List,
        } => {
            print_tools(&ToolRegistry::with_builtins());
            return Ok(());
        }
        Commands::Serve {
            service: ServeService::Backend { fixture: path, bind },
        } => {
            let directory = fixture::load_fixture(path)?;
            fixture::run_fixture_backend(bind, directory).await?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;
    let ctx = AppContext::from_config(cfg)?;

    match cli.command {
        Commands::Serve { service } => match service {
            ServeService::Http => {
                ctx.check_backend().await?;
                server::run_server(ctx).await?;
            }
            ServeService::Mcp => {
                ctx.check_backend().await?;
                mcp::run_stdio(&ctx).await?;
            }
            ServeService::Backend { .. } => {
                // Handled above (before config loading)
                unreachable!()
            }
        },
        Commands::Ask { query, token } => {
            console::run_console(ctx, query, token).await?;
        }
        Commands::Tools { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
