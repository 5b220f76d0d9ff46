use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wopi", about = "WOPI host for browser-based document editors", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML config file. `PORT`, `PUBLIC_BASE`, `WOPI_SECRET`,
    /// `WOPI_FILES_DIR` and `WOPI_ADMIN_API` override it.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the WOPI host
    Serve(ServeArgs),
    /// Issue an access token for a document
    Token(TokenArgs),
    /// Print the editor launch URL for a document
    Url(UrlArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Serve documents from this directory instead of memory
    #[arg(long)]
    pub files_dir: Option<PathBuf>,
    #[arg(long)]
    pub public_base: Option<String>,
    /// Disable access-token checks
    #[arg(long)]
    pub allow_all: bool,
    /// Mount the unauthenticated /api/* endpoints
    #[arg(long)]
    pub admin_api: bool,
}

#[derive(Args)]
pub struct TokenArgs {
    pub file_id: String,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub secret: Option<String>,
}

#[derive(Args)]
pub struct UrlArgs {
    pub file_id: String,
    #[arg(long)]
    pub secret: Option<String>,
}
