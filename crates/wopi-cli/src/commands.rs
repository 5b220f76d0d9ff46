use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use wopi_crypto::AccessTokenSigner;
use wopi_server::{ServerConfig, WopiServer};
use wopi_types::DocumentId;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Token(args) => cmd_token(config, args),
        Command::Url(args) => cmd_url(config, args),
        Command::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.apply_env().context("reading environment overrides")?;
    Ok(config)
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.files_dir {
        config.files_dir = Some(dir);
    }
    if let Some(base) = args.public_base {
        config.public_base = base;
    }
    config.auth.allow_all |= args.allow_all;
    config.admin_api |= args.admin_api;

    let store = match &config.files_dir {
        Some(dir) => dir.display().to_string(),
        None => "memory".to_string(),
    };
    println!("{} WOPI host on {}", "✓".green().bold(), config.bind_addr.to_string().bold());
    println!("  Public base: {}", config.public_base.cyan());
    println!("  Documents: {}", store.yellow());
    if config.admin_enabled() {
        println!("  {} unauthenticated /api endpoints mounted", "!".yellow().bold());
    }

    let server = WopiServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn signer(config: &ServerConfig, secret: Option<String>) -> anyhow::Result<AccessTokenSigner> {
    let Some(secret) = secret.or_else(|| config.auth.secret.clone()) else {
        bail!("no access-token secret: pass --secret, set WOPI_SECRET, or set auth.secret in the config");
    };
    Ok(AccessTokenSigner::new(secret)?)
}

fn cmd_token(config: ServerConfig, args: TokenArgs) -> anyhow::Result<()> {
    let id = DocumentId::new(args.file_id)?;
    let user = args.user.unwrap_or_else(|| config.auth.user_id.clone());
    let token = signer(&config, args.secret)?.issue(&id, &user);
    println!("{token}");
    Ok(())
}

fn cmd_url(config: ServerConfig, args: UrlArgs) -> anyhow::Result<()> {
    let id = DocumentId::new(args.file_id)?;
    let token = signer(&config, args.secret)?.issue(&id, &config.auth.user_id);
    println!("{} {}", "WOPISrc:".bold(), config.wopi_src(&id)?);
    println!("{} {}", "Token:".bold(), token.dimmed());
    println!("{} {}", "Edit URL:".bold(), config.editor_launch_url(&id, &token)?.to_string().cyan());
    Ok(())
}

fn cmd_config(config: &ServerConfig) -> anyhow::Result<()> {
    println!("{}", "Effective configuration".bold());
    println!("  bind_addr: {}", config.bind_addr);
    println!("  public_base: {}", config.public_base);
    match &config.files_dir {
        Some(dir) => println!("  files_dir: {}", dir.display()),
        None => println!("  files_dir: {}", "(in memory)".dimmed()),
    }
    println!("  sample_document: {}", config.sample_document.as_deref().unwrap_or("(none)"));
    println!("  editor_url: {}", config.editor_url);
    println!(
        "  auth: user {} / secret {}",
        config.auth.user_id.yellow(),
        if config.auth.secret.is_some() { "set".green() } else { "generated at start-up".red() }
    );
    if config.auth.allow_all {
        println!("  {} access-token checks disabled", "!".red().bold());
    }
    println!("  admin_api: {}", config.admin_enabled());
    if config.locks.exact {
        println!("  locks: exact token match");
    } else {
        println!("  locks: identity fields {}", config.locks.identity_fields.join(", "));
    }
    Ok(())
}
