//! Start command - runs the relay server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use agora_auth::{CookiePolicy, Upstream, UpstreamConfig};
use agora_config::AgoraConfig;
use agora_server::{Server, ServerConfig};
use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Upstream API base URL (overrides config)
    #[arg(long)]
    pub upstream: Option<String>,

    /// Mark credential cookies `Secure`
    #[arg(long)]
    pub production: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = agora_config::load_config_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            agora_config::apply_env_overrides(&mut config)?;
            config
        }
        None => agora_config::load_config(None)?.config,
    };

    if let Some(url) = &args.upstream {
        config.upstream.url = url.clone();
    }
    if args.production {
        config.cookies.production = true;
    }
    config.validate()?;

    let bind_address = resolve_bind_address(&config.server.bind, args.bind.as_deref(), args.port)?;

    if ctx.verbose {
        println!("Upstream: {}", config.upstream.url);
        println!(
            "Cookies:  {}{}",
            if config.cookies.production { "secure" } else { "insecure (development)" },
            config
                .cookies
                .domain
                .as_deref()
                .map(|d| format!(", domain {}", d))
                .unwrap_or_default()
        );
    }

    let upstream = Upstream::new(upstream_config(&config))?;
    let server = Server::new(
        upstream,
        cookie_policy(&config),
        server_config(&config, bind_address),
    );

    println!("Agora relay listening on http://{}", bind_address);
    tracing::info!(
        addr = %bind_address,
        upstream = %config.upstream.url,
        production = config.cookies.production,
        "Starting relay"
    );

    server.run_with_shutdown(bind_address, shutdown_signal()).await?;
    Ok(())
}

/// Combine the configured bind address with `--bind` / `--port`.
fn resolve_bind_address(
    configured: &str,
    bind: Option<&str>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    let mut addr: SocketAddr = bind
        .unwrap_or(configured)
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", bind.unwrap_or(configured)))?;
    if let Some(port) = port {
        addr.set_port(port);
    }
    Ok(addr)
}

fn upstream_config(config: &AgoraConfig) -> UpstreamConfig {
    let upstream = &config.upstream;
    UpstreamConfig {
        base_url: upstream.url.clone(),
        chat_path: upstream.chat_path.clone(),
        chat_stream_path: upstream.chat_stream_path.clone(),
        refresh_path: upstream.refresh_path.clone(),
        oauth_callback_path: upstream.oauth_callback_path.clone(),
        login_path: upstream.login_path.clone(),
        logout_path: upstream.logout_path.clone(),
        apple_native_path: upstream.apple_native_path.clone(),
        kakao_native_path: upstream.kakao_native_path.clone(),
        renewal_cookie_name: upstream.renewal_cookie_name.clone(),
        connect_timeout: Duration::from_secs(upstream.connect_timeout_secs),
        request_timeout: Duration::from_secs(upstream.request_timeout_secs),
        stream_idle_timeout: Duration::from_secs(upstream.stream_idle_timeout_secs),
    }
}

fn cookie_policy(config: &AgoraConfig) -> CookiePolicy {
    let cookies = &config.cookies;
    CookiePolicy {
        session_cookie: cookies.session_name.clone(),
        renewal_cookie: cookies.renewal_name.clone(),
        secure: cookies.production,
        domain: cookies.domain.clone(),
        session_max_age_days: cookies.session_max_age_days,
        renewal_max_age_days: cookies.renewal_max_age_days,
    }
}

fn server_config(config: &AgoraConfig, bind_address: SocketAddr) -> ServerConfig {
    ServerConfig::new()
        .with_bind_address(bind_address)
        .with_request_logging(config.server.request_logging)
        .with_cors_origins(config.server.cors_origins.clone())
        .with_max_body_size(config.server.max_body_size)
        .with_redirects(&config.redirects.login, &config.redirects.home)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    println!("\nShutting down...");
}
