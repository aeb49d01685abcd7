use crate::{
    cli::commands::{keys, session, upstream},
    gateway::{self, GatewayConfig, GatewayState},
    token::KeySet,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream: upstream::Options,
    pub keys: keys::Options,
    pub session: session::Options,
}

impl Args {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(
            self.upstream.public_api_url.clone(),
            self.upstream.internal_api_url.clone(),
        )
        .with_upstream_timeout(self.upstream.timeout)
        .with_cookie_domain(self.session.cookie_domain.clone())
        .with_secure_cookies(self.session.secure_cookies)
        .with_cache_max_entries(self.session.cache_max_entries)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the keys cannot be loaded, the upstream client cannot be
/// built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let keys = KeySet::load(&args.keys.access, &args.keys.refresh)
        .context("could not load token verification keys")?;

    let config = args.gateway_config();

    let state = GatewayState::with_http_upstream(keys, &config)
        .context("could not build upstream client")?;

    gateway::new(args.port, Arc::new(state), args.session.sweep_interval).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("public_api_url", args.upstream.public_api_url.to_string()),
        ("internal_api_url", args.upstream.internal_api_url.to_string()),
        ("upstream_timeout", format!("{}s", args.upstream.timeout.as_secs())),
        ("access_key", args.keys.access.display().to_string()),
        ("refresh_key", args.keys.refresh.display().to_string()),
        (
            "cookie_domain",
            args.session
                .cookie_domain
                .clone()
                .unwrap_or_else(|| "host-only".to_string()),
        ),
        ("secure_cookies", args.session.secure_cookies.to_string()),
        ("cache_max_entries", args.session.cache_max_entries.to_string()),
        (
            "cache_sweep_interval",
            format!("{}s", args.session.sweep_interval.as_secs()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "vakt {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
