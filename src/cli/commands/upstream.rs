use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;
use url::Url;

pub const ARG_PUBLIC_API_URL: &str = "public-api-url";
pub const ARG_INTERNAL_API_URL: &str = "internal-api-url";
pub const ARG_UPSTREAM_TIMEOUT: &str = "upstream-timeout";

#[derive(Debug, Clone)]
pub struct Options {
    pub public_api_url: Url,
    pub internal_api_url: Url,
    pub timeout: Duration,
}

impl Options {
    /// Parse upstream arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a URL is missing or malformed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = |id: &str| -> Result<Url> {
            let raw = matches
                .get_one::<String>(id)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("missing required argument: --{id}"))?;
            Url::parse(raw.trim()).with_context(|| format!("invalid --{id}: {raw}"))
        };

        let timeout = matches
            .get_one::<u64>(ARG_UPSTREAM_TIMEOUT)
            .copied()
            .unwrap_or(10);

        Ok(Self {
            public_api_url: url(ARG_PUBLIC_API_URL)?,
            internal_api_url: url(ARG_INTERNAL_API_URL)?,
            timeout: Duration::from_secs(timeout),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PUBLIC_API_URL)
                .long(ARG_PUBLIC_API_URL)
                .help("API origin as advertised to browsers")
                .long_help(
                    "API origin as advertised to browsers.\n\nUpstream calls made by the gateway rewrite this prefix to --internal-api-url.",
                )
                .default_value("http://bjorn.lan:8888/")
                .env("VAKT_PUBLIC_API_URL"),
        )
        .arg(
            Arg::new(ARG_INTERNAL_API_URL)
                .long(ARG_INTERNAL_API_URL)
                .help("API origin reachable from the gateway")
                .default_value("http://127.0.0.1:8888/")
                .env("VAKT_INTERNAL_API_URL"),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT)
                .long(ARG_UPSTREAM_TIMEOUT)
                .help("Timeout in seconds for every upstream call")
                .default_value("10")
                .env("VAKT_UPSTREAM_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
