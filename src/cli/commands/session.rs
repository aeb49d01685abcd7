use clap::{Arg, ArgAction, ArgMatches, Command};
use std::time::Duration;

use crate::cache::DEFAULT_MAX_ENTRIES;

pub const ARG_COOKIE_DOMAIN: &str = "cookie-domain";
pub const ARG_SECURE_COOKIES: &str = "secure-cookies";
pub const ARG_CACHE_MAX_ENTRIES: &str = "cache-max-entries";
pub const ARG_CACHE_SWEEP_INTERVAL: &str = "cache-sweep-interval";

const DEFAULT_SWEEP_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Options {
    pub cookie_domain: Option<String>,
    pub secure_cookies: bool,
    pub cache_max_entries: usize,
    pub sweep_interval: Duration,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            cookie_domain: matches
                .get_one::<String>(ARG_COOKIE_DOMAIN)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
            secure_cookies: matches.get_flag(ARG_SECURE_COOKIES),
            cache_max_entries: matches
                .get_one::<usize>(ARG_CACHE_MAX_ENTRIES)
                .copied()
                .unwrap_or(DEFAULT_MAX_ENTRIES),
            sweep_interval: Duration::from_secs(
                matches
                    .get_one::<u64>(ARG_CACHE_SWEEP_INTERVAL)
                    .copied()
                    .unwrap_or(DEFAULT_SWEEP_SECONDS),
            ),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COOKIE_DOMAIN)
                .long(ARG_COOKIE_DOMAIN)
                .help("Domain attribute for emitted cookies (host-only when unset)")
                .env("VAKT_COOKIE_DOMAIN"),
        )
        .arg(
            Arg::new(ARG_SECURE_COOKIES)
                .long(ARG_SECURE_COOKIES)
                .help("Mark emitted cookies Secure")
                .env("VAKT_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_CACHE_MAX_ENTRIES)
                .long(ARG_CACHE_MAX_ENTRIES)
                .help("Upper bound on cached profiles")
                .default_value("10000")
                .env("VAKT_CACHE_MAX_ENTRIES")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_CACHE_SWEEP_INTERVAL)
                .long(ARG_CACHE_SWEEP_INTERVAL)
                .help("Seconds between sweeps of expired profiles")
                .default_value("60")
                .env("VAKT_CACHE_SWEEP_INTERVAL")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
