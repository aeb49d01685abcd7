use anyhow::{Result, bail};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_ACCESS_KEY_PATH: &str = "access-key-path";
pub const ARG_REFRESH_KEY_PATH: &str = "refresh-key-path";

/// Paths to the JSON key documents published by the API.
#[derive(Debug, Clone)]
pub struct Options {
    pub access: PathBuf,
    pub refresh: PathBuf,
}

impl Options {
    /// # Errors
    /// Returns an error if either path is missing or empty.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let path = |id: &str| -> Result<PathBuf> {
            match matches.get_one::<String>(id) {
                Some(value) if !value.trim().is_empty() => Ok(PathBuf::from(value.trim())),
                _ => bail!("missing required argument: --{id}"),
            }
        };

        Ok(Self {
            access: path(ARG_ACCESS_KEY_PATH)?,
            refresh: path(ARG_REFRESH_KEY_PATH)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_KEY_PATH)
                .long(ARG_ACCESS_KEY_PATH)
                .help("Access token public key document (JSON)")
                .long_help(
                    "Access token public key document: JSON with `created`, `pubkey` (PEM) and `signature`.\n\nOnly `pubkey` is used; it verifies the ES384 access token handed out at login.",
                )
                .env("VAKT_ACCESS_KEY_PATH")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_KEY_PATH)
                .long(ARG_REFRESH_KEY_PATH)
                .help("Refresh token public key document (JSON)")
                .env("VAKT_REFRESH_KEY_PATH")
                .required(true),
        )
}
