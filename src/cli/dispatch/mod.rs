use crate::cli::{
    actions::{Action, server::Args},
    commands::{ARG_PORT, keys, session, upstream},
};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    Ok(Action::Server(Args {
        port,
        upstream: upstream::Options::parse(matches)?,
        keys: keys::Options::parse(matches)?,
        session: session::Options::parse(matches),
    }))
}
