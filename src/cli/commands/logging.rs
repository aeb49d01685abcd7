use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// `VAKT_LOG_LEVEL` takes a level name (any case) or its index in [`LEVELS`].
#[must_use]
pub fn level_parser() -> ValueParser {
    ValueParser::from(|raw: &str| -> Result<u8, String> {
        let raw = raw.trim();
        raw.parse::<usize>()
            .ok()
            .filter(|index| *index < LEVELS.len())
            .or_else(|| LEVELS.iter().position(|level| level.eq_ignore_ascii_case(raw)))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("unknown log level {raw:?}, expected one of {}", LEVELS.join("|")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Raise gateway log output; repeat for more (-v warn .. -vvvv trace)")
            .long_help(
                "Raise gateway log output. Without the flag only errors are logged, \
                 each repetition moves one step through error, warn, info, debug and trace.\n\n\
                 VAKT_LOG_LEVEL sets the same level by name or number. RUST_LOG directives \
                 still refine individual targets.",
            )
            .env("VAKT_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(level_parser()),
    )
}
