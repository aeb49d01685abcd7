pub mod keys;
pub mod logging;
pub mod session;
pub mod upstream;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("vakt")
        .about("Session and authentication gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("VAKT_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = upstream::with_args(command);
    let command = keys::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_ARGS: [&str; 5] = [
        "vakt",
        "--access-key-path",
        "/etc/vakt/access.json",
        "--refresh-key-path",
        "/etc/vakt/refresh.json",
    ];

    fn with_cleared_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        temp_env::with_vars(
            [
                ("VAKT_PORT", None::<&str>),
                ("VAKT_LOG_LEVEL", None),
                ("VAKT_ACCESS_KEY_PATH", None),
                ("VAKT_REFRESH_KEY_PATH", None),
                ("VAKT_COOKIE_DOMAIN", None),
                ("VAKT_SECURE_COOKIES", None),
                ("VAKT_CACHE_MAX_ENTRIES", None),
                ("VAKT_CACHE_SWEEP_INTERVAL", None),
            ],
            f,
        )
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "vakt");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Session and authentication gateway".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_key_paths_required() {
        with_cleared_env(|| {
            let result = new().try_get_matches_from(["vakt"]);
            assert_eq!(
                result.map_err(|e| e.kind()).err(),
                Some(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }

    #[test]
    fn test_defaults() -> Result<(), clap::Error> {
        with_cleared_env(|| {
            let matches = new().try_get_matches_from(KEY_ARGS)?;
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));
            let options = session::Options::parse(&matches);
            assert_eq!(options.cookie_domain, None);
            assert!(!options.secure_cookies);
            assert_eq!(options.cache_max_entries, 10_000);
            assert_eq!(options.sweep_interval.as_secs(), 60);
            Ok(())
        })
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("VAKT_PORT", Some("443")),
                ("VAKT_ACCESS_KEY_PATH", Some("/keys/access.json")),
                ("VAKT_REFRESH_KEY_PATH", Some("/keys/refresh.json")),
                ("VAKT_COOKIE_DOMAIN", Some(".bjorn.lan")),
                ("VAKT_SECURE_COOKIES", Some("true")),
                ("VAKT_CACHE_MAX_ENTRIES", Some("64")),
                ("VAKT_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["vakt"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
                let options = session::Options::parse(&matches);
                assert_eq!(options.cookie_domain.as_deref(), Some(".bjorn.lan"));
                assert!(options.secure_cookies);
                assert_eq!(options.cache_max_entries, 64);
                let keys = keys::Options::parse(&matches).ok().map(|k| k.access);
                assert_eq!(keys, Some("/keys/access.json".into()));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("VAKT_LOG_LEVEL", Some(level)),
                    ("VAKT_ACCESS_KEY_PATH", Some("/keys/access.json")),
                    ("VAKT_REFRESH_KEY_PATH", Some("/keys/refresh.json")),
                ],
                || {
                    let matches = new().get_matches_from(vec!["vakt"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5 {
            with_cleared_env(|| {
                let mut args: Vec<String> = KEY_ARGS.iter().map(ToString::to_string).collect();
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
