use agenda_core::config::ConfigOverrides;
use agenda_core::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer one dialogue platform request
    ///
    /// Reads the request JSON from FILE, or from stdin when no file is given,
    /// and prints the response JSON.
    ///
    /// Example: agenda handle --request turn.json --today 10/12/2025
    Handle {
        #[arg(long, value_name = "FILE")]
        request: Option<PathBuf>,
        /// Reference day (DD/MM/YYYY); defaults to the local date
        #[arg(long, value_name = "DD/MM/YYYY")]
        today: Option<String>,
    },
    /// Normalize a free-text date
    ///
    /// Example: agenda parse-date "10 de diciembre de 2025"
    /// Example: agenda parse-date "10/12" --today 01/01/2026
    ParseDate {
        text: String,
        #[arg(long, value_name = "DD/MM/YYYY")]
        today: Option<String>,
    },
    /// Classify and normalize a free-text time
    ///
    /// Example: agenda parse-time "3 de la tarde"
    ParseTime { text: String },
    /// Show stored tasks
    ///
    /// Example: agenda list
    /// Example: agenda list --json
    List,
}

/// Parses repeated `KEY=VALUE` overrides into one set.
pub fn parse_config_overrides<S: AsRef<str>>(raw: &[S]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let (key, value) = entry
            .as_ref()
            .trim()
            .split_once('=')
            .ok_or_else(|| AppError::invalid_input("override must be in KEY=VALUE format"))?;
        overrides.set(key, value)?;
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, parse_config_overrides};
    use agenda_core::config::MeridiemPolicy;
    use agenda_core::datetime::TimeMode;
    use clap::Parser;

    #[test]
    fn parse_config_overrides_canonicalizes_field_names() {
        let parsed = parse_config_overrides(&[" TIME-MODE = twelve_hour "]).unwrap();
        assert_eq!(parsed.time_mode, Some(TimeMode::TwelveHour));
    }

    #[test]
    fn parse_config_overrides_collects_every_entry() {
        let parsed =
            parse_config_overrides(&["meridiem_policy=store_raw", "context_lifespan=3"]).unwrap();
        assert_eq!(parsed.meridiem_policy, Some(MeridiemPolicy::StoreRaw));
        assert_eq!(parsed.context_lifespan, Some(3));
    }

    #[test]
    fn parse_config_overrides_rejects_unknown_fields() {
        let err = parse_config_overrides(&["unknown.field=value"]).unwrap_err();
        assert!(err.message().contains("unknown config field"));
    }

    #[test]
    fn parse_config_overrides_rejects_missing_equals() {
        let err = parse_config_overrides(&["time_mode"]).unwrap_err();
        assert!(err.message().contains("KEY=VALUE"));
    }

    #[test]
    fn handle_accepts_request_file_and_today() {
        let cli = Cli::try_parse_from([
            "agenda",
            "handle",
            "--request",
            "turn.json",
            "--today",
            "10/12/2025",
        ])
        .unwrap();

        match cli.command {
            Command::Handle { request, today } => {
                assert_eq!(request.unwrap().to_str(), Some("turn.json"));
                assert_eq!(today.as_deref(), Some("10/12/2025"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
