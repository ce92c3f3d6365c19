//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rec_core::{PathTranslationTable, ShorthandTable};

use crate::config::Overrides;

/// Sorts OBS recordings into folders named after the window you spent the
/// most time in while recording.
#[derive(Debug, Parser)]
#[command(name = "recmove", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the effective settings back to the config file.
    #[arg(long, global = true)]
    pub save: bool,

    /// OBS WebSocket host.
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// OBS WebSocket port.
    #[arg(short = 'P', long, global = true)]
    pub port: Option<u16>,

    /// OBS WebSocket password.
    #[arg(short, long, global = true)]
    pub password: Option<String>,

    /// Destination base, relative to each recording's folder.
    #[arg(short, long, global = true)]
    pub dest_base: Option<PathBuf>,

    /// Seconds between active window samples.
    #[arg(short, long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub track_interval: Option<u64>,

    /// Shell command that prints the active window title.
    #[arg(short = 'c', long, global = true)]
    pub track_command: Option<String>,

    /// Path prefix translations as a JSON object, e.g. '{"C:\\": "/mnt/c/"}'.
    #[arg(short = 'T', long, global = true)]
    pub translate: Option<String>,

    /// Folder name shorthands as a JSON object, e.g. '{"Elden-Ring": "ER"}'.
    #[arg(short = 'S', long, global = true)]
    pub shorthand: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect to OBS and move recordings as they finish (the default).
    Run,

    /// Track the active window without OBS and report what would be used.
    Check,

    /// Print the folder name a window title would be sorted into.
    Sanitize {
        /// The raw window title.
        title: String,
    },

    /// Print the effective configuration.
    Config,
}

impl Cli {
    /// Collects the flags that override configuration values.
    ///
    /// Malformed `--translate` or `--shorthand` JSON is reported and replaced
    /// with an empty table.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
            dest_base: self.dest_base.clone(),
            track_interval: self.track_interval,
            track_command: self.track_command.clone(),
            translate: self.translate.as_deref().map(|json| {
                PathTranslationTable::from_json(json).unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "ignoring malformed --translate table");
                    PathTranslationTable::default()
                })
            }),
            shorthand: self.shorthand.as_deref().map(|json| {
                ShorthandTable::from_json(json).unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "ignoring malformed --shorthand table");
                    ShorthandTable::default()
                })
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["recmove"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.save);
    }

    #[test]
    fn short_flags_fill_overrides() {
        let cli = Cli::try_parse_from([
            "recmove", "-H", "obs.lan", "-P", "4460", "-p", "hunter2", "-d", "sorted", "-t", "3",
            "-c", "echo hi", "check",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Check)));

        let overrides = cli.overrides();
        assert_eq!(overrides.host.as_deref(), Some("obs.lan"));
        assert_eq!(overrides.port, Some(4460));
        assert_eq!(overrides.password.as_deref(), Some("hunter2"));
        assert_eq!(overrides.dest_base, Some(PathBuf::from("sorted")));
        assert_eq!(overrides.track_interval, Some(3));
        assert_eq!(overrides.track_command.as_deref(), Some("echo hi"));
        assert!(overrides.translate.is_none());
    }

    #[test]
    fn zero_track_interval_is_rejected() {
        assert!(Cli::try_parse_from(["recmove", "-t", "0"]).is_err());
    }

    #[test]
    fn json_tables_are_parsed() {
        let cli = Cli::try_parse_from([
            "recmove",
            "-T",
            r#"{"C:\\Videos": "/mnt/c/Videos"}"#,
            "-S",
            r#"{"Elden-Ring": "ER"}"#,
        ])
        .unwrap();
        let overrides = cli.overrides();

        let translate = overrides.translate.unwrap();
        assert_eq!(translate.rules().len(), 1);
        assert_eq!(translate.rules()[0].from, "C:\\Videos");
        assert_eq!(overrides.shorthand.unwrap().get("Elden-Ring"), Some("ER"));
    }

    #[test]
    fn help_translate_example_rewrites_windows_paths() {
        let cli = Cli::try_parse_from(["recmove", "-T", r#"{"C:\\": "/mnt/c/"}"#]).unwrap();
        let translate = cli.overrides().translate.unwrap();

        assert_eq!(
            translate.translate(std::path::Path::new("C:\\Videos\\clip.mkv")),
            PathBuf::from("/mnt/c/Videos/clip.mkv")
        );
    }

    #[test]
    fn malformed_json_becomes_an_empty_table() {
        let cli = Cli::try_parse_from(["recmove", "-T", "{not json", "-S", "[1, 2]"]).unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.translate, Some(PathTranslationTable::default()));
        assert_eq!(overrides.shorthand, Some(ShorthandTable::default()));
    }

    #[test]
    fn sanitize_takes_a_title() {
        let cli = Cli::try_parse_from(["recmove", "sanitize", "Game - Vulkan"]).unwrap();
        match cli.command {
            Some(Commands::Sanitize { title }) => assert_eq!(title, "Game - Vulkan"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
