use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Set to any value other than `0`, `false`, `no` or empty to skip the prompt.
pub const ASSUME_YES_ENV: &str = "SASLDB_CONVERT_ASSUME_YES";

/// sasldb-convert - copy every credential from an old sasldb into a new one
#[derive(Parser, Debug)]
#[command(name = "sasldb-convert")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The legacy sasldb file to read
    pub old_sasldb: PathBuf,

    /// Where to write the converted store (must not exist)
    pub new_sasldb: PathBuf,

    /// Do not wait for confirmation before converting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Everything a conversion run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub assume_yes: bool,
    pub report: ReportFormat,
    pub verbosity: u8,
}

impl Config {
    /// Build a config from parsed arguments and the value of
    /// [`ASSUME_YES_ENV`], if set.
    pub fn from_args(args: Args, assume_yes_env: Option<&str>) -> Config {
        Config {
            source: args.old_sasldb,
            destination: args.new_sasldb,
            assume_yes: args.yes || assume_yes_env.is_some_and(env_flag),
            report: if args.json {
                ReportFormat::Json
            } else {
                ReportFormat::Text
            },
            verbosity: args.verbose,
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    }
}

fn env_flag(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "false" | "no")
}
