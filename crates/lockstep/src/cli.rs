//! # Command Line
//!
//! Simple argument scan, no external deps:
//!
//! ```bash
//! lockstep -n 8 -c 50
//! lockstep --config run.toml -s 7
//! ```
//!
//! Flags override values loaded from `--config`. Values may be attached
//! (`-n8`) or separate (`-n 8`).

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::RunConfig;
use crate::error::ConfigError;

/// One-line usage, printed after `Usage: <program>`.
pub const USAGE: &str = "[-n threads][-c cycles][-s seed][-u work_unit_us][--config path]";

/// Option descriptions printed by `-h`.
pub const HELP: &str = "  -c cycles        Number of iterations (default 5)\n\
                        \x20 -h               Print this help and exit\n\
                        \x20 -n threads       Number of threads (default 3)\n\
                        \x20 -s seed          Seed for the per-cycle random draws\n\
                        \x20 -u work_unit_us  Length of one unit of per-cycle work (0 = no delay)\n\
                        \x20 --config path    Load settings from a TOML file first\n";

/// Command-line errors. All of them end the process with a nonzero status.
#[derive(Error, Debug)]
pub enum CliError {
    /// A flag was given without its value.
    #[error("option '{0}' requires a value")]
    MissingValue(String),

    /// A value could not be parsed as a non-negative integer.
    #[error("invalid value '{value}' for option '{flag}'")]
    InvalidValue {
        /// The flag.
        flag: String,
        /// The offending value.
        value: String,
    },

    /// A count was below 1.
    #[error("number of {what} '{value}' should be at least 1")]
    BelowMinimum {
        /// `"threads"` or `"cycles"`.
        what: &'static str,
        /// The offending value.
        value: String,
    },

    /// An argument that is not a known flag.
    #[error("unrecognized argument '{0}'")]
    Unrecognized(String),

    /// The config file was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What the user asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print help and exit successfully.
    Help,
    /// Execute a run.
    Run(CliOptions),
}

/// Options gathered from the command line, before config-file merging.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    /// `-n`
    pub threads: Option<usize>,
    /// `-c`
    pub cycles: Option<u64>,
    /// `-s`
    pub seed: Option<u64>,
    /// `-u`
    pub work_unit_us: Option<u64>,
    /// `--config`
    pub config_path: Option<PathBuf>,
}

impl CliOptions {
    /// Produces the final configuration: defaults, then the config file,
    /// then flags.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be loaded or the
    /// merged result fails validation.
    pub fn resolve(&self) -> Result<RunConfig, CliError> {
        let mut config = match &self.config_path {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(threads) = self.threads {
            config.thread_count = threads;
        }
        if let Some(cycles) = self.cycles {
            config.cycle_count = cycles;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(unit) = self.work_unit_us {
            config.work_unit_us = unit;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parses arguments, excluding the program name.
///
/// # Errors
///
/// Returns a [`CliError`] for missing, unparsable or out-of-range values
/// and for unrecognized arguments.
pub fn parse_args<I, S>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--config" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                options.config_path = Some(PathBuf::from(value));
            }
            _ => {
                let (flag, inline) = split_short(&arg).ok_or_else(|| CliError::Unrecognized(arg.clone()))?;
                let value = match inline {
                    Some(value) => value.to_owned(),
                    None => args.next().ok_or_else(|| CliError::MissingValue(flag.to_owned()))?,
                };
                match flag {
                    "-n" => options.threads = Some(parse_count(flag, "threads", &value)?),
                    "-c" => options.cycles = Some(parse_count(flag, "cycles", &value)?),
                    "-s" => options.seed = Some(parse_number(flag, &value)?),
                    "-u" => options.work_unit_us = Some(parse_number(flag, &value)?),
                    _ => return Err(CliError::Unrecognized(arg.clone())),
                }
            }
        }
    }

    Ok(Command::Run(options))
}

/// Parses raw OS arguments, excluding the program name.
///
/// # Errors
///
/// Same as [`parse_args`]. An argument that is not valid UTF-8 is
/// [`CliError::Unrecognized`].
pub fn parse_args_os<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = OsString>,
{
    let args = args
        .into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|raw| CliError::Unrecognized(raw.to_string_lossy().into_owned()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    parse_args(args)
}

/// Splits `-n8` into `("-n", Some("8"))` and `-n` into `("-n", None)`.
fn split_short(arg: &str) -> Option<(&str, Option<&str>)> {
    if !arg.starts_with('-') || arg.starts_with("--") || arg.len() < 2 || !arg.is_char_boundary(2) {
        return None;
    }
    let (flag, rest) = arg.split_at(2);
    Some((flag, (!rest.is_empty()).then_some(rest)))
}

fn parse_number<N: std::str::FromStr>(flag: &str, value: &str) -> Result<N, CliError> {
    value.trim().parse().map_err(|_| CliError::InvalidValue {
        flag: flag.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_count<N>(flag: &str, what: &'static str, value: &str) -> Result<N, CliError>
where
    N: std::str::FromStr + PartialOrd + From<u8>,
{
    // "-5" is a below-minimum count, not garbage.
    if let Ok(signed) = value.trim().parse::<i64>() {
        if signed < 1 {
            return Err(CliError::BelowMinimum {
                what,
                value: value.to_owned(),
            });
        }
    }
    let count: N = parse_number(flag, value)?;
    if count < N::from(1) {
        return Err(CliError::BelowMinimum {
            what,
            value: value.to_owned(),
        });
    }
    Ok(count)
}
