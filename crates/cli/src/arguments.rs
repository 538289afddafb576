//! Command definition and argument parsing.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, builder::OsStringValueParser, value_parser};
use logging::Verbosity;
use signature::{DEFAULT_BLOCK_SIZE, HashFunctionId, SignatureConfig, UnsupportedAlgorithm};

use crate::error::CliError;

/// Smallest block size accepted on the command line (1 KiB).
pub const MIN_BLOCK_SIZE: u32 = 1024;
/// Largest block size accepted on the command line (64 MiB).
pub const MAX_BLOCK_SIZE: u32 = 64 * 1024 * 1024;

/// Legacy single-dash spelling of `--block-size`.
const LEGACY_BLOCK_SIZE: &str = "-bs";

/// What the user asked for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Invocation {
    /// Print usage and exit successfully.
    Help,
    /// Print the version and exit successfully.
    Version,
    /// Generate a signature.
    Generate(SignatureRequest),
}

/// Validated arguments for one signature run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureRequest {
    /// File to read.
    pub input: PathBuf,
    /// Signature file to write.
    pub output: PathBuf,
    /// Engine configuration built from the flags.
    pub config: SignatureConfig,
    /// Diagnostic verbosity from `-v` occurrences.
    pub verbosity: Verbosity,
}

/// Builds the `clap` command used for parsing.
pub(crate) fn clap_command() -> Command {
    Command::new("blocksig")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .help("Show this help message and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .value_name("BLOCK_SIZE")
                .help("Block size in bytes, between 1024 and 67108864.")
                .value_parser(
                    value_parser!(u32)
                        .range(i64::from(MIN_BLOCK_SIZE)..=i64::from(MAX_BLOCK_SIZE)),
                )
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("hash")
                .long("hash")
                .short('h')
                .value_name("ALGORITHM")
                .help("Hash function: CRC32 or MD5.")
                .value_parser(parse_hash)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('t')
                .value_name("THREADS")
                .help("Hasher threads; 0 uses every available core.")
                .value_parser(value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("sync")
                .long("sync")
                .help("Flush the signature to stable storage before exiting.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase diagnostic output; repeat for more.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .value_parser(OsStringValueParser::new())
                .index(1),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .value_parser(OsStringValueParser::new())
                .index(2),
        )
}

fn parse_hash(value: &str) -> Result<HashFunctionId, UnsupportedAlgorithm> {
    value.parse()
}

/// Rewrites the legacy `-bs` spelling, which `clap` would otherwise read as
/// the short flags `-b -s`.
fn normalize<I, S>(arguments: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut literal = false;
    arguments
        .into_iter()
        .map(Into::into)
        .map(|argument| {
            if literal {
                return argument;
            }
            if argument == "--" {
                literal = true;
                argument
            } else if argument == LEGACY_BLOCK_SIZE {
                OsString::from("--block-size")
            } else {
                argument
            }
        })
        .collect()
}

/// Parses `arguments`, the first of which is the program name.
///
/// # Errors
///
/// Returns [`CliError::Usage`] for unknown, repeated or malformed flags and
/// for block sizes outside [`MIN_BLOCK_SIZE`]..=[`MAX_BLOCK_SIZE`].
pub fn parse_args<I, S>(arguments: I) -> Result<Invocation, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let matches = clap_command()
        .try_get_matches_from(normalize(arguments))
        .map_err(CliError::Usage)?;

    if matches.get_flag("help") {
        return Ok(Invocation::Help);
    }
    if matches.get_flag("version") {
        return Ok(Invocation::Version);
    }

    let (Some(input), Some(output)) = (operand(&matches, "input"), operand(&matches, "output"))
    else {
        return Ok(Invocation::Help);
    };

    let mut config = SignatureConfig::new()
        .with_block_size(
            matches
                .get_one::<u32>("block-size")
                .copied()
                .unwrap_or(DEFAULT_BLOCK_SIZE),
        )
        .with_hash(
            matches
                .get_one::<HashFunctionId>("hash")
                .copied()
                .unwrap_or_default(),
        )
        .with_sync_output(matches.get_flag("sync"));
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        config = config.with_hasher_threads(threads);
    }

    Ok(Invocation::Generate(SignatureRequest {
        input,
        output,
        config,
        verbosity: Verbosity::from_count(matches.get_count("verbose")),
    }))
}

fn operand(matches: &ArgMatches, id: &str) -> Option<PathBuf> {
    matches.get_one::<OsString>(id).map(PathBuf::from)
}
