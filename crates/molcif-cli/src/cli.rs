use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan",
    version,
    about = "molcif CLI - Inspect, convert, export and query macromolecular mmCIF files in text or binary form.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output and progress bars except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the number of tokens parsed between progress reports.
    #[arg(long, global = true, value_name = "INT")]
    pub chunk_size: Option<usize>,

    /// Reject unterminated quoted and multiline values instead of recovering.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Set the number of threads for parallel encoding.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S parser.chunk-size=512
    #[arg(short = 'S', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize the blocks, categories and structure of a text or binary file.
    Info(InfoArgs),
    /// Convert between the text and binary representations.
    Convert(ConvertArgs),
    /// Write one category as CSV.
    Export(ExportArgs),
    /// Resolve a residue through the structure index.
    Query(QueryArgs),
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to the input file (text or binary, detected by content).
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the input file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Select the output representation. Without either flag it is inferred
    /// from the output extension (`.bcif` means binary).
    #[command(flatten)]
    pub format: OutputFormat,

    /// Pick the best-fitting preset for every column without a configured encoding.
    #[arg(long)]
    pub auto_classify: bool,

    /// Encode columns the way a binary input stored them.
    #[arg(long)]
    pub reuse_encoding: bool,

    /// Assign an encoding preset to a column. Can be used multiple times.
    /// Example: --preset _atom_site.Cartn_x=fixed-point-3
    #[arg(long = "preset", value_name = "COLUMN=PRESET")]
    pub presets: Vec<String>,

    /// TOML file with per-column encoding presets.
    #[arg(long, value_name = "PATH")]
    pub hints: Option<PathBuf>,
}

/// A group to handle mutually exclusive output format flags.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct OutputFormat {
    /// Write the binary columnar representation.
    #[arg(long)]
    pub binary: bool,
    /// Write the text representation.
    #[arg(long)]
    pub text: bool,
}

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to the input file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Category to export, with or without the leading underscore.
    #[arg(short = 'C', long, required = true, value_name = "NAME")]
    pub category: String,

    /// Data block header. Defaults to the first block.
    #[arg(short, long, value_name = "HEADER")]
    pub block: Option<String>,

    /// Path for the CSV output. Defaults to standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `query` subcommand.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Path to the input file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Data block header. Defaults to the first block.
    #[arg(short, long, value_name = "HEADER")]
    pub block: Option<String>,

    /// Chain id: `auth_asym_id`, or `label_asym_id` when `--entity` is given.
    #[arg(long, required = true, value_name = "ID")]
    pub chain: String,

    /// Sequence number: `auth_seq_id`, or `label_seq_id` with `--nearest`.
    #[arg(long, required = true, value_name = "INT", allow_hyphen_values = true)]
    pub seq: i32,

    /// Insertion code of the residue.
    #[arg(long, value_name = "CODE")]
    pub ins_code: Option<String>,

    /// Address the chain by entity and label chain id.
    #[arg(long, value_name = "ID")]
    pub entity: Option<String>,

    /// Fall back to the nearest preceding residue by label sequence number.
    #[arg(long, requires = "entity")]
    pub nearest: bool,

    /// Also list residues with an atom within this distance in angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub within: Option<f64>,

    /// Abort the query after this many milliseconds. 0 disables the limit.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "mcif", "info", "1abc.cif", "-vv", "--strict", "-S", "parser.chunk-size=64",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.strict);
        assert_eq!(cli.set_values, vec!["parser.chunk-size=64".to_string()]);
        assert!(matches!(cli.command, Commands::Info(_)));
    }

    #[test]
    fn output_format_flags_are_exclusive() {
        let result = Cli::try_parse_from([
            "mcif", "convert", "-i", "a.cif", "-o", "a.bcif", "--binary", "--text",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn nearest_requires_an_entity() {
        let result =
            Cli::try_parse_from(["mcif", "query", "-i", "a.cif", "--chain", "A", "--seq", "5", "--nearest"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "mcif", "query", "-i", "a.cif", "--chain", "A", "--seq", "-3", "--entity", "1", "--nearest",
        ])
        .unwrap();
        let Commands::Query(args) = cli.command else {
            panic!("expected the query command");
        };
        assert_eq!(args.seq, -3);
        assert!(args.nearest);
    }
}
