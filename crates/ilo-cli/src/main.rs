/// iLO firmware command-line tool: split a firmware container into its
/// bootloader, signature parameters and compressed images.
///
/// # Command overview
///
/// ```text
/// ilo <COMMAND> [OPTIONS]
///
/// Commands:
///   extract    Write every region of a firmware file to a directory
///   inspect    Print the decoded records and a region table
///   validate   Check a firmware file without writing anything
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log every record and region (debug level)
///   -q, --quiet      Only log warnings and errors
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                  |
/// |------|------------------------------------------|
/// | 0    | Success                                  |
/// | 1    | I/O failure or bad arguments             |
/// | 2    | Unknown target                           |
/// | 3    | Non-0xFF padding before an image header  |
/// | 4    | Image length field mismatch              |
/// | 5    | Truncated input                          |
/// | 6    | Corrupt container sizes or offsets       |
/// | 7    | Image payload failed to decompress       |
/// | 8    | Region recorded twice                    |
/// | 9    | Record could not be decoded              |
///
/// Logs go to stderr; reports go to stdout.
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ilo_decoder::{BoundsPolicy, DEFAULT_MAX_IMAGE_SIZE, DecodeError, DecoderConfig};
use ilo_wire::{TargetId, TargetTable, WireError};

mod cmd_extract;
mod cmd_inspect;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Decoder for HP iLO firmware containers.
#[derive(Parser)]
#[command(name = "ilo", version, about = "iLO firmware container extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log every record and region at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Write every region of a firmware file to a directory.
    Extract(ExtractArgs),
    /// Print the decoded records and a region table.
    Inspect(InspectArgs),
    /// Check a firmware file without writing anything.
    Validate(ValidateArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Decoder options shared by every command.
///
/// ```text
/// ┌──────────────────────┬───────────────────────────────────────────────┐
/// │ Flag                 │ Effect                                        │
/// ├──────────────────────┼───────────────────────────────────────────────┤
/// │ --permissive         │ Clamp out-of-range sizes instead of failing   │
/// │ --max-image-size N   │ Refuse images that decompress past N bytes    │
/// │ --target UUID=NAME   │ Accept another target id (repeatable)         │
/// └──────────────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct DecoderArgs {
    /// Clamp out-of-range sizes and offsets instead of failing.
    #[arg(long)]
    pub permissive: bool,

    /// Largest decompressed image accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_SIZE)]
    pub max_image_size: usize,

    /// Additional known target, as `UUID=NAME`.
    #[arg(long = "target", value_name = "UUID=NAME", value_parser = parse_target)]
    pub targets: Vec<(TargetId, String)>,
}

impl DecoderArgs {
    pub fn config(&self) -> DecoderConfig {
        let mut targets = TargetTable::default();
        for (id, name) in &self.targets {
            targets.insert(*id, name.clone());
        }

        DecoderConfig {
            bounds: if self.permissive {
                BoundsPolicy::Permissive
            } else {
                BoundsPolicy::Strict
            },
            max_image_size: self.max_image_size,
            targets,
        }
    }
}

fn parse_target(spec: &str) -> Result<(TargetId, String), WireError> {
    TargetTable::parse_entry(spec)
}

/// Arguments for `ilo extract`.
///
/// Decodes the whole container first; files are only written once the
/// decode has succeeded. The one exception is a padding violation, where
/// the offending region is saved as `failed_assert.bin` for inspection.
#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Firmware file to extract.
    pub file: PathBuf,

    /// Directory to write the regions to; created if missing.
    pub outdir: PathBuf,

    #[command(flatten)]
    pub decoder: DecoderArgs,
}

/// Arguments for `ilo inspect`.
///
/// ```text
/// ┌────────────┬─────────────────────────────────────────────────────────┐
/// │ Flag       │ Effect                                                  │
/// ├────────────┼─────────────────────────────────────────────────────────┤
/// │ --show-hex │ Hex dump of the fixed fields of every header            │
/// │ --json     │ Machine-readable report instead of text                 │
/// └────────────┴─────────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Firmware file to inspect.
    pub file: PathBuf,

    /// Hex dump the fixed fields of every header.
    #[arg(long)]
    pub show_hex: bool,

    /// Print the report as JSON.
    #[arg(long, conflicts_with = "show_hex")]
    pub json: bool,

    #[command(flatten)]
    pub decoder: DecoderArgs,
}

/// Arguments for `ilo validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Firmware file to validate.
    pub file: PathBuf,

    #[command(flatten)]
    pub decoder: DecoderArgs,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    env_logger::builder()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .filter_module("ilo_decoder", level)
        .filter_module("ilo", level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Extract(args) => cmd_extract::run(&args),
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(exit_code(&e));
    }
}

/// The decode error's own code when there is one, 1 otherwise.
fn exit_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<DecodeError>().map_or(1, DecodeError::code)
}
