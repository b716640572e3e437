//! Purpose: `flatquery` CLI entry point.
//! Role: Binary crate root; parses args, sets up logging, runs commands, maps exit codes.
//! Invariants: Results go to stdout; diagnostics and logs go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod render;
mod statement;

use flatquery::api::{Engine, Error, ErrorKind, StoreOptions, TableStore, to_exit_code};
use flatquery::core::paths::default_data_dir;
use render::{ColorMode, OutputFormat, emit_error};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `flatquery --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let options = StoreOptions::new(cli.dir.unwrap_or_else(default_data_dir))
        .with_delimiter(cli.delimiter);
    let engine = Engine::new(TableStore::new(options));
    tracing::debug!(dir = %engine.store().options().dir.display(), "using data directory");

    command_dispatch::dispatch_command(cli.command, &engine, cli.format, color_mode)
        .map_err(add_hints)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "flatquery",
    version,
    about = "SQL-like queries over CSV files, one file per table",
    long_about = None,
    after_help = r#"EXAMPLES
  $ flatquery query "SELECT name, team FROM players WHERE team = 'X' ORDER BY name"
  $ flatquery query "INSERT INTO players VALUES ('Ann', 'X')"
  $ flatquery query "UPDATE players SET team = Y WHERE ID = 1"
  $ flatquery query "DELETE FROM players WHERE ID = 2"
  $ flatquery --dir ./data repl

Each table is a file named <table>.csv in --dir (default: current directory).
Set RUST_LOG=debug to trace table loads and saves on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        env = "FLATQUERY_DIR",
        help = "Directory holding <table>.csv files (default: current directory)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = ",",
        value_parser = parse_delimiter,
        help = "Field delimiter used by table files (one ASCII character)"
    )]
    delimiter: u8,
    #[arg(
        long,
        default_value = "table",
        value_enum,
        help = "Result format on stdout: table|json"
    )]
    format: OutputFormat,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Run one statement and print its result"
    )]
    Query {
        #[arg(
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            help = "Statement text; several arguments are joined with spaces"
        )]
        statement: Vec<String>,
    },
    #[command(about = "Read statements from stdin, one per line, until `quit`")]
    Repl,
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_delimiter(input: &str) -> Result<u8, String> {
    let mut bytes = input.bytes();
    match (bytes.next(), bytes.next()) {
        (Some(byte), None) if byte.is_ascii() && byte != b'"' && byte != b'\n' => Ok(byte),
        _ => Err("delimiter must be a single ASCII character other than a quote or newline"
            .to_string()),
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    rendered
        .lines()
        .next()
        .unwrap_or("invalid arguments")
        .trim_start_matches("error: ")
        .to_string()
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn add_hints(err: Error) -> Error {
    add_io_hint(add_corrupt_hint(add_not_found_hint(err)))
}

fn add_not_found_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::NotFound || err.hint().is_some() {
        return err;
    }
    err.with_hint("Check the table name, or point --dir at the directory holding <table>.csv.")
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint("Table file is not valid CSV for the configured --delimiter; check its header and row lengths.")
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path, permissions, and disk space.")
}
