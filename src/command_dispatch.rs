//! Purpose: Hold top-level CLI command dispatch for `flatquery`.
//! Exports: `dispatch_command`, `execute_statement`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: A failing statement in the repl is reported and the loop keeps reading.
//! Invariants: One statement maps to exactly one engine run.

use std::io::{BufRead, IsTerminal, Write};

use flatquery::api::Outcome;

use super::*;
use crate::render::{render_rows, render_status};
use crate::statement::parse_statement;

const QUIT_WORDS: &[&str] = &["quit", "exit"];

pub(super) fn dispatch_command(
    command: Command,
    engine: &Engine,
    format: OutputFormat,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "flatquery", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Query { statement } => {
            let text = statement.join(" ");
            let outcome = execute_statement(engine, &text)?;
            println!("{}", render_outcome(&outcome, format));
            Ok(RunOutcome::ok())
        }
        Command::Repl => run_repl(engine, format, color_mode),
    }
}

pub(super) fn execute_statement(engine: &Engine, text: &str) -> Result<Outcome, Error> {
    let statement = parse_statement(text)?;
    tracing::debug!(?statement, "parsed statement");
    statement.into_request(engine.store())?.run(engine)
}

fn render_outcome(outcome: &Outcome, format: OutputFormat) -> String {
    match outcome {
        Outcome::Rows(rows) => render_rows(rows, format),
        Outcome::Status(status) => render_status(status, format),
    }
}

fn run_repl(engine: &Engine, format: OutputFormat, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    if interactive {
        println!("Welcome to flatquery");
        println!("Type a statement, or `quit` to exit");
    }

    let mut failures = 0usize;
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("> ");
            io::stdout().flush().map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write prompt")
                    .with_source(err)
            })?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read stdin")
                .with_source(err)
        })?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if QUIT_WORDS.iter().any(|word| text.eq_ignore_ascii_case(word)) {
            break;
        }
        match execute_statement(engine, text) {
            Ok(outcome) => println!("{}", render_outcome(&outcome, format)),
            Err(err) => {
                failures += 1;
                emit_error(&add_hints(err), color_mode);
            }
        }
    }

    tracing::debug!(failures, "repl finished");
    Ok(RunOutcome::ok())
}
