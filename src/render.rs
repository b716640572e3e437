//! Purpose: Render query results, statuses, and errors for the terminal or for pipes.
//! Exports: `OutputFormat`, `ColorMode`, `render_rows`, `render_status`, `error_text`, `error_json`.
//! Role: Pure formatting used by CLI emission paths; no I/O besides the emit helpers.
//! Invariants: Table output uses the union of row columns in first-seen order.
//! Invariants: ANSI escapes appear only when color is enabled.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};

use clap::ValueEnum;
use flatquery::api::{Error, ErrorKind, Record};
use serde_json::{Map, Value, json};

pub const NO_RESULTS: &str = "No results found.";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub fn render_rows(rows: &[Record], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => encode_json(&json!(rows)),
        OutputFormat::Table => {
            if rows.is_empty() {
                return NO_RESULTS.to_string();
            }
            let headers = collect_headers(rows);
            let cells = rows
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .map(|column| row.get(column).unwrap_or("").to_string())
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>();
            render_table(&headers, &cells)
        }
    }
}

pub fn render_status(status: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => encode_json(&json!({ "status": status })),
        OutputFormat::Table => status.to_string(),
    }
}

pub fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn encode_json(value: &Value) -> String {
    if io::stdout().is_terminal() {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
}

fn collect_headers(rows: &[Record]) -> Vec<&str> {
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for column in row.columns() {
            if !headers.contains(&column) {
                headers.push(column);
            }
        }
    }
    headers
}

// Cells keep to one line: embedded line breaks are shown escaped.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let lines = std::iter::once(headers.iter().map(|h| h.to_string()).collect::<Vec<_>>())
        .chain(rows.iter().map(|row| {
            row.iter()
                .map(|cell| cell.replace('\n', "\\n").replace('\r', "\\r"))
                .collect()
        }))
        .collect::<Vec<Vec<String>>>();
    let widths = (0..headers.len())
        .map(|idx| {
            lines
                .iter()
                .filter_map(|line| line.get(idx))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    lines
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "table not found".to_string(),
        ErrorKind::Corrupt => "malformed table".to_string(),
        ErrorKind::InvalidInsert => "invalid insert".to_string(),
        ErrorKind::InvalidUpdate => "invalid update".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    std::iter::successors(err.source(), |&cause| cause.source())
        .map(ToString::to_string)
        .collect()
}

pub fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(table) = err.table() {
        inner.insert("table".to_string(), json!(table));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

pub fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![(Label::Error, error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push((Label::Hint, hint.to_string()));
    }
    if let Some(table) = err.table() {
        lines.push((Label::Table, table.to_string()));
    }
    if let Some(path) = err.path() {
        lines.push((Label::Path, path.display().to_string()));
    }
    lines.extend(error_causes(err).into_iter().map(|cause| (Label::Cause, cause)));
    lines
        .into_iter()
        .map(|(label, text)| format!("{} {text}", label.paint(use_color)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Copy, Clone, Debug)]
enum Label {
    Error,
    Hint,
    Table,
    Path,
    Cause,
}

impl Label {
    fn paint(self, color: bool) -> String {
        let (text, sgr) = match self {
            Label::Error => ("error:", "31"),
            Label::Hint => ("hint:", "33"),
            Label::Table => ("table:", "36"),
            Label::Path => ("path:", "36"),
            Label::Cause => ("caused by:", "33"),
        };
        if color {
            format!("\u{1b}[{sgr}m{text}\u{1b}[0m")
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NO_RESULTS, OutputFormat, error_json, error_text, render_rows};
    use flatquery::api::{Error, ErrorKind, Record};

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn table_aligns_columns_and_unions_headers() {
        let rows = vec![
            record(&[("ID", "1"), ("name", "Alice")]),
            record(&[("ID", "10"), ("team", "X")]),
        ];
        let text = render_rows(&rows, OutputFormat::Table);
        assert_eq!(
            text,
            "ID  name   team\n1   Alice\n10         X"
        );
    }

    #[test]
    fn empty_table_output_says_so() {
        assert_eq!(render_rows(&[], OutputFormat::Table), NO_RESULTS);
    }

    #[test]
    fn error_json_carries_kind_and_context() {
        let err = Error::new(ErrorKind::NotFound)
            .with_message("table does not exist")
            .with_table("ghost")
            .with_hint("check --dir");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "NotFound");
        assert_eq!(value["error"]["table"], "ghost");
        assert_eq!(value["error"]["hint"], "check --dir");
    }

    #[test]
    fn error_text_without_color_is_plain() {
        let err = Error::new(ErrorKind::Usage).with_hint("try again");
        assert_eq!(error_text(&err, false), "error: usage error\nhint: try again");
    }

    #[test]
    fn error_text_colors_labels_and_names_the_table() {
        let err = Error::new(ErrorKind::NotFound).with_table("ghost");
        let text = error_text(&err, true);
        assert!(text.starts_with("\u{1b}[31merror:\u{1b}[0m table not found"));
        assert!(text.ends_with("table:\u{1b}[0m ghost"));
    }

    #[test]
    fn table_cells_escape_line_breaks() {
        let rows = vec![record(&[("note", "a\nb")])];
        assert_eq!(render_rows(&rows, OutputFormat::Table), "note\na\\nb");
    }
}
