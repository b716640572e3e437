//! Purpose: Load and persist whole tables as delimited text files.
//! Exports: `Table`, `TableStore`, `StoreOptions`.
//! Role: Only component that touches table files; holds no state across calls.
//! Invariants: Every loaded record carries `ID`; missing IDs are backfilled 1-based and
//! only reach disk on the next save.
//! Invariants: Saves encode the full file in memory first, then write it in one call.
//! Invariants: No locking; concurrent writers race and the last full rewrite wins.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::paths::{default_data_dir, resolve_table_path};
use crate::core::record::{ID_COLUMN, Record};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    pub name: String,
    pub header: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|name| name == column)
    }

    /// Header without the identifier column.
    pub fn data_columns(&self) -> impl Iterator<Item = &str> {
        self.header
            .iter()
            .map(String::as_str)
            .filter(|name| *name != ID_COLUMN)
    }

    /// Header to persist: known header first, then any column only some records carry,
    /// with `ID` moved to the front.
    pub fn persisted_header(&self) -> Vec<String> {
        let mut header = self.header.clone();
        for record in &self.records {
            for column in record.columns() {
                if !header.iter().any(|name| name == column) {
                    header.push(column.to_string());
                }
            }
        }
        if let Some(idx) = header.iter().position(|name| name == ID_COLUMN) {
            let id = header.remove(idx);
            header.insert(0, id);
        }
        header
    }
}

#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub dir: PathBuf,
    pub delimiter: u8,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            delimiter: b',',
        }
    }
}

impl StoreOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct TableStore {
    options: StoreOptions,
}

impl TableStore {
    pub fn new(options: StoreOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn path(&self, name: &str) -> Result<PathBuf> {
        resolve_table_path(name, &self.options.dir)
    }

    pub fn load(&self, name: &str) -> Result<Table> {
        let path = self.path(name)?;
        let bytes = fs::read(&path).map_err(|err| read_error(name, &path, err))?;
        let mut table = self.decode(name, &path, &bytes)?;
        backfill_ids(&mut table);
        tracing::debug!(
            table = name,
            path = %path.display(),
            rows = table.records.len(),
            "loaded table"
        );
        Ok(table)
    }

    pub fn header(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.load(name)?.header)
    }

    pub fn save(&self, table: &Table) -> Result<()> {
        let path = self.path(&table.name)?;
        let bytes = self.encode(table)?;
        fs::write(&path, bytes).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write table")
                .with_table(&table.name)
                .with_path(&path)
                .with_source(err)
        })?;
        tracing::debug!(
            table = %table.name,
            path = %path.display(),
            rows = table.records.len(),
            "saved table"
        );
        Ok(())
    }

    fn decode(&self, name: &str, path: &Path, bytes: &[u8]) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(true)
            .from_reader(bytes);

        let header: Vec<String> = reader
            .headers()
            .map_err(|err| malformed(name, path, err))?
            .iter()
            .map(str::to_string)
            .collect();
        if let Some(column) = first_duplicate(&header) {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!("duplicate column `{column}` in header"))
                .with_table(name)
                .with_path(path));
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|err| malformed(name, path, err))?;
            records.push(header.iter().cloned().zip(row.iter()).collect::<Record>());
        }

        Ok(Table {
            name: name.to_string(),
            header,
            records,
        })
    }

    fn encode(&self, table: &Table) -> Result<Vec<u8>> {
        let header = table.persisted_header();
        if header.is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .from_writer(Vec::new());
        writer
            .write_record(&header)
            .map_err(|err| encode_error(&table.name, err))?;
        for record in &table.records {
            let row = header
                .iter()
                .map(|column| record.get(column).unwrap_or(""));
            writer
                .write_record(row)
                .map_err(|err| encode_error(&table.name, err))?;
        }
        writer.into_inner().map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("failed to flush encoded table: {}", err.error()))
                .with_table(&table.name)
        })
    }
}

fn backfill_ids(table: &mut Table) {
    if table.header.is_empty() || table.has_column(ID_COLUMN) {
        return;
    }
    table.header.insert(0, ID_COLUMN.to_string());
    for (idx, record) in table.records.iter_mut().enumerate() {
        record.insert_first(ID_COLUMN, (idx + 1).to_string());
    }
}

fn first_duplicate(header: &[String]) -> Option<&str> {
    header
        .iter()
        .enumerate()
        .find(|(idx, name)| header[..*idx].contains(name))
        .map(|(_, name)| name.as_str())
}

fn read_error(name: &str, path: &Path, err: io::Error) -> Error {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Io,
    };
    let message = match kind {
        ErrorKind::NotFound => "table does not exist",
        _ => "failed to read table",
    };
    Error::new(kind)
        .with_message(message)
        .with_table(name)
        .with_path(path)
        .with_source(err)
}

fn malformed(name: &str, path: &Path, err: csv::Error) -> Error {
    Error::new(ErrorKind::Corrupt)
        .with_message("table file is not valid delimited text")
        .with_table(name)
        .with_path(path)
        .with_source(err)
}

fn encode_error(name: &str, err: csv::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to encode table")
        .with_table(name)
        .with_source(err)
}
