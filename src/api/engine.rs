//! Purpose: Execute one `Query` against the table store.
//! Exports: `Engine`, `Outcome`, status message constants.
//! Role: Read path (filter, join, order, project) and write paths (insert, update, delete).
//! Invariants: Tables are loaded fresh on every run; writes persist the full table once,
//! after every change is computed, or not at all.
//! Invariants: Store failures propagate unchanged; the engine never swallows errors.
use std::cmp::Ordering;

use crate::api::request::{Direction, Filter, Join, Order, Query, ReadSpec};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::record::{ID_COLUMN, Record};
use crate::core::store::{Table, TableStore};

pub const INSERTED: &str = "1 row inserted.";
pub const UPDATED: &str = "Update completed.";
pub const DELETED: &str = "Delete completed.";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Rows(Vec<Record>),
    Status(String),
}

impl Outcome {
    pub fn status(&self) -> Option<&str> {
        match self {
            Outcome::Rows(_) => None,
            Outcome::Status(status) => Some(status),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Engine {
    store: TableStore,
}

impl Engine {
    pub fn new(store: TableStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn run(&self, query: &Query) -> Result<Outcome> {
        tracing::debug!(table = query.table(), "running query");
        match query {
            Query::Read(spec) => self.read(spec).map(Outcome::Rows),
            Query::Insert { table, record } => self.insert(table, record),
            Query::Update {
                table,
                changes,
                filter,
            } => self.update(table, changes, filter.as_ref()),
            Query::Delete { table, filter } => self.delete(table, filter.as_ref()),
        }
    }

    fn read(&self, spec: &ReadSpec) -> Result<Vec<Record>> {
        let mut rows = self.store.load(&spec.table)?.records;
        if let Some(filter) = &spec.filter {
            rows.retain(|row| filter.matches(row));
        }
        if let Some(join) = &spec.join {
            let other = self.store.load(&join.table)?;
            apply_join(&mut rows, &other.records, join);
        }
        if let Some(order) = &spec.order {
            apply_order(&mut rows, order);
        }
        if !spec.columns.is_empty() {
            rows = rows.iter().map(|row| row.project(&spec.columns)).collect();
        }
        tracing::debug!(table = %spec.table, rows = rows.len(), "read query");
        Ok(rows)
    }

    fn insert(&self, name: &str, payload: &Record) -> Result<Outcome> {
        let mut table = self.store.load(name)?;
        let mut record = payload.clone();
        record.remove(ID_COLUMN);
        check_insert_columns(&table, &record)?;

        let id = next_id(&table.records, name)?;
        record.insert_first(ID_COLUMN, id.to_string());
        table.records.push(record);
        self.store.save(&table)?;
        tracing::info!(table = name, id, "inserted row");
        Ok(Outcome::Status(INSERTED.to_string()))
    }

    fn update(&self, name: &str, changes: &Record, filter: Option<&Filter>) -> Result<Outcome> {
        let mut table = self.store.load(name)?;
        check_update_columns(&table, changes)?;

        let mut touched = 0usize;
        for row in &mut table.records {
            if filter.is_none_or(|filter| filter.matches(row)) {
                row.merge(changes);
                touched += 1;
            }
        }
        if touched > 0 {
            self.store.save(&table)?;
        }
        tracing::info!(table = name, rows = touched, "updated rows");
        Ok(Outcome::Status(UPDATED.to_string()))
    }

    fn delete(&self, name: &str, filter: Option<&Filter>) -> Result<Outcome> {
        let mut table = self.store.load(name)?;
        let before = table.records.len();
        if let Some(filter) = filter {
            table.records.retain(|row| !filter.matches(row));
        }
        let removed = before - table.records.len();
        if removed > 0 {
            self.store.save(&table)?;
        }
        tracing::info!(table = name, rows = removed, "deleted rows");
        Ok(Outcome::Status(DELETED.to_string()))
    }
}

fn apply_join(rows: &mut [Record], other: &[Record], join: &Join) {
    for row in rows.iter_mut() {
        let Some(key) = row.get(&join.left_column) else {
            continue;
        };
        let matched = other
            .iter()
            .find(|candidate| candidate.get(&join.right_column) == Some(key))
            .cloned();
        if let Some(matched) = matched {
            row.merge(&matched);
        }
    }
}

// Raw string comparison; rows without the column sort first. Descending reverses the
// stable ascending result, so ties come out reversed as well.
fn apply_order(rows: &mut [Record], order: &Order) {
    rows.sort_by(|a, b| compare_column(a, b, &order.column));
    if order.direction == Direction::Desc {
        rows.reverse();
    }
}

fn compare_column(a: &Record, b: &Record, column: &str) -> Ordering {
    a.get(column).cmp(&b.get(column))
}

fn next_id(records: &[Record], table: &str) -> Result<u64> {
    let mut max = 0u64;
    for record in records {
        let raw = record.get(ID_COLUMN).unwrap_or("");
        match raw.trim().parse::<u64>() {
            Ok(id) => max = max.max(id),
            Err(_) => tracing::warn!(table, id = raw, "ignoring non-numeric ID"),
        }
    }
    max.checked_add(1).ok_or_else(|| {
        Error::new(ErrorKind::InvalidInsert)
            .with_message(format!("no ID left after {max}"))
            .with_table(table)
            .with_hint("Renumber the table's ID column before inserting.")
    })
}

fn check_insert_columns(table: &Table, record: &Record) -> Result<()> {
    if table.header.is_empty() {
        return Ok(());
    }
    let expected = table.data_columns().count();
    let unknown = record.columns().find(|column| !table.has_column(column));
    if record.len() == expected && unknown.is_none() {
        return Ok(());
    }
    let message = match unknown {
        Some(column) => format!("unknown column `{column}`"),
        None => format!(
            "column count mismatch: table has {expected}, insert has {}",
            record.len()
        ),
    };
    Err(Error::new(ErrorKind::InvalidInsert)
        .with_message(message)
        .with_table(&table.name)
        .with_hint(format!(
            "Columns: {}",
            table.data_columns().collect::<Vec<_>>().join(", ")
        )))
}

fn check_update_columns(table: &Table, changes: &Record) -> Result<()> {
    for column in changes.columns() {
        if column == ID_COLUMN {
            return Err(Error::new(ErrorKind::InvalidUpdate)
                .with_message("the ID column cannot be updated")
                .with_table(&table.name));
        }
        if !table.has_column(column) {
            return Err(Error::new(ErrorKind::InvalidUpdate)
                .with_message(format!("unknown column `{column}`"))
                .with_table(&table.name));
        }
    }
    Ok(())
}
