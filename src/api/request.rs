//! Purpose: Fluent request builder and the immutable query it produces.
//! Exports: `Request`, `Query`, `ReadSpec`, `Filter`, `Join`, `Order`, `Direction`.
//! Role: Separate what to run (a `Query`) from running it (`Engine`).
//! Invariants: Configurators overwrite; calling one twice keeps the last value.
//! Invariants: The intent (read/insert/update/delete) is explicit; `build` rejects payloads
//! and clauses that do not belong to it instead of picking a winner.
use crate::api::engine::{Engine, Outcome};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::record::Record;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Single-column equality predicate; a record without the column never matches.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.column) == Some(self.value.as_str())
    }
}

/// Left-outer enrichment: `left_column` on the source row equals `right_column` on `table`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Join {
    pub left_column: String,
    pub table: String,
    pub right_column: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadSpec {
    pub table: String,
    /// Empty means every column.
    pub columns: Vec<String>,
    pub filter: Option<Filter>,
    pub join: Option<Join>,
    pub order: Option<Order>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Query {
    Read(ReadSpec),
    Insert {
        table: String,
        record: Record,
    },
    Update {
        table: String,
        changes: Record,
        filter: Option<Filter>,
    },
    Delete {
        table: String,
        filter: Option<Filter>,
    },
}

impl Query {
    pub fn table(&self) -> &str {
        match self {
            Query::Read(spec) => &spec.table,
            Query::Insert { table, .. }
            | Query::Update { table, .. }
            | Query::Delete { table, .. } => table,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Intent {
    #[default]
    Read,
    Insert,
    Update,
    Delete,
}

#[derive(Clone, Debug, Default)]
pub struct Request {
    table: Option<String>,
    intent: Intent,
    columns: Vec<String>,
    filter: Option<Filter>,
    join: Option<Join>,
    order: Option<Order>,
    values: Option<Record>,
    changes: Option<Record>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn join(
        mut self,
        left_column: impl Into<String>,
        table: impl Into<String>,
        right_column: impl Into<String>,
    ) -> Self {
        self.join = Some(Join {
            left_column: left_column.into(),
            table: table.into(),
            right_column: right_column.into(),
        });
        self
    }

    pub fn order(mut self, direction: Direction, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn insert(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self.intent = Intent::Insert;
        self
    }

    pub fn values(mut self, record: Record) -> Self {
        self.values = Some(record);
        self
    }

    pub fn update(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self.intent = Intent::Update;
        self
    }

    pub fn set(mut self, changes: Record) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn delete(mut self) -> Self {
        self.intent = Intent::Delete;
        self
    }

    pub fn build(self) -> Result<Query> {
        let Some(table) = self.table else {
            return Err(usage("request names no table")
                .with_hint("Call from(), insert(), or update() with a table name."));
        };

        if self.intent != Intent::Read
            && (!self.columns.is_empty() || self.join.is_some() || self.order.is_some())
        {
            return Err(usage("select, join, and order apply only to reads").with_table(table));
        }
        if self.values.is_some() && self.intent != Intent::Insert {
            return Err(usage("values() requires insert()").with_table(table));
        }
        if self.changes.is_some() && self.intent != Intent::Update {
            return Err(usage("set() requires update()").with_table(table));
        }

        match self.intent {
            Intent::Read => Ok(Query::Read(ReadSpec {
                table,
                columns: self.columns,
                filter: self.filter,
                join: self.join,
                order: self.order,
            })),
            Intent::Insert => {
                if self.filter.is_some() {
                    return Err(usage("insert does not take a filter").with_table(table));
                }
                match self.values {
                    Some(record) if !record.is_empty() => Ok(Query::Insert { table, record }),
                    _ => Err(Error::new(ErrorKind::InvalidInsert)
                        .with_message("insert requires at least one value")
                        .with_table(table)),
                }
            }
            Intent::Update => match self.changes {
                Some(changes) if !changes.is_empty() => Ok(Query::Update {
                    table,
                    changes,
                    filter: self.filter,
                }),
                _ => Err(Error::new(ErrorKind::InvalidUpdate)
                    .with_message("update requires at least one column to set")
                    .with_table(table)
                    .with_hint("Format: SET column1=value1, column2=value2")),
            },
            Intent::Delete => Ok(Query::Delete {
                table,
                filter: self.filter,
            }),
        }
    }

    pub fn run(self, engine: &Engine) -> Result<Outcome> {
        engine.run(&self.build()?)
    }
}

fn usage(message: &str) -> Error {
    Error::new(ErrorKind::Usage).with_message(message)
}

#[cfg(test)]
mod tests {
    use super::{Direction, Filter, Query, ReadSpec, Request};
    use crate::core::error::ErrorKind;
    use crate::core::record::Record;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn plain_from_builds_unfiltered_read() {
        let query = Request::new().from("t").build().expect("build");
        assert_eq!(
            query,
            Query::Read(ReadSpec {
                table: "t".into(),
                columns: Vec::new(),
                filter: None,
                join: None,
                order: None,
            })
        );
    }

    #[test]
    fn last_configurator_call_wins() {
        let query = Request::new()
            .from("a")
            .from("b")
            .filter("x", "1")
            .filter("y", "2")
            .order(Direction::Desc, "x")
            .order(Direction::Asc, "y")
            .build()
            .expect("build");
        let Query::Read(spec) = query else {
            panic!("expected read");
        };
        assert_eq!(spec.table, "b");
        assert_eq!(
            spec.filter,
            Some(Filter {
                column: "y".into(),
                value: "2".into()
            })
        );
        assert_eq!(spec.order.map(|order| order.direction), Some(Direction::Asc));
    }

    #[test]
    fn delete_keeps_table_from_either_side() {
        let before = Request::new().delete().from("t").build().expect("build");
        let after = Request::new().from("t").delete().build().expect("build");
        assert_eq!(before, after);
        assert!(matches!(before, Query::Delete { filter: None, .. }));
    }

    #[test]
    fn mixed_payloads_are_rejected() {
        let err = Request::new()
            .insert("t")
            .values(record(&[("name", "A")]))
            .set(record(&[("name", "B")]))
            .build()
            .expect_err("mixed");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn update_without_changes_is_invalid() {
        let err = Request::new().update("t").build().expect_err("empty set");
        assert_eq!(err.kind(), ErrorKind::InvalidUpdate);
    }

    #[test]
    fn insert_without_values_is_invalid() {
        let err = Request::new().insert("t").build().expect_err("no values");
        assert_eq!(err.kind(), ErrorKind::InvalidInsert);
    }

    #[test]
    fn missing_table_is_usage_error() {
        let err = Request::new().select(["a"]).build().expect_err("no table");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn read_clauses_on_mutation_are_rejected() {
        let err = Request::new()
            .update("t")
            .set(record(&[("name", "B")]))
            .order(Direction::Asc, "name")
            .build()
            .expect_err("order on update");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
