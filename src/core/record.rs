//! One table row: column names mapped to text values, in insertion order.
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Name of the identifier column every loaded record carries.
pub const ID_COLUMN: &str = "ID";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Sets `column`, keeping its position if present, appending otherwise.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Sets `column` at position 0, moving it there if it already exists.
    pub fn insert_first(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        self.remove(&column);
        self.fields.insert(0, (column, value.into()));
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        let idx = self.fields.iter().position(|(name, _)| name == column)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Overlays every field of `other`; its values win on shared columns.
    pub fn merge(&mut self, other: &Record) {
        for (column, value) in other.iter() {
            self.insert(column, value);
        }
    }

    /// Keeps only `columns`, in the order given; names the record lacks are skipped.
    pub fn project(&self, columns: &[String]) -> Record {
        let mut out = Record::new();
        for column in columns {
            if let Some(value) = self.get(column) {
                out.insert(column.clone(), value);
            }
        }
        out
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
