// Table names map to `<dir>/<name>.csv`; separators in names are rejected.

use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind, Result};

pub const TABLE_EXTENSION: &str = "csv";

pub fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

pub fn resolve_table_path(name: &str, dir: &Path) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("table name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("table name must not contain path separators")
            .with_table(name)
            .with_hint("Use --dir to point at the directory holding the table files."));
    }
    let suffix = format!(".{TABLE_EXTENSION}");
    if name.ends_with(&suffix) {
        return Ok(dir.join(name));
    }
    Ok(dir.join(format!("{name}{suffix}")))
}

#[cfg(test)]
mod tests {
    use super::resolve_table_path;
    use crate::core::error::ErrorKind;
    use std::path::Path;

    #[test]
    fn appends_extension_once() {
        let dir = Path::new("/data");
        assert_eq!(
            resolve_table_path("people", dir).expect("path"),
            dir.join("people.csv")
        );
        assert_eq!(
            resolve_table_path("people.csv", dir).expect("path"),
            dir.join("people.csv")
        );
    }

    #[test]
    fn rejects_separators() {
        let err = resolve_table_path("../etc/passwd", Path::new(".")).expect_err("reject");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = resolve_table_path("", Path::new(".")).expect_err("reject");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
