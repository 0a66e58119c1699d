//! Parse and load the binding table.

use std::{fs, path::Path};

use tracing::debug;

use crate::{
    BindingTable, Error, excerpt_at,
    raw::{self, RawDocument},
};

/// Load a binding table from a JSON file at `path`.
pub fn load_from_path(path: &Path) -> Result<BindingTable, Error> {
    let source = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: format!("Failed to read config: {}", e),
    })?;
    let table = load_from_str(&source, Some(path))?;
    debug!(path = %path.display(), triggers = table.len(), "config_loaded");
    Ok(table)
}

/// Load a binding table from JSON source text. `path` is only used for error reporting.
pub fn load_from_str(source: &str, path: Option<&Path>) -> Result<BindingTable, Error> {
    let doc: RawDocument = serde_json::from_str(source).map_err(|e| {
        let (line, col) = (e.line().max(1), e.column().max(1));
        Error::Parse {
            path: path.map(Path::to_path_buf),
            line,
            col,
            message: e.to_string(),
            excerpt: excerpt_at(source, line, col),
        }
    })?;
    raw::into_table(doc).map_err(|e| match path {
        Some(p) => e.with_path(p),
        None => e,
    })
}
