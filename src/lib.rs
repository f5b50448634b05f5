pub mod config;
pub mod deploy;
pub mod dot;
pub mod git;
pub mod ir;
pub mod loader;
pub mod render;
pub mod schema;

use wasm_bindgen::prelude::*;

use dot::DotWriter;
use ir::{ConnectionFilter, GraphIR};
use loader::{SchemaFormatError, SchemaLoader};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Schema export CSV to Graphviz DOT source, without invoking the layout engine.
pub fn csv_to_dot<S: AsRef<str>>(
    csv: &str,
    tables: &[S],
    limit_connections: bool,
) -> Result<String, SchemaFormatError> {
    let records = SchemaLoader::load_reader(csv.as_bytes(), tables)?;
    let ir = GraphIR::from_records(&records, ConnectionFilter::from_limit(limit_connections));
    Ok(DotWriter::default().write(&ir))
}

/// Same as [`csv_to_dot`] for JavaScript callers; `tables` is comma-separated.
#[wasm_bindgen(js_name = "schemaCsvToDot")]
pub fn schema_csv_to_dot(
    csv: &str,
    tables: &str,
    limit_connections: Option<bool>,
) -> Result<String, String> {
    let tables: Vec<&str> = split_table_list(tables);
    csv_to_dot(csv, &tables, limit_connections.unwrap_or(true)).map_err(|e| e.to_string())
}

pub fn split_table_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
