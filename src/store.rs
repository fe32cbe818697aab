use log::{debug, info};
use rusqlite::{types::ValueRef, Connection};

use crate::{
    config::{is_valid_identifier, Config},
    error::StoreError,
    frame::{Frame, Value},
};

/// Opens the store declared in `db_config`, creating the backing file when
/// absent. Returns the connection together with the managed table list and
/// the advisory batch-size hint. The caller owns the connection and must
/// release it once all table operations for the request are done.
pub fn connect(config: &Config) -> Result<(Connection, Vec<String>, u32), StoreError> {
    let path = &config.db_config.db_path;
    let conn = Connection::open(path)
        .map_err(|e| StoreError::Connect(format!("{}: {e}", path.display())))?;
    let tables = config.db_config.tables();
    info!(
        "Connected to store {} ({} managed table(s))",
        path.display(),
        tables.len()
    );
    Ok((conn, tables, config.db_config.batch_size))
}

/// Generic read path for downstream consumers: all rows of one table as a
/// frame, in storage order. `limit` caps the row count when set.
pub fn fetch_all(conn: &Connection, table: &str, limit: Option<usize>) -> Result<Frame, StoreError> {
    if !is_valid_identifier(table) {
        return Err(StoreError::Config(format!(
            "table name '{table}' is not a valid identifier"
        )));
    }
    let sql = match limit {
        Some(n) => format!("SELECT * FROM {table} LIMIT {n}"),
        None => format!("SELECT * FROM {table}"),
    };
    debug!("Read query: {sql}");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::Schema(format!("reading table '{table}': {e}")))?;
    let columns = stmt
        .column_names()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut result = stmt
        .query([])
        .map_err(|e| StoreError::Schema(format!("reading table '{table}': {e}")))?;
    while let Some(row) = result
        .next()
        .map_err(|e| StoreError::Schema(format!("reading table '{table}': {e}")))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            let value = row
                .get_ref(idx)
                .map_err(|e| StoreError::Schema(format!("reading table '{table}': {e}")))?;
            values.push(stored_value(value));
        }
        rows.push(values);
    }
    Ok(Frame::new(columns, rows))
}

fn stored_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Text(format!("<{} byte blob>", bytes.len())),
    }
}
