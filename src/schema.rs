use log::{debug, info};
use rusqlite::{params, Connection};

use crate::{config::TableMapping, error::StoreError};

/// Exact-name probe of the store catalog.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, StoreError> {
    let count: i64 = conn
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Schema(format!("querying catalog for '{table}': {e}")))?;
    Ok(count > 0)
}

/// Creates the table from its configuration mapping if it does not exist.
/// Returns true when a table was created. When the table is already present
/// no DDL is executed; the DDL itself also carries IF NOT EXISTS so a lost
/// race against another first-time creator degrades to a no-op.
pub fn ensure_table(conn: &Connection, mapping: &TableMapping) -> Result<bool, StoreError> {
    if table_exists(conn, &mapping.table)? {
        debug!("Table '{}' already exists", mapping.table);
        return Ok(false);
    }
    let ddl = create_table_sql(mapping);
    debug!("Executing DDL:\n{ddl}");
    conn.execute(&ddl, [])
        .map_err(|e| StoreError::Schema(format!("creating table '{}': {e}", mapping.table)))?;
    info!("Created table '{}'", mapping.table);
    Ok(true)
}

/// Column clauses follow the declaration order of the configuration mapping,
/// then the composite primary key over the configured key columns.
fn create_table_sql(mapping: &TableMapping) -> String {
    let columns = mapping
        .columns
        .iter()
        .map(|c| format!("    {} {}", c.name, c.affinity))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{columns},\n    PRIMARY KEY ({})\n)",
        mapping.table,
        mapping.primary_keys.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnSpec;

    fn mapping() -> TableMapping {
        TableMapping {
            table: "orders".to_string(),
            columns: vec![
                ColumnSpec {
                    source_label: "Order ID".to_string(),
                    name: "order_id".to_string(),
                    affinity: "INTEGER".to_string(),
                },
                ColumnSpec {
                    source_label: "Region".to_string(),
                    name: "region".to_string(),
                    affinity: "VARCHAR(100)".to_string(),
                },
                ColumnSpec {
                    source_label: "Amount".to_string(),
                    name: "amount".to_string(),
                    affinity: "REAL".to_string(),
                },
            ],
            primary_keys: vec!["order_id".to_string(), "region".to_string()],
        }
    }

    #[test]
    fn ddl_follows_declaration_order() {
        let sql = create_table_sql(&mapping());
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS orders (\n    order_id INTEGER,\n    \
             region VARCHAR(100),\n    amount REAL,\n    PRIMARY KEY (order_id, region)\n)"
        );
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let conn = Connection::open_in_memory().expect("in-memory store");
        assert!(ensure_table(&conn, &mapping()).unwrap());
        assert!(!ensure_table(&conn, &mapping()).unwrap());
        assert!(table_exists(&conn, "orders").unwrap());
        assert!(!table_exists(&conn, "missing").unwrap());
    }
}
