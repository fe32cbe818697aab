use log::{debug, info};
use rusqlite::{params_from_iter, Connection};

use crate::{
    config::{is_valid_identifier, TableMapping},
    error::StoreError,
    frame::Frame,
};

/// Outcome of one transactional upsert call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReport {
    pub table: String,
    pub attempted: usize,
    pub succeeded: usize,
}

/// Inserts or updates every frame row inside a single transaction, keyed on
/// the configured primary-key columns. The first row failure rolls the whole
/// batch back; rows executed before it are discarded. When the same key
/// appears twice in one frame the later occurrence wins.
pub fn upsert(
    conn: &mut Connection,
    mapping: &TableMapping,
    frame: &Frame,
) -> Result<UpsertReport, StoreError> {
    // Unmapped source columns carry arbitrary labels; refuse anything the
    // identifier allow-list would not have admitted at configuration time.
    for column in &frame.columns {
        if !is_valid_identifier(column) {
            return Err(StoreError::Upsert(format!(
                "column '{column}' is not a valid identifier; map it in the configuration"
            )));
        }
    }
    let attempted = frame.rows.len();
    let sql = upsert_sql(&mapping.table, &frame.columns, &mapping.primary_keys);
    debug!("Upsert statement for '{}':\n{sql}", mapping.table);

    let tx = conn
        .transaction()
        .map_err(|e| StoreError::Upsert(format!("starting transaction: {e}")))?;
    {
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|e| StoreError::Upsert(format!("preparing statement: {e}")))?;
        for (idx, row) in frame.rows.iter().enumerate() {
            // A failure here drops the transaction, rolling back every row
            // already executed in this batch.
            stmt.execute(params_from_iter(row.iter()))
                .map_err(|e| StoreError::Upsert(format!("row {} of {attempted}: {e}", idx + 1)))?;
        }
    }
    tx.commit()
        .map_err(|e| StoreError::Upsert(format!("committing batch: {e}")))?;

    info!(
        "Upserted {attempted} row(s) into '{}' ({} key column(s))",
        mapping.table,
        mapping.primary_keys.len()
    );
    Ok(UpsertReport {
        table: mapping.table.clone(),
        attempted,
        succeeded: attempted,
    })
}

/// One parameterized statement shape per batch: insert the full column list,
/// on primary-key conflict update every non-key column to the incoming
/// value. Degrades to DO NOTHING when every column is a key column.
fn upsert_sql(table: &str, columns: &[String], primary_keys: &[String]) -> String {
    let column_list = columns.join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .filter(|c| !primary_keys.contains(c))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>();
    let conflict = primary_keys.join(", ");
    if updates.is_empty() {
        format!(
            "INSERT INTO {table} ({column_list}) VALUES ({placeholders}) \
             ON CONFLICT({conflict}) DO NOTHING"
        )
    } else {
        format!(
            "INSERT INTO {table} ({column_list}) VALUES ({placeholders}) \
             ON CONFLICT({conflict}) DO UPDATE SET {}",
            updates.join(", ")
        )
    }
}
