use std::{fmt, path::Path};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use rusqlite::types::{ToSql, ToSqlOutput};

use crate::{config::TableMapping, error::StoreError};

/// Canonical representation used for timestamp values bound to the store.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Scalar cell value carried by a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Null,
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                // Drop the ".0" suffix for whole values, but only when the
                // integer round-trips; a saturating cast would corrupt
                // magnitudes beyond the i64 range.
                let truncated = *f as i64;
                if f.fract() == 0.0 && truncated as f64 == *f {
                    truncated.to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            Value::Null => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            Value::Integer(i) => Ok(ToSqlOutput::from(*i)),
            Value::Float(f) => Ok(ToSqlOutput::from(*f)),
            Value::Boolean(b) => Ok(ToSqlOutput::from(*b)),
            // Timestamps bind as their canonical string form.
            Value::DateTime(dt) => Ok(ToSqlOutput::from(dt.format(DATETIME_FORMAT).to_string())),
            Value::Null => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Null)),
        }
    }
}

/// A source column that had no entry in the table's header mapping. The
/// original label is kept; ingestion proceeds with degraded naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingWarning {
    pub table: String,
    pub column: String,
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column '{}' is not mapped for table '{}'; keeping the original label",
            self.column, self.table
        )
    }
}

/// Ordered, in-memory view of one sheet after header renaming. Created per
/// ingestion call and discarded once consumed.
#[derive(Debug, Clone)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub warnings: Vec<MappingWarning>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Frame {
            columns,
            rows,
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Applies header renaming to a sheet's header row. Unmapped labels are kept
/// verbatim and reported as warnings, in source column order.
pub fn apply_header_mapping(
    labels: &[String],
    mapping: &TableMapping,
) -> (Vec<String>, Vec<MappingWarning>) {
    let mut columns = Vec::with_capacity(labels.len());
    let mut warnings = Vec::new();
    for label in labels {
        match mapping.rename(label) {
            Some(name) => columns.push(name.to_string()),
            None => {
                warnings.push(MappingWarning {
                    table: mapping.table.clone(),
                    column: label.clone(),
                });
                columns.push(label.clone());
            }
        }
    }
    (columns, warnings)
}

/// Reads one sheet of a spreadsheet into a frame, renaming headers through
/// the table mapping. `sheet` is a zero-based index; loading every sheet in
/// one call is not supported.
pub fn load_frame(path: &Path, sheet: usize, mapping: &TableMapping) -> Result<Frame, StoreError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| StoreError::Source(format!("opening {}: {e}", path.display())))?;
    let sheet_count = workbook.sheet_names().len();
    let range = workbook
        .worksheet_range_at(sheet)
        .ok_or_else(|| {
            StoreError::Source(format!(
                "sheet index {sheet} is out of range ({sheet_count} sheet(s) in {})",
                path.display()
            ))
        })?
        .map_err(|e| StoreError::Source(format!("reading sheet {sheet}: {e}")))?;

    let mut sheet_rows = range.rows();
    let header = sheet_rows
        .next()
        .ok_or_else(|| StoreError::Source(format!("sheet {sheet} is empty")))?;
    let labels = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_label(cell, idx))
        .collect::<Result<Vec<_>, _>>()?;

    let (columns, warnings) = apply_header_mapping(&labels, mapping);
    for warning in &warnings {
        warn!("{warning}");
    }

    let mut rows = Vec::new();
    for (row_idx, sheet_row) in sheet_rows.enumerate() {
        let mut row = Vec::with_capacity(columns.len());
        for (col_idx, cell) in sheet_row.iter().take(columns.len()).enumerate() {
            // Data rows are 1-based relative to the header.
            row.push(cell_to_value(cell, row_idx + 1, col_idx)?);
        }
        row.resize(columns.len(), Value::Null);
        rows.push(row);
    }

    Ok(Frame {
        columns,
        rows,
        warnings,
    })
}

fn header_label(cell: &Data, idx: usize) -> Result<String, StoreError> {
    let label = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => cell_to_value(other, 0, idx)?.as_display(),
    };
    if label.is_empty() {
        return Err(StoreError::Source(format!(
            "missing column name in header cell {idx}"
        )));
    }
    Ok(label)
}

fn cell_to_value(cell: &Data, row: usize, col: usize) -> Result<Value, StoreError> {
    let value = match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(parsed) => Value::DateTime(parsed),
            None => Value::Null,
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(Value::DateTime)
            .unwrap_or_else(|| Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => {
            return Err(StoreError::Source(format!(
                "error cell at row {row}, column {col}: {e:?}"
            )));
        }
    };
    Ok(value)
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnSpec, TableMapping};
    use chrono::NaiveDate;

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
                    source_label: "Customer".to_string(),
                    name: "customer".to_string(),
                    affinity: "VARCHAR(100)".to_string(),
                },
            ],
            primary_keys: vec!["order_id".to_string()],
        }
    }

    #[test]
    fn unmapped_labels_are_kept_and_reported() {
        let labels = vec![
            "Order ID".to_string(),
            "Customer".to_string(),
            "Extra".to_string(),
        ];
        let (columns, warnings) = apply_header_mapping(&labels, &mapping());
        assert_eq!(columns, vec!["order_id", "customer", "Extra"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].column, "Extra");
        assert_eq!(warnings[0].table, "orders");
    }

    #[test]
    fn mapped_labels_produce_no_warnings() {
        let labels = vec!["Order ID".to_string(), "Customer".to_string()];
        let (columns, warnings) = apply_header_mapping(&labels, &mapping());
        assert_eq!(columns, vec!["order_id", "customer"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn datetime_displays_in_canonical_form() {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(Value::DateTime(dt).as_display(), "2024-05-06 14:30:00");
    }

    #[test]
    fn float_display_drops_trailing_zero_fraction() {
        assert_eq!(Value::Float(3.0).as_display(), "3");
        assert_eq!(Value::Float(3.25).as_display(), "3.25");
    }

    #[test]
    fn whole_floats_beyond_i64_range_do_not_saturate() {
        assert_eq!(Value::Float(1e20).as_display(), "100000000000000000000");
        assert_eq!(Value::Float(-1e20).as_display(), "-100000000000000000000");
    }

    #[test]
    fn error_cells_abort_the_load() {
        let cell = Data::Error(calamine::CellErrorType::Div0);
        assert!(cell_to_value(&cell, 4, 2).is_err());
    }

    #[test]
    fn iso_dates_parse_to_midnight() {
        let parsed = parse_iso_datetime("2024-05-06").unwrap();
        assert_eq!(
            parsed.format(DATETIME_FORMAT).to_string(),
            "2024-05-06 00:00:00"
        );
    }
}
