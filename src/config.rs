use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Reserved key inside a header mapping naming the composite primary key.
pub const PRIMARY_KEY_FIELD: &str = "PRIMARY KEY";

/// The declarative mapping document driving schema, renaming, and store
/// location. `header_mapping` entries are kept in declaration order because
/// generated DDL must follow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub header_mapping: IndexMap<String, IndexMap<String, String>>,
    #[serde(default)]
    pub view_mapping: IndexMap<String, ViewMapping>,
    pub db_config: DbConfig,
}

/// Per-table chart/filter metadata. Not interpreted by the engine, but it
/// must survive a load/save round trip unchanged for downstream consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewMapping {
    #[serde(default)]
    pub graphs: IndexMap<String, String>,
    #[serde(default)]
    pub filters: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub db_path: PathBuf,
    /// Comma-joined list of managed table names.
    pub table_name: String,
    /// Advisory hint only; rows are processed one at a time.
    pub batch_size: u32,
}

impl DbConfig {
    pub fn tables(&self) -> Vec<String> {
        self.table_name
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One column declaration resolved from a `header_mapping` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column label as it appears in the spreadsheet header row.
    pub source_label: String,
    /// Normalized column name used in the store.
    pub name: String,
    /// Store-level type declaration, e.g. `INTEGER` or `VARCHAR(100)`.
    pub affinity: String,
}

/// Validated, ordered view of one table's header mapping.
#[derive(Debug, Clone)]
pub struct TableMapping {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_keys: Vec<String>,
}

impl TableMapping {
    /// Normalized name for a source column label, if the label is mapped.
    pub fn rename(&self, source_label: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.source_label == source_label)
            .map(|c| c.name.as_str())
    }
}

impl Config {
    /// Loads and validates a configuration document. Pure parse: no store
    /// access, no side effects.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path)
            .map_err(|e| StoreError::Config(format!("opening {}: {e}", path.display())))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .map_err(|e| StoreError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every invariant that must hold before any write: identifier
    /// allow-lists, primary keys referencing declared columns, and agreement
    /// between `header_mapping` and `db_config.table_name`.
    pub fn validate(&self) -> Result<(), StoreError> {
        let tables = self.db_config.tables();
        if tables.is_empty() {
            return Err(StoreError::Config(
                "db_config.table_name declares no tables".to_string(),
            ));
        }
        for table in &tables {
            if !is_valid_identifier(table) {
                return Err(StoreError::Config(format!(
                    "table name '{table}' is not a valid identifier"
                )));
            }
            if !self.header_mapping.contains_key(table) {
                return Err(StoreError::Config(format!(
                    "table '{table}' has no header_mapping entry"
                )));
            }
        }
        for table in self.header_mapping.keys() {
            if !tables.iter().any(|t| t == table) {
                return Err(StoreError::Config(format!(
                    "header_mapping table '{table}' is absent from db_config.table_name"
                )));
            }
            self.table_mapping(table)?;
        }
        Ok(())
    }

    /// Resolves the validated mapping for one table.
    pub fn table_mapping(&self, table: &str) -> Result<TableMapping, StoreError> {
        let mapping = self.header_mapping.get(table).ok_or_else(|| {
            StoreError::Config(format!("table '{table}' has no header_mapping entry"))
        })?;

        let mut columns: Vec<ColumnSpec> = Vec::new();
        for (source_label, declaration) in mapping {
            if source_label == PRIMARY_KEY_FIELD {
                continue;
            }
            let spec = parse_declaration(table, source_label, declaration)?;
            if columns.iter().any(|c| c.name == spec.name) {
                return Err(StoreError::Config(format!(
                    "table '{table}' declares column '{}' more than once",
                    spec.name
                )));
            }
            columns.push(spec);
        }
        if columns.is_empty() {
            return Err(StoreError::Config(format!(
                "table '{table}' declares no columns"
            )));
        }

        let raw_keys = mapping
            .get(PRIMARY_KEY_FIELD)
            .ok_or_else(|| StoreError::Config(format!("table '{table}' declares no PRIMARY KEY")))?;
        // A trailing comma from older authoring tools yields an empty token;
        // ignore it rather than reject the document.
        let primary_keys = raw_keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if primary_keys.is_empty() {
            return Err(StoreError::Config(format!(
                "table '{table}' has an empty PRIMARY KEY"
            )));
        }
        for key in &primary_keys {
            if !columns.iter().any(|c| &c.name == key) {
                return Err(StoreError::Config(format!(
                    "table '{table}' primary key '{key}' does not name a declared column"
                )));
            }
        }

        Ok(TableMapping {
            table: table.to_string(),
            columns,
            primary_keys,
        })
    }
}

fn parse_declaration(
    table: &str,
    source_label: &str,
    declaration: &str,
) -> Result<ColumnSpec, StoreError> {
    let mut parts = declaration.trim().splitn(2, ' ');
    let name = parts.next().unwrap_or_default().trim();
    let affinity = parts.next().unwrap_or_default().trim();
    if name.is_empty() || affinity.is_empty() {
        return Err(StoreError::Config(format!(
            "table '{table}' column '{source_label}': declaration '{declaration}' \
             must be '<column_name> <type_affinity>'"
        )));
    }
    if !is_valid_identifier(name) {
        return Err(StoreError::Config(format!(
            "table '{table}' column name '{name}' is not a valid identifier"
        )));
    }
    if !is_valid_affinity(affinity) {
        return Err(StoreError::Config(format!(
            "table '{table}' column '{name}': type affinity '{affinity}' is not allowed"
        )));
    }
    Ok(ColumnSpec {
        source_label: source_label.to_string(),
        name: name.to_string(),
        affinity: affinity.to_string(),
    })
}

/// Allow-list for every identifier spliced into generated SQL: leading
/// letter or underscore, then letters, digits, or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Allow-list for type affinity strings: words such as `INTEGER` or
/// `DOUBLE PRECISION`, optionally followed by a parenthesized size like
/// `VARCHAR(100)` or `DECIMAL(10,2)`.
fn is_valid_affinity(affinity: &str) -> bool {
    let (words, size) = match affinity.find('(') {
        Some(open) => {
            if !affinity.ends_with(')') {
                return false;
            }
            (
                &affinity[..open],
                Some(&affinity[open + 1..affinity.len() - 1]),
            )
        }
        None => (affinity, None),
    };
    let words = words.trim();
    if words.is_empty()
        || !words
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '_')
    {
        return false;
    }
    match size {
        None => true,
        Some(size) => {
            !size.is_empty()
                && size
                    .split(',')
                    .all(|n| !n.trim().is_empty() && n.trim().chars().all(|c| c.is_ascii_digit()))
        }
    }
}
