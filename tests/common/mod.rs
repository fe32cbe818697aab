#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a single-table configuration for an `orders` table keyed on
    /// `order_id`, pointing at a store file inside the workspace.
    pub fn write_orders_config(&self, name: &str) -> PathBuf {
        let db_path = self.path().join("store.db");
        self.write(name, &orders_config_json(&db_path))
    }

    pub fn db_path(&self) -> PathBuf {
        self.path().join("store.db")
    }
}

/// Configuration document matching the shape produced by the authoring tool:
/// header renames with type affinities, a reserved PRIMARY KEY entry, view
/// metadata, and connection parameters.
pub fn orders_config_json(db_path: &Path) -> String {
    format!(
        r#"{{
    "header_mapping": {{
        "orders": {{
            "Order ID": "order_id INTEGER",
            "Customer": "customer VARCHAR(100)",
            "Amount": "amount REAL",
            "PRIMARY KEY": "order_id"
        }}
    }},
    "view_mapping": {{
        "orders": {{
            "graphs": {{
                "histogram": "amount",
                "bar": "",
                "pie": "customer",
                "line": "",
                "scatter": ""
            }},
            "filters": {{
                "categorical": "customer",
                "numerical": "amount",
                "date": ""
            }}
        }}
    }},
    "db_config": {{
        "db_path": "{}",
        "table_name": "orders",
        "batch_size": 1000
    }}
}}"#,
        db_path.display()
    )
}
