use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

/// Gates whether a given named table is persisted at all, and where.
///
/// Kept verbatim from the teacher's `record_persist::config::PersistConfig` — the write
/// path's on/off switch is orthogonal to everything this crate adds around schema
/// projection and materialization.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct PersistConfig {
    #[serde(default)]
    pub directory: String,
    /// if set to true will append to existing files, when false will remove all existing parquet files
    #[serde(default)]
    pub keep: bool,
    /// if set will only record tables matching that name, if empty will assume you want to persist everything
    #[serde(default)]
    pub tables: HashSet<String>,
}

impl PersistConfig {
    pub fn new(directory: &str, table: &str) -> Self {
        let mut tables = HashSet::new();
        tables.insert(table.to_owned());

        Self {
            directory: directory.to_owned(),
            keep: false,
            tables,
        }
    }
}

impl fmt::Display for PersistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PersistConfig {{ directory: \"{}\", keep: {}, tables: {:?} }}",
            self.directory,
            self.keep,
            if self.tables.is_empty() {
                "all".to_string()
            } else {
                format!("{:?}", self.tables)
            }
        )
    }
}

/// Target-name resolution order for both write and read (spec §4.6): explicit alias beats
/// the configured strategy, which beats the source name verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    #[default]
    FieldName,
    SnakeCase,
    /// Read-only: try an exact match first, then fall back to the snake-case transform.
    BestEffort,
}

impl NamingStrategy {
    pub fn resolve(&self, source_name: &str) -> String {
        match self {
            NamingStrategy::FieldName | NamingStrategy::BestEffort => source_name.to_string(),
            NamingStrategy::SnakeCase => to_snake_case(source_name),
        }
    }
}

pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.char_indices() {
        if c.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The three cross-cutting read-side policy flags (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderPolicy {
    pub fail_on_missing_column: bool,
    pub fail_on_null_for_primitive: bool,
    pub fail_on_narrowing: bool,
    pub naming_strategy: NamingStrategy,
}

impl Default for ReaderPolicy {
    fn default() -> Self {
        ReaderPolicy {
            fail_on_missing_column: true,
            fail_on_null_for_primitive: false,
            fail_on_narrowing: false,
            naming_strategy: NamingStrategy::BestEffort,
        }
    }
}
