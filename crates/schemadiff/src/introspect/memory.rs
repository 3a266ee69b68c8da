//! In-memory catalog snapshot.

use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;

use super::{CatalogIntrospector, IntrospectError, RawColumn, TableEntry};

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<RawColumn>,
    create_sql: String,
}

/// A catalog held entirely in memory.
///
/// # Example
///
/// ```
/// use schemadiff::{MemoryCatalog, RawColumn};
///
/// let catalog = MemoryCatalog::new("shop")
///     .table(
///         "users",
///         "CREATE TABLE `users` (`id` int NOT NULL)",
///         vec![RawColumn::new("id", "INT").not_null()],
///     );
/// ```
#[derive(Debug)]
pub struct MemoryCatalog {
    scope: String,
    tables: IndexMap<(String, String), MemoryTable>,
    closed: AtomicBool,
}

impl MemoryCatalog {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            tables: IndexMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Add a table to this catalog's own scope.
    pub fn table(
        self,
        name: impl Into<String>,
        create_sql: impl Into<String>,
        columns: Vec<RawColumn>,
    ) -> Self {
        let scope = self.scope.clone();
        self.table_in(scope, name, create_sql, columns)
    }

    /// Add a table to another scope visible through the same handle.
    pub fn table_in(
        mut self,
        scope: impl Into<String>,
        name: impl Into<String>,
        create_sql: impl Into<String>,
        columns: Vec<RawColumn>,
    ) -> Self {
        self.tables.insert(
            (scope.into(), name.into()),
            MemoryTable {
                columns,
                create_sql: create_sql.into(),
            },
        );
        self
    }

    /// Mark the handle closed. Later comparisons fail before reading anything.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn get(&self, scope: &str, table: &str) -> Result<&MemoryTable, IntrospectError> {
        self.tables
            .get(&(scope.to_string(), table.to_string()))
            .ok_or_else(|| IntrospectError::Malformed {
                table: format!("{}.{}", scope, table),
                message: "table not found".to_string(),
            })
    }
}

impl CatalogIntrospector for MemoryCatalog {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn list_tables(&self) -> Result<Vec<TableEntry>, IntrospectError> {
        Ok(self
            .tables
            .keys()
            .map(|(scope, name)| TableEntry::new(scope.clone(), name.clone()))
            .collect())
    }

    async fn list_columns(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>, IntrospectError> {
        Ok(self.get(scope, table)?.columns.clone())
    }

    async fn create_table_statement(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<String, IntrospectError> {
        let table_def = self.get(scope, table)?;
        if table_def.create_sql.trim().is_empty() {
            return Err(IntrospectError::MissingCreateStatement {
                scope: scope.to_string(),
                table: table.to_string(),
            });
        }
        Ok(table_def.create_sql.clone())
    }
}
