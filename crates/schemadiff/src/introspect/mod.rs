//! Catalog introspection.
//!
//! The differ reads metadata through [`CatalogIntrospector`] and nothing else.
//! Each implementation parses driver rows into [`RawColumn`] records once, so
//! no driver-specific types ever reach the comparison.

use std::future::Future;

use thiserror::Error;

pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

/// A base table visible through a catalog handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableEntry {
    /// The scope (database or schema) the table lives in.
    pub scope: String,
    /// Table name, exactly as the catalog reports it.
    pub name: String,
}

impl TableEntry {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

/// Nullability as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nullability {
    NoNulls,
    Nullable,
    #[default]
    Unknown,
}

impl From<bool> for Nullability {
    fn from(nullable: bool) -> Self {
        if nullable {
            Nullability::Nullable
        } else {
            Nullability::NoNulls
        }
    }
}

/// Column metadata as it comes out of the catalog, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawColumn {
    pub name: String,
    pub type_name: String,
    pub size: Option<i64>,
    pub decimal_digits: Option<i64>,
    pub nullable: Nullability,
    pub default_value: Option<String>,
    pub comment: Option<String>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn precision(mut self, size: i64, decimal_digits: i64) -> Self {
        self.size = Some(size);
        self.decimal_digits = Some(decimal_digits);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable.into();
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Errors raised while reading catalog metadata.
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "mysql")]
    #[error("mysql error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("no CREATE TABLE statement available for {scope}.{table}")]
    MissingCreateStatement { scope: String, table: String },

    #[error("connection has no default scope; name one explicitly")]
    NoScope,

    #[error("malformed metadata for table {table}: {message}")]
    Malformed { table: String, message: String },
}

/// Read access to one catalog scope.
///
/// Handles are owned and closed by the caller; the differ only reads.
pub trait CatalogIntrospector {
    /// The scope this handle compares (a MySQL database, a PostgreSQL schema).
    fn scope(&self) -> &str;

    /// Whether the handle can still be used.
    fn is_open(&self) -> bool {
        true
    }

    /// Every base table visible through this handle, in any scope.
    fn list_tables(&self) -> impl Future<Output = Result<Vec<TableEntry>, IntrospectError>> + Send;

    /// Raw column records for `table`, in ordinal order.
    fn list_columns(
        &self,
        scope: &str,
        table: &str,
    ) -> impl Future<Output = Result<Vec<RawColumn>, IntrospectError>> + Send;

    /// The literal `CREATE TABLE` statement for `table`.
    fn create_table_statement(
        &self,
        scope: &str,
        table: &str,
    ) -> impl Future<Output = Result<String, IntrospectError>> + Send;
}
