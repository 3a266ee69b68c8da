//! Schema comparison and DDL synthesis for relational catalogs.
//!
//! This crate provides:
//! - A normalized column model with structural equality
//! - A differ that compares two live catalogs table by table, column by column
//! - A synthesizer that turns the resulting diff into `CREATE` / `ALTER` / `DROP` scripts
//!
//! The differ never talks to a driver directly. It consumes anything that
//! implements [`CatalogIntrospector`]; PostgreSQL and MySQL implementations
//! ship behind the `postgres` and `mysql` features, and [`MemoryCatalog`]
//! holds a snapshot in memory.
//!
//! # Example
//!
//! ```ignore
//! let source = MySqlCatalog::connect("mysql://root@localhost/app_v1", None).await?;
//! let target = MySqlCatalog::connect("mysql://root@localhost/app_v2", None).await?;
//!
//! let diff = schemadiff::compare(&source, &target).await?;
//! println!("{diff}");
//! println!("{}", diff.to_sql());
//! ```
//!
//! # Identifier case
//!
//! Table and column names are matched by exact string comparison, using
//! whatever case the catalogs report. Comparing a case-folding engine with a
//! case-preserving one can therefore report the "same" table as removed on
//! one side and added on the other.

mod column;
mod compare;
pub mod ddl;
mod diff;
mod error;
pub mod introspect;

pub use column::{Column, ColumnMap};
pub use compare::{compare, compare_columns, compare_handles};
pub use ddl::{Dialect, ScriptDirection, SqlScripts};
pub use diff::{ColumnDiff, ColumnDiffKind, DiffSummary, SchemaDiff, TableDiff, TableDiffKind};
pub use error::{Error, Side};
pub use introspect::memory::MemoryCatalog;
pub use introspect::{CatalogIntrospector, IntrospectError, Nullability, RawColumn, TableEntry};

#[cfg(feature = "mysql")]
pub use introspect::mysql::MySqlCatalog;
#[cfg(feature = "postgres")]
pub use introspect::postgres::PgCatalog;

/// Result type for schemadiff operations.
pub type Result<T> = std::result::Result<T, Error>;
