//! MySQL catalog introspection over `sqlx`.
//!
//! A MySQL scope is a database. Column metadata comes from
//! `INFORMATION_SCHEMA.COLUMNS`; `CREATE TABLE` text comes from
//! `SHOW CREATE TABLE`.

use std::time::Duration;

use sqlx::Row;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use tracing::Instrument;

use super::{CatalogIntrospector, IntrospectError, Nullability, RawColumn, TableEntry};
use crate::ddl::Dialect;

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

// CAST to CHAR so collations that report VARBINARY still decode as strings.
const LIST_TABLES: &str = r#"
    SELECT
        CAST(TABLE_SCHEMA AS CHAR(255)) AS TABLE_SCHEMA,
        CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE'
      AND TABLE_SCHEMA NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')
    ORDER BY TABLE_SCHEMA, TABLE_NAME
"#;

const LIST_COLUMNS: &str = r#"
    SELECT
        CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(CONCAT(
            UPPER(DATA_TYPE),
            IF(COLUMN_TYPE LIKE '%unsigned%', ' UNSIGNED', '')
        ) AS CHAR(255)) AS TYPE_NAME,
        CAST(COALESCE(CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, DATETIME_PRECISION)
            AS SIGNED) AS COLUMN_SIZE,
        CAST(NUMERIC_SCALE AS SIGNED) AS DECIMAL_DIGITS,
        CAST(IS_NULLABLE AS CHAR(3)) AS IS_NULLABLE,
        CAST(COLUMN_DEFAULT AS CHAR) AS COLUMN_DEFAULT,
        CAST(COLUMN_COMMENT AS CHAR) AS COLUMN_COMMENT
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

/// A catalog handle backed by a `sqlx` MySQL pool.
pub struct MySqlCatalog {
    pool: MySqlPool,
    scope: String,
}

impl MySqlCatalog {
    /// Wrap an existing pool.
    pub fn new(pool: MySqlPool, scope: impl Into<String>) -> Self {
        Self {
            pool,
            scope: scope.into(),
        }
    }

    /// Connect to `url` and compare `scope`, or the database named in the URL.
    pub async fn connect(url: &str, scope: Option<&str>) -> Result<Self, IntrospectError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect(url)
            .await?;

        let scope = match scope {
            Some(scope) => scope.to_string(),
            None => sqlx::query("SELECT CAST(DATABASE() AS CHAR(255))")
                .fetch_one(&pool)
                .await?
                .try_get::<Option<String>, _>(0)?
                .ok_or(IntrospectError::NoScope)?,
        };

        tracing::info!(scope = %scope, "connected to mysql catalog");
        Ok(Self::new(pool, scope))
    }

    async fn fetch_all(&self, sql: &str, binds: &[&str]) -> Result<Vec<MySqlRow>, sqlx::Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql.trim(),
            params = binds.len(),
            rows = tracing::field::Empty,
        );
        let mut query = sqlx::query(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        let rows = query.fetch_all(&self.pool).instrument(span.clone()).await?;
        span.record("rows", rows.len());
        Ok(rows)
    }
}

impl CatalogIntrospector for MySqlCatalog {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn is_open(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn list_tables(&self) -> Result<Vec<TableEntry>, IntrospectError> {
        let rows = self.fetch_all(LIST_TABLES, &[]).await?;
        rows.iter()
            .map(|row| -> Result<TableEntry, IntrospectError> {
                Ok(TableEntry::new(
                    row.try_get::<String, _>("TABLE_SCHEMA")?,
                    row.try_get::<String, _>("TABLE_NAME")?,
                ))
            })
            .collect()
    }

    async fn list_columns(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>, IntrospectError> {
        let rows = self.fetch_all(LIST_COLUMNS, &[scope, table]).await?;
        rows.iter().map(raw_column).collect()
    }

    async fn create_table_statement(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<String, IntrospectError> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            Dialect::MySql.quote_ident(scope),
            Dialect::MySql.quote_ident(table)
        );
        let rows = self.fetch_all(&sql, &[]).await?;
        let missing = || IntrospectError::MissingCreateStatement {
            scope: scope.to_string(),
            table: table.to_string(),
        };

        // Column 0 is the table name, column 1 the statement.
        let row = rows.first().ok_or_else(missing)?;
        let statement: Option<String> = row.try_get(1)?;
        statement.filter(|s| !s.trim().is_empty()).ok_or_else(missing)
    }
}

fn raw_column(row: &MySqlRow) -> Result<RawColumn, IntrospectError> {
    let is_nullable: Option<String> = row.try_get("IS_NULLABLE")?;
    let comment: Option<String> = row.try_get("COLUMN_COMMENT")?;
    Ok(RawColumn {
        name: row.try_get("COLUMN_NAME")?,
        type_name: row.try_get("TYPE_NAME")?,
        size: row.try_get("COLUMN_SIZE")?,
        decimal_digits: row.try_get("DECIMAL_DIGITS")?,
        nullable: match is_nullable.as_deref() {
            Some("YES") => Nullability::Nullable,
            Some("NO") => Nullability::NoNulls,
            _ => Nullability::Unknown,
        },
        default_value: row.try_get("COLUMN_DEFAULT")?,
        comment: comment.filter(|c| !c.is_empty()),
    })
}
