//! PostgreSQL catalog introspection over `tokio-postgres`.
//!
//! Everything is read from `information_schema`. A PostgreSQL scope is a
//! schema; the connection's `current_schema()` is used when none is given.

use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::Instrument;

use super::{CatalogIntrospector, IntrospectError, Nullability, RawColumn, TableEntry};
use crate::column::Column;
use crate::ddl::Dialect;

const LIST_TABLES: &str = r#"
    SELECT table_schema::text, table_name::text
    FROM information_schema.tables
    WHERE table_type = 'BASE TABLE'
      AND table_schema NOT IN ('pg_catalog', 'information_schema')
    ORDER BY table_schema, table_name
"#;

const TABLE_EXISTS: &str = r#"
    SELECT 1
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_name = $2 AND table_type = 'BASE TABLE'
"#;

const LIST_COLUMNS: &str = r#"
    SELECT
        column_name::text,
        udt_name::text,
        CASE
            WHEN character_maximum_length IS NOT NULL THEN character_maximum_length::int8
            WHEN numeric_precision_radix = 10 THEN numeric_precision::int8
        END AS size,
        numeric_scale::int8,
        is_nullable::text,
        column_default::text,
        pg_catalog.col_description(
            format('%I.%I', table_schema, table_name)::regclass::oid,
            ordinal_position::int
        ) AS comment
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

/// A catalog handle backed by a `tokio_postgres::Client`.
pub struct PgCatalog {
    client: Client,
    scope: String,
}

impl PgCatalog {
    /// Wrap an existing client. The caller keeps driving its connection.
    pub fn new(client: Client, scope: impl Into<String>) -> Self {
        Self {
            client,
            scope: scope.into(),
        }
    }

    /// Connect to `url` and compare `scope`, or the connection's current schema.
    pub async fn connect(url: &str, scope: Option<&str>) -> Result<Self, IntrospectError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("postgres connection error: {}", e);
            }
        });

        let scope = match scope {
            Some(scope) => scope.to_string(),
            None => {
                let row = client.query_one("SELECT current_schema()::text", &[]).await?;
                row.try_get::<_, Option<String>>(0)?
                    .ok_or(IntrospectError::NoScope)?
            }
        };

        tracing::info!(scope = %scope, "connected to postgres catalog");
        Ok(Self::new(client, scope))
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, tokio_postgres::Error> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql.trim(),
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let rows = self
            .client
            .query(sql, params)
            .instrument(span.clone())
            .await?;
        span.record("rows", rows.len());
        Ok(rows)
    }
}

impl CatalogIntrospector for PgCatalog {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn is_open(&self) -> bool {
        !self.client.is_closed()
    }

    async fn list_tables(&self) -> Result<Vec<TableEntry>, IntrospectError> {
        let rows = self.query(LIST_TABLES, &[]).await?;
        rows.iter()
            .map(|row| -> Result<TableEntry, IntrospectError> {
                Ok(TableEntry::new(
                    row.try_get::<_, String>(0)?,
                    row.try_get::<_, String>(1)?,
                ))
            })
            .collect()
    }

    async fn list_columns(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>, IntrospectError> {
        let rows = self.query(LIST_COLUMNS, &[&scope, &table]).await?;
        rows.iter().map(raw_column).collect()
    }

    async fn create_table_statement(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<String, IntrospectError> {
        let exists = self.query(TABLE_EXISTS, &[&scope, &table]).await?;
        if exists.is_empty() {
            return Err(IntrospectError::MissingCreateStatement {
                scope: scope.to_string(),
                table: table.to_string(),
            });
        }
        // PostgreSQL allows tables without columns.
        let columns = self.list_columns(scope, table).await?;
        Ok(create_table_sql(table, columns))
    }
}

fn raw_column(row: &Row) -> Result<RawColumn, IntrospectError> {
    let is_nullable: Option<String> = row.try_get(4)?;
    Ok(RawColumn {
        name: row.try_get(0)?,
        type_name: row.try_get(1)?,
        size: row.try_get(2)?,
        decimal_digits: row.try_get(3)?,
        nullable: match is_nullable.as_deref() {
            Some("YES") => Nullability::Nullable,
            Some("NO") => Nullability::NoNulls,
            _ => Nullability::Unknown,
        },
        default_value: row.try_get(5)?,
        comment: row.try_get(6)?,
    })
}

/// Assemble a `CREATE TABLE` statement from introspected columns.
///
/// PostgreSQL has no `SHOW CREATE TABLE`; the statement covers column
/// definitions only.
fn create_table_sql(table: &str, columns: Vec<RawColumn>) -> String {
    let dialect = Dialect::Postgres;
    if columns.is_empty() {
        return format!("CREATE TABLE {} ();", dialect.quote_ident(table));
    }
    let parts: Vec<String> = columns
        .into_iter()
        .map(Column::normalize)
        .map(|col| format!("    {} {}", dialect.quote_ident(&col.name), col.signature()))
        .collect();

    format!(
        "CREATE TABLE {} (\n{}\n);",
        dialect.quote_ident(table),
        parts.join(",\n")
    )
}
