//! Opening a saved connection as a catalog handle.

use schemadiff::{
    CatalogIntrospector, Dialect, IntrospectError, MySqlCatalog, PgCatalog, RawColumn, TableEntry,
};

use crate::config::ConnectionConfig;

/// A live catalog of either supported engine.
pub enum AnyCatalog {
    Postgres(PgCatalog),
    MySql(MySqlCatalog),
}

impl AnyCatalog {
    /// Connect using the engine implied by the URL scheme.
    pub async fn open(connection: &ConnectionConfig) -> Result<Self, IntrospectError> {
        let url = connection.normalized_url();
        let scope = connection.scope.as_deref();
        match Dialect::from_url(&url) {
            Dialect::Postgres => Ok(AnyCatalog::Postgres(PgCatalog::connect(&url, scope).await?)),
            Dialect::MySql => Ok(AnyCatalog::MySql(MySqlCatalog::connect(&url, scope).await?)),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            AnyCatalog::Postgres(_) => Dialect::Postgres,
            AnyCatalog::MySql(_) => Dialect::MySql,
        }
    }
}

impl CatalogIntrospector for AnyCatalog {
    fn scope(&self) -> &str {
        match self {
            AnyCatalog::Postgres(c) => c.scope(),
            AnyCatalog::MySql(c) => c.scope(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            AnyCatalog::Postgres(c) => c.is_open(),
            AnyCatalog::MySql(c) => c.is_open(),
        }
    }

    async fn list_tables(&self) -> Result<Vec<TableEntry>, IntrospectError> {
        match self {
            AnyCatalog::Postgres(c) => c.list_tables().await,
            AnyCatalog::MySql(c) => c.list_tables().await,
        }
    }

    async fn list_columns(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>, IntrospectError> {
        match self {
            AnyCatalog::Postgres(c) => c.list_columns(scope, table).await,
            AnyCatalog::MySql(c) => c.list_columns(scope, table).await,
        }
    }

    async fn create_table_statement(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<String, IntrospectError> {
        match self {
            AnyCatalog::Postgres(c) => c.create_table_statement(scope, table).await,
            AnyCatalog::MySql(c) => c.create_table_statement(scope, table).await,
        }
    }
}
