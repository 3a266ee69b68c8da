//! Schema comparison between two catalog handles.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{Instrument, debug, info, info_span};

use crate::column::column_map;
use crate::diff::{ColumnDiff, SchemaDiff, TableDiff};
use crate::error::{Error, Side};
use crate::introspect::CatalogIntrospector;
use crate::Result;

/// Compare the tables in `source`'s scope against those in `target`'s scope.
///
/// Tables only the target has are `Added`, tables only the source has are
/// `Removed`, and tables on both sides with any column difference are
/// `Modified`. The result is sorted by table name.
///
/// Both handles are checked before anything is read. Any introspection
/// failure aborts the whole comparison.
pub async fn compare<S, T>(source: &S, target: &T) -> Result<SchemaDiff>
where
    S: CatalogIntrospector + Sync,
    T: CatalogIntrospector + Sync,
{
    check_open(source, Side::Source)?;
    check_open(target, Side::Target)?;

    let span = info_span!(
        "compare",
        source_scope = source.scope(),
        target_scope = target.scope()
    );
    compare_open(source, target).instrument(span).await
}

/// Like [`compare`], but with handles the caller may not have.
///
/// An absent handle is an [`Error::Precondition`]; the source is checked first.
pub async fn compare_handles<S, T>(source: Option<&S>, target: Option<&T>) -> Result<SchemaDiff>
where
    S: CatalogIntrospector + Sync,
    T: CatalogIntrospector + Sync,
{
    let source = source.ok_or(Error::Precondition { side: Side::Source })?;
    let target = target.ok_or(Error::Precondition { side: Side::Target })?;
    compare(source, target).await
}

/// Column-level differences for a table present on both sides.
///
/// Removed and retyped columns come first in source column order, then added
/// columns in target column order. An empty result means the table is unchanged.
pub async fn compare_columns<S, T>(source: &S, target: &T, table: &str) -> Result<Vec<ColumnDiff>>
where
    S: CatalogIntrospector + Sync,
    T: CatalogIntrospector + Sync,
{
    let source_columns = source
        .list_columns(source.scope(), table)
        .await
        .map_err(|e| Error::comparison(format!("reading source columns of {}", table), e))?;
    let target_columns = target
        .list_columns(target.scope(), table)
        .await
        .map_err(|e| Error::comparison(format!("reading target columns of {}", table), e))?;

    let source_columns = column_map(source_columns);
    let target_columns = column_map(target_columns);

    debug!(
        table,
        source = ?source_columns.keys().collect::<Vec<_>>(),
        target = ?target_columns.keys().collect::<Vec<_>>(),
        "column sets"
    );

    let mut diffs = Vec::new();

    for (name, source_column) in &source_columns {
        match target_columns.get(name) {
            None => {
                debug!(table, column = %name, "column removed");
                diffs.push(ColumnDiff::removed(name.clone(), source_column.signature()));
            }
            Some(target_column) if !source_column.structurally_equals(target_column) => {
                debug!(
                    table,
                    column = %name,
                    from = %source_column,
                    to = %target_column,
                    "column type changed"
                );
                diffs.push(ColumnDiff::type_changed(
                    name.clone(),
                    source_column.signature(),
                    target_column.signature(),
                ));
            }
            Some(_) => {}
        }
    }

    for (name, target_column) in &target_columns {
        if !source_columns.contains_key(name) {
            debug!(table, column = %name, "column added");
            diffs.push(ColumnDiff::added(name.clone(), target_column.signature()));
        }
    }

    Ok(diffs)
}

async fn compare_open<S, T>(source: &S, target: &T) -> Result<SchemaDiff>
where
    S: CatalogIntrospector + Sync,
    T: CatalogIntrospector + Sync,
{
    let source_tables = tables_in_scope(source, Side::Source).await?;
    let target_tables = tables_in_scope(target, Side::Target).await?;

    info!(
        source_tables = source_tables.len(),
        target_tables = target_tables.len(),
        "comparing schemas"
    );

    let mut table_diffs = Vec::new();

    for name in source_tables.difference(&target_tables) {
        let create = source
            .create_table_statement(source.scope(), name)
            .await
            .map_err(|e| Error::comparison(format!("reading source definition of {}", name), e))?;
        info!(table = %name, "table removed");
        table_diffs.push(TableDiff::removed(name.clone(), create));
    }

    for name in target_tables.difference(&source_tables) {
        let create = target
            .create_table_statement(target.scope(), name)
            .await
            .map_err(|e| Error::comparison(format!("reading target definition of {}", name), e))?;
        info!(table = %name, "table added");
        table_diffs.push(TableDiff::added(name.clone(), create));
    }

    for name in source_tables.intersection(&target_tables) {
        let columns = compare_columns(source, target, name).await?;
        if let Some(modified) = TableDiff::modified(name.clone(), columns) {
            info!(
                table = %name,
                changes = modified.column_diffs().len(),
                "table modified"
            );
            table_diffs.push(modified);
        }
    }

    let diff = SchemaDiff::new(table_diffs).sorted();
    info!(tables = diff.len(), changes = diff.change_count(), "comparison finished");
    Ok(diff)
}

fn check_open<C: CatalogIntrospector>(catalog: &C, side: Side) -> Result<()> {
    if catalog.is_open() {
        Ok(())
    } else {
        Err(Error::State { side })
    }
}

/// Table names in the handle's own scope.
async fn tables_in_scope<C>(catalog: &C, side: Side) -> Result<BTreeSet<String>>
where
    C: CatalogIntrospector + Sync,
{
    let entries = catalog
        .list_tables()
        .await
        .map_err(|e| Error::comparison(format!("listing {} tables", side), e))?;

    let mut by_scope: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in entries {
        by_scope.entry(entry.scope).or_default().insert(entry.name);
    }

    debug!(
        %side,
        scopes = ?by_scope.keys().collect::<Vec<_>>(),
        "tables grouped by scope"
    );

    Ok(by_scope.remove(catalog.scope()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ColumnDiffKind;
    use crate::introspect::RawColumn;
    use crate::introspect::memory::MemoryCatalog;

    fn users(columns: Vec<RawColumn>) -> MemoryCatalog {
        MemoryCatalog::new("app").table("users", "CREATE TABLE users (id int)", columns)
    }

    #[tokio::test]
    async fn column_order_is_source_then_target() {
        let source = users(vec![
            RawColumn::new("id", "INT").not_null(),
            RawColumn::new("age", "INT").nullable(true),
            RawColumn::new("name", "VARCHAR").size(50).nullable(true),
        ]);
        let target = users(vec![
            RawColumn::new("zip", "VARCHAR").size(10).nullable(true),
            RawColumn::new("id", "INT").not_null(),
            RawColumn::new("name", "VARCHAR").size(100).nullable(true),
            RawColumn::new("email", "VARCHAR").size(255).nullable(true),
        ]);

        let diffs = compare_columns(&source, &target, "users").await.unwrap();
        let summary: Vec<_> = diffs.iter().map(|d| (d.column_name(), d.kind())).collect();
        assert_eq!(
            summary,
            vec![
                ("age", ColumnDiffKind::Removed),
                ("name", ColumnDiffKind::TypeChanged),
                ("zip", ColumnDiffKind::Added),
                ("email", ColumnDiffKind::Added),
            ]
        );
    }

    #[tokio::test]
    async fn nullability_change_is_a_type_change() {
        let source = users(vec![RawColumn::new("id", "INT").nullable(true)]);
        let target = users(vec![RawColumn::new("id", "INT").not_null()]);

        let diffs = compare_columns(&source, &target, "users").await.unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].source_type(), Some("INT"));
        assert_eq!(diffs[0].target_type(), Some("INT NOT NULL"));
    }

    #[tokio::test]
    async fn other_scopes_are_ignored() {
        let catalog = MemoryCatalog::new("app")
            .table("users", "CREATE TABLE users (id int)", vec![])
            .table_in("mysql", "user", "CREATE TABLE user (id int)", vec![]);

        let tables = tables_in_scope(&catalog, Side::Source).await.unwrap();
        assert_eq!(tables.into_iter().collect::<Vec<_>>(), vec!["users".to_string()]);
    }
}
