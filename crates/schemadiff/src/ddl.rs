//! DDL synthesis - turn a [`SchemaDiff`] into SQL text.
//!
//! Three blocks come out of a diff:
//!
//! - tables missing in the source (the target's `CREATE TABLE` statements)
//! - tables missing in the target (the source's `CREATE TABLE` statements)
//! - one `ALTER TABLE` per modified table
//!
//! Column types are replayed from the rendered signatures verbatim. Nothing
//! here translates types between engines; only identifier quoting depends on
//! the [`Dialect`].

use crate::diff::{ColumnDiff, ColumnDiffKind, SchemaDiff, TableDiff, TableDiffKind};

/// Identifier quoting convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Backtick quoting.
    #[default]
    MySql,
    /// Double-quote quoting.
    Postgres,
}

impl Dialect {
    /// Infer the dialect from a connection URL scheme. Anything that is not
    /// PostgreSQL is treated as MySQL.
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split("://").next().unwrap_or_default().to_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Dialect::Postgres,
            _ => Dialect::MySql,
        }
    }

    /// Quote an identifier, doubling any embedded quote character.
    ///
    /// # Example
    /// ```
    /// use schemadiff::Dialect;
    /// assert_eq!(Dialect::MySql.quote_ident("order"), "`order`");
    /// assert_eq!(Dialect::Postgres.quote_ident("bla\"h"), "\"bla\"\"h\"");
    /// ```
    pub fn quote_ident(&self, name: &str) -> String {
        let quote = match self {
            Dialect::MySql => '`',
            Dialect::Postgres => '"',
        };
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(quote);
        for c in name.chars() {
            if c == quote {
                quoted.push(quote);
            }
            quoted.push(c);
        }
        quoted.push(quote);
        quoted
    }
}

/// Which way a reconciliation script points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptDirection {
    /// Bring the source schema in line with the target: create added tables,
    /// drop removed ones, alter modified ones to the target's column types.
    #[default]
    Forward,
    /// Bring the target schema in line with the source.
    Reverse,
}

/// The three synthesis blocks for one diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlScripts {
    /// `CREATE TABLE` statements for tables only the target has.
    pub missing_in_source: String,
    /// `CREATE TABLE` statements for tables only the source has.
    pub missing_in_target: String,
    /// `ALTER TABLE` statements for modified tables.
    pub alterations: String,
}

impl SqlScripts {
    pub fn is_empty(&self) -> bool {
        self.missing_in_source.is_empty()
            && self.missing_in_target.is_empty()
            && self.alterations.is_empty()
    }
}

/// Trim a statement and make sure it ends with `;`.
pub fn terminate(sql: &str) -> String {
    let sql = sql.trim();
    if sql.ends_with(';') {
        sql.to_string()
    } else {
        format!("{};", sql)
    }
}

/// Build the three synthesis blocks.
pub fn synthesize(diff: &SchemaDiff, dialect: Dialect) -> SqlScripts {
    let mut scripts = SqlScripts::default();

    for table in diff.table_diffs() {
        match table.kind() {
            TableDiffKind::Added => {
                push_create(&mut scripts.missing_in_source, "missing in source", table);
            }
            TableDiffKind::Removed => {
                push_create(&mut scripts.missing_in_target, "missing in target", table);
            }
            TableDiffKind::Modified => {
                if let Some(alter) = alter_table_sql(table, dialect) {
                    scripts.alterations.push_str(&format!(
                        "-- Table altered: {}\n{}\n\n",
                        table.table_name(),
                        alter
                    ));
                }
            }
        }
    }

    scripts
}

/// One `ALTER TABLE` statement covering every column change of a modified table.
///
/// Returns `None` for tables that are not modified.
pub fn alter_table_sql(table: &TableDiff, dialect: Dialect) -> Option<String> {
    if table.kind() != TableDiffKind::Modified || table.column_diffs().is_empty() {
        return None;
    }

    let clauses: Vec<String> = table
        .column_diffs()
        .iter()
        .map(|column| format!("  {}", column_clause(column, dialect)))
        .collect();

    Some(format!(
        "ALTER TABLE {}\n{};",
        dialect.quote_ident(table.table_name()),
        clauses.join(",\n")
    ))
}

/// The clause for one column change.
pub fn column_clause(column: &ColumnDiff, dialect: Dialect) -> String {
    let name = dialect.quote_ident(column.column_name());
    let target_type = column.target_type().unwrap_or_default();
    match column.kind() {
        ColumnDiffKind::Added => format!("ADD COLUMN {} {}", name, target_type),
        ColumnDiffKind::Removed => format!("DROP COLUMN {}", name),
        ColumnDiffKind::TypeChanged => format!("MODIFY COLUMN {} {}", name, target_type),
    }
}

/// A whole-database script applying every change in one direction.
pub fn reconciliation_script(
    diff: &SchemaDiff,
    dialect: Dialect,
    direction: ScriptDirection,
) -> String {
    let inverted;
    let diff = match direction {
        ScriptDirection::Forward => diff,
        ScriptDirection::Reverse => {
            inverted = diff.inverted();
            &inverted
        }
    };

    let mut sql = String::new();
    for table in diff.table_diffs() {
        match table.kind() {
            TableDiffKind::Added => {
                let create = table.create_table_sql().unwrap_or_default();
                sql.push_str(&format!("-- Create table: {}\n", table.table_name()));
                sql.push_str(&terminate(create));
                sql.push_str("\n\n");
            }
            TableDiffKind::Removed => {
                sql.push_str(&format!("-- Drop table: {}\n", table.table_name()));
                sql.push_str(&format!(
                    "DROP TABLE IF EXISTS {};\n\n",
                    dialect.quote_ident(table.table_name())
                ));
            }
            TableDiffKind::Modified => {
                if let Some(alter) = alter_table_sql(table, dialect) {
                    sql.push_str(&format!("-- Alter table: {}\n", table.table_name()));
                    sql.push_str(&alter);
                    sql.push_str("\n\n");
                }
            }
        }
    }
    sql
}

fn push_create(script: &mut String, label: &str, table: &TableDiff) {
    let create = table.create_table_sql().unwrap_or_default();
    script.push_str(&format!(
        "-- Table {}: {}\n{}\n\n",
        label,
        table.table_name(),
        terminate(create)
    ));
}
