//! Diff model - the immutable result of comparing two catalogs.
//!
//! A [`SchemaDiff`] holds one [`TableDiff`] per table that differs. Tables
//! that are identical on both sides produce no entry at all.
//!
//! ```text
//! Changes detected:
//!
//!   orders:
//!     + table
//!   users:
//!     ~ name: VARCHAR(50) -> VARCHAR(100)
//!     + email: VARCHAR(255)
//! ```

use std::fmt;

use crate::ddl::{self, Dialect, ScriptDirection};

/// What happened to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableDiffKind {
    /// Present in the target only.
    Added,
    /// Present in the source only.
    Removed,
    /// Present on both sides with differing columns.
    Modified,
}

/// What happened to a column of a modified table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnDiffKind {
    Added,
    Removed,
    TypeChanged,
}

/// One column-level change.
///
/// Types are rendered column signatures (see [`crate::Column::signature`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDiff {
    column_name: String,
    kind: ColumnDiffKind,
    source_type: Option<String>,
    target_type: Option<String>,
}

impl ColumnDiff {
    pub fn added(column_name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            kind: ColumnDiffKind::Added,
            source_type: None,
            target_type: Some(target_type.into()),
        }
    }

    pub fn removed(column_name: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            kind: ColumnDiffKind::Removed,
            source_type: Some(source_type.into()),
            target_type: None,
        }
    }

    pub fn type_changed(
        column_name: impl Into<String>,
        source_type: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            kind: ColumnDiffKind::TypeChanged,
            source_type: Some(source_type.into()),
            target_type: Some(target_type.into()),
        }
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn kind(&self) -> ColumnDiffKind {
        self.kind
    }

    /// Source signature; present for removed and changed columns.
    pub fn source_type(&self) -> Option<&str> {
        self.source_type.as_deref()
    }

    /// Target signature; present for added and changed columns.
    pub fn target_type(&self) -> Option<&str> {
        self.target_type.as_deref()
    }

    /// The same change seen from the other side.
    pub fn inverted(&self) -> Self {
        let kind = match self.kind {
            ColumnDiffKind::Added => ColumnDiffKind::Removed,
            ColumnDiffKind::Removed => ColumnDiffKind::Added,
            ColumnDiffKind::TypeChanged => ColumnDiffKind::TypeChanged,
        };
        Self {
            column_name: self.column_name.clone(),
            kind,
            source_type: self.target_type.clone(),
            target_type: self.source_type.clone(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        contains_lowercase(&self.column_name, needle)
            || self.source_type.as_deref().is_some_and(|t| contains_lowercase(t, needle))
            || self.target_type.as_deref().is_some_and(|t| contains_lowercase(t, needle))
    }
}

impl fmt::Display for ColumnDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.source_type.as_deref().unwrap_or_default();
        let target = self.target_type.as_deref().unwrap_or_default();
        match self.kind {
            ColumnDiffKind::Added => write!(f, "+ {}: {}", self.column_name, target),
            ColumnDiffKind::Removed => write!(f, "- {}: {}", self.column_name, source),
            ColumnDiffKind::TypeChanged => {
                write!(f, "~ {}: {} -> {}", self.column_name, source, target)
            }
        }
    }
}

/// One table-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDiff {
    table_name: String,
    kind: TableDiffKind,
    column_diffs: Vec<ColumnDiff>,
    create_table_sql: Option<String>,
}

impl TableDiff {
    /// A table only the target has, with the target's `CREATE TABLE` text.
    pub fn added(table_name: impl Into<String>, create_table_sql: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            kind: TableDiffKind::Added,
            column_diffs: Vec::new(),
            create_table_sql: Some(create_table_sql.into()),
        }
    }

    /// A table only the source has, with the source's `CREATE TABLE` text.
    pub fn removed(table_name: impl Into<String>, create_table_sql: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            kind: TableDiffKind::Removed,
            column_diffs: Vec::new(),
            create_table_sql: Some(create_table_sql.into()),
        }
    }

    /// A table present on both sides. Returns `None` when there is nothing to report.
    pub fn modified(table_name: impl Into<String>, column_diffs: Vec<ColumnDiff>) -> Option<Self> {
        if column_diffs.is_empty() {
            return None;
        }
        Some(Self {
            table_name: table_name.into(),
            kind: TableDiffKind::Modified,
            column_diffs,
            create_table_sql: None,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn kind(&self) -> TableDiffKind {
        self.kind
    }

    /// Column changes; empty unless the table was modified.
    pub fn column_diffs(&self) -> &[ColumnDiff] {
        &self.column_diffs
    }

    /// Literal DDL; present for added and removed tables only.
    pub fn create_table_sql(&self) -> Option<&str> {
        self.create_table_sql.as_deref()
    }

    pub fn inverted(&self) -> Self {
        let kind = match self.kind {
            TableDiffKind::Added => TableDiffKind::Removed,
            TableDiffKind::Removed => TableDiffKind::Added,
            TableDiffKind::Modified => TableDiffKind::Modified,
        };
        Self {
            table_name: self.table_name.clone(),
            kind,
            column_diffs: self.column_diffs.iter().map(ColumnDiff::inverted).collect(),
            create_table_sql: self.create_table_sql.clone(),
        }
    }

    /// Case-insensitive search over the table name, column names and column types.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        contains_lowercase(&self.table_name, &needle)
            || self.column_diffs.iter().any(|c| c.matches(&needle))
    }
}

/// A diff between two catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    table_diffs: Vec<TableDiff>,
}

impl SchemaDiff {
    pub fn new(table_diffs: Vec<TableDiff>) -> Self {
        Self { table_diffs }
    }

    /// One entry per differing table.
    pub fn table_diffs(&self) -> &[TableDiff] {
        &self.table_diffs
    }

    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.table_diffs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.table_diffs.len()
    }

    /// Count changes: one per added or removed table, one per column change.
    pub fn change_count(&self) -> usize {
        self.table_diffs
            .iter()
            .map(|t| match t.kind {
                TableDiffKind::Modified => t.column_diffs.len(),
                TableDiffKind::Added | TableDiffKind::Removed => 1,
            })
            .sum()
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for table in &self.table_diffs {
            match table.kind {
                TableDiffKind::Added => summary.added_tables += 1,
                TableDiffKind::Removed => summary.removed_tables += 1,
                TableDiffKind::Modified => {
                    summary.modified_tables += 1;
                    for column in &table.column_diffs {
                        match column.kind {
                            ColumnDiffKind::Added => summary.added_columns += 1,
                            ColumnDiffKind::Removed => summary.removed_columns += 1,
                            ColumnDiffKind::TypeChanged => summary.changed_columns += 1,
                        }
                    }
                }
            }
        }
        summary
    }

    /// Keep only the tables matching `query` (see [`TableDiff::matches`]).
    pub fn filter(&self, query: &str) -> SchemaDiff {
        if query.is_empty() {
            return self.clone();
        }
        SchemaDiff {
            table_diffs: self
                .table_diffs
                .iter()
                .filter(|t| t.matches(query))
                .cloned()
                .collect(),
        }
    }

    /// Sorted by table name, then kind.
    pub fn sorted(mut self) -> SchemaDiff {
        self.table_diffs
            .sort_by(|a, b| (&a.table_name, a.kind).cmp(&(&b.table_name, b.kind)));
        self
    }

    /// The diff of the opposite comparison direction.
    pub fn inverted(&self) -> SchemaDiff {
        SchemaDiff {
            table_diffs: self.table_diffs.iter().map(TableDiff::inverted).collect(),
        }
    }

    /// Forward reconciliation script in the MySQL dialect.
    pub fn to_sql(&self) -> String {
        ddl::reconciliation_script(self, Dialect::MySql, ScriptDirection::Forward)
    }
}

impl IntoIterator for SchemaDiff {
    type Item = TableDiff;
    type IntoIter = std::vec::IntoIter<TableDiff>;

    fn into_iter(self) -> Self::IntoIter {
        self.table_diffs.into_iter()
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            writeln!(f, "No changes detected.")?;
        } else {
            writeln!(f, "Changes detected:\n")?;
            for table_diff in &self.table_diffs {
                writeln!(f, "  {}:", table_diff.table_name)?;
                match table_diff.kind {
                    TableDiffKind::Added => writeln!(f, "    + table")?,
                    TableDiffKind::Removed => writeln!(f, "    - table")?,
                    TableDiffKind::Modified => {
                        for column in &table_diff.column_diffs {
                            writeln!(f, "    {}", column)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Change counts, as shown in the summary block of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added_tables: usize,
    pub removed_tables: usize,
    pub modified_tables: usize,
    pub added_columns: usize,
    pub removed_columns: usize,
    pub changed_columns: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tables:  {} added, {} removed, {} modified",
            self.added_tables, self.removed_tables, self.modified_tables
        )?;
        write!(
            f,
            "columns: {} added, {} removed, {} changed",
            self.added_columns, self.removed_columns, self.changed_columns
        )
    }
}

fn contains_lowercase(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
