//! Normalized column model.

use std::fmt;

use indexmap::IndexMap;

use crate::introspect::{Nullability, RawColumn};

/// Columns of one table keyed by name, in introspection order.
pub type ColumnMap = IndexMap<String, Column>;

/// A column normalized for comparison.
///
/// Two columns are structurally equal when their type name, size, decimal
/// digits, nullability and default value match. The name is the lookup key
/// and the comment is documentation, so neither takes part in equality.
#[derive(Debug, Clone, Default)]
pub struct Column {
    pub name: String,
    pub type_name: String,
    /// Declared size, 0 when not applicable.
    pub size: u64,
    /// Declared scale, 0 when not applicable.
    pub decimal_digits: u64,
    pub nullable: bool,
    /// Default expression. `None` means no default, which is not the same as `Some("")`.
    pub default_value: Option<String>,
    pub comment: Option<String>,
}

impl Column {
    /// Normalize a raw catalog record.
    ///
    /// Missing or non-positive sizes become 0. Only an explicit
    /// [`Nullability::Nullable`] counts as nullable.
    pub fn normalize(raw: RawColumn) -> Self {
        Self {
            name: raw.name,
            type_name: raw.type_name,
            size: positive_or_zero(raw.size),
            decimal_digits: positive_or_zero(raw.decimal_digits),
            nullable: raw.nullable == Nullability::Nullable,
            default_value: raw.default_value,
            comment: raw.comment,
        }
    }

    pub fn structurally_equals(&self, other: &Column) -> bool {
        self.type_name == other.type_name
            && self.size == other.size
            && self.decimal_digits == other.decimal_digits
            && self.nullable == other.nullable
            && self.default_value == other.default_value
    }

    /// Canonical signature, e.g. `DECIMAL(10,2) NOT NULL DEFAULT 0.00`.
    pub fn signature(&self) -> String {
        self.to_string()
    }

    /// Rebuild the compared attributes from a rendered signature.
    ///
    /// Returns `None` when the text is not something [`Column::signature`]
    /// could have produced.
    pub fn from_signature(name: impl Into<String>, signature: &str) -> Option<Column> {
        let (head, default_value) = match signature.split_once(" DEFAULT ") {
            Some((head, default)) => (head, Some(default.to_string())),
            None => (signature, None),
        };

        let (head, nullable) = match head.strip_suffix(" NOT NULL") {
            Some(head) => (head, false),
            None => (head, true),
        };

        let (type_name, size, decimal_digits) = match head.strip_suffix(')') {
            Some(rest) => {
                let (type_name, args) = rest.rsplit_once('(')?;
                let (size, decimal_digits) = match args.split_once(',') {
                    Some((size, decimal)) => (size.parse().ok()?, decimal.parse().ok()?),
                    None => (args.parse().ok()?, 0),
                };
                if size == 0 {
                    return None;
                }
                (type_name, size, decimal_digits)
            }
            None => (head, 0, 0),
        };

        if type_name.is_empty() {
            return None;
        }

        Some(Column {
            name: name.into(),
            type_name: type_name.to_string(),
            size,
            decimal_digits,
            nullable,
            default_value,
            comment: None,
        })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if self.size > 0 {
            write!(f, "({}", self.size)?;
            if self.decimal_digits > 0 {
                write!(f, ",{}", self.decimal_digits)?;
            }
            write!(f, ")")?;
        }
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        if let Some(default) = &self.default_value {
            write!(f, " DEFAULT {}", default)?;
        }
        Ok(())
    }
}

/// Normalize raw records into a name-keyed map.
///
/// A name reported twice keeps its first position and its last record.
pub(crate) fn column_map(raw: Vec<RawColumn>) -> ColumnMap {
    let mut columns = ColumnMap::with_capacity(raw.len());
    for raw in raw {
        let column = Column::normalize(raw);
        columns.insert(column.name.clone(), column);
    }
    columns
}

fn positive_or_zero(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}
