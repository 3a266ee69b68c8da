//! End-to-end comparisons over in-memory catalogs.

use std::collections::BTreeMap;

use proptest::prelude::*;
use schemadiff::{
    CatalogIntrospector, ColumnDiffKind, Dialect, Error, IntrospectError, MemoryCatalog,
    RawColumn, SchemaDiff, Side, TableDiffKind, TableEntry, compare, compare_handles,
};

const USERS_V1: &str = "CREATE TABLE `users` (\n  `id` int NOT NULL,\n  `name` varchar(50)\n)";
const USERS_V2: &str = "CREATE TABLE `users` (\n  `id` int NOT NULL,\n  `name` varchar(100),\n  `email` varchar(255)\n)";
const ORDERS: &str = "CREATE TABLE `orders` (\n  `id` int NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB";
const PRODUCTS: &str = "CREATE TABLE `products` (`sku` varchar(32) NOT NULL)";
const LEGACY_LOG: &str = "CREATE TABLE `legacy_log` (`id` int NOT NULL, `line` text)";

fn products() -> Vec<RawColumn> {
    vec![
        RawColumn::new("sku", "VARCHAR").size(32).not_null(),
        RawColumn::new("price", "DECIMAL")
            .precision(10, 2)
            .not_null()
            .default_value("0.00")
            .comment("unit price"),
    ]
}

fn source() -> MemoryCatalog {
    MemoryCatalog::new("shop")
        .table(
            "users",
            USERS_V1,
            vec![
                RawColumn::new("id", "INT").not_null(),
                RawColumn::new("name", "VARCHAR").size(50).nullable(true),
            ],
        )
        .table("products", PRODUCTS, products())
        .table(
            "legacy_log",
            LEGACY_LOG,
            vec![
                RawColumn::new("id", "INT").not_null(),
                RawColumn::new("line", "TEXT").nullable(true),
            ],
        )
}

fn target() -> MemoryCatalog {
    MemoryCatalog::new("shop")
        .table(
            "users",
            USERS_V2,
            vec![
                RawColumn::new("id", "INT").not_null(),
                RawColumn::new("name", "VARCHAR").size(100).nullable(true),
                RawColumn::new("email", "VARCHAR").size(255).nullable(true),
            ],
        )
        .table(
            "orders",
            ORDERS,
            vec![RawColumn::new("id", "INT").not_null()],
        )
        .table("products", PRODUCTS, products())
}

#[tokio::test]
async fn added_and_modified_tables() {
    let diff = compare(&source(), &target()).await.unwrap();

    let names: Vec<_> = diff.table_diffs().iter().map(|t| t.table_name()).collect();
    assert_eq!(names, vec!["legacy_log", "orders", "users"]);

    let orders = &diff.table_diffs()[1];
    assert_eq!(orders.kind(), TableDiffKind::Added);
    assert_eq!(orders.create_table_sql(), Some(ORDERS));
    assert!(orders.column_diffs().is_empty());

    let users = &diff.table_diffs()[2];
    assert_eq!(users.kind(), TableDiffKind::Modified);
    assert_eq!(users.create_table_sql(), None);
    let columns = users.column_diffs();
    assert_eq!(columns.len(), 2);

    assert_eq!(columns[0].column_name(), "name");
    assert_eq!(columns[0].kind(), ColumnDiffKind::TypeChanged);
    assert_eq!(columns[0].source_type(), Some("VARCHAR(50)"));
    assert_eq!(columns[0].target_type(), Some("VARCHAR(100)"));

    assert_eq!(columns[1].column_name(), "email");
    assert_eq!(columns[1].kind(), ColumnDiffKind::Added);
    assert_eq!(columns[1].source_type(), None);
    assert_eq!(columns[1].target_type(), Some("VARCHAR(255)"));
}

#[tokio::test]
async fn identical_tables_produce_no_diff() {
    let diff = compare(&source(), &target()).await.unwrap();
    assert!(diff.table_diffs().iter().all(|t| t.table_name() != "products"));
}

#[tokio::test]
async fn removed_table_is_dropped_by_script() {
    let diff = compare(&source(), &target()).await.unwrap();

    let legacy = &diff.table_diffs()[0];
    assert_eq!(legacy.table_name(), "legacy_log");
    assert_eq!(legacy.kind(), TableDiffKind::Removed);
    assert_eq!(legacy.create_table_sql(), Some(LEGACY_LOG));

    assert!(diff.to_sql().contains("DROP TABLE IF EXISTS `legacy_log`;"));
}

#[tokio::test]
async fn full_report() {
    let diff = compare(&source(), &target()).await.unwrap();
    insta::assert_snapshot!(diff.to_string().trim_end(), @r"
    Changes detected:

      legacy_log:
        - table
      orders:
        + table
      users:
        ~ name: VARCHAR(50) -> VARCHAR(100)
        + email: VARCHAR(255)
    ");
    assert_eq!(diff.change_count(), 4);
}

#[tokio::test]
async fn added_table_script_carries_target_statement() {
    let diff = compare(&source(), &target()).await.unwrap();
    let scripts = schemadiff::ddl::synthesize(&diff, Dialect::MySql);
    assert!(
        scripts
            .missing_in_source
            .contains(&format!("{};", ORDERS))
    );
    assert!(scripts.missing_in_target.contains(&format!("{};", LEGACY_LOG)));
}

#[tokio::test]
async fn comparing_a_catalog_with_itself_is_empty() {
    let catalog = source();
    let diff = compare(&catalog, &catalog).await.unwrap();
    assert!(diff.is_empty());
    assert_eq!(diff.to_string(), "No changes detected.\n");
}

#[tokio::test]
async fn comment_only_change_is_ignored() {
    let a = MemoryCatalog::new("app").table(
        "t",
        "CREATE TABLE t (x int)",
        vec![RawColumn::new("x", "INT").nullable(true).comment("old")],
    );
    let b = MemoryCatalog::new("app").table(
        "t",
        "CREATE TABLE t (x int)",
        vec![RawColumn::new("x", "INT").nullable(true).comment("new")],
    );
    assert!(compare(&a, &b).await.unwrap().is_empty());
}

#[tokio::test]
async fn tables_outside_the_scope_are_ignored() {
    let a = MemoryCatalog::new("app")
        .table("users", "CREATE TABLE users (id int)", vec![])
        .table_in("mysql", "user", "CREATE TABLE user (id int)", vec![]);
    let b = MemoryCatalog::new("app")
        .table("users", "CREATE TABLE users (id int)", vec![])
        .table_in("sys", "config", "CREATE TABLE config (id int)", vec![]);
    assert!(compare(&a, &b).await.unwrap().is_empty());
}

#[tokio::test]
async fn scopes_may_differ_between_sides() {
    let a = MemoryCatalog::new("app_v1").table("users", "CREATE TABLE users (id int)", vec![]);
    let b = MemoryCatalog::new("app_v2")
        .table("users", "CREATE TABLE users (id int)", vec![])
        .table_in("app_v1", "ghost", "CREATE TABLE ghost (id int)", vec![]);
    assert!(compare(&a, &b).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_handles_are_rejected() {
    let catalog = source();

    let err = compare_handles(None::<&MemoryCatalog>, Some(&catalog))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition { side: Side::Source }));

    let err = compare_handles(Some(&catalog), None::<&MemoryCatalog>)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition { side: Side::Target }));

    let err = compare_handles(None::<&MemoryCatalog>, None::<&MemoryCatalog>)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition { side: Side::Source }));
    assert_eq!(err.to_string(), "source catalog handle is required");
}

#[tokio::test]
async fn closed_handles_are_rejected() {
    let open = source();
    let closed = target();
    closed.close();

    let err = compare(&open, &closed).await.unwrap_err();
    assert!(matches!(err, Error::State { side: Side::Target }));

    let err = compare(&closed, &open).await.unwrap_err();
    assert!(matches!(err, Error::State { side: Side::Source }));
}

/// Counts calls and fails every column read.
struct Broken {
    reads: std::sync::atomic::AtomicUsize,
    open: bool,
}

impl Broken {
    fn new(open: bool) -> Self {
        Self {
            reads: Default::default(),
            open,
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn touch(&self) {
        self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

impl CatalogIntrospector for Broken {
    fn scope(&self) -> &str {
        "shop"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn list_tables(&self) -> Result<Vec<TableEntry>, IntrospectError> {
        self.touch();
        Ok(vec![TableEntry::new("shop", "users")])
    }

    async fn list_columns(
        &self,
        _scope: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>, IntrospectError> {
        self.touch();
        Err(IntrospectError::Malformed {
            table: table.to_string(),
            message: "connection reset".to_string(),
        })
    }

    async fn create_table_statement(
        &self,
        scope: &str,
        table: &str,
    ) -> Result<String, IntrospectError> {
        self.touch();
        Err(IntrospectError::MissingCreateStatement {
            scope: scope.to_string(),
            table: table.to_string(),
        })
    }
}

#[tokio::test]
async fn introspection_failure_aborts_with_cause() {
    let broken = Broken::new(true);
    let err = compare(&source(), &broken).await.unwrap_err();

    let Error::Comparison { context, source } = &err else {
        panic!("expected a comparison error, got {err:?}");
    };
    assert!(context.contains("users"));
    assert!(matches!(source, IntrospectError::Malformed { .. }));

    let cause = std::error::Error::source(&err).unwrap();
    assert!(cause.to_string().contains("connection reset"));
    assert!(err.format_detailed().contains("Caused by:"));
}

#[tokio::test]
async fn missing_create_statement_aborts() {
    let broken = Broken::new(true);
    let empty = MemoryCatalog::new("shop");
    let err = compare(&broken, &empty).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Comparison {
            source: IntrospectError::MissingCreateStatement { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn closed_handle_is_never_read() {
    let broken = Broken::new(false);
    let err = compare(&source(), &broken).await.unwrap_err();
    assert!(matches!(err, Error::State { side: Side::Target }));
    assert_eq!(broken.reads(), 0);
}

/// Refuses to enumerate its tables.
struct Unlisted;

impl CatalogIntrospector for Unlisted {
    fn scope(&self) -> &str {
        "shop"
    }

    async fn list_tables(&self) -> Result<Vec<TableEntry>, IntrospectError> {
        Err(IntrospectError::Malformed {
            table: "*".to_string(),
            message: "permission denied".to_string(),
        })
    }

    async fn list_columns(
        &self,
        _scope: &str,
        _table: &str,
    ) -> Result<Vec<RawColumn>, IntrospectError> {
        Ok(Vec::new())
    }

    async fn create_table_statement(
        &self,
        _scope: &str,
        _table: &str,
    ) -> Result<String, IntrospectError> {
        Ok(String::new())
    }
}

#[tokio::test]
async fn table_listing_failure_names_the_side() {
    let empty = MemoryCatalog::new("shop");

    for (err, side) in [
        (compare(&Unlisted, &empty).await.unwrap_err(), "source"),
        (compare(&empty, &Unlisted).await.unwrap_err(), "target"),
    ] {
        let Error::Comparison { context, source } = &err else {
            panic!("expected a comparison error, got {err:?}");
        };
        assert_eq!(context, &format!("listing {side} tables"));
        assert!(matches!(source, IntrospectError::Malformed { .. }));

        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.to_string().contains("permission denied"));
    }
}

// Property tests over generated schemas.

type Schema = BTreeMap<String, Vec<(String, usize, bool, bool)>>;

const TYPES: &[(&str, Option<i64>)] = &[
    ("INT", None),
    ("VARCHAR", Some(50)),
    ("VARCHAR", Some(100)),
    ("TEXT", None),
    ("BIGINT UNSIGNED", None),
];

fn arb_schema() -> impl Strategy<Value = Schema> {
    let column = ("[a-e]", 0..TYPES.len(), any::<bool>(), any::<bool>());
    proptest::collection::btree_map(
        "[a-f]",
        proptest::collection::vec(column, 0..5),
        0..5,
    )
}

fn catalog(schema: &Schema, comment: &str) -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new("db");
    for (table, columns) in schema {
        let raw = columns
            .iter()
            .map(|(name, ty, nullable, default)| {
                let (type_name, size) = TYPES[*ty];
                let mut column = RawColumn::new(name.as_str(), type_name)
                    .nullable(*nullable)
                    .comment(comment);
                if let Some(size) = size {
                    column = column.size(size);
                }
                if *default {
                    column = column.default_value("0");
                }
                column
            })
            .collect();
        catalog = catalog.table(table.as_str(), format!("CREATE TABLE {table} ()"), raw);
    }
    catalog
}

fn run(a: &MemoryCatalog, b: &MemoryCatalog) -> SchemaDiff {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(compare(a, b))
        .unwrap()
}

/// Column diffs ordered by name, so both directions can be compared.
fn normalized(diff: &SchemaDiff) -> Vec<(String, TableDiffKind, Option<String>, Vec<String>)> {
    diff.table_diffs()
        .iter()
        .map(|table| {
            let mut columns: Vec<String> =
                table.column_diffs().iter().map(|c| c.to_string()).collect();
            columns.sort();
            (
                table.table_name().to_string(),
                table.kind(),
                table.create_table_sql().map(str::to_string),
                columns,
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn self_comparison_is_empty(schema in arb_schema()) {
        let catalog = catalog(&schema, "c");
        prop_assert!(run(&catalog, &catalog).is_empty());
    }

    #[test]
    fn comments_never_matter(schema in arb_schema()) {
        prop_assert!(run(&catalog(&schema, "one"), &catalog(&schema, "two")).is_empty());
    }

    #[test]
    fn reversed_comparison_is_the_inverse(a in arb_schema(), b in arb_schema()) {
        let (a, b) = (catalog(&a, "a"), catalog(&b, "b"));
        let forward = run(&a, &b);
        let backward = run(&b, &a);
        prop_assert_eq!(normalized(&forward.inverted()), normalized(&backward));
    }

    #[test]
    fn modified_tables_always_carry_columns(a in arb_schema(), b in arb_schema()) {
        let diff = run(&catalog(&a, "a"), &catalog(&b, "b"));
        for table in diff.table_diffs() {
            if table.kind() == TableDiffKind::Modified {
                prop_assert!(!table.column_diffs().is_empty());
            }
        }
    }
}
