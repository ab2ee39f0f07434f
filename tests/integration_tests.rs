use std::{path::PathBuf, sync::Arc};

use bas_balance::{
    config::{Backend, StoreConfig},
    connector::connector_for,
    render::{OutputFormat, Renderer, CLOSING_LINE},
    run, AppError,
};
use bas_balance_core::{ListQuery, SortDirection, StoreError, TransactionRecord, Value};
use bas_balance_memory::{MemoryConnector, MemoryStore};
use rust_decimal::Decimal;
use tempfile::TempDir;

fn txn(id: i64, account: &str, cents: i64) -> TransactionRecord {
    TransactionRecord::new(vec![
        (Arc::from("id"), Value::Int(id)),
        (Arc::from("account"), Value::Text(account.to_string())),
        (Arc::from("amount"), Value::Decimal(Decimal::new(cents, 2))),
    ])
}

fn three_rows() -> MemoryStore {
    MemoryStore::new().with_table(
        "bas_transactions",
        vec![
            txn(1, "ACC-1", 1050),
            txn(2, "ACC-2", -300),
            txn(3, "ACC-1", 9999),
        ],
    )
}

fn execute(
    connector: &dyn bas_balance_core::Connector,
    query: &ListQuery,
    format: OutputFormat,
) -> (Result<usize, AppError>, String) {
    let mut out = Vec::new();
    let result = run(connector, query, &Renderer::new(format), &mut out);
    (result, String::from_utf8(out).expect("output is utf-8"))
}

fn sqlite_fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bas.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE bas_transactions (
            id INTEGER PRIMARY KEY,
            account TEXT NOT NULL,
            amount TEXT NOT NULL
        );

        INSERT INTO bas_transactions VALUES (1, 'ACC-1', '10.50');
        INSERT INTO bas_transactions VALUES (2, 'ACC-2', '-3.00');
        INSERT INTO bas_transactions VALUES (3, 'ACC-1', '99.99');
        ",
    )
    .unwrap();
    (dir, path)
}

#[test]
fn test_empty_table_prints_only_closing_line() {
    let mut store = MemoryStore::new();
    store.create_table("bas_transactions");
    let connector = MemoryConnector::new(store);
    let (result, out) = execute(&connector, &ListQuery::default(), OutputFormat::Text);

    assert_eq!(result.unwrap(), 0);
    assert_eq!(out, format!("{}\n", CLOSING_LINE));
}

#[test]
fn test_three_rows_in_order_then_closing_line() {
    let connector = MemoryConnector::new(three_rows());
    let (result, out) = execute(&connector, &ListQuery::default(), OutputFormat::Text);

    assert_eq!(result.unwrap(), 3);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Transaction: {id:1 account:ACC-1 amount:10.50}",
            "Transaction: {id:2 account:ACC-2 amount:-3.00}",
            "Transaction: {id:3 account:ACC-1 amount:99.99}",
            CLOSING_LINE,
        ]
    );
}

#[test]
fn test_unreachable_store_never_queries() {
    let connector = MemoryConnector::unreachable("connection refused");
    let (result, out) = execute(&connector, &ListQuery::default(), OutputFormat::Text);

    match result {
        Err(AppError::Store(StoreError::Connection(msg))) => {
            assert!(msg.contains("connection refused"))
        }
        other => panic!("Expected connection error, got {:?}", other),
    }
    assert!(out.is_empty());
    assert_eq!(connector.queries_served(), 0);
}

#[test]
fn test_missing_table_prints_nothing() {
    let connector = MemoryConnector::new(MemoryStore::new());
    let (result, out) = execute(&connector, &ListQuery::default(), OutputFormat::Text);

    assert!(matches!(result, Err(AppError::Store(StoreError::Query(_)))));
    assert!(out.is_empty(), "no records and no closing line on failure");
    assert_eq!(connector.connections_opened(), 1);
    assert_eq!(connector.queries_served(), 1);
}

#[test]
fn test_repeated_runs_are_identical() {
    let connector = MemoryConnector::new(three_rows());
    let (first, first_out) = execute(&connector, &ListQuery::default(), OutputFormat::Json);
    let (second, second_out) = execute(&connector, &ListQuery::default(), OutputFormat::Json);

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(first_out, second_out);
    assert_eq!(connector.connections_opened(), 2);
}

#[test]
fn test_invalid_identifier_is_a_query_error() {
    let connector = MemoryConnector::new(three_rows());
    let query = ListQuery::all("bas_transactions; DROP TABLE bas_transactions");
    let (result, out) = execute(&connector, &query, OutputFormat::Text);

    assert!(matches!(result, Err(AppError::Store(StoreError::Query(_)))));
    assert!(out.is_empty());
}

#[test]
fn test_sqlite_end_to_end() {
    let (_dir, path) = sqlite_fixture();
    let connector = connector_for(&StoreConfig {
        backend: Backend::Sqlite,
        url: path.to_string_lossy().into_owned(),
    });

    let (result, out) = execute(connector.as_ref(), &ListQuery::default(), OutputFormat::Text);
    assert_eq!(result.unwrap(), 3);
    assert_eq!(
        out,
        "Transaction: {id:1 account:ACC-1 amount:10.50}\n\
         Transaction: {id:2 account:ACC-2 amount:-3.00}\n\
         Transaction: {id:3 account:ACC-1 amount:99.99}\n\
         Hello, World!\n"
    );
}

#[test]
fn test_sqlite_missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let connector = connector_for(&StoreConfig {
        backend: Backend::Sqlite,
        url: dir.path().join("absent.db").to_string_lossy().into_owned(),
    });

    let (result, out) = execute(connector.as_ref(), &ListQuery::default(), OutputFormat::Text);
    assert!(matches!(result, Err(AppError::Store(StoreError::Connection(_)))));
    assert!(out.is_empty());
}

#[test]
fn test_sqlite_and_memory_agree_on_query() {
    let (_dir, path) = sqlite_fixture();
    let sqlite = connector_for(&StoreConfig {
        backend: Backend::Sqlite,
        url: path.to_string_lossy().into_owned(),
    });
    let memory = MemoryConnector::new(three_rows());

    let query = ListQuery::default()
        .filter("account", "ACC-1")
        .order_by("id", SortDirection::Desc)
        .limit(5);

    let (sqlite_result, sqlite_out) = execute(sqlite.as_ref(), &query, OutputFormat::Text);
    let (memory_result, memory_out) = execute(&memory, &query, OutputFormat::Text);

    assert_eq!(sqlite_result.unwrap(), 2);
    assert_eq!(memory_result.unwrap(), 2);
    assert_eq!(sqlite_out, memory_out);
    assert!(sqlite_out.starts_with("Transaction: {id:3 "));
}

#[test]
fn test_sqlite_and_memory_agree_on_real_amounts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bas.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch(
            "
            CREATE TABLE bas_transactions (id INTEGER PRIMARY KEY, amount REAL NOT NULL);
            INSERT INTO bas_transactions VALUES (1, 10.5);
            INSERT INTO bas_transactions VALUES (2, -3.0);
            ",
        )
        .unwrap();
    let sqlite = connector_for(&StoreConfig {
        backend: Backend::Sqlite,
        url: path.to_string_lossy().into_owned(),
    });
    let memory = MemoryConnector::new(MemoryStore::new().with_table(
        "bas_transactions",
        vec![
            TransactionRecord::new(vec![
                (Arc::from("id"), Value::Int(1)),
                (Arc::from("amount"), Value::Float(10.5)),
            ]),
            TransactionRecord::new(vec![
                (Arc::from("id"), Value::Int(2)),
                (Arc::from("amount"), Value::Float(-3.0)),
            ]),
        ],
    ));

    for (value, expected) in [("-3", 1), ("-3.0", 0)] {
        let query = ListQuery::default().filter("amount", value);
        let (sqlite_result, sqlite_out) = execute(sqlite.as_ref(), &query, OutputFormat::Text);
        let (memory_result, memory_out) = execute(&memory, &query, OutputFormat::Text);

        assert_eq!(sqlite_result.unwrap(), expected, "filter {}", value);
        assert_eq!(memory_result.unwrap(), expected, "filter {}", value);
        assert_eq!(sqlite_out, memory_out);
    }
}

#[test]
fn test_sqlite_unbounded_limit_lists_everything() {
    let (_dir, path) = sqlite_fixture();
    let connector = connector_for(&StoreConfig {
        backend: Backend::Sqlite,
        url: path.to_string_lossy().into_owned(),
    });

    let query = ListQuery::default().limit(u64::MAX);
    let (result, out) = execute(connector.as_ref(), &query, OutputFormat::Text);
    assert_eq!(result.unwrap(), 3);
    assert!(out.ends_with("Hello, World!\n"));
}
