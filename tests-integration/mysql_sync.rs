//! End-to-end synchronization against a MySQL container.
//!
//! Run with `cargo test -p schemasync-integration-tests -- --ignored`.

use std::sync::{Arc, Mutex};

use schemasync::config::DatabaseConfig;
use schemasync::connection::connect;
use schemasync::migration::{Migration, TableMigration};
use schemasync::processor::{MySqlProcessor, MySqlStorage, Processor, Storage};
use schemasync::schema::{ColumnType, Items, Table};
use schemasync::{Database, Row};
use serde_json::json;
use testcontainers::clients::Cli;
use testcontainers_modules::mysql::Mysql;

fn open(port: u16) -> Database {
    let config = DatabaseConfig {
        dsn: Some(format!("mysql://root@127.0.0.1:{port}/test")),
        ..DatabaseConfig::default()
    };
    connect("test", &config).expect("connect to container")
}

fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn count(database: &mut Database, table: &str) -> i64 {
    let rows = database
        .query(&format!("SELECT COUNT(*) AS n FROM `{table}`"), &[])
        .unwrap();
    rows[0]["n"].as_i64().unwrap()
}

fn products() -> Table {
    let mut table = Table::new("products");
    table.primary("id");
    table.string("name").length(100);
    table.bool("active").default(true);
    table.index("name_idx").column("name");
    table.items(
        Items::from(vec![
            row(json!({"name": "apple", "active": true})),
            row(json!({"name": "pear"})),
            row(json!({"name": "plum", "active": false})),
        ])
        .chunk(2),
    );
    table
}

#[test]
#[ignore = "requires docker"]
fn test_install_creates_and_seeds_once() {
    let docker = Cli::default();
    let node = docker.run(Mysql::default());
    let mut database = open(node.get_host_port_ipv4(3306));
    let processor = MySqlProcessor::new();

    processor.process(&products(), &mut database).unwrap();
    assert_eq!(count(&mut database, "products"), 3);

    let fetched = MySqlStorage::new()
        .fetch_table(&mut database, "products")
        .unwrap()
        .expect("table exists");
    let names: Vec<&str> = fetched.columns().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["id", "name", "active"]);
    assert_eq!(
        fetched.get_column("active").and_then(|c| c.column_type()),
        Some(ColumnType::Bool)
    );
    assert!(fetched.get_index("name_idx").is_some());
    assert_eq!(fetched.get_items_count(), 3);

    // The table already holds rows, so the seed is not repeated.
    processor.process(&products(), &mut database).unwrap();
    assert_eq!(count(&mut database, "products"), 3);
}

#[test]
#[ignore = "requires docker"]
fn test_added_column_lands_after_its_predecessor() {
    let docker = Cli::default();
    let node = docker.run(Mysql::default());
    let mut database = open(node.get_host_port_ipv4(3306));
    let processor = MySqlProcessor::new();

    processor.process(&products(), &mut database).unwrap();

    let mut table = products();
    table.decimal("price").precision(10, 2);
    let plan = processor.plan(&table, &mut database).unwrap();
    assert!(plan
        .iter()
        .any(|s| s.sql().starts_with("ALTER TABLE `products` ADD COLUMN `price`")));

    processor.process(&table, &mut database).unwrap();
    let fetched = MySqlStorage::new()
        .fetch_table(&mut database, "products")
        .unwrap()
        .unwrap();
    assert!(fetched.has_column("price"));
}

#[test]
#[ignore = "requires docker"]
fn test_migration_uninstall_drops_tables() {
    let docker = Cli::default();
    let node = docker.run(Mysql::default());
    let database = Arc::new(Mutex::new(open(node.get_host_port_ipv4(3306))));
    let processor: Arc<dyn Processor> = Arc::new(MySqlProcessor::new());

    let mut migration = TableMigration::new(processor, "Shop tables");
    migration.register_table(products(), Arc::clone(&database));

    migration.install().process().unwrap();
    migration.uninstall().process().unwrap();

    let mut database = database.lock().unwrap();
    let fetched = MySqlStorage::new()
        .fetch_table(&mut database, "products")
        .unwrap();
    assert!(fetched.is_none());
}

#[test]
#[ignore = "requires docker"]
fn test_nested_transaction_rolls_back_to_savepoint() {
    let docker = Cli::default();
    let node = docker.run(Mysql::default());
    let mut database = open(node.get_host_port_ipv4(3306));
    database
        .execute("CREATE TABLE ledger (id INT PRIMARY KEY)", &[])
        .unwrap();

    database
        .transaction(|db| {
            db.execute("INSERT INTO ledger VALUES (1)", &[])?;
            let inner: Result<(), schemasync::DatabaseError> = db.transaction(|db| {
                db.execute("INSERT INTO ledger VALUES (2)", &[])?;
                Err(schemasync::DatabaseError::query("abort inner"))
            });
            assert!(inner.is_err());
            assert_eq!(db.transaction_level(), 1);
            Ok::<_, schemasync::DatabaseError>(())
        })
        .unwrap();

    let rows = database.query("SELECT id FROM ledger", &[]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(1));
}
