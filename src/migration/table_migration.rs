use std::sync::Arc;

use super::action::{Actions, DatabaseAction, DatabaseDeleteAction};
use super::Migration;
use crate::databases::SharedDatabase;
use crate::processor::Processor;
use crate::schema::Table;

struct RegisteredTable {
    table: Table,
    database: SharedDatabase,
    name: Option<String>,
    description: String,
}

/// A migration installing a set of tables and dropping them on uninstall.
///
/// ```no_run
/// use std::sync::{Arc, Mutex};
/// use schemasync::migration::{Migration, TableMigration};
/// use schemasync::processor::MySqlProcessor;
/// use schemasync::schema::Table;
/// # fn example(db: schemasync::Database) -> Result<(), schemasync::migration::ActionError> {
/// let database = Arc::new(Mutex::new(db));
///
/// let mut products = Table::new("products");
/// products.primary("id");
/// products.string("name");
///
/// let mut migration = TableMigration::new(Arc::new(MySqlProcessor::new()), "Shop tables");
/// migration.register_table(products, database);
/// migration.install().process()?;
/// # Ok(())
/// # }
/// ```
pub struct TableMigration {
    processor: Arc<dyn Processor>,
    description: String,
    tables: Vec<RegisteredTable>,
    seeder: bool,
}

impl TableMigration {
    pub fn new(processor: Arc<dyn Processor>, description: impl Into<String>) -> Self {
        Self {
            processor,
            description: description.into(),
            tables: Vec::new(),
            seeder: false,
        }
    }

    /// A migration that only seeds data; uninstalling it leaves the tables.
    pub fn seeder(processor: Arc<dyn Processor>, description: impl Into<String>) -> Self {
        Self {
            seeder: true,
            ..Self::new(processor, description)
        }
    }

    pub fn is_seeder(&self) -> bool {
        self.seeder
    }

    pub fn register_table(&mut self, table: Table, database: SharedDatabase) -> &mut Self {
        self.tables.push(RegisteredTable {
            table,
            database,
            name: None,
            description: String::new(),
        });
        self
    }

    /// Registers a table under an action name and description.
    pub fn register_named_table(
        &mut self,
        table: Table,
        database: SharedDatabase,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Self {
        self.tables.push(RegisteredTable {
            table,
            database,
            name: Some(name.into()),
            description: description.into(),
        });
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().map(|registered| &registered.table)
    }
}

impl Migration for TableMigration {
    fn description(&self) -> &str {
        &self.description
    }

    fn install(&self) -> Actions {
        let mut actions = Actions::new();
        for registered in &self.tables {
            let mut action = DatabaseAction::new(
                Arc::clone(&self.processor),
                Arc::clone(&registered.database),
                registered.table.clone(),
            )
            .with_description(registered.description.as_str());
            if let Some(name) = &registered.name {
                action = action.with_name(name.as_str());
            }
            actions.add(action);
        }
        actions
    }

    fn uninstall(&self) -> Actions {
        let mut actions = Actions::new();
        if self.seeder {
            return actions;
        }
        for registered in &self.tables {
            let mut action = DatabaseDeleteAction::new(
                Arc::clone(&self.processor),
                Arc::clone(&registered.database),
                registered.table.clone(),
            )
            .with_description(registered.description.as_str());
            if let Some(name) = &registered.name {
                action = action.with_name(name.as_str());
            }
            actions.add(action);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::executor::ER_NO_SUCH_TABLE;
    use crate::mock::MockExecutor;
    use crate::processor::MySqlProcessor;
    use std::sync::Mutex;

    fn migration(seeder: bool) -> (TableMigration, MockExecutor) {
        let mock = MockExecutor::new("mysql");
        mock.on_query_error("SHOW FULL COLUMNS", Some(ER_NO_SUCH_TABLE), "doesn't exist");
        let database = Arc::new(Mutex::new(Database::new("shop", mock.clone())));
        let processor: Arc<dyn Processor> = Arc::new(MySqlProcessor::new());

        let mut migration = if seeder {
            TableMigration::seeder(processor, "Shop seed")
        } else {
            TableMigration::new(processor, "Shop tables")
        };
        let mut products = Table::new("products");
        products.primary("id");
        let mut orders = Table::new("orders");
        orders.primary("id");
        migration
            .register_table(products, Arc::clone(&database))
            .register_named_table(orders, database, "orders table", "Customer orders");
        (migration, mock)
    }

    #[test]
    fn test_install_creates_every_table() {
        let (migration, mock) = migration(false);
        let actions = migration.install();

        let names: Vec<&str> = actions.iter().map(|a| a.name()).collect();
        assert_eq!(names, ["products", "orders table"]);
        actions.process().unwrap();

        let statements = mock.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("`products`"));
        assert!(statements[1].contains("`orders`"));
        assert_eq!(migration.description(), "Shop tables");
    }

    #[test]
    fn test_uninstall_drops_every_table() {
        let (migration, mock) = migration(false);
        migration.uninstall().process().unwrap();

        assert_eq!(
            mock.statements(),
            ["DROP TABLE IF EXISTS `products`", "DROP TABLE IF EXISTS `orders`"]
        );
    }

    #[test]
    fn test_seeder_uninstall_is_empty() {
        let (migration, _mock) = migration(true);
        assert!(migration.is_seeder());
        assert_eq!(migration.install().len(), 2);
        assert!(migration.uninstall().is_empty());
    }
}
