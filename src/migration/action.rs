//! Install and uninstall actions.
//!
//! An action pairs one table with a processor and a shared database. Running
//! it locks the database for the whole reconciliation.

use std::sync::{Arc, MutexGuard};

use super::error::ActionError;
use crate::database::Database;
use crate::databases::SharedDatabase;
use crate::executor::DatabaseError;
use crate::processor::{ProcessError, Processor};
use crate::schema::Table;

/// A unit of work of a migration.
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Category shown next to the action, e.g. `database`.
    fn kind(&self) -> &str;

    fn process(&self) -> Result<(), ActionError>;

    /// Key/value pairs describing what the action touched.
    fn processed_data_info(&self) -> Vec<(&'static str, String)>;
}

/// Ordered actions of a migration.
#[derive(Default)]
pub struct Actions {
    actions: Vec<Box<dyn Action>>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, action: impl Action + 'static) -> &mut Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Action> {
        self.actions.iter().map(|a| a.as_ref())
    }

    /// Runs every action in order, stopping at the first failure.
    pub fn process(&self) -> Result<(), ActionError> {
        for action in &self.actions {
            log::debug!("Running action `{}`", action.name());
            action.process()?;
        }
        Ok(())
    }
}

fn lock(database: &SharedDatabase) -> Result<MutexGuard<'_, Database>, ProcessError> {
    database.lock().map_err(|poisoned| {
        let name = poisoned.get_ref().name().to_string();
        ProcessError::Database(DatabaseError::Poisoned(name))
    })
}

/// Converges the database towards a table.
pub struct DatabaseAction {
    processor: Arc<dyn Processor>,
    database: SharedDatabase,
    table: Table,
    name: Option<String>,
    description: String,
}

impl DatabaseAction {
    pub fn new(processor: Arc<dyn Processor>, database: SharedDatabase, table: Table) -> Self {
        Self {
            processor,
            database,
            table,
            name: None,
            description: String::new(),
        }
    }

    /// Action name; defaults to the table name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    pub fn database(&self) -> &SharedDatabase {
        &self.database
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Action removing the table this action installs.
    pub fn to_delete_action(&self) -> DatabaseDeleteAction {
        DatabaseDeleteAction::new(
            Arc::clone(&self.processor),
            Arc::clone(&self.database),
            self.table.clone(),
        )
        .with_name(self.name())
        .with_description(self.description.as_str())
    }

    fn run(&self) -> Result<(), ProcessError> {
        let mut database = lock(&self.database)?;
        self.processor.process(&self.table, &mut database)
    }
}

impl Action for DatabaseAction {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.table.name())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> &str {
        "database"
    }

    fn process(&self) -> Result<(), ActionError> {
        self.run().map_err(|source| ActionError::Failed {
            action: self.name().to_string(),
            table: self.table.name().to_string(),
            source,
        })
    }

    fn processed_data_info(&self) -> Vec<(&'static str, String)> {
        database_info(&self.database, &self.table)
    }
}

/// Drops a table.
pub struct DatabaseDeleteAction {
    processor: Arc<dyn Processor>,
    database: SharedDatabase,
    table: Table,
    name: Option<String>,
    description: String,
}

impl DatabaseDeleteAction {
    pub fn new(processor: Arc<dyn Processor>, database: SharedDatabase, table: Table) -> Self {
        Self {
            processor,
            database,
            table,
            name: None,
            description: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    fn run(&self) -> Result<(), ProcessError> {
        let mut table = self.table.clone();
        table.drop_table();
        let mut database = lock(&self.database)?;
        self.processor.process(&table, &mut database)
    }
}

impl Action for DatabaseDeleteAction {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.table.name())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> &str {
        "database"
    }

    fn process(&self) -> Result<(), ActionError> {
        self.run().map_err(|source| ActionError::Failed {
            action: self.name().to_string(),
            table: self.table.name().to_string(),
            source,
        })
    }

    fn processed_data_info(&self) -> Vec<(&'static str, String)> {
        database_info(&self.database, &self.table)
    }
}

fn database_info(database: &SharedDatabase, table: &Table) -> Vec<(&'static str, String)> {
    let name = match database.lock() {
        Ok(database) => database.name().to_string(),
        Err(poisoned) => poisoned.get_ref().name().to_string(),
    };
    vec![("database", name), ("table", table.name().to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ER_NO_SUCH_TABLE;
    use crate::mock::MockExecutor;
    use crate::processor::MySqlProcessor;
    use std::sync::Mutex;

    fn shared(mock: &MockExecutor) -> SharedDatabase {
        Arc::new(Mutex::new(Database::new("shop", mock.clone())))
    }

    fn products() -> Table {
        let mut table = Table::new("products");
        table.primary("id");
        table
    }

    #[test]
    fn test_database_action_processes_table() {
        let mock = MockExecutor::new("mysql");
        mock.on_query_error("SHOW FULL COLUMNS", Some(ER_NO_SUCH_TABLE), "doesn't exist");
        let action = DatabaseAction::new(Arc::new(MySqlProcessor::new()), shared(&mock), products())
            .with_description("Products table");

        action.process().unwrap();

        assert_eq!(action.name(), "products");
        assert_eq!(action.description(), "Products table");
        assert_eq!(action.kind(), "database");
        assert!(mock.statements()[0].starts_with("CREATE TABLE IF NOT EXISTS `products`"));
        assert_eq!(
            action.processed_data_info(),
            [("database", "shop".to_string()), ("table", "products".to_string())]
        );
    }

    #[test]
    fn test_delete_action_drops_table() {
        let mock = MockExecutor::new("mysql");
        let table = products();
        let action = DatabaseDeleteAction::new(Arc::new(MySqlProcessor::new()), shared(&mock), table)
            .with_name("remove products");

        action.process().unwrap();

        assert_eq!(action.name(), "remove products");
        assert_eq!(mock.statements(), ["DROP TABLE IF EXISTS `products`"]);
        assert!(!action.table().is_dropping());
    }

    #[test]
    fn test_failure_names_the_action() {
        let mock = MockExecutor::new("sqlite");
        let action = DatabaseAction::new(Arc::new(MySqlProcessor::new()), shared(&mock), products());

        let err = action.process().unwrap_err();
        assert_eq!(err.action(), "products");
        assert!(matches!(
            err,
            ActionError::Failed {
                source: ProcessError::Unsupported { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_actions_stop_at_first_failure() {
        let mock = MockExecutor::new("mysql");
        mock.fail_on("DROP TABLE IF EXISTS `first`");
        let processor: Arc<dyn Processor> = Arc::new(MySqlProcessor::new());
        let database = shared(&mock);

        let mut actions = Actions::new();
        actions
            .add(DatabaseDeleteAction::new(
                Arc::clone(&processor),
                Arc::clone(&database),
                Table::new("first"),
            ))
            .add(DatabaseDeleteAction::new(processor, database, Table::new("second")));

        assert_eq!(actions.len(), 2);
        let err = actions.process().unwrap_err();
        assert_eq!(err.action(), "first");
        assert!(mock.statements().is_empty());
    }
}
