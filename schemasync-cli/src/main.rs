//! schemasync CLI
//!
//! Converges a configured MySQL database towards table definition files.
//! `plan` prints the statements a run would execute, `install` applies them
//! and `uninstall` drops the declared tables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use schemasync::config::{DatabaseConfig, CONFIG_FILE};
use schemasync::connection::connect;
use schemasync::migration::{Migration, TableMigration};
use schemasync::processor::{MySqlProcessor, Processor};
use schemasync::schema::Table;
use schemasync::Database;
use schemasync_cli::load_tables;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "schemasync")]
#[command(about = "Declarative MySQL schema synchronization")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configured database name (section `databases.<name>`)
    #[arg(long, short, default_value = "default")]
    database: String,

    /// Connection URL; overrides the configured connection
    #[arg(long)]
    database_url: Option<String>,

    /// Configuration file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the statements that would converge the database
    Plan {
        /// Table definition file (.toml or .json)
        definition: PathBuf,
    },

    /// Create or update the declared tables
    Install {
        /// Table definition file (.toml or .json)
        definition: PathBuf,
    },

    /// Drop the declared tables
    Uninstall {
        /// Table definition file (.toml or .json)
        definition: PathBuf,
    },
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(&cli) {
        Ok(()) => {
            if !cli.quiet {
                println!("{}", "✅ Success".green());
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red(), e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Plan { definition } => {
            let tables = load_tables(definition)?;
            handle_plan(&tables, open_database(cli)?)
        }
        Commands::Install { definition } => {
            let tables = load_tables(definition)?;
            handle_migration(tables, open_database(cli)?, false)
        }
        Commands::Uninstall { definition } => {
            let tables = load_tables(definition)?;
            handle_migration(tables, open_database(cli)?, true)
        }
    }
}

fn open_database(cli: &Cli) -> Result<Database> {
    let mut config = DatabaseConfig::load_from(&cli.config, &cli.database).or_else(|err| {
        // A URL alone is enough to connect.
        if cli.database_url.is_some() {
            Ok(DatabaseConfig::default())
        } else {
            Err(err)
        }
    })?;
    if let Some(url) = &cli.database_url {
        config.dsn = Some(url.clone());
    }

    connect(&cli.database, &config)
        .with_context(|| format!("Error connecting to database `{}`", cli.database))
}

fn handle_plan(tables: &[Table], mut database: Database) -> Result<()> {
    let processor = MySqlProcessor::new();

    for table in tables {
        let statements = processor
            .plan(table, &mut database)
            .map_err(|e| anyhow::anyhow!(e.format_detailed()))?;

        println!("\n📋 {}", table.name().bold());
        if statements.is_empty() {
            println!("  {}", "up to date".dimmed());
            continue;
        }
        for statement in statements.iter() {
            let marker = if statement.is_transactionable() {
                "  "
            } else {
                "! "
            };
            println!("{}{};", marker, statement.sql());
            if !statement.bindings().is_empty() {
                println!("    {}", format!("{} bindings", statement.bindings().len()).dimmed());
            }
        }
    }
    Ok(())
}

fn handle_migration(tables: Vec<Table>, database: Database, uninstall: bool) -> Result<()> {
    let processor: Arc<dyn Processor> = Arc::new(MySqlProcessor::new());
    let database = Arc::new(Mutex::new(database));

    let mut migration = TableMigration::new(processor, "Definition file tables");
    for table in tables {
        migration.register_table(table, Arc::clone(&database));
    }

    let actions = if uninstall {
        migration.uninstall()
    } else {
        migration.install()
    };

    for action in actions.iter() {
        action.process()?;
        let info: Vec<String> = action
            .processed_data_info()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        println!("  ✓ {} ({})", action.name(), info.join(", "));
    }
    Ok(())
}
