//! Tabula CLI
//!
//! A small shell over the engine API: open a table and run one operation
//! against it. The table's schema is given on the command line; reopening an
//! existing data file rebuilds its index, so state survives across runs.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use tabula::{Config, Database};

/// Tabula shell
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(about = "Embedded table storage engine")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./tabula_data")]
    data_dir: String,

    /// Table to operate on
    #[arg(short, long)]
    table: String,

    /// Comma-separated column names, primary key first
    #[arg(short, long, default_value = "id,value")]
    columns: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a row (one value per column, primary key's text form first)
    Insert {
        /// The primary key
        key: i64,

        /// Column values
        values: Vec<String>,
    },

    /// Read a row by primary key
    Get {
        /// The primary key
        key: i64,
    },

    /// Replace a row's values
    Update {
        /// The primary key
        key: i64,

        /// New column values
        values: Vec<String>,
    },

    /// Soft-delete a row
    Del {
        /// The primary key
        key: i64,
    },

    /// List all live rows in key order
    Scan,

    /// Rewrite the data file, dropping soft-deleted rows
    Compact,
}

fn main() {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tabula=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> tabula::Result<()> {
    let config = Config::builder().data_dir(&args.data_dir).build();
    let columns: Vec<&str> = args.columns.split(',').collect();

    let mut db = Database::create("default", config)?;
    let table = db.create_table(&args.table, &columns)?;

    match args.command {
        Commands::Insert { key, values } => {
            let offset = table.insert(key, &values)?;
            println!("inserted {} at offset {}", key, offset);
        }
        Commands::Get { key } => match table.get(key)? {
            Some(values) => println!("{}", values.join("|")),
            None => println!("(not found)"),
        },
        Commands::Update { key, values } => {
            let offset = table.update(key, &values)?;
            println!("updated {} at offset {}", key, offset);
        }
        Commands::Del { key } => {
            table.delete(key)?;
            println!("deleted {}", key);
        }
        Commands::Scan => {
            for (key, values) in table.scan()? {
                println!("{}: {}", key, values.join("|"));
            }
        }
        Commands::Compact => {
            table.compact()?;
            println!("compacted '{}' ({} live rows)", table.name(), table.row_count());
        }
    }
    Ok(())
}
