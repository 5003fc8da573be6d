use clap::{Parser, Subcommand};
use rowbind::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowbind")]
#[command(author, version, about = "Run parameterized SQL through the rowbind mapper")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Connection string; overrides the config file and ROWBIND_CONNECTION_STRING
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Echo every statement before it runs
    #[arg(long, global = true)]
    pub echo_sql: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query and print every row
    Query {
        /// SQL with positional :0, :1, ... placeholders
        sql: String,

        /// Placeholder values, in order ("null" binds NULL)
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a query and print the first column of the first row
    Scalar {
        /// SQL with positional :0, :1, ... placeholders
        sql: String,

        /// Placeholder values, in order ("null" binds NULL)
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
    },

    /// Run a statement and print the number of affected rows
    Exec {
        /// SQL with positional :0, :1, ... placeholders
        sql: String,

        /// Placeholder values, in order ("null" binds NULL)
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,

        /// Log a failing statement instead of exiting with an error
        #[arg(long)]
        ignore_error: bool,
    },

    /// Convert names between domain and storage style
    Naming {
        #[command(subcommand)]
        direction: NamingDirection,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum NamingDirection {
    /// Domain names to storage names (FundId -> fund_id)
    ToStorage {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Storage names to domain names (fund_id -> FundId)
    ToDomain {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// Interpret a command-line argument: `null`, an integer, a float, or text.
pub fn parse_arg(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::from(raw),
    }
}

pub fn parse_args(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|a| parse_arg(a)).collect()
}
