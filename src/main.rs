mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, NamingDirection};
use rowbind::{to_domain_name, to_storage_name, Mapper, MapperConfig, Record, SqliteDriver, Value};

fn load_config(cli: &Cli) -> MapperConfig {
    let mut config = MapperConfig::load_or_default(cli.config.as_deref()).with_env_override();
    if let Some(db) = &cli.db {
        config.connection_string = Some(db.clone());
    }
    if cli.echo_sql {
        config.print_sqls = true;
    }
    if cli.verbose {
        config.print_warnings = true;
    }
    config
}

fn build_mapper(config: MapperConfig) -> Result<Mapper<SqliteDriver>> {
    if config.connection_string.is_none() {
        anyhow::bail!(
            "no database given; pass --db, set {} or add connection_string to the config file",
            rowbind::CONNECTION_STRING_ENV
        );
    }
    Ok(Mapper::new(SqliteDriver, config))
}

fn run_query(mapper: &Mapper<SqliteDriver>, sql: &str, args: &[Value], json: bool) -> Result<()> {
    let rows = mapper
        .query(sql, args)?
        .collect::<rowbind::Result<Vec<Record>>>()
        .context("Failed to read query results")?;

    if json {
        let out: Vec<_> = rows.iter().map(Record::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{row}");
    }
    tracing::debug!("{} row(s)", rows.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "rowbind=trace,rowbind_db=trace,rowbind_core=debug".to_string()
        } else {
            "rowbind=info,rowbind_db=warn,rowbind_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Query { sql, args, json } => {
            let mapper = build_mapper(load_config(&cli))?;
            run_query(&mapper, sql, &cli::parse_args(args), *json)
        }
        Commands::Scalar { sql, args } => {
            let mapper = build_mapper(load_config(&cli))?;
            let value: Value = mapper.query_scalar(sql, &cli::parse_args(args))?;
            println!("{value}");
            Ok(())
        }
        Commands::Exec {
            sql,
            args,
            ignore_error,
        } => {
            let mapper = build_mapper(load_config(&cli))?;
            let args = cli::parse_args(args);
            if *ignore_error {
                mapper.non_query_ignore_error(sql, &args)?;
            } else {
                let affected = mapper.non_query(sql, &args)?;
                println!("{affected} row(s) affected");
            }
            Ok(())
        }
        Commands::Naming { direction } => {
            match direction {
                NamingDirection::ToStorage { names } => {
                    for name in names {
                        println!("{}", to_storage_name(name));
                    }
                }
                NamingDirection::ToDomain { names } => {
                    for name in names {
                        println!("{}", to_domain_name(name));
                    }
                }
            }
            Ok(())
        }
        Commands::Validate { file } => {
            let path = file.as_deref().or(cli.config.as_deref());
            let config = match path {
                Some(p) => {
                    let contents = std::fs::read_to_string(p)
                        .with_context(|| format!("Failed to read {}", p.display()))?;
                    MapperConfig::from_json(&contents)?
                }
                None => MapperConfig::default(),
            };

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {warning}");
                }
            }
            Ok(())
        }
    }
}
