//! CLI entry point.
//!
//! # Responsibility
//! - Print `ping` and the core version for `elemcraft_core`.
//! - Look up a stored combination without generating anything:
//!   `<word1> <word2>` reads the database named by the config file,
//!   `<db_path> <word1> <word2>` reads the given file.
//! - With no arguments, report the configured catalog file and its entry count.
//!
//! The config file is taken from `ELEMCRAFT_CONFIG` when set. Lookups open the
//! database read-only: a missing or unmigrated file is an error, never created.

use elemcraft_core::db::open_db_read_only;
use elemcraft_core::{
    canonicalize, init_logging, CatalogStore, CraftConfig, PairRepository, SqlitePairRepository,
};
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

const CONFIG_ENV: &str = "ELEMCRAFT_CONFIG";
const USAGE: &str = "usage: elemcraft_cli [[<db_path>] <word1> <word2>]";

fn main() -> ExitCode {
    println!("elemcraft_core ping={}", elemcraft_core::ping());
    println!("elemcraft_core version={}", elemcraft_core::core_version());

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.as_slice() {
        [] => report_catalog(&config),
        [word1, word2] => match &config.database_path {
            Some(db_path) => lookup(db_path, word1, word2),
            None => Err("no database_path configured; pass <db_path> explicitly".into()),
        },
        [db_path, word1, word2] => lookup(Path::new(db_path), word1, word2),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("lookup failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<CraftConfig, Box<dyn Error>> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => Ok(CraftConfig::load(path)?),
        None => Ok(CraftConfig::default()),
    }
}

fn report_catalog(config: &CraftConfig) -> Result<(), Box<dyn Error>> {
    if let Some(path) = &config.catalog_path {
        let elements = config.catalog_store().load()?;
        println!("catalog path={} entries={}", path.display(), elements.len());
    }
    Ok(())
}

fn lookup(db_path: &Path, word1: &str, word2: &str) -> Result<(), Box<dyn Error>> {
    let repo = SqlitePairRepository::try_new(open_db_read_only(db_path)?)?;
    let pair = canonicalize(word1, word2);
    match repo.find_by_pair(&pair)? {
        Some(record) => println!("{pair} = {} {}", record.emoji, record.text),
        None => println!("{pair} not yet discovered"),
    }
    Ok(())
}
