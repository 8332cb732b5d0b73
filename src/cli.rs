//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_import_adapter::CsvImportAdapter;
use crate::adapters::ini_config_adapter::IniConfigAdapter;
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::error::StockchatError;
use crate::domain::resolver::{ResolveContext, Resolver};
use crate::domain::series::{SeriesKind, WindowDefaults};
use crate::domain::token_parser;

#[derive(Parser, Debug)]
#[command(name = "stockchat", about = "Chat message variable substitution")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve placeholder variables in a message
    Resolve {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 1)]
        user: i64,
        /// Stock code entity-less tokens and specials refer to
        #[arg(long)]
        stock: String,
        /// Message text; reads stdin when omitted
        message: Option<String>,
        /// Also list the substituted variables on stderr
        #[arg(long)]
        show_variables: bool,
    },
    /// Scan a message and print the tokens it contains
    Tokens { message: String },
    /// Create the database schema
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Import kline bars from a CSV file
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
        /// Full ts_code the bars belong to, e.g. 688313.SH
        #[arg(long)]
        code: String,
        /// Series granularity: daily, weekly or minute
        #[arg(long, default_value = "daily")]
        kind: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Resolve {
            config,
            user,
            stock,
            message,
            show_variables,
        } => run_resolve(&config, user, &stock, message, show_variables),
        Command::Tokens { message } => run_tokens(&message),
        Command::InitDb { config } => run_init_db(&config),
        Command::Import {
            config,
            file,
            code,
            kind,
        } => run_import(&config, &file, &code, &kind),
    }
}

pub fn load_config(path: &PathBuf) -> Result<IniConfigAdapter, ExitCode> {
    IniConfigAdapter::from_file(path).map_err(|e| {
        let err = StockchatError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn open_database(config: &IniConfigAdapter) -> Result<SqliteAdapter, ExitCode> {
    SqliteAdapter::from_config(config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_resolve(
    config_path: &PathBuf,
    user: i64,
    stock: &str,
    message: Option<String>,
    show_variables: bool,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let database = match open_database(&config) {
        Ok(db) => db,
        Err(code) => return code,
    };

    let message = match message {
        Some(m) => m,
        None => {
            let mut buf = String::new();
            if let Err(e) = std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf) {
                eprintln!("error: {e}");
                return ExitCode::from(1);
            }
            buf
        }
    };

    let defaults = WindowDefaults::from_config(&config);
    let resolver = Resolver::new(&database, &database, defaults);
    let ctx = ResolveContext {
        user_id: user,
        stock_code: stock.to_string(),
    };

    match resolver.resolve_and_substitute(&ctx, &message) {
        Ok(outcome) => {
            println!("{}", outcome.text);
            if show_variables {
                let mut names: Vec<&String> = outcome.variables.keys().collect();
                names.sort();
                eprintln!("substituted {} variable(s)", names.len());
                for name in names {
                    eprintln!("  {name}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_tokens(message: &str) -> ExitCode {
    let tokens = token_parser::scan(message);
    if tokens.is_empty() {
        eprintln!("no tokens found");
        return ExitCode::SUCCESS;
    }

    for token in tokens {
        let indicators: Vec<&str> = token.indicators.iter().map(|i| i.name()).collect();
        println!(
            "{}\tkind={}\tentity={}\twindow={}\tindicators={}",
            token.raw,
            token.kind,
            token.entity.as_deref().unwrap_or("-"),
            token
                .window
                .map_or_else(|| "-".to_string(), |w| w.to_string()),
            if indicators.is_empty() {
                "-".to_string()
            } else {
                indicators.join("&")
            }
        );
    }
    ExitCode::SUCCESS
}

fn run_init_db(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let database = match open_database(&config) {
        Ok(db) => db,
        Err(code) => return code,
    };

    match database.initialize_schema() {
        Ok(()) => {
            eprintln!("schema initialized");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn parse_kind(kind: &str) -> Result<SeriesKind, StockchatError> {
    match kind {
        "daily" => Ok(SeriesKind::Daily),
        "weekly" => Ok(SeriesKind::Weekly),
        "minute" => Ok(SeriesKind::Minute),
        other => Err(StockchatError::ConfigInvalid {
            section: "import".into(),
            key: "kind".into(),
            reason: format!("unknown series kind {other:?} (expected daily, weekly or minute)"),
        }),
    }
}

fn run_import(config_path: &PathBuf, file: &PathBuf, code: &str, kind: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let database = match open_database(&config) {
        Ok(db) => db,
        Err(code) => return code,
    };

    let kind = match parse_kind(kind) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    if let Err(e) = database.initialize_schema() {
        eprintln!("error: {e}");
        return ExitCode::from(&e);
    }

    eprintln!("Importing {} bars from {}", kind, file.display());
    let importer = CsvImportAdapter::new(kind);
    let bars = match importer.read_bars(file, code) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    match database.insert_bars(kind, &bars) {
        Ok(()) => {
            eprintln!("imported {} bar(s) for {}", bars.len(), code);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}
