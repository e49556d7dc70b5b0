//! `bizdir` command line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the directory database.
//! - Map subcommands onto `BusinessService` calls with JSON in and out.

use anyhow::{Context, Result};
use bizdir_core::{
    init_logging, open_db, parse_list_param, Business, BusinessService, Config, SearchParams,
    SqliteBusinessRepository,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

/// Business directory over a local SQLite database
#[derive(Parser)]
#[command(name = "bizdir")]
#[command(version)]
struct App {
    /// Config file (defaults to `bizdir.toml` when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log level, overrides configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a listing from JSON and print the stored record
    Create(Payload),
    /// Print one listing by public id
    Show { id: String },
    /// Update a listing; zero-valued fields keep their stored value
    Update {
        id: String,
        #[command(flatten)]
        payload: Payload,
    },
    /// Soft-delete a listing
    Delete { id: String },
    /// Search active listings
    Search(SearchArgs),
}

#[derive(Args)]
struct Payload {
    /// Listing JSON; read from stdin when omitted
    #[arg(long)]
    json: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long, default_value_t = 0)]
    limit: u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
    /// Comma-separated category aliases (any)
    #[arg(long, default_value = "")]
    categories: String,
    /// Comma-separated attributes (all)
    #[arg(long, default_value = "")]
    attributes: String,
    /// Price tier, i.e. number of `$` characters
    #[arg(long, default_value_t = 0)]
    price: u32,
    /// Epoch seconds whose local clock time must fall in the open window
    #[arg(long, default_value_t = 0)]
    open_at: u64,
    /// Only listings open right now
    #[arg(long)]
    open_now: bool,
}

impl From<SearchArgs> for SearchParams {
    fn from(args: SearchArgs) -> Self {
        Self {
            limit: args.limit,
            offset: args.offset,
            categories: parse_list_param(&args.categories),
            attributes: parse_list_param(&args.attributes),
            price: args.price,
            open_at: args.open_at,
            open_now: args.open_now,
        }
    }
}

impl Payload {
    fn business(&self) -> Result<Business> {
        let text = match &self.json {
            Some(text) => text.clone(),
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("failed to read listing JSON from stdin")?;
                buffer
            }
        };
        serde_json::from_str(&text).context("invalid listing JSON")
    }
}

impl App {
    fn resolved_config(&self) -> Result<Config> {
        let mut config =
            Config::load(self.config.as_deref()).context("failed to load configuration")?;
        if let Some(path) = &self.database {
            config.database.path = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        Ok(config)
    }

    fn run(self) -> Result<()> {
        let config = self.resolved_config()?;
        init_logging(&config.log).context("failed to initialize logging")?;

        let conn = open_db(&config.database.path).with_context(|| {
            format!("failed to open database `{}`", config.database.path.display())
        })?;
        log::info!(
            "event=cli_start module=cli status=ok database={}",
            config.database.path.display()
        );
        let service = BusinessService::new(SqliteBusinessRepository::try_new(&conn)?);

        match self.command {
            Command::Create(payload) => print_json(&service.create(payload.business()?)?),
            Command::Show { id } => print_json(&service.read(&id)?),
            Command::Update { id, payload } => {
                service.update(&id, payload.business()?)?;
                print_json(&service.read(&id)?)
            }
            Command::Delete { id } => {
                service.delete(&id)?;
                Ok(())
            }
            Command::Search(args) => print_json(&service.search(&SearchParams::from(args))?),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    App::parse().run()
}
