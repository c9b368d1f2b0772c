// src/main.rs
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::{
    io::{self, Write},
    process::ExitCode,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use cli::{CacheAction, Cli, Command, FormArgs};
use eia_forms::{export, fetch::FetchCache, Config, FormKind, Pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ─── logging on stderr; stdout carries data ──────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR [eia]: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config()?;
    debug!(?config, "effective config");

    match &cli.command {
        Command::F861(args) => run_form(&config, FormKind::F861, args).await?,
        Command::F861m(args) => run_form(&config, FormKind::F861m, args).await?,
        Command::F860m(args) => run_form(&config, FormKind::F860m, args).await?,
        Command::Catalog { form } => {
            let pipeline = Pipeline::new(&config)?;
            let periods = pipeline
                .catalog(*form)
                .await
                .with_context(|| format!("listing published {form} files"))?;
            let mut out = io::stdout().lock();
            for period in periods {
                writeln!(out, "{period}")?;
            }
        }
        Command::Cache { action } => {
            let dir = config
                .cache_dir
                .clone()
                .context("no cache directory configured (use --cache-dir or cache_dir in the config)")?;
            let cache = FetchCache::new(dir);
            match action {
                CacheAction::List => {
                    let entries = cache.entries()?;
                    let total: u64 = entries.iter().map(|e| e.size).sum();
                    let mut out = io::stdout().lock();
                    for entry in &entries {
                        writeln!(out, "{}\t{}", entry.size, entry.path.display())?;
                    }
                    writeln!(out, "{} files, {total} bytes", entries.len())?;
                }
                CacheAction::Clear => {
                    let removed = cache.clear()?;
                    info!(removed, root = %cache.root().display(), "cache cleared");
                    println!("removed {removed} cached files");
                }
            }
        }
    }
    Ok(())
}

async fn run_form(config: &Config, form: FormKind, args: &FormArgs) -> Result<()> {
    let query = args.query(form)?;
    let pipeline = Pipeline::new(config)?;

    if args.raw {
        let tables = pipeline.run_raw(&query).await?;
        if let Some(csv) = export::write_raw(&tables, args.output.as_deref())? {
            io::stdout().lock().write_all(csv.as_bytes())?;
        }
        return Ok(());
    }

    let table = pipeline.run(&query).await?;
    match &args.output {
        Some(path) => {
            export::write(&table, path)?;
            info!(rows = table.len(), path = %path.display(), "wrote output");
        }
        None => io::stdout().lock().write_all(export::to_csv(&table)?.as_bytes())?,
    }
    Ok(())
}
