// src/cli.rs
//! Command-line surface of the `eia` binary.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use eia_forms::{Aggregation, Config, FormKind, Query, Selection, Subset};

#[derive(Debug, Parser)]
#[command(
    name = "eia",
    version,
    about = "Download and normalize EIA Form 860m, 861 and 861m data"
)]
pub struct Cli {
    /// YAML config file; flags below override its fields.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for cached downloads.
    #[arg(long, global = true, conflicts_with = "no_cache")]
    pub cache_dir: Option<PathBuf>,

    /// Never read or write the download cache.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    /// Download again even when a cached copy exists.
    #[arg(long, global = true, default_value_t = false)]
    pub refresh: bool,

    /// Alternative root for published files (http(s):// or file://).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG wins if set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Annual small-scale solar by state and sector.
    #[command(name = "861")]
    F861(FormArgs),
    /// Monthly small-scale solar by state and sector.
    #[command(name = "861m")]
    F861m(FormArgs),
    /// Monthly generator inventory.
    #[command(name = "860m")]
    F860m(FormArgs),
    /// List the periods EIA currently publishes for a form.
    Catalog {
        #[arg(value_parser = clap::value_parser!(FormKind))]
        form: FormKind,
    },
    /// Inspect or empty the download cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Print every cached file with its size.
    List,
    /// Delete every cached file.
    Clear,
}

#[derive(Debug, Clone, Args)]
pub struct FormArgs {
    /// Years to retrieve, comma separated.
    #[arg(long, required = true, value_delimiter = ',')]
    pub years: Vec<i32>,

    /// Months (1-12) comma separated, or `all`. Monthly forms only.
    #[arg(long, alias = "months", value_parser = parse_months)]
    pub month: Option<Months>,

    /// Two-letter state codes, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub states: Vec<String>,

    /// 860m sheet: operating, planned, retired, canceled-or-postponed, or
    /// one of the `*-pr` Puerto Rico sheets.
    #[arg(long, value_parser = clap::value_parser!(Subset))]
    pub subset: Option<Subset>,

    /// Sum capacity and production per state instead of listing entities.
    #[arg(long, default_value_t = false)]
    pub sum: bool,

    /// Emit the selected rows of the source tables as published, without
    /// normalization.
    #[arg(long, default_value_t = false, conflicts_with = "sum")]
    pub raw: bool,

    /// Output file; the extension picks the format. Standard output (CSV)
    /// when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Months(pub Vec<u32>);

fn parse_months(s: &str) -> Result<Months, String> {
    if s.trim().eq_ignore_ascii_case("all") {
        return Ok(Months((1..=12).collect()));
    }
    s.split(',')
        .map(|m| {
            m.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid month '{m}'"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Months)
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if self.no_cache {
            config.cache_dir = None;
        }
        if self.refresh {
            config.refresh = true;
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        Ok(config)
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

impl FormArgs {
    pub fn query(&self, form: FormKind) -> Result<Query> {
        let mut selection = Selection::new(self.years.iter().copied());
        if let Some(Months(months)) = &self.month {
            selection = selection.with_months(months.iter().copied());
        }
        if !self.states.is_empty() {
            selection = selection
                .with_state_names(self.states.iter())
                .context("parsing --states")?;
        }

        let mut query = Query::new(form, selection);
        if let Some(subset) = self.subset {
            if form != FormKind::F860m {
                bail!("--subset only applies to form 860m");
            }
            query = query.with_subset(subset);
        }
        if self.sum {
            query = query.with_aggregation(Aggregation::ByState);
        }
        Ok(query)
    }
}
