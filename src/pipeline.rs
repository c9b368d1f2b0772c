// src/pipeline.rs
//! Locate -> fetch -> parse -> normalize -> filter/aggregate, composed over
//! an explicit [`Config`].

use futures::{stream::FuturesUnordered, StreamExt};
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

use crate::{
    aggregate::{self, Aggregation},
    config::Config,
    error::{Error, Result},
    fetch::{catalog, Location, RawFetcher, RawRecord},
    locate::SourceLocator,
    model::{CanonicalRow, FormKind, Period, ResultTable, Selection, Subset},
    normalize::normalize,
    parse::{FormParser, ParsedTable},
};

/// One request against the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub form: FormKind,
    pub selection: Selection,
    /// Sheet of the 860m workbook; ignored by the other forms.
    pub subset: Subset,
    pub aggregation: Aggregation,
}

impl Query {
    pub fn new(form: FormKind, selection: Selection) -> Self {
        Query {
            form,
            selection,
            subset: Subset::default(),
            aggregation: Aggregation::default(),
        }
    }

    pub fn with_subset(mut self, subset: Subset) -> Self {
        self.subset = subset;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }
}

pub struct Pipeline {
    locator: SourceLocator,
    fetcher: RawFetcher,
    max_concurrency: usize,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Pipeline {
            locator: SourceLocator::new(config.base_url()?, config.current_year()),
            fetcher: RawFetcher::new(config)?,
            max_concurrency: config.max_concurrency(),
        })
    }

    pub fn locator(&self) -> &SourceLocator {
        &self.locator
    }

    pub fn fetcher(&self) -> &RawFetcher {
        &self.fetcher
    }

    /// Validates the selection, then resolves every file it touches.
    /// Several periods can share one file (the solar workbooks are yearly).
    pub fn locations(&self, query: &Query) -> Result<BTreeSet<Location>> {
        let selection = &query.selection;
        selection.validate(query.form, self.locator.current_year())?;

        let mut out = BTreeSet::new();
        for &year in selection.years() {
            match selection.months() {
                None => out.extend(self.locator.locate(query.form, year, None)?),
                Some(months) => {
                    for &month in months {
                        out.extend(self.locator.locate(query.form, year, Some(month))?);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Normalized, filtered and ordered rows of `query`.
    #[instrument(level = "info", skip(self, query), fields(form = %query.form))]
    pub async fn run(&self, query: &Query) -> Result<ResultTable> {
        let tables = self.parsed(query).await?;
        let mut rows: Vec<CanonicalRow> = Vec::new();
        for table in &tables {
            rows.extend(normalize(table)?);
        }
        let table = aggregate::apply(rows, &query.selection, query.aggregation)?;
        info!(files = tables.len(), rows = table.len(), "query complete");
        Ok(table)
    }

    /// The parsed source tables of `query` as published, without
    /// normalization, keeping only the rows inside the selection.
    #[instrument(level = "info", skip(self, query), fields(form = %query.form))]
    pub async fn run_raw(&self, query: &Query) -> Result<Vec<ParsedTable>> {
        let mut tables = self.parsed(query).await?;
        for table in &mut tables {
            aggregate::retain_raw(table, &query.selection);
        }
        let rows: usize = tables.iter().map(|t| t.rows.len()).sum();
        info!(files = tables.len(), rows, "raw query complete");
        Ok(tables)
    }

    /// Periods EIA lists on the landing page of `form`.
    pub async fn catalog(&self, form: FormKind) -> Result<Vec<Period>> {
        catalog::published_periods(&self.fetcher, &self.locator, form).await
    }

    async fn parsed(&self, query: &Query) -> Result<Vec<ParsedTable>> {
        let locations = self.locations(query)?;
        let records = self.fetch_all(&locations).await?;
        let parser = FormParser::for_form(query.form, query.subset);

        let mut tables = Vec::with_capacity(records.len());
        for raw in records {
            match parser.parse(&raw) {
                Ok(table) => tables.push(table),
                Err(e) if e.is_corrupt() => {
                    let location = raw.location();
                    warn!(url = %location.url, error = %e, "unreadable workbook");
                    let message = if self.fetcher.evict(location).await? {
                        format!("{e} (cached copy deleted, try again later)")
                    } else {
                        e.to_string()
                    };
                    return Err(Error::malformed(location, message));
                }
                Err(e) => return Err(e.into_error(raw.location())),
            }
        }
        Ok(tables)
    }

    /// Fetches with at most `max_concurrency` requests in flight. Output is
    /// in location order regardless of completion order.
    async fn fetch_all(&self, locations: &BTreeSet<Location>) -> Result<Vec<RawRecord>> {
        let mut tasks = FuturesUnordered::new();
        let mut records = Vec::with_capacity(locations.len());

        for location in locations {
            tasks.push(self.fetch_published(location));
            if tasks.len() >= self.max_concurrency {
                if let Some(res) = tasks.next().await {
                    records.extend(res?);
                }
            }
        }
        while let Some(res) = tasks.next().await {
            records.extend(res?);
        }

        records.sort_by(|a, b| a.location().cmp(b.location()));
        Ok(records)
    }

    /// A missing file for the current year (or later) is not published
    /// yet and contributes no rows; anywhere else it is an error.
    async fn fetch_published(&self, location: &Location) -> Result<Option<RawRecord>> {
        match self.fetcher.fetch(location).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.is_not_found() && location.period.year >= self.locator.current_year() => {
                warn!(url = %location.url, period = %location.period, "not published yet; skipping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
