// src/fetch/catalog.rs
//! Discovery of the periods EIA has actually published, scraped from the
//! `.xlsx` links of each form's landing page.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use super::RawFetcher;
use crate::{
    error::Result,
    locate::SourceLocator,
    model::{FormKind, Period},
};

static XLSX_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href$=".xlsx"]"#).expect("CSS selector for xlsx links should be valid")
});

static GENERATOR_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([a-z]+)_generator(\d{4})\.xlsx$").expect("generator file pattern")
});

static SOLAR_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)small_scale_solar_(\d{4})\.xlsx$").expect("solar file pattern")
});

/// Periods named by the workbook links in `html`, ascending and deduplicated.
/// The solar workbooks are yearly files, so 861 and 861m yield annual periods.
pub fn periods_from_html(form: FormKind, html: &str) -> Vec<Period> {
    let doc = Html::parse_document(html);
    let periods: BTreeSet<Period> = doc
        .select(&XLSX_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| period_of(form, href))
        .collect();
    periods.into_iter().collect()
}

fn period_of(form: FormKind, href: &str) -> Option<Period> {
    match form {
        FormKind::F860m => {
            let caps = GENERATOR_FILE.captures(href)?;
            let month = month_number(&caps[1])?;
            Period::monthly(caps[2].parse().ok()?, month)
        }
        FormKind::F861 | FormKind::F861m => {
            let caps = SOLAR_FILE.captures(href)?;
            Some(Period::annual(caps[1].parse().ok()?))
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    name.parse::<chrono::Month>()
        .ok()
        .map(|m| m.number_from_month())
}

/// Scrapes the landing page of `form`.
#[instrument(level = "debug", skip(fetcher, locator))]
pub async fn published_periods(
    fetcher: &RawFetcher,
    locator: &SourceLocator,
    form: FormKind,
) -> Result<Vec<Period>> {
    let page = locator.landing_page(form)?;
    let html = fetcher.get_text(&page).await?;
    let periods = periods_from_html(form, &html);
    debug!(%page, count = periods.len(), "scraped landing page");
    Ok(periods)
}
