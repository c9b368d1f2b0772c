// tests/pipeline.rs
//! End-to-end queries against a mock EIA server and a local mirror.

use anyhow::Result;
use httpmock::prelude::*;
use std::path::Path;
use tempfile::tempdir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

use eia_forms::{
    export,
    fetch::FetchCache,
    parse::SOLAR_SHEET,
    sheet::{write_xlsx, Cell, Rows},
    Aggregation, Config, Error, Form860m, Form861, Form861m, FormKind, Period, Pipeline, Query,
    Selection,
};

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,eia_forms=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn config(base_url: String, cache_dir: Option<&Path>) -> Config {
    Config {
        base_url,
        cache_dir: cache_dir.map(Path::to_path_buf),
        current_year: Some(2024),
        ..Config::default()
    }
}

fn text(cells: &[&str]) -> Vec<Cell> {
    cells.iter().map(|s| Cell::from(*s)).collect()
}

/// A small-scale solar workbook covering `months` of `year` for `states`
/// plus the national row, with a two-row header and a footnote.
fn solar_workbook(year: i32, months: &[u32], states: &[&str]) -> Vec<u8> {
    let mut grid: Rows = vec![
        text(&["Small Scale Solar Photovoltaic Estimates"]),
        text(&["", "", "", "", "Capacity (MW)", "", "", "", "Generation (MWh)"]),
        text(&[
            "Year", "Month", "State", "Data Status", "Residential", "Commercial", "Industrial",
            "Total", "Residential", "Commercial", "Industrial", "Total",
        ]),
    ];
    for &month in months {
        for (i, &state) in states.iter().chain(["US"].iter()).enumerate() {
            let base = f64::from(month) + i as f64 * 100.0;
            let mut row = vec![
                Cell::Number(f64::from(year)),
                Cell::Number(f64::from(month)),
                Cell::from(state),
                Cell::from("Estimated"),
            ];
            for v in [base, base / 2.0, 0.5, base * 1.5 + 0.5] {
                row.push(Cell::Number(v));
            }
            for v in [base * 100.0, base * 50.0, 50.0, base * 150.0 + 50.0] {
                row.push(Cell::Number(v));
            }
            grid.push(row);
        }
    }
    grid.push(text(&["Note: values are estimates."]));
    write_xlsx(&[(SOLAR_SHEET, grid.as_slice())]).unwrap()
}

fn generator_workbook(headers: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut grid: Rows = vec![
        text(&["U.S. Energy Information Administration"]),
        text(&["Form EIA-860M, Monthly Update to Annual Electric Generator Report"]),
        text(headers),
    ];
    grid.extend(rows.iter().map(|r| text(r)));
    let retired: Rows = Vec::new();
    write_xlsx(&[("Operating", grid.as_slice()), ("Retired", retired.as_slice())]).unwrap()
}

const GENERATOR_HEADERS: [&str; 7] = [
    "Entity ID",
    "Plant ID",
    "Plant Name",
    "Sector",
    "Plant State",
    "Generator ID",
    "Nameplate Capacity (MW)",
];

#[tokio::test]
async fn monthly_form_returns_only_the_requested_month() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let body = solar_workbook(2020, &(1..=12).collect::<Vec<_>>(), &["CA", "WA"]);
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/eia861m/archive/xls/small_scale_solar_2020.xlsx");
            then.status(200).body(body);
        })
        .await;

    let pipeline = Pipeline::new(&config(server.base_url(), None))?;
    let solar = Form861m::new(&pipeline, &[2020], &[8], None).await?;
    mock.assert_async().await;

    let august = Period::monthly(2020, 8).unwrap();
    assert_eq!(solar.rows().len(), 12);
    assert!(solar.rows().iter().all(|r| r.period == august));

    // national rows carry no state and sort first
    let first = &solar.rows()[0];
    assert_eq!(first.state, None);
    assert!(first.entity_id.starts_with("US-"));

    let ca_res = solar.rows().iter().find(|r| r.entity_id == "CA-RES").unwrap();
    assert_eq!(ca_res.capacity_value, Some(8.0));
    assert_eq!(ca_res.production_value, Some(800.0));
    assert_eq!(ca_res.unit, "MW");
    Ok(())
}

#[tokio::test]
async fn annual_form_filters_states_and_orders_by_year_then_state() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let mut mocks = Vec::new();
    for year in [2020, 2021] {
        let body = solar_workbook(year, &[1, 2, 3], &["CA", "OR", "WA"]);
        let path = format!("/eia861m/archive/xls/small_scale_solar_{year}.xlsx");
        mocks.push(
            server
                .mock_async(|when, then| {
                    when.method(GET).path(path);
                    then.status(200).body(body);
                })
                .await,
        );
    }

    let pipeline = Pipeline::new(&config(server.base_url(), None))?;
    let solar = Form861::new(&pipeline, &[2020, 2021], Some(&["CA", "WA"][..])).await?;
    for mock in &mocks {
        mock.assert_async().await;
    }

    let keys: Vec<(String, String)> = solar
        .rows()
        .iter()
        .map(|r| (r.period.to_string(), r.state.map(|s| s.to_string()).unwrap_or_default()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 16);
    assert!(keys.iter().all(|(_, s)| s == "CA" || s == "WA"));
    assert_eq!(keys.first().unwrap(), &("2020".to_string(), "CA".to_string()));
    assert_eq!(keys.last().unwrap(), &("2021".to_string(), "WA".to_string()));

    // year-end capacity, summed generation
    let ca_res = solar
        .rows()
        .iter()
        .find(|r| r.entity_id == "CA-RES" && r.period == Period::annual(2020))
        .unwrap();
    assert_eq!(ca_res.capacity_value, Some(3.0));
    assert_eq!(ca_res.production_value, Some(600.0));
    Ok(())
}

#[tokio::test]
async fn missing_header_column_is_malformed_source() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    // no Technology column
    let body = generator_workbook(
        &GENERATOR_HEADERS,
        &[&["1", "3", "Barry", "Electric Utility", "AL", "1", "80"]],
    );
    server
        .mock_async(|when, then| {
            when.method(GET).path("/eia860m/archive/xls/august_generator2020.xlsx");
            then.status(200).body(body);
        })
        .await;

    let pipeline = Pipeline::new(&config(server.base_url(), None))?;
    let err = Form860m::new(&pipeline, &[2020], &[8], None).await.unwrap_err();
    match &err {
        Error::MalformedSource { reason, .. } => assert!(reason.contains("Technology"), "{err}"),
        other => panic!("expected MalformedSource, got {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn cached_location_is_downloaded_once() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let body = solar_workbook(2020, &[1], &["CA"]);
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/eia861m/archive/xls/small_scale_solar_2020.xlsx");
            then.status(200).body(body);
        })
        .await;

    let dir = tempdir()?;
    let pipeline = Pipeline::new(&config(server.base_url(), Some(dir.path())))?;
    let location = pipeline.locator().locate(FormKind::F861, 2020, None)?.remove(0);

    let first = pipeline.fetcher().fetch(&location).await?;
    let second = pipeline.fetcher().fetch(&location).await?;
    mock.assert_hits_async(1).await;
    assert!(second.from_cache());
    assert_eq!(first.bytes(), second.bytes());

    // a full query also reads the cached copy
    Form861::new(&pipeline, &[2020], None).await?;
    mock.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn invalid_selection_performs_no_io() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body("unexpected");
        })
        .await;
    let pipeline = Pipeline::new(&config(server.base_url(), None))?;

    let bad = [
        // annual form with a month
        Query::new(FormKind::F861, Selection::new([2020]).with_months([8])),
        // monthly form without one
        Query::new(FormKind::F861m, Selection::new([2020])),
        Query::new(FormKind::F860m, Selection::new([2020])),
        // out of range
        Query::new(FormKind::F861m, Selection::new([2020]).with_months([13])),
        Query::new(FormKind::F861, Selection::new([2030])),
        Query::new(FormKind::F861, Selection::new(Vec::<i32>::new())),
    ];
    for query in &bad {
        let err = pipeline.run(query).await.unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)), "{query:?}: {err}");
    }
    mock.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn unpublished_current_year_is_empty_but_missing_past_year_fails() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(404);
        })
        .await;
    let pipeline = Pipeline::new(&config(server.base_url(), None))?;

    let current = Form861m::new(&pipeline, &[2024], &[1], None).await?;
    assert!(current.table().is_empty());

    let err = Form861m::new(&pipeline, &[2020], &[1], None).await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
    Ok(())
}

#[tokio::test]
async fn corrupt_cached_workbook_is_deleted() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let body = solar_workbook(2020, &[1], &["CA"]);
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/eia861m/archive/xls/small_scale_solar_2020.xlsx");
            then.status(200).body(body);
        })
        .await;

    let dir = tempdir()?;
    let pipeline = Pipeline::new(&config(server.base_url(), Some(dir.path())))?;
    let location = pipeline.locator().locate(FormKind::F861, 2020, None)?.remove(0);
    let cache = FetchCache::new(dir.path());
    cache.put(&location.url, b"not a workbook").await?;

    let err = Form861::new(&pipeline, &[2020], None).await.unwrap_err();
    assert!(matches!(err, Error::MalformedSource { .. }), "{err}");
    assert!(err.to_string().contains("cached copy deleted"), "{err}");
    assert!(cache.get(&location.url).await?.is_none());
    mock.assert_hits_async(0).await;

    // the next attempt downloads a fresh copy
    let solar = Form861::new(&pipeline, &[2020], None).await?;
    assert!(!solar.table().is_empty());
    mock.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn csv_output_reads_back_to_the_same_table() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let body = solar_workbook(2021, &[5, 6], &["AZ", "NV"]);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/eia861m/archive/xls/small_scale_solar_2021.xlsx");
            then.status(200).body(body);
        })
        .await;

    let pipeline = Pipeline::new(&config(server.base_url(), None))?;
    let solar = Form861m::new(&pipeline, &[2021], &[5, 6], Some(&["NV"][..])).await?;
    let csv = solar.to_csv()?;
    assert_eq!(csv, solar.to_string());
    assert!(csv.starts_with("entity_id,period,state,sector,technology,"));

    let back = export::from_csv(&csv)?;
    assert_eq!(&back, solar.table());
    Ok(())
}

#[tokio::test]
async fn local_mirror_with_per_state_sums() -> Result<()> {
    init_test_logging();
    let mirror = tempdir()?;
    let dir = mirror.path().join("eia860m/archive/xls");
    std::fs::create_dir_all(&dir)?;
    let mut headers = GENERATOR_HEADERS.to_vec();
    headers.push("Technology");
    let workbook = generator_workbook(
        &headers,
        &[
            &["1", "3", "Barry", "Electric Utility", "AL", "1", "80", "Conventional Steam Coal"],
            &["1", "3", "Barry", "Electric Utility", "AL", "2", "20.5", "Conventional Steam Coal"],
            &["2", "7", "Gadsden", "Electric Utility", "AL", "ST1", "60", "Conventional Steam Coal"],
            &["9", "55", "Desert Sun", "IPP Non-CHP", "AZ", "PV1", "100", "Solar Photovoltaic"],
            &["NOTE: Data is preliminary."],
        ],
    );
    std::fs::write(dir.join("august_generator2022.xlsx"), workbook)?;

    let base = Url::from_directory_path(mirror.path()).unwrap();
    let pipeline = Pipeline::new(&config(base.to_string(), None))?;
    let query = Query::new(FormKind::F860m, Selection::new([2022]).with_months([8]))
        .with_aggregation(Aggregation::ByState);
    let table = pipeline.run(&query).await?;

    let sums: Vec<(String, Option<f64>, Option<String>)> = table
        .rows()
        .iter()
        .map(|r| (r.entity_id.clone(), r.capacity_value, r.technology.clone()))
        .collect();
    assert_eq!(
        sums,
        [
            ("AL".to_string(), Some(160.5), Some("Conventional Steam Coal".to_string())),
            ("AZ".to_string(), Some(100.0), Some("Solar Photovoltaic".to_string())),
        ]
    );

    // the raw path keeps the sheet as published
    let raw = pipeline.run_raw(&query).await?;
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].rows.len(), 4);
    Ok(())
}

#[tokio::test]
async fn raw_rows_follow_the_selection() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let body = solar_workbook(2020, &(1..=12).collect::<Vec<_>>(), &["AZ", "CA", "WA"]);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/eia861m/archive/xls/small_scale_solar_2020.xlsx");
            then.status(200).body(body);
        })
        .await;

    let pipeline = Pipeline::new(&config(server.base_url(), None))?;
    let selection = Selection::new([2020])
        .with_months([8])
        .with_state_names(["CA"])?;
    let raw = pipeline.run_raw(&Query::new(FormKind::F861m, selection)).await?;
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].rows.len(), 1);
    let row = &raw[0].rows[0];
    assert_eq!(row[1], Cell::Number(8.0));
    assert_eq!(row[2], Cell::from("CA"));

    let csv = export::write_raw(&raw, None)?.unwrap_or_default();
    assert_eq!(csv.lines().count(), 2);
    Ok(())
}

#[tokio::test]
async fn corrupt_download_without_cache_is_malformed() -> Result<()> {
    init_test_logging();
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/eia861m/archive/xls/small_scale_solar_2020.xlsx");
            then.status(200).body("<html>try again later</html>");
        })
        .await;

    let pipeline = Pipeline::new(&config(server.base_url(), None))?;
    let err = Form861::new(&pipeline, &[2020], None).await.unwrap_err();
    assert!(matches!(err, Error::MalformedSource { .. }), "{err}");
    assert!(!err.to_string().contains("cached copy deleted"), "{err}");
    mock.assert_hits_async(1).await;
    Ok(())
}
