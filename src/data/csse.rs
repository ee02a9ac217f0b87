//! Access to the CSSE COVID-19 global time-series tables.

use std::path::Path;

use reqwest::blocking::Client;

use crate::data::reshape::{CsseTables, WideTable};
use crate::domain::{CaseKind, DataSource};
use crate::error::AppError;

/// Public location of the CSSE global time-series tables.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";

/// Environment variable (or `.env` entry) overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "EPI_DATA_BASE_URL";

pub struct CsseClient {
    client: Client,
    base_url: String,
}

impl CsseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, kind: CaseKind) -> String {
        format!("{}/{}", self.base_url, kind.file_name())
    }

    pub fn fetch_text(&self, kind: CaseKind) -> Result<String, AppError> {
        let url = self.url_for(kind);
        log::info!("downloading {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::runtime(format!("CSSE request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::runtime(format!(
                "CSSE request for {} failed with status {}.",
                kind.file_name(),
                resp.status()
            )));
        }

        resp.text()
            .map_err(|e| AppError::runtime(format!("Failed to read CSSE response body: {e}")))
    }

    pub fn fetch_table(&self, kind: CaseKind) -> Result<WideTable, AppError> {
        WideTable::parse(kind, &self.fetch_text(kind)?)
    }

    pub fn fetch_all(&self) -> Result<CsseTables, AppError> {
        CsseTables::new(
            self.fetch_table(CaseKind::Confirmed)?,
            self.fetch_table(CaseKind::Deaths)?,
            self.fetch_table(CaseKind::Recovered)?,
        )
    }
}

pub fn base_url_from_env() -> String {
    dotenvy::dotenv().ok();
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Read `<dir>/<file name>` for one table.
pub fn read_local_table(dir: &Path, kind: CaseKind) -> Result<WideTable, AppError> {
    let path = dir.join(kind.file_name());
    let text = std::fs::read_to_string(&path)
        .map_err(|e| AppError::input(format!("Failed to read {}: {e}", path.display())))?;
    WideTable::parse(kind, &text)
}

pub fn read_local(dir: &Path) -> Result<CsseTables, AppError> {
    CsseTables::new(
        read_local_table(dir, CaseKind::Confirmed)?,
        read_local_table(dir, CaseKind::Deaths)?,
        read_local_table(dir, CaseKind::Recovered)?,
    )
}

/// Load all three tables from `source`.
///
/// Synthetic tables are generated for `countries`.
pub fn load_tables(source: &DataSource, countries: &[String]) -> Result<CsseTables, AppError> {
    match source {
        DataSource::Remote { base_url } => CsseClient::new(base_url.clone()).fetch_all(),
        DataSource::Local { dir } => read_local(dir),
        DataSource::Synthetic { seed, days } => crate::data::sample::synthetic_tables(countries, *seed, *days),
    }
}
