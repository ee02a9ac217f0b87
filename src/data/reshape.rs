//! Parsing the CSSE wide tables and reshaping them into per-country series.
//!
//! The tables have one row per (province, country) and one column per day:
//!
//! ```text
//! Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,...
//! ,Afghanistan,33.0,65.0,0,0,...
//! ```
//!
//! Reshaping keeps the rows of one country and sums them per date, so a
//! country reported by province becomes a single national series.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::{CaseKind, CountrySeries, TimeSeries};
use crate::error::AppError;

/// Leading non-date columns, in order.
pub const ID_COLUMNS: [&str; 4] = ["Province/State", "Country/Region", "Lat", "Long"];

/// Date header format (`m/d/yy`).
pub const DATE_FORMAT: &str = "%m/%d/%y";

#[derive(Debug, Clone)]
pub struct WideRow {
    pub province: Option<String>,
    pub country: String,
    pub values: Vec<f64>,
}

/// A row that could not be used, with its 1-based data-row number.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// One parsed CSSE table.
#[derive(Debug, Clone)]
pub struct WideTable {
    pub kind: CaseKind,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<WideRow>,
    pub skipped: Vec<RowError>,
}

impl WideTable {
    /// Parse CSV text. A malformed header is a data error; malformed rows are
    /// collected in `skipped` and left out.
    pub fn parse(kind: CaseKind, text: &str) -> Result<Self, AppError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| AppError::data(format!("{} table: unreadable header: {e}", kind.display_name())))?
            .clone();

        for (i, expected) in ID_COLUMNS.iter().enumerate() {
            let got = headers.get(i).map(str::trim).unwrap_or("");
            if got != *expected {
                return Err(AppError::data(format!(
                    "{} table: column {} should be '{expected}', found '{got}'.",
                    kind.display_name(),
                    i + 1
                )));
            }
        }

        let dates = headers
            .iter()
            .skip(ID_COLUMNS.len())
            .map(|h| {
                NaiveDate::parse_from_str(h.trim(), DATE_FORMAT).map_err(|e| {
                    AppError::data(format!("{} table: bad date column '{h}': {e}", kind.display_name()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if dates.is_empty() {
            return Err(AppError::data(format!("{} table has no date columns.", kind.display_name())));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AppError::data(format!(
                "{} table: date columns out of order ({} then {}).",
                kind.display_name(),
                w[0],
                w[1]
            )));
        }

        let width = ID_COLUMNS.len() + dates.len();
        let mut rows = Vec::new();
        let mut skipped = Vec::new();

        for (idx, record) in rdr.records().enumerate() {
            let row = idx + 1;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    skipped.push(RowError {
                        row,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            if record.len() != width {
                skipped.push(RowError {
                    row,
                    message: format!("expected {width} fields, found {}", record.len()),
                });
                continue;
            }

            let country = record.get(1).unwrap_or("").trim().to_string();
            if country.is_empty() {
                skipped.push(RowError {
                    row,
                    message: "missing Country/Region".to_string(),
                });
                continue;
            }
            let province = record
                .get(0)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string);

            match parse_counts(record.iter().skip(ID_COLUMNS.len())) {
                Ok(values) => rows.push(WideRow {
                    province,
                    country,
                    values,
                }),
                Err(message) => skipped.push(RowError { row, message }),
            }
        }

        for err in &skipped {
            log::warn!("{} table: skipping row {}: {}", kind.display_name(), err.row, err.message);
        }
        log::info!(
            "{} table: {} rows, {} days ({} .. {})",
            kind.display_name(),
            rows.len(),
            dates.len(),
            dates[0],
            dates[dates.len() - 1]
        );

        Ok(Self {
            kind,
            dates,
            rows,
            skipped,
        })
    }

    /// Distinct country names, sorted.
    pub fn countries(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.country.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sum every row of `country` per date.
    pub fn country_series(&self, country: &str) -> Result<TimeSeries, AppError> {
        let mut totals = vec![0.0; self.dates.len()];
        let mut matched = 0usize;
        for row in self.rows.iter().filter(|r| r.country == country) {
            for (acc, v) in totals.iter_mut().zip(row.values.iter()) {
                *acc += v;
            }
            matched += 1;
        }
        if matched == 0 {
            return Err(AppError::data(format!(
                "Unknown country '{country}' in the {} table.",
                self.kind.display_name()
            )));
        }
        if matched > 1 {
            log::debug!("{country}: summed {matched} province rows ({})", self.kind.display_name());
        }
        TimeSeries::new(self.dates.clone(), totals)
    }
}

fn parse_counts<'a>(cells: impl Iterator<Item = &'a str>) -> Result<Vec<f64>, String> {
    cells
        .map(|cell| {
            let t = cell.trim();
            let v = t
                .parse::<f64>()
                .map_err(|_| format!("unparsable count '{t}'"))?;
            if v.is_finite() {
                Ok(v)
            } else {
                Err(format!("non-finite count '{t}'"))
            }
        })
        .collect()
}

/// The three CSSE tables, checked to share one date index.
#[derive(Debug, Clone)]
pub struct CsseTables {
    pub confirmed: WideTable,
    pub deaths: WideTable,
    pub recovered: WideTable,
}

impl CsseTables {
    pub fn new(confirmed: WideTable, deaths: WideTable, recovered: WideTable) -> Result<Self, AppError> {
        for table in [&deaths, &recovered] {
            if table.dates != confirmed.dates {
                return Err(AppError::data(format!(
                    "The {} table covers {} days ({:?} .. {:?}) but the confirmed table covers {} ({:?} .. {:?}).",
                    table.kind.display_name(),
                    table.dates.len(),
                    table.dates.first(),
                    table.dates.last(),
                    confirmed.dates.len(),
                    confirmed.dates.first(),
                    confirmed.dates.last()
                )));
            }
        }
        Ok(Self {
            confirmed,
            deaths,
            recovered,
        })
    }

    pub fn table(&self, kind: CaseKind) -> &WideTable {
        match kind {
            CaseKind::Confirmed => &self.confirmed,
            CaseKind::Deaths => &self.deaths,
            CaseKind::Recovered => &self.recovered,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.confirmed.dates
    }

    /// Aligned confirmed/deaths/recovered series for one country.
    pub fn country(&self, name: &str) -> Result<CountrySeries, AppError> {
        CountrySeries::new(
            name,
            self.confirmed.country_series(name)?,
            self.deaths.country_series(name)?,
            self.recovered.country_series(name)?,
        )
    }

    /// Like [`CsseTables::country`], restricted to `[from, to]`.
    pub fn country_between(
        &self,
        name: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<CountrySeries, AppError> {
        let full = self.country(name)?;
        let sliced = CountrySeries::new(
            name,
            full.confirmed.slice_dates(from, to),
            full.deaths.slice_dates(from, to),
            full.recovered.slice_dates(from, to),
        )?;
        if sliced.is_empty() {
            return Err(AppError::data(format!("{name}: no observations in the selected date range.")));
        }
        Ok(sliced)
    }
}
