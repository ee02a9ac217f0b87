//! Cross-country snapshot on a single date.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::CountrySeries;
use crate::error::AppError;
use crate::math::{Fallback, safe_divide};

/// Default snapshot date.
pub const DEFAULT_WORLD_DATE: &str = "2020-03-25";

/// Default snapshot countries.
pub const DEFAULT_WORLD_COUNTRIES: [&str; 7] = ["China", "France", "Germany", "Italy", "Spain", "Tunisia", "US"];

/// One country's totals on the snapshot date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldPoint {
    pub country: String,
    pub confirmed: f64,
    pub deaths: f64,
    pub recovered: f64,
    pub death_rate: f64,
}

/// Read each country's cumulative counts on `date`.
///
/// A country whose table does not contain `date` is a data error.
pub fn world_snapshot(series: &[CountrySeries], date: NaiveDate) -> Result<Vec<WorldPoint>, AppError> {
    series
        .iter()
        .map(|s| {
            let idx = s
                .dates()
                .binary_search(&date)
                .map_err(|_| AppError::data(format!("{}: no observation on {date}.", s.country)))?;
            let confirmed = s.confirmed.values()[idx];
            let deaths = s.deaths.values()[idx];
            Ok(WorldPoint {
                country: s.country.clone(),
                confirmed,
                deaths,
                recovered: s.recovered.values()[idx],
                death_rate: safe_divide(deaths, confirmed, Fallback::NAN_TO_ZERO),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;
    use crate::domain::TimeSeries;

    fn series(name: &str, c: [f64; 3], d: [f64; 3]) -> CountrySeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 24).unwrap();
        let dates: Vec<NaiveDate> = (0..3).map(|k| start + Days::new(k)).collect();
        CountrySeries::new(
            name,
            TimeSeries::new(dates.clone(), c.to_vec()).unwrap(),
            TimeSeries::new(dates.clone(), d.to_vec()).unwrap(),
            TimeSeries::new(dates, vec![0.0; 3]).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn snapshot_reads_the_requested_day() {
        let date: NaiveDate = DEFAULT_WORLD_DATE.parse().unwrap();
        let points = world_snapshot(
            &[series("A", [10.0, 20.0, 30.0], [1.0, 2.0, 3.0]), series("B", [0.0; 3], [0.0; 3])],
            date,
        )
        .unwrap();
        assert_eq!(points[0].confirmed, 20.0);
        assert_eq!(points[0].death_rate, 0.1);
        assert_eq!(points[1].death_rate, 0.0);
    }

    #[test]
    fn missing_date_is_a_data_error() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let err = world_snapshot(&[series("A", [1.0; 3], [0.0; 3])], date).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_DATA);
    }
}
