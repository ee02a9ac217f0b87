//! Export derived metrics and SIR trajectories to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per day, one column per quantity.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{MetricKind, SirTrajectory};
use crate::error::AppError;
use crate::metrics::{MetricsTable, WorldPoint};

fn create(path: &Path, what: &str) -> Result<BufWriter<File>, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::input(format!("Failed to create directory '{}': {e}", parent.display())))?;
    }
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::input(format!("Failed to create {what} '{}': {e}", path.display())))
}

fn write_err(e: std::io::Error) -> AppError {
    AppError::input(format!("Failed to write export CSV: {e}"))
}

/// Write every metric of `table`, one row per date.
pub fn write_metrics_csv(path: &Path, table: &MetricsTable) -> Result<(), AppError> {
    let mut file = create(path, "metrics CSV")?;

    let columns: Vec<&str> = MetricKind::ALL.iter().map(|k| k.column()).collect();
    writeln!(file, "country,date,confirmed,deaths,recovered,{}", columns.join(",")).map_err(write_err)?;

    for (i, date) in table.dates().iter().enumerate() {
        let mut row = format!(
            "{},{date},{},{},{}",
            csv_field(&table.country),
            table.base.confirmed.values()[i],
            table.base.deaths.values()[i],
            table.base.recovered.values()[i]
        );
        for (_, series) in table.iter() {
            row.push_str(&format!(",{:.6}", series.values()[i]));
        }
        writeln!(file, "{row}").map_err(write_err)?;
    }

    file.flush().map_err(write_err)
}

/// Write one SIR run, one row per grid point.
pub fn write_sir_csv(path: &Path, traj: &SirTrajectory) -> Result<(), AppError> {
    let mut file = create(path, "SIR CSV")?;
    writeln!(file, "t,susceptible,infected,recovered").map_err(write_err)?;
    for k in 0..traj.len() {
        writeln!(
            file,
            "{:.6},{:.4},{:.4},{:.4}",
            traj.t[k], traj.susceptible[k], traj.infected[k], traj.recovered[k]
        )
        .map_err(write_err)?;
    }
    file.flush().map_err(write_err)
}

/// Write the cross-country snapshot, one row per country.
pub fn write_world_csv(path: &Path, points: &[WorldPoint]) -> Result<(), AppError> {
    let mut file = create(path, "world CSV")?;
    writeln!(file, "country,confirmed,deaths,recovered,death_rate").map_err(write_err)?;
    for p in points {
        writeln!(
            file,
            "{},{},{},{},{:.6}",
            csv_field(&p.country),
            p.confirmed,
            p.deaths,
            p.recovered,
            p.death_rate
        )
        .map_err(write_err)?;
    }
    file.flush().map_err(write_err)
}

/// Quote a field if it contains a delimiter or quote.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate};

    use super::*;
    use crate::domain::{CountrySeries, MetricsConfig, TimeSeries};
    use crate::metrics::compute_metrics;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("epi-curves-export-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn metrics_csv_has_header_and_one_row_per_day() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..3).map(|k| start + Days::new(k)).collect();
        let ts = |v: Vec<f64>| TimeSeries::new(dates.clone(), v).unwrap();
        let series = CountrySeries::new(
            "Korea, South",
            ts(vec![1.0, 2.0, 4.0]),
            ts(vec![0.0, 0.0, 1.0]),
            ts(vec![0.0, 1.0, 1.0]),
        )
        .unwrap();
        let table = compute_metrics(&series, &MetricsConfig::default()).unwrap();

        let path = temp_path("metrics.csv");
        write_metrics_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("country,date,confirmed,deaths,recovered,death_rate,"));
        assert!(lines[3].starts_with("\"Korea, South\",2020-03-03,4,1,1,0.250000,"));
    }

    #[test]
    fn world_csv_lists_each_country() {
        let points = vec![WorldPoint {
            country: "Italy".to_string(),
            confirmed: 200.0,
            deaths: 10.0,
            recovered: 20.0,
            death_rate: 0.05,
        }];
        let path = temp_path("world.csv");
        write_world_csv(&path, &points).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "country,confirmed,deaths,recovered,death_rate\nItaly,200,10,20,0.050000\n");
    }

    #[test]
    fn csv_field_quotes_commas() {
        assert_eq!(csv_field("Italy"), "Italy");
        assert_eq!(csv_field("Korea, South"), "\"Korea, South\"");
    }
}
