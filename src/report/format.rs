//! Formatted terminal output.
//!
//! We keep formatting code in one place so the math and fitting code stays
//! free of presentation concerns and output changes stay localized.

use chrono::{Days, NaiveDate};

use crate::domain::{LogisticFit, MetricKind, SirTrajectory};
use crate::metrics::{MetricsTable, WorldPoint};
use crate::report::TaskRecord;

/// Latest counts and per-metric latest/maximum values for one country.
pub fn format_metrics_summary(table: &MetricsTable) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", table.country));
    match (table.dates().first(), table.dates().last()) {
        (Some(first), Some(last)) => {
            out.push_str(&format!("Dates: {first} .. {last} ({} days)\n", table.len()));
        }
        _ => {
            out.push_str("Dates: (none)\n");
            return out;
        }
    }

    let last = table.len() - 1;
    out.push_str(&format!(
        "Latest: confirmed={} deaths={} recovered={}\n",
        table.base.confirmed.values()[last],
        table.base.deaths.values()[last],
        table.base.recovered.values()[last]
    ));

    out.push_str(&format!("\n{:<20} {:>14} {:>14}\n", "metric", "latest", "max"));
    out.push_str(&format!("{:-<20} {:-<14} {:-<14}\n", "", "", ""));
    for (kind, series) in table.iter() {
        let values = series.values();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let name = if table.is_smoothed(kind) {
            format!("{}*", kind.column())
        } else {
            kind.column().to_string()
        };
        out.push_str(&format!(
            "{name:<20} {:>14} {:>14}\n",
            fmt_value(kind, values[last]),
            fmt_value(kind, max)
        ));
    }
    if MetricKind::ALL.iter().any(|k| table.is_smoothed(*k)) {
        out.push_str("(* smoothed with Savitzky-Golay)\n");
    }

    out
}

fn fmt_value(kind: MetricKind, v: f64) -> String {
    match kind {
        MetricKind::DeathRate | MetricKind::RecoveryRate | MetricKind::DailyGrowth | MetricKind::GrowthFactor => {
            format!("{v:.4}")
        }
        MetricKind::NewCases | MetricKind::EstimatedInfected => format!("{v:.0}"),
    }
}

/// Fitted parameters, solver outcome and what the curve implies.
pub fn format_logistic_summary(fit: &LogisticFit) -> String {
    let mut out = String::new();
    let p = &fit.params;

    out.push_str(&format!("=== Logistic fit: {} ===\n", fit.country));
    out.push_str(&format!(
        "Observed: {} days from {}\n",
        fit.observed.len(),
        fit.observed
            .first_date()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!(
        "Initial guess: a={} b={} c={} d={}\n",
        fit.initial.a, fit.initial.b, fit.initial.c, fit.initial.d
    ));
    out.push_str(&format!(
        "Parameters: a={:.4} b={:.4} c={:.4} d={:.4}\n",
        p.a, p.b, p.c, p.d
    ));
    out.push_str(&format!(
        "Solver: {} | rss={:.6e} | evaluations={}\n",
        fit.status.display_name(),
        fit.rss,
        fit.evaluations
    ));

    if let Some(date) = inflection_date(fit) {
        out.push_str(&format!("Inflection: day {:.1} ({date})\n", p.c));
    }
    out.push_str(&format!("Plateau (d): {:.0}\n", p.d));
    if let (Some(date), Some(v)) = (fit.projection.last_date(), fit.projection.values().last()) {
        out.push_str(&format!("Projection end: {date} -> {v:.0}\n"));
    }

    out
}

fn inflection_date(fit: &LogisticFit) -> Option<NaiveDate> {
    let c = fit.params.c;
    if !(c.is_finite() && c >= 0.0 && c < 1e5) {
        return None;
    }
    fit.observed.first_date()?.checked_add_days(Days::new(c.round() as u64))
}

/// Parameters, peak and final state of one SIR run.
pub fn format_sir_summary(traj: &SirTrajectory, label: &str) -> String {
    let mut out = String::new();
    let p = &traj.params;

    out.push_str(&format!("=== SIR: {label} ===\n"));
    out.push_str(&format!(
        "N={:.0} I0={:.0} R0={:.0} beta={:.4} gamma={:.4} (R0 ratio={:.2}) horizon={} days\n",
        p.population,
        p.infected,
        p.recovered,
        p.beta,
        p.gamma,
        p.beta / p.gamma,
        p.horizon_days
    ));
    if let Some((t, i)) = traj.peak_infected() {
        out.push_str(&format!("Peak infected: {i:.0} at day {t:.1}\n"));
    }
    if !traj.is_empty() {
        let end = traj.state(traj.len() - 1);
        out.push_str(&format!(
            "Final: S={:.0} I={:.0} R={:.0}\n",
            end.susceptible, end.infected, end.recovered
        ));
    }

    out
}

/// One row per sensitivity run.
pub fn format_sir_fan(country: &str, runs: &[(NaiveDate, SirTrajectory)]) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== SIR sensitivity: {country} ===\n"));
    out.push_str(&format!(
        "{:<12} {:>12} {:>12} {:>10} {:>14} {:>14}\n",
        "seed day", "I0", "R0", "peak day", "peak I", "final R"
    ));
    out.push_str(&format!(
        "{:-<12} {:-<12} {:-<12} {:-<10} {:-<14} {:-<14}\n",
        "", "", "", "", "", ""
    ));
    for (day, traj) in runs {
        let (peak_t, peak_i) = traj.peak_infected().unwrap_or((f64::NAN, f64::NAN));
        let final_r = traj.recovered.last().copied().unwrap_or(f64::NAN);
        out.push_str(&format!(
            "{:<12} {:>12.0} {:>12.0} {:>10.1} {:>14.0} {:>14.0}\n",
            day.to_string(),
            traj.params.infected,
            traj.params.recovered,
            peak_t,
            peak_i,
            final_r
        ));
    }
    out
}

/// Per-country totals on the snapshot date.
pub fn format_world_table(points: &[WorldPoint], date: NaiveDate) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== World snapshot on {date} ===\n"));
    out.push_str(&format!(
        "{:<24} {:>12} {:>10} {:>12} {:>10}\n",
        "country", "confirmed", "deaths", "recovered", "death %"
    ));
    out.push_str(&format!("{:-<24} {:-<12} {:-<10} {:-<12} {:-<10}\n", "", "", "", "", ""));
    for p in points {
        out.push_str(&format!(
            "{:<24} {:>12.0} {:>10.0} {:>12.0} {:>10.2}\n",
            p.country,
            p.confirmed,
            p.deaths,
            p.recovered,
            p.death_rate * 100.0
        ));
    }
    out
}

/// One line per task plus a totals line.
pub fn format_task_summary(records: &[TaskRecord]) -> String {
    let mut out = String::new();
    out.push_str("=== Run summary ===\n");
    for r in records {
        match &r.error {
            None => out.push_str(&format!("[ok]     {}\n", r.name)),
            Some(e) => out.push_str(&format!("[failed] {}: {e}\n", r.name)),
        }
    }
    let ok = records.iter().filter(|r| r.is_ok()).count();
    out.push_str(&format!("{ok}/{} tasks succeeded\n", records.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitStatus, LogisticParams, SirParams, TimeSeries};

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, n).unwrap()
    }

    #[test]
    fn task_summary_counts_successes() {
        let txt = format_task_summary(&[TaskRecord::ok("metrics: Italy"), TaskRecord::failed("logistic: Atlantis", "unknown country")]);
        assert_eq!(
            txt,
            "=== Run summary ===\n[ok]     metrics: Italy\n[failed] logistic: Atlantis: unknown country\n1/2 tasks succeeded\n"
        );
    }

    #[test]
    fn logistic_summary_mentions_inflection_date() {
        let fit = LogisticFit {
            country: "X".to_string(),
            initial: LogisticParams::default(),
            params: LogisticParams {
                a: 0.0,
                b: 3.0,
                c: 4.2,
                d: 1000.0,
            },
            status: FitStatus::MaxEvaluations,
            rss: 1.0,
            evaluations: 1000,
            observed: TimeSeries::new(vec![day(1), day(2)], vec![1.0, 2.0]).unwrap(),
            projection: TimeSeries::new(vec![day(1), day(2), day(3), day(4)], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        };
        let txt = format_logistic_summary(&fit);
        assert!(txt.contains("Inflection: day 4.2 (2020-03-05)"), "{txt}");
        assert!(txt.contains("evaluation budget exhausted"));
        assert!(txt.contains("Projection end: 2020-03-04 -> 4"));
    }

    #[test]
    fn sir_summary_reports_peak() {
        let traj = SirTrajectory {
            params: SirParams {
                population: 100.0,
                infected: 1.0,
                recovered: 0.0,
                beta: 0.3,
                gamma: 0.1,
                horizon_days: 3,
            },
            t: vec![0.0, 1.5, 3.0],
            susceptible: vec![99.0, 90.0, 85.0],
            infected: vec![1.0, 8.0, 6.0],
            recovered: vec![0.0, 2.0, 9.0],
        };
        let txt = format_sir_summary(&traj, "test");
        assert!(txt.contains("Peak infected: 8 at day 1.5"));
        assert!(txt.contains("Final: S=85 I=6 R=9"));
    }

    #[test]
    fn world_table_has_one_row_per_country() {
        let points = vec![WorldPoint {
            country: "Tunisia".to_string(),
            confirmed: 173.0,
            deaths: 5.0,
            recovered: 1.0,
            death_rate: 5.0 / 173.0,
        }];
        let txt = format_world_table(&points, day(25));
        assert_eq!(txt.lines().count(), 4);
        assert!(txt.lines().nth(3).unwrap().starts_with("Tunisia"));
    }
}
