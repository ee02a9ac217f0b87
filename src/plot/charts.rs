//! Chart builders for each analysis result.

use chrono::NaiveDate;

use crate::domain::{LogisticFit, MetricKind, SirTrajectory, TimeSeries};
use crate::metrics::{MetricsTable, WorldPoint};
use crate::plot::{Annotation, Chart, Series, XAxis};

/// `(day offset from origin, value)` pairs.
pub fn dated_points(series: &TimeSeries, origin: NaiveDate) -> Vec<(f64, f64)> {
    series
        .iter()
        .map(|(d, v)| ((d - origin).num_days() as f64, v))
        .collect()
}

fn origin_of(table: &MetricsTable) -> Option<NaiveDate> {
    table.dates().first().copied()
}

/// One derived metric over time.
pub fn metric_chart(table: &MetricsTable, kind: MetricKind) -> Option<Chart> {
    let origin = origin_of(table)?;
    let label = if table.is_smoothed(kind) {
        format!("{} (smoothed)", table.country)
    } else {
        table.country.clone()
    };
    Some(
        Chart::new(format!("{} in {}", kind.title(), table.country), XAxis::Dates { origin })
            .labels("date", kind.column())
            .with_series(Series::line(label, dated_points(table.metric(kind), origin))),
    )
}

/// Estimated infections overlaid on the confirmed counts.
pub fn estimated_infections_chart(table: &MetricsTable) -> Option<Chart> {
    let origin = origin_of(table)?;
    let kind = MetricKind::EstimatedInfected;
    Some(
        Chart::new(format!("{} in {}", kind.title(), table.country), XAxis::Dates { origin })
            .labels("date", "cases")
            .with_series(Series::line(
                "estimated infections",
                dated_points(table.metric(kind), origin),
            ))
            .with_series(Series::line(
                "confirmed cases",
                dated_points(&table.base.confirmed, origin),
            )),
    )
}

/// Observed cumulative counts and the fitted logistic projection.
pub fn logistic_chart(fit: &LogisticFit) -> Option<Chart> {
    let origin = fit.observed.first_date()?;
    Some(
        Chart::new(
            format!("Least-squares 4PL fit to Covid-19 data: {}", fit.country),
            XAxis::Dates { origin },
        )
        .labels("date", "confirmed cases")
        .with_series(Series::points("observed", dated_points(&fit.observed, origin)))
        .with_series(Series::line("logistic fit", dated_points(&fit.projection, origin))),
    )
}

/// S, I and R trajectories of one simulation.
pub fn sir_chart(traj: &SirTrajectory, title: &str) -> Chart {
    let pairs = |values: &[f64]| -> Vec<(f64, f64)> { traj.t.iter().copied().zip(values.iter().copied()).collect() };
    Chart::new(title, XAxis::Days)
        .labels("days", "people")
        .with_series(Series::line("susceptible", pairs(&traj.susceptible)))
        .with_series(Series::line("infected", pairs(&traj.infected)))
        .with_series(Series::line("recovered", pairs(&traj.recovered)))
}

/// Infected trajectories of a sensitivity fan-out, one line per seed day.
pub fn sir_fan_chart(country: &str, runs: &[(NaiveDate, SirTrajectory)]) -> Chart {
    runs.iter().fold(
        Chart::new(format!("SIR infected projections seeded from {country}"), XAxis::Days).labels("days", "infected"),
        |chart, (seed_day, traj)| {
            chart.with_series(Series::line(
                format!("seed {seed_day}"),
                traj.t.iter().copied().zip(traj.infected.iter().copied()),
            ))
        },
    )
}

/// Deaths against confirmed cases per country on one date, log-log.
pub fn world_chart(points: &[WorldPoint], date: NaiveDate) -> Chart {
    let mut chart = Chart::new(
        format!("Covid-19 Confirmed cases to death cases on {date}"),
        XAxis::Linear,
    )
    .labels("death cases", "confirmed cases")
    .log_log()
    .with_series(Series::points("countries", points.iter().map(|p| (p.deaths, p.confirmed))));

    chart.annotations = points
        .iter()
        .map(|p| Annotation {
            x: p.deaths,
            y: p.confirmed,
            text: p.country.clone(),
        })
        .collect();
    chart
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;
    use crate::domain::{FitStatus, LogisticParams, SirParams};

    fn day(k: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 1).unwrap() + Days::new(k)
    }

    #[test]
    fn logistic_chart_spans_projection() {
        let observed = TimeSeries::new(vec![day(0), day(1)], vec![1.0, 2.0]).unwrap();
        let projection =
            TimeSeries::new(vec![day(0), day(1), day(2), day(3)], vec![1.0, 2.0, 3.0, f64::NAN]).unwrap();
        let fit = LogisticFit {
            country: "X".to_string(),
            initial: LogisticParams::default(),
            params: LogisticParams::default(),
            status: FitStatus::StepConverged,
            rss: 0.0,
            evaluations: 1,
            observed,
            projection,
        };
        let chart = logistic_chart(&fit).unwrap();
        assert_eq!(chart.series[0].points.len(), 2);
        // The NaN projection point is dropped.
        assert_eq!(chart.series[1].points, vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn world_chart_labels_every_country() {
        let points = vec![
            WorldPoint {
                country: "A".to_string(),
                confirmed: 1000.0,
                deaths: 10.0,
                recovered: 0.0,
                death_rate: 0.01,
            },
            WorldPoint {
                country: "B".to_string(),
                confirmed: 50.0,
                deaths: 0.0,
                recovered: 0.0,
                death_rate: 0.0,
            },
        ];
        let chart = world_chart(&points, day(24));
        assert!(chart.log_log);
        assert_eq!(chart.annotations.len(), 2);
        // B has no deaths and cannot sit on a log axis.
        assert_eq!(chart.projected_series()[0].points.len(), 1);
    }

    #[test]
    fn sir_chart_has_three_lines() {
        let traj = SirTrajectory {
            params: SirParams {
                population: 3.0,
                infected: 1.0,
                recovered: 0.0,
                beta: 0.0,
                gamma: 0.0,
                horizon_days: 2,
            },
            t: vec![0.0, 2.0],
            susceptible: vec![2.0, 2.0],
            infected: vec![1.0, 1.0],
            recovered: vec![0.0, 0.0],
        };
        let chart = sir_chart(&traj, "SIR");
        assert_eq!(chart.series.len(), 3);
        assert_eq!(chart.series[1].label, "infected");
    }
}
