//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initialises logging
//! - parses CLI arguments
//! - loads the CSSE tables once per run
//! - runs each country's analysis as an independent task
//! - prints summaries, renders charts and writes optional exports

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;

use crate::cli::{Cli, Command, PlotArgs};
use crate::domain::{LogisticFit, MetricKind, SirParams};
use crate::error::AppError;
use crate::io::{read_fit_json, write_fit_json, write_metrics_csv, write_sir_csv, write_world_csv};
use crate::metrics::{MetricsTable, WorldPoint};
use crate::models::simulate;
use crate::plot::{
    ChartSink, estimated_infections_chart, logistic_chart, metric_chart, sir_chart, sir_fan_chart, slug,
    world_chart,
};
use crate::report::{
    format_logistic_summary, format_metrics_summary, format_sir_fan, format_sir_summary, format_task_summary,
    format_world_table,
};

pub mod pipeline;
pub mod tasks;

use pipeline::{Pipeline, SeededRun};
use tasks::TaskRunner;

/// Entry point for the `epi` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    // `epi` and `epi -c France` behave like `epi report ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    match &cli.command {
        Command::Plot(args) => handle_plot(args),
        command => handle_analysis(command),
    }
}

fn init_logging() {
    // A second init (tests, embedding) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

fn handle_analysis(command: &Command) -> Result<(), AppError> {
    let config = command
        .analysis_config()?
        .ok_or_else(|| AppError::runtime("Command does not analyse any data."))?;
    let out = Presenter {
        sink: ChartSink::new(&config.output),
        export_dir: config.export_dir.clone(),
    };
    let mut runner = TaskRunner::new();

    if let Command::Sir(args) = command
        && let Some(params) = args.explicit_params()
    {
        runner.run("sir", || out.sir_run(params));
    } else {
        let pipeline = Pipeline::load(config)?;
        match command {
            Command::Metrics(_) => metrics_tasks(&pipeline, &out, &mut runner),
            Command::Logistic(_) => logistic_tasks(&pipeline, &out, &mut runner),
            Command::Sir(_) => sir_tasks(&pipeline, &out, &mut runner),
            Command::World(_) => world_tasks(&pipeline, &out, &mut runner),
            Command::Report(_) => {
                metrics_tasks(&pipeline, &out, &mut runner);
                logistic_tasks(&pipeline, &out, &mut runner);
                sir_tasks(&pipeline, &out, &mut runner);
            }
            Command::Plot(_) => {}
        }
    }

    println!("{}", format_task_summary(runner.records()));
    runner.finish().map(|_| ())
}

fn metrics_tasks(pipeline: &Pipeline, out: &Presenter, runner: &mut TaskRunner) {
    for (country, result) in pipeline.countries().iter().zip(pipeline.metrics()) {
        runner.run(format!("metrics {country}"), || out.metrics(&result?));
    }
}

fn logistic_tasks(pipeline: &Pipeline, out: &Presenter, runner: &mut TaskRunner) {
    for (country, result) in pipeline.countries().iter().zip(pipeline.logistic()) {
        runner.run(format!("logistic {country}"), || out.logistic(&result?));
    }
}

fn sir_tasks(pipeline: &Pipeline, out: &Presenter, runner: &mut TaskRunner) {
    for country in pipeline.countries() {
        let Some(seeded) = runner.run(format!("sir seeds {country}"), || pipeline.sir_fan(country)) else {
            continue;
        };
        let runs: Vec<SeededRun> = seeded
            .into_iter()
            .filter_map(|(date, run)| runner.settle(format!("sir {country} {date}"), run).map(|traj| (date, traj)))
            .collect();
        if !runs.is_empty() {
            runner.run(format!("sir {country}"), || out.sir_fan(country, &runs));
        }
    }
}

fn world_tasks(pipeline: &Pipeline, out: &Presenter, runner: &mut TaskRunner) {
    let points: Vec<WorldPoint> = pipeline
        .countries()
        .iter()
        .zip(pipeline.world())
        .filter_map(|(country, result)| runner.settle(format!("world {country}"), result))
        .collect();
    if !points.is_empty() {
        let date = pipeline.config().world_date;
        runner.run(format!("world snapshot {date}"), || out.world(&points, date));
    }
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    let fit = read_fit_json(&args.fit)?;
    let out = Presenter {
        sink: ChartSink::new(&args.output.output_config()),
        export_dir: None,
    };
    out.logistic(&fit)
}

/// Terminal output, charts and exports for computed results.
struct Presenter {
    sink: ChartSink,
    export_dir: Option<PathBuf>,
}

impl Presenter {
    fn export_path(&self, file_name: String) -> Option<PathBuf> {
        self.export_dir.as_deref().map(|dir: &Path| dir.join(file_name))
    }

    fn metrics(&self, table: &MetricsTable) -> Result<(), AppError> {
        println!("{}", format_metrics_summary(table));
        let country = &table.country;

        for kind in MetricKind::ALL {
            if let Some(chart) = metric_chart(table, kind) {
                self.sink.emit(&chart, &format!("{country} {}", kind.column()))?;
            }
        }
        if let Some(chart) = estimated_infections_chart(table) {
            self.sink.emit(&chart, &format!("{country} estimated vs confirmed"))?;
        }

        if let Some(path) = self.export_path(format!("{}_metrics.csv", slug(country))) {
            write_metrics_csv(&path, table)?;
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }

    fn logistic(&self, fit: &LogisticFit) -> Result<(), AppError> {
        println!("{}", format_logistic_summary(fit));
        if let Some(chart) = logistic_chart(fit) {
            self.sink.emit(&chart, &format!("{} logistic", fit.country))?;
        }
        if let Some(path) = self.export_path(format!("{}_logistic.json", slug(&fit.country))) {
            write_fit_json(&path, fit)?;
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }

    fn sir_fan(&self, country: &str, runs: &[SeededRun]) -> Result<(), AppError> {
        println!("{}", format_sir_fan(country, runs));
        self.sink.emit(&sir_fan_chart(country, runs), &format!("{country} sir fan"))?;

        if let Some((date, latest)) = runs.last() {
            let label = format!("SIR model seeded from {country} on {date}");
            println!("{}", format_sir_summary(latest, &label));
            self.sink.emit(&sir_chart(latest, &label), &format!("{country} sir"))?;
        }

        for (date, traj) in runs {
            if let Some(path) = self.export_path(format!("{}_sir_{}.csv", slug(country), date.format("%Y-%m-%d"))) {
                write_sir_csv(&path, traj)?;
                log::info!("wrote {}", path.display());
            }
        }
        Ok(())
    }

    fn sir_run(&self, params: SirParams) -> Result<(), AppError> {
        let traj = simulate(params)?;
        let label = format!(
            "SIR model (N={}, I0={}, R0={}, beta={}, gamma={:.4})",
            params.population, params.infected, params.recovered, params.beta, params.gamma
        );
        println!("{}", format_sir_summary(&traj, &label));
        self.sink.emit(&sir_chart(&traj, &label), "sir")?;
        if let Some(path) = self.export_path("sir.csv".to_string()) {
            write_sir_csv(&path, &traj)?;
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }

    fn world(&self, points: &[WorldPoint], date: NaiveDate) -> Result<(), AppError> {
        println!("{}", format_world_table(points, date));
        self.sink.emit(&world_chart(points, date), &format!("world {date}"))?;
        if let Some(path) = self.export_path(format!("world_{}.csv", date.format("%Y-%m-%d"))) {
            write_world_csv(&path, points)?;
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }
}

/// Rewrite argv so `epi` defaults to `epi report`.
///
/// Rules:
/// - `epi`                       -> `epi report`
/// - `epi -c France ...`         -> `epi report -c France ...`
/// - `epi --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("report".to_string());
        return argv;
    };

    if matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help") {
        return argv;
    }
    if arg1.starts_with('-') {
        argv.insert(1, "report".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_the_report() {
        assert_eq!(rewrite_args(argv(&["epi"])), argv(&["epi", "report"]));
        assert_eq!(
            rewrite_args(argv(&["epi", "-c", "France"])),
            argv(&["epi", "report", "-c", "France"])
        );
    }

    #[test]
    fn subcommands_and_help_are_left_alone() {
        assert_eq!(rewrite_args(argv(&["epi", "sir"])), argv(&["epi", "sir"]));
        assert_eq!(rewrite_args(argv(&["epi", "--help"])), argv(&["epi", "--help"]));
    }

    #[test]
    fn rewritten_argv_parses() {
        let cli = Cli::try_parse_from(rewrite_args(argv(&["epi", "--synthetic"]))).unwrap();
        assert!(matches!(cli.command, Command::Report(_)));
    }
}
