//! Independent driver tasks.
//!
//! One task failing (an unknown country, a fit that cannot start, a chart that
//! cannot be written) is logged and recorded; the remaining tasks still run.
//! The command only fails when nothing succeeded.

use crate::error::AppError;
use crate::report::TaskRecord;

#[derive(Debug, Default)]
pub struct TaskRunner {
    records: Vec<TaskRecord>,
    first_error: Option<AppError>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task`, recording its outcome under `name`.
    pub fn run<T>(&mut self, name: impl Into<String>, task: impl FnOnce() -> Result<T, AppError>) -> Option<T> {
        let name = name.into();
        self.settle(name, task())
    }

    /// Record an already computed result (e.g. from a parallel batch).
    pub fn settle<T>(&mut self, name: impl Into<String>, result: Result<T, AppError>) -> Option<T> {
        let name = name.into();
        match result {
            Ok(value) => {
                self.records.push(TaskRecord::ok(name));
                Some(value)
            }
            Err(err) => {
                log::error!("{name}: {err}");
                self.records.push(TaskRecord::failed(name, err.message()));
                if self.first_error.is_none() {
                    self.first_error = Some(err);
                }
                None
            }
        }
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// Finish the run: an error (carrying the first failure's exit code) only
    /// when every task failed.
    pub fn finish(self) -> Result<Vec<TaskRecord>, AppError> {
        let any_ok = self.records.iter().any(TaskRecord::is_ok);
        match self.first_error {
            Some(err) if !any_ok => Err(err.context("every task failed")),
            _ => Ok(self.records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_INPUT;

    #[test]
    fn one_failure_does_not_fail_the_run() {
        let mut runner = TaskRunner::new();
        assert_eq!(runner.run("a", || Ok(1)), Some(1));
        assert_eq!(runner.run::<()>("b", || Err(AppError::data("boom"))), None);
        let records = runner.finish().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert_eq!(records[1].error.as_deref(), Some("boom"));
    }

    #[test]
    fn all_failures_return_the_first_exit_code() {
        let mut runner = TaskRunner::new();
        runner.run::<()>("a", || Err(AppError::input("bad flag")));
        runner.settle::<()>("b", Err(AppError::data("bad row")));
        let err = runner.finish().unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.message().contains("bad flag"));
    }

    #[test]
    fn an_empty_run_succeeds() {
        assert!(TaskRunner::new().finish().unwrap().is_empty());
    }
}
