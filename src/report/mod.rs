//! Reporting utilities: run-summary records and formatted terminal output.

pub mod format;

pub use format::*;

/// Outcome of one driver task, as listed in the run summary.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub name: String,
    /// `None` when the task succeeded.
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
