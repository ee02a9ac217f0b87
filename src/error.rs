//! Application error type.
//!
//! Every fallible operation in the crate returns `Result<_, AppError>`. The
//! error carries the process exit code the binary should use if it bubbles all
//! the way up:
//!
//! - `2`: invalid arguments or unreadable/unwritable user paths
//! - `3`: data-shape problems (unknown country, misaligned dates, bad headers)
//! - `4`: runtime failures (network, rejected model inputs, rendering)

pub const EXIT_INPUT: u8 = 2;
pub const EXIT_DATA: u8 = 3;
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(EXIT_DATA, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with where the failure happened, keeping the exit code.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_exit_code() {
        let err = AppError::data("Unknown country 'Atlantis'.").context("load Atlantis");
        assert_eq!(err.exit_code(), EXIT_DATA);
        assert_eq!(err.to_string(), "load Atlantis: Unknown country 'Atlantis'.");
    }
}
