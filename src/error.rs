//! Structured error handling and exit codes.

use serde::Serialize;

use crate::signal::EXIT_CODE_INTERRUPTED;

/// Process exit codes.
///
/// - 0: Success (the requested pass ran to completion)
/// - 1: General error (store, configuration or report failure)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The requested pass completed.
    Success = 0,
    /// A fatal error aborted the pass.
    GeneralError = 1,
    /// The pass stopped at a batch boundary after Ctrl+C.
    Interrupted = EXIT_CODE_INTERRUPTED as isize,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "INV000",
            Self::GeneralError => "INV001",
            Self::Interrupted => "INV130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "INV001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, outermost context first
    pub message: String,
    /// Context chain below the message
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}
