//! Error types for the core crate.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised while building a run configuration.
///
/// All variants are fatal: they are reported before any network activity
/// and abort the process with a non-zero exit code. Everything that goes
/// wrong after configuration is reported per repository or per branch
/// instead.
#[derive(Error, Debug)]
pub enum Error {
    /// No API token was supplied.
    #[error("GitHub token cannot be empty")]
    MissingToken,

    /// Both an explicit repository list and an organization list were
    /// supplied.
    #[error("Can't filter repositories by name and organization at the same time")]
    ConflictingSelection,

    /// A branch pattern failed to compile as a regular expression.
    #[error("Invalid branch pattern [{pattern}]: {source}")]
    InvalidBranchPattern {
        pattern: String,
        source: regex::Error,
    },
}
