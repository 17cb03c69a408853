//! Run configuration.
//!
//! A [`RunConfig`] is built once from parsed command-line input and stays
//! immutable for the whole run. All validation happens here, before any
//! network activity: token presence, the mutual exclusion of explicit
//! repositories and organizations, and branch pattern compilation.

use regex::Regex;
use secrecy::SecretString;

use crate::errors::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Branch pattern applied when none is configured.
///
/// Anchored on purpose: without patterns only the branch literally named
/// "master" is touched.
pub const DEFAULT_BRANCH_PATTERN: &str = "^master$";

/// Raw options as collected from the command line.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// GitHub API token
    pub token: String,
    /// Report intended changes without applying them
    pub dry_run: bool,
    /// Remove protection instead of enabling it
    pub unprotect: bool,
    /// Explicit "owner/name" repositories to operate on
    pub repositories: Vec<String>,
    /// Organizations whose repositories to operate on
    pub organizations: Vec<String>,
    /// Branch patterns, as regular expressions
    pub branch_patterns: Vec<String>,
}

/// Immutable configuration for a single run.
#[derive(Debug)]
pub struct RunConfig {
    token: SecretString,
    dry_run: bool,
    unprotect: bool,
    repositories: Vec<String>,
    organizations: Vec<String>,
    branch_patterns: Vec<Regex>,
}

impl RunConfig {
    /// Validates raw options and compiles the branch patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingToken`] when no token was supplied,
    /// [`Error::ConflictingSelection`] when both repositories and
    /// organizations are given, and [`Error::InvalidBranchPattern`] for a
    /// pattern that does not compile.
    pub fn from_options(options: RunOptions) -> Result<Self, Error> {
        if options.token.is_empty() {
            return Err(Error::MissingToken);
        }

        if !options.repositories.is_empty() && !options.organizations.is_empty() {
            return Err(Error::ConflictingSelection);
        }

        let mut branch_patterns = Vec::with_capacity(options.branch_patterns.len());
        for pattern in &options.branch_patterns {
            let compiled = Regex::new(pattern).map_err(|source| Error::InvalidBranchPattern {
                pattern: pattern.clone(),
                source,
            })?;
            branch_patterns.push(compiled);
        }
        if branch_patterns.is_empty() {
            branch_patterns
                .push(Regex::new(DEFAULT_BRANCH_PATTERN).expect("default branch pattern compiles"));
        }

        Ok(Self {
            token: options.token.into(),
            dry_run: options.dry_run,
            unprotect: options.unprotect,
            repositories: options.repositories,
            organizations: options.organizations,
            branch_patterns,
        })
    }

    /// Returns the API token.
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Returns whether changes are only reported, not applied.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns whether protection is removed instead of enabled.
    pub fn unprotect(&self) -> bool {
        self.unprotect
    }

    /// Returns the explicit "owner/name" repository selection.
    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    /// Returns the organization selection.
    pub fn organizations(&self) -> &[String] {
        &self.organizations
    }

    /// Returns the compiled branch patterns.
    pub fn branch_patterns(&self) -> &[Regex] {
        &self.branch_patterns
    }
}
