//! Branch name filtering.

use regex::Regex;

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;

/// Decides whether a branch name is in scope for protection changes.
///
/// A branch is accepted when at least one configured pattern matches
/// anywhere in its name. Patterns that need an exact match must anchor
/// themselves, like the default `^master$` does.
#[derive(Debug, Clone)]
pub struct BranchMatcher {
    patterns: Vec<Regex>,
}

impl BranchMatcher {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Returns true when any configured pattern matches the branch name.
    pub fn accept(&self, branch_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.is_match(branch_name))
    }
}
