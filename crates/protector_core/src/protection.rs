//! The protection engine.
//!
//! Consumes one repository at a time: gates on admin rights, lists and
//! filters the branches, then locks or unlocks each matching branch and
//! reports exactly one outcome per branch. Success lines go to the
//! success output, failure lines to the failure output, both in the
//! format `"<owner>/<repo>: <branch> <description>"`.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use github_client::{Branch, BranchProtectionClient, ProtectionRequest, Repository};
use tracing::debug;

use crate::matcher::BranchMatcher;

#[cfg(test)]
#[path = "protection_tests.rs"]
mod tests;

/// Number of branches requested per listing page.
const BRANCH_PAGE_SIZE: u8 = 100;

/// Result of acting on a single branch.
///
/// Exactly one outcome is produced per matched branch: either a success
/// (including "nothing to do" and dry-run announcements) or a failure
/// carrying the error text. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        repository: String,
        branch: String,
        description: String,
    },
    Failure {
        repository: String,
        branch: String,
        error: String,
    },
}

impl Outcome {
    fn success(repository: &Repository, branch: &str, description: &str) -> Self {
        Outcome::Success {
            repository: repository.full_name().to_string(),
            branch: branch.to_string(),
            description: description.to_string(),
        }
    }

    fn failure(repository: &Repository, branch: &str, error: String) -> Self {
        Outcome::Failure {
            repository: repository.full_name().to_string(),
            branch: branch.to_string(),
            error,
        }
    }

    /// Formats the outcome as a single report line.
    pub fn message(&self) -> String {
        match self {
            Outcome::Success {
                repository,
                branch,
                description,
            } => format!("{repository}: {branch} {description}"),
            Outcome::Failure {
                repository,
                branch,
                error,
            } => format!("{repository}: {branch} {error}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// The per-branch action a run applies.
#[derive(Debug, Clone, Copy)]
enum BranchAction {
    Lock,
    Unlock,
}

/// Applies or removes protection on every matching branch of a
/// repository.
pub struct ProtectionEngine {
    client: Arc<dyn BranchProtectionClient>,
    matcher: BranchMatcher,
    dry_run: bool,
    success_output: Mutex<Box<dyn Write + Send>>,
    failure_output: Mutex<Box<dyn Write + Send>>,
}

impl ProtectionEngine {
    /// Creates an engine reporting to standard output and standard error.
    pub fn new(
        client: Arc<dyn BranchProtectionClient>,
        matcher: BranchMatcher,
        dry_run: bool,
    ) -> Self {
        Self::with_outputs(
            client,
            matcher,
            dry_run,
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        )
    }

    /// Creates an engine reporting to the given sinks.
    pub fn with_outputs(
        client: Arc<dyn BranchProtectionClient>,
        matcher: BranchMatcher,
        dry_run: bool,
        success_output: Box<dyn Write + Send>,
        failure_output: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            client,
            matcher,
            dry_run,
            success_output: Mutex::new(success_output),
            failure_output: Mutex::new(failure_output),
        }
    }

    /// Enables protection on every matching branch of the repository.
    pub async fn protect(&self, repository: &Repository) {
        self.process(repository, BranchAction::Lock).await;
    }

    /// Removes protection from every matching branch of the repository.
    pub async fn free(&self, repository: &Repository) {
        self.process(repository, BranchAction::Unlock).await;
    }

    async fn process(&self, repository: &Repository, action: BranchAction) {
        if !repository.has_admin_rights() {
            self.report_failure(&format!(
                "{}: you don't have admin rights to modify this repository",
                repository.full_name()
            ));
            return;
        }

        let branches = match self.filter_branches(repository).await {
            Ok(branches) => branches,
            Err(error) => {
                // A listing error aborts the whole repository, reported once.
                self.report_failure(&format!("{}: {error}", repository.full_name()));
                return;
            }
        };

        for branch in branches {
            let outcome = match action {
                BranchAction::Lock => self.lock(repository, branch.name()).await,
                BranchAction::Unlock => self.unlock(repository, branch.name()).await,
            };
            self.report(&outcome);
        }
    }

    /// Lists the repository's branches and keeps those matching the
    /// configured patterns.
    async fn filter_branches(
        &self,
        repository: &Repository,
    ) -> Result<Vec<Branch>, github_client::Error> {
        let mut accepted = Vec::new();
        let mut page = 1;
        loop {
            let listing = self
                .client
                .list_branches(
                    repository.owner(),
                    repository.name(),
                    page,
                    BRANCH_PAGE_SIZE,
                )
                .await?;

            accepted.extend(
                listing
                    .branches
                    .into_iter()
                    .filter(|branch| self.matcher.accept(branch.name())),
            );

            match listing.next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        debug!(
            repository = %repository.full_name(),
            accepted = accepted.len(),
            "Filtered branches"
        );
        Ok(accepted)
    }

    /// Enables protection on one branch.
    ///
    /// The branch is re-fetched first so the decision is not made on
    /// stale listing data.
    async fn lock(&self, repository: &Repository, branch_name: &str) -> Outcome {
        let branch = match self
            .client
            .get_branch(repository.owner(), repository.name(), branch_name)
            .await
        {
            Ok(branch) => branch,
            Err(error) => return Outcome::failure(repository, branch_name, error.to_string()),
        };

        if branch.is_protected() {
            return Outcome::success(repository, branch_name, "is already protected");
        }

        if self.dry_run {
            return Outcome::success(repository, branch_name, "will be set to protected");
        }

        match self
            .client
            .set_branch_protection(
                repository.owner(),
                repository.name(),
                branch_name,
                &ProtectionRequest::default(),
            )
            .await
        {
            Ok(_) => Outcome::success(repository, branch_name, "is now protected"),
            Err(error) => Outcome::failure(repository, branch_name, error.to_string()),
        }
    }

    /// Removes protection from one branch.
    async fn unlock(&self, repository: &Repository, branch_name: &str) -> Outcome {
        let branch = match self
            .client
            .get_branch(repository.owner(), repository.name(), branch_name)
            .await
        {
            Ok(branch) => branch,
            Err(error) => return Outcome::failure(repository, branch_name, error.to_string()),
        };

        if !branch.is_protected() {
            return Outcome::success(repository, branch_name, "is already unprotected");
        }

        if self.dry_run {
            return Outcome::success(repository, branch_name, "will be freed");
        }

        match self
            .client
            .remove_branch_protection(repository.owner(), repository.name(), branch_name)
            .await
        {
            Ok(()) => Outcome::success(repository, branch_name, "is now free"),
            Err(error) => Outcome::failure(repository, branch_name, error.to_string()),
        }
    }

    fn report(&self, outcome: &Outcome) {
        if outcome.is_success() {
            self.report_success(&outcome.message());
        } else {
            self.report_failure(&outcome.message());
        }
    }

    fn report_success(&self, line: &str) {
        if let Ok(mut output) = self.success_output.lock() {
            let _ = writeln!(output, "{line}");
        }
    }

    fn report_failure(&self, line: &str) {
        if let Ok(mut output) = self.failure_output.lock() {
            let _ = writeln!(output, "{line}");
        }
    }
}
