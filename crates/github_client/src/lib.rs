//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides a client for making authenticated requests to
//! GitHub using a personal access token, exposing the repository
//! discovery and branch protection operations that a protection run
//! needs.

use async_trait::async_trait;
use http::StatusCode;
use octocrab::{Octocrab, Result as OctocrabResult};
use tracing::{debug, error, instrument};

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{
    Branch, BranchPage, BranchProtection, Permissions, ProtectionRequest, Repository,
    RepositoryPage,
};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Trait for repository discovery operations.
///
/// Listing operations return one page at a time together with the page
/// numbers GitHub reports in its Link header; callers drive pagination
/// themselves.
#[async_trait]
pub trait RepositoryBrowser: Send + Sync {
    /// Lists one page of the repositories visible to the authenticated
    /// token.
    async fn list_repositories(&self, page: u32, per_page: u8)
        -> Result<RepositoryPage, Error>;

    /// Fetches a single repository by owner and name.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the repository does not exist or is
    /// not accessible with the current token.
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error>;

    /// Lists one page of an organization's repositories.
    async fn list_organization_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u8,
    ) -> Result<RepositoryPage, Error>;
}

/// Trait for branch inspection and protection mutations.
#[async_trait]
pub trait BranchProtectionClient: Send + Sync {
    /// Lists one page of a repository's branches.
    async fn list_branches(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> Result<BranchPage, Error>;

    /// Fetches the current state of a single branch.
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error>;

    /// Enables protection on a branch.
    async fn set_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &ProtectionRequest,
    ) -> Result<BranchProtection, Error>;

    /// Removes protection from a branch.
    async fn remove_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<(), Error>;
}

/// A client for interacting with the GitHub API, authenticated with a
/// personal access token.
#[derive(Debug)]
pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RepositoryBrowser for GitHubClient {
    #[instrument(skip(self))]
    async fn list_repositories(
        &self,
        page: u32,
        per_page: u8,
    ) -> Result<RepositoryPage, Error> {
        debug!(page, per_page, "Listing repositories for the authenticated user");
        let result = self
            .client
            .current()
            .list_repos_for_authenticated_user()
            .page(page as u8)
            .per_page(per_page)
            .send()
            .await;
        match result {
            Ok(listing) => Ok(RepositoryPage::from(listing)),
            Err(e) => Err(map_octocrab_error("Failed to list repositories", e)),
        }
    }

    /// Fetches details for a specific repository.
    ///
    /// # Errors
    /// Returns an `Error::NotFound` if the repository does not exist or is
    /// not visible to the token.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        let result = self.client.repos(owner, repo).get().await;
        match result {
            Ok(r) => Ok(Repository::from(r)),
            Err(e) => Err(map_octocrab_error("Failed to get repository", e)),
        }
    }

    #[instrument(skip(self), fields(org = %org))]
    async fn list_organization_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u8,
    ) -> Result<RepositoryPage, Error> {
        debug!(org, page, per_page, "Listing organization repositories");
        let result = self
            .client
            .orgs(org)
            .list_repos()
            .page(page)
            .per_page(per_page)
            .send()
            .await;
        match result {
            Ok(listing) => Ok(RepositoryPage::from(listing)),
            Err(e) => Err(map_octocrab_error(
                "Failed to list organization repositories",
                e,
            )),
        }
    }
}

#[async_trait]
impl BranchProtectionClient for GitHubClient {
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn list_branches(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> Result<BranchPage, Error> {
        let result = self
            .client
            .repos(owner, repo)
            .list_branches()
            .page(page)
            .per_page(per_page)
            .send()
            .await;
        match result {
            Ok(listing) => Ok(BranchPage::from(listing)),
            Err(e) => Err(map_octocrab_error("Failed to list branches", e)),
        }
    }

    /// Fetches the current state of a branch.
    ///
    /// Octocrab has no high-level call for this endpoint, so the request
    /// goes through the REST API directly.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}");
        let result: OctocrabResult<octocrab::models::repos::Branch> =
            self.client.get(path, None::<&()>).await;
        match result {
            Ok(b) => Ok(Branch::from(b)),
            Err(e) => Err(map_octocrab_error("Failed to get branch", e)),
        }
    }

    #[instrument(skip(self, request), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn set_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &ProtectionRequest,
    ) -> Result<BranchProtection, Error> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}/protection");
        let result: OctocrabResult<BranchProtection> = self.client.put(path, Some(request)).await;
        match result {
            Ok(protection) => Ok(protection),
            Err(e) => Err(map_octocrab_error("Failed to set branch protection", e)),
        }
    }

    /// Removes protection from a branch.
    ///
    /// The endpoint answers 204 with no body, so the raw response is
    /// inspected instead of deserialized.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn remove_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<(), Error> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}/protection");
        let response = self
            .client
            ._delete(path, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("Failed to remove branch protection", e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            status => Err(Error::UnexpectedStatus(status)),
        }
    }
}

/// Creates an `Octocrab` client authenticated with a personal access
/// token.
///
/// # Errors
/// Returns an `Error::AuthError` if the client cannot be built.
#[instrument(skip(token))]
pub fn create_token_client(token: &str) -> Result<Octocrab, Error> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|e| Error::AuthError(format!("Failed to build the GitHub client: {e}")))
}

/// Classifies an octocrab error into a crate error, logging it on the
/// way.
fn map_octocrab_error(message: &str, e: octocrab::Error) -> Error {
    let mapped = match &e {
        octocrab::Error::GitHub { source, .. } => {
            if source.status_code == StatusCode::NOT_FOUND {
                Some(Error::NotFound)
            } else if source.status_code == StatusCode::FORBIDDEN
                && source.message.contains("rate limit")
            {
                Some(Error::RateLimitExceeded)
            } else {
                Some(Error::Api(source.message.clone()))
            }
        }
        _ => None,
    };
    let fallback = e.to_string();
    log_octocrab_error(message, e);
    mapped.unwrap_or(Error::Api(fallback))
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => error!(
            error_message = source.message,
            backtrace = backtrace.to_string(),
            "{}. Received an error from GitHub",
            message
        ),
        octocrab::Error::Serde { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to deserialize the response.",
            message
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
