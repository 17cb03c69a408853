//! Domain models for repositories, branches and protection settings.
//!
//! These types are converted from octocrab models where octocrab covers the
//! endpoint, or deserialized straight from REST responses where it does not.

use serde::{Deserialize, Serialize};
use url::Url;

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Permissions granted to the authenticated token on a repository.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Permissions {
    /// Whether the token may change repository settings
    #[serde(default)]
    pub admin: bool,
    /// Whether the token may push to the repository
    #[serde(default)]
    pub push: bool,
    /// Whether the token may read the repository
    #[serde(default)]
    pub pull: bool,
}

impl From<octocrab::models::Permissions> for Permissions {
    fn from(value: octocrab::models::Permissions) -> Self {
        Self {
            admin: value.admin,
            push: value.push,
            pull: value.pull,
        }
    }
}

/// Represents a GitHub repository as seen by the protection run.
///
/// Carries the identity of the repository and the permissions the token
/// holds on it. Fetched fresh at the start of a run and immutable for the
/// run's duration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Repository {
    /// The login of the owning user or organization
    owner: String,
    /// The name of the repository
    name: String,
    /// The full name of the repository (owner/name)
    full_name: String,
    /// Permissions of the authenticated token, when known
    permissions: Option<Permissions>,
}

impl Repository {
    /// Creates a new Repository instance.
    pub fn new(owner: &str, name: &str, permissions: Option<Permissions>) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{owner}/{name}"),
            permissions,
        }
    }

    /// Returns the login of the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the name of the repository (without owner).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full name of the repository (owner/name).
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns true when the token holds admin rights on the repository.
    ///
    /// Unknown permissions count as no rights.
    pub fn has_admin_rights(&self) -> bool {
        self.permissions
            .as_ref()
            .map(|permissions| permissions.admin)
            .unwrap_or(false)
    }

    /// Returns the web URL of the repository.
    ///
    /// # Panics
    ///
    /// Panics if the repository full name cannot be formatted into a valid
    /// URL. This should not happen with valid GitHub repository names.
    pub fn url(&self) -> Url {
        Url::parse(&format!("https://github.com/{}", self.full_name))
            .expect("Valid GitHub repository URL")
    }
}

impl From<octocrab::models::Repository> for Repository {
    fn from(value: octocrab::models::Repository) -> Self {
        let owner = value
            .owner
            .map(|author| author.login)
            .unwrap_or_default();
        let full_name = value
            .full_name
            .unwrap_or_else(|| format!("{}/{}", owner, value.name));
        Self {
            owner,
            name: value.name,
            full_name,
            permissions: value.permissions.map(Permissions::from),
        }
    }
}

/// A branch of a repository together with its protection state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Branch {
    /// The name of the branch
    name: String,
    /// Whether the branch is currently protected
    protected: bool,
}

impl Branch {
    /// Creates a new Branch instance.
    pub fn new(name: &str, protected: bool) -> Self {
        Self {
            name: name.to_string(),
            protected,
        }
    }

    /// Returns the name of the branch.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the branch is currently protected.
    pub fn is_protected(&self) -> bool {
        self.protected
    }
}

impl From<octocrab::models::repos::Branch> for Branch {
    fn from(value: octocrab::models::repos::Branch) -> Self {
        Self {
            name: value.name,
            protected: value.protected,
        }
    }
}

/// One page of a repository listing, with the follow-up page numbers
/// reported by GitHub.
///
/// `next_page` is absent on the final page; `last_page` is absent when
/// GitHub does not report one (single-page listings).
#[derive(Debug, Default)]
pub struct RepositoryPage {
    /// The repositories on this page
    pub repositories: Vec<Repository>,
    /// Number of the next page, if any
    pub next_page: Option<u32>,
    /// Number of the last page, if reported
    pub last_page: Option<u32>,
}

impl From<octocrab::Page<octocrab::models::Repository>> for RepositoryPage {
    fn from(page: octocrab::Page<octocrab::models::Repository>) -> Self {
        let next = page.next.as_ref().and_then(|u| Url::parse(&u.to_string()).ok());
        let last = page.last.as_ref().and_then(|u| Url::parse(&u.to_string()).ok());
        let next_page = page_number(next.as_ref());
        let last_page = page_number(last.as_ref());
        Self {
            repositories: page.items.into_iter().map(Repository::from).collect(),
            next_page,
            last_page,
        }
    }
}

/// One page of a branch listing.
#[derive(Debug, Default)]
pub struct BranchPage {
    /// The branches on this page
    pub branches: Vec<Branch>,
    /// Number of the next page, if any
    pub next_page: Option<u32>,
}

impl From<octocrab::Page<octocrab::models::repos::Branch>> for BranchPage {
    fn from(page: octocrab::Page<octocrab::models::repos::Branch>) -> Self {
        let next = page.next.as_ref().and_then(|u| Url::parse(&u.to_string()).ok());
        let next_page = page_number(next.as_ref());
        Self {
            branches: page.items.into_iter().map(Branch::from).collect(),
            next_page,
        }
    }
}

/// Extracts the `page` query parameter from a Link-header URL.
pub(crate) fn page_number(url: Option<&Url>) -> Option<u32> {
    url.and_then(|url| {
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

/// Payload for the branch protection update endpoint.
///
/// GitHub requires all four top-level keys to be present; `None`
/// serializes to an explicit `null`, which disables the corresponding
/// rule. The default payload therefore enables plain protection with no
/// additional requirements.
#[derive(Serialize, Default, Debug, Clone)]
pub struct ProtectionRequest {
    /// Status checks that must pass before merging
    pub required_status_checks: Option<RequiredStatusChecks>,
    /// Whether protection also applies to administrators
    pub enforce_admins: Option<bool>,
    /// Pull request review requirements
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
    /// Who may push to the branch
    pub restrictions: Option<Restrictions>,
}

/// Status check requirements of a protection rule.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RequiredStatusChecks {
    /// Whether branches must be up to date before merging
    pub strict: bool,
    /// Names of the checks that must pass
    pub contexts: Vec<String>,
}

/// Pull request review requirements of a protection rule.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct RequiredPullRequestReviews {
    /// Required number of approving reviews before merging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
    /// Whether stale reviews are dismissed when new commits are pushed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_stale_reviews: Option<bool>,
    /// Whether code owner reviews are required
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_code_owner_reviews: Option<bool>,
}

/// Push restrictions of a protection rule.
#[derive(Serialize, Default, Debug, Clone)]
pub struct Restrictions {
    /// Users allowed to push
    pub users: Vec<String>,
    /// Teams allowed to push
    pub teams: Vec<String>,
}

/// Branch protection settings as returned by the protection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchProtection {
    /// API URL of the protection resource
    pub url: Option<String>,
    /// Pull request review requirements currently in force
    #[serde(default)]
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
}
