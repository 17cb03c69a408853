//! Unit tests for the protection engine.

use super::*;
use async_trait::async_trait;
use github_client::{BranchPage, BranchProtection, Error, Permissions};
use regex::Regex;

/// A write sink the test can read back after the engine is done.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory branch service recording every mutating call.
#[derive(Default)]
struct RecordingBranchClient {
    pages: Vec<Vec<Branch>>,
    fail_listing: bool,
    failing_branches: Vec<String>,
    list_calls: Mutex<u32>,
    get_calls: Mutex<Vec<String>>,
    set_calls: Mutex<Vec<String>>,
    remove_calls: Mutex<Vec<String>>,
}

impl RecordingBranchClient {
    fn with_branches(branches: Vec<Branch>) -> Self {
        Self {
            pages: vec![branches],
            ..Default::default()
        }
    }

    fn set_calls(&self) -> Vec<String> {
        self.set_calls.lock().unwrap().clone()
    }

    fn remove_calls(&self) -> Vec<String> {
        self.remove_calls.lock().unwrap().clone()
    }

    fn list_calls(&self) -> u32 {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl BranchProtectionClient for RecordingBranchClient {
    async fn list_branches(
        &self,
        _owner: &str,
        _repo: &str,
        page: u32,
        _per_page: u8,
    ) -> Result<BranchPage, Error> {
        *self.list_calls.lock().unwrap() += 1;
        if self.fail_listing {
            return Err(Error::Api("listing exploded".to_string()));
        }
        let index = (page as usize).saturating_sub(1);
        let branches = self.pages.get(index).cloned().unwrap_or_default();
        let next_page = if index + 1 < self.pages.len() {
            Some(page + 1)
        } else {
            None
        };
        Ok(BranchPage { branches, next_page })
    }

    async fn get_branch(&self, _owner: &str, _repo: &str, branch: &str) -> Result<Branch, Error> {
        self.get_calls.lock().unwrap().push(branch.to_string());
        if self.failing_branches.iter().any(|name| name == branch) {
            return Err(Error::Api("branch lookup failed".to_string()));
        }
        self.pages
            .iter()
            .flatten()
            .find(|candidate| candidate.name() == branch)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn set_branch_protection(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
        _request: &ProtectionRequest,
    ) -> Result<BranchProtection, Error> {
        self.set_calls.lock().unwrap().push(branch.to_string());
        Ok(BranchProtection {
            url: None,
            required_pull_request_reviews: None,
        })
    }

    async fn remove_branch_protection(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
    ) -> Result<(), Error> {
        self.remove_calls.lock().unwrap().push(branch.to_string());
        Ok(())
    }
}

fn admin_repository() -> Repository {
    Repository::new(
        "jcgay",
        "maven-color",
        Some(Permissions {
            admin: true,
            ..Default::default()
        }),
    )
}

fn engine_with(
    client: Arc<RecordingBranchClient>,
    pattern: &str,
    dry_run: bool,
) -> (ProtectionEngine, SharedBuffer, SharedBuffer) {
    let success = SharedBuffer::default();
    let failure = SharedBuffer::default();
    let engine = ProtectionEngine::with_outputs(
        client,
        BranchMatcher::new(vec![Regex::new(pattern).unwrap()]),
        dry_run,
        Box::new(success.clone()),
        Box::new(failure.clone()),
    );
    (engine, success, failure)
}

#[tokio::test]
async fn test_protect_locks_an_unprotected_branch() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![Branch::new(
        "branch-1", false,
    )]));
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^branch", false);

    engine.protect(&admin_repository()).await;

    assert_eq!(failure.contents(), "");
    assert_eq!(
        success.contents(),
        "jcgay/maven-color: branch-1 is now protected\n"
    );
    assert_eq!(client.set_calls(), ["branch-1".to_string()]);
}

#[tokio::test]
async fn test_protect_in_dry_run_reports_without_mutating() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![Branch::new(
        "branch-1", false,
    )]));
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^branch", true);

    engine.protect(&admin_repository()).await;

    assert_eq!(failure.contents(), "");
    assert_eq!(
        success.contents(),
        "jcgay/maven-color: branch-1 will be set to protected\n"
    );
    assert!(client.set_calls().is_empty());
    assert!(client.remove_calls().is_empty());
}

#[tokio::test]
async fn test_free_removes_protection_from_a_protected_branch() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![Branch::new(
        "branch-1", true,
    )]));
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^branch", false);

    engine.free(&admin_repository()).await;

    assert_eq!(failure.contents(), "");
    assert_eq!(
        success.contents(),
        "jcgay/maven-color: branch-1 is now free\n"
    );
    assert_eq!(client.remove_calls(), ["branch-1".to_string()]);
}

#[tokio::test]
async fn test_free_in_dry_run_reports_without_mutating() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![Branch::new(
        "branch-1", true,
    )]));
    let (engine, success, _) = engine_with(Arc::clone(&client), "^branch", true);

    engine.free(&admin_repository()).await;

    assert_eq!(
        success.contents(),
        "jcgay/maven-color: branch-1 will be freed\n"
    );
    assert!(client.remove_calls().is_empty());
}

#[tokio::test]
async fn test_protect_is_idempotent_on_a_protected_branch() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![Branch::new(
        "branch-1", true,
    )]));
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^branch", false);

    let repository = admin_repository();
    engine.protect(&repository).await;
    engine.protect(&repository).await;

    assert_eq!(failure.contents(), "");
    assert_eq!(
        success.contents(),
        "jcgay/maven-color: branch-1 is already protected\n\
         jcgay/maven-color: branch-1 is already protected\n"
    );
    assert!(client.set_calls().is_empty());
}

#[tokio::test]
async fn test_free_leaves_an_unprotected_branch_alone() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![Branch::new(
        "branch-1", false,
    )]));
    let (engine, success, _) = engine_with(Arc::clone(&client), "^branch", false);

    engine.free(&admin_repository()).await;

    assert_eq!(
        success.contents(),
        "jcgay/maven-color: branch-1 is already unprotected\n"
    );
    assert!(client.remove_calls().is_empty());
}

#[tokio::test]
async fn test_missing_admin_rights_short_circuit_the_repository() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![Branch::new(
        "branch-1", false,
    )]));
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^branch", false);

    let repository = Repository::new(
        "owner",
        "repo",
        Some(Permissions {
            admin: false,
            ..Default::default()
        }),
    );
    engine.protect(&repository).await;

    assert_eq!(success.contents(), "");
    assert_eq!(
        failure.contents(),
        "owner/repo: you don't have admin rights to modify this repository\n"
    );
    assert_eq!(client.list_calls(), 0);
    assert!(client.set_calls().is_empty());
}

#[tokio::test]
async fn test_listing_error_aborts_the_repository_with_one_report() {
    let client = Arc::new(RecordingBranchClient {
        fail_listing: true,
        ..Default::default()
    });
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^branch", false);

    engine.protect(&admin_repository()).await;

    assert_eq!(success.contents(), "");
    assert_eq!(
        failure.contents(),
        "jcgay/maven-color: listing exploded\n"
    );
    assert!(client.set_calls().is_empty());
}

#[tokio::test]
async fn test_branch_fetch_error_only_aborts_that_branch() {
    let client = Arc::new(RecordingBranchClient {
        pages: vec![vec![
            Branch::new("branch-1", false),
            Branch::new("branch-2", false),
        ]],
        failing_branches: vec!["branch-1".to_string()],
        ..Default::default()
    });
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^branch", false);

    engine.protect(&admin_repository()).await;

    assert_eq!(
        failure.contents(),
        "jcgay/maven-color: branch-1 branch lookup failed\n"
    );
    assert_eq!(
        success.contents(),
        "jcgay/maven-color: branch-2 is now protected\n"
    );
    assert_eq!(client.set_calls(), ["branch-2".to_string()]);
}

#[tokio::test]
async fn test_branches_outside_the_patterns_are_ignored() {
    let client = Arc::new(RecordingBranchClient::with_branches(vec![
        Branch::new("feature-x", false),
        Branch::new("gh-pages", false),
    ]));
    let (engine, success, failure) = engine_with(Arc::clone(&client), "^master$", false);

    engine.protect(&admin_repository()).await;

    assert_eq!(success.contents(), "");
    assert_eq!(failure.contents(), "");
    assert!(client.get_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_branch_listing_follows_pagination() {
    let client = Arc::new(RecordingBranchClient {
        pages: vec![
            vec![Branch::new("branch-1", false)],
            vec![Branch::new("branch-2", false)],
        ],
        ..Default::default()
    });
    let (engine, success, _) = engine_with(Arc::clone(&client), "^branch", false);

    engine.protect(&admin_repository()).await;

    assert_eq!(client.list_calls(), 2);
    let contents = success.contents();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.contains(&"jcgay/maven-color: branch-1 is now protected"));
    assert!(lines.contains(&"jcgay/maven-color: branch-2 is now protected"));
}

#[test]
fn test_outcome_message_format() {
    let repository = admin_repository();
    let success = Outcome::success(&repository, "branch-1", "is now protected");
    let failure = Outcome::failure(&repository, "branch-1", "boom".to_string());

    assert_eq!(success.message(), "jcgay/maven-color: branch-1 is now protected");
    assert!(success.is_success());
    assert_eq!(failure.message(), "jcgay/maven-color: branch-1 boom");
    assert!(!failure.is_success());
}
