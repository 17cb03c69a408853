//! Repository discovery strategies.
//!
//! Three interchangeable sources produce the stream of repositories a run
//! operates on: the full listing visible to the token, an explicit
//! selection, or every repository of a set of organizations. All of them
//! push into a bounded channel whose receiving end is handed to the
//! caller; the channel closes once every producer task has dropped its
//! sender, so a truncated listing simply ends the stream early instead of
//! failing the run.

use std::sync::Arc;

use github_client::{Repository, RepositoryBrowser};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::RunConfig;

#[cfg(test)]
#[path = "sources_tests.rs"]
mod tests;

/// Number of repositories requested per listing page.
const REPOSITORY_PAGE_SIZE: u8 = 20;

/// Capacity of the channel carrying discovered repositories.
const REPOSITORY_BUFFER: usize = 20;

/// A producer of the stream of repositories to operate on.
///
/// `fetch` starts discovery in background tasks and returns the receiving
/// end of the stream. The stream terminates once discovery is complete or
/// an unrecoverable listing error occurred; consumers treat a truncated
/// stream as a normal end of stream, not as a failure.
pub trait RepositorySource: Send + Sync {
    fn fetch(&self) -> mpsc::Receiver<Repository>;
}

/// Picks the source strategy matching the run configuration.
///
/// An explicit repository list selects [`SelectedRepositories`], an
/// organization list selects [`OrganizationRepositories`], and with
/// neither the whole account listing is used. The conflicting combination
/// of both lists is rejected when the configuration is built.
pub fn repository_source(
    config: &RunConfig,
    client: Arc<dyn RepositoryBrowser>,
) -> Box<dyn RepositorySource> {
    if !config.repositories().is_empty() {
        Box::new(SelectedRepositories::new(
            client,
            config.repositories().to_vec(),
        ))
    } else if !config.organizations().is_empty() {
        Box::new(OrganizationRepositories::new(
            client,
            config.organizations().to_vec(),
        ))
    } else {
        Box::new(AllRepositories::new(client))
    }
}

/// Streams every repository visible to the authenticated token.
pub struct AllRepositories {
    client: Arc<dyn RepositoryBrowser>,
}

impl AllRepositories {
    pub fn new(client: Arc<dyn RepositoryBrowser>) -> Self {
        Self { client }
    }
}

impl RepositorySource for AllRepositories {
    fn fetch(&self) -> mpsc::Receiver<Repository> {
        let (sender, receiver) = mpsc::channel(REPOSITORY_BUFFER);
        let client = Arc::clone(&self.client);

        tokio::spawn(async move {
            let mut page = 1;
            loop {
                let listing = match client.list_repositories(page, REPOSITORY_PAGE_SIZE).await {
                    Ok(listing) => listing,
                    Err(error) => {
                        warn!(page, %error, "Listing repositories failed, truncating the stream");
                        return;
                    }
                };

                for repository in listing.repositories {
                    if sender.send(repository).await.is_err() {
                        // Consumer went away, nothing left to discover for.
                        return;
                    }
                }

                match listing.next_page {
                    Some(next) => page = next,
                    None => return,
                }
            }
        });

        receiver
    }
}

/// Resolves an explicit list of "owner/name" entries, in parallel.
///
/// Entries that cannot be resolved (not found, no access, malformed name)
/// are dropped from the stream. The stream closes only after every lookup
/// has completed.
pub struct SelectedRepositories {
    client: Arc<dyn RepositoryBrowser>,
    full_names: Vec<String>,
}

impl SelectedRepositories {
    pub fn new(client: Arc<dyn RepositoryBrowser>, full_names: Vec<String>) -> Self {
        Self { client, full_names }
    }
}

impl RepositorySource for SelectedRepositories {
    fn fetch(&self) -> mpsc::Receiver<Repository> {
        let (sender, receiver) = mpsc::channel(REPOSITORY_BUFFER);

        for full_name in self.full_names.clone() {
            let client = Arc::clone(&self.client);
            let sender = sender.clone();
            tokio::spawn(async move {
                let Some((owner, name)) = full_name.split_once('/') else {
                    warn!(
                        full_name = %full_name,
                        "Skipping repository without an owner/name separator"
                    );
                    return;
                };
                match client.get_repository(owner, name).await {
                    Ok(repository) => {
                        let _ = sender.send(repository).await;
                    }
                    Err(error) => {
                        debug!(full_name = %full_name, %error, "Skipping unresolvable repository");
                    }
                }
            });
        }

        // The stream closes once the last producer task drops its sender.
        receiver
    }
}

/// Streams every repository of a set of organizations.
///
/// Each organization is paginated by its own task; the emissions of all
/// organizations are merged into one stream. A listing error terminates
/// only the affected organization's producer.
pub struct OrganizationRepositories {
    client: Arc<dyn RepositoryBrowser>,
    organizations: Vec<String>,
}

impl OrganizationRepositories {
    pub fn new(client: Arc<dyn RepositoryBrowser>, organizations: Vec<String>) -> Self {
        Self {
            client,
            organizations,
        }
    }
}

impl RepositorySource for OrganizationRepositories {
    fn fetch(&self) -> mpsc::Receiver<Repository> {
        let (sender, receiver) = mpsc::channel(REPOSITORY_BUFFER);

        for organization in self.organizations.clone() {
            let client = Arc::clone(&self.client);
            let sender = sender.clone();
            tokio::spawn(async move {
                let mut page = 1;
                loop {
                    let listing = match client
                        .list_organization_repositories(&organization, page, REPOSITORY_PAGE_SIZE)
                        .await
                    {
                        Ok(listing) => listing,
                        Err(error) => {
                            warn!(
                                organization = %organization,
                                page,
                                %error,
                                "Listing organization repositories failed, truncating"
                            );
                            return;
                        }
                    };

                    for repository in listing.repositories {
                        if sender.send(repository).await.is_err() {
                            return;
                        }
                    }

                    match listing.next_page {
                        Some(next) => page = next,
                        None => return,
                    }
                }
            });
        }

        receiver
    }
}
