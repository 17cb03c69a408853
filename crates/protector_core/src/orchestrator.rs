//! Fan-out of repository processing.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use crate::protection::ProtectionEngine;
use crate::sources::RepositorySource;

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

/// Drives a run: drains the repository stream and processes every
/// repository in its own task, waiting for all of them to finish.
///
/// Per-branch failures are reported by the engine and never abort the
/// run; there is no ordering guarantee across repositories or branches.
pub struct Orchestrator {
    engine: Arc<ProtectionEngine>,
    unprotect: bool,
}

impl Orchestrator {
    pub fn new(engine: Arc<ProtectionEngine>, unprotect: bool) -> Self {
        Self { engine, unprotect }
    }

    /// Processes every repository the source discovers, one task per
    /// repository, and returns once all of them have completed.
    pub async fn run(&self, source: &dyn RepositorySource) {
        let mut repositories = source.fetch();
        let mut tasks = JoinSet::new();

        while let Some(repository) = repositories.recv().await {
            debug!(repository = %repository.full_name(), "Scheduling repository");
            let engine = Arc::clone(&self.engine);
            let unprotect = self.unprotect;
            tasks.spawn(async move {
                if unprotect {
                    engine.free(&repository).await;
                } else {
                    engine.protect(&repository).await;
                }
            });
        }

        while tasks.join_next().await.is_some() {}
    }
}
