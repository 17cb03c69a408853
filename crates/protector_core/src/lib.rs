//! # Protector Core
//!
//! This crate provides the core orchestration logic for protector, a tool
//! that enables or removes branch protection across many GitHub
//! repositories in one run.
//!
//! ## Overview
//!
//! A run goes through three stages:
//! 1. A repository source strategy discovers the repositories to operate
//!    on and streams them through a channel ([`sources`]).
//! 2. The orchestrator drains that stream and processes every repository
//!    in its own task ([`orchestrator`]).
//! 3. The protection engine filters each repository's branches against
//!    the configured patterns and locks or unlocks every match, reporting
//!    one outcome per branch ([`protection`]).
//!
//! ## Error Handling
//!
//! Only configuration problems are fatal ([`Error`]). Discovery errors
//! truncate the repository stream, repository-level errors abort a single
//! repository, and branch-level errors abort a single branch; none of
//! them fails the run.
//!
//! ## Architecture
//!
//! The crate follows a dependency injection pattern for testability: the
//! source strategies consume a [`github_client::RepositoryBrowser`] and
//! the engine a [`github_client::BranchProtectionClient`], so tests run
//! against in-memory implementations.

mod errors;
pub use errors::Error;

pub mod config;
pub mod matcher;
pub mod orchestrator;
pub mod protection;
pub mod sources;

pub use config::{RunConfig, RunOptions};
pub use matcher::BranchMatcher;
pub use orchestrator::Orchestrator;
pub use protection::{Outcome, ProtectionEngine};
pub use sources::{
    repository_source, AllRepositories, OrganizationRepositories, RepositorySource,
    SelectedRepositories,
};
