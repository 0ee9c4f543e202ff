// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Capability boundary between the aggregation engine and the code-hosting
//! platform.
//!
//! Implementations return complete result sets: pagination and rate-limit
//! waits are handled inside the source, so every call either yields all
//! records or fails the run.

#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use crate::{
    error::Error,
    model::{Activity, Comment, IssueEvent, PullRequest, Review, Subject},
};

/// Read-only access to issue and pull request activity.
pub trait ActivitySource
{
    /// Runs an issue search query and classifies every item.
    async fn search_issues(&self, query: &str,) -> Result<Vec<Activity,>, Error,>;

    /// Lists all reviews of a pull request.
    async fn list_reviews(&self, pull: &Subject,) -> Result<Vec<Review,>, Error,>;

    /// Lists the inline comments attached to one review.
    async fn list_review_comments(
        &self,
        pull: &Subject,
        review_id: u64,
    ) -> Result<Vec<Comment,>, Error,>;

    /// Lists top-level comments updated at or after `since`.
    async fn list_issue_comments(
        &self,
        subject: &Subject,
        since: DateTime<Utc,>,
    ) -> Result<Vec<Comment,>, Error,>;

    /// Lists the event timeline of an issue or pull request.
    async fn list_issue_events(&self, subject: &Subject,) -> Result<Vec<IssueEvent,>, Error,>;

    /// Lists pull requests of a repository, newest first, up to `max_pages`.
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        max_pages: u32,
    ) -> Result<Vec<PullRequest,>, Error,>;

    /// Lists the paths changed by a pull request.
    async fn list_pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String,>, Error,>;
}
