// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Domain records produced by an activity source.
//!
//! Records are validated at ingestion: required fields such as authors are
//! plain `String`s here, so the aggregation never has to guess about missing
//! data.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue or pull request the activity is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Subject
{
    /// Repository owner.
    pub owner:      String,
    /// Repository name.
    pub repo:       String,
    /// Issue or pull request number.
    pub number:     u64,
    /// Login of the creator.
    pub author:     String,
    /// Title as shown on the platform.
    pub title:      String,
    /// Browser URL.
    pub html_url:   String,
    /// Creation instant.
    pub created_at: DateTime<Utc,>,
}

impl Subject
{
    /// Key identifying the subject across search results.
    pub fn key(&self,) -> (&str, &str, u64,)
    {
        (&self.owner, &self.repo, self.number,)
    }
}

impl fmt::Display for Subject
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Search result item, classified once when it is ingested.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum Activity
{
    /// Plain issue.
    Issue(Subject,),
    /// Pull request.
    PullRequest(Subject,),
}

impl Activity
{
    /// Subject regardless of the variant.
    pub fn subject(&self,) -> &Subject
    {
        match self {
            Self::Issue(subject,) | Self::PullRequest(subject,) => subject,
        }
    }

    /// Returns `true` for pull requests.
    pub fn is_pull_request(&self,) -> bool
    {
        matches!(self, Self::PullRequest(_))
    }
}

/// State of a pull request review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState
{
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Submitted or pending pull request review.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Review
{
    pub id:           u64,
    pub reviewer:     String,
    pub state:        ReviewState,
    pub body:         String,
    /// `None` only for pending reviews.
    pub submitted_at: Option<DateTime<Utc,>,>,
}

/// Top-level issue comment or inline review comment.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Comment
{
    pub id:         u64,
    pub author:     String,
    pub body:       String,
    pub created_at: DateTime<Utc,>,
    pub updated_at: DateTime<Utc,>,
}

/// Entry of an issue's event timeline.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct IssueEvent
{
    /// Event type such as `labeled` or `closed`.
    pub kind:       String,
    /// Some event types carry no actor.
    pub actor:      Option<String,>,
    pub created_at: DateTime<Utc,>,
}

impl IssueEvent
{
    /// Event type that marks a label being added.
    pub const LABELED: &'static str = "labeled";

    /// Returns `true` for label additions.
    pub fn is_labeled(&self,) -> bool
    {
        self.kind == Self::LABELED
    }
}

/// Pull request as returned by the repository listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PullRequest
{
    pub number:     u64,
    pub author:     String,
    pub title:      String,
    pub html_url:   String,
    pub created_at: DateTime<Utc,>,
}
