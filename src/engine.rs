// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Review aggregation engine.
//!
//! [`aggregate`] runs a fixed sequence of collector passes over the same
//! activities: issue creation, approvals, inline review comments, issue and
//! pull request comments, label events. Each pass only adds to counters keyed
//! by login, so the final tally does not depend on the pass order.
//!
//! Self-actions never count: reviews, comments and label events whose actor
//! is the creator of the issue or pull request are skipped.

use tracing::{debug, info};

use crate::{
    error::Error,
    model::{Activity, Review, ReviewState, Subject},
    policy::FilterPolicy,
    source::ActivitySource,
    tally::Tally,
};

/// Aggregates review activity of `activities` inside the policy window.
///
/// # Errors
///
/// Propagates the first detail-fetch failure and fails on malformed records;
/// no partial tally is returned.
pub async fn aggregate<S,>(
    source: &S,
    activities: &[Activity],
    policy: &FilterPolicy,
) -> Result<Tally, Error,>
where
    S: ActivitySource,
{
    let mut tally = Tally::default();

    collect_issue_creates(activities, policy, &mut tally,);
    collect_approvals(source, activities, policy, &mut tally,).await?;
    collect_review_comments(source, activities, policy, &mut tally,).await?;
    collect_comments(source, activities, policy, &mut tally,).await?;
    collect_labels(source, activities, policy, &mut tally,).await?;

    info!(
        "Aggregated {} activities in {} into {} users",
        activities.len(),
        policy.window(),
        tally.len()
    );
    Ok(tally,)
}

fn pull_requests(activities: &[Activity],) -> impl Iterator<Item = &Subject,>
{
    activities.iter().filter_map(|activity| match activity {
        Activity::PullRequest(subject,) => Some(subject,),
        Activity::Issue(_,) => None,
    },)
}

/// Plain issues opened in the window.
fn collect_issue_creates(activities: &[Activity], policy: &FilterPolicy, tally: &mut Tally,)
{
    for activity in activities {
        let Activity::Issue(issue,) = activity else {
            continue;
        };
        if policy.is_user_blocked(&issue.author,) || !policy.within_window(issue.created_at,) {
            continue;
        }
        debug!("issue {} created by {}", issue, issue.author);
        tally.entry(&issue.author,).issues_created += 1;
    }
}

/// Reviews that may contribute to a reviewer's counters.
fn is_countable_review(policy: &FilterPolicy, pull: &Subject, review: &Review,) -> bool
{
    if review.state == ReviewState::Pending || policy.is_user_blocked(&review.reviewer,) {
        return false;
    }
    if review.reviewer == pull.author {
        return false;
    }
    review.submitted_at.is_some_and(|submitted_at| policy.within_window(submitted_at,),)
}

/// Approving reviews and reviews whose summary is an LGTM line.
async fn collect_approvals<S,>(
    source: &S,
    activities: &[Activity],
    policy: &FilterPolicy,
    tally: &mut Tally,
) -> Result<(), Error,>
where
    S: ActivitySource,
{
    for pull in pull_requests(activities,) {
        let reviews = source.list_reviews(pull,).await?;
        for review in reviews.iter().filter(|review| is_countable_review(policy, pull, review,),) {
            if review.state == ReviewState::Approved || policy.is_comment_lgtm(&review.body,) {
                debug!("review {} on {} approves by {}", review.id, pull, review.reviewer);
                tally.entry(&review.reviewer,).approvals += 1;
            }
        }
    }
    Ok((),)
}

/// Inline comments of countable reviews, gated by the review only.
async fn collect_review_comments<S,>(
    source: &S,
    activities: &[Activity],
    policy: &FilterPolicy,
    tally: &mut Tally,
) -> Result<(), Error,>
where
    S: ActivitySource,
{
    for pull in pull_requests(activities,) {
        let reviews = source.list_reviews(pull,).await?;
        for review in reviews.iter().filter(|review| is_countable_review(policy, pull, review,),) {
            let comments = source.list_review_comments(pull, review.id,).await?;
            if comments.is_empty() {
                continue;
            }
            debug!(
                "review {} on {} carries {} inline comments by {}",
                review.id,
                pull,
                comments.len(),
                review.reviewer
            );
            tally.entry(&review.reviewer,).review_inline_comments += comments.len() as u64;
        }
    }
    Ok((),)
}

/// Top-level comments on issues and pull requests.
async fn collect_comments<S,>(
    source: &S,
    activities: &[Activity],
    policy: &FilterPolicy,
    tally: &mut Tally,
) -> Result<(), Error,>
where
    S: ActivitySource,
{
    let since = policy.window().start().to_utc();
    for activity in activities {
        let subject = activity.subject();
        let comments = source.list_issue_comments(subject, since,).await?;
        for comment in comments {
            if policy.is_user_blocked(&comment.author,) || comment.author == subject.author {
                continue;
            }
            if policy.is_comment_blocked(&comment.body,) {
                debug!("comment {} on {} matches a blocked pattern", comment.id, subject);
                continue;
            }
            if !policy.is_comment_in_window(comment.created_at, comment.updated_at,) {
                continue;
            }
            let counters = tally.entry(&comment.author,);
            match activity {
                Activity::PullRequest(_,) if policy.is_comment_lgtm(&comment.body,) => {
                    counters.approvals += 1;
                }
                Activity::PullRequest(_,) => counters.issue_or_pr_comments += 1,
                Activity::Issue(_,) => counters.issue_comments += 1,
            }
        }
    }
    Ok((),)
}

/// Labels added by someone other than the creator.
async fn collect_labels<S,>(
    source: &S,
    activities: &[Activity],
    policy: &FilterPolicy,
    tally: &mut Tally,
) -> Result<(), Error,>
where
    S: ActivitySource,
{
    for activity in activities {
        let subject = activity.subject();
        let events = source.list_issue_events(subject,).await?;
        for event in events.iter().filter(|event| event.is_labeled(),) {
            let actor = event.actor.as_deref().ok_or_else(|| {
                Error::malformed(format!("labeled event on {subject} has no actor"),)
            },)?;
            if policy.is_user_blocked(actor,) || actor == subject.author {
                continue;
            }
            if policy.within_window(event.created_at,) {
                tally.entry(actor,).labels_added += 1;
            }
        }
    }
    Ok((),)
}
