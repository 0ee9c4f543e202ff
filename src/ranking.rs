// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Weighted scoring and leaderboard ordering.

use serde::Serialize;

use crate::tally::{ReviewCounters, Tally};

/// Weights of the leaderboard score.
///
/// [`ScoreWeights::BASE`] applies to every user in the tally, on top of the
/// weighted counters.
#[derive(Debug, Clone, Copy,)]
pub struct ScoreWeights;

impl ScoreWeights
{
    /// Per approval, including LGTM comments and review summaries.
    pub const APPROVAL: f64 = 2.0;
    /// Added once for every user in the tally.
    pub const BASE: f64 = 1.0;
    /// Per top-level comment on a plain issue.
    pub const ISSUE_COMMENT: f64 = 1.0;
    /// Per issue opened in the window.
    pub const ISSUE_CREATED: f64 = 2.0;
    /// Per label added to someone else's issue or pull request.
    pub const LABEL_ADDED: f64 = 0.5;
    /// Per top-level pull request comment that is not an LGTM.
    pub const PR_COMMENT: f64 = 1.0;
    /// Per inline comment attached to a review.
    pub const REVIEW_INLINE_COMMENT: f64 = 1.0;
}

/// Computes the weighted score of one user's counters.
pub fn score(counters: &ReviewCounters,) -> f64
{
    ScoreWeights::BASE
        + ScoreWeights::APPROVAL * counters.approvals as f64
        + ScoreWeights::REVIEW_INLINE_COMMENT * counters.review_inline_comments as f64
        + ScoreWeights::PR_COMMENT * counters.issue_or_pr_comments as f64
        + ScoreWeights::ISSUE_COMMENT * counters.issue_comments as f64
        + ScoreWeights::ISSUE_CREATED * counters.issues_created as f64
        + ScoreWeights::LABEL_ADDED * counters.labels_added as f64
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize,)]
pub struct RankedEntry
{
    pub login:    String,
    pub counters: ReviewCounters,
    pub score:    f64,
}

/// Orders every user of `tally` by descending score, ties by ascending login.
pub fn rank(tally: &Tally,) -> Vec<RankedEntry,>
{
    let mut entries: Vec<RankedEntry,> = tally
        .iter()
        .map(|(login, counters,)| RankedEntry {
            login:    login.clone(),
            counters: *counters,
            score:    score(counters,),
        },)
        .collect();
    entries.sort_by(|a, b| b.score.total_cmp(&a.score,).then_with(|| a.login.cmp(&b.login,),),);
    entries
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn score_combines_weighted_counters()
    {
        let counters = ReviewCounters {
            approvals:              2,
            review_inline_comments: 0,
            issue_or_pr_comments:   0,
            issue_comments:         1,
            issues_created:         1,
            labels_added:           0,
        };
        assert_eq!(score(&counters), 8.0);
    }

    #[test]
    fn empty_counters_score_base_weight()
    {
        assert_eq!(score(&ReviewCounters::default()), ScoreWeights::BASE);
    }

    #[test]
    fn rank_orders_by_score_then_login()
    {
        let mut tally = Tally::default();
        tally.entry("carol",).approvals = 1;
        tally.entry("bob",).issue_comments = 2;
        tally.entry("alice",).labels_added = 1;
        tally.entry("dave",).issues_created = 3;

        let logins: Vec<_,> = rank(&tally,).into_iter().map(|entry| entry.login,).collect();
        assert_eq!(logins, vec!["dave", "bob", "carol", "alice"]);
    }

    #[test]
    fn rank_of_empty_tally_is_empty()
    {
        assert!(rank(&Tally::default()).is_empty());
    }

    proptest! {
        #[test]
        fn ranking_is_sorted(
            users in proptest::collection::btree_map("[a-z]{1,6}", (0u64..5, 0u64..5, 0u64..5), 0..20),
        ) {
            let mut tally = Tally::default();
            for (login, (approvals, comments, labels)) in &users {
                let counters = tally.entry(login);
                counters.approvals = *approvals;
                counters.issue_comments = *comments;
                counters.labels_added = *labels;
            }
            let ranked = rank(&tally);
            prop_assert_eq!(ranked.len(), users.len());
            for pair in ranked.windows(2) {
                prop_assert!(
                    pair[0].score > pair[1].score
                        || (pair[0].score == pair[1].score && pair[0].login < pair[1].login)
                );
            }
        }
    }
}
