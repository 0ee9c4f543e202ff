// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-user review counters accumulated during a run.

use std::{
    collections::{BTreeMap, btree_map},
    ops::AddAssign,
};

use serde::{Deserialize, Serialize};

/// Review activity of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct ReviewCounters
{
    /// Approving reviews and LGTM comments on pull requests.
    pub approvals:              u64,
    /// Inline comments attached to the user's reviews.
    pub review_inline_comments: u64,
    /// Top-level pull request comments that are not approvals.
    pub issue_or_pr_comments:   u64,
    /// Top-level comments on plain issues.
    pub issue_comments:         u64,
    /// Plain issues opened in the window.
    pub issues_created:         u64,
    /// Labels added in the window.
    pub labels_added:           u64,
}

impl ReviewCounters
{
    /// Returns `true` when every counter is zero.
    pub fn is_empty(&self,) -> bool
    {
        *self == Self::default()
    }

    /// Inline review comments plus top-level pull request comments.
    pub fn pull_request_comments(&self,) -> u64
    {
        self.review_inline_comments + self.issue_or_pr_comments
    }
}

impl AddAssign for ReviewCounters
{
    fn add_assign(&mut self, other: Self,)
    {
        self.approvals += other.approvals;
        self.review_inline_comments += other.review_inline_comments;
        self.issue_or_pr_comments += other.issue_or_pr_comments;
        self.issue_comments += other.issue_comments;
        self.issues_created += other.issues_created;
        self.labels_added += other.labels_added;
    }
}

/// Accumulation map from login to counters.
///
/// Ordered by login so iteration and serialization are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Tally
{
    users: BTreeMap<String, ReviewCounters,>,
}

impl Tally
{
    /// Mutable counters for `login`, inserting zeroes on first use.
    pub fn entry(&mut self, login: &str,) -> &mut ReviewCounters
    {
        self.users.entry(login.to_owned(),).or_default()
    }

    /// Counters recorded for `login`.
    pub fn get(&self, login: &str,) -> Option<&ReviewCounters,>
    {
        self.users.get(login,)
    }

    /// Adds every counter of `other` into `self`.
    pub fn merge(&mut self, other: Tally,)
    {
        for (login, counters,) in other.users {
            *self.users.entry(login,).or_default() += counters;
        }
    }

    /// Number of users present, including all-zero entries.
    pub fn len(&self,) -> usize
    {
        self.users.len()
    }

    /// Returns `true` when no user was recorded.
    pub fn is_empty(&self,) -> bool
    {
        self.users.is_empty()
    }

    /// Iterates users in login order.
    pub fn iter(&self,) -> btree_map::Iter<'_, String, ReviewCounters,>
    {
        self.users.iter()
    }
}

impl IntoIterator for Tally
{
    type IntoIter = btree_map::IntoIter<String, ReviewCounters,>;
    type Item = (String, ReviewCounters,);

    fn into_iter(self,) -> Self::IntoIter
    {
        self.users.into_iter()
    }
}

impl<'a,> IntoIterator for &'a Tally
{
    type IntoIter = btree_map::Iter<'a, String, ReviewCounters,>;
    type Item = (&'a String, &'a ReviewCounters,);

    fn into_iter(self,) -> Self::IntoIter
    {
        self.users.iter()
    }
}
