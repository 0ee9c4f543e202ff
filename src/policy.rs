// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Filtering rules applied by every collector pass.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::window::TimeWindow;

/// Immutable filtering rules for one aggregation run.
#[derive(Debug, Clone,)]
pub struct FilterPolicy
{
    lgtm_patterns:    HashSet<String,>,
    blocked_patterns: Vec<String,>,
    allow_users:      HashSet<String,>,
    block_users:      HashSet<String,>,
    range:            TimeWindow,
    window:           TimeWindow,
}

impl FilterPolicy
{
    /// Creates a policy without patterns or user lists.
    pub fn new(window: TimeWindow,) -> Self
    {
        Self {
            lgtm_patterns: HashSet::new(),
            blocked_patterns: Vec::new(),
            allow_users: HashSet::new(),
            block_users: HashSet::new(),
            range: window,
            window,
        }
    }

    /// Whole-line comments that count as an approval.
    pub fn with_lgtm_patterns<I, S,>(mut self, patterns: I,) -> Self
    where
        I: IntoIterator<Item = S,>,
        S: Into<String,>,
    {
        self.lgtm_patterns = patterns.into_iter().map(Into::into,).collect();
        self
    }

    /// Substrings that exclude a comment from every counter.
    pub fn with_blocked_patterns<I, S,>(mut self, patterns: I,) -> Self
    where
        I: IntoIterator<Item = S,>,
        S: Into<String,>,
    {
        self.blocked_patterns = patterns
            .into_iter()
            .map(Into::into,)
            .filter(|pattern: &String| !pattern.is_empty(),)
            .collect();
        self
    }

    /// Exclusive allow-list; when non-empty the block-list is ignored.
    pub fn with_allow_users<I, S,>(mut self, users: I,) -> Self
    where
        I: IntoIterator<Item = S,>,
        S: Into<String,>,
    {
        self.allow_users = users.into_iter().map(Into::into,).collect();
        self
    }

    /// Users whose activity is never counted.
    pub fn with_block_users<I, S,>(mut self, users: I,) -> Self
    where
        I: IntoIterator<Item = S,>,
        S: Into<String,>,
    {
        self.block_users = users.into_iter().map(Into::into,).collect();
        self
    }

    /// Same rules over a sub-window of the requested range.
    ///
    /// The range is kept so that records spanning several chunks are
    /// attributed to exactly one of them.
    pub fn for_window(&self, window: TimeWindow,) -> Self
    {
        Self {
            window,
            ..self.clone()
        }
    }

    /// Window the policy counts activity in.
    pub fn window(&self,) -> &TimeWindow
    {
        &self.window
    }

    /// Returns `true` when `instant` lies in the half-open window.
    pub fn within_window(&self, instant: DateTime<Utc,>,) -> bool
    {
        self.window.contains(instant,)
    }

    /// Returns `true` when a comment belongs to the window.
    ///
    /// A comment is dated by its creation when that lies in the range and by
    /// its last edit otherwise, so each comment falls in at most one chunk.
    pub fn is_comment_in_window(&self, created_at: DateTime<Utc,>, updated_at: DateTime<Utc,>,) -> bool
    {
        let instant = if self.range.contains(created_at,) { created_at } else { updated_at };
        self.window.contains(instant,)
    }

    /// Returns `true` when the user's activity must be ignored.
    pub fn is_user_blocked(&self, login: &str,) -> bool
    {
        if !self.allow_users.is_empty() {
            return !self.allow_users.contains(login,);
        }
        self.block_users.contains(login,)
    }

    /// Returns `true` when any trimmed line equals an LGTM pattern.
    pub fn is_comment_lgtm(&self, body: &str,) -> bool
    {
        if self.lgtm_patterns.is_empty() {
            return false;
        }
        trimmed_lines(&unescape_whitespace(body,),).any(|line| self.lgtm_patterns.contains(line,),)
    }

    /// Returns `true` when any trimmed line contains a blocked pattern.
    pub fn is_comment_blocked(&self, body: &str,) -> bool
    {
        if self.blocked_patterns.is_empty() {
            return false;
        }
        trimmed_lines(&unescape_whitespace(body,),).any(|line| {
            self.blocked_patterns.iter().any(|pattern| line.contains(pattern.as_str(),),)
        },)
    }
}

/// Replaces literal `\n`, `\r` and `\t` escapes with the characters.
pub fn unescape_whitespace(body: &str,) -> String
{
    body.replace("\\n", "\n",).replace("\\r", "\r",).replace("\\t", "\t",)
}

fn trimmed_lines(body: &str,) -> impl Iterator<Item = &str,>
{
    body.split('\n',).map(str::trim,)
}
