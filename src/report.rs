// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Markdown rendering of leaderboards and pull request listings.
//!
//! Output is the `lark_md` flavour understood by the chat card: one line per
//! leaderboard entry, and `## repo` headed groups of links for listings.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{
    markdown::{self, SEPARATOR},
    ranking::RankedEntry,
    tally::ReviewCounters,
};

/// Body rendered when no user has any activity.
pub const EMPTY_PLACEHOLDER: &str = "No review activity in this period.";

const MEDALS: [&str; 3] = ["🏆", "🥈", "🥉"];

/// Rank marker prepended to leaderboard lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum Decoration
{
    /// Trophy and medals for the podium, `#N` below it.
    #[default]
    Medals,
    /// `#N` for every position.
    Numeric,
    /// No marker.
    Plain,
}

impl Decoration
{
    fn marker(self, position: usize,) -> Option<String,>
    {
        match self {
            Self::Medals => Some(
                MEDALS
                    .get(position - 1,)
                    .map_or_else(|| format!("#{position}"), |medal| (*medal).to_owned(),),
            ),
            Self::Numeric => Some(format!("#{position}"),),
            Self::Plain => None,
        }
    }
}

/// Comma-joined non-zero counters in display order.
///
/// Returns an empty string when every counter is zero.
pub fn counters_summary(counters: &ReviewCounters,) -> String
{
    let fields = [
        ("approvals", counters.approvals,),
        ("PR comments", counters.pull_request_comments(),),
        ("issue comments", counters.issue_comments,),
        ("issues created", counters.issues_created,),
        ("labels added", counters.labels_added,),
    ];
    fields
        .iter()
        .filter(|(_, count,)| *count > 0,)
        .map(|(label, count,)| format!("{label}: {count}"),)
        .collect::<Vec<_,>>()
        .join(", ",)
}

/// Renders the first `top_n` non-empty entries of a ranking.
///
/// Positions count rendered lines only, so a skipped all-zero user never
/// leaves a gap. Never returns an empty string.
pub fn render_leaderboard(entries: &[RankedEntry], top_n: usize, decoration: Decoration,) -> String
{
    let mut body = String::new();
    let visible = entries
        .iter()
        .filter_map(|entry| {
            let summary = counters_summary(&entry.counters,);
            (!summary.is_empty()).then_some((entry, summary,),)
        },)
        .take(top_n,);

    for (index, (entry, summary,),) in visible.enumerate() {
        let login = markdown::escape(&entry.login,);
        match decoration.marker(index + 1,) {
            Some(marker,) => {
                let _ = writeln!(body, "{marker} **{login}** {summary}");
            }
            None => {
                let _ = writeln!(body, "**{login}** {summary}");
            }
        }
    }

    if body.is_empty() {
        return EMPTY_PLACEHOLDER.to_owned();
    }
    body
}

/// One listed pull request or issue.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ListingItem
{
    pub number:   u64,
    pub title:    String,
    pub html_url: String,
}

/// Listing items of one repository.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ListingGroup
{
    pub repo:  String,
    pub items: Vec<ListingItem,>,
}

/// Renders non-empty groups separated by [`SEPARATOR`].
///
/// Returns `None` when there is nothing to list.
pub fn render_groups(groups: &[ListingGroup],) -> Option<String,>
{
    let rendered: Vec<String,> = groups
        .iter()
        .filter(|group| !group.items.is_empty(),)
        .map(|group| {
            let mut block = format!("## {}\n", markdown::escape(&group.repo));
            for item in &group.items {
                let number = format!("#{}", item.number);
                let _ = writeln!(
                    block,
                    "{} {}",
                    markdown::link(&number, &item.html_url,),
                    markdown::escape(&item.title)
                );
            }
            block
        },)
        .collect();

    if rendered.is_empty() {
        return None;
    }
    Some(rendered.join(&format!("{SEPARATOR}\n"),),)
}
