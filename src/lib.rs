// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Review-activity statistics for GitHub repositories.
//!
//! The library searches issues and pull requests updated in a reporting
//! window, counts review activity per user (approvals, comments, created
//! issues, added labels), ranks users by a weighted score and renders the
//! leaderboard for a chat webhook. Listings of pull requests awaiting review
//! reuse the same source, renderer and delivery.
//!
//! The platform is reached through the [`ActivitySource`] trait so every
//! pipeline can run against in-memory data.

pub mod app;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod github;
pub mod markdown;
pub mod model;
pub mod policy;
pub mod ranking;
pub mod report;
pub mod retry;
pub mod source;
pub mod tally;
pub mod window;

pub use config::{Config, load_config, parse_config};
pub use delivery::{Message, TitleColor, WebhookBot};
pub use error::{Error, io_error};
pub use github::GitHubSource;
pub use policy::FilterPolicy;
pub use ranking::{RankedEntry, rank};
pub use retry::RetryPolicy;
pub use source::ActivitySource;
pub use tally::{ReviewCounters, Tally};
pub use window::{ReportKind, TimeWindow};
