// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Report pipelines: query construction, aggregation, ranking and rendering.
//!
//! Each `run_*` function produces the message for one command. Delivery is
//! left to the caller so pipelines can be exercised without a webhook.

use std::collections::HashSet;

use chrono::TimeDelta;
use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::{
    config::{Config, RepoConfig, ReviewSection},
    delivery::{Message, TitleColor},
    engine,
    error::Error,
    model::Activity,
    policy::FilterPolicy,
    ranking,
    report::{self, ListingGroup, ListingItem},
    source::ActivitySource,
    tally::Tally,
    window::{ReportKind, TimeWindow},
};

/// Prefixes `text` with the configured report name.
fn titled(report_name: &str, text: &str,) -> String
{
    let report_name = report_name.trim();
    if report_name.is_empty() { text.to_owned() } else { format!("{report_name} {text}") }
}

/// Filtering rules of the review section over `window`.
pub fn review_policy(section: &ReviewSection, window: TimeWindow,) -> FilterPolicy
{
    FilterPolicy::new(window,)
        .with_lgtm_patterns(section.lgtm_comments.iter().cloned(),)
        .with_blocked_patterns(section.block_comments.iter().cloned(),)
        .with_allow_users(section.allow_users.iter().cloned(),)
        .with_block_users(section.block_users.iter().cloned(),)
}

/// Runs every query of `repos` once per window in `windows`.
///
/// Items returned by several queries or windows are kept once, in first-seen
/// order.
///
/// # Errors
///
/// Propagates search failures.
pub async fn gather_activities<S,>(
    source: &S,
    repos: &[RepoConfig],
    windows: &[TimeWindow],
) -> Result<Vec<Activity,>, Error,>
where
    S: ActivitySource,
{
    let mut seen: HashSet<(String, String, u64,),> = HashSet::new();
    let mut activities = Vec::new();

    for window in windows {
        let qualifier = window.search_qualifier();
        for repo in repos {
            for query in &repo.queries {
                let query = format!("{} {qualifier}", query.trim());
                debug!("Searching {:?}", query);
                for activity in source.search_issues(&query,).await? {
                    let (owner, name, number,) = activity.subject().key();
                    if seen.insert((owner.to_owned(), name.to_owned(), number,),) {
                        activities.push(activity,);
                    }
                }
            }
        }
    }
    Ok(activities,)
}

/// Aggregates review activity over `window`.
///
/// With `chunk` set the window is split into consecutive sub-windows. Each
/// sub-window is searched on its own, which keeps every query under the
/// search result cap. The union of all results is then aggregated once per
/// sub-window and the tallies are summed, so an item last updated in a late
/// chunk still contributes its earlier activity.
///
/// # Errors
///
/// Propagates the first source or malformed-record failure.
pub async fn review_tally<S,>(
    source: &S,
    section: &ReviewSection,
    window: TimeWindow,
    chunk: Option<TimeDelta,>,
    progress: &ProgressBar,
) -> Result<Tally, Error,>
where
    S: ActivitySource,
{
    let policy = review_policy(section, window,);
    let sub_windows: Vec<TimeWindow,> = window.chunks(chunk.unwrap_or(TimeDelta::zero(),),).collect();

    progress.set_message(format!(
        "Collecting review activity in {window} over {} searches...",
        sub_windows.len()
    ),);
    let activities = gather_activities(source, &section.repos, &sub_windows,).await?;

    let mut tally = Tally::default();
    for sub_window in sub_windows {
        progress.set_message(format!(
            "Aggregating {} items in {sub_window}...",
            activities.len()
        ),);
        let sub_policy = policy.for_window(sub_window,);
        tally.merge(engine::aggregate(source, &activities, &sub_policy,).await?,);
    }
    Ok(tally,)
}

/// Builds the review leaderboard message.
///
/// # Errors
///
/// Propagates aggregation failures.
pub async fn run_review<S,>(
    source: &S,
    config: &Config,
    kind: ReportKind,
    window: TimeWindow,
    chunk: Option<TimeDelta,>,
    progress: &ProgressBar,
) -> Result<Message, Error,>
where
    S: ActivitySource,
{
    let tally = review_tally(source, &config.review, window, chunk, progress,).await?;
    progress.set_message("Ranking reviewers...",);
    let entries = ranking::rank(&tally,);
    info!("Ranked {} users for the {} review report", entries.len(), kind);

    Ok(Message {
        title: titled(&config.report_name, &format!("Review Leaderboard ❤️ - {kind}"),),
        body:  report::render_leaderboard(&entries, config.review.top_n, config.review.decoration,),
        color: TitleColor::Green,
    },)
}

/// Builds the PTAL listing, or `None` when nothing awaits review.
///
/// # Errors
///
/// Returns [`Error::Validation`] for invalid skip patterns and propagates
/// search failures.
pub async fn run_ptal<S,>(
    source: &S,
    config: &Config,
    progress: &ProgressBar,
) -> Result<Option<Message,>, Error,>
where
    S: ActivitySource,
{
    let skip = config.ptal.skip_patterns()?;
    let mut groups = Vec::with_capacity(config.ptal.repos.len(),);

    for repo in &config.ptal.repos {
        progress.set_message(format!("Listing pull requests awaiting review in {}...", repo.name),);
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        'queries: for query in &repo.queries {
            for activity in source.search_issues(query.trim(),).await? {
                let subject = activity.subject();
                if skip.iter().any(|pattern| pattern.is_match(&subject.title,),) {
                    debug!("Skipping {} titled {:?}", subject, subject.title);
                    continue;
                }
                if !seen.insert(subject.number,) {
                    continue;
                }
                items.push(ListingItem {
                    number:   subject.number,
                    title:    subject.title.clone(),
                    html_url: subject.html_url.clone(),
                },);
                if items.len() >= config.ptal.max_items_per_repo {
                    break 'queries;
                }
            }
        }
        groups.push(ListingGroup {
            repo: repo.name.clone(),
            items,
        },);
    }

    Ok(report::render_groups(&groups,).map(|body| Message {
        title: titled(&config.report_name, "PTAL ❤️",),
        body,
        color: TitleColor::Wathet,
    },),)
}

/// Builds the package-scoped listing, or `None` when nothing matches.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a malformed `owner-repo` and propagates
/// source failures.
pub async fn run_packages<S,>(
    source: &S,
    config: &Config,
    kind: ReportKind,
    window: TimeWindow,
    progress: &ProgressBar,
) -> Result<Option<Message,>, Error,>
where
    S: ActivitySource,
{
    let section = &config.packages;
    let mut groups = Vec::with_capacity(section.repos.len(),);
    let mut packages: Vec<&str,> = Vec::new();

    for repo in &section.repos {
        let (owner, name,) = repo.owner_and_repo()?;
        packages.extend(repo.packages.iter().map(String::as_str,),);
        if repo.packages.is_empty() {
            debug!("No packages configured for {}/{}", owner, name);
            continue;
        }

        progress.set_message(format!("Listing pull requests of {owner}/{name}..."),);
        let pulls = source.list_pull_requests(owner, name, section.max_pages,).await?;
        let mut items = Vec::new();
        for pull in pulls {
            if !window.contains(pull.created_at,) {
                continue;
            }
            if section.skip_authors.iter().any(|skip| pull.author.contains(skip.as_str(),),) {
                debug!("Skipping #{} by {}", pull.number, pull.author);
                continue;
            }
            let files = source.list_pull_request_files(owner, name, pull.number,).await?;
            let touches_package = files.iter().any(|file| {
                repo.packages.iter().any(|package| file.contains(package.as_str(),),)
            },);
            if !touches_package {
                debug!("#{} touches none of {:?}", pull.number, repo.packages);
                continue;
            }
            items.push(ListingItem {
                number:   pull.number,
                title:    pull.title,
                html_url: pull.html_url,
            },);
        }
        groups.push(ListingGroup {
            repo: repo.name.clone(),
            items,
        },);
    }

    Ok(report::render_groups(&groups,).map(|body| Message {
        title: titled(
            &config.report_name,
            &format!("PTAL Pkgs:[{}] ❤️ - {kind}", packages.join(" ")),
        ),
        body,
        color: TitleColor::Wathet,
    },),)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{
        model::{Comment, PullRequest, ReviewState},
        report::EMPTY_PLACEHOLDER,
        source::memory::{MemorySource, comment, hour, labeled, review, subject},
    };

    fn window(from: i64, to: i64,) -> TimeWindow
    {
        TimeWindow::new(hour(from,).fixed_offset(), hour(to,).fixed_offset(),).expect("valid window",)
    }

    fn repo(name: &str, queries: &[&str],) -> RepoConfig
    {
        RepoConfig {
            name: name.to_owned(),
            queries: queries.iter().map(|query| (*query).to_owned(),).collect(),
            ..RepoConfig::default()
        }
    }

    fn config() -> Config
    {
        let mut config = Config {
            report_name: "TiKV".to_owned(),
            ..Config::default()
        };
        config.review.repos = vec![repo("tikv", &["repo:tikv/tikv"],)];
        config.review.lgtm_comments = vec!["LGTM".to_owned()];
        config
    }

    /// Activity spread over three days, each record inside one day.
    fn busy_source() -> MemorySource
    {
        let mut source = MemorySource {
            search: vec![
                Activity::PullRequest(subject(7, "alice", 1,),),
                Activity::Issue(subject(8, "bob", 30,),),
                Activity::Issue(subject(9, "carol", 60,),),
            ],
            ..MemorySource::default()
        };
        source.reviews.insert(
            7,
            vec![
                review(1, "bob", ReviewState::Approved, "", 2,),
                review(2, "carol", ReviewState::Commented, "", 26,),
            ],
        );
        source.review_comments.insert((7, 2,), vec![comment(20, "carol", "nit", 26,)],);
        source.comments.insert(
            7,
            vec![comment(30, "dave", "LGTM", 50,), comment(31, "bob", "ping", 3,)],
        );
        source.comments.insert(8, vec![comment(32, "alice", "repro?", 31,)],);
        source.events.insert(8, vec![labeled("carol", 33,)],);
        source.events.insert(9, vec![labeled("alice", 70,)],);
        source
    }

    #[tokio::test]
    async fn chunked_range_equals_sum_of_day_windows()
    {
        let source = busy_source();
        let config = config();
        let progress = ProgressBar::hidden();

        let whole = review_tally(&source, &config.review, window(0, 72,), None, &progress,)
            .await
            .expect("whole window",);
        let chunked = review_tally(
            &source,
            &config.review,
            window(0, 72,),
            Some(TimeDelta::hours(24,),),
            &progress,
        )
        .await
        .expect("chunked window",);

        let mut summed = Tally::default();
        for day in 0..3 {
            let day_window = window(day * 24, (day + 1) * 24,);
            let policy = review_policy(&config.review, day_window,);
            let activities = gather_activities(&source, &config.review.repos, &[day_window],)
                .await
                .expect("search",);
            summed.merge(engine::aggregate(&source, &activities, &policy,).await.expect("day tally",),);
        }

        assert_eq!(chunked, whole);
        assert_eq!(chunked, summed);
        assert_eq!(chunked.get("bob").map(|c| c.approvals), Some(1));
        assert_eq!(chunked.get("dave").map(|c| c.approvals), Some(1));
        assert_eq!(chunked.get("carol").map(|c| c.review_inline_comments), Some(1));
        assert_eq!(chunked.get("carol").map(|c| c.issues_created), Some(1));
    }

    #[tokio::test]
    async fn edited_comment_counts_once_when_chunked()
    {
        let mut source = MemorySource {
            search: vec![Activity::Issue(subject(8, "alice", -48,),)],
            ..MemorySource::default()
        };
        source.comments.insert(
            8,
            vec![Comment {
                updated_at: hour(30,),
                ..comment(1, "bob", "repro attached", 10,)
            }],
        );
        let config = config();
        let progress = ProgressBar::hidden();

        let whole = review_tally(&source, &config.review, window(0, 48,), None, &progress,)
            .await
            .expect("whole window",);
        let chunked = review_tally(
            &source,
            &config.review,
            window(0, 48,),
            Some(TimeDelta::hours(24,),),
            &progress,
        )
        .await
        .expect("chunked window",);

        assert_eq!(whole.get("bob").map(|c| c.issue_comments), Some(1));
        assert_eq!(chunked, whole);
    }

    #[tokio::test]
    async fn item_found_in_later_chunk_keeps_earlier_activity()
    {
        let pull = Activity::PullRequest(subject(7, "alice", -48,),);
        let mut source = MemorySource::default();
        let second_day = format!("repo:tikv/tikv {}", window(24, 48,).search_qualifier());
        let whole_range = format!("repo:tikv/tikv {}", window(0, 48,).search_qualifier());
        source.search_by_query.insert(second_day, vec![pull.clone()],);
        source.search_by_query.insert(whole_range, vec![pull],);
        source.reviews.insert(7, vec![review(1, "bob", ReviewState::Approved, "", 2,)],);
        source.comments.insert(7, vec![comment(30, "carol", "ping", 30,)],);
        let config = config();
        let progress = ProgressBar::hidden();

        let whole = review_tally(&source, &config.review, window(0, 48,), None, &progress,)
            .await
            .expect("whole window",);
        let chunked = review_tally(
            &source,
            &config.review,
            window(0, 48,),
            Some(TimeDelta::hours(24,),),
            &progress,
        )
        .await
        .expect("chunked window",);

        assert_eq!(whole.get("bob").map(|c| c.approvals), Some(1));
        assert_eq!(chunked, whole);
    }

    #[tokio::test]
    async fn chunked_run_issues_one_search_per_chunk()
    {
        let source = busy_source();
        let config = config();
        review_tally(
            &source,
            &config.review,
            window(0, 60,),
            Some(TimeDelta::hours(24,),),
            &ProgressBar::hidden(),
        )
        .await
        .expect("chunked window",);

        let queries = source.queries.borrow();
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().all(|query| query.starts_with("repo:tikv/tikv updated:")));
    }

    #[tokio::test]
    async fn overlapping_queries_count_items_once()
    {
        let source = MemorySource {
            search: vec![Activity::Issue(subject(8, "bob", 1,),)],
            ..MemorySource::default()
        };
        let mut config = config();
        config.review.repos = vec![repo("tikv", &["repo:tikv/tikv", "repo:tikv/tikv is:issue"],)];

        let tally =
            review_tally(&source, &config.review, window(0, 24,), None, &ProgressBar::hidden(),)
                .await
                .expect("tally",);
        assert_eq!(tally.get("bob").map(|c| c.issues_created), Some(1));
    }

    #[tokio::test]
    async fn review_message_ranks_users()
    {
        let source = busy_source();
        let message = run_review(
            &source,
            &config(),
            ReportKind::Custom,
            window(0, 72,),
            None,
            &ProgressBar::hidden(),
        )
        .await
        .expect("review message",);

        assert_eq!(message.title, "TiKV Review Leaderboard ❤️ - Custom");
        assert_eq!(message.color, TitleColor::Green);
        let first = message.body.lines().next().expect("at least one line",);
        assert_eq!(first, "🏆 **bob** approvals: 1, PR comments: 1, issues created: 1");
        assert!(message.body.contains("🥈 **carol** PR comments: 1, issues created: 1, labels added: 1"));
    }

    #[tokio::test]
    async fn quiet_period_renders_placeholder()
    {
        let source = MemorySource::default();
        let message = run_review(
            &source,
            &config(),
            ReportKind::Daily,
            window(0, 24,),
            None,
            &ProgressBar::hidden(),
        )
        .await
        .expect("review message",);
        assert_eq!(message.body, EMPTY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn ptal_skips_wip_and_truncates()
    {
        let mut wip = subject(1, "alice", 0,);
        wip.title = "[WIP] raftstore: new apply".to_owned();
        let source = MemorySource {
            search: vec![
                Activity::PullRequest(wip,),
                Activity::PullRequest(subject(2, "alice", 0,),),
                Activity::PullRequest(subject(3, "bob", 0,),),
                Activity::PullRequest(subject(4, "carol", 0,),),
            ],
            ..MemorySource::default()
        };
        let mut config = config();
        config.ptal.repos = vec![repo("tikv", &["is:pr is:open label:status/PTAL"],)];
        config.ptal.max_items_per_repo = 2;

        let message = run_ptal(&source, &config, &ProgressBar::hidden(),)
            .await
            .expect("ptal")
            .expect("items listed",);
        assert_eq!(message.title, "TiKV PTAL ❤️");
        assert!(message.body.starts_with("## tikv\n"));
        assert!(!message.body.contains("WIP"));
        assert!(message.body.contains(r"[\#2]"));
        assert!(message.body.contains(r"[\#3]"));
        assert!(!message.body.contains(r"[\#4]"));
    }

    #[tokio::test]
    async fn ptal_without_items_sends_nothing()
    {
        let mut config = config();
        config.ptal.repos = vec![repo("tikv", &["is:pr is:open"],)];
        let message = run_ptal(&MemorySource::default(), &config, &ProgressBar::hidden(),)
            .await
            .expect("ptal",);
        assert!(message.is_none());
    }

    fn pull(number: u64, author: &str, created_hour: i64,) -> PullRequest
    {
        PullRequest {
            number,
            author: author.to_owned(),
            title: format!("Change #{number}"),
            html_url: format!("https://github.com/tikv/tikv/pull/{number}"),
            created_at: hour(created_hour,),
        }
    }

    #[tokio::test]
    async fn packages_listing_filters_window_author_and_paths()
    {
        let mut source = MemorySource {
            pulls: vec![
                pull(1, "alice", 2,),
                pull(2, "dependabot[bot]", 3,),
                pull(3, "bob", 4,),
                pull(4, "carol", 40,),
            ],
            ..MemorySource::default()
        };
        source.files.insert(1, vec!["components/raftstore/src/apply.rs".to_owned()],);
        source.files.insert(2, vec!["components/raftstore/Cargo.toml".to_owned()],);
        source.files.insert(3, vec!["src/server/node.rs".to_owned()],);
        source.files.insert(4, vec!["components/raftstore/src/peer.rs".to_owned()],);

        let mut config = config();
        config.packages.repos = vec![RepoConfig {
            name: "tikv".to_owned(),
            owner_repo: "tikv/tikv".to_owned(),
            packages: vec!["components/raftstore".to_owned()],
            ..RepoConfig::default()
        }];

        let message =
            run_packages(&source, &config, ReportKind::Daily, window(0, 24,), &ProgressBar::hidden(),)
                .await
                .expect("packages")
                .expect("items listed",);
        assert_eq!(message.title, "TiKV PTAL Pkgs:[components/raftstore] ❤️ - Daily");
        assert!(message.body.contains(r"[\#1]"));
        assert!(!message.body.contains(r"[\#2]"));
        assert!(!message.body.contains(r"[\#3]"));
        assert!(!message.body.contains(r"[\#4]"));
    }

    #[tokio::test]
    async fn packages_without_configured_paths_match_nothing()
    {
        let mut source = MemorySource {
            pulls: vec![pull(1, "alice", 2,)],
            ..MemorySource::default()
        };
        source.files.insert(1, vec!["src/lib.rs".to_owned()],);
        let mut config = config();
        config.packages.repos = vec![RepoConfig {
            name: "tikv".to_owned(),
            owner_repo: "tikv/tikv".to_owned(),
            ..RepoConfig::default()
        }];

        let message =
            run_packages(&source, &config, ReportKind::Weekly, window(0, 24,), &ProgressBar::hidden(),)
                .await
                .expect("packages",);
        assert!(message.is_none());
    }
}
