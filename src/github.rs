// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! GitHub REST implementation of [`ActivitySource`].
//!
//! Responses are decoded into crate-owned DTOs and converted into domain
//! records, failing on records that miss a required field. Every request
//! goes through [`retry_until_reset`], so rate limits only slow a run down.

use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    model::{Activity, Comment, IssueEvent, PullRequest, Review, ReviewState, Subject},
    retry::{FetchError, RetryPolicy, retry_until_reset},
    source::ActivitySource,
};

/// Page size requested from list endpoints.
const PER_PAGE: u32 = 100;
/// Maximum number of results the search API returns for one query.
pub const SEARCH_RESULT_CAP: u64 = 1000;

#[derive(Debug, Deserialize,)]
struct UserDto
{
    login: String,
}

#[derive(Debug, Deserialize,)]
struct SearchPageDto
{
    total_count:        u64,
    #[serde(default)]
    incomplete_results: bool,
    items:              Vec<SearchItemDto,>,
}

#[derive(Debug, Deserialize,)]
struct SearchItemDto
{
    number:         u64,
    title:          String,
    html_url:       String,
    created_at:     DateTime<Utc,>,
    user:           Option<UserDto,>,
    repository_url: String,
    pull_request:   Option<serde_json::Value,>,
}

#[derive(Debug, Deserialize,)]
struct ReviewDto
{
    id:           u64,
    user:         Option<UserDto,>,
    state:        ReviewState,
    body:         Option<String,>,
    submitted_at: Option<DateTime<Utc,>,>,
}

#[derive(Debug, Deserialize,)]
struct CommentDto
{
    id:         u64,
    user:       Option<UserDto,>,
    body:       Option<String,>,
    created_at: DateTime<Utc,>,
    updated_at: DateTime<Utc,>,
}

#[derive(Debug, Deserialize,)]
struct EventDto
{
    event:      String,
    actor:      Option<UserDto,>,
    created_at: DateTime<Utc,>,
}

#[derive(Debug, Deserialize,)]
struct PullDto
{
    number:     u64,
    title:      String,
    html_url:   String,
    created_at: DateTime<Utc,>,
    user:       Option<UserDto,>,
}

#[derive(Debug, Deserialize,)]
struct FileDto
{
    filename: String,
}

#[derive(Debug, Deserialize,)]
struct RateLimitDto
{
    resources: RateResourcesDto,
}

#[derive(Debug, Deserialize,)]
struct RateResourcesDto
{
    core:   RateDto,
    search: RateDto,
}

#[derive(Debug, Deserialize,)]
struct RateDto
{
    reset: i64,
}

fn required_login(user: Option<UserDto,>, what: &str,) -> Result<String, Error,>
{
    user.map(|user| user.login,).ok_or_else(|| Error::malformed(format!("{what} has no user"),),)
}

/// Splits `https://api.github.com/repos/<owner>/<repo>` into its last two
/// segments.
fn owner_and_repo(repository_url: &str,) -> Result<(String, String,), Error,>
{
    let mut segments = repository_url.trim_end_matches('/',).rsplit('/',);
    match (segments.next(), segments.next(),) {
        (Some(repo,), Some(owner,),) if !repo.is_empty() && !owner.is_empty() => {
            Ok((owner.to_owned(), repo.to_owned(),),)
        }
        _ => Err(Error::malformed(format!("unexpected repository url {repository_url:?}"),),),
    }
}

impl TryFrom<SearchItemDto,> for Activity
{
    type Error = Error;

    fn try_from(item: SearchItemDto,) -> Result<Self, Self::Error,>
    {
        let (owner, repo,) = owner_and_repo(&item.repository_url,)?;
        let author = required_login(item.user, &format!("search item {}", item.html_url),)?;
        let subject = Subject {
            owner,
            repo,
            number: item.number,
            author,
            title: item.title,
            html_url: item.html_url,
            created_at: item.created_at,
        };
        Ok(if item.pull_request.is_some() {
            Activity::PullRequest(subject,)
        } else {
            Activity::Issue(subject,)
        },)
    }
}

impl TryFrom<ReviewDto,> for Review
{
    type Error = Error;

    fn try_from(review: ReviewDto,) -> Result<Self, Self::Error,>
    {
        if review.submitted_at.is_none() && review.state != ReviewState::Pending {
            return Err(Error::malformed(format!("submitted review {} has no submission time", review.id),),);
        }
        Ok(Self {
            id:           review.id,
            reviewer:     required_login(review.user, &format!("review {}", review.id),)?,
            state:        review.state,
            body:         review.body.unwrap_or_default(),
            submitted_at: review.submitted_at,
        },)
    }
}

impl TryFrom<CommentDto,> for Comment
{
    type Error = Error;

    fn try_from(comment: CommentDto,) -> Result<Self, Self::Error,>
    {
        Ok(Self {
            id:         comment.id,
            author:     required_login(comment.user, &format!("comment {}", comment.id),)?,
            body:       comment.body.unwrap_or_default(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        },)
    }
}

impl From<EventDto,> for IssueEvent
{
    fn from(event: EventDto,) -> Self
    {
        Self {
            kind:       event.event,
            actor:      event.actor.map(|actor| actor.login,),
            created_at: event.created_at,
        }
    }
}

impl TryFrom<PullDto,> for PullRequest
{
    type Error = Error;

    fn try_from(pull: PullDto,) -> Result<Self, Self::Error,>
    {
        Ok(Self {
            author:     required_login(pull.user, &format!("pull request {}", pull.html_url),)?,
            number:     pull.number,
            title:      pull.title,
            html_url:   pull.html_url,
            created_at: pull.created_at,
        },)
    }
}

fn convert_all<D, T,>(records: Vec<D,>,) -> Result<Vec<T,>, Error,>
where
    T: TryFrom<D, Error = Error,>,
{
    records.into_iter().map(T::try_from,).collect()
}

fn is_rate_limited(error: &octocrab::Error,) -> bool
{
    match error {
        octocrab::Error::GitHub {
            source, ..
        } => {
            let status = source.status_code.as_u16();
            (status == 403 || status == 429) && source.message.to_lowercase().contains("rate limit",)
        }
        _ => false,
    }
}

/// Activity source backed by the GitHub REST API.
#[derive(Clone,)]
pub struct GitHubSource
{
    client: Octocrab,
    retry:  RetryPolicy,
}

impl GitHubSource
{
    /// Wraps an already configured client.
    pub fn new(client: Octocrab, retry: RetryPolicy,) -> Self
    {
        Self {
            client,
            retry,
        }
    }

    /// Builds a client authenticated with a personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Source`] when the client cannot be constructed.
    pub fn from_token(token: &str, retry: RetryPolicy,) -> Result<Self, Error,>
    {
        let client = Octocrab::builder()
            .personal_token(token.to_owned(),)
            .build()
            .map_err(|e| Error::api(format!("failed to build octocrab: {e}"),),)?;
        Ok(Self::new(client, retry,),)
    }

    async fn get<T, P,>(&self, route: &str, params: &P,) -> Result<T, Error,>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        retry_until_reset(&self.retry, route, move || async move { self.get_once::<T, P,>(route, params,).await },)
            .await
    }

    async fn get_once<T, P,>(&self, route: &str, params: &P,) -> Result<T, FetchError,>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        match self.client.get::<T, _, _,>(route, Some(params,),).await {
            Ok(value,) => Ok(value,),
            Err(error,) if is_rate_limited(&error,) => Err(FetchError::RateLimited {
                reset_at: self.rate_limit_reset(route,).await,
            },),
            Err(error,) => Err(FetchError::Fatal(Error::api(format!("GET {route} failed: {error}"),),),),
        }
    }

    /// Reset deadline of the quota that `route` consumes.
    async fn rate_limit_reset(&self, route: &str,) -> Option<DateTime<Utc,>,>
    {
        let limits: RateLimitDto = match self.client.get("/rate_limit", None::<&(),>,).await {
            Ok(limits,) => limits,
            Err(error,) => {
                debug!("Failed to query /rate_limit: {}", error);
                return None;
            }
        };
        let reset = if route.starts_with("/search",) {
            limits.resources.search.reset
        } else {
            limits.resources.core.reset
        };
        DateTime::<Utc,>::from_timestamp(reset, 0,)
    }

    /// Fetches pages until a short page or `max_pages`.
    async fn paginate<D,>(
        &self,
        route: &str,
        params: &[(&str, String,)],
        max_pages: Option<u32,>,
    ) -> Result<Vec<D,>, Error,>
    where
        D: DeserializeOwned,
    {
        let mut records = Vec::new();
        let mut page: u32 = 1;
        loop {
            let mut query = params.to_vec();
            query.push(("per_page", PER_PAGE.to_string(),),);
            query.push(("page", page.to_string(),),);

            let batch: Vec<D,> = self.get(route, &query,).await?;
            let fetched = batch.len();
            records.extend(batch,);

            if fetched < PER_PAGE as usize || max_pages.is_some_and(|max| page >= max,) {
                break;
            }
            page += 1;
        }
        debug!("Fetched {} records from {}", records.len(), route);
        Ok(records,)
    }
}

impl ActivitySource for GitHubSource
{
    async fn search_issues(&self, query: &str,) -> Result<Vec<Activity,>, Error,>
    {
        let mut items: Vec<SearchItemDto,> = Vec::new();
        let mut page: u32 = 1;
        loop {
            let params = [
                ("q", query.to_owned(),),
                ("per_page", PER_PAGE.to_string(),),
                ("page", page.to_string(),),
            ];
            let result: SearchPageDto = self.get("/search/issues", &params[..],).await?;
            if result.incomplete_results {
                warn!("Search for {:?} timed out on GitHub; results may be incomplete", query);
            }
            if page == 1 && result.total_count > SEARCH_RESULT_CAP {
                warn!(
                    "Search for {:?} matched {} items but only {} are returned; use a chunked custom range",
                    query, result.total_count, SEARCH_RESULT_CAP
                );
            }

            let fetched = result.items.len();
            items.extend(result.items,);
            let reachable = result.total_count.min(SEARCH_RESULT_CAP,);
            if fetched < PER_PAGE as usize || items.len() as u64 >= reachable {
                break;
            }
            page += 1;
        }
        info!("Search {:?} returned {} items", query, items.len());
        convert_all(items,)
    }

    async fn list_reviews(&self, pull: &Subject,) -> Result<Vec<Review,>, Error,>
    {
        let route = format!("/repos/{}/{}/pulls/{}/reviews", pull.owner, pull.repo, pull.number);
        convert_all(self.paginate::<ReviewDto,>(&route, &[], None,).await?,)
    }

    async fn list_review_comments(
        &self,
        pull: &Subject,
        review_id: u64,
    ) -> Result<Vec<Comment,>, Error,>
    {
        let route = format!(
            "/repos/{}/{}/pulls/{}/reviews/{review_id}/comments",
            pull.owner, pull.repo, pull.number
        );
        convert_all(self.paginate::<CommentDto,>(&route, &[], None,).await?,)
    }

    async fn list_issue_comments(
        &self,
        subject: &Subject,
        since: DateTime<Utc,>,
    ) -> Result<Vec<Comment,>, Error,>
    {
        let route =
            format!("/repos/{}/{}/issues/{}/comments", subject.owner, subject.repo, subject.number);
        let params = [("since", since.to_rfc3339(),)];
        convert_all(self.paginate::<CommentDto,>(&route, &params, None,).await?,)
    }

    async fn list_issue_events(&self, subject: &Subject,) -> Result<Vec<IssueEvent,>, Error,>
    {
        let route =
            format!("/repos/{}/{}/issues/{}/events", subject.owner, subject.repo, subject.number);
        let events = self.paginate::<EventDto,>(&route, &[], None,).await?;
        Ok(events.into_iter().map(IssueEvent::from,).collect(),)
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        max_pages: u32,
    ) -> Result<Vec<PullRequest,>, Error,>
    {
        let route = format!("/repos/{owner}/{repo}/pulls");
        let params = [
            ("state", "all".to_owned(),),
            ("sort", "created".to_owned(),),
            ("direction", "desc".to_owned(),),
        ];
        convert_all(self.paginate::<PullDto,>(&route, &params, Some(max_pages,),).await?,)
    }

    async fn list_pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String,>, Error,>
    {
        let route = format!("/repos/{owner}/{repo}/pulls/{number}/files");
        let files = self.paginate::<FileDto,>(&route, &[], None,).await?;
        Ok(files.into_iter().map(|file| file.filename,).collect(),)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn search_items_are_classified_at_ingestion()
    {
        let page: SearchPageDto = serde_json::from_str(
            r#"{
                "total_count": 2,
                "incomplete_results": false,
                "items": [
                    {
                        "number": 7,
                        "title": "raft: fix gc",
                        "html_url": "https://github.com/tikv/tikv/pull/7",
                        "created_at": "2024-05-01T02:00:00Z",
                        "user": {"login": "alice"},
                        "repository_url": "https://api.github.com/repos/tikv/tikv",
                        "pull_request": {"url": "https://api.github.com/repos/tikv/tikv/pulls/7"}
                    },
                    {
                        "number": 8,
                        "title": "flaky test",
                        "html_url": "https://github.com/tikv/pd/issues/8",
                        "created_at": "2024-05-01T03:00:00Z",
                        "user": {"login": "bob"},
                        "repository_url": "https://api.github.com/repos/tikv/pd"
                    }
                ]
            }"#,
        )
        .expect("valid search page",);

        let activities: Vec<Activity,> = convert_all(page.items,).expect("well-formed items",);
        assert!(activities[0].is_pull_request());
        assert_eq!(activities[0].subject().to_string(), "tikv/tikv#7");
        assert!(!activities[1].is_pull_request());
        assert_eq!(activities[1].subject().repo, "pd");
        assert_eq!(activities[1].subject().author, "bob");
    }

    #[test]
    fn missing_author_is_malformed()
    {
        let item: SearchItemDto = serde_json::from_str(
            r#"{
                "number": 9,
                "title": "ghost",
                "html_url": "https://github.com/tikv/tikv/issues/9",
                "created_at": "2024-05-01T02:00:00Z",
                "user": null,
                "repository_url": "https://api.github.com/repos/tikv/tikv"
            }"#,
        )
        .expect("valid item",);
        assert!(matches!(Activity::try_from(item), Err(Error::Malformed { .. })));
    }

    #[test]
    fn repository_url_needs_owner_and_repo()
    {
        assert_eq!(
            owner_and_repo("https://api.github.com/repos/tikv/tikv/").expect("valid url"),
            ("tikv".to_owned(), "tikv".to_owned())
        );
        assert!(owner_and_repo("tikv").is_err());
    }

    #[test]
    fn pending_review_keeps_missing_submission_time()
    {
        let dto: ReviewDto = serde_json::from_str(
            r#"{"id": 3, "user": {"login": "carol"}, "state": "PENDING", "body": null}"#,
        )
        .expect("valid review",);
        let review = Review::try_from(dto,).expect("well-formed review",);
        assert_eq!(review.state, ReviewState::Pending);
        assert_eq!(review.submitted_at, None);
        assert_eq!(review.body, "");
    }

    #[test]
    fn submitted_review_without_time_is_malformed()
    {
        let dto: ReviewDto = serde_json::from_str(
            r#"{"id": 4, "user": {"login": "carol"}, "state": "APPROVED", "body": ""}"#,
        )
        .expect("valid review",);
        assert!(matches!(Review::try_from(dto), Err(Error::Malformed { .. })));
    }

    #[test]
    fn events_keep_optional_actor()
    {
        let dto: EventDto = serde_json::from_str(
            r#"{"event": "labeled", "actor": null, "created_at": "2024-05-01T02:00:00Z"}"#,
        )
        .expect("valid event",);
        let event = IssueEvent::from(dto,);
        assert!(event.is_labeled());
        assert_eq!(event.actor, None);
    }

    #[test]
    fn rate_limit_document_exposes_reset_epochs()
    {
        let limits: RateLimitDto = serde_json::from_str(
            r#"{"resources": {
                "core": {"limit": 5000, "remaining": 0, "reset": 1714528800},
                "search": {"limit": 30, "remaining": 0, "reset": 1714528860}
            }}"#,
        )
        .expect("valid rate limit document",);
        assert_eq!(
            DateTime::<Utc>::from_timestamp(limits.resources.search.reset, 0)
                .map(|value| value.to_rfc3339()),
            Some("2024-05-01T02:01:00+00:00".to_owned())
        );
    }
}
