// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Configuration document describing repositories, filters and delivery.
//!
//! The YAML document uses kebab-case keys. Every section is optional and
//! falls back to the defaults documented on each field; access tokens may be
//! left out of the file and supplied through the environment instead.

use std::{fs, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Error},
    report::Decoration,
    window,
};

/// Environment variable consulted when `access.github-token` is empty.
pub const GITHUB_TOKEN_ENV: &str = "GHSTATS_GITHUB_TOKEN";
/// Environment variable consulted when `access.feishu-webhook-token` is empty.
pub const FEISHU_WEBHOOK_TOKEN_ENV: &str = "GHSTATS_FEISHU_WEBHOOK_TOKEN";

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use ghstats::config::parse_config;
///
/// let yaml = r#"
/// report-name: TiKV
/// review:
///   repos:
///     - name: tikv
///       queries: ["repo:tikv/tikv"]
/// "#;
/// let config = parse_config(yaml,).expect("valid configuration",);
/// assert_eq!(config.review.repos.len(), 1);
/// assert_eq!(config.review.top_n, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize,)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config
{
    /// Prefix of every message title.
    pub report_name:      String,
    /// Print payloads to stdout instead of posting them.
    #[serde(alias = "print-msg-local")]
    pub dry_run:          bool,
    /// Reporting timezone as whole hours east of UTC (default 8).
    pub utc_offset_hours: i32,
    /// Credentials for GitHub and the webhook.
    pub access:           Access,
    /// Review leaderboard settings.
    pub review:           ReviewSection,
    /// PTAL listing settings.
    pub ptal:             PtalSection,
    /// Package-scoped listing settings.
    pub packages:         PackagesSection,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            report_name:      String::new(),
            dry_run:          false,
            utc_offset_hours: 8,
            access:           Access::default(),
            review:           ReviewSection::default(),
            ptal:             PtalSection::default(),
            packages:         PackagesSection::default(),
        }
    }
}

/// Service credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(rename_all = "kebab-case", default)]
pub struct Access
{
    pub github_token:         String,
    pub feishu_webhook_token: String,
    /// Full webhook URL; takes precedence over the token.
    pub webhook_url:          String,
}

impl Access
{
    /// Fills empty tokens from `lookup`, keyed by environment variable name.
    pub fn apply_env<F,>(&mut self, lookup: F,)
    where
        F: Fn(&str,) -> Option<String,>,
    {
        if self.github_token.trim().is_empty()
            && let Some(token,) = lookup(GITHUB_TOKEN_ENV,)
        {
            self.github_token = token;
        }
        if self.feishu_webhook_token.trim().is_empty()
            && let Some(token,) = lookup(FEISHU_WEBHOOK_TOKEN_ENV,)
        {
            self.feishu_webhook_token = token;
        }
    }
}

/// One configured repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(rename_all = "kebab-case", default)]
pub struct RepoConfig
{
    /// Heading used in listings.
    pub name:       String,
    /// Search queries, without the time qualifier.
    #[serde(alias = "pr-query")]
    pub queries:    Vec<String,>,
    /// `owner/repo` used by the package-scoped listing.
    #[serde(alias = "pr-owner-repo")]
    pub owner_repo: String,
    /// Path substrings selecting pull requests in the package listing.
    #[serde(alias = "allow-pkgs")]
    pub packages:   Vec<String,>,
}

impl RepoConfig
{
    /// Splits `owner-repo` into owner and repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] unless the value has the form
    /// `owner/repo`.
    pub fn owner_and_repo(&self,) -> Result<(&str, &str,), Error,>
    {
        match self.owner_repo.trim().split_once('/',) {
            Some((owner, repo,),) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/',) => {
                Ok((owner, repo,),)
            }
            _ => Err(Error::validation(format!(
                "repo {:?}: owner-repo must look like owner/repo, got {:?}",
                self.name, self.owner_repo
            ),),),
        }
    }
}

/// Review leaderboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(rename_all = "kebab-case", default)]
pub struct ReviewSection
{
    pub repos:          Vec<RepoConfig,>,
    /// Whole-line comments counted as approvals.
    pub lgtm_comments:  Vec<String,>,
    /// Substrings excluding a comment from every counter.
    pub block_comments: Vec<String,>,
    /// When non-empty, only these users are counted.
    pub allow_users:    Vec<String,>,
    pub block_users:    Vec<String,>,
    /// Rendered leaderboard length (default 5).
    pub top_n:          usize,
    pub decoration:     Decoration,
    /// Sub-window length of chunked custom ranges (default 24).
    pub chunk_hours:    u32,
}

impl Default for ReviewSection
{
    fn default() -> Self
    {
        Self {
            repos:          Vec::new(),
            lgtm_comments:  Vec::new(),
            block_comments: Vec::new(),
            allow_users:    Vec::new(),
            block_users:    Vec::new(),
            top_n:          5,
            decoration:     Decoration::default(),
            chunk_hours:    24,
        }
    }
}

/// PTAL listing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(rename_all = "kebab-case", default)]
pub struct PtalSection
{
    pub repos:               Vec<RepoConfig,>,
    /// Listed items per repository (default 5).
    pub max_items_per_repo:  usize,
    /// Regular expressions; matching titles are not listed.
    pub skip_title_patterns: Vec<String,>,
}

impl Default for PtalSection
{
    fn default() -> Self
    {
        Self {
            repos:               Vec::new(),
            max_items_per_repo:  5,
            skip_title_patterns: vec![r"(?i)\bwip\b".to_owned(), r"(?i)\bdnm\b".to_owned()],
        }
    }
}

impl PtalSection
{
    /// Compiles `skip-title-patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid expression.
    pub fn skip_patterns(&self,) -> Result<Vec<Regex,>, Error,>
    {
        self.skip_title_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern,).map_err(|e| {
                    Error::validation(format!("ptal.skip-title-patterns: {pattern:?}: {e}"),)
                },)
            },)
            .collect()
    }
}

/// Package-scoped listing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(rename_all = "kebab-case", default)]
pub struct PackagesSection
{
    pub repos:        Vec<RepoConfig,>,
    /// Author substrings whose pull requests are skipped.
    pub skip_authors: Vec<String,>,
    /// Pull request pages fetched per repository (default 10).
    pub max_pages:    u32,
}

impl Default for PackagesSection
{
    fn default() -> Self
    {
        Self {
            repos:        Vec::new(),
            skip_authors: vec!["[bot]".to_owned()],
            max_pages:    10,
        }
    }
}

impl Config
{
    /// Document printed by the `config` command.
    pub fn template() -> Self
    {
        let repo = RepoConfig {
            name:       "tikv".to_owned(),
            queries:    vec!["repo:tikv/tikv is:open".to_owned()],
            owner_repo: "tikv/tikv".to_owned(),
            packages:   vec!["components/raftstore".to_owned()],
        };
        Self {
            report_name: "TiKV".to_owned(),
            review: ReviewSection {
                repos: vec![RepoConfig {
                    queries: vec!["repo:tikv/tikv".to_owned()],
                    ..repo.clone()
                }],
                lgtm_comments: vec!["LGTM".to_owned(), "/lgtm".to_owned()],
                block_comments: vec!["/cc".to_owned()],
                block_users: vec!["ti-chi-bot".to_owned()],
                ..ReviewSection::default()
            },
            ptal: PtalSection {
                repos: vec![RepoConfig {
                    queries: vec!["repo:tikv/tikv is:pr is:open label:status/PTAL".to_owned()],
                    ..repo.clone()
                }],
                ..PtalSection::default()
            },
            packages: PackagesSection {
                repos: vec![repo],
                ..PackagesSection::default()
            },
            ..Self::default()
        }
    }

    /// Renders [`Config::template`] as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when serialization fails.
    pub fn template_yaml() -> Result<String, Error,>
    {
        Ok(serde_yaml::to_string(&Self::template(),)?,)
    }

    fn validate(&self,) -> Result<(), Error,>
    {
        window::reporting_offset(self.utc_offset_hours,)?;
        if self.review.top_n == 0 {
            return Err(Error::validation("review.top-n must be at least 1",),);
        }
        if self.review.chunk_hours == 0 {
            return Err(Error::validation("review.chunk-hours must be at least 1",),);
        }
        if self.packages.max_pages == 0 {
            return Err(Error::validation("packages.max-pages must be at least 1",),);
        }
        self.ptal.skip_patterns()?;
        for repo in &self.packages.repos {
            repo.owner_and_repo()?;
        }
        Ok((),)
    }
}

/// Loads the configuration file and applies environment fallbacks.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the configuration violates invariants.
pub fn load_config(path: &Path,) -> Result<Config, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    let mut config = parse_config(&contents,)?;
    config.access.apply_env(|key| std::env::var(key,).ok().filter(|value| !value.is_empty(),),);
    Ok(config,)
}

/// Parses and validates a configuration document.
///
/// # Errors
///
/// Propagates [`Error::Parse`] when the YAML cannot be decoded and
/// [`Error::Validation`] when a value is out of range.
pub fn parse_config(contents: &str,) -> Result<Config, Error,>
{
    let config: Config = if contents.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(contents,)?
    };
    config.validate()?;
    Ok(config,)
}
