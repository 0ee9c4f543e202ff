// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the ghstats binary.
//!
//! The CLI exposes subcommands for the review leaderboard, the PTAL and
//! package-scoped listings, and for printing a configuration template.

use std::{io, path::PathBuf, process};

use chrono::{TimeDelta, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use ghstats::{
    Config, Error, GitHubSource, Message, ReportKind, RetryPolicy, WebhookBot, app, delivery,
    load_config, window,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line interface for GitHub review statistics.
#[derive(Debug, Parser,)]
#[command(name = "ghstats", version, about = "Rank GitHub review activity and post it to a chat webhook")]
struct Cli
{
    /// Path to the YAML configuration file.
    #[arg(long = "config", short = 'c', value_name = "PATH", env = "GHSTATS_CONFIG", global = true)]
    config: Option<PathBuf,>,

    /// Print webhook payloads to stdout instead of sending them.
    #[arg(long = "dry-run", action = ArgAction::SetTrue, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Rank review activity over a reporting window.
    Review(ReviewArgs,),
    /// List open pull requests awaiting review.
    Ptal,
    /// List recent pull requests touching configured packages.
    Pkgs(PkgsArgs,),
    /// Print a configuration template.
    Config,
}

#[derive(Debug, Args,)]
struct ReviewArgs
{
    #[command(subcommand)]
    period: ReviewPeriod,
}

#[derive(Debug, Subcommand,)]
enum ReviewPeriod
{
    /// Previous 24 hours, or 72 hours on Monday.
    Daily,
    /// Since Monday 10:00 of the current week.
    Weekly,
    /// Since the same time one month ago.
    Monthly,
    /// Explicit range, searched in chunks.
    Custom(CustomArgs,),
}

#[derive(Debug, Args,)]
struct CustomArgs
{
    /// Inclusive start, `YYYY-MM-DD HH:MM:SS` in the reporting timezone.
    #[arg(long = "start", value_name = "TIME")]
    start: String,

    /// Exclusive end, `YYYY-MM-DD HH:MM:SS` in the reporting timezone.
    #[arg(long = "end", value_name = "TIME")]
    end: String,

    /// Sub-window length; defaults to `review.chunk-hours`.
    #[arg(long = "chunk-hours", value_name = "HOURS")]
    chunk_hours: Option<u32,>,
}

#[derive(Debug, Args,)]
struct PkgsArgs
{
    #[command(subcommand)]
    period: PkgsPeriod,
}

#[derive(Debug, Clone, Copy, Subcommand,)]
enum PkgsPeriod
{
    Daily,
    Weekly,
    Monthly,
}

impl From<PkgsPeriod,> for ReportKind
{
    fn from(period: PkgsPeriod,) -> Self
    {
        match period {
            PkgsPeriod::Daily => Self::Daily,
            PkgsPeriod::Weekly => Self::Weekly,
            PkgsPeriod::Monthly => Self::Monthly,
        }
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    init_tracing();
    if let Err(err,) = run(Cli::parse(),).await {
        error!("{}", err);
        eprintln!("{}", err.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),);
    let _ = tracing_subscriber::fmt().with_env_filter(filter,).with_writer(io::stderr,).try_init();
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, source and delivery errors.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    if let Command::Config = cli.command {
        let stdout = io::stdout();
        return write_template(&mut stdout.lock(),);
    }

    let path = cli
        .config
        .as_deref()
        .ok_or_else(|| Error::validation("missing required --config <PATH> argument",),)?;
    let config = load_config(path,)?;
    let dry_run = cli.dry_run || config.dry_run;

    if config.access.github_token.trim().is_empty() {
        return Err(Error::validation(
            "access.github-token or GHSTATS_GITHUB_TOKEN is required",
        ),);
    }
    let source = GitHubSource::from_token(config.access.github_token.trim(), RetryPolicy::default(),)?;
    let bot = WebhookBot::new(
        delivery::endpoint(
            Some(config.access.webhook_url.as_str(),),
            Some(config.access.feishu_webhook_token.as_str(),),
        ),
        dry_run,
    )?;

    let offset = window::reporting_offset(config.utc_offset_hours,)?;
    let now = Utc::now().with_timezone(&offset,);
    let progress = spinner();

    let message = match cli.command {
        Command::Review(args,) => {
            let (kind, window, chunk,) = match args.period {
                ReviewPeriod::Daily => (ReportKind::Daily, window::resolve(ReportKind::Daily, now,)?, None,),
                ReviewPeriod::Weekly => {
                    (ReportKind::Weekly, window::resolve(ReportKind::Weekly, now,)?, None,)
                }
                ReviewPeriod::Monthly => {
                    (ReportKind::Monthly, window::resolve(ReportKind::Monthly, now,)?, None,)
                }
                ReviewPeriod::Custom(custom,) => {
                    let window = window::parse_custom(&custom.start, &custom.end, offset,)?;
                    let hours = custom.chunk_hours.unwrap_or(config.review.chunk_hours,);
                    (ReportKind::Custom, window, Some(chunk_step(hours,)?,),)
                }
            };
            info!("Building the {} review report for {}", kind, window);
            Some(app::run_review(&source, &config, kind, window, chunk, &progress,).await?,)
        }
        Command::Ptal => app::run_ptal(&source, &config, &progress,).await?,
        Command::Pkgs(args,) => {
            let kind = ReportKind::from(args.period,);
            let window = window::resolve(kind, now,)?;
            info!("Building the {} package report for {}", kind, window);
            app::run_packages(&source, &config, kind, window, &progress,).await?
        }
        Command::Config => None,
    };
    progress.finish_and_clear();

    deliver(&bot, message,).await
}

async fn deliver(bot: &WebhookBot, message: Option<Message,>,) -> Result<(), Error,>
{
    match message {
        Some(message,) => {
            if bot.is_dry_run() {
                info!("Dry run: printing {:?} instead of sending it", message.title);
            }
            bot.send(&message,).await
        }
        None => {
            info!("Nothing to report; no message sent");
            Ok((),)
        }
    }
}

fn chunk_step(hours: u32,) -> Result<TimeDelta, Error,>
{
    if hours == 0 {
        return Err(Error::validation("--chunk-hours must be at least 1",),);
    }
    Ok(TimeDelta::hours(i64::from(hours,),),)
}

fn spinner() -> ProgressBar
{
    let pb = ProgressBar::new_spinner();
    if let Ok(style,) = ProgressStyle::default_spinner().template("{spinner:.yellow} [{elapsed_precise}] {msg}",) {
        pb.set_style(style,);
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(120,),);
    pb
}

fn write_template<W: io::Write,>(writer: &mut W,) -> Result<(), Error,>
{
    let yaml = Config::template_yaml()?;
    writer.write_all(yaml.as_bytes(),).map_err(|source| ghstats::io_error(std::path::Path::new("<stdout>",), source,),)?;
    Ok((),)
}
