// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Reporting windows.
//!
//! A [`TimeWindow`] is the half-open range `[start, end)` expressed in the
//! fixed reporting offset. Windows are resolved from the invocation kind and
//! the current instant, or parsed from explicit literals for custom ranges.

use std::fmt;

use chrono::{
    DateTime, Datelike, FixedOffset, Months, NaiveDateTime, SecondsFormat, TimeDelta, Timelike,
    Utc, Weekday,
};
use serde::{Deserialize, Serialize};

use crate::error::{self, Error};

/// Literal format accepted for custom window boundaries.
pub const CUSTOM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Hour of day at which the weekly window opens on Monday.
const WEEKLY_START_HOUR: u32 = 10;

/// Granularity of a scheduled report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind
{
    /// Previous 24 hours, or 72 hours on Monday.
    Daily,
    /// Since 10:00 on Monday of the current week.
    Weekly,
    /// Since the same instant one calendar month ago.
    Monthly,
    /// Caller-supplied boundaries.
    Custom,
}

impl ReportKind
{
    /// Label used in message titles.
    pub fn label(self,) -> &'static str
    {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Custom => "Custom",
        }
    }
}

impl fmt::Display for ReportKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.label(),)
    }
}

/// Half-open `[start, end)` range in the reporting offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct TimeWindow
{
    start: DateTime<FixedOffset,>,
    end:   DateTime<FixedOffset,>,
}

impl TimeWindow
{
    /// Creates a window, rejecting empty or inverted ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `start >= end`.
    pub fn new(start: DateTime<FixedOffset,>, end: DateTime<FixedOffset,>,) -> Result<Self, Error,>
    {
        if start >= end {
            return Err(Error::validation(format!(
                "window start {} must precede end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            ),),);
        }
        Ok(Self {
            start,
            end,
        },)
    }

    /// Inclusive lower bound.
    pub fn start(&self,) -> DateTime<FixedOffset,>
    {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self,) -> DateTime<FixedOffset,>
    {
        self.end
    }

    /// Returns `true` when `instant` lies in `[start, end)`.
    ///
    /// The instant is converted to the reporting offset before comparison.
    pub fn contains(&self, instant: DateTime<Utc,>,) -> bool
    {
        let local = instant.with_timezone(self.start.offset(),);
        self.start <= local && local < self.end
    }

    /// Search qualifier restricting results to items updated in the window.
    pub fn search_qualifier(&self,) -> String
    {
        format!(
            "updated:{}..{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, false)
        )
    }

    /// Splits the window into consecutive sub-windows of at most `step`.
    ///
    /// The last chunk is truncated at [`end`](Self::end). A non-positive step
    /// yields the whole window once.
    pub fn chunks(&self, step: TimeDelta,) -> Chunks
    {
        Chunks {
            cursor: self.start,
            end: self.end,
            step,
        }
    }
}

impl fmt::Display for TimeWindow
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, false)
        )
    }
}

/// Iterator over consecutive sub-windows produced by [`TimeWindow::chunks`].
#[derive(Debug, Clone,)]
pub struct Chunks
{
    cursor: DateTime<FixedOffset,>,
    end:    DateTime<FixedOffset,>,
    step:   TimeDelta,
}

impl Iterator for Chunks
{
    type Item = TimeWindow;

    fn next(&mut self,) -> Option<Self::Item,>
    {
        if self.cursor >= self.end {
            return None;
        }
        let next = if self.step <= TimeDelta::zero() {
            self.end
        } else {
            self.cursor.checked_add_signed(self.step,).map_or(self.end, |value| value.min(self.end,),)
        };
        let chunk = TimeWindow {
            start: self.cursor,
            end:   next,
        };
        self.cursor = next;
        Some(chunk,)
    }
}

/// Resolves the window for a scheduled report ending at `now`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for [`ReportKind::Custom`], which needs
/// explicit boundaries (see [`parse_custom`]), or when date arithmetic leaves
/// the representable range.
pub fn resolve(kind: ReportKind, now: DateTime<FixedOffset,>,) -> Result<TimeWindow, Error,>
{
    match kind {
        ReportKind::Daily => daily(now,),
        ReportKind::Weekly => weekly(now,),
        ReportKind::Monthly => monthly(now,),
        ReportKind::Custom => {
            Err(Error::validation("custom windows require explicit --start and --end",),)
        }
    }
}

fn daily(now: DateTime<FixedOffset,>,) -> Result<TimeWindow, Error,>
{
    // Monday also covers the weekend.
    let lookback = if now.weekday() == Weekday::Mon {
        TimeDelta::hours(72,)
    } else {
        TimeDelta::hours(24,)
    };
    TimeWindow::new(now - lookback, now,)
}

fn weekly(now: DateTime<FixedOffset,>,) -> Result<TimeWindow, Error,>
{
    let days_since_monday = i64::from(now.weekday().num_days_from_monday(),);
    let monday = now
        .with_hour(WEEKLY_START_HOUR,)
        .and_then(|value| value.with_minute(0,),)
        .and_then(|value| value.with_second(0,),)
        .and_then(|value| value.with_nanosecond(0,),)
        .map(|value| value - TimeDelta::days(days_since_monday,),)
        .ok_or_else(|| Error::validation(format!("cannot derive weekly start from {now}"),),)?;
    let start = if monday >= now { monday - TimeDelta::days(7,) } else { monday };
    TimeWindow::new(start, now,)
}

fn monthly(now: DateTime<FixedOffset,>,) -> Result<TimeWindow, Error,>
{
    // chrono clamps the day to the last valid day of the target month.
    let start = now
        .checked_sub_months(Months::new(1,),)
        .ok_or_else(|| Error::validation(format!("cannot derive monthly start from {now}"),),)?;
    TimeWindow::new(start, now,)
}

/// Parses a literal timestamp in [`CUSTOM_TIME_FORMAT`] at `offset`.
///
/// # Errors
///
/// Returns [`Error::TimeParse`] when the literal does not match the format.
pub fn parse_timestamp(input: &str, offset: FixedOffset,) -> Result<DateTime<FixedOffset,>, Error,>
{
    let naive = NaiveDateTime::parse_from_str(input.trim(), CUSTOM_TIME_FORMAT,)
        .map_err(|source| error::time_parse_error(input, source,),)?;
    naive
        .and_local_timezone(offset,)
        .single()
        .ok_or_else(|| Error::validation(format!("timestamp {input:?} is ambiguous at {offset}"),),)
}

/// Parses explicit custom boundaries.
///
/// # Errors
///
/// Returns [`Error::TimeParse`] for malformed literals and
/// [`Error::Validation`] when `start` does not precede `end`.
pub fn parse_custom(start: &str, end: &str, offset: FixedOffset,) -> Result<TimeWindow, Error,>
{
    let start = parse_timestamp(start, offset,)?;
    let end = parse_timestamp(end, offset,)?;
    TimeWindow::new(start, end,)
}

/// Builds the reporting offset from whole hours east of UTC.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the offset is out of range.
pub fn reporting_offset(hours: i32,) -> Result<FixedOffset, Error,>
{
    hours
        .checked_mul(3600,)
        .and_then(FixedOffset::east_opt,)
        .ok_or_else(|| Error::validation(format!("utc offset {hours}h is out of range"),),)
}
