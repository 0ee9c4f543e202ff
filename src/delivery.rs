// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Chat webhook delivery.
//!
//! Messages are posted as Feishu interactive cards with a coloured header and
//! one `lark_md` body element. Bodies must already be markdown escaped.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::Error;

/// Base URL of Feishu custom bot webhooks.
pub const FEISHU_HOOK_BASE: &str = "https://open.feishu.cn/open-apis/bot/v2/hook/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30,);

/// Card header template colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "lowercase")]
pub enum TitleColor
{
    #[default]
    Blue,
    Wathet,
    Turquoise,
    Green,
    Yellow,
    Orange,
    Red,
    Carmine,
    Violet,
    Purple,
    Indigo,
    Grey,
}

/// Rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Message
{
    pub title: String,
    pub body:  String,
    pub color: TitleColor,
}

/// Builds the interactive-card payload for `message`.
pub fn payload(message: &Message,) -> Value
{
    json!({
        "msg_type": "interactive",
        "card": {
            "config": {
                "wide_screen_mode": true,
                "enable_forward": true,
            },
            "header": {
                "title": {
                    "tag": "plain_text",
                    "content": message.title,
                },
                "template": message.color,
            },
            "elements": [
                {
                    "tag": "div",
                    "text": {
                        "tag": "lark_md",
                        "content": message.body,
                    },
                },
            ],
        },
    })
}

/// Resolves the webhook endpoint from an explicit URL or a bot token.
///
/// An explicit URL wins; empty values count as absent.
pub fn endpoint(webhook_url: Option<&str,>, token: Option<&str,>,) -> Option<String,>
{
    let non_empty = |value: &&str| !value.trim().is_empty();
    if let Some(url,) = webhook_url.filter(non_empty,) {
        return Some(url.trim().to_owned(),);
    }
    token.filter(non_empty,).map(|token| format!("{FEISHU_HOOK_BASE}{}", token.trim()),)
}

/// Checks the webhook response for transport and application failures.
///
/// # Errors
///
/// Returns [`Error::Delivery`] for non-2xx statuses and for JSON bodies whose
/// `code` (or legacy `StatusCode`) is non-zero.
pub fn check_response(status: u16, body: &str,) -> Result<(), Error,>
{
    if !(200..300).contains(&status,) {
        return Err(Error::delivery(format!("webhook returned HTTP {status}: {body}"),),);
    }
    let Ok(value,) = serde_json::from_str::<Value,>(body,) else {
        return Ok((),);
    };
    let code = value.get("code",).or_else(|| value.get("StatusCode",),).and_then(Value::as_i64,);
    match code {
        Some(code,) if code != 0 => {
            let reason = value
                .get("msg",)
                .or_else(|| value.get("StatusMessage",),)
                .and_then(Value::as_str,)
                .unwrap_or("unknown error",);
            Err(Error::delivery(format!("webhook rejected the message with code {code}: {reason}"),),)
        }
        _ => Ok((),),
    }
}

/// Webhook client.
///
/// In dry-run mode the payload is printed to stdout instead of being sent.
#[derive(Debug, Clone,)]
pub struct WebhookBot
{
    endpoint: Option<String,>,
    dry_run:  bool,
    client:   reqwest::Client,
}

impl WebhookBot
{
    /// Creates a bot posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when no endpoint is configured outside
    /// dry-run mode, and [`Error::Delivery`] when the HTTP client cannot be
    /// built.
    pub fn new(endpoint: Option<String,>, dry_run: bool,) -> Result<Self, Error,>
    {
        if endpoint.is_none() && !dry_run {
            return Err(Error::validation(
                "access.webhook-url or access.feishu-webhook-token is required unless dry-run is set",
            ),);
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT,)
            .build()
            .map_err(|error| Error::delivery(format!("failed to build HTTP client: {error}"),),)?;
        Ok(Self {
            endpoint,
            dry_run,
            client,
        },)
    }

    /// Returns `true` when messages are printed instead of sent.
    pub fn is_dry_run(&self,) -> bool
    {
        self.dry_run
    }

    /// Delivers `message`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] when the payload cannot be encoded and
    /// [`Error::Delivery`] when the webhook fails or rejects the message.
    pub async fn send(&self, message: &Message,) -> Result<(), Error,>
    {
        let payload = payload(message,);
        if self.dry_run {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok((),);
        }
        let Some(endpoint,) = self.endpoint.as_deref() else {
            return Err(Error::validation("webhook endpoint is not configured",),);
        };

        debug!("Posting {:?} to webhook", message.title);
        let response = self
            .client
            .post(endpoint,)
            .json(&payload,)
            .send()
            .await
            .map_err(|error| Error::delivery(format!("webhook request failed: {error}"),),)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| Error::delivery(format!("failed to read webhook response: {error}"),),)?;
        check_response(status, &body,)?;
        info!("Delivered {:?}", message.title);
        Ok((),)
    }
}
