use chrono::NaiveDate;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use url::Url;

use crate::{
    config::ChannelConfig,
    error::{RelayError, RelayResult},
};

/// Outbound notices about library changes. Both calls are single attempts
/// with no retry and no idempotency key.
pub trait NoticeGateway: Send + Sync {
    /// Announce `url` in the channel and return the provider's message id.
    fn post_notice(&self, url: &str, config: &ChannelConfig) -> RelayResult<i64>;

    /// Delete a previously posted announcement.
    fn retract_notice(&self, message_id: i64, config: &ChannelConfig) -> RelayResult<()>;
}

pub struct TelegramGateway {
    api_base: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize, Debug)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SentMessage {
    message_id: i64,
}

impl TelegramGateway {
    pub fn new(api_base: &str) -> Self {
        let api_base = api_base.strip_suffix('/').unwrap_or(api_base).to_string();

        TelegramGateway {
            api_base,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn post(&self, config: &ChannelConfig, method: &str) -> reqwest::blocking::RequestBuilder {
        log::info!("{}/bot<token>/{method}", self.api_base);
        let url = format!("{}/bot{}/{method}", self.api_base, config.bot_token);
        self.client.post(url)
    }
}

/// Interpret a bot api reply. Non-2xx statuses and `ok: false` envelopes are
/// both provider failures and carry the provider's description when present.
fn handle_response<T>(status: reqwest::StatusCode, text: &str) -> RelayResult<Option<T>>
where
    T: DeserializeOwned,
{
    let envelope = serde_json::from_str::<ApiEnvelope<T>>(text);

    if !status.is_success() {
        let description = envelope
            .ok()
            .and_then(|e| e.description)
            .unwrap_or_else(|| status.to_string());
        return Err(RelayError::RemoteApi(description));
    }

    let envelope = envelope.map_err(|err| {
        log::error!("{err}. tried to parse: {text:?}");
        RelayError::RemoteApi(format!("malformed response: {err}"))
    })?;

    if !envelope.ok {
        return Err(RelayError::RemoteApi(
            envelope
                .description
                .unwrap_or_else(|| "request was not ok".to_string()),
        ));
    }

    Ok(envelope.result)
}

fn send(request: reqwest::blocking::RequestBuilder) -> RelayResult<(reqwest::StatusCode, String)> {
    let response = request
        .send()
        .map_err(|err| RelayError::Network(err.without_url()))?;
    let status = response.status();
    let text = response
        .text()
        .map_err(|err| RelayError::Network(err.without_url()))?;
    Ok((status, text))
}

impl NoticeGateway for TelegramGateway {
    fn post_notice(&self, url: &str, config: &ChannelConfig) -> RelayResult<i64> {
        if !config.is_complete() {
            return Err(RelayError::ConfigMissing);
        }

        let text = format_notice(url, chrono::Local::now().date_naive());
        let request = self.post(config, "sendMessage").json(&json!({
            "chat_id": config.channel_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": false,
        }));

        let (status, body) = send(request).inspect_err(|err| {
            log::warn!("sendMessage failed: {err}");
        })?;

        let message = handle_response::<SentMessage>(status, &body)
            .inspect_err(|err| log::warn!("sendMessage rejected: {err}"))?
            .ok_or_else(|| RelayError::RemoteApi("response has no result".to_string()))?;

        log::info!(
            "posted notice for {url} as message {} in {}",
            message.message_id,
            config.channel_id
        );
        Ok(message.message_id)
    }

    fn retract_notice(&self, message_id: i64, config: &ChannelConfig) -> RelayResult<()> {
        if !config.is_complete() {
            return Err(RelayError::ConfigMissing);
        }
        if message_id == 0 {
            return Err(RelayError::InvalidArgument(
                "message id is required to delete a message".to_string(),
            ));
        }

        let request = self.post(config, "deleteMessage").json(&json!({
            "chat_id": config.channel_id,
            "message_id": message_id,
        }));

        let (status, body) = send(request).inspect_err(|err| {
            log::warn!("deleteMessage failed: {err}");
        })?;

        handle_response::<serde_json::Value>(status, &body)
            .inspect_err(|err| log::warn!("deleteMessage rejected: {err}"))?;

        log::info!("retracted message {message_id} from {}", config.channel_id);
        Ok(())
    }
}

/// Display name of the site hosting `url`, e.g. `Youtube` for
/// `https://www.youtube.com/...`.
pub fn source_name(url: &str) -> String {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
    else {
        return "Unknown Source".to_string();
    };

    let host = [".com", ".org", ".net"]
        .iter()
        .fold(host.replacen("www.", "", 1), |h, suffix| {
            h.replacen(suffix, "", 1)
        });

    let mut chars = host.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown Source".to_string(),
    }
}

/// Markdown announcement posted for a newly added video.
pub fn format_notice(url: &str, added: NaiveDate) -> String {
    let source = source_name(url);
    let hashtag: String = source
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    format!(
        "🎬 *New Video Added*\n\n\
         🔗 [Watch Video]({url})\n\
         📺 Source: {source}\n\
         📅 Added: {}\n\n\
         #video #{hashtag}",
        added.format("%b %-d, %Y")
    )
}

// Characters a URI component keeps as is.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Link that opens Telegram's share sheet for `url`.
pub fn share_url(url: &str) -> String {
    format!(
        "https://t.me/share/url?url={}",
        utf8_percent_encode(url, COMPONENT)
    )
}
