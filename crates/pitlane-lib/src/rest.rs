//! PostgREST data client.
//!
//! Descriptors are encoded into PostgREST query parameters:
//!
//! ```text
//! GET {base}/races?select=raceId,year,circuits(name)&year=eq.2009&order=round.asc&limit=5
//! ```
//!
//! Embedded entities become nested `select` items (`races!inner(...)` for
//! inner joins) and filters on embedded columns use dotted paths
//! (`races.year=gte.2005`).
//!
//! PostgREST reads `*` in `like`/`ilike` values as a wildcard, so LIKE
//! patterns are sent as anchored regular expressions instead
//! (`surname=match.^Sch.*$`, `imatch` for the case-insensitive form).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::DataClient;
use crate::descriptor::{Descriptor, Embed, Filter, FilterOp};
use crate::error::{Error, Result};

/// Default HTTP timeout for data service calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`RestClient`].
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Base URL of the REST endpoint, e.g. `https://project.supabase.co/rest/v1`.
    pub base_url: String,
    /// Key sent as `apikey` and as a bearer token.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl RestClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Data client for a PostgREST-compatible service.
///
/// The underlying `reqwest::Client` pools connections and is shared by all
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

impl RestClient {
    pub fn new(config: RestClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|_| Error::InvalidBaseUrl {
            url: config.base_url.clone(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl {
                url: config.base_url,
            });
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
        })
    }

    /// URL of the table backing `descriptor`.
    pub fn table_url(&self, descriptor: &Descriptor) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base url can always be a base.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(descriptor.entity.table());
        }
        url
    }
}

fn user_agent() -> String {
    format!("pitlane-lib/{}", env!("CARGO_PKG_VERSION"))
}

/// Encode a descriptor as PostgREST query parameters.
pub fn encode_query(descriptor: &Descriptor) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(descriptor.filters.len() + 3);
    params.push(("select".to_string(), encode_select(descriptor)));

    for filter in &descriptor.filters {
        params.push((filter.column.path(), encode_filter(filter)));
    }

    if !descriptor.order.is_empty() {
        let order = descriptor
            .order
            .iter()
            .map(|key| {
                let direction = if key.ascending { "asc" } else { "desc" };
                format!("{}.{}", key.column, direction)
            })
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }

    if let Some(limit) = descriptor.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

fn encode_select(descriptor: &Descriptor) -> String {
    let mut items: Vec<String> = descriptor
        .projection
        .columns
        .iter()
        .map(|column| (*column).to_string())
        .collect();
    items.extend(descriptor.projection.embeds.iter().map(encode_embed));
    items.join(",")
}

fn encode_embed(embed: &Embed) -> String {
    let hint = if embed.inner { "!inner" } else { "" };
    format!(
        "{}{}({})",
        embed.entity.table(),
        hint,
        embed.columns.join(",")
    )
}

fn encode_filter(filter: &Filter) -> String {
    match (filter.op, &filter.value) {
        (FilterOp::Like, Value::String(pattern)) => format!("match.{}", like_to_regex(pattern)),
        (FilterOp::ILike, Value::String(pattern)) => format!("imatch.{}", like_to_regex(pattern)),
        (op, value) => format!("{}.{}", op.as_str(), encode_value(value)),
    }
}

/// Translate a LIKE pattern (`%`, `_`, `\` escapes) into an anchored
/// POSIX regular expression matching the same strings.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 4);
    regex.push('^');
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_literal(&mut regex, escaped);
                }
            }
            other => push_literal(&mut regex, other),
        }
    }
    regex.push('$');
    regex
}

fn push_literal(regex: &mut String, ch: char) {
    if matches!(
        ch,
        '\\' | '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|'
    ) {
        regex.push('\\');
    }
    regex.push(ch);
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DataClient for RestClient {
    async fn fetch(&self, descriptor: &Descriptor) -> Result<Vec<Value>> {
        let url = self.table_url(descriptor);
        let params = encode_query(descriptor);
        debug!(%url, ?params, "data service request");

        let mut request = self
            .http
            .get(url)
            .query(&params)
            .header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorPayload>(&body)
                .map(|payload| payload.message)
                .unwrap_or_else(|_| format!("data service responded with {status}"));
            warn!(table = %descriptor.entity, %status, %message, "data service error");
            return Err(Error::Store { message });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
