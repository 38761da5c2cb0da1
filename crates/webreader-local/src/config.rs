//! Process configuration, loaded once at startup.
//!
//! `ReaderConfig` is an immutable snapshot: handlers receive it (or the `Reader` built
//! from it) explicitly instead of reading the environment per request.

use serde::Serialize;
use std::time::Duration;
use webreader_core::{
    CredentialPool, Error, ExtractionProviderKind, Result, Role, SummaryProviderKind,
    SummaryStyle,
};

use crate::{exa, jina, scrapingbee};

pub const DEFAULT_EXTRACT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SUMMARY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u64 = 1024;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderEndpoints {
    pub jina: String,
    pub exa: String,
    pub scrapingbee: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            jina: jina::DEFAULT_ENDPOINT.to_string(),
            exa: exa::DEFAULT_ENDPOINT.to_string(),
            scrapingbee: scrapingbee::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub provider: ExtractionProviderKind,
    pub jina_keys: CredentialPool,
    pub exa_keys: CredentialPool,
    pub scrapingbee_keys: CredentialPool,
    pub endpoints: ProviderEndpoints,
    pub extract_timeout: Duration,

    pub summary_provider: SummaryProviderKind,
    pub summary_keys: CredentialPool,
    /// Which env key the summary pool came from (for error messages; never the value).
    pub summary_key_var: &'static str,
    pub summary_endpoint: String,
    pub summary_model: String,
    pub summary_style: SummaryStyle,
    pub temperature: f64,
    pub max_tokens: u64,
    pub summary_timeout: Duration,
}

impl ReaderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Values are trimmed; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let pool = |role: Role, k: &str| {
            get(k)
                .map(|v| CredentialPool::parse(role, &v))
                .unwrap_or_else(|| CredentialPool::empty(role))
        };

        let provider = match get("PROVIDER") {
            Some(v) => v.parse()?,
            None => ExtractionProviderKind::default(),
        };
        let summary_provider = match get("SUMMARY_PROVIDER") {
            Some(v) => v.parse()?,
            None => SummaryProviderKind::default(),
        };
        let summary_style = match get("SUMMARY_STYLE") {
            Some(v) => v.parse()?,
            None => SummaryStyle::default(),
        };

        // First non-empty key wins (GROQ_API_KEY before the generic API_KEY).
        let vars = summary_provider.api_key_vars();
        let summary_key_var = vars
            .iter()
            .copied()
            .find(|k| get(*k).is_some())
            .unwrap_or(vars[0]);
        let summary_keys = pool(Role::Summary, summary_key_var);

        let summary_endpoint = match get("SUMMARY_BASE_URL") {
            Some(base) => chat_completions_endpoint(&base)?,
            None => summary_provider.default_endpoint().to_string(),
        };

        let defaults = ProviderEndpoints::default();
        Ok(Self {
            provider,
            jina_keys: pool(Role::Extraction, ExtractionProviderKind::Jina.api_key_var()),
            exa_keys: pool(Role::Extraction, ExtractionProviderKind::Exa.api_key_var()),
            scrapingbee_keys: pool(
                Role::Extraction,
                ExtractionProviderKind::ScrapingBee.api_key_var(),
            ),
            endpoints: ProviderEndpoints {
                jina: get("JINA_ENDPOINT").unwrap_or(defaults.jina),
                exa: get("EXA_ENDPOINT").unwrap_or(defaults.exa),
                scrapingbee: get("SCRAPINGBEE_ENDPOINT").unwrap_or(defaults.scrapingbee),
            },
            extract_timeout: Duration::from_millis(parse_num(
                &get,
                "EXTRACT_TIMEOUT_MS",
                DEFAULT_EXTRACT_TIMEOUT_MS,
            )?),
            summary_provider,
            summary_keys,
            summary_key_var,
            summary_endpoint,
            summary_model: get("SUMMARY_MODEL")
                .unwrap_or_else(|| summary_provider.default_model().to_string()),
            summary_style,
            temperature: parse_num(&get, "SUMMARY_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            max_tokens: parse_num(&get, "SUMMARY_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            summary_timeout: Duration::from_millis(parse_num(
                &get,
                "SUMMARY_TIMEOUT_MS",
                DEFAULT_SUMMARY_TIMEOUT_MS,
            )?),
        })
    }

    /// Credential pool for the selected extraction provider.
    pub fn extraction_keys(&self) -> &CredentialPool {
        self.keys_for(self.provider)
    }

    pub fn keys_for(&self, kind: ExtractionProviderKind) -> &CredentialPool {
        match kind {
            ExtractionProviderKind::Jina => &self.jina_keys,
            ExtractionProviderKind::Exa => &self.exa_keys,
            ExtractionProviderKind::ScrapingBee => &self.scrapingbee_keys,
        }
    }
}

/// `SUMMARY_BASE_URL` may be a full endpoint or a bare API base (`https://host`,
/// `https://host/v1`). Only a bare base gets `/chat/completions` appended to its path;
/// anything else, query string included, is used as given.
pub fn chat_completions_endpoint(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let mut url = url::Url::parse(raw)
        .map_err(|e| Error::NotConfigured(format!("SUMMARY_BASE_URL {raw:?} is not a URL: {e}")))?;

    let path = url.path().trim_end_matches('/').to_string();
    let last = path.rsplit('/').next().unwrap_or("");
    if !(path.is_empty() || is_api_version(last)) {
        return Ok(raw.to_string());
    }

    url.set_path(&format!("{path}/chat/completions"));
    Ok(url.to_string())
}

/// `v1`, `v2`, `v1beta`: the tail of an API base path.
fn is_api_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

fn parse_num<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse()
            .map_err(|_| Error::NotConfigured(format!("{key} is not a valid number: {v:?}"))),
        None => Ok(default),
    }
}
