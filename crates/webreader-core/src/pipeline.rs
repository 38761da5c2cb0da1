//! Extract-then-summarize pipeline.
//!
//! Extraction failure is fatal: with no content there is nothing to summarize or show.
//! Summarization failure is not: the caller still gets the extracted content, with a
//! placeholder in place of the summary.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::credentials::{rotate, CredentialPool};
use crate::normalize::first_url;
use crate::{Error, ExtractionProvider, Result, Role, SummaryProvider, SummaryRequest};

/// Characters of content forwarded to the summarizer.
pub const SUMMARY_INPUT_BUDGET_CHARS: usize = 30_000;
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated for summarization ...]";

/// Prefix of the summary text when every summarization credential failed.
pub const SUMMARY_UNAVAILABLE: &str = "**Summary unavailable.**";

const PROMPT_PARAGRAPH: &str = "You summarize documents for a reader. \
Use only the content supplied by the user; do not add outside knowledge or speculation. \
Always respond in English, whatever the language of the content. \
Write a single concise paragraph covering the main points.";

const PROMPT_STRUCTURED: &str = "You summarize documents for a reader. \
Use only the content supplied by the user; do not add outside knowledge or speculation. \
Always respond in English, whatever the language of the content. \
Format the answer as Markdown: a short `##` heading, then 3-7 bullet points with the key facts, \
then one closing sentence with the takeaway.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Paragraph,
    Structured,
}

impl SummaryStyle {
    pub fn system_prompt(self) -> &'static str {
        match self {
            SummaryStyle::Paragraph => PROMPT_PARAGRAPH,
            SummaryStyle::Structured => PROMPT_STRUCTURED,
        }
    }
}

impl FromStr for SummaryStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paragraph" => Ok(Self::Paragraph),
            "structured" | "markdown" => Ok(Self::Structured),
            other => Err(Error::NotConfigured(format!(
                "unknown SUMMARY_STYLE {other:?} (allowed: paragraph, structured)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderInput {
    Url(String),
    Text(String),
}

impl ReaderInput {
    /// Validate an inbound request. `url` wins over `text` when both are present.
    ///
    /// The URL is re-normalized here even if the client already cleaned it.
    pub fn parse(url: Option<&str>, text: Option<&str>) -> Result<Self> {
        let url = url.map(str::trim).filter(|s| !s.is_empty());
        let text = text.filter(|s| !s.trim().is_empty());

        match (url, text) {
            (Some(raw), _) => {
                let target = first_url(raw)
                    .ok_or_else(|| Error::InvalidUrl(format!("no URL found in {raw:?}")))?;
                let parsed =
                    url::Url::parse(&target).map_err(|e| Error::InvalidUrl(e.to_string()))?;
                if parsed.host_str().is_none() {
                    return Err(Error::InvalidUrl(format!("{target} has no host")));
                }
                Ok(Self::Url(target))
            }
            (None, Some(text)) => Ok(Self::Text(text.to_string())),
            (None, None) => Err(Error::InvalidInput("URL is required".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaderResponse {
    pub summary: String,
    pub content: String,
}

/// Cap content for the summarizer. Counts characters, not bytes.
pub fn truncate_for_summary(content: &str) -> Cow<'_, str> {
    match content.char_indices().nth(SUMMARY_INPUT_BUDGET_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &content[..cut])),
        None => Cow::Borrowed(content),
    }
}

pub fn cite(url: &str, summary: &str) -> String {
    format!("**URL:** {url}\n\n{summary}")
}

fn summary_unavailable(err: &Error) -> String {
    let reason = match err {
        Error::AllCredentialsFailed {
            attempts,
            last_error,
            ..
        } => format!("all {attempts} summarization credential(s) failed; last error: {last_error}"),
        other => other.to_string(),
    };
    format!("{SUMMARY_UNAVAILABLE} The content was retrieved, but summarization failed ({reason}).")
}

/// One configured pipeline. Built once from an immutable config snapshot and shared
/// across requests; each call shuffles its own credential order.
#[derive(Clone)]
pub struct Reader {
    extractor: Arc<dyn ExtractionProvider>,
    summarizer: Arc<dyn SummaryProvider>,
    extraction_keys: CredentialPool,
    extraction_var: String,
    summary_keys: CredentialPool,
    summary_var: String,
    style: SummaryStyle,
}

impl Reader {
    pub fn new(
        extractor: Arc<dyn ExtractionProvider>,
        extraction_keys: CredentialPool,
        summarizer: Arc<dyn SummaryProvider>,
        summary_keys: CredentialPool,
    ) -> Self {
        Self {
            extraction_var: format!("{}_API_KEY", extractor.name().to_ascii_uppercase()),
            summary_var: format!("{}_API_KEY", summarizer.name().to_ascii_uppercase()),
            extractor,
            summarizer,
            extraction_keys,
            summary_keys,
            style: SummaryStyle::default(),
        }
    }

    pub fn with_style(mut self, style: SummaryStyle) -> Self {
        self.style = style;
        self
    }

    /// Override the env key names quoted in configuration errors.
    pub fn with_key_vars(mut self, extraction: &str, summary: &str) -> Self {
        self.extraction_var = extraction.to_string();
        self.summary_var = summary.to_string();
        self
    }

    pub fn style(&self) -> SummaryStyle {
        self.style
    }

    pub async fn process(&self, input: &ReaderInput) -> Result<ReaderResponse> {
        match input {
            ReaderInput::Url(url) => {
                self.extraction_keys.require(&self.extraction_var)?;
                self.summary_keys.require(&self.summary_var)?;

                let extracted = rotate(&self.extraction_keys, self.extractor.name(), |key| {
                    self.extractor.extract(url, key)
                })
                .await?;
                let content = extracted.value.content;
                info!(
                    provider = self.extractor.name(),
                    attempts = extracted.attempts,
                    chars = content.chars().count(),
                    "content extracted"
                );

                let summary = self.summarize(&content).await;
                Ok(ReaderResponse {
                    summary: cite(url, &summary),
                    content,
                })
            }
            ReaderInput::Text(text) => {
                self.summary_keys.require(&self.summary_var)?;
                let summary = self.summarize(text).await;
                Ok(ReaderResponse {
                    summary,
                    content: text.clone(),
                })
            }
        }
    }

    async fn summarize(&self, content: &str) -> String {
        let req = SummaryRequest {
            system: self.style.system_prompt().to_string(),
            user: truncate_for_summary(content).into_owned(),
        };
        let out = rotate(&self.summary_keys, self.summarizer.name(), |key| {
            self.summarizer.summarize(&req, key)
        })
        .await;

        match out {
            Ok(rotated) => {
                info!(
                    provider = self.summarizer.name(),
                    attempts = rotated.attempts,
                    "summary generated"
                );
                rotated.value
            }
            Err(e) => {
                warn!(role = %Role::Summary, provider = self.summarizer.name(), error = %e, "summarization degraded");
                summary_unavailable(&e)
            }
        }
    }
}
