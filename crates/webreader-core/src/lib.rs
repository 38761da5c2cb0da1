use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod credentials;
pub mod normalize;
pub mod pipeline;

pub use credentials::{rotate, CredentialPool, Rotated};
pub use normalize::{first_url, normalize, normalize_report, NormalizeReport};
pub use pipeline::{Reader, ReaderInput, ReaderResponse, SummaryStyle};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("extract failed: {0}")]
    Extract(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("all {role} credentials failed after {attempts} attempt(s): {last_error}")]
    AllCredentialsFailed {
        role: Role,
        attempts: usize,
        last_error: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Which side of the pipeline a credential pool feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Extraction,
    Summary,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Extraction => "extraction",
            Role::Summary => "summary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-extraction backends. Selected once from configuration (`PROVIDER`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProviderKind {
    #[default]
    Jina,
    Exa,
    ScrapingBee,
}

impl ExtractionProviderKind {
    pub const ALL: [ExtractionProviderKind; 3] = [Self::Jina, Self::Exa, Self::ScrapingBee];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jina => "jina",
            Self::Exa => "exa",
            Self::ScrapingBee => "scrapingbee",
        }
    }

    /// Env key holding the comma-separated credential pool for this provider.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Jina => "JINA_API_KEY",
            Self::Exa => "EXA_API_KEY",
            Self::ScrapingBee => "SCRAPINGBEE_API_KEY",
        }
    }
}

impl FromStr for ExtractionProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jina" => Ok(Self::Jina),
            "exa" => Ok(Self::Exa),
            "scrapingbee" => Ok(Self::ScrapingBee),
            other => Err(Error::NotConfigured(format!(
                "unknown PROVIDER {other:?} (allowed: jina, exa, scrapingbee)"
            ))),
        }
    }
}

/// Chat-completions backends used for summaries. All speak the OpenAI wire shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryProviderKind {
    #[default]
    Groq,
    OpenAi,
}

impl SummaryProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Self::OpenAi => "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "llama-3.3-70b-versatile",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    /// Env keys for the credential pool, in precedence order.
    pub fn api_key_vars(self) -> &'static [&'static str] {
        match self {
            Self::Groq => &["GROQ_API_KEY", "API_KEY"],
            Self::OpenAi => &["OPENAI_API_KEY", "API_KEY"],
        }
    }
}

impl FromStr for SummaryProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" | "openai_compat" | "openai-compat" => Ok(Self::OpenAi),
            other => Err(Error::NotConfigured(format!(
                "unknown SUMMARY_PROVIDER {other:?} (allowed: groq, openai)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Extraction {
    pub content: String,
}

impl Extraction {
    /// A provider answered 2xx but with nothing usable: treat it like any other failure
    /// so rotation moves on to the next credential.
    pub fn from_body(provider: &str, content: String) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(Error::Extract(format!("{provider} returned empty content")));
        }
        Ok(Self { content })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub system: String,
    pub user: String,
}

#[async_trait::async_trait]
pub trait ExtractionProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, url: &str, credential: &str) -> Result<Extraction>;
}

#[async_trait::async_trait]
pub trait SummaryProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn summarize(&self, req: &SummaryRequest, credential: &str) -> Result<String>;
}
