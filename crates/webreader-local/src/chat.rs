use serde::{Deserialize, Serialize};
use std::time::Duration;
use webreader_core::{Error, Result, SummaryProvider, SummaryProviderKind, SummaryRequest};

/// OpenAI-shaped `chat/completions` client. Groq and any OpenAI-compatible endpoint
/// share the wire format; only the defaults differ.
#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    client: reqwest::Client,
    kind: SummaryProviderKind,
    endpoint: String,
    model: String,
    temperature: f64,
    max_tokens: u64,
    timeout: Duration,
}

impl ChatSummarizer {
    pub fn new(client: reqwest::Client, kind: SummaryProviderKind) -> Self {
        Self {
            client,
            kind,
            endpoint: kind.default_endpoint().to_string(),
            model: kind.default_model().to_string(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            timeout: Duration::from_millis(crate::config::DEFAULT_SUMMARY_TIMEOUT_MS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f64, max_tokens: u64) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl SummaryProvider for ChatSummarizer {
    fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    async fn summarize(&self, req: &SummaryRequest, credential: &str) -> Result<String> {
        let body = ChatCompletionsRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &req.system,
                },
                Message {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {credential}"),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "{} chat.completions HTTP {status}",
                self.name()
            )));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(Error::Llm(format!(
                "{} chat.completions returned no content",
                self.name()
            )));
        }
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f64,
    max_tokens: u64,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
