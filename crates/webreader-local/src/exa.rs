use serde::Deserialize;
use std::time::Duration;
use webreader_core::{Error, Extraction, ExtractionProvider, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.exa.ai/contents";

#[derive(Debug, Clone)]
pub struct ExaContents {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ExaContents {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl ExtractionProvider for ExaContents {
    fn name(&self) -> &'static str {
        "exa"
    }

    async fn extract(&self, url: &str, credential: &str) -> Result<Extraction> {
        let body = serde_json::json!({
            "urls": [url],
            "text": true,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("x-api-key", credential)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Extract(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Extract(format!("exa contents HTTP {status}")));
        }

        let parsed: ExaContentsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Extract(e.to_string()))?;
        let text = parsed
            .results
            .into_iter()
            .next()
            .and_then(|r| r.text)
            .unwrap_or_default();
        Extraction::from_body(self.name(), text)
    }
}

#[derive(Debug, Deserialize)]
struct ExaContentsResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    text: Option<String>,
}
