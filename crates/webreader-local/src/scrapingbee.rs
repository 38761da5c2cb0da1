use std::time::Duration;
use webreader_core::{Error, Extraction, ExtractionProvider, Result};

pub const DEFAULT_ENDPOINT: &str = "https://app.scrapingbee.com/api/v1/";

/// ScrapingBee HTML API with `return_page_text=true` (plain text body).
#[derive(Debug, Clone)]
pub struct ScrapingBee {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ScrapingBee {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl ExtractionProvider for ScrapingBee {
    fn name(&self) -> &'static str {
        "scrapingbee"
    }

    async fn extract(&self, url: &str, credential: &str) -> Result<Extraction> {
        // The key travels in the query string; reqwest's error text includes the URL,
        // so strip it before the message can reach logs.
        let resp = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .query(&[
                ("api_key", credential),
                ("url", url),
                ("return_page_text", "true"),
            ])
            .send()
            .await
            .map_err(|e| Error::Extract(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Extract(format!("scrapingbee HTTP {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Extract(e.without_url().to_string()))?;
        Extraction::from_body(self.name(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::serve;
    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use std::collections::HashMap;

    #[tokio::test]
    async fn passes_key_url_and_text_mode_as_query() {
        let app = Router::new().route(
            "/api/v1/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("api_key").map(String::as_str) != Some("bee-ok") {
                    return (StatusCode::UNAUTHORIZED, String::new());
                }
                if q.get("return_page_text").map(String::as_str) != Some("true") {
                    return (StatusCode::BAD_REQUEST, String::new());
                }
                let url = q.get("url").cloned().unwrap_or_default();
                (StatusCode::OK, format!("plain text of {url}"))
            }),
        );
        let addr = serve(app).await;
        let bee = ScrapingBee::new(
            reqwest::Client::new(),
            format!("http://{addr}/api/v1/"),
            Duration::from_secs(5),
        );

        let out = bee
            .extract("https://example.com/?a=1&b=2", "bee-ok")
            .await
            .unwrap();
        assert_eq!(out.content, "plain text of https://example.com/?a=1&b=2");

        let err = bee.extract("https://example.com", "bee-bad").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 401"), "{err}");
    }

    #[tokio::test]
    async fn connection_errors_do_not_leak_the_key() {
        // Nothing listens on port 9 locally.
        let bee = ScrapingBee::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api/v1/",
            Duration::from_secs(2),
        );
        let err = bee
            .extract("https://example.com", "secret-bee-key")
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("secret-bee-key"), "{err}");
    }
}
