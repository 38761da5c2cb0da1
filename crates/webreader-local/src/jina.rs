use std::time::Duration;
use webreader_core::{Error, Extraction, ExtractionProvider, Result};

pub const DEFAULT_ENDPOINT: &str = "https://r.jina.ai/";

/// Jina Reader: `GET https://r.jina.ai/<url>` returns the page as markdown.
#[derive(Debug, Clone)]
pub struct JinaReader {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl JinaReader {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    fn request_url(&self, url: &str) -> String {
        format!("{}/{url}", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl ExtractionProvider for JinaReader {
    fn name(&self) -> &'static str {
        "jina"
    }

    async fn extract(&self, url: &str, credential: &str) -> Result<Extraction> {
        let resp = self
            .client
            .get(self.request_url(url))
            .timeout(self.timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {credential}"),
            )
            // Appends a "Links/Buttons" summary section to the markdown.
            .header("X-With-Links-Summary", "true")
            .send()
            .await
            .map_err(|e| Error::Extract(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Extract(format!("jina reader HTTP {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Extract(e.to_string()))?;
        Extraction::from_body(self.name(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::serve;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::get,
        Router,
    };

    fn reader(addr: std::net::SocketAddr) -> JinaReader {
        JinaReader::new(
            reqwest::Client::new(),
            format!("http://{addr}/"),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn request_url_appends_target_verbatim() {
        let r = JinaReader::new(reqwest::Client::new(), DEFAULT_ENDPOINT, Duration::from_secs(1));
        assert_eq!(
            r.request_url("https://example.com/a?b=c"),
            "https://r.jina.ai/https://example.com/a?b=c"
        );
    }

    #[tokio::test]
    async fn sends_bearer_and_links_header() {
        let app = Router::new().route(
            "/*target",
            get(|Path(target): Path<String>, headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                let links = headers
                    .get("x-with-links-summary")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if auth != "Bearer jina-ok" || links != "true" {
                    return (StatusCode::UNAUTHORIZED, String::new());
                }
                (StatusCode::OK, format!("# Title\n\nfetched {target}"))
            }),
        );
        let addr = serve(app).await;

        let out = reader(addr)
            .extract("https://example.com/post", "jina-ok")
            .await
            .unwrap();
        assert!(out.content.starts_with("# Title"));
        assert!(out.content.contains("example.com/post"), "{}", out.content);

        let err = reader(addr)
            .extract("https://example.com/post", "jina-bad")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 401"), "{err}");
    }

    #[tokio::test]
    async fn empty_body_counts_as_failure() {
        let app = Router::new().route("/*target", get(|| async { "   " }));
        let addr = serve(app).await;
        let err = reader(addr)
            .extract("https://example.com", "k")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extract(ref m) if m.contains("empty")));
    }
}
