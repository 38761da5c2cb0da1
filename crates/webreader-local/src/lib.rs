use std::sync::Arc;
use std::time::Duration;
use webreader_core::{
    Error, ExtractionProvider, ExtractionProviderKind, Reader, Result, SummaryProvider,
};

pub mod chat;
pub mod config;
pub mod exa;
pub mod jina;
pub mod scrapingbee;

pub use chat::ChatSummarizer;
pub use config::ReaderConfig;
pub use exa::ExaContents;
pub use jina::JinaReader;
pub use scrapingbee::ScrapingBee;

/// Shared client for every provider call. Per-call timeouts come from config;
/// the connect timeout here only guards DNS/TCP/TLS stalls.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("webreader/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::NotConfigured(format!("http client: {e}")))
}

pub fn extraction_provider(
    config: &ReaderConfig,
    client: reqwest::Client,
) -> Arc<dyn ExtractionProvider> {
    let timeout = config.extract_timeout;
    match config.provider {
        ExtractionProviderKind::Jina => Arc::new(JinaReader::new(
            client,
            config.endpoints.jina.clone(),
            timeout,
        )),
        ExtractionProviderKind::Exa => Arc::new(ExaContents::new(
            client,
            config.endpoints.exa.clone(),
            timeout,
        )),
        ExtractionProviderKind::ScrapingBee => Arc::new(ScrapingBee::new(
            client,
            config.endpoints.scrapingbee.clone(),
            timeout,
        )),
    }
}

pub fn summary_provider(config: &ReaderConfig, client: reqwest::Client) -> Arc<dyn SummaryProvider> {
    Arc::new(
        ChatSummarizer::new(client, config.summary_provider)
            .with_endpoint(config.summary_endpoint.clone())
            .with_model(config.summary_model.clone())
            .with_sampling(config.temperature, config.max_tokens)
            .with_timeout(config.summary_timeout),
    )
}

/// Wire the configured providers and credential pools into a [`Reader`].
pub fn build_reader(config: &ReaderConfig, client: reqwest::Client) -> Reader {
    Reader::new(
        extraction_provider(config, client.clone()),
        config.extraction_keys().clone(),
        summary_provider(config, client),
        config.summary_keys.clone(),
    )
    .with_style(config.summary_style)
    .with_key_vars(config.provider.api_key_var(), config.summary_key_var)
}

#[cfg(test)]
pub(crate) mod testutil {
    use axum::Router;
    use std::net::SocketAddr;

    pub async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};
    use webreader_core::ReaderInput;

    fn bearer(headers: &HeaderMap) -> String {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .trim_start_matches("Bearer ")
            .to_string()
    }

    /// Fake Jina + chat endpoints. Only `jina-good` and `llm-good` are accepted.
    async fn fake_providers(seen: Arc<Mutex<Vec<String>>>) -> std::net::SocketAddr {
        let seen_jina = seen.clone();
        let app = Router::new()
            .route(
                "/jina/*target",
                get(move |headers: HeaderMap| {
                    let seen = seen_jina.clone();
                    async move {
                        let key = bearer(&headers);
                        seen.lock().unwrap().push(key.clone());
                        if key == "jina-good" {
                            (StatusCode::OK, "# Article\n\nBody text.".to_string())
                        } else {
                            (StatusCode::PAYMENT_REQUIRED, String::new())
                        }
                    }
                }),
            )
            .route(
                "/chat/completions",
                post(move |headers: HeaderMap| async move {
                    if bearer(&headers) == "llm-good" {
                        (
                            StatusCode::OK,
                            Json(json!({ "choices": [ { "message": { "content": "Concise summary." } } ] })),
                        )
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })))
                    }
                }),
            );
        testutil::serve(app).await
    }

    fn config_for(addr: std::net::SocketAddr, jina: &str, groq: &str) -> ReaderConfig {
        let m: BTreeMap<&str, String> = BTreeMap::from([
            ("JINA_API_KEY", jina.to_string()),
            ("GROQ_API_KEY", groq.to_string()),
            ("JINA_ENDPOINT", format!("http://{addr}/jina/")),
            ("SUMMARY_BASE_URL", format!("http://{addr}")),
            ("EXTRACT_TIMEOUT_MS", "5000".to_string()),
        ]);
        ReaderConfig::from_lookup(|k| m.get(k).cloned()).unwrap()
    }

    #[tokio::test]
    async fn configured_reader_rotates_to_the_working_key() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let addr = fake_providers(seen.clone()).await;
        let cfg = config_for(addr, "jina-bad1, jina-bad2, jina-good", "llm-good");
        let reader = build_reader(&cfg, http_client().unwrap());

        let input = ReaderInput::parse(Some("URL: example.com/story"), None).unwrap();
        let out = reader.process(&input).await.unwrap();

        assert_eq!(out.content, "# Article\n\nBody text.");
        assert_eq!(
            out.summary,
            "**URL:** https://example.com/story\n\nConcise summary."
        );
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty() && seen.len() <= 3);
        assert_eq!(seen.last().map(String::as_str), Some("jina-good"));
    }

    #[tokio::test]
    async fn configured_reader_degrades_when_every_llm_key_fails() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let addr = fake_providers(seen).await;
        let cfg = config_for(addr, "jina-good", "llm-bad1,llm-bad2");
        let reader = build_reader(&cfg, http_client().unwrap());

        let input = ReaderInput::Url("https://example.com/story".to_string());
        let out = reader.process(&input).await.unwrap();
        assert_eq!(out.content, "# Article\n\nBody text.");
        assert!(out.summary.contains("Summary unavailable"), "{}", out.summary);
        assert!(out.summary.contains("groq chat.completions HTTP 401"), "{}", out.summary);
    }

    fn chat_ok() -> axum::routing::MethodRouter {
        post(|| async {
            Json(json!({ "choices": [ { "message": { "content": "Concise summary." } } ] }))
        })
    }

    #[tokio::test]
    async fn exa_provider_is_wired_with_its_own_pool() {
        let seen: Arc<Mutex<Vec<(String, serde_json::Value)>>> = Arc::default();
        let seen_exa = seen.clone();
        let app = Router::new()
            .route(
                "/contents",
                post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                    let seen = seen_exa.clone();
                    async move {
                        let key = headers
                            .get("x-api-key")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        seen.lock().unwrap().push((key, body));
                        Json(json!({ "results": [ { "text": "Exa page text." } ] }))
                    }
                }),
            )
            .route("/chat/completions", chat_ok());
        let addr = testutil::serve(app).await;

        let m: BTreeMap<&str, String> = BTreeMap::from([
            ("PROVIDER", "exa".to_string()),
            ("EXA_API_KEY", "exa-key".to_string()),
            ("JINA_API_KEY", "jina-key".to_string()),
            ("GROQ_API_KEY", "llm-good".to_string()),
            ("EXA_ENDPOINT", format!("http://{addr}/contents")),
            ("SUMMARY_BASE_URL", format!("http://{addr}")),
        ]);
        let cfg = ReaderConfig::from_lookup(|k| m.get(k).cloned()).unwrap();
        let reader = build_reader(&cfg, http_client().unwrap());

        let input = ReaderInput::Url("https://example.com/exa".to_string());
        let out = reader.process(&input).await.unwrap();
        assert_eq!(out.content, "Exa page text.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "exa-key");
        assert_eq!(
            seen[0].1,
            json!({ "urls": ["https://example.com/exa"], "text": true })
        );
    }

    #[tokio::test]
    async fn scrapingbee_provider_is_wired_with_its_own_pool() {
        let seen: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
        let seen_bee = seen.clone();
        let app = Router::new()
            .route(
                "/api/v1/",
                get(move |Query(q): Query<HashMap<String, String>>| {
                    let seen = seen_bee.clone();
                    async move {
                        seen.lock().unwrap().push(q);
                        (StatusCode::OK, "Bee page text.")
                    }
                }),
            )
            .route("/chat/completions", chat_ok());
        let addr = testutil::serve(app).await;

        let m: BTreeMap<&str, String> = BTreeMap::from([
            ("PROVIDER", "scrapingbee".to_string()),
            ("SCRAPINGBEE_API_KEY", "bee-key".to_string()),
            ("EXA_API_KEY", "exa-key".to_string()),
            ("GROQ_API_KEY", "llm-good".to_string()),
            ("SCRAPINGBEE_ENDPOINT", format!("http://{addr}/api/v1/")),
            ("SUMMARY_BASE_URL", format!("http://{addr}")),
        ]);
        let cfg = ReaderConfig::from_lookup(|k| m.get(k).cloned()).unwrap();
        let reader = build_reader(&cfg, http_client().unwrap());

        let input = ReaderInput::Url("https://example.com/bee".to_string());
        let out = reader.process(&input).await.unwrap();
        assert_eq!(out.content, "Bee page text.");
        assert_eq!(
            out.summary,
            "**URL:** https://example.com/bee\n\nConcise summary."
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("api_key").map(String::as_str), Some("bee-key"));
        assert_eq!(
            seen[0].get("url").map(String::as_str),
            Some("https://example.com/bee")
        );
        assert_eq!(
            seen[0].get("return_page_text").map(String::as_str),
            Some("true")
        );
    }

    #[tokio::test]
    async fn missing_extraction_pool_names_the_env_key() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let addr = fake_providers(seen.clone()).await;
        let cfg = config_for(addr, "", "llm-good");
        let reader = build_reader(&cfg, http_client().unwrap());

        let input = ReaderInput::Url("https://example.com".to_string());
        let err = reader.process(&input).await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured(ref m) if m.contains("JINA_API_KEY")));
        assert!(seen.lock().unwrap().is_empty());
    }
}
