use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webreader::http::{self, ApiError, AppState};
use webreader_core::{normalize, normalize_report, ExtractionProviderKind, ReaderInput};
use webreader_local::{build_reader, http_client, ReaderConfig};

#[derive(Parser, Debug)]
#[command(name = "webreader")]
#[command(about = "Read a URL and summarize it (HTTP server + CLI)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (`POST /api/reader`, `POST /api/normalize`, `GET /health`).
    Serve(ServeCmd),
    /// Extract and summarize one URL (or text) and print the JSON response.
    ///
    /// Exits non-zero when the server would have answered 4xx/5xx; the JSON error body
    /// is still printed on stdout.
    Read(ReadCmd),
    /// Clean pasted URL text read from stdin.
    Normalize(NormalizeCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    /// Listen address.
    #[arg(long, env = "WEBREADER_BIND", default_value = "0.0.0.0:3000")]
    bind: String,
}

#[derive(clap::Args, Debug)]
struct ReadCmd {
    /// URL to read. Pasted junk (labels, split query lines) is cleaned first.
    #[arg(long, conflicts_with = "text")]
    url: Option<String>,
    /// Raw text to summarize instead of a URL.
    #[arg(long)]
    text: Option<String>,
}

#[derive(clap::Args, Debug)]
struct NormalizeCmd {
    /// Output format. Allowed: text, json
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format. Allowed: json, text
    #[arg(long, default_value = "json")]
    output: String,
}

/// Load a `.env` file before anything reads configuration.
///
/// - `WEBREADER_ENV_FILE=<path>` loads that file
/// - otherwise `.env` is discovered from the working directory unless `WEBREADER_DOTENV=0`
/// - variables already set in the process environment are never overridden
///
/// Returns a warning to log once tracing is up (tracing may itself be configured by the file).
fn load_env_file() -> Option<String> {
    if let Ok(p) = std::env::var("WEBREADER_ENV_FILE") {
        let p = p.trim();
        if !p.is_empty() {
            return dotenvy::from_path(p)
                .err()
                .map(|e| format!("WEBREADER_ENV_FILE={p} not loaded: {e}"));
        }
    }

    let disabled = matches!(
        std::env::var("WEBREADER_DOTENV")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "0" | "false" | "no" | "off"
    );
    if disabled {
        return None;
    }
    // A missing .env is the normal case; a broken one is not.
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => Some(format!(".env not loaded: {e}")),
        _ => None,
    }
}

fn init_tracing() {
    // stderr keeps stdout clean for the JSON the CLI subcommands print.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,webreader=debug,webreader_core=debug,webreader_local=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn warn_on_missing_keys(config: &ReaderConfig) {
    if config.extraction_keys().is_empty() {
        warn!(
            provider = config.provider.as_str(),
            key_var = config.provider.api_key_var(),
            "no extraction credentials configured; URL requests will fail"
        );
    }
    if config.summary_keys.is_empty() {
        warn!(
            provider = config.summary_provider.as_str(),
            key_var = config.summary_key_var,
            "no summary credentials configured; requests will fail"
        );
    }
}

fn doctor_report(config: &ReaderConfig) -> serde_json::Value {
    let extraction: serde_json::Map<String, serde_json::Value> = ExtractionProviderKind::ALL
        .iter()
        .map(|kind| {
            let pool = config.keys_for(*kind);
            (
                kind.as_str().to_string(),
                serde_json::json!({
                    "configured": !pool.is_empty(),
                    "keys": pool.len(),
                    "key_var": kind.api_key_var(),
                    "selected": *kind == config.provider,
                }),
            )
        })
        .collect();

    let mut warnings = Vec::new();
    if config.extraction_keys().is_empty() {
        warnings.push("extraction_keys_missing");
    }
    if config.summary_keys.is_empty() {
        warnings.push("summary_keys_missing");
    }

    serde_json::json!({
        "ok": warnings.is_empty(),
        "provider": config.provider.as_str(),
        "configured": {
            "extraction": extraction,
            "summary": {
                "provider": config.summary_provider.as_str(),
                "configured": !config.summary_keys.is_empty(),
                "keys": config.summary_keys.len(),
                "key_var": config.summary_key_var,
                "endpoint": config.summary_endpoint,
                "model": config.summary_model,
                "style": config.summary_style,
            },
        },
        "timeouts_ms": {
            "extract": config.extract_timeout.as_millis() as u64,
            "summary": config.summary_timeout.as_millis() as u64,
        },
        "warnings": warnings,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_warning = load_env_file();
    init_tracing();
    if let Some(w) = env_warning {
        warn!("{w}");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = ReaderConfig::from_env().context("failed to load configuration")?;
            warn_on_missing_keys(&config);
            info!(
                provider = config.provider.as_str(),
                summary_provider = config.summary_provider.as_str(),
                model = %config.summary_model,
                "configuration loaded"
            );

            let reader = build_reader(&config, http_client()?);
            let app = http::router(AppState {
                reader: Arc::new(reader),
            });

            let listener = tokio::net::TcpListener::bind(&args.bind)
                .await
                .with_context(|| format!("failed to bind {}", args.bind))?;
            info!(addr = %listener.local_addr()?, "listening");
            axum::serve(listener, app).await.context("server error")?;
        }
        Commands::Read(args) => {
            let config = ReaderConfig::from_env().context("failed to load configuration")?;
            let reader = build_reader(&config, http_client()?);

            let outcome = match ReaderInput::parse(args.url.as_deref(), args.text.as_deref()) {
                Ok(input) => reader.process(&input).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(resp) => println!("{}", serde_json::to_string(&resp)?),
                Err(e) => {
                    let api = ApiError::from(e);
                    println!("{}", serde_json::to_string(api.body())?);
                    anyhow::bail!("read failed (HTTP {})", api.status().as_u16());
                }
            }
        }
        Commands::Normalize(args) => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read stdin")?;
            match args.output.to_ascii_lowercase().as_str() {
                "json" => println!("{}", serde_json::to_string(&normalize_report(&raw))?),
                _ => println!("{}", normalize(&raw)),
            }
        }
        Commands::Doctor => {
            let t0 = Instant::now();
            let mut v = match ReaderConfig::from_env() {
                Ok(config) => doctor_report(&config),
                Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
            };
            if let Some(obj) = v.as_object_mut() {
                obj.insert("schema_version".to_string(), 1.into());
                obj.insert("kind".to_string(), "doctor".into());
                obj.insert("name".to_string(), "webreader".into());
                obj.insert("version".to_string(), env!("CARGO_PKG_VERSION").into());
                obj.insert(
                    "elapsed_ms".to_string(),
                    (t0.elapsed().as_millis() as u64).into(),
                );
            }
            println!("{v}");
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "webreader",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("webreader {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }

    Ok(())
}
