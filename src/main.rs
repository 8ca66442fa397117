use std::sync::Arc;

mod config;
mod confidence;
mod embedding;
mod errors;
mod health;
mod history;
mod logging;
mod mcp;
mod nlp;
mod pipeline;
mod router;
mod summarize;

use crate::config::AppConfig;
use crate::embedding::build_provider;
use crate::history::HistoryStore;
use crate::mcp::StdioMcpServer;
use crate::pipeline::Pipeline;
use crate::router::RouterConfig;

#[tokio::main]
async fn main() {
    logging::init_logging();

    let cfg = AppConfig::from_env_and_args();
    if let Err(e) = cfg.validate() {
        tracing::error!(config_error=%e, "invalid config");
        std::process::exit(2);
    }

    let provider = match build_provider(&cfg) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error=?e, "failed to build embedding provider");
            std::process::exit(2);
        }
    };
    if provider.is_none() {
        tracing::warn!("no embedding backend; every request classifies as Unknown");
    }

    let anchors = match cfg.anchors_file.as_deref() {
        Some(path) => match RouterConfig::from_json_file(path) {
            Ok(anchors) => {
                tracing::info!(path=%path.display(), anchors=anchors.anchors().len(), "loaded intent anchors");
                anchors
            }
            Err(e) => {
                tracing::error!(error=%e, path=%path.display(), "invalid anchors file");
                std::process::exit(2);
            }
        },
        None => RouterConfig::default(),
    };

    let history = match cfg.history_path.clone() {
        Some(path) => match HistoryStore::open(path.clone(), cfg.history_limit) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error=%e, path=%path.display(), "failed to load history");
                std::process::exit(2);
            }
        },
        None => HistoryStore::in_memory(cfg.history_limit),
    };

    // Startup health check (best-effort, logged only)
    let embedding_ok =
        health::check_embedding_backend(&cfg.embedding_backend, &cfg.ollama_host).await;
    tracing::info!(
        embedding_ok,
        embedding_backend=%cfg.embedding_backend,
        embedding_model=%cfg.embedding_model,
        history_records=history.len(),
        "MCP server startup complete"
    );

    let pipeline = Arc::new(Pipeline::with_provider(provider, anchors));
    let server = StdioMcpServer::new(pipeline, Arc::new(history), &cfg);
    tokio::select! {
        res = server.run() => {
            if let Err(e) = res { tracing::error!(error=?e, "server terminated with error") }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping");
        }
    }
}
