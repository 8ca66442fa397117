use std::time::Duration;

pub async fn check_ollama(host: &str) -> bool {
    let url = format!("{}/api/tags", host.trim_end_matches('/'));
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };
    client
        .get(url)
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

/// Reachability of the configured embedding backend; offline backends are
/// always ready and `none` never is.
pub async fn check_embedding_backend(backend: &str, ollama_host: &str) -> bool {
    match backend {
        "ollama" => check_ollama(ollama_host).await,
        // local model loads lazily on first request
        "fastembed" | "lexical" => true,
        _ => false,
    }
}
