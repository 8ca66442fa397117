use crate::config::AppConfig;
use crate::errors::RouteError;
use crate::health;
use crate::history::{HistoryRecord, HistoryStore};
use crate::pipeline::{Pipeline, RequestSlot, Ticket};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const SERVER_NAME: &str = "edgeswarm-router";
const HISTORY_URI: &str = "mcp://edgeswarm-router/history";

const TOOL_ERROR: i64 = -32001;
const REQUEST_SUPERSEDED: i64 = -32800;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Clone)]
pub struct StdioMcpServer {
    pipeline: Arc<Pipeline>,
    history: Arc<HistoryStore>,
    slot: Arc<RequestSlot>,
    // JSON-RPC id of the route currently holding the slot
    active_route: Arc<Mutex<Option<serde_json::Value>>>,
    // Once we detect raw JSON (no Content-Length) from the client,
    // we reply in ND-JSON (one JSON per line, no headers).
    raw_json_mode: Arc<AtomicBool>,
    embedding_backend: String,
    ollama_host: String,
}

impl StdioMcpServer {
    pub fn new(pipeline: Arc<Pipeline>, history: Arc<HistoryStore>, cfg: &AppConfig) -> Self {
        Self {
            pipeline,
            history,
            slot: Arc::new(RequestSlot::new()),
            active_route: Arc::new(Mutex::new(None)),
            raw_json_mode: Arc::new(AtomicBool::new(false)),
            embedding_backend: cfg.embedding_backend.clone(),
            ollama_host: cfg.ollama_host.clone(),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let reader = std::io::BufReader::new(std::io::stdin());
        let writer = std::io::BufWriter::new(std::io::stdout());
        self.run_with(reader, writer).await
    }

    /// Serve requests from `reader` until it closes. Routes run on their own
    /// tasks so a later request can supersede or cancel them.
    pub async fn run_with<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let writer = Arc::new(Mutex::new(writer));
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
        let raw_json_mode = self.raw_json_mode.clone();
        // Plain thread: a blocked stdin read must not hold up runtime shutdown.
        std::thread::Builder::new()
            .name("mcp-stdin".into())
            .spawn(move || {
                let mut reader = reader;
                loop {
                    match read_framed_message_buf(&mut reader, &raw_json_mode) {
                        Ok(msg) => {
                            if tx.blocking_send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error=?e, "stdin closed or invalid frame");
                            break;
                        }
                    }
                }
            })?;

        tracing::info!("run loop started: waiting for framed MCP requests on stdin");
        let mut routes = JoinSet::new();
        while let Some(msg) = rx.recv().await {
            while let Some(done) = routes.try_join_next() {
                if let Err(e) = done {
                    tracing::warn!(error=?e, "route task failed");
                }
            }
            self.handle_message(&msg, &writer, &mut routes).await?;
        }
        while let Some(done) = routes.join_next().await {
            if let Err(e) = done {
                tracing::warn!(error=?e, "route task failed");
            }
        }
        Ok(())
    }

    async fn handle_message<W>(
        &self,
        msg: &[u8],
        writer: &Arc<Mutex<W>>,
        routes: &mut JoinSet<()>,
    ) -> anyhow::Result<()>
    where
        W: Write + Send + 'static,
    {
        let req: serde_json::Value = match serde_json::from_slice(msg) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error=?e, "invalid JSON");
                return Ok(());
            }
        };

        let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let id_opt = req.get("id").cloned();
        let id_reply = id_opt.as_ref().filter(|v| !v.is_null()).cloned();
        let params = req.get("params").cloned().unwrap_or(json!({}));
        tracing::info!(%method, id=?id_opt, "received request");

        let (id, result) = match method {
            "notifications/cancelled" => {
                self.cancel_route(params.get("requestId"));
                return Ok(());
            }
            "tools/call" => {
                let name = params.get("name").and_then(|x| x.as_str()).unwrap_or("");
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
                if name == "route_text" {
                    self.spawn_route(id_reply, arguments, writer, routes)?;
                    return Ok(());
                }
                let result = self
                    .dispatch_tool(name, arguments)
                    .await
                    .map(|v| json!({"content": [{"type":"json","json": v}], "isError": false}))
                    .map_err(tool_error);
                (id_reply, result)
            }
            _ => (id_reply, self.handle_method(method, &params)),
        };

        // Do not respond to notifications (no id)
        let Some(id) = id else {
            return Ok(());
        };
        self.write_reply(writer, id, result)
    }

    fn handle_method(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, (i64, String)> {
        match method {
            "initialize" => {
                let client_proto = params
                    .get("protocolVersion")
                    .and_then(|x| x.as_str())
                    .unwrap_or("2024-11-05");
                Ok(json!({
                    "protocolVersion": client_proto,
                    "capabilities": {
                        "tools": {"list": true, "call": true},
                        "prompts": {"list": true},
                        "resources": {"list": true, "read": true, "subscribe": false}
                    },
                    "serverInfo": server_info()
                }))
            }
            "server/info" => Ok(json!({"serverInfo": server_info()})),
            "tools/list" => Ok(json!({"tools": list_tools_schema()})),
            "prompts/list" => Ok(json!({"prompts": []})),
            "resources/list" => Ok(json!({"resources": [{
                "uri": HISTORY_URI,
                "name": "Request history",
                "description": "Routed requests with their intent and result, oldest first",
                "mimeType": "application/json"
            }]})),
            "resources/read" => {
                let uri = params.get("uri").and_then(|x| x.as_str()).unwrap_or("");
                if uri != HISTORY_URI {
                    return Err((INVALID_PARAMS, "Unknown resource uri".into()));
                }
                let text = serde_json::to_string_pretty(&json!({"items": self.history.recent(None)}))
                    .unwrap_or_else(|_| "{}".into());
                Ok(json!({"contents": [{
                    "uri": uri,
                    "mimeType": "application/json",
                    "text": text
                }]}))
            }
            _ => Err((METHOD_NOT_FOUND, "method not found".into())),
        }
    }

    fn spawn_route<W>(
        &self,
        id: Option<serde_json::Value>,
        arguments: serde_json::Value,
        writer: &Arc<Mutex<W>>,
        routes: &mut JoinSet<()>,
    ) -> anyhow::Result<()>
    where
        W: Write + Send + 'static,
    {
        let params: TextParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => {
                if let Some(id) = id {
                    self.write_reply(writer, id, Err((TOOL_ERROR, format!("{e}"))))?;
                }
                return Ok(());
            }
        };
        // Claim the slot before spawning so arrival order decides which route wins.
        let ticket = self.slot.begin();
        tracing::debug!(id=?id, generation = ticket.generation(), "route started");
        *self.active_route.lock() = id.clone();
        let server = self.clone();
        let writer = writer.clone();
        routes.spawn(async move {
            let result = server
                .route_text(ticket, params)
                .await
                .map(|v| json!({"content": [{"type":"json","json": v}], "isError": false}));
            server.release_route(id.as_ref());
            let Some(id) = id else {
                return;
            };
            if let Err(e) = server.write_reply(&writer, id, result.map_err(tool_error)) {
                tracing::warn!(error=?e, "failed to write route response");
            }
        });
        Ok(())
    }

    fn release_route(&self, id: Option<&serde_json::Value>) {
        let mut active = self.active_route.lock();
        if active.as_ref() == id {
            *active = None;
        }
    }

    fn cancel_route(&self, request_id: Option<&serde_json::Value>) {
        let mut active = self.active_route.lock();
        if request_id.is_none() || active.as_ref() != request_id {
            tracing::debug!(request_id=?request_id, "cancel for a request that is not routing");
            return;
        }
        *active = None;
        let cancelled = self.slot.cancel_active();
        tracing::info!(
            request_id=?request_id,
            cancelled,
            generation = self.slot.current_generation(),
            "route cancelled by client"
        );
    }

    async fn route_text(&self, ticket: Ticket, params: TextParams) -> anyhow::Result<serde_json::Value> {
        let outcome = self
            .slot
            .complete(ticket, self.pipeline.process(&params.text))
            .await?;
        let record = HistoryRecord::new(
            params.text,
            outcome.intent_label.to_string(),
            outcome.result.clone(),
        );
        if let Err(e) = self.history.append(record).await {
            tracing::warn!(error=%e, "failed to persist history");
        }
        Ok(serde_json::to_value(&outcome)?)
    }

    async fn dispatch_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        match name {
            "classify_intent" => {
                let p: TextParams = serde_json::from_value(arguments)?;
                let c = self.pipeline.classify(&p.text).await?;
                Ok(json!({
                    "intent": c.intent,
                    "intent_label": c.intent.label(),
                    "confidence": c.confidence
                }))
            }
            "summarize_text" => {
                let p: TextParams = serde_json::from_value(arguments)?;
                let summary = self.pipeline.summarize(&p.text).await?;
                Ok(json!({"summary": summary}))
            }
            "analyze_sentiment" => {
                let p: TextParams = serde_json::from_value(arguments)?;
                let report = self.pipeline.sentiment(&p.text);
                Ok(json!({
                    "score": report.score,
                    "label": report.label,
                    "report": report.describe()
                }))
            }
            "extract_entities" => {
                let p: TextParams = serde_json::from_value(arguments)?;
                let entities = self.pipeline.entities(&p.text);
                Ok(json!({
                    "people": entities.people,
                    "places": entities.places,
                    "organizations": entities.organizations,
                    "report": entities.describe()
                }))
            }
            "detect_language" => {
                let p: TextParams = serde_json::from_value(arguments)?;
                Ok(json!({"language": self.pipeline.language(&p.text)}))
            }
            "list_history" => {
                let p: ListHistoryParams = serde_json::from_value(arguments)?;
                Ok(json!({"items": self.history.recent(p.limit)}))
            }
            "health_check" => {
                let embedding_ok =
                    health::check_embedding_backend(&self.embedding_backend, &self.ollama_host)
                        .await;
                Ok(json!({
                    "embedding_backend": self.embedding_backend,
                    "embedding_ok": embedding_ok,
                    "history_records": self.history.len(),
                    "server": server_info()
                }))
            }
            _ => anyhow::bail!("unknown tool: {name}"),
        }
    }

    fn write_reply<W: Write>(
        &self,
        writer: &Mutex<W>,
        id: serde_json::Value,
        result: Result<serde_json::Value, (i64, String)>,
    ) -> anyhow::Result<()> {
        let resp = match result {
            Ok(result) => json!({"jsonrpc":"2.0","id": id, "result": result}),
            Err((code, message)) => {
                json!({"jsonrpc":"2.0","id": id, "error": {"code": code, "message": message}})
            }
        };
        let ndjson = self.raw_json_mode.load(Ordering::Relaxed) || force_ndjson();
        write_framed(&mut *writer.lock(), &resp, ndjson)
    }
}

fn tool_error(e: anyhow::Error) -> (i64, String) {
    match e.downcast_ref::<RouteError>() {
        Some(RouteError::Superseded) => (REQUEST_SUPERSEDED, "request superseded".into()),
        _ => (TOOL_ERROR, format!("{e}")),
    }
}

fn server_info() -> serde_json::Value {
    json!({"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")})
}

fn force_ndjson() -> bool {
    std::env::var("MCP_FORCE_NDJSON").ok().as_deref() == Some("1")
}

fn text_schema(description: &str) -> serde_json::Value {
    json!({"type":"object","required":["text"],"properties":{
        "text": {"type":"string","description": description}
    }})
}

fn list_tools_schema() -> Vec<serde_json::Value> {
    vec![
        json!({"name":"route_text","description":"Classify text and run the matching task (summarize, sentiment or extract)","inputSchema": text_schema("Text to route")}),
        json!({"name":"classify_intent","description":"Classify text into an intent with a confidence","inputSchema": text_schema("Text to classify")}),
        json!({"name":"summarize_text","description":"Extractive summary of up to three sentences","inputSchema": text_schema("Text to summarize")}),
        json!({"name":"analyze_sentiment","description":"Sentiment score in [-1, 1] with a label","inputSchema": text_schema("Text to score")}),
        json!({"name":"extract_entities","description":"People, places and organizations mentioned in the text","inputSchema": text_schema("Text to scan")}),
        json!({"name":"detect_language","description":"Dominant language of the text, or Unknown","inputSchema": text_schema("Text to identify")}),
        json!({"name":"list_history","description":"Recently routed requests, newest last","inputSchema": {"type":"object","properties":{
            "limit": {"type":"number"}
        }}}),
        json!({"name":"health_check","description":"Health check for the embedding backend","inputSchema": {"type":"object","properties":{}}}),
    ]
}

fn read_framed_message_buf<R: BufRead>(
    bufreader: &mut R,
    raw_json_mode: &AtomicBool,
) -> anyhow::Result<Vec<u8>> {
    let mut header = String::new();
    let mut content_length: Option<usize> = None;
    let mut header_lines: usize = 0;
    loop {
        header.clear();
        let n = bufreader.read_line(&mut header)?;
        if n == 0 {
            anyhow::bail!("eof");
        }
        let line = header.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            // blank separators between ND-JSON messages
            if header_lines == 0 && content_length.is_none() {
                continue;
            }
            break;
        }
        header_lines += 1;
        tracing::trace!(%line, "framing header line");
        // Fallback for clients that send newline-delimited raw JSON instead of framed headers
        if header_lines == 1 && line.starts_with('{') && line.contains("\"jsonrpc\"") {
            tracing::debug!("detected raw JSON line without Content-Length; accepting as body");
            raw_json_mode.store(true, Ordering::Relaxed);
            return Ok(line.as_bytes().to_vec());
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = Some(value.trim().parse::<usize>()?);
            }
            // ignore other headers (e.g., Content-Type)
        }
    }
    let len = content_length.ok_or_else(|| anyhow::anyhow!("missing Content-Length"))?;
    let mut body = vec![0u8; len];
    bufreader.read_exact(&mut body)?;
    tracing::trace!(header_lines, content_length = len, "framed message parsed");
    Ok(body)
}

fn write_framed<W: Write>(writer: &mut W, v: &serde_json::Value, ndjson: bool) -> anyhow::Result<()> {
    let s = serde_json::to_string(v)?;
    if ndjson {
        writeln!(writer, "{}", s)?;
    } else {
        write!(writer, "Content-Length: {}\r\n\r\n{}", s.len(), s)?;
    }
    writer.flush()?;
    Ok(())
}

// Wire structs for tool params
#[derive(Debug, Deserialize)]
struct TextParams {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ListHistoryParams {
    limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::ScriptedProvider;
    use crate::embedding::{EmbeddingProvider, LexicalEmbeddings};
    use crate::router::RouterConfig;
    use clap::Parser;
    use std::collections::HashMap;
    use std::time::Duration;

    const REVIEW: &str = "This product is absolutely amazing! Best purchase I've ever made.";

    fn server_with(provider: Option<Arc<dyn EmbeddingProvider>>) -> StdioMcpServer {
        let cfg = AppConfig::parse_from(["edgeswarm-router", "--embedding-backend", "lexical"]);
        StdioMcpServer::new(
            Arc::new(Pipeline::with_provider(provider, RouterConfig::default())),
            Arc::new(HistoryStore::in_memory(None)),
            &cfg,
        )
    }

    fn lexical_server() -> StdioMcpServer {
        server_with(Some(Arc::new(LexicalEmbeddings)))
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn framed_input(messages: &[serde_json::Value]) -> std::io::Cursor<Vec<u8>> {
        let mut input = Vec::new();
        for m in messages {
            write_framed(&mut input, m, false).unwrap();
        }
        std::io::Cursor::new(input)
    }

    /// Drive the server over in-memory stdio and collect replies by id.
    async fn exchange(
        server: &StdioMcpServer,
        messages: &[serde_json::Value],
    ) -> HashMap<i64, serde_json::Value> {
        let out = SharedBuf::default();
        server
            .run_with(framed_input(messages), out.clone())
            .await
            .unwrap();
        let bytes = out.0.lock().clone();
        let mut reader = std::io::Cursor::new(bytes);
        let flag = AtomicBool::new(false);
        let mut replies = HashMap::new();
        while let Ok(body) = read_framed_message_buf(&mut reader, &flag) {
            let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
            replies.insert(v["id"].as_i64().unwrap(), v);
        }
        replies
    }

    fn call(id: i64, name: &str, arguments: serde_json::Value) -> serde_json::Value {
        json!({"jsonrpc":"2.0","id":id,"method":"tools/call","params":{"name":name,"arguments":arguments}})
    }

    #[test]
    fn framed_write_and_read_roundtrip() {
        let v = json!({"jsonrpc":"2.0","id":1,"result":{"ok":true}});
        let mut out = Vec::new();
        write_framed(&mut out, &v, false).expect("write");
        let mut bufreader = std::io::BufReader::new(std::io::Cursor::new(out));
        let flag = AtomicBool::new(false);
        let body = read_framed_message_buf(&mut bufreader, &flag).expect("read");
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, v);
        assert!(!flag.load(Ordering::Relaxed));
    }

    #[test]
    fn raw_json_lines_switch_to_ndjson() {
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n\n{\"jsonrpc\":\"2.0\",\"id\":2}\n";
        let mut reader = std::io::Cursor::new(input.as_bytes().to_vec());
        let flag = AtomicBool::new(false);
        let first = read_framed_message_buf(&mut reader, &flag).unwrap();
        assert!(flag.load(Ordering::Relaxed));
        assert!(std::str::from_utf8(&first).unwrap().contains("tools/list"));
        let second = read_framed_message_buf(&mut reader, &flag).unwrap();
        assert_eq!(second, b"{\"jsonrpc\":\"2.0\",\"id\":2}");
    }

    #[tokio::test]
    async fn dispatch_text_tools() {
        let server = lexical_server();
        let c = server
            .dispatch_tool("classify_intent", json!({"text": REVIEW}))
            .await
            .unwrap();
        assert_eq!(c["intent"], "sentiment");
        assert_eq!(c["intent_label"], "Sentiment Analysis");

        let s = server
            .dispatch_tool("analyze_sentiment", json!({"text": REVIEW}))
            .await
            .unwrap();
        assert_eq!(s["label"], "🤩 Very Positive");
        assert!(s["report"].as_str().unwrap().contains("(Score: "));

        let e = server
            .dispatch_tool(
                "extract_entities",
                json!({"text": "John Smith, age 45, lives in New York. He works as a software engineer at TechCorp since 2015."}),
            )
            .await
            .unwrap();
        assert_eq!(e["people"], json!(["John Smith"]));
        assert_eq!(e["places"], json!(["New York"]));
        assert_eq!(e["organizations"], json!(["TechCorp"]));

        let summary = server
            .dispatch_tool("summarize_text", json!({"text": "Short note."}))
            .await
            .unwrap();
        assert_eq!(summary["summary"], "Short note.");

        let lang = server
            .dispatch_tool("detect_language", json!({"text": "Le chat est dans la maison."}))
            .await
            .unwrap();
        assert_eq!(lang["language"], "French");
        let lang = server
            .dispatch_tool("detect_language", json!({"text": "42 !!"}))
            .await
            .unwrap();
        assert_eq!(lang["language"], "Unknown");
    }

    #[tokio::test]
    async fn route_text_records_history() {
        let server = lexical_server();
        let out = server
            .route_text(server.slot.begin(), TextParams { text: REVIEW.into() })
            .await
            .unwrap();
        assert_eq!(out["intent"], "sentiment");
        server
            .route_text(server.slot.begin(), TextParams { text: "asdf qwer zxcv".into() })
            .await
            .unwrap();

        let all = server.dispatch_tool("list_history", json!({})).await.unwrap();
        let items = all["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["text"], REVIEW);
        assert_eq!(items[0]["intent"], "Sentiment Analysis");
        assert_eq!(items[1]["intent"], "Unknown");

        let last = server
            .dispatch_tool("list_history", json!({"limit": 1}))
            .await
            .unwrap();
        assert_eq!(last["items"][0]["text"], "asdf qwer zxcv");
    }

    #[tokio::test]
    async fn dispatch_errors() {
        let server = lexical_server();
        let err = server
            .dispatch_tool("classify_intent", json!({"text": ""}))
            .await
            .unwrap_err();
        assert_eq!(tool_error(err), (TOOL_ERROR, "input text is empty".into()));
        assert!(server.dispatch_tool("classify_intent", json!({})).await.is_err());
        assert!(server.dispatch_tool("nope", json!({})).await.is_err());
        // routing only happens through the slot-aware path in handle_message
        assert!(server.dispatch_tool("route_text", json!({"text": REVIEW})).await.is_err());
        assert_eq!(server.history.len(), 0);
    }

    #[tokio::test]
    async fn health_check_reports_backend() {
        let h = lexical_server()
            .dispatch_tool("health_check", json!({}))
            .await
            .unwrap();
        assert_eq!(h["embedding_backend"], "lexical");
        assert_eq!(h["embedding_ok"], true);
        assert_eq!(h["server"]["name"], SERVER_NAME);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_loop_answers_methods() {
        let server = lexical_server();
        let replies = exchange(
            &server,
            &[
                json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}),
                json!({"jsonrpc":"2.0","method":"notifications/initialized"}),
                json!({"jsonrpc":"2.0","id":2,"method":"tools/list"}),
                json!({"jsonrpc":"2.0","id":3,"method":"bogus/method"}),
                call(4, "route_text", json!({"text": REVIEW})),
                json!({"jsonrpc":"2.0","id":5,"method":"resources/list"}),
                json!({"jsonrpc":"2.0","id":6,"method":"resources/read","params":{"uri":"mcp://elsewhere"}}),
            ],
        )
        .await;

        assert_eq!(replies.len(), 6);
        assert_eq!(replies[&1]["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(replies[&2]["result"]["tools"].as_array().unwrap().len(), 8);
        assert_eq!(replies[&3]["error"]["code"], METHOD_NOT_FOUND);
        let routed = &replies[&4]["result"]["content"][0]["json"];
        assert_eq!(routed["intent"], "sentiment");
        assert_eq!(replies[&5]["result"]["resources"][0]["uri"], HISTORY_URI);
        assert_eq!(replies[&6]["error"]["code"], INVALID_PARAMS);

        let history = server.handle_method("resources/read", &json!({"uri": HISTORY_URI})).unwrap();
        let text = history["contents"][0]["text"].as_str().unwrap();
        assert!(text.contains("Sentiment Analysis"));
    }

    fn slow_server() -> StdioMcpServer {
        let slow: Arc<dyn EmbeddingProvider> = Arc::new(
            ScriptedProvider::new(|_, _| Ok(0.4)).with_delay(Duration::from_millis(100)),
        );
        server_with(Some(slow))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn newer_route_supersedes_older() {
        let server = slow_server();
        let replies = exchange(
            &server,
            &[
                call(1, "route_text", json!({"text": "first"})),
                call(2, "route_text", json!({"text": "second"})),
            ],
        )
        .await;
        assert_eq!(replies[&1]["error"]["code"], REQUEST_SUPERSEDED);
        assert_eq!(replies[&1]["error"]["message"], "request superseded");
        let second = &replies[&2]["result"]["content"][0]["json"];
        assert_eq!(second["intent"], "summarize");
        assert_eq!(server.history.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_notification_abandons_route() {
        let server = slow_server();
        let replies = exchange(
            &server,
            &[
                call(7, "route_text", json!({"text": "soon cancelled"})),
                json!({"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId": 7}}),
            ],
        )
        .await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[&7]["error"]["code"], REQUEST_SUPERSEDED);
        assert_eq!(server.history.len(), 0);
    }
}
