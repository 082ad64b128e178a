//! Line-delimited JSON-RPC server loop.
//!
//! Each request is handled on its own task; responses go through a single
//! writer task, so they may be written in a different order than the
//! requests arrived. On EOF the loop stops reading, waits for in-flight
//! requests, flushes their responses and returns.

use std::sync::Arc;

use {
    serde_json::{Value, json},
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
        sync::mpsc,
        task::JoinSet,
    },
    tracing::{debug, info, trace, warn},
};

use crate::{
    error::{Context, Result},
    traits::ToolHandler,
    types::{
        INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InitializeParams, InitializeResult, JsonRpcRequest,
        JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, ServerCapabilities,
        ServerInfo, ToolsCallParams, ToolsCapability, ToolsListResult,
    },
};

/// MCP server answering `initialize`, `ping`, `tools/list` and `tools/call`.
#[derive(Clone)]
pub struct McpServer {
    handler: Arc<dyn ToolHandler>,
    init: Arc<InitializeResult>,
}

impl McpServer {
    pub fn new(handler: Arc<dyn ToolHandler>, server_info: ServerInfo) -> Self {
        Self {
            handler,
            init: Arc::new(InitializeResult {
                protocol_version: PROTOCOL_VERSION.into(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability::default()),
                },
                server_info,
                instructions: None,
            }),
        }
    }

    /// Usage hints returned to the client during the handshake.
    #[must_use]
    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        Arc::make_mut(&mut self.init).instructions = instructions;
        self
    }

    /// Serve on the process's stdin/stdout.
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(
            server = %self.init.server_info.name,
            version = %self.init.server_info.version,
            "MCP server listening"
        );

        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut in_flight = JoinSet::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        let read_result = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => {},
                Err(e) => break Err(e),
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(error = %e, "input line is not valid UTF-8");
                    let _ = tx.send(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ));
                    continue;
                },
            };
            if line.is_empty() {
                continue;
            }
            trace!(raw = %line, "client -> server");

            let request = match decode_request(line) {
                Ok(request) => request,
                Err(response) => {
                    let _ = tx.send(response);
                    continue;
                },
            };

            let server = self.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.dispatch(request).await {
                    let _ = tx.send(response);
                }
            });

            // reap finished tasks so the set does not grow unbounded
            while let Some(joined) = in_flight.try_join_next() {
                log_join(joined);
            }
        };

        if let Err(e) = &read_result {
            warn!(error = %e, "failed to read input, shutting down");
        }
        debug!(pending = in_flight.len(), "input closed, draining requests");
        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }
        drop(tx);

        writer_task.await.context("response writer task failed")??;
        read_result?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one request. Notifications produce no response.
    async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            match request.method.as_str() {
                "notifications/initialized" => debug!("client initialized"),
                other => trace!(method = %other, "ignoring notification"),
            }
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => {
                let params: InitializeParams = request
                    .params
                    .and_then(|p| serde_json::from_value(p).ok())
                    .unwrap_or_default();
                info!(
                    client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
                    protocol = params.protocol_version.as_deref().unwrap_or("unspecified"),
                    "client connected"
                );
                respond(id, &*self.init)
            },
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => respond(id, &ToolsListResult {
                tools: self.handler.tools(),
            }),
            "tools/call" => {
                let params = request
                    .params
                    .map(serde_json::from_value::<ToolsCallParams>);
                match params {
                    Some(Ok(params)) => {
                        debug!(tool = %params.name, "tool call");
                        let result = self.handler.call_tool(&params.name, params.arguments).await;
                        respond(id, &result)
                    },
                    Some(Err(e)) => JsonRpcResponse::failure(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {e}"),
                    ),
                    None => JsonRpcResponse::failure(id, INVALID_PARAMS, "Invalid params: missing"),
                }
            },
            other => {
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
            },
        };
        Some(response)
    }
}

/// Parse one input line, or build the error response for it.
fn decode_request(line: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "unparseable input line");
        JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "input is not a JSON-RPC request");
        JsonRpcResponse::failure(id, INVALID_REQUEST, format!("Invalid Request: {e}"))
    })
}

/// Success response carrying `result`, or an internal error if it does not
/// serialize.
fn respond<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            warn!(error = %e, "failed to serialize result");
            JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {e}"))
        },
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "request task failed");
    }
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        trace!(raw = %payload.trim_end(), "server -> client");
        writer.write_all(payload.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.shutdown().await?;
    Ok(())
}
