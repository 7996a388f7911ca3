//! JSON-lines server over stdin/stdout
//!
//! 요청 한 줄: `{"id": ..., "tool": "run_tool", "arguments": {...}}`
//! 응답 한 줄: `{"id": ..., "result": {...}}` 또는 `{"id": ..., "error": "..."}`
//!
//! 요청은 동시에 처리되므로 응답 순서는 요청 순서와 다를 수 있습니다 (`id`로 매칭).
//! 입력이 끝나면(EOF) 남은 응답을 모두 쓴 뒤 엔진을 정지합니다.

use crate::dispatch::ToolServer;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ToolRequest {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// Serve on the process's stdin/stdout
pub async fn serve_stdio(server: ToolServer) -> io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(server, stdin, tokio::io::stdout()).await
}

/// Serve JSON-lines requests from `reader`, writing responses to `writer`
pub async fn serve<R, W>(server: ToolServer, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    server.engine().start().map_err(io::Error::other)?;
    info!("Serving {} tools over JSON lines", server.tool_definitions().len());

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_lines(writer, rx));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let server = server.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = handle_line(&server, &line).await;
            if tx.send(response.to_string()).is_err() {
                warn!("Response dropped, writer already closed");
            }
        });
    }

    debug!("Input closed, draining responses");
    drop(tx);
    let written = writer_task.await.map_err(io::Error::other)?;

    server.engine().stop();
    info!("Server stopped");
    written
}

/// Handle one request line
pub async fn handle_line(server: &ToolServer, line: &str) -> Value {
    let request: ToolRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed request: {}", e);
            return json!({ "id": Value::Null, "error": format!("Parse error: {}", e) });
        }
    };

    match server.call_tool(&request.tool, request.arguments).await {
        Ok(result) => json!({ "id": request.id, "result": result }),
        Err(e) => json!({ "id": request.id, "error": e.to_string() }),
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}
