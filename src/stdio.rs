//! Newline-delimited JSON-RPC over a byte stream
//!
//! [`serve`] works on any buffered reader and writer, so the same loop backs
//! stdin/stdout and in-memory streams in tests.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, trace, warn};

use crate::config::BannerMode;
use crate::mcp::{
    rpc::{json_rpc_error, parse_line, JsonRpcResponse, PARSE_ERROR},
    server::{handle_json_rpc_request, Method},
};
use crate::AppState;

pub const BANNER_NOTICE: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " ready (methods: initialize, capability.list, tool.call, prompts.list, prompts.build, resources.list, resources.read, shutdown)"
);

/// Serves requests line by line until EOF, a `shutdown` request, or an I/O
/// error on the stream. Each line is answered before the next is read.
pub async fn serve<R, W>(state: &AppState, mut reader: R, writer: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            info!("input closed, stopping");
            break;
        }

        let Ok(line) = std::str::from_utf8(&buffer) else {
            warn!("received a line that is not valid UTF-8");
            let response = json_rpc_error(serde_json::Value::Null, PARSE_ERROR, "Parse error");
            write_response(writer, &response).await?;
            continue;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        trace!(line, "received");

        let request = match parse_line(line) {
            Ok(request) => request,
            Err(error_response) => {
                warn!(
                    code = error_response.error.as_ref().map(|error| error.code),
                    "rejected malformed request line"
                );
                write_response(writer, &error_response).await?;
                continue;
            }
        };

        let mut shutdown = Method::resolve(&request.method) == Some(Method::Shutdown);
        if let Some(response) = handle_json_rpc_request(state, request).await {
            shutdown &= !response.is_error();
            write_response(writer, &response).await?;
        }

        if shutdown {
            info!("shutdown requested, stopping");
            break;
        }
    }

    Ok(())
}

pub async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = response.to_line();
    trace!(line = %line, "sending");
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

pub fn banner_line() -> String {
    serde_json::json!({ "notice": BANNER_NOTICE }).to_string()
}

pub async fn run_stdio(state: AppState, banner: BannerMode) -> std::io::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    match banner {
        BannerMode::Stdout => {
            stdout.write_all(banner_line().as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        BannerMode::Stderr => {
            let mut stderr = tokio::io::stderr();
            stderr.write_all(banner_line().as_bytes()).await?;
            stderr.write_all(b"\n").await?;
            stderr.flush().await?;
        }
        BannerMode::Off => {}
    }

    info!(resources_dir = %state.resources.root().display(), "serving on stdio");
    serve(&state, stdin, &mut stdout).await
}
