//! actxd - tool server exposing the actx context store to agents
//!
//! A stdio JSON-RPC 2.0 server, one branch per process. Requests arrive
//! newline-delimited on stdin (`initialize`, `tools/list`, `tools/call`),
//! responses leave on stdout, and logging goes to stderr so the transport
//! stays clean. Tool failures are folded into the result payload
//! (`success: false` plus a non-empty `error`); only protocol-level
//! problems become JSON-RPC errors.

mod tools;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, Level};

use actx_core::{BranchManager, ConfigOverlay, ContextStore};
use tools::ToolContext;

// Widely deployed MCP protocol baseline; strict clients expect the server
// to echo a version they know.
const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Parser)]
#[command(name = "actxd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tool server exposing the actx context store to agents", long_about = None)]
struct Args {
    /// Branch to operate on
    #[arg(long)]
    branch: String,

    /// Repository root (default: ~/.actx)
    #[arg(long, env = "ACTX_ROOT")]
    root: Option<PathBuf>,

    /// Override config values for this process (KEY=VALUE, repeatable)
    #[arg(long = "config-override", value_name = "KEY=VALUE")]
    config_override: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    actx_core::init_tracing(args.json, level);

    let root = resolve_root(args.root)?;
    let store = ContextStore::open(&root)
        .with_context(|| format!("failed to open repository at {}", root.display()))?;
    if !BranchManager::new(&store).list()?.contains(&args.branch) {
        bail!(
            "branch not found: {} (create it with 'actx branch create')",
            args.branch
        );
    }
    let runtime =
        ConfigOverlay::from_pairs(&args.config_override).context("invalid --config-override")?;

    let ctx = ToolContext::new(store, args.branch, runtime);
    info!(branch = ctx.branch(), root = %root.display(), "actxd serving on stdio");

    serve(&ctx).await
}

fn resolve_root(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = flag {
        return Ok(root);
    }
    let home = std::env::var_os("HOME")
        .context("cannot locate repository: set --root, ACTX_ROOT, or HOME")?;
    Ok(PathBuf::from(home).join(".actx"))
}

async fn serve(ctx: &ToolContext) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_request(ctx, &line) {
            stdout.write_all(response.to_string().as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

/// Handle one raw request line. Notifications (no `id`) take no response.
fn handle_request(ctx: &ToolContext, raw: &str) -> Option<Value> {
    let request: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            return Some(error_response(
                Value::Null,
                -32700,
                &format!("parse error: {e}"),
            ))
        }
    };
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let id = match request.get("id") {
        Some(id) => id.clone(),
        None => return None,
    };

    let result = match method {
        "initialize" => json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "actxd", "version": env!("CARGO_PKG_VERSION") },
        }),
        "ping" => json!({}),
        "tools/list" => json!({ "tools": tools::descriptors() }),
        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));
            match ctx.call(name, arguments) {
                Ok(payload) => {
                    let is_error = !payload["success"].as_bool().unwrap_or(false);
                    json!({
                        "content": [{ "type": "text", "text": payload.to_string() }],
                        "isError": is_error,
                    })
                }
                Err(message) => return Some(error_response(id, -32602, &message)),
            }
        }
        other => {
            return Some(error_response(
                id,
                -32601,
                &format!("method not found: {other}"),
            ))
        }
    };

    Some(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}
