//! Tool implementations over the context store.
//!
//! Every tool returns a flat JSON payload with `success`, its
//! operation-specific fields, and an `error` string that is empty exactly
//! when `success` is true. Core failures never escape as faults; they are
//! folded into the payload so the calling agent always gets a structured
//! answer.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use actx_core::{
    ConfigOverlay, ConfigResolver, ContextError, ContextStore, Result, TokenMeter, VersionId,
};

/// Branch-scoped tool context: one per server process.
pub struct ToolContext {
    store: ContextStore,
    root: PathBuf,
    branch: String,
    runtime: ConfigOverlay,
}

#[derive(Deserialize)]
struct UpdateArgs {
    new_context: String,
    commit_message: String,
}

#[derive(Deserialize)]
struct AppendArgs {
    text: String,
    commit_message: String,
}

fn default_history_limit() -> usize {
    10
}

#[derive(Deserialize)]
struct HistoryArgs {
    #[serde(default = "default_history_limit")]
    limit: usize,
    #[serde(default)]
    starting_after: Option<String>,
}

#[derive(Deserialize)]
struct SnapshotArgs {
    version_id: String,
}

fn default_search_limit() -> usize {
    100
}

#[derive(Deserialize)]
struct SearchArgs {
    keywords: Vec<String>,
    #[serde(default = "default_search_limit")]
    limit: usize,
}

impl ToolContext {
    pub fn new(store: ContextStore, branch: String, runtime: ConfigOverlay) -> Self {
        let root = store.root().to_path_buf();
        Self {
            store,
            root,
            branch,
            runtime,
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Dispatch a tool call by name. Unknown names are the only error that
    /// surfaces to the transport layer; everything else lands in the
    /// payload's `success`/`error` fields.
    pub fn call(&self, name: &str, arguments: Value) -> std::result::Result<Value, String> {
        info!(tool = name, branch = %self.branch, "tool called");
        let outcome = match name {
            "read_context" => self.read_context(),
            "update_context" => parse(arguments).and_then(|args| self.update_context(args)),
            "append_to_context" => parse(arguments).and_then(|args| self.append_to_context(args)),
            "get_context_history" => parse(arguments).and_then(|args| self.history(args)),
            "get_snapshot" => parse(arguments).and_then(|args| self.snapshot(args)),
            "search_history" => parse(arguments).and_then(|args| self.search(args)),
            other => return Err(format!("unknown tool: {other}")),
        };
        Ok(outcome.unwrap_or_else(|err| failure(&err)))
    }

    fn meter(&self) -> Result<(TokenMeter, u64)> {
        let config = ConfigResolver::new(&self.root).effective(&self.branch, &self.runtime)?;
        Ok((TokenMeter::new(config.token_approach), config.token_limit))
    }

    fn read_context(&self) -> Result<Value> {
        let content = self.store.read_current(&self.branch)?;
        let (meter, limit) = self.meter()?;
        let metrics = meter.metrics(&content, limit);
        Ok(json!({
            "success": true,
            "content": content,
            "token_count": metrics.token_count,
            "token_limit": metrics.token_limit,
            "token_pressure": metrics.token_pressure,
            "error": "",
        }))
    }

    fn update_context(&self, args: UpdateArgs) -> Result<Value> {
        let (meter, limit) = self.meter()?;
        let old_count = meter.count(&self.store.read_current(&self.branch)?);

        let id = self
            .store
            .replace(&self.branch, &args.new_context, &args.commit_message)?;

        let new_count = meter.count(&args.new_context);
        Ok(json!({
            "success": true,
            "version_id": id.to_hex(),
            "new_token_count": new_count,
            "token_delta": new_count as i64 - old_count as i64,
            "token_pressure": meter.pressure(new_count, limit),
            "error": "",
        }))
    }

    fn append_to_context(&self, args: AppendArgs) -> Result<Value> {
        let (meter, limit) = self.meter()?;
        let old_count = meter.count(&self.store.read_current(&self.branch)?);

        let id = self
            .store
            .append(&self.branch, &args.text, &args.commit_message)?;

        let new_count = meter.count(&self.store.read_current(&self.branch)?);
        Ok(json!({
            "success": true,
            "version_id": id.to_hex(),
            "new_token_count": new_count,
            "token_delta": new_count as i64 - old_count as i64,
            "token_pressure": meter.pressure(new_count, limit),
            "error": "",
        }))
    }

    fn history(&self, args: HistoryArgs) -> Result<Value> {
        if args.limit == 0 {
            return Err(ContextError::InvalidConfigValue(
                "limit must be positive".to_string(),
            ));
        }
        let after = args
            .starting_after
            .as_deref()
            .map(str::parse::<VersionId>)
            .transpose()?;

        let page = self.store.history(&self.branch, args.limit, after.as_ref())?;
        Ok(json!({
            "success": true,
            "versions": page.versions,
            "total_versions": page.total_versions,
            "has_more": page.has_more,
            "error": "",
        }))
    }

    fn snapshot(&self, args: SnapshotArgs) -> Result<Value> {
        let snapshot = self.store.snapshot(&args.version_id)?;
        Ok(json!({
            "success": true,
            "content": snapshot.content,
            "commit_message": snapshot.message,
            "timestamp": snapshot.timestamp.to_rfc3339(),
            "error": "",
        }))
    }

    fn search(&self, args: SearchArgs) -> Result<Value> {
        let matches = self.store.search(&self.branch, &args.keywords, args.limit)?;
        let total_matches = matches.len();
        Ok(json!({
            "success": true,
            "versions": matches,
            "total_matches": total_matches,
            "error": "",
        }))
    }
}

fn parse<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| {
        ContextError::InvalidConfigValue(format!("invalid tool arguments: {e}"))
    })
}

fn failure(err: &ContextError) -> Value {
    json!({ "success": false, "error": err.to_string() })
}

/// Tool descriptors for `tools/list`.
pub fn descriptors() -> Value {
    json!([
        {
            "name": "read_context",
            "description": "Read the current context content and token usage metrics.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "name": "update_context",
            "description": "Replace the context with new content and record the change. \
Use when compressing context or rewriting it wholesale.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "new_context": { "type": "string", "description": "The new context content" },
                    "commit_message": { "type": "string", "description": "Why this update was made" }
                },
                "required": ["new_context", "commit_message"]
            }
        },
        {
            "name": "append_to_context",
            "description": "Append text to the end of the context and record the change. \
Efficient for building up context incrementally.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to append" },
                    "commit_message": { "type": "string", "description": "Why this append was made" }
                },
                "required": ["text", "commit_message"]
            }
        },
        {
            "name": "get_context_history",
            "description": "Retrieve paginated version history, most recent first. \
Chain calls with starting_after to page backwards.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Versions per page (default 10)" },
                    "starting_after": { "type": "string", "description": "Resume after this version id" }
                },
                "required": []
            }
        },
        {
            "name": "get_snapshot",
            "description": "Retrieve the context content from a specific historical version \
without modifying the current context.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "version_id": { "type": "string", "description": "Version id from get_context_history" }
                },
                "required": ["version_id"]
            }
        },
        {
            "name": "search_history",
            "description": "Search version history for keywords in messages or content \
(case-insensitive, any keyword matches).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "keywords": { "type": "array", "items": { "type": "string" } },
                    "limit": { "type": "integer", "description": "Maximum matches to collect (default 100)" }
                },
                "required": ["keywords"]
            }
        }
    ])
}
