//! Line-delimited JSON-RPC 2.0 over stdio.
//!
//! One request per line in, one response per line out. Requests without an
//! `id` are notifications: they are applied but never answered, which is
//! how editors usually send `didOpen`/`didChange`/`didClose`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::Engine;
use crate::host::{FsHost, Host};
use crate::types::{Document, Position};

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SCRIPTMARK_BUILD_COMMIT"),
    ")"
);

/// Serve on stdin/stdout until EOF or `shutdown`.
pub fn run(engine: &Engine<FsHost>) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(engine, stdin.lock(), &mut stdout.lock())
}

/// Serve requests read from `input`, writing responses to `output`.
pub fn serve(
    engine: &Engine<FsHost>,
    input: impl BufRead,
    output: &mut impl Write,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let req: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                write_error(output, None, PARSE_ERROR, &format!("parse error: {e}"))?;
                continue;
            }
        };

        tracing::debug!(method = %req.method, "request");
        let outcome = handle_request(&req, engine);

        if let Some(id) = req.id.clone() {
            let response = match outcome {
                Ok(result) => JsonRpcResponse {
                    jsonrpc: "2.0",
                    id: Some(id),
                    result: Some(result),
                    error: None,
                },
                Err(error) => JsonRpcResponse {
                    jsonrpc: "2.0",
                    id: Some(id),
                    result: None,
                    error: Some(error),
                },
            };
            write_response(output, &response)?;
        } else if let Err(error) = outcome {
            tracing::warn!(method = %req.method, error = %error.message, "notification failed");
        }

        if req.method == "shutdown" {
            break;
        }
    }

    Ok(())
}

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
struct PositionParams {
    path: PathBuf,
    line: u32,
    #[serde(alias = "column")]
    character: u32,
}

#[derive(Deserialize)]
struct OpenParams {
    path: PathBuf,
    text: String,
}

#[derive(Deserialize)]
struct PathParams {
    path: PathBuf,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct InvalidateParams {
    path: Option<PathBuf>,
}

fn handle_request(req: &JsonRpcRequest, engine: &Engine<FsHost>) -> Result<Value, JsonRpcError> {
    match req.method.as_str() {
        "initialize" => Ok(serde_json::json!({
            "capabilities": {
                "definitionProvider": true,
                "completionProvider": { "triggerCharacters": ["."] },
                "referencesProvider": true,
            },
            "serverInfo": {
                "name": "scriptmark",
                "version": VERSION,
            },
        })),

        "textDocument/didOpen" | "textDocument/didChange" => {
            let p: OpenParams = params(&req.params)?;
            let path = absolute(engine, &p.path);
            if req.method == "textDocument/didOpen" {
                engine.host().open(&path, p.text);
            } else {
                engine.host().update(&path, p.text);
            }
            Ok(Value::Null)
        }

        "textDocument/didClose" => {
            let p: PathParams = params(&req.params)?;
            let path = absolute(engine, &p.path);
            engine.host().close(&path);
            // The on-disk text may differ from the closed buffer.
            engine.invalidate(Some(&path));
            Ok(Value::Null)
        }

        "textDocument/definition" => {
            let (document, position) = query(engine, &req.params)?;
            to_value(&engine.provide_definition(&document, position))
        }

        "textDocument/completion" => {
            let (document, position) = query(engine, &req.params)?;
            to_value(&engine.provide_completion_items(&document, position))
        }

        "textDocument/references" => {
            let (document, position) = query(engine, &req.params)?;
            to_value(&engine.provide_references(&document, position))
        }

        "scriptmark/invalidate" => {
            let p: InvalidateParams = if req.params.is_null() {
                InvalidateParams::default()
            } else {
                params(&req.params)?
            };
            let path = p.path.map(|p| absolute(engine, &p));
            let evicted = engine.invalidate(path.as_deref());
            Ok(serde_json::json!({ "evicted": evicted }))
        }

        "ping" | "shutdown" => Ok(serde_json::json!({})),

        _ => Err(JsonRpcError {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {}", req.method),
        }),
    }
}

fn params<T: DeserializeOwned>(raw: &Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(raw.clone())
        .map_err(|e| JsonRpcError::invalid_params(format!("invalid params: {e}")))
}

fn to_value<T: Serialize>(result: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: INTERNAL_ERROR,
        message: e.to_string(),
    })
}

/// Relative paths are taken against the first workspace folder.
fn absolute(engine: &Engine<FsHost>, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match engine.host().workspace_folders().first() {
        Some(root) => root.join(path),
        None => path.to_path_buf(),
    }
}

fn query(
    engine: &Engine<FsHost>,
    raw: &Value,
) -> Result<(Document, Position), JsonRpcError> {
    let p: PositionParams = params(raw)?;
    let path = absolute(engine, &p.path);
    let document = engine
        .document(&path)
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
    Ok((document, Position::new(p.line, p.character)))
}

fn write_response(w: &mut impl Write, resp: &JsonRpcResponse) -> io::Result<()> {
    serde_json::to_writer(&mut *w, resp)?;
    w.write_all(b"\n")?;
    w.flush()
}

fn write_error(w: &mut impl Write, id: Option<Value>, code: i32, msg: &str) -> io::Result<()> {
    let resp = JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: msg.into(),
        }),
    };
    write_response(w, &resp)
}
