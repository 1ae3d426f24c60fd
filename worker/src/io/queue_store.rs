//! Queue document storage.
//!
//! The queue file is the worker's only database: loaded whole at the start
//! of each cycle and rewritten whole after every status change. Loads are
//! validated against the bundled JSON schema plus semantic invariants so a
//! corrupt or hand-mangled queue fails fast instead of half-processing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value;
use tracing::debug;

use crate::queue::{QueueDocument, validate_invariants};

const V1_SCHEMA: &str = include_str!("../../schemas/queue/v1.schema.json");

/// Load the queue document from disk.
///
/// A missing file is legitimate empty state and returns an empty document.
/// Anything unreadable, schema-invalid, or invariant-violating is a fatal
/// "corrupt queue" error.
pub fn load_queue(path: &Path) -> Result<QueueDocument> {
    if !path.exists() {
        debug!(path = %path.display(), "queue file missing, starting empty");
        return Ok(QueueDocument::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read queue {}", path.display()))?;
    let doc = parse_queue(&contents).with_context(|| format!("corrupt queue {}", path.display()))?;
    debug!(tasks = doc.tasks.len(), "queue loaded");
    Ok(doc)
}

/// Atomically write the queue document to disk (temp file + rename).
pub fn save_queue(path: &Path, doc: &QueueDocument) -> Result<()> {
    debug!(path = %path.display(), tasks = doc.tasks.len(), "writing queue");
    let mut buf = serde_json::to_string_pretty(doc).context("serialize queue")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Parse and validate queue content: schema conformance + semantic invariants.
fn parse_queue(contents: &str) -> Result<QueueDocument> {
    let instance: Value = serde_json::from_str(contents).context("parse queue json")?;
    validate_schema(&instance)?;
    let doc: QueueDocument = serde_json::from_str(contents).context("parse queue as v1 struct")?;
    let errors = validate_invariants(&doc);
    if !errors.is_empty() {
        bail!("invariant violations:\n- {}", errors.join("\n- "));
    }
    Ok(doc)
}

/// Validate the JSON instance against the bundled schema (Draft 2020-12).
fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(V1_SCHEMA).context("parse bundled queue schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile queue schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("queue path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp queue {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace queue {}", path.display()))?;
    Ok(())
}
