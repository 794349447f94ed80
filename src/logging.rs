//! Structured JSON-lines logging.
//!
//! Every record carries a run id, a monotonically increasing sequence
//! number, a level and a domain. Records land in `LOG_DIR/<run_id>/`:
//! trace/debug in `trace.jsonl`, everything else in `events.jsonl`.
//! Warnings and above are echoed to stderr so the terminal views stay clean.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Http,      // One-shot fetches
    Stream,    // Server-push subscriptions
    Panel,     // Detail panel state machine
    Dashboard, // Overview loading and refresh
    System,    // Startup, shutdown
    Profile,   // Timing
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Http => "http",
            Domain::Stream => "stream",
            Domain::Panel => "panel",
            Domain::Dashboard => "dashboard",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    dir: PathBuf,
    events: Option<Mutex<LineWriter<File>>>,
    trace: Option<Mutex<LineWriter<File>>>,
}

impl RunContext {
    /// Opens `<base>/<run_id>/` and its sinks. A sink that cannot be created
    /// is skipped; logging never takes the process down.
    pub fn create(base: &Path, run_id: &str) -> Self {
        let dir = base.join(run_id);
        if let Err(err) = create_dir_all(&dir) {
            eprintln!("[log] failed to create run dir {}: {}", dir.display(), err);
        }
        let _ = std::fs::write(
            dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": dir.to_string_lossy(),
            })
            .to_string(),
        );
        Self {
            run_id: run_id.to_string(),
            events: open_sink(&dir.join("events.jsonl")),
            trace: open_sink(&dir.join("trace.jsonl")),
            dir,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Builds the JSON line for one record and writes it to the matching sink.
    pub fn record(&self, level: Level, component: &str, event: &str, fields: Map<String, Value>) -> String {
        let fields = sanitize_fields(fields);
        let (mut top, data) = split_fields(fields);

        let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
        let mut entry = Map::new();
        entry.insert("ts".to_string(), json!(ts_now()));
        entry.insert("run_id".to_string(), json!(self.run_id));
        entry.insert("seq".to_string(), json!(next_seq()));
        entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
        entry.insert("component".to_string(), json!(component));
        entry.insert("event".to_string(), json!(event));
        entry.insert("msg".to_string(), msg);
        for (k, v) in top {
            entry.insert(k, v);
        }
        entry.insert("data".to_string(), Value::Object(data));

        let line = Value::Object(entry).to_string();
        let sink = match level {
            Level::Trace | Level::Debug => &self.trace,
            _ => &self.events,
        };
        if let Some(writer) = sink {
            write_line(writer, &line);
        }
        line
    }
}

fn open_sink(path: &Path) -> Option<Mutex<LineWriter<File>>> {
    match File::create(path) {
        Ok(f) => Some(Mutex::new(LineWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        RunContext::create(Path::new(&base), &run_id)
    })
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "cookie", "Cookie", "api_key"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["entity_id", "endpoint", "generation", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Mutex<LineWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = ensure_run_context().record(level, domain.as_str(), event, fields);
    if level >= Level::Warn {
        eprintln!("{}", line);
    }
}

// =============================================================================
// Domain helpers
// =============================================================================

pub fn log_fetch_failed(endpoint: &str, entity_id: Option<&str>, error: &str) {
    log(
        Level::Warn,
        Domain::Http,
        "fetch_failed",
        obj(&[
            ("endpoint", v_str(endpoint)),
            ("entity_id", entity_id.map(v_str).unwrap_or(Value::Null)),
            ("error", v_str(error)),
        ]),
    );
}

pub fn log_stream_event(event: &str, entity_id: &str, detail: &str) {
    let level = match event {
        "stream_failed" | "stream_message_dropped" => Level::Warn,
        "stream_event_ignored" => Level::Debug,
        _ => Level::Info,
    };
    log(
        level,
        Domain::Stream,
        event,
        obj(&[("entity_id", v_str(entity_id)), ("detail", v_str(detail))]),
    );
}

pub fn log_panel_transition(generation: u64, entity_id: Option<&str>, from: &str, to: &str, cause: &str) {
    log(
        Level::Debug,
        Domain::Panel,
        "transition",
        obj(&[
            ("generation", json!(generation)),
            ("entity_id", entity_id.map(v_str).unwrap_or(Value::Null)),
            ("from", v_str(from)),
            ("to", v_str(to)),
            ("cause", v_str(cause)),
        ]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits elapsed wall time at trace level when dropped.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================
