//! De-duplicating content change logger.
//!
//! The CMS notifies us after every create, update, and delete. Bulk
//! operations (imports, seeding) fire dozens of notifications for the same
//! document in quick succession, so each `(target, document id)` key is
//! logged at most once per cooldown window.
//!
//! # Pieces
//!
//! - [`ChangeLogger`]: admission decision plus emission, never fails its caller.
//! - [`Clock`]: time source ([`SystemClock`], or [`ManualClock`] in tests).
//! - [`ChangeSink`]: where admitted events go ([`StdoutSink`], [`RecordingSink`]).
//!
//! # Recent-change cache
//!
//! Recently logged keys live in a [`mini_moka::sync::Cache`] holding at most
//! `change_log.capacity` entries. Each entry lives for one cooldown, so the
//! cache forgets a key once it could no longer suppress anything. When the
//! cache is full its admission policy picks what to drop; a dropped key may
//! be logged again inside its window.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use mini_moka::sync::Cache;
use std::fmt;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::ChangeLogConfig;

/// Kind of mutation reported by the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An admitted change, ready to be written to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Collection or global slug.
    pub target: String,
    pub kind: ChangeKind,
    pub document_id: String,
    /// Milliseconds since the Unix epoch at admission time.
    pub observed_at_ms: u64,
}

impl ChangeEvent {
    /// ISO-8601 UTC timestamp with millisecond precision (`2025-12-03T12:37:31.000Z`).
    pub fn timestamp_iso(&self) -> String {
        let millis = i64::try_from(self.observed_at_ms).unwrap_or(i64::MAX);
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| self.observed_at_ms.to_string())
    }
}

/// De-duplication key for a target and document.
pub fn change_key(target: &str, document_id: &str) -> String {
    format!("{}-{}", target, document_id)
}

/// What [`ChangeLogger::record_change`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Logged,
    Suppressed,
    /// Admitted, but the sink failed. The failure was reported via `tracing`.
    EmitFailed,
}

// ============ Clock ============

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Hand-driven clock for tests and replays.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ============ Sinks ============

/// Destination for admitted change events.
pub trait ChangeSink: Send + Sync {
    fn emit(&self, event: &ChangeEvent) -> Result<()>;
}

/// Writes the human-readable banner to standard output.
pub struct StdoutSink;

impl ChangeSink for StdoutSink {
    fn emit(&self, event: &ChangeEvent) -> Result<()> {
        let banner = format_banner(event);
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(banner.as_bytes())
            .context("Failed to write change banner to stdout")?;
        out.flush().context("Failed to flush stdout")?;
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChangeSink for RecordingSink {
    fn emit(&self, event: &ChangeEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

const RULE_WIDTH: usize = 60;

/// Render the stdout banner for an event.
pub fn format_banner(event: &ChangeEvent) -> String {
    let rule = "━".repeat(RULE_WIDTH);
    format!(
        "{rule}\n\
         📢 CONTENT CHANGE DETECTED\n   \
         Collection: {target}\n   \
         Operation: {kind}\n   \
         Document ID: {id}\n   \
         Timestamp: {ts}\n\
         {rule}\n\
         💡 Frontend will rebuild automatically via Git push\n\
         {rule}\n",
        rule = rule,
        target = event.target,
        kind = event.kind,
        id = event.document_id,
        ts = event.timestamp_iso(),
    )
}

// ============ Logger ============

/// Logs each `(target, document id)` at most once per cooldown.
///
/// Built from a [`ChangeLogConfig`] in the hook receiver, or from explicit
/// parts in tests. Shared behind an `Arc` by every hook handler.
pub struct ChangeLogger {
    /// Change key → time it was last logged, in [`Clock`] milliseconds.
    recent: Cache<String, u64>,
    /// Serializes the get-compare-insert in [`ChangeLogger::admit`].
    admission: Mutex<()>,
    cooldown_ms: u64,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ChangeSink>,
}

impl ChangeLogger {
    /// Logger writing to stdout on the system clock.
    pub fn new(config: &ChangeLogConfig) -> Self {
        Self::with_parts(
            config.cooldown_ms,
            config.capacity,
            Arc::new(SystemClock),
            Arc::new(StdoutSink),
        )
    }

    /// Logger from explicit parts.
    ///
    /// # Arguments
    ///
    /// * `cooldown_ms` - Suppression window per key; also the cache entry lifetime.
    /// * `capacity` - Maximum number of remembered keys (at least 1).
    /// * `clock` - Time source for window comparisons and event timestamps.
    /// * `sink` - Destination for admitted events.
    pub fn with_parts(
        cooldown_ms: u64,
        capacity: usize,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ChangeSink>,
    ) -> Self {
        let recent = Cache::builder()
            .max_capacity(u64::try_from(capacity.max(1)).unwrap_or(u64::MAX))
            .time_to_live(Duration::from_millis(cooldown_ms))
            .build();
        Self {
            recent,
            admission: Mutex::new(()),
            cooldown_ms,
            clock,
            sink,
        }
    }

    /// Decide whether a change should be logged, recording it if so.
    ///
    /// The whole read-compare-write happens under one lock, so concurrent
    /// notifications for the same key inside the window admit exactly one.
    pub fn admit(&self, target: &str, kind: ChangeKind, document_id: &str) -> Option<ChangeEvent> {
        let key = change_key(target, document_id);
        let now = self.clock.now_ms();

        let _guard = self.admission.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = self.recent.get(&key) {
            if now.saturating_sub(last) < self.cooldown_ms {
                tracing::debug!(%key, %kind, "change suppressed within cooldown");
                return None;
            }
        }
        self.recent.insert(key, now);

        Some(ChangeEvent {
            target: target.to_string(),
            kind,
            document_id: document_id.to_string(),
            observed_at_ms: now,
        })
    }

    /// Write an admitted event to the sink. Errors and panics are reported
    /// through `tracing` and never reach the caller.
    pub fn emit(&self, event: &ChangeEvent) -> RecordOutcome {
        match catch_unwind(AssertUnwindSafe(|| self.sink.emit(event))) {
            Ok(Ok(())) => RecordOutcome::Logged,
            Ok(Err(e)) => {
                tracing::error!(
                    target_name = %event.target,
                    document_id = %event.document_id,
                    "Error logging content change: {:#}",
                    e
                );
                RecordOutcome::EmitFailed
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "sink panicked".to_string());
                tracing::error!(
                    target_name = %event.target,
                    document_id = %event.document_id,
                    "Error logging content change: {}",
                    msg
                );
                RecordOutcome::EmitFailed
            }
        }
    }

    /// Admit and emit in one step.
    pub fn record_change(&self, target: &str, kind: ChangeKind, document_id: &str) -> RecordOutcome {
        match self.admit(target, kind, document_id) {
            Some(event) => self.emit(&event),
            None => RecordOutcome::Suppressed,
        }
    }
}
