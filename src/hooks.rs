//! Collection and global mutation hooks.
//!
//! The CMS calls these after every write and treats the return value as the
//! document to continue with, so every hook hands its input back untouched.
//! Logging is a side effect: the admission decision is made in the caller's
//! context, the write to the sink is detached and can never fail the
//! mutation.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::change_log::{ChangeEvent, ChangeKind, ChangeLogger};

/// Document identifier logged for singleton globals.
pub const GLOBAL_DOCUMENT_ID: &str = "global";

/// Fallback when a document carries no usable identifier.
pub const UNKNOWN_DOCUMENT_ID: &str = "unknown";

/// Write operation reported by an after-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

impl Operation {
    pub fn change_kind(self) -> ChangeKind {
        match self {
            Operation::Create => ChangeKind::Created,
            Operation::Update => ChangeKind::Updated,
        }
    }
}

/// Render a JSON value as an identifier if the CMS would treat it as present.
///
/// `null`, `false`, `0`, and `""` count as absent. Present values render the
/// way the CMS's own string conversion does: `7.0` as `"7"`, arrays as their
/// comma-joined items, objects as `"[object Object]"`.
fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(number_string(n)),
        Value::Bool(true) => Some("true".to_string()),
        v @ (Value::Array(_) | Value::Object(_)) => Some(display_string(v)),
        _ => None,
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_string(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Identifier for a created or updated document: `id`, then `slug`, then
/// `name`, then `"unknown"`.
pub fn resolve_change_id(doc: &Value) -> String {
    identifier(doc.get("id"))
        .or_else(|| identifier(doc.get("slug")))
        .or_else(|| identifier(doc.get("name")))
        .unwrap_or_else(|| UNKNOWN_DOCUMENT_ID.to_string())
}

/// Identifier for a deleted document: the delete operation's own id, then
/// the document's `slug`, then its `name`, then `"unknown"`.
pub fn resolve_delete_id(id: Option<&Value>, doc: Option<&Value>) -> String {
    identifier(id)
        .or_else(|| doc.and_then(|d| identifier(d.get("slug"))))
        .or_else(|| doc.and_then(|d| identifier(d.get("name"))))
        .unwrap_or_else(|| UNKNOWN_DOCUMENT_ID.to_string())
}

/// Hook entry points bound to one logger.
#[derive(Clone)]
pub struct ChangeHooks {
    logger: Arc<ChangeLogger>,
}

impl ChangeHooks {
    pub fn new(logger: Arc<ChangeLogger>) -> Self {
        Self { logger }
    }

    /// After a create or update in a watched collection.
    pub fn after_change(&self, doc: Value, operation: Operation, collection: &str) -> Value {
        let doc_id = resolve_change_id(&doc);
        self.notify(collection, operation.change_kind(), &doc_id);
        doc
    }

    /// After a delete in a watched collection.
    pub fn after_delete(
        &self,
        doc: Option<Value>,
        id: Option<&Value>,
        collection: &str,
    ) -> Option<Value> {
        let doc_id = resolve_delete_id(id, doc.as_ref());
        self.notify(collection, ChangeKind::Deleted, &doc_id);
        doc
    }

    /// After an update to a global.
    pub fn after_change_global(&self, doc: Value, global: &str) -> Value {
        self.notify(global, ChangeKind::Updated, GLOBAL_DOCUMENT_ID);
        doc
    }

    fn notify(&self, target: &str, kind: ChangeKind, doc_id: &str) {
        if let Some(event) = self.logger.admit(target, kind, doc_id) {
            self.dispatch(event);
        }
    }

    /// Emit on a detached task when running inside a tokio runtime, inline
    /// otherwise. The task is never joined.
    fn dispatch(&self, event: ChangeEvent) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let logger = self.logger.clone();
                handle.spawn(async move {
                    logger.emit(&event);
                });
            }
            Err(_) => {
                self.logger.emit(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_log::{ChangeSink, ManualClock, RecordingSink};
    use serde_json::json;

    fn hooks() -> (ChangeHooks, Arc<RecordingSink>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let sink = Arc::new(RecordingSink::new());
        let logger = ChangeLogger::with_parts(5000, 1000, clock.clone(), sink.clone());
        (ChangeHooks::new(Arc::new(logger)), sink, clock)
    }

    #[test]
    fn change_id_prefers_id() {
        let doc = json!({ "id": 42, "slug": "acme", "name": "Acme Center" });
        assert_eq!(resolve_change_id(&doc), "42");
    }

    #[test]
    fn change_id_falls_back_to_slug() {
        let doc = json!({ "slug": "acme", "name": "Acme Center" });
        assert_eq!(resolve_change_id(&doc), "acme");
    }

    #[test]
    fn change_id_falls_back_to_name() {
        let doc = json!({ "name": "Acme Center" });
        assert_eq!(resolve_change_id(&doc), "Acme Center");
    }

    #[test]
    fn change_id_unknown_when_nothing_usable() {
        assert_eq!(resolve_change_id(&json!({})), "unknown");
        assert_eq!(
            resolve_change_id(&json!({ "id": null, "slug": "", "name": false })),
            "unknown"
        );
    }

    #[test]
    fn zero_id_is_treated_as_absent() {
        let doc = json!({ "id": 0, "slug": "acme" });
        assert_eq!(resolve_change_id(&doc), "acme");
    }

    #[test]
    fn identifiers_render_like_cms_strings() {
        assert_eq!(resolve_change_id(&json!({ "id": 7.0 })), "7");
        assert_eq!(resolve_change_id(&json!({ "id": 7.5 })), "7.5");
        assert_eq!(resolve_change_id(&json!({ "id": -3 })), "-3");
        assert_eq!(resolve_change_id(&json!({ "id": true })), "true");
        assert_eq!(
            resolve_change_id(&json!({ "id": { "$oid": "abc" } })),
            "[object Object]"
        );
        assert_eq!(resolve_change_id(&json!({ "id": [1, "a", null] })), "1,a,");
        assert_eq!(resolve_delete_id(Some(&json!(12.0)), None), "12");
    }

    #[test]
    fn delete_id_prefers_operation_id() {
        let doc = json!({ "slug": "acme" });
        assert_eq!(resolve_delete_id(Some(&json!(7)), Some(&doc)), "7");
        assert_eq!(resolve_delete_id(Some(&json!("abc")), Some(&doc)), "abc");
    }

    #[test]
    fn delete_id_fallbacks() {
        let doc = json!({ "slug": "acme", "name": "Acme Center" });
        assert_eq!(resolve_delete_id(None, Some(&doc)), "acme");
        assert_eq!(
            resolve_delete_id(None, Some(&json!({ "name": "Acme Center" }))),
            "Acme Center"
        );
        assert_eq!(resolve_delete_id(None, None), "unknown");
    }

    #[test]
    fn after_change_logs_and_passes_through() {
        let (hooks, sink, _clock) = hooks();
        let doc = json!({ "id": 3, "name": "Hope House", "services": { "medical": [] } });

        let out = hooks.after_change(doc.clone(), Operation::Create, "providers");

        assert_eq!(out, doc);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target, "providers");
        assert_eq!(events[0].kind, ChangeKind::Created);
        assert_eq!(events[0].document_id, "3");
    }

    #[test]
    fn update_maps_to_updated() {
        let (hooks, sink, _clock) = hooks();
        hooks.after_change(json!({ "slug": "news-1" }), Operation::Update, "blog");
        assert_eq!(sink.events()[0].kind, ChangeKind::Updated);
        assert_eq!(sink.events()[0].document_id, "news-1");
    }

    #[test]
    fn after_delete_passes_through_missing_doc() {
        let (hooks, sink, _clock) = hooks();
        let out = hooks.after_delete(None, Some(&json!(9)), "pdf-library");
        assert!(out.is_none());
        assert_eq!(sink.events()[0].document_id, "9");
        assert_eq!(sink.events()[0].kind, ChangeKind::Deleted);
    }

    #[test]
    fn global_uses_constant_identifier() {
        let (hooks, sink, _clock) = hooks();
        let doc = json!({ "hotlineNumber": "1-800-HIV-INFO" });
        let out = hooks.after_change_global(doc.clone(), "site-settings");
        assert_eq!(out, doc);
        assert_eq!(sink.events()[0].document_id, GLOBAL_DOCUMENT_ID);
        assert_eq!(sink.events()[0].target, "site-settings");
    }

    #[test]
    fn burst_is_logged_once() {
        let (hooks, sink, clock) = hooks();
        for _ in 0..10 {
            hooks.after_change(json!({ "id": 42 }), Operation::Update, "providers");
            clock.advance(100);
        }
        assert_eq!(sink.len(), 1);
    }

    struct BrokenSink;

    impl ChangeSink for BrokenSink {
        fn emit(&self, _event: &ChangeEvent) -> anyhow::Result<()> {
            anyhow::bail!("broken pipe")
        }
    }

    #[test]
    fn logging_failure_never_reaches_caller() {
        let logger = ChangeLogger::with_parts(
            5000,
            10,
            Arc::new(ManualClock::new(0)),
            Arc::new(BrokenSink),
        );
        let hooks = ChangeHooks::new(Arc::new(logger));
        let doc = json!({ "id": 1, "title": "Bylaws", "versionNumber": "2.1" });

        let out = hooks.after_change(doc.clone(), Operation::Update, "pdf-library");
        assert_eq!(out, doc);

        let deleted = hooks.after_delete(Some(doc.clone()), None, "pdf-library");
        assert_eq!(deleted, Some(doc));
    }

    struct PanickingSink;

    impl ChangeSink for PanickingSink {
        fn emit(&self, _event: &ChangeEvent) -> anyhow::Result<()> {
            panic!("sink exploded")
        }
    }

    #[tokio::test]
    async fn panicking_sink_inside_runtime_never_reaches_caller() {
        let logger = ChangeLogger::with_parts(
            5000,
            10,
            Arc::new(ManualClock::new(0)),
            Arc::new(PanickingSink),
        );
        let hooks = ChangeHooks::new(Arc::new(logger));
        let doc = json!({ "id": 1, "name": "Hope House" });

        let out = hooks.after_change(doc.clone(), Operation::Create, "providers");
        assert_eq!(out, doc);

        // Let the detached emits run; the runtime must survive them.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let deleted = hooks.after_delete(Some(doc.clone()), Some(&json!(1)), "blog");
        assert_eq!(deleted, Some(doc.clone()));
        let global = hooks.after_change_global(doc.clone(), "site-settings");
        assert_eq!(global, doc);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn detached_emit_inside_runtime() {
        let (hooks, sink, _clock) = hooks();
        hooks.after_change(json!({ "id": 5 }), Operation::Create, "providers");

        for _ in 0..50 {
            if !sink.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(sink.len(), 1);
    }
}
