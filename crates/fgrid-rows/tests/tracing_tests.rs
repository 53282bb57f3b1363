#![forbid(unsafe_code)]

//! Tracing integration tests for the row engine.
//!
//! The node manager reports data problems (duplicate ids, unknown rows) as
//! log events instead of errors and wraps each structural change in a span.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fgrid_core::{GridOptions, RowNode};
use fgrid_rows::{ChangedRowNodeSet, ClientSideNodeManager, RowDataTransaction};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    fields: HashMap<String, String>,
    span: Option<String>,
}

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Default, Clone)]
struct CaptureHandle {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl CaptureHandle {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn messages_at(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .filter_map(|e| e.fields.get("message").cloned())
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

struct Capture(CaptureHandle);

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.0.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let span = ctx
            .event_span(event)
            .map(|span_ref| span_ref.name().to_string());
        self.0.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
            span,
        });
    }
}

fn with_capture<F: FnOnce()>(f: F) -> CaptureHandle {
    let handle = CaptureHandle::default();
    let subscriber = tracing_subscriber::registry().with(Capture(handle.clone()));
    tracing::subscriber::with_default(subscriber, f);
    handle
}

#[derive(Debug)]
struct Row {
    id: &'static str,
}

fn rows(ids: &[&'static str]) -> Vec<Arc<Row>> {
    ids.iter().map(|id| Arc::new(Row { id })).collect()
}

fn manager() -> ClientSideNodeManager<Row> {
    let options = GridOptions::new().with_row_id(|r: &Row, _| r.id.to_owned());
    let mut manager = ClientSideNodeManager::new(options);
    manager.activate(RowNode::root());
    manager
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn duplicate_id_is_warned() {
    let handle = with_capture(|| {
        let mut m = manager();
        m.set_new_row_data(&rows(&["a", "b", "a"]));
    });

    let warnings: Vec<CapturedEvent> = handle
        .events()
        .into_iter()
        .filter(|e| e.level == Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert_eq!(warnings[0].fields.get("node_id").map(String::as_str), Some("a"));
    assert_eq!(warnings[0].span.as_deref(), Some("row_data.replace"));
}

#[test]
fn unknown_rows_are_logged_as_errors() {
    let handle = with_capture(|| {
        let mut m = manager();
        m.set_new_row_data(&rows(&["a"]));
        m.update_row_data(
            RowDataTransaction::new().with_remove(rows(&["zz"])),
            &mut ChangedRowNodeSet::new(),
        );
    });

    let errors = handle.messages_at(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("could not find"), "{errors:?}");
}

#[test]
fn immutable_without_ids_logs_and_replaces() {
    let handle = with_capture(|| {
        let mut m: ClientSideNodeManager<Row> = ClientSideNodeManager::new(GridOptions::new());
        m.activate(RowNode::root());
        let refresh = m.set_immutable_row_data(&rows(&["a"]), &mut ChangedRowNodeSet::new());
        assert!(refresh.replaced);
    });
    assert_eq!(handle.messages_at(Level::ERROR).len(), 1);
}

#[test]
fn transaction_span_records_batch_sizes() {
    let handle = with_capture(|| {
        let mut m = manager();
        m.set_new_row_data(&rows(&["a", "b"]));
        m.update_row_data(
            RowDataTransaction::new()
                .with_add(rows(&["c", "d"]))
                .with_remove(rows(&["a"])),
            &mut ChangedRowNodeSet::new(),
        );
    });

    let spans = handle.spans();
    let tx = spans
        .iter()
        .find(|s| s.name == "row_data.transaction")
        .expect("transaction span");
    assert_eq!(tx.fields.get("add").map(String::as_str), Some("2"));
    assert_eq!(tx.fields.get("remove").map(String::as_str), Some("1"));
    assert_eq!(tx.fields.get("update").map(String::as_str), Some("0"));
}

#[test]
fn clean_update_emits_no_warnings() {
    let handle = with_capture(|| {
        let mut m = manager();
        let data = rows(&["a", "b"]);
        m.set_new_row_data(&data);
        m.set_immutable_row_data(&data, &mut ChangedRowNodeSet::new());
    });
    assert!(handle.messages_at(Level::WARN).is_empty());
    assert!(handle.messages_at(Level::ERROR).is_empty());
}
