// End-to-end: a simulated request's frame stream through the full
// trace -> inspect -> graph -> sink pipeline.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;

use lictor::application::TraceUsecase;
use lictor::domain::frame::{EventKind, FrameRecord, FrameRef};
use lictor::domain::graph::{GraphNode, TraceConfig};
use lictor::domain::inspector::RuleSet;
use lictor::infrastructure::dispatch;
use lictor::ports::TraceSink;

// The trace hook slot is process-global, so tests take this lock to keep
// their installations from displacing each other.
static HOOK_TEST_LOCK: Mutex<()> = Mutex::new(());

fn lock_hook() -> MutexGuard<'static, ()> {
    HOOK_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct MemorySink {
    saved: Mutex<Vec<(String, Vec<GraphNode>)>>,
}

impl TraceSink for MemorySink {
    fn save(&self, session: &str, nodes: &[GraphNode]) -> anyhow::Result<()> {
        self.saved
            .lock()
            .unwrap()
            .push((session.to_string(), nodes.to_vec()));
        Ok(())
    }
}

fn config() -> TraceConfig {
    TraceConfig {
        app_paths: vec!["site-packages/films".to_string()],
        framework_path: "site-packages/django".to_string(),
        tracer_path: "site-packages/lictor".to_string(),
    }
}

fn frame(file: &str, function: &str, line: u32) -> FrameRef {
    Arc::new(FrameRecord::new(file, function, line))
}

fn child(file: &str, function: &str, line: u32, caller: &FrameRef) -> FrameRef {
    Arc::new(FrameRecord::new(file, function, line).with_caller(caller.clone()))
}

fn call(frame: &FrameRef) {
    dispatch(frame.clone(), EventKind::Call, None);
}

#[test]
fn request_trace_builds_linked_graph() {
    let _l = lock_hook();
    let sink = MemorySink::default();
    let usecase = TraceUsecase {
        config: config(),
        rules: Arc::new(RuleSet::framework_defaults()),
        sink: &sink,
    };

    // wsgi (framework) -> stdlib plumbing (filtered) -> view (app)
    //   -> manager descriptor access (framework)
    let wsgi = frame("site-packages/django/core/handlers/wsgi.py", "__call__", 120);
    let plumbing = child("/usr/lib/python/functools.py", "wrapper", 30, &wsgi);
    let view = child("site-packages/films/views.py", "film_list", 8, &plumbing);
    let manager = Arc::new(
        FrameRecord::new("site-packages/django/db/models/manager.py", "__get__", 40)
            .with_caller(view.clone())
            .with_locals(json!({"self": {"manager": {"model": "films.models.Film"}}})),
    );

    usecase
        .run("req-1", || {
            call(&wsgi);
            call(&plumbing);
            call(&view);
            call(&manager);
            dispatch(manager.clone(), EventKind::Return, None);
        })
        .unwrap();

    let saved = sink.saved.lock().unwrap();
    let (session, nodes) = &saved[0];
    assert_eq!(session, "req-1");

    // The stdlib plumbing frame never becomes a node.
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].file, "site-packages/django/core/handlers/wsgi.py");
    assert!(nodes[0].parent_id.is_none());

    // The view skips over the filtered plumbing frame and links to wsgi.
    assert_eq!(nodes[1].file, "site-packages/films/views.py");
    assert_eq!(nodes[1].parent_id.as_ref(), Some(&nodes[0].id));

    // The manager access is classified and linked to the view.
    assert_eq!(nodes[2].kind, "models.Manager");
    assert_eq!(nodes[2].name, "films.models.Film");
    assert_eq!(nodes[2].parent_id.as_ref(), Some(&nodes[1].id));
}

#[test]
fn hook_is_removed_after_run() {
    let _l = lock_hook();
    let sink = MemorySink::default();
    let usecase = TraceUsecase {
        config: config(),
        rules: Arc::new(RuleSet::framework_defaults()),
        sink: &sink,
    };

    usecase.run("req-2", || {}).unwrap();

    // Events after the run are not delivered anywhere.
    call(&frame("site-packages/films/views.py", "film_list", 8));

    let saved = sink.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].1.is_empty());
}

#[test]
fn own_frames_never_reach_the_graph() {
    let _l = lock_hook();
    let sink = MemorySink::default();
    let usecase = TraceUsecase {
        config: config(),
        rules: Arc::new(RuleSet::framework_defaults()),
        sink: &sink,
    };

    usecase
        .run("req-3", || {
            call(&frame("site-packages/lictor/hook.py", "dispatch", 1));
            call(&frame("site-packages/films/views.py", "film_list", 8));
        })
        .unwrap();

    let saved = sink.saved.lock().unwrap();
    let nodes = &saved[0].1;
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].file, "site-packages/films/views.py");
}

#[test]
fn traced_work_return_value_passes_through() {
    let _l = lock_hook();
    let sink = MemorySink::default();
    let usecase = TraceUsecase {
        config: config(),
        rules: Arc::new(RuleSet::framework_defaults()),
        sink: &sink,
    };

    let answer = usecase.run("req-4", || 41 + 1).unwrap();
    assert_eq!(answer, 42);
}
