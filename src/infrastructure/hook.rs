//! Process-wide event interception.
//!
//! The host runtime calls [`dispatch`] for every interpreter call/return
//! event. A [`Tracer`] owns its event buffer; [`Tracer::start`] installs
//! the tracer into the single process-wide hook slot and returns a guard
//! that removes it again on every exit path, including panics in the
//! traced work. Buffers are per-instance, so a tracer that gets displaced
//! by a later `start` keeps its own events intact.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::domain::frame::{EventKind, FrameRef, RawEvent};

type Buffer = Arc<Mutex<Vec<RawEvent>>>;

struct ActiveHook {
    buffer: Buffer,
    own_path: String,
}

static ACTIVE: Mutex<Option<ActiveHook>> = Mutex::new(None);

/// Accumulates raw events for one traced unit of work.
pub struct Tracer {
    buffer: Buffer,
    own_path: String,
}

impl Tracer {
    /// `own_path` is the tracer's implementation directory; frames under
    /// it are dropped so the tracer never traces itself.
    pub fn new(own_path: impl Into<String>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            own_path: own_path.into(),
        }
    }

    /// Install this tracer as the process-wide hook. The returned guard
    /// uninstalls it on drop; dropping a guard whose tracer has already
    /// been displaced by a newer `start` leaves the newer hook alone.
    pub fn start(&self) -> TraceGuard {
        if let Ok(mut slot) = ACTIVE.lock() {
            *slot = Some(ActiveHook {
                buffer: Arc::clone(&self.buffer),
                own_path: self.own_path.clone(),
            });
            log::debug!("trace hook installed");
        }
        TraceGuard {
            buffer: Arc::clone(&self.buffer),
        }
    }

    /// Remove the hook now instead of waiting for the guard.
    pub fn stop(&self) {
        deactivate(&self.buffer);
    }

    /// Drain the accumulated events for graph construction.
    pub fn take_events(&self) -> Vec<RawEvent> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

/// Scoped hook installation; see [`Tracer::start`].
pub struct TraceGuard {
    buffer: Buffer,
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        deactivate(&self.buffer);
    }
}

fn deactivate(buffer: &Buffer) {
    if let Ok(mut slot) = ACTIVE.lock() {
        let owned = slot
            .as_ref()
            .is_some_and(|hook| Arc::ptr_eq(&hook.buffer, buffer));
        if owned {
            *slot = None;
            log::debug!("trace hook removed");
        }
    }
}

/// Delivery point for the host runtime, invoked synchronously on every
/// interpreter event. Runs on the traced program's own control path, so it
/// must never panic or propagate: lock failures drop the event, and frames
/// from the tracer's own directory are excluded.
pub fn dispatch(frame: FrameRef, kind: EventKind, arg: Option<Value>) {
    let Ok(slot) = ACTIVE.lock() else { return };
    let Some(hook) = slot.as_ref() else { return };
    if !hook.own_path.is_empty() && frame.file.contains(&hook.own_path) {
        return;
    }
    if let Ok(mut buf) = hook.buffer.lock() {
        buf.push(RawEvent { frame, kind, arg });
    };
}
