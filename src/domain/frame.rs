//! Raw frame model.
//!
//! A `FrameRecord` is one interpreter stack frame as reported by the host
//! runtime at the moment an event fired: the source file and starting line
//! of the function being executed, its name, a structured snapshot of the
//! local bindings, and a link to the caller's frame.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Shared handle to a frame. Caller chains are reference-counted so a
/// child frame can outlive the event that captured it.
pub type FrameRef = Arc<FrameRecord>;

/// One captured stack frame.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Source file of the executing function's code object.
    pub file: String,
    /// Name of the executing function.
    pub function: String,
    /// Starting line of the enclosing function, not the current
    /// execution line.
    pub first_line: u32,
    /// Snapshot of local bindings, as far as the host runtime exposes
    /// them. `Null` when nothing was captured.
    pub locals: Value,
    /// The caller's frame, absent at the bottom of the stack.
    pub caller: Option<FrameRef>,
}

impl FrameRecord {
    pub fn new(file: impl Into<String>, function: impl Into<String>, first_line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            first_line,
            locals: Value::Null,
            caller: None,
        }
    }

    pub fn with_caller(mut self, caller: FrameRef) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_locals(mut self, locals: Value) -> Self {
        self.locals = locals;
        self
    }

    /// Identity of this frame's static call site.
    pub fn id(&self) -> FrameId {
        FrameId::of(&self.file, self.first_line)
    }
}

/// Content-hash identity of a call site: hash of (file, starting line).
///
/// Two frames executing the same function hash to the same id, so
/// recursive or repeated calls collapse to a single graph node.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(String);

impl FrameId {
    pub fn of(file: &str, first_line: u32) -> Self {
        let digest = Sha256::digest(format!("{file}:{first_line}").as_bytes());
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect();
        FrameId(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", &self.0[..8.min(self.0.len())])
    }
}

/// Interpreter event kinds delivered to the trace hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Call,
    Return,
    Exception,
    Line,
}

/// One (frame, event, argument) triple captured by the hook. Held only
/// for the lifetime of a single trace.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub frame: FrameRef,
    pub kind: EventKind,
    pub arg: Option<Value>,
}
