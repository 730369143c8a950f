// Infrastructure implementations for Lictor.

pub mod hook;
pub mod json_sink;

pub use hook::{dispatch, TraceGuard, Tracer};
pub use json_sink::JsonFileSink;
