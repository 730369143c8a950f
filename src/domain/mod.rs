// Core tracing domain: frames, frame inspection, and graph reconstruction.

pub mod frame;
pub mod graph;
pub mod inspector;
