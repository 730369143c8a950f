//! Call-graph reconstruction.
//!
//! Converts the raw events accumulated during a trace into a deduplicated,
//! parent-linked graph restricted to the host application's own code. Nodes
//! are keyed by `FrameId` in insertion order so output is deterministic.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::frame::{EventKind, FrameId, RawEvent};
use crate::domain::inspector::{FrameInspector, RuleSet};
use crate::ports::TraceSink;

/// Path universe for one traced application, supplied by the embedding
/// application's settings: the install paths of its components, the
/// framework's own base path, and the tracer's implementation path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceConfig {
    /// Install paths of the application's declared components.
    pub app_paths: Vec<String>,
    /// Base install path of the framework itself.
    pub framework_path: String,
    /// The tracer's own directory, always excluded from tracing.
    pub tracer_path: String,
}

/// One node of the reconstructed call graph, in its persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: FrameId,
    #[serde(rename = "type")]
    pub kind: String,
    pub file: String,
    pub line: u32,
    pub name: String,
    pub parent_id: Option<FrameId>,
}

/// Insertion-ordered graph of inspected frames.
pub struct TraceGraph {
    allowed: Vec<String>,
    tracer_path: String,
    rules: Arc<RuleSet>,
    nodes: IndexMap<FrameId, GraphNode>,
}

impl TraceGraph {
    pub fn new(config: &TraceConfig, rules: Arc<RuleSet>) -> Self {
        let mut allowed = config.app_paths.clone();
        if !config.framework_path.is_empty() {
            allowed.push(config.framework_path.clone());
        }
        allowed.retain(|p| *p != config.tracer_path);
        Self {
            allowed,
            tracer_path: config.tracer_path.clone(),
            rules,
            nodes: IndexMap::new(),
        }
    }

    /// The sole filter deciding which raw frames become graph nodes.
    /// The tracer's own directory loses even when it also sits under an
    /// allowed prefix.
    pub fn is_available_frame(&self, path: &str) -> bool {
        if !self.tracer_path.is_empty() && path.contains(&self.tracer_path) {
            return false;
        }
        self.allowed.iter().any(|prefix| path.contains(prefix))
    }

    /// Insert one inspected frame, linked to its nearest ancestor already
    /// present in the graph. A node with the same id is overwritten
    /// unconditionally; insertion order keeps the original position.
    pub fn add(&mut self, iframe: &FrameInspector, _event: EventKind) {
        let id = iframe.id();
        let parent = self.find_framework_parent(iframe.parent());
        let node = GraphNode {
            id: id.clone(),
            kind: iframe.component_type().to_string(),
            file: iframe.filename().to_string(),
            line: iframe.first_line(),
            name: iframe.component_name().to_string(),
            parent_id: parent.map(|p| p.id()),
        };
        self.nodes.insert(id, node);
    }

    /// Walk up the caller chain until a frame whose id is already keyed in
    /// the graph, skipping over frames that were filtered out. Exhausting
    /// the chain is the designed terminal condition, not an error.
    pub fn find_framework_parent(&self, mut iframe: Option<FrameInspector>) -> Option<FrameInspector> {
        while let Some(candidate) = iframe {
            if self.nodes.contains_key(&candidate.id()) {
                return Some(candidate);
            }
            iframe = candidate.parent();
        }
        None
    }

    /// Filter, wrap and add every raw event.
    pub fn build(&mut self, events: &[RawEvent]) {
        for event in events {
            if !self.is_available_frame(&event.frame.file) {
                continue;
            }
            if let Ok(iframe) = FrameInspector::new(Some(event.frame.clone()), Arc::clone(&self.rules)) {
                self.add(&iframe, event.kind);
            }
        }
    }

    /// Orchestration entry point: build the graph from the raw events and
    /// hand the ordered node sequence to the persistence collaborator.
    pub fn build_and_save(
        mut self,
        events: &[RawEvent],
        session: &str,
        sink: &dyn TraceSink,
    ) -> anyhow::Result<()> {
        self.build(events);
        let nodes: Vec<GraphNode> = self.nodes.into_values().collect();
        log::debug!("saving trace session {session}: {} nodes", nodes.len());
        sink.save(session, &nodes)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &FrameId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }
}
