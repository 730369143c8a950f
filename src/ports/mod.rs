use crate::domain::graph::GraphNode;

/// Persistence collaborator for finished traces. The core only defines the
/// payload shape; where it goes is the implementation's business.
pub trait TraceSink {
    fn save(&self, session: &str, nodes: &[GraphNode]) -> anyhow::Result<()>;
}
