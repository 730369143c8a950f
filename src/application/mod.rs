//! Application glue: trace one unit of work and persist the result.

use std::sync::Arc;

use crate::domain::graph::{TraceConfig, TraceGraph};
use crate::domain::inspector::RuleSet;
use crate::infrastructure::Tracer;
use crate::ports::TraceSink;

pub struct TraceUsecase<'a> {
    pub config: TraceConfig,
    pub rules: Arc<RuleSet>,
    pub sink: &'a dyn TraceSink,
}

impl<'a> TraceUsecase<'a> {
    /// Run `work` with the trace hook installed, then build the call graph
    /// from the captured events and hand it to the sink under `session`.
    /// The hook is removed on every exit path of `work`.
    pub fn run<F, R>(&self, session: &str, work: F) -> anyhow::Result<R>
    where
        F: FnOnce() -> R,
    {
        let tracer = Tracer::new(self.config.tracer_path.clone());
        let guard = tracer.start();
        let result = work();
        drop(guard);

        let events = tracer.take_events();
        let graph = TraceGraph::new(&self.config, Arc::clone(&self.rules));
        graph.build_and_save(&events, session, self.sink)?;
        Ok(result)
    }
}
