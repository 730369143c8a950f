//! Reference `TraceSink`: one pretty-printed JSON file per session.

use std::fs;
use std::path::PathBuf;

use serde_json::json;

use crate::domain::graph::GraphNode;
use crate::ports::TraceSink;

pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TraceSink for JsonFileSink {
    fn save(&self, session: &str, nodes: &[GraphNode]) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{session}.json"));
        let payload = json!({ "session": session, "nodes": nodes });
        fs::write(&path, serde_json::to_string_pretty(&payload)?)?;
        log::debug!("trace written to {}", path.display());
        Ok(())
    }
}
