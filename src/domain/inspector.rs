//! Frame inspection and classification.
//!
//! `FrameInspector` wraps a single raw frame and exposes normalized
//! accessors plus a framework classification: which kind of component
//! (model manager, view, ...) the frame belongs to and its symbolic name.
//!
//! Classification is driven by an ordered `RuleSet` evaluated at
//! construction: first matching rule wins, everything else falls back to
//! placeholder type/name. New framework constructs (views, url patterns,
//! forms) are added by appending rules, not by editing this module.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::frame::{FrameId, FrameRecord, FrameRef};

pub const UNKNOWN_TYPE: &str = "unknown type";
pub const UNKNOWN_NAME: &str = "unknown name";

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("cannot inspect an absent frame")]
    MissingFrame,
}

/// Result of running the ruleset over a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Component category label, e.g. "models.Manager".
    pub kind: String,
    /// Resolved symbolic name, e.g. the model class a manager is bound to.
    pub name: String,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            kind: UNKNOWN_TYPE.to_string(),
            name: UNKNOWN_NAME.to_string(),
        }
    }
}

type Rule = Box<dyn Fn(&FrameRecord) -> Option<Classification> + Send + Sync>;

/// Ordered list of pattern classifiers, first match wins.
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl RuleSet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in framework heuristics.
    pub fn framework_defaults() -> Self {
        let mut rules = Self::empty();
        rules.push(manager_access);
        rules
    }

    pub fn push<F>(&mut self, rule: F)
    where
        F: Fn(&FrameRecord) -> Option<Classification> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
    }

    /// Run the rules in order; unrecognized frame shapes get placeholders.
    pub fn classify(&self, frame: &FrameRecord) -> Classification {
        self.rules
            .iter()
            .find_map(|rule| rule(frame))
            .unwrap_or_else(Classification::unknown)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::framework_defaults()
    }
}

/// Manager descriptor access: code in the framework's `models/manager`
/// module running `__get__` is a manager attribute lookup; the name
/// resolves to the model class the manager is bound to, read from the
/// frame's local bindings. Fragile by nature: a frame that matches the
/// path and function but lacks the expected locals is left unclassified.
fn manager_access(frame: &FrameRecord) -> Option<Classification> {
    if !frame.file.contains("models/manager") || !frame.function.contains("__get__") {
        return None;
    }
    let model = frame.locals.pointer("/self/manager/model")?.as_str()?;
    Some(Classification {
        kind: "models.Manager".to_string(),
        name: model.to_string(),
    })
}

/// Wraps one raw frame; classification runs once at construction.
#[derive(Debug)]
pub struct FrameInspector {
    frame: FrameRef,
    rules: Arc<RuleSet>,
    class: Classification,
}

impl FrameInspector {
    /// Fails loudly on an absent frame: that is an invariant violation on
    /// the caller's side, not a walkable condition.
    pub fn new(frame: Option<FrameRef>, rules: Arc<RuleSet>) -> Result<Self, InspectError> {
        let frame = frame.ok_or(InspectError::MissingFrame)?;
        let class = rules.classify(&frame);
        Ok(Self { frame, rules, class })
    }

    /// Identity of the frame's static call site.
    pub fn id(&self) -> FrameId {
        self.frame.id()
    }

    pub fn filename(&self) -> &str {
        &self.frame.file
    }

    /// Starting line of the enclosing function.
    pub fn first_line(&self) -> u32 {
        self.frame.first_line
    }

    pub fn component_type(&self) -> &str {
        &self.class.kind
    }

    pub fn component_name(&self) -> &str {
        &self.class.name
    }

    /// Inspector over the caller's frame, or `None` at the bottom of the
    /// stack. Recomputed on every access: two calls yield two independent
    /// wrappers over the same underlying frame.
    pub fn parent(&self) -> Option<FrameInspector> {
        FrameInspector::new(self.frame.caller.clone(), Arc::clone(&self.rules)).ok()
    }
}
