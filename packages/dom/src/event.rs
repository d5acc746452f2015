use crate::node::NodeId;
use std::cell::Cell;

/// Propagation phase a listener is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Capture,
    Bubble,
}

/// A dispatched event.
///
/// Flags use `Cell` so listeners holding a shared reference can cancel
/// or stop propagation.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub key: Option<String>,
    /// Element gaining or losing focus for `focusin`/`focusout`
    pub related_target: Option<NodeId>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            key: None,
            related_target: None,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_related_target(mut self, related: NodeId) -> Self {
        self.related_target = Some(related);
        self
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Focus-transition events report `related_target` instead of `target`
    /// for outside detection
    pub fn is_focus_transition(&self) -> bool {
        matches!(self.event_type.as_str(), "focusin" | "focusout" | "blur" | "focus")
    }

    pub fn is_key_event(&self) -> bool {
        matches!(self.event_type.as_str(), "keydown" | "keyup" | "keypress")
    }
}
