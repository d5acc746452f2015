//! `@transition`: animated visibility changes on a virtual clock.
//!
//! Every visibility change bumps the element's version; timers remember the
//! version they were scheduled under and do nothing once it is stale, so a
//! quick hide/show never leaves an element half faded.

use crate::config::Directive;
use crate::runtime::Runtime;
use sprout_dom::NodeId;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Parsed `type[:ms]` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSpec {
    pub kind: String,
    pub duration_ms: u64,
}

impl TransitionSpec {
    pub fn parse(text: &str, default_ms: u64) -> Self {
        let (kind, duration) = match text.split_once(':') {
            Some((kind, ms)) => (kind, ms.trim().trim_end_matches("ms").parse().ok()),
            None => (text, None),
        };
        Self {
            kind: kind.trim().to_ascii_lowercase(),
            duration_ms: duration.unwrap_or(default_ms),
        }
    }

    /// Only `fade` animates; anything else toggles instantly
    pub fn is_animated(&self) -> bool {
        self.kind == "fade"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerAction {
    /// Next tick after revealing: start fading to full opacity
    FadeInStart,
    FadeInEnd,
    FadeOutEnd,
}

#[derive(Debug, Clone)]
pub(crate) struct Timer {
    due: u64,
    seq: u64,
    element: NodeId,
    version: u64,
    action: TimerAction,
}

/// Virtual time plus pending transition timers
#[derive(Debug, Default)]
pub(crate) struct Clock {
    now: u64,
    seq: u64,
    timers: Vec<Timer>,
    versions: HashMap<NodeId, u64>,
}

impl Clock {
    fn bump(&mut self, element: NodeId) -> u64 {
        let version = self.versions.entry(element).or_insert(0);
        *version += 1;
        *version
    }

    fn schedule(&mut self, delay: u64, element: NodeId, version: u64, action: TimerAction) {
        self.seq += 1;
        self.timers.push(Timer {
            due: self.now.saturating_add(delay),
            seq: self.seq,
            element,
            version,
            action,
        });
    }

    /// Earliest timer due at or before `deadline`; ties fire in scheduling order
    fn next_due(&mut self, deadline: u64) -> Option<Timer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(index, _)| index)?;
        Some(self.timers.swap_remove(index))
    }

    fn is_current(&self, timer: &Timer) -> bool {
        self.versions.get(&timer.element) == Some(&timer.version)
    }

    /// Whether a current timer is still pending for `element`
    pub(crate) fn is_animating(&self, element: NodeId) -> bool {
        self.timers
            .iter()
            .any(|timer| timer.element == element && self.is_current(timer))
    }

    pub(crate) fn forget(&mut self, element: NodeId) {
        self.versions.remove(&element);
        self.timers.retain(|timer| timer.element != element);
    }
}

impl Runtime {
    pub(crate) fn transition_spec(&self, element: NodeId) -> Option<TransitionSpec> {
        self.directive_value(element, Directive::Transition)
            .map(|text| TransitionSpec::parse(&text, self.config.default_transition_ms))
    }

    pub(crate) fn start_transition(&mut self, element: NodeId, visible: bool, duration_ms: u64) {
        let version = self.clock.bump(element);
        let transition = format!("opacity {duration_ms}ms");
        debug!(?element, visible, duration_ms, version, "Transition started");

        if visible {
            self.set_hidden(element, false);
            self.write(element, |doc| doc.set_style_property(element, "transition", &transition));
            self.write(element, |doc| doc.set_style_property(element, "opacity", "0"));
            self.clock.schedule(0, element, version, TimerAction::FadeInStart);
            self.clock.schedule(duration_ms, element, version, TimerAction::FadeInEnd);
        } else {
            self.write(element, |doc| doc.set_style_property(element, "transition", &transition));
            self.write(element, |doc| doc.set_style_property(element, "opacity", "0"));
            self.clock.schedule(duration_ms, element, version, TimerAction::FadeOutEnd);
        }
    }

    /// Advance virtual time by `ms`, firing due timers in order and flushing
    /// pending renders after each
    pub fn advance_time(&mut self, ms: u64) {
        let deadline = self.clock.now.saturating_add(ms);
        while let Some(timer) = self.clock.next_due(deadline) {
            self.clock.now = self.clock.now.max(timer.due);
            self.fire_timer(&timer);
            self.flush();
        }
        self.clock.now = deadline;
        self.flush();
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.clock.now
    }

    pub fn pending_timers(&self) -> usize {
        self.clock.timers.len()
    }

    /// Number of transitions started on `element`
    pub fn transition_version(&self, element: NodeId) -> u64 {
        self.clock.versions.get(&element).copied().unwrap_or(0)
    }

    fn fire_timer(&mut self, timer: &Timer) {
        if !self.clock.is_current(timer) {
            trace!(element = ?timer.element, version = timer.version, "stale transition timer ignored");
            return;
        }
        let element = timer.element;
        match timer.action {
            TimerAction::FadeInStart => {
                self.write(element, |doc| doc.set_style_property(element, "opacity", "1"));
            }
            TimerAction::FadeInEnd => self.clear_transition_styles(element),
            TimerAction::FadeOutEnd => {
                self.set_hidden(element, true);
                self.clear_transition_styles(element);
            }
        }
    }

    fn clear_transition_styles(&mut self, element: NodeId) {
        self.write(element, |doc| doc.remove_style_property(element, "opacity"));
        self.write(element, |doc| doc.remove_style_property(element, "transition"));
    }
}
