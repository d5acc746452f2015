//! Structural and visibility directives.
//!
//! Each directive keeps its state keyed by the element carrying it and is
//! initialised lazily the first time a render reaches the binding.

pub mod conditional;
pub mod list;
pub mod transition;
pub mod visibility;

use crate::runtime::Runtime;
use conditional::ConditionalState;
use list::ListState;
use sprout_dom::style::parse_declarations;
use sprout_dom::NodeId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct DirectiveTables {
    pub(crate) conditionals: HashMap<NodeId, ConditionalState>,
    pub(crate) lists: HashMap<NodeId, ListState>,
    /// Last applied visibility per element
    pub(crate) visibility: HashMap<NodeId, bool>,
}

impl Runtime {
    /// Hide or reveal an element through `hidden`, `aria-hidden` and
    /// `display: none`
    pub(crate) fn set_hidden(&mut self, element: NodeId, hidden: bool) {
        if hidden {
            self.set_attribute_if_changed(element, "hidden", "");
            self.set_attribute_if_changed(element, "aria-hidden", "true");
            self.write(element, |doc| doc.set_style_property(element, "display", "none"));
        } else {
            self.doc.remove_attribute(element, "hidden");
            self.doc.remove_attribute(element, "aria-hidden");
            self.write(element, |doc| doc.remove_style_property(element, "display"));
        }
    }

    /// Inline declarations a directive currently owns on `element`: `display`
    /// while hidden, `opacity` and `transition` while a fade runs
    pub(crate) fn directive_style(&self, element: NodeId) -> Vec<(String, String)> {
        let hidden = self.is_hidden(element);
        let animating = self.clock.is_animating(element);
        if !hidden && !animating {
            return Vec::new();
        }
        let current = self.doc.attribute(element, "style").unwrap_or_default();
        let mut owned: Vec<(String, String)> = parse_declarations(current)
            .into_iter()
            .filter(|(name, _)| animating && (name == "opacity" || name == "transition"))
            .collect();
        if hidden {
            owned.push(("display".to_string(), "none".to_string()));
        }
        owned
    }

    /// Whether `element` is currently hidden by a directive
    pub fn is_hidden(&self, element: NodeId) -> bool {
        self.doc.has_attribute(element, "hidden")
    }
}
