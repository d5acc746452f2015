//! `@if` / `@else`: attach or detach an element behind a placeholder comment.

use crate::config::Directive;
use crate::interpreter::evaluate;
use crate::runtime::Runtime;
use crate::scheduler::RootId;
use crate::value::Obj;
use sprout_dom::NodeId;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub(crate) struct ConditionalState {
    pub(crate) placeholder: NodeId,
    /// `@else` sibling found when the conditional was first rendered
    pub(crate) else_element: Option<NodeId>,
}

impl Runtime {
    pub(crate) fn render_conditional(&mut self, root: RootId, element: NodeId, expression: &str, scope: &Obj) {
        if !self.directives.conditionals.contains_key(&element) && !self.init_conditional(root, element) {
            return;
        }
        let Some(state) = self.directives.conditionals.get(&element).cloned() else {
            return;
        };

        if evaluate(expression, scope, None).truthy() {
            if self.doc.next_sibling(state.placeholder) != Some(element) {
                match self.doc.insert_after(state.placeholder, element) {
                    Ok(()) => {
                        debug!(?element, "Conditional element attached");
                        self.wire_subtree(root, element);
                    }
                    Err(error) => warn!(%error, ?element, "Failed to attach conditional element"),
                }
            }
            if let Some(else_element) = state.else_element {
                self.set_hidden(else_element, true);
            }
        } else {
            if self.doc.parent(element).is_some() {
                self.doc.remove(element);
                debug!(?element, "Conditional element detached");
            }
            if let Some(else_element) = state.else_element {
                if self.doc.parent(else_element).is_none() {
                    if let Err(error) = self.doc.insert_after(state.placeholder, else_element) {
                        warn!(%error, ?else_element, "Failed to attach else element");
                    }
                }
                self.set_hidden(else_element, false);
                self.wire_subtree(root, else_element);
            }
        }
    }

    fn init_conditional(&mut self, root: RootId, element: NodeId) -> bool {
        let Some(parent) = self.doc.parent(element) else {
            warn!(?element, "Conditional element has no parent; skipping");
            return false;
        };
        let placeholder = self.doc.create_comment(&self.config.conditional_placeholder);
        if let Err(error) = self.doc.insert_before(parent, placeholder, Some(element)) {
            warn!(%error, ?element, "Failed to insert conditional placeholder");
            return false;
        }
        let else_element = self
            .doc
            .next_element_sibling(element)
            .filter(|sibling| self.has_directive(*sibling, Directive::Else));

        self.placeholders.insert(placeholder, element);
        self.directives.conditionals.insert(
            element,
            ConditionalState {
                placeholder,
                else_element,
            },
        );
        self.track_directive(root, element);
        true
    }
}
