//! `@each`: render one clone of a template element per array item.
//!
//! Each item is a mini-root with its own scope chained to the parent scope.
//! Keyed lists reuse the node previously rendered for the same key; unkeyed
//! lists are rebuilt whenever the array changes.

use crate::config::Directive;
use crate::interpolation::unwrap_braces;
use crate::interpreter::evaluate;
use crate::runtime::Runtime;
use crate::scheduler::RootId;
use crate::value::{Obj, Value};
use sprout_dom::NodeId;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub(crate) struct ListItem {
    pub(crate) node: NodeId,
    pub(crate) root: RootId,
    pub(crate) key: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ListState {
    pub(crate) placeholder: NodeId,
    /// Detached clone of the holder without its list/key attributes
    template: NodeId,
    source: EachSource,
    key_expression: Option<String>,
    /// Shallow copy of the array as last reconciled
    snapshot: Option<Vec<Value>>,
    items: Vec<ListItem>,
}

/// Parsed `listExpr [as item[, index]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EachSource {
    pub list: String,
    pub item: String,
    pub index: String,
}

impl EachSource {
    pub fn parse(text: &str) -> Self {
        let text = unwrap_braces(text);
        let (list, names) = match text.rsplit_once(" as ") {
            Some((list, names)) => (list.trim(), Some(names)),
            None => (text.trim(), None),
        };
        let mut names = names
            .map(|names| names.split(',').map(str::trim).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter();
        let mut pick = |default: &str| {
            names
                .next()
                .filter(|name| is_identifier(name))
                .map(str::to_string)
                .unwrap_or_else(|| default.to_string())
        };
        let item = pick("item");
        let index = pick("i");
        Self {
            list: list.to_string(),
            item,
            index,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl Runtime {
    pub(crate) fn render_list(&mut self, root: RootId, element: NodeId, expression: &str, scope: &Obj) {
        if !self.directives.lists.contains_key(&element) && !self.init_list(root, element, expression) {
            return;
        }
        let Some(mut state) = self.directives.lists.remove(&element) else {
            return;
        };

        let items = match evaluate(&state.source.list, scope, None) {
            Value::Array(array) => array.to_vec(),
            _ => Vec::new(),
        };

        let unchanged = state.snapshot.as_ref().is_some_and(|previous| {
            previous.len() == items.len() && previous.iter().zip(&items).all(|(a, b)| a.strict_eq(b))
        });
        if unchanged {
            debug!(?element, items = items.len(), "List unchanged; skipping reconciliation");
            // Item roots can still read parent state that changed
            let roots: Vec<RootId> = state.items.iter().map(|item| item.root).collect();
            self.directives.lists.insert(element, state);
            for item_root in roots {
                self.render(item_root);
            }
            return;
        }

        self.reconcile(root, &mut state, &items, scope);
        state.snapshot = Some(items);
        self.directives.lists.insert(element, state);
    }

    fn init_list(&mut self, root: RootId, element: NodeId, expression: &str) -> bool {
        let Some(parent) = self.doc.parent(element) else {
            warn!(?element, "List holder has no parent; skipping");
            return false;
        };
        let placeholder = self.doc.create_comment(&self.config.list_placeholder);
        if let Err(error) = self.doc.insert_before(parent, placeholder, Some(element)) {
            warn!(%error, ?element, "Failed to insert list placeholder");
            return false;
        }
        let template = match self.doc.clone_subtree(element) {
            Ok(template) => template,
            Err(error) => {
                warn!(%error, ?element, "Failed to clone list template");
                return false;
            }
        };
        let key_expression = self
            .directive_value(element, Directive::Key)
            .map(|key| unwrap_braces(&key))
            .filter(|key| !key.is_empty());
        for directive in [Directive::Each, Directive::Key] {
            for name in self.config.directive_names(directive) {
                self.doc.remove_attribute(template, &name);
            }
        }
        self.doc.remove(element);

        self.placeholders.insert(placeholder, element);
        self.directives.lists.insert(
            element,
            ListState {
                placeholder,
                template,
                source: EachSource::parse(expression),
                key_expression,
                snapshot: None,
                items: Vec::new(),
            },
        );
        self.track_directive(root, element);
        true
    }

    fn reconcile(&mut self, root: RootId, state: &mut ListState, items: &[Value], scope: &Obj) {
        let previous = std::mem::take(&mut state.items);
        let mut by_key: HashMap<String, usize> = HashMap::new();
        for (index, item) in previous.iter().enumerate() {
            if let Some(key) = &item.key {
                by_key.entry(key.clone()).or_insert(index);
            }
        }
        let mut reused = vec![false; previous.len()];
        let mut anchor = state.placeholder;
        let mut rendered = Vec::with_capacity(items.len());
        let mut created = 0usize;

        for (index, value) in items.iter().enumerate() {
            let item_scope = Obj::with_proto(scope);
            item_scope.insert(state.source.item.clone(), value.clone());
            item_scope.insert(state.source.index.clone(), Value::Number(index as f64));

            let key = state
                .key_expression
                .as_ref()
                .and_then(|expression| evaluate(expression, &item_scope, None).identity_key());
            // Removing the entry means a duplicate key gets a fresh clone
            let existing = key.as_ref().and_then(|key| by_key.remove(key));

            let (node, item_root, is_new) = match existing {
                Some(slot) => {
                    reused[slot] = true;
                    let item = &previous[slot];
                    self.replace_scope(item.root, item_scope.clone());
                    (item.node, item.root, false)
                }
                None => {
                    let node = match self.doc.clone_subtree(state.template) {
                        Ok(node) => node,
                        Err(error) => {
                            warn!(%error, "Failed to clone list item");
                            continue;
                        }
                    };
                    created += 1;
                    (node, self.register_root(node, item_scope.clone(), Some(root)), true)
                }
            };
            self.make_reactive(&Value::Object(item_scope), item_root, false);

            if let Err(error) = self.doc.insert_after(anchor, node) {
                warn!(%error, ?node, "Failed to place list item");
            }
            anchor = node;

            if is_new {
                self.collect_bindings_for_root(item_root);
            }
            self.render(item_root);
            if is_new {
                self.wire_event_handlers(item_root);
            }
            rendered.push(ListItem {
                node,
                root: item_root,
                key,
            });
        }

        let mut removed = 0usize;
        for (slot, item) in previous.iter().enumerate() {
            if !reused[slot] {
                self.destroy(item.root);
                self.doc.remove(item.node);
                removed += 1;
            }
        }
        debug!(
            items = rendered.len(),
            created,
            reused = rendered.len() - created,
            removed,
            "List reconciled"
        );
        state.items = rendered;
    }
}
