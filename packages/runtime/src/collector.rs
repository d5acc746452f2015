//! Binding collection.
//!
//! Walks the nodes a root owns and records which attributes and text nodes
//! the render pass must recompute. Collection is idempotent: original
//! templates are remembered, so running it again after a render (or after
//! structural changes) yields the same bindings.

use crate::config::Directive;
use crate::interpolation::has_interpolation;
use crate::runtime::Runtime;
use crate::scheduler::RootId;
use serde::Serialize;
use sprout_dom::NodeId;
use std::rc::Rc;
use tracing::{debug, instrument, warn};

/// An attribute whose value is (re)computed on render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrBinding {
    pub element: NodeId,
    pub attribute: String,
    pub expression: String,
}

/// A text node containing `{expr}` runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpBinding {
    pub text_node: NodeId,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum BindingSite {
    Attr(NodeId, String),
    Text(NodeId),
}

impl BindingSite {
    pub(crate) fn node(&self) -> NodeId {
        match self {
            BindingSite::Attr(node, _) | BindingSite::Text(node) => *node,
        }
    }
}

/// Attributes whose brace-less value is an expression
const ALWAYS_BOUND: &[&str] = &["value", "disabled", "checked"];

const TWO_WAY_SHORTHAND: &str = ":value";

impl Runtime {
    /// Recompute the attribute and interpolation bindings of `root`.
    ///
    /// Template anchors under the root are expanded and nested hosts mounted
    /// first, so their markup is owned by the right root before scanning.
    #[instrument(skip(self))]
    pub fn collect_bindings_for_root(&mut self, root: RootId) {
        let Some(node) = self.root_node(root) else {
            warn!(%root, "Collection requested for unknown root");
            return;
        };

        self.resolve_template_anchors(node);
        self.mount_nested_hosts(root, node);

        let owned = self.walk_owned(node);
        let mut attr_bindings = Vec::new();
        let mut interp_bindings = Vec::new();
        for id in owned {
            if self.doc.is_element(id) {
                if id != node && self.is_host(id) {
                    continue;
                }
                self.collect_element(id, &mut attr_bindings);
            } else if self.doc.is_text(id) {
                self.collect_text(id, &mut interp_bindings);
            }
        }

        debug!(
            %root,
            attributes = attr_bindings.len(),
            interpolations = interp_bindings.len(),
            "Bindings collected"
        );
        if let Some(state) = self.roots.get_mut(&root) {
            state.attr_bindings = Rc::new(attr_bindings);
            state.interp_bindings = Rc::new(interp_bindings);
        }
    }

    fn collect_element(&mut self, element: NodeId, out: &mut Vec<AttrBinding>) {
        let is_list_holder = self.has_directive(element, Directive::Each);
        let is_two_way = self.doc.has_attribute(element, &self.config.model_attribute)
            || self.doc.has_attribute(element, TWO_WAY_SHORTHAND);
        let attributes = self.doc.attributes(element).to_vec();

        for attribute in attributes {
            let name = attribute.name;
            let directive = self.config.directive(&name);

            if is_list_holder {
                if directive == Some(Directive::Each) {
                    out.push(AttrBinding {
                        element,
                        attribute: name,
                        expression: attribute.value,
                    });
                }
                continue;
            }
            if name.starts_with("on") || name == "template" {
                continue;
            }
            match directive {
                Some(d) if d.is_rendered() => {
                    out.push(AttrBinding {
                        element,
                        attribute: name,
                        expression: attribute.value,
                    });
                    continue;
                }
                Some(_) => continue,
                None => {}
            }

            if name == self.config.model_attribute {
                out.push(self.two_way_binding(element, attribute.value));
                continue;
            }
            if name == TWO_WAY_SHORTHAND {
                // Rewritten to the persisted marker so a later collection
                // still finds the two-way binding
                self.doc.remove_attribute(element, TWO_WAY_SHORTHAND);
                let marker = self.config.model_attribute.clone();
                if let Err(error) = self.doc.set_attribute(element, &marker, &attribute.value) {
                    warn!(%error, ?element, "Failed to persist two-way marker");
                    continue;
                }
                out.push(self.two_way_binding(element, attribute.value));
                continue;
            }

            // The two-way binding owns `value`; a literal one would fight it
            if is_two_way && name == "value" {
                continue;
            }

            let site = BindingSite::Attr(element, name.clone());
            let template = self
                .templates
                .get(&site)
                .cloned()
                .unwrap_or(attribute.value);
            if ALWAYS_BOUND.contains(&name.as_str()) || has_interpolation(&template) {
                self.templates.insert(site, template.clone());
                out.push(AttrBinding {
                    element,
                    attribute: name,
                    expression: template,
                });
            }
        }
    }

    fn two_way_binding(&self, element: NodeId, path: String) -> AttrBinding {
        AttrBinding {
            element,
            attribute: "value".to_string(),
            expression: path,
        }
    }

    fn collect_text(&mut self, text_node: NodeId, out: &mut Vec<InterpBinding>) {
        let site = BindingSite::Text(text_node);
        let template = match self.templates.get(&site) {
            Some(template) => template.clone(),
            None => self.doc.text(text_node).unwrap_or_default().to_string(),
        };
        if has_interpolation(&template) {
            self.templates.insert(site, template.clone());
            out.push(InterpBinding {
                text_node,
                template,
            });
        }
    }

    /// Fill elements carrying `template="id"` with a copy of the matching
    /// `<template>` element's children. Each anchor is resolved once.
    fn resolve_template_anchors(&mut self, node: NodeId) {
        loop {
            let anchors: Vec<NodeId> = self
                .walk_owned(node)
                .into_iter()
                .filter(|id| {
                    self.doc.has_attribute(*id, "template")
                        && self.doc.tag_name(*id) != Some("template")
                        && !self.resolved_anchors.contains(id)
                })
                .collect();
            if anchors.is_empty() {
                return;
            }
            for anchor in anchors {
                self.resolved_anchors.insert(anchor);
                let id = self.doc.attribute(anchor, "template").unwrap_or_default().to_string();
                let source = self
                    .doc
                    .element_by_id(&id)
                    .filter(|t| self.doc.tag_name(*t) == Some("template"));
                let Some(source) = source else {
                    warn!(template = %id, "Template anchor references a missing template");
                    continue;
                };
                let children = self.doc.children(source).to_vec();
                for child in children {
                    let copied = self
                        .doc
                        .clone_subtree(child)
                        .and_then(|copy| self.doc.append_child(anchor, copy));
                    if let Err(error) = copied {
                        warn!(%error, template = %id, "Failed to copy template content");
                    }
                }
                debug!(template = %id, ?anchor, "Template anchor resolved");
            }
        }
    }

    fn mount_nested_hosts(&mut self, root: RootId, node: NodeId) {
        let hosts: Vec<NodeId> = self
            .walk_owned(node)
            .into_iter()
            .filter(|id| *id != node && self.doc.is_element(*id) && self.is_host(*id))
            .collect();
        for host in hosts {
            if let Err(error) = self.mount_host(host, Some(root)) {
                warn!(%error, ?host, "Nested host failed to mount; left as static markup");
            }
        }
    }
}
