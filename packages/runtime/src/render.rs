//! Render pass: recompute every collected binding of a root.

use crate::collector::{AttrBinding, InterpBinding};
use crate::config::Directive;
use crate::interpolation::{has_interpolation, interpolate, unwrap_braces, whole_expression};
use crate::interpreter::{evaluate, try_evaluate};
use crate::normalize::{collapse_whitespace, normalize_class, normalize_style, trim_style};
use crate::runtime::Runtime;
use crate::scheduler::RootId;
use crate::value::{Obj, Value};
use sprout_dom::style::{parse_declarations, serialize_declarations};
use sprout_dom::NodeId;
use tracing::{instrument, trace, warn};

impl Runtime {
    /// Render `root` against its own scope
    pub fn render(&mut self, root: RootId) {
        let Some(scope) = self.scope(root) else {
            warn!(%root, "Render requested for unknown root");
            return;
        };
        self.render_with_scope(root, &scope);
    }

    /// Render the bindings of `root` against `scope`. Directive bindings run
    /// regardless of attachment; the rest skip detached elements.
    #[instrument(skip(self, scope), fields(%root))]
    pub fn render_with_scope(&mut self, root: RootId, scope: &Obj) {
        let Some(state) = self.roots.get_mut(&root) else {
            return;
        };
        state.render_count += 1;
        let attr_bindings = state.attr_bindings.clone();
        let interp_bindings = state.interp_bindings.clone();
        trace!(
            attributes = attr_bindings.len(),
            interpolations = interp_bindings.len(),
            "rendering"
        );

        for binding in attr_bindings.iter() {
            if !self.roots.contains_key(&root) {
                return;
            }
            self.apply_attr_binding(root, binding, scope);
        }
        for binding in interp_bindings.iter() {
            self.apply_interpolation(binding, scope);
        }
    }

    fn apply_attr_binding(&mut self, root: RootId, binding: &AttrBinding, scope: &Obj) {
        let element = binding.element;
        match self.config.directive(&binding.attribute) {
            Some(Directive::If) => {
                let expression = unwrap_braces(&binding.expression);
                return self.render_conditional(root, element, &expression, scope);
            }
            Some(Directive::Show) => {
                let expression = unwrap_braces(&binding.expression);
                return self.render_visibility(root, element, &expression, scope);
            }
            Some(Directive::Each) => {
                return self.render_list(root, element, &binding.expression, scope);
            }
            _ => {}
        }

        if !self.doc.is_connected(element) {
            return;
        }
        let handled = match binding.attribute.as_str() {
            "value" => self.apply_value(binding, scope),
            "class" => self.apply_class(binding, scope),
            "style" => self.apply_style(binding, scope),
            _ => false,
        };
        if !handled {
            self.apply_generic(binding, scope);
        }
    }

    /// Two-way bound form controls. Declines bindings that are not the
    /// element's two-way path.
    fn apply_value(&mut self, binding: &AttrBinding, scope: &Obj) -> bool {
        let element = binding.element;
        let is_model = self
            .doc
            .attribute(element, &self.config.model_attribute)
            .is_some_and(|marker| marker == binding.expression);
        if !is_model {
            return false;
        }

        let value = evaluate(&binding.expression, scope, None);
        match control_kind(self, element) {
            ControlKind::Checkbox => self.set_checked_state(element, value.truthy()),
            ControlKind::Radio => {
                let checked = value.to_text() == self.doc.value(element);
                self.set_checked_state(element, checked);
            }
            ControlKind::Other => {
                let text = value.to_text();
                if self.doc.value(element) != text {
                    self.write(element, |doc| doc.set_value(element, &text));
                }
                if !(value.is_nullish() || matches!(value, Value::Bool(false))) {
                    self.set_attribute_if_changed(element, "value", &text);
                }
            }
        }
        true
    }

    fn set_checked_state(&mut self, element: NodeId, checked: bool) {
        if self.doc.checked(element) != checked {
            self.write(element, |doc| doc.set_checked(element, checked));
        }
        if checked {
            self.set_attribute_if_changed(element, "checked", "");
        } else {
            self.doc.remove_attribute(element, "checked");
        }
    }

    fn apply_class(&mut self, binding: &AttrBinding, scope: &Obj) -> bool {
        if !has_interpolation(&binding.expression) {
            return false;
        }
        let rendered = interpolate(&binding.expression, |expression| {
            normalize_class(&evaluate(expression, scope, None))
        });
        let class = collapse_whitespace(&rendered);
        if class.is_empty() {
            self.doc.remove_attribute(binding.element, "class");
        } else {
            self.set_attribute_if_changed(binding.element, "class", &class);
        }
        true
    }

    fn apply_style(&mut self, binding: &AttrBinding, scope: &Obj) -> bool {
        if !has_interpolation(&binding.expression) {
            return false;
        }
        let rendered = interpolate(&binding.expression, |expression| {
            normalize_style(&evaluate(expression, scope, None))
        });
        let mut style = trim_style(&rendered).to_string();
        let owned = self.directive_style(binding.element);
        if !owned.is_empty() {
            let mut declarations = parse_declarations(&style);
            declarations.retain(|(name, _)| !owned.iter().any(|(kept, _)| kept == name));
            declarations.extend(owned);
            style = serialize_declarations(&declarations);
        }
        if style.is_empty() {
            self.doc.remove_attribute(binding.element, "style");
        } else {
            self.set_attribute_if_changed(binding.element, "style", &style);
        }
        true
    }

    /// `false` and nullish remove the attribute, `true` sets it empty,
    /// anything else is written as its display string
    fn apply_generic(&mut self, binding: &AttrBinding, scope: &Obj) {
        let value = binding_value(&binding.expression, scope);
        let (element, name) = (binding.element, binding.attribute.as_str());
        match value {
            Value::Bool(false) | Value::Null | Value::Undefined => {
                self.doc.remove_attribute(element, name);
            }
            Value::Bool(true) => self.set_attribute_if_changed(element, name, ""),
            other => self.set_attribute_if_changed(element, name, &other.to_display()),
        }
    }

    fn apply_interpolation(&mut self, binding: &InterpBinding, scope: &Obj) {
        let text = interpolate(&binding.template, |expression| {
            evaluate(expression, scope, None).to_text()
        });
        if self.doc.text(binding.text_node) != Some(text.as_str()) {
            let node = binding.text_node;
            self.write(node, |doc| doc.set_text(node, &text));
        }
    }

    pub(crate) fn set_attribute_if_changed(&mut self, element: NodeId, name: &str, value: &str) {
        if self.doc.attribute(element, name) != Some(value) {
            self.write(element, |doc| doc.set_attribute(element, name, value));
        }
    }

    /// Run a document write, logging rather than propagating failures
    pub(crate) fn write(
        &mut self,
        node: NodeId,
        op: impl FnOnce(&mut sprout_dom::Document) -> sprout_dom::DomResult<()>,
    ) {
        if let Err(error) = op(&mut self.doc) {
            warn!(%error, ?node, "Document write failed");
        }
    }
}

/// Attribute value semantics: a lone `{expr}` yields the evaluated value,
/// mixed text interpolates to a string, and brace-less text is itself the
/// expression. Text that does not evaluate (`value="red"` on an option, a
/// bare boolean attribute) stays as written.
fn binding_value(raw: &str, scope: &Obj) -> Value {
    if let Some(expression) = whole_expression(raw) {
        evaluate(&expression, scope, None)
    } else if has_interpolation(raw) {
        Value::from(interpolate(raw, |expression| {
            evaluate(expression, scope, None).to_text()
        }))
    } else if raw.trim().is_empty() {
        Value::string(raw)
    } else {
        try_evaluate(&unwrap_braces(raw), scope, None).unwrap_or_else(|error| {
            trace!(raw, %error, "attribute kept literally");
            Value::string(raw)
        })
    }
}

pub(crate) enum ControlKind {
    Checkbox,
    Radio,
    Other,
}

pub(crate) fn control_kind(runtime: &Runtime, element: NodeId) -> ControlKind {
    if runtime.doc.tag_name(element) != Some("input") {
        return ControlKind::Other;
    }
    match runtime
        .doc
        .attribute(element, "type")
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("checkbox") => ControlKind::Checkbox,
        Some("radio") => ControlKind::Radio,
        _ => ControlKind::Other,
    }
}
