//! Event wiring and dispatch.
//!
//! `on<event>[.modifier…]` attributes become listeners that evaluate their
//! expression against the root's scope with `$event` bound, then render the
//! root. Two-way markers get `input`/`change` listeners that write the
//! control's value back into state.

use crate::config::Directive;
use crate::interpreter::{assign, evaluate};
use crate::render::{control_kind, ControlKind};
use crate::runtime::Runtime;
use crate::scheduler::RootId;
use crate::value::{parse_number, Func, KeyMatch, Obj, Value};
use sprout_dom::{Event, NodeId, Phase};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::{debug, trace, warn};

pub type ListenerId = u64;

/// Key aliases exposed on `$event` and accepted as key modifiers
const KEY_ALIASES: &[&str] = &[
    "escape", "esc", "enter", "tab", "space", "up", "down", "left", "right", "delete", "backspace",
];

fn key_matches(alias: &str, key: &str) -> bool {
    match alias {
        "escape" | "esc" => matches!(key, "Escape" | "Esc"),
        "enter" => key == "Enter",
        "tab" => key == "Tab",
        "space" => matches!(key, " " | "Spacebar"),
        "up" => matches!(key, "ArrowUp" | "Up"),
        "down" => matches!(key, "ArrowDown" | "Down"),
        "left" => matches!(key, "ArrowLeft" | "Left"),
        "right" => matches!(key, "ArrowRight" | "Right"),
        "delete" => matches!(key, "Delete" | "Del"),
        "backspace" => key == "Backspace",
        other => key.eq_ignore_ascii_case(other),
    }
}

/// Modifiers parsed from an event attribute name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub prevent: bool,
    pub stop: bool,
    pub once: bool,
    pub outside: bool,
    /// `.window`, `.document` or `.global`
    pub global: bool,
    /// Key filters; the handler runs when any of them matches
    pub keys: Vec<String>,
}

/// Split `onclick.outside.prevent` into the event type and its modifiers
pub fn parse_event_attribute(name: &str) -> Option<(String, Modifiers)> {
    let rest = name.strip_prefix("on")?;
    let mut parts = rest.split('.');
    let event_type = parts.next().filter(|t| !t.is_empty())?.to_string();
    let mut modifiers = Modifiers::default();
    for part in parts {
        match part {
            "prevent" => modifiers.prevent = true,
            "stop" => modifiers.stop = true,
            "once" => modifiers.once = true,
            "outside" => modifiers.outside = true,
            "window" | "document" | "global" => modifiers.global = true,
            "" => {}
            key => modifiers.keys.push(key.to_string()),
        }
    }
    Some((event_type, modifiers))
}

fn is_key_event_type(event_type: &str) -> bool {
    matches!(event_type, "keydown" | "keyup" | "keypress")
}

#[derive(Debug, Clone)]
pub(crate) enum Handler {
    Expression {
        source: String,
        element: NodeId,
        modifiers: Modifiers,
    },
    TwoWay {
        path: String,
        element: NodeId,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Listener {
    root: RootId,
    target: NodeId,
    phase: Phase,
    event_type: String,
    handler: Handler,
}

/// Registered listeners, indexed by the node they are attached to
#[derive(Debug, Default)]
pub(crate) struct ListenerTable {
    next_id: ListenerId,
    listeners: BTreeMap<ListenerId, Listener>,
    by_target: HashMap<NodeId, Vec<ListenerId>>,
}

impl ListenerTable {
    fn add(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = self.next_id;
        self.by_target.entry(listener.target).or_default().push(id);
        self.listeners.insert(id, listener);
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) {
        if let Some(listener) = self.listeners.remove(&id) {
            if let Some(ids) = self.by_target.get_mut(&listener.target) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    self.by_target.remove(&listener.target);
                }
            }
        }
    }

    fn matching(&self, target: NodeId, phase: Phase, event_type: &str) -> Vec<ListenerId> {
        self.by_target
            .get(&target)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| {
                        self.listeners
                            .get(id)
                            .is_some_and(|l| l.phase == phase && l.event_type == event_type)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl Runtime {
    /// Attach listeners for every event attribute and two-way marker owned
    /// by `root`. Returns the number of listeners added.
    pub fn wire_event_handlers(&mut self, root: RootId) -> usize {
        match self.root_node(root) {
            Some(node) => self.wire_subtree(root, node),
            None => {
                warn!(%root, "Wiring requested for unknown root");
                0
            }
        }
    }

    pub(crate) fn wire_subtree(&mut self, root: RootId, start: NodeId) -> usize {
        if self.root_of(start).is_some_and(|owner| owner != root) {
            return 0;
        }
        let root_node = self.root_node(root);
        let mut added = Vec::new();

        for element in self.walk_owned(start) {
            if !self.doc.is_element(element)
                || self.has_directive(element, Directive::Each)
                || (Some(element) != root_node && self.is_host(element))
            {
                continue;
            }

            let model = self
                .doc
                .attribute(element, &self.config.model_attribute)
                .map(str::to_string);
            if let Some(path) = model {
                if self.two_way.insert(element) {
                    let event_type = match (control_kind(self, element), self.doc.tag_name(element)) {
                        (ControlKind::Checkbox | ControlKind::Radio, _) | (_, Some("select")) => "change",
                        _ => "input",
                    };
                    let listener = Listener {
                        root,
                        target: element,
                        phase: Phase::Bubble,
                        event_type: event_type.to_string(),
                        handler: Handler::TwoWay { path, element },
                    };
                    added.push(self.listeners.add(listener));
                }
            }

            let handlers: Vec<(String, String, String, Modifiers)> = self
                .doc
                .attributes(element)
                .iter()
                .filter_map(|attribute| {
                    parse_event_attribute(&attribute.name).map(|(event_type, modifiers)| {
                        (attribute.name.clone(), attribute.value.clone(), event_type, modifiers)
                    })
                })
                .collect();

            for (name, source, event_type, modifiers) in handlers {
                self.doc.remove_attribute(element, &name);
                let document_level = modifiers.outside
                    || source.contains("$event.outside")
                    || (modifiers.global && is_key_event_type(&event_type));
                let (target, phase) = if document_level {
                    (self.doc.root(), Phase::Capture)
                } else {
                    (element, Phase::Bubble)
                };
                trace!(?element, event_type, document_level, "listener attached");
                let listener = Listener {
                    root,
                    target,
                    phase,
                    event_type,
                    handler: Handler::Expression {
                        source,
                        element,
                        modifiers,
                    },
                };
                added.push(self.listeners.add(listener));
            }
        }

        if !added.is_empty() {
            debug!(%root, listeners = added.len(), "Event handlers wired");
        }
        let count = added.len();
        if let Some(state) = self.roots.get_mut(&root) {
            state.listeners.extend(added);
        }
        count
    }

    /// Dispatch `event`: capture listeners from the document down to the
    /// target, then bubble listeners from the target up. Returns `false`
    /// when a handler prevented the default action.
    pub fn dispatch(&mut self, event: Event) -> bool {
        let event = Rc::new(event);
        let path = self.doc.event_path(event.target);
        trace!(event_type = %event.event_type, target = ?event.target, depth = path.len(), "dispatching");

        let phases = path
            .iter()
            .rev()
            .map(|node| (*node, Phase::Capture))
            .chain(path.iter().map(|node| (*node, Phase::Bubble)));
        for (node, phase) in phases {
            for id in self.listeners.matching(node, phase, &event.event_type) {
                // An earlier handler may have removed it
                if let Some(listener) = self.listeners.listeners.get(&id).cloned() {
                    self.run_listener(id, &listener, &event);
                }
            }
            if event.propagation_stopped() {
                break;
            }
        }
        !event.default_prevented()
    }

    fn run_listener(&mut self, id: ListenerId, listener: &Listener, event: &Rc<Event>) {
        let Some(scope) = self.scope(listener.root) else {
            return;
        };
        match &listener.handler {
            Handler::TwoWay { path, element } => {
                let value = self.control_value(*element);
                trace!(path, ?value, "two-way update");
                assign(path, &scope, value);
                self.scheduler.schedule_render(listener.root);
            }
            Handler::Expression {
                source,
                element,
                modifiers,
            } => {
                let document_level = listener.target == self.doc.root() && *element != listener.target;
                if document_level && !self.doc.is_connected(*element) {
                    return;
                }
                if !modifiers.keys.is_empty() {
                    let Some(key) = event.key.as_deref() else {
                        return;
                    };
                    if !modifiers.keys.iter().any(|alias| key_matches(alias, key)) {
                        return;
                    }
                }
                let outside = self.is_outside(*element, event);
                if modifiers.outside && !outside {
                    return;
                }
                if modifiers.prevent {
                    event.prevent_default();
                }
                if modifiers.stop {
                    event.stop_propagation();
                }
                if modifiers.once {
                    self.listeners.remove(id);
                    if let Some(state) = self.roots.get_mut(&listener.root) {
                        state.listeners.retain(|other| *other != id);
                    }
                }

                let event_value = self.event_value(event, outside);
                evaluate(source, &scope, Some(&event_value));
                self.scheduler.schedule_render(listener.root);
                self.render(listener.root);
            }
        }
    }

    /// Whether the event happened outside `element`. Focus transitions look
    /// at where focus went; nowhere counts as outside.
    fn is_outside(&self, element: NodeId, event: &Event) -> bool {
        let subject = if event.is_focus_transition() {
            event.related_target
        } else {
            Some(event.target)
        };
        subject.map_or(true, |node| !self.doc.contains(element, node))
    }

    /// Typed value of a form control for two-way writes
    fn control_value(&self, element: NodeId) -> Value {
        if let ControlKind::Checkbox = control_kind(self, element) {
            return Value::Bool(self.doc.checked(element));
        }
        let raw = self.doc.value(element);
        let numeric = self.doc.tag_name(element) == Some("input")
            && matches!(
                self.doc.attribute(element, "type").map(str::to_ascii_lowercase).as_deref(),
                Some("number" | "range")
            );
        if numeric && !raw.trim().is_empty() {
            let number = parse_number(&raw);
            if !number.is_nan() {
                return Value::Number(number);
            }
        }
        Value::from(raw)
    }

    /// Build the `$event` object handed to handler expressions
    fn event_value(&self, event: &Rc<Event>, outside: bool) -> Value {
        let target = Obj::instance();
        let node = event.target;
        target.insert("value", Value::from(self.doc.value(node)));
        target.insert("checked", Value::Bool(self.doc.checked(node)));
        target.insert(
            "id",
            Value::from(self.doc.attribute(node, "id").unwrap_or_default()),
        );
        target.insert(
            "tagName",
            Value::from(self.doc.tag_name(node).unwrap_or_default().to_ascii_uppercase()),
        );
        target.insert("node", Value::Node(node));

        let view = Obj::instance();
        view.insert("type", Value::from(event.event_type.as_str()));
        view.insert(
            "key",
            event.key.as_deref().map_or(Value::Undefined, Value::from),
        );
        view.insert("target", Value::Object(target));
        view.insert("outside", Value::Bool(outside));

        for alias in KEY_ALIASES {
            let matched = event.key.as_deref().is_some_and(|key| key_matches(alias, key));
            view.insert(*alias, Value::KeyMatch(KeyMatch::new(matched, event.clone())));
        }

        let prevent = event.clone();
        view.insert(
            "preventDefault",
            Value::Function(Func::native("preventDefault", move |_, _| {
                prevent.prevent_default();
                Ok(Value::Undefined)
            })),
        );
        let stop = event.clone();
        view.insert(
            "stopPropagation",
            Value::Function(Func::native("stopPropagation", move |_, _| {
                stop.stop_propagation();
                Ok(Value::Undefined)
            })),
        );
        Value::Object(view)
    }
}
