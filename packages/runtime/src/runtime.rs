//! # Sprout Runtime
//!
//! Owns the document, the render scheduler and every piece of per-root state.
//!
//! ## Lifecycle
//!
//! Mounting a host element builds its scope (constructor instance plus
//! `s-state` JSON), tracks it, collects bindings, renders once, wires event
//! handlers and finally calls `onMount`. Writes to tracked state queue the
//! owning roots; [`Runtime::flush`] drains the queue. [`Runtime::destroy`]
//! tears a root down depth-first and calls `onDestroy`.
//!
//! ## Ownership
//!
//! A root owns the nodes under its host element up to, but excluding, any
//! nested host. Directive placeholders stand in for the detached elements
//! they anchor, so re-collection still sees them.

use crate::collector::{AttrBinding, BindingSite, InterpBinding};
use crate::config::{Directive, RuntimeConfig};
use crate::directives::transition::Clock;
use crate::directives::DirectiveTables;
use crate::error::{RuntimeError, RuntimeResult};
use crate::events::ListenerTable;
use crate::registry::Registry;
use crate::scheduler::{RootId, Scheduler};
use crate::store;
use crate::value::{Obj, Value};
use sprout_dom::{Document, NodeId};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info, instrument, warn};

/// Per-root bookkeeping
#[derive(Debug)]
pub(crate) struct RootState {
    pub(crate) node: NodeId,
    pub(crate) scope: Obj,
    pub(crate) parent: Option<RootId>,
    pub(crate) children: Vec<RootId>,
    pub(crate) attr_bindings: Rc<Vec<AttrBinding>>,
    pub(crate) interp_bindings: Rc<Vec<InterpBinding>>,
    pub(crate) listeners: Vec<u64>,
    /// Elements whose directive state this root created
    pub(crate) directive_elements: Vec<NodeId>,
    pub(crate) render_count: usize,
}

impl RootState {
    fn new(node: NodeId, scope: Obj, parent: Option<RootId>) -> Self {
        Self {
            node,
            scope,
            parent,
            children: Vec::new(),
            attr_bindings: Rc::default(),
            interp_bindings: Rc::default(),
            listeners: Vec::new(),
            directive_elements: Vec::new(),
            render_count: 0,
        }
    }
}

pub struct Runtime {
    pub(crate) doc: Document,
    pub(crate) config: RuntimeConfig,
    pub(crate) scheduler: Scheduler,
    pub(crate) registry: Registry,
    pub(crate) roots: HashMap<RootId, RootState>,
    pub(crate) root_by_node: HashMap<NodeId, RootId>,
    next_root: u32,
    /// Original attribute/text templates, so re-collection sees the source
    /// rather than rendered output
    pub(crate) templates: HashMap<BindingSite, String>,
    pub(crate) resolved_anchors: HashSet<NodeId>,
    /// Directive placeholder comment to the element it anchors
    pub(crate) placeholders: HashMap<NodeId, NodeId>,
    pub(crate) directives: DirectiveTables,
    pub(crate) clock: Clock,
    pub(crate) listeners: ListenerTable,
    pub(crate) two_way: HashSet<NodeId>,
}

impl Runtime {
    pub fn new(doc: Document) -> Self {
        Self::with_config(doc, RuntimeConfig::default())
    }

    pub fn with_config(doc: Document, config: RuntimeConfig) -> Self {
        Self {
            doc,
            config,
            scheduler: Scheduler::new(),
            registry: Registry::new(),
            roots: HashMap::new(),
            root_by_node: HashMap::new(),
            next_root: 1,
            templates: HashMap::new(),
            resolved_anchors: HashSet::new(),
            placeholders: HashMap::new(),
            directives: DirectiveTables::default(),
            clock: Clock::default(),
            listeners: ListenerTable::default(),
            two_way: HashSet::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Direct document access. Structural edits under mounted roots are
    /// only picked up by a later [`Runtime::collect_bindings_for_root`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn is_mounted(&self, root: RootId) -> bool {
        self.roots.contains_key(&root)
    }

    /// Root whose host element is `node`
    pub fn root_of(&self, node: NodeId) -> Option<RootId> {
        self.root_by_node.get(&node).copied()
    }

    pub fn root_node(&self, root: RootId) -> Option<NodeId> {
        self.roots.get(&root).map(|state| state.node)
    }

    pub fn scope(&self, root: RootId) -> Option<Obj> {
        self.roots.get(&root).map(|state| state.scope.clone())
    }

    pub fn parent_root(&self, root: RootId) -> Option<RootId> {
        self.roots.get(&root).and_then(|state| state.parent)
    }

    pub fn child_roots(&self, root: RootId) -> Vec<RootId> {
        self.roots
            .get(&root)
            .map(|state| state.children.clone())
            .unwrap_or_default()
    }

    pub fn render_count(&self, root: RootId) -> usize {
        self.roots.get(&root).map_or(0, |state| state.render_count)
    }

    pub fn attr_bindings(&self, root: RootId) -> Vec<AttrBinding> {
        self.roots
            .get(&root)
            .map(|state| state.attr_bindings.to_vec())
            .unwrap_or_default()
    }

    pub fn interp_bindings(&self, root: RootId) -> Vec<InterpBinding> {
        self.roots
            .get(&root)
            .map(|state| state.interp_bindings.to_vec())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, root: RootId) -> usize {
        self.roots.get(&root).map_or(0, |state| state.listeners.len())
    }

    /// Mounted roots, oldest first
    pub fn roots(&self) -> Vec<RootId> {
        let mut roots: Vec<RootId> = self.roots.keys().copied().collect();
        roots.sort();
        roots
    }

    /// Track `value` on behalf of `root`
    pub fn make_reactive(&self, value: &Value, root: RootId, is_root_scope: bool) -> Value {
        store::make_reactive(value, root, &self.scheduler, is_root_scope)
    }

    // ---------------------------------------------------------------------
    // Mounting
    // ---------------------------------------------------------------------

    /// Mount every top-level host in the document. Hosts nested inside
    /// another host are mounted by their parent's collection pass.
    #[instrument(skip(self))]
    pub fn mount_all(&mut self) -> Vec<RootId> {
        let hosts = self.top_level_hosts();
        let mut mounted = Vec::new();
        for host in hosts {
            match self.mount(host) {
                Ok(root) => mounted.push(root),
                Err(error) => warn!(%error, ?host, "Mount failed; host left as static markup"),
            }
        }
        info!(roots = mounted.len(), "Mounted document");
        mounted
    }

    /// Mount `element` as a top-level root
    pub fn mount(&mut self, element: NodeId) -> RuntimeResult<RootId> {
        self.mount_host(element, None)
    }

    /// Mount `element` with a caller supplied scope instead of reading its
    /// state/constructor attributes
    pub fn mount_with_scope(&mut self, element: NodeId, scope: Obj) -> RuntimeResult<RootId> {
        if !self.doc.is_element(element) {
            return Err(RuntimeError::NotAnElement(element));
        }
        if let Some(existing) = self.root_of(element) {
            return Ok(existing);
        }
        Ok(self.mount_root(element, scope, None))
    }

    pub(crate) fn mount_host(&mut self, element: NodeId, parent: Option<RootId>) -> RuntimeResult<RootId> {
        if !self.doc.is_element(element) {
            return Err(RuntimeError::NotAnElement(element));
        }
        if let Some(existing) = self.root_of(element) {
            return Ok(existing);
        }
        let scope = self.build_scope(element)?;
        Ok(self.mount_root(element, scope, parent))
    }

    #[instrument(skip(self, scope), fields(?element))]
    fn mount_root(&mut self, element: NodeId, scope: Obj, parent: Option<RootId>) -> RootId {
        let root = self.register_root(element, scope.clone(), parent);
        self.make_reactive(&Value::Object(scope), root, true);
        self.collect_bindings_for_root(root);
        self.render(root);
        self.wire_event_handlers(root);
        self.call_hook(root, "onMount");
        debug!(%root, "Root mounted");
        root
    }

    pub(crate) fn register_root(&mut self, node: NodeId, scope: Obj, parent: Option<RootId>) -> RootId {
        let root = RootId(self.next_root);
        self.next_root += 1;
        self.roots.insert(root, RootState::new(node, scope, parent));
        self.root_by_node.insert(node, root);
        if let Some(state) = parent.and_then(|p| self.roots.get_mut(&p)) {
            state.children.push(root);
        }
        root
    }

    /// Swap the scope a root renders against, moving its observer
    /// registration along
    pub(crate) fn replace_scope(&mut self, root: RootId, scope: Obj) {
        if let Some(state) = self.roots.get_mut(&root) {
            let previous = std::mem::replace(&mut state.scope, scope);
            store::release(&Value::Object(previous), root);
        }
    }

    fn build_scope(&self, element: NodeId) -> RuntimeResult<Obj> {
        let scope = match self.directive_value(element, Directive::Use) {
            Some(name) => {
                let name = name.trim().to_string();
                let factory = self
                    .registry
                    .resolve(&name)
                    .ok_or(RuntimeError::UnknownConstructor { name })?;
                let props = self
                    .directive_value(element, Directive::Props)
                    .map(|json| self.parse_props(&json))
                    .unwrap_or_default();
                factory(&props)
            }
            None => Obj::new(),
        };

        if let Some(json) = self.directive_value(element, Directive::State) {
            if !json.trim().is_empty() {
                match parse_state(&json) {
                    Ok(state) => {
                        for (key, value) in state.entries() {
                            scope.insert(key, value);
                        }
                    }
                    Err(error) => warn!(%error, ?element, "Malformed state JSON; using empty state"),
                }
            }
        }
        Ok(scope)
    }

    fn parse_props(&self, json: &str) -> Value {
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(parsed) => Value::from_json(&parsed),
            Err(error) => {
                warn!(%error, "Malformed props JSON; passing undefined");
                Value::Undefined
            }
        }
    }

    /// Hosts not nested inside another host, in document order
    fn top_level_hosts(&self) -> Vec<NodeId> {
        let mut hosts = Vec::new();
        let mut stack = vec![self.doc.root()];
        while let Some(node) = stack.pop() {
            if self.doc.is_element(node) && self.is_host(node) {
                hosts.push(node);
                continue;
            }
            if self.doc.tag_name(node) == Some("template") {
                continue;
            }
            stack.extend(self.doc.children(node).iter().rev().copied());
        }
        hosts
    }

    fn call_hook(&self, root: RootId, hook: &str) {
        let Some(scope) = self.scope(root) else {
            return;
        };
        if let Some(Value::Function(func)) = scope.get(hook) {
            if let Err(error) = func.call(&Value::Object(scope), Vec::new()) {
                warn!(%root, hook, %error, "Lifecycle hook failed");
            }
        }
    }

    // ---------------------------------------------------------------------
    // Teardown
    // ---------------------------------------------------------------------

    /// Destroy `root` and its descendants: listeners removed, state
    /// unobserved, directive bookkeeping dropped, then `onDestroy`.
    /// Nodes stay where they are.
    #[instrument(skip(self))]
    pub fn destroy(&mut self, root: RootId) {
        for child in self.child_roots(root) {
            self.destroy(child);
        }
        let Some(state) = self.roots.remove(&root) else {
            return;
        };

        for id in &state.listeners {
            self.listeners.remove(*id);
        }
        store::release(&Value::Object(state.scope.clone()), root);
        for element in &state.directive_elements {
            self.drop_directive_state(*element);
        }
        if self.root_by_node.get(&state.node) == Some(&root) {
            self.root_by_node.remove(&state.node);
        }
        if let Some(parent) = state.parent.and_then(|p| self.roots.get_mut(&p)) {
            parent.children.retain(|child| *child != root);
        }

        let owned: HashSet<NodeId> = self.doc.descendants(state.node).into_iter().collect();
        self.two_way.retain(|node| !owned.contains(node));
        self.templates.retain(|site, _| !owned.contains(&site.node()));

        if let Some(Value::Function(func)) = state.scope.get("onDestroy") {
            if let Err(error) = func.call(&Value::Object(state.scope.clone()), Vec::new()) {
                warn!(%root, %error, "onDestroy hook failed");
            }
        }
        let released = state.scope.release_closures();
        debug!(%root, listeners = state.listeners.len(), released, "Root destroyed");
    }

    // ---------------------------------------------------------------------
    // Scheduling
    // ---------------------------------------------------------------------

    /// Render every queued root. Renders that queue further work run in
    /// follow-up passes, bounded by `max_flush_passes`. Returns the number of
    /// renders performed.
    pub fn flush(&mut self) -> usize {
        let mut rendered = 0;
        for _ in 0..self.config.max_flush_passes {
            let batch = self.scheduler.take_batch();
            if batch.is_empty() {
                return rendered;
            }
            for root in batch {
                self.scheduler.begin_render(root);
                if self.roots.contains_key(&root) {
                    self.render(root);
                    rendered += 1;
                } else {
                    debug!(%root, "Skipping render for unmounted root");
                }
            }
        }
        let pending = self.scheduler.pending_count();
        if pending > 0 {
            warn!(
                passes = self.config.max_flush_passes,
                pending, "Flush pass limit reached; renders left queued"
            );
        }
        rendered
    }

    // ---------------------------------------------------------------------
    // Directive helpers
    // ---------------------------------------------------------------------

    /// Value of the first attribute on `node` spelling `directive`
    pub(crate) fn directive_value(&self, node: NodeId, directive: Directive) -> Option<String> {
        self.config
            .directive_names(directive)
            .iter()
            .find_map(|name| self.doc.attribute(node, name))
            .map(str::to_string)
    }

    pub(crate) fn has_directive(&self, node: NodeId, directive: Directive) -> bool {
        self.config
            .directive_names(directive)
            .iter()
            .any(|name| self.doc.has_attribute(node, name))
    }

    pub(crate) fn is_host(&self, node: NodeId) -> bool {
        self.has_directive(node, Directive::State) || self.has_directive(node, Directive::Use)
    }

    /// Nodes owned by the root rendering at `start`, in document order.
    ///
    /// Nested roots are skipped along with their subtrees. Hosts, list
    /// holders and raw text elements are listed but not descended into.
    /// A placeholder whose element is detached yields that element instead.
    pub(crate) fn walk_owned(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(mut node) = stack.pop() {
            if let Some(owner) = self.placeholders.get(&node) {
                if self.doc.parent(*owner).is_none() {
                    node = *owner;
                }
            }
            if node != start && self.root_by_node.contains_key(&node) {
                continue;
            }
            out.push(node);
            if !self.doc.is_element(node) {
                continue;
            }
            if node != start && self.is_host(node) {
                continue;
            }
            if self.has_directive(node, Directive::Each)
                || matches!(
                    self.doc.tag_name(node),
                    Some("template" | "script" | "style")
                )
            {
                continue;
            }
            stack.extend(self.doc.children(node).iter().rev().copied());
        }
        out
    }

    pub(crate) fn track_directive(&mut self, root: RootId, element: NodeId) {
        if let Some(state) = self.roots.get_mut(&root) {
            if !state.directive_elements.contains(&element) {
                state.directive_elements.push(element);
            }
        }
    }

    fn drop_directive_state(&mut self, element: NodeId) {
        if let Some(state) = self.directives.conditionals.remove(&element) {
            self.placeholders.remove(&state.placeholder);
        }
        if let Some(state) = self.directives.lists.remove(&element) {
            self.placeholders.remove(&state.placeholder);
        }
        self.directives.visibility.remove(&element);
        self.clock.forget(element);
    }
}

fn parse_state(json: &str) -> RuntimeResult<Obj> {
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).map_err(RuntimeError::InvalidState)?;
    Ok(Obj::from_entries(
        map.iter().map(|(key, value)| (key.clone(), Value::from_json(value))),
    ))
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("roots", &self.roots.len())
            .field("listeners", &self.listeners.len())
            .field("pending", &self.scheduler.pending_count())
            .field("registry", &self.registry)
            .finish()
    }
}
