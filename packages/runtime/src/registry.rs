use crate::value::{Obj, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, warn};

/// Builds the backing instance for a host. Receives the parsed props
/// (`undefined` when the host has none).
pub type Factory = Rc<dyn Fn(&Value) -> Obj>;

/// Name to constructor registry, populated by the embedding application
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
    misses: RefCell<HashSet<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: impl Fn(&Value) -> Obj + 'static) {
        let name = name.into();
        debug!(constructor = %name, "constructor registered");
        self.misses.borrow_mut().remove(&name);
        self.factories.insert(name, Rc::new(factory));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Look up `name`. A miss warns once and is remembered, so repeated
    /// lookups of a missing name are a set probe.
    pub fn resolve(&self, name: &str) -> Option<Factory> {
        if let Some(factory) = self.factories.get(name) {
            return Some(factory.clone());
        }
        if self.misses.borrow_mut().insert(name.to_string()) {
            warn!(constructor = name, "No constructor registered under this name");
        }
        None
    }

    /// Number of distinct names that failed to resolve
    pub fn miss_count(&self) -> usize {
        self.misses.borrow().len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("misses", &self.misses.borrow().len())
            .finish()
    }
}
