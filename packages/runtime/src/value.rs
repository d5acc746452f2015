//! Runtime values.
//!
//! Objects and arrays are shared handles: cloning a [`Value::Object`] clones
//! the `Rc`, so identity is the allocation and "same source, same wrapper"
//! holds by construction. Each handle carries a [`Tracking`] record listing the
//! roots that observe it; writes through the handle schedule those roots.

use crate::error::{EvalError, EvalResult};
use crate::interpreter::Env;
use crate::scheduler::{RootId, Scheduler};
use indexmap::IndexMap;
use sprout_dom::{Event, NodeId};
use sprout_expr::Expression;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

/// Observer bookkeeping attached to every object and array
#[derive(Debug, Default)]
pub struct Tracking {
    observers: RefCell<Vec<RootId>>,
    scheduler: RefCell<Option<Scheduler>>,
    bind_methods: Cell<bool>,
}

impl Tracking {
    pub fn observers(&self) -> Vec<RootId> {
        self.observers.borrow().clone()
    }

    pub fn is_tracked(&self) -> bool {
        !self.observers.borrow().is_empty()
    }

    pub fn is_observed_by(&self, root: RootId) -> bool {
        self.observers.borrow().contains(&root)
    }

    /// Whether bare-identifier calls of functions stored here bind `this`
    pub fn binds_methods(&self) -> bool {
        self.bind_methods.get()
    }

    pub(crate) fn set_binds_methods(&self) {
        self.bind_methods.set(true);
    }

    /// Register `root`; returns false when it was already observing
    pub(crate) fn observe(&self, root: RootId, scheduler: &Scheduler) -> bool {
        self.scheduler.borrow_mut().get_or_insert_with(|| scheduler.clone());
        let mut observers = self.observers.borrow_mut();
        if observers.contains(&root) {
            return false;
        }
        observers.push(root);
        true
    }

    pub(crate) fn unobserve(&self, root: RootId) {
        self.observers.borrow_mut().retain(|r| *r != root);
    }

    /// Copy `parent`'s observers onto this record
    pub(crate) fn adopt(&self, parent: &Tracking) {
        let inherited = parent.observers.borrow().clone();
        if inherited.is_empty() {
            return;
        }
        let scheduler = parent.scheduler.borrow().clone();
        {
            let mut observers = self.observers.borrow_mut();
            for root in inherited {
                if !observers.contains(&root) {
                    observers.push(root);
                }
            }
        }
        if self.scheduler.borrow().is_none() {
            *self.scheduler.borrow_mut() = scheduler;
        }
    }

    /// Schedule a render for every observing root
    pub(crate) fn notify(&self) {
        let scheduler = self.scheduler.borrow().clone();
        let Some(scheduler) = scheduler else {
            return;
        };
        let observers = self.observers.borrow().clone();
        for root in observers {
            scheduler.schedule_render(root);
        }
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

pub struct ObjCell {
    props: RefCell<IndexMap<String, Value>>,
    proto: Option<Obj>,
    plain: bool,
    tracking: Tracking,
}

/// Shared, insertion-ordered object. Also used for scopes: an item scope is
/// an object whose `proto` is the enclosing scope.
#[derive(Clone)]
pub struct Obj(Rc<ObjCell>);

impl Obj {
    fn build(proto: Option<Obj>, plain: bool) -> Self {
        Obj(Rc::new(ObjCell {
            props: RefCell::new(IndexMap::new()),
            proto,
            plain,
            tracking: Tracking::default(),
        }))
    }

    /// Plain object; tracked lazily when read through a tracked parent
    pub fn new() -> Self {
        Self::build(None, true)
    }

    /// Constructor-built object. Never tracked implicitly.
    pub fn instance() -> Self {
        Self::build(None, false)
    }

    /// Scope layered over `parent`: lookups fall through to it
    pub fn with_proto(parent: &Obj) -> Self {
        Self::build(Some(parent.clone()), true)
    }

    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let obj = Self::new();
        {
            let mut props = obj.0.props.borrow_mut();
            for (key, value) in entries {
                props.insert(key.into(), value);
            }
        }
        obj
    }

    pub fn proto(&self) -> Option<&Obj> {
        self.0.proto.as_ref()
    }

    pub fn is_plain(&self) -> bool {
        self.0.plain
    }

    pub fn tracking(&self) -> &Tracking {
        &self.0.tracking
    }

    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    fn adopt_child(&self, value: &Value) {
        if !self.0.tracking.is_tracked() {
            return;
        }
        match value {
            Value::Object(child) if child.is_plain() && !child.ptr_eq(self) => {
                child.tracking().adopt(&self.0.tracking)
            }
            Value::Array(child) => child.tracking().adopt(&self.0.tracking),
            _ => {}
        }
    }

    /// Own property, tracking plain children with this object's observers
    pub fn get_own(&self, key: &str) -> Option<Value> {
        let value = self.0.props.borrow().get(key).cloned()?;
        self.adopt_child(&value);
        Some(value)
    }

    /// Property lookup through the proto chain
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key).map(|(value, _)| value)
    }

    /// Property lookup returning the owning object as well
    pub fn lookup(&self, key: &str) -> Option<(Value, Obj)> {
        let mut current = Some(self);
        while let Some(obj) = current {
            if let Some(value) = obj.get_own(key) {
                return Some((value, obj.clone()));
            }
            current = obj.proto();
        }
        None
    }

    /// Whether `other` is this object or one of its protos
    pub fn reaches(&self, other: &Obj) -> bool {
        let mut current = Some(self);
        while let Some(obj) = current {
            if obj.ptr_eq(other) {
                return true;
            }
            current = obj.proto();
        }
        false
    }

    /// Drop own functions whose closure holds this object. Such functions
    /// form an `Rc` cycle through the object and would otherwise never be
    /// freed. Returns the number removed.
    pub fn release_closures(&self) -> usize {
        let mut props = self.0.props.borrow_mut();
        let before = props.len();
        props.retain(|_, value| !matches!(value, Value::Function(func) if func.captures(self)));
        before - props.len()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// First object in the chain that owns `key`
    pub fn owner_of(&self, key: &str) -> Option<Obj> {
        let mut current = Some(self);
        while let Some(obj) = current {
            if obj.has_own(key) {
                return Some(obj.clone());
            }
            current = obj.proto();
        }
        None
    }

    /// Write a property and notify observers
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.0.props.borrow_mut().insert(key.into(), value);
        self.0.tracking.notify();
    }

    /// Write without notifying; for building values before they are shared
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.0.props.borrow_mut().insert(key.into(), value);
    }

    /// Remove an own property and notify observers
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.0.props.borrow_mut().shift_remove(key).is_some();
        self.0.tracking.notify();
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.props.borrow().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        let entries: Vec<_> = self
            .0
            .props
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (_, value) in &entries {
            self.adopt_child(value);
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Obj {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Obj")
            .field("keys", &self.keys())
            .field("plain", &self.is_plain())
            .field("observers", &self.tracking().observers())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

/// Longest array an index or `length` write may grow
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

fn check_array_length(len: usize) -> EvalResult<()> {
    if len > MAX_ARRAY_LENGTH {
        return Err(EvalError::native("RangeError", "Invalid array length"));
    }
    Ok(())
}

pub struct ArrCell {
    items: RefCell<Vec<Value>>,
    tracking: Tracking,
}

#[derive(Clone)]
pub struct Arr(Rc<ArrCell>);

impl Arr {
    pub fn new(items: Vec<Value>) -> Self {
        Arr(Rc::new(ArrCell {
            items: RefCell::new(items),
            tracking: Tracking::default(),
        }))
    }

    pub fn tracking(&self) -> &Tracking {
        &self.0.tracking
    }

    pub fn ptr_eq(&self, other: &Arr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    fn adopt_child(&self, value: &Value) {
        if !self.0.tracking.is_tracked() {
            return;
        }
        match value {
            Value::Object(child) if child.is_plain() => child.tracking().adopt(&self.0.tracking),
            Value::Array(child) if !child.ptr_eq(self) => child.tracking().adopt(&self.0.tracking),
            _ => {}
        }
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        let value = self.0.items.borrow().get(index).cloned()?;
        self.adopt_child(&value);
        Some(value)
    }

    /// Snapshot of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        let items = self.0.items.borrow().clone();
        for item in &items {
            self.adopt_child(item);
        }
        items
    }

    /// Index write; grows the array with `undefined` holes when needed
    pub fn set(&self, index: usize, value: Value) -> EvalResult<()> {
        check_array_length(index.saturating_add(1))?;
        {
            let mut items = self.0.items.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value;
        }
        self.0.tracking.notify();
        Ok(())
    }

    /// Truncate or extend (with `undefined`) to `len`
    pub fn set_len(&self, len: usize) -> EvalResult<()> {
        check_array_length(len)?;
        self.0.items.borrow_mut().resize(len, Value::Undefined);
        self.0.tracking.notify();
        Ok(())
    }

    pub fn push(&self, values: Vec<Value>) -> usize {
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.extend(values);
            items.len()
        };
        self.0.tracking.notify();
        len
    }

    pub fn pop(&self) -> Option<Value> {
        let value = self.0.items.borrow_mut().pop();
        self.0.tracking.notify();
        value
    }

    pub fn shift(&self) -> Option<Value> {
        let value = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.0.tracking.notify();
        value
    }

    pub fn unshift(&self, values: Vec<Value>) -> usize {
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.splice(0..0, values);
            items.len()
        };
        self.0.tracking.notify();
        len
    }

    /// Remove `delete_count` items at `start` and insert `insert` there.
    /// `start` and `delete_count` are clamped to the array bounds.
    pub fn splice(&self, start: usize, delete_count: usize, insert: Vec<Value>) -> Vec<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, insert).collect()
        };
        self.0.tracking.notify();
        removed
    }

    pub fn reverse(&self) {
        self.0.items.borrow_mut().reverse();
        self.0.tracking.notify();
    }
}

impl fmt::Debug for Arr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arr")
            .field("len", &self.len())
            .field("observers", &self.tracking().observers())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

pub type NativeFn = Box<dyn Fn(&Value, Vec<Value>) -> EvalResult<Value>>;

pub enum Callable {
    /// Arrow function closing over its defining environment
    Closure {
        params: Vec<String>,
        body: Rc<Expression>,
        env: Env,
    },
    /// Host function; receives `this` and the arguments
    Native { name: String, call: NativeFn },
    /// Function with `this` fixed
    Bound { target: Func, this: Value },
}

#[derive(Clone)]
pub struct Func(pub(crate) Rc<Callable>);

impl Func {
    pub fn native(
        name: impl Into<String>,
        call: impl Fn(&Value, Vec<Value>) -> EvalResult<Value> + 'static,
    ) -> Self {
        Func(Rc::new(Callable::Native {
            name: name.into(),
            call: Box::new(call),
        }))
    }

    pub(crate) fn closure(params: Vec<String>, body: Rc<Expression>, env: Env) -> Self {
        Func(Rc::new(Callable::Closure { params, body, env }))
    }

    /// Fix `this` for every later call
    pub fn bind(&self, this: Value) -> Self {
        if let Callable::Bound { .. } = &*self.0 {
            return self.clone();
        }
        Func(Rc::new(Callable::Bound {
            target: self.clone(),
            this,
        }))
    }

    pub fn name(&self) -> &str {
        match &*self.0 {
            Callable::Closure { .. } => "anonymous",
            Callable::Native { name, .. } => name,
            Callable::Bound { target, .. } => target.name(),
        }
    }

    pub fn ptr_eq(&self, other: &Func) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether the closure's environment or bound `this` holds `scope`
    pub(crate) fn captures(&self, scope: &Obj) -> bool {
        let holds = |value: &Value| matches!(value, Value::Object(obj) if obj.ptr_eq(scope));
        match &*self.0 {
            Callable::Closure { env, .. } => env.scope.reaches(scope) || holds(&env.this),
            Callable::Bound { target, this } => holds(this) || target.captures(scope),
            Callable::Native { .. } => false,
        }
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({})", self.name())
    }
}

// ---------------------------------------------------------------------------
// Key match
// ---------------------------------------------------------------------------

/// Result of a key alias such as `$event.escape`.
///
/// Truthy iff the key matched. `.prevent`/`.stop` apply to the event only
/// when it matched and return the same match so they chain.
#[derive(Debug, Clone)]
pub struct KeyMatch {
    pub matched: bool,
    pub(crate) event: Rc<Event>,
}

impl KeyMatch {
    pub(crate) fn new(matched: bool, event: Rc<Event>) -> Self {
        Self { matched, event }
    }

    pub(crate) fn apply(&self, modifier: &str) -> Option<Value> {
        match modifier {
            "prevent" => {
                if self.matched {
                    self.event.prevent_default();
                }
            }
            "stop" => {
                if self.matched {
                    self.event.stop_propagation();
                }
            }
            _ => return None,
        }
        Some(Value::KeyMatch(self.clone()))
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Arr),
    Object(Obj),
    Function(Func),
    /// Reference to a document node
    Node(NodeId),
    KeyMatch(KeyMatch),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arr::new(items))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::KeyMatch(m) => m.matched,
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_) => true,
        }
    }

    pub fn as_obj(&self) -> Option<&Obj> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_arr(&self) -> Option<&Arr> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Func> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) | Value::KeyMatch(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Node(_) => "object",
        }
    }

    /// Numeric coercion
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::KeyMatch(m) => f64::from(u8::from(m.matched)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(_) => parse_number(&self.to_display()),
            Value::Object(_) | Value::Function(_) | Value::Node(_) => f64::NAN,
        }
    }

    /// String coercion
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::KeyMatch(m) => m.matched.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Array(arr) => arr
                .to_vec()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(func) => format!("function {}() {{ [native code] }}", func.name()),
            Value::Node(_) => "[object Node]".to_string(),
        }
    }

    /// Interpolation text: like [`Value::to_display`] but nullish is empty
    pub fn to_text(&self) -> String {
        if self.is_nullish() {
            String::new()
        } else {
            self.to_display()
        }
    }

    /// `===`
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::KeyMatch(a), Value::KeyMatch(b)) => a.matched == b.matched,
            _ => false,
        }
    }

    /// `==`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_))
            | (Value::KeyMatch(_), _)
            | (_, Value::KeyMatch(_)) => self.to_number() == other.to_number(),
            (Value::Array(_), Value::String(_)) | (Value::String(_), Value::Array(_)) => {
                self.to_display() == other.to_display()
            }
            _ => self.strict_eq(other),
        }
    }

    /// SameValueZero, used by `includes`
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_eq(other),
        }
    }

    /// Hashable identity used for list keys; `None` for nullish values
    pub fn identity_key(&self) -> Option<String> {
        match self {
            Value::Undefined | Value::Null => None,
            Value::Bool(b) => Some(format!("b:{b}")),
            Value::KeyMatch(m) => Some(format!("b:{}", m.matched)),
            Value::Number(n) => Some(format!("n:{}", format_number(*n))),
            Value::String(s) => Some(format!("s:{s}")),
            Value::Array(a) => Some(format!("a:{:p}", a.as_ptr())),
            Value::Object(o) => Some(format!("o:{:p}", o.as_ptr())),
            Value::Function(f) => Some(format!("f:{:p}", Rc::as_ptr(&f.0))),
            Value::Node(id) => Some(format!("d:{}", id.index())),
        }
    }

    /// Convert parsed JSON into fresh plain values
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(Obj::from_entries(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))),
            )),
        }
    }

    /// JSON form. `None` for values JSON omits (undefined, functions).
    pub fn to_json(&self) -> EvalResult<Option<serde_json::Value>> {
        self.to_json_inner(&mut Vec::new())
    }

    fn to_json_inner(&self, stack: &mut Vec<*const ()>) -> EvalResult<Option<serde_json::Value>> {
        let json = match self {
            Value::Undefined | Value::Function(_) => return Ok(None),
            Value::Null | Value::Node(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::KeyMatch(m) => serde_json::Value::Bool(m.matched),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(arr) => {
                let ptr = arr.as_ptr();
                if stack.contains(&ptr) {
                    return Err(EvalError::native("JSON.stringify", "circular structure"));
                }
                stack.push(ptr);
                let mut items = Vec::with_capacity(arr.len());
                for item in arr.to_vec() {
                    items.push(item.to_json_inner(stack)?.unwrap_or(serde_json::Value::Null));
                }
                stack.pop();
                serde_json::Value::Array(items)
            }
            Value::Object(obj) => {
                let ptr = obj.as_ptr();
                if stack.contains(&ptr) {
                    return Err(EvalError::native("JSON.stringify", "circular structure"));
                }
                stack.push(ptr);
                let mut map = serde_json::Map::new();
                for (key, value) in obj.entries() {
                    if let Some(json) = value.to_json_inner(stack)? {
                        map.insert(key, json);
                    }
                }
                stack.pop();
                serde_json::Value::Object(map)
            }
        };
        Ok(Some(json))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Obj> for Value {
    fn from(obj: Obj) -> Self {
        Value::Object(obj)
    }
}

impl From<Arr> for Value {
    fn from(arr: Arr) -> Self {
        Value::Array(arr)
    }
}

impl From<Func> for Value {
    fn from(func: Func) -> Self {
        Value::Function(func)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Number formatting with integral values printed without a fraction
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// String-to-number coercion; blank is 0, garbage is NaN
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}
