//! # Sprout Runtime
//!
//! Reactive templating over a [`sprout_dom::Document`]. Markup declares state
//! (`s-state`, `s-use`), bindings (`{expr}`), directives (`@if`, `@show`,
//! `@each`, `@transition`) and handlers (`onclick="count++"`); the runtime
//! keeps the document in sync with state.
//!
//! ## Pipeline
//!
//! ```text
//! mount ─▶ collect bindings ─▶ render ─▶ wire events
//!                                 ▲            │
//!                 flush ◀─ schedule ◀─ state writes
//! ```
//!
//! ## Usage
//!
//! ```
//! use sprout_dom::{Document, Event};
//! use sprout_runtime::Runtime;
//!
//! let doc = Document::parse(
//!     r#"<div s-state='{"count": 0}'><button onclick="count++">{count}</button></div>"#,
//! );
//! let mut runtime = Runtime::new(doc);
//! let roots = runtime.mount_all();
//! let host = runtime.root_node(roots[0]).unwrap();
//! let button = runtime.document().children(host)[0];
//!
//! runtime.dispatch(Event::new("click", button));
//! runtime.flush();
//! assert_eq!(runtime.document().text_content(button), "1");
//! ```

pub mod builtins;
pub mod collector;
pub mod config;
pub mod directives;
pub mod error;
pub mod events;
pub mod interpolation;
pub mod interpreter;
pub mod normalize;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod value;

#[cfg(test)]
mod tests_directives;
#[cfg(test)]
mod tests_events;
#[cfg(test)]
mod tests_interpreter;
#[cfg(test)]
mod tests_render;

pub use collector::{AttrBinding, InterpBinding};
pub use config::{Directive, RuntimeConfig};
pub use directives::list::EachSource;
pub use directives::transition::TransitionSpec;
pub use error::{EvalError, EvalResult, RuntimeError, RuntimeResult};
pub use events::{parse_event_attribute, ListenerId, Modifiers};
pub use interpreter::{assign, evaluate, try_assign, try_evaluate, Env};
pub use registry::{Factory, Registry};
pub use runtime::Runtime;
pub use scheduler::{RootId, Scheduler};
pub use store::make_reactive;
pub use value::{Arr, Func, KeyMatch, Obj, Value};
